use chrono::Utc;
use maplit::btreemap;

use super::rows::{big_int, opt_big_int, string, MockRow};
use crate::modules::report::application::domain::entities::{Report, ReportCreationInput};
use crate::modules::user::application::domain::entities::{User, UserCreationInput};
use crate::shared::database::scanner::COUNT_COLUMN;

fn now() -> u64 {
    Utc::now().timestamp() as u64
}

pub fn fake_user() -> User {
    User {
        id: 42,
        username: "frank_zappa".to_string(),
        hashed_password: "$argon2id$v=19$m=65536,t=3,p=4$c2FsdA$aGFzaA".to_string(),
        password_last_changed_on: None,
        two_factor_secret: "JBSWY3DPEHPK3PXP".to_string(),
        is_admin: false,
        created_on: now(),
        updated_on: None,
        archived_on: None,
    }
}

pub fn fake_user_input(user: &User) -> UserCreationInput {
    UserCreationInput {
        username: user.username.clone(),
        hashed_password: user.hashed_password.clone(),
        two_factor_secret: user.two_factor_secret.clone(),
    }
}

pub fn fake_report() -> Report {
    Report {
        id: 7,
        report_type: "spam".to_string(),
        concern: "posts the same link in every thread".to_string(),
        created_on: now(),
        updated_on: None,
        archived_on: None,
        belongs_to_user: 3,
    }
}

pub fn fake_report_input(report: &Report) -> ReportCreationInput {
    ReportCreationInput {
        report_type: report.report_type.clone(),
        concern: report.concern.clone(),
        belongs_to_user: report.belongs_to_user,
    }
}

pub fn user_row(user: &User) -> MockRow {
    btreemap! {
        "id".to_string() => big_int(user.id),
        "username".to_string() => string(&user.username),
        "hashed_password".to_string() => string(&user.hashed_password),
        "password_last_changed_on".to_string() => opt_big_int(user.password_last_changed_on),
        "two_factor_secret".to_string() => string(&user.two_factor_secret),
        "is_admin".to_string() => sea_orm::Value::Bool(Some(user.is_admin)),
        "created_on".to_string() => big_int(user.created_on),
        "updated_on".to_string() => opt_big_int(user.updated_on),
        "archived_on".to_string() => opt_big_int(user.archived_on),
    }
}

pub fn report_row(report: &Report) -> MockRow {
    btreemap! {
        "id".to_string() => big_int(report.id),
        "report_type".to_string() => string(&report.report_type),
        "concern".to_string() => string(&report.concern),
        "created_on".to_string() => big_int(report.created_on),
        "updated_on".to_string() => opt_big_int(report.updated_on),
        "archived_on".to_string() => opt_big_int(report.archived_on),
        "belongs_to_user".to_string() => big_int(report.belongs_to_user),
    }
}

pub fn with_count(mut row: MockRow, count: u64) -> MockRow {
    row.insert(COUNT_COLUMN.to_string(), big_int(count));
    row
}
