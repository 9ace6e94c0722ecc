use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, EntityName, IdenStatic, Iterable};
use std::sync::Arc;
use std::time::Duration;

use super::sea_orm_entity::users::{Column, Entity};
use crate::modules::user::application::domain::entities::{User, UserCreationInput, UserList};
use crate::modules::user::application::ports::outgoing::UserDataManager;
use crate::shared::database::deadline::run_with_deadline;
use crate::shared::database::errors::is_unique_violation;
use crate::shared::database::query_builder::{
    build_or_log, insert_into, select, update, BuiltQuery, Equals, QueryBuildError,
    CURRENT_UNIX_TIME,
};
use crate::shared::database::scanner::{scan_rows, Rows, Scanner, COUNT_COLUMN};
use crate::shared::database::{DatabaseError, QueryFilter};

// ============================================================================
// Repository Implementation
// ============================================================================

#[derive(Clone)]
pub struct UserRepositoryPostgres {
    db: Arc<DatabaseConnection>,
    deadline: Option<Duration>,
}

impl UserRepositoryPostgres {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db, deadline: None }
    }

    /// Bounds every operation by `deadline`. `None` removes the bound.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    // =====================================================
    // SQL builders
    // =====================================================

    fn table() -> String {
        Entity.table_name().to_string()
    }

    fn qualified(column: Column) -> String {
        format!("{}.{}", Self::table(), column.as_str())
    }

    fn columns() -> Vec<String> {
        Column::iter().map(Self::qualified).collect()
    }

    fn get_user_query(user_id: u64) -> Result<BuiltQuery, QueryBuildError> {
        select(Self::columns())
            .from(Self::table())
            .and_where(Equals::new().and(Self::qualified(Column::Id), user_id))
            .to_sql()
    }

    fn get_user_by_username_query(username: &str) -> Result<BuiltQuery, QueryBuildError> {
        select(Self::columns())
            .from(Self::table())
            .and_where(Equals::new().and(Self::qualified(Column::Username), username))
            .to_sql()
    }

    fn get_all_user_count_query() -> Result<BuiltQuery, QueryBuildError> {
        select([format!("COUNT({})", Self::qualified(Column::Id))])
            .from(Self::table())
            .and_where(Equals::new().and_null(Self::qualified(Column::ArchivedOn)))
            .to_sql()
    }

    fn get_users_query(filter: &QueryFilter) -> Result<BuiltQuery, QueryBuildError> {
        let count = Self::get_all_user_count_query()?;
        let table = Self::table();

        let builder = select(Self::columns())
            .column(format!("({})", count.sql))
            .from(&table)
            .and_where(Equals::new().and_null(Self::qualified(Column::ArchivedOn)))
            .order_by(Self::qualified(Column::Id));

        filter.apply_to_query_builder(builder, &table).to_sql()
    }

    fn create_user_query(input: &UserCreationInput) -> Result<BuiltQuery, QueryBuildError> {
        insert_into(Self::table())
            .value(Column::Username.as_str(), input.username.as_str())
            .value(Column::HashedPassword.as_str(), input.hashed_password.as_str())
            .value(Column::TwoFactorSecret.as_str(), input.two_factor_secret.as_str())
            .value(Column::IsAdmin.as_str(), false)
            .suffix(format!(
                "RETURNING {}, {}",
                Column::Id.as_str(),
                Column::CreatedOn.as_str()
            ))
            .to_sql()
    }

    fn update_user_query(user: &User) -> Result<BuiltQuery, QueryBuildError> {
        update(Self::table())
            .set(Column::Username.as_str(), user.username.as_str())
            .set(Column::HashedPassword.as_str(), user.hashed_password.as_str())
            .set(Column::TwoFactorSecret.as_str(), user.two_factor_secret.as_str())
            .set_raw(Column::UpdatedOn.as_str(), CURRENT_UNIX_TIME)
            .and_where(Equals::new().and(Column::Id.as_str(), user.id))
            .suffix(format!("RETURNING {}", Column::UpdatedOn.as_str()))
            .to_sql()
    }

    fn update_user_password_query(
        user_id: u64,
        new_hash: &str,
    ) -> Result<BuiltQuery, QueryBuildError> {
        update(Self::table())
            .set(Column::HashedPassword.as_str(), new_hash)
            .set_raw(Column::PasswordLastChangedOn.as_str(), CURRENT_UNIX_TIME)
            .set_raw(Column::UpdatedOn.as_str(), CURRENT_UNIX_TIME)
            .and_where(
                Equals::new()
                    .and_null(Column::ArchivedOn.as_str())
                    .and(Column::Id.as_str(), user_id),
            )
            .suffix(format!("RETURNING {}", Column::UpdatedOn.as_str()))
            .to_sql()
    }

    fn archive_user_query(user_id: u64) -> Result<BuiltQuery, QueryBuildError> {
        update(Self::table())
            .set_raw(Column::UpdatedOn.as_str(), CURRENT_UNIX_TIME)
            .set_raw(Column::ArchivedOn.as_str(), CURRENT_UNIX_TIME)
            .and_where(
                Equals::new()
                    .and_null(Column::ArchivedOn.as_str())
                    .and(Column::Id.as_str(), user_id),
            )
            .suffix(format!("RETURNING {}", Column::ArchivedOn.as_str()))
            .to_sql()
    }

    // =====================================================
    // Row scanning
    // =====================================================

    fn scan_user<R: Scanner>(row: &R, include_count: bool) -> Result<(User, u64), DbErr> {
        let user = User {
            id: row.scan_u64(Column::Id.as_str())?,
            username: row.scan(Column::Username.as_str())?,
            hashed_password: row.scan(Column::HashedPassword.as_str())?,
            password_last_changed_on: row
                .scan_optional_u64(Column::PasswordLastChangedOn.as_str())?,
            two_factor_secret: row.scan(Column::TwoFactorSecret.as_str())?,
            is_admin: row.scan(Column::IsAdmin.as_str())?,
            created_on: row.scan_u64(Column::CreatedOn.as_str())?,
            updated_on: row.scan_optional_u64(Column::UpdatedOn.as_str())?,
            archived_on: row.scan_optional_u64(Column::ArchivedOn.as_str())?,
        };

        let count = if include_count {
            row.scan_u64(COUNT_COLUMN)?
        } else {
            0
        };

        Ok((user, count))
    }

    async fn fetch_one_user(
        &self,
        query: BuiltQuery,
        context: &'static str,
    ) -> Result<User, DatabaseError> {
        let row = self
            .db
            .query_one(query.into_statement())
            .await
            .map_err(|e| DatabaseError::from_db_err(e, context))?
            .ok_or(DatabaseError::NotFound)?;

        Self::scan_user(&row, false)
            .map(|(user, _)| user)
            .map_err(|e| DatabaseError::from_db_err(e, "scanning user"))
    }

    /// Runs an `UPDATE .. RETURNING` and reads the returned epoch. No row
    /// means the predicate matched nothing.
    async fn update_returning(
        &self,
        query: BuiltQuery,
        column: Column,
        context: &'static str,
    ) -> Result<u64, DatabaseError> {
        let row = self
            .db
            .query_one(query.into_statement())
            .await
            .map_err(|e| DatabaseError::from_db_err(e, context))?
            .ok_or(DatabaseError::NotFound)?;

        row.scan_u64(column.as_str())
            .map_err(|e| DatabaseError::from_db_err(e, "scanning response from database"))
    }
}

#[async_trait]
impl UserDataManager for UserRepositoryPostgres {
    async fn get_user(&self, user_id: u64) -> Result<User, DatabaseError> {
        const CONTEXT: &str = "fetching user from database";

        // No stored id lies outside BIGINT.
        let query =
            build_or_log(Self::get_user_query(user_id)).map_err(|_| DatabaseError::NotFound)?;
        run_with_deadline(self.deadline, CONTEXT, self.fetch_one_user(query, CONTEXT)).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<User, DatabaseError> {
        const CONTEXT: &str = "fetching user from database";

        let query = build_or_log(Self::get_user_by_username_query(username))
            .map_err(|e| DatabaseError::out_of_range(e, CONTEXT))?;
        run_with_deadline(self.deadline, CONTEXT, self.fetch_one_user(query, CONTEXT)).await
    }

    async fn get_all_user_count(&self) -> Result<u64, DatabaseError> {
        const CONTEXT: &str = "fetching count of users";

        let query = build_or_log(Self::get_all_user_count_query())
            .map_err(|e| DatabaseError::out_of_range(e, CONTEXT))?;
        run_with_deadline(self.deadline, CONTEXT, async {
            let row = self
                .db
                .query_one(query.into_statement())
                .await
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?
                .ok_or(DatabaseError::NotFound)?;

            row.scan_u64(COUNT_COLUMN)
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))
        })
        .await
    }

    async fn get_users(&self, filter: &QueryFilter) -> Result<UserList, DatabaseError> {
        const CONTEXT: &str = "querying database for users";

        let query = build_or_log(Self::get_users_query(filter))
            .map_err(|e| DatabaseError::out_of_range(e, CONTEXT))?;
        run_with_deadline(self.deadline, CONTEXT, async {
            let rows = self
                .db
                .query_all(query.into_statement())
                .await
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?;

            let (users, total_count) = scan_rows(Rows::from(rows), true, Self::scan_user)
                .map_err(|e| DatabaseError::from_db_err(e, "scanning response from database"))?;

            Ok(UserList {
                pagination: filter.pagination(total_count),
                users,
            })
        })
        .await
    }

    async fn create_user(&self, input: UserCreationInput) -> Result<User, DatabaseError> {
        const CONTEXT: &str = "error executing user creation query";

        let query = build_or_log(Self::create_user_query(&input))
            .map_err(|e| DatabaseError::out_of_range(e, CONTEXT))?;
        run_with_deadline(self.deadline, CONTEXT, async {
            let row = self
                .db
                .query_one(query.into_statement())
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        DatabaseError::UserExists
                    } else {
                        DatabaseError::Query {
                            context: CONTEXT,
                            source: e,
                        }
                    }
                })?
                .ok_or(DatabaseError::Query {
                    context: CONTEXT,
                    source: DbErr::RecordNotInserted,
                })?;

            let mut user = User::from(input);
            user.id = row
                .scan_u64(Column::Id.as_str())
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?;
            user.created_on = row
                .scan_u64(Column::CreatedOn.as_str())
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?;

            Ok(user)
        })
        .await
    }

    async fn update_user(&self, user: &mut User) -> Result<(), DatabaseError> {
        const CONTEXT: &str = "updating user";

        let query =
            build_or_log(Self::update_user_query(user)).map_err(|_| DatabaseError::NotFound)?;
        let updated_on = run_with_deadline(
            self.deadline,
            CONTEXT,
            self.update_returning(query, Column::UpdatedOn, CONTEXT),
        )
        .await?;

        user.updated_on = Some(updated_on);
        Ok(())
    }

    async fn update_user_password(
        &self,
        user_id: u64,
        new_hash: &str,
    ) -> Result<(), DatabaseError> {
        const CONTEXT: &str = "updating user password";

        let query = build_or_log(Self::update_user_password_query(user_id, new_hash))
            .map_err(|_| DatabaseError::NotFound)?;
        run_with_deadline(
            self.deadline,
            CONTEXT,
            self.update_returning(query, Column::UpdatedOn, CONTEXT),
        )
        .await
        .map(|_| ())
    }

    async fn archive_user(&self, user_id: u64) -> Result<(), DatabaseError> {
        const CONTEXT: &str = "archiving user";

        let query =
            build_or_log(Self::archive_user_query(user_id)).map_err(|_| DatabaseError::NotFound)?;
        run_with_deadline(self.deadline, CONTEXT, async {
            let result = self
                .db
                .execute(query.into_statement())
                .await
                .map_err(|e| DatabaseError::from_db_err(e, CONTEXT))?;

            if result.rows_affected() == 0 {
                return Err(DatabaseError::NotFound);
            }

            Ok(())
        })
        .await
    }
}
