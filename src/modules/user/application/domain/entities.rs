use serde::Serialize;

use crate::shared::database::Pagination;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub password_last_changed_on: Option<u64>,
    #[serde(skip_serializing)]
    pub two_factor_secret: String,
    pub is_admin: bool,
    pub created_on: u64,
    pub updated_on: Option<u64>,
    pub archived_on: Option<u64>,
}

/// Fields a caller may supply when registering a user. Admin status is not
/// one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCreationInput {
    pub username: String,
    pub hashed_password: String,
    pub two_factor_secret: String,
}

impl From<UserCreationInput> for User {
    fn from(input: UserCreationInput) -> Self {
        Self {
            id: 0,
            username: input.username,
            hashed_password: input.hashed_password,
            password_last_changed_on: None,
            two_factor_secret: input.two_factor_secret,
            is_admin: false,
            created_on: 0,
            updated_on: None,
            archived_on: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserList {
    pub pagination: Pagination,
    pub users: Vec<User>,
}
