// src/modules/user/application/ports/outgoing/user_repository.rs

use async_trait::async_trait;

use crate::modules::user::application::domain::entities::{User, UserCreationInput, UserList};
use crate::shared::database::{DatabaseError, QueryFilter};

#[async_trait]
pub trait UserDataManager: Send + Sync {
    async fn get_user(&self, user_id: u64) -> Result<User, DatabaseError>;

    async fn get_user_by_username(&self, username: &str) -> Result<User, DatabaseError>;

    /// Number of users that are not archived.
    async fn get_all_user_count(&self) -> Result<u64, DatabaseError>;

    async fn get_users(&self, filter: &QueryFilter) -> Result<UserList, DatabaseError>;

    /// Fails with [`DatabaseError::UserExists`] when the username is taken,
    /// archived users included.
    async fn create_user(&self, input: UserCreationInput) -> Result<User, DatabaseError>;

    /// Writes username, password hash and two-factor secret. The new
    /// `updated_on` is written back into `user`.
    async fn update_user(&self, user: &mut User) -> Result<(), DatabaseError>;

    async fn update_user_password(
        &self,
        user_id: u64,
        new_hash: &str,
    ) -> Result<(), DatabaseError>;

    async fn archive_user(&self, user_id: u64) -> Result<(), DatabaseError>;
}
