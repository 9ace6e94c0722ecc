use sea_orm::entity::prelude::*;

/// Schema of the `users` table. Epoch columns are `BIGINT`; the domain
/// converts them to unsigned values when scanning.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub username: String,
    pub hashed_password: String,
    pub password_last_changed_on: Option<i64>,
    pub two_factor_secret: String,
    pub is_admin: bool,
    pub created_on: i64,
    pub updated_on: Option<i64>,
    pub archived_on: Option<i64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
