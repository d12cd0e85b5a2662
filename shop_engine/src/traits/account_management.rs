use shop_common::Money;

use crate::{
    db_types::{NewUser, Role, User, UserSummary},
    traits::StoreError,
};

/// User identity, roles and balances. Users are never deleted.
#[allow(async_fn_in_trait)]
pub trait AccountManagement: Clone {
    /// Creates a user with a zero balance. Fails with `DuplicateEmail` if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn fetch_user(&self, user_id: i64) -> Result<Option<User>, StoreError>;

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn balance(&self, user_id: i64) -> Result<Money, StoreError>;

    /// Credits the user's balance and returns the new balance.
    async fn top_up(&self, user_id: i64, amount: Money) -> Result<Money, StoreError>;

    async fn set_role(&self, user_id: i64, role: Role) -> Result<(), StoreError>;

    async fn list_users(&self) -> Result<Vec<UserSummary>, StoreError>;
}
