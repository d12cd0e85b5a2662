use chrono::Utc;
use log::{debug, trace};
use shop_common::Money;
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewUser, Role, User, UserSummary},
    traits::StoreError,
};

const USER_COLUMNS: &str = "user_id, email, password_hash, balance, role, created_at";

pub async fn insert_user(user: NewUser, conn: &mut SqliteConnection) -> Result<User, StoreError> {
    let result = sqlx::query_as(&format!(
        "INSERT INTO users (email, password_hash, balance, role, created_at) VALUES ($1, $2, 0, $3, $4) RETURNING \
         {USER_COLUMNS}"
    ))
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.role)
    .bind(Utc::now())
    .fetch_one(conn)
    .await;
    match result {
        Ok(user) => Ok(user),
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(StoreError::DuplicateEmail(user.email)),
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_user(user_id: i64, conn: &mut SqliteConnection) -> Result<Option<User>, StoreError> {
    let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = $1"))
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub async fn fetch_user_by_email(email: &str, conn: &mut SqliteConnection) -> Result<Option<User>, StoreError> {
    let user = sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
        .bind(email)
        .fetch_optional(conn)
        .await?;
    Ok(user)
}

pub async fn balance(user_id: i64, conn: &mut SqliteConnection) -> Result<Money, StoreError> {
    let balance: Option<Money> = sqlx::query_scalar("SELECT balance FROM users WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;
    balance.ok_or(StoreError::UserNotFound(user_id))
}

pub async fn credit_balance(user_id: i64, amount: Money, conn: &mut SqliteConnection) -> Result<Money, StoreError> {
    let balance: Option<Money> =
        sqlx::query_scalar("UPDATE users SET balance = balance + $1 WHERE user_id = $2 RETURNING balance")
            .bind(amount)
            .bind(user_id)
            .fetch_optional(conn)
            .await?;
    let balance = balance.ok_or(StoreError::UserNotFound(user_id))?;
    debug!("🗃️ Credited {amount} to user {user_id}. New balance: {balance}");
    Ok(balance)
}

/// Debits the user's balance with a single guarded update, so that the balance can never go negative. Returns the new
/// balance.
pub async fn debit_balance(user_id: i64, amount: Money, conn: &mut SqliteConnection) -> Result<Money, StoreError> {
    let balance: Option<Money> = sqlx::query_scalar(
        r#"
        UPDATE users
        SET balance = balance - $1
        WHERE user_id = $2 AND balance >= $3
        RETURNING balance"#,
    )
    .bind(amount)
    .bind(user_id)
    .bind(amount)
    .fetch_optional(&mut *conn)
    .await?;
    match balance {
        Some(b) => {
            trace!("🗃️ Debited {amount} from user {user_id}. New balance: {b}");
            Ok(b)
        },
        None => {
            let available = self::balance(user_id, conn).await?;
            Err(StoreError::InsufficientFunds { required: amount, available })
        },
    }
}

pub async fn set_role(user_id: i64, role: Role, conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let result =
        sqlx::query("UPDATE users SET role = $1 WHERE user_id = $2").bind(role).bind(user_id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(StoreError::UserNotFound(user_id));
    }
    debug!("🗃️ User {user_id} now has the {role} role");
    Ok(())
}

pub async fn list_users(conn: &mut SqliteConnection) -> Result<Vec<UserSummary>, StoreError> {
    let users =
        sqlx::query_as("SELECT user_id, email, role, balance FROM users ORDER BY user_id").fetch_all(conn).await?;
    Ok(users)
}
