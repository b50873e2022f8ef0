use sqlx::FromRow;
use uuid::Uuid;

pub const DEFAULT_ROLE: &str = "usuario";
pub const DEFAULT_STATUS: &str = "active";

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String, // Argon2 PHC string
    pub role: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub balance: f64,
    pub status: String,
    pub created_at: i64, // unix millis
}

/// Values the registration flow supplies; the rest take column defaults.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub referral_code: String,
    pub referred_by: Option<String>,
    pub created_at: i64,
}
