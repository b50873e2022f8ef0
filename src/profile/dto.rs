use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user_id: Uuid,
    pub role: String,
    pub balance: f64,
    pub account_status: String,
    pub referral_code: String,
}
