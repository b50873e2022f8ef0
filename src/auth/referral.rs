use rand::Rng;
use thiserror::Error;
use tracing::{debug, warn};

use crate::auth::repo::{StoreError, UserStore};

/// Global code every registration must present.
pub const GATE_CODE: &str = "BCA332";

pub const MAX_ATTEMPTS: usize = 10;

const LETTERS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

#[derive(Debug, Error)]
pub enum ReferralError {
    #[error("no unique referral code after {0} attempts")]
    Exhausted(usize),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Three uppercase letters followed by three digits, e.g. `ABC123`.
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    let mut code = String::with_capacity(6);
    for _ in 0..3 {
        code.push(LETTERS[rng.gen_range(0..LETTERS.len())] as char);
    }
    for _ in 0..3 {
        code.push(DIGITS[rng.gen_range(0..DIGITS.len())] as char);
    }
    code
}

/// Draws codes until one is not yet assigned in `store`.
///
/// The check is advisory: a concurrent registration can still claim the same
/// code before our insert, in which case the store rejects the insert.
pub async fn generate_unique(store: &dyn UserStore) -> Result<String, ReferralError> {
    generate_unique_with(store, generate_code).await
}

async fn generate_unique_with(
    store: &dyn UserStore,
    mut draw: impl FnMut() -> String + Send,
) -> Result<String, ReferralError> {
    for attempt in 1..=MAX_ATTEMPTS {
        let code = draw();
        if !store.referral_code_exists(&code).await? {
            debug!(attempt, "referral code generated");
            return Ok(code);
        }
        debug!(attempt, "referral code collision");
    }
    warn!(attempts = MAX_ATTEMPTS, "referral code generation exhausted");
    Err(ReferralError::Exhausted(MAX_ATTEMPTS))
}
