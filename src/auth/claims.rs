use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Verified identity carried by a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub role: String,
}

/// JWT payload: the identity plus its expiry, nothing else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub exp: usize, // expires at (unix timestamp)
}

impl Claims {
    pub fn new(identity: &Identity, exp: usize) -> Self {
        Self {
            id: identity.id,
            email: identity.email.clone(),
            role: identity.role.clone(),
            exp,
        }
    }
}

impl From<Claims> for Identity {
    fn from(c: Claims) -> Self {
        Self {
            id: c.id,
            email: c.email,
            role: c.role,
        }
    }
}
