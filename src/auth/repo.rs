use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, User, DEFAULT_STATUS};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("referral code already assigned")]
    DuplicateReferralCode,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persisted accounts, unique by email and by referral code.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn referral_code_exists(&self, code: &str) -> Result<bool, StoreError>;
    /// Fails with a `Duplicate*` variant when a unique constraint rejects the row.
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;
}

pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

const USER_COLUMNS: &str =
    "id, email, password_hash, role, referral_code, referred_by, balance, status, created_at";

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn referral_code_exists(&self, code: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE referral_code = $1)",
        )
        .bind(code)
        .fetch_one(&self.db)
        .await?;
        Ok(exists)
    }

    async fn create(&self, new: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, role, referral_code, referred_by, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.id)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(new.role)
        .bind(new.referral_code)
        .bind(new.referred_by)
        .bind(DEFAULT_STATUS)
        .bind(new.created_at)
        .fetch_one(&self.db)
        .await
        .map_err(map_unique_violation)?;
        Ok(user)
    }
}

fn map_unique_violation(e: sqlx::Error) -> StoreError {
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("users_email_key") => return StoreError::DuplicateEmail,
                Some("users_referral_code_key") => return StoreError::DuplicateReferralCode,
                _ => {}
            }
        }
    }
    StoreError::Database(e)
}

#[cfg(test)]
pub(crate) mod memory {
    use std::sync::Mutex;

    use super::*;

    /// In-process store with the same uniqueness rules as the `users` table.
    #[derive(Default)]
    pub struct MemoryUserStore {
        users: Mutex<Vec<User>>,
    }

    impl MemoryUserStore {
        pub fn len(&self) -> usize {
            self.users.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.email == email).cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().find(|u| u.id == id).cloned())
        }

        async fn referral_code_exists(&self, code: &str) -> Result<bool, StoreError> {
            let users = self.users.lock().unwrap();
            Ok(users.iter().any(|u| u.referral_code == code))
        }

        async fn create(&self, new: NewUser) -> Result<User, StoreError> {
            let mut users = self.users.lock().unwrap();
            if users.iter().any(|u| u.email == new.email) {
                return Err(StoreError::DuplicateEmail);
            }
            if users.iter().any(|u| u.referral_code == new.referral_code) {
                return Err(StoreError::DuplicateReferralCode);
            }
            let user = User {
                id: new.id,
                email: new.email,
                password_hash: new.password_hash,
                role: new.role,
                referral_code: new.referral_code,
                referred_by: new.referred_by,
                balance: 0.0,
                status: DEFAULT_STATUS.into(),
                created_at: new.created_at,
            };
            users.push(user.clone());
            Ok(user)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Fault {
        /// Every referral code looks taken.
        ReferralCodesTaken,
        /// `create` loses an email race.
        DuplicateEmailOnCreate,
        /// `create` loses a referral-code race.
        DuplicateReferralCodeOnCreate,
        /// Every call fails as if the database were unreachable.
        Unavailable,
    }

    /// `MemoryUserStore` with one injected failure mode.
    pub struct FaultyUserStore {
        inner: MemoryUserStore,
        fault: Fault,
    }

    impl FaultyUserStore {
        pub fn new(fault: Fault) -> Self {
            Self {
                inner: MemoryUserStore::default(),
                fault,
            }
        }

        fn check_available(&self) -> Result<(), StoreError> {
            match self.fault {
                Fault::Unavailable => Err(StoreError::Database(sqlx::Error::PoolTimedOut)),
                _ => Ok(()),
            }
        }
    }

    #[async_trait]
    impl UserStore for FaultyUserStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            self.check_available()?;
            self.inner.find_by_email(email).await
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            self.check_available()?;
            self.inner.find_by_id(id).await
        }

        async fn referral_code_exists(&self, code: &str) -> Result<bool, StoreError> {
            self.check_available()?;
            if self.fault == Fault::ReferralCodesTaken {
                return Ok(true);
            }
            self.inner.referral_code_exists(code).await
        }

        async fn create(&self, new: NewUser) -> Result<User, StoreError> {
            self.check_available()?;
            match self.fault {
                Fault::DuplicateEmailOnCreate => Err(StoreError::DuplicateEmail),
                Fault::DuplicateReferralCodeOnCreate => Err(StoreError::DuplicateReferralCode),
                _ => self.inner.create(new).await,
            }
        }
    }

    mod tests {
        use super::*;
        use crate::auth::repo_types::DEFAULT_ROLE;

        fn new_user(email: &str, code: &str) -> NewUser {
            NewUser {
                id: Uuid::new_v4(),
                email: email.into(),
                password_hash: "$argon2id$fake".into(),
                role: DEFAULT_ROLE.into(),
                referral_code: code.into(),
                referred_by: Some("BCA332".into()),
                created_at: 1,
            }
        }

        #[tokio::test]
        async fn enforces_unique_email_and_referral_code() {
            let store = MemoryUserStore::default();
            store.create(new_user("a@x.com", "ABC123")).await.unwrap();

            let dup_email = store.create(new_user("a@x.com", "XYZ999")).await;
            assert!(matches!(dup_email, Err(StoreError::DuplicateEmail)));

            let dup_code = store.create(new_user("b@x.com", "ABC123")).await;
            assert!(matches!(dup_code, Err(StoreError::DuplicateReferralCode)));

            assert_eq!(store.len(), 1);
        }

        #[tokio::test]
        async fn email_lookup_is_case_sensitive() {
            let store = MemoryUserStore::default();
            store.create(new_user("A@x.com", "ABC123")).await.unwrap();
            assert!(store.find_by_email("a@x.com").await.unwrap().is_none());
            assert!(store.find_by_email("A@x.com").await.unwrap().is_some());
        }

        #[tokio::test]
        async fn created_user_takes_defaults() {
            let store = MemoryUserStore::default();
            let user = store.create(new_user("a@x.com", "ABC123")).await.unwrap();
            assert_eq!(user.balance, 0.0);
            assert_eq!(user.status, DEFAULT_STATUS);
            assert!(store.referral_code_exists("ABC123").await.unwrap());
            assert!(store.find_by_id(user.id).await.unwrap().is_some());
        }
    }
}
