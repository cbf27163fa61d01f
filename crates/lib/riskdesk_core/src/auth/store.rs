//! Admin directory and single-slot refresh-token store.
//!
//! Each admin account holds at most one current refresh token. Rotation is a
//! compare-and-swap on that slot: of two concurrent rotations presenting the
//! same token, exactly one wins.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{AuthError, token_digest};
use crate::models::auth::{AdminAccount, NewAdmin};

type AdminRow = (String, String, String, String, String, Option<String>);

const ADMIN_COLUMNS: &str = "id::text, username, email, password_hash, role, refresh_token_hash";

fn admin_from_row(row: AdminRow) -> AdminAccount {
    let (id, username, email, password_hash, role, refresh_token_hash) = row;
    AdminAccount {
        id,
        username,
        email,
        password_hash,
        role,
        refresh_token_hash,
    }
}

/// Lookup and provisioning of admin accounts.
#[async_trait]
pub trait AdminDirectory: Send + Sync {
    /// Find an account whose email or username equals `identifier`.
    /// An email match wins over another account's username.
    async fn find_by_identifier(&self, identifier: &str)
    -> Result<Option<AdminAccount>, AuthError>;

    /// Fetch an account by ID.
    async fn find_by_id(&self, id: &str) -> Result<Option<AdminAccount>, AuthError>;

    /// Insert a new account with an empty session slot.
    async fn create_admin(&self, admin: NewAdmin) -> Result<AdminAccount, AuthError>;
}

/// The per-account refresh-token slot.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Unconditionally overwrite the account's slot.
    async fn set(&self, account_id: &str, refresh: &str) -> Result<(), AuthError>;

    /// Atomically replace `old` with `new` on whichever account holds `old`.
    ///
    /// Returns `false` when no account currently holds `old`.
    async fn rotate(&self, old: &str, new: &str) -> Result<bool, AuthError>;

    /// Empty the slot of whichever account holds `refresh`. No-op if none does.
    async fn clear(&self, refresh: &str) -> Result<(), AuthError>;

    /// Find the account currently holding `refresh`.
    async fn find_by_refresh(&self, refresh: &str) -> Result<Option<AdminAccount>, AuthError>;
}

// ---------------------------------------------------------------------------
// PostgreSQL
// ---------------------------------------------------------------------------

/// `admins` table backed store.
#[derive(Clone)]
pub struct PgAdminStore {
    pool: PgPool,
}

impl PgAdminStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminDirectory for PgAdminStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<AdminAccount>, AuthError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE email = $1 OR username = $1 \
             ORDER BY (email = $1) DESC LIMIT 1"
        ))
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(admin_from_row))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AdminAccount>, AuthError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE id = $1::uuid"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(admin_from_row))
    }

    async fn create_admin(&self, admin: NewAdmin) -> Result<AdminAccount, AuthError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "INSERT INTO admins (id, username, email, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ADMIN_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(&admin.username)
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .bind(&admin.role)
        .fetch_one(&self.pool)
        .await?;
        Ok(admin_from_row(row))
    }
}

#[async_trait]
impl SessionStore for PgAdminStore {
    async fn set(&self, account_id: &str, refresh: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE admins SET refresh_token_hash = $2 WHERE id = $1::uuid")
            .bind(account_id)
            .bind(token_digest(refresh))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn rotate(&self, old: &str, new: &str) -> Result<bool, AuthError> {
        let result = sqlx::query(
            "UPDATE admins SET refresh_token_hash = $2 WHERE refresh_token_hash = $1",
        )
        .bind(token_digest(old))
        .bind(token_digest(new))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn clear(&self, refresh: &str) -> Result<(), AuthError> {
        sqlx::query("UPDATE admins SET refresh_token_hash = NULL WHERE refresh_token_hash = $1")
            .bind(token_digest(refresh))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_refresh(&self, refresh: &str) -> Result<Option<AdminAccount>, AuthError> {
        let row = sqlx::query_as::<_, AdminRow>(&format!(
            "SELECT {ADMIN_COLUMNS} FROM admins WHERE refresh_token_hash = $1"
        ))
        .bind(token_digest(refresh))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(admin_from_row))
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// In-memory store keyed by account ID; every mutation runs under one write lock.
#[derive(Debug, Default)]
pub struct MemoryAdminStore {
    accounts: RwLock<HashMap<String, AdminAccount>>,
}

impl MemoryAdminStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdminDirectory for MemoryAdminStore {
    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<AdminAccount>, AuthError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.email == identifier)
            .or_else(|| accounts.values().find(|a| a.username == identifier))
            .cloned())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<AdminAccount>, AuthError> {
        Ok(self.accounts.read().await.get(id).cloned())
    }

    async fn create_admin(&self, admin: NewAdmin) -> Result<AdminAccount, AuthError> {
        let mut accounts = self.accounts.write().await;
        if accounts
            .values()
            .any(|a| a.email == admin.email || a.username == admin.username)
        {
            return Err(AuthError::ValidationError(
                "Username or email already registered".into(),
            ));
        }
        let account = AdminAccount {
            id: Uuid::now_v7().to_string(),
            username: admin.username,
            email: admin.email,
            password_hash: admin.password_hash,
            role: admin.role,
            refresh_token_hash: None,
        };
        accounts.insert(account.id.clone(), account.clone());
        Ok(account)
    }
}

#[async_trait]
impl SessionStore for MemoryAdminStore {
    async fn set(&self, account_id: &str, refresh: &str) -> Result<(), AuthError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(account_id) {
            account.refresh_token_hash = Some(token_digest(refresh));
        }
        Ok(())
    }

    async fn rotate(&self, old: &str, new: &str) -> Result<bool, AuthError> {
        let old_digest = token_digest(old);
        let mut accounts = self.accounts.write().await;
        match accounts
            .values_mut()
            .find(|a| a.refresh_token_hash.as_deref() == Some(old_digest.as_str()))
        {
            Some(account) => {
                account.refresh_token_hash = Some(token_digest(new));
                Ok(true)
            }
            None => {
                debug!("rotation found no holder for presented refresh token");
                Ok(false)
            }
        }
    }

    async fn clear(&self, refresh: &str) -> Result<(), AuthError> {
        let digest = token_digest(refresh);
        let mut accounts = self.accounts.write().await;
        for account in accounts.values_mut() {
            if account.refresh_token_hash.as_deref() == Some(digest.as_str()) {
                account.refresh_token_hash = None;
            }
        }
        Ok(())
    }

    async fn find_by_refresh(&self, refresh: &str) -> Result<Option<AdminAccount>, AuthError> {
        let digest = token_digest(refresh);
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|a| a.refresh_token_hash.as_deref() == Some(digest.as_str()))
            .cloned())
    }
}
