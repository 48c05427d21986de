use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CrmError, Role, SecretString, SessionUser};

/// A staff account as stored.
///
/// Every mutation carries the acting user's id alongside its timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub hashed_password: String,
    pub role: Role,
    pub name: String,
    pub email: Option<String>,
    pub ulpan: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
    pub updated_by: Option<i64>,
    pub deactivated_at: Option<DateTime<Utc>>,
    pub deactivated_by: Option<i64>,
    pub activated_at: Option<DateTime<Utc>>,
    pub activated_by: Option<i64>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserRecord {
    /// Listing view without the credential.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            name: self.name.clone(),
            email: self.email.clone(),
            ulpan: self.ulpan.clone(),
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_login: self.last_login,
        }
    }

    pub fn session_user(&self) -> SessionUser {
        SessionUser {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            ulpan: self.ulpan.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub name: String,
    pub email: Option<String>,
    pub ulpan: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Input for account creation.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password: SecretString,
    pub role: Role,
    pub name: String,
    pub email: Option<String>,
    pub ulpan: Option<String>,
}

/// Partial update. `None` leaves a field unchanged; `Some(None)` clears an
/// optional field.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub role: Option<Role>,
    pub email: Option<Option<String>>,
    pub ulpan: Option<Option<String>>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.role.is_none() && self.email.is_none() && self.ulpan.is_none()
    }
}

#[async_trait]
pub trait UserRepository {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, CrmError>;

    /// Exact, case-sensitive lookup used by login.
    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<UserRecord>, CrmError>;

    /// Case-insensitive existence check used to reject duplicates.
    async fn username_taken(&self, username: &str) -> Result<bool, CrmError>;

    /// All accounts in id order, active or not.
    async fn list_users(&self) -> Result<Vec<UserRecord>, CrmError>;

    async fn create_user(
        &self,
        user: &NewUser,
        hashed_password: &str,
        created_by: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, CrmError>;

    async fn update_user(
        &self,
        user_id: i64,
        update: &UserUpdate,
        updated_by: i64,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, CrmError>;

    async fn set_active(
        &self,
        user_id: i64,
        active: bool,
        actor: i64,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, CrmError>;

    async fn update_password(
        &self,
        user_id: i64,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CrmError>;

    async fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), CrmError>;
}
