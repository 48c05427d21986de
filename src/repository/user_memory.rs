use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::user::{NewUser, UserRecord, UserRepository, UserUpdate};
use crate::CrmError;

/// Process-local account store.
///
/// Ids are handed out from a monotonic counter and never reused, including
/// after deactivation.
#[derive(Clone, Default)]
pub struct InMemoryUserRepository {
    users: Arc<RwLock<Vec<UserRecord>>>,
    next_id: Arc<AtomicI64>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_users(&self) -> Result<std::sync::RwLockReadGuard<'_, Vec<UserRecord>>, CrmError> {
        self.users
            .read()
            .map_err(|_| CrmError::Internal("user store lock poisoned".to_owned()))
    }

    fn write_users(&self) -> Result<std::sync::RwLockWriteGuard<'_, Vec<UserRecord>>, CrmError> {
        self.users
            .write()
            .map_err(|_| CrmError::Internal("user store lock poisoned".to_owned()))
    }

    fn modify<F>(&self, user_id: i64, f: F) -> Result<UserRecord, CrmError>
    where
        F: FnOnce(&mut UserRecord),
    {
        let mut users = self.write_users()?;
        let user = users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or(CrmError::UserNotFound)?;
        f(user);
        Ok(user.clone())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_user_by_id(&self, id: i64) -> Result<Option<UserRecord>, CrmError> {
        let users = self.read_users()?;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserRecord>, CrmError> {
        let users = self.read_users()?;
        Ok(users.iter().find(|u| u.username == username).cloned())
    }

    async fn username_taken(&self, username: &str) -> Result<bool, CrmError> {
        let wanted = username.to_lowercase();
        let users = self.read_users()?;
        Ok(users.iter().any(|u| u.username.to_lowercase() == wanted))
    }

    async fn list_users(&self) -> Result<Vec<UserRecord>, CrmError> {
        Ok(self.read_users()?.clone())
    }

    async fn create_user(
        &self,
        user: &NewUser,
        hashed_password: &str,
        created_by: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, CrmError> {
        let mut users = self.write_users()?;
        let wanted = user.username.to_lowercase();
        if users.iter().any(|u| u.username.to_lowercase() == wanted) {
            return Err(CrmError::UserAlreadyExists);
        }

        let record = UserRecord {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            username: user.username.clone(),
            hashed_password: hashed_password.to_owned(),
            role: user.role,
            name: user.name.clone(),
            email: user.email.clone(),
            ulpan: user.ulpan.clone(),
            active: true,
            created_at: at,
            created_by,
            updated_at: None,
            updated_by: None,
            deactivated_at: None,
            deactivated_by: None,
            activated_at: None,
            activated_by: None,
            last_login: None,
        };
        users.push(record.clone());
        drop(users);

        Ok(record)
    }

    async fn update_user(
        &self,
        user_id: i64,
        update: &UserUpdate,
        updated_by: i64,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, CrmError> {
        self.modify(user_id, |user| {
            if let Some(name) = &update.name {
                name.clone_into(&mut user.name);
            }
            if let Some(role) = update.role {
                user.role = role;
            }
            if let Some(email) = &update.email {
                user.email.clone_from(email);
            }
            if let Some(ulpan) = &update.ulpan {
                user.ulpan.clone_from(ulpan);
            }
            user.updated_at = Some(at);
            user.updated_by = Some(updated_by);
        })
    }

    async fn set_active(
        &self,
        user_id: i64,
        active: bool,
        actor: i64,
        at: DateTime<Utc>,
    ) -> Result<UserRecord, CrmError> {
        self.modify(user_id, |user| {
            user.active = active;
            if active {
                user.activated_at = Some(at);
                user.activated_by = Some(actor);
            } else {
                user.deactivated_at = Some(at);
                user.deactivated_by = Some(actor);
            }
        })
    }

    async fn update_password(
        &self,
        user_id: i64,
        hashed_password: &str,
        at: DateTime<Utc>,
    ) -> Result<(), CrmError> {
        self.modify(user_id, |user| {
            hashed_password.clone_into(&mut user.hashed_password);
            user.updated_at = Some(at);
            user.updated_by = Some(user_id);
        })
        .map(|_| ())
    }

    async fn record_login(&self, user_id: i64, at: DateTime<Utc>) -> Result<(), CrmError> {
        self.modify(user_id, |user| user.last_login = Some(at))
            .map(|_| ())
    }
}
