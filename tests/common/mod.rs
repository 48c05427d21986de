//! Fixtures shared by the integration tests.

#![allow(dead_code, clippy::unwrap_used)]

use std::sync::Arc;

use chrono::Utc;
use ulpan_crm::config::SessionConfig;
use ulpan_crm::crypto::{Argon2Hasher, PasswordHasher};
use ulpan_crm::facade::StudentField;
use ulpan_crm::session::InMemorySessionStore;
use ulpan_crm::test_support::MutableClock;
use ulpan_crm::{
    InMemoryLoginAuditRepository, InMemoryUserRepository, NewUser, Role, SecretString,
    SessionManager, UserRepository,
};

pub type Manager = SessionManager<InMemoryUserRepository, InMemoryLoginAuditRepository>;

pub struct Deployment {
    pub clock: Arc<MutableClock>,
    pub users: InMemoryUserRepository,
    pub audit: InMemoryLoginAuditRepository,
    pub durable: InMemorySessionStore,
    pub config: SessionConfig,
}

impl Deployment {
    /// Seeds `admin/admin123`, `teacher1/teach123` (ulpan Шалом) and
    /// `ulpan_alef/alef123` (ulpan Алеф).
    pub async fn new() -> Self {
        Self::with_config(SessionConfig::default()).await
    }

    pub async fn with_config(config: SessionConfig) -> Self {
        let users = InMemoryUserRepository::new();
        seed(&users, "admin", "admin123", Role::Admin, None).await;
        seed(&users, "teacher1", "teach123", Role::Teacher, Some("Шалом")).await;
        seed(&users, "ulpan_alef", "alef123", Role::Ulpan, Some("Алеф")).await;
        Self {
            clock: Arc::new(MutableClock::default()),
            users,
            audit: InMemoryLoginAuditRepository::new(),
            durable: InMemorySessionStore::new(),
            config,
        }
    }

    /// A fresh tab: new volatile storage, shared durable storage.
    pub fn open_tab(&self) -> Manager {
        self.open_tab_with(InMemorySessionStore::new())
    }

    pub fn open_tab_with(&self, volatile: InMemorySessionStore) -> Manager {
        SessionManager::new(
            self.users.clone(),
            self.audit.clone(),
            Arc::new(volatile),
            Arc::new(self.durable.clone()),
            self.config.clone(),
            self.clock.clone(),
        )
        .with_hasher(Argon2Hasher::fast())
    }
}

pub async fn seed(
    users: &InMemoryUserRepository,
    username: &str,
    password: &str,
    role: Role,
    ulpan: Option<&str>,
) {
    let user = NewUser {
        username: username.to_owned(),
        password: SecretString::new(password),
        role,
        name: format!("{username} name"),
        email: None,
        ulpan: ulpan.map(str::to_owned),
    };
    let hash = Argon2Hasher::fast().hash(password).unwrap();
    users.create_user(&user, &hash, None, Utc::now()).await.unwrap();
}

pub fn header_row() -> Vec<String> {
    StudentField::ALL.iter().map(|f| f.header().to_owned()).collect()
}

pub fn student_row(id: &str, name: &str, ulpan: &str) -> Vec<String> {
    let mut row = vec![String::new(); StudentField::ALL.len()];
    row[0] = id.to_owned();
    row[1] = name.to_owned();
    row[8] = ulpan.to_owned();
    row
}
