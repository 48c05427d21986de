//! Session, authorization and spreadsheet-backed data access for the ulpan
//! voucher CRM.
//!
//! The crate is organised leaf-first:
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`gateway`] | RPC boundary to the spreadsheet/storage backend |
//! | [`cache`] | Per-sheet TTL cache and the read-through [`cache::SheetClient`] |
//! | [`authz`] | Roles, permissions and ulpan-scope rules |
//! | [`session`] | Session lifecycle, persistence and inactivity tracking |
//! | [`actions`] | Login, logout and user administration |
//! | [`facade`] | Student and document managers |
//!
//! Services are constructed once from a [`CrmConfig`] and shared by reference.

pub mod actions;
pub mod authz;
pub mod cache;
pub mod config;
pub mod crypto;
pub mod facade;
pub mod gateway;
pub mod repository;
mod secret;
pub mod session;
pub mod validators;

#[cfg(any(test, feature = "mocks"))]
pub mod test_support;

pub use authz::{AuthorizationPolicy, Permission, Role};
pub use config::CrmConfig;
pub use repository::{
    InMemoryLoginAuditRepository, InMemoryUserRepository, LoginAuditEntry,
    LoginAuditRepository, LoginOutcome, NewUser, UserProfile, UserRecord, UserRepository,
    UserUpdate,
};
pub use secret::SecretString;
pub use session::{Session, SessionManager, SessionUser};
pub use validators::ValidationError;

use std::fmt;
use std::sync::Arc;

use mockable::Clock;

/// Wall clock shared by every time-dependent service.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// Log target used by every component of the crate.
pub(crate) const LOG_TARGET: &str = "ulpan_crm";

#[derive(Debug, Clone, PartialEq)]
pub enum CrmError {
    /// Unknown username, wrong password or inactive account. Deliberately vague.
    InvalidCredentials,
    NotAuthenticated,
    SessionExpired,
    /// The delegated-access credential is missing or could not be refreshed.
    ReauthorizationRequired,
    PermissionDenied(String),
    Validation(ValidationError),
    UserAlreadyExists,
    UserNotFound,
    StudentNotFound(String),
    DocumentNotFound(String),
    /// Network failure or a non-success backend envelope. The detail is for logs only.
    Transport(String),
    /// Session store I/O failure.
    Storage(String),
    ConfigurationError(String),
    Internal(String),
}

impl std::error::Error for CrmError {}

impl fmt::Display for CrmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "Invalid username or password"),
            Self::NotAuthenticated => write!(f, "Not authenticated"),
            Self::SessionExpired => write!(f, "Session has expired"),
            Self::ReauthorizationRequired => write!(f, "Reauthorization required"),
            Self::PermissionDenied(missing) => write!(f, "Permission denied: requires {missing}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::UserAlreadyExists => write!(f, "A user with this username already exists"),
            Self::UserNotFound => write!(f, "User not found"),
            Self::StudentNotFound(id) => write!(f, "Student {id} not found"),
            Self::DocumentNotFound(id) => write!(f, "Document {id} not found"),
            Self::Transport(_) => write!(f, "Could not complete operation"),
            Self::Storage(_) => write!(f, "Could not access session storage"),
            Self::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl From<ValidationError> for CrmError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl CrmError {
    /// True for errors a view should answer by sending the user back to login.
    pub fn is_expiry(&self) -> bool {
        matches!(
            self,
            Self::SessionExpired | Self::NotAuthenticated | Self::ReauthorizationRequired
        )
    }
}
