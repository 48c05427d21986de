//! Repository traits and data types for staff accounts.
//!
//! # Traits
//!
//! | Trait | Description |
//! |-------|-------------|
//! | [`UserRepository`] | Staff account storage |
//! | [`LoginAuditRepository`] | Login attempt history |
//!
//! # Implementations
//!
//! The crate ships in-memory implementations of both traits. Implement the
//! traits yourself to keep accounts somewhere else.

mod audit_log;
mod audit_log_memory;
mod user;
mod user_memory;

pub use audit_log::{LoginAuditEntry, LoginAuditRepository, LoginOutcome};
pub use audit_log_memory::InMemoryLoginAuditRepository;
pub use user::{NewUser, UserProfile, UserRecord, UserRepository, UserUpdate};
pub use user_memory::InMemoryUserRepository;
