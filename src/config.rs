//! Configuration types for the CRM client.
//!
//! A single [`CrmConfig`] is built at startup and threaded through the
//! constructors of every service.
//!
//! # Example
//!
//! ```rust
//! use ulpan_crm::config::{CrmConfig, GatewayConfig, SessionConfig};
//! use chrono::Duration;
//! use url::Url;
//!
//! let endpoint = Url::parse("https://script.example.com/exec").unwrap();
//! let config = CrmConfig {
//!     gateway: GatewayConfig::new(endpoint),
//!     session: SessionConfig {
//!         inactivity_timeout: Duration::minutes(15),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! ```

use std::collections::HashMap;
use std::time::Duration as StdDuration;

use chrono::Duration;
use url::Url;

use crate::CrmError;
use crate::facade::{DocumentType, StudentField};

/// Main configuration struct.
#[derive(Debug, Clone, Default)]
pub struct CrmConfig {
    pub session: SessionConfig,
    pub cache: CacheConfig,
    pub gateway: GatewayConfig,
    pub sheets: SheetConfig,
    pub documents: DocumentConfig,
}

impl CrmConfig {
    /// Creates a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Longer sessions and a short cache, for working against a test sheet.
    pub fn development() -> Self {
        Self {
            session: SessionConfig {
                session_timeout: Duration::hours(24),
                inactivity_timeout: Duration::hours(2),
                ..Default::default()
            },
            cache: CacheConfig {
                ttl: Duration::minutes(1),
            },
            ..Default::default()
        }
    }

    /// Shorter sessions and stricter inactivity handling.
    pub fn strict() -> Self {
        Self {
            session: SessionConfig {
                session_timeout: Duration::hours(4),
                inactivity_timeout: Duration::minutes(10),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Checks the settings that would otherwise only fail at first use.
    ///
    /// # Errors
    ///
    /// Returns `CrmError::ConfigurationError` naming the first invalid setting.
    pub fn validate(&self) -> Result<(), CrmError> {
        self.session.validate()?;
        if self.cache.ttl <= Duration::zero() {
            return Err(CrmError::ConfigurationError(
                "cache ttl must be positive".to_owned(),
            ));
        }
        if self.gateway.endpoint.is_none() {
            return Err(CrmError::ConfigurationError(
                "gateway endpoint is not configured".to_owned(),
            ));
        }
        if self.sheets.main_sheet.trim().is_empty() {
            return Err(CrmError::ConfigurationError(
                "main sheet name must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Session lifetime and persistence settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Absolute session lifetime measured from login.
    ///
    /// Default: 8 hours
    pub session_timeout: Duration,

    /// Maximum idle time between tracked interactions.
    ///
    /// Default: 30 minutes
    pub inactivity_timeout: Duration,

    /// How often the inactivity monitor runs.
    ///
    /// Default: 1 minute
    pub activity_check_interval: StdDuration,

    /// Key under which the session blob is persisted.
    pub storage_key: String,

    /// Minimum password length for new and changed passwords.
    ///
    /// Default: 6
    pub min_password_length: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::hours(8),
            inactivity_timeout: Duration::minutes(30),
            activity_check_interval: StdDuration::from_secs(60),
            storage_key: "ulpan_crm_session".to_owned(),
            min_password_length: 6,
        }
    }
}

impl SessionConfig {
    fn validate(&self) -> Result<(), CrmError> {
        if self.session_timeout <= Duration::zero() || self.inactivity_timeout <= Duration::zero()
        {
            return Err(CrmError::ConfigurationError(
                "session timeouts must be positive".to_owned(),
            ));
        }
        if self.activity_check_interval > StdDuration::from_secs(60) {
            return Err(CrmError::ConfigurationError(
                "activity check must run at least once per minute".to_owned(),
            ));
        }
        if self.storage_key.is_empty()
            || !self
                .storage_key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(CrmError::ConfigurationError(
                "storage key must be a non-empty [A-Za-z0-9_-] string".to_owned(),
            ));
        }
        Ok(())
    }
}

/// Spreadsheet read cache settings.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Default: 10 minutes
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(10),
        }
    }
}

/// Backend endpoint settings.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Deployed backend script URL. Required.
    pub endpoint: Option<Url>,

    /// Transport timeout for a single request.
    ///
    /// Default: 30 seconds
    pub request_timeout: StdDuration,

    /// A credential expiring within this margin is refreshed before use.
    ///
    /// Default: 5 minutes
    pub refresh_margin: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            request_timeout: StdDuration::from_secs(30),
            refresh_margin: Duration::minutes(5),
        }
    }
}

impl GatewayConfig {
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint: Some(endpoint),
            ..Default::default()
        }
    }
}

/// Sheet names and layout of the backing spreadsheet.
#[derive(Debug, Clone)]
pub struct SheetConfig {
    /// Student sheet. Row 1 holds the headers.
    pub main_sheet: String,

    /// Column span read when loading the student sheet.
    pub main_range: String,

    /// Column order used for student writes.
    pub main_headers: Vec<StudentField>,

    /// Name written to the modifier column when no user is known.
    pub system_actor: String,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            main_sheet: "Ученики".to_owned(),
            main_range: "A:Z".to_owned(),
            main_headers: StudentField::ALL.to_vec(),
            system_actor: "Система".to_owned(),
        }
    }
}

/// Upload rules for one document type.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPolicy {
    pub display_name: String,
    pub required: bool,
    pub max_size_bytes: u64,
    /// Lowercase extensions without the leading dot.
    pub allowed_extensions: Vec<String>,
    /// Storage folder id, if one is configured for this type.
    pub folder_id: Option<String>,
}

impl DocumentPolicy {
    fn new(display_name: &str, required: bool, max_size_mb: u64) -> Self {
        Self {
            display_name: display_name.to_owned(),
            required,
            max_size_bytes: max_size_mb * 1024 * 1024,
            allowed_extensions: ["pdf", "jpg", "jpeg", "png"]
                .iter()
                .map(|ext| (*ext).to_owned())
                .collect(),
            folder_id: None,
        }
    }
}

/// Per-document-type upload policies.
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub policies: HashMap<DocumentType, DocumentPolicy>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        let policies = DocumentType::ALL
            .iter()
            .map(|doc_type| {
                let policy = match doc_type {
                    DocumentType::TzPhoto => DocumentPolicy::new("Фото удостоверения", true, 5),
                    DocumentType::Voucher => DocumentPolicy::new("Ваучер", true, 3),
                    DocumentType::Payment200 => {
                        DocumentPolicy::new("Справка об оплате 200₪", false, 3)
                    }
                    DocumentType::IshurArshama => {
                        DocumentPolicy::new("Справка о регистрации", false, 3)
                    }
                    DocumentType::IshurTkhilat => {
                        DocumentPolicy::new("Справка о начале обучения", false, 3)
                    }
                    DocumentType::Receipt5000 => DocumentPolicy::new("Квитанция 5000₪", false, 3),
                    DocumentType::Receipt200 => DocumentPolicy::new("Квитанция 200₪", false, 3),
                };
                (*doc_type, policy)
            })
            .collect();
        Self { policies }
    }
}

impl DocumentConfig {
    /// Assigns the storage folder for a document type.
    #[must_use]
    pub fn with_folder(mut self, doc_type: DocumentType, folder_id: impl Into<String>) -> Self {
        if let Some(policy) = self.policies.get_mut(&doc_type) {
            policy.folder_id = Some(folder_id.into());
        }
        self
    }

    pub fn policy(&self, doc_type: DocumentType) -> Option<&DocumentPolicy> {
        self.policies.get(&doc_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Url {
        Url::parse("https://script.example.com/exec").unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = CrmConfig::default();

        assert_eq!(config.session.session_timeout, Duration::hours(8));
        assert_eq!(config.session.inactivity_timeout, Duration::minutes(30));
        assert_eq!(config.session.activity_check_interval, StdDuration::from_secs(60));
        assert_eq!(config.session.min_password_length, 6);
        assert_eq!(config.cache.ttl, Duration::minutes(10));
        assert_eq!(config.gateway.refresh_margin, Duration::minutes(5));
        assert_eq!(config.sheets.main_headers.len(), StudentField::ALL.len());
    }

    #[test]
    fn test_validate_requires_endpoint() {
        let config = CrmConfig::default();
        assert!(matches!(
            config.validate(),
            Err(CrmError::ConfigurationError(_))
        ));

        let config = CrmConfig {
            gateway: GatewayConfig::new(endpoint()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_slow_activity_check() {
        let config = CrmConfig {
            gateway: GatewayConfig::new(endpoint()),
            session: SessionConfig {
                activity_check_interval: StdDuration::from_secs(300),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_path_like_storage_key() {
        let config = CrmConfig {
            gateway: GatewayConfig::new(endpoint()),
            session: SessionConfig {
                storage_key: "../session".to_owned(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_document_policies() {
        let config = DocumentConfig::default().with_folder(DocumentType::Voucher, "folder-v");

        let tz = config.policy(DocumentType::TzPhoto).unwrap();
        assert_eq!(tz.max_size_bytes, 5 * 1024 * 1024);
        assert!(tz.required);

        let payment = config.policy(DocumentType::Payment200).unwrap();
        assert_eq!(payment.max_size_bytes, 3 * 1024 * 1024);
        assert!(payment.folder_id.is_none());

        let voucher = config.policy(DocumentType::Voucher).unwrap();
        assert_eq!(voucher.folder_id.as_deref(), Some("folder-v"));
    }

    #[test]
    fn test_presets() {
        assert_eq!(
            CrmConfig::strict().session.inactivity_timeout,
            Duration::minutes(10)
        );
        assert_eq!(CrmConfig::development().cache.ttl, Duration::minutes(1));
    }
}
