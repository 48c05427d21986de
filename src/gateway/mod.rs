//! RPC boundary to the spreadsheet and file-storage backend.
//!
//! [`RemoteGateway`] is the seam the rest of the crate depends on.
//! [`HttpGateway`] talks to the deployed backend script; with the `mocks`
//! feature, [`MockGateway`] keeps sheets and folders in memory.

pub mod credential;
mod envelope;
mod http;
#[cfg(any(test, feature = "mocks"))]
mod mock;
mod range;
mod types;

use async_trait::async_trait;

pub use credential::{AccessCredential, CredentialGuard, CredentialProvider, InMemoryCredentialProvider};
pub use http::HttpGateway;
#[cfg(any(test, feature = "mocks"))]
pub use mock::{GatewayCalls, MockGateway};
pub use range::{column_index, column_letter, SheetRange};
pub use types::{DriveFile, FileUpload, SheetData, UploadedFile, WriteResult};

use crate::CrmError;

/// Range-addressed access to the backing spreadsheet plus file storage.
///
/// Failures come back as `Err`; nothing here panics on a bad response.
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn read_range(&self, range: &SheetRange) -> Result<SheetData, CrmError>;

    /// Appends one row after the last populated row of `sheet`.
    async fn append_row(&self, sheet: &str, row: &[String]) -> Result<WriteResult, CrmError>;

    /// Overwrites `range` in place.
    async fn update_range(
        &self,
        range: &SheetRange,
        values: &[Vec<String>],
    ) -> Result<WriteResult, CrmError>;

    /// Removes a 1-based row. Later rows shift up.
    async fn delete_row(&self, sheet: &str, row_index: u32) -> Result<(), CrmError>;

    async fn upload_file(&self, upload: &FileUpload) -> Result<UploadedFile, CrmError>;

    async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>, CrmError>;

    async fn delete_file(&self, file_id: &str) -> Result<(), CrmError>;

    /// Numeric id of the tab titled `sheet`, or `None` when there is no such tab.
    async fn sheet_id(&self, sheet: &str) -> Result<Option<u64>, CrmError>;

    /// Adds a tab titled `sheet` and writes `headers` as its first row.
    async fn create_sheet(&self, sheet: &str, headers: &[String]) -> Result<u64, CrmError>;
}
