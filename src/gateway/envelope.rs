//! Request bodies and the response envelope of the backend endpoint.

use serde::{Deserialize, Serialize};

use super::types::{cell_to_string, DriveFile};
use crate::{CrmError, SecretString};

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub(crate) enum Request<'a> {
    #[serde(rename_all = "camelCase")]
    AppendSheetData {
        range: String,
        values: Vec<&'a [String]>,
        access_token: &'a SecretString,
    },
    #[serde(rename_all = "camelCase")]
    UpdateSheetData {
        range: String,
        values: &'a [Vec<String>],
        access_token: &'a SecretString,
    },
    #[serde(rename_all = "camelCase")]
    DeleteSheetRow {
        sheet: &'a str,
        row_index: u32,
        access_token: &'a SecretString,
    },
    #[serde(rename_all = "camelCase")]
    UploadFile {
        folder_id: &'a str,
        file: FilePayload<'a>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<&'a str>,
        access_token: &'a SecretString,
    },
    #[serde(rename_all = "camelCase")]
    DeleteFile {
        file_id: &'a str,
        access_token: &'a SecretString,
    },
    #[serde(rename_all = "camelCase")]
    CreateSheet {
        sheet_name: &'a str,
        headers: &'a [String],
        access_token: &'a SecretString,
    },
}

impl Request<'_> {
    pub(crate) fn action(&self) -> &'static str {
        match self {
            Self::AppendSheetData { .. } => "appendSheetData",
            Self::UpdateSheetData { .. } => "updateSheetData",
            Self::DeleteSheetRow { .. } => "deleteSheetRow",
            Self::UploadFile { .. } => "uploadFile",
            Self::DeleteFile { .. } => "deleteFile",
            Self::CreateSheet { .. } => "createSheet",
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FilePayload<'a> {
    pub name: &'a str,
    pub mime_type: &'a str,
    /// Base64, standard alphabet.
    pub bytes: String,
}

/// `{success, data?, error?, ...}` as returned by every action.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub data: Option<SheetPayload>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub updated_cells: Option<u64>,
    #[serde(default)]
    pub updated_range: Option<String>,
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub web_view_link: Option<String>,
    #[serde(default)]
    pub files: Option<Vec<DriveFile>>,
    #[serde(default)]
    pub sheet_id: Option<u64>,
}

/// Read payloads come either as a bare grid or wrapped with the range.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum SheetPayload {
    Grid(Vec<Vec<serde_json::Value>>),
    Ranged {
        #[serde(default)]
        range: Option<String>,
        #[serde(default)]
        values: Vec<Vec<serde_json::Value>>,
    },
}

impl SheetPayload {
    pub(crate) fn into_parts(self) -> (Option<String>, Vec<Vec<String>>) {
        let (range, grid) = match self {
            Self::Grid(grid) => (None, grid),
            Self::Ranged { range, values } => (range, values),
        };
        let values = grid
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        (range, values)
    }
}

impl Envelope {
    /// Turns a non-success envelope into a transport error carrying the
    /// backend's reason.
    pub(crate) fn into_success(self, action: &str) -> Result<Self, CrmError> {
        if self.success {
            Ok(self)
        } else {
            let reason = self.error.as_deref().unwrap_or("no error message");
            Err(CrmError::Transport(format!("{action} failed: {reason}")))
        }
    }
}
