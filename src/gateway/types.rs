use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::SheetRange;

/// A value grid read from the backend.
///
/// Cells are normalized to strings; empty and missing cells are `""`.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    /// Effective range reported by the backend, or the requested one.
    pub range: SheetRange,
    pub values: Vec<Vec<String>>,
    pub fetched_at: DateTime<Utc>,
}

impl SheetData {
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WriteResult {
    pub updated_cells: u64,
    pub updated_range: Option<String>,
}

/// A binary payload bound for a storage folder.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub folder_id: String,
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub file_id: String,
    pub web_view_link: Option<String>,
}

/// A file listed from a storage folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_size")]
    pub size: Option<u64>,
    #[serde(default)]
    pub web_view_link: Option<String>,
}

// storage APIs report sizes as decimal strings
fn lenient_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64(),
        Some(serde_json::Value::String(s)) => s.parse().ok(),
        _ => None,
    })
}

pub(crate) fn cell_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_normalized() {
        assert_eq!(cell_to_string(serde_json::json!(null)), "");
        assert_eq!(cell_to_string(serde_json::json!("a")), "a");
        assert_eq!(cell_to_string(serde_json::json!(5000)), "5000");
        assert_eq!(cell_to_string(serde_json::json!(true)), "true");
    }

    #[test]
    fn test_drive_file_accepts_string_size() {
        let file: DriveFile = serde_json::from_str(
            r#"{"id":"f1","name":"STD_1_ABCDE_VOUCHER_2024-01-01.pdf","size":"1024",
                "createdTime":"2024-01-01T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(file.size, Some(1024));
        assert!(file.created_time.is_some());
        assert_eq!(file.web_view_link, None);
    }
}
