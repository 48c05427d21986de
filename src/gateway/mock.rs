#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use super::types::{DriveFile, FileUpload, SheetData, UploadedFile, WriteResult};
use super::{RemoteGateway, SheetRange};
use crate::CrmError;

/// Per-operation call counters.
#[derive(Debug, Default)]
pub struct GatewayCalls {
    pub reads: AtomicUsize,
    pub appends: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub uploads: AtomicUsize,
    pub lists: AtomicUsize,
    pub file_deletes: AtomicUsize,
    pub sheet_creates: AtomicUsize,
}

impl GatewayCalls {
    pub fn total(&self) -> usize {
        [
            &self.reads,
            &self.appends,
            &self.updates,
            &self.deletes,
            &self.uploads,
            &self.lists,
            &self.file_deletes,
            &self.sheet_creates,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

/// In-memory backend: sheets are row vectors, folders are file lists.
///
/// Reads always return the whole sheet regardless of the requested span.
#[derive(Default)]
pub struct MockGateway {
    pub sheets: Mutex<HashMap<String, Vec<Vec<String>>>>,
    pub folders: Mutex<HashMap<String, Vec<DriveFile>>>,
    pub uploads: Mutex<Vec<FileUpload>>,
    failing_folders: Mutex<HashSet<String>>,
    sheet_ids: Mutex<HashMap<String, u64>>,
    next_file: AtomicUsize,
    pub calls: GatewayCalls,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(self, sheet: &str, rows: Vec<Vec<String>>) -> Self {
        self.register_sheet(sheet);
        self.sheets.lock().unwrap().insert(sheet.to_owned(), rows);
        self
    }

    fn register_sheet(&self, sheet: &str) -> u64 {
        let mut ids = self.sheet_ids.lock().unwrap();
        let next = ids.len() as u64 + 1;
        *ids.entry(sheet.to_owned()).or_insert(next)
    }

    pub fn add_file(&self, folder_id: &str, file: DriveFile) {
        self.folders
            .lock()
            .unwrap()
            .entry(folder_id.to_owned())
            .or_default()
            .push(file);
    }

    /// Makes `list_files` on this folder fail.
    pub fn fail_folder(&self, folder_id: &str) {
        self.failing_folders
            .lock()
            .unwrap()
            .insert(folder_id.to_owned());
    }

    pub fn rows(&self, sheet: &str) -> Vec<Vec<String>> {
        self.sheets
            .lock()
            .unwrap()
            .get(sheet)
            .cloned()
            .unwrap_or_default()
    }

    /// Edits a sheet behind the client's back.
    pub fn set_cell(&self, sheet: &str, row_index: usize, column: usize, value: &str) {
        let mut sheets = self.sheets.lock().unwrap();
        let rows = sheets.entry(sheet.to_owned()).or_default();
        if rows.len() < row_index {
            rows.resize(row_index, Vec::new());
        }
        let row = &mut rows[row_index - 1];
        if row.len() < column {
            row.resize(column, String::new());
        }
        row[column - 1] = value.to_owned();
    }
}

fn cells(values: &[Vec<String>]) -> u64 {
    values.iter().map(|row| row.len() as u64).sum()
}

#[async_trait]
impl RemoteGateway for MockGateway {
    async fn read_range(&self, range: &SheetRange) -> Result<SheetData, CrmError> {
        self.calls.reads.fetch_add(1, Ordering::SeqCst);
        let sheets = self.sheets.lock().unwrap();
        let values = sheets
            .get(&range.sheet)
            .cloned()
            .ok_or_else(|| CrmError::Transport(format!("no sheet named {}", range.sheet)))?;
        Ok(SheetData {
            range: range.clone(),
            values,
            fetched_at: Utc::now(),
        })
    }

    async fn append_row(&self, sheet: &str, row: &[String]) -> Result<WriteResult, CrmError> {
        self.calls.appends.fetch_add(1, Ordering::SeqCst);
        let mut sheets = self.sheets.lock().unwrap();
        let rows = sheets.entry(sheet.to_owned()).or_default();
        rows.push(row.to_vec());
        Ok(WriteResult {
            updated_cells: row.len() as u64,
            updated_range: Some(SheetRange::row(sheet, rows.len() as u32, row.len()).to_string()),
        })
    }

    async fn update_range(
        &self,
        range: &SheetRange,
        values: &[Vec<String>],
    ) -> Result<WriteResult, CrmError> {
        self.calls.updates.fetch_add(1, Ordering::SeqCst);
        let start = range
            .start_row()
            .ok_or_else(|| CrmError::Transport(format!("unsupported range {range}")))?
            as usize;

        let mut sheets = self.sheets.lock().unwrap();
        let rows = sheets.entry(range.sheet.clone()).or_default();
        for (offset, row) in values.iter().enumerate() {
            let index = start - 1 + offset;
            if rows.len() <= index {
                rows.resize(index + 1, Vec::new());
            }
            rows[index] = row.clone();
        }
        Ok(WriteResult {
            updated_cells: cells(values),
            updated_range: Some(range.to_string()),
        })
    }

    async fn delete_row(&self, sheet: &str, row_index: u32) -> Result<(), CrmError> {
        self.calls.deletes.fetch_add(1, Ordering::SeqCst);
        let mut sheets = self.sheets.lock().unwrap();
        let rows = sheets
            .get_mut(sheet)
            .ok_or_else(|| CrmError::Transport(format!("no sheet named {sheet}")))?;
        let index = row_index as usize;
        if index == 0 || index > rows.len() {
            return Err(CrmError::Transport(format!("row {row_index} out of range")));
        }
        rows.remove(index - 1);
        Ok(())
    }

    async fn upload_file(&self, upload: &FileUpload) -> Result<UploadedFile, CrmError> {
        self.calls.uploads.fetch_add(1, Ordering::SeqCst);
        let id = format!("file-{}", self.next_file.fetch_add(1, Ordering::SeqCst) + 1);
        let link = format!("https://drive.example/{id}/view");
        self.uploads.lock().unwrap().push(upload.clone());
        self.add_file(
            &upload.folder_id,
            DriveFile {
                id: id.clone(),
                name: upload.file_name.clone(),
                mime_type: Some(upload.mime_type.clone()),
                created_time: Some(Utc::now()),
                size: Some(upload.bytes.len() as u64),
                web_view_link: Some(link.clone()),
            },
        );
        Ok(UploadedFile {
            file_id: id,
            web_view_link: Some(link),
        })
    }

    async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>, CrmError> {
        self.calls.lists.fetch_add(1, Ordering::SeqCst);
        if self.failing_folders.lock().unwrap().contains(folder_id) {
            return Err(CrmError::Transport(format!("listFiles failed for {folder_id}")));
        }
        Ok(self
            .folders
            .lock()
            .unwrap()
            .get(folder_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), CrmError> {
        self.calls.file_deletes.fetch_add(1, Ordering::SeqCst);
        let mut folders = self.folders.lock().unwrap();
        let mut found = false;
        for files in folders.values_mut() {
            let before = files.len();
            files.retain(|f| f.id != file_id);
            found |= files.len() != before;
        }
        if found {
            Ok(())
        } else {
            Err(CrmError::Transport(format!("no file {file_id}")))
        }
    }

    async fn sheet_id(&self, sheet: &str) -> Result<Option<u64>, CrmError> {
        if !self.sheets.lock().unwrap().contains_key(sheet) {
            return Ok(None);
        }
        Ok(Some(self.register_sheet(sheet)))
    }

    async fn create_sheet(&self, sheet: &str, headers: &[String]) -> Result<u64, CrmError> {
        self.calls.sheet_creates.fetch_add(1, Ordering::SeqCst);
        let mut sheets = self.sheets.lock().unwrap();
        if sheets.contains_key(sheet) {
            return Err(CrmError::Transport(format!("sheet {sheet} already exists")));
        }
        let rows = if headers.is_empty() {
            Vec::new()
        } else {
            vec![headers.to_vec()]
        };
        sheets.insert(sheet.to_owned(), rows);
        drop(sheets);
        Ok(self.register_sheet(sheet))
    }
}
