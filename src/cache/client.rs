use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};

use super::{CacheKey, CacheStats, SheetCache};
use crate::gateway::{RemoteGateway, SheetData, SheetRange, WriteResult};
use crate::{CrmError, LOG_TARGET, SharedClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientStats {
    pub cache: CacheStats,
    pub remote_calls: u64,
    pub last_call: Option<DateTime<Utc>>,
}

/// Read-through access to sheets.
///
/// Every successful write drops the written sheet's cache entries before the
/// result is returned, so a following read never sees pre-write data.
pub struct SheetClient<G: RemoteGateway> {
    gateway: Arc<G>,
    cache: SheetCache,
    clock: SharedClock,
    remote_calls: AtomicU64,
    last_call: Mutex<Option<DateTime<Utc>>>,
}

impl<G: RemoteGateway> SheetClient<G> {
    pub fn new(gateway: Arc<G>, cache: SheetCache, clock: SharedClock) -> Self {
        Self {
            gateway,
            cache,
            clock,
            remote_calls: AtomicU64::new(0),
            last_call: Mutex::new(None),
        }
    }

    pub fn gateway(&self) -> &Arc<G> {
        &self.gateway
    }

    pub fn cache(&self) -> &SheetCache {
        &self.cache
    }

    fn note_call(&self) {
        self.remote_calls.fetch_add(1, Ordering::Relaxed);
        *self.last_call.lock().unwrap_or_else(PoisonError::into_inner) = Some(self.clock.utc());
    }

    /// Serves from cache while fresh, otherwise loads and caches.
    pub async fn read(&self, range: &SheetRange) -> Result<SheetData, CrmError> {
        let key = CacheKey::from(range);
        if let Some(data) = self.cache.lookup(&key) {
            log::debug!(target: LOG_TARGET, "msg=\"sheet served from cache\", range=\"{range}\"");
            return Ok(data);
        }
        self.load(range, key).await
    }

    /// Always goes to the backend; the result replaces any cached entry.
    pub async fn read_fresh(&self, range: &SheetRange) -> Result<SheetData, CrmError> {
        self.load(range, CacheKey::from(range)).await
    }

    /// A write to the sheet that lands while the read is in flight keeps the
    /// result out of the cache.
    async fn load(&self, range: &SheetRange, key: CacheKey) -> Result<SheetData, CrmError> {
        self.note_call();
        let generation = self.cache.generation(&range.sheet);
        let data = self.gateway.read_range(range).await?;
        self.cache.store_if_current(key, data.clone(), generation);
        Ok(data)
    }

    pub async fn append_row(&self, sheet: &str, row: &[String]) -> Result<WriteResult, CrmError> {
        self.note_call();
        let result = self.gateway.append_row(sheet, row).await?;
        self.cache.invalidate_sheet(sheet);
        log::info!(
            target: LOG_TARGET,
            "msg=\"row appended\", sheet=\"{sheet}\", cells={}",
            result.updated_cells
        );
        Ok(result)
    }

    pub async fn update_range(
        &self,
        range: &SheetRange,
        values: &[Vec<String>],
    ) -> Result<WriteResult, CrmError> {
        self.note_call();
        let result = self.gateway.update_range(range, values).await?;
        self.cache.invalidate_sheet(&range.sheet);
        log::info!(
            target: LOG_TARGET,
            "msg=\"range updated\", range=\"{range}\", cells={}",
            result.updated_cells
        );
        Ok(result)
    }

    pub async fn delete_row(&self, sheet: &str, row_index: u32) -> Result<(), CrmError> {
        self.note_call();
        self.gateway.delete_row(sheet, row_index).await?;
        self.cache.invalidate_sheet(sheet);
        log::info!(
            target: LOG_TARGET,
            "msg=\"row deleted\", sheet=\"{sheet}\", row={row_index}"
        );
        Ok(())
    }

    /// Creates `sheet` with `headers` as its first row unless it already
    /// exists. Returns whether a tab was created.
    pub async fn ensure_sheet(&self, sheet: &str, headers: &[String]) -> Result<bool, CrmError> {
        self.note_call();
        if self.gateway.sheet_id(sheet).await?.is_some() {
            return Ok(false);
        }
        self.note_call();
        let sheet_id = self.gateway.create_sheet(sheet, headers).await?;
        self.cache.invalidate_sheet(sheet);
        log::info!(
            target: LOG_TARGET,
            "msg=\"sheet created\", sheet=\"{sheet}\", sheet_id={sheet_id}, columns={}",
            headers.len()
        );
        Ok(true)
    }

    pub fn stats(&self) -> ClientStats {
        ClientStats {
            cache: self.cache.stats(),
            remote_calls: self.remote_calls.load(Ordering::Relaxed),
            last_call: *self.last_call.lock().unwrap_or_else(PoisonError::into_inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use async_trait::async_trait;
    use chrono::Duration;
    use tokio::sync::Notify;

    use super::*;
    use crate::gateway::{DriveFile, FileUpload, MockGateway, UploadedFile};
    use crate::test_support::MutableClock;

    /// Holds the first read after its snapshot is taken until released.
    struct HeldGateway {
        inner: MockGateway,
        hold: AtomicBool,
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl RemoteGateway for HeldGateway {
        async fn read_range(&self, range: &SheetRange) -> Result<SheetData, CrmError> {
            let data = self.inner.read_range(range).await;
            if self.hold.swap(false, Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            data
        }

        async fn append_row(&self, sheet: &str, row: &[String]) -> Result<WriteResult, CrmError> {
            self.inner.append_row(sheet, row).await
        }

        async fn update_range(
            &self,
            range: &SheetRange,
            values: &[Vec<String>],
        ) -> Result<WriteResult, CrmError> {
            self.inner.update_range(range, values).await
        }

        async fn delete_row(&self, sheet: &str, row_index: u32) -> Result<(), CrmError> {
            self.inner.delete_row(sheet, row_index).await
        }

        async fn upload_file(&self, upload: &FileUpload) -> Result<UploadedFile, CrmError> {
            self.inner.upload_file(upload).await
        }

        async fn list_files(&self, folder_id: &str) -> Result<Vec<DriveFile>, CrmError> {
            self.inner.list_files(folder_id).await
        }

        async fn delete_file(&self, file_id: &str) -> Result<(), CrmError> {
            self.inner.delete_file(file_id).await
        }

        async fn sheet_id(&self, sheet: &str) -> Result<Option<u64>, CrmError> {
            self.inner.sheet_id(sheet).await
        }

        async fn create_sheet(&self, sheet: &str, headers: &[String]) -> Result<u64, CrmError> {
            self.inner.create_sheet(sheet, headers).await
        }
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_owned()).collect()
    }

    fn client(clock: &Arc<MutableClock>) -> SheetClient<MockGateway> {
        let gateway = Arc::new(
            MockGateway::new().with_sheet("S", vec![row(&["ID", "ФИО"]), row(&["1", "Анна"])]),
        );
        SheetClient::new(
            gateway,
            SheetCache::new(Duration::minutes(10), clock.clone()),
            clock.clone(),
        )
    }

    #[tokio::test]
    async fn test_repeated_reads_hit_cache() {
        let clock = Arc::new(MutableClock::default());
        let client = client(&clock);
        let range = SheetRange::new("S", "A:Z");

        client.read(&range).await.unwrap();
        client.read(&range).await.unwrap();

        assert_eq!(client.gateway().calls.reads.load(Ordering::SeqCst), 1);
        assert_eq!(client.stats().cache.hits, 1);
        assert_eq!(client.stats().remote_calls, 1);
    }

    #[tokio::test]
    async fn test_write_invalidates_before_returning() {
        let clock = Arc::new(MutableClock::default());
        let client = client(&clock);
        let range = SheetRange::new("S", "A:Z");
        client.read(&range).await.unwrap();

        client
            .update_range(&SheetRange::row("S", 2, 2), &[row(&["1", "Анна Коэн"])])
            .await
            .unwrap();

        let data = client.read(&SheetRange::new("S", "A1:B2")).await.unwrap();
        assert_eq!(data.values[1][1], "Анна Коэн");
        let data = client.read(&range).await.unwrap();
        assert_eq!(data.values[1][1], "Анна Коэн");
    }

    #[tokio::test]
    async fn test_read_overlapping_write_not_cached() {
        let clock = Arc::new(MutableClock::default());
        let gateway = Arc::new(HeldGateway {
            inner: MockGateway::new().with_sheet("S", vec![row(&["ID", "ФИО"]), row(&["1", "old"])]),
            hold: AtomicBool::new(true),
            entered: Notify::new(),
            release: Notify::new(),
        });
        let client = Arc::new(SheetClient::new(
            Arc::clone(&gateway),
            SheetCache::new(Duration::minutes(10), clock.clone()),
            clock.clone(),
        ));
        let range = SheetRange::new("S", "A:Z");

        let reader = {
            let client = Arc::clone(&client);
            let range = range.clone();
            tokio::spawn(async move { client.read(&range).await })
        };
        gateway.entered.notified().await;

        client
            .update_range(&SheetRange::row("S", 2, 2), &[row(&["1", "new"])])
            .await
            .unwrap();
        gateway.release.notify_one();

        let in_flight = reader.await.unwrap().unwrap();
        assert_eq!(in_flight.values[1][1], "old");
        assert_eq!(client.read(&range).await.unwrap().values[1][1], "new");
    }

    #[tokio::test]
    async fn test_stale_after_ttl() {
        let clock = Arc::new(MutableClock::default());
        let client = client(&clock);
        let range = SheetRange::new("S", "A:Z");
        client.read(&range).await.unwrap();

        client.gateway().set_cell("S", 2, 2, "Борис");
        assert_eq!(client.read(&range).await.unwrap().values[1][1], "Анна");

        clock.advance(Duration::minutes(10));
        assert_eq!(client.read(&range).await.unwrap().values[1][1], "Борис");
    }

    #[tokio::test]
    async fn test_failed_write_propagates() {
        let clock = Arc::new(MutableClock::default());
        let client = client(&clock);

        let err = client.delete_row("missing", 2).await.unwrap_err();
        assert!(matches!(err, CrmError::Transport(_)));
    }

    #[tokio::test]
    async fn test_read_fresh_bypasses_cache() {
        let clock = Arc::new(MutableClock::default());
        let client = client(&clock);
        let range = SheetRange::new("S", "A:Z");
        client.read(&range).await.unwrap();
        client.gateway().set_cell("S", 2, 2, "Борис");

        assert_eq!(client.read_fresh(&range).await.unwrap().values[1][1], "Борис");
        assert_eq!(client.read(&range).await.unwrap().values[1][1], "Борис");
    }

    #[tokio::test]
    async fn test_ensure_sheet_creates_once() {
        let clock = Arc::new(MutableClock::default());
        let client = client(&clock);
        let headers = row(&["ID", "Дата"]);

        assert!(!client.ensure_sheet("S", &headers).await.unwrap());
        assert!(client.ensure_sheet("Архив", &headers).await.unwrap());
        assert!(!client.ensure_sheet("Архив", &headers).await.unwrap());

        let calls = &client.gateway().calls;
        assert_eq!(calls.sheet_creates.load(Ordering::SeqCst), 1);
        let data = client.read(&SheetRange::new("Архив", "A:Z")).await.unwrap();
        assert_eq!(data.values, vec![headers]);
    }
}
