//! Session-keyed store of uploaded workbooks
//!
//! A caller uploads a workbook once, lists its sheets, then extracts any
//! sheet by token. Every upload keeps its own bytes; nothing is shared
//! between tokens.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ahash::AHashMap;
use carburant_extract::{ExtractOptions, Extraction};

use crate::error::{Error, Result};
use crate::workbook::Workbook;

/// Opaque handle to a stored upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UploadToken(u64);

impl fmt::Display for UploadToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "upload-{:08x}", self.0)
    }
}

/// Capacity settings for [`UploadStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadStoreOptions {
    /// Uploads kept at once; the oldest is evicted beyond this
    pub max_entries: usize,
}

impl Default for UploadStoreOptions {
    fn default() -> Self {
        Self { max_entries: 64 }
    }
}

struct Upload {
    name: String,
    workbook: Arc<Workbook>,
}

#[derive(Default)]
struct Entries {
    uploads: AHashMap<UploadToken, Upload>,
    order: VecDeque<UploadToken>,
}

/// Thread-safe upload store. Share it with `Arc`.
pub struct UploadStore {
    options: UploadStoreOptions,
    next_token: AtomicU64,
    entries: Mutex<Entries>,
}

impl Default for UploadStore {
    fn default() -> Self {
        Self::new(UploadStoreOptions::default())
    }
}

impl UploadStore {
    pub fn new(options: UploadStoreOptions) -> Self {
        Self {
            options,
            next_token: AtomicU64::new(1),
            entries: Mutex::new(Entries::default()),
        }
    }

    /// Validate and store `bytes`. The container is parsed here, so a bad
    /// upload fails immediately instead of at extraction time.
    pub fn put(&self, name: impl Into<String>, bytes: Vec<u8>) -> Result<UploadToken> {
        let name = name.into();
        let workbook = Workbook::from_bytes(bytes)?;
        let token = UploadToken(self.next_token.fetch_add(1, Ordering::Relaxed));

        let mut entries = self.lock();
        entries.uploads.insert(
            token,
            Upload {
                name: name.clone(),
                workbook: Arc::new(workbook),
            },
        );
        entries.order.push_back(token);

        while entries.uploads.len() > self.options.max_entries.max(1) {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            if let Some(evicted) = entries.uploads.remove(&oldest) {
                log::info!("Evicted upload {} ('{}')", oldest, evicted.name);
            }
        }

        log::info!("Stored upload {} ('{}')", token, name);
        Ok(token)
    }

    /// Sheet names of an upload, in workbook order
    pub fn sheets(&self, token: UploadToken) -> Result<Vec<String>> {
        Ok(self.workbook(token)?.sheet_names().to_vec())
    }

    /// Original file name of an upload
    pub fn name(&self, token: UploadToken) -> Result<String> {
        self.lock()
            .uploads
            .get(&token)
            .map(|u| u.name.clone())
            .ok_or(Error::UnknownUpload(token))
    }

    /// Run extraction on one sheet of an upload. The store is not locked
    /// while the sheet is decoded.
    pub fn extract(
        &self,
        token: UploadToken,
        sheet: &str,
        options: &ExtractOptions,
    ) -> Result<Extraction> {
        self.workbook(token)?.extract_sheet(sheet, options)
    }

    /// Drop an upload, returning whether it existed
    pub fn remove(&self, token: UploadToken) -> bool {
        let mut entries = self.lock();
        entries.order.retain(|t| *t != token);
        entries.uploads.remove(&token).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock().uploads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn workbook(&self, token: UploadToken) -> Result<Arc<Workbook>> {
        self.lock()
            .uploads
            .get(&token)
            .map(|u| Arc::clone(&u.workbook))
            .ok_or(Error::UnknownUpload(token))
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for UploadStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadStore")
            .field("options", &self.options)
            .field("len", &self.len())
            .finish()
    }
}
