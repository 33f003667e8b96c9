//! # Service Module
//!
//! Request/response handlers for the two flows of the tool.
//!
//! ## Register
//! For every uploaded image: fingerprint it, store the bytes in the blob
//! store, then insert a reference record. An image that cannot be decoded
//! is reported and skipped; a storage failure aborts the batch.
//!
//! ## Compare
//! Fingerprint the query, load every reference, rank them.
//!
//! ## Example
//! ```rust,ignore
//! let service = SimilarityService::from_config(&config)?;
//! let report = service.register(RegisterRequest::new(uploads, None))?;
//! let result = service.compare(CompareRequest::new(query, 40.0, 5))?;
//! ```

mod requests;

pub use requests::{
    CompareReport, CompareRequest, ImageUpload, RegisterReport, RegisterRequest,
    RegisteredImage, RegistrationFailure,
};

use crate::config::AppConfig;
use crate::core::codec::FingerprintCodec;
use crate::core::hasher::{Fingerprint, FingerprintExtractor, HasherConfig, DEFAULT_HASH_SIZE};
use crate::core::ranking::{self, RankParams};
use crate::core::store::{
    normalize_annotation, AnnotationUpdate, BlobStore, FsBlobStore, InMemoryBlobStore,
    InMemoryRecordStore, NewReference, RecordStore, ReferenceRecord, SqliteRecordStore,
};
use crate::error::{Result, SimilarityError, StoreError};
use crate::events::{
    null_sender, CompareEvent, CompareSummary, Event, EventSender, RegisterEvent,
    RegisterProgress,
};
use chrono::Utc;
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

/// Builder for the service
pub struct SimilarityServiceBuilder {
    hash_size: u32,
    key_prefix: String,
    blobs: Option<Box<dyn BlobStore>>,
    records: Option<Box<dyn RecordStore>>,
}

impl SimilarityServiceBuilder {
    /// Create a builder with defaults and in-memory stores
    pub fn new() -> Self {
        Self {
            hash_size: DEFAULT_HASH_SIZE,
            key_prefix: "source-images".to_string(),
            blobs: None,
            records: None,
        }
    }

    /// Set the fingerprint hash size
    pub fn hash_size(mut self, hash_size: u32) -> Self {
        self.hash_size = hash_size;
        self
    }

    /// Set the blob key prefix
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the blob store
    pub fn blob_store(mut self, store: Box<dyn BlobStore>) -> Self {
        self.blobs = Some(store);
        self
    }

    /// Set the record store
    pub fn record_store(mut self, store: Box<dyn RecordStore>) -> Self {
        self.records = Some(store);
        self
    }

    /// Build the service
    pub fn build(self) -> Result<SimilarityService> {
        let extractor = HasherConfig::new().hash_size(self.hash_size).build()?;
        let codec = FingerprintCodec::new(extractor.bit_count());

        Ok(SimilarityService {
            extractor,
            codec,
            key_prefix: self.key_prefix.trim_matches('/').to_string(),
            blobs: self
                .blobs
                .unwrap_or_else(|| Box::new(InMemoryBlobStore::new())),
            records: self
                .records
                .unwrap_or_else(|| Box::new(InMemoryRecordStore::new())),
        })
    }
}

impl Default for SimilarityServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Registers reference images and compares query images against them
pub struct SimilarityService {
    extractor: FingerprintExtractor,
    codec: FingerprintCodec,
    key_prefix: String,
    blobs: Box<dyn BlobStore>,
    records: Box<dyn RecordStore>,
}

impl SimilarityService {
    /// Create a new service builder
    pub fn builder() -> SimilarityServiceBuilder {
        SimilarityServiceBuilder::new()
    }

    /// Open the SQLite record store and filesystem blob store named in `config`
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate()?;

        let records = SqliteRecordStore::open(&config.database_path)?;
        let blobs = FsBlobStore::open(&config.blob_root)?;

        tracing::debug!(
            database = %config.database_path.display(),
            blobs = %config.blob_root.display(),
            "Opened stores"
        );

        Self::builder()
            .hash_size(config.hash_size)
            .key_prefix(config.key_prefix.clone())
            .blob_store(Box::new(blobs))
            .record_store(Box::new(records))
            .build()
    }

    /// The codec used for stored fingerprints
    pub fn codec(&self) -> &FingerprintCodec {
        &self.codec
    }

    /// Register a batch without progress events
    pub fn register(&self, request: RegisterRequest) -> Result<RegisterReport> {
        self.register_with_events(request, &null_sender())
    }

    /// Register a batch of reference images.
    ///
    /// Undecodable images land in `RegisterReport::failed`. A blob or
    /// record store failure stops the batch with
    /// `SimilarityError::RegistrationAborted`, which carries the report
    /// for the images handled before it.
    pub fn register_with_events(
        &self,
        request: RegisterRequest,
        events: &EventSender,
    ) -> Result<RegisterReport> {
        let start_time = Instant::now();
        let total = request.images.len();
        let annotation = normalize_annotation(request.annotation.as_deref());

        events.send(Event::Register(RegisterEvent::Started {
            total_images: total,
        }));

        let mut registered = Vec::new();
        let mut failed = Vec::new();

        for (index, upload) in request.images.into_iter().enumerate() {
            match self.extractor.extract(&upload.bytes) {
                Ok(fingerprint) => {
                    match self.store_reference(&upload, &fingerprint, annotation.clone()) {
                        Ok(image) => {
                            tracing::debug!(id = image.id, file_name = %image.file_name, locator = %image.locator, "Registered reference");
                            events.send(Event::Register(RegisterEvent::Registered {
                                id: image.id,
                                file_name: image.file_name.clone(),
                            }));
                            registered.push(image);
                        }
                        Err(source) => {
                            tracing::error!(file_name = %upload.name, error = %source, "Registration aborted");
                            events.send(Event::Register(RegisterEvent::Aborted {
                                registered: registered.len(),
                                message: source.to_string(),
                            }));

                            return Err(SimilarityError::RegistrationAborted {
                                partial: Box::new(RegisterReport {
                                    registered,
                                    failed,
                                    duration_ms: start_time.elapsed().as_millis() as u64,
                                }),
                                source,
                            });
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(file_name = %upload.name, error = %e, "Could not fingerprint image");
                    events.send(Event::Register(RegisterEvent::Failed {
                        file_name: upload.name.clone(),
                        message: e.to_string(),
                    }));

                    failed.push(RegistrationFailure {
                        file_name: upload.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }

            events.send(Event::Register(RegisterEvent::Progress(RegisterProgress {
                completed: index + 1,
                total,
                current_name: upload.name,
            })));
        }

        events.send(Event::Register(RegisterEvent::Completed {
            registered: registered.len(),
            failed: failed.len(),
        }));

        tracing::info!(
            registered = registered.len(),
            failed = failed.len(),
            "Registration finished"
        );

        Ok(RegisterReport {
            registered,
            failed,
            duration_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    /// Write the blob, then the record. A failed insert removes the blob
    /// again so no image is left without a record.
    fn store_reference(
        &self,
        upload: &ImageUpload,
        fingerprint: &Fingerprint,
        annotation: Option<String>,
    ) -> std::result::Result<RegisteredImage, StoreError> {
        let key = self.blob_key(&upload.name);
        self.blobs.put(&key, &upload.bytes)?;

        let encoded = self.codec.encode(fingerprint);
        let inserted = self.records.insert(NewReference {
            file_name: upload.name.clone(),
            locator: key.clone(),
            fingerprint: encoded.clone(),
            annotation,
        });

        let id = match inserted {
            Ok(id) => id,
            Err(e) => {
                if let Err(cleanup) = self.blobs.delete(&key) {
                    tracing::warn!(key = %key, error = %cleanup, "Could not remove blob of failed insert");
                }
                return Err(e);
            }
        };

        Ok(RegisteredImage {
            id,
            file_name: upload.name.clone(),
            locator: key,
            fingerprint: encoded,
        })
    }

    /// Compare without progress events
    pub fn compare(&self, request: CompareRequest) -> Result<CompareReport> {
        self.compare_with_events(request, &null_sender())
    }

    /// Rank every reference against the query image
    pub fn compare_with_events(
        &self,
        request: CompareRequest,
        events: &EventSender,
    ) -> Result<CompareReport> {
        let start_time = Instant::now();
        let params = RankParams::new(request.threshold, request.top_k)?;

        let query = self.extractor.extract(&request.query.bytes)?;
        let query_fingerprint = self.codec.encode(&query);

        events.send(Event::Compare(CompareEvent::QueryHashed {
            file_name: request.query.name.clone(),
            fingerprint: query_fingerprint.clone(),
        }));

        let references = self.records.select_all()?;

        events.send(Event::Compare(CompareEvent::Started {
            total_references: references.len(),
        }));

        let outcome = ranking::rank(&query, &references, &self.codec, &params)?;

        for skipped in &outcome.skipped {
            events.send(Event::Compare(CompareEvent::ReferenceSkipped {
                id: skipped.id,
                reason: skipped.reason.clone(),
            }));
        }

        let duration_ms = start_time.elapsed().as_millis() as u64;

        events.send(Event::Compare(CompareEvent::Completed(CompareSummary {
            total_references: references.len(),
            matches: outcome.matches.len(),
            skipped: outcome.skipped.len(),
            duration_ms,
        })));

        tracing::info!(
            query = %request.query.name,
            references = references.len(),
            matches = outcome.matches.len(),
            skipped = outcome.skipped.len(),
            "Comparison finished"
        );

        Ok(CompareReport {
            query_name: request.query.name,
            query_fingerprint,
            threshold: params.threshold(),
            top_k: params.top_k(),
            total_references: references.len(),
            outcome,
            duration_ms,
        })
    }

    /// All reference records, newest first
    pub fn list_references(&self) -> Result<Vec<ReferenceRecord>> {
        Ok(self.records.select_all()?)
    }

    /// One reference record
    pub fn reference(&self, id: i64) -> Result<ReferenceRecord> {
        Ok(self.records.get(id)?)
    }

    /// Set or clear a reference's annotation
    pub fn update_annotation(&self, id: i64, annotation: Option<&str>) -> Result<()> {
        let annotation = normalize_annotation(annotation);
        self.records.update_annotation(id, annotation.as_deref())?;
        tracing::info!(id, cleared = annotation.is_none(), "Updated annotation");
        Ok(())
    }

    /// Apply several annotation edits at once
    pub fn update_annotations(&self, updates: Vec<AnnotationUpdate>) -> Result<()> {
        let updates: Vec<_> = updates
            .into_iter()
            .map(|u| AnnotationUpdate {
                id: u.id,
                annotation: normalize_annotation(u.annotation.as_deref()),
            })
            .collect();

        self.records.update_annotations(&updates)?;
        tracing::info!(count = updates.len(), "Updated annotations");
        Ok(())
    }

    /// Fetch the stored image bytes for a locator
    pub fn fetch_image(&self, locator: &str) -> Result<Vec<u8>> {
        Ok(self.blobs.get(locator)?)
    }

    /// `{prefix}/{UTC timestamp}-{8 hex}{ext}`
    fn blob_key(&self, file_name: &str) -> String {
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| "png".to_string());

        let unique = Uuid::new_v4().simple().to_string();

        format!(
            "{}/{}-{}.{}",
            self.key_prefix,
            Utc::now().format("%Y%m%d%H%M%S%6f"),
            &unique[..8],
            extension
        )
    }
}
