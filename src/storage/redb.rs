//! redb storage engine implementation.
//!
//! This module provides the primary storage backend for PixRecall using
//! [redb](https://docs.rs/redb), a pure Rust embedded key-value store.
//!
//! # Features
//!
//! - ACID transactions with MVCC
//! - Single-writer, multiple-reader concurrency
//! - Automatic crash recovery
//!
//! A record and its vector are always written in the same transaction, so
//! a reader never sees a photo without its embedding.

use std::path::{Path, PathBuf};

use ::redb::{Database, ReadableTable, ReadableTableMetadata, WriteTransaction};
use tracing::{debug, info, instrument, warn};

use super::schema::{
    decode_vector, encode_vector, CollectionInfo, CollectionKind, DatabaseMetadata, Metric,
    COLLECTIONS_TABLE, METADATA_TABLE, PHOTOS_TABLE, PHOTO_EMBEDDINGS_TABLE,
    REFERENCES_TABLE, REFERENCE_SIGNATURES_TABLE, SCHEMA_VERSION,
};
use super::StorageEngine;
use crate::config::{Config, SyncMode};
use crate::error::{PixRecallError, Result, StorageError, ValidationError};
use crate::identity::ReferenceIdentity;
use crate::photo::PhotoRecord;
use crate::types::PhotoId;

/// Metadata key in the metadata table.
const METADATA_KEY: &str = "db_metadata";

/// redb storage engine wrapper.
///
/// This struct holds the redb database handle and cached metadata.
/// It implements [`StorageEngine`] for use with PixRecall.
///
/// # Thread Safety
///
/// `RedbStorage` is `Send + Sync`. redb handles internal synchronization
/// using MVCC for readers and exclusive locking for writers.
#[derive(Debug)]
pub struct RedbStorage {
    /// The redb database handle.
    db: Database,

    /// Cached database metadata.
    metadata: DatabaseMetadata,

    /// Path to the database file.
    path: PathBuf,

    /// Commit durability for every write transaction.
    sync_mode: SyncMode,
}

impl RedbStorage {
    /// Opens or creates a database at the given path.
    ///
    /// If the database doesn't exist, it is created with the configured
    /// dimensions locked into its metadata. If it exists, the stored
    /// dimensions are validated against the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The database file is corrupted
    /// - The database is locked by another process
    /// - Schema version doesn't match
    /// - A vector dimension doesn't match (for existing databases)
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use pixrecall::{Config, storage::RedbStorage};
    ///
    /// let storage = RedbStorage::open("./photos.db", &Config::default())?;
    /// ```
    #[instrument(skip(config), fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path.as_ref();
        let db_exists = path.exists();

        debug!(db_exists = db_exists, "Opening storage engine");

        let db = Self::create_database(path, config)?;

        if db_exists {
            Self::open_existing(db, path.to_path_buf(), config)
        } else {
            Self::initialize_new(db, path.to_path_buf(), config)
        }
    }

    /// Creates the redb database with appropriate settings.
    fn create_database(path: &Path, config: &Config) -> Result<Database> {
        let mut builder = Database::builder();
        builder.set_cache_size(config.cache_size_mb * 1024 * 1024);

        let db = builder.create(path).map_err(|e| match e {
            ::redb::DatabaseError::DatabaseAlreadyOpen => StorageError::DatabaseLocked,
            other => StorageError::Redb(other.to_string()),
        })?;

        debug!("Database file opened successfully");
        Ok(db)
    }

    /// Initializes a new database with tables and metadata.
    #[instrument(skip(db, config), fields(path = %path.display()))]
    fn initialize_new(db: Database, path: PathBuf, config: &Config) -> Result<Self> {
        info!("Initializing new database");

        let metadata = DatabaseMetadata::new(config.face_dimension, config.image_dimension);

        let mut write_txn = db.begin_write().map_err(StorageError::from)?;
        write_txn.set_durability(config.sync_mode.durability());
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;

            // Tables are created on first access
            let _ = write_txn.open_table(COLLECTIONS_TABLE)?;
            let _ = write_txn.open_table(REFERENCES_TABLE)?;
            let _ = write_txn.open_table(REFERENCE_SIGNATURES_TABLE)?;
            let _ = write_txn.open_table(PHOTOS_TABLE)?;
            let _ = write_txn.open_table(PHOTO_EMBEDDINGS_TABLE)?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(
            schema_version = SCHEMA_VERSION,
            face_dimension = config.face_dim(),
            image_dimension = config.image_dim(),
            "Database initialized"
        );

        Ok(Self {
            db,
            metadata,
            path,
            sync_mode: config.sync_mode,
        })
    }

    /// Opens and validates an existing database.
    #[instrument(skip(db, config), fields(path = %path.display()))]
    fn open_existing(db: Database, path: PathBuf, config: &Config) -> Result<Self> {
        info!("Opening existing database");

        let read_txn = db.begin_read().map_err(StorageError::from)?;

        let metadata = {
            let meta_table = read_txn.open_table(METADATA_TABLE).map_err(|e| {
                StorageError::corrupted(format!("Cannot open metadata table: {}", e))
            })?;

            let metadata_bytes = meta_table
                .get(METADATA_KEY)
                .map_err(StorageError::from)?
                .ok_or_else(|| StorageError::corrupted("Missing database metadata"))?;

            bincode::deserialize::<DatabaseMetadata>(metadata_bytes.value())
                .map_err(|e| StorageError::corrupted(format!("Invalid metadata format: {}", e)))?
        };

        drop(read_txn);

        if metadata.schema_version != SCHEMA_VERSION {
            warn!(
                expected = SCHEMA_VERSION,
                found = metadata.schema_version,
                "Schema version mismatch"
            );
            return Err(PixRecallError::Storage(StorageError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION,
                found: metadata.schema_version,
            }));
        }

        for (field, stored, configured) in [
            ("face_dimension", metadata.face_dimension, config.face_dimension),
            ("image_dimension", metadata.image_dimension, config.image_dimension),
        ] {
            if stored.size() != configured.size() {
                warn!(
                    field,
                    expected = configured.size(),
                    found = stored.size(),
                    "Embedding dimension mismatch"
                );
                return Err(ValidationError::dimension_mismatch(configured.size(), stored.size()).into());
            }
        }

        let mut metadata = metadata;
        metadata.touch();

        let mut write_txn = db.begin_write().map_err(StorageError::from)?;
        write_txn.set_durability(config.sync_mode.durability());
        {
            let mut meta_table = write_txn.open_table(METADATA_TABLE)?;
            let metadata_bytes = bincode::serialize(&metadata)
                .map_err(|e| StorageError::serialization(e.to_string()))?;
            meta_table.insert(METADATA_KEY, metadata_bytes.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(
            schema_version = metadata.schema_version,
            face_dimension = metadata.face_dimension.size(),
            image_dimension = metadata.image_dimension.size(),
            "Database opened successfully"
        );

        Ok(Self {
            db,
            metadata,
            path,
            sync_mode: config.sync_mode,
        })
    }

    /// Returns a reference to the underlying redb database.
    #[inline]
    #[cfg(test)]
    pub(crate) fn database(&self) -> &Database {
        &self.db
    }

    /// Begins a write transaction with the configured durability.
    fn begin_write(&self) -> Result<WriteTransaction> {
        let mut write_txn = self.db.begin_write().map_err(StorageError::from)?;
        write_txn.set_durability(self.sync_mode.durability());
        Ok(write_txn)
    }

    fn expected_dimension(&self, kind: CollectionKind) -> usize {
        match kind {
            CollectionKind::ReferenceFaces => self.metadata.face_dimension.size(),
            CollectionKind::Photos => self.metadata.image_dimension.size(),
        }
    }

    fn check_vector(&self, kind: CollectionKind, vector: &[f32]) -> Result<()> {
        let expected = self.expected_dimension(kind);
        if vector.len() != expected {
            return Err(ValidationError::dimension_mismatch(expected, vector.len()).into());
        }
        Ok(())
    }
}

impl StorageEngine for RedbStorage {
    // =========================================================================
    // Lifecycle
    // =========================================================================

    fn metadata(&self) -> &DatabaseMetadata {
        &self.metadata
    }

    #[instrument(skip(self))]
    fn close(self: Box<Self>) -> Result<()> {
        info!("Closing storage engine");

        // redb flushes durably on drop, which is infallible.
        drop(self.db);

        info!("Storage engine closed");
        Ok(())
    }

    fn path(&self) -> Option<&Path> {
        Some(&self.path)
    }

    // =========================================================================
    // Collections
    // =========================================================================

    #[instrument(skip(self))]
    fn ensure_collection(
        &self,
        kind: CollectionKind,
        dimension: usize,
        metric: Metric,
    ) -> Result<CollectionInfo> {
        if let Some(existing) = self.get_collection(kind)? {
            if existing.dimension != dimension {
                warn!(
                    collection = %kind,
                    expected = existing.dimension,
                    got = dimension,
                    "Collection dimension conflict"
                );
                return Err(ValidationError::dimension_mismatch(existing.dimension, dimension).into());
            }
            return Ok(existing);
        }

        let info = CollectionInfo::new(kind, dimension, metric);
        let bytes = bincode::serialize(&info)
            .map_err(|e| StorageError::serialization(e.to_string()))?;

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(COLLECTIONS_TABLE)?;
            table.insert(kind.name(), bytes.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        info!(collection = %kind, dimension, "Collection created");
        Ok(info)
    }

    fn get_collection(&self, kind: CollectionKind) -> Result<Option<CollectionInfo>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(COLLECTIONS_TABLE)?;

        match table.get(kind.name())? {
            Some(value) => {
                let info: CollectionInfo = bincode::deserialize(value.value())
                    .map_err(|e| StorageError::serialization(e.to_string()))?;
                Ok(Some(info))
            }
            None => Ok(None),
        }
    }

    // =========================================================================
    // Reference Faces
    // =========================================================================

    fn save_reference(&self, reference: &ReferenceIdentity) -> Result<()> {
        self.check_vector(CollectionKind::ReferenceFaces, &reference.signature)?;

        let bytes = bincode::serialize(reference)
            .map_err(|e| StorageError::serialization(e.to_string()))?;
        let signature = encode_vector(&reference.signature);

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(REFERENCES_TABLE)?;
            table.insert(reference.id.as_bytes(), bytes.as_slice())?;

            let mut signatures = write_txn.open_table(REFERENCE_SIGNATURES_TABLE)?;
            signatures.insert(reference.id.as_bytes(), signature.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        debug!(id = %reference.id, name = %reference.name, "Reference saved");
        Ok(())
    }

    fn list_references(&self, limit: usize) -> Result<Vec<ReferenceIdentity>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(REFERENCES_TABLE)?;
        let signatures = read_txn.open_table(REFERENCE_SIGNATURES_TABLE)?;

        let mut references = Vec::new();
        for result in table.iter()?.take(limit) {
            let (key, value) = result.map_err(StorageError::from)?;
            let mut reference: ReferenceIdentity = bincode::deserialize(value.value())
                .map_err(|e| StorageError::serialization(e.to_string()))?;

            let signature = signatures
                .get(key.value())?
                .ok_or_else(|| {
                    StorageError::corrupted(format!("Missing signature for reference {}", reference.id))
                })?;
            reference.signature = decode_vector(signature.value())?;
            references.push(reference);
        }

        Ok(references)
    }

    fn count_references(&self) -> Result<u64> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(REFERENCES_TABLE)?;
        Ok(table.len()?)
    }

    // =========================================================================
    // Photos
    // =========================================================================

    fn save_photo(&self, photo: &PhotoRecord) -> Result<()> {
        self.check_vector(CollectionKind::Photos, &photo.embedding)?;

        let bytes = bincode::serialize(photo)
            .map_err(|e| StorageError::serialization(e.to_string()))?;
        let embedding = encode_vector(&photo.embedding);

        let write_txn = self.begin_write()?;
        {
            let mut table = write_txn.open_table(PHOTOS_TABLE)?;
            table.insert(photo.id.as_bytes(), bytes.as_slice())?;

            let mut embeddings = write_txn.open_table(PHOTO_EMBEDDINGS_TABLE)?;
            embeddings.insert(photo.id.as_bytes(), embedding.as_slice())?;
        }
        write_txn.commit().map_err(StorageError::from)?;

        debug!(id = %photo.id, path = %photo.path, people = photo.people.len(), "Photo saved");
        Ok(())
    }

    fn get_photo(&self, id: PhotoId) -> Result<Option<PhotoRecord>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(PHOTOS_TABLE)?;

        let Some(value) = table.get(id.as_bytes())? else {
            return Ok(None);
        };
        let mut photo: PhotoRecord = bincode::deserialize(value.value())
            .map_err(|e| StorageError::serialization(e.to_string()))?;

        let embeddings = read_txn.open_table(PHOTO_EMBEDDINGS_TABLE)?;
        let embedding = embeddings
            .get(id.as_bytes())?
            .ok_or_else(|| StorageError::corrupted(format!("Missing embedding for photo {}", id)))?;
        photo.embedding = decode_vector(embedding.value())?;

        Ok(Some(photo))
    }

    fn list_photos(&self) -> Result<Vec<PhotoRecord>> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(PHOTOS_TABLE)?;
        let embeddings = read_txn.open_table(PHOTO_EMBEDDINGS_TABLE)?;

        let mut photos = Vec::new();
        for result in table.iter()? {
            let (key, value) = result.map_err(StorageError::from)?;
            let mut photo: PhotoRecord = bincode::deserialize(value.value())
                .map_err(|e| StorageError::serialization(e.to_string()))?;

            let embedding = embeddings.get(key.value())?.ok_or_else(|| {
                StorageError::corrupted(format!("Missing embedding for photo {}", photo.id))
            })?;
            photo.embedding = decode_vector(embedding.value())?;
            photos.push(photo);
        }

        Ok(photos)
    }

    fn count_photos(&self) -> Result<u64> {
        let read_txn = self.db.begin_read().map_err(StorageError::from)?;
        let table = read_txn.open_table(PHOTOS_TABLE)?;
        Ok(table.len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingDimension;
    use crate::photo::NewPhoto;
    use tempfile::tempdir;

    fn small_config() -> Config {
        Config {
            face_dimension: EmbeddingDimension::Custom(4),
            image_dimension: EmbeddingDimension::Custom(8),
            ..Default::default()
        }
    }

    fn photo(path: &str, people: &[&str]) -> PhotoRecord {
        NewPhoto {
            path: path.into(),
            embedding: vec![0.25; 8],
            people: people.iter().map(|p| p.to_string()).collect(),
            caption: format!("caption for {}", path),
        }
        .into_record()
    }

    #[test]
    fn test_open_creates_new_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        assert!(!path.exists());

        let storage = RedbStorage::open(&path, &small_config()).unwrap();

        assert!(path.exists());
        assert_eq!(storage.metadata().schema_version, SCHEMA_VERSION);
        assert_eq!(
            storage.metadata().face_dimension,
            EmbeddingDimension::Custom(4)
        );

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_open_existing_database() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let storage = RedbStorage::open(&path, &small_config()).unwrap();
        let created_at = storage.metadata().created_at;
        Box::new(storage).close().unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        let storage = RedbStorage::open(&path, &small_config()).unwrap();

        assert_eq!(storage.metadata().created_at, created_at);
        assert!(storage.metadata().last_opened_at > created_at);

        Box::new(storage).close().unwrap();
    }

    #[test]
    fn test_image_dimension_mismatch_returns_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let storage = RedbStorage::open(&path, &small_config()).unwrap();
        Box::new(storage).close().unwrap();

        let other = Config {
            image_dimension: EmbeddingDimension::Custom(16),
            ..small_config()
        };
        let err = RedbStorage::open(&path, &other).unwrap_err();
        assert!(matches!(
            err,
            PixRecallError::Validation(ValidationError::DimensionMismatch {
                expected: 16,
                got: 8
            })
        ));
    }

    #[test]
    fn test_all_tables_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let storage = RedbStorage::open(&path, &small_config()).unwrap();

        let read_txn = storage.database().begin_read().unwrap();
        read_txn.open_table(METADATA_TABLE).unwrap();
        read_txn.open_table(COLLECTIONS_TABLE).unwrap();
        read_txn.open_table(REFERENCES_TABLE).unwrap();
        read_txn.open_table(REFERENCE_SIGNATURES_TABLE).unwrap();
        read_txn.open_table(PHOTOS_TABLE).unwrap();
        read_txn.open_table(PHOTO_EMBEDDINGS_TABLE).unwrap();
        drop(read_txn);

        Box::new(storage).close().unwrap();
    }

    // ====================================================================
    // Collection tests
    // ====================================================================

    fn open_with_collections(path: &Path) -> RedbStorage {
        let storage = RedbStorage::open(path, &small_config()).unwrap();
        storage
            .ensure_collection(CollectionKind::ReferenceFaces, 4, Metric::Cosine)
            .unwrap();
        storage
            .ensure_collection(CollectionKind::Photos, 8, Metric::Cosine)
            .unwrap();
        storage
    }

    #[test]
    fn test_new_database_has_no_collections() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.db"), &small_config()).unwrap();
        assert!(storage.get_collection(CollectionKind::Photos).unwrap().is_none());
    }

    #[test]
    fn test_collections_declared() {
        let dir = tempdir().unwrap();
        let storage = open_with_collections(&dir.path().join("test.db"));

        let faces = storage
            .get_collection(CollectionKind::ReferenceFaces)
            .unwrap()
            .unwrap();
        let photos = storage.get_collection(CollectionKind::Photos).unwrap().unwrap();

        assert_eq!(faces.dimension, 4);
        assert_eq!(photos.dimension, 8);
        assert_eq!(photos.metric, Metric::Cosine);
    }

    #[test]
    fn test_ensure_collection_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = open_with_collections(&dir.path().join("test.db"));

        let first = storage
            .ensure_collection(CollectionKind::Photos, 8, Metric::Cosine)
            .unwrap();
        let second = storage
            .ensure_collection(CollectionKind::Photos, 8, Metric::Cosine)
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ensure_collection_rejects_conflicting_dimension() {
        let dir = tempdir().unwrap();
        let storage = open_with_collections(&dir.path().join("test.db"));

        let err = storage
            .ensure_collection(CollectionKind::ReferenceFaces, 5, Metric::Cosine)
            .unwrap_err();
        assert!(err.is_validation());
    }

    // ====================================================================
    // Reference tests
    // ====================================================================

    #[test]
    fn test_save_and_list_references_in_order() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.db"), &small_config()).unwrap();

        let alice = ReferenceIdentity::new("Alice", vec![1.0, 0.0, 0.0, 0.0]);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let bob = ReferenceIdentity::new("Bob", vec![0.0, 1.0, 0.0, 0.0]);
        std::thread::sleep(std::time::Duration::from_millis(2));
        let alice_again = ReferenceIdentity::new("Alice", vec![0.0, 0.0, 1.0, 0.0]);

        storage.save_reference(&alice).unwrap();
        storage.save_reference(&bob).unwrap();
        storage.save_reference(&alice_again).unwrap();

        let listed = storage.list_references(100).unwrap();
        let names: Vec<&str> = listed.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob", "Alice"]);
        assert_eq!(listed[1].signature, vec![0.0, 1.0, 0.0, 0.0]);
        assert_eq!(storage.count_references().unwrap(), 3);
    }

    #[test]
    fn test_list_references_respects_limit() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.db"), &small_config()).unwrap();

        for i in 0..5 {
            let reference = ReferenceIdentity::new(format!("p{}", i), vec![i as f32, 1.0, 0.0, 0.0]);
            storage.save_reference(&reference).unwrap();
        }

        assert_eq!(storage.list_references(3).unwrap().len(), 3);
    }

    #[test]
    fn test_save_reference_rejects_wrong_dimension() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.db"), &small_config()).unwrap();

        let reference = ReferenceIdentity::new("Alice", vec![1.0; 8]);
        assert!(storage.save_reference(&reference).unwrap_err().is_validation());
        assert_eq!(storage.count_references().unwrap(), 0);
    }

    // ====================================================================
    // Photo tests
    // ====================================================================

    #[test]
    fn test_save_and_get_photo() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.db"), &small_config()).unwrap();

        let record = photo("/p/beach.jpg", &["Alice", "Bob"]);
        storage.save_photo(&record).unwrap();

        let loaded = storage.get_photo(record.id).unwrap().unwrap();
        assert_eq!(loaded.path, "/p/beach.jpg");
        assert_eq!(loaded.embedding, vec![0.25; 8]);
        assert!(loaded.contains_all(["Alice", "Bob"]));
        assert_eq!(loaded.caption, "caption for /p/beach.jpg");
    }

    #[test]
    fn test_get_nonexistent_photo_returns_none() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.db"), &small_config()).unwrap();

        assert!(storage.get_photo(PhotoId::new()).unwrap().is_none());
    }

    #[test]
    fn test_same_path_twice_yields_two_records() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.db"), &small_config()).unwrap();

        storage.save_photo(&photo("/p/a.jpg", &[])).unwrap();
        storage.save_photo(&photo("/p/a.jpg", &[])).unwrap();

        assert_eq!(storage.count_photos().unwrap(), 2);
        assert_eq!(storage.list_photos().unwrap().len(), 2);
    }

    #[test]
    fn test_photos_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let record = photo("/p/x.png", &["Carol"]);
        {
            let storage = RedbStorage::open(&path, &small_config()).unwrap();
            storage.save_photo(&record).unwrap();
            Box::new(storage).close().unwrap();
        }

        let storage = RedbStorage::open(&path, &small_config()).unwrap();
        let loaded = storage.get_photo(record.id).unwrap().unwrap();
        assert!(loaded.people.contains("Carol"));
    }

    #[test]
    fn test_uncommitted_photo_is_invisible() {
        let dir = tempdir().unwrap();
        let storage = RedbStorage::open(dir.path().join("test.db"), &small_config()).unwrap();

        let record = photo("/p/ghost.jpg", &[]);
        let bytes = bincode::serialize(&record).unwrap();
        {
            let write_txn = storage.database().begin_write().unwrap();
            {
                let mut table = write_txn.open_table(PHOTOS_TABLE).unwrap();
                table.insert(record.id.as_bytes(), bytes.as_slice()).unwrap();
            }
            // dropped without commit
        }

        assert!(storage.get_photo(record.id).unwrap().is_none());
        assert_eq!(storage.count_photos().unwrap(), 0);
    }

    // ====================================================================
    // Corruption Detection Tests
    // ====================================================================

    #[test]
    fn test_corruption_detection_invalid_metadata_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("corrupt.db");

        let storage = RedbStorage::open(&path, &small_config()).unwrap();
        let write_txn = storage.database().begin_write().unwrap();
        {
            let mut meta = write_txn.open_table(METADATA_TABLE).unwrap();
            meta.insert(METADATA_KEY, b"not-valid-bincode-data".as_slice())
                .unwrap();
        }
        write_txn.commit().unwrap();
        Box::new(storage).close().unwrap();

        let err = RedbStorage::open(&path, &small_config()).unwrap_err();
        match err {
            PixRecallError::Storage(StorageError::Corrupted(msg)) => {
                assert!(msg.contains("Invalid metadata format"), "got: {}", msg);
            }
            other => panic!("Expected StorageError::Corrupted, got: {:?}", other),
        }
    }

    #[test]
    fn test_corruption_detection_missing_metadata_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("no_table.db");

        {
            let db = ::redb::Database::create(&path).unwrap();
            let write_txn = db.begin_write().unwrap();
            {
                let dummy: ::redb::TableDefinition<&str, &str> =
                    ::redb::TableDefinition::new("dummy");
                let mut table = write_txn.open_table(dummy).unwrap();
                table.insert("key", "value").unwrap();
            }
            write_txn.commit().unwrap();
        }

        let err = RedbStorage::open(&path, &small_config()).unwrap_err();
        match err {
            PixRecallError::Storage(StorageError::Corrupted(msg)) => {
                assert!(msg.contains("Cannot open metadata table"), "got: {}", msg);
            }
            other => panic!("Expected StorageError::Corrupted, got: {:?}", other),
        }
    }
}
