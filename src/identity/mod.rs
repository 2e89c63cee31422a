//! Face identity resolution.
//!
//! The [`IdentityIndex`] holds every known reference signature in memory,
//! as two index-aligned arrays (`names[i]` belongs to `signatures[i]`). A
//! person may have several references; a face matches a person through the
//! person's *nearest* reference, never an average.
//!
//! # Matching
//!
//! For each detected face the index computes cosine similarity against
//! every known signature and takes the argmax (first index wins ties). The
//! face matches only if that similarity is strictly greater than
//! `Config::match_threshold`. The scan is linear, which is fine for the
//! low thousands of references this index is sized for.
//!
//! # Concurrency
//!
//! The arrays sit behind an `RwLock`, so `identify` calls run in parallel.
//! A separate registration mutex serializes `register` end-to-end, and the
//! in-memory append happens only after the durable write succeeded.
//!
//! # Example
//!
//! ```rust,ignore
//! let index = IdentityIndex::new(store, provider, &config);
//! index.load(store.scan_references(config.reference_scan_limit))?;
//!
//! index.register("Alice", Path::new("refs/alice.jpg"))?;
//! let people = index.identify(Path::new("photos/party.jpg"))?;
//! ```

mod types;

pub use types::{PersonSummary, ReferenceIdentity, RegistrationOutcome};

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::embedding::EmbeddingProvider;
use crate::error::{IdentityError, PixRecallError, Result, ValidationError};
use crate::store::VectorStore;
use crate::types::{Embedding, ReferenceId};
use crate::vector::cosine_similarity;

/// Index-aligned reference arrays.
#[derive(Debug, Default)]
struct IdentityState {
    names: Vec<String>,
    signatures: Vec<Embedding>,
}

impl IdentityState {
    fn push(&mut self, name: String, signature: Embedding) {
        self.names.push(name);
        self.signatures.push(signature);
    }
}

/// In-memory face identity index backed by the vector store.
pub struct IdentityIndex {
    state: RwLock<IdentityState>,
    registration: Mutex<()>,
    store: Arc<VectorStore>,
    provider: Arc<dyn EmbeddingProvider>,
    config: Config,
}

impl std::fmt::Debug for IdentityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityIndex")
            .field("references", &self.len())
            .field("threshold", &self.config.match_threshold)
            .finish()
    }
}

/// Finds the signature most similar to `query`.
///
/// Returns `(index, similarity)` of the argmax; on ties the lowest index
/// wins. Returns `None` when `signatures` is empty.
pub fn nearest_signature(signatures: &[Embedding], query: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, signature) in signatures.iter().enumerate() {
        let similarity = cosine_similarity(signature, query);
        match best {
            Some((_, best_similarity)) if similarity <= best_similarity => {}
            _ => best = Some((i, similarity)),
        }
    }
    best
}

impl IdentityIndex {
    /// Creates an empty index.
    pub fn new(store: Arc<VectorStore>, provider: Arc<dyn EmbeddingProvider>, config: &Config) -> Self {
        Self {
            state: RwLock::new(IdentityState::default()),
            registration: Mutex::new(()),
            store,
            provider,
            config: config.clone(),
        }
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, IdentityState>> {
        self.state
            .read()
            .map_err(|_| PixRecallError::vector("Identity index lock poisoned"))
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, IdentityState>> {
        self.state
            .write()
            .map_err(|_| PixRecallError::vector("Identity index lock poisoned"))
    }

    fn lock_registration(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.registration
            .lock()
            .map_err(|_| PixRecallError::vector("Registration lock poisoned"))
    }

    /// Populates the index from stored references.
    ///
    /// If `records` is empty, falls back to [`bootstrap_from_dir`] on
    /// `Config::references_dir`. Records whose signature has the wrong
    /// dimension are skipped. Returns the number of references loaded.
    ///
    /// [`bootstrap_from_dir`]: IdentityIndex::bootstrap_from_dir
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub fn load(&self, records: Vec<ReferenceIdentity>) -> Result<usize> {
        if records.is_empty() {
            info!("No stored references, bootstrapping from directory");
            let dir = self.config.references_dir.clone();
            return self.bootstrap_from_dir(&dir);
        }

        let dimension = self.config.face_dim();
        let mut state = self.write_state()?;
        let mut loaded = 0;
        for record in records {
            if record.signature.len() != dimension {
                warn!(
                    name = %record.name,
                    expected = dimension,
                    got = record.signature.len(),
                    "Skipping stored reference with wrong dimension"
                );
                continue;
            }
            state.push(record.name, record.signature);
            loaded += 1;
        }

        info!(loaded, "Identity index loaded");
        Ok(loaded)
    }

    /// Registers every reference photo found directly in `dir`.
    ///
    /// Reads `.jpg`/`.jpeg`/`.png` files (not recursively) in file-name
    /// order. Each person is named after the file stem and gets the first
    /// detected face. Files with no detectable face are skipped. A missing
    /// directory is created and yields no references.
    ///
    /// Each reference is persisted; if persisting fails it is still kept in
    /// memory, because the directory is rescanned on the next start.
    #[instrument(skip(self), fields(dir = %dir.display()))]
    pub fn bootstrap_from_dir(&self, dir: &Path) -> Result<usize> {
        if !dir.exists() {
            fs::create_dir_all(dir)?;
            info!("Created empty references directory");
            return Ok(0);
        }

        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && self.config.is_image_path(path))
            .collect();
        files.sort();

        let _guard = self.lock_registration()?;
        let mut registered = 0;

        for path in files {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                warn!(path = %path.display(), "Skipping reference with non-UTF-8 name");
                continue;
            };

            let faces = match self.provider.detect_faces(&path) {
                Ok(faces) => faces,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Skipping unreadable reference");
                    continue;
                }
            };

            let Some(face) = faces.into_iter().next() else {
                warn!(path = %path.display(), "No face in reference photo, skipping");
                continue;
            };

            if let Err(err) = self.provider.validate_signature(&face.signature) {
                warn!(path = %path.display(), error = %err, "Skipping reference signature");
                continue;
            }

            if let Err(err) = self.store.upsert_reference(&name, face.signature.clone()) {
                warn!(name = %name, error = %err, "Reference not persisted, keeping in memory");
            }

            self.write_state()?.push(name, face.signature);
            registered += 1;
        }

        info!(registered, "Reference bootstrap complete");
        Ok(registered)
    }

    /// Registers a new reference photo for `name`.
    ///
    /// The photo must contain exactly one face. The reference is persisted
    /// first and appended to memory only after the write succeeded.
    ///
    /// # Errors
    ///
    /// - [`IdentityError::NoFaceDetected`] for zero faces
    /// - [`IdentityError::AmbiguousReference`] for more than one face
    /// - `ValidationError` for a blank name or a wrong-dimension signature
    /// - `StoreUnavailable` or storage errors if the write fails
    #[instrument(skip(self), fields(image = %image.display()))]
    pub fn register(&self, name: &str, image: &Path) -> Result<ReferenceId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::required_field("name").into());
        }

        let _guard = self.lock_registration()?;

        let mut faces = self.provider.detect_faces(image)?;
        let face = match faces.len() {
            0 => return Err(IdentityError::NoFaceDetected.into()),
            1 => faces.remove(0),
            n => return Err(IdentityError::AmbiguousReference { faces: n }.into()),
        };
        self.provider.validate_signature(&face.signature)?;

        let id = self.store.upsert_reference(name, face.signature.clone())?;
        self.write_state()?.push(name.to_string(), face.signature);

        info!(name, id = %id, "Reference registered");
        Ok(id)
    }

    /// Registers several reference photos for one person.
    ///
    /// Returns one outcome per photo in input order; a failing photo does
    /// not stop the rest.
    pub fn register_many<P: AsRef<Path>>(&self, name: &str, images: &[P]) -> Vec<RegistrationOutcome> {
        images
            .iter()
            .map(|image| {
                let path = image.as_ref().to_path_buf();
                let result = self.register(name, &path);
                if let Err(err) = &result {
                    warn!(name, path = %path.display(), error = %err, "Reference registration failed");
                }
                RegistrationOutcome { path, result }
            })
            .collect()
    }

    /// Resolves every face in `image` to a known name.
    ///
    /// Returns the set of matched names without duplicates. Faces below the
    /// threshold, and faces whose signature has the wrong dimension, are
    /// left out. With no known references the result is empty and the
    /// provider is not called.
    #[instrument(skip(self), fields(image = %image.display()))]
    pub fn identify(&self, image: &Path) -> Result<BTreeSet<String>> {
        if self.is_empty() {
            return Ok(BTreeSet::new());
        }

        let faces = self.provider.detect_faces(image)?;
        let dimension = self.config.face_dim();

        let state = self.read_state()?;
        let mut matched = BTreeSet::new();
        for face in &faces {
            if face.signature.len() != dimension {
                warn!(expected = dimension, got = face.signature.len(), "Skipping face with wrong dimension");
                continue;
            }
            if let Some((i, similarity)) = nearest_signature(&state.signatures, &face.signature) {
                if similarity > self.config.match_threshold {
                    matched.insert(state.names[i].clone());
                }
            }
        }

        debug!(faces = faces.len(), matched = matched.len(), "Identify complete");
        Ok(matched)
    }

    /// Each distinct known person with their reference count, sorted by name.
    pub fn known_people(&self) -> Result<Vec<PersonSummary>> {
        let state = self.read_state()?;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for name in &state.names {
            *counts.entry(name.as_str()).or_default() += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(name, references)| PersonSummary {
                name: name.to_string(),
                references,
            })
            .collect())
    }

    /// Number of references in memory.
    pub fn len(&self) -> usize {
        self.state.read().map_or(0, |s| s.names.len())
    }

    /// Returns true if no references are known.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The similarity a face must exceed to match.
    pub fn threshold(&self) -> f32 {
        self.config.match_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingDimension;
    use crate::embedding::DetectedFace;
    use std::collections::HashMap;
    use tempfile::{tempdir, TempDir};

    /// Faces keyed by file name; unknown files are unreadable.
    struct FaceTable(HashMap<String, Vec<Embedding>>);

    impl EmbeddingProvider for FaceTable {
        fn detect_faces(&self, image: &Path) -> Result<Vec<DetectedFace>> {
            let key = image.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            self.0
                .get(key)
                .map(|faces| faces.iter().cloned().map(DetectedFace::from_signature).collect())
                .ok_or_else(|| IdentityError::unreadable(image).into())
        }
        fn embed_image(&self, _image: &Path) -> Result<Embedding> {
            Ok(vec![0.0; 4])
        }
        fn embed_text(&self, _text: &str) -> Result<Embedding> {
            Ok(vec![0.0; 4])
        }
        fn caption(&self, _image: &Path) -> Result<String> {
            Ok(String::new())
        }
        fn face_dimension(&self) -> usize {
            3
        }
        fn image_dimension(&self) -> usize {
            4
        }
    }

    fn config(dir: &Path) -> Config {
        Config {
            face_dimension: EmbeddingDimension::Custom(3),
            image_dimension: EmbeddingDimension::Custom(4),
            references_dir: dir.join("faces"),
            ..Default::default()
        }
    }

    fn setup(faces: &[(&str, Vec<Embedding>)]) -> (IdentityIndex, Arc<VectorStore>, TempDir) {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        let store = Arc::new(VectorStore::open(dir.path().join("id.db"), &config).unwrap());
        let table = faces
            .iter()
            .map(|(name, sigs)| (name.to_string(), sigs.clone()))
            .collect();
        let index = IdentityIndex::new(store.clone(), Arc::new(FaceTable(table)), &config);
        (index, store, dir)
    }

    #[test]
    fn test_nearest_signature_first_wins_ties() {
        let signatures = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0]];
        let (i, similarity) = nearest_signature(&signatures, &[1.0, 0.0]).unwrap();
        assert_eq!(i, 0);
        assert!((similarity - 1.0).abs() < 1e-6);
        assert!(nearest_signature(&[], &[1.0, 0.0]).is_none());
    }

    #[test]
    fn test_register_then_identify() {
        let (index, store, _dir) = setup(&[
            ("alice.jpg", vec![vec![1.0, 0.0, 0.0]]),
            ("party.jpg", vec![vec![0.9, 0.1, 0.0], vec![0.0, 0.0, 1.0]]),
        ]);

        index.register("Alice", Path::new("alice.jpg")).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(store.count_references().unwrap(), 1);

        let people = index.identify(Path::new("party.jpg")).unwrap();
        assert_eq!(people.into_iter().collect::<Vec<_>>(), vec!["Alice".to_string()]);
    }

    #[test]
    fn test_register_rejects_zero_faces() {
        let (index, store, _dir) = setup(&[("empty.jpg", vec![])]);

        let err = index.register("Alice", Path::new("empty.jpg")).unwrap_err();
        assert!(err.is_no_face_detected());
        assert_eq!(index.len(), 0);
        assert_eq!(store.count_references().unwrap(), 0);
    }

    #[test]
    fn test_register_rejects_multiple_faces() {
        let (index, _store, _dir) = setup(&[(
            "group.jpg",
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
        )]);

        let err = index.register("Alice", Path::new("group.jpg")).unwrap_err();
        assert!(matches!(
            err,
            PixRecallError::Identity(IdentityError::AmbiguousReference { faces: 2 })
        ));
        assert!(index.is_empty());
    }

    #[test]
    fn test_register_rejects_blank_name() {
        let (index, _store, _dir) = setup(&[("alice.jpg", vec![vec![1.0, 0.0, 0.0]])]);
        assert!(index.register("   ", Path::new("alice.jpg")).unwrap_err().is_validation());
    }

    #[test]
    fn test_register_rejects_wrong_dimension() {
        let (index, _store, _dir) = setup(&[("odd.jpg", vec![vec![1.0, 0.0]])]);
        assert!(index.register("Odd", Path::new("odd.jpg")).unwrap_err().is_validation());
        assert!(index.is_empty());
    }

    #[test]
    fn test_identify_with_no_references_is_empty() {
        let (index, _store, _dir) = setup(&[]);
        // the provider would fail on this path; it must not be called
        assert!(index.identify(Path::new("missing.jpg")).unwrap().is_empty());
    }

    #[test]
    fn test_identify_dedups_names() {
        let (index, _store, _dir) = setup(&[
            ("alice.jpg", vec![vec![1.0, 0.0, 0.0]]),
            ("twins.jpg", vec![vec![1.0, 0.05, 0.0], vec![0.95, 0.0, 0.05]]),
        ]);
        index.register("Alice", Path::new("alice.jpg")).unwrap();

        let people = index.identify(Path::new("twins.jpg")).unwrap();
        assert_eq!(people.len(), 1);
    }

    #[test]
    fn test_identify_threshold_is_strict() {
        // cos(60°) = 0.5 exactly
        let (index, _store, _dir) = setup(&[
            ("ref.jpg", vec![vec![1.0, 0.0, 0.0]]),
            ("edge.jpg", vec![vec![0.5, 0.75f32.sqrt(), 0.0]]),
        ]);
        index.register("Ref", Path::new("ref.jpg")).unwrap();

        let similarity = cosine_similarity(&[1.0, 0.0, 0.0], &[0.5, 0.75f32.sqrt(), 0.0]);
        let people = index.identify(Path::new("edge.jpg")).unwrap();
        assert_eq!(people.is_empty(), similarity <= 0.5);
    }

    #[test]
    fn test_nearest_reference_wins_across_people() {
        let (index, _store, _dir) = setup(&[
            ("alice.jpg", vec![vec![1.0, 0.0, 0.0]]),
            ("bob.jpg", vec![vec![0.0, 1.0, 0.0]]),
            ("bob2.jpg", vec![vec![0.8, 0.6, 0.0]]),
            ("query.jpg", vec![vec![0.7, 0.7, 0.0]]),
        ]);
        index.register("Alice", Path::new("alice.jpg")).unwrap();
        index.register("Bob", Path::new("bob.jpg")).unwrap();
        index.register("Bob", Path::new("bob2.jpg")).unwrap();

        let people = index.identify(Path::new("query.jpg")).unwrap();
        assert_eq!(people.into_iter().collect::<Vec<_>>(), vec!["Bob".to_string()]);
    }

    #[test]
    fn test_register_many_reports_each_photo() {
        let (index, _store, _dir) = setup(&[
            ("a1.jpg", vec![vec![1.0, 0.0, 0.0]]),
            ("a2.jpg", vec![]),
            ("a3.jpg", vec![vec![0.9, 0.1, 0.0]]),
        ]);

        let outcomes = index.register_many("Alice", &["a1.jpg", "a2.jpg", "a3.jpg"]);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.as_ref().unwrap_err().is_no_face_detected());
        assert!(outcomes[2].result.is_ok());

        let people = index.known_people().unwrap();
        assert_eq!(
            people,
            vec![PersonSummary {
                name: "Alice".into(),
                references: 2
            }]
        );
    }

    #[test]
    fn test_load_from_records() {
        let (index, _store, _dir) = setup(&[]);
        let records = vec![
            ReferenceIdentity::new("Bob", vec![0.0, 1.0, 0.0]),
            ReferenceIdentity::new("Alice", vec![1.0, 0.0, 0.0]),
            ReferenceIdentity::new("Bad", vec![1.0]),
        ];

        assert_eq!(index.load(records).unwrap(), 2);
        let names: Vec<String> = index.known_people().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
    }

    #[test]
    fn test_bootstrap_from_directory() {
        let (index, store, dir) = setup(&[
            ("alice.jpg", vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]),
            ("bob.PNG", vec![vec![0.0, 0.0, 1.0]]),
            ("nobody.jpeg", vec![]),
        ]);
        let faces = dir.path().join("faces");
        fs::create_dir_all(faces.join("nested")).unwrap();
        for file in ["alice.jpg", "bob.PNG", "nobody.jpeg", "notes.txt", "nested/carol.jpg"] {
            fs::write(faces.join(file), b"img").unwrap();
        }

        assert_eq!(index.load(Vec::new()).unwrap(), 2);
        assert_eq!(store.count_references().unwrap(), 2);

        let names: Vec<String> = index.known_people().unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_bootstrap_creates_missing_directory() {
        let (index, _store, dir) = setup(&[]);
        let faces = dir.path().join("faces");
        assert!(!faces.exists());

        assert_eq!(index.load(Vec::new()).unwrap(), 0);
        assert!(faces.is_dir());
    }

    #[test]
    fn test_bootstrap_keeps_references_when_store_unavailable() {
        let dir = tempdir().unwrap();
        let config = config(dir.path());
        let store = Arc::new(VectorStore::unavailable(&config, "offline"));
        let table = [("alice.jpg".to_string(), vec![vec![1.0, 0.0, 0.0]])].into_iter().collect();
        let index = IdentityIndex::new(store, Arc::new(FaceTable(table)), &config);

        fs::create_dir_all(&config.references_dir).unwrap();
        fs::write(config.references_dir.join("alice.jpg"), b"img").unwrap();

        assert_eq!(index.load(Vec::new()).unwrap(), 1);
        assert_eq!(index.len(), 1);

        // steady-state registration surfaces the outage
        let err = index.register("Alice", Path::new("alice.jpg")).unwrap_err();
        assert!(err.is_store_unavailable());
        assert_eq!(index.len(), 1);
    }
}
