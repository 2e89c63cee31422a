//! Shared fixtures for integration tests.
//!
//! Test "images" are small JSON files describing what the models would see:
//! the face signatures, the semantic embedding and the caption. The
//! [`SceneProvider`] reads them back, so every test controls model output
//! through the files it writes.

#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pixrecall::{
    Config, DetectedFace, Embedding, EmbeddingDimension, EmbeddingProvider, IdentityError,
    PixRecall, PixRecallError, Result,
};
use serde::{Deserialize, Serialize};
use tempfile::{tempdir, TempDir};

/// Face signature dimension used by every test.
pub const FACE_DIM: usize = 4;

/// Semantic embedding dimension used by every test.
pub const IMAGE_DIM: usize = 4;

pub const ALICE: [f32; FACE_DIM] = [1.0, 0.0, 0.0, 0.0];
pub const BOB: [f32; FACE_DIM] = [0.0, 1.0, 0.0, 0.0];
pub const CAROL: [f32; FACE_DIM] = [0.0, 0.0, 1.0, 0.0];
pub const STRANGER: [f32; FACE_DIM] = [0.0, 0.0, 0.0, 1.0];

/// What a test image contains.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Scene {
    pub faces: Vec<Vec<f32>>,
    /// `None` makes `embed_image` fail.
    pub embedding: Option<Vec<f32>>,
    /// `None` makes `caption` fail.
    pub caption: Option<String>,
}

impl Scene {
    pub fn new(faces: &[[f32; FACE_DIM]], embedding: [f32; IMAGE_DIM], caption: &str) -> Self {
        Self {
            faces: faces.iter().map(|f| f.to_vec()).collect(),
            embedding: Some(embedding.to_vec()),
            caption: Some(caption.to_string()),
        }
    }

    /// A single-face reference photo.
    pub fn portrait(face: [f32; FACE_DIM]) -> Self {
        Self::new(&[face], [0.0; IMAGE_DIM], "portrait")
    }
}

/// Writes `scene` to `dir/name` and returns the path.
pub fn write_scene(dir: &Path, name: &str, scene: &Scene) -> PathBuf {
    fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    fs::write(&path, serde_json::to_vec(scene).unwrap()).unwrap();
    path
}

/// Provider that reads [`Scene`] files and embeds text from a lookup table.
#[derive(Default)]
pub struct SceneProvider {
    texts: HashMap<String, Embedding>,
    detect_calls: AtomicUsize,
}

impl SceneProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: &str, embedding: [f32; IMAGE_DIM]) -> Self {
        self.texts.insert(text.to_string(), embedding.to_vec());
        self
    }

    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }

    fn scene(&self, image: &Path) -> Result<Scene> {
        let bytes = fs::read(image).map_err(|_| IdentityError::unreadable(image))?;
        serde_json::from_slice(&bytes).map_err(|_| IdentityError::unreadable(image).into())
    }
}

impl EmbeddingProvider for SceneProvider {
    fn detect_faces(&self, image: &Path) -> Result<Vec<DetectedFace>> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .scene(image)?
            .faces
            .into_iter()
            .map(DetectedFace::from_signature)
            .collect())
    }

    fn embed_image(&self, image: &Path) -> Result<Embedding> {
        self.scene(image)?
            .embedding
            .ok_or_else(|| PixRecallError::embedding("image encoder offline"))
    }

    fn embed_text(&self, text: &str) -> Result<Embedding> {
        self.texts
            .get(text)
            .cloned()
            .ok_or_else(|| PixRecallError::embedding(format!("no embedding for '{}'", text)))
    }

    fn caption(&self, image: &Path) -> Result<String> {
        self.scene(image)?
            .caption
            .ok_or_else(|| PixRecallError::embedding("captioner offline"))
    }

    fn face_dimension(&self) -> usize {
        FACE_DIM
    }

    fn image_dimension(&self) -> usize {
        IMAGE_DIM
    }
}

/// Test config rooted in `dir`.
pub fn config(dir: &Path) -> Config {
    Config {
        face_dimension: EmbeddingDimension::Custom(FACE_DIM),
        image_dimension: EmbeddingDimension::Custom(IMAGE_DIM),
        references_dir: dir.join("faces"),
        ..Default::default()
    }
}

/// Opens (or reopens) the app stored in `dir`.
pub fn open_in(dir: &Path, provider: Arc<SceneProvider>) -> PixRecall {
    PixRecall::open(dir.join("pixrecall.db"), config(dir), provider).unwrap()
}

/// Helper to open a fresh app with a default provider.
pub fn open_db() -> (PixRecall, TempDir) {
    let dir = tempdir().unwrap();
    let app = open_in(dir.path(), Arc::new(SceneProvider::new()));
    (app, dir)
}

/// Registers one portrait reference per `(name, face)`.
pub fn register_people(app: &PixRecall, dir: &Path, people: &[(&str, [f32; FACE_DIM])]) {
    let refs = dir.join("refs");
    for (name, face) in people {
        let path = write_scene(&refs, &format!("{}.json", name), &Scene::portrait(*face));
        app.register(name, &path).unwrap();
    }
}
