//! Embedding provider abstraction for PixRecall.
//!
//! The ML models (face detection and signature extraction, image/text
//! embedding, captioning) live outside this crate. They are reached through
//! the [`EmbeddingProvider`] trait, which the host application implements on
//! top of whatever inference stack it runs.
//!
//! # Vector Spaces
//!
//! A provider produces vectors in two unrelated spaces:
//!
//! - **Face signatures** (`D_face`) from [`detect_faces`](EmbeddingProvider::detect_faces),
//!   pre-normalized so that cosine similarity is a dot product.
//! - **Semantic embeddings** (`D_image`) from [`embed_image`](EmbeddingProvider::embed_image)
//!   and [`embed_text`](EmbeddingProvider::embed_text), comparable across
//!   modalities (text-to-image search).
//!
//! Face signatures are never compared against semantic embeddings.
//!
//! # Failures
//!
//! Every method may fail. Calls have no timeout: a hung provider blocks the
//! calling pipeline stage, so hosts that need responsiveness must impose
//! their own deadlines.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PixRecallError, Result, ValidationError};
use crate::types::Embedding;

/// Axis-aligned face bounding box in pixel coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Box width.
    pub width: f32,
    /// Box height.
    pub height: f32,
}

/// A face found in an image.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedFace {
    /// Where the face is.
    pub region: BoundingBox,

    /// Normalized identity signature (`D_face`).
    pub signature: Embedding,
}

impl DetectedFace {
    /// Creates a detected face with an empty bounding box.
    pub fn from_signature(signature: Embedding) -> Self {
        Self {
            region: BoundingBox::default(),
            signature,
        }
    }
}

/// Embedding provider trait.
///
/// Implementations must be thread-safe (`Send + Sync`): the identity index
/// calls `detect_faces` from concurrent `identify` requests.
///
/// Implementations should return
/// [`IdentityError::UnreadableImage`](crate::IdentityError::UnreadableImage)
/// when a file exists but cannot be decoded, and
/// [`PixRecallError::Embedding`] for model failures.
///
/// # Implementing a Provider
///
/// ```rust,ignore
/// use pixrecall::embedding::{DetectedFace, EmbeddingProvider};
/// use pixrecall::{Embedding, Result};
///
/// struct InferenceClient { /* ... */ }
///
/// impl EmbeddingProvider for InferenceClient {
///     fn detect_faces(&self, image: &Path) -> Result<Vec<DetectedFace>> { ... }
///     fn embed_image(&self, image: &Path) -> Result<Embedding> { ... }
///     fn embed_text(&self, text: &str) -> Result<Embedding> { ... }
///     fn caption(&self, image: &Path) -> Result<String> { ... }
///     fn face_dimension(&self) -> usize { 512 }
///     fn image_dimension(&self) -> usize { 512 }
/// }
/// ```
pub trait EmbeddingProvider: Send + Sync {
    /// Detects every face in the image, in detector order.
    fn detect_faces(&self, image: &Path) -> Result<Vec<DetectedFace>>;

    /// Embeds the whole image into the semantic space.
    fn embed_image(&self, image: &Path) -> Result<Embedding>;

    /// Embeds a text query into the semantic space.
    fn embed_text(&self, text: &str) -> Result<Embedding>;

    /// Generates a natural-language caption for the image.
    fn caption(&self, image: &Path) -> Result<String>;

    /// Dimension of face signatures produced by `detect_faces`.
    fn face_dimension(&self) -> usize;

    /// Dimension of embeddings produced by `embed_image` and `embed_text`.
    fn image_dimension(&self) -> usize;

    /// Validates that a face signature has the correct dimension.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::DimensionMismatch` if dimensions don't match.
    fn validate_signature(&self, signature: &[f32]) -> Result<()> {
        check_dimension(self.face_dimension(), signature)
    }

    /// Validates that a semantic embedding has the correct dimension.
    fn validate_embedding(&self, embedding: &[f32]) -> Result<()> {
        check_dimension(self.image_dimension(), embedding)
    }
}

fn check_dimension(expected: usize, vector: &[f32]) -> Result<()> {
    if vector.len() != expected {
        return Err(PixRecallError::Validation(
            ValidationError::dimension_mismatch(expected, vector.len()),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedDims;

    impl EmbeddingProvider for FixedDims {
        fn detect_faces(&self, _image: &Path) -> Result<Vec<DetectedFace>> {
            Ok(vec![DetectedFace::from_signature(vec![1.0, 0.0])])
        }

        fn embed_image(&self, _image: &Path) -> Result<Embedding> {
            Ok(vec![0.0; 3])
        }

        fn embed_text(&self, _text: &str) -> Result<Embedding> {
            Err(PixRecallError::embedding("text encoder offline"))
        }

        fn caption(&self, _image: &Path) -> Result<String> {
            Ok(String::new())
        }

        fn face_dimension(&self) -> usize {
            2
        }

        fn image_dimension(&self) -> usize {
            3
        }
    }

    #[test]
    fn test_validate_signature() {
        let provider = FixedDims;
        assert!(provider.validate_signature(&[0.6, 0.8]).is_ok());
        let err = provider.validate_signature(&[1.0]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_validate_embedding() {
        let provider = FixedDims;
        assert!(provider.validate_embedding(&[0.0, 0.0, 1.0]).is_ok());
        assert!(provider.validate_embedding(&[0.0, 1.0]).is_err());
    }

    #[test]
    fn test_provider_is_object_safe() {
        let provider: Box<dyn EmbeddingProvider> = Box::new(FixedDims);
        let faces = provider.detect_faces(Path::new("x.jpg")).unwrap();
        assert_eq!(faces.len(), 1);
        assert!(provider.embed_text("beach").is_err());
    }
}
