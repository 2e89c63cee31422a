//! Photo records.
//!
//! A **photo record** is created exactly once per successfully ingested
//! image. It carries the image's semantic embedding (`D_image`), the set of
//! people resolved by the identity index at ingestion time, and a caption.
//!
//! `people` is a snapshot: registering new reference faces later does not
//! re-label photos that were already ingested.

pub mod types;

pub use types::{NewPhoto, PhotoRecord};
