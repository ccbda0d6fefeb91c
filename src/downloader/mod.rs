//! Artifact retrieval

pub mod fetcher;

pub use fetcher::{ArtifactFetcher, FetchConfig};
