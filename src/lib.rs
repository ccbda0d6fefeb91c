//! Reelloader library

pub mod backend;
pub mod downloader;
pub mod queue;
pub mod resolver;
pub mod utils;

// Re-export main types for easier use
pub use backend::{BackendActor, BackendCommand, BackendEvent};
pub use downloader::{ArtifactFetcher, FetchConfig};
pub use queue::{
    Dispatcher, ItemId, ItemStatus, NotificationEvent, QueueItem, QueueStore, ResolutionWorker,
    SubmissionReport,
};
pub use resolver::{build_resolver, Artifact, MediaKind, Resolver};
pub use utils::{AppSettings, DispatchError, ReelloaderError, ResolverKind, UrlValidator};
