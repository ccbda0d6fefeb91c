pub mod dispatcher;
pub mod events;
pub mod item;
pub mod store;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use events::{
    ChannelSink, EventJournal, FanoutSink, NotificationEvent, NotificationSink, TracingSink,
};
pub use item::{
    ItemId, ItemState, ItemStatus, QueueItem, QueueSummary, Rejection, RejectionReason,
    SubmissionReport,
};
pub use store::{QueueStore, TransitionOutcome};
pub use worker::ResolutionWorker;
