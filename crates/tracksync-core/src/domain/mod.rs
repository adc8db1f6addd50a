//! Domain model (IDs, tickets, stories, webhook records, errors).
//!
//! ここにあるものはすべて純粋なデータとルールで、
//! ストレージやリモート API には一切依存しません。

pub mod errors;
pub mod ids;
pub mod milestone;
pub mod payload;
pub mod story;
pub mod ticket;
pub mod webhook;

pub use errors::{ErrorKind, RemoteError, Service, StoreError, SyncError, ValidationError};
pub use ids::{IssueId, IssueNumber, MilestoneId, StoryId, WebHookId};
pub use milestone::Milestone;
pub use payload::{IssueFields, MilestoneRef};
pub use story::{Iteration, Label, NewStory, Story, StoryState, StoryType, StoryUpdate};
pub use ticket::{
    DEFAULT_TRIGGERING_LABEL, FieldChanges, IssueState, SyncPhase, Ticket, eta_for,
};
pub use webhook::{SyncState, WebHookRecord};
