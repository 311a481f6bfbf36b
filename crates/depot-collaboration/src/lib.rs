//! Pull requests for Depot.
//!
//! A pull request proposes merging a source branch into a target branch of
//! the same repository. Its status moves through a small state machine:
//!
//! ```text
//! open ──close──▶ closed
//!   ▲               │
//!   └────reopen─────┘
//! open ──merge──▶ merged (terminal)
//! ```
//!
//! Numbers are allocated per repository by the [`PullRequestStore`], which
//! must hand out each number at most once and reject a duplicate
//! `(repository, number)` insert.
//!
//! The [`PullRequestService`] applies the access rules and drives the state
//! machine; recording the outcome of a merge is all it does, the content
//! merge itself happens elsewhere.

mod error;
mod pull_request;
mod service;
mod store;

pub use error::{CollaborationError, Result};
pub use pull_request::{PullRequest, PullRequestStatus};
pub use service::{
    NewPullRequest, PullRequestService, PullRequestUpdate, MAX_NUMBER_ATTEMPTS,
    MAX_UPDATE_ATTEMPTS,
};
pub use store::{MemoryPullRequestStore, PullRequestStore};
