//! GitHub integration for release operations

mod notes;
mod release_manager;

pub use notes::{NOTES_HEADER, render_release_notes};
pub use release_manager::{
    DEFAULT_API_URL, GitHubPublisher, PublishedRelease, ReleasePublisher, ReleaseTarget,
};
