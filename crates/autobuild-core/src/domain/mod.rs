//! Domain model for a single autobuild run.

pub mod build;
pub mod fetch;
pub mod installer;

pub use build::{BuildOutcome, BuildResult};
pub use fetch::{FetchMetadata, PullResult};
pub use installer::{InstallerResult, InstallerStatus};
