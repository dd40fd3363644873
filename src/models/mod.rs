//! Data transfer objects shared by the git collaborators, the dossier
//! pipeline and the HTTP API.
//!
//! - `tree`: PathEntry, RepoMetadata, FileContent
//! - `commit`: CommitRecord, CommitFlag, ReviewedCommit, CommitSummary
//! - `manifest`: ManifestSummary

pub mod commit;
pub mod manifest;
pub mod tree;

pub use commit::*;
pub use manifest::*;
pub use tree::*;
