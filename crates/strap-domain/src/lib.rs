#![deny(clippy::all, warnings)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod fingerprint;
pub mod project;
pub mod state;

pub use fingerprint::{fingerprint_file, is_well_formed_digest};
pub use project::{discover_project_root, discover_project_root_from, ProjectLayout};
pub use state::{RestartReason, Revision, RevisionPair, UpdateDecision};
