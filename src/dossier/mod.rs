//! Dossier synthesis: folder tree, commit review, document model and
//! composition. Everything here is synchronous and free of I/O.

pub mod blocks;
pub mod commits;
pub mod composer;
pub mod document;
pub mod languages;
pub mod tree;

pub use blocks::parse_blocks;
pub use commits::{analyze_commits, summarize};
pub use composer::{compose, compose_text, DossierInput};
pub use document::{slug, Document, DocumentBlock, Section, TocEntry};
pub use tree::{render_paths, PathTree};
