//! High-level operations.
//!
//! This module contains the implementation of ukgen commands.

pub mod listing;
pub mod project;
pub mod ukgen_generate;

pub use listing::{format_capabilities, format_targets, format_variants, list_targets, list_variants};
pub use project::{load_project, Project, ProjectOptions};
pub use ukgen_generate::{generate, generate_with, GenerateOptions, GenerateResult};
