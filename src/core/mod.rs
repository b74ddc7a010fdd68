//! Core data structures for ukgen.
//!
//! This module contains the foundational types used throughout ukgen:
//! - Configuration axes and their value domains
//! - Variants (one value per axis) and their typed view
//! - Host tool descriptors and resolved target configurations
//! - The application descriptor

pub mod axis;
pub mod manifest;
pub mod target;
pub mod variant;

pub use axis::{Arch, Axes, Axis, AxisName, Platform};
pub use manifest::{AppManifest, APP_MANIFEST};
pub use target::{CompilerDescriptor, TargetConfig, TargetRequest, VmmDescriptor};
pub use variant::{BuildVariant, Variant};
