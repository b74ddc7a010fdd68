//! ukgen - Build and run configuration generator for Unikraft applications
//!
//! This crate enumerates the configuration variants of an application,
//! resolves them against the compilers and VMMs found on the host, and
//! renders the setup, build and run scripts for every resolved target.

/// Append a formatted line to a `String`.
macro_rules! push_line {
    ($dst:expr) => {
        $dst.push('\n')
    };
    ($dst:expr, $($arg:tt)*) => {{
        $dst.push_str(&format!($($arg)*));
        $dst.push('\n');
    }};
}

pub mod core;
pub mod generate;
pub mod ops;
pub mod probe;
pub mod resolver;
pub mod util;
pub mod variants;

/// Test utilities for ukgen unit tests.
///
/// Provides a scripted command source for the host probe, descriptor
/// fixtures and on-disk project layouts.
#[cfg(test)]
pub mod test_support;

pub use core::{
    manifest::AppManifest, target::TargetConfig, target::TargetRequest, variant::Variant,
};

pub use generate::ArtifactPlan;
pub use probe::HostCapabilities;
pub use resolver::Resolution;
pub use util::context::GlobalContext;

#[cfg(test)]
mod tests {
    #[test]
    fn test_push_line() {
        let mut text = String::new();
        push_line!(text, "make -j {}", 4);
        push_line!(text);
        push_line!(text, "done");
        assert_eq!(text, "make -j 4\n\ndone\n");
    }
}
