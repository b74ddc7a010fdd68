//! Test fixtures for common test scenarios.

use std::path::{Path, PathBuf};

use crate::core::axis::{Arch, Platform};
use crate::core::manifest::APP_MANIFEST;
use crate::core::target::{CompilerDescriptor, CompilerKind, VmmDescriptor};
use crate::probe::{HostCapabilities, ARM64_CROSS_PREFIX};
use crate::util::config::CONFIG_FILE;
use crate::variants::EXCLUSIONS_FILE;

/// Native `gcc-<version>`.
pub fn gcc(version: u32) -> CompilerDescriptor {
    CompilerDescriptor {
        kind: CompilerKind::Gcc,
        version,
        name: format!("gcc-{}", version),
        path: PathBuf::from(format!("/usr/bin/gcc-{}", version)),
        cross_prefix: None,
    }
}

/// `aarch64-linux-gnu-gcc-<version>`.
pub fn cross_gcc(version: u32) -> CompilerDescriptor {
    let name = format!("{}gcc-{}", ARM64_CROSS_PREFIX, version);
    CompilerDescriptor {
        kind: CompilerKind::Gcc,
        version,
        path: PathBuf::from("/usr/bin").join(&name),
        name,
        cross_prefix: Some(ARM64_CROSS_PREFIX.to_string()),
    }
}

/// `clang-<version>`.
pub fn clang(version: u32) -> CompilerDescriptor {
    CompilerDescriptor {
        kind: CompilerKind::Clang,
        version,
        name: format!("clang-{}", version),
        path: PathBuf::from(format!("/usr/bin/clang-{}", version)),
        cross_prefix: None,
    }
}

/// The VMM binary for a platform/arch pair.
pub fn vmm(platform: Platform, arch: Arch) -> VmmDescriptor {
    let name = match (platform, arch) {
        (Platform::Qemu, Arch::X86_64) => "qemu-system-x86_64",
        (Platform::Qemu, Arch::Arm64) => "qemu-system-aarch64",
        (Platform::Firecracker, Arch::X86_64) => "firecracker-x86_64",
        (Platform::Firecracker, Arch::Arm64) => "firecracker-aarch64",
        (Platform::Xen, _) => "xl",
    };
    VmmDescriptor {
        platform,
        arch,
        name: name.to_string(),
        path: PathBuf::from("/usr/bin").join(name),
    }
}

/// An x86_64 host with gcc-12, an arm64 cross gcc-12 and every VMM.
pub fn full_host() -> HostCapabilities {
    let mut host = HostCapabilities::new();
    host.add_compiler(Arch::X86_64, gcc(12));
    host.add_compiler(Arch::Arm64, cross_gcc(12));
    for arch in [Arch::X86_64, Arch::Arm64] {
        for platform in [Platform::Qemu, Platform::Firecracker] {
            host.add_vmm(vmm(platform, arch));
        }
    }
    host
}

/// Minimal application descriptor.
pub const HELLO_APP: &str = r#"name = "hello"
cmd = ["/hello"]
targets = ["qemu/x86_64", "fc/x86_64"]

[libraries.musl]
"#;

/// Minimal user descriptor.
pub const BASIC_CONFIG: &str = "memory = 64\n";

/// A project directory with its descriptors.
#[derive(Debug, Clone)]
pub struct ProjectFixture {
    /// Directory name of the project
    pub name: String,
    /// app.toml content
    pub app: String,
    /// config.toml content
    pub config: Option<String>,
    /// variants.toml content
    pub exclusions: Option<String>,
    /// Root filesystem directory to create
    pub rootfs: Option<PathBuf>,
}

impl ProjectFixture {
    pub fn new(name: impl Into<String>) -> Self {
        ProjectFixture {
            name: name.into(),
            app: HELLO_APP.to_string(),
            config: Some(BASIC_CONFIG.to_string()),
            exclusions: None,
            rootfs: None,
        }
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = app.into();
        self
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }

    pub fn without_config(mut self) -> Self {
        self.config = None;
        self
    }

    pub fn with_exclusions(mut self, exclusions: impl Into<String>) -> Self {
        self.exclusions = Some(exclusions.into());
        self
    }

    pub fn with_rootfs(mut self, dir: impl Into<PathBuf>) -> Self {
        self.rootfs = Some(dir.into());
        self
    }

    /// Write the project under `base` and return its root.
    pub fn write_to(&self, base: &Path) -> std::io::Result<PathBuf> {
        let root = base.join(&self.name);
        std::fs::create_dir_all(&root)?;
        std::fs::write(root.join(APP_MANIFEST), &self.app)?;
        if let Some(ref config) = self.config {
            std::fs::write(root.join(CONFIG_FILE), config)?;
        }
        if let Some(ref exclusions) = self.exclusions {
            std::fs::write(root.join(EXCLUSIONS_FILE), exclusions)?;
        }
        if let Some(ref rootfs) = self.rootfs {
            std::fs::create_dir_all(root.join(rootfs))?;
        }
        Ok(root)
    }
}
