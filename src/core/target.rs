//! Host tool descriptors and resolved target configurations.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::core::axis::{Arch, Bootloader, BuildTool, DebugLevel, FsType, Platform, RunTool};
use crate::core::variant::BuildVariant;

/// Compiler family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerKind {
    Gcc,
    Clang,
}

impl CompilerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerKind::Gcc => "gcc",
            CompilerKind::Clang => "clang",
        }
    }
}

impl fmt::Display for CompilerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A compiler found on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CompilerDescriptor {
    /// Compiler family
    pub kind: CompilerKind,
    /// Major version taken from the command name
    pub version: u32,
    /// Command name as found in PATH (e.g. `aarch64-linux-gnu-gcc-12`)
    pub name: String,
    /// Absolute path of the executable
    pub path: PathBuf,
    /// Cross-compilation prefix (e.g. `aarch64-linux-gnu-`)
    pub cross_prefix: Option<String>,
}

impl CompilerDescriptor {
    /// Short identity used in file names and as Unikraft's `COMPILER`
    /// (e.g. `gcc-12`, `clang-15`).
    pub fn tag(&self) -> String {
        format!("{}-{}", self.kind, self.version)
    }

    /// Variables passed on the `make` command line to select this compiler.
    pub fn make_variables(&self) -> Vec<String> {
        let mut vars = vec![format!("COMPILER={}", self.tag())];
        if let Some(ref prefix) = self.cross_prefix {
            vars.push(format!("CROSS_COMPILE={}", prefix));
        }
        vars
    }
}

impl fmt::Display for CompilerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path.display())
    }
}

/// A virtual machine monitor found on the host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct VmmDescriptor {
    pub platform: Platform,
    pub arch: Arch,
    /// Command name (e.g. `qemu-system-x86_64`)
    pub name: String,
    pub path: PathBuf,
}

impl fmt::Display for VmmDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.path.display())
    }
}

/// One `platform/arch` target requested by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetRequest {
    pub platform: Platform,
    pub arch: Arch,
    /// Embed the root filesystem into the image
    pub einitrd: bool,
    /// Allowed build tools
    pub build_tools: Vec<BuildTool>,
    /// Allowed run tools
    pub run_tools: Vec<RunTool>,
    /// Allowed filesystems (empty = any)
    pub filesystems: Vec<FsType>,
}

impl TargetRequest {
    /// Request every build and run tool, any filesystem.
    pub fn new(platform: Platform, arch: Arch) -> Self {
        TargetRequest {
            platform,
            arch,
            einitrd: false,
            build_tools: BuildTool::ALL.to_vec(),
            run_tools: RunTool::ALL.to_vec(),
            filesystems: Vec::new(),
        }
    }

    pub fn with_einitrd(mut self, einitrd: bool) -> Self {
        self.einitrd = einitrd;
        self
    }

    pub fn with_build_tools(mut self, tools: impl Into<Vec<BuildTool>>) -> Self {
        self.build_tools = tools.into();
        self
    }

    pub fn with_run_tools(mut self, tools: impl Into<Vec<RunTool>>) -> Self {
        self.run_tools = tools.into();
        self
    }

    pub fn with_filesystems(mut self, filesystems: impl Into<Vec<FsType>>) -> Self {
        self.filesystems = filesystems.into();
        self
    }

    /// Whether a typed variant satisfies this request.
    pub fn accepts(&self, variant: &BuildVariant) -> bool {
        variant.platform == self.platform
            && variant.arch == self.arch
            && self.build_tools.contains(&variant.build_tool)
            && self.run_tools.contains(&variant.run_tool)
            && (self.filesystems.is_empty() || self.filesystems.contains(&variant.fs))
    }
}

impl fmt::Display for TargetRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.platform.short_name(), self.arch)?;
        if self.einitrd {
            write!(f, " (einitrd)")?;
        }
        Ok(())
    }
}

/// A variant joined with concrete host tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetConfig {
    pub variant: BuildVariant,
    pub compiler: CompilerDescriptor,
    /// `None` when no VMM for the platform was found on the host
    pub vmm: Option<VmmDescriptor>,
    pub einitrd: bool,
}

impl TargetConfig {
    /// Suffix distinguishing defconfigs that differ from the default
    /// boot protocol, debug level or initrd embedding.
    pub fn suffix(&self) -> String {
        let mut suffix = self.variant_suffix();
        if self.einitrd {
            suffix.push_str("-einitrd");
        }
        suffix
    }

    /// Boot protocol and debug level part of [`TargetConfig::suffix`].
    pub fn variant_suffix(&self) -> String {
        let mut suffix = String::new();
        if self.variant.bootloader != Bootloader::Multiboot {
            suffix.push('-');
            suffix.push_str(self.variant.bootloader.as_str());
        }
        if self.variant.debug != DebugLevel::None {
            suffix.push('-');
            suffix.push_str(self.variant.debug.as_str());
        }
        suffix
    }

    /// Name of the defconfig file, e.g. `qemu-x86_64` or `fc-arm64-einitrd`.
    pub fn defconfig_name(&self) -> String {
        format!(
            "{}-{}{}",
            self.variant.platform.short_name(),
            self.variant.arch,
            self.suffix()
        )
    }

    /// Identity of the tool producing the image: the compiler for `make`
    /// builds, `kraft` for kraft builds.
    pub fn build_tag(&self) -> String {
        match self.variant.build_tool {
            BuildTool::Make => self.compiler.tag(),
            BuildTool::Kraft => "kraft".to_string(),
        }
    }

    /// Identity of the built image, e.g. `gcc-12-qemu-x86_64`.
    pub fn kernel_tag(&self) -> String {
        format!("{}-{}", self.build_tag(), self.defconfig_name())
    }

    /// Unikraft application name for this target.
    pub fn kernel_name(&self, app_name: &str) -> String {
        if self.einitrd {
            format!("{}-einitrd", app_name)
        } else {
            app_name.to_string()
        }
    }

    /// Image name as produced by the Unikraft build, e.g. `nginx_qemu-x86_64`.
    pub fn unikraft_image_name(&self, app_name: &str) -> String {
        format!(
            "{}_{}-{}",
            self.kernel_name(app_name),
            self.variant.platform.short_name(),
            self.variant.arch
        )
    }

    /// File name of the image once linked into the kernel directory.
    pub fn image_file_name(&self, app_name: &str) -> String {
        format!(
            "{}-{}{}",
            self.build_tag(),
            self.unikraft_image_name(app_name),
            self.variant_suffix()
        )
    }
}

impl fmt::Display for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{} {} run:{} fs:{} net:{}]",
            self.kernel_tag(),
            self.variant.hypervisor,
            self.compiler.name,
            self.variant.run_tool,
            self.variant.fs,
            self.variant.networking
        )?;
        if let Some(ref vmm) = self.vmm {
            write!(f, " via {}", vmm.name)?;
        }
        Ok(())
    }
}
