//! Configuration axes and their value domains.
//!
//! An axis is a named build/run dimension (architecture, platform, build
//! tool, ...). The variant engine works on string values so that callers can
//! narrow or reorder domains freely; the typed enums below are the closed
//! vocabulary those strings come from.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a configuration axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisName {
    Arch,
    Hypervisor,
    Platform,
    BuildTool,
    RunTool,
    Bootloader,
    Debug,
    Fs,
    Networking,
}

impl AxisName {
    /// Every axis, in default declaration order.
    pub const ALL: [AxisName; 9] = [
        AxisName::Arch,
        AxisName::Hypervisor,
        AxisName::Platform,
        AxisName::BuildTool,
        AxisName::RunTool,
        AxisName::Bootloader,
        AxisName::Debug,
        AxisName::Fs,
        AxisName::Networking,
    ];

    /// Get the axis name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AxisName::Arch => "arch",
            AxisName::Hypervisor => "hypervisor",
            AxisName::Platform => "platform",
            AxisName::BuildTool => "build_tool",
            AxisName::RunTool => "run_tool",
            AxisName::Bootloader => "bootloader",
            AxisName::Debug => "debug",
            AxisName::Fs => "fs",
            AxisName::Networking => "networking",
        }
    }

    /// Canonical spelling of a value of this axis (`fc` -> `firecracker`,
    /// `aarch64` -> `arm64`), or `None` if the value is not part of the
    /// axis vocabulary.
    pub fn canonical_value(&self, value: &str) -> Option<&'static str> {
        match self {
            AxisName::Arch => value.parse::<Arch>().ok().map(|v| v.as_str()),
            AxisName::Hypervisor => value.parse::<Hypervisor>().ok().map(|v| v.as_str()),
            AxisName::Platform => value.parse::<Platform>().ok().map(|v| v.as_str()),
            AxisName::BuildTool => value.parse::<BuildTool>().ok().map(|v| v.as_str()),
            AxisName::RunTool => value.parse::<RunTool>().ok().map(|v| v.as_str()),
            AxisName::Bootloader => value.parse::<Bootloader>().ok().map(|v| v.as_str()),
            AxisName::Debug => value.parse::<DebugLevel>().ok().map(|v| v.as_str()),
            AxisName::Fs => value.parse::<FsType>().ok().map(|v| v.as_str()),
            AxisName::Networking => value.parse::<Networking>().ok().map(|v| v.as_str()),
        }
    }
}

impl fmt::Display for AxisName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AxisName {
    type Err = AxisNameParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "arch" => Ok(AxisName::Arch),
            "hypervisor" => Ok(AxisName::Hypervisor),
            "platform" | "plat" => Ok(AxisName::Platform),
            "build_tool" => Ok(AxisName::BuildTool),
            "run_tool" => Ok(AxisName::RunTool),
            "bootloader" => Ok(AxisName::Bootloader),
            "debug" => Ok(AxisName::Debug),
            "fs" => Ok(AxisName::Fs),
            "networking" => Ok(AxisName::Networking),
            _ => Err(AxisNameParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown axis name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisNameParseError(pub String);

impl fmt::Display for AxisNameParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown axis '{}', valid axes: arch, hypervisor, platform, build_tool, \
             run_tool, bootloader, debug, fs, networking",
            self.0
        )
    }
}

impl std::error::Error for AxisNameParseError {}

/// Error returned when a string is not a member of a typed axis domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AxisValueParseError {
    pub axis: AxisName,
    pub value: String,
}

impl fmt::Display for AxisValueParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} '{}'", self.axis, self.value)
    }
}

impl std::error::Error for AxisValueParseError {}

fn value_error(axis: AxisName, value: &str) -> AxisValueParseError {
    AxisValueParseError {
        axis,
        value: value.to_string(),
    }
}

/// CPU architecture of the unikernel image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Arch {
    #[serde(rename = "arm64", alias = "aarch64")]
    Arm64,
    #[serde(rename = "x86_64")]
    X86_64,
}

impl Arch {
    pub const ALL: &'static [Arch] = &[Arch::Arm64, Arch::X86_64];

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Arm64 => "arm64",
            Arch::X86_64 => "x86_64",
        }
    }

    /// The architecture of the machine running this process, if supported.
    pub fn host() -> Option<Arch> {
        match std::env::consts::ARCH {
            "x86_64" => Some(Arch::X86_64),
            "aarch64" => Some(Arch::Arm64),
            _ => None,
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Arch {
    type Err = AxisValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "arm64" | "aarch64" => Ok(Arch::Arm64),
            "x86_64" => Ok(Arch::X86_64),
            _ => Err(value_error(AxisName::Arch, s)),
        }
    }
}

/// Hypervisor the VMM runs on top of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hypervisor {
    None,
    Kvm,
    Xen,
}

impl Hypervisor {
    pub const ALL: &'static [Hypervisor] = &[Hypervisor::None, Hypervisor::Kvm, Hypervisor::Xen];

    pub fn as_str(&self) -> &'static str {
        match self {
            Hypervisor::None => "none",
            Hypervisor::Kvm => "kvm",
            Hypervisor::Xen => "xen",
        }
    }
}

impl fmt::Display for Hypervisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Hypervisor {
    type Err = AxisValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Hypervisor::None),
            "kvm" => Ok(Hypervisor::Kvm),
            "xen" => Ok(Hypervisor::Xen),
            _ => Err(value_error(AxisName::Hypervisor, s)),
        }
    }
}

/// Unikraft platform, i.e. the machine model the image is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Qemu,
    #[serde(alias = "fc")]
    Firecracker,
    Xen,
}

impl Platform {
    pub const ALL: &'static [Platform] = &[Platform::Qemu, Platform::Firecracker, Platform::Xen];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Qemu => "qemu",
            Platform::Firecracker => "firecracker",
            Platform::Xen => "xen",
        }
    }

    /// Short name used by `kraft --plat` and in generated file names.
    pub fn short_name(&self) -> &'static str {
        match self {
            Platform::Qemu => "qemu",
            Platform::Firecracker => "fc",
            Platform::Xen => "xen",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = AxisValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qemu" => Ok(Platform::Qemu),
            "firecracker" | "fc" => Ok(Platform::Firecracker),
            "xen" => Ok(Platform::Xen),
            _ => Err(value_error(AxisName::Platform, s)),
        }
    }
}

/// Tool driving the kernel build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTool {
    Make,
    Kraft,
}

impl BuildTool {
    pub const ALL: &'static [BuildTool] = &[BuildTool::Make, BuildTool::Kraft];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildTool::Make => "make",
            BuildTool::Kraft => "kraft",
        }
    }
}

impl fmt::Display for BuildTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BuildTool {
    type Err = AxisValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "make" => Ok(BuildTool::Make),
            "kraft" => Ok(BuildTool::Kraft),
            _ => Err(value_error(AxisName::BuildTool, s)),
        }
    }
}

/// Tool launching the built image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunTool {
    /// Invoke the VMM binary directly.
    Vmm,
    Kraft,
}

impl RunTool {
    pub const ALL: &'static [RunTool] = &[RunTool::Vmm, RunTool::Kraft];

    pub fn as_str(&self) -> &'static str {
        match self {
            RunTool::Vmm => "vmm",
            RunTool::Kraft => "kraft",
        }
    }
}

impl fmt::Display for RunTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RunTool {
    type Err = AxisValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vmm" => Ok(RunTool::Vmm),
            "kraft" => Ok(RunTool::Kraft),
            _ => Err(value_error(AxisName::RunTool, s)),
        }
    }
}

/// Boot protocol compiled into the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bootloader {
    Multiboot,
    Uefi,
}

impl Bootloader {
    pub const ALL: &'static [Bootloader] = &[Bootloader::Multiboot, Bootloader::Uefi];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bootloader::Multiboot => "multiboot",
            Bootloader::Uefi => "uefi",
        }
    }
}

impl fmt::Display for Bootloader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Bootloader {
    type Err = AxisValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiboot" => Ok(Bootloader::Multiboot),
            "uefi" => Ok(Bootloader::Uefi),
            _ => Err(value_error(AxisName::Bootloader, s)),
        }
    }
}

/// Kernel debug output level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    None,
    Strace,
    Err,
    Info,
    Debug,
}

impl DebugLevel {
    pub const ALL: &'static [DebugLevel] = &[
        DebugLevel::None,
        DebugLevel::Strace,
        DebugLevel::Err,
        DebugLevel::Info,
        DebugLevel::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DebugLevel::None => "none",
            DebugLevel::Strace => "strace",
            DebugLevel::Err => "err",
            DebugLevel::Info => "info",
            DebugLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for DebugLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DebugLevel {
    type Err = AxisValueParseError;

    fn from_str(s: &str) -> Result<Self, AxisValueParseError> {
        match s {
            "none" => Ok(DebugLevel::None),
            "strace" => Ok(DebugLevel::Strace),
            "err" => Ok(DebugLevel::Err),
            "info" => Ok(DebugLevel::Info),
            "debug" => Ok(DebugLevel::Debug),
            _ => Err(value_error(AxisName::Debug, s)),
        }
    }
}

/// Root filesystem handed to the running image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FsType {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "initrd")]
    Initrd,
    #[serde(rename = "9pfs")]
    NineP,
}

impl FsType {
    pub const ALL: &'static [FsType] = &[FsType::None, FsType::Initrd, FsType::NineP];

    pub fn as_str(&self) -> &'static str {
        match self {
            FsType::None => "none",
            FsType::Initrd => "initrd",
            FsType::NineP => "9pfs",
        }
    }

    /// Name used as the file-name suffix of run artifacts.
    pub fn file_tag(&self) -> &'static str {
        match self {
            FsType::None => "nofs",
            FsType::Initrd => "initrd",
            FsType::NineP => "9pfs",
        }
    }
}

impl fmt::Display for FsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for FsType {
    type Err = AxisValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" | "nofs" => Ok(FsType::None),
            "initrd" => Ok(FsType::Initrd),
            "9pfs" => Ok(FsType::NineP),
            _ => Err(value_error(AxisName::Fs, s)),
        }
    }
}

/// Guest networking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Networking {
    None,
    Bridge,
    Nat,
    Tap,
}

impl Networking {
    pub const ALL: &'static [Networking] = &[
        Networking::None,
        Networking::Bridge,
        Networking::Nat,
        Networking::Tap,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Networking::None => "none",
            Networking::Bridge => "bridge",
            Networking::Nat => "nat",
            Networking::Tap => "tap",
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, Networking::None)
    }
}

impl fmt::Display for Networking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Networking {
    type Err = AxisValueParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Networking::None),
            "bridge" => Ok(Networking::Bridge),
            "nat" => Ok(Networking::Nat),
            "tap" => Ok(Networking::Tap),
            _ => Err(value_error(AxisName::Networking, s)),
        }
    }
}

/// One axis with its enumerated domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Axis {
    pub name: AxisName,
    pub values: Vec<String>,
}

/// Ordered set of axes. Declaration order defines variant order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Axes {
    axes: Vec<Axis>,
}

impl Axes {
    /// Create an empty axis set.
    pub fn new() -> Self {
        Axes { axes: Vec::new() }
    }

    /// The full default domains of every axis.
    pub fn defaults() -> Self {
        Axes::new()
            .with(AxisName::Arch, Arch::ALL.iter().map(Arch::as_str))
            .with(AxisName::Hypervisor, Hypervisor::ALL.iter().map(Hypervisor::as_str))
            .with(AxisName::Platform, Platform::ALL.iter().map(Platform::as_str))
            .with(AxisName::BuildTool, BuildTool::ALL.iter().map(BuildTool::as_str))
            .with(AxisName::RunTool, RunTool::ALL.iter().map(RunTool::as_str))
            .with(AxisName::Bootloader, Bootloader::ALL.iter().map(Bootloader::as_str))
            .with(AxisName::Debug, DebugLevel::ALL.iter().map(DebugLevel::as_str))
            .with(AxisName::Fs, FsType::ALL.iter().map(FsType::as_str))
            .with(AxisName::Networking, Networking::ALL.iter().map(Networking::as_str))
    }

    /// Set the domain of an axis.
    ///
    /// Replaces the domain in place if the axis is already declared, so the
    /// declaration order is kept. Duplicate values are dropped.
    pub fn with<I, S>(mut self, name: AxisName, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut domain: Vec<String> = Vec::new();
        for value in values {
            let value = value.into();
            if !domain.contains(&value) {
                domain.push(value);
            }
        }

        match self.axes.iter_mut().find(|a| a.name == name) {
            Some(axis) => axis.values = domain,
            None => self.axes.push(Axis {
                name,
                values: domain,
            }),
        }
        self
    }

    /// Domain of an axis, if declared.
    pub fn domain(&self, name: AxisName) -> Option<&[String]> {
        self.axes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.values.as_slice())
    }

    pub fn contains(&self, name: AxisName) -> bool {
        self.axes.iter().any(|a| a.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Axis> {
        self.axes.iter()
    }

    pub fn len(&self) -> usize {
        self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Size of the full cross-product.
    pub fn product_size(&self) -> usize {
        self.axes.iter().map(|a| a.values.len()).product()
    }
}
