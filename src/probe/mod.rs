//! Host capability probe.
//!
//! Discovers the compilers and VMMs installed on the host by matching the
//! shell's completable command names against fixed patterns. Probing never
//! fails: a missing shell or an empty PATH simply yields no capabilities.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::core::axis::{Arch, Platform};
use crate::core::target::{CompilerDescriptor, CompilerKind, VmmDescriptor};
use crate::util::fs::normalize_path;
use crate::util::process::{find_executable, ProcessBuilder, PROBE_SHELL};

/// Cross-compilation prefix of the arm64 GNU toolchain.
pub const ARM64_CROSS_PREFIX: &str = "aarch64-linux-gnu-";

static NATIVE_GCC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^gcc-(\d+)$").expect("gcc pattern is a valid regex"));
static ARM64_GCC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^aarch64-linux-gnu-gcc-(\d+)$").expect("cross gcc pattern is a valid regex")
});
static CLANG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^clang-(\d+)$").expect("clang pattern is a valid regex"));

/// VMM binaries and the platform/arch they run.
const VMM_COMMANDS: &[(&str, Platform, Arch)] = &[
    ("qemu-system-x86_64", Platform::Qemu, Arch::X86_64),
    ("qemu-system-aarch64", Platform::Qemu, Arch::Arm64),
    ("firecracker-x86_64", Platform::Firecracker, Arch::X86_64),
    ("firecracker-aarch64", Platform::Firecracker, Arch::Arm64),
];

/// Command name of the VMM running `platform` guests of `arch`.
pub fn vmm_command(platform: Platform, arch: Arch) -> Option<&'static str> {
    VMM_COMMANDS
        .iter()
        .find(|(_, p, a)| *p == platform && *a == arch)
        .map(|(cmd, _, _)| *cmd)
}

/// Source of command names and their locations.
pub trait CommandSource {
    /// Every command name the host can run.
    fn command_names(&self) -> Vec<String>;

    /// Absolute path of a command, if it resolves to an executable.
    fn resolve(&self, name: &str) -> Option<PathBuf>;
}

/// Lists commands with `bash -c "compgen -c"` and resolves them in PATH.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCommandSource;

impl CommandSource for ShellCommandSource {
    fn command_names(&self) -> Vec<String> {
        match ProcessBuilder::new(PROBE_SHELL)
            .args(["-c", "compgen -c"])
            .stdout_lines()
        {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!("command discovery failed: {:#}", e);
                Vec::new()
            }
        }
    }

    fn resolve(&self, name: &str) -> Option<PathBuf> {
        find_executable(name)
    }
}

/// Compilers per arch and VMMs per arch and platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostCapabilities {
    pub compilers: BTreeMap<Arch, Vec<CompilerDescriptor>>,
    pub vmms: BTreeMap<Arch, BTreeMap<Platform, Vec<VmmDescriptor>>>,
}

impl HostCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compilers producing code for `arch`.
    pub fn compilers_for(&self, arch: Arch) -> &[CompilerDescriptor] {
        self.compilers.get(&arch).map(Vec::as_slice).unwrap_or(&[])
    }

    /// VMMs running `platform` guests of `arch`.
    pub fn vmms_for(&self, arch: Arch, platform: Platform) -> &[VmmDescriptor] {
        self.vmms
            .get(&arch)
            .and_then(|by_platform| by_platform.get(&platform))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Record a compiler for `arch`, ignoring duplicates.
    pub fn add_compiler(&mut self, arch: Arch, compiler: CompilerDescriptor) {
        let list = self.compilers.entry(arch).or_default();
        if !list.iter().any(|c| same_tool(&c.name, &c.path, &compiler.name, &compiler.path)) {
            list.push(compiler);
        }
    }

    /// Record a VMM, ignoring duplicates.
    pub fn add_vmm(&mut self, vmm: VmmDescriptor) {
        let list = self
            .vmms
            .entry(vmm.arch)
            .or_default()
            .entry(vmm.platform)
            .or_default();
        if !list.iter().any(|v| same_tool(&v.name, &v.path, &vmm.name, &vmm.path)) {
            list.push(vmm);
        }
    }

    /// Drop every compiler with the given command name.
    pub fn remove_compiler(&mut self, name: &str) {
        for list in self.compilers.values_mut() {
            list.retain(|c| c.name != name);
        }
    }

    pub fn compiler_count(&self) -> usize {
        self.compilers.values().map(Vec::len).sum()
    }

    pub fn vmm_count(&self) -> usize {
        self.vmms
            .values()
            .flat_map(|by_platform| by_platform.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.compiler_count() == 0 && self.vmm_count() == 0
    }

    fn sort(&mut self) {
        for list in self.compilers.values_mut() {
            list.sort_by(|a, b| (a.kind, a.version, &a.name).cmp(&(b.kind, b.version, &b.name)));
        }
        for list in self.vmms.values_mut().flat_map(|m| m.values_mut()) {
            list.sort_by(|a, b| a.name.cmp(&b.name));
        }
    }
}

fn same_tool(name_a: &str, path_a: &Path, name_b: &str, path_b: &Path) -> bool {
    name_a == name_b || normalize_path(path_a) == normalize_path(path_b)
}

/// Probe the host through the shell.
pub fn discover() -> HostCapabilities {
    match Arch::host() {
        Some(arch) => discover_with(&ShellCommandSource, arch),
        None => {
            tracing::warn!(
                "unsupported host architecture `{}`, assuming x86_64",
                std::env::consts::ARCH
            );
            discover_with(&ShellCommandSource, Arch::X86_64)
        }
    }
}

/// Probe the commands of `source`. Native `gcc-<N>` targets `host_arch`.
pub fn discover_with(source: &dyn CommandSource, host_arch: Arch) -> HostCapabilities {
    let mut names = source.command_names();
    names.sort();
    names.dedup();

    let mut host = HostCapabilities::new();
    for name in &names {
        if let Some((kind, version, arches, cross_prefix)) = match_compiler(name, host_arch) {
            let Some(path) = source.resolve(name) else {
                tracing::debug!("`{}` is listed but does not resolve, skipping", name);
                continue;
            };
            for arch in arches {
                host.add_compiler(
                    arch,
                    CompilerDescriptor {
                        kind,
                        version,
                        name: name.clone(),
                        path: path.clone(),
                        cross_prefix: cross_prefix.map(str::to_string),
                    },
                );
            }
        } else if let Some(&(_, platform, arch)) =
            VMM_COMMANDS.iter().find(|(cmd, _, _)| cmd == name)
        {
            let Some(path) = source.resolve(name) else {
                tracing::debug!("`{}` is listed but does not resolve, skipping", name);
                continue;
            };
            host.add_vmm(VmmDescriptor {
                platform,
                arch,
                name: name.clone(),
                path,
            });
        }
    }

    host.sort();
    tracing::debug!(
        "probed {} compiler(s) and {} VMM(s)",
        host.compiler_count(),
        host.vmm_count()
    );
    host
}

type CompilerMatch = (CompilerKind, u32, Vec<Arch>, Option<&'static str>);

fn match_compiler(name: &str, host_arch: Arch) -> Option<CompilerMatch> {
    let version = |re: &Regex| {
        re.captures(name)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u32>().ok())
    };

    if let Some(v) = version(&NATIVE_GCC) {
        return Some((CompilerKind::Gcc, v, vec![host_arch], None));
    }
    if let Some(v) = version(&ARM64_GCC) {
        return Some((CompilerKind::Gcc, v, vec![Arch::Arm64], Some(ARM64_CROSS_PREFIX)));
    }
    if let Some(v) = version(&CLANG) {
        return Some((CompilerKind::Clang, v, vec![Arch::X86_64, Arch::Arm64], None));
    }
    None
}
