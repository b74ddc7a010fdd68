//! Application descriptor (`app.toml`) parsing and schema.
//!
//! The application descriptor names the unikernel, the Unikraft libraries it
//! links, the `platform/arch` pairs it targets and how it is launched.
//!
//! ```toml
//! name = "nginx"
//! cmd = ["/nginx", "-c", "/nginx/conf/nginx.conf"]
//! rootfs = "./rootfs"
//! targets = ["qemu/x86_64", "fc/x86_64"]
//!
//! [unikraft.kconfig]
//! CONFIG_LIBVFSCORE_AUTOMOUNT_CI_EINITRD = "y"
//!
//! [libraries.musl]
//! [libraries.lwip.kconfig]
//! CONFIG_LWIP_TCP = "y"
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::core::axis::{Arch, AxisValueParseError, Platform};

/// Default file name of the application descriptor.
pub const APP_MANIFEST: &str = "app.toml";

const EINITRD_SYMBOL: &str = "CONFIG_LIBVFSCORE_AUTOMOUNT_CI_EINITRD";
const AUTOMOUNT_SYMBOL: &str = "CONFIG_LIBVFSCORE_AUTOMOUNT_CI";

/// Directory a Dockerfile-built root filesystem is exported to.
pub const DOCKER_ROOTFS: &str = "rootfs";

/// Errors in an otherwise well-formed application descriptor.
#[derive(Debug, Error, Diagnostic)]
pub enum ManifestError {
    #[error("invalid target `{target}`, expected `platform/arch`")]
    #[diagnostic(
        code(ukgen::manifest::invalid_target),
        help("targets look like \"qemu/x86_64\" or \"fc/arm64\"")
    )]
    InvalidTarget { target: String },

    #[error("invalid target `{target}`: {source}")]
    #[diagnostic(code(ukgen::manifest::unknown_target))]
    UnknownTarget {
        target: String,
        #[source]
        source: AxisValueParseError,
    },

    #[error("no targets defined")]
    #[diagnostic(
        code(ukgen::manifest::no_targets),
        help("add at least one entry to `targets`, e.g. targets = [\"qemu/x86_64\"]")
    )]
    NoTargets,

    #[error("invalid template source `{0}`")]
    #[diagnostic(code(ukgen::manifest::invalid_template))]
    InvalidTemplate(String),
}

/// A Kconfig value as written in the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum KconfigValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for KconfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KconfigValue::Bool(true) => write!(f, "y"),
            KconfigValue::Bool(false) => write!(f, "n"),
            KconfigValue::Int(n) => write!(f, "{}", n),
            KconfigValue::Str(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CmdSpec {
    Args(Vec<String>),
    Line(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TemplateSpec {
    Source(String),
    Table { source: String },
}

#[derive(Debug, Default, Deserialize)]
struct KconfigSection {
    #[serde(default)]
    kconfig: toml::Table,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawAppManifest {
    name: Option<String>,
    cmd: Option<CmdSpec>,
    rootfs: Option<String>,
    template: Option<TemplateSpec>,
    #[serde(default)]
    targets: Vec<String>,
    #[serde(default)]
    unikraft: KconfigSection,
    #[serde(default)]
    libraries: toml::Table,
}

/// Template application the project is derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Git URL of the template repository
    pub source: String,
    /// Directory name under `workdir/apps`
    pub name: String,
}

impl Template {
    /// Derive the template name from its source URL: last path segment
    /// without the `app-` prefix and `.git` suffix.
    pub fn from_source(source: &str) -> Result<Self, ManifestError> {
        let segment = match url::Url::parse(source) {
            Ok(url) => url
                .path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
                .map(str::to_string),
            // scp-like git remotes and local paths
            Err(_) => source
                .rsplit(['/', ':'])
                .find(|s| !s.is_empty())
                .map(str::to_string),
        };

        let segment = segment.ok_or_else(|| ManifestError::InvalidTemplate(source.to_string()))?;
        let name = segment.strip_prefix("app-").unwrap_or(&segment);
        let name = name.strip_suffix(".git").unwrap_or(name);
        if name.is_empty() {
            return Err(ManifestError::InvalidTemplate(source.to_string()));
        }

        Ok(Template {
            source: source.to_string(),
            name: name.to_string(),
        })
    }
}

/// The parsed application descriptor.
#[derive(Debug, Clone)]
pub struct AppManifest {
    /// Application name
    pub name: String,
    /// Command line passed to the application
    pub cmd: Option<String>,
    /// Root filesystem directory (relative to the project root)
    pub rootfs: Option<String>,
    /// Dockerfile the root filesystem is exported from, when `rootfs`
    /// names one
    pub dockerfile: Option<String>,
    /// Template application
    pub template: Option<Template>,
    /// Unikraft libraries, in declaration order
    pub libraries: Vec<String>,
    /// Kconfig entries from `[unikraft]` and every library, in order
    pub kconfig: Vec<(String, String)>,
    /// Whether an embedded-initrd twin is generated for every target
    pub einitrd: bool,
    /// Requested `platform/arch` pairs
    pub targets: Vec<(Platform, Arch)>,
    /// The directory containing the descriptor
    pub manifest_dir: PathBuf,
}

impl AppManifest {
    /// Load an application descriptor from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).with_context(|| {
            format!("failed to read application descriptor: {}", path.display())
        })?;

        let manifest_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        Self::parse(&contents, &manifest_dir)
            .with_context(|| format!("invalid application descriptor: {}", path.display()))
    }

    /// Parse descriptor contents. `manifest_dir` provides the default name.
    pub fn parse(contents: &str, manifest_dir: &Path) -> Result<Self> {
        let raw: RawAppManifest = toml::from_str(contents)?;

        let name = match raw.name {
            Some(name) => name,
            None => {
                let dir = std::fs::canonicalize(manifest_dir)
                    .unwrap_or_else(|_| manifest_dir.to_path_buf());
                let name = dir
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("app")
                    .to_string();
                tracing::info!("`name` is not set, defaulting to directory name `{}`", name);
                name
            }
        };

        let cmd = raw.cmd.map(|cmd| match cmd {
            CmdSpec::Args(args) => args.join(" "),
            CmdSpec::Line(line) => line,
        });

        let template = raw
            .template
            .map(|t| match t {
                TemplateSpec::Source(source) | TemplateSpec::Table { source } => {
                    Template::from_source(&source)
                }
            })
            .transpose()?;

        let mut kconfig = Vec::new();
        merge_kconfig(&mut kconfig, &raw.unikraft.kconfig)?;

        let mut libraries = Vec::new();
        for (lib, spec) in &raw.libraries {
            libraries.push(lib.clone());
            // `[libraries.musl]` may be an empty table or carry a version string
            if spec.is_table() {
                let section: KconfigSection = spec
                    .clone()
                    .try_into()
                    .with_context(|| format!("invalid settings for library `{}`", lib))?;
                merge_kconfig(&mut kconfig, &section.kconfig)?;
            }
        }

        let einitrd = kconfig
            .iter()
            .any(|(k, v)| k == EINITRD_SYMBOL && v == "y");
        if einitrd {
            kconfig.retain(|(k, _)| k != EINITRD_SYMBOL && k != AUTOMOUNT_SYMBOL);
        }

        let (rootfs, dockerfile) = match raw.rootfs {
            Some(path) if Path::new(&path).file_name().is_some_and(|n| n == "Dockerfile") => {
                (Some(DOCKER_ROOTFS.to_string()), Some(path))
            }
            rootfs => (rootfs, None),
        };

        if raw.targets.is_empty() {
            return Err(ManifestError::NoTargets.into());
        }
        let mut targets = Vec::new();
        for target in &raw.targets {
            let pair = parse_target(target)?;
            if !targets.contains(&pair) {
                targets.push(pair);
            }
        }

        Ok(AppManifest {
            name,
            cmd,
            rootfs,
            dockerfile,
            template,
            libraries,
            kconfig,
            einitrd,
            targets,
            manifest_dir: manifest_dir.to_path_buf(),
        })
    }
}

/// Parse a `platform/arch` target string.
pub fn parse_target(target: &str) -> Result<(Platform, Arch), ManifestError> {
    let (plat, arch) = target
        .split_once('/')
        .ok_or_else(|| ManifestError::InvalidTarget {
            target: target.to_string(),
        })?;

    let unknown = |source| ManifestError::UnknownTarget {
        target: target.to_string(),
        source,
    };
    let platform: Platform = plat.trim().parse().map_err(unknown)?;
    let arch: Arch = arch.trim().parse().map_err(unknown)?;
    Ok((platform, arch))
}

/// Kconfig symbol enabling a Unikraft library.
///
/// `musl` becomes `CONFIG_LIBMUSL`, names already starting with `lib` keep
/// their prefix (`libelf` becomes `CONFIG_LIBELF`).
pub fn library_kconfig_symbol(lib: &str) -> String {
    let upper = lib.replace('-', "_").to_uppercase();
    if lib.starts_with("lib") {
        format!("CONFIG_{}", upper)
    } else {
        format!("CONFIG_LIB{}", upper)
    }
}

fn merge_kconfig(kconfig: &mut Vec<(String, String)>, table: &toml::Table) -> Result<()> {
    for (key, value) in table {
        let value: KconfigValue = value
            .clone()
            .try_into()
            .with_context(|| format!("invalid kconfig value for `{}`", key))?;
        let value = value.to_string();
        match kconfig.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => kconfig.push((key.clone(), value)),
        }
    }
    Ok(())
}
