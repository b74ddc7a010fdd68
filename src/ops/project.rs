//! Loading a project: descriptors, generation axes and exclusion rules.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::axis::{
    Arch, AxisName, Axes, BuildTool, FsType, Hypervisor, Networking, Platform,
};
use crate::core::manifest::AppManifest;
use crate::core::target::TargetRequest;
use crate::generate::OutputLayout;
use crate::util::config::{load_config, UserConfig, CONFIG_FILE};
use crate::util::fs::normalize_path;
use crate::util::GlobalContext;
use crate::variants::rules::ExclusionRule;
use crate::variants::{ExclusionSet, EXCLUSIONS_FILE};

/// Where to find the descriptors. `None` means the default location.
#[derive(Debug, Clone, Default)]
pub struct ProjectOptions {
    /// Application descriptor (default: `app.toml` in cwd or a parent)
    pub app: Option<PathBuf>,

    /// User descriptor (default: `config.toml` next to the application)
    pub config: Option<PathBuf>,

    /// Exclusion rules (default: `variants.toml` next to the application,
    /// if present)
    pub exclusions: Option<PathBuf>,
}

/// A loaded project, ready for enumeration.
#[derive(Debug, Clone)]
pub struct Project {
    /// Directory of the application descriptor
    pub root: PathBuf,
    pub app: AppManifest,
    pub config: UserConfig,
    /// Axes narrowed to what the descriptors ask for
    pub axes: Axes,
    /// Acceleration rules followed by the user's exclusion rules
    pub rules: Vec<ExclusionRule>,
}

impl Project {
    pub fn layout(&self) -> OutputLayout {
        OutputLayout::new(&self.root, &self.config)
    }

    /// One request per application target, plus its embedded-initrd twin.
    pub fn requests(&self) -> Vec<TargetRequest> {
        target_requests(&self.app)
    }
}

/// Load the project described by `opts`.
pub fn load_project(gctx: &GlobalContext, opts: &ProjectOptions) -> Result<Project> {
    let app_path = match opts.app {
        Some(ref path) => gctx.resolve_path(path),
        None => gctx.find_app_manifest()?,
    };
    let app = AppManifest::load(&app_path)?;
    let root = normalize_path(&app.manifest_dir);

    let config_path = match opts.config {
        Some(ref path) => gctx.resolve_path(path),
        None => root.join(CONFIG_FILE),
    };
    let config = load_config(gctx.global_config(), &config_path)?;

    let host_arch = Arch::host().unwrap_or(Arch::X86_64);
    let axes = generation_axes(&app, &config);
    let mut rules = acceleration_rules(&axes, config.accel, host_arch);

    let exclusions_path = match opts.exclusions {
        Some(ref path) => Some(gctx.resolve_path(path)),
        None => Some(root.join(EXCLUSIONS_FILE)).filter(|p| p.is_file()),
    };
    if let Some(path) = exclusions_path {
        let set = ExclusionSet::load(&path, &axes)?;
        tracing::debug!("loaded {} exclusion rule(s) from {}", set.len(), path.display());
        rules.extend(set.rules().iter().cloned());
    }

    tracing::debug!(
        "project `{}` at {}: {} axis combination(s)",
        app.name,
        root.display(),
        axes.product_size()
    );
    Ok(Project {
        root,
        app,
        config,
        axes,
        rules,
    })
}

/// Axes for generating `app` under `config`.
///
/// Architectures and platforms come from the targets, tools, boot
/// protocols and debug levels from the configuration. Filesystems other
/// than `none` need a root filesystem.
pub fn generation_axes(app: &AppManifest, config: &UserConfig) -> Axes {
    let mut arches: Vec<Arch> = Vec::new();
    let mut platforms: Vec<Platform> = Vec::new();
    for &(platform, arch) in &app.targets {
        if !arches.contains(&arch) {
            arches.push(arch);
        }
        if !platforms.contains(&platform) {
            platforms.push(platform);
        }
    }

    let filesystems: &[FsType] = if app.rootfs.is_some() {
        FsType::ALL
    } else {
        &[FsType::None]
    };
    let networking: &[Networking] = if config.networking {
        &[Networking::Bridge, Networking::Tap]
    } else {
        &[Networking::None]
    };

    Axes::new()
        .with(AxisName::Arch, arches.iter().map(Arch::as_str))
        .with(AxisName::Hypervisor, Hypervisor::ALL.iter().map(Hypervisor::as_str))
        .with(AxisName::Platform, platforms.iter().map(Platform::as_str))
        .with(AxisName::BuildTool, config.build_tools.iter().map(|t| t.as_str()))
        .with(AxisName::RunTool, config.run_tools.iter().map(|t| t.as_str()))
        .with(AxisName::Bootloader, config.bootloaders.iter().map(|b| b.as_str()))
        .with(AxisName::Debug, config.debug.iter().map(|d| d.as_str()))
        .with(AxisName::Fs, filesystems.iter().map(FsType::as_str))
        .with(AxisName::Networking, networking.iter().map(Networking::as_str))
}

/// Rules picking the hypervisor of qemu guests.
///
/// With acceleration, guests of the host architecture run under kvm and
/// the others are emulated. Without it every qemu guest is emulated.
pub fn acceleration_rules(axes: &Axes, accel: bool, host_arch: Arch) -> Vec<ExclusionRule> {
    let host = host_arch.as_str();
    let not_host = format!("not {}", host);
    let raw: Vec<(&str, Vec<(AxisName, &str)>)> = if accel {
        vec![
            (
                "host guests are accelerated",
                vec![
                    (AxisName::Platform, "qemu"),
                    (AxisName::Hypervisor, "none"),
                    (AxisName::Arch, host),
                ],
            ),
            (
                "foreign guests cannot use kvm",
                vec![
                    (AxisName::Platform, "qemu"),
                    (AxisName::Hypervisor, "kvm"),
                    (AxisName::Arch, &not_host),
                ],
            ),
        ]
    } else {
        vec![(
            "acceleration is disabled",
            vec![(AxisName::Platform, "qemu"), (AxisName::Hypervisor, "kvm")],
        )]
    };

    raw.into_iter()
        .filter_map(|(reason, rule)| ExclusionRule::lenient(&rule, axes).map(|r| r.with_reason(reason)))
        .collect()
}

/// Target requests for `app`.
///
/// Targets with a root filesystem run it as an initrd or over 9pfs. When
/// the application embeds its initrd, every target gets an einitrd twin
/// without a filesystem, and kraft builds are only requested for the twins.
pub fn target_requests(app: &AppManifest) -> Vec<TargetRequest> {
    let mut requests = Vec::new();
    for &(platform, arch) in &app.targets {
        let filesystems = if app.rootfs.is_some() {
            vec![FsType::Initrd, FsType::NineP]
        } else {
            vec![FsType::None]
        };
        let mut request = TargetRequest::new(platform, arch).with_filesystems(filesystems);
        if app.einitrd {
            request = request.with_build_tools(vec![BuildTool::Make]);
        }
        requests.push(request);

        if app.einitrd {
            requests.push(
                TargetRequest::new(platform, arch)
                    .with_einitrd(true)
                    .with_filesystems(vec![FsType::None]),
            );
        }
    }
    requests
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use crate::core::variant::Variant;
    use crate::test_support::{ProjectFixture, HELLO_APP};
    use crate::util::config::Config;
    use crate::variants::enumerate;
    use tempfile::TempDir;

    fn config(networking: bool, accel: bool) -> UserConfig {
        Config {
            memory: Some(64),
            networking: Some(networking),
            accel: Some(accel),
            build_tools: Some(vec![BuildTool::Make]),
            ..Config::default()
        }
        .resolve()
        .unwrap()
    }

    fn app(contents: &str) -> AppManifest {
        AppManifest::parse(contents, Path::new("/p")).unwrap()
    }

    fn values(variants: &[Variant], axis: AxisName) -> Vec<String> {
        variants
            .iter()
            .map(|v| format!("{}/{}", v.get(AxisName::Arch).unwrap(), v.get(axis).unwrap()))
            .collect()
    }

    #[test]
    fn test_generation_axes() {
        let app = app(
            r#"
rootfs = "./rootfs"
targets = ["qemu/x86_64", "fc/x86_64", "qemu/arm64"]
"#,
        );
        let axes = generation_axes(&app, &config(true, false));

        assert_eq!(axes.len(), 9);
        assert_eq!(
            axes.domain(AxisName::Arch).unwrap(),
            &["x86_64".to_string(), "arm64".to_string()]
        );
        assert_eq!(
            axes.domain(AxisName::Platform).unwrap(),
            &["qemu".to_string(), "firecracker".to_string()]
        );
        assert_eq!(axes.domain(AxisName::Fs).unwrap().len(), 3);
        assert_eq!(
            axes.domain(AxisName::Networking).unwrap(),
            &["bridge".to_string(), "tap".to_string()]
        );
        assert_eq!(axes.domain(AxisName::BuildTool).unwrap(), &["make".to_string()]);
    }

    #[test]
    fn test_qemu_hypervisor_follows_accel() {
        let app = app("targets = [\"qemu/x86_64\", \"qemu/arm64\"]\nname = \"hello\"\n");
        let run = |accel| {
            let config = config(false, accel);
            let axes = generation_axes(&app, &config).with(AxisName::RunTool, ["vmm"]);
            let rules = acceleration_rules(&axes, accel, Arch::X86_64);
            values(&enumerate(&axes, &rules), AxisName::Hypervisor)
        };

        assert_eq!(run(true), vec!["x86_64/kvm", "arm64/none"]);
        assert_eq!(run(false), vec!["x86_64/none", "arm64/none"]);
    }

    #[test]
    fn test_requests_with_rootfs() {
        let requests = target_requests(&app(
            "rootfs = \"rootfs\"\ntargets = [\"fc/x86_64\"]\nname = \"a\"\n",
        ));
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].filesystems, vec![FsType::Initrd, FsType::NineP]);
        assert_eq!(requests[0].build_tools, BuildTool::ALL.to_vec());
    }

    #[test]
    fn test_requests_with_einitrd_twins() {
        let requests = target_requests(&app(
            r#"
name = "a"
rootfs = "rootfs"
targets = ["qemu/x86_64"]

[unikraft.kconfig]
CONFIG_LIBVFSCORE_AUTOMOUNT_CI_EINITRD = "y"
"#,
        ));
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].einitrd);
        assert_eq!(requests[0].build_tools, vec![BuildTool::Make]);
        assert!(requests[1].einitrd);
        assert_eq!(requests[1].filesystems, vec![FsType::None]);
        assert_eq!(requests[1].build_tools, BuildTool::ALL.to_vec());
    }

    #[test]
    fn test_load_project() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::new("hello")
            .with_exclusions("[[exclude]]\nplatform = \"fc\"\n")
            .write_to(tmp.path())
            .unwrap();

        let gctx = GlobalContext::with_cwd(root.join("scripts")).with_global_config(None);
        std::fs::create_dir_all(gctx.cwd()).unwrap();
        let project = load_project(&gctx, &ProjectOptions::default()).unwrap();

        assert_eq!(project.app.name, "hello");
        assert_eq!(project.root, normalize_path(&root));
        assert_eq!(project.config.memory, 64);
        // acceleration rule plus the user rule
        assert_eq!(project.rules.len(), 2);
        assert_eq!(project.requests().len(), 2);
        assert_eq!(project.layout().scripts_dir, project.root.join("scripts"));
    }

    #[test]
    fn test_load_project_rejects_unknown_axis() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::new("hello")
            .with_app(HELLO_APP)
            .with_exclusions("[[exclude]]\ncolour = \"red\"\n")
            .write_to(tmp.path())
            .unwrap();

        let gctx = GlobalContext::with_cwd(root).with_global_config(None);
        let err = load_project(&gctx, &ProjectOptions::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid exclusion rules"));
    }

    #[test]
    fn test_exclusions_outside_narrowed_axes() {
        let exclusions = r#"
[[exclude]]
platform = "firecracker"
arch = "arm64"

[[exclude]]
networking = ["nat", "bridge"]
debug = "not none"
"#;
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::new("hello")
            .with_config("memory = 64\nnetworking = true\ndebug = [\"none\", \"info\"]\n")
            .with_exclusions(exclusions)
            .write_to(tmp.path())
            .unwrap();

        let gctx = GlobalContext::with_cwd(root).with_global_config(None);
        let project = load_project(&gctx, &ProjectOptions::default()).unwrap();
        assert_eq!(project.axes.domain(AxisName::Arch).unwrap(), &["x86_64".to_string()]);

        let variants = enumerate(&project.axes, &project.rules);
        let has = |net: &str, debug: &str| {
            variants.iter().any(|v| {
                v.get(AxisName::Networking) == Some(net) && v.get(AxisName::Debug) == Some(debug)
            })
        };
        assert!(has("bridge", "none"));
        assert!(!has("bridge", "info"));
        assert!(has("tap", "info"));
        assert!(variants
            .iter()
            .all(|v| v.get(AxisName::Arch) == Some("x86_64")));
    }

    #[test]
    fn test_missing_config_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let root = ProjectFixture::new("hello")
            .without_config()
            .write_to(tmp.path())
            .unwrap();

        let gctx = GlobalContext::with_cwd(root).with_global_config(None);
        let err = load_project(&gctx, &ProjectOptions::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read config"));
    }
}
