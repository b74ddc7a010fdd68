//! Artifact generators.
//!
//! Every generator is a pure function of the application descriptor, the
//! user configuration and a resolved [`TargetConfig`]. The output is an
//! [`ArtifactPlan`]; nothing is written until [`ArtifactPlan::write`].
//!
//! Scripts are meant to be run from the project root, so every path they
//! embed is relative to it.

pub mod bootargs;
pub mod build;
pub mod defconfig;
pub mod docker;
pub mod firecracker;
pub mod plan;
pub mod run;
pub mod setup;
pub mod test_index;

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::axis::{BuildTool, RunTool};
use crate::core::manifest::AppManifest;
use crate::core::target::TargetConfig;
use crate::util::config::UserConfig;
use crate::util::fs::relative_path;

pub use plan::{Artifact, ArtifactKind, ArtifactPlan};

/// Where generated files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    /// Project root (directory of `app.toml`)
    pub root: PathBuf,
    pub scripts_dir: PathBuf,
    pub kernel_dir: PathBuf,
    pub test_dir: PathBuf,
}

impl OutputLayout {
    /// Layout for `config`, with relative directories anchored at `root`.
    pub fn new(root: &Path, config: &UserConfig) -> Self {
        let anchor = |dir: &Path| {
            if dir.is_relative() {
                root.join(dir)
            } else {
                dir.to_path_buf()
            }
        };
        OutputLayout {
            root: root.to_path_buf(),
            scripts_dir: anchor(&config.scripts_dir),
            kernel_dir: anchor(&config.kernel_dir),
            test_dir: anchor(&config.test_dir),
        }
    }

    pub fn defconfig_dir(&self) -> PathBuf {
        self.scripts_dir.join("defconfig")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.scripts_dir.join("build")
    }

    pub fn run_dir(&self) -> PathBuf {
        self.scripts_dir.join("run")
    }

    pub fn makefile(&self) -> PathBuf {
        self.root.join("Makefile")
    }

    /// `path` as seen from the project root, with `/` separators.
    pub fn relative(&self, path: &Path) -> String {
        let rel = relative_path(&self.root, path);
        rel.components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Image path of `target` as seen from the project root.
    pub fn kernel_image(&self, target: &TargetConfig, app_name: &str) -> String {
        self.relative(&self.kernel_dir.join(target.image_file_name(app_name)))
    }
}

/// Inputs shared by every generator.
#[derive(Debug, Clone, Copy)]
pub struct GenerateContext<'a> {
    pub app: &'a AppManifest,
    pub config: &'a UserConfig,
    pub layout: &'a OutputLayout,
}

/// Render every artifact for `targets`.
pub fn render(ctx: &GenerateContext<'_>, targets: &[TargetConfig]) -> Result<ArtifactPlan> {
    let mut plan = ArtifactPlan::new();
    plan.add(setup::setup_script(ctx));
    plan.add(setup::makefile(ctx));
    if let Some(makefile) = docker::docker_makefile(ctx) {
        plan.add(makefile);
    }

    for target in targets {
        match target.variant.build_tool {
            BuildTool::Make => {
                plan.add(defconfig::defconfig(ctx, target));
                plan.add(build::make_script(ctx, target));
            }
            BuildTool::Kraft => plan.add(build::kraft_script(ctx, target)),
        }
        match target.variant.run_tool {
            RunTool::Vmm => plan.extend(run::vmm_run(ctx, target)?),
            RunTool::Kraft => plan.add(run::kraft_run(ctx, target)),
        }
    }

    let index = test_index::test_config(ctx, &plan);
    plan.add(index);

    tracing::debug!("rendered {} artifact(s) for {} target(s)", plan.len(), targets.len());
    Ok(plan)
}

/// Quote `value` for a double-quoted shell string.
pub(crate) fn shell_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::core::axis::{Arch, Platform};

    #[test]
    fn test_layout_defaults() {
        let config = config();
        let layout = layout(&config);
        assert_eq!(layout.run_dir(), PathBuf::from("/p/scripts/run"));
        assert_eq!(layout.relative(&layout.defconfig_dir()), "scripts/defconfig");
        assert_eq!(
            layout.kernel_image(&target(Platform::Qemu, Arch::X86_64), "hello"),
            "scripts/kernel/gcc-12-hello_qemu-x86_64"
        );
    }

    #[test]
    fn test_render_plan() {
        let app = hello();
        let config = config();
        let layout = layout(&config);
        let ctx = GenerateContext {
            app: &app,
            config: &config,
            layout: &layout,
        };
        let targets = vec![
            target(Platform::Qemu, Arch::X86_64),
            target(Platform::Firecracker, Arch::X86_64),
        ];

        let plan = render(&ctx, &targets).unwrap();
        let paths: Vec<_> = plan.iter().map(|a| layout.relative(&a.path)).collect();
        assert_eq!(
            paths,
            vec![
                "scripts/setup.sh",
                "Makefile",
                "scripts/defconfig/qemu-x86_64",
                "scripts/build/make-gcc-12-qemu-x86_64.sh",
                "scripts/run/gcc-12-qemu-x86_64-nofs.sh",
                "scripts/defconfig/fc-x86_64",
                "scripts/build/make-gcc-12-fc-x86_64.sh",
                "scripts/run/gcc-12-fc-x86_64-nofs.json",
                "scripts/run/gcc-12-fc-x86_64-nofs.sh",
                "scripts/test/config",
            ]
        );
    }

    #[test]
    fn test_render_plan_with_dockerfile() {
        let app = app("name = \"redis\"\nrootfs = \"Dockerfile\"\ntargets = [\"qemu/x86_64\"]\n");
        let config = config();
        let layout = layout(&config);
        let ctx = GenerateContext {
            app: &app,
            config: &config,
            layout: &layout,
        };

        let plan = render(&ctx, &[target(Platform::Qemu, Arch::X86_64)]).unwrap();
        let docker: Vec<_> = plan
            .of_kind(ArtifactKind::Docker)
            .map(|a| layout.relative(&a.path))
            .collect();
        assert_eq!(docker, vec!["scripts/docker/docker.Makefile"]);
        let index = plan.of_kind(ArtifactKind::Test).next().unwrap();
        assert!(!index.contents.contains("docker"));
    }

    #[test]
    fn test_shell_escape() {
        assert_eq!(shell_escape(r#"/bin/echo "$HOME""#), r#"/bin/echo \"\$HOME\""#);
    }
}
