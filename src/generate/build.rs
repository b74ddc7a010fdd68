//! Build scripts.

use crate::core::target::TargetConfig;

use super::{docker, shell_escape, Artifact, ArtifactKind, GenerateContext};

/// Builder image used by kraft.
pub const BUILDKIT_HOST: &str = "docker-container://buildkitd";

/// `build/make-<kernel-tag>.sh`: configure from the defconfig and build
/// with the target's compiler.
pub fn make_script(ctx: &GenerateContext<'_>, target: &TargetConfig) -> Artifact {
    let app = ctx.app;
    let layout = ctx.layout;
    let defconfig = layout.relative(&layout.defconfig_dir().join(target.defconfig_name()));

    let mut script = String::new();
    if target.einitrd {
        push_line!(script, "#!/bin/bash");
        if let Some(ref rootfs) = app.rootfs {
            let initrd_base = match app.template {
                Some(ref template) => format!("\"$PWD\"/workdir/apps/{}", template.name),
                None => ".".to_string(),
            };
            docker::write_export(&mut script, ctx);
            push_line!(script);
            push_line!(script, "# Create CPIO archive to be used as the embedded initrd.");
            push_line!(script, "rootfs=\"{}\"", shell_escape(rootfs));
            push_line!(
                script,
                "\"$PWD\"/workdir/unikraft/support/scripts/mkcpio {}/initrd.cpio \"$rootfs\"",
                initrd_base
            );
        }
    } else {
        push_line!(script, "#!/bin/sh");
    }

    push_line!(script);
    push_line!(script, "make distclean");
    push_line!(script, "UK_DEFCONFIG=$(pwd)/{} make defconfig", defconfig);
    push_line!(script, "touch Makefile.uk");
    push_line!(script, "make prepare");
    push_line!(
        script,
        "make -j $(nproc) {}",
        target.compiler.make_variables().join(" ")
    );
    write_link(
        &mut script,
        ctx,
        &format!("workdir/build/{}", target.unikraft_image_name(&app.name)),
        target,
    );

    Artifact::new(
        layout.build_dir().join(format!("make-{}.sh", target.kernel_tag())),
        ArtifactKind::Build,
        script,
    )
}

/// `build/kraft-<defconfig>.sh`: build with kraft.
pub fn kraft_script(ctx: &GenerateContext<'_>, target: &TargetConfig) -> Artifact {
    let app = ctx.app;
    let variant = &target.variant;
    let plat = variant.platform.short_name();

    let mut script = String::from("#!/bin/sh\n\n");
    push_line!(script, "rm -fr .unikraft/build");
    push_line!(script, "rm -f .config.*");
    push_line!(
        script,
        "KRAFTKIT_BUILDKIT_HOST={} kraft build --log-level debug --log-type basic --no-cache --no-update --plat {} --arch {}",
        BUILDKIT_HOST, plat, variant.arch
    );
    write_link(
        &mut script,
        ctx,
        &format!(".unikraft/build/{}_{}-{}", app.name, plat, variant.arch),
        target,
    );

    Artifact::new(
        ctx.layout
            .build_dir()
            .join(format!("{}.sh", target.kernel_tag())),
        ArtifactKind::Build,
        script,
    )
}

fn write_link(script: &mut String, ctx: &GenerateContext<'_>, image: &str, target: &TargetConfig) {
    let layout = ctx.layout;
    push_line!(
        script,
        "test $? -eq 0 && mkdir -p {} && ln -fn {} {}",
        layout.relative(&layout.kernel_dir),
        image,
        layout.kernel_image(target, &ctx.app.name)
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::axis::{Arch, BuildTool, DebugLevel, Platform};
    use crate::generate::testing::{app, config, hello, layout, target};

    #[test]
    fn test_make_script() {
        let app = hello();
        let config = config();
        let layout = layout(&config);
        let ctx = GenerateContext {
            app: &app,
            config: &config,
            layout: &layout,
        };

        let artifact = make_script(&ctx, &target(Platform::Qemu, Arch::Arm64));
        assert!(artifact
            .path
            .ends_with("scripts/build/make-gcc-12-qemu-arm64.sh"));
        assert_eq!(
            artifact.contents,
            "#!/bin/sh\n\n\
             make distclean\n\
             UK_DEFCONFIG=$(pwd)/scripts/defconfig/qemu-arm64 make defconfig\n\
             touch Makefile.uk\n\
             make prepare\n\
             make -j $(nproc) COMPILER=gcc-12 CROSS_COMPILE=aarch64-linux-gnu-\n\
             test $? -eq 0 && mkdir -p scripts/kernel && ln -fn workdir/build/hello_qemu-arm64 scripts/kernel/gcc-12-hello_qemu-arm64\n"
        );
    }

    #[test]
    fn test_einitrd_make_script_packs_rootfs() {
        let app = app(
            r#"
name = "nginx"
rootfs = "./rootfs"
targets = ["qemu/x86_64"]
"#,
        );
        let config = config();
        let layout = layout(&config);
        let ctx = GenerateContext {
            app: &app,
            config: &config,
            layout: &layout,
        };
        let mut t = target(Platform::Qemu, Arch::X86_64);
        t.einitrd = true;
        t.variant.debug = DebugLevel::Err;

        let script = make_script(&ctx, &t).contents;
        assert!(script.starts_with("#!/bin/bash\n"));
        assert!(script.contains(
            "rootfs=\"./rootfs\"\n\"$PWD\"/workdir/unikraft/support/scripts/mkcpio ./initrd.cpio \"$rootfs\"\n"
        ));
        assert!(script.contains("UK_DEFCONFIG=$(pwd)/scripts/defconfig/qemu-x86_64-err-einitrd"));
        assert!(script.contains(
            "ln -fn workdir/build/nginx-einitrd_qemu-x86_64 scripts/kernel/gcc-12-nginx-einitrd_qemu-x86_64-err\n"
        ));
    }

    #[test]
    fn test_einitrd_make_script_exports_dockerfile() {
        let app = app("name = \"redis\"\nrootfs = \"Dockerfile\"\ntargets = [\"qemu/x86_64\"]\n");
        let config = config();
        let layout = layout(&config);
        let ctx = GenerateContext {
            app: &app,
            config: &config,
            layout: &layout,
        };
        let mut t = target(Platform::Qemu, Arch::X86_64);
        t.einitrd = true;

        let script = make_script(&ctx, &t).contents;
        assert!(script.contains(
            "IMAGE_NAME=unikraft-redis make -f scripts/docker/docker.Makefile export\n\n\
             # Create CPIO archive to be used as the embedded initrd.\n\
             rootfs=\"rootfs\"\n"
        ));
    }

    #[test]
    fn test_kraft_script() {
        let app = hello();
        let config = config();
        let layout = layout(&config);
        let ctx = GenerateContext {
            app: &app,
            config: &config,
            layout: &layout,
        };
        let mut t = target(Platform::Firecracker, Arch::X86_64);
        t.variant.build_tool = BuildTool::Kraft;

        let artifact = kraft_script(&ctx, &t);
        assert!(artifact.path.ends_with("scripts/build/kraft-fc-x86_64.sh"));
        assert!(artifact.contents.contains(
            "kraft build --log-level debug --log-type basic --no-cache --no-update --plat fc --arch x86_64\n"
        ));
        assert!(artifact.contents.ends_with(
            "ln -fn .unikraft/build/hello_fc-x86_64 scripts/kernel/kraft-hello_fc-x86_64\n"
        ));
    }
}
