//! Kconfig defaults for make builds.

use crate::core::axis::{Arch, Bootloader, DebugLevel, Hypervisor, Platform};
use crate::core::manifest::library_kconfig_symbol;
use crate::core::target::TargetConfig;

use super::{Artifact, ArtifactKind, GenerateContext};

/// Kconfig symbols selected by the build axes of `target`, in file order.
pub fn variant_symbols(target: &TargetConfig) -> Vec<(&'static str, &'static str)> {
    let variant = &target.variant;
    let flag = |on: bool| if on { "y" } else { "n" };
    let mut symbols = vec![
        ("CONFIG_LIBVFSCORE_AUTOMOUNT_CI_EINITRD", flag(target.einitrd)),
        ("CONFIG_LIBVFSCORE_AUTOMOUNT_CI", flag(target.einitrd)),
    ];

    match variant.platform {
        Platform::Qemu => {
            symbols.push(("CONFIG_PLAT_KVM", "y"));
            symbols.push(("CONFIG_KVM_VMM_QEMU", "y"));
        }
        Platform::Firecracker => {
            symbols.push(("CONFIG_PLAT_KVM", "y"));
            symbols.push(("CONFIG_KVM_VMM_FIRECRACKER", "y"));
        }
        Platform::Xen => symbols.push(("CONFIG_PLAT_XEN", "y")),
    }

    match variant.arch {
        Arch::Arm64 => {
            symbols.push(("CONFIG_ARCH_ARM_64", "y"));
            symbols.push(("CONFIG_ARM64_ERRATUM_858921", "n"));
            symbols.push(("CONFIG_ARM64_ERRATUM_835769", "n"));
            symbols.push(("CONFIG_ARM64_ERRATUM_843419", "n"));
        }
        Arch::X86_64 => symbols.push(("CONFIG_ARCH_X86_64", "y")),
    }

    if variant.platform != Platform::Xen
        && variant.hypervisor != Hypervisor::Xen
        && variant.arch == Arch::X86_64
    {
        match variant.bootloader {
            Bootloader::Multiboot => symbols.push(("CONFIG_KVM_BOOT_PROTO_MULTIBOOT", "y")),
            Bootloader::Uefi => symbols.push(("CONFIG_KVM_BOOT_PROTO_EFI_STUB", "y")),
        }
    }

    match variant.debug {
        DebugLevel::None => {}
        DebugLevel::Strace => symbols.push(("CONFIG_LIBSYSCALL_SHIM_STRACE", "y")),
        DebugLevel::Err => {
            symbols.push(("CONFIG_LIBUKDEBUG_PRINTK", "y"));
            symbols.push(("CONFIG_LIBUKDEBUG_PRINTK_ERR", "y"));
        }
        DebugLevel::Info => {
            symbols.push(("CONFIG_LIBUKDEBUG_PRINTK", "y"));
            symbols.push(("CONFIG_LIBUKDEBUG_PRINTK_INFO", "y"));
        }
        DebugLevel::Debug => {
            symbols.push(("CONFIG_LIBUKDEBUG_PRINTK", "y"));
            symbols.push(("CONFIG_LIBUKDEBUG_PRINTK_INFO", "y"));
            symbols.push(("CONFIG_LIBUKDEBUG_PRINTD", "y"));
        }
    }

    symbols
}

/// `defconfig/<name>` for a make build of `target`.
pub fn defconfig(ctx: &GenerateContext<'_>, target: &TargetConfig) -> Artifact {
    let app = ctx.app;
    let kernel_name = target.kernel_name(&app.name);
    let mut contents = String::new();

    push_line!(contents, "CONFIG_UK_NAME=\"{}\"", kernel_name);
    push_line!(contents, "CONFIG_UK_DEFNAME=\"{}\"", kernel_name);
    for (symbol, value) in variant_symbols(target) {
        push_line!(contents, "{}={}", symbol, value);
    }
    for lib in &app.libraries {
        push_line!(contents, "{}=y", library_kconfig_symbol(lib));
    }
    for (symbol, value) in &app.kconfig {
        push_line!(contents, "{}={}", symbol, value);
    }

    Artifact::new(
        ctx.layout.defconfig_dir().join(target.defconfig_name()),
        ArtifactKind::Defconfig,
        contents,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::testing::{app, config, hello, layout, target};

    #[test]
    fn test_qemu_x86_64_defconfig() {
        let app = hello();
        let config = config();
        let layout = layout(&config);
        let ctx = GenerateContext {
            app: &app,
            config: &config,
            layout: &layout,
        };

        let artifact = defconfig(&ctx, &target(Platform::Qemu, Arch::X86_64));
        assert!(artifact.path.ends_with("scripts/defconfig/qemu-x86_64"));
        assert_eq!(
            artifact.contents,
            "CONFIG_UK_NAME=\"hello\"\n\
             CONFIG_UK_DEFNAME=\"hello\"\n\
             CONFIG_LIBVFSCORE_AUTOMOUNT_CI_EINITRD=n\n\
             CONFIG_LIBVFSCORE_AUTOMOUNT_CI=n\n\
             CONFIG_PLAT_KVM=y\n\
             CONFIG_KVM_VMM_QEMU=y\n\
             CONFIG_ARCH_X86_64=y\n\
             CONFIG_KVM_BOOT_PROTO_MULTIBOOT=y\n\
             CONFIG_LIBMUSL=y\n"
        );
    }

    #[test]
    fn test_einitrd_arm64_defconfig() {
        let app = app(
            r#"
name = "nginx"
targets = ["fc/arm64"]

[unikraft.kconfig]
CONFIG_LIBVFSCORE_AUTOMOUNT_CI_EINITRD = "y"
CONFIG_LIBVFSCORE_AUTOMOUNT_CI = "y"
CONFIG_LIBPOSIX_PROCESS_CLONE = "y"

[libraries.lwip.kconfig]
CONFIG_LWIP_TCP = true
"#,
        );
        let config = config();
        let layout = layout(&config);
        let ctx = GenerateContext {
            app: &app,
            config: &config,
            layout: &layout,
        };

        let mut t = target(Platform::Firecracker, Arch::Arm64);
        t.einitrd = true;
        t.variant.debug = DebugLevel::Debug;

        let artifact = defconfig(&ctx, &t);
        assert!(artifact.path.ends_with("defconfig/fc-arm64-debug-einitrd"));
        let lines: Vec<_> = artifact.contents.lines().collect();
        assert_eq!(
            lines,
            vec![
                "CONFIG_UK_NAME=\"nginx-einitrd\"",
                "CONFIG_UK_DEFNAME=\"nginx-einitrd\"",
                "CONFIG_LIBVFSCORE_AUTOMOUNT_CI_EINITRD=y",
                "CONFIG_LIBVFSCORE_AUTOMOUNT_CI=y",
                "CONFIG_PLAT_KVM=y",
                "CONFIG_KVM_VMM_FIRECRACKER=y",
                "CONFIG_ARCH_ARM_64=y",
                "CONFIG_ARM64_ERRATUM_858921=n",
                "CONFIG_ARM64_ERRATUM_835769=n",
                "CONFIG_ARM64_ERRATUM_843419=n",
                "CONFIG_LIBUKDEBUG_PRINTK=y",
                "CONFIG_LIBUKDEBUG_PRINTK_INFO=y",
                "CONFIG_LIBUKDEBUG_PRINTD=y",
                "CONFIG_LIBLWIP=y",
                "CONFIG_LIBPOSIX_PROCESS_CLONE=y",
                "CONFIG_LWIP_TCP=y",
            ]
        );
    }

    #[test]
    fn test_uefi_and_xen_symbols() {
        let mut t = target(Platform::Qemu, Arch::X86_64);
        t.variant.bootloader = Bootloader::Uefi;
        assert!(variant_symbols(&t).contains(&("CONFIG_KVM_BOOT_PROTO_EFI_STUB", "y")));

        let mut xen = target(Platform::Xen, Arch::X86_64);
        xen.variant.hypervisor = Hypervisor::Xen;
        let symbols = variant_symbols(&xen);
        assert!(symbols.contains(&("CONFIG_PLAT_XEN", "y")));
        assert!(!symbols.iter().any(|(s, _)| s.starts_with("CONFIG_KVM")));
    }
}
