//! Run scripts.

use anyhow::{Context, Result};

use crate::core::axis::{Arch, Bootloader, FsType, Hypervisor, Networking, Platform};
use crate::core::target::TargetConfig;
use crate::probe::vmm_command;

use super::bootargs::{self, BRIDGE_INTERFACE, GUEST_ADDRESS, HOST_ADDRESS, TAP_INTERFACE};
use super::build::BUILDKIT_HOST;
use super::firecracker::{FirecrackerConfig, API_SOCKET, LOG_PATH};
use super::{docker, shell_escape, Artifact, ArtifactKind, GenerateContext};

/// UEFI firmware passed to QEMU.
pub const OVMF_PATH: &str = "/usr/share/ovmf/OVMF.fd";

const KILL_COMMANDS: &str = r#"
{
# Clean up any previous instances.
sudo pkill -f qemu-system
sudo pkill -f firecracker
kraft stop --all
kraft rm --all
sudo KRAFTKIT_NO_WARN_SUDO=1 kraft stop --all
sudo KRAFTKIT_NO_WARN_SUDO=1 kraft rm --all
} > /dev/null 2>&1
"#;

const NET_CLEANUP_COMMANDS: &str = r#"
{
# Remove previously created network interfaces.
sudo ip link set dev tap0 down
sudo ip link del dev tap0
sudo ip link set dev virbr0 down
sudo ip link del dev virbr0
} > /dev/null 2>&1
"#;

/// File name stem shared by a VMM run script and its VMM configuration.
pub fn run_stem(target: &TargetConfig) -> String {
    let variant = &target.variant;
    let mut stem = format!("{}-{}", target.kernel_tag(), variant.fs.file_tag());
    if variant.networking.is_enabled() {
        stem.push('-');
        stem.push_str(variant.networking.as_str());
    }
    stem
}

/// Run script for `target` through its VMM, plus the VMM configuration when
/// the platform needs one.
pub fn vmm_run(ctx: &GenerateContext<'_>, target: &TargetConfig) -> Result<Vec<Artifact>> {
    match target.variant.platform {
        Platform::Qemu => Ok(vec![qemu_script(ctx, target)]),
        Platform::Firecracker => firecracker_run(ctx, target),
        Platform::Xen => {
            tracing::debug!("no VMM run script for xen target {}", target.kernel_tag());
            Ok(Vec::new())
        }
    }
}

fn needs_host_interface(networking: Networking) -> bool {
    matches!(networking, Networking::Bridge | Networking::Tap)
}

fn vmm_binary(target: &TargetConfig) -> String {
    match target.vmm {
        Some(ref vmm) => vmm.path.display().to_string(),
        None => vmm_command(target.variant.platform, target.variant.arch)
            .unwrap_or_default()
            .to_string(),
    }
}

fn write_network_setup(script: &mut String, networking: Networking) {
    if !needs_host_interface(networking) {
        return;
    }
    script.push_str(NET_CLEANUP_COMMANDS);
    push_line!(script);
    match networking {
        Networking::Bridge => {
            push_line!(script, "# Create bridge interface for QEMU networking.");
            push_line!(script, "sudo ip link add dev {} type bridge", BRIDGE_INTERFACE);
            push_line!(script, "sudo ip address add {}/24 dev {}", HOST_ADDRESS, BRIDGE_INTERFACE);
            push_line!(script, "sudo ip link set dev {} up", BRIDGE_INTERFACE);
        }
        _ => {
            push_line!(script, "# Create tap interface for Firecracker networking.");
            push_line!(script, "sudo ip tuntap add dev {} mode tap", TAP_INTERFACE);
            push_line!(script, "sudo ip address add {}/24 dev {}", HOST_ADDRESS, TAP_INTERFACE);
            push_line!(script, "sudo ip link set dev {} up", TAP_INTERFACE);
        }
    }
}

fn write_rootfs_setup(script: &mut String, ctx: &GenerateContext<'_>, fs: FsType) {
    let Some(ref rootfs) = ctx.app.rootfs else {
        return;
    };
    let rootfs = shell_escape(rootfs);
    if fs != FsType::None {
        docker::write_export(script, ctx);
    }
    match fs {
        FsType::None => {}
        FsType::Initrd => {
            push_line!(script);
            push_line!(script, "rootfs=\"{}\"", rootfs);
            push_line!(script);
            push_line!(script, "# Create CPIO archive to be used as the initrd.");
            push_line!(
                script,
                "\"$PWD\"/workdir/unikraft/support/scripts/mkcpio initrd.cpio \"$rootfs\""
            );
        }
        FsType::NineP => {
            push_line!(script);
            push_line!(script, "rootfs=9pfs-\"$(basename \"{}\")\"", rootfs);
            push_line!(script);
            push_line!(script, "# Create a fresh filesystem copy to use.");
            push_line!(script, "rm -fr \"$rootfs\"");
            push_line!(script, "cp -r \"{}\" \"$rootfs\"", rootfs);
        }
    }
}

fn qemu_script(ctx: &GenerateContext<'_>, target: &TargetConfig) -> Artifact {
    let variant = &target.variant;
    let kernel = ctx.layout.kernel_image(target, &ctx.app.name);
    let cmd = ctx.app.cmd.as_deref().unwrap_or_default();

    let mut script = String::from("#!/bin/sh\n\n");
    push_line!(script, "kernel=\"{}\"", kernel);
    push_line!(script, "cmd=\"{}\"", shell_escape(cmd));
    push_line!(script);
    push_line!(script, "if test $# -eq 1; then");
    push_line!(script, "    kernel=\"$1\"");
    push_line!(script, "fi");
    script.push_str(KILL_COMMANDS);
    write_network_setup(&mut script, variant.networking);
    write_rootfs_setup(&mut script, ctx, variant.fs);
    push_line!(script);

    if needs_host_interface(variant.networking) {
        script.push_str("sudo ");
    }
    push_line!(script, "{} \\", vmm_binary(target));
    if variant.hypervisor == Hypervisor::Kvm {
        push_line!(script, "    -accel kvm \\");
    }
    if variant.arch == Arch::Arm64 {
        push_line!(script, "    -machine virt \\");
    }
    if variant.bootloader == Bootloader::Uefi {
        push_line!(script, "    -bios {} \\", OVMF_PATH);
    }
    push_line!(script, "    -kernel \"$kernel\" \\");
    push_line!(script, "    -nographic \\");
    push_line!(script, "    -m {}M \\", ctx.config.memory);
    match variant.networking {
        Networking::Bridge => push_line!(
            script,
            "    -netdev bridge,id=en0,br={} -device virtio-net-pci,netdev=en0 \\",
            BRIDGE_INTERFACE
        ),
        Networking::Nat => push_line!(
            script,
            "    -netdev user,id=en0 -device virtio-net-pci,netdev=en0 \\"
        ),
        Networking::None | Networking::Tap => {}
    }

    let mut append: Vec<String> = bootargs::boot_options(variant)
        .iter()
        .map(|o| shell_escape(o))
        .collect();
    append.push("-- $cmd".to_string());
    push_line!(script, "    -append \"{}\" \\", append.join(" "));

    match variant.fs {
        FsType::None => {}
        FsType::Initrd => push_line!(script, "    -initrd \"$PWD\"/initrd.cpio \\"),
        FsType::NineP => {
            push_line!(
                script,
                "    -fsdev local,id=myid,path=\"$rootfs\",security_model=none \\"
            );
            push_line!(script, "    -device virtio-9p-pci,fsdev=myid,mount_tag=fs0 \\");
        }
    }
    push_line!(script, "    -cpu max");

    Artifact::new(
        ctx.layout.run_dir().join(format!("{}.sh", run_stem(target))),
        ArtifactKind::Run,
        script,
    )
}

fn firecracker_run(ctx: &GenerateContext<'_>, target: &TargetConfig) -> Result<Vec<Artifact>> {
    let variant = &target.variant;
    let layout = ctx.layout;
    let stem = run_stem(target);
    let json_path = layout.run_dir().join(format!("{}.json", stem));

    let kernel = layout.kernel_image(target, &ctx.app.name);
    let config = FirecrackerConfig::new(target, &kernel, ctx.app.cmd.as_deref(), ctx.config.memory)
        .to_json()
        .with_context(|| format!("failed to serialize {}", json_path.display()))?;

    let mut script = String::from("#!/bin/sh\n\n");
    push_line!(script, "config=\"{}\"", layout.relative(&json_path));
    push_line!(script);
    push_line!(script, "if test $# -eq 1; then");
    push_line!(script, "    config=\"$1\"");
    push_line!(script, "fi");
    script.push_str(KILL_COMMANDS);
    write_network_setup(&mut script, variant.networking);
    write_rootfs_setup(&mut script, ctx, variant.fs);
    push_line!(script);
    push_line!(script, "# Remove previously created files.");
    push_line!(script, "sudo rm -f {}", LOG_PATH);
    push_line!(script, "touch {}", LOG_PATH);
    push_line!(script, "sudo rm -f {}", API_SOCKET);
    push_line!(script);

    if needs_host_interface(variant.networking) {
        script.push_str("sudo ");
    }
    push_line!(script, "{} \\", vmm_binary(target));
    push_line!(script, "        --api-sock {} \\", API_SOCKET);
    push_line!(script, "        --config-file \"$config\"");

    Ok(vec![
        Artifact::new(json_path, ArtifactKind::RunConfig, config),
        Artifact::new(
            layout.run_dir().join(format!("{}.sh", stem)),
            ArtifactKind::Run,
            script,
        ),
    ])
}

/// `run/kraft-run-<plat>-<arch><suffix>-<fs>[-<net>].sh`: run with kraft.
pub fn kraft_run(ctx: &GenerateContext<'_>, target: &TargetConfig) -> Artifact {
    let variant = &target.variant;
    let plat = variant.platform.short_name();

    let mut name = format!(
        "kraft-run-{}-{}{}-{}",
        plat,
        variant.arch,
        target.suffix(),
        variant.fs.file_tag()
    );
    if variant.networking.is_enabled() {
        name.push('-');
        name.push_str(variant.networking.as_str());
    }

    let networked = needs_host_interface(variant.networking);
    let mut script = String::from("#!/bin/sh\n");
    script.push_str(KILL_COMMANDS);
    if networked {
        script.push_str(NET_CLEANUP_COMMANDS);
        push_line!(script);
        push_line!(script, "# Create bridge interface for KraftKit networking.");
        push_line!(
            script,
            "sudo KRAFTKIT_NO_WARN_SUDO=1 kraft net create -n {}/24 {}",
            HOST_ADDRESS, BRIDGE_INTERFACE
        );
    }
    if variant.fs != FsType::None {
        docker::write_export(&mut script, ctx);
    }
    push_line!(script);

    if networked {
        push_line!(script, "sudo \\");
    }
    push_line!(script, "    KRAFTKIT_BUILDKIT_HOST={} \\", BUILDKIT_HOST);
    push_line!(script, "    KRAFTKIT_NO_WARN_SUDO=1 \\");
    push_line!(script, "    kraft run \\");
    push_line!(script, "    --log-level debug --log-type basic \\");
    if variant.platform == Platform::Qemu && variant.hypervisor != Hypervisor::Kvm {
        push_line!(script, "    -W \\");
    }
    push_line!(script, "    --memory {}M \\", ctx.config.memory);
    if networked {
        push_line!(
            script,
            "    --network {}:{}:{}:::: \\",
            BRIDGE_INTERFACE, GUEST_ADDRESS, HOST_ADDRESS
        );
    }
    if let Some(ref rootfs) = ctx.app.rootfs {
        match variant.fs {
            FsType::None => {}
            FsType::Initrd => push_line!(script, "    --initrd \"{}\" \\", shell_escape(rootfs)),
            FsType::NineP => {
                push_line!(script, "    --volume \"{}\":/ \\", shell_escape(rootfs))
            }
        }
    }
    push_line!(script, "    --arch {} --plat {}", variant.arch, plat);

    Artifact::new(
        ctx.layout.run_dir().join(format!("{}.sh", name)),
        ArtifactKind::Run,
        script,
    )
}
