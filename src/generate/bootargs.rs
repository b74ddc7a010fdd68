//! Kernel command line.

use crate::core::axis::{FsType, Networking};
use crate::core::variant::BuildVariant;

/// Host side address of the bridge and tap interfaces.
pub const HOST_ADDRESS: &str = "172.44.0.1";
/// Guest address on the bridge and tap networks.
pub const GUEST_ADDRESS: &str = "172.44.0.2/24";
/// Guest address and gateway under QEMU user networking.
pub const NAT_GUEST_ADDRESS: &str = "10.0.2.15/24";
pub const NAT_GATEWAY: &str = "10.0.2.2";

pub const BRIDGE_INTERFACE: &str = "virbr0";
pub const TAP_INTERFACE: &str = "tap0";

/// Unikraft options preceding the `--` separator, unescaped.
pub fn boot_options(variant: &BuildVariant) -> Vec<String> {
    let mut options = Vec::new();
    match variant.networking {
        Networking::None => {}
        Networking::Nat => options.push(format!("netdev.ip={}:{}:::", NAT_GUEST_ADDRESS, NAT_GATEWAY)),
        Networking::Bridge | Networking::Tap => {
            options.push(format!("netdev.ip={}:{}:::", GUEST_ADDRESS, HOST_ADDRESS))
        }
    }
    match variant.fs {
        FsType::None => {}
        FsType::Initrd => options.push(r#"vfs.fstab=[ "initrd0:/:extract::ramfs=1:" ]"#.to_string()),
        FsType::NineP => options.push(r#"vfs.fstab=[ "fs0:/:9pfs:::" ]"#.to_string()),
    }
    options
}

/// Full command line: options, then `-- <cmd>` when a command is set.
pub fn command_line(variant: &BuildVariant, cmd: Option<&str>) -> String {
    let mut parts = boot_options(variant);
    if let Some(cmd) = cmd {
        parts.push("--".to_string());
        parts.push(cmd.to_string());
    }
    parts.join(" ")
}
