//! Firecracker VM configuration.

use serde::Serialize;
use serde_json::Value;

use crate::core::axis::FsType;
use crate::core::target::TargetConfig;

use super::bootargs::{self, TAP_INTERFACE};

pub const LOG_PATH: &str = "/tmp/firecracker.log";
pub const API_SOCKET: &str = "/tmp/firecracker.socket";
const GUEST_MAC: &str = "06:00:ac:10:00:02";
/// Command passed after `--` when the application sets none.
pub const DEFAULT_CMD: &str = "template";

/// The file passed to `firecracker --config-file`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FirecrackerConfig {
    #[serde(rename = "boot-source")]
    pub boot_source: BootSource,
    pub drives: Vec<Value>,
    #[serde(rename = "machine-config")]
    pub machine_config: MachineConfig,
    #[serde(rename = "cpu-config")]
    pub cpu_config: Option<Value>,
    pub balloon: Option<Value>,
    #[serde(rename = "network-interfaces", skip_serializing_if = "Vec::is_empty")]
    pub network_interfaces: Vec<NetworkInterface>,
    pub vsock: Option<Value>,
    pub logger: Logger,
    pub metrics: Option<Value>,
    #[serde(rename = "mmds-config")]
    pub mmds_config: Option<Value>,
    pub entropy: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootSource {
    pub kernel_image_path: String,
    pub boot_args: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub initrd_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MachineConfig {
    pub vcpu_count: u32,
    pub mem_size_mib: u32,
    pub smt: bool,
    pub track_dirty_pages: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkInterface {
    pub iface_id: String,
    pub guest_mac: String,
    pub host_dev_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Logger {
    pub log_path: String,
    pub level: String,
    pub show_level: bool,
    pub show_log_origin: bool,
}

impl FirecrackerConfig {
    /// Configuration booting `kernel` for `target`.
    pub fn new(target: &TargetConfig, kernel: &str, cmd: Option<&str>, memory: u32) -> Self {
        let variant = &target.variant;

        // The first boot argument is the program name
        let boot_args = format!(
            "{} {}",
            kernel,
            bootargs::command_line(variant, Some(cmd.unwrap_or(DEFAULT_CMD)))
        );

        let network_interfaces = if variant.networking.is_enabled() {
            vec![NetworkInterface {
                iface_id: "net1".to_string(),
                guest_mac: GUEST_MAC.to_string(),
                host_dev_name: TAP_INTERFACE.to_string(),
            }]
        } else {
            Vec::new()
        };

        FirecrackerConfig {
            boot_source: BootSource {
                kernel_image_path: kernel.to_string(),
                boot_args,
                initrd_path: (variant.fs == FsType::Initrd).then(|| "initrd.cpio".to_string()),
            },
            drives: Vec::new(),
            machine_config: MachineConfig {
                vcpu_count: 1,
                mem_size_mib: memory,
                smt: false,
                track_dirty_pages: false,
            },
            cpu_config: None,
            balloon: None,
            network_interfaces,
            vsock: None,
            logger: Logger {
                log_path: LOG_PATH.to_string(),
                level: "Debug".to_string(),
                show_level: true,
                show_log_origin: true,
            },
            metrics: None,
            mmds_config: None,
            entropy: None,
        }
    }

    /// Pretty-printed JSON with a trailing newline.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::axis::{Arch, Networking, Platform};
    use crate::generate::testing::target;

    #[test]
    fn test_plain_config() {
        let t = target(Platform::Firecracker, Arch::X86_64);
        let config = FirecrackerConfig::new(&t, "k/hello", Some("/hello"), 64);
        let json: Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();

        assert_eq!(json["boot-source"]["kernel_image_path"], "k/hello");
        assert_eq!(json["boot-source"]["boot_args"], "k/hello -- /hello");
        assert!(json["boot-source"].get("initrd_path").is_none());
        assert_eq!(json["machine-config"]["mem_size_mib"], 64);
        assert!(json["cpu-config"].is_null());
        assert!(json.get("network-interfaces").is_none());
        assert_eq!(json["logger"]["log_path"], "/tmp/firecracker.log");
        assert_eq!(json["drives"], serde_json::json!([]));
    }

    #[test]
    fn test_networked_initrd_config() {
        let mut t = target(Platform::Firecracker, Arch::X86_64);
        t.variant.networking = Networking::Tap;
        t.variant.fs = FsType::Initrd;
        let config = FirecrackerConfig::new(&t, "k", None, 128);
        let json: Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();

        assert_eq!(
            json["boot-source"]["boot_args"],
            r#"k netdev.ip=172.44.0.2/24:172.44.0.1::: vfs.fstab=[ "initrd0:/:extract::ramfs=1:" ] -- template"#
        );
        assert_eq!(json["boot-source"]["initrd_path"], "initrd.cpio");
        assert_eq!(json["network-interfaces"][0]["host_dev_name"], "tap0");
        assert_eq!(json["network-interfaces"][0]["guest_mac"], "06:00:ac:10:00:02");
    }

    #[test]
    fn test_default_cmd_follows_separator() {
        let t = target(Platform::Firecracker, Arch::X86_64);
        let config = FirecrackerConfig::new(&t, "k/hello", None, 64);
        let json: Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(json["boot-source"]["boot_args"], "k/hello -- template");
    }
}
