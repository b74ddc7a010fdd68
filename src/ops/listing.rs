//! Implementation of `ukgen variants`, `ukgen targets` and `ukgen probe`.

use crate::core::axis::{Arch, Platform};
use crate::core::variant::Variant;
use crate::ops::project::Project;
use crate::probe::HostCapabilities;
use crate::resolver::{resolve_all, Resolution};
use crate::variants::enumerate;

/// Valid variants of `project`, in enumeration order.
pub fn list_variants(project: &Project) -> Vec<Variant> {
    enumerate(&project.axes, &project.rules)
}

/// Targets of `project` on `host`.
pub fn list_targets(project: &Project, host: &HostCapabilities) -> Resolution {
    resolve_all(&list_variants(project), &project.requests(), host)
}

/// Format variants for display, one per line.
pub fn format_variants(variants: &[Variant]) -> String {
    let mut output = String::new();
    for variant in variants {
        push_line!(output, "{}", variant);
    }
    push_line!(output);
    push_line!(output, "{} variant(s)", variants.len());
    output
}

/// Format a resolution for display.
pub fn format_targets(resolution: &Resolution) -> String {
    let mut output = String::new();
    for target in &resolution.targets {
        push_line!(output, "{}", target);
    }
    if !resolution.skipped.is_empty() {
        push_line!(output, "\nSkipped:");
        for skipped in &resolution.skipped {
            push_line!(output, "  - {}", skipped);
        }
    }
    push_line!(output);
    push_line!(
        output,
        "{} target(s), {} skipped",
        resolution.targets.len(),
        resolution.skipped.len()
    );
    output
}

/// Format probed capabilities for display.
pub fn format_capabilities(host: &HostCapabilities) -> String {
    let mut output = String::new();

    push_line!(output, "Compilers:");
    for &arch in Arch::ALL {
        let compilers = host.compilers_for(arch);
        if compilers.is_empty() {
            push_line!(output, "  {:<8} (none)", arch.as_str());
        }
        for compiler in compilers {
            push_line!(output, "  {:<8} {}", arch.as_str(), compiler);
        }
    }

    push_line!(output, "\nVMMs:");
    for &arch in Arch::ALL {
        for &platform in &[Platform::Qemu, Platform::Firecracker] {
            let label = format!("{}/{}", platform.short_name(), arch);
            let vmms = host.vmms_for(arch, platform);
            if vmms.is_empty() {
                push_line!(output, "  {:<14} (none)", label);
            }
            for vmm in vmms {
                push_line!(output, "  {:<14} {}", label, vmm);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::axis::AxisName;
    use crate::ops::project::{load_project, ProjectOptions};
    use crate::test_support::{full_host, ProjectFixture};
    use crate::util::GlobalContext;
    use tempfile::TempDir;

    fn hello_project(tmp: &TempDir) -> Project {
        let root = ProjectFixture::new("hello")
            .with_config("memory = 64\nbuild_tools = [\"make\"]\nrun_tools = [\"vmm\"]\n")
            .write_to(tmp.path())
            .unwrap();
        let gctx = GlobalContext::with_cwd(root).with_global_config(None);
        load_project(&gctx, &ProjectOptions::default()).unwrap()
    }

    #[test]
    fn test_list_variants() {
        let tmp = TempDir::new().unwrap();
        let variants = list_variants(&hello_project(&tmp));

        let platforms: Vec<_> = variants
            .iter()
            .map(|v| v.get(AxisName::Platform).unwrap())
            .collect();
        assert_eq!(platforms, vec!["qemu", "firecracker"]);

        let output = format_variants(&variants);
        assert!(output.starts_with("arch=x86_64 hypervisor=none platform=qemu "));
        assert!(output.ends_with("\n2 variant(s)\n"));
    }

    #[test]
    fn test_list_targets() {
        let tmp = TempDir::new().unwrap();
        let resolution = list_targets(&hello_project(&tmp), &full_host());
        assert_eq!(resolution.targets.len(), 2);

        let output = format_targets(&resolution);
        assert!(output.contains("gcc-12-qemu-x86_64 [none gcc-12 run:vmm fs:none net:none] via qemu-system-x86_64\n"));
        assert!(output.ends_with("2 target(s), 0 skipped\n"));
    }

    #[test]
    fn test_format_capabilities() {
        let mut host = full_host();
        host.remove_compiler("aarch64-linux-gnu-gcc-12");

        let output = format_capabilities(&host);
        assert!(output.contains("  arm64    (none)\n"));
        assert!(output.contains("  x86_64   gcc-12 (/usr/bin/gcc-12)\n"));
        assert!(output.contains("  fc/arm64       firecracker-aarch64 (/usr/bin/firecracker-aarch64)\n"));
    }
}
