//! Built-in compatibility rules between axes.

use crate::core::axis::{AxisName, Axes};
use crate::variants::rules::ExclusionRule;

type RuleDef = (&'static str, &'static [(AxisName, &'static str)]);

const BUILTIN_RULES: &[RuleDef] = &[
    (
        "bridge networking is not supported on firecracker",
        &[
            (AxisName::Networking, "bridge"),
            (AxisName::Platform, "firecracker"),
        ],
    ),
    (
        "tap networking is only supported on firecracker",
        &[
            (AxisName::Networking, "tap"),
            (AxisName::Platform, "not firecracker"),
        ],
    ),
    (
        "UEFI boot requires x86_64",
        &[(AxisName::Bootloader, "uefi"), (AxisName::Arch, "not x86_64")],
    ),
    (
        "firecracker requires kvm",
        &[
            (AxisName::Platform, "firecracker"),
            (AxisName::Hypervisor, "not kvm"),
        ],
    ),
    (
        "the xen platform requires the xen hypervisor",
        &[(AxisName::Platform, "xen"), (AxisName::Hypervisor, "not xen")],
    ),
    (
        "qemu does not run under xen",
        &[(AxisName::Platform, "qemu"), (AxisName::Hypervisor, "xen")],
    ),
    (
        "9pfs is not supported on firecracker",
        &[(AxisName::Fs, "9pfs"), (AxisName::Platform, "firecracker")],
    ),
    (
        "NAT networking is only available with qemu",
        &[(AxisName::Networking, "nat"), (AxisName::Platform, "not qemu")],
    ),
    (
        "xen guests are started with kraft",
        &[(AxisName::Platform, "xen"), (AxisName::RunTool, "vmm")],
    ),
    (
        "kraft run needs a kraft build",
        &[(AxisName::RunTool, "kraft"), (AxisName::BuildTool, "not kraft")],
    ),
];

/// Compatibility rules applicable to `axes`.
///
/// Rules mentioning an axis that `axes` does not declare are left out.
pub fn builtin_rules(axes: &Axes) -> Vec<ExclusionRule> {
    BUILTIN_RULES
        .iter()
        .filter_map(|(reason, raw)| ExclusionRule::lenient(raw, axes).map(|r| r.with_reason(*reason)))
        .collect()
}
