//! Variant enumeration.
//!
//! Expands the cross-product of configuration axes, then filters it through
//! the built-in compatibility rules and the user's exclusion rules. Every
//! step is a pure function of its inputs, so enumeration is deterministic
//! and order-stable.

pub mod compat;
pub mod rules;

use std::path::Path;

use anyhow::{Context, Result};
use miette::Diagnostic;
use serde::Deserialize;
use thiserror::Error;

use crate::core::axis::{AxisName, Axes};
use crate::core::variant::Variant;

pub use compat::builtin_rules;
pub use rules::{Constraint, ExclusionRule, RawConstraint, Selector};

/// Default file name of the exclusion descriptor.
pub const EXCLUSIONS_FILE: &str = "variants.toml";

/// Errors in an exclusion rule.
#[derive(Debug, Error, Diagnostic)]
pub enum VariantError {
    #[error("unknown axis `{key}`")]
    #[diagnostic(
        code(ukgen::variants::unknown_axis),
        help("axes are: arch, hypervisor, platform, build_tool, run_tool, bootloader, debug, fs, networking")
    )]
    UnknownAxis { key: String },

    #[error("axis `{axis}` is not being enumerated")]
    #[diagnostic(code(ukgen::variants::undeclared_axis))]
    UndeclaredAxis { axis: AxisName },

    #[error("invalid value `{value}` for axis `{axis}`")]
    #[diagnostic(
        code(ukgen::variants::unknown_value),
        help("expected one of: {domain}")
    )]
    UnknownValue {
        axis: AxisName,
        value: String,
        domain: String,
    },

    #[error("empty list for axis `{axis}`")]
    #[diagnostic(code(ukgen::variants::empty_constraint))]
    EmptyConstraint { axis: AxisName },

    #[error("exclusion rule has no constraints")]
    #[diagnostic(
        code(ukgen::variants::empty_rule),
        help("an empty rule would exclude every variant")
    )]
    EmptyRule,
}

/// Every combination of axis values, first axis varying slowest.
///
/// An axis with an empty domain yields no variants.
pub fn expand(axes: &Axes) -> Vec<Variant> {
    let mut variants = vec![Variant::new()];
    for axis in axes.iter() {
        variants = variants
            .iter()
            .flat_map(|prefix| {
                axis.values
                    .iter()
                    .map(move |value| prefix.clone().with(axis.name, value.as_str()))
            })
            .collect();
    }
    variants
}

/// Drop every variant matched by at least one rule, keeping order.
pub fn exclude(variants: Vec<Variant>, rules: &[ExclusionRule]) -> Vec<Variant> {
    if rules.is_empty() {
        return variants;
    }
    variants
        .into_iter()
        .filter(|variant| match rules.iter().find(|r| r.matches(variant)) {
            Some(rule) => {
                tracing::trace!("excluded {} by {}", variant, rule);
                false
            }
            None => true,
        })
        .collect()
}

/// Expand `axes` and remove built-in incompatibilities and `user_rules`.
pub fn enumerate(axes: &Axes, user_rules: &[ExclusionRule]) -> Vec<Variant> {
    let all = expand(axes);
    let total = all.len();

    let compatible = exclude(all, &builtin_rules(axes));
    let compatible_count = compatible.len();

    let valid = exclude(compatible, user_rules);
    tracing::debug!(
        "enumerated {} variants: {} compatible, {} after {} exclusion rule(s)",
        total,
        compatible_count,
        valid.len(),
        user_rules.len()
    );
    valid
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawExclusionFile {
    #[serde(default)]
    exclude: Vec<toml::Table>,
}

/// User exclusion rules loaded from a descriptor.
///
/// ```toml
/// [[exclude]]
/// platform = "firecracker"
/// arch = "arm64"
///
/// [[exclude]]
/// networking = ["nat", "bridge"]
/// debug = "not none"
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExclusionSet {
    rules: Vec<ExclusionRule>,
}

impl ExclusionSet {
    /// Load and validate rules against the axes they will filter.
    pub fn load(path: &Path, axes: &Axes) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read exclusion rules: {}", path.display()))?;
        Self::parse(&contents, axes)
            .with_context(|| format!("invalid exclusion rules: {}", path.display()))
    }

    pub fn parse(contents: &str, axes: &Axes) -> Result<Self> {
        let raw: RawExclusionFile = toml::from_str(contents)?;

        let mut rules = Vec::with_capacity(raw.exclude.len());
        for (i, table) in raw.exclude.into_iter().enumerate() {
            let mut entries = Vec::with_capacity(table.len());
            for (key, value) in table {
                let constraint: RawConstraint = value.try_into().with_context(|| {
                    format!(
                        "rule #{}: `{}` must be a string or a list of strings",
                        i + 1,
                        key
                    )
                })?;
                entries.push((key, constraint));
            }
            let rule = ExclusionRule::parse(&entries, axes)
                .with_context(|| format!("rule #{}", i + 1))?;
            rules.push(rule);
        }

        Ok(ExclusionSet { rules })
    }

    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arch_platform() -> Axes {
        Axes::new()
            .with(AxisName::Arch, ["x86_64", "arm64"])
            .with(AxisName::Platform, ["qemu", "firecracker"])
    }

    fn pairs(variants: &[Variant]) -> Vec<(String, String)> {
        variants
            .iter()
            .map(|v| {
                (
                    v.get(AxisName::Arch).unwrap_or_default().to_string(),
                    v.get(AxisName::Platform).unwrap_or_default().to_string(),
                )
            })
            .collect()
    }

    fn owned(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn test_expand_order() {
        let variants = expand(&arch_platform());
        assert_eq!(
            pairs(&variants),
            owned(&[
                ("x86_64", "qemu"),
                ("x86_64", "firecracker"),
                ("arm64", "qemu"),
                ("arm64", "firecracker"),
            ])
        );
    }

    #[test]
    fn test_expand_edge_cases() {
        assert_eq!(expand(&Axes::new()), vec![Variant::new()]);
        let empty = arch_platform().with(AxisName::Fs, Vec::<String>::new());
        assert!(expand(&empty).is_empty());
    }

    #[test]
    fn test_exclude_firecracker_arm64() {
        let axes = arch_platform();
        let rule = ExclusionRule::parse(
            &[("platform", "firecracker".into()), ("arch", "arm64".into())],
            &axes,
        )
        .unwrap();

        let valid = enumerate(&axes, &[rule]);
        assert_eq!(
            pairs(&valid),
            owned(&[
                ("x86_64", "qemu"),
                ("x86_64", "firecracker"),
                ("arm64", "qemu"),
            ])
        );
    }

    #[test]
    fn test_no_rules_is_identity() {
        let axes = arch_platform();
        assert_eq!(exclude(expand(&axes), &[]), expand(&axes));
    }

    #[test]
    fn test_not_excludes_domain_minus_value() {
        let axes = Axes::new().with(AxisName::Platform, ["qemu", "firecracker", "xen"]);
        let rule = ExclusionRule::parse(&[("platform", "not qemu".into())], &axes).unwrap();

        let kept = exclude(expand(&axes), std::slice::from_ref(&rule));
        let removed: Vec<_> = expand(&axes)
            .into_iter()
            .filter(|v| !kept.contains(v))
            .filter_map(|v| v.get(AxisName::Platform).map(str::to_string))
            .collect();
        assert_eq!(removed, vec!["firecracker", "xen"]);
    }

    #[test]
    fn test_result_never_matches_rule() {
        let axes = Axes::defaults();
        let rules = [
            ExclusionRule::parse(&[("debug", "not none".into())], &axes).unwrap(),
            ExclusionRule::parse(
                &[
                    ("networking", vec!["bridge", "nat"].into()),
                    ("arch", "arm64".into()),
                ],
                &axes,
            )
            .unwrap(),
        ];

        let valid = enumerate(&axes, &rules);
        assert!(!valid.is_empty());
        for variant in &valid {
            assert!(rules.iter().all(|r| !r.matches(variant)));
            assert!(builtin_rules(&axes).iter().all(|r| !r.matches(variant)));
        }
    }

    #[test]
    fn test_enumerate_is_idempotent() {
        let axes = Axes::defaults();
        assert_eq!(enumerate(&axes, &[]), enumerate(&axes, &[]));
    }

    #[test]
    fn test_builtin_networking_rules() {
        let axes = Axes::new()
            .with(AxisName::Platform, ["qemu", "firecracker"])
            .with(AxisName::Networking, ["bridge", "tap"]);

        let valid: Vec<String> = enumerate(&axes, &[])
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(
            valid,
            vec![
                "platform=qemu networking=bridge",
                "platform=firecracker networking=tap"
            ]
        );
    }

    #[test]
    fn test_exclusion_set_parse() {
        let axes = Axes::defaults();
        let set = ExclusionSet::parse(
            r#"
[[exclude]]
platform = "fc"
arch = "arm64"

[[exclude]]
networking = ["nat", "bridge"]
debug = "not none"
"#,
            &axes,
        )
        .unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(
            set.rules()[0].to_string(),
            "{platform: firecracker, arch: arm64}"
        );
        assert_eq!(
            set.rules()[1].to_string(),
            "{networking: [nat, bridge], debug: not none}"
        );
    }

    #[test]
    fn test_exclusion_set_errors() {
        let axes = Axes::defaults();
        let err = ExclusionSet::parse("[[exclude]]\nplatform = 3\n", &axes).unwrap_err();
        assert!(format!("{:#}", err).contains("rule #1"));

        let err = ExclusionSet::parse("[[exclude]]\nhost = \"x\"\n", &axes).unwrap_err();
        assert!(format!("{:#}", err).contains("unknown axis `host`"));

        assert!(ExclusionSet::parse("", &axes).unwrap().is_empty());
    }
}
