//! Exclusion rules: partial axis constraints removing matching variants.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::axis::{AxisName, Axes};
use crate::core::variant::Variant;
use crate::variants::VariantError;

/// Prefix turning a literal into its complement.
const NOT_PREFIX: &str = "not ";

/// A single selector: a literal value or its negation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Exactly this value
    Is(String),
    /// Any domain value except this one
    Not(String),
}

impl Selector {
    /// Parse `x` or `not x`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.strip_prefix(NOT_PREFIX) {
            Some(value) => Selector::Not(value.trim().to_string()),
            None => Selector::Is(raw.to_string()),
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Selector::Is(v) | Selector::Not(v) => v,
        }
    }

    fn with_value(&self, value: String) -> Self {
        match self {
            Selector::Is(_) => Selector::Is(value),
            Selector::Not(_) => Selector::Not(value),
        }
    }

    /// Values of `domain` this selector allows, in domain order.
    fn allowed<'a>(&'a self, domain: &'a [String]) -> impl Iterator<Item = &'a String> + 'a {
        domain.iter().filter(move |v| match self {
            Selector::Is(x) => *v == x,
            Selector::Not(x) => *v != x,
        })
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Is(v) => write!(f, "{}", v),
            Selector::Not(v) => write!(f, "{}{}", NOT_PREFIX, v),
        }
    }
}

/// Constraint as written in a descriptor: one selector or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawConstraint {
    One(String),
    Any(Vec<String>),
}

impl RawConstraint {
    fn selectors(&self) -> Vec<Selector> {
        match self {
            RawConstraint::One(s) => vec![Selector::parse(s)],
            RawConstraint::Any(list) => list.iter().map(|s| Selector::parse(s)).collect(),
        }
    }
}

impl From<&str> for RawConstraint {
    fn from(s: &str) -> Self {
        RawConstraint::One(s.to_string())
    }
}

impl From<Vec<&str>> for RawConstraint {
    fn from(list: Vec<&str>) -> Self {
        RawConstraint::Any(list.into_iter().map(str::to_string).collect())
    }
}

/// The allowed set of one axis within a rule.
///
/// The allowed set is the union of every selector's allowed values, computed
/// once against the axis domain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraint {
    selectors: Vec<Selector>,
    allowed: Vec<String>,
}

impl Constraint {
    pub fn new(selectors: Vec<Selector>, domain: &[String]) -> Self {
        let allowed = domain
            .iter()
            .filter(|v| selectors.iter().any(|s| s.allowed(domain).any(|a| a == *v)))
            .cloned()
            .collect();
        Constraint { selectors, allowed }
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    pub fn allows(&self, value: &str) -> bool {
        self.allowed.iter().any(|a| a == value)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selectors.as_slice() {
            [single] => write!(f, "{}", single),
            many => {
                let parts: Vec<String> = many.iter().map(|s| s.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

/// A partial mapping from axis to constraint.
///
/// A variant matches when its value for every constrained axis is allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusionRule {
    constraints: Vec<(AxisName, Constraint)>,
    reason: Option<String>,
}

impl ExclusionRule {
    /// Parse a user rule against the axes it will filter.
    ///
    /// Every key must name a declared axis and every value must belong to
    /// that axis domain or to the axis vocabulary. Aliases (`fc`, `aarch64`)
    /// are normalized. A known value outside a narrowed domain allows nothing.
    pub fn parse<K: AsRef<str>>(
        raw: &[(K, RawConstraint)],
        axes: &Axes,
    ) -> Result<Self, VariantError> {
        if raw.is_empty() {
            return Err(VariantError::EmptyRule);
        }

        let mut constraints = Vec::with_capacity(raw.len());
        for (key, constraint) in raw {
            let key = key.as_ref();
            let name: AxisName = key.parse().map_err(|_| VariantError::UnknownAxis {
                key: key.to_string(),
            })?;
            let domain = axes
                .domain(name)
                .ok_or(VariantError::UndeclaredAxis { axis: name })?;

            let mut selectors = Vec::new();
            for selector in constraint.selectors() {
                let value = canonical_value(name, selector.value(), domain).ok_or_else(|| {
                    VariantError::UnknownValue {
                        axis: name,
                        value: selector.value().to_string(),
                        domain: Axes::defaults()
                            .domain(name)
                            .unwrap_or(domain)
                            .join(", "),
                    }
                })?;
                selectors.push(selector.with_value(value));
            }
            if selectors.is_empty() {
                return Err(VariantError::EmptyConstraint { axis: name });
            }

            constraints.push((name, Constraint::new(selectors, domain)));
        }

        Ok(ExclusionRule {
            constraints,
            reason: None,
        })
    }

    /// Build a rule from fixed selectors without validation.
    ///
    /// Keys missing from `axes` make the rule inapplicable and yield `None`.
    /// Values outside a narrowed domain simply allow nothing.
    pub fn lenient(raw: &[(AxisName, &str)], axes: &Axes) -> Option<Self> {
        let mut constraints = Vec::with_capacity(raw.len());
        for (name, selector) in raw {
            let domain = axes.domain(*name)?;
            let selector = Selector::parse(selector);
            let value = canonical_in_domain(*name, selector.value(), domain)
                .unwrap_or_else(|| selector.value().to_string());
            constraints.push((*name, Constraint::new(vec![selector.with_value(value)], domain)));
        }
        Some(ExclusionRule {
            constraints,
            reason: None,
        })
    }

    /// Attach a human-readable explanation.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn constraints(&self) -> &[(AxisName, Constraint)] {
        &self.constraints
    }

    /// Whether this rule excludes `variant`.
    ///
    /// A constrained axis the variant does not cover never matches.
    pub fn matches(&self, variant: &Variant) -> bool {
        self.constraints.iter().all(|(name, constraint)| {
            variant
                .get(*name)
                .map(|value| constraint.allows(value))
                .unwrap_or(false)
        })
    }
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .constraints
            .iter()
            .map(|(name, c)| format!("{}: {}", name, c))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Spelling of `value` in `domain`, or its canonical vocabulary spelling.
fn canonical_value(name: AxisName, value: &str, domain: &[String]) -> Option<String> {
    canonical_in_domain(name, value, domain)
        .or_else(|| name.canonical_value(value).map(str::to_string))
}

fn canonical_in_domain(name: AxisName, value: &str, domain: &[String]) -> Option<String> {
    if domain.iter().any(|v| v == value) {
        return Some(value.to_string());
    }
    name.canonical_value(value)
        .filter(|canonical| domain.iter().any(|v| v == canonical))
        .map(str::to_string)
}
