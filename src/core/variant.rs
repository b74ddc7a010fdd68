//! Variants: one concrete value per configuration axis.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::core::axis::{
    Arch, AxisName, AxisValueParseError, Bootloader, BuildTool, DebugLevel, FsType, Hypervisor,
    Networking, Platform, RunTool,
};

/// A mapping from axis name to one value, ordered by axis declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Variant {
    values: Vec<(AxisName, String)>,
}

impl Variant {
    /// Create an empty variant.
    pub fn new() -> Self {
        Variant { values: Vec::new() }
    }

    /// Set the value of an axis, replacing any previous value.
    pub fn set(&mut self, name: AxisName, value: impl Into<String>) {
        let value = value.into();
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = value,
            None => self.values.push((name, value)),
        }
    }

    /// Builder-style variant of [`Variant::set`].
    pub fn with(mut self, name: AxisName, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Value of an axis, if the variant covers it.
    pub fn get(&self, name: AxisName) -> Option<&str> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (AxisName, &str)> {
        self.values.iter().map(|(n, v)| (*n, v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(AxisName, S)> for Variant {
    fn from_iter<T: IntoIterator<Item = (AxisName, S)>>(iter: T) -> Self {
        let mut variant = Variant::new();
        for (name, value) in iter {
            variant.set(name, value);
        }
        variant
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .values
            .iter()
            .map(|(n, v)| format!("{}={}", n, v))
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

impl Serialize for Variant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in &self.values {
            map.serialize_entry(name.as_str(), value)?;
        }
        map.end()
    }
}

/// Error converting a [`Variant`] into a [`BuildVariant`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VariantConversionError {
    #[error("variant has no value for axis `{0}`")]
    MissingAxis(AxisName),

    #[error(transparent)]
    InvalidValue(#[from] AxisValueParseError),
}

/// Typed view of a variant covering every default axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct BuildVariant {
    pub arch: Arch,
    pub hypervisor: Hypervisor,
    pub platform: Platform,
    pub build_tool: BuildTool,
    pub run_tool: RunTool,
    pub bootloader: Bootloader,
    pub debug: DebugLevel,
    pub fs: FsType,
    pub networking: Networking,
}

impl BuildVariant {
    /// Convert back into the generic representation, in default axis order.
    pub fn to_variant(&self) -> Variant {
        Variant::new()
            .with(AxisName::Arch, self.arch.as_str())
            .with(AxisName::Hypervisor, self.hypervisor.as_str())
            .with(AxisName::Platform, self.platform.as_str())
            .with(AxisName::BuildTool, self.build_tool.as_str())
            .with(AxisName::RunTool, self.run_tool.as_str())
            .with(AxisName::Bootloader, self.bootloader.as_str())
            .with(AxisName::Debug, self.debug.as_str())
            .with(AxisName::Fs, self.fs.as_str())
            .with(AxisName::Networking, self.networking.as_str())
    }
}

impl TryFrom<&Variant> for BuildVariant {
    type Error = VariantConversionError;

    fn try_from(variant: &Variant) -> Result<Self, Self::Error> {
        let field = |name: AxisName| {
            variant
                .get(name)
                .ok_or(VariantConversionError::MissingAxis(name))
        };

        Ok(BuildVariant {
            arch: field(AxisName::Arch)?.parse()?,
            hypervisor: field(AxisName::Hypervisor)?.parse()?,
            platform: field(AxisName::Platform)?.parse()?,
            build_tool: field(AxisName::BuildTool)?.parse()?,
            run_tool: field(AxisName::RunTool)?.parse()?,
            bootloader: field(AxisName::Bootloader)?.parse()?,
            debug: field(AxisName::Debug)?.parse()?,
            fs: field(AxisName::Fs)?.parse()?,
            networking: field(AxisName::Networking)?.parse()?,
        })
    }
}
