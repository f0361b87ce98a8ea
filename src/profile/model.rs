//! In-memory device-profile model (spec §3): device info, parameter
//! groups, sensor items, lookups, composite sub-sensors and version/
//! datetime decoding options. This module owns the shape only; YAML
//! decoding quirks (scalar-or-list, hex literals, delimiter shorthand)
//! live in `profile::loader` and normalize into these types.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// A fully loaded, immutable device profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InverterDefinition {
    pub info: DeviceInfo,
    pub defaults: Defaults,
    pub parameters: Vec<ParameterGroup>,
    pub requests: Vec<RequestOverride>,
}

impl InverterDefinition {
    /// All sensor items across every parameter group whose group name is in
    /// `group_names` (case-sensitive, matching spec §6's literal group-name
    /// table).
    pub fn items_in_groups<'a>(&'a self, group_names: &[&str]) -> Vec<&'a SensorItem> {
        self.parameters
            .iter()
            .filter(|pg| group_names.contains(&pg.group.as_str()))
            .flat_map(|pg| pg.items.iter())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub manufacturer: String,
    /// Always normalized to a list at load time, even when the YAML used
    /// the scalar shorthand.
    pub model: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    pub update_interval: u32,
    pub digits: u32,
}

impl Default for Defaults {
    fn default() -> Self {
        Self { update_interval: 5, digits: 6 }
    }
}

/// `requests.function` is retained for round-tripping and visibility but is
/// not wired into the batcher/reader (spec §9, open question 3): holding
/// registers are always used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOverride {
    pub start: u16,
    pub count: u16,
    pub function: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGroup {
    pub group: String,
    pub update_interval: Option<u32>,
    pub items: Vec<SensorItem>,
}

/// Parsing rule a sensor item's raw registers are decoded with (spec §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Rule {
    Computed = 0,
    U16 = 1,
    I16 = 2,
    U32 = 3,
    I32 = 4,
    Ascii = 5,
    Bits = 6,
    Version = 7,
    Datetime = 8,
    Time = 9,
    Raw = 10,
}

impl Rule {
    /// Minimum register count the rule requires to decode at all.
    pub fn min_registers(self) -> usize {
        match self {
            Rule::Computed => 0,
            Rule::U16 | Rule::I16 | Rule::Time => 1,
            Rule::U32 | Rule::I32 => 2,
            Rule::Ascii | Rule::Bits | Rule::Version | Rule::Raw => 1,
            Rule::Datetime => 3,
        }
    }

    /// Numeric (f64-producing) rules, per spec §4.4's value-extraction pass.
    pub fn is_numeric(self) -> bool {
        matches!(self, Rule::U16 | Rule::I16 | Rule::U32 | Rule::I32 | Rule::Time)
    }
}

impl<'de> Deserialize<'de> for Rule {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = u8::deserialize(deserializer)?;
        Rule::try_from(raw).map_err(|_| serde::de::Error::custom(format!("unknown rule {raw}")))
    }
}

impl Serialize for Rule {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8((*self).into())
    }
}

/// Read-only vs writable platform kind. Defaults to `Sensor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Sensor,
    BinarySensor,
    Number,
    Select,
    Switch,
    Datetime,
    Time,
    Button,
}

impl Default for Platform {
    fn default() -> Self {
        Platform::Sensor
    }
}

/// Digit/register delimiter and hex-output options for rule-7 (version)
/// decoding (spec §4.1/§4.2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionOptions {
    pub digit_delimiter: String,
    pub register_delimiter: String,
    pub hex: bool,
}

impl Default for VersionOptions {
    fn default() -> Self {
        Self {
            digit_delimiter: ".".to_string(),
            register_delimiter: "-".to_string(),
            hex: true,
        }
    }
}

/// One lookup-table entry: a discriminator (exact value / value-set / bit
/// position / fallback) mapped to a display string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LookupEntry {
    pub key: LookupKey,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LookupKey {
    Single(i64),
    Multiple(Vec<i64>),
    Bit(u8),
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// A sub-sensor combined into an aggregate value by a composite sensor
/// (spec §3's "composite sub-sensors").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeSensor {
    pub registers: Vec<u16>,
    pub scale: f64,
    pub offset: f64,
    pub signed: bool,
    pub operator: CompositeOperator,
}

/// The central entity: one named, addressable (or computed) value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorItem {
    pub name: String,
    pub normalized_id: String,
    pub registers: Vec<u16>,
    pub rule: Rule,
    pub platform: Platform,
    pub class: Option<String>,
    pub state_class: Option<String>,
    pub uom: Option<String>,
    pub icon: Option<String>,

    pub scale: f64,
    pub offset: f64,
    pub signed: bool,
    pub inverse: bool,
    pub magnitude: bool,

    pub mask: Option<u32>,
    pub divide: Option<u32>,
    pub bit: Option<u8>,

    pub range_min: Option<f64>,
    pub range_max: Option<f64>,
    pub range_default: Option<f64>,

    pub validation_min: Option<f64>,
    pub validation_max: Option<f64>,

    pub lookup: Vec<LookupEntry>,
    pub sensors: Vec<CompositeSensor>,
    pub options: Vec<String>,

    pub version: VersionOptions,

    pub attribute: bool,
    pub attributes: Vec<String>,
    pub description: Option<String>,
    pub update_interval: Option<u32>,
}

impl SensorItem {
    /// Device-level placeholder: excluded from value extraction (spec §3).
    pub fn is_placeholder(&self) -> bool {
        self.name.is_empty()
    }

    /// Computed sensor: no backing registers (spec §3).
    pub fn is_computed(&self) -> bool {
        self.registers.is_empty()
    }
}

/// `normalized_id` derivation: lowercase, spaces and hyphens -> `_`,
/// order-preserving, consecutive separators produce consecutive `_`.
/// Idempotent: `normalize_id(normalize_id(s)) == normalize_id(s)`.
pub fn normalize_id(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}
