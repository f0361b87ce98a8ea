//! YAML profile parsing (spec §4.1): a concrete raw-document AST with
//! custom deserializers for every documented "flexible shape" (scalar vs
//! list, decimal vs hex literal, bool vs any-scalar truthiness, delimiter
//! shorthand vs mapping, lookup-key variants), normalized once into the
//! plain `profile::model` types. No runtime polymorphism survives into the
//! in-memory model, per spec §9's recommended strategy.
//!
//! Mirrors `config.rs::Config::new` from the teacher: read bytes, check a
//! size guard, `serde_yaml::from_str`, convert/validate, return a typed
//! error on any failure.

use serde::Deserialize;
use serde_with::{serde_as, OneOrMany};

use crate::profile::model::*;
use crate::prelude::{debug, trace, warn, ProfileError};

/// Memory-exhaustion guard (spec §4.1/§6): documents larger than this are
/// rejected before parsing.
pub const MAX_PROFILE_BYTES: usize = 262_144;

/// Parse and validate a UTF-8 YAML device-profile document.
pub fn load(id: &str, yaml: &str) -> Result<InverterDefinition, ProfileError> {
    trace!("loading profile {id:?} ({} bytes)", yaml.len());

    if yaml.len() > MAX_PROFILE_BYTES {
        warn!("profile {id:?} is {} bytes, exceeds the {} byte limit", yaml.len(), MAX_PROFILE_BYTES);
        return Err(ProfileError::LoadFailed {
            id: id.to_string(),
            reason: format!(
                "profile is {} bytes, exceeds the {} byte limit",
                yaml.len(),
                MAX_PROFILE_BYTES
            ),
        });
    }

    let raw: RawDocument = serde_yaml::from_str(yaml).map_err(|err| {
        let line = err.location().map(|l| l.line());
        debug!("profile {id:?} failed to parse at line {line:?}: {err}");
        ProfileError::ParseError { id: id.to_string(), line, reason: err.to_string() }
    })?;

    let definition = raw.into_definition(id)?;
    debug!(
        "loaded profile {id:?}: manufacturer={:?} parameter_groups={}",
        definition.info.manufacturer,
        definition.parameters.len()
    );
    Ok(definition)
}

// --- raw document shape -----------------------------------------------

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawDocument {
    info: RawInfo,
    #[serde(rename = "default", default)]
    defaults: Option<RawDefaults>,
    #[serde(default)]
    requests: Vec<RawRequest>,
    parameters: Vec<RawParameterGroup>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawInfo {
    manufacturer: String,
    #[serde_as(as = "OneOrMany<_>")]
    model: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawDefaults {
    update_interval: Option<u32>,
    digits: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawRequest {
    start: u16,
    count: u16,
    #[serde(default)]
    function: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawParameterGroup {
    group: String,
    #[serde(default)]
    update_interval: Option<u32>,
    #[serde(default)]
    items: Vec<RawSensorItem>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawSensorItem {
    name: String,
    rule: Rule,
    #[serde(default)]
    registers: Vec<u16>,
    #[serde(default)]
    platform: Platform,
    #[serde(default)]
    class: Option<String>,
    #[serde(default)]
    state_class: Option<String>,
    #[serde(default)]
    uom: Option<String>,
    #[serde(default)]
    icon: Option<String>,

    #[serde_as(as = "Option<OneOrMany<_>>")]
    #[serde(default)]
    scale: Option<Vec<f64>>,
    #[serde(default)]
    offset: Option<f64>,
    #[serde(default)]
    signed: Option<bool>,
    #[serde(default)]
    inverse: Option<bool>,
    #[serde(default)]
    magnitude: Option<bool>,

    #[serde(default)]
    mask: Option<RawIntLiteral>,
    #[serde(default)]
    divide: Option<RawIntLiteral>,
    #[serde(default)]
    bit: Option<u8>,

    #[serde(default)]
    range: Option<RawRange>,
    #[serde(default)]
    validation: Option<RawValidation>,

    #[serde(default)]
    lookup: Vec<RawLookupEntry>,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    sensors: Vec<RawCompositeSensor>,

    #[serde(default)]
    attributes: Vec<String>,
    #[serde(default)]
    attribute: Option<serde_yaml::Value>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    update_interval: Option<u32>,

    #[serde(default)]
    delimiter: Option<RawDelimiter>,
    #[serde(default)]
    hex: Option<serde_yaml::Value>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawRange {
    #[serde_as(as = "Option<OneOrMany<_>>")]
    #[serde(default)]
    min: Option<Vec<f64>>,
    #[serde_as(as = "Option<OneOrMany<_>>")]
    #[serde(default)]
    max: Option<Vec<f64>>,
    #[serde(rename = "default")]
    #[serde_as(as = "Option<OneOrMany<_>>")]
    #[serde(default)]
    value_default: Option<Vec<f64>>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct RawValidation {
    #[serde_as(as = "Option<OneOrMany<_>>")]
    #[serde(default)]
    min: Option<Vec<f64>>,
    #[serde_as(as = "Option<OneOrMany<_>>")]
    #[serde(default)]
    max: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawIntLiteral {
    Number(i64),
    Hex(String),
}

impl RawIntLiteral {
    fn into_u32(self, field: &str) -> Result<u32, String> {
        match self {
            RawIntLiteral::Number(n) => Ok(n as u32),
            RawIntLiteral::Hex(s) => {
                let trimmed = s.trim();
                let digits = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X"));
                match digits {
                    Some(hex) => u32::from_str_radix(hex, 16)
                        .map_err(|e| format!("invalid hex literal for {field}: {e}")),
                    None => trimmed
                        .parse::<u32>()
                        .map_err(|e| format!("invalid integer literal for {field}: {e}")),
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDelimiter {
    Scalar(String),
    Mapping {
        #[serde(default)]
        digit: Option<String>,
        #[serde(default)]
        register: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawLookupEntry {
    #[serde(default)]
    key: Option<RawLookupKey>,
    #[serde(default)]
    bit: Option<u8>,
    value: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawLookupKey {
    Int(i64),
    List(Vec<i64>),
    Str(String),
}

#[derive(Debug, Deserialize)]
struct RawCompositeSensor {
    registers: Vec<u16>,
    #[serde(default = "default_scale")]
    scale: f64,
    #[serde(default)]
    offset: f64,
    #[serde(default)]
    signed: bool,
    #[serde(default)]
    operator: CompositeOperator,
}

impl Default for CompositeOperator {
    fn default() -> Self {
        CompositeOperator::Add
    }
}

fn default_scale() -> f64 {
    1.0
}

// --- conversion into the in-memory model -------------------------------

impl RawDocument {
    fn into_definition(self, id: &str) -> Result<InverterDefinition, ProfileError> {
        if self.info.manufacturer.trim().is_empty() {
            return Err(ProfileError::ParseError {
                id: id.to_string(),
                line: None,
                reason: "info.manufacturer is required".to_string(),
            });
        }
        if self.info.model.is_empty() || self.info.model.iter().all(|m| m.trim().is_empty()) {
            return Err(ProfileError::ParseError {
                id: id.to_string(),
                line: None,
                reason: "info.model is required".to_string(),
            });
        }

        let defaults = match self.defaults {
            Some(d) => Defaults {
                update_interval: d.update_interval.unwrap_or(5),
                digits: d.digits.unwrap_or(6),
            },
            None => Defaults::default(),
        };

        let requests = self
            .requests
            .into_iter()
            .map(|r| RequestOverride {
                start: r.start,
                count: r.count,
                function: r.function,
                name: r.name,
            })
            .collect();

        let mut parameters = Vec::with_capacity(self.parameters.len());
        for group in self.parameters {
            let mut items = Vec::with_capacity(group.items.len());
            for raw_item in group.items {
                items.push(raw_item.into_model(id)?);
            }
            parameters.push(ParameterGroup {
                group: group.group,
                update_interval: group.update_interval,
                items,
            });
        }

        Ok(InverterDefinition {
            info: DeviceInfo { manufacturer: self.info.manufacturer, model: self.info.model },
            defaults,
            parameters,
            requests,
        })
    }
}

impl RawSensorItem {
    fn into_model(self, id: &str) -> Result<SensorItem, ProfileError> {
        let err = |reason: String| ProfileError::ParseError { id: id.to_string(), line: None, reason };

        let scale = self.scale.and_then(|v| v.into_iter().next()).unwrap_or(1.0);
        let mask = self.mask.map(|v| v.into_u32("mask")).transpose().map_err(err)?;
        let divide = self.divide.map(|v| v.into_u32("divide")).transpose().map_err(err)?;

        if let Some(bit) = self.bit {
            if bit > 31 {
                return Err(err(format!("bit position {bit} out of range 0..=31")));
            }
        }

        let range_min = self.range.as_ref().and_then(|r| first(&r.min));
        let range_max = self.range.as_ref().and_then(|r| first(&r.max));
        let range_default = self.range.as_ref().and_then(|r| first(&r.value_default));
        let validation_min = self.validation.as_ref().and_then(|v| first(&v.min));
        let validation_max = self.validation.as_ref().and_then(|v| first(&v.max));

        let version = match self.delimiter {
            None => VersionOptions::default(),
            Some(RawDelimiter::Scalar(digit)) => {
                VersionOptions { digit_delimiter: digit, register_delimiter: "-".to_string(), hex: true }
            }
            Some(RawDelimiter::Mapping { digit, register }) => VersionOptions {
                digit_delimiter: digit.unwrap_or_else(|| ".".to_string()),
                register_delimiter: register.unwrap_or_else(|| "-".to_string()),
                hex: true,
            },
        };
        let hex = parse_hex_flag(self.hex);
        let version = VersionOptions { hex, ..version };

        let mut lookup = Vec::with_capacity(self.lookup.len());
        for entry in self.lookup {
            let key = if let Some(bit) = entry.bit {
                LookupKey::Bit(bit)
            } else {
                match entry.key {
                    Some(RawLookupKey::Int(n)) => LookupKey::Single(n),
                    Some(RawLookupKey::List(v)) => LookupKey::Multiple(v),
                    Some(RawLookupKey::Str(s)) if s == "default" => LookupKey::Default,
                    Some(RawLookupKey::Str(s)) => {
                        return Err(err(format!("unrecognised lookup key '{s}'")))
                    }
                    None => return Err(err("lookup entry needs a key or bit".to_string())),
                }
            };
            lookup.push(LookupEntry { key, value: entry.value });
        }

        let sensors = self
            .sensors
            .into_iter()
            .map(|s| CompositeSensor {
                registers: s.registers,
                scale: s.scale,
                offset: s.offset,
                signed: s.signed,
                operator: s.operator,
            })
            .collect();

        Ok(SensorItem {
            normalized_id: normalize_id(&self.name),
            name: self.name,
            registers: self.registers,
            rule: self.rule,
            platform: self.platform,
            class: self.class,
            state_class: self.state_class,
            uom: self.uom,
            icon: self.icon,
            scale,
            offset: self.offset.unwrap_or(0.0),
            signed: self.signed.unwrap_or(false),
            inverse: self.inverse.unwrap_or(false),
            magnitude: self.magnitude.unwrap_or(false),
            mask,
            divide,
            bit: self.bit,
            range_min,
            range_max,
            range_default,
            validation_min,
            validation_max,
            lookup,
            sensors,
            options: self.options,
            version,
            attribute: self.attribute.is_some(),
            attributes: self.attributes,
            description: self.description,
            update_interval: self.update_interval,
        })
    }
}

fn first(values: &Option<Vec<f64>>) -> Option<f64> {
    values.as_ref().and_then(|v| v.first().copied())
}

/// `hex:` absent -> true (default); `hex: ~` (null) -> true; `hex: true`/
/// `hex: false` -> that value; any other scalar -> true (matches the
/// default, mirroring `attribute`'s own any-scalar-is-truthy leniency).
fn parse_hex_flag(value: Option<serde_yaml::Value>) -> bool {
    match value {
        None => true,
        Some(serde_yaml::Value::Null) => true,
        Some(serde_yaml::Value::Bool(b)) => b,
        Some(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEYE_P3_YAML: &str = r#"
info:
  manufacturer: DEYE
  model: SUN-12K-SG04LP3-EU
parameters:
  - group: Battery
    items:
      - name: Battery SOC
        rule: 1
        registers: [184]
      - name: Battery Voltage
        rule: 1
        registers: [183]
        scale: 0.01
      - name: Battery Power
        rule: 2
        registers: [190]
"#;

    #[test]
    fn loads_minimal_valid_profile() {
        let def = load("deye_p3", DEYE_P3_YAML).expect("should parse");
        assert_eq!(def.info.manufacturer, "DEYE");
        assert_eq!(def.info.model, vec!["SUN-12K-SG04LP3-EU".to_string()]);
        assert_eq!(def.defaults, Defaults::default());
        assert_eq!(def.parameters.len(), 1);
        assert_eq!(def.parameters[0].items.len(), 3);
        assert_eq!(def.parameters[0].items[0].normalized_id, "battery_soc");
    }

    #[test]
    fn model_scalar_and_list_both_parse_to_a_list() {
        let list_yaml = DEYE_P3_YAML.replace(
            "model: SUN-12K-SG04LP3-EU",
            "model: [SUN-12K-SG04LP3-EU, SUN-12K-SG04LP3-AU]",
        );
        let def = load("deye_p3", &list_yaml).unwrap();
        assert_eq!(def.info.model.len(), 2);
    }

    #[test]
    fn rejects_document_over_size_cap() {
        let huge = "a".repeat(MAX_PROFILE_BYTES + 1);
        let err = load("huge", &huge).unwrap_err();
        match err {
            ProfileError::LoadFailed { .. } => {}
            other => panic!("expected LoadFailed, got {other:?}"),
        }
    }

    #[test]
    fn missing_manufacturer_is_a_parse_error() {
        let yaml = "info:\n  model: X\nparameters: []\n";
        let err = load("bad", yaml).unwrap_err();
        match err {
            ProfileError::ParseError { .. } => {}
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn scale_list_takes_first_element() {
        let yaml = r#"
info:
  manufacturer: DEYE
  model: X
parameters:
  - group: Battery
    items:
      - name: Battery Voltage
        rule: 1
        registers: [183]
        scale: [0.01, 0.1]
"#;
        let def = load("deye_p3", yaml).unwrap();
        assert_eq!(def.parameters[0].items[0].scale, 0.01);
    }

    #[test]
    fn mask_accepts_hex_string_literal() {
        let yaml = r#"
info:
  manufacturer: DEYE
  model: X
parameters:
  - group: Battery
    items:
      - name: Flags
        rule: 1
        registers: [1]
        mask: "0x0F"
"#;
        let def = load("deye_p3", yaml).unwrap();
        assert_eq!(def.parameters[0].items[0].mask, Some(0x0F));
    }

    #[test]
    fn delimiter_shorthand_sets_digit_keeps_default_register() {
        let yaml = r#"
info:
  manufacturer: DEYE
  model: X
parameters:
  - group: Info
    items:
      - name: Firmware
        rule: 7
        registers: [1, 2]
        delimiter: ""
"#;
        let def = load("deye_p3", yaml).unwrap();
        let v = &def.parameters[0].items[0].version;
        assert_eq!(v.digit_delimiter, "");
        assert_eq!(v.register_delimiter, "-");
    }

    #[test]
    fn hex_null_means_true() {
        let yaml = r#"
info:
  manufacturer: DEYE
  model: X
parameters:
  - group: Info
    items:
      - name: Firmware
        rule: 7
        registers: [1]
        hex: ~
"#;
        let def = load("deye_p3", yaml).unwrap();
        assert!(def.parameters[0].items[0].version.hex);
    }

    #[test]
    fn attribute_true_for_any_present_value() {
        let yaml = r#"
info:
  manufacturer: DEYE
  model: X
parameters:
  - group: Info
    items:
      - name: Something
        rule: 1
        registers: [1]
        attribute: "anything"
"#;
        let def = load("deye_p3", yaml).unwrap();
        assert!(def.parameters[0].items[0].attribute);
    }

    #[test]
    fn lookup_bit_entry_takes_priority_over_key() {
        let yaml = r#"
info:
  manufacturer: DEYE
  model: X
parameters:
  - group: Alerts
    items:
      - name: Alarms
        rule: 1
        registers: [553]
        lookup:
          - bit: 1
            value: "Fan failure"
          - key: default
            value: "Unknown"
"#;
        let def = load("deye_p3", yaml).unwrap();
        let lookup = &def.parameters[0].items[0].lookup;
        assert_eq!(lookup[0].key, LookupKey::Bit(1));
        assert_eq!(lookup[1].key, LookupKey::Default);
    }

    #[test]
    fn bit_above_31_on_item_is_rejected() {
        let yaml = r#"
info:
  manufacturer: DEYE
  model: X
parameters:
  - group: Info
    items:
      - name: Flag
        rule: 1
        registers: [1]
        bit: 40
"#;
        let err = load("deye_p3", yaml).unwrap_err();
        match err {
            ProfileError::ParseError { .. } => {}
            other => panic!("expected ParseError, got {other:?}"),
        }
    }
}
