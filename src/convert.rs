//! Pure register-value conversion (spec §4.2): raw 16-bit register slices
//! decoded into typed values per a sensor item's parsing rule, with range
//! filtering, bit/mask/divide/bit-extract manipulation, affine transform,
//! magnitude decoding and post-transform validation.
//!
//! Grounded on `lxp/packet.rs`'s `Utils::le_u16_div10`-family free
//! functions: one small pure function per transform, composed in a fixed
//! pipeline. This module decodes from an already-assembled
//! `address -> u16` register map rather than a raw byte stream, so the
//! teacher's `nom`/`nom-derive` byte-parsing machinery has no remaining use
//! here (see DESIGN.md).

use crate::error::SensorError;
use crate::profile::model::{CompositeOperator, LookupKey, Rule, SensorItem};

/// Decode a numeric value from `registers` per `item`'s rule and transform
/// options. Follows the strict seven-step order from spec §4.2.
pub fn convert_numeric(registers: &[u16], item: &SensorItem) -> Result<f64, SensorError> {
    let min_registers = item.rule.min_registers();
    if registers.len() < min_registers {
        return Err(SensorError::InsufficientRegisters { expected: min_registers, got: registers.len() });
    }

    let mut raw = decode_raw(registers, item)?;

    // Step 2: raw-value range check (before transformation).
    if let Some(substituted) = apply_raw_range(raw, item)? {
        raw = substituted;
    }

    // Step 3: mask.
    if let Some(mask) = item.mask {
        raw = ((raw as i64 as u32) & mask) as f64;
    }

    // Step 4: bit extraction.
    if let Some(bit) = item.bit {
        raw = (((raw as i64 as u32) >> bit) & 1) as f64;
    }

    // Step 5: affine transform.
    let mut value = (raw - item.offset) * item.scale;
    if item.inverse {
        value = -value;
    }

    // Step 6: integer divide (truncate toward zero in integer space, then widen).
    if let Some(divide) = item.divide {
        if divide > 0 {
            value = (value.trunc() as i64 / divide as i64) as f64;
        }
    }

    // Step 7: post-transform validation.
    if let Some(min) = item.validation_min {
        if value < min {
            return Err(SensorError::ValueOutOfRange {
                value,
                min: item.validation_min,
                max: item.validation_max,
            });
        }
    }
    if let Some(max) = item.validation_max {
        if value > max {
            return Err(SensorError::ValueOutOfRange {
                value,
                min: item.validation_min,
                max: item.validation_max,
            });
        }
    }

    Ok(value)
}

fn apply_raw_range(raw: f64, item: &SensorItem) -> Result<Option<f64>, SensorError> {
    let below_min = item.range_min.map(|min| raw < min).unwrap_or(false);
    let above_max = item.range_max.map(|max| raw > max).unwrap_or(false);
    if !below_min && !above_max {
        return Ok(None);
    }
    match item.range_default {
        Some(default) => Ok(Some(default)),
        None => Err(SensorError::RawValueOutOfRange { value: raw, min: item.range_min, max: item.range_max }),
    }
}

fn decode_raw(registers: &[u16], item: &SensorItem) -> Result<f64, SensorError> {
    match item.rule {
        Rule::Computed | Rule::Ascii | Rule::Bits | Rule::Version | Rule::Datetime | Rule::Raw => {
            Err(SensorError::UnsupportedRule { rule: item.rule.into() })
        }
        Rule::U16 => Ok(decode_16(registers[0], item.signed, item.magnitude)),
        Rule::I16 => Ok(decode_16(registers[0], true, item.magnitude)),
        Rule::U32 => Ok(decode_32(registers[0], registers[1], item.signed, item.magnitude)),
        Rule::I32 => Ok(decode_32(registers[0], registers[1], true, item.magnitude)),
        Rule::Time => {
            let raw = registers[0];
            let hours = (raw / 100) as f64;
            let minutes = (raw % 100) as f64;
            Ok(hours * 60.0 + minutes)
        }
    }
}

fn decode_16(reg: u16, signed: bool, magnitude: bool) -> f64 {
    if !signed {
        return reg as f64;
    }
    if magnitude {
        sign_magnitude_16(reg) as f64
    } else {
        reg as i16 as f64
    }
}

fn decode_32(low: u16, high: u16, signed: bool, magnitude: bool) -> f64 {
    let combined = (low as u32) | ((high as u32) << 16);
    if !signed {
        return combined as f64;
    }
    if magnitude {
        sign_magnitude_32(combined) as f64
    } else {
        combined as i32 as f64
    }
}

/// `0x8000 | v` decodes to `-v`; `v` (bit 15 clear) decodes to `+v`.
pub fn sign_magnitude_16(reg: u16) -> i32 {
    let magnitude = (reg & 0x7FFF) as i32;
    if reg & 0x8000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// 32-bit sign-magnitude: bit 31 is the sign, low 31 bits are the magnitude.
pub fn sign_magnitude_32(combined: u32) -> i64 {
    let magnitude = (combined & 0x7FFF_FFFF) as i64;
    if combined & 0x8000_0000 != 0 {
        -magnitude
    } else {
        magnitude
    }
}

/// Extract `(raw >> bit) & 1`: always 0 or 1, independent of scale/offset.
pub fn extract_bit(raw: u32, bit: u8) -> u32 {
    (raw >> bit) & 1
}

/// Rule-5 ASCII decoding: each register is MSB-first two ASCII bytes, stop
/// at the first zero byte, reject control characters (security boundary).
pub fn convert_string(registers: &[u16]) -> Result<String, SensorError> {
    let mut bytes = Vec::with_capacity(registers.len() * 2);
    'outer: for reg in registers {
        for byte in [(reg >> 8) as u8, (reg & 0xFF) as u8] {
            if byte == 0 {
                break 'outer;
            }
            bytes.push(byte);
        }
    }

    let s = String::from_utf8(bytes).map_err(|_| SensorError::InvalidUtf8)?;

    for c in s.chars() {
        let scalar = c as u32;
        if scalar < 0x20 || scalar == 0x7F || (0x80..=0x9F).contains(&scalar) {
            return Err(SensorError::ControlCharacter { scalar });
        }
    }

    Ok(s)
}

/// Rule-7 version decoding: nibble-split each register MSB-first, render
/// hex (default) or decimal, join with the digit/register delimiters, strip
/// a trailing register delimiter, then drop leading "0" digit-groups.
pub fn convert_version(registers: &[u16], item: &SensorItem) -> String {
    let opts = &item.version;
    let mut register_strs = Vec::with_capacity(registers.len());

    for reg in registers {
        let nibbles = [
            (reg >> 12) & 0xF,
            (reg >> 8) & 0xF,
            (reg >> 4) & 0xF,
            reg & 0xF,
        ];
        let rendered: Vec<String> = nibbles
            .iter()
            .map(|n| if opts.hex { format!("{n:X}") } else { format!("{n}") })
            .collect();
        register_strs.push(rendered.join(&opts.digit_delimiter));
    }

    let mut joined = register_strs.join(&opts.register_delimiter);
    if !opts.register_delimiter.is_empty() {
        while joined.ends_with(&opts.register_delimiter) {
            joined.truncate(joined.len() - opts.register_delimiter.len());
        }
    }

    if opts.digit_delimiter.is_empty() {
        return joined;
    }

    let split_char = match opts.digit_delimiter.chars().next() {
        Some(c) => c,
        None => return joined,
    };

    let parts: Vec<&str> = joined.split(split_char).collect();
    let mut first_nonzero = 0;
    while first_nonzero < parts.len().saturating_sub(1) && parts[first_nonzero] == "0" {
        first_nonzero += 1;
    }
    parts[first_nonzero..].join(&opts.digit_delimiter)
}

/// Rule-8 datetime decoding: 3- or 6-register layouts only, no calendar
/// validation, output `"YY/MM/DD HH:MM:SS"`.
pub fn convert_datetime(registers: &[u16]) -> Option<String> {
    let (year, month, day, hour, minute, second) = match registers.len() {
        3 => (
            registers[0] >> 8,
            registers[0] & 0xFF,
            registers[1] >> 8,
            registers[1] & 0xFF,
            registers[2] >> 8,
            registers[2] & 0xFF,
        ),
        6 => (
            registers[0], registers[1], registers[2], registers[3], registers[4], registers[5],
        ),
        _ => return None,
    };

    Some(format!(
        "{year:02}/{month:02}/{day:02} {hour:02}:{minute:02}:{second:02}"
    ))
}

/// Rule-9 string form: `"HH:MM"`, no validity check.
pub fn convert_time_string(registers: &[u16]) -> Option<String> {
    let raw = *registers.first()?;
    let hours = raw / 100;
    let minutes = raw % 100;
    Some(format!("{hours:02}:{minutes:02}"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMatch<'a> {
    Matched(&'a str),
    NoMatch,
}

/// Walk lookup entries in declared order; `default` is consulted only
/// after every other entry fails to match.
pub fn resolve_lookup<'a>(lookup: &'a [crate::profile::model::LookupEntry], raw_value: i64) -> Option<&'a str> {
    let mut default_value = None;
    for entry in lookup {
        match &entry.key {
            LookupKey::Single(k) if *k == raw_value => return Some(&entry.value),
            LookupKey::Multiple(set) if set.contains(&raw_value) => return Some(&entry.value),
            LookupKey::Bit(p) if (*p as u32) < 64 && (raw_value >> p) & 1 == 1 => return Some(&entry.value),
            LookupKey::Default => default_value = Some(entry.value.as_str()),
            _ => {}
        }
    }
    default_value
}

/// Decode a composite (aggregated) sensor: each sub-sensor's registers
/// decode to a signed/unsigned integer value per its own `signed` flag,
/// scaled and offset, then combined via its `operator` into a running
/// accumulator seeded by the first sub-sensor's value.
pub fn convert_composite(
    registers: &std::collections::HashMap<u16, u16>,
    sensors: &[crate::profile::model::CompositeSensor],
) -> Option<f64> {
    let mut values = Vec::with_capacity(sensors.len());
    for sensor in sensors {
        let mut raw_regs = Vec::with_capacity(sensor.registers.len());
        for addr in &sensor.registers {
            raw_regs.push(*registers.get(addr)?);
        }
        let raw = match raw_regs.len() {
            1 => decode_16(raw_regs[0], sensor.signed, false),
            2 => decode_32(raw_regs[0], raw_regs[1], sensor.signed, false),
            _ => return None,
        };
        values.push((raw - sensor.offset) * sensor.scale);
        let _ = &sensor.operator;
    }

    let mut iter = sensors.iter().zip(values.iter());
    let (_, &seed) = iter.next()?;
    let mut acc = seed;
    for (sensor, &value) in iter {
        acc = match sensor.operator {
            CompositeOperator::Add => acc + value,
            CompositeOperator::Subtract => acc - value,
            CompositeOperator::Multiply => acc * value,
            CompositeOperator::Divide if value != 0.0 => acc / value,
            CompositeOperator::Divide => acc,
        };
    }
    Some(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::model::{Platform, Rule, VersionOptions};

    fn item(rule: Rule, registers: Vec<u16>) -> SensorItem {
        SensorItem {
            name: "test".to_string(),
            normalized_id: "test".to_string(),
            registers,
            rule,
            platform: Platform::Sensor,
            class: None,
            state_class: None,
            uom: None,
            icon: None,
            scale: 1.0,
            offset: 0.0,
            signed: false,
            inverse: false,
            magnitude: false,
            mask: None,
            divide: None,
            bit: None,
            range_min: None,
            range_max: None,
            range_default: None,
            validation_min: None,
            validation_max: None,
            lookup: vec![],
            sensors: vec![],
            options: vec![],
            version: VersionOptions::default(),
            attribute: false,
            attributes: vec![],
            description: None,
            update_interval: None,
        }
    }

    #[test]
    fn identity_at_defaults_for_u16() {
        let it = item(Rule::U16, vec![1]);
        assert_eq!(convert_numeric(&[1234], &it).unwrap(), 1234.0);
    }

    #[test]
    fn sign_magnitude_16_round_trip() {
        assert_eq!(sign_magnitude_16(0x8001), -1);
        assert_eq!(sign_magnitude_16(0xFFFF), -32767);
        assert_eq!(sign_magnitude_16(0x7FFF), 32767);
        assert_eq!(sign_magnitude_16(0x0000), 0);
    }

    #[test]
    fn u32_boundary_values() {
        let mut it = item(Rule::U32, vec![1, 2]);
        assert_eq!(convert_numeric(&[0xFFFF, 0xFFFF], &it).unwrap(), 4_294_967_295.0);
        it.signed = true;
        assert_eq!(convert_numeric(&[0xFFFF, 0xFFFF], &it).unwrap(), -1.0);
    }

    #[test]
    fn i16_two_complement_boundary() {
        let it = item(Rule::I16, vec![1]);
        assert_eq!(convert_numeric(&[0x8000], &it).unwrap(), -32768.0);

        let mut magnitude_item = item(Rule::I16, vec![1]);
        magnitude_item.magnitude = true;
        assert_eq!(convert_numeric(&[0xFFFF], &magnitude_item).unwrap(), -32767.0);
    }

    #[test]
    fn raw_range_with_offset_and_scale() {
        let mut it = item(Rule::U16, vec![1]);
        it.range_min = Some(900.0);
        it.range_max = Some(1500.0);
        it.offset = 1000.0;
        it.scale = 0.1;
        assert_eq!(convert_numeric(&[1259], &it).unwrap(), 25.9);
    }

    #[test]
    fn raw_out_of_range_without_default_errors() {
        let mut it = item(Rule::U16, vec![1]);
        it.range_min = Some(900.0);
        it.range_max = Some(1500.0);
        let err = convert_numeric(&[1600], &it).unwrap_err();
        assert!(matches!(err, SensorError::RawValueOutOfRange { .. }));
    }

    #[test]
    fn raw_out_of_range_with_default_substitutes_and_continues() {
        let mut it = item(Rule::U16, vec![1]);
        it.range_min = Some(900.0);
        it.range_max = Some(1500.0);
        it.range_default = Some(1000.0);
        it.scale = 0.1;
        assert_eq!(convert_numeric(&[1600], &it).unwrap(), 100.0);
    }

    #[test]
    fn mask_and_bit_are_applied_before_affine_transform() {
        let mut it = item(Rule::U16, vec![1]);
        it.bit = Some(1);
        it.scale = 100.0;
        // bit(raw, 1) is 0 or 1 regardless of scale/offset.
        assert_eq!(convert_numeric(&[0b10], &it).unwrap(), 100.0);
        assert_eq!(convert_numeric(&[0b01], &it).unwrap(), 0.0);
    }

    #[test]
    fn divide_truncates_toward_zero_before_widening() {
        let mut it = item(Rule::I16, vec![1]);
        it.divide = Some(3);
        // -7 / 3 truncated toward zero is -2, not -3 (floor).
        assert_eq!(convert_numeric(&[(-7i16) as u16], &it).unwrap(), -2.0);
    }

    #[test]
    fn post_transform_validation_rejects_out_of_window_values() {
        let mut it = item(Rule::U16, vec![1]);
        it.validation_min = Some(0.0);
        it.validation_max = Some(100.0);
        let err = convert_numeric(&[150], &it).unwrap_err();
        assert!(matches!(err, SensorError::ValueOutOfRange { .. }));
    }

    #[test]
    fn insufficient_registers_for_u32() {
        let it = item(Rule::U32, vec![1, 2]);
        let err = convert_numeric(&[1], &it).unwrap_err();
        assert_eq!(err, SensorError::InsufficientRegisters { expected: 2, got: 1 });
    }

    #[test]
    fn computed_and_raw_rules_are_unsupported_numerically() {
        let it = item(Rule::Computed, vec![]);
        assert!(matches!(
            convert_numeric(&[], &it),
            Err(SensorError::UnsupportedRule { rule: 0 })
        ));
    }

    #[test]
    fn time_rule_returns_total_minutes() {
        let it = item(Rule::Time, vec![1]);
        // 14:30 encoded as 1430.
        assert_eq!(convert_numeric(&[1430], &it).unwrap(), 14.0 * 60.0 + 30.0);
    }

    #[test]
    fn string_decoding_stops_at_first_zero_byte() {
        let regs = [0x4142, 0x4300]; // "ABC\0"
        assert_eq!(convert_string(&regs).unwrap(), "ABC");
    }

    #[test]
    fn string_decoding_rejects_control_characters() {
        let regs = [0x4109]; // 'A', TAB
        let err = convert_string(&regs).unwrap_err();
        assert!(matches!(err, SensorError::ControlCharacter { scalar: 0x09 }));
    }

    #[test]
    fn string_decoding_rejects_del_and_c1() {
        assert!(matches!(
            convert_string(&[0x417F]).unwrap_err(),
            SensorError::ControlCharacter { scalar: 0x7F }
        ));
        assert!(matches!(
            convert_string(&[0x4185]).unwrap_err(),
            SensorError::ControlCharacter { scalar: 0x85 }
        ));
    }

    #[test]
    fn version_decoding_examples_from_spec() {
        let it = item(Rule::Version, vec![1]);
        assert_eq!(convert_version(&[0x1234], &it), "1.2.3.4");
        assert_eq!(convert_version(&[0x0012], &it), "1.2");

        let two_regs = item(Rule::Version, vec![1, 2]);
        assert_eq!(convert_version(&[0x0102, 0x0304], &two_regs), "1.0.2-0.3.0.4");

        let three_regs = vec![0x0206u16, 0x0115, 0x0108];
        let empty_delim_item = {
            let mut i = item(Rule::Version, vec![1, 2, 3]);
            i.version.digit_delimiter = "".to_string();
            i
        };
        assert_eq!(convert_version(&three_regs, &empty_delim_item), "0206-0115-0108");
    }

    #[test]
    fn datetime_3_and_6_register_forms_agree() {
        let three = [((2024u16 % 100) << 8) | 12, (14u16 << 8) | 15, (30u16 << 8) | 45];
        let six = [24u16, 12, 14, 15, 30, 45];
        assert_eq!(convert_datetime(&three), convert_datetime(&six));
        assert_eq!(convert_datetime(&three).unwrap(), "24/12/14 15:30:45");
    }

    #[test]
    fn datetime_invalid_register_count_is_absent() {
        assert_eq!(convert_datetime(&[1, 2]), None);
    }

    #[test]
    fn time_string_form_zero_pads() {
        assert_eq!(convert_time_string(&[930]), Some("09:30".to_string()));
    }

    #[test]
    fn lookup_resolution_order_and_default_fallback() {
        use crate::profile::model::LookupEntry;
        let lookup = vec![
            LookupEntry { key: LookupKey::Single(1), value: "one".to_string() },
            LookupEntry { key: LookupKey::Multiple(vec![2, 3]), value: "two_or_three".to_string() },
            LookupEntry { key: LookupKey::Default, value: "other".to_string() },
        ];
        assert_eq!(resolve_lookup(&lookup, 1), Some("one"));
        assert_eq!(resolve_lookup(&lookup, 3), Some("two_or_three"));
        assert_eq!(resolve_lookup(&lookup, 99), Some("other"));
    }

    #[test]
    fn lookup_bit_flags_alarm_example() {
        use crate::profile::model::LookupEntry;
        let lookup = vec![
            LookupEntry { key: LookupKey::Bit(1), value: "Fan failure".to_string() },
            LookupEntry { key: LookupKey::Bit(2), value: "Grid phase failure".to_string() },
        ];
        assert_eq!(resolve_lookup(&lookup, 0x0006), Some("Fan failure"));
        assert_eq!(resolve_lookup(&lookup, 0x0000), None);
    }

    #[test]
    fn composite_sum_of_two_registers() {
        use crate::profile::model::CompositeSensor;
        let mut regs = std::collections::HashMap::new();
        regs.insert(10u16, 100u16);
        regs.insert(11u16, 200u16);
        let sensors = vec![
            CompositeSensor { registers: vec![10], scale: 1.0, offset: 0.0, signed: false, operator: CompositeOperator::Add },
            CompositeSensor { registers: vec![11], scale: 1.0, offset: 0.0, signed: false, operator: CompositeOperator::Add },
        ];
        assert_eq!(convert_composite(&regs, &sensors), Some(300.0));
    }
}
