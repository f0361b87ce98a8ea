//! Assembles a [`SolarStatus`] from a decoded register map, a profile, and
//! the set of requested subsystem groups (spec §4.4). Grounded on
//! `config.rs`'s accessor-method style: small, named helper functions over
//! a borrowed struct rather than a trait-object visitor.

use std::collections::HashMap;

use chrono::{NaiveDateTime, TimeZone, Utc};

use crate::convert;
use crate::key::{self, SensorKey, SensorValues};
use crate::profile::model::{InverterDefinition, Rule, SensorItem};
use crate::status::model::*;

use super::upstream_groups;

struct RawSensor<'a> {
    item: &'a SensorItem,
    registers: Vec<u16>,
}

/// A subsystem's own view of the collected register map: numeric values,
/// string-decoded values, and the raw register slice behind each collected
/// item (needed for bit-flag and lookup-label decoding, which bypass the
/// normal affine-transform pipeline).
struct Collected<'a> {
    numeric: SensorValues,
    strings: HashMap<String, String>,
    raw: HashMap<String, RawSensor<'a>>,
    /// Sensors whose registers were present but whose decode failed (spec
    /// §7): the item is silently absent from `numeric`/`strings`, but the
    /// count survives for observability.
    errors_absorbed: usize,
}

fn collect<'a>(
    profile: &'a InverterDefinition,
    group_names: &[&str],
    register_map: &HashMap<u16, u16>,
) -> Collected<'a> {
    let mut numeric = SensorValues::new();
    let mut strings: HashMap<String, String> = HashMap::new();
    let mut raw: HashMap<String, RawSensor> = HashMap::new();
    let mut errors_absorbed = 0usize;

    for item in profile.items_in_groups(group_names) {
        if item.is_placeholder() {
            continue;
        }

        if !item.sensors.is_empty() {
            if let Some(value) = convert::convert_composite(register_map, &item.sensors) {
                numeric.entry(item.normalized_id.clone()).or_insert(value);
            }
            continue;
        }

        if item.is_computed() {
            continue;
        }

        let mut registers = Vec::with_capacity(item.registers.len());
        let mut complete = true;
        for addr in &item.registers {
            match register_map.get(addr) {
                Some(v) => registers.push(*v),
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            continue;
        }

        raw.entry(item.normalized_id.clone())
            .or_insert_with(|| RawSensor { item, registers: registers.clone() });

        if item.rule.is_numeric() {
            match convert::convert_numeric(&registers, item) {
                Ok(value) => {
                    numeric.entry(item.normalized_id.clone()).or_insert(value);
                }
                Err(_) => errors_absorbed += 1,
            }
            continue;
        }

        match item.rule {
            Rule::Ascii => match convert::convert_string(&registers) {
                Ok(s) => {
                    strings.entry(item.normalized_id.clone()).or_insert(s);
                }
                Err(_) => errors_absorbed += 1,
            },
            Rule::Version => {
                strings
                    .entry(item.normalized_id.clone())
                    .or_insert_with(|| convert::convert_version(&registers, item));
            }
            Rule::Datetime => match convert::convert_datetime(&registers) {
                Some(s) => {
                    strings.entry(item.normalized_id.clone()).or_insert(s);
                }
                None => errors_absorbed += 1,
            },
            _ => {}
        }
    }

    Collected { numeric, strings, raw, errors_absorbed }
}

fn raw_for<'a, 'b>(raw: &'b HashMap<String, RawSensor<'a>>, key: &SensorKey) -> Option<&'b RawSensor<'a>> {
    if let Some(r) = raw.get(key.primary) {
        return Some(r);
    }
    for alt in key.alternatives {
        if let Some(r) = raw.get(*alt) {
            return Some(r);
        }
    }
    None
}

fn combine_le(registers: &[u16]) -> u64 {
    registers
        .iter()
        .enumerate()
        .fold(0u64, |acc, (i, &r)| acc | ((r as u64) << (16 * i.min(3))))
}

/// Resolve a lookup-table label for the sensor bound to `key`, by combining
/// its raw registers and matching against its own lookup entries.
fn lookup_label(raw: &HashMap<String, RawSensor>, key: &SensorKey) -> Option<String> {
    let sensor = raw_for(raw, key)?;
    if sensor.item.lookup.is_empty() {
        return None;
    }
    let combined = combine_le(&sensor.registers) as i64;
    convert::resolve_lookup(&sensor.item.lookup, combined).map(|s| s.to_string())
}

/// Every set bit in the combined raw register value that has a matching
/// `bit(p)` lookup entry becomes one flag (spec §4.4, scenario 5).
fn decode_bit_flags(raw: &HashMap<String, RawSensor>, key: &SensorKey) -> Vec<AlarmFlag> {
    let sensor = match raw_for(raw, key) {
        Some(s) => s,
        None => return Vec::new(),
    };
    let combined = combine_le(&sensor.registers);

    let mut flags = Vec::new();
    for entry in &sensor.item.lookup {
        if let crate::profile::model::LookupKey::Bit(bit) = entry.key {
            if (bit as u32) < 64 && (combined >> bit) & 1 == 1 {
                flags.push(AlarmFlag { bit, description: entry.value.clone() });
            }
        }
    }
    flags.sort_by_key(|f| f.bit);
    flags
}

pub fn build_status(
    register_map: &HashMap<u16, u16>,
    profile: &InverterDefinition,
    subsystems: &[&str],
) -> (SolarStatus, usize) {
    let wants = |name: &str| subsystems.iter().any(|s| *s == name);
    let mut errors_absorbed = 0usize;

    let mut collect_for = |group: &str| {
        let c = collect(profile, upstream_groups(group), register_map);
        errors_absorbed += c.errors_absorbed;
        c
    };

    let battery = if wants("battery") { build_battery(&collect_for("battery")) } else { None };
    let grid = if wants("grid") { build_grid(&collect_for("grid")) } else { None };
    let pv = if wants("pv") { build_pv(&collect_for("pv")) } else { None };
    let load = if wants("load") { build_load(&collect_for("load")) } else { None };
    let inverter = if wants("inverter") { build_inverter(&collect_for("inverter")) } else { None };
    let generator = if wants("generator") { build_generator(&collect_for("generator")) } else { None };
    let ups = if wants("ups") { build_ups(&collect_for("ups")) } else { None };
    let bms = if wants("bms") { build_bms(&collect_for("bms")) } else { Vec::new() };
    let time_of_use =
        if wants("time_of_use") { build_time_of_use(&collect_for("time_of_use")) } else { Vec::new() };

    let status = SolarStatus {
        timestamp: Utc::now(),
        battery,
        grid,
        pv,
        load,
        inverter,
        generator,
        ups,
        bms,
        time_of_use,
    };

    (status, errors_absorbed)
}

fn build_battery(c: &Collected) -> Option<BatteryStatus> {
    let soc = key::battery::SOC.lookup(&c.numeric)?;
    let voltage = key::battery::VOLTAGE.lookup(&c.numeric)?;
    let power = key::battery::POWER.lookup(&c.numeric)?;

    let current = match key::battery::CURRENT.lookup(&c.numeric) {
        Some(v) => v,
        None if voltage > 0.0 => power / voltage,
        None => 0.0,
    };

    Some(BatteryStatus {
        soc: soc.round() as i64,
        voltage,
        power: power.round() as i64,
        current,
        temperature: key::battery::TEMPERATURE.lookup(&c.numeric),
        soh: key::battery::SOH.lookup(&c.numeric),
        daily_charge: key::battery::DAILY_CHARGE.lookup(&c.numeric),
        daily_discharge: key::battery::DAILY_DISCHARGE.lookup(&c.numeric),
        total_charge: key::battery::TOTAL_CHARGE.lookup(&c.numeric),
        total_discharge: key::battery::TOTAL_DISCHARGE.lookup(&c.numeric),
    })
}

fn build_grid(c: &Collected) -> Option<GridStatus> {
    let power = key::grid::TOTAL_POWER.lookup(&c.numeric)?;

    let mut phases = Vec::new();
    for phase in 1..=3u8 {
        let voltage = key::grid::phase_voltage(phase).lookup(&c.numeric);
        let current = key::grid::phase_current(phase).lookup(&c.numeric);
        let phase_power = key::grid::phase_power(phase).lookup(&c.numeric);
        if voltage.is_some() || current.is_some() || phase_power.is_some() {
            phases.push(PhaseReading { phase, voltage, current, power: phase_power });
        }
    }

    let (voltage, current) = if phases.is_empty() {
        (key::grid::VOLTAGE.lookup(&c.numeric), key::grid::CURRENT.lookup(&c.numeric))
    } else {
        (None, None)
    };

    let ct_phases: Vec<PhaseReading> = (1..=3u8)
        .filter_map(|phase| {
            let ct_power = key::grid::ct_phase_power(phase).lookup(&c.numeric);
            let ct_current = key::grid::ct_phase_current(phase).lookup(&c.numeric);
            if ct_power.is_some() || ct_current.is_some() {
                Some(PhaseReading { phase, voltage: None, current: ct_current, power: ct_power })
            } else {
                None
            }
        })
        .collect();

    let ct_total = key::grid::CT_TOTAL_POWER.lookup(&c.numeric);
    let external_ct = if ct_total.is_some() || !ct_phases.is_empty() {
        let total_power = ct_total.unwrap_or_else(|| ct_phases.iter().filter_map(|p| p.power).sum());
        Some(ExternalCt { total_power, phases: ct_phases })
    } else {
        None
    };

    Some(GridStatus {
        power: power.round() as i64,
        voltage,
        current,
        phases,
        frequency: key::grid::FREQUENCY.lookup(&c.numeric),
        power_factor: key::grid::POWER_FACTOR.lookup(&c.numeric),
        daily_import: key::grid::DAILY_IMPORT.lookup(&c.numeric),
        daily_export: key::grid::DAILY_EXPORT.lookup(&c.numeric),
        total_import: key::grid::TOTAL_IMPORT.lookup(&c.numeric),
        total_export: key::grid::TOTAL_EXPORT.lookup(&c.numeric),
        external_ct,
    })
}

fn build_pv(c: &Collected) -> Option<PvStatus> {
    let mut strings = Vec::new();
    for n in 1..=4u8 {
        let power = match key::pv::string_power(n).lookup(&c.numeric) {
            Some(p) => p,
            None => continue,
        };
        let voltage = key::pv::string_voltage(n).lookup(&c.numeric).unwrap_or(0.0);
        let current = match key::pv::string_current(n).lookup(&c.numeric) {
            Some(v) => v,
            None if voltage > 0.0 => power / voltage,
            None => 0.0,
        };
        strings.push(PvString { id: n, voltage, current, power: power.round() as i64 });
    }

    let direct_total = key::pv::TOTAL_POWER.lookup(&c.numeric);
    if direct_total.is_none() && strings.is_empty() {
        return None;
    }
    let total_power = direct_total.unwrap_or_else(|| strings.iter().map(|s| s.power as f64).sum());

    Some(PvStatus {
        total_power: total_power.round() as i64,
        strings,
        daily_production: key::pv::DAILY_PRODUCTION.lookup(&c.numeric),
        total_production: key::pv::TOTAL_PRODUCTION.lookup(&c.numeric),
    })
}

fn build_load(c: &Collected) -> Option<LoadStatus> {
    let power = key::load::TOTAL_POWER.lookup(&c.numeric)?;

    let phases: Vec<LoadPhase> = (1..=3u8)
        .filter_map(|phase| {
            key::load::phase_power(phase).lookup(&c.numeric).map(|power| LoadPhase { phase, power })
        })
        .collect();

    Some(LoadStatus {
        power: power.round() as i64,
        phases,
        frequency: key::load::FREQUENCY.lookup(&c.numeric),
        daily_consumption: key::load::DAILY_CONSUMPTION.lookup(&c.numeric),
        total_consumption: key::load::TOTAL_CONSUMPTION.lookup(&c.numeric),
    })
}

fn classify_state(label: &str) -> InverterState {
    let label = label.to_lowercase();
    const STANDBY: &[&str] = &["standby", "stand-by", "waiting"];
    const RUNNING: &[&str] = &[
        "running", "normal", "generating", "on-grid", "charging", "discharging",
        "charging check", "discharging check", "emergency power supply",
    ];
    const FAULT: &[&str] =
        &["fault", "alarm", "error", "failure", "permanent fault", "recoverable fault"];

    if STANDBY.contains(&label.as_str()) {
        InverterState::Standby
    } else if RUNNING.contains(&label.as_str()) {
        InverterState::Running
    } else if FAULT.contains(&label.as_str()) {
        InverterState::Fault
    } else {
        InverterState::Unknown
    }
}

fn build_inverter(c: &Collected) -> Option<InverterStatus> {
    let serial_number = key::inverter::SERIAL_NUMBER
        .lookup_str(&c.strings)
        .map(String::from)
        .or_else(|| lookup_label(&c.raw, &key::inverter::SERIAL_NUMBER));

    let model = key::inverter::MODEL
        .lookup_str(&c.strings)
        .map(String::from)
        .or_else(|| lookup_label(&c.raw, &key::inverter::MODEL));

    let firmware_version = key::inverter::FIRMWARE_VERSION
        .lookup_str(&c.strings)
        .map(String::from)
        .or_else(|| lookup_label(&c.raw, &key::inverter::FIRMWARE_VERSION));

    if serial_number.is_none() && model.is_none() && firmware_version.is_none() && c.numeric.is_empty() {
        return None;
    }

    let state = lookup_label(&c.raw, &key::inverter::STATE).map(|label| classify_state(&label));
    let alarms = decode_bit_flags(&c.raw, &key::inverter::ALARM);
    let faults = decode_bit_flags(&c.raw, &key::inverter::FAULT);

    let device_time = key::inverter::TIME.lookup_str(&c.strings).and_then(|s| {
        NaiveDateTime::parse_from_str(s, "%y/%m/%d %H:%M:%S")
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive))
    });

    Some(InverterStatus { serial_number, model, firmware_version, state, alarms, faults, device_time })
}

fn build_generator(c: &Collected) -> Option<GeneratorStatus> {
    let power = key::generator::TOTAL_POWER.lookup(&c.numeric)?;
    let power = power.abs().round() as i64;
    Some(GeneratorStatus { power, is_running: power != 0 })
}

fn build_ups(c: &Collected) -> Option<UpsStatus> {
    let power = key::ups::TOTAL_POWER.lookup(&c.numeric)?;

    let phases: Vec<LoadPhase> = (1..=3u8)
        .filter_map(|phase| {
            key::ups::phase_power(phase).lookup(&c.numeric).map(|power| LoadPhase { phase, power })
        })
        .collect();

    let mode = lookup_label(&c.raw, &key::inverter::STATE).and_then(|label| {
        let label = label.to_lowercase();
        if ["emergency power supply", "eps", "off-grid", "discharging"].contains(&label.as_str()) {
            Some(UpsMode::Battery)
        } else if [
            "on-grid", "normal", "running", "standby", "stand-by", "waiting", "charging",
            "charging check",
        ]
        .contains(&label.as_str())
        {
            Some(UpsMode::Standby)
        } else if label == "bypass" {
            Some(UpsMode::Bypass)
        } else {
            None
        }
    });

    Some(UpsStatus { power: power.round() as i64, phases, mode })
}

fn build_bms_unit(c: &Collected, prefix: &str) -> Option<BmsUnit> {
    let soc = key::bms::soc(prefix).lookup(&c.numeric)?;
    let voltage = key::bms::voltage(prefix).lookup(&c.numeric)?;
    let current = key::bms::current(prefix).lookup(&c.numeric).unwrap_or(0.0);

    let cell_min = key::bms::cell_voltage_min(prefix).lookup(&c.numeric);
    let cell_max = key::bms::cell_voltage_max(prefix).lookup(&c.numeric);
    let voltage_delta_mv = match (cell_min, cell_max) {
        (Some(min), Some(max)) => Some(((max - min) * 1000.0).max(0.0).round()),
        _ => None,
    };

    let cell_count = key::bms::cell_count(prefix).lookup(&c.numeric).map(|v| v as u32).unwrap_or(16);

    Some(BmsUnit {
        unit: prefix.to_string(),
        soc,
        voltage,
        current,
        cell_voltage_min: cell_min,
        cell_voltage_max: cell_max,
        voltage_delta_mv,
        cell_count,
    })
}

fn build_bms(c: &Collected) -> Vec<BmsUnit> {
    let mut units = Vec::new();
    for n in 1..=2 {
        if let Some(unit) = build_bms_unit(c, key::bms::unit_group(n)) {
            units.push(unit);
        }
    }
    if units.is_empty() {
        if let Some(unit) = build_bms_unit(c, "battery_bms") {
            units.push(unit);
        }
    }
    units
}

fn build_time_of_use_slot(c: &Collected, slot: u8) -> Option<TimeOfUseSlot> {
    let time_minutes = key::tou::time(slot).lookup(&c.numeric)?;

    let grid_charge_flag = key::tou::grid_charge_flag(slot).lookup(&c.numeric);
    let mode = match grid_charge_flag {
        Some(flag) if flag > 0.0 => Some(TimeOfUseMode::GridCharge),
        Some(_) => Some(TimeOfUseMode::SelfConsumption),
        None => None,
    };

    Some(TimeOfUseSlot {
        slot,
        time_minutes,
        is_enabled: grid_charge_flag.map(|f| f > 0.0).unwrap_or(true),
        mode,
        target_soc: key::tou::target_soc(slot).lookup(&c.numeric),
        charge_power: key::tou::charge_power(slot).lookup(&c.numeric),
        charge_voltage: key::tou::charge_voltage(slot).lookup(&c.numeric),
        weekdays: key::tou::weekdays(slot).lookup(&c.numeric).map(|v| WeeklySchedule(v as u8)),
    })
}

fn build_time_of_use(c: &Collected) -> Vec<TimeOfUseSlot> {
    (1..=6u8).filter_map(|slot| build_time_of_use_slot(c, slot)).collect()
}
