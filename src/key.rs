//! Canonical sensor keys: the decoupling layer between heterogeneous
//! upstream (vendor) sensor naming and the uniform status model.
//!
//! Each domain-model slot is bound to one primary key plus an ordered list
//! of alternative keys. Lookup tries the primary first, then each
//! alternative in declared order; the first present value wins. This is a
//! plain value type, not a global registry — see spec.md §9's explicit
//! recommendation — grouped into subsystem modules below (`battery::SOC`,
//! `grid::TOTAL_POWER`, ...).

use std::collections::HashMap;

/// `normalized_id -> decoded value` map produced by the status builder's
/// value-extraction pass (spec.md §4.4).
pub type SensorValues = HashMap<String, f64>;

#[derive(Debug, Clone, Copy)]
pub struct SensorKey {
    pub primary: &'static str,
    pub alternatives: &'static [&'static str],
}

impl SensorKey {
    pub const fn new(primary: &'static str, alternatives: &'static [&'static str]) -> Self {
        Self { primary, alternatives }
    }

    /// Resolve primary first, then each alternative in order; first present wins.
    pub fn lookup(&self, values: &SensorValues) -> Option<f64> {
        if let Some(v) = values.get(self.primary) {
            return Some(*v);
        }
        for alt in self.alternatives {
            if let Some(v) = values.get(*alt) {
                return Some(*v);
            }
        }
        None
    }

    /// Like [`lookup`](Self::lookup) but for a string-valued map (serial
    /// numbers, firmware versions, device-time strings).
    pub fn lookup_str<'a>(&self, values: &'a HashMap<String, String>) -> Option<&'a str> {
        if let Some(v) = values.get(self.primary) {
            return Some(v.as_str());
        }
        for alt in self.alternatives {
            if let Some(v) = values.get(*alt) {
                return Some(v.as_str());
            }
        }
        None
    }
}

pub mod battery {
    use super::SensorKey;

    pub const SOC: SensorKey = SensorKey::new("battery_soc", &["battery"]);
    pub const VOLTAGE: SensorKey = SensorKey::new("battery_voltage", &[]);
    pub const POWER: SensorKey = SensorKey::new("battery_power", &[]);
    pub const CURRENT: SensorKey = SensorKey::new("battery_current", &[]);
    pub const TEMPERATURE: SensorKey = SensorKey::new("battery_temperature", &[]);
    pub const SOH: SensorKey = SensorKey::new("battery_soh", &[]);
    pub const DAILY_CHARGE: SensorKey = SensorKey::new("battery_daily_charge", &[]);
    pub const DAILY_DISCHARGE: SensorKey = SensorKey::new("battery_daily_discharge", &[]);
    pub const TOTAL_CHARGE: SensorKey = SensorKey::new("battery_total_charge", &[]);
    pub const TOTAL_DISCHARGE: SensorKey = SensorKey::new("battery_total_discharge", &[]);
}

pub mod grid {
    use super::SensorKey;

    pub const TOTAL_POWER: SensorKey = SensorKey::new("grid_power", &["grid_total_power"]);
    pub const VOLTAGE: SensorKey = SensorKey::new("grid_voltage", &[]);
    pub const CURRENT: SensorKey = SensorKey::new("grid_current", &[]);
    pub const FREQUENCY: SensorKey = SensorKey::new("grid_frequency", &[]);
    pub const POWER_FACTOR: SensorKey = SensorKey::new("grid_power_factor", &[]);
    pub const DAILY_IMPORT: SensorKey = SensorKey::new("grid_daily_import", &[]);
    pub const DAILY_EXPORT: SensorKey = SensorKey::new("grid_daily_export", &[]);
    pub const TOTAL_IMPORT: SensorKey = SensorKey::new("grid_total_import", &[]);
    pub const TOTAL_EXPORT: SensorKey = SensorKey::new("grid_total_export", &[]);

    pub fn phase_voltage(phase: u8) -> SensorKey {
        match phase {
            1 => SensorKey::new("grid_l1_voltage", &[]),
            2 => SensorKey::new("grid_l2_voltage", &[]),
            _ => SensorKey::new("grid_l3_voltage", &[]),
        }
    }
    pub fn phase_current(phase: u8) -> SensorKey {
        match phase {
            1 => SensorKey::new("grid_l1_current", &[]),
            2 => SensorKey::new("grid_l2_current", &[]),
            _ => SensorKey::new("grid_l3_current", &[]),
        }
    }
    pub fn phase_power(phase: u8) -> SensorKey {
        match phase {
            1 => SensorKey::new("grid_l1_power", &[]),
            2 => SensorKey::new("grid_l2_power", &[]),
            _ => SensorKey::new("grid_l3_power", &[]),
        }
    }

    pub const CT_TOTAL_POWER: SensorKey = SensorKey::new("ct_total_power", &[]);
    pub fn ct_phase_power(phase: u8) -> SensorKey {
        match phase {
            1 => SensorKey::new("ct_l1_power", &[]),
            2 => SensorKey::new("ct_l2_power", &[]),
            _ => SensorKey::new("ct_l3_power", &[]),
        }
    }
    pub fn ct_phase_current(phase: u8) -> SensorKey {
        match phase {
            1 => SensorKey::new("ct_l1_current", &[]),
            2 => SensorKey::new("ct_l2_current", &[]),
            _ => SensorKey::new("ct_l3_current", &[]),
        }
    }
}

pub mod pv {
    use super::SensorKey;

    pub const TOTAL_POWER: SensorKey = SensorKey::new("total_pv_power", &[]);
    pub const DAILY_PRODUCTION: SensorKey = SensorKey::new("pv_daily_production", &[]);
    pub const TOTAL_PRODUCTION: SensorKey = SensorKey::new("pv_total_production", &[]);

    pub fn string_power(n: u8) -> SensorKey {
        match n {
            1 => SensorKey::new("pv1_power", &[]),
            2 => SensorKey::new("pv2_power", &[]),
            3 => SensorKey::new("pv3_power", &[]),
            _ => SensorKey::new("pv4_power", &[]),
        }
    }
    pub fn string_voltage(n: u8) -> SensorKey {
        match n {
            1 => SensorKey::new("pv1_voltage", &[]),
            2 => SensorKey::new("pv2_voltage", &[]),
            3 => SensorKey::new("pv3_voltage", &[]),
            _ => SensorKey::new("pv4_voltage", &[]),
        }
    }
    pub fn string_current(n: u8) -> SensorKey {
        match n {
            1 => SensorKey::new("pv1_current", &[]),
            2 => SensorKey::new("pv2_current", &[]),
            3 => SensorKey::new("pv3_current", &[]),
            _ => SensorKey::new("pv4_current", &[]),
        }
    }
}

pub mod load {
    use super::SensorKey;

    pub const TOTAL_POWER: SensorKey = SensorKey::new("load_power", &["load_total_power"]);
    pub const FREQUENCY: SensorKey = SensorKey::new("load_frequency", &[]);
    pub const DAILY_CONSUMPTION: SensorKey = SensorKey::new("load_daily_consumption", &[]);
    pub const TOTAL_CONSUMPTION: SensorKey = SensorKey::new("load_total_consumption", &[]);

    pub fn phase_power(phase: u8) -> SensorKey {
        match phase {
            1 => SensorKey::new("load_l1_power", &[]),
            2 => SensorKey::new("load_l2_power", &[]),
            _ => SensorKey::new("load_l3_power", &[]),
        }
    }
}

pub mod inverter {
    use super::SensorKey;

    pub const SERIAL_NUMBER: SensorKey = SensorKey::new("device_serial_number", &[]);
    pub const MODEL: SensorKey = SensorKey::new("device_model", &["device"]);
    pub const FIRMWARE_VERSION: SensorKey = SensorKey::new("device_firmware_version", &[]);
    pub const STATE: SensorKey = SensorKey::new("device_state", &[]);
    pub const ALARM: SensorKey = SensorKey::new("device_alarm", &[]);
    pub const FAULT: SensorKey = SensorKey::new("device_fault", &[]);
    pub const TIME: SensorKey = SensorKey::new("device_time", &[]);
}

pub mod generator {
    use super::SensorKey;

    pub const TOTAL_POWER: SensorKey = SensorKey::new("generator_power", &["generator_total_power"]);
}

pub mod ups {
    use super::SensorKey;

    pub const TOTAL_POWER: SensorKey = SensorKey::new("ups_power", &["ups_total_power"]);

    pub fn phase_power(phase: u8) -> SensorKey {
        match phase {
            1 => SensorKey::new("ups_l1_power", &[]),
            2 => SensorKey::new("ups_l2_power", &[]),
            _ => SensorKey::new("ups_l3_power", &[]),
        }
    }
}

pub mod bms {
    use super::SensorKey;

    pub fn unit_group(n: u8) -> &'static str {
        match n {
            1 => "battery_1",
            2 => "battery_2",
            _ => "battery_bms",
        }
    }

    pub fn soc(prefix: &str) -> SensorKey {
        match prefix {
            "battery_1" => SensorKey::new("battery_1_soc", &[]),
            "battery_2" => SensorKey::new("battery_2_soc", &[]),
            _ => SensorKey::new("battery_bms_soc", &[]),
        }
    }
    pub fn voltage(prefix: &str) -> SensorKey {
        match prefix {
            "battery_1" => SensorKey::new("battery_1_voltage", &[]),
            "battery_2" => SensorKey::new("battery_2_voltage", &[]),
            _ => SensorKey::new("battery_bms_voltage", &[]),
        }
    }
    pub fn current(prefix: &str) -> SensorKey {
        match prefix {
            "battery_1" => SensorKey::new("battery_1_current", &[]),
            "battery_2" => SensorKey::new("battery_2_current", &[]),
            _ => SensorKey::new("battery_bms_current", &[]),
        }
    }
    pub fn cell_voltage_min(prefix: &str) -> SensorKey {
        match prefix {
            "battery_1" => SensorKey::new("battery_1_cell_voltage_min", &[]),
            "battery_2" => SensorKey::new("battery_2_cell_voltage_min", &[]),
            _ => SensorKey::new("battery_bms_cell_voltage_min", &[]),
        }
    }
    pub fn cell_voltage_max(prefix: &str) -> SensorKey {
        match prefix {
            "battery_1" => SensorKey::new("battery_1_cell_voltage_max", &[]),
            "battery_2" => SensorKey::new("battery_2_cell_voltage_max", &[]),
            _ => SensorKey::new("battery_bms_cell_voltage_max", &[]),
        }
    }
    pub fn cell_count(prefix: &str) -> SensorKey {
        match prefix {
            "battery_1" => SensorKey::new("battery_1_cell_count", &[]),
            "battery_2" => SensorKey::new("battery_2_cell_count", &[]),
            _ => SensorKey::new("battery_bms_cell_count", &[]),
        }
    }
}

pub mod tou {
    use super::SensorKey;

    pub fn time(slot: u8) -> SensorKey {
        SensorKey::new(leak(format!("program_{slot}_time")), &[])
    }
    pub fn grid_charge_flag(slot: u8) -> SensorKey {
        SensorKey::new(leak(format!("program_{slot}_grid_charge")), &[])
    }
    pub fn target_soc(slot: u8) -> SensorKey {
        SensorKey::new(leak(format!("program_{slot}_soc")), &[])
    }
    pub fn charge_power(slot: u8) -> SensorKey {
        SensorKey::new(leak(format!("program_{slot}_power")), &[])
    }
    pub fn charge_voltage(slot: u8) -> SensorKey {
        SensorKey::new(leak(format!("program_{slot}_voltage")), &[])
    }
    pub fn weekdays(slot: u8) -> SensorKey {
        SensorKey::new(leak(format!("program_{slot}_weekdays")), &[])
    }

    /// Slot keys are generated (1..=6), so they cannot be `const` string
    /// literals; leak a small, bounded number of short strings once rather
    /// than threading an owned `String` through `SensorKey`.
    fn leak(s: String) -> &'static str {
        Box::leak(s.into_boxed_str())
    }
}
