//! The output shape: `SolarStatus` and its per-subsystem records (spec §3,
//! §6's output-JSON contract). Grounded on `lxp/packet.rs::ReadInputAll`'s
//! flat, closely-named decoded-field texture, reshaped into one struct per
//! subsystem instead of one struct per wire packet.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A uniform snapshot of an energy system, built from one orchestrator
/// read. Subsystem fields are `None` when their profile didn't expose the
/// sensors the assembly rule requires (spec §4.4).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SolarStatus {
    pub timestamp: DateTime<Utc>,
    pub battery: Option<BatteryStatus>,
    pub grid: Option<GridStatus>,
    pub pv: Option<PvStatus>,
    pub load: Option<LoadStatus>,
    pub inverter: Option<InverterStatus>,
    pub generator: Option<GeneratorStatus>,
    pub ups: Option<UpsStatus>,
    pub bms: Vec<BmsUnit>,
    pub time_of_use: Vec<TimeOfUseSlot>,
}

impl SolarStatus {
    /// Serialize to the JSON status document spec §6 describes: snake_case
    /// keys, ISO-8601 UTC timestamps, numeric SI values.
    pub fn to_json(&self) -> crate::prelude::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// `power > 0` discharging, `< 0` charging (spec §3's published
/// sign-convention invariant; the builder does not re-normalize raw signs).
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BatteryStatus {
    pub soc: i64,
    pub voltage: f64,
    pub power: i64,
    pub current: f64,
    pub temperature: Option<f64>,
    pub soh: Option<f64>,
    pub daily_charge: Option<f64>,
    pub daily_discharge: Option<f64>,
    pub total_charge: Option<f64>,
    pub total_discharge: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PhaseReading {
    pub phase: u8,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub power: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ExternalCt {
    pub total_power: f64,
    pub phases: Vec<PhaseReading>,
}

/// `power > 0` importing, `< 0` exporting (spec §3).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GridStatus {
    pub power: i64,
    pub voltage: Option<f64>,
    pub current: Option<f64>,
    pub phases: Vec<PhaseReading>,
    pub frequency: Option<f64>,
    pub power_factor: Option<f64>,
    pub daily_import: Option<f64>,
    pub daily_export: Option<f64>,
    pub total_import: Option<f64>,
    pub total_export: Option<f64>,
    pub external_ct: Option<ExternalCt>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PvString {
    pub id: u8,
    pub voltage: f64,
    pub current: f64,
    pub power: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct PvStatus {
    pub total_power: i64,
    pub strings: Vec<PvString>,
    pub daily_production: Option<f64>,
    pub total_production: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LoadPhase {
    pub phase: u8,
    pub power: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct LoadStatus {
    pub power: i64,
    pub phases: Vec<LoadPhase>,
    pub frequency: Option<f64>,
    pub daily_consumption: Option<f64>,
    pub total_consumption: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InverterState {
    Standby,
    Running,
    Fault,
    Unknown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct AlarmFlag {
    pub bit: u8,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub struct InverterStatus {
    pub serial_number: Option<String>,
    pub model: Option<String>,
    pub firmware_version: Option<String>,
    pub state: Option<InverterState>,
    pub alarms: Vec<AlarmFlag>,
    pub faults: Vec<AlarmFlag>,
    pub device_time: Option<DateTime<Utc>>,
}

/// Total is always non-negative; `is_running = power != 0` (spec §4.4).
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GeneratorStatus {
    pub power: i64,
    pub is_running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsMode {
    Battery,
    Standby,
    Bypass,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct UpsStatus {
    pub power: i64,
    pub phases: Vec<LoadPhase>,
    pub mode: Option<UpsMode>,
}

/// One battery management unit (`battery_1`/`battery_2`/`battery_bms`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct BmsUnit {
    pub unit: String,
    pub soc: f64,
    pub voltage: f64,
    pub current: f64,
    pub cell_voltage_min: Option<f64>,
    pub cell_voltage_max: Option<f64>,
    pub voltage_delta_mv: Option<f64>,
    pub cell_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfUseMode {
    GridCharge,
    SelfConsumption,
}

/// `weekdays` bitmask: LSB = Monday, bit 6 = Sunday (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeeklySchedule(pub u8);

impl WeeklySchedule {
    const DAY_NAMES: [&'static str; 7] =
        ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"];

    pub fn is_active(&self, day_index: u8) -> bool {
        day_index < 7 && (self.0 >> day_index) & 1 == 1
    }

    pub fn active_days(&self) -> Vec<&'static str> {
        (0..7u8).filter(|d| self.is_active(*d)).map(|d| Self::DAY_NAMES[d as usize]).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct TimeOfUseSlot {
    pub slot: u8,
    /// Raw converted minutes-of-day value; not reinterpreted as an
    /// end-time (spec §9, open question 1).
    pub time_minutes: f64,
    pub is_enabled: bool,
    pub mode: Option<TimeOfUseMode>,
    pub target_soc: Option<f64>,
    pub charge_power: Option<f64>,
    pub charge_voltage: Option<f64>,
    pub weekdays: Option<WeeklySchedule>,
}
