//! Uniform, typed energy-system status snapshot (spec §3/§4.4) assembled
//! from a decoded register map, a profile, and the set of requested
//! subsystem groups.

pub mod builder;
pub mod model;

/// Subsystem name -> upstream profile group names it draws sensor items
/// from (spec §6's group-mapping table). Shared by the status builder
/// (to assemble values) and the orchestrator (to collect registers for the
/// same subsystems before a read), so both walk the exact same groups.
pub(crate) fn upstream_groups(subsystem: &str) -> &'static [&'static str] {
    match subsystem {
        "battery" => &["Battery", "Battery Energy", "Battery Meter", "Meter", "meter"],
        "grid" => &[
            "Grid", "grid", "AC", "Power Grid", "GridEPS", "Active Power", "Apparent Power",
            "Reactive Power", "Power Factor", "Voltage", "Current", "Frequency", "Meter", "meter",
        ],
        "pv" => &["PV", "Solar", "DC", "InverterDC", "Production", "Meter", "meter"],
        "load" => &[
            "Load", "load", "Consumption", "Electricity Consumption", "Output", "output",
            "Meter", "meter",
        ],
        "inverter" => &[
            "Info", "info", "Inverter", "Device", "Inverter Information", "InverterAC",
            "InverterStatus", "Control", "Status", "State",
        ],
        "generator" => &["Generator", "Gen", "Generator/SmartLoad/Microinverter", "Meter", "meter"],
        "ups" => &["UPS", "Backup", "Output", "output", "EPS", "GridEPS"],
        "bms" => &[
            "BMS", "Battery Management", "Battery Module", "Battery 1", "Battery 2", "Battery 3",
            "Battery 4", "Battery 5", "Battery 6", "Battery 7", "Battery 8",
        ],
        "time_of_use" => &["Time of Use", "Schedule", "TOU", "Timed", "Work Mode"],
        _ => &[],
    }
}
