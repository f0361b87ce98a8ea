use std::collections::HashMap;

use async_trait::async_trait;
use solar_status::error::DriverError;
use solar_status::profile::catalogue::ProfileCatalogue;
use solar_status::reader::RegisterReader;
use solar_status::status::model::InverterState;
use solar_status::Orchestrator;

struct MapReader {
    registers: HashMap<u16, u16>,
}

#[async_trait]
impl RegisterReader for MapReader {
    async fn read_holding_registers(&self, start: u16, count: u16) -> Result<Vec<u16>, DriverError> {
        let mut out = Vec::with_capacity(count as usize);
        for addr in start..start.saturating_add(count) {
            out.push(*self.registers.get(&addr).unwrap_or(&0));
        }
        Ok(out)
    }
}

#[tokio::test]
async fn deye_p3_battery_read_end_to_end() {
    let catalogue = ProfileCatalogue::new("resources");
    let profile = catalogue.load("deye", "deye_p3").expect("profile loads");

    let mut registers = HashMap::new();
    registers.insert(184, 95u16); // battery SOC
    registers.insert(183, 5328u16); // battery voltage * 100
    registers.insert(190, 9u16); // battery power

    let reader = MapReader { registers };
    let orchestrator = Orchestrator::new(&profile, reader);

    let (status, stats) = orchestrator.read(&["battery"]).await.expect("read succeeds");
    let battery = status.battery.expect("battery present");

    assert_eq!(battery.soc, 95);
    assert!((battery.voltage - 53.28).abs() < 1e-9);
    assert_eq!(battery.power, 9);
    assert!(status.grid.is_none());
    assert!(stats.batch_count >= 1);
}

#[tokio::test]
async fn deye_p3_inverter_state_is_classified() {
    let catalogue = ProfileCatalogue::new("resources");
    let profile = catalogue.load("deye", "deye_p3").expect("profile loads");

    let mut registers = HashMap::new();
    registers.insert(3, 0x4142u16);
    registers.insert(4, 0x4344u16);
    registers.insert(5, 0x0000u16);
    registers.insert(7, 0x0102u16);
    registers.insert(0, 1u16); // device state code -> "running"

    let reader = MapReader { registers };
    let orchestrator = Orchestrator::new(&profile, reader);

    let (status, _stats) = orchestrator.read(&["inverter"]).await.expect("read succeeds");
    let inverter = status.inverter.expect("inverter present");
    assert_eq!(inverter.serial_number.as_deref(), Some("ABCD"));
    assert_eq!(inverter.state, Some(InverterState::Running));
}

#[tokio::test]
async fn deye_p3_model_resolves_from_device_lookup_sensor() {
    let catalogue = ProfileCatalogue::new("resources");
    let profile = catalogue.load("deye", "deye_p3").expect("profile loads");

    let mut registers = HashMap::new();
    registers.insert(9, 0u16); // Device sensor, lookup key 0 -> model string

    let reader = MapReader { registers };
    let orchestrator = Orchestrator::new(&profile, reader);

    let (status, _stats) = orchestrator.read(&["inverter"]).await.expect("read succeeds");
    let inverter = status.inverter.expect("inverter present");
    assert_eq!(inverter.model.as_deref(), Some("SUN-12K-SG04LP3-EU"));
}

#[tokio::test]
async fn no_sensors_for_unrequested_group_errors() {
    let catalogue = ProfileCatalogue::new("resources");
    let profile = catalogue.load("deye", "deye_sun_12k").expect("profile loads");
    let reader = MapReader { registers: HashMap::new() };
    let orchestrator = Orchestrator::new(&profile, reader);

    let err = orchestrator.read(&["ups"]).await.unwrap_err();
    assert!(matches!(err, DriverError::NoSensorsForGroups(_)));
}
