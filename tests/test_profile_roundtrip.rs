use solar_status::profile::catalogue::ProfileCatalogue;

#[test]
fn deye_p3_profile_survives_a_json_round_trip() {
    let catalogue = ProfileCatalogue::new("resources");
    let original = catalogue.load("deye", "deye_p3").expect("profile loads");

    let encoded = serde_json::to_string(&original).expect("profile serializes");
    let decoded = serde_json::from_str(&encoded).expect("profile deserializes");

    assert_eq!(original, decoded);
}

#[test]
fn deye_sun_12k_profile_survives_a_json_round_trip() {
    let catalogue = ProfileCatalogue::new("resources");
    let original = catalogue.load("deye", "deye_sun_12k").expect("profile loads");

    let encoded = serde_json::to_string(&original).expect("profile serializes");
    let decoded = serde_json::from_str(&encoded).expect("profile deserializes");

    assert_eq!(original, decoded);
}
