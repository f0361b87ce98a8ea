use solar_status::profile::catalogue::ProfileCatalogue;

#[test]
fn bundled_deye_profiles_load_and_enumerate() {
    let catalogue = ProfileCatalogue::new("resources");
    let handles = catalogue.list().expect("catalogue scan");

    let ids: Vec<&str> = handles.iter().map(|h| h.id.as_str()).collect();
    assert!(ids.contains(&"deye_p3"));
    assert!(ids.contains(&"deye_sun_12k"));
    assert!(ids.contains(&"deye_hybrid_generic"));

    let p3 = catalogue.load("deye", "deye_p3").expect("deye_p3 loads");
    assert_eq!(p3.info.manufacturer, "DEYE");
    assert!(p3.info.model.len() >= 2);
}

#[test]
fn bundled_profiles_each_parse_without_error() {
    let catalogue = ProfileCatalogue::new("resources");
    for handle in catalogue.list().unwrap() {
        catalogue
            .load(&handle.manufacturer, &handle.id)
            .unwrap_or_else(|e| panic!("{}/{} failed to load: {e}", handle.manufacturer, handle.id));
    }
}
