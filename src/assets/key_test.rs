use super::*;

#[test]
fn process_keys_use_global_asset_namespace() {
    let key = Subject::Process(ProcessType::Stamping).key();
    assert_eq!(key.to_string(), "global_asset/stamping");
    assert_eq!(key.namespace(), Namespace::GlobalAsset);
}

#[test]
fn product_keys_use_global_product_namespace() {
    let key = Subject::Product(ProductType::HvConnectorHsg).key();
    assert_eq!(key.to_string(), "global_product/hv-connector-hsg");
}

#[test]
fn keys_are_stable_across_calls() {
    for subject in Subject::ALL {
        assert_eq!(subject.key().to_string(), subject.key().to_string());
    }
}

#[test]
fn every_subject_has_a_distinct_key() {
    let mut keys: Vec<String> = Subject::ALL.iter().map(|s| s.key().to_string()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), Subject::ALL.len());
}

#[test]
fn key_parse_round_trips_known_subjects() {
    for subject in Subject::ALL {
        let raw = subject.key().to_string();
        assert_eq!(AssetKey::parse(&raw), Some(subject.key()));
    }
}

#[test]
fn key_parse_rejects_meta_and_unknown() {
    assert!(AssetKey::parse("__meta/schema_version").is_none());
    assert!(AssetKey::parse("global_asset/welding").is_none());
    assert!(AssetKey::parse("global_asset").is_none());
    assert!(AssetKey::parse("other/stamping").is_none());
}

#[test]
fn product_from_name_ignores_case_and_punctuation() {
    assert_eq!(ProductType::from_name("HV Connector Hsg"), Some(ProductType::HvConnectorHsg));
    assert_eq!(ProductType::from_name("hv-connector-hsg"), Some(ProductType::HvConnectorHsg));
    assert_eq!(ProductType::from_name("  busbar CLIP "), Some(ProductType::BusbarClip));
    assert_eq!(ProductType::from_name("Sensor_Terminal"), Some(ProductType::SensorTerminal));
}

#[test]
fn product_from_name_rejects_unknown_and_empty() {
    assert!(ProductType::from_name("Widget").is_none());
    assert!(ProductType::from_name("").is_none());
    assert!(ProductType::from_name(" -- ").is_none());
}

#[test]
fn subject_parse_accepts_product_display_names() {
    assert_eq!(
        Subject::parse("global_product", "Busbar Clip"),
        Some(Subject::Product(ProductType::BusbarClip))
    );
    assert!(Subject::parse("global_asset", "Busbar Clip").is_none());
}

#[test]
fn subject_serializes_with_kind_tag() {
    let json = serde_json::to_value(Subject::Process(ProcessType::Molding)).unwrap();
    assert_eq!(json, serde_json::json!({"kind": "process", "type": "molding"}));
}
