use super::*;

#[test]
fn hex_hashes_parse_exactly_eight_digits() {
    assert_eq!(CryptoHash::parse_hex("3f800000"), Some(CryptoHash(0x3f80_0000)));
    assert_eq!(CryptoHash::parse_hex("DEADBEEF"), Some(CryptoHash(0xdead_beef)));
    assert_eq!(CryptoHash::parse_hex("3f8000"), None);
    assert_eq!(CryptoHash::parse_hex("+f800000"), None);
    assert_eq!(CryptoHash::parse_hex("3f80000g"), None);
}

#[test]
fn hash_and_float_id_share_bits() {
    let h = CryptoHash::from_id(1.0);
    assert_eq!(h, CryptoHash(0x3f80_0000));
    assert_eq!(h.as_id(), 1.0);
    assert_eq!(h.to_string(), "3f800000");
}

#[test]
fn manifest_accepts_hex_strings_and_numbers() {
    let m = Manifest::from_json(&serde_json::json!({
        "car/1": "40000000",
        "car/0": 1.0,
    }))
    .unwrap();
    assert_eq!(m.len(), 2);
    assert_eq!(m.get("car/0"), Some(CryptoHash(0x3f80_0000)));
    assert_eq!(m.get("car/1"), Some(CryptoHash::from_id(2.0)));
    assert_eq!(m.labels().collect::<Vec<_>>(), vec!["car/0", "car/1"]);
}

#[test]
fn malformed_manifests_are_decode_errors() {
    let err = Manifest::from_json(&serde_json::json!({"car/0": "nope"})).unwrap_err();
    assert!(matches!(err, LimboError::Decode(_)));
    assert!(err.to_string().contains("car/0"));

    let err = Manifest::from_json(&serde_json::json!({"car/0": [1]})).unwrap_err();
    assert!(matches!(err, LimboError::Decode(_)));

    let err = Manifest::from_json(&serde_json::json!(["car/0"])).unwrap_err();
    assert!(matches!(err, LimboError::Decode(_)));
}

#[test]
fn manifest_serializes_as_hex_map() {
    let m = Manifest::new([("person/0", CryptoHash(0x0000_00ff))]);
    let v = serde_json::to_value(&m).unwrap();
    assert_eq!(v, serde_json::json!({"person/0": "000000ff"}));
    let back: Manifest = serde_json::from_value(v).unwrap();
    assert_eq!(back, m);
}

#[test]
fn categories_follow_label_order_without_repeats() {
    let m = Manifest::new([
        ("truck/0", CryptoHash(3)),
        ("car/1", CryptoHash(2)),
        ("car/0", CryptoHash(1)),
        ("tree", CryptoHash(4)),
    ]);
    assert_eq!(m.categories(), vec!["car", "tree", "truck"]);
}

#[test]
fn instance_selection_drops_unknown_labels() {
    let m = Manifest::new([("car/0", CryptoHash(1)), ("car/1", CryptoHash(2))]);
    assert_eq!(Instances::All.hashes(&m).len(), 2);
    assert_eq!(
        Instances::from(["car/1", "ghost/0"]).hashes(&m),
        BTreeSet::from([CryptoHash(2)])
    );
    assert!(Instances::from("ghost/0").hashes(&m).is_empty());
    assert_eq!(Instances::from("car/0").labels(&m), vec!["car/0"]);
}
