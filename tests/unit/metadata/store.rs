use super::*;

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "limbo_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn record(value: serde_json::Value) -> Record {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[test]
fn update_merges_top_level_keys_and_persists_sorted() {
    let tmp = temp_dir("store_update");
    std::fs::create_dir_all(&tmp).unwrap();
    let path = tmp.join("sample.json");
    std::fs::write(&path, r#"{"zeta": 1, "image": {"filename": "old.png"}}"#).unwrap();

    let mut store = MetadataStore::load(&path).unwrap();
    store
        .update(record(serde_json::json!({"image": {"filename": "new.png"}, "alpha": [1]})))
        .unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let alpha = text.find("\"alpha\"").unwrap();
    let image = text.find("\"image\"").unwrap();
    let zeta = text.find("\"zeta\"").unwrap();
    assert!(alpha < image && image < zeta, "{text}");
    assert!(text.ends_with("}\n"));
    assert!(text.contains("\n  \"alpha\""));

    let reloaded = MetadataStore::load(&path).unwrap();
    assert_eq!(reloaded.record(), store.record());
    assert_eq!(reloaded.get("image").unwrap()["filename"], "new.png");
    assert!(!tmp.join(".sample.json.tmp").exists());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn missing_file_is_io_failure() {
    let err = MetadataStore::load("no/such/sample.json").unwrap_err();
    assert!(matches!(err, LimboError::Io(_)), "{err}");
}

#[test]
fn invalid_or_non_object_json_is_decode_error() {
    let tmp = temp_dir("store_bad");
    std::fs::create_dir_all(&tmp).unwrap();
    let broken = tmp.join("broken.json");
    std::fs::write(&broken, "{ nope").unwrap();
    assert!(matches!(
        MetadataStore::load(&broken),
        Err(LimboError::Decode(_))
    ));

    let list = tmp.join("list.json");
    std::fs::write(&list, "[1, 2]").unwrap();
    assert!(matches!(MetadataStore::load(&list), Err(LimboError::Decode(_))));

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn typed_blocks_report_shape_errors() {
    let store = MetadataStore::from_record(
        "/virtual/s.json",
        record(serde_json::json!({"annotations": [{"bbox": [0, 0, 1, 1]}]})),
    );
    let err = store.annotations().unwrap_err();
    assert!(matches!(err, LimboError::Decode(_)));
    assert!(err.to_string().contains("annotations"));

    let empty = MetadataStore::from_record("/virtual/e.json", Record::new());
    assert!(empty.annotations().unwrap().is_empty());
    assert!(empty.block::<serde_json::Value>("image").unwrap().is_none());
}

#[test]
fn failed_update_leaves_memory_and_disk_unchanged() {
    let tmp = temp_dir("store_failed_update");
    std::fs::create_dir_all(&tmp).unwrap();
    let path = tmp.join("s.json");
    std::fs::write(&path, r#"{"annotations": [{"category": "a"}]}"#).unwrap();
    std::fs::create_dir_all(tmp.join(".s.json.tmp")).unwrap();

    let mut store = MetadataStore::load(&path).unwrap();
    let before = store.record().clone();
    let err = store
        .update(record(serde_json::json!({"annotations": [{"category": "b"}]})))
        .unwrap_err();
    assert!(matches!(err, LimboError::Io(_)), "{err}");
    assert_eq!(store.record(), &before);
    assert_eq!(MetadataStore::load(&path).unwrap().record(), &before);

    std::fs::remove_dir_all(&tmp).ok();
}
