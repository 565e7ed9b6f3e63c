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

#[test]
fn finds_nested_json_files_sorted_across_roots() {
    let tmp = temp_dir("dataset_scan");
    let a = tmp.join("a");
    let b = tmp.join("b");
    std::fs::create_dir_all(a.join("deep/er")).unwrap();
    std::fs::create_dir_all(b.join(".hidden")).unwrap();
    std::fs::write(a.join("deep/er/z.json"), "{}").unwrap();
    std::fs::write(a.join("m.json"), "{}").unwrap();
    std::fs::write(a.join("notes.txt"), "x").unwrap();
    std::fs::write(b.join("c.json"), "{}").unwrap();
    std::fs::write(b.join(".c.json.tmp"), "{}").unwrap();
    std::fs::write(b.join(".hidden/skip.json"), "{}").unwrap();

    let ds = Dataset::open([&b, &a]).unwrap();
    let names = ds
        .paths()
        .iter()
        .map(|p| p.strip_prefix(&tmp).unwrap().to_path_buf())
        .collect::<Vec<_>>();
    assert_eq!(
        names,
        vec![
            PathBuf::from("a/deep/er/z.json"),
            PathBuf::from("a/m.json"),
            PathBuf::from("b/c.json"),
        ]
    );
    assert_eq!(ds.roots().len(), 2);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn malformed_samples_fail_only_when_opened() {
    let tmp = temp_dir("dataset_lazy");
    std::fs::create_dir_all(&tmp).unwrap();
    std::fs::write(tmp.join("bad.json"), "not json").unwrap();
    std::fs::write(tmp.join("good.json"), r#"{"annotations": []}"#).unwrap();

    let ds = Dataset::open([&tmp]).unwrap();
    assert_eq!(ds.len(), 2);
    let results = ds.iter().collect::<Vec<_>>();
    assert!(matches!(results[0], Err(LimboError::Decode(_))));
    assert_eq!(results[1].as_ref().unwrap().name(), "good");
    assert!(ds.get(2).is_none());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn missing_root_is_io_failure() {
    let err = Dataset::open(["/definitely/not/a/dataset/root"]).unwrap_err();
    assert!(matches!(err, LimboError::Io(_)), "{err}");
}
