use std::path::{Path, PathBuf};

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

fn write_json(path: &Path, value: serde_json::Value) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, serde_json::to_vec_pretty(&value).unwrap()).unwrap();
}

fn boxes() -> serde_json::Value {
    serde_json::json!({
        "annotations": [
            {"category": "point", "bbox": [3.0, 4.0, 0.0, 0.0], "bbox_mode": "XYWH_ABS"},
            {"category": "line", "bbox": [3.0, 4.0, 0.0, 5.0], "bbox_mode": "XYWH_ABS"},
            {"category": "car", "bbox": [1.0, 1.0, 2.0, 2.0], "bbox_mode": "XYWH_ABS"},
            {"category": "tag"},
        ]
    })
}

#[test]
fn drops_only_boxes_empty_in_both_axes() {
    let tmp = temp_dir("lint_empty");
    let path = tmp.join("s.json");
    write_json(&path, boxes());

    let ds = Dataset::open([&tmp]).unwrap();
    let report = lint_dataset(
        &ds,
        &LintOptions {
            delete_empty_bboxes: true,
            ..LintOptions::default()
        },
    )
    .unwrap();
    assert_eq!(report.inspected, 1);
    assert_eq!(report.empty_bboxes, 1);
    assert_eq!(report.updated, 1);

    let sample = Sample::open(&path).unwrap();
    let categories = sample
        .annotations()
        .unwrap()
        .into_iter()
        .map(|a| a.category)
        .collect::<Vec<_>>();
    assert_eq!(categories, vec!["line", "car", "tag"]);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn dry_run_reports_without_touching_disk() {
    let tmp = temp_dir("lint_dry");
    let path = tmp.join("image-7.json");
    write_json(&path, boxes());
    let before = std::fs::read(&path).unwrap();

    let ds = Dataset::open([&tmp]).unwrap();
    let report = lint_dataset(
        &ds,
        &LintOptions {
            delete_empty_bboxes: true,
            delete_missing_image: true,
            dry_run: true,
            ..LintOptions::default()
        },
    )
    .unwrap();
    assert_eq!(report.empty_bboxes, 1);
    assert_eq!(report.deleted, 1);
    assert_eq!(std::fs::read(&path).unwrap(), before);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn deletes_samples_missing_required_siblings() {
    let tmp = temp_dir("lint_missing");
    write_json(&tmp.join("image-1.json"), serde_json::json!({}));
    write_json(&tmp.join("image-2.json"), serde_json::json!({}));
    std::fs::write(tmp.join("image-1.exr"), b"exr").unwrap();
    std::fs::write(tmp.join("cryptomatte-1.cryptomatte.exr"), b"exr").unwrap();

    let ds = Dataset::open([&tmp]).unwrap();
    let report = lint_dataset(
        &ds,
        &LintOptions {
            delete_missing_cryptomatte: true,
            delete_missing_synthetic: true,
            ..LintOptions::default()
        },
    )
    .unwrap();
    assert_eq!(report.inspected, 2);
    assert_eq!(report.deleted, 1);
    assert!(tmp.join("image-1.json").exists());
    assert!(!tmp.join("image-2.json").exists());

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn unreadable_samples_are_skipped() {
    let tmp = temp_dir("lint_skip");
    std::fs::create_dir_all(&tmp).unwrap();
    std::fs::write(tmp.join("broken.json"), "{").unwrap();
    write_json(&tmp.join("fine.json"), serde_json::json!({}));

    let ds = Dataset::open([&tmp]).unwrap();
    let report = lint_dataset(&ds, &LintOptions::default()).unwrap();
    assert_eq!(report.skipped, 1);
    assert_eq!(report.inspected, 1);

    std::fs::remove_dir_all(&tmp).ok();
}

#[test]
fn surviving_annotations_keep_their_json() {
    let tmp = temp_dir("lint_raw");
    let path = tmp.join("s.json");
    write_json(
        &path,
        serde_json::json!({
            "annotations": [
                {"category": "car", "bbox": [1, 2, 3, 4], "bbox_mode": "XYWH_ABS", "score": 1},
                {"category": "point", "bbox": [5, 5, 0, 0], "bbox_mode": "XYWH_ABS"},
                {"category": "sky", "bbox": null},
            ]
        }),
    );

    let ds = Dataset::open([&tmp]).unwrap();
    let report = lint_dataset(
        &ds,
        &LintOptions {
            delete_empty_bboxes: true,
            ..LintOptions::default()
        },
    )
    .unwrap();
    assert_eq!(report.empty_bboxes, 1);

    let written: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(
        written["annotations"],
        serde_json::json!([
            {"category": "car", "bbox": [1, 2, 3, 4], "bbox_mode": "XYWH_ABS", "score": 1},
            {"category": "sky", "bbox": null},
        ])
    );

    std::fs::remove_dir_all(&tmp).ok();
}
