use std::sync::Arc;

use super::*;
use crate::imaging::{
    layers::{CryptomatteImage, RankPlane},
    service::MemoryImageService,
};

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
fn pairs_must_be_even_and_valid() {
    let specs = MaskSpec::parse_pairs(&["cars", "^car/", "people", "person"]).unwrap();
    assert_eq!(specs.len(), 2);
    assert_eq!(specs[1].name, "people");

    let err = MaskSpec::parse_pairs(&["cars", "^car/", "people"]).unwrap_err();
    assert!(matches!(err, LimboError::MalformedRequest(_)), "{err}");

    let err = MaskSpec::parse_pairs(&["cars", "("]).unwrap_err();
    assert!(matches!(err, LimboError::MalformedRequest(_)));

    let err = MaskSpec::new("a/b", "x").unwrap_err();
    assert!(matches!(err, LimboError::MalformedRequest(_)));

    assert!(MaskSpec::parse_pairs::<&str>(&[]).unwrap().is_empty());
}

#[test]
fn patterns_match_anywhere_in_the_label() {
    let spec = MaskSpec::new("wheels", "car").unwrap();
    assert_eq!(
        spec.select(["car/0", "sportscar/1", "person/0"]),
        vec!["car/0".to_string(), "sportscar/1".to_string()]
    );
}

#[test]
fn exports_one_png_per_sample_and_mask() {
    let tmp = temp_dir("masks_export");
    std::fs::create_dir_all(&tmp).unwrap();
    std::fs::write(
        tmp.join("s.json"),
        serde_json::to_vec(&serde_json::json!({
            "synthetic": {
                "image": {"filename": "s.exr"},
                "cryptomatte": {
                    "filename": "s.cryptomatte.exr",
                    "manifest": {"car/0": "3f800000", "person/0": "40000000"},
                },
            },
        }))
        .unwrap(),
    )
    .unwrap();
    std::fs::write(tmp.join("photo.json"), b"{}").unwrap();

    let service = Arc::new(MemoryImageService::new());
    service.insert_cryptomatte(
        tmp.join("s.cryptomatte.exr"),
        CryptomatteImage::new(
            3,
            1,
            vec![RankPlane {
                ids: vec![1.0, 2.0, 0.0],
                coverage: vec![1.0, 0.5, 0.0],
            }],
        )
        .unwrap(),
    );

    let ds = Dataset::open_with([&tmp], service.clone()).unwrap();
    let specs = MaskSpec::parse_pairs(&["cars", "^car/", "people", "^person/"]).unwrap();
    let report = export_masks(&ds, &specs).unwrap();
    assert_eq!(report.written, 2);
    assert_eq!(report.without_cryptomatte, 1);

    let cars = service.saved(&tmp.join("s.mask-cars.png")).unwrap();
    assert_eq!((cars.width, cars.height, cars.channels), (3, 1, 1));
    assert_eq!(cars.data, vec![255, 0, 0]);
    let people = service.saved(&tmp.join("s.mask-people.png")).unwrap();
    assert_eq!(people.data, vec![0, 128, 0]);

    std::fs::remove_dir_all(&tmp).ok();
}
