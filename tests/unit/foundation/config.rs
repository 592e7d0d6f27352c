use super::*;

#[test]
fn defaults_are_valid() {
    let opts = CanvasOpts::default();
    opts.validate().unwrap();
    assert_eq!(opts.brightness_ceiling(), Some(636));
    assert_eq!(opts.backend, BackendKind::Headless);
}

#[test]
fn validation_catches_bad_values() {
    assert!(
        CanvasOpts {
            max_brightness: Some(0),
            ..CanvasOpts::default()
        }
        .validate()
        .is_err()
    );
    assert!(
        CanvasOpts {
            headless: HeadlessOpts {
                surface_height: 0,
                refresh_hz: None,
            },
            ..CanvasOpts::default()
        }
        .validate()
        .is_err()
    );
    assert!(
        CanvasOpts {
            headless: HeadlessOpts {
                surface_height: 10,
                refresh_hz: Some(f64::NAN),
            },
            ..CanvasOpts::default()
        }
        .validate()
        .is_err()
    );
}

#[test]
fn full_ceiling_disables_limiting() {
    let opts = CanvasOpts {
        max_brightness: Some(765),
        ..CanvasOpts::default()
    };
    assert_eq!(opts.brightness_ceiling(), None);
}

#[test]
fn json_fills_missing_fields_with_defaults() {
    let opts: CanvasOpts =
        serde_json::from_str(r#"{ "dev_mode": true, "headless": { "refresh_hz": null } }"#)
            .unwrap();
    assert!(opts.dev_mode);
    assert_eq!(opts.headless.refresh_hz, None);
    assert_eq!(opts.headless.surface_height, 1080);
    assert_eq!(opts.max_brightness, Some(636));
}

#[test]
fn json_file_round_trip() {
    let dir = std::path::PathBuf::from("target").join("unit_config");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("opts.json");
    let opts = CanvasOpts {
        max_brightness: None,
        throttle_slack_ms: 5,
        ..CanvasOpts::default()
    };
    std::fs::write(&path, serde_json::to_string_pretty(&opts).unwrap()).unwrap();
    assert_eq!(CanvasOpts::from_json_file(&path).unwrap(), opts);
}
