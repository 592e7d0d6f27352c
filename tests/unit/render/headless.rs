use super::*;

fn spec(height: usize) -> SurfaceSpec {
    SurfaceSpec {
        title: "unit".to_string(),
        width: 72,
        height,
    }
}

fn unpaced(height: u32) -> HeadlessOpts {
    HeadlessOpts {
        surface_height: height,
        refresh_hz: None,
    }
}

#[test]
fn rejects_bad_options() {
    assert!(HeadlessBackend::new(unpaced(0)).is_err());
    assert!(
        HeadlessBackend::new(HeadlessOpts {
            surface_height: 10,
            refresh_hz: Some(-1.0),
        })
        .is_err()
    );
}

#[test]
fn lock_before_prepare_is_a_backend_error() {
    let mut be = HeadlessBackend::new(unpaced(10)).unwrap();
    assert!(matches!(be.lock_surface(), Err(GpuPortError::Backend(_))));
}

#[test]
fn pitch_is_cache_padded_and_upload_strips_it() {
    let probe = HeadlessProbe::new();
    let mut be = HeadlessBackend::new(unpaced(10)).unwrap().with_probe(probe.clone());
    be.prepare(&spec(2)).unwrap();
    {
        let mut lock = be.lock_surface().unwrap();
        assert_eq!(lock.pitch(), 80);
        let words = lock.words_mut();
        words[0] = 1;
        words[71] = 2;
        words[75] = 99;
        words[80] = 3;
        lock.release().unwrap();
    }
    be.present(ClipRect {
        x: 0,
        y: 0,
        width: 71,
        height: 2,
    })
    .unwrap();

    let frame = probe.last_frame().unwrap();
    assert_eq!(frame.sequence, 1);
    assert_eq!((frame.width, frame.height), (71, 2));
    assert_eq!(frame.word(0, 0), 1);
    assert_eq!(frame.word(0, 1), 3);
    assert!(frame.words.iter().all(|&w| w != 2 && w != 99));
    assert_eq!(probe.presents(), 1);
}

#[test]
fn oversized_clip_is_rejected() {
    let mut be = HeadlessBackend::new(unpaced(10)).unwrap();
    be.prepare(&spec(2)).unwrap();
    let err = be
        .present(ClipRect {
            x: 0,
            y: 0,
            width: 73,
            height: 2,
        })
        .unwrap_err();
    assert!(matches!(err, GpuPortError::Backend(_)));
}

#[test]
fn presents_are_paced_to_the_refresh_rate() {
    let mut be = HeadlessBackend::new(HeadlessOpts {
        surface_height: 10,
        refresh_hz: Some(100.0),
    })
    .unwrap();
    be.prepare(&spec(1)).unwrap();
    let clip = ClipRect {
        x: 0,
        y: 0,
        width: 71,
        height: 1,
    };
    let start = Instant::now();
    for _ in 0..4 {
        be.present(clip).unwrap();
    }
    assert!(start.elapsed() >= Duration::from_millis(29));
}

#[test]
fn backend_holds_a_context_lease() {
    let be = HeadlessBackend::new(unpaced(10)).unwrap();
    assert!(GraphicsContext::is_initialized());
    assert_eq!(be.info().max_rows, 10);
    assert_eq!(be.info().name, "headless");
}
