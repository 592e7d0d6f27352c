use super::*;

#[test]
fn empty_snapshot_has_no_rates() {
    let s = StatsCell::new().snapshot(Duration::from_secs(1));
    assert_eq!(s.numfr, 0);
    assert_eq!(s.fps, 0.0);
    assert_eq!(s.avg_fps, 0.0);
    assert_eq!(s.encode_ms, 0.0);
    assert!(s.frame_intervals_ms.is_empty());
}

#[test]
fn averages_divide_by_frame_count() {
    let stats = StatsCell::new();
    for _ in 0..4 {
        stats.record_dirty();
        stats.add_phase(Phase::Encode, Duration::from_millis(2));
        stats.add_phase(Phase::Present, Duration::from_millis(16));
        stats.record_frame(Some(Duration::from_millis(20)));
    }
    stats.record_error();

    let s = stats.snapshot(Duration::from_secs(2));
    assert_eq!((s.numfr, s.numerr, s.num_dirty), (4, 1, 4));
    assert!((s.fps - 2.0).abs() < 1e-9);
    assert!((s.encode_ms - 2.0).abs() < 1e-9);
    assert!((s.present_ms - 16.0).abs() < 1e-9);
    assert_eq!(s.frame_intervals_ms, vec![20.0; 4]);
    assert!((s.avg_fps - 50.0).abs() < 1e-6);
}

#[test]
fn interval_ring_keeps_the_latest_samples() {
    let stats = StatsCell::new();
    for i in 0..(FRAME_INTERVAL_SAMPLES + 5) {
        stats.record_frame(Some(Duration::from_millis(if i < 5 { 100 } else { 10 })));
    }
    let s = stats.snapshot(Duration::from_secs(1));
    assert_eq!(s.frame_intervals_ms.len(), FRAME_INTERVAL_SAMPLES);
    assert!(s.frame_intervals_ms.iter().all(|&ms| (ms - 10.0).abs() < 1e-9));
    assert!((s.avg_fps - 100.0).abs() < 1e-6);
}

#[test]
fn intervals_are_reported_oldest_first_after_wrapping() {
    let stats = StatsCell::new();
    let total = FRAME_INTERVAL_SAMPLES + 7;
    for i in 1..=total {
        stats.record_frame(Some(Duration::from_millis(i as u64)));
    }
    let s = stats.snapshot(Duration::from_secs(1));
    let expected: Vec<f64> = (total - FRAME_INTERVAL_SAMPLES + 1..=total)
        .map(|ms| ms as f64)
        .collect();
    assert_eq!(s.frame_intervals_ms, expected);
}

#[test]
fn first_present_adds_no_interval() {
    let stats = StatsCell::new();
    stats.record_frame(None);
    let s = stats.snapshot(Duration::from_secs(1));
    assert_eq!(s.numfr, 1);
    assert!(s.frame_intervals_ms.is_empty());
    assert_eq!(s.avg_fps, 0.0);

    stats.record_frame(Some(Duration::from_millis(25)));
    stats.record_frame(Some(Duration::from_millis(15)));
    let s = stats.snapshot(Duration::from_secs(1));
    assert_eq!(s.numfr, 3);
    assert_eq!(s.frame_intervals_ms, vec![25.0, 15.0]);
    assert!((s.avg_fps - 50.0).abs() < 1e-6);
}

#[test]
fn clear_resets_everything() {
    let stats = StatsCell::new();
    stats.record_frame(Some(Duration::from_millis(5)));
    stats.record_error();
    stats.add_phase(Phase::Throttle, Duration::from_millis(5));
    stats.clear();
    assert_eq!(stats.snapshot(Duration::from_secs(1)), StatsSnapshot {
        elapsed_secs: 1.0,
        ..StatsSnapshot::default()
    });
}

#[test]
fn snapshot_serializes_to_json() {
    let stats = StatsCell::new();
    stats.record_frame(None);
    let json = serde_json::to_value(stats.snapshot(Duration::from_secs(1))).unwrap();
    assert_eq!(json["numfr"], 1);
    assert!(json["frame_intervals_ms"].is_array());
}

#[test]
fn phase_timer_charges_laps() {
    let stats = StatsCell::new();
    let mut timer = PhaseTimer::start();
    std::thread::sleep(Duration::from_millis(3));
    timer.lap(&stats, Phase::Caller);
    stats.record_frame(None);
    assert!(stats.snapshot(Duration::from_secs(1)).caller_ms >= 3.0);
}
