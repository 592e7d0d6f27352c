use super::*;
use crate::channel::table::ChannelFlags;
use crate::foundation::config::HeadlessOpts;

fn fast_opts() -> CanvasOpts {
    CanvasOpts {
        headless: HeadlessOpts {
            surface_height: 64,
            refresh_hz: None,
        },
        ..CanvasOpts::default()
    }
}

#[test]
fn paint_opts_debug_hides_the_callback() {
    let opts = PaintOpts::at(Duration::from_millis(5)).on_done(|_| {});
    let text = format!("{opts:?}");
    assert!(text.contains("on_done: true"));
}

#[test]
fn closed_canvas_rejects_paint() {
    let mut canvas = Canvas::new("unit-closed", 1, 4, fast_opts()).unwrap();
    canvas.close();
    canvas.close();
    assert!(canvas.is_closed());
    let err = canvas.paint(None, PaintOpts::default()).unwrap_err();
    assert!(matches!(err, GpuPortError::Config(_)));
}

#[test]
fn geometry_accessors() {
    let canvas = Canvas::new("unit-geom", 3, 7, fast_opts()).unwrap();
    assert_eq!(canvas.width(), 72);
    assert_eq!(canvas.height(), 7);
    assert_eq!(canvas.num_channels(), 3);
    assert_eq!(canvas.title(), "unit-geom");
    assert_eq!(canvas.display_info().max_rows, 64);
    assert!(format!("{canvas:?}").contains("unit-geom"));
}

#[test]
fn buffers_are_recycled() {
    let canvas = Canvas::new("unit-pool", 1, 4, fast_opts()).unwrap();
    let px = [1u32, 2, 3, 4];
    canvas.paint(Some(&px), PaintOpts::default()).unwrap();
    canvas.paint(None, PaintOpts::default()).unwrap();
    let buf = canvas.shared.copy_pixels(&px);
    assert_eq!(buf, px);
}

#[test]
fn paint_fails_once_the_worker_has_exited() {
    let canvas = Canvas::new("unit-exited", 1, 4, fast_opts()).unwrap();
    canvas.inbox.wake(Request::Stop);
    let handle = canvas.worker.as_ref().unwrap();
    while !handle.is_finished() {
        std::thread::sleep(Duration::from_millis(5));
    }
    let err = canvas
        .paint(None, PaintOpts::default().on_done(|_| {}))
        .unwrap_err();
    assert!(matches!(err, GpuPortError::Init(_)), "{err}");
    assert!(!canvas.is_closed());
}

#[test]
fn charlieplex_encoders_are_allocated_by_the_caller() {
    let canvas = Canvas::new("unit-spares", 2, 4, fast_opts()).unwrap();
    canvas.set_channel_type(0, ChannelType::charlieplex());
    canvas.set_channel_type(1, ChannelType::ws281x());
    assert_eq!(canvas.shared.spares().len(), 1);

    let (tx, rx) = std::sync::mpsc::channel();
    let opts = PaintOpts::default().on_done(move |res| {
        let _ = tx.send(res);
    });
    canvas.paint(Some(&[0; 8]), opts).unwrap();
    rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
    assert!(canvas.shared.spares().is_empty());

    // Re-publishing a flag change does not allocate another encoder.
    canvas.set_channel_type(0, ChannelType::charlieplex().with(ChannelFlags::CHECKSUM));
    assert!(canvas.shared.spares().is_empty());
}
