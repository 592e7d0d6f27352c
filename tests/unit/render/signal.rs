use super::*;
use std::sync::Arc;

#[test]
fn wake_before_wait_is_not_lost() {
    let sig = Signal::new();
    sig.wake(1);
    sig.wake(2);
    assert_eq!(sig.pending(), 2);
    assert_eq!(sig.wait(), 1);
    assert_eq!(sig.wait(), 2);
    assert_eq!(sig.try_take(), None);
}

#[test]
fn wait_timeout_expires_on_empty_queue() {
    let sig: Signal<u8> = Signal::new();
    let start = Instant::now();
    assert_eq!(sig.wait_timeout(Duration::from_millis(20)), None);
    assert!(start.elapsed() >= Duration::from_millis(20));
}

#[test]
fn messages_cross_threads_in_order() {
    let sig = Arc::new(Signal::new());
    let producer = {
        let sig = Arc::clone(&sig);
        std::thread::spawn(move || {
            for i in 0..100u32 {
                sig.wake(i);
            }
        })
    };
    let got: Vec<u32> = (0..100).map(|_| sig.wait()).collect();
    producer.join().unwrap();
    assert_eq!(got, (0..100).collect::<Vec<_>>());
}
