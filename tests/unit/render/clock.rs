use super::*;

#[test]
fn elapsed_moves_forward() {
    let clock = PresentationClock::new();
    let a = clock.elapsed();
    std::thread::sleep(Duration::from_millis(5));
    let b = clock.elapsed();
    assert!(b >= a + Duration::from_millis(5));
}

#[test]
fn reset_rebases_the_reading() {
    let clock = PresentationClock::new();
    clock.reset(Duration::from_secs(10));
    let now = clock.elapsed();
    assert!(now >= Duration::from_secs(10));
    assert!(now < Duration::from_secs(11));

    clock.reset(Duration::ZERO);
    assert!(clock.elapsed() < Duration::from_secs(1));
}

#[test]
fn present_marks_are_recorded() {
    let clock = PresentationClock::new();
    assert_eq!(clock.last_present(), None);
    let first = clock.mark_present();
    assert_eq!(clock.last_present(), Some(first));
    std::thread::sleep(Duration::from_millis(1));
    let second = clock.mark_present();
    assert!(second > first);
}
