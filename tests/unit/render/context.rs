use super::*;

#[test]
fn leases_keep_the_context_alive() {
    let a = GraphicsContext::acquire("unit-a").unwrap();
    let b = GraphicsContext::acquire("unit-b").unwrap();
    assert!(GraphicsContext::is_initialized());
    assert!(GraphicsContext::lease_count() >= 2);
    assert!(GraphicsContext::generation() >= 1);
    assert_eq!(a.owner(), "unit-a");

    a.release();
    assert!(GraphicsContext::is_initialized());
    drop(b);
}

#[test]
fn release_is_idempotent_with_drop() {
    let mut lease = GraphicsContext::acquire("unit-c").unwrap();
    lease.release_inner();
    lease.release_inner();
    assert!(lease.released);
    drop(lease);
}
