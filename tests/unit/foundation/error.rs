use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        GpuPortError::config("x")
            .to_string()
            .contains("configuration error:")
    );
    assert!(
        GpuPortError::encode("x")
            .to_string()
            .contains("encoding error:")
    );
    assert!(
        GpuPortError::backend("x")
            .to_string()
            .contains("backend error:")
    );
    assert!(
        GpuPortError::init("x")
            .to_string()
            .contains("initialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("vsync lost");
    let err = GpuPortError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("vsync lost"));
}

#[test]
fn only_init_errors_are_fatal() {
    assert!(GpuPortError::init("no surface").is_fatal());
    assert!(!GpuPortError::backend("flip failed").is_fatal());
    assert!(!GpuPortError::config("bad index").is_fatal());
    assert!(!GpuPortError::encode("bad flags").is_fatal());
}
