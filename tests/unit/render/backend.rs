use super::*;
use crate::foundation::error::GpuPortError;

#[derive(Default)]
struct CountingSurface {
    words: Vec<u32>,
    unlocks: usize,
    fail: bool,
}

impl LockedSurface for CountingSurface {
    fn words_mut(&mut self) -> &mut [u32] {
        &mut self.words
    }

    fn pitch(&self) -> usize {
        4
    }

    fn unlock(&mut self) -> GpuPortResult<()> {
        self.unlocks += 1;
        if self.fail {
            return Err(GpuPortError::backend("upload failed"));
        }
        Ok(())
    }
}

#[test]
fn release_unlocks_exactly_once() {
    let mut surface = CountingSurface {
        words: vec![0; 8],
        ..CountingSurface::default()
    };
    {
        let mut lock = SurfaceLock::new(&mut surface);
        lock.words_mut()[1] = 7;
        assert_eq!(lock.pitch(), 4);
        lock.release().unwrap();
    }
    assert_eq!(surface.unlocks, 1);
    assert_eq!(surface.words[1], 7);
}

#[test]
fn drop_unlocks_an_unreleased_lock() {
    let mut surface = CountingSurface {
        fail: true,
        ..CountingSurface::default()
    };
    {
        let _lock = SurfaceLock::new(&mut surface);
    }
    assert_eq!(surface.unlocks, 1);
}

#[test]
fn release_reports_upload_failure() {
    let mut surface = CountingSurface {
        fail: true,
        ..CountingSurface::default()
    };
    let err = SurfaceLock::new(&mut surface).release().unwrap_err();
    assert!(err.to_string().contains("upload failed"));
    assert_eq!(surface.unlocks, 1);
}

#[test]
fn headless_factory_builds_a_backend() {
    let opts = CanvasOpts::default();
    let factory = backend_factory(BackendKind::Headless, &opts);
    let backend = factory(&SurfaceSpec {
        title: "factory".to_string(),
        width: 72,
        height: 4,
    })
    .unwrap();
    assert_eq!(backend.info().max_rows, 1080);
}
