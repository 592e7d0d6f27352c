use crate::foundation::config::{BackendKind, CanvasOpts};
use crate::foundation::error::GpuPortResult;
use crate::render::headless::HeadlessBackend;

/// Static facts about a display backend.
#[derive(Clone, Debug, PartialEq)]
pub struct DisplayInfo {
    /// Human-readable backend name for logs.
    pub name: String,
    /// Maximum surface rows, bounding `node_length`.
    pub max_rows: usize,
    /// Nominal refresh rate, when known.
    pub refresh_hz: Option<f64>,
}

/// Geometry and title requested for the encoded surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SurfaceSpec {
    /// Window or surface title.
    pub title: String,
    /// Surface width in words (always the full encoded width).
    pub width: usize,
    /// Surface height in rows (`node_length`).
    pub height: usize,
}

/// Sub-rectangle of the surface handed to the display on present.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClipRect {
    /// Left column.
    pub x: usize,
    /// Top row.
    pub y: usize,
    /// Width in columns.
    pub width: usize,
    /// Height in rows.
    pub height: usize,
}

/// Backend-side view of a locked surface.
///
/// Implemented by backends; callers go through [`SurfaceLock`].
pub trait LockedSurface {
    /// Writable words, row-major at [`pitch`](Self::pitch) words per row.
    fn words_mut(&mut self) -> &mut [u32];

    /// Words per row (at least the surface width).
    fn pitch(&self) -> usize;

    /// Finish writing and upload the contents.
    fn unlock(&mut self) -> GpuPortResult<()>;
}

/// Scoped write access to a backend surface.
///
/// [`release`](Self::release) uploads and reports failures; dropping an unreleased lock
/// still unlocks the surface and logs any failure.
pub struct SurfaceLock<'a> {
    inner: &'a mut dyn LockedSurface,
    released: bool,
}

impl<'a> SurfaceLock<'a> {
    /// Wrap a backend's locked surface.
    pub fn new(inner: &'a mut dyn LockedSurface) -> Self {
        Self {
            inner,
            released: false,
        }
    }

    /// Words per row.
    pub fn pitch(&self) -> usize {
        self.inner.pitch()
    }

    /// Writable surface words.
    pub fn words_mut(&mut self) -> &mut [u32] {
        self.inner.words_mut()
    }

    /// Unlock and upload, surfacing any backend error.
    pub fn release(mut self) -> GpuPortResult<()> {
        self.released = true;
        self.inner.unlock()
    }
}

impl Drop for SurfaceLock<'_> {
    fn drop(&mut self) {
        if !self.released
            && let Err(err) = self.inner.unlock()
        {
            tracing::warn!(%err, "surface unlock failed during drop");
        }
    }
}

/// A display that shows one encoded surface per frame.
///
/// Backends are created on, and only used from, the canvas worker thread.
pub trait DisplayBackend {
    /// Static backend facts.
    fn info(&self) -> DisplayInfo;

    /// Allocate the surface described by `spec`.
    fn prepare(&mut self, spec: &SurfaceSpec) -> GpuPortResult<()>;

    /// Lock the surface for writing.
    fn lock_surface(&mut self) -> GpuPortResult<SurfaceLock<'_>>;

    /// Show the uploaded surface, clipped to `clip`. Blocks until the flip (vsync) when the
    /// backend paces presents.
    fn present(&mut self, clip: ClipRect) -> GpuPortResult<()>;
}

/// Builds a backend on the worker thread.
pub type BackendFactory =
    Box<dyn FnOnce(&SurfaceSpec) -> GpuPortResult<Box<dyn DisplayBackend>> + Send>;

/// Factory for one of the built-in backends.
pub fn backend_factory(kind: BackendKind, opts: &CanvasOpts) -> BackendFactory {
    match kind {
        BackendKind::Headless => {
            let headless = opts.headless.clone();
            Box::new(move |_spec: &SurfaceSpec| {
                let backend: Box<dyn DisplayBackend> = Box::new(HeadlessBackend::new(headless)?);
                Ok(backend)
            })
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
