use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::foundation::config::HeadlessOpts;
use crate::foundation::error::{GpuPortError, GpuPortResult};
use crate::render::backend::{
    ClipRect, DisplayBackend, DisplayInfo, LockedSurface, SurfaceLock, SurfaceSpec,
};
use crate::render::context::{ContextLease, GraphicsContext};

/// Row pitch alignment in words (one 64-byte cache line).
const PITCH_ALIGN: usize = 16;

/// Contents of one present, as seen by the display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresentedFrame {
    /// 1-based present counter.
    pub sequence: u64,
    /// Clipped width in words.
    pub width: usize,
    /// Rows.
    pub height: usize,
    /// Row-major words, `width` per row.
    pub words: Vec<u32>,
}

impl PresentedFrame {
    /// Word at column `x` of row `y`.
    pub fn word(&self, x: usize, y: usize) -> u32 {
        self.words[y * self.width + x]
    }
}

/// Shared view of what a [`HeadlessBackend`] has presented.
#[derive(Clone, Debug, Default)]
pub struct HeadlessProbe {
    last: Arc<Mutex<Option<PresentedFrame>>>,
}

impl HeadlessProbe {
    /// Probe that has seen nothing yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recent presented frame.
    pub fn last_frame(&self) -> Option<PresentedFrame> {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of presents so far.
    pub fn presents(&self) -> u64 {
        self.last
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |f| f.sequence)
    }

    fn publish(&self, frame: PresentedFrame) {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }
}

#[derive(Debug, Default)]
struct SurfaceMemory {
    width: usize,
    height: usize,
    pitch: usize,
    staging: Vec<u32>,
    texture: Vec<u32>,
}

impl LockedSurface for SurfaceMemory {
    fn words_mut(&mut self) -> &mut [u32] {
        &mut self.staging
    }

    fn pitch(&self) -> usize {
        self.pitch
    }

    fn unlock(&mut self) -> GpuPortResult<()> {
        for (dst, src) in self
            .texture
            .chunks_exact_mut(self.width)
            .zip(self.staging.chunks_exact(self.pitch))
        {
            dst.copy_from_slice(&src[..self.width]);
        }
        Ok(())
    }
}

/// In-memory display: a cache-padded staging surface, a texture copy made on unlock, and
/// presents paced to a simulated refresh rate.
#[derive(Debug)]
pub struct HeadlessBackend {
    opts: HeadlessOpts,
    memory: SurfaceMemory,
    frame_period: Option<Duration>,
    last_flip: Option<Instant>,
    presents: u64,
    probe: Option<HeadlessProbe>,
    _lease: ContextLease,
}

impl HeadlessBackend {
    /// New backend holding a graphics-context lease.
    pub fn new(opts: HeadlessOpts) -> GpuPortResult<Self> {
        if opts.surface_height == 0 {
            return Err(GpuPortError::init("headless surface height must be > 0"));
        }
        let frame_period = match opts.refresh_hz {
            Some(hz) if hz.is_finite() && hz > 0.0 => Some(Duration::from_secs_f64(1.0 / hz)),
            Some(hz) => {
                return Err(GpuPortError::init(format!("invalid refresh rate {hz}")));
            }
            None => None,
        };
        let lease = GraphicsContext::acquire("headless")?;
        Ok(Self {
            opts,
            memory: SurfaceMemory::default(),
            frame_period,
            last_flip: None,
            presents: 0,
            probe: None,
            _lease: lease,
        })
    }

    /// Publish every present to `probe`.
    pub fn with_probe(mut self, probe: HeadlessProbe) -> Self {
        self.probe = Some(probe);
        self
    }

    fn wait_for_vsync(&mut self) {
        let Some(period) = self.frame_period else {
            return;
        };
        let now = Instant::now();
        let flip = self.last_flip.map_or(now, |prev| prev + period);
        if flip > now {
            std::thread::sleep(flip - now);
        }
        self.last_flip = Some(flip.max(now));
    }
}

impl DisplayBackend for HeadlessBackend {
    fn info(&self) -> DisplayInfo {
        DisplayInfo {
            name: "headless".to_string(),
            max_rows: self.opts.surface_height as usize,
            refresh_hz: self.opts.refresh_hz,
        }
    }

    fn prepare(&mut self, spec: &SurfaceSpec) -> GpuPortResult<()> {
        if spec.width == 0 || spec.height == 0 {
            return Err(GpuPortError::init(format!(
                "cannot create a {}x{} surface",
                spec.width, spec.height
            )));
        }
        let pitch = spec.width.next_multiple_of(PITCH_ALIGN);
        self.memory = SurfaceMemory {
            width: spec.width,
            height: spec.height,
            pitch,
            staging: vec![0; pitch * spec.height],
            texture: vec![0; spec.width * spec.height],
        };
        tracing::debug!(
            title = %spec.title,
            width = spec.width,
            height = spec.height,
            pitch,
            "headless surface ready"
        );
        Ok(())
    }

    fn lock_surface(&mut self) -> GpuPortResult<SurfaceLock<'_>> {
        if self.memory.staging.is_empty() {
            return Err(GpuPortError::backend("surface locked before prepare"));
        }
        Ok(SurfaceLock::new(&mut self.memory))
    }

    fn present(&mut self, clip: ClipRect) -> GpuPortResult<()> {
        let mem = &self.memory;
        if clip.x + clip.width > mem.width || clip.y + clip.height > mem.height {
            return Err(GpuPortError::backend(format!(
                "clip {clip:?} exceeds {}x{} surface",
                mem.width, mem.height
            )));
        }
        self.wait_for_vsync();
        self.presents += 1;
        if let Some(probe) = &self.probe {
            let mut words = Vec::with_capacity(clip.width * clip.height);
            for row in self
                .memory
                .texture
                .chunks_exact(self.memory.width)
                .skip(clip.y)
                .take(clip.height)
            {
                words.extend_from_slice(&row[clip.x..clip.x + clip.width]);
            }
            probe.publish(PresentedFrame {
                sequence: self.presents,
                width: clip.width,
                height: clip.height,
                words,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/headless.rs"]
mod tests;
