use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::channel::table::{ChannelTable, ChannelType, MAX_CHANNELS, Protocol};
use crate::encode::bitplane::{EncodeReport, PRESENT_WIDTH, SignalEncoder};
use crate::encode::charlieplex::CharlieplexEncoder;
use crate::foundation::error::{GpuPortError, GpuPortResult};
use crate::render::backend::{BackendFactory, ClipRect, DisplayBackend, DisplayInfo, SurfaceSpec};
use crate::render::clock::PresentationClock;
use crate::render::signal::Signal;
use crate::render::stats::{Phase, PhaseTimer, StatsCell};

/// Pixel buffers kept for reuse between submissions.
const POOLED_BUFFERS: usize = 4;

/// Result of one presented frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameInfo {
    /// 1-based frame sequence number of this canvas (not reset by stats clearing).
    pub frame: u64,
    /// Presentation timestamp on the canvas clock.
    pub presented_at: Duration,
}

/// Completion callback for an asynchronous paint.
pub type DoneCallback = Box<dyn FnOnce(GpuPortResult<FrameInfo>) + Send + 'static>;

/// State shared between a canvas and its worker.
#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) channels: Mutex<ChannelTable>,
    pub(crate) stats: StatsCell,
    pub(crate) clock: PresentationClock,
    pool: Mutex<Vec<Vec<u32>>>,
    spares: Mutex<Vec<Box<CharlieplexEncoder>>>,
}

impl Shared {
    pub(crate) fn new(channels: ChannelTable) -> Self {
        Self {
            channels: Mutex::new(channels),
            stats: StatsCell::new(),
            clock: PresentationClock::new(),
            pool: Mutex::new(Vec::new()),
            spares: Mutex::new(Vec::with_capacity(MAX_CHANNELS)),
        }
    }

    pub(crate) fn channels(&self) -> MutexGuard<'_, ChannelTable> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn spares(&self) -> MutexGuard<'_, Vec<Box<CharlieplexEncoder>>> {
        self.spares.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish a channel type for the worker's next frame.
    ///
    /// A switch into charlieplex allocates that channel's dimming encoder here, on the
    /// calling thread, so the worker only has to take it from the spares.
    pub(crate) fn set_channel_type(
        &self,
        index: usize,
        new_type: ChannelType,
    ) -> Option<ChannelType> {
        let previous = self.channels().set(index, new_type)?;
        let entering = new_type.protocol == Protocol::CharlieplexSsr
            && previous.protocol != Protocol::CharlieplexSsr;
        if entering {
            let mut spares = self.spares();
            if spares.len() < MAX_CHANNELS {
                spares.push(Box::default());
            }
        }
        Some(previous)
    }

    /// Copy `pixels` into a recycled buffer.
    pub(crate) fn copy_pixels(&self, pixels: &[u32]) -> Vec<u32> {
        let mut buf = self
            .pool
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        buf.clear();
        buf.extend_from_slice(pixels);
        buf
    }

    fn recycle(&self, buf: Vec<u32>) {
        let mut pool = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        if pool.len() < POOLED_BUFFERS {
            pool.push(buf);
        }
    }
}

pub(crate) struct Submission {
    pub(crate) pixels: Option<Vec<u32>>,
    pub(crate) target_time: Option<Duration>,
    pub(crate) on_done: Option<DoneCallback>,
    pub(crate) ack: bool,
}

pub(crate) enum Request {
    Paint(Submission),
    Stop,
}

pub(crate) enum Reply {
    Ready(GpuPortResult<DisplayInfo>),
    Accepted,
}

/// Background renderer owning the backend and the encoder.
///
/// Fully built on the caller thread, then moved onto its own thread by [`Worker::spawn`].
pub(crate) struct Worker {
    spec: SurfaceSpec,
    encoder: SignalEncoder,
    shared: Arc<Shared>,
    inbox: Arc<Signal<Request>>,
    outbox: Arc<Signal<Reply>>,
    throttle_slack: Duration,
    frame_seq: u64,
    last_present: Option<Instant>,
    skipped_mask: u32,
}

impl Worker {
    pub(crate) fn new(
        spec: SurfaceSpec,
        encoder: SignalEncoder,
        shared: Arc<Shared>,
        inbox: Arc<Signal<Request>>,
        outbox: Arc<Signal<Reply>>,
        throttle_slack: Duration,
    ) -> Self {
        Self {
            spec,
            encoder,
            shared,
            inbox,
            outbox,
            throttle_slack,
            frame_seq: 0,
            last_present: None,
            skipped_mask: 0,
        }
    }

    pub(crate) fn spawn(self, factory: BackendFactory) -> GpuPortResult<JoinHandle<()>> {
        std::thread::Builder::new()
            .name(format!("gpuport-{}", self.spec.title))
            .spawn(move || self.run(factory))
            .map_err(|e| GpuPortError::init(format!("failed to spawn render worker: {e}")))
    }

    fn start_backend(&self, factory: BackendFactory) -> GpuPortResult<Box<dyn DisplayBackend>> {
        let mut backend = factory(&self.spec)?;
        let info = backend.info();
        if self.spec.height > info.max_rows {
            return Err(GpuPortError::config(format!(
                "node_length {} exceeds the {} rows of backend '{}'",
                self.spec.height, info.max_rows, info.name
            )));
        }
        backend.prepare(&self.spec)?;
        Ok(backend)
    }

    fn run(mut self, factory: BackendFactory) {
        let mut backend = match self.start_backend(factory) {
            Ok(backend) => backend,
            Err(err) => {
                tracing::debug!(%err, "render worker failed to start");
                self.outbox.wake(Reply::Ready(Err(err)));
                return;
            }
        };
        let info = backend.info();
        tracing::debug!(
            title = %self.spec.title,
            backend = %info.name,
            rows = self.spec.height,
            "render worker ready"
        );
        self.shared.clock.reset(Duration::ZERO);
        self.outbox.wake(Reply::Ready(Ok(info)));

        let mut timer = PhaseTimer::start();
        loop {
            let request = self.inbox.wait();
            timer.lap(&self.shared.stats, Phase::Caller);
            match request {
                Request::Stop => break,
                Request::Paint(sub) => self.paint(backend.as_mut(), sub, &mut timer),
            }
        }
        tracing::debug!(frames = self.frame_seq, "render worker stopped");
    }

    fn paint(&mut self, backend: &mut dyn DisplayBackend, sub: Submission, timer: &mut PhaseTimer) {
        let Submission {
            pixels,
            target_time,
            on_done,
            ack,
        } = sub;
        if ack {
            self.outbox.wake(Reply::Accepted);
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.render(backend, pixels.as_deref(), target_time, timer)
        }))
        .unwrap_or_else(|payload| {
            Err(GpuPortError::backend(format!(
                "render panicked: {}",
                panic_message(payload.as_ref())
            )))
        });
        if let Some(buf) = pixels {
            self.shared.recycle(buf);
        }
        if let Err(err) = &outcome {
            self.shared.stats.record_error();
            if err.is_fatal() {
                tracing::error!(frame = self.frame_seq + 1, %err, "frame not presented");
            } else {
                tracing::warn!(frame = self.frame_seq + 1, %err, "frame not presented");
            }
        }

        if let Some(cb) = on_done
            && catch_unwind(AssertUnwindSafe(move || cb(outcome))).is_err()
        {
            tracing::error!("paint completion callback panicked");
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(dirty = pixels.is_some()))]
    fn render(
        &mut self,
        backend: &mut dyn DisplayBackend,
        pixels: Option<&[u32]>,
        target_time: Option<Duration>,
        timer: &mut PhaseTimer,
    ) -> GpuPortResult<FrameInfo> {
        let shared = Arc::clone(&self.shared);
        let stats = &shared.stats;
        if let Some(pixels) = pixels {
            stats.record_dirty();
            self.encoder.sync_table(&shared.channels(), &mut shared.spares());

            let mut lock = backend.lock_surface()?;
            let pitch = lock.pitch();
            let encoded = self.encoder.encode(pixels, lock.words_mut(), pitch);
            timer.lap(stats, Phase::Encode);
            let uploaded = lock.release();
            timer.lap(stats, Phase::Update);
            let report = encoded?;
            uploaded?;
            self.note_skipped(report);
        }

        self.throttle(target_time);
        timer.lap(stats, Phase::Throttle);

        backend.present(ClipRect {
            x: 0,
            y: 0,
            width: PRESENT_WIDTH,
            height: self.spec.height,
        })?;
        timer.lap(stats, Phase::Present);

        let now = Instant::now();
        stats.record_frame(self.last_present.map(|prev| now - prev));
        self.last_present = Some(now);
        self.frame_seq += 1;
        Ok(FrameInfo {
            frame: self.frame_seq,
            presented_at: shared.clock.mark_present(),
        })
    }

    /// Sleep until the canvas clock reaches `target`, re-checking in shrinking steps.
    fn throttle(&self, target: Option<Duration>) {
        let Some(target) = target else {
            return;
        };
        loop {
            let Some(remaining) = target.checked_sub(self.shared.clock.elapsed()) else {
                break;
            };
            if remaining < self.throttle_slack || remaining.is_zero() {
                break;
            }
            let nap = remaining
                .saturating_sub(self.throttle_slack / 2)
                .max(Duration::from_micros(100));
            tracing::trace!(remaining_us = remaining.as_micros() as u64, "throttle");
            std::thread::sleep(nap);
        }
    }

    fn note_skipped(&mut self, report: EncodeReport) {
        if report.skipped_mask() == self.skipped_mask {
            return;
        }
        self.skipped_mask = report.skipped_mask();
        for x in report.skipped_channels() {
            let reason = self
                .encoder
                .channel_type(x)
                .map(|t| t.check_encodable())
                .unwrap_or_else(|| Err(GpuPortError::encode("no such channel")));
            if let Err(err) = reason {
                tracing::warn!(channel = x, %err, "channel skipped");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string payload")
}
