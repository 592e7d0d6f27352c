use std::fmt;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::channel::table::{ChannelTable, ChannelType};
use crate::encode::bitplane::{EncoderConfig, SignalEncoder, WIDTH};
use crate::foundation::config::CanvasOpts;
use crate::foundation::error::{GpuPortError, GpuPortResult};
use crate::render::backend::{BackendFactory, DisplayInfo, SurfaceSpec, backend_factory};
use crate::render::signal::Signal;
use crate::render::stats::StatsSnapshot;
use crate::render::worker::{
    DoneCallback, FrameInfo, Reply, Request, Shared, Submission, Worker,
};

/// How often a blocked caller checks that the worker is still alive.
const LIVENESS_POLL: Duration = Duration::from_millis(100);

/// Per-submission options for [`Canvas::paint`].
#[derive(Default)]
pub struct PaintOpts {
    /// Do not present before the canvas clock reaches this time.
    pub target_time: Option<Duration>,
    /// Run after the frame is presented (or failed). Makes the paint non-blocking.
    pub on_done: Option<DoneCallback>,
}

impl PaintOpts {
    /// Present no earlier than `target` on the canvas clock.
    pub fn at(target: Duration) -> Self {
        Self {
            target_time: Some(target),
            on_done: None,
        }
    }

    /// Attach a completion callback.
    pub fn on_done(
        mut self,
        callback: impl FnOnce(GpuPortResult<FrameInfo>) + Send + 'static,
    ) -> Self {
        self.on_done = Some(Box::new(callback));
        self
    }
}

impl fmt::Debug for PaintOpts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaintOpts")
            .field("target_time", &self.target_time)
            .field("on_done", &self.on_done.is_some())
            .finish()
    }
}

/// A 24-channel signal generator bound to one display backend.
///
/// Each canvas owns one worker thread. Frames submitted with [`paint`](Self::paint) are
/// encoded, uploaded and presented strictly in order; dropping the canvas lets queued frames
/// finish and then joins the worker.
pub struct Canvas {
    title: String,
    num_channels: usize,
    node_length: usize,
    info: DisplayInfo,
    shared: Arc<Shared>,
    inbox: Arc<Signal<Request>>,
    outbox: Arc<Signal<Reply>>,
    worker: Option<JoinHandle<()>>,
}

impl Canvas {
    /// Canvas on the backend selected by `opts.backend`.
    pub fn new(
        title: &str,
        num_channels: usize,
        node_length: usize,
        opts: CanvasOpts,
    ) -> GpuPortResult<Self> {
        opts.validate()?;
        let factory = backend_factory(opts.backend, &opts);
        Self::with_backend(title, num_channels, node_length, opts, factory)
    }

    /// Canvas on a caller-supplied backend, built on the worker thread by `factory`.
    ///
    /// Blocks until the backend is ready. Geometry or backend failures are returned here and
    /// leave no worker running.
    #[tracing::instrument(skip(opts, factory))]
    pub fn with_backend(
        title: &str,
        num_channels: usize,
        node_length: usize,
        opts: CanvasOpts,
        factory: BackendFactory,
    ) -> GpuPortResult<Self> {
        let encoder = SignalEncoder::new(num_channels, node_length, EncoderConfig::from(&opts))?;
        let shared = Arc::new(Shared::new(ChannelTable::new(num_channels)?));
        let inbox = Arc::new(Signal::new());
        let outbox = Arc::new(Signal::new());
        let spec = SurfaceSpec {
            title: title.to_string(),
            width: WIDTH,
            height: node_length,
        };
        let worker = Worker::new(
            spec,
            encoder,
            Arc::clone(&shared),
            Arc::clone(&inbox),
            Arc::clone(&outbox),
            Duration::from_millis(opts.throttle_slack_ms),
        );
        let handle = worker.spawn(factory)?;

        let ready = wait_reply(&outbox, &handle);
        let info = match ready {
            Ok(Reply::Ready(Ok(info))) => info,
            Ok(Reply::Ready(Err(err))) => {
                join_worker(handle);
                return Err(err);
            }
            Ok(Reply::Accepted) => {
                inbox.wake(Request::Stop);
                join_worker(handle);
                return Err(GpuPortError::init("render worker answered out of turn"));
            }
            Err(err) => {
                join_worker(handle);
                return Err(err);
            }
        };

        Ok(Self {
            title: title.to_string(),
            num_channels,
            node_length,
            info,
            shared,
            inbox,
            outbox,
            worker: Some(handle),
        })
    }

    /// Submit a frame.
    ///
    /// `pixels` holds `num_channels * node_length` ARGB colors, channel-major
    /// (`pixels[channel * node_length + node]`); `None` re-presents the previous frame. The
    /// pixels are copied before this returns. Without a callback the call blocks until the
    /// worker has accepted the frame; with one it returns immediately and the callback
    /// reports the outcome. Fails without queueing anything once the canvas is closed or its
    /// worker has exited.
    pub fn paint(&self, pixels: Option<&[u32]>, opts: PaintOpts) -> GpuPortResult<()> {
        let Some(handle) = &self.worker else {
            return Err(GpuPortError::config("canvas is closed"));
        };
        if handle.is_finished() {
            return Err(GpuPortError::init("render worker has exited"));
        }
        let expected = self.num_channels * self.node_length;
        let pixels = match pixels {
            Some(px) if px.len() != expected => {
                return Err(GpuPortError::config(format!(
                    "pixel array has {} entries, expected {} x {} = {expected}",
                    px.len(),
                    self.num_channels,
                    self.node_length
                )));
            }
            Some(px) => Some(self.shared.copy_pixels(px)),
            None => None,
        };
        let ack = opts.on_done.is_none();
        self.inbox.wake(Request::Paint(Submission {
            pixels,
            target_time: opts.target_time,
            on_done: opts.on_done,
            ack,
        }));
        if ack {
            match wait_reply(&self.outbox, handle)? {
                Reply::Accepted => {}
                Reply::Ready(_) => {
                    return Err(GpuPortError::init("render worker answered out of turn"));
                }
            }
        }
        Ok(())
    }

    /// Descriptor of channel `index`, `None` when out of range.
    pub fn channel_type(&self, index: usize) -> Option<ChannelType> {
        self.shared.channels().get(index)
    }

    /// Replace the descriptor of channel `index`, returning the previous one (`None` when
    /// out of range). Takes effect from the next submitted frame.
    pub fn set_channel_type(&self, index: usize, new_type: ChannelType) -> Option<ChannelType> {
        self.shared.set_channel_type(index, new_type)
    }

    /// Encoded surface width in words (always 72).
    pub fn width(&self) -> usize {
        WIDTH
    }

    /// Encoded surface height in rows (`node_length`).
    pub fn height(&self) -> usize {
        self.node_length
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.num_channels
    }

    /// Title given at construction.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Facts reported by the backend at startup.
    pub fn display_info(&self) -> &DisplayInfo {
        &self.info
    }

    /// Current canvas clock reading.
    pub fn elapsed(&self) -> Duration {
        self.shared.clock.elapsed()
    }

    /// Rebase the canvas clock so it reads `elapsed` now.
    pub fn reset_elapsed(&self, elapsed: Duration) {
        self.shared.clock.reset(elapsed);
    }

    /// Timestamp of the latest present, `None` before the first one.
    pub fn present_time(&self) -> Option<Duration> {
        self.shared.clock.last_present()
    }

    /// Statistics report.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.stats.snapshot(self.elapsed())
    }

    /// Zero every statistics counter.
    pub fn clear_stats(&self) {
        self.shared.stats.clear();
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.worker.is_none()
    }

    /// Let queued frames finish, stop the worker and release the backend.
    ///
    /// Safe to call more than once.
    pub fn close(&mut self) {
        let Some(handle) = self.worker.take() else {
            return;
        };
        tracing::debug!(title = %self.title, queued = self.inbox.pending(), "closing canvas");
        self.inbox.wake(Request::Stop);
        join_worker(handle);
        tracing::debug!(title = %self.title, "canvas closed");
    }
}

impl Drop for Canvas {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("title", &self.title)
            .field("num_channels", &self.num_channels)
            .field("node_length", &self.node_length)
            .field("backend", &self.info.name)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn wait_reply(outbox: &Signal<Reply>, handle: &JoinHandle<()>) -> GpuPortResult<Reply> {
    loop {
        if let Some(reply) = outbox.wait_timeout(LIVENESS_POLL) {
            return Ok(reply);
        }
        if handle.is_finished() {
            return outbox
                .try_take()
                .ok_or_else(|| GpuPortError::init("render worker exited unexpectedly"));
        }
    }
}

fn join_worker(handle: JoinHandle<()>) {
    if handle.join().is_err() {
        tracing::error!("render worker panicked");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/canvas.rs"]
mod tests;
