//! GpuPort turns a video output into a 24-channel signal generator.
//!
//! Each of the 24 bits of a frame-buffer pixel drives one output line, so one video row
//! carries one node's worth of data on every channel at once. Channels speak either WS281X
//! (three video columns per data bit) or a UART framing used by charlieplexed SSR
//! controllers, whose dimming levels are packed into phase-angle display lists.
//!
//! - Describe channels with [`ChannelType`]
//! - Open a [`Canvas`] on a display backend
//! - [`Canvas::paint`] frames; read back [`Canvas::stats`]
#![forbid(unsafe_code)]
#![deny(missing_docs)]

/// Channel descriptors.
pub mod channel;
/// Bit-plane and charlieplex signal encoders.
pub mod encode;
mod foundation;
/// Display backends and the render pipeline.
pub mod render;

pub use crate::foundation::color;
pub use crate::foundation::config::{BackendKind, CanvasOpts, HeadlessOpts};
pub use crate::foundation::error::{GpuPortError, GpuPortResult};

pub use crate::channel::table::{ChannelFlags, ChannelTable, ChannelType, MAX_CHANNELS, Protocol};
pub use crate::encode::bitplane::{
    EncodeReport, EncoderConfig, FrameBuffer, PRESENT_WIDTH, SignalEncoder, WIDTH,
};
pub use crate::encode::charlieplex::{
    CharlieplexEncoder, DISPLAY_LIST_LEN, DisplayRow, NUM_LOADS, decode_display_list,
};
pub use crate::render::backend::{
    BackendFactory, ClipRect, DisplayBackend, DisplayInfo, LockedSurface, SurfaceLock,
    SurfaceSpec, backend_factory,
};
pub use crate::render::canvas::{Canvas, PaintOpts};
pub use crate::render::context::{ContextLease, GraphicsContext};
pub use crate::render::headless::{HeadlessBackend, HeadlessProbe, PresentedFrame};
pub use crate::render::stats::{FRAME_INTERVAL_SAMPLES, StatsSnapshot};
pub use crate::render::worker::{DoneCallback, FrameInfo};
