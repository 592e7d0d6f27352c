//! Display backends and the per-canvas render pipeline.
//!
//! A [`canvas::Canvas`] owns a worker thread that encodes submitted frames into a locked
//! surface, waits for the requested presentation time and flips.

/// Display backend trait, surface locking and backend selection.
pub mod backend;
/// Public canvas API.
pub mod canvas;
/// Resettable presentation clock.
pub mod clock;
pub mod context;
/// In-memory backend with simulated vsync.
pub mod headless;
/// FIFO hand-off between the caller and the worker.
pub mod signal;
/// Frame counters and phase timing.
pub mod stats;
pub(crate) mod worker;
