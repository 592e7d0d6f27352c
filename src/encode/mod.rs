//! Signal encoders.

/// Pixel-to-surface bit-plane encoding for all channel protocols.
pub mod bitplane;
pub mod charlieplex;
