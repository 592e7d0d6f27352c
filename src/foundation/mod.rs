/// ARGB color helpers.
pub mod color;
/// Canvas options and JSON loading.
pub mod config;
/// Error and result types.
pub mod error;
