/// Per-channel protocol descriptors.
pub mod table;
