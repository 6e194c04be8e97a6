#[cfg(feature = "csv")]
/// This module provides a CSV item reader.
pub mod csv;

/// In-memory repository usable as a transactional item writer.
pub mod memory;
