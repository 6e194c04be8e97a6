//! CSV support for reading tabular records.
//!
//! [`csv_reader::CsvItemReader`] deserializes each CSV row into a Rust struct
//! with serde, so it can feed any chunk-oriented step.

/// A module providing facilities for reading CSV data records.
pub mod csv_reader;
