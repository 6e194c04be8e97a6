use std::{cell::RefCell, fs::File, io::Read, marker::PhantomData, path::Path};

use csv::{DeserializeRecordsIntoIter, ReaderBuilder, Trim};
use serde::de::DeserializeOwned;

use crate::{
    core::item::{ItemReader, ItemReaderResult},
    error::BatchError,
};

/// A CSV item reader deserializing one row per `read` call.
///
/// Parsing is delegated to the `csv` crate. A row that cannot be parsed or
/// deserialized is reported as `BatchError::ItemReader`.
///
/// ```
/// use batch_flow::item::csv::csv_reader::CsvItemReaderBuilder;
/// use batch_flow::core::item::ItemReader;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Payment {
///     account: String,
///     cents: i64,
/// }
///
/// let rows = "account;cents\nACC-1;1250\nACC-2;-300\n";
/// let payments = CsvItemReaderBuilder::new()
///     .has_headers(true)
///     .delimiter(b';')
///     .from_reader(rows.as_bytes());
///
/// let first: Payment = payments.read()?.expect("first row");
/// assert_eq!((first.account.as_str(), first.cents), ("ACC-1", 1250));
/// assert_eq!(payments.read()?.map(|p| p.cents), Some(-300));
/// assert!(payments.read()?.is_none());
/// # Ok::<(), batch_flow::BatchError>(())
/// ```
pub struct CsvItemReader<R, T> {
    records: RefCell<DeserializeRecordsIntoIter<R, T>>,
    _marker: PhantomData<T>,
}

impl<R: Read, T: DeserializeOwned> ItemReader<T> for CsvItemReader<R, T> {
    fn read(&self) -> ItemReaderResult<T> {
        match self.records.borrow_mut().next() {
            Some(Ok(record)) => Ok(Some(record)),
            Some(Err(error)) => Err(BatchError::ItemReader(error.to_string())),
            None => Ok(None),
        }
    }
}

pub struct CsvItemReaderBuilder {
    delimiter: u8,
    has_headers: bool,
}

impl Default for CsvItemReaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvItemReaderBuilder {
    pub fn new() -> Self {
        Self {
            delimiter: b',',
            has_headers: false,
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// When set, the first row names the fields and is not returned as an item.
    pub fn has_headers(mut self, yes: bool) -> Self {
        self.has_headers = yes;
        self
    }

    fn reader_builder(&self) -> ReaderBuilder {
        let mut builder = ReaderBuilder::new();
        builder
            .trim(Trim::All)
            .delimiter(self.delimiter)
            .has_headers(self.has_headers)
            .flexible(false);
        builder
    }

    pub fn from_reader<R: Read, T: DeserializeOwned>(self, rdr: R) -> CsvItemReader<R, T> {
        let records = self.reader_builder().from_reader(rdr).into_deserialize();

        CsvItemReader {
            records: RefCell::new(records),
            _marker: PhantomData,
        }
    }

    pub fn from_path<P: AsRef<Path>, T: DeserializeOwned>(
        self,
        path: P,
    ) -> Result<CsvItemReader<File, T>, BatchError> {
        let rdr = self
            .reader_builder()
            .from_path(path)
            .map_err(|error| BatchError::ItemReader(error.to_string()))?;

        Ok(CsvItemReader {
            records: RefCell::new(rdr.into_deserialize()),
            _marker: PhantomData,
        })
    }
}
