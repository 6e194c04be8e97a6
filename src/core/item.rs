use std::marker::PhantomData;

use crate::error::BatchError;

/// Result of a single read: `Ok(None)` signals the end of data, which is not an error.
pub type ItemReaderResult<I> = Result<Option<I>, BatchError>;

/// Result of processing one item: `Ok(None)` means the item was filtered out.
pub type ItemProcessorResult<O> = Result<Option<O>, BatchError>;

pub type ItemWriterResult = Result<(), BatchError>;

/// Source of items for a chunk-oriented step, one item at a time.
///
/// Implementations must be safely re-callable until they return `Ok(None)`.
/// The step never calls `read` again once the end of data has been reported.
pub trait ItemReader<I> {
    fn read(&self) -> ItemReaderResult<I>;
}

/// Business logic applied to each item between read and write.
///
/// Returning `Ok(None)` drops the item from the chunk. This is a normal skip
/// counted as a filtered item. Returning `Err` fails the whole chunk.
pub trait ItemProcessor<I, O> {
    fn process(&self, item: &I) -> ItemProcessorResult<O>;
}

/// Sink for the surviving items of a chunk.
///
/// `write` receives the whole chunk as one batch. The batch is the unit of
/// durability and is made permanent by the enclosing chunk transaction.
pub trait ItemWriter<O> {
    fn write(&self, items: &[O]) -> ItemWriterResult;

    fn flush(&self) -> ItemWriterResult {
        Ok(())
    }

    fn open(&self) -> ItemWriterResult {
        Ok(())
    }

    fn close(&self) -> ItemWriterResult {
        Ok(())
    }
}

/// Processor that hands every item to the writer unchanged.
pub struct PassThroughProcessor<T> {
    _marker: PhantomData<T>,
}

impl<T> PassThroughProcessor<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for PassThroughProcessor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> ItemProcessor<T, T> for PassThroughProcessor<T> {
    fn process(&self, item: &T) -> ItemProcessorResult<T> {
        Ok(Some(item.clone()))
    }
}
