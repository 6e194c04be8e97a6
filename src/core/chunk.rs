use log::debug;

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum ChunkStatus {
    /// The chunk reached its configured size, more items may follow.
    Full,
    /// The reader reported the end of data while filling this chunk.
    Finished,
}

/// Ordered, bounded batch of items read in one pass.
pub struct Chunk<I> {
    items: Vec<I>,
    status: ChunkStatus,
    chunk_size: usize,
}

impl<I> Chunk<I> {
    pub fn new(chunk_size: usize) -> Chunk<I> {
        Chunk {
            items: Vec::with_capacity(chunk_size),
            status: ChunkStatus::Full,
            chunk_size,
        }
    }

    /// Adds an item and returns `true` once the chunk is full.
    pub fn add_item(&mut self, item: I) -> bool {
        self.items.push(item);
        if self.is_full() {
            debug!("Chunk full with {} items", self.items.len());
            self.status = ChunkStatus::Full;
            return true;
        }
        false
    }

    pub fn finish(&mut self) {
        debug!("End of data reached with {} items in chunk", self.items.len());
        self.status = ChunkStatus::Finished;
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.chunk_size
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn get_items(&self) -> &[I] {
        &self.items
    }

    pub fn get_status(&self) -> ChunkStatus {
        self.status
    }
}
