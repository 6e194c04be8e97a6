#![allow(dead_code)]

mod mocks;

use std::cell::{Cell, RefCell};

pub use mocks::*;

use batch_flow::{
    BatchError,
    core::{
        decider::RecordCounter,
        item::{ItemProcessor, ItemProcessorResult, ItemReader, ItemReaderResult},
        job::{JobParameters, JobParametersBuilder},
    },
    item::memory::Entity,
};

pub fn parameters() -> JobParameters {
    JobParametersBuilder::new()
        .add_long("startAt", 1)
        .build()
        .expect("valid parameters")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Option<i64>,
    pub number: u32,
}

impl Entity for Order {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

/// Reader yielding orders numbered `1..=count` and counting its calls.
pub struct OrderReader {
    next: Cell<u32>,
    count: u32,
    calls: Cell<usize>,
}

impl OrderReader {
    pub fn new(count: u32) -> Self {
        Self {
            next: Cell::new(1),
            count,
            calls: Cell::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl ItemReader<Order> for OrderReader {
    fn read(&self) -> ItemReaderResult<Order> {
        self.calls.set(self.calls.get() + 1);
        let number = self.next.get();
        if number > self.count {
            return Ok(None);
        }
        self.next.set(number + 1);
        Ok(Some(Order { id: None, number }))
    }
}

/// Processor failing on one order number and filtering another.
#[derive(Default)]
pub struct OrderProcessor {
    pub fail_on: Option<u32>,
    pub filter: Option<u32>,
    pub seen: RefCell<Vec<u32>>,
}

impl ItemProcessor<Order, Order> for OrderProcessor {
    fn process(&self, order: &Order) -> ItemProcessorResult<Order> {
        self.seen.borrow_mut().push(order.number);
        if self.fail_on == Some(order.number) {
            return Err(BatchError::ItemProcessor(format!(
                "cannot process order {}",
                order.number
            )));
        }
        if self.filter == Some(order.number) {
            return Ok(None);
        }
        Ok(Some(order.clone()))
    }
}

/// Counter returning a fixed value whatever the predicate.
pub struct FixedCounter(pub u64);

impl RecordCounter<&'static str> for FixedCounter {
    fn count_matching(&self, _predicate: &&'static str) -> Result<u64, BatchError> {
        Ok(self.0)
    }
}
