#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # Batch Flow

 Batch jobs built from chunk steps, tasklet steps and deciders, connected by
 an outcome-driven flow graph that is validated before anything runs.

 ## Core Concepts

- **Job:** a named flow of steps and deciders. Each run produces a `JobExecution`
  with a final status (`COMPLETED`, `FAILED` or `STOPPED`).
- **Step:** a unit of work. A chunk step reads, processes and writes items in
  fixed-size chunks, one transaction per chunk. A tasklet step runs a single
  unit of work inside one transaction.
- **Decider:** a read-only node returning an outcome token (`PROCESS`,
  `NO_PENDING`, ...) that selects the next node.
- **Flow:** the graph linking nodes on outcome tokens. A node without any
  outgoing transition ends the job.
- **Listener:** observer called before and after each job run.
- **ItemReader / ItemProcessor / ItemWriter:** the source, transform and sink of
  a chunk step. A processor returning `None` filters the item out.

 ## Features

| **Feature**   | **Description**                                     |
|---------------|-----------------------------------------------------|
| csv           | Enables the CSV `ItemReader`                        |
| full          | Enables all available features                      |

 ## Getting Started

```rust
# use batch_flow::{
#     core::{
#         item::{ItemReader, ItemReaderResult, PassThroughProcessor},
#         job::{BatchStatus, Job, JobBuilder, JobParametersBuilder},
#         step::StepBuilder,
#     },
#     item::memory::{Entity, InMemoryRepository},
#     BatchError,
# };
# use std::cell::Cell;
#[derive(Clone, Debug)]
struct Ticket {
    id: Option<i64>,
}

impl Entity for Ticket {
    fn id(&self) -> Option<i64> {
        self.id
    }

    fn assign_id(&mut self, id: i64) {
        self.id = Some(id);
    }
}

struct TicketSource {
    remaining: Cell<u32>,
}

impl ItemReader<Ticket> for TicketSource {
    fn read(&self) -> ItemReaderResult<Ticket> {
        match self.remaining.get() {
            0 => Ok(None),
            n => {
                self.remaining.set(n - 1);
                Ok(Some(Ticket { id: None }))
            }
        }
    }
}

fn main() -> Result<(), BatchError> {
    let source = TicketSource { remaining: Cell::new(7) };
    let processor = PassThroughProcessor::<Ticket>::new();
    let repository: InMemoryRepository<Ticket> = InMemoryRepository::new();

    let step = StepBuilder::new("importTickets")
        .chunk::<Ticket, Ticket>(5)
        .reader(&source)
        .processor(&processor)
        .writer(&repository)
        .transaction_manager(&repository)
        .build()?;

    let job = JobBuilder::new().name("ticketJob").start(&step).build()?;
    let parameters = JobParametersBuilder::new().add_run_timestamp("startAt").build()?;
    let execution = job.run(parameters)?;

    assert_eq!(execution.status, BatchStatus::Completed);
    assert_eq!(repository.count()?, 7);

    Ok(())
}
```

 ## Demos
+ `banking_transactions`: imports a CSV of transactions, then routes on pending work
+ `log_aggregation`: imports log lines and counts them per level and day

 */

/// Core module for batch operations
pub mod core;

/// Error types for batch operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Set of items readers / writers (csv reader, in-memory repository)
pub mod item;

/// Banking transaction import and processing job
pub mod banking;

/// Log import and aggregation job
pub mod logs;
