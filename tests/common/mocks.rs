//! Mocks of the job listener and of an order writer.
use mockall::mock;

use batch_flow::{
    BatchError,
    core::{
        item::{ItemWriter, ItemWriterResult},
        job::JobExecution,
        listener::JobExecutionListener,
    },
};

use super::Order;

mock! {
    pub Listener {}
    impl JobExecutionListener for Listener {
        fn before_job(&self, job_execution: &mut JobExecution) -> Result<(), BatchError>;
        fn after_job(&self, job_execution: &JobExecution) -> Result<(), BatchError>;
    }
}

mock! {
    pub Writer {}
    impl ItemWriter<Order> for Writer {
        fn write(&self, items: &[Order]) -> ItemWriterResult;
        fn flush(&self) -> ItemWriterResult;
        fn open(&self) -> ItemWriterResult;
        fn close(&self) -> ItemWriterResult;
    }
}
