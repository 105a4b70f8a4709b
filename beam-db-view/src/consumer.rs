//! Partition consumer task
//!
//! Tails one log partition and applies records to its view in strict offset
//! order. Malformed records are counted and skipped; an offset gap is fatal
//! for the partition (the view halts and readers get `ViewUnavailable`
//! until an operator intervenes).

use crate::view::View;
use beam_db_core::record::LogRecord;
use beam_db_log::{LogBroker, Offset};
use std::sync::Arc;

/// Background task that folds a partition's log into its view.
pub struct ViewConsumer {
    view: Arc<View>,
    broker: Arc<dyn LogBroker>,
    from: Offset,
}

impl ViewConsumer {
    /// Consumer for `view`'s partition starting at offset `from`
    pub fn new(view: Arc<View>, broker: Arc<dyn LogBroker>, from: Offset) -> Self {
        Self { view, broker, from }
    }

    /// Spawn the consumer as a background tokio task.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    async fn run(&self) {
        let partition = self.view.partition();
        let mut cursor = match self.broker.tail(partition, self.from).await {
            Ok(cursor) => cursor,
            Err(e) => {
                self.view.halt(&format!("tail failed: {e}"));
                return;
            }
        };
        tracing::info!(partition, from = self.from, "view consumer started");

        let mut expected = self.from;
        loop {
            let (offset, payload) = match cursor.next().await {
                Ok(next) => next,
                Err(e) => {
                    self.view.halt(&format!("log tail failed: {e}"));
                    return;
                }
            };

            if offset != expected {
                // A gap means lost records; materialized state would diverge.
                self.view.halt(&format!(
                    "log gap: expected offset {expected}, got {offset}"
                ));
                return;
            }
            expected = offset + 1;

            match LogRecord::decode(&payload) {
                Ok(record) => {
                    tracing::trace!(partition, offset, kind = record.kind_tag(), "applying");
                    self.view.apply(offset, &record);
                }
                Err(e) => {
                    tracing::warn!(
                        partition,
                        offset,
                        error = %e,
                        "skipping malformed record"
                    );
                    self.view.record_malformed(offset);
                }
            }
        }
    }
}
