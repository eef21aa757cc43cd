// ABOUTME: Progress events emitted while tables are created and copied
// ABOUTME: Observers decide how to render them; the engine never assumes a terminal

use tokio::sync::mpsc::UnboundedSender;

/// One step of a migration run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Rows are about to be copied; `total_chunks` is 1 when chunking is off
    TableStarted {
        table: String,
        total_rows: u64,
        total_chunks: u64,
    },
    /// A chunk was inserted and committed
    ChunkCopied {
        table: String,
        chunk_index: u64,
        total_chunks: u64,
        rows: u64,
    },
    TableFinished {
        table: String,
        rows: u64,
    },
    /// Schema was created but the table holds no rows
    TableSkipped {
        table: String,
    },
    Compacting,
    RunFinished {
        tables: usize,
        rows: u64,
    },
}

/// Receives progress events from the migration engine
pub trait ProgressObserver {
    fn notify(&mut self, event: &ProgressEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn notify(&mut self, _event: &ProgressEvent) {}
}

/// Writes every event as a debug-level tracing line
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl ProgressObserver for LogProgress {
    fn notify(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::ChunkCopied {
                table,
                chunk_index,
                total_chunks,
                rows,
            } => tracing::debug!(
                "Copied chunk {}/{} ({} rows) of table '{}'",
                chunk_index + 1,
                total_chunks,
                rows,
                table
            ),
            other => tracing::debug!("{:?}", other),
        }
    }
}

/// Forwards events to a channel, so a consumer can read them as a stream
impl ProgressObserver for UnboundedSender<ProgressEvent> {
    fn notify(&mut self, event: &ProgressEvent) {
        // A closed receiver only means nobody is watching any more
        let _ = self.send(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_observer_forwards_events() {
        let (mut tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tx.notify(&ProgressEvent::Compacting);
        tx.notify(&ProgressEvent::TableSkipped {
            table: "empty".into(),
        });
        drop(tx);

        assert_eq!(rx.recv().await, Some(ProgressEvent::Compacting));
        assert_eq!(
            rx.recv().await,
            Some(ProgressEvent::TableSkipped {
                table: "empty".into()
            })
        );
        assert_eq!(rx.recv().await, None);
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (mut tx, rx) = tokio::sync::mpsc::unbounded_channel();
        drop(rx);
        tx.notify(&ProgressEvent::Compacting);
    }
}
