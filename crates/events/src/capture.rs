use crate::error::EventsError;
use crate::record::{EventRecord, Topic};
use crate::source::EventSource;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Events captured during one window, in arrival order. Not deduplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedEvents {
    pub records: Vec<EventRecord>,
}

impl CapturedEvents {
    pub fn count(&self, topic: Topic) -> usize {
        self.records.iter().filter(|r| r.topic == topic).count()
    }

    pub fn counts(&self) -> BTreeMap<Topic, usize> {
        Topic::ALL.iter().map(|t| (*t, self.count(*t))).collect()
    }
}

/// A running capture window.
///
/// A single task owns the record list while the window is open; `stop`
/// hands the list back through the task's join handle, so the reader never
/// sees it while it is still being written.
pub struct EventCapture {
    stop: CancellationToken,
    handle: JoinHandle<Vec<EventRecord>>,
}

impl EventCapture {
    pub async fn start(source: &dyn EventSource) -> Result<Self, EventsError> {
        let rx = source.subscribe().await?;
        let stop = CancellationToken::new();
        let handle = tokio::spawn(collect(rx, stop.clone()));
        tracing::debug!("event capture started");
        Ok(Self { stop, handle })
    }

    /// Closes the window and returns everything received up to now.
    pub async fn stop(self) -> Result<CapturedEvents, EventsError> {
        self.stop.cancel();
        let records = self
            .handle
            .await
            .map_err(|e| EventsError::CaptureTask(e.to_string()))?;
        tracing::info!(captured = records.len(), "event capture stopped");
        Ok(CapturedEvents { records })
    }
}

async fn collect(mut rx: mpsc::Receiver<EventRecord>, stop: CancellationToken) -> Vec<EventRecord> {
    let mut records = Vec::new();
    loop {
        tokio::select! {
            biased;
            msg = rx.recv() => match msg {
                Some(record) => records.push(record),
                None => break,
            },
            _ = stop.cancelled() => break,
        }
    }
    // Whatever was already buffered when the window closed still counts.
    while let Ok(record) = rx.try_recv() {
        records.push(record);
    }
    records
}
