use std::{
    sync::mpsc::{self, SyncSender, TrySendError},
    thread::{self, JoinHandle},
};

use tracing::{debug, warn};

use crate::glue::ChunkSink;

/// Posts chunks to an HTTP ingestion endpoint from a dedicated thread.
///
/// Enqueueing never blocks. A full queue drops the chunk, and a failed POST
/// is logged and not retried.
#[derive(Debug, Clone)]
pub struct HttpExporter {
    tx: SyncSender<Vec<u8>>,
    url: String,
}
impl HttpExporter {
    pub fn spawn(url: String, queue_len: usize) -> (Self, ExporterHandle) {
        let (tx, rx) = mpsc::sync_channel::<Vec<u8>>(queue_len.max(1));
        let client = ureq::Agent::new();
        let worker_url = url.clone();
        let thread = thread::spawn(move || {
            let mut delivered = 0;
            // Blocking I/O
            for chunk in rx {
                match client.post(&worker_url).send_bytes(&chunk) {
                    Ok(_resp) => {
                        delivered += 1;
                        debug!(bytes = chunk.len(), url = %worker_url, "chunk exported");
                    }
                    Err(e) => {
                        warn!(error = %e, bytes = chunk.len(), url = %worker_url, "chunk export failed");
                    }
                }
            }
            delivered
        });
        (Self { tx, url }, ExporterHandle { thread })
    }
}
impl ChunkSink for HttpExporter {
    fn send_chunk(&mut self, chunk: Vec<u8>) {
        match self.tx.try_send(chunk) {
            Ok(()) => {}
            Err(TrySendError::Full(chunk)) => {
                warn!(bytes = chunk.len(), url = %self.url, "export queue full, dropping chunk");
            }
            Err(TrySendError::Disconnected(chunk)) => {
                warn!(bytes = chunk.len(), url = %self.url, "exporter stopped, dropping chunk");
            }
        }
    }
}

#[derive(Debug)]
pub struct ExporterHandle {
    thread: JoinHandle<u64>,
}
impl ExporterHandle {
    /// Waits until every [`HttpExporter`] clone is dropped and the queue is
    /// drained. Returns the number of chunks the endpoint accepted.
    ///
    /// Blocking.
    pub fn join(self) -> anyhow::Result<u64> {
        self.thread
            .join()
            .map_err(|_| anyhow::anyhow!("exporter thread panicked"))
    }
}
