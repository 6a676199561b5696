//! Batches points into size- and time-bounded plaintext chunks.
//!
//! Sink failures are not observed here. A sink that needs retries or error
//! reporting does it itself; the batcher only hands chunks over and moves on.

use std::{mem, time::Duration};

use tokio::{
    sync::mpsc,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{
    codec::{encode_line, line_len},
    error::ConfigError,
    task::Stoppable,
    Point,
};

/// Longest ticker period; longer timeouts never fire before input closes.
const MAX_TICK: Duration = Duration::from_secs(30 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlueConfig {
    chunk_size: usize,
    chunk_timeout: Duration,
}
impl GlueConfig {
    pub fn new(chunk_size: usize, chunk_timeout: Duration) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::ZeroChunkSize);
        }
        if chunk_timeout.is_zero() {
            return Err(ConfigError::ZeroChunkTimeout);
        }
        Ok(Self {
            chunk_size,
            chunk_timeout,
        })
    }
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
    pub fn chunk_timeout(&self) -> Duration {
        self.chunk_timeout
    }
}

/// Receives finished chunks. Each chunk is non-empty and owned by the sink.
pub trait ChunkSink {
    fn send_chunk(&mut self, chunk: Vec<u8>);
}
impl<F> ChunkSink for F
where
    F: FnMut(Vec<u8>),
{
    fn send_chunk(&mut self, chunk: Vec<u8>) {
        self(chunk)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlushReason {
    Size,
    Timeout,
    Close,
    Manual,
}

#[derive(Debug)]
pub struct Batcher<S> {
    buf: Vec<u8>,
    chunk_size: usize,
    sink: S,
}
impl<S: ChunkSink> Batcher<S> {
    pub fn new(chunk_size: usize, sink: S) -> Self {
        Self {
            buf: vec![],
            chunk_size,
            sink,
        }
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Appends one line per sample.
    ///
    /// The size limit is checked before each line: a line that would push a
    /// non-empty buffer over `chunk_size` first flushes the buffer. A line is
    /// never split, so a single oversized line becomes a chunk on its own.
    pub fn push(&mut self, point: &Point) {
        for &sample in &point.samples {
            let len = line_len(&point.metric, sample);
            if !self.buf.is_empty() && self.buf.len() + len > self.chunk_size {
                self.flush_for(FlushReason::Size);
            }
            encode_line(&mut self.buf, &point.metric, sample);
        }
    }

    /// No-op on an empty buffer.
    pub fn flush(&mut self) {
        self.flush_for(FlushReason::Manual);
    }

    fn flush_for(&mut self, reason: FlushReason) {
        if self.buf.is_empty() {
            return;
        }
        let chunk = mem::take(&mut self.buf);
        debug!(bytes = chunk.len(), ?reason, "flushing chunk");
        self.sink.send_chunk(chunk);
    }
}

/// Runs until `input` closes or `cancel` fires.
///
/// A closed input flushes whatever is buffered. Cancellation returns at once
/// and drops the buffer.
pub async fn glue<S: ChunkSink>(
    mut input: mpsc::Receiver<Point>,
    config: GlueConfig,
    cancel: CancellationToken,
    sink: S,
) {
    let mut batcher = Batcher::new(config.chunk_size, sink);
    let period = config.chunk_timeout.min(MAX_TICK);
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        chunk_size = config.chunk_size,
        chunk_timeout = %humantime::format_duration(config.chunk_timeout),
        "glue started"
    );
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!(dropped_bytes = batcher.buffered(), "glue cancelled");
                return;
            }
            _ = ticker.tick() => batcher.flush_for(FlushReason::Timeout),
            point = input.recv() => match point {
                Some(point) => batcher.push(&point),
                None => break,
            },
        }
    }
    batcher.flush_for(FlushReason::Close);
    info!("glue input closed");
}

pub fn spawn_glue<S>(input: mpsc::Receiver<Point>, config: GlueConfig, sink: S) -> Stoppable
where
    S: ChunkSink + Send + 'static,
{
    Stoppable::start(move |cancel| glue(input, config, cancel, sink))
}
