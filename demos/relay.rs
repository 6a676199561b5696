//! Reads plaintext lines from stdin and relays them in batches.
//!
//! ```sh
//! printf 'a.b.c 1 100\n' | cargo run --example relay -- relay.toml
//! ```

use std::io::Write;

use anyhow::Context;
use points::{
    codec::decode_line,
    config::PipelineConfig,
    exporter::HttpExporter,
    glue::{spawn_glue, ChunkSink},
    throttle::throttle_points,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {path}"))?;
            PipelineConfig::from_toml_str(&text)?
        }
        None => PipelineConfig::default(),
    };
    let glue_config = config.glue_config()?;

    let (tx, input) = mpsc::channel(1024);
    let (paced, throttle) = throttle_points(input, config.rate, 1024);
    let (glue, exporter) = match &config.url {
        Some(url) => {
            let (exporter, handle) = HttpExporter::spawn(url.clone(), config.queue_len);
            (spawn_glue(paced, glue_config, exporter), Some(handle))
        }
        None => (spawn_glue(paced, glue_config, Stdout), None),
    };

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match decode_line(&line) {
            Ok(point) => {
                if tx.send(point).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!(error = %e, "skipping line"),
        }
    }
    drop(tx);
    throttle.join().await;
    glue.join().await;

    if let Some(handle) = exporter {
        let delivered = tokio::task::spawn_blocking(move || handle.join()).await??;
        eprintln!("- delivered {delivered} chunks");
    }
    Ok(())
}

struct Stdout;
impl ChunkSink for Stdout {
    fn send_chunk(&mut self, chunk: Vec<u8>) {
        let mut stdout = std::io::stdout().lock();
        if let Err(e) = stdout.write_all(&chunk).and_then(|()| stdout.flush()) {
            warn!(error = %e, "failed to write chunk");
        }
    }
}
