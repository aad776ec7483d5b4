//! `stream` command implementation.
//!
//! Reads from a streaming replica until it goes quiet, then asks it to stop
//! and waits for the acknowledgement.

use std::time::Duration;

use anyhow::Result;
use contracts::Query;
use producer::{shutdown_channel, MockBackend, Producer, StreamingProducer};
use tracing::{info, warn};

use super::signal::shutdown_signal;
use crate::cli::StreamArgs;
use crate::error::CliError;

/// Execute the `stream` command
pub async fn run_stream(args: &StreamArgs) -> Result<()> {
    let backend = MockBackend::uniform(args.label.as_str(), 0, args.interval_ms);
    let stream = StreamingProducer::new(Producer::new(backend), args.buffer);
    let (shutdown, listener) = shutdown_channel();

    info!(
        label = %args.label,
        interval_ms = args.interval_ms,
        idle_timeout_ms = args.idle_timeout_ms,
        "Starting stream"
    );
    let mut handle = stream.start(Query::new(&args.query), listener);

    let items = tokio::select! {
        items = handle.collect_until_idle(Duration::from_millis(args.idle_timeout_ms), args.max) => items,
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping stream");
            Vec::new()
        }
    };

    for item in &items {
        println!("#{:<3} {}", item.seq, item.result);
    }
    if items.len() < args.max {
        println!("You're too slow.");
    } else {
        println!("You're boring; I'm leaving.");
    }

    let ack = shutdown.shutdown("bye").await.map_err(CliError::from)?;
    println!("{} says: {}", ack.producer, ack.message);

    handle.terminated().await;
    handle.join().await;
    Ok(())
}
