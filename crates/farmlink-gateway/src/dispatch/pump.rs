//! Dispatcher pump.
//!
//! Many WebSocket sessions feed one bounded inbox; a single blocking thread
//! owns the `Dispatcher` and handles envelopes strictly one after another.
//! A failed message is logged and counted, never retried, and never stops
//! the pump.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use farmlink_core::protocol::Envelope;

use crate::dispatch::Dispatcher;
use crate::obs::metrics::GatewayMetrics;

/// Drain `inbox` until every sender is dropped.
pub fn run(mut dispatcher: Dispatcher, mut inbox: mpsc::Receiver<Envelope>, metrics: &GatewayMetrics) {
    while let Some(env) = inbox.blocking_recv() {
        let started = Instant::now();
        match dispatcher.handle_message(&env) {
            Ok(outcome) => {
                metrics.messages.inc(&[("outcome", outcome.label())]);
            }
            Err(e) => {
                tracing::warn!(sender = env.sender(), error = %e, "dispatch failed");
                metrics.messages.inc(&[("outcome", "failed")]);
                metrics.dispatch_errors.inc(&[("kind", e.kind())]);
            }
        }
        metrics.dispatch_duration.observe(&[], started.elapsed());
    }
    tracing::info!("dispatcher inbox closed, pump stopped");
}

/// Run the pump on a dedicated blocking thread.
pub fn spawn(
    dispatcher: Dispatcher,
    inbox: mpsc::Receiver<Envelope>,
    metrics: Arc<GatewayMetrics>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || run(dispatcher, inbox, &metrics))
}
