//! Periodic sweep and heartbeat.
//!
//! Two loops run side by side until the shutdown signal flips:
//!
//! - **Sweep loop**: every `sweep_interval`, sweep if `generated/` holds a
//!   file written after the last sweep started and older than a small
//!   buffer, then push the fresh report receipt to trusted peers.
//! - **Heartbeat loop**: every `heartbeat_interval`, push the latest report
//!   receipt to trusted peers.
//!
//! Neither loop ever exits on error. Failures are logged and the next tick
//! retries.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use dis_ledger_core::{parse_timestamp, Receipt, VERIFY_ACTION};
use dis_ledger_store::{Area, KeyStore, ReceiptStore};
use dis_ledger_sync::{Heartbeat, HeartbeatReport, PeerTransport};

use crate::error::Result;
use crate::ledger::Ledger;
use crate::sweep::SweepOutput;

/// Outcome of one scheduled sweep attempt.
#[derive(Debug, Clone)]
pub enum SweepOutcome {
    /// Nothing new and settled since the last sweep started.
    Skipped {
        latest: Option<DateTime<Utc>>,
        marker: DateTime<Utc>,
    },
    Completed(Box<SweepOutput>),
}

impl SweepOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, SweepOutcome::Skipped { .. })
    }
}

/// Drives the ledger's background work.
pub struct Scheduler<S: ReceiptStore, K: KeyStore, T: PeerTransport> {
    ledger: Arc<Ledger<S, K>>,
    heartbeat: Heartbeat<T>,
    sweep_interval: Duration,
    heartbeat_interval: Duration,
    skip_buffer: chrono::Duration,
}

impl<S, K, T> Scheduler<S, K, T>
where
    S: ReceiptStore + 'static,
    K: KeyStore + 'static,
    T: PeerTransport + 'static,
{
    pub fn new(ledger: Arc<Ledger<S, K>>, transport: Arc<T>) -> Self {
        let config = ledger.config();
        let skip_buffer = chrono::Duration::from_std(Duration::from_secs(config.skip_buffer_secs))
            .unwrap_or_else(|_| chrono::Duration::zero());
        Self {
            heartbeat: Heartbeat::new(transport, ledger.network().clone(), ledger.trust().clone()),
            sweep_interval: config.sweep_interval(),
            heartbeat_interval: config.heartbeat_interval(),
            skip_buffer,
            ledger,
        }
    }

    /// Sweep unless nothing changed since the last completed sweep.
    ///
    /// The marker is the instant the last sweep listed `generated/`, so a
    /// receipt written while that sweep ran still counts as new. This node's
    /// own verification receipts issued since the marker do not. New files
    /// younger than the skip buffer are left for the next cycle; they are
    /// never lost because the marker only moves when a sweep runs.
    ///
    /// A missing or unreadable marker means "never swept".
    pub async fn sweep_if_needed(&self) -> Result<SweepOutcome> {
        let store = self.ledger.store();

        let marker = match store.load_marker().await {
            Ok(marker) => marker,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable verification marker");
                None
            }
        };

        if let Some(marker) = marker {
            let pending = self.pending_since(marker).await?;
            let unsettled = store
                .modified_after(Area::Generated, Utc::now() - self.skip_buffer)
                .await?;
            let settled = pending.iter().filter(|name| !unsettled.contains(name)).count();
            if settled == 0 {
                let latest = store.latest_modified(Area::Generated).await?;
                tracing::debug!(
                    ?latest,
                    %marker,
                    pending = pending.len(),
                    "no settled new receipts, sweep skipped"
                );
                return Ok(SweepOutcome::Skipped { latest, marker });
            }
        }

        let output = self.ledger.verify_all().await?;
        if let Err(e) = store.save_marker(output.started_at).await {
            tracing::error!(error = %e, "failed to save verification marker");
        }
        Ok(SweepOutcome::Completed(Box::new(output)))
    }

    /// Files in `generated/` modified after `marker`, minus the reports of
    /// sweeps that started at or after it.
    async fn pending_since(&self, marker: DateTime<Utc>) -> Result<Vec<String>> {
        let store = self.ledger.store();
        let node_id = &self.ledger.config().node_id;

        let mut pending = Vec::new();
        for name in store.modified_after(Area::Generated, marker).await? {
            let own_report = match store.read(Area::Generated, &name).await {
                Ok(bytes) => Receipt::from_json(&bytes).is_ok_and(|r| {
                    r.action == VERIFY_ACTION
                        && r.actor == *node_id
                        && parse_timestamp(&r.created_at).is_ok_and(|at| at >= marker)
                }),
                Err(_) => false,
            };
            if !own_report {
                pending.push(name);
            }
        }
        Ok(pending)
    }

    /// One sweep-loop tick: sweep if needed, then publish a fresh report.
    pub async fn cycle(&self) -> Result<(SweepOutcome, Option<HeartbeatReport>)> {
        let outcome = self.sweep_if_needed().await?;
        let heartbeat = match &outcome {
            SweepOutcome::Completed(output) => Some(self.heartbeat.publish(&output.receipt).await),
            SweepOutcome::Skipped { .. } => None,
        };
        Ok((outcome, heartbeat))
    }

    /// One heartbeat-loop tick: publish the latest report receipt, if any.
    pub async fn heartbeat_once(&self) -> Result<Option<HeartbeatReport>> {
        match self.ledger.latest_report_receipt().await? {
            Some(receipt) => Ok(Some(self.heartbeat.publish(&receipt).await)),
            None => {
                tracing::debug!("no report receipt yet, heartbeat skipped");
                Ok(None)
            }
        }
    }

    /// Run both loops until `shutdown` becomes `true` or its sender is dropped.
    ///
    /// The first sweep runs immediately; the first heartbeat one interval later.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                sweep_interval = ?self.sweep_interval,
                heartbeat_interval = ?self.heartbeat_interval,
                "scheduler started"
            );
            tokio::join!(
                self.sweep_loop(shutdown.clone()),
                self.heartbeat_loop(shutdown)
            );
            tracing::info!("scheduler stopped");
        })
    }

    async fn sweep_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now(), self.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = ticker.tick() => {
                    match self.cycle().await {
                        Ok((SweepOutcome::Completed(output), Some(beat))) => {
                            tracing::info!(
                                invalid = output.report.invalid,
                                peers_ok = beat.ok,
                                peers_failed = beat.invalid + beat.unreachable,
                                "scheduled sweep finished"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!(error = %e, "scheduled sweep failed"),
                    }
                }
            }
        }
    }

    async fn heartbeat_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval_at(
            Instant::now() + self.heartbeat_interval,
            self.heartbeat_interval,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.heartbeat_once().await {
                        tracing::error!(error = %e, "heartbeat failed");
                    }
                }
            }
        }
    }
}

/// Resolves once shutdown is requested or the sender is gone.
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
