use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::{ApiError, PredictionClient};
use crate::model::PredictionRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FetchOrigin {
    Manual,
    Poll,
}

/// Result of one fetch, stamped with the sequence number it was issued
/// under so the applier can discard out-of-order responses.
#[derive(Debug)]
pub(crate) struct FetchOutcome {
    pub(crate) seq: u64,
    pub(crate) origin: FetchOrigin,
    pub(crate) location: String,
    pub(crate) result: Result<PredictionRecord, ApiError>,
    pub(crate) at: DateTime<Local>,
}

/// Hands out request sequence numbers; stamped at request start, newest
/// applied response wins.
#[derive(Clone, Debug, Default)]
pub(crate) struct SeqCounter(Arc<AtomicU64>);

impl SeqCounter {
    pub(crate) fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Runs one fetch in the background and reports back over the channel.
pub(crate) fn spawn_fetch(
    client: PredictionClient,
    location: String,
    origin: FetchOrigin,
    seq: u64,
    tx: mpsc::Sender<FetchOutcome>,
) {
    tokio::spawn(async move {
        let result = client.fetch_prediction(&location).await;
        let outcome = FetchOutcome {
            seq,
            origin,
            location,
            result,
            at: Local::now(),
        };
        tx.send(outcome).await.ok();
    });
}

/// Idle/Armed refresh loop for the current target location. Armed holds the
/// one live timer task; re-arming or disarming cancels it first, so two
/// timers can never run at once.
pub(crate) struct Poller {
    period: Duration,
    counter: SeqCounter,
    task: Option<JoinHandle<()>>,
    location: Option<String>,
}

impl Poller {
    pub(crate) fn new(period: Duration, counter: SeqCounter) -> Self {
        Self {
            period,
            counter,
            task: None,
            location: None,
        }
    }

    pub(crate) fn is_armed(&self) -> bool {
        self.task.is_some()
    }

    pub(crate) fn target(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub(crate) fn arm(
        &mut self,
        location: &str,
        client: PredictionClient,
        tx: mpsc::Sender<FetchOutcome>,
    ) {
        // Re-submitting the same location keeps the running timer and its
        // cadence; only a changed target restarts the interval.
        if self.is_armed() && self.target() == Some(location) {
            return;
        }
        self.disarm();

        let loc = location.to_string();
        let counter = self.counter.clone();
        let period = self.period;
        self.location = Some(loc.clone());
        self.task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately; the manual fetch that
            // armed us already supplied data.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let seq = counter.next();
                debug!(location = %loc, seq, "poll tick");
                let result = client.fetch_prediction(&loc).await;
                let outcome = FetchOutcome {
                    seq,
                    origin: FetchOrigin::Poll,
                    location: loc.clone(),
                    result,
                    at: Local::now(),
                };
                if tx.send(outcome).await.is_err() {
                    break;
                }
            }
        }));
    }

    pub(crate) fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.location = None;
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_are_monotonic() {
        let counter = SeqCounter::default();
        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
        let clone = counter.clone();
        assert_eq!(clone.next(), 3);
        assert_eq!(counter.next(), 4);
    }

    #[tokio::test]
    async fn rearming_replaces_the_single_timer() {
        let client = PredictionClient::new("http://127.0.0.1:9").unwrap();
        let (tx, _rx) = mpsc::channel(4);
        let mut poller = Poller::new(Duration::from_secs(3600), SeqCounter::default());

        assert!(!poller.is_armed());
        poller.arm("Kishtwar", client.clone(), tx.clone());
        assert!(poller.is_armed());
        assert_eq!(poller.target(), Some("Kishtwar"));

        // Same location: the running timer is kept.
        poller.arm("Kishtwar", client.clone(), tx.clone());
        assert!(poller.is_armed());
        assert_eq!(poller.target(), Some("Kishtwar"));

        poller.arm("Leh", client, tx);
        assert!(poller.is_armed());
        assert_eq!(poller.target(), Some("Leh"));

        poller.disarm();
        assert!(!poller.is_armed());
        assert_eq!(poller.target(), None);
    }
}
