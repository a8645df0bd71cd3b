//! Polling change subscription over [`CatalogClient::list_all`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::catalog::CatalogClient;
use crate::domain::Project;
use crate::store::CatalogStore;

#[derive(Debug, Clone, PartialEq)]
pub enum CatalogEvent {
    /// Full ordered catalog, sent on the first poll and on every change.
    Snapshot(Vec<Project>),
    Failed(String),
}

pub struct SnapshotWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SnapshotWatcher {
    pub fn spawn<S>(
        catalog: Arc<CatalogClient<S>>,
        interval: Duration,
    ) -> (Self, Receiver<CatalogEvent>)
    where
        S: CatalogStore + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::spawn(move || poll_loop(catalog, interval, flag, tx));
        (
            Self {
                stop,
                handle: Some(handle),
            },
            rx,
        )
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for SnapshotWatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn poll_loop<S: CatalogStore>(
    catalog: Arc<CatalogClient<S>>,
    interval: Duration,
    stop: Arc<AtomicBool>,
    tx: Sender<CatalogEvent>,
) {
    let mut last: Option<Vec<Project>> = None;
    let mut failing = false;
    while !stop.load(Ordering::SeqCst) {
        let event = match catalog.list_all() {
            Ok(projects) => {
                failing = false;
                if last.as_ref() == Some(&projects) {
                    None
                } else {
                    last = Some(projects.clone());
                    Some(CatalogEvent::Snapshot(projects))
                }
            }
            Err(err) => {
                warn!(error = %err, "catalog watch poll failed");
                // Report a failure once per outage; the first success after
                // it always resends the snapshot.
                last = None;
                let first = !failing;
                failing = true;
                first.then(|| CatalogEvent::Failed(err.to_string()))
            }
        };
        if let Some(event) = event {
            if tx.send(event).is_err() {
                debug!("catalog watch receiver dropped");
                return;
            }
        }
        sleep_until_stopped(interval, &stop);
    }
}

fn sleep_until_stopped(interval: Duration, stop: &AtomicBool) {
    const SLICE: Duration = Duration::from_millis(25);
    let mut remaining = interval;
    while !remaining.is_zero() && !stop.load(Ordering::SeqCst) {
        let step = remaining.min(SLICE);
        thread::sleep(step);
        remaining = remaining.saturating_sub(step);
    }
}
