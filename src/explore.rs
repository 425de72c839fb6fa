//! Traversal Scheduler
//!
//! Renders the top-level buckets of a store on a small pool of workers.
//!
//! ## Pipeline
//! ```text
//!  producer ──names──► worker 0 ──┐
//!  (one read tx,       worker 1 ──┼──fragments──► caller (arrival order)
//!   closes queue)      ...      ──┘        ▲
//!                                          │ closed once the wait-group
//!                      watcher ────────────┘ sees every worker finish
//! ```
//!
//! Both queues are rendezvous channels, so at most one name and one
//! fragment per worker are in flight. Fragments arrive in completion order,
//! not enumeration order; each fragment is whole.

use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::sync::WaitGroup;

use crate::config::ExploreConfig;
use crate::error::{MonkeyError, Result};
use crate::render::{render_fragment, Fragment, FragmentStatus};
use crate::store::Store;

/// Totals over one explore run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExploreSummary {
    /// Fragments delivered to the sink
    pub fragments: usize,

    /// Buckets that rendered
    pub rendered: usize,

    /// Names that no longer resolved to a bucket
    pub not_found: usize,

    /// Buckets whose render failed
    pub failed: usize,

    /// Leaves across all rendered buckets
    pub leaves: usize,
}

impl ExploreSummary {
    fn record(&mut self, fragment: &Fragment) {
        self.fragments += 1;
        match fragment.status {
            FragmentStatus::Rendered => self.rendered += 1,
            FragmentStatus::NotFound => self.not_found += 1,
            FragmentStatus::Failed => self.failed += 1,
        }
        self.leaves += fragment.leaves;
    }
}

/// Render every top-level bucket of `store`, handing fragments to `sink` as
/// they complete.
///
/// A sink error stops the run: workers notice the closed queue and exit, and
/// the error is returned.
pub fn explore<F>(store: &Store, config: &ExploreConfig, mut sink: F) -> Result<ExploreSummary>
where
    F: FnMut(Fragment) -> Result<()>,
{
    let workers = config.workers.max(1);
    let (name_tx, name_rx) = channel::bounded::<Vec<u8>>(0);
    let (result_tx, result_rx) = channel::bounded::<Fragment>(0);
    let wg = WaitGroup::new();

    thread::scope(|s| -> Result<ExploreSummary> {
        let producer = thread::Builder::new()
            .name("monkey-producer".to_string())
            .spawn_scoped(s, move || produce(store, name_tx))?;

        for id in 0..workers {
            let names = name_rx.clone();
            let results = result_tx.clone();
            let wg = wg.clone();
            thread::Builder::new()
                .name(format!("monkey-worker-{}", id))
                .spawn_scoped(s, move || {
                    work(id, store, config, names, results);
                    drop(wg);
                })?;
        }
        drop(name_rx);

        thread::Builder::new()
            .name("monkey-watcher".to_string())
            .spawn_scoped(s, move || {
                wg.wait();
                drop(result_tx);
                tracing::trace!("All workers finished, results queue closed");
            })?;

        // Owned here so an early return closes the queue before the scope joins
        let results = result_rx;
        let mut summary = ExploreSummary::default();
        for fragment in results.iter() {
            summary.record(&fragment);
            sink(fragment)?;
        }

        producer
            .join()
            .map_err(|_| MonkeyError::Worker("bucket enumeration panicked".to_string()))??;

        tracing::debug!(
            "Explored {}: {} buckets, {} not found, {} failed, {} leaves",
            store.path().display(),
            summary.rendered,
            summary.not_found,
            summary.failed,
            summary.leaves
        );
        Ok(summary)
    })
}

/// Render every top-level bucket and collect the fragments in arrival order
pub fn collect(store: &Store, config: &ExploreConfig) -> Result<Vec<Fragment>> {
    let mut fragments = Vec::new();
    explore(store, config, |fragment| {
        fragments.push(fragment);
        Ok(())
    })?;
    Ok(fragments)
}

/// Feed top-level names into the queue; dropping `names` closes it
fn produce(store: &Store, names: Sender<Vec<u8>>) -> Result<()> {
    store.view(|tx| {
        for name in tx.buckets() {
            if names.send(name.to_vec()).is_err() {
                tracing::debug!("Name queue closed early, stopping enumeration");
                break;
            }
        }
        Ok(())
    })
}

fn work(
    id: usize,
    store: &Store,
    config: &ExploreConfig,
    names: Receiver<Vec<u8>>,
    results: Sender<Fragment>,
) {
    tracing::trace!("Worker {} started", id);

    for name in names.iter() {
        let label = String::from_utf8_lossy(&name).into_owned();

        let fragment = store
            .view(|tx| match tx.bucket(&name) {
                None => Ok(Fragment::not_found(&label)),
                Some(bucket) => render_fragment(&label, bucket, config),
            })
            .unwrap_or_else(|e| {
                tracing::warn!("Could not render bucket {}: {}", label, e);
                Fragment::failed(&label, &e)
            });

        if results.send(fragment).is_err() {
            tracing::debug!("Worker {}: results queue closed, exiting", id);
            break;
        }
    }

    tracing::trace!("Worker {} finished", id);
}
