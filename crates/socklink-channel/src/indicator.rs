use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Receives the actual show/hide effects of the busy indicator.
///
/// What "show" means is the host's business (the original renders a spinner
/// overlay); the coordinator only guarantees ordering.
pub trait IndicatorSink: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

/// Sink that only logs transitions. Default when the host supplies nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogIndicator;

impl IndicatorSink for LogIndicator {
    fn show(&self) {
        debug!("busy indicator shown");
    }

    fn hide(&self) {
        debug!("busy indicator hidden");
    }
}

/// One requested indicator transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndicatorAction {
    Open,
    Close,
}

/// Observable state of the coordinator after some number of actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorSnapshot {
    pub visible: bool,
    /// Actions applied so far; lets observers wait for the queue to drain.
    pub processed: u64,
}

/// Serializes indicator transitions across overlapping operations.
///
/// Actions are queued and drained by a single worker task, one at a time, so
/// a `Close` issued by a fast response can never overtake an `Open` issued by
/// a slower, earlier-started operation. The worker keeps an overlap depth:
/// the sink is shown on the first outstanding `Open` and hidden only when
/// every outstanding operation has closed.
#[derive(Clone)]
pub struct IndicatorCoordinator {
    actions: mpsc::UnboundedSender<IndicatorAction>,
    snapshot: watch::Receiver<IndicatorSnapshot>,
}

impl IndicatorCoordinator {
    /// Spawn the worker task draining the action queue.
    pub fn spawn(sink: Arc<dyn IndicatorSink>) -> Self {
        let (actions, queue) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot) = watch::channel(IndicatorSnapshot {
            visible: false,
            processed: 0,
        });
        tokio::spawn(run_worker(queue, snapshot_tx, sink));
        Self { actions, snapshot }
    }

    /// Queue one transition. Actions apply strictly in submission order.
    pub fn push(&self, action: IndicatorAction) {
        let _ = self.actions.send(action);
    }

    /// Last applied visibility.
    pub fn is_visible(&self) -> bool {
        self.snapshot.borrow().visible
    }

    /// Watch the coordinator state; useful for waiting until queued actions
    /// have been applied.
    pub fn watch(&self) -> watch::Receiver<IndicatorSnapshot> {
        self.snapshot.clone()
    }
}

async fn run_worker(
    mut queue: mpsc::UnboundedReceiver<IndicatorAction>,
    snapshot: watch::Sender<IndicatorSnapshot>,
    sink: Arc<dyn IndicatorSink>,
) {
    let mut depth: usize = 0;
    let mut processed: u64 = 0;

    while let Some(action) = queue.recv().await {
        match action {
            IndicatorAction::Open => {
                depth += 1;
                if depth == 1 {
                    sink.show();
                }
            }
            IndicatorAction::Close => {
                // A close with nothing outstanding is a no-op, not an error.
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        sink.hide();
                    }
                }
            }
        }
        processed += 1;
        let _ = snapshot.send(IndicatorSnapshot {
            visible: depth > 0,
            processed,
        });
    }
}
