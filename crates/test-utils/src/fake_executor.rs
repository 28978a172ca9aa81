use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use shaperdag::dag::ScheduledWork;
use shaperdag::engine::{RuntimeEvent, WorkOutcome};
use shaperdag::errors::Result;
use shaperdag::exec::ExecutorBackend;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

/// A fake executor that:
/// - records every work it was handed, in dispatch order
/// - writes a one-line placeholder table to each output path
/// - reports `WorkStarted` then `WorkCompleted` for each work, failing the
///   ids it was told to fail
///
/// Events are posted from spawned tasks so a large dispatch can never fill
/// the runtime channel while the runtime is busy dispatching.
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<ScheduledWork>>>,
    failing: BTreeSet<String>,
    tasks: JoinSet<()>,
}

impl FakeExecutor {
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        executed: Arc<Mutex<Vec<ScheduledWork>>>,
    ) -> Self {
        Self {
            runtime_tx,
            executed,
            failing: BTreeSet::new(),
            tasks: JoinSet::new(),
        }
    }

    /// Report `id` as failed instead of completed.
    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.to_string());
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_works(
        &mut self,
        works: Vec<ScheduledWork>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for work in works {
                debug!(work = %work.id, fail = self.failing.contains(&work.id), "fake dispatch");
                self.executed.lock().unwrap().push(work.clone());

                let tx = self.runtime_tx.clone();
                let fail = self.failing.contains(&work.id);
                self.tasks.spawn(async move {
                    let id = work.id.clone();
                    let _ = tx.send(RuntimeEvent::WorkStarted { id: id.clone() }).await;

                    let outcome = if fail {
                        WorkOutcome::Failed(format!("{id} was told to fail"))
                    } else {
                        match std::fs::write(&work.output, format!("id\n{id}\n")) {
                            Ok(()) => WorkOutcome::Success,
                            Err(e) => WorkOutcome::Failed(e.to_string()),
                        }
                    };
                    let _ = tx.send(RuntimeEvent::WorkCompleted { id, outcome }).await;
                });
            }
            Ok(())
        })
    }

    fn stop_queued(&mut self) {
        // Nothing is ever queued: every work is reported right away.
        debug!("fake executor asked to stop queued works");
    }

    fn shutdown(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            while self.tasks.join_next().await.is_some() {}
            Ok(())
        })
    }
}
