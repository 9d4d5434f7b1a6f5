use crate::stats::{RunStatistics, RunSummary};
use crossbeam_channel::Sender;

/// Everything a run reports to its front end, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum RunEvent {
    /// Human-readable progress or diagnostic line
    Log(String),
    /// Sent after every candidate, whatever its outcome
    Progress { processed: usize, total: usize },
    Stats(RunStatistics),
    Completed(RunSummary),
    Aborted(RunStatistics),
    Failed(String),
}

/// Port through which the run worker talks to the presentation layer.
///
/// Implementations must not block for long: they are called on the worker
/// thread between files.
pub trait EventSink: Send {
    fn emit(&self, event: RunEvent);
}

impl EventSink for Sender<RunEvent> {
    fn emit(&self, event: RunEvent) {
        // A front end that hung up no longer cares; the run carries on.
        let _ = self.send(event);
    }
}

impl<F> EventSink for F
where
    F: Fn(RunEvent) + Send,
{
    fn emit(&self, event: RunEvent) {
        self(event)
    }
}
