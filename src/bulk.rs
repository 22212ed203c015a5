//! Concurrent fan-out of one remote call per selected item.
//!
//! Every call runs to completion; the report is produced only after all N
//! outcomes are in, so each invocation yields exactly one aggregate message.

use std::future::Future;

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOp {
    Complete,
    Uncomplete,
    Delete,
}

impl BulkOp {
    pub fn past_tense(self) -> &'static str {
        match self {
            BulkOp::Complete => "Completed",
            BulkOp::Uncomplete => "Uncompleted",
            BulkOp::Delete => "Deleted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkReport {
    pub op: BulkOp,
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    pub fn message(&self) -> String {
        let noun = if self.succeeded == 1 { "item" } else { "items" };
        if self.failed == 0 {
            format!("{} {} {noun}", self.op.past_tense(), self.succeeded)
        } else {
            format!(
                "{} {} {noun}, {} failed",
                self.op.past_tense(),
                self.succeeded,
                self.failed
            )
        }
    }
}

/// Runs `call` once per id on its own task and waits for all of them.
///
/// A task that dies without reporting counts as a failure, so
/// `succeeded + failed` always equals `ids.len()`.
pub async fn run<F, Fut>(op: BulkOp, ids: Vec<String>, call: F) -> BulkReport
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = bool> + Send + 'static,
{
    let expected = ids.len();
    let (tx, mut rx) = mpsc::channel::<bool>(expected.max(1));

    for id in ids {
        let tx = tx.clone();
        let pending = call(id);
        tokio::spawn(async move {
            let ok = pending.await;
            let _ = tx.send(ok).await;
        });
    }
    drop(tx);

    let mut succeeded = 0;
    let mut received = 0;
    while received < expected {
        match rx.recv().await {
            Some(ok) => {
                received += 1;
                if ok {
                    succeeded += 1;
                }
            }
            None => break,
        }
    }

    let report = BulkReport {
        op,
        succeeded,
        failed: expected - succeeded,
    };
    tracing::info!(
        op = ?op,
        succeeded = report.succeeded,
        failed = report.failed,
        lost = expected - received,
        "bulk operation finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[tokio::test]
    async fn partial_failure_is_counted_not_rolled_back() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let report = run(BulkOp::Complete, ids(&["a", "b", "c"]), move |id| {
            let seen = seen.clone();
            async move {
                // Finish in reverse order of launch.
                let delay = match id.as_str() {
                    "a" => 30,
                    "b" => 15,
                    _ => 1,
                };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                seen.fetch_add(1, Ordering::SeqCst);
                id != "b"
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.message(), "Completed 2 items, 1 failed");
    }

    #[tokio::test]
    async fn full_success_message() {
        let report = run(BulkOp::Delete, ids(&["a", "b"]), |_| async { true }).await;
        assert!(report.all_succeeded());
        assert_eq!(report.message(), "Deleted 2 items");
    }

    #[tokio::test]
    async fn panicking_call_counts_as_failure() {
        let report = run(BulkOp::Uncomplete, ids(&["ok", "boom"]), |id| async move {
            if id == "boom" {
                panic!("call blew up");
            }
            true
        })
        .await;
        assert_eq!(report.total(), 2);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
    }

    #[tokio::test]
    async fn totals_always_match_input_size() {
        for n in 0..12usize {
            let names: Vec<String> = (0..n).map(|i| i.to_string()).collect();
            let report = run(BulkOp::Complete, names, |id| async move {
                id.parse::<usize>().is_ok_and(|v| v % 3 != 0)
            })
            .await;
            assert_eq!(report.total(), n);
            assert_eq!(report.failed, n.div_ceil(3));
        }
    }
}
