//! Structured spawn/join scope with cancel-on-error semantics.

use std::future::Future;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// How a [`TaskGroup`] finished joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    /// Every child ran to completion.
    Completed,
    /// The external token fired; children were aborted and drained.
    Cancelled,
}

/// Owns a set of child tasks and joins them as one unit.
///
/// The first child error aborts every remaining child; an external
/// cancellation aborts all of them. In both cases [`TaskGroup::join`]
/// returns only after every child has actually finished, so nothing a
/// child owns (permits, subprocesses, sockets) outlives the group.
/// Aborted children are torn down at their next suspension point.
pub struct TaskGroup<E> {
    tasks: JoinSet<Result<(), E>>,
    cancel: CancellationToken,
}

impl<E: Send + 'static> TaskGroup<E> {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            tasks: JoinSet::new(),
            cancel,
        }
    }

    /// Spawns a child onto the group.
    pub fn spawn<F>(&mut self, future: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.tasks.spawn(future);
    }

    /// Number of children not yet joined.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Waits for all children, the first child error, or cancellation,
    /// whichever comes first.
    ///
    /// A child panic is resumed on the joining task after the siblings
    /// have been torn down.
    pub async fn join(mut self) -> Result<GroupOutcome, E> {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.abort_and_drain().await;
                    return Ok(GroupOutcome::Cancelled);
                }
                next = self.tasks.join_next() => match next {
                    None => return Ok(GroupOutcome::Completed),
                    Some(Ok(Ok(()))) => {}
                    Some(Ok(Err(error))) => {
                        self.abort_and_drain().await;
                        return Err(error);
                    }
                    Some(Err(join_error)) => {
                        if join_error.is_panic() {
                            self.abort_and_drain().await;
                            std::panic::resume_unwind(join_error.into_panic());
                        }
                        // An aborted child can surface here when an abort
                        // races its completion; there is nothing to do.
                    }
                }
            }
        }
    }

    async fn abort_and_drain(&mut self) {
        self.tasks.abort_all();
        while self.tasks.join_next().await.is_some() {}
    }
}
