//! Per-unit-of-work "current actor" slot consulted when events are recorded.
//!
//! The slot is task-local: each task (or, for [`ActorContext::sync_scope`],
//! each thread) sees only the actor it set itself. Tasks spawned from inside a
//! scope do not inherit it and must open their own.

use std::future::Future;

use eventable_domain::UserId;

tokio::task_local! {
    static CURRENT_ACTOR: Option<UserId>;
}

/// Scoped access to the acting user.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActorContext;

impl ActorContext {
    /// Runs `future` with `actor` as the current actor.
    ///
    /// The previous actor is restored however the future ends, including
    /// errors, panics and cancellation. Scopes nest.
    pub async fn scope<F>(actor: impl Into<Option<UserId>>, future: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_ACTOR.scope(actor.into(), future).await
    }

    /// Runs `body` with `actor` as the current actor on the calling thread.
    pub fn sync_scope<F, R>(actor: impl Into<Option<UserId>>, body: F) -> R
    where
        F: FnOnce() -> R,
    {
        CURRENT_ACTOR.sync_scope(actor.into(), body)
    }

    /// Returns the actor of the innermost enclosing scope.
    #[must_use]
    pub fn current() -> Option<UserId> {
        CURRENT_ACTOR.try_with(|actor| *actor).ok().flatten()
    }
}
