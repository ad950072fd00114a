//! Closure-based guarded calls on top of [`guard`], and the per-thread stack
//! of active calls that fault handlers consult.

use super::checkpoint::{guard, CheckpointHandle, Outcome};
use super::platform;
use crate::error::{Faulted, RestoreError};
use std::any::Any;
use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

/// Runs `closure` as a guarded call.
///
/// While `closure` runs, [`current_checkpoint`] on this thread returns the
/// handle of this call, so a fault handler can [`unwind`](crate::unwind) back
/// here. Returns `Err(Faulted)` if that happens.
///
/// A panic inside `closure` is carried over the guarded call and resumed once
/// it has returned.
///
/// # Safety
///
/// If the call is unwound, nothing that `closure` owns or that lives in the
/// frames it called is dropped. Callers must make sure that skipping those
/// destructors is acceptable.
pub unsafe fn catch_faults<F>(closure: F) -> Result<(), Faulted>
where
    F: FnOnce(),
{
    unsafe { catch_faults_with_result(closure) }
}

/// Like [`catch_faults`], but returns the value produced by `closure`.
///
/// # Safety
///
/// See [`catch_faults`].
pub unsafe fn catch_faults_with_result<F, R>(closure: F) -> Result<R, Faulted>
where
    F: FnOnce() -> R,
{
    let state = GuardState::new();
    let mut invocation = Invocation {
        closure: Some(closure),
        result: None,
        panic: None,
    };
    let payload = (&mut invocation as *mut Invocation<F, R>).cast::<u8>();
    let outcome = tls::set(&state, || unsafe {
        guard(&state.checkpoint, call_closure::<F, R>, payload)
    });

    if let Some(panic) = invocation.panic.take() {
        panic::resume_unwind(panic);
    }
    match outcome {
        Outcome::Completed => invocation.result.ok_or(Faulted),
        Outcome::Faulted => {
            tracing::trace!(
                depth = guard_depth(),
                strategy = ?platform::STRATEGY,
                "guarded call was unwound by a fault"
            );
            Err(Faulted)
        }
    }
}

struct Invocation<F, R> {
    closure: Option<F>,
    result: Option<R>,
    panic: Option<Box<dyn Any + Send>>,
}

extern "C" fn call_closure<F, R>(payload: *mut u8)
where
    F: FnOnce() -> R,
{
    let invocation = unsafe { &mut *payload.cast::<Invocation<F, R>>() };
    let Some(closure) = invocation.closure.take() else {
        return;
    };
    // Unwinding must not cross the `extern "C"` frames of the shim.
    match panic::catch_unwind(AssertUnwindSafe(closure)) {
        Ok(result) => invocation.result = Some(result),
        Err(panic) => invocation.panic = Some(panic),
    }
}

/// Returns the handle of the innermost guarded call running on this thread.
///
/// This is what a fault handler passes to [`unwind`](crate::unwind). Returns
/// `None` when the thread is not inside [`catch_faults`], in which case the
/// fault did not come from guarded code and should be forwarded to the
/// previous handler.
///
/// Neither allocates nor locks, and may be called from a signal handler.
pub fn current_checkpoint() -> Option<CheckpointHandle> {
    tls::with(|state| state.and_then(|state| state.checkpoint.get()))
}

/// Returns the number of guarded calls currently active on this thread.
pub fn guard_depth() -> usize {
    tls::depth()
}

/// Per-call state linked into the thread's guard stack for the duration of
/// [`catch_faults_with_result`].
pub(crate) struct GuardState {
    checkpoint: Cell<Option<CheckpointHandle>>,
    prev: Cell<tls::Ptr>,
}

impl GuardState {
    #[inline]
    fn new() -> Self {
        Self {
            checkpoint: Cell::new(None),
            prev: Cell::new(ptr::null()),
        }
    }
}

/// A guarded call that was detached from its thread's guard stack.
///
/// Used when a guarded call is suspended on one stack and resumed later,
/// possibly on a different OS thread: the innermost call is detached with
/// [`GuardRestore::take`] before switching away, and re-attached with
/// [`GuardRestore::replace`] on the thread that resumes it.
#[must_use = "a detached guarded call must be re-attached before it returns"]
pub struct GuardRestore(tls::Ptr);

impl GuardRestore {
    /// Detaches the innermost guarded call from this thread's guard stack.
    ///
    /// # Safety
    ///
    /// The returned value must be passed to [`GuardRestore::replace`] before
    /// the detached call returns.
    pub unsafe fn take() -> Result<Self, RestoreError> {
        let raw = tls::raw::get();
        if raw.is_null() {
            return Err(RestoreError::NotGuarded);
        }
        // Unlink ourselves and null out `prev` so that a stale link is never
        // followed while we are detached.
        let prev = unsafe { (*raw).prev.replace(ptr::null()) };
        tls::raw::replace(prev);
        tracing::trace!(depth = tls::depth(), "detached guarded call");
        Ok(Self(raw))
    }

    /// Re-attaches a detached guarded call on top of this thread's guard
    /// stack.
    ///
    /// # Safety
    ///
    /// The stack frame of the detached call must still be live.
    pub unsafe fn replace(self) {
        let prev = tls::raw::get();
        unsafe { (*self.0).prev.set(prev) };
        tls::raw::replace(self.0);
        tracing::trace!(depth = tls::depth(), "re-attached guarded call");
    }
}

// The guard stack is a linked list threaded through the `GuardState`s that
// live on the stack frames of active `catch_faults` calls. The head is kept in
// a thread local.
mod tls {
    use super::GuardState;
    use std::ptr;

    pub use raw::Ptr;

    // Accessors for the thread local itself. They are never inlined so that a
    // borrow of the head pointer can not be kept across a stack switch that
    // resumes on another OS thread.
    pub mod raw {
        use super::GuardState;
        use std::cell::Cell;
        use std::ptr;

        pub type Ptr = *const GuardState;

        // Const-initialised and without destructor, so accessing it never
        // allocates or registers anything. Fault handlers rely on that.
        thread_local!(static PTR: Cell<Ptr> = const { Cell::new(ptr::null()) });

        #[inline(never)]
        pub fn replace(val: Ptr) -> Ptr {
            PTR.with(|p| p.replace(val))
        }

        #[inline(never)]
        pub fn get() -> Ptr {
            PTR.with(|p| p.get())
        }
    }

    /// Pushes `state` for the duration of `closure`.
    ///
    /// The previous head is restored when `closure` returns or panics. A fault
    /// unwinding past this frame skips that restore; the enclosing call, whose
    /// frame is the one resumed, restores its own `prev` instead.
    pub fn set<R>(state: &GuardState, closure: impl FnOnce() -> R) -> R {
        struct Reset<'a>(&'a GuardState);

        impl Drop for Reset<'_> {
            #[inline]
            fn drop(&mut self) {
                raw::replace(self.0.prev.replace(ptr::null()));
            }
        }

        let prev = raw::replace(state);
        state.prev.set(prev);
        let _reset = Reset(state);
        closure()
    }

    /// Calls `closure` with the innermost active state, if any.
    pub fn with<R>(closure: impl FnOnce(Option<&GuardState>) -> R) -> R {
        let p = raw::get();
        unsafe { closure(if p.is_null() { None } else { Some(&*p) }) }
    }

    pub fn depth() -> usize {
        let mut depth = 0;
        let mut p = raw::get();
        while !p.is_null() {
            depth += 1;
            p = unsafe { (*p).prev.get() };
        }
        depth
    }
}
