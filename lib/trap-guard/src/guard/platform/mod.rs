//! Platform selection for the non-local jump behind [`guard`] and [`unwind`].
//!
//! Exactly one of the submodules is compiled per target. Each of them only
//! names the [`JumpStrategy`] it needs; the capture and the jump go through
//! the same two C entry points in `handlers.c`, which `build.rs` compiles with
//! the matching `CFG_TARGET_OS_*` define.
//!
//! [`guard`]: super::guard
//! [`unwind`]: super::unwind

use super::checkpoint::{Checkpoint, Workload};
use std::ffi::c_int;

cfg_if::cfg_if! {
    if #[cfg(target_os = "windows")] {
        mod windows;
        use self::windows as imp;
    } else if #[cfg(target_os = "macos")] {
        mod macos;
        use self::macos as imp;
    } else if #[cfg(unix)] {
        mod unix;
        use self::unix as imp;
    } else {
        compile_error!("unsupported platform");
    }
}

/// What a checkpoint captures on the current target.
// Only one variant is constructed on any given target.
#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JumpStrategy {
    /// `setjmp`/`longjmp`: registers and stack only.
    RegistersOnly,
    /// `sigsetjmp(buf, 1)`/`siglongjmp`: the signal mask is saved and
    /// restored along with the registers.
    SaveSignalMask,
    /// `sigsetjmp(buf, 0)`/`siglongjmp`: the signal mask is left alone.
    SkipSignalMask,
}

impl JumpStrategy {
    /// The `savemask` argument handed to `sigsetjmp`.
    const fn save_mask(self) -> c_int {
        match self {
            Self::SaveSignalMask => 1,
            Self::RegistersOnly | Self::SkipSignalMask => 0,
        }
    }
}

/// The strategy compiled in for this target.
pub(crate) const STRATEGY: JumpStrategy = imp::STRATEGY;

unsafe extern "C" {
    fn wasmer_guard_capture_and_run(
        checkpoint_slot: *mut *const Checkpoint,
        save_mask: c_int,
        workload: Workload,
        payload: *mut u8,
    ) -> c_int;
    fn wasmer_guard_resume(checkpoint: *const Checkpoint) -> !;
}

/// Captures a checkpoint, stores its address in `checkpoint_slot` and runs
/// `workload(payload)`.
///
/// Returns `true` if the workload returned and `false` if control came back
/// through [`resume`].
///
/// # Safety
///
/// `checkpoint_slot` must be valid for writes for the whole call, and
/// `workload` must be safe to call with `payload`.
#[inline]
pub(crate) unsafe fn capture_and_run(
    checkpoint_slot: *mut *const Checkpoint,
    workload: Workload,
    payload: *mut u8,
) -> bool {
    unsafe {
        wasmer_guard_capture_and_run(checkpoint_slot, STRATEGY.save_mask(), workload, payload) != 0
    }
}

/// Jumps back to a checkpoint captured by [`capture_and_run`].
///
/// # Safety
///
/// `checkpoint` must have been stored by a [`capture_and_run`] call on this
/// thread that has not returned yet.
#[inline]
pub(crate) unsafe fn resume(checkpoint: *const Checkpoint) -> ! {
    unsafe { wasmer_guard_resume(checkpoint) }
}
