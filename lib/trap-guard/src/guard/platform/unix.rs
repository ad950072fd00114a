//! Linux, the BSDs and the other POSIX targets.
//!
//! `sigsetjmp` is used with `savemask = 0`: touching the kernel's signal mask
//! is the most expensive part of taking a checkpoint and these targets resume
//! correctly without it. The `save-signal-mask` feature turns capture back on.

use super::JumpStrategy;

cfg_if::cfg_if! {
    if #[cfg(feature = "save-signal-mask")] {
        pub(crate) const STRATEGY: JumpStrategy = JumpStrategy::SaveSignalMask;
    } else {
        pub(crate) const STRATEGY: JumpStrategy = JumpStrategy::SkipSignalMask;
    }
}
