//! On macOS hardware exceptions go through mach exception ports before they
//! are turned into signals, and debuggers hook into that forwarding. Resuming
//! without restoring the signal mask interferes with it, so the mask is always
//! captured here even though it makes every checkpoint a syscall.

use super::JumpStrategy;

pub(crate) const STRATEGY: JumpStrategy = JumpStrategy::SaveSignalMask;
