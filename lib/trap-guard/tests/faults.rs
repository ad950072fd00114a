//! Recovers from real hardware faults, with a minimal signal handler standing
//! in for the one an embedder installs.
#![cfg(unix)]

use std::mem::{self, MaybeUninit};
use std::ptr;
use std::sync::Once;
use wasmer_trap_guard::{
    catch_faults, catch_faults_with_result, current_checkpoint, unwind, Faulted,
};

static mut PREV_SIGSEGV: MaybeUninit<libc::sigaction> = MaybeUninit::uninit();
static mut PREV_SIGBUS: MaybeUninit<libc::sigaction> = MaybeUninit::uninit();
static mut PREV_SIGILL: MaybeUninit<libc::sigaction> = MaybeUninit::uninit();

fn install_handlers() {
    static INIT: Once = Once::new();
    INIT.call_once(|| unsafe {
        register(&raw mut PREV_SIGSEGV, libc::SIGSEGV);
        register(&raw mut PREV_SIGBUS, libc::SIGBUS);
        register(&raw mut PREV_SIGILL, libc::SIGILL);
    });
}

unsafe fn register(slot: *mut MaybeUninit<libc::sigaction>, signal: libc::c_int) {
    unsafe {
        let mut handler: libc::sigaction = mem::zeroed();
        // SA_NODEFER keeps the signal unblocked while the handler runs, so
        // jumping out of it without restoring the mask leaves nothing behind.
        handler.sa_flags = libc::SA_SIGINFO | libc::SA_NODEFER | libc::SA_ONSTACK;
        handler.sa_sigaction = trap_handler as usize;
        libc::sigemptyset(&mut handler.sa_mask);
        assert_eq!(
            libc::sigaction(signal, &handler, (*slot).as_mut_ptr()),
            0,
            "unable to install signal handler for {signal}"
        );
    }
}

unsafe extern "C" fn trap_handler(
    signum: libc::c_int,
    _siginfo: *mut libc::siginfo_t,
    _context: *mut libc::c_void,
) {
    if let Some(handle) = current_checkpoint() {
        unsafe { unwind(handle) }
    }

    // Not a guarded fault: put the previous disposition back and let the
    // faulting instruction run again.
    let previous = match signum {
        libc::SIGSEGV => &raw const PREV_SIGSEGV,
        libc::SIGBUS => &raw const PREV_SIGBUS,
        _ => &raw const PREV_SIGILL,
    };
    unsafe {
        libc::sigaction(signum, (*previous).as_ptr(), ptr::null_mut());
    }
}

/// A page with no access rights.
struct NoAccessPage {
    ptr: *mut libc::c_void,
    size: usize,
}

impl NoAccessPage {
    fn new() -> Self {
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as usize;
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANON,
                -1,
                0,
            )
        };
        assert_ne!(ptr, libc::MAP_FAILED, "mmap failed");
        Self { ptr, size }
    }

    fn addr(&self) -> *mut u8 {
        self.ptr.cast()
    }
}

impl Drop for NoAccessPage {
    fn drop(&mut self) {
        let r = unsafe { libc::munmap(self.ptr, self.size) };
        assert_eq!(r, 0, "munmap failed");
    }
}

#[test]
fn recovers_from_out_of_bounds_store() {
    install_handlers();
    let page = NoAccessPage::new();
    let addr = page.addr();

    let mut reached_end = false;
    let result = unsafe {
        catch_faults(|| {
            ptr::write_volatile(addr, 1);
            ptr::write_volatile(&mut reached_end, true);
        })
    };
    assert_eq!(result, Err(Faulted));
    assert!(!reached_end);
}

#[test]
fn recovers_from_out_of_bounds_load_back_to_back() {
    install_handlers();
    let page = NoAccessPage::new();
    let addr = page.addr();

    for _ in 0..4 {
        let result = unsafe { catch_faults_with_result(|| ptr::read_volatile(addr)) };
        assert_eq!(result, Err(Faulted));
        let result = unsafe { catch_faults_with_result(|| 7u8) };
        assert_eq!(result, Ok(7));
    }
}

#[cfg(any(target_arch = "x86_64", target_arch = "aarch64"))]
#[test]
fn recovers_from_illegal_instruction() {
    install_handlers();
    let result = unsafe {
        catch_faults(|| {
            #[cfg(target_arch = "x86_64")]
            std::arch::asm!("ud2");
            #[cfg(target_arch = "aarch64")]
            std::arch::asm!("udf #0");
        })
    };
    assert_eq!(result, Err(Faulted));
}

#[test]
fn faults_on_other_threads_are_isolated() {
    install_handlers();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let page = NoAccessPage::new();
                let addr = page.addr();
                let faulted = unsafe { catch_faults(|| ptr::write_volatile(addr, i)) };
                let completed = unsafe { catch_faults_with_result(|| i * 2) };
                (faulted, completed)
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let (faulted, completed) = handle.join().expect("thread does not panic");
        assert_eq!(faulted, Err(Faulted));
        assert_eq!(completed, Ok(i as u8 * 2));
    }
}
