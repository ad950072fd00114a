//! Compiles the C shim that captures and resumes checkpoints.
//!
//! `setjmp` has to be called from a frame the compiler knows can return
//! twice, which Rust has no way to express, so the two entry points live in C.

use std::env;

fn main() {
    println!("cargo:rerun-if-changed=src/guard/handlers.c");
    println!("cargo:rerun-if-env-changed=CARGO_CFG_TARGET_OS");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_else(|_| "unknown".to_string());

    cc::Build::new()
        .warnings(true)
        .define(
            &format!("CFG_TARGET_OS_{}", target_os.to_uppercase()),
            None,
        )
        .file("src/guard/handlers.c")
        .compile("wasmer_trap_guard");
}
