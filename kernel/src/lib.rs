//! Disk I/O core of a simulated kernel: per-device request queues with
//! seek-aware scheduling, and the completion path that reconciles pages,
//! frames, open files and threads once a transfer finishes.

#![cfg_attr(target_os = "none", no_std)]

extern crate alloc;

pub mod block;
pub mod config;
pub mod fs;
pub mod interrupts;
pub mod mem;
pub mod sync;
pub mod system;
pub mod threading;
