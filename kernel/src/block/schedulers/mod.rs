mod noop_scheduler;
mod sstf_scheduler;

pub use noop_scheduler::NoopScheduler;
pub use sstf_scheduler::SstfScheduler;
