pub mod process;
pub mod scheduling;
pub mod thread_control_block;

pub use process::{Pid, ProcessTable, TaskStatus, Tid};
pub use thread_control_block::{ThreadControlBlock, ThreadStatus, ThreadTable};
