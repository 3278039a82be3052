use crate::sync::mutex::Mutex;
use alloc::collections::BTreeMap;
use core::fmt;

pub type Pid = u16;
pub type Tid = u16;

/// Lifecycle of a task (the owner of address spaces and frame reservations).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Live,
    Terminated,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TaskStatus::Live => write!(f, "Live"),
            TaskStatus::Terminated => write!(f, "Terminated"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ProcessControlBlock {
    pub pid: Pid,
    pub status: TaskStatus,
}

struct ProcessState {
    content: BTreeMap<Pid, ProcessControlBlock>,
    next_pid: Pid,
}

pub struct ProcessTable {
    inner: Mutex<ProcessState>,
}

impl Default for ProcessTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable {
    pub const fn new() -> Self {
        ProcessTable {
            inner: Mutex::new(ProcessState {
                content: BTreeMap::new(),
                next_pid: 1,
            }),
        }
    }

    /// Creates a live task and returns its pid.
    pub fn create(&self) -> Pid {
        let mut state = self.inner.lock();
        let pid = state.next_pid;
        if pid == Pid::MAX {
            panic!("PID overflow");
        }
        state.next_pid = pid + 1;
        state.content.insert(
            pid,
            ProcessControlBlock {
                pid,
                status: TaskStatus::Live,
            },
        );
        pid
    }

    pub fn status(&self, pid: Pid) -> Option<TaskStatus> {
        self.inner.lock().content.get(&pid).map(|pcb| pcb.status)
    }

    /// Marks the task terminated. Returns `false` if the pid is unknown.
    pub fn terminate(&self, pid: Pid) -> bool {
        match self.inner.lock().content.get_mut(&pid) {
            Some(pcb) => {
                pcb.status = TaskStatus::Terminated;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
