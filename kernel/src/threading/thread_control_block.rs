use super::process::{Pid, Tid};
use super::scheduling::{FIFOScheduler, Scheduler};
use crate::sync::mutex::Mutex;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::fmt;
use log::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadStatus {
    Ready,
    Running,
    /// Suspended until an event (usually an I/O completion) resumes it.
    Waiting,
    /// Killed by the task layer. Never runs again; outstanding I/O is cancelled
    /// or finalized without touching its frames.
    Killed,
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ThreadStatus::Ready => write!(f, "Ready"),
            ThreadStatus::Running => write!(f, "Running"),
            ThreadStatus::Waiting => write!(f, "Waiting"),
            ThreadStatus::Killed => write!(f, "Killed"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ThreadControlBlock {
    pub tid: Tid,
    pub pid: Pid,
    pub status: ThreadStatus,
}

struct ThreadState {
    content: BTreeMap<Tid, ThreadControlBlock>,
    scheduler: FIFOScheduler,
    running: Option<Tid>,
    next_tid: Tid,
}

impl ThreadState {
    /// Moves a waiting thread back onto the ready queue.
    fn wake(&mut self, tid: Tid) -> bool {
        match self.content.get_mut(&tid) {
            Some(tcb) if tcb.status == ThreadStatus::Waiting => {
                tcb.status = ThreadStatus::Ready;
                self.scheduler.push(tid);
                true
            }
            _ => false,
        }
    }
}

/// All execution units of the simulation, plus the CPU they compete for.
pub struct ThreadTable {
    inner: Mutex<ThreadState>,
}

impl Default for ThreadTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadTable {
    pub const fn new() -> Self {
        ThreadTable {
            inner: Mutex::new(ThreadState {
                content: BTreeMap::new(),
                scheduler: FIFOScheduler::new(),
                running: None,
                next_tid: 1,
            }),
        }
    }

    /// Creates a ready thread belonging to task `pid`.
    pub fn spawn(&self, pid: Pid) -> Tid {
        let mut state = self.inner.lock();
        let tid = state.next_tid;
        if tid == Tid::MAX {
            panic!("TID overflow");
        }
        state.next_tid = tid + 1;
        state.content.insert(
            tid,
            ThreadControlBlock {
                tid,
                pid,
                status: ThreadStatus::Ready,
            },
        );
        state.scheduler.push(tid);
        tid
    }

    pub fn status(&self, tid: Tid) -> Option<ThreadStatus> {
        self.inner.lock().content.get(&tid).map(|tcb| tcb.status)
    }

    pub fn pid(&self, tid: Tid) -> Option<Pid> {
        self.inner.lock().content.get(&tid).map(|tcb| tcb.pid)
    }

    pub fn running(&self) -> Option<Tid> {
        self.inner.lock().running
    }

    pub fn threads_of(&self, pid: Pid) -> Vec<Tid> {
        self.inner
            .lock()
            .content
            .values()
            .filter(|tcb| tcb.pid == pid)
            .map(|tcb| tcb.tid)
            .collect()
    }

    /// Suspends `tid` until someone resumes it. Killed threads stay killed.
    pub fn block(&self, tid: Tid) {
        let mut state = self.inner.lock();
        let Some(tcb) = state.content.get_mut(&tid) else {
            panic!("blocking unknown thread {}", tid);
        };
        if tcb.status == ThreadStatus::Killed {
            return;
        }
        tcb.status = ThreadStatus::Waiting;
        state.scheduler.remove(tid);
        if state.running == Some(tid) {
            state.running = None;
        }
    }

    /// Makes a waiting thread ready to run. Returns whether it was waiting.
    pub fn resume(&self, tid: Tid) -> bool {
        self.inner.lock().wake(tid)
    }

    /// Marks `tid` killed and takes it off the CPU and the ready queue.
    ///
    /// Returns `false` if the thread was unknown or already killed.
    pub fn kill(&self, tid: Tid) -> bool {
        let mut state = self.inner.lock();
        match state.content.get_mut(&tid) {
            Some(tcb) if tcb.status != ThreadStatus::Killed => {
                tcb.status = ThreadStatus::Killed;
            }
            _ => return false,
        }
        state.scheduler.remove(tid);
        if state.running == Some(tid) {
            state.running = None;
        }
        true
    }

    /// Gives `owner` back to the scheduler and, if the CPU is idle, runs the
    /// next ready thread. Returns the thread holding the CPU afterwards.
    pub fn dispatch(&self, owner: Tid) -> Option<Tid> {
        let mut state = self.inner.lock();
        state.wake(owner);

        if state.running.is_none() {
            while let Some(next) = state.scheduler.pop() {
                if let Some(tcb) = state.content.get_mut(&next) {
                    if tcb.status == ThreadStatus::Ready {
                        tcb.status = ThreadStatus::Running;
                        state.running = Some(next);
                        break;
                    }
                }
            }
        }

        debug!("dispatch after thread {}: running {:?}", owner, state.running);
        state.running
    }
}

impl fmt::Display for ThreadTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.inner.lock();
        writeln!(f, "Threads:")?;
        for tcb in state.content.values() {
            writeln!(f, "    {:04} | task {:04} | {}", tcb.tid, tcb.pid, tcb.status)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_runs_first_ready_thread() {
        let threads = ThreadTable::new();
        let a = threads.spawn(1);
        let b = threads.spawn(1);

        assert_eq!(threads.dispatch(a), Some(a));
        assert_eq!(threads.status(a), Some(ThreadStatus::Running));
        assert_eq!(threads.status(b), Some(ThreadStatus::Ready));
    }

    #[test]
    fn blocked_thread_resumes_to_back_of_queue() {
        let threads = ThreadTable::new();
        let a = threads.spawn(1);
        let b = threads.spawn(1);
        threads.block(a);

        assert!(threads.resume(a));
        assert!(!threads.resume(a));
        assert_eq!(threads.dispatch(a), Some(b));
    }

    #[test]
    fn killed_thread_is_never_resumed() {
        let threads = ThreadTable::new();
        let a = threads.spawn(7);
        threads.block(a);

        assert!(threads.kill(a));
        assert!(!threads.kill(a));
        assert!(!threads.resume(a));
        threads.block(a);
        assert_eq!(threads.status(a), Some(ThreadStatus::Killed));
        assert_eq!(threads.dispatch(a), None);
    }

    #[test]
    fn threads_are_listed_per_task() {
        let threads = ThreadTable::new();
        let a = threads.spawn(1);
        let b = threads.spawn(2);
        let c = threads.spawn(1);

        assert_eq!(threads.threads_of(1), [a, c]);
        assert_eq!(threads.threads_of(2), [b]);
        assert!(threads.threads_of(3).is_empty());
    }
}
