use crate::threading::process::Tid;

/// Ready-queue policy used when dispatching threads after I/O completes.
pub trait Scheduler {
    fn push(&mut self, tid: Tid);
    fn pop(&mut self) -> Option<Tid>;
    fn remove(&mut self, tid: Tid) -> bool;
}
