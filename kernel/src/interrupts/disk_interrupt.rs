use crate::block::bio_request::{IoType, Iorb};
use crate::mem::frame_table::FrameNumber;
use crate::system::System;
use crate::threading::{TaskStatus, ThreadStatus};
use log::debug;

/// Finalizes `iorb` after its device signalled completion.
///
/// Releases what admission acquired, updates the frame the transfer touched
/// (unless the owner has been killed since), wakes everything waiting on the
/// request, starts the device's next request and finally dispatches the
/// owner. Missing frames, files or threads are fatal.
pub fn handle_disk_interrupt(system: &System, mut iorb: Iorb) {
    let tid = iorb.tid();
    let Some(pid) = system.threads.pid(tid) else {
        panic!("{} owned by unknown thread {}", iorb, tid);
    };
    let Some(task) = system.processes.status(pid) else {
        panic!("{} owned by thread {} of unknown task {}", iorb, tid, pid);
    };

    system.files.release_iorb(iorb.file());
    system.pages.unlock(iorb.page());

    let frame = || frame_of(system, &iorb);
    let killed = system.thread_status(tid) == ThreadStatus::Killed;
    let swap = iorb.device() == system.swap_device();

    if !swap && !killed {
        let frame = frame();
        system.frames.set_referenced(frame, true);
        if iorb.io_type() == IoType::Read && task == TaskStatus::Live {
            system.frames.set_dirty(frame, true);
        }
    } else if swap && !killed && task == TaskStatus::Live {
        // Only a live owner's swap-in clears dirty; a killed one keeps it set.
        system.frames.set_dirty(frame(), false);
    }

    if task == TaskStatus::Terminated {
        let frame = frame();
        if system.frames.reserved(frame) == Some(pid) {
            system.frames.set_unreserved(frame, pid);
        }
    }

    for waiter in iorb.take_waiters() {
        system.threads.resume(waiter);
    }

    let device = system.device(iorb.device());
    let next = device.restart();
    debug!("device {}: completed {}, next {:?}", device.id(), iorb, next);

    system.threads.dispatch(tid);
}

fn frame_of(system: &System, iorb: &Iorb) -> FrameNumber {
    match system.pages.frame(iorb.page()) {
        Some(frame) => frame,
        None => panic!("{}: page {} has no frame", iorb, iorb.page()),
    }
}
