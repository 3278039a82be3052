use crate::block::bio_request::{IoType, Iorb, IorbId};
use crate::block::block_core::{BlockDriver, BlockNumber, DeviceId, DeviceTable, SimulatedDisk};
use crate::block::block_error::{BlockError, Rejected};
use crate::block::device::{Admission, Device};
use crate::config::{ConfigError, DeviceConfig, SimulationConfig};
use crate::fs::open_file::{FileId, OpenFileTable};
use crate::interrupts::disk_interrupt::handle_disk_interrupt;
use crate::mem::frame_table::FrameTable;
use crate::mem::page_table::{PageNumber, PageTable};
use crate::mem::pager::{NoPager, PageFaultHandler};
use crate::threading::{Pid, ProcessTable, ThreadStatus, ThreadTable, Tid};
use alloc::boxed::Box;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};
use log::{debug, error, info, warn};

/// Every table of one simulation run.
///
/// Tables lock themselves; nothing here holds a lock across a call into
/// another table, so a page fault raised during admission may issue I/O
/// through the same `System`.
pub struct System {
    pub threads: ThreadTable,
    pub processes: ProcessTable,
    pub pages: PageTable,
    pub frames: FrameTable,
    pub files: OpenFileTable,
    pub devices: DeviceTable,
    swap_device: DeviceId,
    pager: Box<dyn PageFaultHandler>,
    next_iorb: AtomicU64,
}

impl System {
    /// Builds a system of simulated disks that leaves page faults unresolved.
    pub fn new(config: &SimulationConfig) -> Result<Self, ConfigError> {
        Self::with_parts(config, Box::new(NoPager), |_| -> Box<dyn BlockDriver> {
            Box::new(SimulatedDisk::new())
        })
    }

    /// Builds a system with a custom pager and one driver per configured device.
    pub fn with_parts(
        config: &SimulationConfig,
        pager: Box<dyn PageFaultHandler>,
        mut driver_for: impl FnMut(&DeviceConfig) -> Box<dyn BlockDriver>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut devices = DeviceTable::new();
        for device in &config.devices {
            devices.register_device(Device::new(
                device,
                config.address,
                config.scheduler.build(),
                driver_for(device),
            ));
        }

        info!(
            "Simulation ready: {} devices ({} scheduling), {} pages, {} frames, swap on device {}",
            devices.len(),
            config.scheduler,
            config.pages,
            config.frames,
            config.swap_device
        );

        Ok(Self {
            threads: ThreadTable::new(),
            processes: ProcessTable::new(),
            pages: PageTable::new(config.pages),
            frames: FrameTable::new(config.frames),
            files: OpenFileTable::new(),
            devices,
            swap_device: config.swap_device,
            pager,
            next_iorb: AtomicU64::new(1),
        })
    }

    pub fn pager(&self) -> &dyn PageFaultHandler {
        self.pager.as_ref()
    }

    pub fn swap_device(&self) -> DeviceId {
        self.swap_device
    }

    /// Panics if no device has this id.
    pub fn device(&self, id: DeviceId) -> &Device {
        match self.devices.by_id(id) {
            Some(device) => device,
            None => panic!("no device with id {}", id),
        }
    }

    /// Panics if the thread does not exist.
    pub fn thread_status(&self, tid: Tid) -> ThreadStatus {
        match self.threads.status(tid) {
            Some(status) => status,
            None => panic!("unknown thread {}", tid),
        }
    }

    pub fn new_iorb_id(&self) -> IorbId {
        self.next_iorb.fetch_add(1, Ordering::Relaxed)
    }

    pub fn new_iorb(
        &self,
        device: DeviceId,
        block: BlockNumber,
        io_type: IoType,
        tid: Tid,
        file: FileId,
        page: PageNumber,
    ) -> Iorb {
        Iorb::new(self.new_iorb_id(), device, block, io_type, tid, file, page)
    }

    /// Issues `iorb` on behalf of its owner, which waits for the completion.
    ///
    /// On rejection the owner is left suspended or killed; the caller unwinds
    /// the returned [`Rejected`].
    pub fn submit_io(&self, mut iorb: Iorb) -> Result<Admission, Rejected> {
        let Some(device) = self.devices.by_id(iorb.device()) else {
            return Err(Rejected {
                reason: BlockError::UnknownDevice(iorb.device()),
                iorb,
                page_locked: false,
                file_counted: false,
            });
        };

        let tid = iorb.tid();
        iorb.add_waiter(tid);
        self.threads.block(tid);
        device.enqueue(self, iorb)
    }

    /// Signals that `device` finished its current transfer. Returns the
    /// completed IORB, or `None` for an interrupt nobody was waiting for.
    pub fn raise_disk_interrupt(&self, device: DeviceId) -> Option<IorbId> {
        let Some(iorb) = self.device(device).take_in_flight() else {
            warn!("device {}: spurious interrupt", device);
            return None;
        };

        let id = iorb.id();
        handle_disk_interrupt(self, iorb);
        Some(id)
    }

    /// Kills `tid` and cancels its queued I/O on every device. Transfers
    /// already in flight still complete. Returns how many requests were
    /// cancelled.
    pub fn kill_thread(&self, tid: Tid) -> usize {
        if !self.threads.kill(tid) {
            debug!("thread {} already killed", tid);
        }

        let cancelled: usize = self
            .devices
            .iter()
            .map(|device| device.cancel_pending_io(self, tid))
            .sum();
        debug!("thread {} killed, {} requests cancelled", tid, cancelled);
        cancelled
    }

    /// Terminates task `pid` and kills all of its threads.
    pub fn terminate_process(&self, pid: Pid) -> usize {
        if !self.processes.terminate(pid) {
            panic!("terminating unknown task {}", pid);
        }
        self.threads
            .threads_of(pid)
            .into_iter()
            .map(|tid| self.kill_thread(tid))
            .sum()
    }

    /// Logs the whole system state.
    pub fn dump_state(&self) {
        error!("{}", self);
    }
}

impl fmt::Display for System {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Swap device: {}", self.swap_device)?;
        write!(f, "{}", self.devices)?;
        write!(f, "{}", self.threads)?;
        write!(f, "{}", self.frames)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::block::block_core::BlockType;
    use crate::config::parse_config;
    use crate::mem::frame_table::FrameNumber;
    use alloc::format;
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use core::sync::atomic::AtomicU32;

    // 64-byte blocks and 16-byte sectors: 8 blocks per cylinder on both disks.
    const BASE_CONFIG: &str = "\
address_bits 16 10
pages 256
frames 32
device 0 swap blocks=512 bytes_per_sector=16 sectors_per_track=16 platters=2
device 1 filesystem blocks=1024 bytes_per_sector=16 sectors_per_track=16 platters=2
";

    /// Kills whichever thread faults.
    pub(crate) struct KillingPager;

    impl PageFaultHandler for KillingPager {
        fn handle_page_fault(&self, system: &System, tid: Tid, _page: PageNumber) {
            system.threads.kill(tid);
        }
    }

    /// Maps the faulting page onto a free frame reserved for the faulting
    /// task, then reads it in from swap block `page`.
    pub(crate) struct SwapInPager;

    impl PageFaultHandler for SwapInPager {
        fn handle_page_fault(&self, system: &System, tid: Tid, page: PageNumber) {
            let Some(frame) = system.frames.claim_free() else {
                panic!("test ran out of frames");
            };
            let Some(pid) = system.threads.pid(tid) else {
                panic!("fault by unknown thread {}", tid);
            };
            system.pages.map(page, frame);
            system.frames.reserve(frame, pid);

            let file = system.files.open();
            let iorb = system.new_iorb(system.swap_device(), page, IoType::Read, tid, file, page);
            if let Err(rejected) = system.submit_io(iorb) {
                rejected.unwind(system);
            }
        }
    }

    pub(crate) struct Fixture {
        pub system: System,
        pub swap: DeviceId,
        pub disk: DeviceId,
        pub pid: Pid,
        pub tid: Tid,
        pub file: FileId,
        drivers: Vec<(DeviceId, Arc<SimulatedDisk>)>,
        next_page: AtomicU32,
    }

    pub(crate) fn fixture() -> Fixture {
        Fixture::with_config("")
    }

    impl Fixture {
        /// The base setup with `extra` configuration lines appended.
        pub fn with_config(extra: &str) -> Self {
            Self::with_pager(extra, NoPager)
        }

        pub fn with_pager(extra: &str, pager: impl PageFaultHandler + 'static) -> Self {
            let config = parse_config(&format!("{}{}", BASE_CONFIG, extra))
                .expect("valid test configuration");

            let mut drivers = Vec::new();
            let system = System::with_parts(
                &config,
                Box::new(pager),
                |device: &DeviceConfig| -> Box<dyn BlockDriver> {
                    let disk = Arc::new(SimulatedDisk::new());
                    drivers.push((device.id, Arc::clone(&disk)));
                    Box::new(disk)
                },
            )
            .expect("valid test system");

            let pid = system.processes.create();
            let tid = system.threads.spawn(pid);
            let file = system.files.open();

            Fixture {
                system,
                swap: 0,
                disk: 1,
                pid,
                tid,
                file,
                drivers,
                next_page: AtomicU32::new(0),
            }
        }

        pub fn spawn(&self) -> Tid {
            self.system.threads.spawn(self.pid)
        }

        /// A page not handed out before, resident in some frame.
        pub fn page(&self) -> PageNumber {
            let page = self.next_page.fetch_add(1, Ordering::Relaxed);
            let frames = FrameNumber::try_from(self.system.frames.len()).expect("few frames");
            self.system.pages.map(page, page % frames);
            page
        }

        pub fn read(&self, device: DeviceId, block: BlockNumber) -> Iorb {
            self.read_by(self.tid, device, block)
        }

        pub fn read_by(&self, tid: Tid, device: DeviceId, block: BlockNumber) -> Iorb {
            self.system
                .new_iorb(device, block, IoType::Read, tid, self.file, self.page())
        }

        /// Admits `iorb` directly on its device, without suspending the owner.
        pub fn admit(&self, iorb: Iorb) -> Admission {
            self.system
                .device(iorb.device())
                .enqueue(&self.system, iorb)
                .expect("admission accepted")
        }

        pub fn driver(&self, device: DeviceId) -> &SimulatedDisk {
            match self.drivers.iter().find(|(id, _)| *id == device) {
                Some((_, disk)) => disk,
                None => panic!("no driver for device {}", device),
            }
        }
    }

    #[test]
    fn builds_from_configuration() {
        let fx = fixture();
        assert_eq!(fx.system.devices.len(), 2);
        assert_eq!(fx.system.swap_device(), fx.swap);
        assert_eq!(fx.system.device(fx.swap).block_type(), BlockType::Swap);
        assert_eq!(
            fx.system.devices.by_name("disk1").map(Device::id),
            Some(fx.disk)
        );
        assert_eq!(fx.system.pages.len(), 256);
        assert_eq!(fx.system.frames.len(), 32);
    }

    #[test]
    fn default_simulation_builds() {
        let system = System::new(&crate::config::DEFAULT_SIMULATION).expect("valid default");
        assert_eq!(system.swap_device(), 0);
        assert!(!system.device(1).is_busy());
    }

    #[test]
    fn submit_suspends_the_owner_until_completion() {
        let fx = fixture();
        let iorb = fx.read(fx.disk, 0);
        let id = iorb.id();

        assert_eq!(
            fx.system.submit_io(iorb).expect("admission accepted"),
            Admission::Started
        );
        assert_eq!(fx.system.thread_status(fx.tid), ThreadStatus::Waiting);
        assert_eq!(fx.system.device(fx.disk).read_count(), 1);

        assert_eq!(fx.system.raise_disk_interrupt(fx.disk), Some(id));
        assert_eq!(fx.system.thread_status(fx.tid), ThreadStatus::Running);
        assert_eq!(fx.system.threads.running(), Some(fx.tid));
    }

    #[test]
    fn unknown_device_is_rejected_untouched() {
        let fx = fixture();
        let iorb = fx.system.new_iorb(7, 0, IoType::Write, fx.tid, fx.file, 0);

        let rejected = fx.system.submit_io(iorb).expect_err("no device 7");
        assert_eq!(rejected.reason, BlockError::UnknownDevice(7));
        assert!(!rejected.page_locked && !rejected.file_counted);
        assert_eq!(fx.system.thread_status(fx.tid), ThreadStatus::Ready);
    }

    #[test]
    fn spurious_interrupt_is_ignored() {
        let fx = fixture();
        assert_eq!(fx.system.raise_disk_interrupt(fx.disk), None);
        assert!(!fx.system.device(fx.disk).is_busy());
    }

    #[test]
    fn killing_a_thread_cancels_its_queued_io_everywhere() {
        let fx = fixture();
        let victim = fx.spawn();

        fx.admit(fx.read(fx.swap, 0));
        fx.admit(fx.read(fx.disk, 0));
        fx.admit(fx.read_by(victim, fx.swap, 8));
        fx.admit(fx.read_by(victim, fx.disk, 8));
        fx.admit(fx.read_by(victim, fx.disk, 16));

        assert_eq!(fx.system.kill_thread(victim), 3);
        assert_eq!(fx.system.device(fx.swap).queue_len(), 0);
        assert_eq!(fx.system.device(fx.disk).queue_len(), 0);
        assert_eq!(fx.system.files.iorb_count(fx.file), 2);
        assert_eq!(fx.system.kill_thread(victim), 0);
    }

    #[test]
    fn terminating_a_task_kills_its_threads() {
        let fx = fixture();
        let pid = fx.system.processes.create();
        let threads = [fx.system.threads.spawn(pid), fx.system.threads.spawn(pid)];

        fx.admit(fx.read(fx.disk, 0));
        for tid in threads {
            fx.admit(fx.read_by(tid, fx.disk, 8));
        }

        assert_eq!(fx.system.terminate_process(pid), 2);
        for tid in threads {
            assert_eq!(fx.system.thread_status(tid), ThreadStatus::Killed);
        }
        assert_eq!(fx.system.thread_status(fx.tid), ThreadStatus::Ready);
    }

    #[test]
    fn page_fault_may_issue_nested_io() {
        let fx = Fixture::with_pager("", SwapInPager);
        let page = 100;
        let iorb = fx
            .system
            .new_iorb(fx.disk, 4, IoType::Read, fx.tid, fx.file, page);

        // The swap-in starts first, then the outer request on the idle disk.
        assert_eq!(
            fx.system.submit_io(iorb).expect("admission accepted"),
            Admission::Started
        );
        assert_eq!(fx.system.pages.lock_count(page), 2);
        assert!(fx.system.device(fx.swap).is_busy());
        assert!(fx.system.device(fx.disk).is_busy());

        let frame = fx.system.pages.frame(page).expect("pager mapped the page");
        assert_eq!(fx.system.frames.reserved(frame), Some(fx.pid));

        fx.system.raise_disk_interrupt(fx.swap);
        fx.system.raise_disk_interrupt(fx.disk);
        assert_eq!(fx.system.pages.lock_count(page), 0);
        assert_eq!(fx.system.files.iorb_count(fx.file), 0);
        assert!(fx.system.frames.dirty(frame));
        assert_eq!(fx.system.threads.running(), Some(fx.tid));
    }

    #[test]
    fn state_dump_lists_devices_and_queues() {
        let fx = fixture();
        fx.admit(fx.read(fx.disk, 0));
        let queued = fx.read(fx.disk, 24);
        let id = queued.id();
        fx.admit(queued);

        let dump = format!("{}", fx.system);
        assert!(dump.contains("disk0"));
        assert!(dump.contains("disk1"));
        assert!(dump.contains(&format!("queued: IORB {}", id)));
        fx.system.dump_state();
    }
}
