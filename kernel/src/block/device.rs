use crate::block::bio_core::{seek_distance, BioScheduler};
use crate::block::bio_request::{IoType, Iorb, IorbId};
use crate::block::block_core::{BlockDriver, BlockNumber, BlockType, Cylinder, DeviceId};
use crate::block::block_error::{BlockError, Rejected};
use crate::block::geometry::{resolve_cylinder, AddressGeometry, DiskGeometry};
use crate::config::DeviceConfig;
use crate::sync::mutex::Mutex;
use crate::system::System;
use crate::threading::{ThreadStatus, Tid};
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use log::{debug, warn};

/// How an accepted IORB entered its device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The device was idle and the request went straight to the hardware.
    Started,
    /// The device was busy; the request waits in the queue.
    Queued,
}

struct DeviceState {
    busy: bool,
    /// The request the hardware is working on, until its interrupt is taken.
    in_flight: Option<Iorb>,
    current_cylinder: Cylinder,
    /// Total cylinders travelled by scheduled selections.
    head_position: u64,
    scheduler: Box<dyn BioScheduler>,
    read_count: u64,
    write_count: u64,
}

/// A physical disk with its request queue.
///
/// The busy flag, head and queue live behind one lock, so a completion and
/// any number of concurrent admissions agree on which single request is in
/// flight.
pub struct Device {
    id: DeviceId,
    name: String,
    block_type: BlockType,
    blocks: BlockNumber,
    geometry: DiskGeometry,
    address: AddressGeometry,
    driver: Box<dyn BlockDriver>,
    state: Mutex<DeviceState>,
}

impl Device {
    /// Builds an idle device with its head on cylinder 0.
    ///
    /// Panics if a block does not fit on one of the device's tracks;
    /// [`crate::config::SimulationConfig::validate`] rejects such setups first.
    pub fn new(
        config: &DeviceConfig,
        address: AddressGeometry,
        scheduler: Box<dyn BioScheduler>,
        driver: Box<dyn BlockDriver>,
    ) -> Self {
        if let Err(e) = config.geometry.check(&address) {
            panic!("device {}: {}", config.id, e);
        }

        Self {
            id: config.id,
            name: config.name.clone(),
            block_type: config.kind,
            blocks: config.blocks,
            geometry: config.geometry,
            address,
            driver,
            state: Mutex::new(DeviceState {
                busy: false,
                in_flight: None,
                current_cylinder: 0,
                head_position: 0,
                scheduler,
                read_count: 0,
                write_count: 0,
            }),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    pub fn blocks(&self) -> BlockNumber {
        self.blocks
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().busy
    }

    /// Cumulative seek distance of every scheduled selection so far.
    pub fn head_position(&self) -> u64 {
        self.state.lock().head_position
    }

    /// Cylinder of the request most recently started.
    pub fn current_cylinder(&self) -> Cylinder {
        self.state.lock().current_cylinder
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().scheduler.len()
    }

    pub fn queued_ids(&self) -> Vec<IorbId> {
        let state = self.state.lock();
        state.scheduler.queued().iter().map(Iorb::id).collect()
    }

    pub fn in_flight(&self) -> Option<IorbId> {
        self.state.lock().in_flight.as_ref().map(Iorb::id)
    }

    pub fn read_count(&self) -> u64 {
        self.state.lock().read_count
    }

    pub fn write_count(&self) -> u64 {
        self.state.lock().write_count
    }

    pub fn resolve_cylinder(&self, block: BlockNumber) -> Cylinder {
        resolve_cylinder(block, &self.geometry, &self.address)
    }

    /// Admits `iorb`: pins its page, counts it against its file, resolves its
    /// cylinder, then starts it or queues it.
    ///
    /// Locking the page may fault, and the pager may suspend or kill the
    /// owner meanwhile, so the owner is checked again afterwards. A killed
    /// owner gets the request back as [`Rejected`] with the page still locked.
    /// A page already pinned `MAX_PAGE_LOCKS` times is refused outright.
    pub fn enqueue(&self, system: &System, iorb: Iorb) -> Result<Admission, Rejected> {
        assert_eq!(
            iorb.device(),
            self.id,
            "IORB {} admitted to the wrong device",
            iorb.id()
        );
        assert!(
            iorb.block() < self.blocks,
            "IORB {}: block {} beyond the {} blocks of device {}",
            iorb.id(),
            iorb.block(),
            self.blocks,
            self.id
        );

        if !system.pages.lock(system, iorb.page(), iorb.tid()) {
            warn!("{} rejected: page {} has no lock to spare", iorb, iorb.page());
            return Err(Rejected {
                reason: BlockError::PageLockLimit(iorb.page()),
                iorb,
                page_locked: false,
                file_counted: false,
            });
        }

        let file_counted = system.thread_status(iorb.tid()) != ThreadStatus::Killed;
        if file_counted {
            system.files.increment_iorb_count(iorb.file());
        }

        iorb.set_cylinder(self.resolve_cylinder(iorb.block()));

        if system.thread_status(iorb.tid()) == ThreadStatus::Killed {
            debug!("{} rejected: thread {} killed", iorb, iorb.tid());
            return Err(Rejected {
                reason: BlockError::ThreadKilled,
                iorb,
                page_locked: true,
                file_counted,
            });
        }

        let mut state = self.state.lock();
        if state.busy {
            debug!("device {}: queued {}", self.id, iorb);
            state.scheduler.enqueue(iorb);
            Ok(Admission::Queued)
        } else {
            debug!("device {}: started {} on idle device", self.id, iorb);
            self.start_locked(&mut state, iorb);
            Ok(Admission::Started)
        }
    }

    /// Removes and returns the next request to service, or `None` if the
    /// queue is empty. The head moves to the returned request's cylinder and
    /// the distance is added to [`Device::head_position`].
    pub fn dequeue(&self) -> Option<Iorb> {
        let mut state = self.state.lock();
        self.select_locked(&mut state)
    }

    /// Hands `iorb` to the hardware. Panics if the device is busy.
    pub fn start_io(&self, iorb: Iorb) {
        let mut state = self.state.lock();
        self.start_locked(&mut state, iorb);
    }

    /// Takes the request whose transfer just finished. The device stays busy
    /// until [`Device::restart`].
    pub(crate) fn take_in_flight(&self) -> Option<Iorb> {
        self.state.lock().in_flight.take()
    }

    /// Marks the device idle, then starts the next selected request, if any.
    pub(crate) fn restart(&self) -> Option<IorbId> {
        let mut state = self.state.lock();
        state.busy = false;
        let next = self.select_locked(&mut state)?;
        let id = next.id();
        self.start_locked(&mut state, next);
        Some(id)
    }

    /// Removes every queued request owned by the killed thread `tid`,
    /// releasing its page lock and file count and resuming its waiters.
    ///
    /// The request in flight is left to complete. Returns how many requests
    /// were cancelled.
    pub fn cancel_pending_io(&self, system: &System, tid: Tid) -> usize {
        if system.thread_status(tid) != ThreadStatus::Killed {
            warn!(
                "device {}: refusing to cancel I/O of live thread {}",
                self.id, tid
            );
            return 0;
        }

        let cancelled = self.state.lock().scheduler.remove_owned_by(tid);
        let count = cancelled.len();

        for mut iorb in cancelled {
            debug!("device {}: cancelled {}", self.id, iorb);
            system.pages.unlock(iorb.page());
            system.files.release_iorb(iorb.file());
            for waiter in iorb.take_waiters() {
                system.threads.resume(waiter);
            }
        }

        count
    }

    fn select_locked(&self, state: &mut DeviceState) -> Option<Iorb> {
        let current = state.current_cylinder;
        let iorb = state.scheduler.select(current)?;
        let distance = seek_distance(current, &iorb);

        state.head_position += u64::from(distance);
        if let Some(cylinder) = iorb.cylinder() {
            state.current_cylinder = cylinder;
        }

        debug!(
            "device {}: selected {} (seek {}, travelled {})",
            self.id, iorb, distance, state.head_position
        );
        Some(iorb)
    }

    fn start_locked(&self, state: &mut DeviceState, iorb: Iorb) {
        assert!(
            !state.busy,
            "device {}: {} started while another request is in flight",
            self.id,
            iorb
        );

        if let Some(cylinder) = iorb.cylinder() {
            state.current_cylinder = cylinder;
        }
        match iorb.io_type() {
            IoType::Read => state.read_count += 1,
            IoType::Write => state.write_count += 1,
        }
        state.busy = true;

        self.driver.start_io(self.id, &iorb);
        state.in_flight = Some(iorb);
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let state = self.state.lock();
        writeln!(
            f,
            "    {:<8}| {:<11} | {} blocks | {}",
            self.name, self.block_type, self.blocks, self.geometry
        )?;
        writeln!(
            f,
            "        busy: {} | cylinder: {} | travelled: {} | reads: {} | writes: {}",
            state.busy,
            state.current_cylinder,
            state.head_position,
            state.read_count,
            state.write_count
        )?;
        if let Some(iorb) = &state.in_flight {
            writeln!(f, "        in flight: {}", iorb)?;
        }
        for iorb in state.scheduler.queued() {
            writeln!(f, "        queued: {}", iorb)?;
        }
        Ok(())
    }
}
