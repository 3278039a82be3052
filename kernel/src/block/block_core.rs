use crate::block::bio_request::{Iorb, IorbId};
use crate::block::device::Device;
use crate::sync::mutex::Mutex;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use log::{debug, info};

/// Index of a block on a device. Every block holds exactly one page.
pub type BlockNumber = u32;

/// Identifier of a physical device in the device table.
pub type DeviceId = usize;

/// Seek-relevant position of a block on its device.
pub type Cylinder = u32;

/// What a device is used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockType {
    /// File system
    FileSystem,
    /// Paging area: transfers here move whole pages in and out of memory.
    Swap,
    /// "Raw" device with unidentified contents
    Raw,
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BlockType::FileSystem => write!(f, "File System"),
            BlockType::Swap => write!(f, "Swap"),
            BlockType::Raw => write!(f, "Raw"),
        }
    }
}

/// Lower-level interface to the disk hardware.
///
/// `start_io` only hands the request over and runs with the device locked;
/// the hardware reports completion later through
/// [`crate::system::System::raise_disk_interrupt`].
pub trait BlockDriver: Send + Sync {
    fn start_io(&self, device: DeviceId, iorb: &Iorb);
}

impl<T: BlockDriver + ?Sized> BlockDriver for Arc<T> {
    fn start_io(&self, device: DeviceId, iorb: &Iorb) {
        (**self).start_io(device, iorb)
    }
}

/// A disk that transfers instantly and remembers what it was asked to do.
#[derive(Default)]
pub struct SimulatedDisk {
    started: Mutex<Vec<IorbId>>,
}

impl SimulatedDisk {
    pub const fn new() -> Self {
        Self {
            started: Mutex::new(Vec::new()),
        }
    }

    /// IORBs handed to this disk, in start order.
    pub fn started(&self) -> Vec<IorbId> {
        self.started.lock().clone()
    }
}

impl BlockDriver for SimulatedDisk {
    fn start_io(&self, device: DeviceId, iorb: &Iorb) {
        debug!(
            "disk {}: start {} of block {} for thread {}",
            device,
            iorb.io_type(),
            iorb.block(),
            iorb.tid()
        );
        self.started.lock().push(iorb.id());
    }
}

/// Maintain a list of devices
pub struct DeviceTable {
    all_devices: Vec<Device>,
}

impl Default for DeviceTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceTable {
    pub const fn new() -> Self {
        DeviceTable {
            all_devices: Vec::new(),
        }
    }

    /// Registers `device`. Panics if its id is already taken.
    pub fn register_device(&mut self, device: Device) -> DeviceId {
        let id = device.id();
        assert!(
            self.by_id(id).is_none(),
            "device id {} registered twice",
            id
        );

        info!(
            "Registered block device \"{}\" ({} type) with {} blocks",
            device.name(),
            device.block_type(),
            device.blocks(),
        );

        self.all_devices.push(device);
        id
    }

    /// Get the device with the given `id`.
    pub fn by_id(&self, id: DeviceId) -> Option<&Device> {
        self.all_devices.iter().find(|d| d.id() == id)
    }

    /// Get the device with the given `name`.
    pub fn by_name(&self, name: &str) -> Option<&Device> {
        self.all_devices.iter().find(|d| d.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.all_devices.iter()
    }

    pub fn len(&self) -> usize {
        self.all_devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_devices.is_empty()
    }
}

impl fmt::Display for DeviceTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Block Devices:")?;
        for device in &self.all_devices {
            writeln!(f, "{}", device)?;
        }
        Ok(())
    }
}
