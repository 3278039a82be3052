use crate::sync::mutex::Mutex;
use crate::threading::Pid;
use alloc::vec;
use alloc::vec::Vec;
use bitbybit::bitfield;
use core::fmt;

pub type FrameNumber = u32;

#[bitfield(u8, default = 0)]
pub struct FrameFlags {
    #[bit(0, rw)]
    referenced: bool,
    #[bit(1, rw)]
    dirty: bool,
    #[bit(2, rw)]
    in_use: bool,
}

#[derive(Clone, Copy)]
pub struct FrameTableEntry {
    pub flags: FrameFlags,
    /// Task holding this frame for a pending page-in, if any.
    pub reserved_by: Option<Pid>,
}

impl Default for FrameTableEntry {
    fn default() -> Self {
        Self {
            flags: FrameFlags::default(),
            reserved_by: None,
        }
    }
}

pub struct FrameTable {
    frames: Mutex<Vec<FrameTableEntry>>,
}

impl FrameTable {
    pub fn new(frame_count: usize) -> Self {
        FrameTable {
            frames: Mutex::new(vec![FrameTableEntry::default(); frame_count]),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entry(&self, frame: FrameNumber) -> FrameTableEntry {
        self.update(frame, |_| {})
    }

    pub fn referenced(&self, frame: FrameNumber) -> bool {
        self.entry(frame).flags.referenced()
    }

    pub fn dirty(&self, frame: FrameNumber) -> bool {
        self.entry(frame).flags.dirty()
    }

    pub fn set_referenced(&self, frame: FrameNumber, referenced: bool) {
        self.update(frame, |e| e.flags = e.flags.with_referenced(referenced));
    }

    pub fn set_dirty(&self, frame: FrameNumber, dirty: bool) {
        self.update(frame, |e| e.flags = e.flags.with_dirty(dirty));
    }

    pub fn reserved(&self, frame: FrameNumber) -> Option<Pid> {
        self.entry(frame).reserved_by
    }

    pub fn reserve(&self, frame: FrameNumber, pid: Pid) {
        self.update(frame, |e| e.reserved_by = Some(pid));
    }

    /// Drops the reservation `pid` holds on `frame`. A reservation held by
    /// another task is left alone.
    pub fn set_unreserved(&self, frame: FrameNumber, pid: Pid) {
        self.update(frame, |e| {
            if e.reserved_by == Some(pid) {
                e.reserved_by = None;
            }
        });
    }

    /// Claims the lowest-numbered frame nobody uses.
    pub fn claim_free(&self) -> Option<FrameNumber> {
        let mut frames = self.frames.lock();
        let index = frames
            .iter()
            .position(|e| !e.flags.in_use() && e.reserved_by.is_none())?;
        frames[index].flags = frames[index].flags.with_in_use(true);
        FrameNumber::try_from(index).ok()
    }

    fn update(
        &self,
        frame: FrameNumber,
        op: impl FnOnce(&mut FrameTableEntry),
    ) -> FrameTableEntry {
        let mut frames = self.frames.lock();
        let len = frames.len();
        let Some(entry) = frames.get_mut(frame as usize) else {
            panic!("frame {} out of range ({} frames)", frame, len);
        };
        op(entry);
        *entry
    }
}

impl fmt::Display for FrameTable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let frames = self.frames.lock();
        writeln!(f, "Frames:")?;
        for (i, e) in frames.iter().enumerate().filter(|(_, e)| e.flags.in_use()) {
            write!(
                f,
                "    {:04} | referenced: {} | dirty: {}",
                i,
                e.flags.referenced(),
                e.flags.dirty()
            )?;
            match e.reserved_by {
                Some(pid) => writeln!(f, " | reserved by task {}", pid)?,
                None => writeln!(f)?,
            }
        }
        Ok(())
    }
}
