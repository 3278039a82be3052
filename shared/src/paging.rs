// Page table entries of the simulated MMU. Unlike the x86 layout these carry a
// lock count instead of permission bits: a page stays pinned for as long as
// any block transfer into or out of it is outstanding.

use arbitrary_int::{u11, u20};
use bitbybit::bitfield;

/// Largest number of simultaneous locks a single page can hold.
pub const MAX_PAGE_LOCKS: u16 = (1 << 11) - 1;

/// Number of frames a `frame_number` can address.
pub const MAX_FRAMES: usize = 1 << 20;

#[bitfield(u32, default = 0)]
pub struct PageTableEntry {
    #[bit(0, rw)]
    present: bool,
    #[bits(1..=11, rw)]
    lock_count: u11,
    #[bits(12..=31, rw)]
    frame_number: u20,
}

impl PageTableEntry {
    pub fn is_locked(&self) -> bool {
        self.lock_count().value() != 0
    }

    /// Returns the entry with one more lock taken.
    ///
    /// Panics if the page already holds `MAX_PAGE_LOCKS` locks.
    pub fn locked(self) -> Self {
        let count = self.lock_count().value();
        assert!(count < MAX_PAGE_LOCKS, "page lock count overflow");
        self.with_lock_count(u11::new(count + 1))
    }

    /// Returns the entry with one lock released.
    ///
    /// Panics if the page is not locked.
    pub fn unlocked(self) -> Self {
        let count = self.lock_count().value();
        assert!(count > 0, "unlocking a page that is not locked");
        self.with_lock_count(u11::new(count - 1))
    }

    /// Returns the entry mapped to `frame` and marked present.
    pub fn mapped(self, frame: u32) -> Self {
        self.with_frame_number(u20::new(frame)).with_present(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_count_round_trip() {
        let entry = PageTableEntry::default().locked().locked();
        assert_eq!(entry.lock_count().value(), 2);
        assert!(entry.is_locked());

        let entry = entry.unlocked().unlocked();
        assert!(!entry.is_locked());
    }

    #[test]
    fn mapping_keeps_locks() {
        let entry = PageTableEntry::default().locked().mapped(0x3f);
        assert!(entry.present());
        assert_eq!(entry.frame_number().value(), 0x3f);
        assert_eq!(entry.lock_count().value(), 1);
    }

    #[test]
    fn lock_count_reaches_its_maximum() {
        let mut entry = PageTableEntry::default().mapped(MAX_FRAMES as u32 - 1);
        for _ in 0..MAX_PAGE_LOCKS {
            entry = entry.locked();
        }
        assert_eq!(entry.lock_count().value(), MAX_PAGE_LOCKS);
        assert_eq!(entry.frame_number().value(), MAX_FRAMES as u32 - 1);
        assert!(entry.present());
    }

    #[test]
    #[should_panic(expected = "page lock count overflow")]
    fn lock_overflow_is_fatal() {
        let mut entry = PageTableEntry::default();
        for _ in 0..=MAX_PAGE_LOCKS {
            entry = entry.locked();
        }
    }

    #[test]
    #[should_panic(expected = "not locked")]
    fn unlock_underflow_is_fatal() {
        let _ = PageTableEntry::default().unlocked();
    }
}
