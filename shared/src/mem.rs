//! Address-space constants of the simulated machine.
//!
//! A virtual address is `VIRTUAL_ADDRESS_BITS` wide. The top
//! `PAGE_ADDRESS_BITS` select the page and the remaining low bits are the
//! offset inside it, so a page (and a disk block, which holds exactly one
//! page) is `2^(VIRTUAL_ADDRESS_BITS - PAGE_ADDRESS_BITS)` bytes.

pub const VIRTUAL_ADDRESS_BITS: u8 = 16;
pub const PAGE_ADDRESS_BITS: u8 = 10;

// 64 bytes with the defaults above.
pub const PAGE_FRAME_SIZE: usize = 1 << (VIRTUAL_ADDRESS_BITS - PAGE_ADDRESS_BITS);

/// Number of distinct pages an address space can hold.
pub const PAGES_PER_ADDRESS_SPACE: usize = 1 << PAGE_ADDRESS_BITS;
