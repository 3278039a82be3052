//! Mapping from block numbers to physical disk positions.

use crate::block::block_core::{BlockNumber, Cylinder};
use crate::config::ConfigError;
use core::fmt;
use disksim_shared::mem::{PAGE_ADDRESS_BITS, VIRTUAL_ADDRESS_BITS};

/// Width of the simulated virtual address and of its page-number part.
///
/// Blocks are page sized, so these two widths fix the block size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressGeometry {
    virtual_address_bits: u8,
    page_address_bits: u8,
}

impl AddressGeometry {
    pub fn new(virtual_address_bits: u8, page_address_bits: u8) -> Result<Self, ConfigError> {
        if virtual_address_bits > 32 || page_address_bits >= virtual_address_bits {
            return Err(ConfigError::AddressBits {
                virtual_address_bits,
                page_address_bits,
            });
        }
        Ok(Self {
            virtual_address_bits,
            page_address_bits,
        })
    }

    pub fn virtual_address_bits(&self) -> u8 {
        self.virtual_address_bits
    }

    pub fn page_address_bits(&self) -> u8 {
        self.page_address_bits
    }

    /// Bytes per block (and per page).
    pub fn block_size(&self) -> u64 {
        1 << (self.virtual_address_bits - self.page_address_bits)
    }
}

impl Default for AddressGeometry {
    fn default() -> Self {
        Self {
            virtual_address_bits: VIRTUAL_ADDRESS_BITS,
            page_address_bits: PAGE_ADDRESS_BITS,
        }
    }
}

/// Physical layout of one disk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskGeometry {
    bytes_per_sector: u32,
    sectors_per_track: u32,
    platters: u32,
}

impl DiskGeometry {
    pub fn new(
        bytes_per_sector: u32,
        sectors_per_track: u32,
        platters: u32,
    ) -> Result<Self, ConfigError> {
        if bytes_per_sector == 0 || sectors_per_track == 0 || platters == 0 {
            return Err(ConfigError::ZeroGeometry);
        }
        Ok(Self {
            bytes_per_sector,
            sectors_per_track,
            platters,
        })
    }

    pub fn bytes_per_sector(&self) -> u32 {
        self.bytes_per_sector
    }

    pub fn sectors_per_track(&self) -> u32 {
        self.sectors_per_track
    }

    pub fn platters(&self) -> u32 {
        self.platters
    }

    /// Checks that at least one whole block fits on a track of this disk, which
    /// keeps every division in [`resolve_cylinder`] well defined.
    pub fn check(&self, address: &AddressGeometry) -> Result<(), ConfigError> {
        let sectors_per_block = address.block_size() / u64::from(self.bytes_per_sector);
        if sectors_per_block == 0 || u64::from(self.sectors_per_track) < sectors_per_block {
            return Err(ConfigError::BlockDoesNotFit {
                block_size: address.block_size(),
                bytes_per_sector: self.bytes_per_sector,
                sectors_per_track: self.sectors_per_track,
            });
        }
        Ok(())
    }
}

impl fmt::Display for DiskGeometry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} B/sector, {} sectors/track, {} platters",
            self.bytes_per_sector, self.sectors_per_track, self.platters
        )
    }
}

/// Returns the cylinder holding `block`.
///
/// All divisions truncate. The geometry must have passed
/// [`DiskGeometry::check`] against `address`.
pub fn resolve_cylinder(
    block: BlockNumber,
    disk: &DiskGeometry,
    address: &AddressGeometry,
) -> Cylinder {
    let sectors_per_block = address.block_size() / u64::from(disk.bytes_per_sector);
    let blocks_per_track = u64::from(disk.sectors_per_track) / sectors_per_block;
    let blocks_per_cylinder = blocks_per_track * u64::from(disk.platters);

    match Cylinder::try_from(u64::from(block) / blocks_per_cylinder) {
        Ok(cylinder) => cylinder,
        Err(_) => unreachable!("a quotient of a u32 block number fits in u32"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_disk() -> (DiskGeometry, AddressGeometry) {
        // 64-byte blocks over 16-byte sectors: 4 sectors per block, 4 blocks
        // per track, 8 blocks per cylinder.
        let address = AddressGeometry::new(16, 10).expect("valid address geometry");
        let disk = DiskGeometry::new(16, 16, 2).expect("valid disk geometry");
        disk.check(&address).expect("block fits on a track");
        (disk, address)
    }

    #[test]
    fn test_resolve_cylinder() {
        let (disk, address) = small_disk();
        assert_eq!(resolve_cylinder(0, &disk, &address), 0);
        assert_eq!(resolve_cylinder(7, &disk, &address), 0);
        assert_eq!(resolve_cylinder(8, &disk, &address), 1);
        assert_eq!(resolve_cylinder(63, &disk, &address), 7);
        assert_eq!(resolve_cylinder(400, &disk, &address), 50);
    }

    #[test]
    fn partial_tracks_are_truncated() {
        // 256-byte blocks over 64-byte sectors: 4 sectors per block, so a
        // 10-sector track holds 2 whole blocks; 3 platters make 6 per cylinder.
        let address = AddressGeometry::new(12, 4).expect("valid address geometry");
        let disk = DiskGeometry::new(64, 10, 3).expect("valid disk geometry");
        disk.check(&address).expect("block fits on a track");

        assert_eq!(resolve_cylinder(5, &disk, &address), 0);
        assert_eq!(resolve_cylinder(6, &disk, &address), 1);
        assert_eq!(resolve_cylinder(61, &disk, &address), 10);
    }

    #[test]
    fn default_address_geometry_uses_shared_constants() {
        let address = AddressGeometry::default();
        assert_eq!(
            address.block_size(),
            disksim_shared::mem::PAGE_FRAME_SIZE as u64
        );
    }

    #[test]
    fn misconfigured_geometry_is_rejected() {
        assert_eq!(DiskGeometry::new(0, 16, 2), Err(ConfigError::ZeroGeometry));
        assert!(AddressGeometry::new(10, 10).is_err());
        assert!(AddressGeometry::new(40, 10).is_err());

        // 64-byte blocks do not fit on a track of two 16-byte sectors.
        let address = AddressGeometry::new(16, 10).expect("valid address geometry");
        let disk = DiskGeometry::new(16, 2, 1).expect("non-zero geometry");
        assert!(disk.check(&address).is_err());

        // Sectors larger than a block leave zero sectors per block.
        let disk = DiskGeometry::new(128, 16, 1).expect("non-zero geometry");
        assert!(disk.check(&address).is_err());
    }
}
