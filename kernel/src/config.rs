//! Simulation setup: address geometry, devices, and table sizes.
//!
//! Configurations are written one directive per line:
//!
//! ```text
//! address_bits 16 10        # virtual bits, page-number bits
//! scheduler sstf            # or fifo
//! swap_device 0
//! pages 64
//! frames 16
//! device 0 swap blocks=256 bytes_per_sector=16 sectors_per_track=16 platters=2
//! ```

use crate::block::bio_core::SchedulerKind;
use crate::block::block_core::{BlockNumber, BlockType, DeviceId};
use crate::block::geometry::{AddressGeometry, DiskGeometry};
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use core::error::Error;
use core::fmt::{Debug, Display, Formatter};
use core::str::FromStr;
use crate::mem::page_table::PageNumber;
use disksim_shared::mem::PAGES_PER_ADDRESS_SPACE;
use disksim_shared::paging::MAX_FRAMES;
use lazy_static::lazy_static;
use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit1, space1};
use nom::combinator::{all_consuming, map, map_res, value};
use nom::sequence::{preceded, tuple};
use nom::IResult;

pub const DEFAULT_CONFIG: &str = "\
address_bits 16 10
scheduler sstf
swap_device 0
pages 64
frames 16
device 0 swap blocks=512 bytes_per_sector=16 sectors_per_track=16 platters=2
device 1 filesystem blocks=1024 bytes_per_sector=16 sectors_per_track=32 platters=4
";

const DEFAULT_PAGES: usize = PAGES_PER_ADDRESS_SPACE;
const DEFAULT_FRAMES: usize = 16;

lazy_static! {
    /// The built-in configuration, parsed once.
    pub static ref DEFAULT_SIMULATION: SimulationConfig = match parse_config(DEFAULT_CONFIG) {
        Ok(config) => config,
        Err(e) => panic!("built-in configuration is invalid: {}", e),
    };
}

#[derive(Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A line could not be parsed (1-based line number).
    Parse { line: usize, text: String },
    /// A disk was configured with zero sectors, tracks, or platters.
    ZeroGeometry,
    /// The page-number part of an address must be narrower than the address.
    AddressBits {
        virtual_address_bits: u8,
        page_address_bits: u8,
    },
    /// Not even one block fits on a track.
    BlockDoesNotFit {
        block_size: u64,
        bytes_per_sector: u32,
        sectors_per_track: u32,
    },
    DuplicateDevice(DeviceId),
    /// The swap device is not configured, or is not of swap type.
    MissingSwapDevice(Option<DeviceId>),
    /// More frames than a page table entry can name.
    TooManyFrames(usize),
    /// More pages than a page number can index.
    TooManyPages(usize),
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::Parse { line, .. } => write!(f, "Parse(line {})", line),
            ConfigError::ZeroGeometry => write!(f, "ZeroGeometry"),
            ConfigError::AddressBits { .. } => write!(f, "AddressBits"),
            ConfigError::BlockDoesNotFit { .. } => write!(f, "BlockDoesNotFit"),
            ConfigError::DuplicateDevice(id) => write!(f, "DuplicateDevice({})", id),
            ConfigError::MissingSwapDevice(id) => write!(f, "MissingSwapDevice({:?})", id),
            ConfigError::TooManyFrames(n) => write!(f, "TooManyFrames({})", n),
            ConfigError::TooManyPages(n) => write!(f, "TooManyPages({})", n),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::Parse { line, text } => {
                write!(f, "line {}: cannot parse \"{}\"", line, text)
            }
            ConfigError::ZeroGeometry => {
                write!(f, "sector size, track size and platter count must be non-zero")
            }
            ConfigError::AddressBits {
                virtual_address_bits,
                page_address_bits,
            } => write!(
                f,
                "{} page bits do not fit in a {}-bit address",
                page_address_bits, virtual_address_bits
            ),
            ConfigError::BlockDoesNotFit {
                block_size,
                bytes_per_sector,
                sectors_per_track,
            } => write!(
                f,
                "a {}-byte block does not fit on a track of {} {}-byte sectors",
                block_size, sectors_per_track, bytes_per_sector
            ),
            ConfigError::DuplicateDevice(id) => write!(f, "device {} configured twice", id),
            ConfigError::MissingSwapDevice(Some(id)) => {
                write!(f, "swap device {} is not a configured swap device", id)
            }
            ConfigError::MissingSwapDevice(None) => write!(f, "no swap device configured"),
            ConfigError::TooManyFrames(n) => {
                write!(f, "{} frames configured, at most {} supported", n, MAX_FRAMES)
            }
            ConfigError::TooManyPages(n) => {
                write!(f, "{} pages configured, page numbers stop at {}", n, PageNumber::MAX)
            }
        }
    }
}

impl Error for ConfigError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceConfig {
    pub id: DeviceId,
    pub name: String,
    pub kind: BlockType,
    pub blocks: BlockNumber,
    pub geometry: DiskGeometry,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationConfig {
    pub address: AddressGeometry,
    pub swap_device: DeviceId,
    pub scheduler: SchedulerKind,
    pub pages: usize,
    pub frames: usize,
    pub devices: Vec<DeviceConfig>,
}

impl SimulationConfig {
    /// Checks the cross-field constraints the parser cannot see line by line.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frames > MAX_FRAMES {
            return Err(ConfigError::TooManyFrames(self.frames));
        }
        if PageNumber::try_from(self.pages.saturating_sub(1)).is_err() {
            return Err(ConfigError::TooManyPages(self.pages));
        }
        for (i, device) in self.devices.iter().enumerate() {
            if self.devices[..i].iter().any(|d| d.id == device.id) {
                return Err(ConfigError::DuplicateDevice(device.id));
            }
            device.geometry.check(&self.address)?;
        }
        match self.devices.iter().find(|d| d.id == self.swap_device) {
            Some(device) if device.kind == BlockType::Swap => Ok(()),
            _ => Err(ConfigError::MissingSwapDevice(Some(self.swap_device))),
        }
    }
}

#[derive(Clone)]
enum Directive {
    AddressBits(u8, u8),
    Scheduler(SchedulerKind),
    SwapDevice(DeviceId),
    Pages(usize),
    Frames(usize),
    Device {
        id: DeviceId,
        kind: BlockType,
        blocks: BlockNumber,
        bytes_per_sector: u32,
        sectors_per_track: u32,
        platters: u32,
    },
}

fn number<T: FromStr>(input: &str) -> IResult<&str, T> {
    map_res(digit1, str::parse::<T>)(input)
}

fn setting<'a, T: FromStr>(key: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, T> {
    preceded(tuple((space1, tag(key), char('='))), number::<T>)
}

fn address_bits(input: &str) -> IResult<&str, Directive> {
    map(
        tuple((tag("address_bits"), space1, number, space1, number)),
        |(_, _, virtual_bits, _, page_bits)| Directive::AddressBits(virtual_bits, page_bits),
    )(input)
}

fn scheduler(input: &str) -> IResult<&str, Directive> {
    map(
        preceded(
            tuple((tag("scheduler"), space1)),
            alt((
                value(SchedulerKind::Sstf, tag("sstf")),
                value(SchedulerKind::Fifo, tag("fifo")),
            )),
        ),
        Directive::Scheduler,
    )(input)
}

fn counted<'a>(
    key: &'static str,
    directive: fn(usize) -> Directive,
) -> impl FnMut(&'a str) -> IResult<&'a str, Directive> {
    map(preceded(tuple((tag(key), space1)), number::<usize>), directive)
}

fn block_type(input: &str) -> IResult<&str, BlockType> {
    alt((
        value(BlockType::Swap, tag("swap")),
        value(BlockType::FileSystem, tag("filesystem")),
        value(BlockType::Raw, tag("raw")),
    ))(input)
}

fn device(input: &str) -> IResult<&str, Directive> {
    map(
        tuple((
            tag("device"),
            space1,
            number,
            space1,
            block_type,
            setting("blocks"),
            setting("bytes_per_sector"),
            setting("sectors_per_track"),
            setting("platters"),
        )),
        |(_, _, id, _, kind, blocks, bytes_per_sector, sectors_per_track, platters)| {
            Directive::Device {
                id,
                kind,
                blocks,
                bytes_per_sector,
                sectors_per_track,
                platters,
            }
        },
    )(input)
}

fn directive(input: &str) -> IResult<&str, Directive> {
    alt((
        address_bits,
        scheduler,
        counted("swap_device", Directive::SwapDevice),
        counted("pages", Directive::Pages),
        counted("frames", Directive::Frames),
        device,
    ))(input)
}

/// Parses and validates a configuration.
///
/// Omitted settings fall back to the shared defaults; without a
/// `swap_device` line the first swap-type device is used.
pub fn parse_config(text: &str) -> Result<SimulationConfig, ConfigError> {
    let mut address = AddressGeometry::default();
    let mut scheduler = SchedulerKind::default();
    let mut swap_device = None;
    let mut pages = DEFAULT_PAGES;
    let mut frames = DEFAULT_FRAMES;
    let mut devices = Vec::new();

    for (n, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let parsed = all_consuming(directive)(line).map_err(|_| ConfigError::Parse {
            line: n + 1,
            text: String::from(line),
        })?;

        match parsed.1 {
            Directive::AddressBits(virtual_bits, page_bits) => {
                address = AddressGeometry::new(virtual_bits, page_bits)?;
            }
            Directive::Scheduler(kind) => scheduler = kind,
            Directive::SwapDevice(id) => swap_device = Some(id),
            Directive::Pages(count) => pages = count,
            Directive::Frames(count) => frames = count,
            Directive::Device {
                id,
                kind,
                blocks,
                bytes_per_sector,
                sectors_per_track,
                platters,
            } => devices.push(DeviceConfig {
                id,
                name: format!("disk{}", id),
                kind,
                blocks,
                geometry: DiskGeometry::new(bytes_per_sector, sectors_per_track, platters)?,
            }),
        }
    }

    let swap_device = swap_device
        .or_else(|| {
            devices
                .iter()
                .find(|d: &&DeviceConfig| d.kind == BlockType::Swap)
                .map(|d| d.id)
        })
        .ok_or(ConfigError::MissingSwapDevice(None))?;

    let config = SimulationConfig {
        address,
        swap_device,
        scheduler,
        pages,
        frames,
        devices,
    };
    config.validate()?;
    Ok(config)
}
