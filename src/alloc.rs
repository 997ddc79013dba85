//! Allocator churn: allocate a series of memory blocks, then free them
//!
//! Each block is touched once per page as soon as it is allocated, so that the
//! operating system really has to back it with physical memory instead of
//! lazily mapping a zero page. Blocks are freed in the order where they were
//! allocated, and the number of live blocks and bytes is reported after every
//! step.

use crate::cli::{self, UsageError};
use clap::Parser;
use std::{
    collections::VecDeque,
    fmt,
    io::{self, Write},
    time::Duration,
};

/// Granularity at which memory is touched
///
/// Touching one byte per 4 KiB commits every page on platforms whose page size
/// is 4 KiB or a multiple thereof.
///
pub const PAGE_SIZE: usize = 4096;

/// Byte value written to touched pages
const TOUCH_VALUE: u8 = 123;

/// Positional arguments of the allocator churn tool
#[derive(Debug, Parser)]
#[clap(
    about = "Allocate then free a number of page-touched memory blocks",
    disable_help_flag = true,
    disable_version_flag = true
)]
pub struct Args {
    /// Size of each block, in bytes
    #[clap(value_name = "block_size", allow_hyphen_values = true)]
    block_size: String,

    /// Pause after each allocation or release, in microseconds
    #[clap(value_name = "usleep", allow_hyphen_values = true)]
    usleep: String,

    /// Number of blocks to allocate
    #[clap(value_name = "num_blocks", allow_hyphen_values = true)]
    num_blocks: String,
}

/// Validated allocator churn configuration
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Churn {
    /// Size of each block in bytes
    pub block_size: usize,

    /// Pause after each step
    pub delay: Duration,

    /// Number of blocks to allocate
    pub num_blocks: u64,
}
//
impl Churn {
    /// Validate the command line of the allocator churn tool
    pub fn from_args(argv: &[String]) -> Result<Self, UsageError> {
        let args = cli::parse_raw::<Args>(argv)?;
        let block_size = cli::validate("block_size", &args.block_size, |s| {
            // Allocations larger than isize::MAX bytes are not allowed
            let size = cli::parse_uint(s)?;
            usize::try_from(size)
                .ok()
                .filter(|&size| isize::try_from(size).is_ok())
                .ok_or(cli::ParseError::Overflow)
        })?;
        let usleep = cli::validate("usleep", &args.usleep, cli::parse_uint)?;
        let num_blocks = cli::validate("num_blocks", &args.num_blocks, cli::parse_uint)?;
        Ok(Self {
            block_size,
            delay: Duration::from_micros(usleep),
            num_blocks,
        })
    }

    /// Run the allocate-then-free cycle
    ///
    /// Progress lines are written to `output`, and `pause` is called with the
    /// configured delay after each allocation and each release. Returns the
    /// final state of the counters, which should be all zeroes.
    ///
    pub fn run(
        &self,
        mut output: impl Write,
        mut pause: impl FnMut(Duration),
    ) -> io::Result<Ledger> {
        log::debug!(
            "Allocating {} blocks of {} bytes, pausing {:?} between steps",
            self.num_blocks,
            self.block_size,
            self.delay
        );
        let mut ledger = Ledger::default();
        let mut live = VecDeque::new();
        writeln!(output, "+{ledger}")?;

        for _ in 0..self.num_blocks {
            live.push_back(Block::allocate(self.block_size));
            ledger.grow(self.block_size);
            writeln!(output, "+{ledger}")?;
            pause(self.delay);
        }
        writeln!(output, "all allocated")?;

        while let Some(block) = live.pop_front() {
            std::mem::drop(block);
            ledger.shrink(self.block_size);
            writeln!(output, "-{ledger}")?;
            pause(self.delay);
        }
        output.flush()?;
        Ok(ledger)
    }
}

/// Counters of live blocks and bytes
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Ledger {
    /// Number of live blocks
    pub blocks: u64,

    /// Number of live bytes
    pub total: u64,
}
//
impl Ledger {
    /// Account for a new block
    fn grow(&mut self, block_size: usize) {
        self.blocks += 1;
        self.total += block_size as u64;
    }

    /// Account for a released block
    fn shrink(&mut self, block_size: usize) {
        debug_assert!(self.blocks > 0, "Released more blocks than allocated");
        self.blocks -= 1;
        self.total -= block_size as u64;
    }
}
//
impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "blocks={} total={}", self.blocks, self.total)
    }
}

/// Heap block whose pages have all been touched
#[derive(Debug)]
pub struct Block(Box<[u8]>);
//
impl Block {
    /// Allocate a block of `size` bytes and touch every page of it
    pub fn allocate(size: usize) -> Self {
        // Zeroed allocations are served lazily by the OS, hence the touch
        let mut bytes = vec![0u8; size].into_boxed_slice();
        touch_pages(&mut bytes);
        Self(bytes)
    }
}

/// Write one byte in every page of `buffer`
///
/// The last page is touched even if the buffer does not end on a page
/// boundary. Writes are volatile so that the compiler cannot drop them.
///
pub fn touch_pages(buffer: &mut [u8]) {
    for offset in (0..buffer.len()).step_by(PAGE_SIZE) {
        let byte: *mut u8 = &mut buffer[offset];
        // SAFETY: byte comes from a live &mut reference
        unsafe {
            byte.write_volatile(TOUCH_VALUE);
        }
    }
}
