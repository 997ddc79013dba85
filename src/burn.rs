//! CPU burner: spin on floating-point arithmetic for a while
//!
//! Progress is driven by the clock, not by the number of loop iterations, so
//! the run lasts as long as requested whatever the speed of the CPU.

use crate::cli::{self, TimedArgs, UsageError};
use std::{
    f64::consts::PI,
    io::{self, Write},
    ptr,
    time::Duration,
};

/// Inputs of the busy loop arithmetic
const OPERANDS: [f64; 6] = [
    1234.21342,
    87.1243,
    0.00000123,
    1e7,
    1.0,
    97087.97124390701,
];

/// Perform one round of arithmetic that the optimizer cannot remove
///
/// Operands are stored and reloaded through volatile accesses, so the compiler
/// must assume that they may have changed and redo the computation. The result
/// goes through a volatile store for the same reason.
///
pub fn crunch() -> f64 {
    let mut operands = [0.0f64; OPERANDS.len()];
    for (slot, value) in operands.iter_mut().zip(OPERANDS) {
        // SAFETY: slot comes from a live &mut reference
        unsafe { ptr::write_volatile(slot, value) };
    }
    // SAFETY: operands is a live, initialized local
    let load = |idx: usize| unsafe { ptr::read_volatile(&operands[idx]) };
    let (a, b, c, d, e, f) = (load(0), load(1), load(2), load(3), load(4), load(5));

    let mut result = 0.0;
    // SAFETY: result is a live local
    unsafe {
        ptr::write_volatile(&mut result, ((1.0 / c) * (1.0 / d) + f / a + b / (e * 2.0)) * PI);
        ptr::read_volatile(&result)
    }
}

/// Validated CPU burner configuration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Burn {
    /// How long to burn CPU, in seconds
    pub seconds: f64,

    /// Interval between progress reports, in seconds
    pub granularity: f64,
}
//
impl Burn {
    /// Validate the command line of the CPU burner
    pub fn from_args(argv: &[String]) -> Result<Self, UsageError> {
        let (seconds, granularity) = cli::parse_raw::<TimedArgs>(argv)?.numbers()?;
        Ok(Self {
            seconds,
            granularity,
        })
    }

    /// Burn CPU until `elapsed()` goes past the configured duration
    ///
    /// `elapsed` should report the time elapsed since the start of the burn
    /// using a monotonic clock. It is sampled once per round of arithmetic.
    /// `count=<tick>` is written to `output` whenever the tick index grows,
    /// and `completed` is written at the end.
    ///
    pub fn run(
        &self,
        mut output: impl Write,
        mut elapsed: impl FnMut() -> Duration,
    ) -> io::Result<BurnSummary> {
        log::debug!(
            "Burning CPU for {}s, reporting every {}s",
            self.seconds,
            self.granularity
        );
        let mut last_tick = 0;
        let mut iterations = 0u64;
        loop {
            crunch();
            iterations += 1;

            let now = elapsed();
            let secs = now.as_secs_f64();
            let tick = (secs / self.granularity).floor() as u64;
            if tick > last_tick {
                last_tick = tick;
                writeln!(output, "count={tick}")?;
                output.flush()?;
            }

            if secs > self.seconds {
                writeln!(output, "completed")?;
                output.flush()?;
                let summary = BurnSummary {
                    ticks: last_tick,
                    iterations,
                    elapsed: now,
                };
                return Ok(summary);
            }
        }
    }
}

/// Outcome of a CPU burn
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BurnSummary {
    /// Last tick index that was reported
    pub ticks: u64,

    /// Rounds of arithmetic performed
    pub iterations: u64,

    /// Time elapsed when the burn was found to be over
    pub elapsed: Duration,
}
