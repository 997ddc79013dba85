//! Sleep reporter: wait for a while, one tick at a time
//!
//! The total duration is cut into ticks of a configurable length, and the
//! number of remaining ticks is reported after each one. Termination signals
//! are announced on stdout before the process exits, so that a supervisor can
//! tell a killed run from one that ran to completion.

use crate::cli::{self, TimedArgs, UsageError, FAILURE_STATUS};
use signal_hook::{
    consts::{SIGABRT, SIGINT, SIGTERM},
    iterator::Signals,
};
use std::{
    io::{self, Write},
    os::raw::c_int,
    thread::JoinHandle,
    time::Duration,
};

/// Signals which terminate the sleep reporter
pub const TERMINATION_SIGNALS: [c_int; 3] = [SIGABRT, SIGINT, SIGTERM];

/// Validated sleep reporter configuration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Countdown {
    /// Total duration in seconds
    pub seconds: f64,

    /// Tick duration in seconds
    pub granularity: f64,
}
//
impl Countdown {
    /// Validate the command line of the sleep reporter
    pub fn from_args(argv: &[String]) -> Result<Self, UsageError> {
        let (seconds, granularity) = cli::parse_raw::<TimedArgs>(argv)?.numbers()?;
        Ok(Self {
            seconds,
            granularity,
        })
    }

    /// Number of whole ticks that fit in the total duration
    pub fn ticks(&self) -> u64 {
        (self.seconds / self.granularity).floor() as u64
    }

    /// Time slept during each tick, truncated to the microsecond
    pub fn tick_duration(&self) -> Duration {
        Duration::from_micros((self.granularity * 1e6) as u64)
    }

    /// Count ticks down to 1
    ///
    /// `pause` is called with the tick duration, then `remaining=<n>` is
    /// written to `output` and flushed.
    ///
    pub fn run(&self, mut output: impl Write, mut pause: impl FnMut(Duration)) -> io::Result<()> {
        let ticks = self.ticks();
        let tick = self.tick_duration();
        log::debug!("Sleeping for {ticks} ticks of {tick:?}");
        for remaining in (1..=ticks).rev() {
            pause(tick);
            writeln!(output, "remaining={remaining}")?;
            output.flush()?;
        }
        Ok(())
    }
}

/// Message announcing that a termination signal was received
pub fn signal_message(signal: c_int) -> Option<&'static str> {
    match signal {
        SIGABRT => Some("got SIGABRT"),
        SIGINT => Some("got SIGINT"),
        SIGTERM => Some("got SIGTERM"),
        _ => None,
    }
}

/// Announce termination signals on stdout and exit when one is received
///
/// Signals are caught by a background thread, which holds the stdout lock
/// from the moment it starts writing until the process is gone. Nothing can be
/// printed by other threads after the announcement.
///
pub fn watch_termination() -> io::Result<JoinHandle<()>> {
    let mut signals = Signals::new(TERMINATION_SIGNALS)?;
    std::thread::Builder::new()
        .name("signal watcher".to_owned())
        .spawn(move || {
            if let Some(signal) = signals.forever().next() {
                log::debug!("Caught signal {signal}, exiting");
                let stdout = io::stdout();
                let mut lock = stdout.lock();
                if let Some(message) = signal_message(signal) {
                    // Nobody is left to handle an error at this point
                    let _ = writeln!(lock, "{message}").and_then(|()| lock.flush());
                }
                std::process::exit(FAILURE_STATUS.into());
            }
        })
}
