//! Sleep for a while, reporting the number of remaining ticks
//!
//! Usage: `sleep-reporter <seconds> <granularity>`

use resource_hogs::{
    cli::{self, TimedArgs, FAILURE_STATUS},
    sleep::{self, Countdown},
};
use std::{io, process::ExitCode};

fn main() -> ExitCode {
    env_logger::init();
    let argv = cli::args_lossy();
    let exe = cli::program_name(&argv, "sleep-reporter");
    let countdown = match Countdown::from_args(&argv) {
        Ok(countdown) => countdown,
        Err(e) => return cli::fail::<TimedArgs>(&e, &exe),
    };

    // The watcher thread exits the process by itself, no need to join it
    if let Err(e) = sleep::watch_termination() {
        log::error!("Failed to set up signal handling ({e})");
        return ExitCode::from(FAILURE_STATUS);
    }

    match countdown.run(io::stdout(), std::thread::sleep) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Failed to report progress ({e})");
            ExitCode::from(FAILURE_STATUS)
        }
    }
}
