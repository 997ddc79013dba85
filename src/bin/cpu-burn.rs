//! Keep a CPU core busy for a while, reporting elapsed ticks
//!
//! Usage: `cpu-burn <seconds> <granularity>`

use resource_hogs::{
    burn::Burn,
    cli::{self, TimedArgs, FAILURE_STATUS},
};
use std::{io, process::ExitCode, time::Instant};

fn main() -> ExitCode {
    env_logger::init();
    let argv = cli::args_lossy();
    let exe = cli::program_name(&argv, "cpu-burn");
    let burn = match Burn::from_args(&argv) {
        Ok(burn) => burn,
        Err(e) => return cli::fail::<TimedArgs>(&e, &exe),
    };

    let start = Instant::now();
    match burn.run(io::stdout().lock(), || start.elapsed()) {
        Ok(summary) => {
            log::info!(
                "Reached tick {} after {} rounds of arithmetic in {:?}",
                summary.ticks,
                summary.iterations,
                summary.elapsed
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Failed to report progress ({e})");
            ExitCode::from(FAILURE_STATUS)
        }
    }
}
