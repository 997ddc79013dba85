//! Allocate a number of memory blocks, then free them
//!
//! Usage: `alloc-churn <block_size> <usleep> <num_blocks>`

use resource_hogs::{
    alloc::{Args, Churn},
    cli::{self, FAILURE_STATUS},
};
use std::{io, process::ExitCode};

fn main() -> ExitCode {
    env_logger::init();
    let argv = cli::args_lossy();
    let exe = cli::program_name(&argv, "alloc-churn");
    let churn = match Churn::from_args(&argv) {
        Ok(churn) => churn,
        Err(e) => return cli::fail::<Args>(&e, &exe),
    };
    match churn.run(io::stdout().lock(), std::thread::sleep) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Failed to report progress ({e})");
            ExitCode::from(FAILURE_STATUS)
        }
    }
}
