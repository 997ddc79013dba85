//! Running the tools as child processes

use std::{
    io::{BufRead, BufReader, Read},
    process::{Child, ChildStdout, Command, ExitStatus, Stdio},
    time::{Duration, Instant},
};
use sysinfo::{Pid, Signal, System};
use wait_timeout::ChildExt;

/// Path to the allocator churn executable
pub const ALLOC_CHURN: &str = env!("CARGO_BIN_EXE_alloc-churn");

/// Path to the sleep reporter executable
pub const SLEEP_REPORTER: &str = env!("CARGO_BIN_EXE_sleep-reporter");

/// Path to the CPU burner executable
pub const CPU_BURN: &str = env!("CARGO_BIN_EXE_cpu-burn");

/// Exit status of tools which refused to run or were killed
pub const FAILURE_CODE: i32 = 255;

/// Longest time a tool may run before the test is considered hung
const TIMEOUT: Duration = Duration::from_secs(30);

/// Tool that is currently running
pub struct ToolRun {
    /// Child process
    child: Child,

    /// Line reader on the child's stdout
    stdout: BufReader<ChildStdout>,

    /// Time at which the child was spawned
    start: Instant,
}
//
impl ToolRun {
    /// Start a tool with some arguments
    pub fn start(exe: &str, args: &[&str]) -> Self {
        let mut child = Command::new(exe)
            .args(args)
            .env_remove("RUST_LOG")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to start tool");
        let stdout = BufReader::new(child.stdout.take().expect("Stdout should be piped"));
        Self {
            child,
            stdout,
            start: Instant::now(),
        }
    }

    /// Wait for the next line of output, if any
    pub fn next_line(&mut self) -> Option<String> {
        let mut line = String::new();
        let bytes = self
            .stdout
            .read_line(&mut line)
            .expect("Failed to read tool output");
        (bytes > 0).then(|| line.trim_end_matches('\n').to_owned())
    }

    /// Send a signal to the tool
    pub fn signal(&self, signal: Signal) {
        let system = System::new_all();
        let process = system
            .process(Pid::from_u32(self.child.id()))
            .expect("Tool process should still be alive");
        assert_eq!(
            process.kill_with(signal),
            Some(true),
            "Failed to send {signal:?}"
        );
    }

    /// Wait for the tool to exit and collect the rest of its output
    pub fn finish(mut self) -> Outcome {
        let status = match self.child.wait_timeout(TIMEOUT) {
            Ok(Some(status)) => status,
            Ok(None) => {
                let _ = self.child.kill();
                panic!("Tool did not exit within {TIMEOUT:?}");
            }
            Err(e) => panic!("Failed to await tool ({e})"),
        };
        let elapsed = self.start.elapsed();
        let mut rest = String::new();
        self.stdout
            .read_to_string(&mut rest)
            .expect("Failed to read tool output");
        Outcome {
            status,
            lines: rest.lines().map(str::to_owned).collect(),
            elapsed,
        }
    }
}

/// Result of running a tool
#[derive(Debug)]
pub struct Outcome {
    /// Exit status
    pub status: ExitStatus,

    /// Lines printed on stdout that were not consumed with `next_line()`
    pub lines: Vec<String>,

    /// Time between spawning the tool and noticing its exit
    pub elapsed: Duration,
}
//
impl Outcome {
    /// Check that the tool printed its usage message and failed
    ///
    /// `arg_names` is the expected argument list in the usage message, and
    /// `diagnostic` is an optional line expected before the usage message.
    ///
    pub fn assert_usage(&self, diagnostic: Option<&str>, arg_names: &str) {
        assert_eq!(self.status.code(), Some(FAILURE_CODE), "{self:#?}");
        let mut lines = self.lines.iter().map(String::as_str);
        if let Some(diagnostic) = diagnostic {
            assert_eq!(lines.next(), Some(diagnostic), "{self:#?}");
        }
        assert_eq!(lines.next(), Some("usage:"), "{self:#?}");
        let command = lines.next().expect("Expected a usage line");
        assert!(command.starts_with("  "), "{self:#?}");
        assert!(command.ends_with(&format!(" {arg_names}")), "{self:#?}");
        assert_eq!(lines.next(), None, "{self:#?}");
    }
}

/// Run a tool to completion
pub fn run(exe: &str, args: &[&str]) -> Outcome {
    ToolRun::start(exe, args).finish()
}
