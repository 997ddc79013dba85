//! Command-line conventions shared by all tools
//!
//! Every tool takes a fixed list of positional arguments. Asking for help or
//! passing the wrong number of arguments prints a usage message, and so does
//! an argument that does not parse as the expected number, after a line of
//! the form `invalid <name>: <value>`. All of these end the process with the
//! same failure status, before any work has been done.

use clap::{CommandFactory, Parser};
use std::{
    ffi::OsString,
    io::{self, Write},
    num::{IntErrorKind, ParseFloatError},
    process::ExitCode,
    time::Duration,
};
use thiserror::Error;

/// Exit status of a tool that was misused or killed by a signal
///
/// This is what a parent process observes when a C program returns -1.
///
pub const FAILURE_STATUS: u8 = 255;

/// Reason why a tool refuses to run
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum UsageError {
    /// `-h` or `--help` was passed
    #[error("help requested")]
    HelpRequested,

    /// Too few or too many arguments were passed
    #[error("wrong number of arguments")]
    WrongArguments,

    /// An argument is not a well-formed value of the expected type
    #[error("invalid {name}: {value}")]
    Invalid {
        /// Name of the argument, as shown in the usage message
        name: &'static str,

        /// Raw argument that was passed
        value: String,
    },
}

/// Parse a tool's raw arguments using its clap definition
///
/// `argv` includes the program name, like `std::env::args()`. Help flags are
/// detected anywhere on the command line before clap gets to see it, and so is
/// a wrong argument count, since clap would silently drop a `--` separator.
/// Numeric validation belongs to each tool.
///
pub fn parse_raw<P: Parser>(argv: &[String]) -> Result<P, UsageError> {
    if argv.iter().any(|arg| arg == "-h" || arg == "--help") {
        return Err(UsageError::HelpRequested);
    }
    let expected = P::command().get_positionals().count();
    if argv.len().saturating_sub(1) != expected {
        log::debug!("expected {expected} arguments, got {}", argv.len().saturating_sub(1));
        return Err(UsageError::WrongArguments);
    }
    P::try_parse_from(argv).map_err(|e| {
        log::debug!("clap rejected the command line: {:?}", e.kind());
        UsageError::WrongArguments
    })
}

/// Write the usage message of a tool
///
/// The argument list comes from the value names of the clap definition.
///
pub fn write_usage<P: CommandFactory>(mut output: impl Write, exe: &str) -> io::Result<()> {
    let command = P::command();
    let names = command
        .get_positionals()
        .map(|arg| {
            arg.get_value_names()
                .and_then(|names| names.first())
                .map(|name| name.to_string())
                .unwrap_or_else(|| arg.get_id().to_string())
        })
        .collect::<Vec<_>>();
    writeln!(output, "usage:")?;
    writeln!(output, "  {exe} {}", names.join(" "))
}

/// Report a usage error on stdout and produce the matching exit code
pub fn fail<P: CommandFactory>(error: &UsageError, exe: &str) -> ExitCode {
    log::debug!("refusing to run: {error}");
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    let result = match error {
        UsageError::Invalid { .. } => writeln!(lock, "{error}"),
        UsageError::HelpRequested | UsageError::WrongArguments => Ok(()),
    }
    .and_then(|()| write_usage::<P>(&mut lock, exe))
    .and_then(|()| lock.flush());
    if let Err(e) = result {
        log::error!("failed to print usage ({e})");
    }
    ExitCode::from(FAILURE_STATUS)
}

/// Name under which the current program was invoked
pub fn program_name(argv: &[String], fallback: &str) -> String {
    argv.first()
        .cloned()
        .unwrap_or_else(|| fallback.to_owned())
}

/// Collect the process arguments, tolerating non-UTF-8 ones
///
/// Non-UTF-8 arguments cannot be valid numbers anyway, so they are converted
/// lossily and will be reported as invalid.
///
pub fn args_lossy() -> Vec<String> {
    std::env::args_os()
        .map(|arg: OsString| arg.to_string_lossy().into_owned())
        .collect()
}

/// Reason why a string is not an acceptable number
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ParseError {
    /// Empty string, or a sign/prefix without digits
    #[error("no digits")]
    Empty,

    /// A character that is not a digit of the detected base
    #[error("invalid digit")]
    InvalidDigit,

    /// Value does not fit in 64 bits
    #[error("value too large")]
    Overflow,

    /// Not a floating-point number
    #[error("not a number ({0})")]
    NotANumber(String),

    /// Number parsed, but is not in the accepted range
    #[error("out of range")]
    OutOfRange,
}
//
impl From<ParseFloatError> for ParseError {
    fn from(e: ParseFloatError) -> Self {
        Self::NotANumber(e.to_string())
    }
}

/// Parse an unsigned integer with C-style base detection
///
/// `0x` or `0X` selects hexadecimal, a leading `0` selects octal, anything
/// else is decimal. A single leading `+` is allowed. The whole string must be
/// consumed.
///
pub fn parse_uint(s: &str) -> Result<u64, ParseError> {
    let unsigned = s.strip_prefix('+').unwrap_or(s);
    let (digits, radix) = if let Some(hex) = unsigned
        .strip_prefix("0x")
        .or_else(|| unsigned.strip_prefix("0X"))
    {
        (hex, 16)
    } else if unsigned.len() > 1 && unsigned.starts_with('0') {
        (&unsigned[1..], 8)
    } else {
        (unsigned, 10)
    };

    // from_str_radix would accept another sign here
    if digits.starts_with(['+', '-']) {
        return Err(ParseError::InvalidDigit);
    }
    u64::from_str_radix(digits, radix).map_err(|e| match e.kind() {
        IntErrorKind::Empty => ParseError::Empty,
        IntErrorKind::PosOverflow => ParseError::Overflow,
        _ => ParseError::InvalidDigit,
    })
}

/// Parse a finite floating-point number that is at least `min`
///
/// When `inclusive` is false, `min` itself is rejected too.
///
pub fn parse_float(s: &str, min: f64, inclusive: bool) -> Result<f64, ParseError> {
    let value = s.parse::<f64>()?;
    let above_min = if inclusive { value >= min } else { value > min };
    if value.is_finite() && above_min {
        Ok(value)
    } else {
        Err(ParseError::OutOfRange)
    }
}

/// Run a parser on a named argument, turning failure into a `UsageError`
pub fn validate<T>(
    name: &'static str,
    value: &str,
    parser: impl FnOnce(&str) -> Result<T, ParseError>,
) -> Result<T, UsageError> {
    parser(value).map_err(|e| {
        log::debug!("rejected {name} {value:?}: {e}");
        UsageError::Invalid {
            name,
            value: value.to_owned(),
        }
    })
}

/// Positional arguments shared by the sleep reporter and the CPU burner
#[derive(Debug, Parser)]
#[clap(disable_help_flag = true, disable_version_flag = true)]
pub struct TimedArgs {
    /// Total duration, in seconds
    #[clap(value_name = "seconds", allow_hyphen_values = true)]
    seconds: String,

    /// Duration of a reporting tick, in seconds
    #[clap(value_name = "granularity", allow_hyphen_values = true)]
    granularity: String,
}
//
impl TimedArgs {
    /// Validate the arguments into a (seconds, granularity) pair
    ///
    /// The duration may be zero, but the granularity must be positive and
    /// short enough to be represented as a `Duration`.
    ///
    pub fn numbers(&self) -> Result<(f64, f64), UsageError> {
        let seconds = validate("seconds", &self.seconds, |s| parse_float(s, 0.0, true))?;
        let granularity = validate("granularity", &self.granularity, |s| {
            let granularity = parse_float(s, 0.0, false)?;
            Duration::try_from_secs_f64(granularity).map_err(|_| ParseError::OutOfRange)?;
            Ok(granularity)
        })?;
        Ok((seconds, granularity))
    }
}
