//! Error types for the fatal failure kinds of a run.
//!
//! Probe failures are not here: they are recorded as data inside the
//! advisory text, see [`crate::enrich::probe::ProbeOutcome`].
use thiserror::Error;

/// The external scan could not produce usable output.
#[derive(Debug, Error)]
#[error("scan execution failed: {0}")]
pub struct ScanError(#[from] pub ScanFailure);

/// Cause carried by a [`ScanError`].
#[derive(Debug, Error)]
pub enum ScanFailure {
    #[error("no targets were given")]
    NoTargets,

    #[error("`{0}` executable not found. Please install Nmap and ensure it is on your PATH")]
    NotFound(String),

    #[error("could not launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {0:?}")]
    TimedOut(std::time::Duration),

    #[error("exited with code {}: {}", exit_code(.code), .stderr.trim())]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("produced no output on stdout: {}", .stderr.trim())]
    EmptyOutput { stderr: String },
}

fn exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none".to_owned(), |c| c.to_string())
}

fn joined(values: &[String]) -> String {
    values.join(", ")
}

/// The scan output is not a well-formed Nmap XML document.
#[derive(Debug, Error)]
#[error("failed to parse scan XML: {0}")]
pub struct ParseError(#[from] pub quick_xml::DeError);

/// A target was rejected before any scan was started.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TargetError {
    #[error(
        "Refusing to resolve hostnames because DNS leakage could identify your scan. \
         Either specify IP addresses / CIDR ranges only, or pass --allow-dns if you \
         understand and accept the risk. Offending values: {}",
        joined(.0)
    )]
    Hostname(Vec<String>),

    #[error(
        "Target {target} is overly broad (prefix /{prefix}). A prefix length of /8 or \
         longer is required (e.g. 10.0.0.0/16, 192.168.0.0/24)"
    )]
    TooBroad { target: String, prefix: u8 },
}
