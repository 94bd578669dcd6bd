//! Runs the external scan engine and captures its XML output.
pub mod command;

use crate::error::{ScanError, ScanFailure};
use crate::model::ScanMetadata;
use log::{debug, info};

use std::{io, process::Output, time::Duration};
use tokio::{process::Command, time};

/// Default scan engine executable, looked up on `PATH`.
pub const DEFAULT_PROGRAM: &str = "nmap";

/// One invocation of the scan engine.
///
/// `ports` is passed through verbatim; Nmap is left to validate it.
/// `rate` is a rough hint that only selects a timing template, see
/// [`command::timing_template`].
#[derive(Debug, Clone)]
pub struct ScanRequest {
    program: String,
    targets: Vec<String>,
    ports: Option<String>,
    rate: Option<u32>,
    extra_args: Vec<String>,
    excludes: Vec<String>,
}

impl ScanRequest {
    pub fn new(
        targets: Vec<String>,
        ports: Option<String>,
        rate: Option<u32>,
        extra_args: Vec<String>,
        excludes: Vec<String>,
    ) -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_owned(),
            targets,
            ports,
            rate,
            extra_args,
            excludes,
        }
    }

    /// Use a different executable, e.g. a full path to `nmap`.
    #[must_use]
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// The full argument vector, program first.
    pub fn build_command(&self) -> Vec<String> {
        command::build(
            &self.program,
            &self.targets,
            self.ports.as_deref(),
            self.rate,
            &self.extra_args,
            &self.excludes,
        )
    }

    /// The exact command as it is reported.
    pub fn command_line(&self) -> String {
        self.build_command().join(" ")
    }

    /// Bundles the request with the output of a finished scan.
    pub fn metadata(&self, raw_output: String) -> ScanMetadata {
        ScanMetadata {
            targets: self.targets.clone(),
            excludes: self.excludes.clone(),
            command: self.command_line(),
            raw_output,
            extra: Default::default(),
        }
    }

    /// Executes the scan and returns its stdout.
    ///
    /// A `timeout` of `None` or zero waits forever. When it expires the child
    /// process is killed.
    ///
    /// Fails if the executable is missing, the timeout expires, the process
    /// exits non-zero, or stdout is blank.
    pub async fn run(&self, timeout: Option<Duration>) -> Result<String, ScanError> {
        if self.targets.is_empty() {
            return Err(ScanFailure::NoTargets.into());
        }

        let cmd = self.build_command();
        info!("Running {}", cmd.join(" "));

        let mut child = Command::new(&cmd[0]);
        child.args(&cmd[1..]).kill_on_drop(true);

        let output = match timeout.filter(|t| !t.is_zero()) {
            Some(limit) => time::timeout(limit, child.output())
                .await
                .map_err(|_| ScanFailure::TimedOut(limit))?,
            None => child.output().await,
        };

        let output = output.map_err(|e| self.launch_failure(e))?;
        let stdout = check_output(output)?;
        debug!("Scan produced {} bytes of output", stdout.len());
        Ok(stdout)
    }

    fn launch_failure(&self, source: io::Error) -> ScanFailure {
        if source.kind() == io::ErrorKind::NotFound {
            ScanFailure::NotFound(self.program.clone())
        } else {
            ScanFailure::Launch {
                program: self.program.clone(),
                source,
            }
        }
    }
}

fn check_output(output: Output) -> Result<String, ScanFailure> {
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        return Err(ScanFailure::NonZeroExit {
            code: output.status.code(),
            stderr,
        });
    }
    if stdout.trim().is_empty() {
        return Err(ScanFailure::EmptyOutput { stderr });
    }
    Ok(stdout)
}
