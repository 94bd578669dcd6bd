//! Provides a means to read, parse and hold configuration options for a run.
use anyhow::Context;
use clap::Parser;
use log::debug;
use serde_derive::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::enrich::probe::DEFAULT_PROBE_TIMEOUT;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sonartrace",
    version = env!("CARGO_PKG_VERSION"),
    max_term_width = 120,
    help_template = "{bin} {version}\n{about}\n\nUSAGE:\n    {usage}\n\nOPTIONS:\n{options}",
)]
#[allow(clippy::struct_excessive_bools)]
/// Focused Nmap wrapper with safe defaults, XML parsing and readable reports.
/// Only use it against systems you are explicitly authorized to test.
pub struct Opts {
    /// Target IPs / CIDR ranges (or hostnames if --allow-dns is set).
    pub targets: Vec<String>,

    /// Port specification in Nmap format (e.g. 1-1024,80,443). Passed to Nmap as-is.
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Write the text report to PATH. Without a value a timestamped file is
    /// created in the working directory. If omitted, the report is printed.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<Option<PathBuf>>,

    /// Also write a JSON report to this path.
    #[arg(long, value_name = "PATH")]
    pub json_output: Option<PathBuf>,

    /// Rough rate control. Values <= 2000 select Nmap's polite timing template.
    #[arg(long)]
    pub rate: Option<u32>,

    /// A list of comma separated hosts or networks to exclude. Can be repeated.
    #[arg(short = 'x', long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Allow DNS resolution of hostnames (disables the DNS leakage check).
    #[arg(long)]
    pub allow_dns: bool,

    /// Seconds to wait for Nmap before giving up. 0 waits forever.
    #[arg(short, long, default_value = "0")]
    pub timeout: u64,

    /// Milliseconds for each SMB reachability probe.
    #[arg(long, default_value = "2000")]
    pub probe_timeout: u64,

    /// Skip the Windows enumeration step and its live probes.
    #[arg(long)]
    pub no_enum: bool,

    /// Whether to ignore the configuration file or not.
    #[arg(short, long)]
    pub no_config: bool,

    /// Custom path to config file
    #[arg(short, long, value_parser)]
    pub config_path: Option<PathBuf>,

    /// Hide the banner
    #[arg(long)]
    pub no_banner: bool,

    /// Accessible mode. Turns off features which negatively affect screen readers.
    #[arg(long)]
    pub accessible: bool,

    /// Extra raw Nmap arguments (advanced use only).
    /// Example: 'sonartrace 10.0.0.0/24 -- -sT --script smb-os-discovery'.
    #[arg(last = true)]
    pub nmap_args: Vec<String>,

    /// Nmap executable, only settable through the config file.
    #[arg(skip)]
    pub nmap_path: Option<String>,
}

#[cfg(not(tarpaulin_include))]
impl Opts {
    pub fn read() -> Self {
        Self::parse()
    }

    /// Merge values found within the user configuration file.
    pub fn merge(&mut self, config: &Config) {
        if !self.no_config {
            self.merge_required(config);
            self.merge_optional(config);
            debug!("Options after config merge: {self:?}");
        }
    }

    fn merge_required(&mut self, config: &Config) {
        macro_rules! merge_required {
            ($($field: ident),+) => {
                $(
                    if let Some(e) = &config.$field {
                        self.$field = e.clone();
                    }
                )+
            }
        }

        merge_required!(allow_dns, accessible, no_banner, timeout, probe_timeout);
    }

    fn merge_optional(&mut self, config: &Config) {
        macro_rules! merge_optional {
            ($($field: ident),+) => {
                $(
                    if self.$field.is_none() && config.$field.is_some() {
                        self.$field = config.$field.clone();
                    }
                )+
            }
        }

        macro_rules! merge_list {
            ($($field: ident),+) => {
                $(
                    if self.$field.is_empty() {
                        if let Some(e) = &config.$field {
                            self.$field = e.clone();
                        }
                    }
                )+
            }
        }

        merge_optional!(ports, rate, nmap_path);
        merge_list!(targets, exclude, nmap_args);
    }

    /// Scan timeout, `None` when unbounded.
    pub const fn scan_timeout(&self) -> Option<Duration> {
        if self.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(self.timeout))
        }
    }

    pub const fn probe_timeout(&self) -> Duration {
        if self.probe_timeout == 0 {
            DEFAULT_PROBE_TIMEOUT
        } else {
            Duration::from_millis(self.probe_timeout)
        }
    }
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            targets: vec![],
            ports: None,
            output: None,
            json_output: None,
            rate: None,
            exclude: vec![],
            allow_dns: false,
            timeout: 0,
            probe_timeout: 2000,
            no_enum: false,
            no_config: true,
            config_path: None,
            no_banner: false,
            accessible: false,
            nmap_args: vec![],
            nmap_path: None,
        }
    }
}

/// Struct used to deserialize the options specified within our config file.
/// These will be further merged with our command line arguments in order to
/// generate the final Opts struct.
#[cfg(not(tarpaulin_include))]
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    targets: Option<Vec<String>>,
    ports: Option<String>,
    rate: Option<u32>,
    exclude: Option<Vec<String>>,
    nmap_args: Option<Vec<String>>,
    nmap_path: Option<String>,
    timeout: Option<u64>,
    probe_timeout: Option<u64>,
    allow_dns: Option<bool>,
    accessible: Option<bool>,
    no_banner: Option<bool>,
}

#[cfg(not(tarpaulin_include))]
impl Config {
    /// Reads the configuration file with TOML format and parses it into a
    /// Config struct. A missing file gives an empty config.
    ///
    /// # Format
    ///
    /// targets = ["10.0.0.0/24"]
    /// ports = "1-1024,3389"
    /// rate = 500
    /// exclude = ["10.0.0.1"]
    /// nmap_args = ["--script", "smb-os-discovery"]
    /// nmap_path = "/usr/local/bin/nmap"
    /// probe_timeout = 1500
    ///
    pub fn read(custom_config_path: Option<PathBuf>) -> anyhow::Result<Self> {
        let Some(config_path) = custom_config_path.or_else(default_config_path) else {
            return Ok(Self::default());
        };
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("could not read {}", config_path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("invalid configuration file {}", config_path.display()))
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Constructs default path to config toml
pub fn default_config_path() -> Option<PathBuf> {
    let mut config_path = dirs::home_dir()?;
    config_path.push(".sonartrace.toml");
    Some(config_path)
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use parameterized::parameterized;
    use std::path::PathBuf;
    use std::time::Duration;

    use super::{Config, Opts};

    fn config() -> Config {
        Config {
            targets: Some(vec!["10.0.0.0/24".to_owned()]),
            ports: Some("445".to_owned()),
            rate: Some(500),
            exclude: Some(vec!["10.0.0.1".to_owned()]),
            nmap_args: Some(vec!["-Pn".to_owned()]),
            nmap_path: Some("/opt/nmap/bin/nmap".to_owned()),
            timeout: Some(600),
            probe_timeout: Some(1500),
            allow_dns: Some(true),
            accessible: Some(true),
            no_banner: None,
        }
    }

    #[test]
    fn verify_cli() {
        Opts::command().debug_assert();
    }

    #[parameterized(input = {
        vec!["sonartrace", "10.0.0.1"],
        vec!["sonartrace", "10.0.0.1", "--", "-sT"],
        vec!["sonartrace", "10.0.0.1", "--", "-A"],
        vec!["sonartrace", "-t", "60", "10.0.0.1", "--", "-sT", "--script", "smb-os-discovery"],
    }, command = {
        vec![],
        vec!["-sT".to_owned()],
        vec!["-A".to_owned()],
        vec!["-sT".to_owned(), "--script".to_owned(), "smb-os-discovery".to_owned()],
    })]
    fn parse_trailing_nmap_args(input: Vec<&str>, command: Vec<String>) {
        let opts = Opts::parse_from(input);

        assert_eq!(vec!["10.0.0.1".to_owned()], opts.targets);
        assert_eq!(command, opts.nmap_args);
    }

    #[test]
    fn output_flag_with_and_without_value() {
        assert_eq!(Opts::parse_from(["sonartrace", "10.0.0.1"]).output, None);
        assert_eq!(Opts::parse_from(["sonartrace", "10.0.0.1", "-o"]).output, Some(None));
        assert_eq!(
            Opts::parse_from(["sonartrace", "10.0.0.1", "-o", "report.md"]).output,
            Some(Some(PathBuf::from("report.md")))
        );
    }

    #[test]
    fn excludes_split_and_repeat() {
        let opts = Opts::parse_from(["sonartrace", "-x", "10.0.0.1,10.0.0.2", "-x", "10.0.0.3", "10.0.0.0/24"]);
        assert_eq!(opts.exclude, vec!["10.0.0.1", "10.0.0.2", "10.0.0.3"]);
    }

    #[test]
    fn opts_no_merge_when_config_is_ignored() {
        let mut opts = Opts::default();
        opts.merge(&config());

        assert!(opts.targets.is_empty());
        assert!(!opts.allow_dns);
        assert_eq!(opts.timeout, 0);
        assert_eq!(opts.nmap_path, None);
    }

    #[test]
    fn opts_merge_required_arguments() {
        let mut opts = Opts::default();
        let config = config();

        opts.merge_required(&config);

        assert_eq!(opts.timeout, 600);
        assert_eq!(opts.probe_timeout, 1500);
        assert!(opts.allow_dns);
        assert!(opts.accessible);
        assert!(!opts.no_banner);
    }

    #[test]
    fn opts_merge_optional_keeps_cli_values() {
        let mut opts = Opts {
            targets: vec!["192.168.1.0/24".to_owned()],
            rate: Some(5000),
            ..Opts::default()
        };

        opts.merge_optional(&config());

        assert_eq!(opts.targets, vec!["192.168.1.0/24"]);
        assert_eq!(opts.rate, Some(5000));
        assert_eq!(opts.ports.as_deref(), Some("445"));
        assert_eq!(opts.exclude, vec!["10.0.0.1"]);
        assert_eq!(opts.nmap_args, vec!["-Pn"]);
        assert_eq!(opts.nmap_path.as_deref(), Some("/opt/nmap/bin/nmap"));
    }

    #[test]
    fn timeouts() {
        let mut opts = Opts::default();
        assert_eq!(opts.scan_timeout(), None);
        assert_eq!(opts.probe_timeout(), Duration::from_secs(2));

        opts.timeout = 90;
        opts.probe_timeout = 0;
        assert_eq!(opts.scan_timeout(), Some(Duration::from_secs(90)));
        assert_eq!(opts.probe_timeout(), Duration::from_secs(2));
    }

    #[test]
    fn config_from_toml() {
        let config = Config::parse(
            r#"
            targets = ["10.0.0.0/24"]
            ports = "1-1024"
            rate = 500
            nmap_path = "/usr/local/bin/nmap"
            "#,
        )
        .unwrap();

        assert_eq!(config.targets, Some(vec!["10.0.0.0/24".to_owned()]));
        assert_eq!(config.ports.as_deref(), Some("1-1024"));
        assert_eq!(config.rate, Some(500));
        assert_eq!(config.exclude, None);
    }

    #[test]
    fn bad_config_is_an_error() {
        assert!(Config::parse("rate = \"fast\"").is_err());
    }

    #[test]
    fn missing_config_file_is_empty() {
        let config = Config::read(Some(PathBuf::from("/nonexistent/.sonartrace.toml"))).unwrap();
        assert!(config.targets.is_none());
    }
}
