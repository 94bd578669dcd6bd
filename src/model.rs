//! Host and port records shared by every stage of the pipeline.
//!
//! Records are created by [`crate::parser`], annotated by [`crate::enrich`]
//! and read by [`crate::report`]. Nothing here performs I/O.
use serde_derive::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One scanned port on one host, exactly as Nmap reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRecord {
    /// Port number.
    pub port: u16,
    /// Transport protocol, `tcp` or `udp`.
    pub protocol: String,
    /// `open`, `closed`, `filtered`, `open|filtered` or `unknown`.
    pub state: String,
    /// Why Nmap decided on `state`, e.g. `syn-ack`.
    pub reason: Option<String>,
    /// Service name, e.g. `microsoft-ds`.
    pub service: Option<String>,
    /// Detected software.
    pub product: Option<String>,
    /// Detected software version.
    pub version: Option<String>,
}

impl PortRecord {
    /// True for `open` and `open|filtered`.
    pub fn is_open(&self) -> bool {
        matches!(self.state.as_str(), "open" | "open|filtered")
    }
}

/// Everything known about one scanned host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostRecord {
    /// IPv4 address, or `unknown` when Nmap reported none.
    pub address: String,
    /// First reported hostname, empty when there is none.
    pub hostname: String,
    /// `up`, `down` or `unknown`.
    pub status: String,
    /// Best OS match name, empty when there is none.
    pub os_name: String,
    /// Confidence of `os_name`, 0 to 100.
    pub os_accuracy: Option<u8>,
    /// Ports in document order.
    pub ports: Vec<PortRecord>,
    /// Script id to raw script output.
    pub scripts: BTreeMap<String, String>,
    /// Category (e.g. `regex_os_info`) to extracted values. `None` when
    /// nothing matched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex_findings: Option<BTreeMap<String, Vec<String>>>,
}

impl HostRecord {
    /// An empty record for `address` with every other field defaulted.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            hostname: String::new(),
            status: String::from("unknown"),
            os_name: String::new(),
            os_accuracy: None,
            ports: Vec::new(),
            scripts: BTreeMap::new(),
            regex_findings: None,
        }
    }

    /// True if Nmap reports the host as up.
    pub fn is_up(&self) -> bool {
        self.status.eq_ignore_ascii_case("up")
    }

    /// Simple check for Windows systems based on the OS guess.
    pub fn is_windows(&self) -> bool {
        self.os_name.to_lowercase().contains("windows")
    }

    /// Ports ordered by port number, then protocol.
    pub fn sorted_ports(&self) -> Vec<&PortRecord> {
        let mut ports: Vec<&PortRecord> = self.ports.iter().collect();
        ports.sort_by(|a, b| (a.port, &a.protocol).cmp(&(b.port, &b.protocol)));
        ports
    }

    /// Sorted ports whose state is `open` or `open|filtered`.
    pub fn open_ports(&self) -> Vec<&PortRecord> {
        self.sorted_ports()
            .into_iter()
            .filter(|p| p.is_open())
            .collect()
    }

    /// Appends `value` under `category`, creating the findings map on first use.
    pub fn add_finding(&mut self, category: &str, value: String) {
        self.regex_findings
            .get_or_insert_with(BTreeMap::new)
            .entry(category.to_owned())
            .or_default()
            .push(value);
    }
}

/// Invocation level context handed from the scanner to the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMetadata {
    /// Targets as given on the command line.
    pub targets: Vec<String>,
    /// Hosts or networks passed to `--exclude`.
    pub excludes: Vec<String>,
    /// The exact command that was executed.
    pub command: String,
    /// Full raw XML output of the scan.
    pub raw_output: String,
    /// Free-form fields rendered as-is.
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}
