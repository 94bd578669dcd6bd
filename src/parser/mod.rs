//! Converts Nmap XML output into [`HostRecord`] values.
//!
//! Only the parts of the Nmap schema that end up in a report are modelled;
//! everything else in the document is ignored. Parsing is a pure function of
//! its input: no I/O, no shared state.
pub mod patterns;

use crate::error::ParseError;
use crate::model::{HostRecord, PortRecord};
use log::debug;
use serde_derive::Deserialize;

/// Placeholder for missing status, address and port state.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Deserialize)]
struct NmapRun {
    #[serde(rename = "host", default)]
    hosts: Vec<XmlHost>,
}

#[derive(Debug, Deserialize)]
struct XmlHost {
    status: Option<XmlState>,
    #[serde(rename = "address", default)]
    addresses: Vec<XmlAddress>,
    hostnames: Option<XmlHostnames>,
    ports: Option<XmlPorts>,
    os: Option<XmlOs>,
    hostscript: Option<XmlHostScript>,
}

/// Shared by `<status>` and `<port><state>`.
#[derive(Debug, Deserialize)]
struct XmlState {
    #[serde(rename = "@state")]
    state: Option<String>,
    #[serde(rename = "@reason")]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlAddress {
    #[serde(rename = "@addr")]
    addr: Option<String>,
    #[serde(rename = "@addrtype")]
    addr_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlHostnames {
    #[serde(rename = "hostname", default)]
    hostnames: Vec<XmlHostname>,
}

#[derive(Debug, Deserialize)]
struct XmlHostname {
    #[serde(rename = "@name")]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlPorts {
    #[serde(rename = "port", default)]
    ports: Vec<XmlPort>,
}

#[derive(Debug, Deserialize)]
struct XmlPort {
    #[serde(rename = "@protocol", default)]
    protocol: String,
    #[serde(rename = "@portid", default)]
    port_id: u16,
    state: Option<XmlState>,
    service: Option<XmlService>,
}

#[derive(Debug, Deserialize)]
struct XmlService {
    #[serde(rename = "@name")]
    name: Option<String>,
    #[serde(rename = "@product")]
    product: Option<String>,
    #[serde(rename = "@version")]
    version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlOs {
    #[serde(rename = "osmatch", default)]
    os_matches: Vec<XmlOsMatch>,
}

#[derive(Debug, Deserialize)]
struct XmlOsMatch {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@accuracy")]
    accuracy: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XmlHostScript {
    #[serde(rename = "script", default)]
    scripts: Vec<XmlScript>,
}

#[derive(Debug, Deserialize)]
struct XmlScript {
    #[serde(rename = "@id")]
    id: Option<String>,
    #[serde(rename = "@output", default)]
    output: String,
}

/// Parses a complete Nmap XML document.
///
/// Hosts are returned in document order. A document that is not well-formed
/// fails as a whole; no partial list is returned.
///
/// ```rust
/// let xml = r#"<nmaprun><host><status state="up"/>
///     <address addr="10.0.0.7" addrtype="ipv4"/></host></nmaprun>"#;
/// let hosts = sonartrace::parser::parse(xml).unwrap();
/// assert_eq!(hosts[0].address, "10.0.0.7");
/// assert!(hosts[0].is_up());
/// ```
pub fn parse(xml: &str) -> Result<Vec<HostRecord>, ParseError> {
    let run: NmapRun = quick_xml::de::from_str(xml)?;
    let hosts: Vec<HostRecord> = run.hosts.into_iter().map(host_record).collect();
    debug!("Parsed {} hosts from scan output", hosts.len());
    Ok(hosts)
}

fn host_record(host: XmlHost) -> HostRecord {
    let address = host
        .addresses
        .into_iter()
        .find(|a| a.addr_type.as_deref() == Some("ipv4"))
        .and_then(|a| a.addr)
        .unwrap_or_else(|| UNKNOWN.to_owned());

    let mut record = HostRecord::new(address);

    record.status = host
        .status
        .and_then(|s| s.state)
        .unwrap_or_else(|| UNKNOWN.to_owned());

    record.hostname = host
        .hostnames
        .and_then(|h| h.hostnames.into_iter().next())
        .and_then(|h| h.name)
        .unwrap_or_default();

    if let Some(os_match) = host.os.and_then(|os| os.os_matches.into_iter().next()) {
        record.os_accuracy = os_match.accuracy.as_deref().and_then(parse_accuracy);
        record.os_name = os_match.name;
    }

    record.ports = host
        .ports
        .map(|p| p.ports.into_iter().map(port_record).collect())
        .unwrap_or_default();

    // Duplicate ids: the last one wins.
    for script in host.hostscript.map(|h| h.scripts).unwrap_or_default() {
        let id = script.id.unwrap_or_else(|| UNKNOWN.to_owned());
        record.scripts.insert(id, script.output);
    }

    let findings: Vec<_> = record
        .scripts
        .iter()
        .flat_map(|(id, output)| patterns::extract(id, output))
        .collect();
    for finding in findings {
        record.add_finding(finding.category.key(), finding.value);
    }

    record
}

fn port_record(port: XmlPort) -> PortRecord {
    let (state, reason) = match port.state {
        Some(s) => (s.state.unwrap_or_else(|| UNKNOWN.to_owned()), s.reason),
        None => (UNKNOWN.to_owned(), None),
    };
    let (service, product, version) = match port.service {
        Some(s) => (s.name, s.product, s.version),
        None => (None, None, None),
    };

    PortRecord {
        port: port.port_id,
        protocol: port.protocol,
        state,
        reason,
        service,
        product,
        version,
    }
}

/// Accuracy is only kept when it is all digits and a valid percentage.
fn parse_accuracy(raw: &str) -> Option<u8> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<u8>().ok().filter(|&a| a <= 100)
}
