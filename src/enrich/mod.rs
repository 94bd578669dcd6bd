//! Windows specific follow-up for hosts that Nmap marked as up.
//!
//! For every host that looks like Windows, the SMB/NetBIOS ports seen in
//! the scan are probed directly and an advisory note is stored on the host
//! under [`ADVISORY_KEY`]. Other hosts are left untouched.
//!
//! The enricher is the only writer of host records after parsing, and the
//! report is rendered only once it has finished.
pub mod probe;

use crate::model::HostRecord;
use futures::future::join_all;
use itertools::Itertools;
use log::{debug, info, warn};
use probe::{Probe, ProbeOutcome};
use std::{collections::BTreeSet, net::IpAddr};

/// Script key the advisory is stored under.
pub const ADVISORY_KEY: &str = "sonartrace-windows-enum";

/// NetBIOS name service, NetBIOS session service and SMB over TCP.
pub const SMB_PORTS: [u16; 3] = [137, 139, 445];

const RELATED_SCRIPT_PREFIX: &str = "smb";
const RELATED_SCRIPTS: [&str; 3] = ["nbstat", "msrpc-enum", "rpcinfo"];
const SUMMARY_LINES: usize = 5;

const FOLLOW_UP: [&str; 4] = [
    "Inspect SMB shares and SMB signing configuration.",
    "Review RDP exposure and authentication settings.",
    "Check for legacy protocols (SMBv1, LM/NTLM).",
    "Perform authenticated patch level review if credentials are available.",
];

/// Annotates Windows-likely hosts using `P` for the live checks.
#[derive(Debug, Clone)]
pub struct Enricher<P> {
    probe: P,
}

impl<P: Probe> Enricher<P> {
    pub const fn new(probe: P) -> Self {
        Self { probe }
    }

    /// Adds an advisory to every host that is up and Windows-likely.
    ///
    /// Running it twice is harmless: a host that already carries an
    /// advisory is skipped without probing.
    pub async fn enrich(&self, hosts: &mut [HostRecord]) {
        let mut advised = 0usize;
        for host in hosts.iter_mut() {
            if let Some(advisory) = self.advise(host).await {
                host.scripts.entry(ADVISORY_KEY.to_owned()).or_insert(advisory);
                advised += 1;
            }
        }
        info!("Windows enumeration added {advised} advisories");
    }

    /// The advisory text for `host`, or `None` when it does not qualify.
    pub async fn advise(&self, host: &HostRecord) -> Option<String> {
        if !host.is_up() || !host.is_windows() || host.scripts.contains_key(ADVISORY_KEY) {
            return None;
        }

        let candidates = smb_candidates(host);
        debug!("SMB candidates for {}: {candidates:?}", host.address);
        let results = self.probe_all(&host.address, &candidates).await;

        Some(compose_advisory(host, &candidates, &results))
    }

    /// Probes all `ports` concurrently. Results keep the order of `ports`.
    async fn probe_all(&self, address: &str, ports: &[u16]) -> Vec<(u16, ProbeOutcome)> {
        let ip = match address.parse::<IpAddr>() {
            Ok(ip) => ip,
            Err(e) => {
                warn!("Not probing {address:?}: {e}");
                let cause = format!("invalid address {address:?}");
                return ports
                    .iter()
                    .map(|&port| (port, ProbeOutcome::Error(cause.clone())))
                    .collect();
            }
        };

        let outcomes = join_all(ports.iter().map(|&port| self.probe.probe(ip, port))).await;
        ports.iter().copied().zip(outcomes).collect()
    }
}

/// SMB/NetBIOS ports of `host` worth probing, ascending and distinct.
///
/// A port qualifies when Nmap saw it `open` or `open|filtered`, or did not
/// report a state for it.
pub fn smb_candidates(host: &HostRecord) -> Vec<u16> {
    host.ports
        .iter()
        .filter(|p| SMB_PORTS.contains(&p.port))
        .filter(|p| matches!(p.state.as_str(), "open" | "open|filtered" | "" | "unknown"))
        .map(|p| p.port)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// First lines of every SMB, NetBIOS or RPC related script output.
pub fn summarize_scripts(host: &HostRecord) -> Vec<String> {
    let mut lines = Vec::new();
    let related = host.scripts.iter().filter(|(id, _)| {
        id.as_str() != ADVISORY_KEY
            && (id.starts_with(RELATED_SCRIPT_PREFIX) || RELATED_SCRIPTS.contains(&id.as_str()))
    });

    for (id, output) in related {
        lines.push(format!("  [{id}]"));
        let body: Vec<&str> = output.trim_matches(['\r', '\n']).lines().collect();
        lines.extend(body.iter().take(SUMMARY_LINES).map(|l| format!("    {}", l.trim_end())));
        if body.len() > SUMMARY_LINES {
            lines.push("    ...".to_owned());
        }
    }
    lines
}

fn compose_advisory(host: &HostRecord, candidates: &[u16], results: &[(u16, ProbeOutcome)]) -> String {
    let mut note = vec![format!(
        "Host {} appears to be Windows ({}).",
        host.address, host.os_name
    )];

    if candidates.is_empty() {
        note.push("Candidate SMB/NetBIOS ports: none detected in scan results.".to_owned());
    } else {
        note.push(format!("Candidate SMB/NetBIOS ports: {}", candidates.iter().join(", ")));
        note.push("Direct TCP reachability probes:".to_owned());
        note.extend(
            results
                .iter()
                .map(|(port, outcome)| format!("  - {port}/tcp: {outcome}")),
        );
    }

    let summary = summarize_scripts(host);
    if !summary.is_empty() {
        note.push("Related script output:".to_owned());
        note.extend(summary);
    }

    note.push("Suggested follow-up (manual) checks:".to_owned());
    note.extend(FOLLOW_UP.iter().map(|line| format!("  - {line}")));
    note.join("\n")
}
