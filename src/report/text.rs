use super::HIGH_CONFIDENCE;
use crate::model::{HostRecord, ScanMetadata};
use chrono::{DateTime, Utc};
use itertools::Itertools;

const NOT_IDENTIFIED: &str = "Not identified";
const NONE: &str = "(none)";

pub(super) fn render(generated: &DateTime<Utc>, metadata: &ScanMetadata, hosts: &[HostRecord]) -> String {
    let mut lines: Vec<String> = Vec::new();

    lines.push("# SonarTrace Scan Report".to_owned());
    lines.push(String::new());
    lines.push(format!(
        "**Generated:** {}",
        generated.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    lines.push(String::new());

    push_metadata(&mut lines, metadata);

    for host in hosts {
        push_host(&mut lines, host);
    }

    let mut report = lines.join("\n");
    report.push('\n');
    report
}

fn push_metadata(lines: &mut Vec<String>, metadata: &ScanMetadata) {
    lines.push("## Scan Metadata".to_owned());
    lines.push(String::new());
    lines.push(format!("- **Targets:** {}", or_none(&metadata.targets.join(", "))));
    lines.push(format!("- **Excludes:** {}", or_none(&metadata.excludes.join(", "))));
    lines.push(format!("- **Nmap Command:** `{}`", metadata.command));
    lines.extend(
        metadata
            .extra
            .iter()
            .map(|(key, value)| format!("- **{key}:** {value}")),
    );
    lines.push(String::new());

    lines.push("## Command Output".to_owned());
    lines.push(String::new());
    lines.push("**Command:**".to_owned());
    lines.push(format!("`{}`", metadata.command));
    lines.push(String::new());
    lines.push("**Full Raw Nmap Output:**".to_owned());
    lines.push(fenced("xml", &metadata.raw_output));
    lines.push(String::new());
}

fn push_host(lines: &mut Vec<String>, host: &HostRecord) {
    let hostname = if host.hostname.is_empty() { "unknown" } else { host.hostname.as_str() };

    lines.push("---".to_owned());
    lines.push(format!("## Host: {} ({hostname})", host.address));
    lines.push(format!("**Status:** {} | **OS:** {}", host.status, os_label(host)));
    lines.push(String::new());

    lines.push("### Verified Information".to_owned());
    lines.push(String::new());
    lines.push("| Field | Value |".to_owned());
    lines.push("|-------|-------|".to_owned());
    lines.push(row("IP Address", &host.address));
    lines.push(row("Hostname", or_none(&host.hostname)));
    lines.push(row("Status", &host.status));
    lines.push(row("OS (Nmap)", &os_label(host)));
    lines.push(row("Open Ports (Nmap)", &open_port_summary(host)));
    lines.push(row(
        "Windows Heuristic",
        if host.is_windows() { "Yes" } else { "No" },
    ));
    lines.push(String::new());

    if !host.is_up() {
        lines.push(format!(
            "> Host reported as `{}`: port and script details are not reported.",
            host.status
        ));
        lines.push(String::new());
        return;
    }

    lines.push("### Unverified / Heuristic Information".to_owned());
    lines.push(String::new());
    let heuristics = heuristics(host);
    if heuristics.is_empty() {
        lines.push("None identified during this scan.".to_owned());
    } else {
        lines.extend(heuristics.into_iter().map(|h| format!("- {h}")));
    }
    lines.push(String::new());

    let ports = host.sorted_ports();
    if !ports.is_empty() {
        lines.push("### Ports".to_owned());
        lines.push(String::new());
        lines.push("| Port | State | Reason | Service | Product / Version |".to_owned());
        lines.push("|------|-------|--------|---------|-------------------|".to_owned());
        for p in ports {
            let product_version = [p.product.as_deref(), p.version.as_deref()]
                .into_iter()
                .flatten()
                .join(" ");
            lines.push(format!(
                "| {}/{} | {} | {} | {} | {} |",
                p.port,
                cell(&p.protocol),
                cell(&p.state),
                cell(p.reason.as_deref().unwrap_or("-")),
                cell(p.service.as_deref().unwrap_or("-")),
                cell(if product_version.is_empty() { "-" } else { &product_version }),
            ));
        }
        lines.push(String::new());
    }

    if !host.scripts.is_empty() {
        lines.push("### Script / Advisory Output".to_owned());
        lines.push(String::new());
        for (id, output) in &host.scripts {
            lines.push(format!("#### {id}"));
            lines.push(String::new());
            lines.push(fenced("text", output));
            lines.push(String::new());
        }
    }
}

/// Everything that rests on indirect or low-confidence evidence.
fn heuristics(host: &HostRecord) -> Vec<String> {
    let mut items = Vec::new();
    let confident = host.os_accuracy.is_some_and(|a| a >= HIGH_CONFIDENCE);

    if !host.os_name.is_empty() {
        match host.os_accuracy {
            None => items.push(format!("OS guess '{}' has no reported accuracy.", host.os_name)),
            Some(a) if a < HIGH_CONFIDENCE => items.push(format!(
                "OS guess '{}' reported at {a}% accuracy (below {HIGH_CONFIDENCE}%).",
                host.os_name
            )),
            Some(_) => {}
        }
    }

    if host.is_windows() && !confident {
        items.push("Windows heuristic is not backed by a high-confidence OS match.".to_owned());
    }

    if let Some(findings) = &host.regex_findings {
        for (category, values) in findings {
            items.extend(values.iter().map(|v| format!("{category}: {v}")));
        }
    }
    items
}

fn os_label(host: &HostRecord) -> String {
    if host.os_name.is_empty() {
        return NOT_IDENTIFIED.to_owned();
    }
    match host.os_accuracy {
        Some(a) => format!("{} ({a}%)", host.os_name),
        None => host.os_name.clone(),
    }
}

fn open_port_summary(host: &HostRecord) -> String {
    let open = host.open_ports();
    if open.is_empty() {
        return "None reported".to_owned();
    }
    open.iter().map(|p| format!("{}/{}", p.port, p.protocol)).join(", ")
}

/// A fenced code block holding `content` verbatim. The fence is longer than
/// any backtick run inside it.
fn fenced(info: &str, content: &str) -> String {
    let longest = content
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest.max(2) + 1);
    let newline = if content.is_empty() || content.ends_with('\n') { "" } else { "\n" };
    format!("{fence}{info}\n{content}{newline}{fence}")
}

fn row(field: &str, value: &str) -> String {
    format!("| {field} | {} |", cell(value))
}

/// Pipes would end a Markdown table cell.
fn cell(value: &str) -> String {
    value.replace('|', "\\|")
}

fn or_none(value: &str) -> &str {
    if value.is_empty() {
        NONE
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::{fenced, heuristics, render};
    use crate::model::{HostRecord, PortRecord, ScanMetadata};
    use chrono::{TimeZone, Utc};
    use parameterized::parameterized;

    fn port(port: u16, protocol: &str, state: &str) -> PortRecord {
        PortRecord {
            port,
            protocol: protocol.to_owned(),
            state: state.to_owned(),
            reason: None,
            service: None,
            product: None,
            version: None,
        }
    }

    fn metadata() -> ScanMetadata {
        let mut meta = ScanMetadata {
            targets: vec!["10.0.0.0/24".to_owned(), "10.0.1.7".to_owned()],
            excludes: vec![],
            command: "nmap -oX - -sS -sV -O 10.0.0.0/24 10.0.1.7".to_owned(),
            raw_output: "\n<nmaprun>\n</nmaprun>\n".to_owned(),
            extra: Default::default(),
        };
        meta.extra.insert("Operator".to_owned(), "blue team".to_owned());
        meta
    }

    fn render_one(host: &HostRecord) -> String {
        let generated = Utc.with_ymd_and_hms(2026, 10, 15, 8, 30, 0).unwrap();
        render(&generated, &metadata(), std::slice::from_ref(host))
    }

    #[test]
    fn header_and_metadata() {
        let report = render_one(&HostRecord::new("10.0.0.1"));
        assert!(report.starts_with("# SonarTrace Scan Report\n\n**Generated:** 2026-10-15 08:30:00 UTC\n"));
        assert!(report.contains("- **Targets:** 10.0.0.0/24, 10.0.1.7\n"));
        assert!(report.contains("- **Excludes:** (none)\n"));
        assert!(report.contains("- **Nmap Command:** `nmap -oX - -sS -sV -O 10.0.0.0/24 10.0.1.7`\n"));
        assert!(report.contains("- **Operator:** blue team\n"));
        assert!(report.contains("```xml\n\n<nmaprun>\n</nmaprun>\n```\n"));
    }

    #[test]
    fn raw_output_without_trailing_newline_still_closes() {
        let mut meta = metadata();
        meta.raw_output = "  <nmaprun/>".to_owned();
        let generated = Utc.with_ymd_and_hms(2026, 10, 15, 8, 30, 0).unwrap();
        let report = render(&generated, &meta, &[]);
        assert!(report.contains("```xml\n  <nmaprun/>\n```\n"));
    }

    #[parameterized(content = { "plain", "a ``` b", "````", "` and ``" }, fence = { "```", "````", "`````", "```" })]
    fn fence_outgrows_backticks(content: &str, fence: &str) {
        assert_eq!(fenced("text", content), format!("{fence}text\n{content}\n{fence}"));
    }

    #[test]
    fn script_with_backticks_stays_inside_its_block() {
        let mut host = HostRecord::new("10.0.0.5");
        host.status = "up".to_owned();
        host.scripts.insert("http-title".to_owned(), "```\n# not a heading\n```".to_owned());

        let report = render_one(&host);
        assert!(report.contains("#### http-title\n\n````text\n```\n# not a heading\n```\n````\n"));
    }

    #[test]
    fn down_host_has_no_details() {
        let mut host = HostRecord::new("10.0.0.9");
        host.status = "down".to_owned();
        host.ports = vec![port(445, "tcp", "open")];
        host.scripts.insert("smb-os-discovery".to_owned(), "OS: Windows".to_owned());

        let report = render_one(&host);
        assert!(report.contains("## Host: 10.0.0.9 (unknown)"));
        assert!(report.contains("| IP Address | 10.0.0.9 |"));
        assert!(report.contains("| Open Ports (Nmap) | 445/tcp |"));
        assert!(report.contains("> Host reported as `down`"));
        assert!(!report.contains("### Ports"));
        assert!(!report.contains("### Script / Advisory Output"));
        assert!(!report.contains("### Unverified"));
    }

    #[test]
    fn up_host_sections() {
        let mut host = HostRecord::new("10.0.0.5");
        host.status = "up".to_owned();
        host.hostname = "dc01".to_owned();
        host.os_name = "Microsoft Windows Server 2019".to_owned();
        host.os_accuracy = Some(98);
        host.ports = vec![port(445, "tcp", "open"), port(137, "udp", "open|filtered"), port(53, "tcp", "closed")];
        host.ports[0].product = Some("Samba smbd".to_owned());
        host.ports[0].version = Some("4.6.2".to_owned());
        host.scripts.insert("nbstat".to_owned(), "\nNetBIOS name: DC01\n".to_owned());

        let report = render_one(&host);
        assert!(report.contains("**Status:** up | **OS:** Microsoft Windows Server 2019 (98%)"));
        assert!(report.contains("| Open Ports (Nmap) | 137/udp, 445/tcp |"));
        assert!(report.contains("| Windows Heuristic | Yes |"));
        assert!(report.contains("None identified during this scan."));

        let p53 = report.find("| 53/tcp | closed |").unwrap();
        let p137 = report.find("| 137/udp | open\\|filtered |").unwrap();
        let p445 = report.find("| 445/tcp | open | - | - | Samba smbd 4.6.2 |").unwrap();
        assert!(p53 < p137 && p137 < p445);

        assert!(report.contains("#### nbstat\n\n```text\n\nNetBIOS name: DC01\n```\n"));
    }

    #[test]
    fn low_confidence_windows_is_unverified() {
        let mut host = HostRecord::new("10.0.0.5");
        host.status = "up".to_owned();
        host.os_name = "Microsoft Windows 10".to_owned();
        host.os_accuracy = Some(90);
        host.add_finding("regex_os_info", "smb-os-discovery: Windows 10 Pro".to_owned());

        assert_eq!(
            heuristics(&host),
            vec![
                "OS guess 'Microsoft Windows 10' reported at 90% accuracy (below 95%).",
                "Windows heuristic is not backed by a high-confidence OS match.",
                "regex_os_info: smb-os-discovery: Windows 10 Pro",
            ]
        );
    }

    #[test]
    fn missing_accuracy_is_unverified() {
        let mut host = HostRecord::new("10.0.0.5");
        host.os_name = "Linux 5.4".to_owned();
        assert_eq!(heuristics(&host), vec!["OS guess 'Linux 5.4' has no reported accuracy."]);
    }

    #[test]
    fn unidentified_os() {
        let mut host = HostRecord::new("10.0.0.5");
        host.status = "up".to_owned();
        let report = render_one(&host);
        assert!(report.contains("| OS (Nmap) | Not identified |"));
        assert!(report.contains("| Open Ports (Nmap) | None reported |"));
        assert!(report.contains("| Windows Heuristic | No |"));
        assert!(heuristics(&host).is_empty());
    }
}
