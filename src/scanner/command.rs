//! Translates a [`ScanRequest`](super::ScanRequest) into Nmap arguments.
use log::debug;

/// Flags that already pick a scan technique.
const TECHNIQUE_FLAGS: [&str; 4] = ["-sS", "-sT", "-sU", "-sV"];

/// Rate hints at or below this map to the polite timing template.
pub const POLITE_RATE_LIMIT: u32 = 2000;

/// Builds the argument vector, program name first.
///
/// XML always goes to stdout (`-oX -`), never to a file. Defaults for scan
/// technique and OS detection are only added when `extra_args` does not
/// already choose them.
pub fn build(
    program: &str,
    targets: &[String],
    ports: Option<&str>,
    rate: Option<u32>,
    extra_args: &[String],
    excludes: &[String],
) -> Vec<String> {
    let mut cmd: Vec<String> = vec![program.to_owned(), "-oX".to_owned(), "-".to_owned()];

    if !extra_args.iter().any(|a| TECHNIQUE_FLAGS.contains(&a.as_str())) {
        cmd.extend(["-sS".to_owned(), "-sV".to_owned()]);
    }
    if !extra_args.iter().any(|a| a == "-O" || a == "-A") {
        cmd.push("-O".to_owned());
    }

    if let Some(ports) = ports {
        cmd.extend(["-p".to_owned(), ports.to_owned()]);
    }

    if let Some(rate) = rate {
        cmd.push(timing_template(rate).to_owned());
    }

    if !excludes.is_empty() {
        cmd.extend(["--exclude".to_owned(), excludes.join(",")]);
    }

    cmd.extend(extra_args.iter().cloned());
    cmd.extend(targets.iter().cloned());

    debug!("Built scan command {cmd:?}");
    cmd
}

/// `-T2` (polite) for low rate hints, `-T3` (normal) above that.
pub const fn timing_template(rate: u32) -> &'static str {
    if rate <= POLITE_RATE_LIMIT {
        "-T2"
    } else {
        "-T3"
    }
}
