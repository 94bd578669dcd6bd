//! Checks run on targets before anything is handed to Nmap.
use std::str::FromStr;

use cidr_utils::cidr::IpInet;
use log::debug;

use crate::error::TargetError;

/// Shortest prefix accepted for a target network.
pub const MIN_PREFIX_LEN: u8 = 8;

/// Rejects targets that would leak DNS queries or sweep huge ranges.
///
/// Without `allow_dns` every target must be an IP address or CIDR range.
/// Networks with a prefix shorter than [`MIN_PREFIX_LEN`] are always refused.
///
/// ```rust
/// # use sonartrace::address::validate_targets;
/// assert!(validate_targets(&["192.168.0.0/24".to_owned()], false).is_ok());
/// assert!(validate_targets(&["example.com".to_owned()], false).is_err());
/// ```
pub fn validate_targets(targets: &[String], allow_dns: bool) -> Result<(), TargetError> {
    if !allow_dns {
        let hostnames: Vec<String> = targets
            .iter()
            .filter(|t| prefix_len(t).is_none())
            .cloned()
            .collect();
        if !hostnames.is_empty() {
            return Err(TargetError::Hostname(hostnames));
        }
    }

    for target in targets {
        if let Some(prefix) = prefix_len(target) {
            debug!("Target {target} has prefix /{prefix}");
            if prefix < MIN_PREFIX_LEN {
                return Err(TargetError::TooBroad {
                    target: target.clone(),
                    prefix,
                });
            }
        }
    }
    Ok(())
}

/// Network prefix length of `target`, or `None` if it is not an IP or CIDR.
///
/// A bare address counts as a full-length prefix. Host bits may be set, as
/// Nmap accepts `192.168.1.10/24`.
pub fn prefix_len(target: &str) -> Option<u8> {
    IpInet::from_str(target)
        .ok()
        .map(|inet| inet.network_length())
}

#[cfg(test)]
mod tests {
    use super::{prefix_len, validate_targets};
    use crate::error::TargetError;
    use parameterized::parameterized;

    fn targets(values: &[&str]) -> Vec<String> {
        values.iter().map(|&v| v.to_owned()).collect()
    }

    #[parameterized(target = { "127.0.0.1", "192.168.0.0/30", "192.168.1.10/24", "10.0.0.0/8", "::1", "fe80::/64" }, expected = { Some(32), Some(30), Some(24), Some(8), Some(128), Some(64) })]
    fn prefix_of_addresses(target: &str, expected: Option<u8>) {
        assert_eq!(prefix_len(target), expected);
    }

    #[parameterized(target = { "im_wrong", "300.10.1.1", "10.0.0.0/33", "example.com", "10.0.0.1-20", "" })]
    fn not_an_address(target: &str) {
        assert_eq!(prefix_len(target), None);
    }

    #[test]
    fn ips_and_ranges_pass() {
        assert_eq!(
            validate_targets(&targets(&["127.0.0.1", "192.168.0.0/24", "10.0.0.0/8"]), false),
            Ok(())
        );
    }

    #[test]
    fn hostnames_refused_without_allow_dns() {
        let err = validate_targets(&targets(&["10.0.0.1", "dc01.corp", "im_wrong"]), false);
        assert_eq!(
            err,
            Err(TargetError::Hostname(targets(&["dc01.corp", "im_wrong"])))
        );
    }

    #[test]
    fn hostnames_allowed_with_allow_dns() {
        assert_eq!(validate_targets(&targets(&["dc01.corp"]), true), Ok(()));
    }

    #[test]
    fn broad_ranges_always_refused() {
        for allow_dns in [false, true] {
            assert_eq!(
                validate_targets(&targets(&["10.0.0.1", "0.0.0.0/0"]), allow_dns),
                Err(TargetError::TooBroad {
                    target: "0.0.0.0/0".to_owned(),
                    prefix: 0
                })
            );
        }
    }
}
