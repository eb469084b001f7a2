//! Hotplug verification checks run against the instance under test.
//!
//! Each check is a remote command plus a pure predicate over its result.
//! The predicates are what the udev rules, dhclient snippet, and policy
//! routing installed on the host are expected to produce once the secondary
//! interface has been hot-plugged.

use regex::Regex;
use serde::Serialize;

/// Route table / rule priority base used by the hotplug scripts. The table
/// for an interface is `ROUTE_TABLE_BASE + device_index`.
pub const ROUTE_TABLE_BASE: u32 = 10_000;

/// URL fetched through the secondary interface to prove egress works.
pub const DEFAULT_EGRESS_URL: &str = "https://www.google.com";

const IPV4: &str = r"[0-9]+(?:\.[0-9]+){3}";

/// What a check expects from its command.
#[derive(Debug, Clone)]
pub enum Expectation {
    /// The command exits 0.
    ExitZero,
    /// Some line of stdout matches the pattern (multi-line mode).
    StdoutMatches(Regex),
}

/// One remote verification.
#[derive(Debug, Clone)]
pub struct HotplugCheck {
    pub name: &'static str,
    pub command: String,
    pub expectation: Expectation,
}

/// Outcome of a single check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub name: &'static str,
    pub command: String,
    pub passed: bool,
    pub detail: String,
}

impl HotplugCheck {
    /// Judge the command's result.
    #[must_use]
    pub fn evaluate(&self, exit_status: i32, stdout: &str) -> CheckResult {
        let (passed, detail) = match &self.expectation {
            Expectation::ExitZero => (
                exit_status == 0,
                format!("exit status {exit_status}"),
            ),
            Expectation::StdoutMatches(re) => {
                if re.is_match(stdout) {
                    (true, "matched".to_string())
                } else {
                    (false, format!("no line matches /{}/", re.as_str()))
                }
            }
        };
        CheckResult {
            name: self.name,
            command: self.command.clone(),
            passed,
            detail,
        }
    }
}

/// Route table number for an interface at `device_index`.
#[must_use]
pub fn route_table(device_index: u32) -> u32 {
    ROUTE_TABLE_BASE + device_index
}

fn multiline(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("(?m){pattern}"))
}

/// Build the full check list for `nic` attached at `device_index`.
///
/// # Errors
///
/// Returns an error if `nic` produces an invalid pattern, which only happens
/// for names containing regex syntax that `regex::escape` cannot neutralise.
pub fn hotplug_checks(
    nic: &str,
    device_index: u32,
    egress_url: &str,
) -> Result<Vec<HotplugCheck>, regex::Error> {
    let dev = regex::escape(nic);
    let table = route_table(device_index);

    Ok(vec![
        HotplugCheck {
            name: "link",
            command: format!("ethtool {nic}"),
            expectation: Expectation::ExitZero,
        },
        HotplugCheck {
            name: "address",
            command: "ip a".to_string(),
            expectation: Expectation::StdoutMatches(multiline(&format!(
                r"^\s+inet {IPV4}/[0-9]+ brd {IPV4} scope global (?:dynamic )?(?:noprefixroute )?{dev}\s*$"
            ))?),
        },
        HotplugCheck {
            name: "dhclient",
            command: "cat /etc/dhcp/dhclient.conf".to_string(),
            expectation: Expectation::StdoutMatches(multiline(&format!(
                r#"^interface "{dev}" \{{ supersede dhcp-server-identifier 255\.255\.255\.255; \}}$"#
            ))?),
        },
        HotplugCheck {
            name: "udev",
            command: "cat /etc/udev/rules.d/70-persistent-net.rules".to_string(),
            expectation: Expectation::StdoutMatches(multiline(&format!(
                r#"^SUBSYSTEM=="net", ACTION=="add", DRIVERS=="\?\*", ATTR\{{address\}}=="[0-9a-f]{{1,2}}(?::[0-9a-f]{{1,2}}){{5}}", KERNEL=="eth\*", NAME="{dev}"$"#
            ))?),
        },
        HotplugCheck {
            name: "kernel route",
            command: "ip route show".to_string(),
            expectation: Expectation::StdoutMatches(multiline(&format!(
                r"^{IPV4}/[0-9]+ dev {dev}\s+proto kernel\s+scope link\s+src {IPV4}\s*$"
            ))?),
        },
        HotplugCheck {
            name: "metric route",
            command: "ip route show".to_string(),
            expectation: Expectation::StdoutMatches(multiline(&format!(
                r"^default via {IPV4} dev {dev}\s+metric {table}\s*$"
            ))?),
        },
        HotplugCheck {
            name: "table route",
            command: format!("ip route show table {table}"),
            expectation: Expectation::StdoutMatches(multiline(&format!(
                r"^default via {IPV4} dev {dev}\s*$"
            ))?),
        },
        HotplugCheck {
            name: "rule",
            command: "ip rule show".to_string(),
            expectation: Expectation::StdoutMatches(multiline(&format!(
                r"^[0-9]+:\s+from {IPV4} lookup {table}\s*$"
            ))?),
        },
        HotplugCheck {
            name: "egress",
            command: format!("curl --interface {nic} --connect-timeout 3 {egress_url}"),
            expectation: Expectation::ExitZero,
        },
    ])
}
