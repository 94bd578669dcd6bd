//! Pattern based hints pulled out of free-text script output.
//!
//! Kept apart from the XML handling so it can be applied to any text.
use once_cell::sync::Lazy;
use regex::Regex;

/// Everything up to the next newline, NUL, `;` or `|`.
const VALUE: &str = r"\s*:[ \t]*([^\r\n\x00;|]+)";

static OS_PATTERN: Lazy<Regex> = Lazy::new(|| labeled(r"\bOS"));
static DOMAIN_PATTERN: Lazy<Regex> = Lazy::new(|| labeled(r"\bdomain(?:[ \t]+name)?"));
static WORKGROUP_PATTERN: Lazy<Regex> = Lazy::new(|| labeled(r"\bworkgroup"));

fn labeled(label: &str) -> Regex {
    Regex::new(&format!("(?i){label}{VALUE}")).expect("static pattern compiles")
}

/// What kind of hint a [`Finding`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Os,
    Domain,
    Workgroup,
}

impl Category {
    /// Key used for this category in `HostRecord::regex_findings`.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Os => "regex_os_info",
            Self::Domain => "regex_domain_info",
            Self::Workgroup => "regex_workgroup_info",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            Self::Os => Lazy::force(&OS_PATTERN),
            Self::Domain => Lazy::force(&DOMAIN_PATTERN),
            Self::Workgroup => Lazy::force(&WORKGROUP_PATTERN),
        }
    }

    const ALL: [Self; 3] = [Self::Os, Self::Domain, Self::Workgroup];
}

/// One extracted value, already prefixed with its script id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub category: Category,
    pub value: String,
}

/// Runs every pattern over `text`. Each match becomes
/// `"<script_id>: <value>"`.
pub fn extract(script_id: &str, text: &str) -> Vec<Finding> {
    Category::ALL
        .into_iter()
        .flat_map(|category| {
            category
                .pattern()
                .captures_iter(text)
                .filter_map(|caps| caps.get(1))
                .map(|m| m.as_str().trim())
                .filter(|v| !v.is_empty())
                .map(move |v| Finding {
                    category,
                    value: format!("{script_id}: {v}"),
                })
        })
        .collect()
}
