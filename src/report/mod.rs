//! Markdown and JSON reports built from enriched host records.
//!
//! Rendering never mutates its inputs and, given the same timestamp, always
//! produces the same output.
mod text;

use crate::model::{HostRecord, ScanMetadata};
use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use std::path::PathBuf;

/// OS matches below this accuracy are listed as unverified.
pub const HIGH_CONFIDENCE: u8 = 95;

/// Shape of the JSON report, as read back by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JsonReport {
    pub generated: DateTime<Utc>,
    pub metadata: ScanMetadata,
    pub hosts: Vec<HostRecord>,
}

#[derive(Serialize)]
struct JsonReportRef<'a> {
    generated: DateTime<Utc>,
    metadata: &'a ScanMetadata,
    hosts: &'a [HostRecord],
}

/// Renders reports stamped with a fixed generation time.
#[derive(Debug, Clone, Copy)]
pub struct ReportBuilder {
    generated: DateTime<Utc>,
}

impl ReportBuilder {
    pub const fn new(generated: DateTime<Utc>) -> Self {
        Self { generated }
    }

    /// Human readable Markdown report.
    ///
    /// Hosts keep their input order. A host that is not up only gets its
    /// header and verified table.
    pub fn build_text_report(&self, metadata: &ScanMetadata, hosts: &[HostRecord]) -> String {
        text::render(&self.generated, metadata, hosts)
    }

    /// Pretty printed JSON carrying every host field.
    pub fn build_json_report(
        &self,
        metadata: &ScanMetadata,
        hosts: &[HostRecord],
    ) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&JsonReportRef {
            generated: self.generated,
            metadata,
            hosts,
        })
    }
}

/// `host_enumeration_report_<YYYYMMDD_HHMM>_UTC.md` in the working directory.
pub fn default_report_path(now: DateTime<Utc>) -> PathBuf {
    PathBuf::from(format!(
        "host_enumeration_report_{}_UTC.md",
        now.format("%Y%m%d_%H%M")
    ))
}
