//! This crate exposes the internal functionality of SonarTrace, a focused
//! Nmap wrapper for authorized host enumeration.
//!
//! A run goes through four stages:
//!
//! 1. **Invoke**: [`ScanRequest`](crate::scanner::ScanRequest) builds a safe
//!    Nmap command line and captures its XML output.
//! 2. **Parse**: [`parser::parse`] turns the XML into
//!    [`HostRecord`](crate::model::HostRecord)s and tags regex findings.
//! 3. **Enrich**: [`Enricher`](crate::enrich::Enricher) adds an advisory to
//!    Windows-likely hosts after probing their SMB/NetBIOS ports.
//! 4. **Render**: [`ReportBuilder`](crate::report::ReportBuilder) writes a
//!    Markdown report and, optionally, a JSON one.
//!
//! Targets are checked by [`address::validate_targets`] before Nmap runs.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use sonartrace::model::ScanMetadata;
//! use sonartrace::parser;
//! use sonartrace::report::ReportBuilder;
//!
//! let xml = r#"<nmaprun><host><status state="up"/>
//!     <address addr="10.0.0.5" addrtype="ipv4"/>
//!     <ports><port protocol="tcp" portid="22"><state state="open"/></port></ports>
//!     </host></nmaprun>"#;
//!
//! let hosts = parser::parse(xml).unwrap();
//! let generated = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
//! let report = ReportBuilder::new(generated).build_text_report(&ScanMetadata::default(), &hosts);
//! assert!(report.contains("## Host: 10.0.0.5 (unknown)"));
//! ```
#![doc(html_root_url = "https://docs.rs/sonartrace/0.3.0")]

pub mod tui;

pub mod input;

pub mod address;

pub mod error;

pub mod model;

pub mod scanner;

pub mod parser;

pub mod enrich;

pub mod report;
