use anyhow::Context;
use chrono::Utc;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use sonartrace::address::validate_targets;
use sonartrace::enrich::probe::TcpProbe;
use sonartrace::enrich::Enricher;
use sonartrace::input::{Config, Opts};
use sonartrace::model::HostRecord;
use sonartrace::report::{default_report_path, ReportBuilder};
use sonartrace::scanner::ScanRequest;
use sonartrace::tui::{print_banner, AUTHORIZATION_NOTICE};
use sonartrace::{detail, output, parser, warning};

use std::fs;
use std::path::Path;
use std::process;
use std::time::Duration;

/// Reads the command line and configuration, then runs the scan pipeline.
#[tokio::main]
async fn main() {
    env_logger::init();

    let mut opts: Opts = Opts::read();
    let config = match Config::read(opts.config_path.clone()) {
        Ok(config) => config,
        Err(e) => {
            warning!(format!("{e:#}"), opts.accessible);
            process::exit(1);
        }
    };
    opts.merge(&config);
    debug!("Main() `opts` arguments are {opts:?}");

    if !opts.no_banner {
        print_banner(opts.accessible);
    }
    warning!(AUTHORIZATION_NOTICE, opts.accessible);

    if let Err(e) = run(&opts).await {
        warning!(format!("{e:#}"), opts.accessible);
        process::exit(1);
    }
}

async fn run(opts: &Opts) -> anyhow::Result<()> {
    if opts.targets.is_empty() {
        anyhow::bail!("no targets given, pass them on the command line or set `targets` in the config file");
    }
    validate_targets(&opts.targets, opts.allow_dns)?;

    let mut request = ScanRequest::new(
        opts.targets.clone(),
        opts.ports.clone(),
        opts.rate,
        opts.nmap_args.clone(),
        opts.exclude.clone(),
    );
    if let Some(program) = &opts.nmap_path {
        request = request.with_program(program);
    }
    detail!(format!("Running: {}", request.command_line()), opts.accessible);

    let spinner = spinner(opts.accessible)?;
    let raw_output = request.run(opts.scan_timeout()).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let raw_output = raw_output?;

    let mut hosts = parser::parse(&raw_output)?;
    info!("Parsed {} hosts", hosts.len());

    if !opts.no_enum {
        Enricher::new(TcpProbe::new(opts.probe_timeout()))
            .enrich(&mut hosts)
            .await;
    }

    let metadata = request.metadata(raw_output);
    let now = Utc::now();
    let builder = ReportBuilder::new(now);
    let text = builder.build_text_report(&metadata, &hosts);

    match &opts.output {
        None => print!("{text}"),
        Some(path) => {
            let path = path.clone().unwrap_or_else(|| default_report_path(now));
            write_report(&path, &text)?;
            output!(format!("Text report written to {}", path.display()), opts.accessible);
        }
    }

    if let Some(path) = &opts.json_output {
        let json = builder
            .build_json_report(&metadata, &hosts)
            .context("could not serialize the JSON report")?;
        write_report(path, &json)?;
        output!(format!("JSON report written to {}", path.display()), opts.accessible);
    }

    print_summary(&hosts, opts.accessible);
    Ok(())
}

fn spinner(accessible: bool) -> anyhow::Result<Option<ProgressBar>> {
    if accessible {
        return Ok(None);
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed}]")?);
    bar.set_message("Nmap is scanning");
    bar.enable_steady_tick(Duration::from_millis(120));
    Ok(Some(bar))
}

fn write_report(path: &Path, content: &str) -> anyhow::Result<()> {
    fs::write(path, content).with_context(|| format!("could not write {}", path.display()))
}

fn print_summary(hosts: &[HostRecord], accessible: bool) {
    let up = hosts.iter().filter(|h| h.is_up()).count();
    let windows = hosts.iter().filter(|h| h.is_up() && h.is_windows()).count();
    let line = format!("{} hosts scanned, {up} up, {windows} Windows-likely", hosts.len());
    if accessible {
        eprintln!("{line}");
    } else {
        eprintln!("{}", line.green().bold());
    }
}
