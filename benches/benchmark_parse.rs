use chrono::{TimeZone, Utc};
use criterion::{criterion_group, criterion_main, Criterion};
use sonartrace::model::ScanMetadata;
use sonartrace::parser;
use sonartrace::report::ReportBuilder;
use std::fmt::Write;
use std::hint::black_box;

/// A /24 worth of up hosts with a handful of ports and one script each.
fn subnet_scan(hosts: u8) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<nmaprun scanner=\"nmap\">\n");
    for i in 1..=hosts {
        let _ = write!(
            xml,
            r#"<host><status state="up" reason="arp-response"/>
<address addr="10.1.0.{i}" addrtype="ipv4"/>
<hostnames><hostname name="ws{i}.lab.local" type="PTR"/></hostnames>
<ports>
<port protocol="tcp" portid="135"><state state="open" reason="syn-ack"/><service name="msrpc"/></port>
<port protocol="tcp" portid="139"><state state="open" reason="syn-ack"/><service name="netbios-ssn"/></port>
<port protocol="tcp" portid="445"><state state="open" reason="syn-ack"/><service name="microsoft-ds"/></port>
<port protocol="tcp" portid="3389"><state state="filtered" reason="no-response"/></port>
</ports>
<os><osmatch name="Microsoft Windows 10 1809" accuracy="94"/></os>
<hostscript><script id="smb-os-discovery" output="&#xa;  OS: Windows 10 Pro 17763&#xa;  Domain name: lab.local&#xa;  Workgroup: LAB&#xa;"/></hostscript>
</host>
"#
        );
    }
    xml.push_str("</nmaprun>\n");
    xml
}

fn bench_parse(c: &mut Criterion) {
    let xml = subnet_scan(254);
    c.bench_function("parse /24 scan", |b| {
        b.iter(|| parser::parse(black_box(&xml)));
    });
}

fn bench_render(c: &mut Criterion) {
    let xml = subnet_scan(254);
    let Ok(hosts) = parser::parse(&xml) else {
        panic!("benchmark fixture must parse");
    };
    let metadata = ScanMetadata {
        targets: vec!["10.1.0.0/24".to_owned()],
        command: "nmap -oX - -sS -sV -O 10.1.0.0/24".to_owned(),
        raw_output: xml,
        ..ScanMetadata::default()
    };
    let builder = ReportBuilder::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());

    let mut group = c.benchmark_group("render");
    group.bench_function("text /24", |b| {
        b.iter(|| builder.build_text_report(black_box(&metadata), black_box(&hosts)));
    });
    group.bench_function("json /24", |b| {
        b.iter(|| builder.build_json_report(black_box(&metadata), black_box(&hosts)));
    });
    group.finish();
}

criterion_group!(benches, bench_parse, bench_render);
criterion_main!(benches);
