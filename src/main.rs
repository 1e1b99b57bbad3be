use clap::{Arg, ArgAction, Command};
use log::LevelFilter;
use phishguard::config::HeuristicConfig;
use phishguard::engine::ScanEngine;
use phishguard::history::{export_csv, HistoryFilter, HistoryStore};
use phishguard::quota::{Plan, SessionStore};
use phishguard::record::{ScanRecord, Verdict};
use phishguard::remote::RemoteScanner;
use std::path::{Path, PathBuf};
use std::process;

#[tokio::main]
async fn main() {
    let matches = Command::new("phishguard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Phishing triage toolkit: heuristic URL/QR/email scanning with local history")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Heuristic configuration file (YAML); built-in defaults when omitted"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Write the default heuristic configuration and exit")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .default_value(".phishguard")
                .help("Directory holding history and session state"),
        )
        .arg(
            Arg::new("scan-url")
                .long("scan-url")
                .value_name("URL")
                .help("Score a URL locally and record the result"),
        )
        .arg(
            Arg::new("scan-qr")
                .long("scan-qr")
                .value_name("PAYLOAD")
                .help("Score a decoded QR payload and record the result"),
        )
        .arg(
            Arg::new("scan-email")
                .long("scan-email")
                .help("Score email metadata (use with --from/--subject/--body)")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("from")
                .long("from")
                .value_name("SENDER")
                .default_value(""),
        )
        .arg(
            Arg::new("subject")
                .long("subject")
                .value_name("SUBJECT")
                .default_value(""),
        )
        .arg(
            Arg::new("body")
                .long("body")
                .value_name("TEXT")
                .default_value(""),
        )
        .arg(
            Arg::new("deep-scan")
                .long("deep-scan")
                .value_name("URL")
                .help("Delegate a URL scan to the remote scanning service"),
        )
        .arg(
            Arg::new("scanner-url")
                .long("scanner-url")
                .value_name("BASE")
                .default_value("http://127.0.0.1:8002")
                .help("Base URL of the remote scanning service"),
        )
        .arg(
            Arg::new("history")
                .long("history")
                .help("List recorded scans, most recent first")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("filter")
                .long("filter")
                .value_name("VERDICT")
                .help("Restrict --history/--export to one verdict (safe|suspicious|malicious)"),
        )
        .arg(
            Arg::new("search")
                .long("search")
                .value_name("TEXT")
                .help("Restrict --history/--export to records matching TEXT"),
        )
        .arg(
            Arg::new("export")
                .long("export")
                .value_name("FILE")
                .help("Export matching history as CSV"),
        )
        .arg(
            Arg::new("clear-history")
                .long("clear-history")
                .help("Delete all recorded scans")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("usage")
                .long("usage")
                .help("Show plan usage")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("set-plan")
                .long("set-plan")
                .value_name("PLAN")
                .help("Switch plan (free|starter|pro|business)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(path) = matches.get_one::<String>("generate-config") {
        if let Err(e) = HeuristicConfig::default().save(Path::new(path)) {
            eprintln!("Error writing config: {e:#}");
            process::exit(1);
        }
        println!("Default configuration written to {path}");
        return;
    }

    let config = match matches.get_one::<String>("config") {
        Some(path) => match HeuristicConfig::load(Path::new(path)) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading configuration: {e:#}");
                process::exit(1);
            }
        },
        None => HeuristicConfig::default(),
    };

    let data_dir = PathBuf::from(matches.get_one::<String>("data-dir").unwrap());
    let history = HistoryStore::new(data_dir.join("history.json"));
    let sessions = SessionStore::new(data_dir.join("session.json"));
    let engine = ScanEngine::new(config);

    let verdict_filter = match matches.get_one::<String>("filter") {
        Some(value) => match Verdict::parse(value) {
            Some(verdict) => Some(verdict),
            None => {
                eprintln!("Unknown verdict: {value} (expected safe|suspicious|malicious)");
                process::exit(1);
            }
        },
        None => None,
    };
    let filter = HistoryFilter {
        verdict: verdict_filter,
        text: matches.get_one::<String>("search").cloned(),
    };

    if let Some(plan_name) = matches.get_one::<String>("set-plan") {
        let Some(plan) = Plan::parse(plan_name) else {
            eprintln!("Unknown plan: {plan_name} (expected free|starter|pro|business)");
            process::exit(1);
        };
        let mut session = sessions.load();
        session.plan = plan;
        if let Err(e) = sessions.save(&session) {
            eprintln!("Error saving session: {e:#}");
            process::exit(1);
        }
        println!(
            "Plan set to {} ({} scans per month)",
            plan.as_str(),
            plan.scan_limit()
        );
        return;
    }

    if matches.get_flag("usage") {
        let session = sessions.load();
        println!("📊 {} plan", session.plan.as_str());
        println!(
            "   {} / {} scans used, {} remaining",
            session.scans_used,
            session.limit(),
            session.remaining()
        );
        return;
    }

    if matches.get_flag("clear-history") {
        if let Err(e) = history.clear() {
            eprintln!("Error clearing history: {e:#}");
            process::exit(1);
        }
        println!("🗑️  Scan history cleared");
        return;
    }

    if let Some(path) = matches.get_one::<String>("export") {
        let records = history.query(&filter);
        let csv = export_csv(&records);
        if let Err(e) = std::fs::write(path, csv) {
            eprintln!("Error writing CSV: {e}");
            process::exit(1);
        }
        println!("Exported {} records to {path}", records.len());
        return;
    }

    if matches.get_flag("history") {
        show_history(&history, &filter);
        return;
    }

    if let Some(url) = matches.get_one::<String>("scan-url") {
        check_quota(&sessions);
        let record = engine.score_url(url);
        record_scan(record, &history, &sessions);
        return;
    }

    if let Some(payload) = matches.get_one::<String>("scan-qr") {
        check_quota(&sessions);
        let record = engine.score_qr(payload);
        record_scan(record, &history, &sessions);
        return;
    }

    if matches.get_flag("scan-email") {
        let from = matches.get_one::<String>("from").unwrap();
        let subject = matches.get_one::<String>("subject").unwrap();
        let body = matches.get_one::<String>("body").unwrap();
        if from.trim().is_empty() && subject.trim().is_empty() && body.trim().is_empty() {
            eprintln!("Empty request: provide at least a sender, subject, or body to scan");
            process::exit(1);
        }
        check_quota(&sessions);
        let record = engine.score_email(from, subject, &[], body);
        record_scan(record, &history, &sessions);
        return;
    }

    if let Some(url) = matches.get_one::<String>("deep-scan") {
        check_quota(&sessions);
        let base = matches.get_one::<String>("scanner-url").unwrap();
        let scanner = match RemoteScanner::new(base.clone()) {
            Ok(scanner) => scanner,
            Err(e) => {
                eprintln!("Error: {e:#}");
                process::exit(1);
            }
        };
        match scanner.scan_url(url).await {
            Ok(record) => record_scan(record, &history, &sessions),
            Err(e) => {
                // Connectivity failures leave history and usage untouched.
                eprintln!("❌ Scan service unavailable: {e:#}");
                process::exit(1);
            }
        }
        return;
    }

    eprintln!("Nothing to do; try --scan-url, --scan-email, --history, or --help");
    process::exit(1);
}

/// Refuse to start a scan once the plan allowance is spent.
fn check_quota(sessions: &SessionStore) {
    let session = sessions.load();
    if session.exhausted() {
        eprintln!(
            "Scan limit reached for the {} plan ({} scans); upgrade with --set-plan",
            session.plan.as_str(),
            session.limit()
        );
        process::exit(1);
    }
}

/// Persist a completed scan and meter it: one history append and exactly one
/// usage increment per record.
fn record_scan(record: ScanRecord, history: &HistoryStore, sessions: &SessionStore) {
    let mut session = sessions.load();
    print_record(&record);

    if let Err(e) = history.append(record) {
        eprintln!("Error saving scan to history: {e:#}");
        process::exit(1);
    }
    session.increment_usage();
    if let Err(e) = sessions.save(&session) {
        eprintln!("Error updating usage: {e:#}");
        process::exit(1);
    }
    println!(
        "💾 Recorded. {} of {} scans used this month.",
        session.scans_used,
        session.limit()
    );
}

fn print_record(record: &ScanRecord) {
    let badge = match record.verdict {
        Verdict::Safe => "✅ SAFE",
        Verdict::Suspicious => "⚠️  SUSPICIOUS",
        Verdict::Malicious => "❌ MALICIOUS",
    };
    println!("{badge} (risk score {}/100)", record.score);
    println!("   {}", record.display_target());
    if record.reasons.is_empty() {
        println!("   No suspicious indicators found");
    } else {
        for reason in &record.reasons {
            println!("   • {reason}");
        }
    }
    if let Some(age) = &record.domain_age {
        println!("   Domain created {} ({} days old)", age.created, age.age_days);
    }
    if let Some(cert) = &record.ssl_certificate {
        println!(
            "   SSL: {} (issuer: {}, {} to {})",
            if cert.valid { "valid" } else { "invalid" },
            cert.issuer,
            cert.valid_from,
            cert.valid_to
        );
    }
    if !record.suspicious_links.is_empty() {
        println!("   Suspicious links:");
        for link in &record.suspicious_links {
            println!("     - {link}");
        }
    }
}

fn show_history(history: &HistoryStore, filter: &HistoryFilter) {
    let records = history.query(filter);
    if records.is_empty() {
        println!("No scans recorded");
        return;
    }
    println!("{} scans recorded", records.len());
    for record in &records {
        println!(
            "  [{:<10}] {:>3}/100  {}  {}",
            record.verdict,
            record.score,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.display_target()
        );
    }
}
