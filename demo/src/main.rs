//! Compliance tracker demo CLI.
//!
//! Every command starts from a fresh in-memory runtime. `snapshot` and
//! `export-logs` seed the demo scenario first so there is something to show.
//!
//! Usage:
//!   cargo run -p demo -- scenario
//!   cargo run -p demo -- import --path indicators.csv
//!   cargo run -p demo -- import --path ward4.csv --project "Ward 4"
//!   cargo run -p demo -- snapshot --status overdue
//!   cargo run -p demo -- --config accredit.toml export-logs

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use accredit_contracts::{
    audit::AuditFilter,
    config::AppConfig,
    error::{AccreditError, AccreditResult},
    indicator::DueStatus,
    project::ProjectDraft,
};
use accredit_core::{ImportMode, SnapshotFilter};
use accredit_runtime::{load_config, run_scenario, scenario_admin, seed, Runtime};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Compliance indicator tracker demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Compliance indicator tracker demo",
    long_about = "Runs the compliance tracker against an in-memory store, showing due-status\n\
                  derivation, CSV import, snapshots and the hash-chained audit trail."
)]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Seed overdue, due-soon, revoked and one-time indicators and show their status.
    Scenario,
    /// Import indicators from a CSV file.
    Import {
        #[arg(long)]
        path: PathBuf,
        /// Import in project mode into a new project with this name.
        #[arg(long)]
        project: Option<String>,
    },
    /// Print a snapshot of the seeded scenario.
    Snapshot {
        /// Only indicators in this status (e.g. overdue, due-soon).
        #[arg(long)]
        status: Option<DueStatus>,
        /// Print the CSV export instead of the table.
        #[arg(long)]
        csv: bool,
    },
    /// Export the audit trail of the seeded scenario as CSV.
    ExportLogs,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = build_runtime(cli.config).and_then(|runtime| match cli.command {
        Command::Scenario => cmd_scenario(&runtime),
        Command::Import { path, project } => cmd_import(&runtime, path, project),
        Command::Snapshot { status, csv } => cmd_snapshot(&runtime, status, csv),
        Command::ExportLogs => cmd_export_logs(&runtime),
    });

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

fn build_runtime(config: Option<PathBuf>) -> AccreditResult<Runtime> {
    let config = match config {
        Some(path) => load_config(&path)?,
        None => AppConfig::default(),
    };
    debug!(?config, "starting runtime");
    Runtime::new(config)
}

// ── Commands ──────────────────────────────────────────────────────────────────

fn cmd_scenario(runtime: &Runtime) -> AccreditResult<()> {
    let report = run_scenario(runtime)?;

    println!("=== Compliance status as of {} ===", report.as_of);
    println!();
    println!(
        "  {:<8} {:<36} {:<10} {:<12} {:<12} {}",
        "Standard", "Indicator", "Frequency", "Status", "Last", "Next due"
    );
    for line in &report.lines {
        println!(
            "  {:<8} {:<36} {:<10} {:<12} {:<12} {}",
            line.standard,
            line.indicator_text,
            line.frequency.as_str(),
            line.status.as_str(),
            date_or_na(line.last_compliant_on),
            date_or_na(line.next_due_on),
        );
    }
    println!();
    print_chain(runtime);
    Ok(())
}

fn cmd_import(runtime: &Runtime, path: PathBuf, project: Option<String>) -> AccreditResult<()> {
    let bytes = std::fs::read(&path).map_err(|e| {
        AccreditError::validation(format!(
            "cannot read '{}': {}",
            path.display(),
            e
        ))
    })?;

    let admin = scenario_admin();
    let mode = match project {
        Some(name) => {
            let project = runtime
                .service()
                .create_project(&admin, ProjectDraft::new(name))?
                .value;
            ImportMode::Project(project.id)
        }
        None => ImportMode::Simple,
    };

    let report = runtime
        .service()
        .import_indicators(&admin, &bytes, mode)?
        .value;

    println!("=== Import ({} mode) ===", report.mode.as_str());
    println!();
    println!("  Batch:    {}", report.batch_id);
    println!("  Outcome:  {:?}", report.outcome);
    println!("  Rows:     {}", report.total);
    println!("  Created:  {}", report.created_count());
    println!("  Skipped:  {}", report.skipped());
    for failure in &report.failed_rows {
        println!("    {}", failure.message());
    }
    println!();
    print_chain(runtime);
    Ok(())
}

fn cmd_snapshot(runtime: &Runtime, status: Option<DueStatus>, csv: bool) -> AccreditResult<()> {
    let admin = scenario_admin();
    seed(runtime, &admin)?;
    let filter = SnapshotFilter {
        status,
        ..SnapshotFilter::default()
    };

    if csv {
        let bytes = runtime.service().export_snapshot(&admin, &filter)?.value;
        print!("{}", String::from_utf8_lossy(&bytes));
        return Ok(());
    }

    let snapshot = runtime.service().snapshot(&admin, &filter)?.value;
    let counts = &snapshot.summary;
    println!("=== Snapshot as of {} ===", snapshot.as_of);
    println!();
    println!(
        "  Total {}  |  Compliant {}  |  Due soon {}  |  Overdue {}  |  Not started {}",
        counts.total, counts.compliant, counts.due_soon, counts.overdue, counts.not_started
    );
    println!();
    for view in &snapshot.indicators {
        println!(
            "  {:<8} {:<12} {}",
            view.indicator.standard,
            view.due.due_status.as_str(),
            view.indicator.indicator_text
        );
    }
    println!();
    println!(
        "  Recent activity: {} attestation(s), {} evidence item(s)",
        snapshot.recent_attestations.len(),
        snapshot.recent_evidence.len()
    );
    Ok(())
}

fn cmd_export_logs(runtime: &Runtime) -> AccreditResult<()> {
    let admin = scenario_admin();
    seed(runtime, &admin)?;
    let bytes = runtime
        .service()
        .export_audit_logs(&admin, &AuditFilter::default())?
        .value;
    print!("{}", String::from_utf8_lossy(&bytes));
    eprintln!();
    eprintln!(
        "Audit chain integrity: {}",
        if runtime.audit_log().verify_integrity() { "VERIFIED" } else { "FAILED" }
    );
    Ok(())
}

// ── Output helpers ────────────────────────────────────────────────────────────

fn date_or_na(date: Option<impl std::fmt::Display>) -> String {
    date.map_or_else(|| "N/A".to_string(), |d| d.to_string())
}

fn print_chain(runtime: &Runtime) {
    let audit = runtime.audit_log();
    println!(
        "  Audit chain integrity:  {} ({} entries)",
        if audit.verify_integrity() { "VERIFIED" } else { "FAILED" },
        audit.len()
    );
}
