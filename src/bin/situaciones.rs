//! CLI binary for situaciones.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints the records as JSON on stdout.
//! Logs go to stderr.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use situaciones::pipeline::input::DEFAULT_INPUT;
use situaciones::report::{parse_record_date, ReportRules, VacationReport};
use situaciones::{extract, extract_lines, write_records, ExtractionConfig, PageSelection};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::warn;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Records as JSON on stdout
  situaciones vida_laboral.pdf

  # Only the pages holding the table, written to a file
  situaciones --pages 2-5 vida_laboral.pdf -o situaciones.json

  # Show the reconstructed lines (useful when a layout changes)
  situaciones --lines vida_laboral.pdf

  # Vacation days not covered by a contract, for periods starting before 2008
  situaciones --vacation-report --alta-before 01.01.2008 vida_laboral.pdf

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to libpdfium; otherwise the system library is used
  RUST_LOG          Log filter, e.g. situaciones=debug
"#;

/// Extract the situaciones table of an informe de vida laboral as JSON.
#[derive(Parser, Debug)]
#[command(
    name = "situaciones",
    version,
    about = "Extract the situaciones table of an informe de vida laboral as JSON",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    #[arg(default_value = DEFAULT_INPUT)]
    input: String,

    /// Write JSON to this file instead of stdout.
    #[arg(short, long, env = "SITUACIONES_OUTPUT")]
    output: Option<PathBuf>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "SITUACIONES_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "SITUACIONES_PASSWORD")]
    password: Option<String>,

    /// Seconds to wait for the PDF engine before using what was collected.
    #[arg(long, env = "SITUACIONES_COLLECTION_TIMEOUT", default_value_t = 10,
          value_parser = clap::value_parser!(u64).range(1..))]
    collection_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "SITUACIONES_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print the assembled lines instead of records.
    #[arg(long, conflicts_with = "vacation_report")]
    lines: bool,

    /// Print the vacation report instead of records.
    #[arg(long)]
    vacation_report: bool,

    /// Report only on periods starting before this date (DD.MM.YYYY).
    #[arg(long, requires = "vacation_report", value_parser = parse_cutoff)]
    alta_before: Option<NaiveDate>,

    /// Employer prefix of the contract rows vacations are checked against.
    #[arg(long, requires = "vacation_report")]
    contract_employer: Option<String>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SITUACIONES_VERBOSE")]
    verbose: bool,

    /// Suppress all logs except errors.
    #[arg(short, long, env = "SITUACIONES_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // A timed-out engine thread is left running; do not wait for it on exit.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")?;
    let result = runtime.block_on(run(&cli));
    runtime.shutdown_background();
    result
}

async fn run(cli: &Cli) -> Result<()> {
    let config = build_config(cli)?;

    // ── Lines mode ───────────────────────────────────────────────────────
    if cli.lines {
        let lines = extract_lines(&cli.input, &config)
            .await
            .context("Line assembly failed")?;
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        for line in lines {
            writeln!(handle, "p{} y={:<8} {}", line.page, line.y, line.text)
                .context("Failed to write to stdout")?;
        }
        return Ok(());
    }

    // ── Run extraction ───────────────────────────────────────────────────
    let output = extract(&cli.input, &config)
        .await
        .context("Extraction failed")?;
    if output.is_partial() {
        warn!(
            "PDF engine did not finish within {}s; {} records from a partial read",
            cli.collection_timeout,
            output.records.len()
        );
    }

    // ── Vacation report ──────────────────────────────────────────────────
    if cli.vacation_report {
        let report = VacationReport::new(&output.records, &report_rules(cli));
        if let Some(ref path) = cli.output {
            report
                .write(path)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!(
                    "{} vacation days uncovered → {}",
                    report.total_non_overlapping_vacation_days,
                    path.display()
                );
            }
        } else {
            println!("{}", report.to_json().context("Failed to serialise report")?);
        }
        return Ok(());
    }

    if let Some(ref path) = cli.output {
        write_records(&output, path)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        if !cli.quiet {
            eprintln!(
                "{} records → {}  ({}ms)",
                output.records.len(),
                path.display(),
                output.stats.total_duration_ms
            );
        }
    } else {
        let json = output.records_json().context("Failed to serialise records")?;
        println!("{json}");
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .pages(parse_pages(&cli.pages)?)
        .collection_timeout_ms(cli.collection_timeout.saturating_mul(1000))
        .download_timeout_secs(cli.download_timeout);
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    builder.build().context("Invalid configuration")
}

fn report_rules(cli: &Cli) -> ReportRules {
    let rules = ReportRules::default().alta_before(cli.alta_before);
    match cli.contract_employer {
        Some(ref prefix) => rules.contract_prefix(prefix.as_str()),
        None => rules,
    }
}

fn parse_cutoff(s: &str) -> Result<NaiveDate, String> {
    parse_record_date(s).ok_or_else(|| format!("expected a DD.MM.YYYY date, got '{s}'"))
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    let page = |p: &str| -> Result<usize> {
        let n: usize = p
            .trim()
            .parse()
            .with_context(|| format!("Invalid page number: '{}'", p.trim()))?;
        if n < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", n);
        }
        Ok(n)
    };

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let (start, end) = (page(start)?, page(end)?);
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }
        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages = s.split(',').map(page).collect::<Result<Vec<_>>>()?;
        return Ok(PageSelection::Set(pages));
    }

    Ok(PageSelection::Single(page(&s)?))
}
