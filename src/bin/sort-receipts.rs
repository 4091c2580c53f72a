//! CLI binary for receipt-sorter.
//!
//! A thin shim over the library crate that resolves the input and
//! configuration, maps CLI flags to `SortOptions` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use receipt_sorter::pipeline::input::{default_output_path, discover_inputs};
use receipt_sorter::{
    plan_receipts, sort_receipts, ProgressCallback, ReceiptConfig, SortOptions,
    SortProgressCallback, SortReport,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over pages plus a log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    /// Spinner until `on_sort_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Sorting");
    }
}

impl SortProgressCallback for CliProgressCallback {
    fn on_sort_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Scanning {total_pages} pages for receipts…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_receipt(&self, page_num: usize, category: &str) {
        self.bar
            .println(format!("      {} page {:>3}  {}", dim("·"), page_num, category));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, receipts_on_page: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{receipts_on_page} receipt(s)")),
        ));
        self.bar.inc(1);
    }

    fn on_sort_complete(&self, report: &SortReport) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} receipts from {} pages",
            green("✔"),
            bold(&report.total_count.to_string()),
            report.pages_scanned
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Pick a PDF from the current directory interactively
  sort-receipts

  # Sort a file with config.json from the current directory
  sort-receipts receipts.pdf

  # Explicit config and output
  sort-receipts -c banks.json receipts.pdf -o sorted.pdf

  # Show what would be cut, without writing anything
  sort-receipts --dry-run receipts.pdf

  # Machine-readable report
  sort-receipts --json receipts.pdf > report.json

CONFIGURATION (config.json):
  {
    "header_anchors":    ["转账凭证"],
    "footer_anchors":    ["打印时间"],
    "crop_margins":      {"top": 20},
    "category_keywords": {"ICBC": ["工商银行"], "CCB": ["建设银行"]},
    "output_order":      ["ICBC", "CCB", "others"]
  }

  Looked up in the current directory, then next to the executable.

ENVIRONMENT VARIABLES:
  RECEIPT_SORTER_CONFIG   Path to the configuration file
  PDFIUM_LIB_PATH         Path to libpdfium (file or directory)
  RUST_LOG                Override log filter (e.g. receipt_sorter=debug)
"#;

/// Split, classify and reorder bank receipts in a PDF.
#[derive(Parser, Debug)]
#[command(
    name = "sort-receipts",
    version,
    about = "Split, classify and reorder bank receipts in a PDF",
    long_about = "Cut pages of concatenated bank-transfer receipts into one receipt per page, \
classify each receipt by keyword and write them to a new PDF grouped by category.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input PDF. Prompts for one from the current directory when omitted.
    input: Option<PathBuf>,

    /// Output PDF (default: <input>_sorted_<timestamp>.pdf next to the input).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Configuration file (default: ./config.json, then next to the executable).
    #[arg(short, long, env = "RECEIPT_SORTER_CONFIG")]
    config: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "RECEIPT_SORTER_PASSWORD")]
    password: Option<String>,

    /// Path to the pdfium shared library (file or directory).
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Detect and classify receipts only; write nothing.
    #[arg(long)]
    dry_run: bool,

    /// Print the report (or plan) as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "RECEIPT_SORTER_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs unless -v asks for them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.dry_run;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Resolve input and config ─────────────────────────────────────────
    let input = match cli.input.clone() {
        Some(path) => path,
        None => prompt_for_input().context("No input PDF selected")?,
    };

    let config_path = resolve_config_path(cli.config.as_deref())?;
    let config = ReceiptConfig::from_file(&config_path)
        .with_context(|| format!("Using configuration {}", config_path.display()))?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn SortProgressCallback>)
    } else {
        None
    };

    let mut builder = SortOptions::builder();
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref lib) = cli.pdfium_lib {
        builder = builder.pdfium_library(lib.clone());
    }
    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }
    let options = builder.build();

    // ── Dry run ──────────────────────────────────────────────────────────
    if cli.dry_run {
        let plan = plan_receipts(&input, &config, &options).context("Receipt detection failed")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&plan).context("Failed to serialise plan")?
            );
        } else {
            println!("{:<5} {:<12} {}", "Page", "Category", "Crop (l, b, r, t)");
            for receipt in plan.ordered() {
                let r = receipt.rect;
                println!(
                    "{:<5} {:<12} ({:.1}, {:.1}, {:.1}, {:.1})",
                    receipt.page_index + 1,
                    receipt.category,
                    r.left,
                    r.bottom,
                    r.right,
                    r.top
                );
            }
            if !cli.quiet {
                eprintln!(
                    "{} receipts on {} pages would be written in order: {}",
                    plan.ordered().count(),
                    plan.pages_scanned,
                    plan.output_order.join(", ")
                );
            }
        }
        return Ok(());
    }

    // ── Run sort ─────────────────────────────────────────────────────────
    let output_path = cli
        .output
        .clone()
        .unwrap_or_else(|| default_output_path(&input, chrono::Local::now()));

    let report =
        sort_receipts(&input, &output_path, &config, &options).context("Sorting failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_summary(&report, &output_path);
    }

    Ok(())
}

fn print_summary(report: &SortReport, output_path: &Path) {
    for c in &report.per_category_counts {
        eprintln!("   {:<12} {}", c.category, c.count);
    }
    for c in &report.excluded_counts {
        eprintln!(
            "   {:<12} {}",
            c.category,
            dim(&format!("{} (not in output_order, skipped)", c.count))
        );
    }
    eprintln!(
        "{}  {} receipts  {}ms  →  {}",
        green("✔"),
        report.total_count,
        report.duration_ms,
        bold(&output_path.display().to_string()),
    );
}

/// `--config`, else `config.json` in the current directory, else next to the
/// executable.
fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let cwd_config = PathBuf::from("config.json");
    if cwd_config.is_file() {
        return Ok(cwd_config);
    }

    if let Some(dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        let exe_config = dir.join("config.json");
        if exe_config.is_file() {
            return Ok(exe_config);
        }
    }

    anyhow::bail!(
        "No configuration found: pass --config or place config.json in the current directory"
    )
}

/// Ask for a PDF on stdin, offering the PDFs in the current directory.
///
/// Re-prompts on an empty answer or an out-of-range number.
fn prompt_for_input() -> Result<PathBuf> {
    let candidates = discover_inputs(Path::new(".")).context("Failed to list current directory")?;
    let stdin = io::stdin();
    let mut stderr = io::stderr();

    if candidates.is_empty() {
        eprint!("No PDF files found here. Enter a file name: ");
        stderr.flush().ok();
        let answer = read_answer(&stdin)?;
        if answer.is_empty() {
            anyhow::bail!("No input file given");
        }
        return Ok(PathBuf::from(answer));
    }

    eprintln!("{}", bold("PDF files in the current directory:"));
    for (i, path) in candidates.iter().enumerate() {
        eprintln!("  [{}] {}", i + 1, path.display());
    }

    loop {
        eprint!("Choose a number or enter a file name: ");
        stderr.flush().ok();
        let answer = read_answer(&stdin)?;
        if answer.is_empty() {
            eprintln!("Please enter a choice.");
            continue;
        }
        match select_input(&answer, &candidates) {
            Some(path) => return Ok(path),
            None => eprintln!("Invalid number, try again."),
        }
    }
}

fn read_answer(stdin: &io::Stdin) -> Result<String> {
    let mut line = String::new();
    let read = stdin
        .lock()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    if read == 0 {
        anyhow::bail!("stdin closed before a file was chosen");
    }
    Ok(line.trim().to_string())
}

/// A number picks from `candidates` (1-based); anything else is a path.
fn select_input(answer: &str, candidates: &[PathBuf]) -> Option<PathBuf> {
    match answer.parse::<usize>() {
        Ok(n) => n.checked_sub(1).and_then(|i| candidates.get(i).cloned()),
        Err(_) => Some(PathBuf::from(answer)),
    }
}
