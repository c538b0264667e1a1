//! CLI binary for structmd.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use structmd::{
    convert, convert_batch, inspect, ConversionConfig, ConversionOutput,
    ConversionProgressCallback, PageSelection, Pdf2MdError, ProgressCallback,
};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
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

/// Terminal progress callback: one bar for the pages of a single document,
/// plus a log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// The bar length is set by `on_conversion_start`.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Extracting");
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, elements: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<12}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{elements:>4} elements")),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.2}s")),
        ));
        self.bar.inc(1);
    }

    fn on_conversion_complete(&self, total_pages: usize, success_count: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages read",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages read  ({} unreadable)",
                if success_count == 0 {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert into ./output/extracted/manual/
  pdf2md manual.pdf

  # Choose the output root
  pdf2md manual.pdf -o build/docs

  # Several documents, three at a time
  pdf2md --concurrency 3 a.pdf b.pdf c.pdf

  # Only pages 2-10, wider header band
  pdf2md --pages 2-10 --header-ratio 0.15 manual.pdf

  # Inspect PDF metadata
  pdf2md --inspect-only manual.pdf

  # JSON statistics
  pdf2md --json manual.pdf > stats.json

OUTPUT LAYOUT:
  <OUTPUT>/extracted/<name>/main.md
  <OUTPUT>/extracted/<name>/images/image1.jpg, image2.jpg, …

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH         Path to libpdfium (otherwise ./ then the system path)
  RUST_LOG                Override log filtering (e.g. structmd=debug)
  PDF2MD_*                Any flag, e.g. PDF2MD_HEADER_RATIO=0.15
"#;

/// Convert PDF files to structured Markdown with extracted images.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md",
    version,
    about = "Convert PDF files to structured Markdown with extracted images",
    long_about = "Convert PDF documents to Markdown using layout heuristics: running headers, \
footers, watermarks and decorative images are removed, text blocks are classified into \
headings, list items, captions and paragraphs, and embedded images are saved as JPEG.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// One or more local PDF files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Output root; each document goes to <OUTPUT>/extracted/<name>/.
    #[arg(short, long, env = "PDF2MD_OUTPUT", default_value = "output")]
    output: PathBuf,

    /// Header band as a fraction of page height.
    #[arg(long, env = "PDF2MD_HEADER_RATIO", default_value_t = 0.12)]
    header_ratio: f32,

    /// Footer band starts at this fraction of page height.
    #[arg(long, env = "PDF2MD_FOOTER_RATIO", default_value_t = 0.90)]
    footer_ratio: f32,

    /// Images with a side at or below this many pixels are dropped.
    #[arg(long, env = "PDF2MD_MIN_IMAGE_SIDE", default_value_t = 15)]
    min_image_side: u32,

    /// Images with at most this many distinct colours are dropped.
    #[arg(long, env = "PDF2MD_MAX_NOISE_COLORS", default_value_t = 4)]
    max_noise_colors: usize,

    /// JPEG quality for saved images (1–100).
    #[arg(long, env = "PDF2MD_JPEG_QUALITY", default_value_t = 75,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Case-insensitive regex marking watermark text.
    #[arg(long, env = "PDF2MD_WATERMARK_PATTERN")]
    watermark_pattern: Option<String>,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2MD_PAGES", default_value = "all")]
    pages: String,

    /// Documents converted at once.
    #[arg(short, long, env = "PDF2MD_CONCURRENCY", default_value_t = 2)]
    concurrency: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2MD_PASSWORD")]
    password: Option<String>,

    /// Print conversion statistics as JSON on stdout.
    #[arg(long, env = "PDF2MD_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs would interleave with the progress bar; the bar carries the
    // per-page feedback instead.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && cli.inputs.len() == 1;
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

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let mut all = Vec::new();
        for input in &cli.inputs {
            let meta = inspect(input)
                .await
                .with_context(|| format!("Failed to inspect {}", input.display()))?;
            if cli.json {
                all.push(serde_json::json!({ "input": input, "metadata": meta }));
                continue;
            }
            println!("File:         {}", input.display());
            if let Some(ref t) = meta.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = meta.author {
                println!("Author:       {}", a);
            }
            if let Some(ref s) = meta.subject {
                println!("Subject:      {}", s);
            }
            println!("Pages:        {}", meta.page_count);
            println!("PDF Version:  {}", meta.pdf_version);
            if let Some(ref p) = meta.producer {
                println!("Producer:     {}", p);
            }
            if let Some(ref c) = meta.creator {
                println!("Creator:      {}", c);
            }
            if let Some(ref d) = meta.creation_date {
                println!("Created:      {}", d);
            }
        }
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&all).context("Failed to serialize metadata")?
            );
        }
        return Ok(());
    }

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run conversion ───────────────────────────────────────────────────
    if let [input] = cli.inputs.as_slice() {
        let output = convert(input, &cli.output, &config)
            .await
            .with_context(|| format!("Conversion of {} failed", input.display()))?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&summary_json(input, &Ok(output)))
                    .context("Failed to serialise output")?
            );
        } else if !cli.quiet {
            print_summary(&output);
        }
        return Ok(());
    }

    let results = convert_batch(&cli.inputs, &cli.output, &config).await;
    let failed = results.iter().filter(|r| r.is_err()).count();

    if cli.json {
        let all: Vec<_> = cli
            .inputs
            .iter()
            .zip(&results)
            .map(|(input, result)| summary_json(input, result))
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&all).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        for (input, result) in cli.inputs.iter().zip(&results) {
            match result {
                Ok(output) => print_summary(output),
                Err(e) => eprintln!("{}  {}  {}", red("✘"), input.display(), red(&e.to_string())),
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} documents failed", failed, results.len());
    }
    Ok(())
}

fn print_summary(output: &ConversionOutput) {
    let stats = &output.stats;
    eprintln!(
        "{}  {}/{} pages  {} elements  {} images  {}ms  →  {}",
        if stats.failed_pages == 0 {
            green("✔")
        } else {
            cyan("⚠")
        },
        stats.processed_pages,
        stats.processed_pages + stats.failed_pages,
        stats.elements,
        stats.images_saved,
        stats.total_duration_ms,
        bold(&output.markdown_path.display().to_string()),
    );
    eprintln!(
        "   {}",
        dim(&format!(
            "{} headings, {} paragraphs, {} list items, {} captions; {} noise elements dropped",
            stats.headings,
            stats.paragraphs,
            stats.list_items,
            stats.captions,
            stats.noise.total()
        )),
    );
}

fn summary_json(
    input: &std::path::Path,
    result: &Result<ConversionOutput, Pdf2MdError>,
) -> serde_json::Value {
    match result {
        Ok(output) => serde_json::json!({
            "input": input,
            "output_dir": output.output_dir,
            "markdown_path": output.markdown_path,
            "images": output.images,
            "stats": output.stats,
        }),
        Err(e) => serde_json::json!({
            "input": input,
            "error": e.to_string(),
        }),
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages = parse_pages(&cli.pages)?;

    let mut builder = ConversionConfig::builder()
        .header_ratio(cli.header_ratio)
        .footer_ratio(cli.footer_ratio)
        .min_image_side(cli.min_image_side)
        .max_noise_colors(cli.max_noise_colors)
        .jpeg_quality(cli.jpeg_quality)
        .concurrency(cli.concurrency)
        .pages(pages);

    if let Some(ref pattern) = cli.watermark_pattern {
        builder = builder.watermark_pattern(pattern.clone());
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
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
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
