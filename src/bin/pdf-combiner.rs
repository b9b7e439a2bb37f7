//! CLI binary for pdf-combiner.
//!
//! A thin shim over the library crate that maps subcommands and flags to
//! [`Combiner`] requests and prints the written paths.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_combiner::{
    Bridge, BridgeReply, Combiner, CompressionLevel, ConversionConfig, ConversionOutput,
    ConversionProgressCallback, ConversionResult, ImageFormat, ImagesToPdfRequest, MethodCall,
    PdfToImagesRequest, ProgressCallback, ScaleSpec,
};
use std::collections::HashMap;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Live progress bar with one log line per page. Pages may finish out of
/// order when encoding runs concurrently.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    /// The bar length is set by `on_conversion_start`.
    fn new_dynamic(action: &str) -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix(action.to_string());
        bar.set_message("Opening inputs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut times| times.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_conversion_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.reset_eta();
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut times) = self.start_times.lock() {
            times.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, output_bytes: usize) {
        let secs = self.elapsed_secs(page_num);
        let size = if output_bytes > 0 {
            format!("{:>8} bytes", output_bytes)
        } else {
            String::new()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            green("✓"),
            page_num,
            total,
            dim(&size),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);

        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_conversion_complete(&self, total_pages: usize, output_count: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} pages → {} files",
            green("✔"),
            bold(&total_pages.to_string()),
            bold(&output_count.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Merge PDFs in order
  pdf-combiner merge a.pdf b.pdf -o merged.pdf

  # One page per image, pages sized to the images
  pdf-combiner images-to-pdf scan1.jpg scan2.jpg -o scans.pdf

  # Images fitted inside 1240x1754, aspect ratio kept
  pdf-combiner images-to-pdf *.png -o out.pdf --width 1240 --height 1754

  # Every page to out/image_N.png
  pdf-combiner pdf-to-images document.pdf -o out/

  # All pages stitched into one JPEG, 480 px wide at most
  pdf-combiner pdf-to-images document.pdf -o long.jpg --one-image --format jpeg --width 480 --height 100000

  # Host-style method call from stdin
  echo '{"method":"mergeMultiplePDF","arguments":{"paths":["a.pdf"],"outputDirPath":"o.pdf"}}' \
    | pdf-combiner call

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   libpdfium file or the directory containing it
  RUST_LOG          tracing filter, e.g. pdf_combiner=debug
"#;

#[derive(Parser, Debug)]
#[command(
    name = "pdf-combiner",
    version,
    about = "Merge PDFs, build PDFs from images and rasterise PDF pages to images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    global: GlobalArgs,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Print the result as JSON on stdout.
    #[arg(long, global = true, env = "PDF_COMBINER_JSON")]
    json: bool,

    #[arg(short, long, global = true, env = "PDF_COMBINER_VERBOSE")]
    verbose: bool,

    #[arg(short, long, global = true, env = "PDF_COMBINER_QUIET")]
    quiet: bool,

    #[arg(long, global = true, env = "PDF_COMBINER_NO_PROGRESS")]
    no_progress: bool,

    /// libpdfium file or directory.
    #[arg(long, global = true, env = "PDFIUM_LIB_PATH")]
    pdfium: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Concatenate PDFs into one document.
    Merge {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Build a PDF with one page per image.
    ImagesToPdf {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        size: SizeArgs,
        /// Stretch to exactly width × height instead of fitting inside it.
        #[arg(long)]
        no_keep_aspect_ratio: bool,
    },

    /// Rasterise every page of a PDF.
    PdfToImages {
        input: PathBuf,
        /// Output directory, or the image file with --one-image.
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        size: SizeArgs,
        /// 0–100; low values favour small files.
        #[arg(long, default_value_t = 100,
              value_parser = clap::value_parser!(u8).range(0..=100))]
        compression: u8,
        /// Stitch all pages into one tall image.
        #[arg(long)]
        one_image: bool,
        #[arg(long, value_enum, default_value = "png")]
        format: FormatArg,
        #[arg(long, env = "PDF_COMBINER_DPI", default_value_t = 200,
              value_parser = clap::value_parser!(u32).range(72..=600))]
        dpi: u32,
        #[arg(short, long, env = "PDF_COMBINER_CONCURRENCY", default_value_t = 4)]
        concurrency: usize,
    },

    /// Read one JSON method call from stdin and print the JSON reply.
    Call,
}

/// `0 × 0` means no resize.
#[derive(Args, Debug)]
struct SizeArgs {
    #[arg(long, default_value_t = 0)]
    width: i64,
    #[arg(long, default_value_t = 0)]
    height: i64,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FormatArg {
    Png,
    Jpeg,
}

impl From<FormatArg> for ImageFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Jpeg => ImageFormat::Jpeg,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let global = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs unless -v is given.
    let show_progress = !global.quiet
        && !global.no_progress
        && !global.json
        && !matches!(cli.command, Command::Call);
    let filter = if global.verbose {
        "debug"
    } else if global.quiet || show_progress {
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

    let progress = |action: &str| -> Option<ProgressCallback> {
        show_progress.then(|| CliProgressCallback::new_dynamic(action) as ProgressCallback)
    };

    let mut builder = ConversionConfig::builder();
    if let Some(ref path) = global.pdfium {
        builder = builder.pdfium_library_path(path);
    }

    let result = match cli.command {
        Command::Merge {
            ref inputs,
            ref output,
        } => {
            if let Some(cb) = progress("Merging") {
                builder = builder.progress_callback(cb);
            }
            let combiner = Combiner::new(builder.build()?);
            combiner.merge_pdfs(inputs, output).await
        }

        Command::ImagesToPdf {
            ref inputs,
            ref output,
            ref size,
            no_keep_aspect_ratio,
        } => {
            if let Some(cb) = progress("Building") {
                builder = builder.progress_callback(cb);
            }
            let request = ImagesToPdfRequest {
                paths: inputs.clone(),
                output_path: output.clone(),
                scale: ScaleSpec::from_dimensions(size.width, size.height, !no_keep_aspect_ratio)?,
            };
            let combiner = Combiner::new(builder.build()?);
            combiner.create_pdf_from_images(&request).await
        }

        Command::PdfToImages {
            ref input,
            ref output,
            ref size,
            compression,
            one_image,
            format,
            dpi,
            concurrency,
        } => {
            if let Some(cb) = progress("Rasterising") {
                builder = builder.progress_callback(cb);
            }
            let config = builder
                .render_dpi(dpi)
                .concurrency(concurrency)
                .image_format(format.into())
                .build()?;
            let request = PdfToImagesRequest {
                path: input.clone(),
                output_path: output.clone(),
                scale: ScaleSpec::from_dimensions(size.width, size.height, true)?,
                compression: CompressionLevel::new(compression.into())?,
                create_one_image: one_image,
            };
            Combiner::new(config).create_images_from_pdf(&request).await
        }

        Command::Call => return run_call(builder.build()?).await,
    };

    report(result, global)
}

/// Print the written paths (or the JSON result) and turn failures into an
/// error exit.
fn report(
    result: Result<ConversionOutput, pdf_combiner::CombinerError>,
    global: &GlobalArgs,
) -> Result<()> {
    if global.json {
        let result = ConversionResult::from(result);
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
        if let ConversionResult::Failure { .. } = result {
            std::process::exit(1);
        }
        return Ok(());
    }

    let output = result.context("Conversion failed")?;
    for path in &output.output_paths {
        println!("{}", path.display());
    }
    if !global.quiet {
        eprintln!(
            "{}  {} pages  {} files  {} bytes  {}ms",
            green("✔"),
            output.stats.pages,
            output.stats.output_files,
            dim(&output.stats.output_bytes.to_string()),
            output.stats.total_duration_ms,
        );
    }
    Ok(())
}

async fn run_call(config: ConversionConfig) -> Result<()> {
    let mut raw = String::new();
    io::stdin()
        .read_to_string(&mut raw)
        .context("Failed to read method call from stdin")?;
    let call: MethodCall = serde_json::from_str(&raw).context("Invalid method call JSON")?;

    let bridge = Bridge::new(Combiner::new(config));
    let (tx, rx) = tokio::sync::oneshot::channel();
    let _task = bridge.dispatch(call, move |reply| {
        let _ = tx.send(reply);
    });
    let reply = rx.await.context("Bridge task ended without a reply")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&reply).context("Failed to serialise reply")?
    );
    if let BridgeReply::Error { .. } = reply {
        std::process::exit(1);
    }
    Ok(())
}
