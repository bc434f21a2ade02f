//! CLI binary for axevora.
//!
//! A thin shim over the library crate that maps subcommands and flags to
//! tool operations, writes the resulting artifacts and prints summaries.

use anyhow::{bail, Context, Result};
use axevora::caption::{generate_captions, CaptionLength, CaptionRequest, Platform, Tone};
use axevora::catalog::all_tools;
use axevora::epub::pdf_to_epub;
use axevora::media::ffmpeg::tool_version;
use axevora::media::{bundle_batch, convert_batch, convert_media, ConvertOptions, OutputFormat};
use axevora::pdf::images::{images_to_pdf, PageFit};
use axevora::pdf::ops::{
    delete_pages, extract_pages, merge_pdfs, pdf_info, rearrange_pages, rotate_pages, split_pdf,
    SplitMode,
};
use axevora::pdf::render::pdf_to_images;
use axevora::pdf::security::{protect_pdf, unlock_pdf, ProtectOptions};
use axevora::pdf::text::pdf_to_text;
use axevora::seo::analyze_source;
use axevora::sitegen::{generate_site, Section, SiteRequest, SiteStyle};
use axevora::{
    resolve_input, Artifact, PageSelection, ProgressCallback, RasterFormat, SelectedFile,
    ToolProgressCallback, ToolkitConfig,
};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

/// Terminal progress callback. Starts as a spinner and switches to a step
/// counter or a percentage bar once the task announces its shape.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening input…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, task: &str, total: usize) {
        let (template, len) = if total > 0 {
            (
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len}  ⏱ {elapsed_precise}",
                total as u64,
            )
        } else {
            (
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}%  ⏱ {elapsed_precise}  ETA {eta_precise}",
                100,
            )
        };
        let style = ProgressStyle::with_template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS);
        self.bar.set_length(len);
        self.bar.set_position(0);
        self.bar.set_style(style);
        self.bar.set_prefix(task.to_string());
        self.bar.reset_eta();
    }
}

impl ToolProgressCallback for CliProgressCallback {
    fn on_task_start(&self, task: &str, total_steps: usize) {
        self.activate_bar(task, total_steps);
    }

    fn on_step_complete(&self, step: usize, _total_steps: usize) {
        self.bar.set_position(step as u64);
    }

    fn on_step_error(&self, step: usize, total_steps: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:>3}/{:<3}  {}",
            red("✗"),
            step,
            total_steps,
            red(&msg)
        ));
        self.bar.set_position(step as u64);
    }

    fn on_percent(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn on_task_complete(&self, total_steps: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_steps.saturating_sub(success_count);
        if failed > 0 {
            eprintln!(
                "{} {}/{} steps succeeded  ({} failed)",
                if success_count == 0 { red("✘") } else { yellow("⚠") },
                bold(&success_count.to_string()),
                total_steps,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Reorder pages: page 3 first, then 1 and 2
  axevora pdf rearrange report.pdf --order 3,1,2

  # Delete pages 2 and 5 to 7
  axevora pdf delete report.pdf --pages 2,5-7 -o trimmed.pdf

  # Split into one file per range
  axevora pdf split book.pdf --ranges 1-10,11-20

  # Password-protect, then unlock again
  axevora pdf protect report.pdf --user-password s3cret
  axevora --password s3cret pdf unlock report-protected.pdf

  # Render pages 1-3 as PNG (zip)
  axevora pdf to-images slides.pdf --pages 1-3 --format png

  # Convert media
  axevora convert song.flac --to mp3 --bitrate 192
  axevora convert *.png --to webp --max-width 1200

  # SEO score of a page (file or URL)
  axevora seo https://example.com --json

  # Generate a site
  axevora site "a bakery called Sweet Crumbs in Leeds" --style classic --single-file

ENVIRONMENT VARIABLES:
  AXEVORA_PDFIUM_PATH     Directory containing libpdfium (PDF → image)
  AXEVORA_FFMPEG          ffmpeg executable (audio / video conversion)
  AXEVORA_FFPROBE         ffprobe executable (progress percentages)
  AXEVORA_PASSWORD        Password for encrypted input PDFs
  AXEVORA_CAPTION_ENDPOINT  Text endpoint used by `caption`
  RUST_LOG                Override log filter (e.g. axevora=debug)
"#;

/// File conversion toolkit: PDF tools, media conversion, EPUB, SEO and site generation.
#[derive(Parser, Debug)]
#[command(
    name = "axevora",
    version,
    about = "PDF tools, media conversion, EPUB, SEO analysis, captions and site generation",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Rendering DPI for PDF → image (72–400).
    #[arg(long, global = true, env = "AXEVORA_DPI", default_value_t = 150,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// JPEG / WebP quality (1–100).
    #[arg(long, global = true, env = "AXEVORA_QUALITY", default_value_t = 90,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Files converted at once in batch mode.
    #[arg(short, long, global = true, env = "AXEVORA_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// PDF user password for encrypted inputs (also used by `pdf unlock`).
    #[arg(long, global = true, env = "AXEVORA_PASSWORD")]
    password: Option<String>,

    /// ffmpeg executable.
    #[arg(long, global = true, env = "AXEVORA_FFMPEG", default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// ffprobe executable.
    #[arg(long, global = true, env = "AXEVORA_FFPROBE", default_value = "ffprobe")]
    ffprobe: PathBuf,

    /// Directory containing the pdfium shared library.
    #[arg(long, global = true, env = "AXEVORA_PDFIUM_PATH")]
    pdfium_path: Option<PathBuf>,

    /// Text endpoint for caption generation.
    #[arg(long, global = true, env = "AXEVORA_CAPTION_ENDPOINT")]
    caption_endpoint: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, global = true, env = "AXEVORA_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Caption request timeout in seconds.
    #[arg(long, global = true, env = "AXEVORA_HTTP_TIMEOUT", default_value_t = 60)]
    http_timeout: u64,

    /// Print results as JSON where supported.
    #[arg(long, global = true, env = "AXEVORA_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "AXEVORA_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "AXEVORA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "AXEVORA_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// PDF page tools.
    #[command(subcommand)]
    Pdf(PdfCommand),

    /// Convert images, audio or video to another format.
    Convert {
        /// Input files or URLs.
        #[arg(required = true)]
        inputs: Vec<String>,
        /// Target format: png, jpg, webp, bmp, gif, tiff, mp3, wav, aac, flac, ogg, opus, m4a, mp4, avi, mov, webm, mkv.
        #[arg(long)]
        to: String,
        /// Audio bitrate in kbit/s.
        #[arg(long)]
        bitrate: Option<u32>,
        /// Shrink images to at most this width.
        #[arg(long)]
        max_width: Option<u32>,
        /// Shrink images to at most this height.
        #[arg(long)]
        max_height: Option<u32>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Score a page's on-page SEO.
    Seo {
        /// HTML file path or URL.
        source: String,
    },

    /// Generate social media captions.
    Caption {
        /// What the post is about.
        topic: String,
        /// instagram, twitter, linkedin, facebook, tiktok.
        #[arg(long, default_value = "instagram")]
        platform: String,
        /// casual, professional, funny, inspirational, promotional.
        #[arg(long, default_value = "casual")]
        tone: String,
        /// short, medium, long.
        #[arg(long, default_value = "medium")]
        length: String,
        #[arg(long)]
        no_hashtags: bool,
        #[arg(long)]
        no_emojis: bool,
        /// Number of variants.
        #[arg(long, default_value_t = 1)]
        count: usize,
    },

    /// Generate a one-page website from a description.
    Site {
        /// Free-text description, e.g. "a bakery called Sweet Crumbs".
        prompt: String,
        /// modern, classic, minimal, bold.
        #[arg(long, default_value = "modern")]
        style: String,
        /// Comma-separated sections in page order (hero,about,services,gallery,testimonials,contact).
        #[arg(long)]
        sections: Option<String>,
        /// One HTML file with CSS and JS inlined instead of a zip.
        #[arg(long)]
        single_file: bool,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List tools and check external engines.
    Tools,
}

#[derive(Subcommand, Debug)]
enum PdfCommand {
    /// Print page count, sizes and document info.
    Info { input: String },

    /// Concatenate PDFs in the order given.
    Merge {
        #[arg(required = true, num_args = 2..)]
        inputs: Vec<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Split into one PDF per page or per range (zip).
    Split {
        input: String,
        /// Comma-separated ranges, one output file each. Default: every page.
        #[arg(long)]
        ranges: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove pages.
    Delete {
        input: String,
        #[arg(long)]
        pages: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Keep only the selected pages.
    Extract {
        input: String,
        #[arg(long)]
        pages: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reorder pages, e.g. --order 3,1,2.
    Rearrange {
        input: String,
        #[arg(long)]
        order: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rotate pages by a multiple of 90 degrees.
    Rotate {
        input: String,
        #[arg(long, allow_hyphen_values = true)]
        degrees: i32,
        #[arg(long, default_value = "all")]
        pages: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Encrypt with a password.
    Protect {
        input: String,
        #[arg(long, env = "AXEVORA_USER_PASSWORD")]
        user_password: String,
        #[arg(long, env = "AXEVORA_OWNER_PASSWORD")]
        owner_password: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove the password (give it with --password).
    Unlock {
        input: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Render pages to images.
    ToImages {
        input: String,
        /// png, jpg, webp, bmp, gif, tiff.
        #[arg(long, default_value = "png")]
        format: String,
        #[arg(long, default_value = "all")]
        pages: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Combine images into a PDF, one per page.
    FromImages {
        #[arg(required = true)]
        inputs: Vec<String>,
        #[arg(long, value_enum, default_value = "original")]
        fit: FitArg,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Extract the text layer.
    ToText {
        input: String,
        #[arg(long, default_value = "all")]
        pages: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Convert the text layer into an EPUB e-book.
    ToEpub {
        input: String,
        #[arg(long, default_value = "all")]
        pages: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum FitArg {
    Original,
    A4,
}

impl From<FitArg> for PageFit {
    fn from(v: FitArg) -> Self {
        match v {
            FitArg::Original => PageFit::Original,
            FitArg::A4 => PageFit::A4,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let g = &cli.global;

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs are suppressed while the progress bar is active.
    let show_progress = !g.quiet && !g.no_progress && !g.json;
    let filter = if g.verbose {
        "debug"
    } else if g.quiet || show_progress {
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

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ToolProgressCallback>)
    } else {
        None
    };
    let config = build_config(g, progress_cb)?;

    match &cli.command {
        Command::Pdf(cmd) => run_pdf(cmd, g, &config).await,
        Command::Convert {
            inputs,
            to,
            bitrate,
            max_width,
            max_height,
            output,
        } => {
            let format: OutputFormat = to.parse().context("Invalid --to format")?;
            let mut options = ConvertOptions::new(format)
                .quality(g.quality)
                .max_size(*max_width, *max_height);
            if let Some(kbps) = bitrate {
                options = options.bitrate_kbps(*kbps);
            }
            let files = load_all(inputs, &config).await?;
            if let [file] = files.as_slice() {
                let artifact = convert_media(file, &options, &config)
                    .await
                    .context("Conversion failed")?;
                save(&artifact, output.as_deref(), g).await
            } else {
                let items = convert_batch(&files, &options, &config).await;
                let ok = items.iter().filter(|i| i.result.is_ok()).count();
                for item in &items {
                    if let Err(e) = &item.result {
                        eprintln!("  {} {}", red("✗"), e);
                    }
                }
                if ok == 0 {
                    bail!("None of the {} files converted", items.len());
                }
                let bundle = bundle_batch(&items).context("Failed to bundle outputs")?;
                if !g.quiet {
                    eprintln!("{} {}/{} files converted", green("✔"), ok, items.len());
                }
                save(&bundle, output.as_deref(), g).await
            }
        }
        Command::Seo { source } => {
            let report = analyze_source(source, &config)
                .await
                .context("SEO analysis failed")?;
            if g.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report).context("Failed to serialise report")?
                );
            } else {
                println!("Score:  {} / 100  ({})", bold(&report.score.to_string()), report.grade());
                println!("Words:  {}", report.facts.word_count);
                for issue in &report.issues {
                    println!(
                        "  {} {:<24} {}  {}",
                        yellow("•"),
                        issue.check,
                        issue.message,
                        dim(&format!("-{}", issue.deduction))
                    );
                }
            }
            Ok(())
        }
        Command::Caption {
            topic,
            platform,
            tone,
            length,
            no_hashtags,
            no_emojis,
            count,
        } => {
            let mut req = CaptionRequest::new(topic.clone());
            req.platform = platform.parse::<Platform>().context("Invalid --platform")?;
            req.tone = tone.parse::<Tone>().context("Invalid --tone")?;
            req.length = length.parse::<CaptionLength>().context("Invalid --length")?;
            req.hashtags = !no_hashtags;
            req.emojis = !no_emojis;
            let captions = generate_captions(&req, *count, &config)
                .await
                .context("Caption generation failed")?;
            if g.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&captions).context("Failed to serialise captions")?
                );
            } else {
                for (i, caption) in captions.iter().enumerate() {
                    if i > 0 {
                        println!("{}", dim("───"));
                    }
                    println!("{caption}");
                }
            }
            Ok(())
        }
        Command::Site {
            prompt,
            style,
            sections,
            single_file,
            output,
        } => {
            let mut req = SiteRequest::new(prompt.clone());
            req.style = style.parse::<SiteStyle>().context("Invalid --style")?;
            if let Some(list) = sections {
                req.sections = list
                    .split(',')
                    .filter(|s| !s.trim().is_empty())
                    .map(str::parse::<Section>)
                    .collect::<Result<_, _>>()
                    .context("Invalid --sections")?;
            }
            let site = generate_site(&req);
            if !g.quiet {
                eprintln!(
                    "{} {} ({} site)",
                    cyan("◆"),
                    bold(&site.business_name),
                    site.industry
                );
            }
            let artifact = if *single_file {
                site.to_single_file()
            } else {
                site.to_zip().context("Failed to bundle site")?
            };
            save(&artifact, output.as_deref(), g).await
        }
        Command::Tools => {
            for tool in all_tools() {
                println!("{:<20} {:<8} {}", tool.slug, tool.category.to_string(), dim(tool.description));
            }
            println!();
            for engine in [&config.ffmpeg_path, &config.ffprobe_path] {
                match tool_version(engine).await {
                    Ok(v) => println!("{} {}", green("✔"), v),
                    Err(e) => println!("{} {}", red("✘"), e.to_string().lines().next().unwrap_or("")),
                }
            }
            Ok(())
        }
    }
}

async fn run_pdf(cmd: &PdfCommand, g: &GlobalArgs, config: &ToolkitConfig) -> Result<()> {
    let (artifact, output) = match cmd {
        PdfCommand::Info { input } => {
            let file = load(input, config).await?;
            let info = pdf_info(&file, config).await.context("Failed to read PDF")?;
            if g.json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&info).context("Failed to serialize metadata")?
                );
            } else {
                println!("File:         {}", info.file_name);
                if let Some(ref t) = info.title {
                    println!("Title:        {}", t);
                }
                if let Some(ref a) = info.author {
                    println!("Author:       {}", a);
                }
                if let Some(ref s) = info.subject {
                    println!("Subject:      {}", s);
                }
                println!("Pages:        {}", info.page_count);
                println!("PDF Version:  {}", info.pdf_version);
                println!("Encrypted:    {}", info.was_encrypted);
                if let Some(ref p) = info.producer {
                    println!("Producer:     {}", p);
                }
                if let Some(ref c) = info.creator {
                    println!("Creator:      {}", c);
                }
                if let Some((w, h)) = info.page_sizes.first() {
                    println!("Page 1 size:  {:.0} × {:.0} pt", w, h);
                }
            }
            return Ok(());
        }
        PdfCommand::Merge { inputs, output } => {
            let files = load_all(inputs, config).await?;
            (merge_pdfs(&files, config).await, output)
        }
        PdfCommand::Split {
            input,
            ranges,
            output,
        } => {
            let file = load(input, config).await?;
            let mode = match ranges {
                Some(r) => SplitMode::Ranges(r.clone()),
                None => SplitMode::EveryPage,
            };
            (split_pdf(&file, &mode, config).await, output)
        }
        PdfCommand::Delete {
            input,
            pages,
            output,
        } => {
            let file = load(input, config).await?;
            (delete_pages(&file, &PageSelection::parse(pages), config).await, output)
        }
        PdfCommand::Extract {
            input,
            pages,
            output,
        } => {
            let file = load(input, config).await?;
            (extract_pages(&file, &PageSelection::parse(pages), config).await, output)
        }
        PdfCommand::Rearrange {
            input,
            order,
            output,
        } => {
            let file = load(input, config).await?;
            (rearrange_pages(&file, &PageSelection::parse(order), config).await, output)
        }
        PdfCommand::Rotate {
            input,
            degrees,
            pages,
            output,
        } => {
            let file = load(input, config).await?;
            (
                rotate_pages(&file, &PageSelection::parse(pages), *degrees, config).await,
                output,
            )
        }
        PdfCommand::Protect {
            input,
            user_password,
            owner_password,
            output,
        } => {
            let file = load(input, config).await?;
            let mut options = ProtectOptions::new(user_password.clone());
            if let Some(owner) = owner_password {
                options = options.with_owner_password(owner.clone());
            }
            (protect_pdf(&file, &options, config).await, output)
        }
        PdfCommand::Unlock { input, output } => {
            let Some(password) = g.password.as_deref() else {
                bail!("`pdf unlock` needs the current password: pass --password <PASSWORD>");
            };
            let file = load(input, config).await?;
            (unlock_pdf(&file, password, config).await, output)
        }
        PdfCommand::ToImages {
            input,
            format,
            pages,
            output,
        } => {
            let format: RasterFormat = format.parse().context("Invalid --format")?;
            let file = load(input, config).await?;
            (
                pdf_to_images(&file, &PageSelection::parse(pages), format, config).await,
                output,
            )
        }
        PdfCommand::FromImages {
            inputs,
            fit,
            output,
        } => {
            let files = load_all(inputs, config).await?;
            (images_to_pdf(&files, (*fit).into(), config).await, output)
        }
        PdfCommand::ToText {
            input,
            pages,
            output,
        } => {
            let file = load(input, config).await?;
            (pdf_to_text(&file, &PageSelection::parse(pages), config).await, output)
        }
        PdfCommand::ToEpub {
            input,
            pages,
            output,
        } => {
            let file = load(input, config).await?;
            (pdf_to_epub(&file, &PageSelection::parse(pages), config).await, output)
        }
    };

    let artifact = artifact.context("PDF operation failed")?;
    save(&artifact, output.as_deref(), g).await
}

/// Map global flags to `ToolkitConfig`.
fn build_config(g: &GlobalArgs, progress: Option<ProgressCallback>) -> Result<ToolkitConfig> {
    let mut builder = ToolkitConfig::builder()
        .render_dpi(g.dpi)
        .jpeg_quality(g.quality)
        .concurrency(g.concurrency)
        .ffmpeg_path(&g.ffmpeg)
        .ffprobe_path(&g.ffprobe)
        .download_timeout_secs(g.download_timeout)
        .http_timeout_secs(g.http_timeout);

    if let Some(ref path) = g.pdfium_path {
        builder = builder.pdfium_library_path(path);
    }
    if let Some(ref endpoint) = g.caption_endpoint {
        builder = builder.caption_endpoint(endpoint.clone());
    }
    if let Some(ref pwd) = g.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn load(input: &str, config: &ToolkitConfig) -> Result<SelectedFile> {
    resolve_input(input, config.download_timeout_secs)
        .await
        .with_context(|| format!("Failed to open '{input}'"))
}

async fn load_all(inputs: &[String], config: &ToolkitConfig) -> Result<Vec<SelectedFile>> {
    let mut files = Vec::with_capacity(inputs.len());
    for input in inputs {
        files.push(load(input, config).await?);
    }
    Ok(files)
}

/// Write to `output`, into `output` when it is a directory, or to the
/// artifact's suggested name in the current directory.
async fn save(artifact: &Artifact, output: Option<&Path>, g: &GlobalArgs) -> Result<()> {
    let path = match output {
        Some(p) if p.is_dir() => p.join(&artifact.file_name),
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(&artifact.file_name),
    };
    artifact
        .write_to(&path)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    if !g.quiet {
        eprintln!(
            "{}  {}  {}",
            green("✔"),
            bold(&path.display().to_string()),
            dim(&format!("{} bytes, {}", artifact.len(), artifact.mime)),
        );
    }
    Ok(())
}
