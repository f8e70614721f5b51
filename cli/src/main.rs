//! unocr CLI - OCR output conversion tool

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use unocr::{
    convert_document, load_bytes_as, load_file, render, Collaborators, ConvertOptions,
    DocumentState, EngineId, JsonFormat, ProgressSink, RawDocument, RawFormat,
};

#[derive(Parser)]
#[command(name = "unocr")]
#[command(author = "iyulab")]
#[command(version)]
#[command(about = "Convert OCR engine output to text and JSON", long_about = None)]
struct Cli {
    /// Input OCR file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output directory
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options shared by every converting command.
#[derive(clap::Args, Clone)]
struct ConvertArgs {
    /// Input format
    #[arg(long, value_enum, default_value = "auto")]
    format: InputFormat,

    /// Engine name the imported data is stored under
    #[arg(long, env = "UNOCR_ENGINE", default_value = "imported")]
    engine: String,

    /// Keep italic styling reported by the input
    #[arg(long)]
    keep_italic: bool,

    /// Scribe mode (implies --keep-italic)
    #[arg(long)]
    scribe: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert to all outputs (text and JSON)
    Convert {
        /// Input OCR file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output: Option<PathBuf>,

        #[command(flatten)]
        args: ConvertArgs,
    },

    /// Convert to plain text
    Text {
        /// Input OCR file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        args: ConvertArgs,
    },

    /// Convert to JSON
    Json {
        /// Input OCR file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,

        #[command(flatten)]
        args: ConvertArgs,
    },

    /// Show document information
    Info {
        /// Input OCR file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        args: ConvertArgs,
    },

    /// Show version information
    Version,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum InputFormat {
    /// Detect from content
    Auto,
    /// Tesseract block tree (JSON)
    Blocks,
    /// hOCR
    Hocr,
    /// ABBYY FineReader XML
    Abbyy,
    /// mupdf structured text
    Stext,
}

impl InputFormat {
    fn raw_format(self) -> Option<RawFormat> {
        match self {
            InputFormat::Auto => None,
            InputFormat::Blocks => Some(RawFormat::Blocks),
            InputFormat::Hocr => Some(RawFormat::Hocr),
            InputFormat::Abbyy => Some(RawFormat::Abbyy),
            InputFormat::Stext => Some(RawFormat::Stext),
        }
    }
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Progress bar fed by the merge step.
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} pages")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    fn start(&self, total: usize) {
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
    }

    fn increment(&self) {
        self.bar.inc(1);
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Convert {
            input,
            output,
            args,
        }) => cmd_convert(&input, output.as_deref(), &args),
        Some(Commands::Text {
            input,
            output,
            args,
        }) => cmd_text(&input, output.as_deref(), &args),
        Some(Commands::Json {
            input,
            output,
            compact,
            args,
        }) => cmd_json(&input, output.as_deref(), compact, &args),
        Some(Commands::Info { input, args }) => cmd_info(&input, &args),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if let Some(input) = cli.input {
                cmd_convert(&input, cli.output.as_deref(), &default_args())
            } else {
                println!("{}", "Usage: unocr <FILE> [OUTPUT]".yellow());
                println!("       unocr --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn default_args() -> ConvertArgs {
    ConvertArgs {
        format: InputFormat::Auto,
        engine: "imported".to_string(),
        keep_italic: false,
        scribe: false,
    }
}

fn load(input: &Path, format: InputFormat) -> CliResult<RawDocument> {
    let doc = match format.raw_format() {
        Some(format) => load_bytes_as(&fs::read(input)?, format)?,
        None => load_file(input)?,
    };
    log::info!("{}: {} pages of {}", input.display(), doc.page_count(), doc.format);
    Ok(doc)
}

fn convert_options(args: &ConvertArgs) -> ConvertOptions {
    let options = ConvertOptions::new().with_keep_italic(args.keep_italic);
    if args.scribe {
        options.scribe_mode()
    } else {
        options
    }
}

/// Load and convert `input`, showing a progress bar when `progress` is set.
fn convert(input: &Path, args: &ConvertArgs, progress: bool) -> CliResult<(EngineId, DocumentState)> {
    let doc = load(input, args.format)?;
    let engine = EngineId::user(args.engine.clone());

    let state = if progress {
        let bar = BarProgress::new();
        let state = convert_document(
            doc,
            &engine,
            convert_options(args),
            Collaborators::headless().with_progress(&bar),
        )?;
        bar.bar.finish_and_clear();
        state
    } else {
        convert_document(doc, &engine, convert_options(args), Collaborators::headless())?
    };
    Ok((engine, state))
}

fn write_or_print(output: Option<&Path>, content: &str) -> CliResult<()> {
    if let Some(path) = output {
        fs::write(path, content)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", content);
    }
    Ok(())
}

fn cmd_convert(input: &Path, output: Option<&Path>, args: &ConvertArgs) -> CliResult<()> {
    let output_dir = output.map(|p| p.to_path_buf()).unwrap_or_else(|| {
        let stem = input.file_stem().unwrap_or_default().to_string_lossy();
        PathBuf::from(format!("{}_output", stem))
    });

    fs::create_dir_all(&output_dir)?;

    let (engine, state) = convert(input, args, true)?;

    let text = render::to_text(&state, &engine)?;
    fs::write(output_dir.join("extract.txt"), &text)?;

    let json = render::to_json(&state, &engine, JsonFormat::Pretty)?;
    fs::write(output_dir.join("content.json"), &json)?;

    println!("\n{}", "Output files:".green().bold());
    println!("  {} extract.txt", "├─".dimmed());
    println!("  {} content.json", "└─".dimmed());

    Ok(())
}

fn cmd_text(input: &Path, output: Option<&Path>, args: &ConvertArgs) -> CliResult<()> {
    let (engine, state) = convert(input, args, output.is_some())?;
    let text = render::to_text(&state, &engine)?;
    write_or_print(output, &text)
}

fn cmd_json(input: &Path, output: Option<&Path>, compact: bool, args: &ConvertArgs) -> CliResult<()> {
    let (engine, state) = convert(input, args, output.is_some())?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    let json = render::to_json(&state, &engine, format)?;
    write_or_print(output, &json)
}

/// Per-document statistics shown by `info`.
#[derive(Debug, Default, PartialEq)]
struct Stats {
    pages: usize,
    empty_pages: usize,
    lines: usize,
    words: usize,
    tables: usize,
    languages: BTreeMap<String, usize>,
    warnings: usize,
}

fn collect_stats(state: &DocumentState, engine: &EngineId) -> Stats {
    let mut stats = Stats {
        pages: state.page_count(),
        ..Default::default()
    };

    for n in 0..state.page_count() {
        match state.engines().page(engine, n) {
            Some(page) if !page.is_empty() => {
                stats.lines += page.lines().len();
                stats.words += page.word_count();
                for word in page.words() {
                    let lang = word.lang.clone().unwrap_or_else(|| "unknown".to_string());
                    *stats.languages.entry(lang).or_default() += 1;
                }
            }
            _ => stats.empty_pages += 1,
        }
        stats.tables += state.layout(n).map_or(0, |l| l.tables.len());
    }
    stats.warnings = state
        .warnings()
        .iter()
        .flatten()
        .filter(|w| !w.is_empty())
        .count();
    stats
}

fn cmd_info(input: &Path, args: &ConvertArgs) -> CliResult<()> {
    let (engine, state) = convert(input, args, false)?;
    let stats = collect_stats(&state, &engine);

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Engine".bold(), engine);
    println!("{}: {}", "Pages".bold(), stats.pages);
    if let Some(metrics) = state.metrics(0) {
        println!(
            "{}: {} x {}",
            "Page size".bold(),
            metrics.dims.width,
            metrics.dims.height
        );
    }

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "Lines".bold(), stats.lines);
    println!("{}: {}", "Words".bold(), stats.words);
    println!("{}: {}", "Tables".bold(), stats.tables);
    println!("{}: {}", "Empty pages".bold(), stats.empty_pages);
    if !stats.languages.is_empty() {
        println!(
            "{}: {}",
            "Languages".bold(),
            serde_json::to_string(&stats.languages)?
        );
    }
    if stats.warnings > 0 {
        println!(
            "{}: {} pages with character data problems",
            "Warnings".yellow().bold(),
            stats.warnings
        );
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "unocr".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("OCR output conversion tool");
    println!();
    println!("Repository: {}", "https://github.com/iyulab/unocr".dimmed());
    println!("License: MIT");
}
