use clap::{Parser, Subcommand};
use prodshot::batch::run_batch;
use prodshot::format::OutputFormat;
use prodshot::pipeline::{DefaultPipeline, PipelineConfig};
use prodshot::source::ImageSource;
use prodshot::{config, output};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Shared flags for commands that run the pipeline.
#[derive(clap::Args, Clone)]
struct PipelineArgs {
    /// Output format: PNG, JPEG or WEBP (only the first word is read)
    #[arg(long, default_value = "PNG", value_parser = OutputFormat::from_label)]
    format: OutputFormat,

    /// Resize to exactly WIDTHxHEIGHT pixels, e.g. 1080x1080
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    size: Option<(u32, u32)>,

    /// Remove the background (needs a rembg server, see [background] in the config)
    #[arg(long)]
    remove_bg: bool,

    /// Boost saturation (+20%) and contrast (+10%)
    #[arg(long)]
    enhance: bool,

    /// Ask the AI for a slogan in this direction and draw it on the image
    #[arg(long, value_name = "PROMPT")]
    caption: Option<String>,

    /// Caption API key for this run (overrides config and GEMINI_API_KEY)
    #[arg(long, value_name = "KEY")]
    api_key: Option<String>,
}

impl PipelineArgs {
    fn into_config(self) -> PipelineConfig {
        PipelineConfig {
            format: self.format,
            resize: self.size,
            remove_background: self.remove_bg,
            enhance: self.enhance,
            caption_prompt: self.caption,
            api_key: self.api_key,
        }
    }
}

fn version_string() -> &'static str {
    let hash = env!("PRODSHOT_GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup
        Box::leak(format!("{}@{hash}", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "prodshot")]
#[command(about = "Turn raw product photos into publish-ready assets")]
#[command(long_about = "\
Turn raw product photos into publish-ready assets

Every image goes through the same stages, each enabled by a flag:

  load → --remove-bg → --caption → --size → --enhance → --format

Captions are best-effort: without an API key, or when the caption service
fails, the image is still produced, just without text.

Batch mode mirrors the input tree into the output directory:

  photos/                   out/
  ├── shoes/red.jpg    →    ├── shoes/red.png
  └── hat.webp         →    └── hat.png

A file that fails is reported and skipped; the rest of the batch continues.

Run 'prodshot gen-config' to generate a documented prodshot.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (optional; missing file means defaults)
    #[arg(long, default_value = "prodshot.toml", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a single image
    Process {
        /// Image to process
        input: PathBuf,
        /// Where to write the result (default: next to the input, new extension)
        #[arg(long)]
        out: Option<PathBuf>,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Process every image under a directory
    Batch {
        /// Input directory, searched recursively
        input: PathBuf,
        /// Output directory; created if missing
        output: PathBuf,
        #[command(flatten)]
        pipeline: PipelineArgs,
    },
    /// Print a stock prodshot.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Process {
            input,
            out,
            pipeline: args,
        } => {
            let pipeline = load_pipeline(&cli.config)?;
            let config = args.into_config();
            let output_path = out.unwrap_or_else(|| default_output_path(&input, config.format));
            pipeline.process_to_file(ImageSource::Path(&input), &config, &output_path)?;
            println!("{}", output::format_single(&input, &output_path));
        }
        Command::Batch {
            input,
            output: output_dir,
            pipeline: args,
        } => {
            let pipeline = load_pipeline(&cli.config)?;
            let config = args.into_config();
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    output::print_batch_event(&event);
                }
            });
            let result = run_batch(&pipeline, &input, &output_dir, &config, Some(tx));
            printer
                .join()
                .map_err(|_| "progress printer thread panicked")?;
            let result = result?;
            if !result.is_empty() {
                println!();
            }
            output::print_summary(&result);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn load_pipeline(config_path: &Path) -> Result<DefaultPipeline, Box<dyn std::error::Error>> {
    let app_config = config::load_config(config_path)?;
    Ok(DefaultPipeline::from_config(&app_config)?)
}

/// `shoe.jpg` → `shoe.png`; never the input itself (`shoe.png` → `shoe-prodshot.png`).
fn default_output_path(input: &Path, format: OutputFormat) -> PathBuf {
    let candidate = input.with_extension(format.extension());
    if candidate != input {
        return candidate;
    }
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}-prodshot.{}", format.extension()))
}

/// Parse `WIDTHxHEIGHT`. Zero is accepted here and rejected by the resize stage.
fn parse_size(value: &str) -> Result<(u32, u32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {value:?}"))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|e| format!("invalid dimension {part:?}: {e}"))
    };
    Ok((parse(w)?, parse(h)?))
}
