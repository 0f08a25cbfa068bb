//! webpbatch CLI - Batch WebP Conversion for Gallery Assets
//!
//! Running `webpbatch` with no arguments converts the gallery images into
//! thumbnails with the built-in `thumbnail` profile. Every profile field can
//! be overridden from the command line or a configuration file.

use std::path::{Path, PathBuf};
use std::process;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use tracing::{info, warn};

use webpbatch::config::DEFAULT_PROFILE;
use webpbatch::processing::locate_blocking;
use webpbatch::{
    init_with_config, BatchDriver, Config, ConversionProfile, ProgressReporter, ReportFormat,
    WebpBatchError,
};

/// Exit code when `--fail-on-error` is set and at least one file failed
const EXIT_FILES_FAILED: i32 = 2;

/// webpbatch - Batch WebP Conversion for Gallery Assets
#[derive(Parser)]
#[command(
    name = "webpbatch",
    version,
    about = "Batch-convert gallery images to WebP with a bounded ffmpeg worker pool",
    long_about = "webpbatch converts every matching image in a source directory to WebP by \
                  running one ffmpeg process per file, at most --workers at a time. Per-file \
                  failures are reported and counted but never stop the batch."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Conversion profile to run
    #[arg(short, long, value_name = "NAME", default_value = DEFAULT_PROFILE)]
    profile: String,

    /// Configuration file path (.toml or .yaml)
    #[arg(short, long, value_name = "FILE", env = "WEBPBATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Source directory (overrides the profile)
    #[arg(short, long, value_name = "DIR")]
    source: Option<PathBuf>,

    /// Destination directory (overrides the profile)
    #[arg(short, long, value_name = "DIR")]
    dest: Option<PathBuf>,

    /// File name wildcard, e.g. '*.png' (overrides the profile)
    #[arg(long, value_name = "GLOB")]
    pattern: Option<String>,

    /// Maximum concurrent encoder processes (overrides the profile)
    #[arg(short, long, value_name = "COUNT")]
    workers: Option<usize>,

    /// Skip inputs whose output already exists
    #[arg(long, conflicts_with = "overwrite")]
    skip_existing: bool,

    /// Always re-encode, even when the output exists
    #[arg(long)]
    overwrite: bool,

    /// Encoder program name or path (overrides the profile)
    #[arg(long, value_name = "PROGRAM")]
    encoder: Option<String>,

    /// Output progress as JSON lines
    #[arg(long)]
    json: bool,

    /// Exit with status 2 when any file failed
    #[arg(long)]
    fail_on_error: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short = 'Q', long, conflicts_with = "verbose")]
    quiet: bool,
}

/// Available subcommands
#[derive(Subcommand)]
enum Commands {
    /// List available conversion profiles
    Profiles {
        /// Show every profile setting
        #[arg(long)]
        detailed: bool,
    },
    /// Validate configuration file
    Config {
        /// Configuration file to validate
        file: PathBuf,
    },
    /// Generate example configuration file
    ExampleConfig {
        /// Output file path
        #[arg(short, long, default_value = "webpbatch.toml")]
        output: PathBuf,
        /// Use YAML format instead of TOML
        #[arg(long)]
        yaml: bool,
    },
    /// Check that the encoder is installed
    Info,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            let message = e
                .downcast_ref::<WebpBatchError>()
                .map_or_else(|| format!("{:#}", e), WebpBatchError::user_message);
            eprintln!("{}: {}", style("Error").red().bold(), message);
            1
        }
    };

    process::exit(code);
}

async fn run(mut cli: Cli) -> anyhow::Result<i32> {
    let config = load_config(cli.config.as_deref())?;

    let level_override = if cli.quiet {
        Some("error")
    } else if cli.verbose {
        Some("debug")
    } else {
        None
    };
    init_with_config(&config.logging, level_override);

    if let Some(command) = cli.command.take() {
        return handle_subcommand(command, &config, &cli).await;
    }

    let profile = selected_profile(&config, &cli)?;
    profile
        .validate()
        .with_context(|| format!("Invalid settings for profile '{}'", cli.profile))?;

    match locate_blocking(&profile.encoder).await {
        Ok(tool) => info!("Using encoder {:?}", tool.path),
        Err(e) => warn!("{}; every conversion will fail", e),
    }

    let reporter = if cli.json {
        ProgressReporter::new(ReportFormat::Json)
    } else {
        ProgressReporter::new(ReportFormat::Text)
    };

    let driver = BatchDriver::for_profile(&profile, reporter);
    let summary = driver.run(&profile).await?;

    if cli.fail_on_error && summary.has_failures() {
        return Ok(EXIT_FILES_FAILED);
    }
    Ok(0)
}

/// Load the configuration file if one was given, otherwise the built-ins
fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let config = Config::from_file(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

/// The profile named by `--profile` with command-line flags applied
fn selected_profile(config: &Config, cli: &Cli) -> anyhow::Result<ConversionProfile> {
    Ok(apply_overrides(config.get_profile(&cli.profile)?.clone(), cli))
}

/// Layer command-line flags over a profile
fn apply_overrides(mut profile: ConversionProfile, cli: &Cli) -> ConversionProfile {
    if let Some(source) = &cli.source {
        profile.source_dir = source.clone();
    }
    if let Some(dest) = &cli.dest {
        profile.dest_dir = dest.clone();
    }
    if let Some(pattern) = &cli.pattern {
        profile.pattern = pattern.clone();
    }
    if let Some(workers) = cli.workers {
        profile.workers = workers;
    }
    if let Some(encoder) = &cli.encoder {
        profile.encoder = encoder.clone();
    }
    if cli.skip_existing {
        profile.skip_existing = true;
    } else if cli.overwrite {
        profile.skip_existing = false;
    }
    profile
}

/// Handle subcommands
async fn handle_subcommand(command: Commands, config: &Config, cli: &Cli) -> anyhow::Result<i32> {
    match command {
        Commands::Profiles { detailed } => {
            show_profiles(config, detailed);
            Ok(0)
        }
        Commands::Config { file } => {
            validate_config_file(&file)?;
            Ok(0)
        }
        Commands::ExampleConfig { output, yaml } => {
            generate_example_config(&output, yaml)?;
            Ok(0)
        }
        Commands::Info => show_encoder_info(&selected_profile(config, cli)?).await,
    }
}

/// Show available profiles
fn show_profiles(config: &Config, detailed: bool) {
    println!("{}", style("Available Conversion Profiles:").bold());
    println!();

    let mut names: Vec<_> = config.profiles.keys().collect();
    names.sort();

    for name in names {
        let profile = &config.profiles[name];
        println!("{}", style(name).cyan().bold());
        if detailed {
            if let Some(description) = &profile.description {
                println!("  {}", description);
            }
            println!("  Source:  {} ({})", profile.source_dir.display(), profile.pattern);
            println!("  Dest:    {}", profile.dest_dir.display());
            println!("  Codec:   {}", profile.codec.describe());
            println!("  Workers: {}", profile.workers);
            println!("  Skip existing: {}", if profile.skip_existing { "yes" } else { "no" });
            println!();
        }
    }

    if !detailed {
        println!();
        println!("Use {} for detailed information", style("--detailed").dim());
    }
}

/// Validate configuration file
fn validate_config_file(file_path: &Path) -> anyhow::Result<()> {
    let config = load_config(Some(file_path))?;

    println!("{}: Configuration file is valid", style("Success").green().bold());
    println!("Profiles: {}", config.profiles.len());

    Ok(())
}

/// Generate example configuration file
fn generate_example_config(output_path: &Path, use_yaml: bool) -> anyhow::Result<()> {
    let output_path = if use_yaml {
        output_path.with_extension("yaml")
    } else {
        output_path.to_path_buf()
    };

    Config::default()
        .to_file(&output_path)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    let format = if use_yaml { "YAML" } else { "TOML" };
    println!(
        "{}: Generated example {} configuration: {}",
        style("Success").green().bold(),
        format,
        output_path.display()
    );

    Ok(())
}

/// Show where the encoder lives and what version it is
async fn show_encoder_info(profile: &ConversionProfile) -> anyhow::Result<i32> {
    println!("{}", style("webpbatch Encoder Information").bold());
    println!();
    println!("{}: {}", style("Version").bold(), env!("CARGO_PKG_VERSION"));
    println!("{}: {}", style("CPUs").bold(), num_cpus::get());
    println!();

    match locate_blocking(&profile.encoder).await {
        Ok(tool) => {
            println!("{}", style("Encoder:").bold());
            println!("  Program: {}", tool.program);
            println!("  Path: {}", tool.path.display());
            println!("  Version: {}", tool.version.as_deref().unwrap_or("unknown"));
            Ok(0)
        }
        Err(e) => {
            println!("  {} {}", style("✗").red(), e.user_message());
            Ok(1)
        }
    }
}
