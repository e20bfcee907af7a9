//! Label Store command line entry point.
//!
//! Resolves the layered configuration, then optionally loads a label file
//! and writes it back out (rewriting old files in the current layout).

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use serde_yaml::Value;

use label_store::config::{ConfigResolver, Configuration, LogLevel};
use label_store::format::LabelFile;

#[derive(Debug, Parser)]
#[command(name = "label-store", version, about = "Load, check and save image label files")]
struct Cli {
    /// Label file to load
    filename: Option<PathBuf>,

    /// Write the loaded label file here
    #[arg(long, short = 'O', requires = "filename")]
    output: Option<PathBuf>,

    /// Config file (default: ~/.labelstorerc)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory-level config file, created from the resolved config if missing
    #[arg(long)]
    directory_config: Option<PathBuf>,

    /// Log verbosity
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Do not embed image data when saving
    #[arg(long)]
    nodata: bool,

    /// Save automatically
    #[arg(long)]
    autosave: bool,

    /// Keep labels in the order given
    #[arg(long)]
    nosortlabels: bool,

    /// Comma separated labels, or a file with one label per line
    #[arg(long)]
    labels: Option<String>,

    /// Comma separated image flags, or a file with one flag per line
    #[arg(long)]
    flags: Option<String>,

    /// Label validation mode (exact or instance)
    #[arg(long)]
    validate_label: Option<String>,

    /// Vertex snapping distance in pixels
    #[arg(long)]
    epsilon: Option<f64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level.to_level_filter())
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Application error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config_file = cli
        .config
        .clone()
        .or_else(ConfigResolver::default_user_config_path);
    let overrides = cli_overrides(cli)?;
    let config = ConfigResolver::new().resolve(Some(&overrides), config_file.as_deref())?;
    log::debug!("Resolved configuration with {} top-level keys", config.len());

    if let Some(directory_config_file) = &cli.directory_config {
        let directory_config =
            ConfigResolver::resolve_directory(&config, Some(directory_config_file))?;
        log::info!(
            "Directory configuration: {}",
            serde_yaml::to_string(&directory_config)?.trim_end()
        );
    }

    let Some(filename) = &cli.filename else {
        return Ok(());
    };

    if !LabelFile::is_label_file(filename) {
        log::warn!(
            "{:?} does not have the {} suffix",
            filename,
            LabelFile::SUFFIX
        );
    }
    let mut label_file = LabelFile::open(filename)?;
    log::info!(
        "{:?}: image {:?} ({}x{}), {} annotations, {} flags",
        filename,
        label_file.image_path.as_deref().unwrap_or(""),
        display_dimension(label_file.image_width),
        display_dimension(label_file.image_height),
        label_file.annotations.len(),
        label_file.flags.len()
    );

    if let Some(output) = &cli.output {
        let store_data = config
            .get("store_data")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        label_file.save_document(output, store_data)?;
    }

    Ok(())
}

fn display_dimension(dimension: Option<u32>) -> String {
    dimension.map_or_else(|| "?".to_string(), |d| d.to_string())
}

/// Build the command line configuration layer from the flags that were set.
fn cli_overrides(cli: &Cli) -> std::io::Result<Configuration> {
    let mut overrides = Configuration::new();
    if cli.nodata {
        overrides.insert("store_data".into(), false.into());
    }
    if cli.autosave {
        overrides.insert("auto_save".into(), true.into());
    }
    if cli.nosortlabels {
        overrides.insert("sort_labels".into(), false.into());
    }
    if let Some(labels) = &cli.labels {
        overrides.insert("labels".into(), list_value(parse_list(labels)?));
    }
    if let Some(flags) = &cli.flags {
        overrides.insert("flags".into(), list_value(parse_list(flags)?));
    }
    if let Some(validate_label) = &cli.validate_label {
        overrides.insert("validate_label".into(), validate_label.as_str().into());
    }
    if let Some(epsilon) = cli.epsilon {
        let mut canvas = Configuration::new();
        canvas.insert("epsilon".into(), epsilon.into());
        overrides.insert("canvas".into(), Value::Mapping(canvas));
    }
    Ok(overrides)
}

/// Parse a list argument: an existing file holds one entry per line,
/// anything else is split on commas. Blank entries are dropped.
fn parse_list(arg: &str) -> std::io::Result<Vec<String>> {
    let path = Path::new(arg);
    let entries: Vec<String> = if path.is_file() {
        std::fs::read_to_string(path)?
            .lines()
            .map(|line| line.trim().to_string())
            .collect()
    } else {
        arg.split(',').map(|item| item.trim().to_string()).collect()
    };
    Ok(entries.into_iter().filter(|entry| !entry.is_empty()).collect())
}

fn list_value(entries: Vec<String>) -> Value {
    Value::Sequence(entries.into_iter().map(Value::from).collect())
}
