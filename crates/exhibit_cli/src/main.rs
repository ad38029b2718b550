//! Exhibit Assembler CLI
//!
//! Starts one assembly run in the background and polls it until it ends,
//! printing step transitions the way a UI would render them.
//!
//! Usage:
//!   exhibit-assembler cv.pdf award.pdf --toc --numbering roman
//!   exhibit-assembler --archive-file .temp/extracted/letter.pdf --order order.toml

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;

use exhibit_core::collaborators::Collaborators;
use exhibit_core::config::ConfigManager;
use exhibit_core::logging::{init_tracing_with_file, LogLevel};
use exhibit_core::models::{
    AssemblyOptions, AssemblyRequest, AssemblyResult, CaseData, ExhibitOrder, InputFile,
    NumberingStyle, QualityPreset, StepName, StepStatus,
};
use exhibit_core::state::ProcessingState;
use exhibit_core::{AssemblySession, SessionView};

#[derive(Parser)]
#[command(
    name = "exhibit-assembler",
    version,
    about = "Assemble supporting documents into one numbered exhibit package"
)]
struct Cli {
    /// Documents to upload, in input order
    inputs: Vec<PathBuf>,

    /// Already-extracted archive file (must lie under the extraction root)
    #[arg(long = "archive-file", value_name = "PATH")]
    archive_files: Vec<PathBuf>,

    /// TOML file with the reviewed order (`[[entries]] filename = .. title = ..`)
    #[arg(long, value_name = "TOML")]
    order: Option<PathBuf>,

    /// TOML file with case details for the cover letter
    #[arg(long, value_name = "TOML")]
    case: Option<PathBuf>,

    /// Exhibit label scheme: letters, numbers or roman
    #[arg(long)]
    numbering: Option<NumberingStyle>,

    /// Generate a table of contents
    #[arg(long, overrides_with = "no_toc")]
    toc: bool,
    #[arg(long)]
    no_toc: bool,

    /// Generate a cover letter
    #[arg(long, overrides_with = "no_cover_letter")]
    cover_letter: bool,
    #[arg(long)]
    no_cover_letter: bool,

    /// Generate filing instructions
    #[arg(long)]
    filing_instructions: bool,

    /// Keep numbered exhibits separate instead of merging them
    #[arg(long)]
    no_merge: bool,

    /// Append each document's extracted text to its cover page
    #[arg(long)]
    full_text: bool,

    #[arg(long, value_name = "TYPE")]
    visa_type: Option<String>,

    /// Disable compression
    #[arg(long)]
    no_compress: bool,

    /// Compression quality: high, balanced or maximum
    #[arg(long)]
    quality: Option<QualityPreset>,

    /// Key for an external compression service
    #[arg(long, env = "EXHIBIT_COMPRESSION_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Settings file, created with defaults when missing
    #[arg(long, default_value = ".config/settings.toml")]
    config: PathBuf,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 200)]
    poll_ms: u64,

    /// Print the final result as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Merge command line overrides into the configured defaults.
    fn options(&self, defaults: &AssemblyOptions) -> AssemblyOptions {
        let mut options = defaults.clone();
        if let Some(style) = self.numbering {
            options.numbering_style = style;
        }
        if self.toc {
            options.generate_toc = true;
        }
        if self.no_toc {
            options.generate_toc = false;
        }
        if self.cover_letter {
            options.generate_cover_letter = true;
        }
        if self.no_cover_letter {
            options.generate_cover_letter = false;
        }
        if self.filing_instructions {
            options.generate_filing_instructions = true;
        }
        if self.no_merge {
            options.merge_into_single_file = false;
        }
        if self.full_text {
            options.include_full_text_and_images = true;
        }
        if let Some(visa) = &self.visa_type {
            options.visa_type = visa.clone();
        }
        if self.no_compress {
            options.compression.enabled = false;
        }
        if let Some(quality) = self.quality {
            options.compression.quality = quality;
        }
        if self.api_key.is_some() {
            options.compression.api_key = self.api_key.clone();
        }
        options
    }

    fn request(&self, defaults: &AssemblyOptions) -> Result<AssemblyRequest> {
        let mut request = AssemblyRequest::new(self.options(defaults));
        for path in &self.inputs {
            request = request.with_upload(InputFile::from_path(path));
        }
        for path in &self.archive_files {
            request = request.with_archive_path(path);
        }
        if let Some(path) = &self.order {
            let order: ExhibitOrder = read_toml(path).context("Failed to read exhibit order")?;
            request = request.with_ordering(order);
        }
        if let Some(path) = &self.case {
            let case: CaseData = read_toml(path).context("Failed to read case details")?;
            request = request.with_case(case);
        }
        Ok(request)
    }
}

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Invalid TOML in {}", path.display()))
}

/// Prints a line whenever a step changes status or progress.
#[derive(Default)]
struct StepPrinter {
    seen: Vec<(StepName, StepStatus, u8)>,
}

impl StepPrinter {
    fn print_changes(&mut self, state: &ProcessingState) {
        for step in state.steps() {
            let current = (step.name(), step.status(), step.progress());
            if self.seen.contains(&current) {
                continue;
            }
            self.seen.retain(|(name, _, _)| *name != step.name());
            self.seen.push(current);

            match step.status() {
                StepStatus::Pending => {}
                StepStatus::Running => eprintln!(
                    "  {:<20} {:>3}%  (overall {}%)",
                    step.name().label(),
                    step.progress(),
                    state.overall_progress()
                ),
                StepStatus::Complete => eprintln!("  {:<20} done", step.name().label()),
                StepStatus::Error => eprintln!(
                    "  {:<20} FAILED: {}",
                    step.name().label(),
                    step.error_message().unwrap_or("unknown error")
                ),
            }
        }
    }
}

fn print_summary(result: &AssemblyResult) {
    println!();
    match &result.output_file {
        Some(path) => println!("Package: {}", path.display()),
        None => println!("No package produced (no exhibits)"),
    }
    println!(
        "Exhibits: {}  Pages: {}",
        result.exhibit_count(),
        result.total_pages
    );
    for exhibit in &result.exhibit_list {
        println!(
            "  Exhibit {:<4} {} ({} page(s))",
            exhibit.number, exhibit.title, exhibit.pages
        );
    }
    if result.original_size > 0 {
        println!(
            "Compression: {} -> {} bytes ({:.1}% smaller{})",
            result.original_size,
            result.compressed_size,
            result.reduction_percent(),
            result
                .compression_method
                .as_deref()
                .map(|m| format!(", {}", m))
                .unwrap_or_default()
        );
    }
    if let Some(path) = &result.cover_letter_path {
        println!("Cover letter: {}", path.display());
    }
    if let Some(path) = &result.filing_instructions_path {
        println!("Filing instructions: {}", path.display());
    }
    if !result.warnings.is_empty() {
        println!("Warnings:");
        for warning in &result.warnings {
            println!("  - {}", warning);
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = ConfigManager::new(&cli.config);
    config
        .load_or_create()
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    config
        .ensure_dirs_exist()
        .context("Failed to create configured directories")?;

    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        config.settings().logging.level
    };
    let _guard = init_tracing_with_file(level, config.logs_folder())
        .context("Failed to initialize logging")?;

    let request = cli.request(&config.settings().assembly)?;
    let mut session = AssemblySession::new(config.settings().clone(), Collaborators::standard());
    let run_id = session.generate(request).context("Failed to start assembly")?;
    eprintln!("Run {}", run_id);

    let interval = Duration::from_millis(cli.poll_ms.max(10));
    let mut printer = StepPrinter::default();
    let view = loop {
        let view = session.refresh();
        match &view {
            SessionView::Running(state) => printer.print_changes(state),
            SessionView::Failed { state, .. } => printer.print_changes(state),
            SessionView::Complete(_) => printer.print_changes(&session.processor().state()),
            SessionView::Idle => {}
        }
        if view.is_terminal() {
            break view;
        }
        thread::sleep(interval);
    };

    match view {
        SessionView::Complete(result) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_summary(&result);
            }
            Ok(ExitCode::SUCCESS)
        }
        SessionView::Failed { message, state } => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&state)?);
            }
            for warning in state.warnings() {
                eprintln!("Warning: {}", warning);
            }
            eprintln!("Error: {}", message);
            Ok(ExitCode::FAILURE)
        }
        SessionView::Idle | SessionView::Running(_) => Ok(ExitCode::FAILURE),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
