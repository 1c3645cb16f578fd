use anyhow::{bail, Context, Result};
use autopinyin_core::config::ExhaustionPolicy;
use autopinyin_core::{classify, source, Config};
use clap::{Parser, ValueEnum};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OnExhausted {
    Fail,
    Skip,
}

impl From<OnExhausted> for ExhaustionPolicy {
    fn from(v: OnExhausted) -> Self {
        match v {
            OnExhausted::Fail => ExhaustionPolicy::Fail,
            OnExhausted::Skip => ExhaustionPolicy::Skip,
        }
    }
}

/// Types Chinese text into the focused window through the Microsoft Pinyin IME.
#[derive(Parser, Debug)]
#[command(name = "autopinyin", version, about)]
struct Cli {
    /// Text to type; read from stdin when neither TEXT nor --file is given
    text: Option<String>,

    /// Read the text from a file (UTF-8, UTF-16 with BOM, or GBK)
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds to wait before typing, to focus the target window
    #[arg(short, long)]
    delay: Option<f64>,

    /// Han characters resolved per candidate lookup (1-10)
    #[arg(long)]
    split_length: Option<usize>,

    #[arg(long, value_enum)]
    on_exhausted: Option<OnExhausted>,

    /// Print the classified runs and exit
    #[arg(long)]
    classify: bool,

    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(secs) = cli.delay {
        if !secs.is_finite() || secs < 0.0 {
            bail!("--delay must be a non-negative number of seconds");
        }
        config.start_delay_ms = (secs * 1000.0).round() as u64;
    }
    if let Some(n) = cli.split_length {
        config.split_length = n;
    }
    if let Some(policy) = cli.on_exhausted {
        config.on_exhausted = policy.into();
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn read_input(cli: &Cli) -> Result<String> {
    if let Some(text) = &cli.text {
        return Ok(text.clone());
    }
    if let Some(path) = &cli.file {
        return source::load_text(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    Ok(buf)
}

#[cfg(windows)]
fn run_input(config: Config, text: &str) -> Result<()> {
    let mut ap = autopinyin_core::AutoPinyin::for_desktop(config)
        .context("failed to set up desktop automation")?;
    let report = ap.auto_input(text).context("typing failed")?;
    tracing::info!(
        "Typed {} characters in {} runs",
        report.committed_chars,
        report.runs
    );
    for skipped in &report.skipped {
        tracing::warn!("Skipped {:?}", skipped);
    }
    Ok(())
}

#[cfg(not(windows))]
fn run_input(_config: Config, _text: &str) -> Result<()> {
    bail!("typing through the IME is only supported on Windows; use --classify to inspect text")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(&cli)?;
    let text = read_input(&cli)?;

    if cli.classify {
        for run in classify(&text) {
            println!("{:?}\t{:?}", run.kind, run.text);
        }
        return Ok(());
    }

    if text.is_empty() {
        tracing::warn!("Nothing to type");
        return Ok(());
    }
    run_input(config, &text)
}
