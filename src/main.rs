mod changes;
mod commands;
mod core;
mod eval;
mod graph;
mod summary;
mod utils;
mod vfs;

use clap::Parser;
use commands::OutputFormat;
use core::config::ConfigOverrides;
use core::error::{AffectedError, ExitCode, print_error};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Find the projects affected by changes between two revisions
#[derive(Parser)]
#[command(name = "graph-affected")]
#[command(version, about, long_about = None)]
#[command(styles = get_styles())]
struct Cli {
  /// Repository to analyze (any directory inside it)
  #[arg(short = 'p', long, default_value = ".")]
  repository_path: PathBuf,

  /// Base revision: commit SHA, branch, tag or HEAD
  #[arg(long, default_value = "HEAD")]
  from: String,

  /// Target revision (default: the uncommitted working tree)
  #[arg(long)]
  to: Option<String>,

  /// Regex over project path or name; matching projects are reported as excluded
  #[arg(long)]
  exclude: Option<String>,

  /// File name of centrally managed package-version manifests
  #[arg(long)]
  manifest_file_name: Option<String>,

  /// Output format: text, json, names
  #[arg(long, default_value = "text")]
  format: String,

  /// Log pipeline progress to stderr (RUST_LOG takes precedence)
  #[arg(short, long)]
  verbose: bool,
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn init_logging(verbose: bool) {
  let default = if verbose {
    "graph_affected=debug"
  } else {
    "graph_affected=warn"
  };

  tracing_subscriber::registry()
    .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let format = match cli.format.parse::<OutputFormat>() {
    Ok(format) => format,
    Err(e) => handle_error(e),
  };

  // Build the comparison context once (repository, config, both revisions)
  let overrides = ConfigOverrides {
    exclude: cli.exclude,
    manifest_file_name: cli.manifest_file_name,
  };
  let from = cli.from.as_str();
  let ctx = match core::context::AffectedContext::build(&cli.repository_path, Some(from), cli.to.as_deref(), overrides) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  match commands::run_affected(&ctx, format) {
    Ok(summary) if summary.is_empty() => std::process::exit(ExitCode::NothingChanged.as_i32()),
    Ok(_) => {}
    Err(err) => handle_error(err),
  }
}

fn handle_error(err: AffectedError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
