mod cli;

use cxgraph::analysis::{analyze_source, GraphKind};
use cxgraph::classify::Lang;
use cxgraph::config::Config;
use cxgraph::errors::CxResult;
use cli::{Cli, CliFormat, CliGraphKind, CliLang};
use clap::Parser;
use console::style;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::fmt::time;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

fn init_tracing() {
    let fmt_layer = fmt::layer()
        .pretty()
        .with_thread_ids(true)
        .with_timer(time::UtcTime::rfc_3339());

    Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt_layer)
        .init();
}

fn main() -> CxResult<()> {
    let now = Instant::now();
    init_tracing();

    tracing::debug!("cxgraph starting up");
    let cli = Cli::parse();

    let config_dir = default_config_dir();
    fs::create_dir_all(&config_dir)?;
    let _config = Config::load(&config_dir)?;

    let cli::Commands::Analyze { lang, code_file, graphs, output, format } = cli.command else {
        unreachable!("Analyze is cxgraph's only subcommand");
    };

    let lang = match lang {
        CliLang::C => Lang::C,
        CliLang::Cpp => Lang::Cpp,
    };
    let kind = match graphs {
        CliGraphKind::Ast => GraphKind::Ast,
        CliGraphKind::Cfg => GraphKind::Cfg,
        CliGraphKind::Dfg => GraphKind::Dfg,
        CliGraphKind::Combined => GraphKind::Combined,
    };

    let source = fs::read(&code_file)?;
    let (graph, analysis_output) = analyze_source(lang, &source, kind)?;

    let rendered = match format {
        CliFormat::Json => serde_json::to_string_pretty(&analysis_output)?,
        CliFormat::Dot => graph.to_dot(&graph_name(&code_file)),
        CliFormat::All => format!(
            "{}\n\n{}",
            serde_json::to_string_pretty(&analysis_output)?,
            graph.to_dot(&graph_name(&code_file))
        ),
    };

    match output {
        Some(path) => fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }

    eprintln!(
        "{} in {:.3}s.",
        style("Finished").green().bold(),
        now.elapsed().as_secs_f32()
    );
    Ok(())
}

fn graph_name(code_file: &str) -> String {
    PathBuf::from(code_file)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "program".to_string())
}

/// cxgraph has no project-local database or index, so its config
/// directory need not follow platform conventions as strictly as the
/// teacher's `ProjectDirs`-backed one did; `$XDG_CONFIG_HOME`/`~/.config`
/// with a hardcoded fallback covers every supported OS without pulling
/// in an extra dependency for a single directory lookup.
fn default_config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("cxgraph");
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".config").join("cxgraph");
    }
    PathBuf::from(".cxgraph")
}
