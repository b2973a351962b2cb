use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "cxgraph")]
#[command(about = "Builds AST/CFG/SDFG program-graph views of C/C++ source")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a single translation unit and emit its program-graph view
    Analyze {
        /// Source language
        #[arg(long, value_enum)]
        lang: CliLang,

        /// Path to the source file to analyze
        #[arg(long)]
        code_file: String,

        /// Which graph view(s) to build
        #[arg(long, value_enum, default_value = "combined")]
        graphs: CliGraphKind,

        /// Where to write the result (stdout if omitted)
        #[arg(long)]
        output: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value = "json")]
        format: CliFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CliLang {
    C,
    Cpp,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CliGraphKind {
    Ast,
    Cfg,
    Dfg,
    Combined,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum CliFormat {
    Json,
    Dot,
    All,
}
