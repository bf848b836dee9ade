use clap::Parser;
use log::LevelFilter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Input .material / .program scripts, compiled in the order given
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
    /// Output directory
    #[arg(short, long, default_value = "out")]
    pub output: PathBuf,
    /// Render-system capabilities JSON; built-in defaults when omitted
    #[arg(long)]
    pub capabilities: Option<PathBuf>,
    /// Also write the compiled materials back out as script text
    #[arg(long)]
    pub export: bool,
    /// off, error, warn, info, debug or trace
    #[arg(long, default_value = "info")]
    pub log_level: LevelFilter,
}
