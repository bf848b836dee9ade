pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod model;
pub mod processor;
pub mod writer;

use anyhow::{Context, bail};
use clap::Parser;

use processor::SourceScript;

pub fn run() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    logger::init(args.log_level).with_context(|| "Initialising logging")?;

    // 1. ── Load ───────────────────────────────────────────────────────
    let capabilities = match &args.capabilities {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Reading {}", path.display()))?;
            config::load_from_json(&json)
                .with_context(|| format!("Parsing capabilities {}", path.display()))?
        }
        None => config::Capabilities::default(),
    };

    let scripts = args
        .inputs
        .iter()
        .map(|path| {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Reading {}", path.display()))?;
            Ok(SourceScript {
                name: path.display().to_string(),
                text,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    // 2. ── Compile ────────────────────────────────────────────────────
    let compiled =
        processor::run(&scripts, capabilities).with_context(|| "Compiling material scripts")?;

    // 3. ── Write outputs ──────────────────────────────────────────────
    std::fs::create_dir_all(&args.output)
        .with_context(|| format!("Creating {}", args.output.display()))?;

    writer::json::emit(&compiled, &args.output).with_context(|| "Writing JSON artifacts")?;
    if args.export {
        writer::script::emit(&compiled.registry, &args.output)
            .with_context(|| "Writing exported scripts")?;
    }

    // 4. ── Duplicates are fatal, everything else was only reported ────
    let duplicates = compiled
        .reports
        .iter()
        .flat_map(|report| report.duplicate_materials())
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    if !duplicates.is_empty() {
        bail!("Duplicate materials:\n{}", duplicates.join("\n"));
    }

    Ok(())
}
