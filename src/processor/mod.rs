//! The material script compiler.
//!
//! Scripts are compiled one after the other into a single registry, so a
//! material may use programs defined by any earlier script.
mod attributes;
pub mod context;
pub mod dispatch;
pub mod finalize;
pub mod lexer;
pub mod script_parser;

pub use script_parser::MaterialCompiler;

use anyhow::{Context, Result};

use crate::config::Capabilities;
use crate::error::ParseReport;
use crate::model::ResourceRegistry;

/// A script read into memory, with the name diagnostics refer to it by.
#[derive(Debug, Clone)]
pub struct SourceScript {
    pub name: String,
    pub text: String,
}

/// Output of [`run`]: the compiled objects and one report per script.
#[derive(Debug)]
pub struct Compiled {
    pub registry: ResourceRegistry,
    pub reports: Vec<ParseReport>,
}

impl Compiled {
    pub fn diagnostic_count(&self) -> usize {
        self.reports.iter().map(|r| r.diagnostics.len()).sum()
    }
}

/// Compiles every script, in order, into one registry.
pub fn run(scripts: &[SourceScript], capabilities: Capabilities) -> Result<Compiled> {
    let compiler = MaterialCompiler::new();
    let mut registry = ResourceRegistry::new(capabilities);
    let mut reports = Vec::with_capacity(scripts.len());

    for script in scripts {
        let report = compiler
            .parse_script(script.text.as_bytes(), &script.name, &mut registry)
            .with_context(|| format!("Compiling {}", script.name))?;
        if !report.is_clean() {
            log::info!("{}: {} problems", script.name, report.diagnostics.len());
        }
        reports.push(report);
    }

    log::info!(
        "compiled {} materials and {} GPU programs from {} scripts",
        registry.materials.len(),
        registry.programs.len(),
        scripts.len()
    );
    Ok(Compiled { registry, reports })
}
