//! The compiler proper: feeds scanned lines through the section state
//! machine into the attribute handlers.

use std::io::{BufReader, Read};

use super::context::{ScriptContext, Section};
use super::dispatch::{AttributeRegistry, LineKind, split_command};
use super::finalize;
use super::lexer::{LineScanner, ScriptLine};
use crate::error::{ParseReport, ScriptError};
use crate::model::{ExternalTextureSource, ResourceRegistry};

/// Compiles material scripts into a [`ResourceRegistry`].
///
/// The keyword tables are built once; after that the compiler is never
/// mutated and can be shared across any number of scripts.
pub struct MaterialCompiler {
    attributes: AttributeRegistry,
}

impl MaterialCompiler {
    pub fn new() -> Self {
        Self {
            attributes: AttributeRegistry::new(),
        }
    }

    /// Compiles one script into `registry`.
    ///
    /// Problems in the script never fail the call; they come back in the
    /// report. Only a read error on `input` does.
    pub fn parse_script<R: Read>(
        &self,
        input: R,
        source_name: &str,
        registry: &mut ResourceRegistry,
    ) -> Result<ParseReport, ScriptError> {
        let mut ctx = ScriptContext::new(source_name, registry);
        let mut expect_brace = false;
        let mut skip_depth = 0usize;

        for line in LineScanner::new(BufReader::new(input)) {
            let line = line?;
            ctx.line_number = line.number;

            if skip_depth > 0 {
                match line.text.as_str() {
                    "{" => skip_depth += 1,
                    "}" => skip_depth -= 1,
                    _ => {}
                }
                continue;
            }

            if expect_brace {
                expect_brace = false;
                let skip = std::mem::take(&mut ctx.skip_next_block);
                if line.text == "{" {
                    if skip {
                        skip_depth = 1;
                    }
                } else {
                    ctx.report(ScriptError::BraceExpected(line.text));
                }
                continue;
            }

            expect_brace = self.parse_line(&line, &mut ctx) == LineKind::BlockHeader;
        }

        if expect_brace || skip_depth > 0 || ctx.section != Section::None {
            ctx.report(ScriptError::UnexpectedEof);
        }
        let report = ctx.into_report();
        log::debug!("{}: {} diagnostics", report.source, report.diagnostics.len());
        Ok(report)
    }

    fn parse_line(&self, line: &ScriptLine, ctx: &mut ScriptContext<'_>) -> LineKind {
        if line.text == "}" {
            if ctx.section == Section::Program {
                finalize::finish_program_definition(&self.attributes, ctx);
            }
            ctx.close_block();
            return LineKind::Attribute;
        }

        match ctx.section {
            Section::DefaultParameters => {
                ctx.default_parameter_lines.push(line.clone());
                LineKind::Attribute
            }
            Section::TextureSource => {
                add_texture_source_parameter(&line.text, ctx);
                LineKind::Attribute
            }
            Section::Program => {
                let (keyword, _) = split_command(&line.text);
                if self.attributes.lookup(Section::Program, keyword).is_none() {
                    add_custom_parameter(&line.text, ctx);
                    return LineKind::Attribute;
                }
                self.attributes.invoke(Section::Program, &line.text, ctx)
            }
            section => self.attributes.invoke(section, &line.text, ctx),
        }
    }
}

impl Default for MaterialCompiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Any unknown line in a program definition is `<name> <value...>` for the
/// program's language to interpret.
fn add_custom_parameter(text: &str, ctx: &mut ScriptContext<'_>) {
    let (name, value) = split_command(text);
    if value.is_empty() {
        ctx.report(ScriptError::CustomParameter);
        return;
    }
    match ctx.program_definition_mut() {
        Ok(def) => def.custom_parameters.push((name.to_owned(), value.to_owned())),
        Err(err) => ctx.report(err),
    }
}

fn add_texture_source_parameter(text: &str, ctx: &mut ScriptContext<'_>) {
    let (key, value) = split_command(text);
    let unit = match ctx.texture_unit_mut() {
        Ok(unit) => unit,
        Err(err) => {
            ctx.report(err);
            return;
        }
    };
    unit.external_source
        .get_or_insert_with(ExternalTextureSource::default)
        .parameters
        .push((key.to_owned(), value.to_owned()));
}
