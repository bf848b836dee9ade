//! Mutable state threaded through every attribute handler.
//!
//! A fresh [`ScriptContext`] is built for each script; nothing in it
//! survives from one script to the next.

use std::fmt;

use super::lexer::ScriptLine;
use crate::error::{Diagnostic, ParseReport, ScriptError};
use crate::model::{
    GpuProgramParameters, GpuProgramType, Material, Pass, ProgramFactory, ProgramSlot,
    ResourceRegistry, Technique, TextureUnitState,
};

/// Kind of block the scanner is currently inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    None,
    Material,
    Technique,
    Pass,
    TextureUnit,
    TextureSource,
    ProgramRef,
    Program,
    DefaultParameters,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Section::None => "top level",
            Section::Material => "material",
            Section::Technique => "technique",
            Section::Pass => "pass",
            Section::TextureUnit => "texture_unit",
            Section::TextureSource => "texture_source",
            Section::ProgramRef => "program reference",
            Section::Program => "program",
            Section::DefaultParameters => "default_params",
        })
    }
}

/// A program being declared; it only becomes a real program once its
/// block closes.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingProgramDefinition {
    pub name: String,
    pub kind: GpuProgramType,
    pub language: String,
    pub source_file: String,
    pub syntax: String,
    pub skeletal_animation: bool,
    pub morph_animation: bool,
    pub pose_animation_count: u16,
    pub custom_parameters: Vec<(String, String)>,
}

impl PendingProgramDefinition {
    pub fn new(name: &str, kind: GpuProgramType, language: &str) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            language: language.to_ascii_lowercase(),
            source_file: String::new(),
            syntax: String::new(),
            skeletal_animation: false,
            morph_animation: false,
            pose_animation_count: 0,
            custom_parameters: Vec::new(),
        }
    }
}

#[derive(Debug, Default)]
pub enum ParserState {
    #[default]
    Idle,
    BuildingProgram(PendingProgramDefinition),
}

/// Parameter block the numeric parameter commands write to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamTarget {
    /// The current pass's binding in this slot.
    Pass(ProgramSlot),
    /// Default parameters of a freshly created program.
    ProgramDefaults(String),
}

pub struct ScriptContext<'a> {
    pub registry: &'a mut ResourceRegistry,
    pub section: Section,
    pub material: Option<usize>,
    pub technique: Option<usize>,
    pub pass: Option<usize>,
    pub texture_unit: Option<usize>,
    /// Program the numeric parameter commands currently apply to.
    pub program: Option<String>,
    pub technique_level: i32,
    pub pass_level: i32,
    pub state_level: i32,
    pub program_parameters: Option<ParamTarget>,
    pub state: ParserState,
    pub default_parameter_lines: Vec<ScriptLine>,
    pub texture_aliases: Vec<(String, String)>,
    pub line_number: usize,
    pub file_name: String,
    /// Set by a block header whose block must be skipped unread.
    pub skip_next_block: bool,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ScriptContext<'a> {
    pub fn new(file_name: &str, registry: &'a mut ResourceRegistry) -> Self {
        Self {
            registry,
            section: Section::None,
            material: None,
            technique: None,
            pass: None,
            texture_unit: None,
            program: None,
            technique_level: -1,
            pass_level: -1,
            state_level: -1,
            program_parameters: None,
            state: ParserState::Idle,
            default_parameter_lines: Vec::new(),
            texture_aliases: Vec::new(),
            line_number: 0,
            file_name: file_name.to_owned(),
            skip_next_block: false,
            diagnostics: Vec::new(),
        }
    }

    /// Log `error` with the current file, line and material and keep it for the report.
    pub fn report(&mut self, error: ScriptError) {
        let material = self
            .material
            .and_then(|i| self.registry.materials.get_index(i))
            .map(|m| m.name.as_str());
        let diagnostic = Diagnostic::new(&error, &self.file_name, self.line_number, material);
        log::error!("{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    pub fn into_report(self) -> ParseReport {
        ParseReport {
            source: self.file_name,
            diagnostics: self.diagnostics,
        }
    }

    // ── object access ───────────────────────────────────────────────

    pub fn material_mut(&mut self) -> Result<&mut Material, ScriptError> {
        self.material
            .and_then(|i| self.registry.materials.get_index_mut(i))
            .ok_or(ScriptError::MissingContext("material"))
    }

    pub fn technique_mut(&mut self) -> Result<&mut Technique, ScriptError> {
        let index = self.technique.ok_or(ScriptError::MissingContext("technique"))?;
        self.material_mut()?
            .techniques
            .get_mut(index)
            .ok_or(ScriptError::MissingContext("technique"))
    }

    pub fn pass_mut(&mut self) -> Result<&mut Pass, ScriptError> {
        let index = self.pass.ok_or(ScriptError::MissingContext("pass"))?;
        self.technique_mut()?
            .passes
            .get_mut(index)
            .ok_or(ScriptError::MissingContext("pass"))
    }

    pub fn texture_unit_mut(&mut self) -> Result<&mut TextureUnitState, ScriptError> {
        let index = self
            .texture_unit
            .ok_or(ScriptError::MissingContext("texture_unit"))?;
        self.pass_mut()?
            .texture_units
            .get_mut(index)
            .ok_or(ScriptError::MissingContext("texture_unit"))
    }

    pub fn program_definition_mut(&mut self) -> Result<&mut PendingProgramDefinition, ScriptError> {
        match &mut self.state {
            ParserState::BuildingProgram(def) => Ok(def),
            ParserState::Idle => Err(ScriptError::MissingContext("program")),
        }
    }

    /// True when a program is bound and the render system can run it.
    /// Parameter commands are silently ignored otherwise.
    pub fn has_supported_program(&self) -> bool {
        self.program_parameters.is_some()
            && self
                .program
                .as_deref()
                .is_some_and(|name| self.registry.programs.is_supported(name))
    }

    pub fn program_parameters_mut(&mut self) -> Option<&mut GpuProgramParameters> {
        match self.program_parameters.clone()? {
            ParamTarget::Pass(slot) => self
                .pass_mut()
                .ok()?
                .programs
                .slot_mut(slot)
                .as_mut()
                .map(|binding| &mut binding.parameters),
            ParamTarget::ProgramDefaults(name) => self
                .registry
                .programs
                .get_mut(&name)
                .map(|program| &mut program.default_parameters),
        }
    }

    // ── block transitions ───────────────────────────────────────────

    /// Handle a `}` for the active section.
    pub fn close_block(&mut self) {
        log::trace!("closing {} block at line {}", self.section, self.line_number);
        match self.section {
            Section::None => self.report(ScriptError::UnexpectedBrace),
            Section::Material => {
                let aliases = std::mem::take(&mut self.texture_aliases);
                if !aliases.is_empty() {
                    if let Ok(material) = self.material_mut() {
                        let applied = material.apply_texture_aliases(&aliases);
                        log::debug!("{}: {} texture aliases applied", material.name, applied);
                    }
                }
                self.section = Section::None;
                self.material = None;
                self.technique_level = -1;
                self.pass_level = -1;
                self.state_level = -1;
            }
            Section::Technique => {
                self.section = Section::Material;
                self.technique = None;
                self.pass_level = -1;
            }
            Section::Pass => {
                self.section = Section::Technique;
                self.pass = None;
                self.state_level = -1;
            }
            Section::TextureUnit => {
                self.section = Section::Pass;
                self.texture_unit = None;
            }
            Section::TextureSource => self.section = Section::TextureUnit,
            Section::ProgramRef => {
                self.section = Section::Pass;
                self.program = None;
                self.program_parameters = None;
            }
            // the program itself is finished by the caller, which owns the
            // default parameter parsers
            Section::Program => {
                self.section = Section::None;
                self.state = ParserState::Idle;
                self.default_parameter_lines.clear();
            }
            Section::DefaultParameters => self.section = Section::Program,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_includes_material_name() {
        let mut registry = ResourceRegistry::default();
        let index = registry.materials.create("Rock", "x.material").unwrap();
        let mut ctx = ScriptContext::new("x.material", &mut registry);
        ctx.line_number = 4;
        ctx.report(ScriptError::UnexpectedBrace);
        ctx.material = Some(index);
        ctx.line_number = 5;
        ctx.report(ScriptError::UnknownCommand("foo".into()));

        let report = ctx.into_report();
        assert_eq!(report.diagnostics[0].material, None);
        assert_eq!(report.diagnostics[1].material.as_deref(), Some("Rock"));
        assert_eq!(report.diagnostics[1].line, 5);
    }

    #[test]
    fn test_closing_pops_levels() {
        let mut registry = ResourceRegistry::default();
        let mut ctx = ScriptContext::new("x", &mut registry);
        ctx.section = Section::Pass;
        ctx.pass = Some(0);
        ctx.state_level = 2;
        ctx.close_block();
        assert_eq!(ctx.section, Section::Technique);
        assert_eq!(ctx.pass, None);
        assert_eq!(ctx.state_level, -1);

        ctx.section = Section::DefaultParameters;
        ctx.close_block();
        assert_eq!(ctx.section, Section::Program);

        ctx.section = Section::None;
        ctx.close_block();
        assert_eq!(ctx.into_report().diagnostics.len(), 1);
    }

    #[test]
    fn test_missing_context_is_an_error() {
        let mut registry = ResourceRegistry::default();
        let mut ctx = ScriptContext::new("x", &mut registry);
        assert!(matches!(ctx.pass_mut(), Err(ScriptError::MissingContext("pass"))));
        assert!(ctx.program_definition_mut().is_err());
        assert!(ctx.program_parameters_mut().is_none());
        assert!(!ctx.has_supported_program());
    }
}
