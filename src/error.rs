//! Diagnostics produced while compiling material scripts.
//!
//! Every problem found in a script is a [`ScriptError`]. The compiler never
//! unwinds on one: it wraps the error into a [`Diagnostic`] carrying the
//! file, line and material it was found in, logs it and carries on with the
//! next line. The collected diagnostics come back to the caller as a
//! [`ParseReport`].

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::model::GpuProgramType;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Unrecognised command: {0}")]
    UnknownCommand(String),

    #[error("Bad {attribute} attribute, wrong number of parameters (expected {expected})")]
    ParameterCount { attribute: String, expected: String },

    #[error("Bad {attribute} attribute, '{value}' is not a valid number")]
    InvalidNumber { attribute: String, value: String },

    #[error("Bad {attribute} attribute, '{value}' is not valid; valid parameters are {legal}")]
    InvalidValue {
        attribute: String,
        value: String,
        legal: String,
    },

    #[error("Invalid {attribute} attribute - unrecognised parameter type {type_tag}")]
    UnknownParameterType { attribute: String, type_tag: String },

    #[error("Invalid {attribute} attribute - unrecognised auto constant type {value}")]
    UnknownAutoConstant { attribute: String, value: String },

    #[error("Invalid {attribute} attribute - {reason}")]
    InvalidParameter { attribute: String, reason: String },

    #[error("Missing name in {0} definition")]
    MissingName(String),

    #[error("Invalid program definition for {program}, you must specify a {field}")]
    MissingProgramField {
        program: String,
        field: &'static str,
    },

    #[error("Invalid {attribute} entry - {kind} program {program} has not been defined")]
    UndefinedProgram {
        attribute: String,
        kind: GpuProgramType,
        program: String,
    },

    #[error("Invalid {attribute} entry - {program} is a {actual} program, not a {expected} program")]
    ProgramKindMismatch {
        attribute: String,
        program: String,
        actual: GpuProgramType,
        expected: GpuProgramType,
    },

    #[error("Invalid custom program parameter entry; there must be a parameter name and at least one value")]
    CustomParameter,

    #[error("Error in program {program} parameter {parameter} is not valid")]
    RejectedProgramParameter { program: String, parameter: String },

    #[error("Could not create GPU program '{program}', error reported was: {reason}")]
    ProgramCreation { program: String, reason: String },

    #[error("Material {0} already exists")]
    DuplicateMaterial(String),

    #[error("{0} command used outside of an open {0} block")]
    MissingContext(&'static str),

    #[error("Unexpected terminating brace")]
    UnexpectedBrace,

    #[error("Expecting '{{' but got {0} instead")]
    BraceExpected(String),

    #[error("Unexpected end of file")]
    UnexpectedEof,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse grouping of [`ScriptError`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorClass {
    /// Keyword not known in the active section; the line is skipped.
    UnknownCommand,
    /// Wrong parameter count or an unparsable literal; the attribute keeps its value.
    Malformed,
    /// A required field of a definition was never given.
    MissingField,
    /// Name collision; the whole block is skipped.
    Duplicate,
    /// Brace structure is broken.
    Structural,
    /// A referenced or created resource could not be used.
    Resource,
}

impl ScriptError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ScriptError::UnknownCommand(_) => ErrorClass::UnknownCommand,
            ScriptError::ParameterCount { .. }
            | ScriptError::InvalidNumber { .. }
            | ScriptError::InvalidValue { .. }
            | ScriptError::UnknownParameterType { .. }
            | ScriptError::UnknownAutoConstant { .. }
            | ScriptError::InvalidParameter { .. }
            | ScriptError::CustomParameter => ErrorClass::Malformed,
            ScriptError::MissingName(_) | ScriptError::MissingProgramField { .. } => {
                ErrorClass::MissingField
            }
            ScriptError::DuplicateMaterial(_) => ErrorClass::Duplicate,
            ScriptError::MissingContext(_)
            | ScriptError::UnexpectedBrace
            | ScriptError::BraceExpected(_)
            | ScriptError::UnexpectedEof => ErrorClass::Structural,
            ScriptError::UndefinedProgram { .. }
            | ScriptError::ProgramKindMismatch { .. }
            | ScriptError::RejectedProgramParameter { .. }
            | ScriptError::ProgramCreation { .. }
            | ScriptError::Io(_) => ErrorClass::Resource,
        }
    }
}

/// One reported error together with where it happened.
#[derive(Debug, Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub material: Option<String>,
    pub class: ErrorClass,
    pub message: String,
}

impl Diagnostic {
    pub fn new(error: &ScriptError, file: &str, line: usize, material: Option<&str>) -> Self {
        Self {
            file: file.to_owned(),
            line,
            material: material.map(str::to_owned),
            class: error.class(),
            message: error.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.material {
            Some(material) => write!(
                f,
                "Error in material {} at line {} of {}: {}",
                material, self.line, self.file, self.message
            ),
            None => write!(
                f,
                "Error at line {} of {}: {}",
                self.line, self.file, self.message
            ),
        }
    }
}

/// Everything that went wrong while compiling one script.
#[derive(Debug, Default, Serialize)]
pub struct ParseReport {
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseReport {
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Diagnostics whose material was rejected because its name was taken.
    pub fn duplicate_materials(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.class == ErrorClass::Duplicate)
    }

    pub fn count(&self, class: ErrorClass) -> usize {
        self.diagnostics.iter().filter(|d| d.class == class).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_format() {
        let test_cases = vec![
            (
                Diagnostic::new(&ScriptError::UnexpectedBrace, "a.material", 3, None),
                "Error at line 3 of a.material: Unexpected terminating brace",
            ),
            (
                Diagnostic::new(
                    &ScriptError::UnknownCommand("foo".into()),
                    "b.material",
                    12,
                    Some("Rock"),
                ),
                "Error in material Rock at line 12 of b.material: Unrecognised command: foo",
            ),
        ];

        for (diagnostic, expected) in test_cases {
            assert_eq!(diagnostic.to_string(), expected);
        }
    }

    #[test]
    fn test_duplicate_filter() {
        let report = ParseReport {
            source: "x".into(),
            diagnostics: vec![
                Diagnostic::new(&ScriptError::DuplicateMaterial("A".into()), "x", 1, None),
                Diagnostic::new(&ScriptError::UnexpectedEof, "x", 9, None),
            ],
        };
        assert_eq!(report.duplicate_materials().count(), 1);
        assert_eq!(report.count(ErrorClass::Structural), 1);
        assert!(!report.is_clean());
    }
}
