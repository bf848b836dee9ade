//! Keyword dispatch.
//!
//! Each attribute module publishes a table of [`Attribute`]s naming the
//! keywords a handler answers and the sections it is valid in. The
//! [`AttributeRegistry`] folds those tables into one keyword map per
//! section once, and is read-only afterwards.

use std::collections::HashMap;

use super::attributes;
use super::context::{ScriptContext, Section};
use crate::error::ScriptError;

/// What a handled line asks of the line that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// A plain attribute; the next line is read normally.
    Attribute,
    /// A block header; the next line must be `{`.
    BlockHeader,
}

/// Receives the parameters after the keyword.
pub type AttributeHandler = fn(&str, &mut ScriptContext<'_>) -> Result<LineKind, ScriptError>;

pub struct Attribute {
    pub sections: &'static [Section],
    pub keywords: &'static [&'static str],
    pub handler: AttributeHandler,
}

impl Attribute {
    pub const fn new(
        sections: &'static [Section],
        keywords: &'static [&'static str],
        handler: AttributeHandler,
    ) -> Self {
        Self {
            sections,
            keywords,
            handler,
        }
    }
}

/// Split a line on its first run of whitespace.
pub fn split_command(line: &str) -> (&str, &str) {
    match line.split_once(|c: char| c.is_whitespace()) {
        Some((keyword, rest)) => (keyword, rest.trim_start()),
        None => (line, ""),
    }
}

pub struct AttributeRegistry {
    sections: HashMap<Section, HashMap<&'static str, AttributeHandler>>,
}

impl AttributeRegistry {
    pub fn new() -> Self {
        let mut sections: HashMap<Section, HashMap<&'static str, AttributeHandler>> =
            HashMap::new();
        for attribute in attributes::ALL.iter().flat_map(|table| table.iter()) {
            for section in attribute.sections {
                let parsers = sections.entry(*section).or_default();
                for &keyword in attribute.keywords {
                    parsers.insert(keyword, attribute.handler);
                }
            }
        }
        Self { sections }
    }

    pub fn lookup(&self, section: Section, keyword: &str) -> Option<AttributeHandler> {
        self.sections.get(&section)?.get(keyword).copied()
    }

    #[cfg(test)]
    fn keyword_count(&self, section: Section) -> usize {
        self.sections.get(&section).map_or(0, HashMap::len)
    }

    /// Run the handler for `line` in `section`. Errors are reported on the
    /// context and the line counts as a plain attribute.
    pub fn invoke(&self, section: Section, line: &str, ctx: &mut ScriptContext<'_>) -> LineKind {
        let (keyword, params) = split_command(line);
        log::trace!("{}:{} [{}] {}", ctx.file_name, ctx.line_number, section, keyword);
        match self.lookup(section, keyword) {
            Some(handler) => handler(params, ctx).unwrap_or_else(|err| {
                ctx.report(err);
                LineKind::Attribute
            }),
            None => {
                ctx.report(ScriptError::UnknownCommand(keyword.to_owned()));
                LineKind::Attribute
            }
        }
    }
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command() {
        let test_cases = vec![
            ("material Rock", ("material", "Rock")),
            ("ambient\t1 1  1", ("ambient", "1 1  1")),
            ("default_params", ("default_params", "")),
            ("entry_point   main_fp", ("entry_point", "main_fp")),
        ];
        for (line, expected) in test_cases {
            assert_eq!(split_command(line), expected);
        }
    }

    #[test]
    fn test_registry_sections() {
        let registry = AttributeRegistry::new();
        let test_cases = vec![
            (Section::None, "material", true),
            (Section::None, "pass", false),
            (Section::Pass, "colour_write", true),
            (Section::Pass, "color_write", true),
            (Section::TextureUnit, "color_op_ex", true),
            (Section::ProgramRef, "param_named_auto", true),
            (Section::DefaultParameters, "param_indexed", true),
            (Section::Program, "default_params", true),
            (Section::Program, "param_indexed", false),
        ];
        for (section, keyword, found) in test_cases {
            assert_eq!(registry.lookup(section, keyword).is_some(), found, "{section} {keyword}");
        }
        assert_eq!(registry.keyword_count(Section::TextureSource), 0);
        assert_eq!(
            registry.keyword_count(Section::ProgramRef),
            registry.keyword_count(Section::DefaultParameters)
        );
    }
}
