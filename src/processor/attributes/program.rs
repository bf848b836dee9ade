//! Commands inside a `vertex_program` / `fragment_program` definition.
//!
//! These only fill in the pending definition; the program is created when
//! the definition block closes.

use super::values::{expect_count, parse_number, parse_true_false, split_params};
use crate::error::ScriptError;
use crate::processor::context::{ScriptContext, Section};
use crate::processor::dispatch::{Attribute, LineKind};

pub const ATTRIBUTES: &[Attribute] = &[
    Attribute::new(&[Section::Program], &["source"], parse_source),
    Attribute::new(&[Section::Program], &["syntax"], parse_syntax),
    Attribute::new(
        &[Section::Program],
        &["includes_skeletal_animation"],
        parse_includes_skeletal_animation,
    ),
    Attribute::new(
        &[Section::Program],
        &["includes_morph_animation"],
        parse_includes_morph_animation,
    ),
    Attribute::new(
        &[Section::Program],
        &["includes_pose_animation"],
        parse_includes_pose_animation,
    ),
    Attribute::new(&[Section::Program], &["default_params"], parse_default_params),
];

fn parse_source(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("source", &tokens, &[1])?;
    ctx.program_definition_mut()?.source_file = tokens[0].to_owned();
    Ok(LineKind::Attribute)
}

fn parse_syntax(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("syntax", &tokens, &[1])?;
    ctx.program_definition_mut()?.syntax = tokens[0].to_ascii_lowercase();
    Ok(LineKind::Attribute)
}

fn parse_includes_skeletal_animation(
    params: &str,
    ctx: &mut ScriptContext<'_>,
) -> Result<LineKind, ScriptError> {
    let enabled = parse_true_false("includes_skeletal_animation", params)?;
    ctx.program_definition_mut()?.skeletal_animation = enabled;
    Ok(LineKind::Attribute)
}

fn parse_includes_morph_animation(
    params: &str,
    ctx: &mut ScriptContext<'_>,
) -> Result<LineKind, ScriptError> {
    let enabled = parse_true_false("includes_morph_animation", params)?;
    ctx.program_definition_mut()?.morph_animation = enabled;
    Ok(LineKind::Attribute)
}

/// Number of poses the program blends.
fn parse_includes_pose_animation(
    params: &str,
    ctx: &mut ScriptContext<'_>,
) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("includes_pose_animation", &tokens, &[1])?;
    let count = parse_number("includes_pose_animation", tokens[0])?;
    ctx.program_definition_mut()?.pose_animation_count = count;
    Ok(LineKind::Attribute)
}

/// Lines of the block are kept aside and replayed once the program exists.
fn parse_default_params(_params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    ctx.section = Section::DefaultParameters;
    Ok(LineKind::BlockHeader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GpuProgramType, ResourceRegistry};
    use crate::processor::context::{ParserState, PendingProgramDefinition};

    #[test]
    fn test_definition_fields() {
        let mut registry = ResourceRegistry::default();
        let mut ctx = ScriptContext::new("t", &mut registry);
        ctx.section = Section::Program;
        ctx.state = ParserState::BuildingProgram(PendingProgramDefinition::new(
            "Skin",
            GpuProgramType::Vertex,
            "CG",
        ));

        parse_source("skin.cg", &mut ctx).unwrap();
        parse_syntax("VS_2_0", &mut ctx).unwrap();
        parse_includes_skeletal_animation("true", &mut ctx).unwrap();
        parse_includes_pose_animation("3", &mut ctx).unwrap();
        assert!(parse_includes_morph_animation("yes", &mut ctx).is_err());
        assert!(parse_source("a.cg b.cg", &mut ctx).is_err());

        let def = ctx.program_definition_mut().unwrap().clone();
        assert_eq!(def.language, "cg");
        assert_eq!(def.source_file, "skin.cg");
        assert_eq!(def.syntax, "vs_2_0");
        assert!(def.skeletal_animation);
        assert!(!def.morph_animation);
        assert_eq!(def.pose_animation_count, 3);

        assert_eq!(parse_default_params("", &mut ctx).unwrap(), LineKind::BlockHeader);
        assert_eq!(ctx.section, Section::DefaultParameters);
    }

    #[test]
    fn test_outside_definition() {
        let mut registry = ResourceRegistry::default();
        let mut ctx = ScriptContext::new("t", &mut registry);
        assert!(matches!(
            parse_source("a.cg", &mut ctx),
            Err(ScriptError::MissingContext("program"))
        ));
    }
}
