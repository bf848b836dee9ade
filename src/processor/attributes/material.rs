//! Top-level, material and technique commands.

use super::values::{expect_count, parse_number, parse_on_off, parse_reals, split_params, wrong_count};
use crate::error::ScriptError;
use crate::model::GpuProgramType;
use crate::processor::context::{ParserState, PendingProgramDefinition, ScriptContext, Section};
use crate::processor::dispatch::{Attribute, LineKind};

pub const ATTRIBUTES: &[Attribute] = &[
    Attribute::new(&[Section::None], &["material"], parse_material),
    Attribute::new(&[Section::None], &["vertex_program"], parse_vertex_program),
    Attribute::new(&[Section::None], &["fragment_program"], parse_fragment_program),
    Attribute::new(&[Section::Material], &["technique"], parse_technique),
    Attribute::new(&[Section::Material], &["lod_distances"], parse_lod_distances),
    Attribute::new(&[Section::Material], &["receive_shadows"], parse_receive_shadows),
    Attribute::new(
        &[Section::Material],
        &["transparency_casts_shadows"],
        parse_transparency_casts_shadows,
    ),
    Attribute::new(&[Section::Material], &["set_texture_alias"], parse_set_texture_alias),
    Attribute::new(&[Section::Technique], &["pass"], parse_pass),
    Attribute::new(&[Section::Technique], &["lod_index"], parse_lod_index),
];

// ── top level ───────────────────────────────────────────────────────

fn parse_material(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let name = params.trim();
    if name.is_empty() {
        ctx.report(ScriptError::MissingName("material".into()));
        ctx.skip_next_block = true;
        return Ok(LineKind::BlockHeader);
    }

    let file_name = ctx.file_name.clone();
    match ctx.registry.materials.create(name, &file_name) {
        Ok(index) => {
            log::debug!("material {name}");
            ctx.section = Section::Material;
            ctx.material = Some(index);
            // scripts describe every technique themselves
            ctx.material_mut()?.remove_all_techniques();
        }
        Err(err) => {
            ctx.report(err);
            ctx.skip_next_block = true;
        }
    }
    Ok(LineKind::BlockHeader)
}

fn parse_program_header(
    attribute: &str,
    kind: GpuProgramType,
    params: &str,
    ctx: &mut ScriptContext<'_>,
) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    if tokens.len() != 2 {
        ctx.report(wrong_count(attribute, "2: name and language"));
        ctx.skip_next_block = true;
        return Ok(LineKind::BlockHeader);
    }

    log::debug!("{kind} program {} ({})", tokens[0], tokens[1]);
    ctx.section = Section::Program;
    ctx.state = ParserState::BuildingProgram(PendingProgramDefinition::new(tokens[0], kind, tokens[1]));
    Ok(LineKind::BlockHeader)
}

fn parse_vertex_program(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    parse_program_header("vertex_program", GpuProgramType::Vertex, params, ctx)
}

fn parse_fragment_program(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    parse_program_header("fragment_program", GpuProgramType::Fragment, params, ctx)
}

// ── material ────────────────────────────────────────────────────────

fn parse_technique(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let material = ctx.material_mut()?;
    let index = material.create_technique();
    let name = params.trim();
    if !name.is_empty() {
        material.techniques[index].name = Some(name.to_owned());
    }

    ctx.technique_level += 1;
    ctx.technique = Some(index);
    ctx.section = Section::Technique;
    Ok(LineKind::BlockHeader)
}

fn parse_lod_distances(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    if tokens.is_empty() {
        return Err(wrong_count("lod_distances", "at least 1"));
    }
    let distances = parse_reals("lod_distances", &tokens)?;
    ctx.material_mut()?.lod_distances = distances;
    Ok(LineKind::Attribute)
}

fn parse_receive_shadows(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let enabled = parse_on_off("receive_shadows", params)?;
    ctx.material_mut()?.receive_shadows = enabled;
    Ok(LineKind::Attribute)
}

fn parse_transparency_casts_shadows(
    params: &str,
    ctx: &mut ScriptContext<'_>,
) -> Result<LineKind, ScriptError> {
    let enabled = parse_on_off("transparency_casts_shadows", params)?;
    ctx.material_mut()?.transparency_casts_shadows = enabled;
    Ok(LineKind::Attribute)
}

/// Applied to the texture units when the material closes.
fn parse_set_texture_alias(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("set_texture_alias", &tokens, &[2])?;
    ctx.texture_aliases
        .push((tokens[0].to_owned(), tokens[1].to_owned()));
    Ok(LineKind::Attribute)
}

// ── technique ───────────────────────────────────────────────────────

/// A named pass that already exists in the technique is re-entered;
/// anything else creates a new pass.
fn parse_pass(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let name = params.trim();
    let technique = ctx.technique_mut()?;

    let existing = if name.is_empty() || technique.passes.is_empty() {
        None
    } else {
        technique.pass_index(name)
    };
    let index = match existing {
        Some(index) => {
            log::debug!("re-entering pass {name}");
            index
        }
        None => {
            let index = technique.create_pass();
            if !name.is_empty() {
                technique.passes[index].name = Some(name.to_owned());
            }
            index
        }
    };

    ctx.pass_level = index as i32;
    ctx.pass = Some(index);
    ctx.section = Section::Pass;
    Ok(LineKind::BlockHeader)
}

fn parse_lod_index(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("lod_index", &tokens, &[1])?;
    let lod_index = parse_number("lod_index", tokens[0])?;
    ctx.technique_mut()?.lod_index = lod_index;
    Ok(LineKind::Attribute)
}
