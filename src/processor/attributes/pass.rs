//! Pass commands, including the blocks a pass opens.

use super::values::{
    expect_count, parse_colour, parse_enum, parse_number, parse_on_off, parse_reals, parse_switch,
    split_params, wrong_count,
};
use crate::error::ScriptError;
use crate::model::{
    ColourValue, CompareFunction, CullingMode, FogMode, LightType, ManualCullingMode, PassIteration,
    ProgramBinding, ProgramSlot, SceneBlend, SceneBlendFactor, SceneBlendType, ShadeOptions,
};
use crate::processor::context::{ParamTarget, ScriptContext, Section};
use crate::processor::dispatch::{Attribute, LineKind};

pub const ATTRIBUTES: &[Attribute] = &[
    Attribute::new(&[Section::Pass], &["ambient"], parse_ambient),
    Attribute::new(&[Section::Pass], &["diffuse"], parse_diffuse),
    Attribute::new(&[Section::Pass], &["specular"], parse_specular),
    Attribute::new(&[Section::Pass], &["emissive"], parse_emissive),
    Attribute::new(&[Section::Pass], &["scene_blend"], parse_scene_blend),
    Attribute::new(&[Section::Pass], &["depth_check"], parse_depth_check),
    Attribute::new(&[Section::Pass], &["depth_write"], parse_depth_write),
    Attribute::new(&[Section::Pass], &["depth_func"], parse_depth_func),
    Attribute::new(&[Section::Pass], &["depth_bias"], parse_depth_bias),
    Attribute::new(&[Section::Pass], &["cull_hardware"], parse_cull_hardware),
    Attribute::new(&[Section::Pass], &["cull_software"], parse_cull_software),
    Attribute::new(&[Section::Pass], &["lighting"], parse_lighting),
    Attribute::new(&[Section::Pass], &["shading"], parse_shading),
    Attribute::new(&[Section::Pass], &["iteration"], parse_iteration),
    Attribute::new(&[Section::Pass], &["max_lights"], parse_max_lights),
    Attribute::new(&[Section::Pass], &["fog_override"], parse_fog_override),
    Attribute::new(&[Section::Pass], &["colour_write", "color_write"], parse_colour_write),
    Attribute::new(&[Section::Pass], &["texture_unit"], parse_texture_unit),
    Attribute::new(&[Section::Pass], &["vertex_program_ref"], parse_vertex_program_ref),
    Attribute::new(&[Section::Pass], &["fragment_program_ref"], parse_fragment_program_ref),
    Attribute::new(
        &[Section::Pass],
        &["shadow_caster_vertex_program_ref"],
        parse_shadow_caster_vertex_program_ref,
    ),
    Attribute::new(
        &[Section::Pass],
        &["shadow_caster_fragment_program_ref"],
        parse_shadow_caster_fragment_program_ref,
    ),
    Attribute::new(
        &[Section::Pass],
        &["shadow_receiver_vertex_program_ref"],
        parse_shadow_receiver_vertex_program_ref,
    ),
    Attribute::new(
        &[Section::Pass],
        &["shadow_receiver_fragment_program_ref"],
        parse_shadow_receiver_fragment_program_ref,
    ),
];

const VERTEX_COLOUR: &str = "vertexcolour";

// ── colours ─────────────────────────────────────────────────────────

/// Either `vertexcolour` or an explicit colour; the bool is true for the former.
fn parse_tracked_colour(attribute: &str, params: &str) -> Result<(bool, Option<ColourValue>), ScriptError> {
    let tokens = split_params(params);
    if tokens.len() == 1 && tokens[0].eq_ignore_ascii_case(VERTEX_COLOUR) {
        return Ok((true, None));
    }
    if tokens.len() == 1 {
        return Err(wrong_count(attribute, "3 or 4, or 'vertexcolour'"));
    }
    Ok((false, Some(parse_colour(attribute, &tokens)?)))
}

fn parse_ambient(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let (tracked, colour) = parse_tracked_colour("ambient", params)?;
    let pass = ctx.pass_mut()?;
    pass.vertex_colour_tracking.ambient = tracked;
    if let Some(colour) = colour {
        pass.ambient = colour;
    }
    Ok(LineKind::Attribute)
}

fn parse_diffuse(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let (tracked, colour) = parse_tracked_colour("diffuse", params)?;
    let pass = ctx.pass_mut()?;
    pass.vertex_colour_tracking.diffuse = tracked;
    if let Some(colour) = colour {
        pass.diffuse = colour;
    }
    Ok(LineKind::Attribute)
}

fn parse_emissive(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let (tracked, colour) = parse_tracked_colour("emissive", params)?;
    let pass = ctx.pass_mut()?;
    pass.vertex_colour_tracking.emissive = tracked;
    if let Some(colour) = colour {
        pass.emissive = colour;
    }
    Ok(LineKind::Attribute)
}

/// `specular vertexcolour <shininess>` or `specular r g b [a] <shininess>`.
fn parse_specular(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    let Some((shininess, colour)) = tokens.split_last() else {
        return Err(wrong_count("specular", "4 or 5, or 'vertexcolour' and shininess"));
    };

    let tracked = colour.len() == 1 && colour[0].eq_ignore_ascii_case(VERTEX_COLOUR);
    let colour = if tracked {
        None
    } else if colour.len() == 3 || colour.len() == 4 {
        Some(parse_colour("specular", colour)?)
    } else {
        return Err(wrong_count("specular", "4 or 5, or 'vertexcolour' and shininess"));
    };
    let shininess = parse_number("specular", shininess)?;

    let pass = ctx.pass_mut()?;
    pass.vertex_colour_tracking.specular = tracked;
    if let Some(colour) = colour {
        pass.specular = colour;
    }
    pass.shininess = shininess;
    Ok(LineKind::Attribute)
}

// ── blending and depth ──────────────────────────────────────────────

fn parse_scene_blend(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    let blend = match tokens.as_slice() {
        [preset] => parse_enum::<SceneBlendType>("scene_blend", preset)?.factors(),
        [source, dest] => SceneBlend {
            source: parse_enum::<SceneBlendFactor>("scene_blend", source)?,
            dest: parse_enum::<SceneBlendFactor>("scene_blend", dest)?,
        },
        _ => return Err(wrong_count("scene_blend", "1 or 2")),
    };
    ctx.pass_mut()?.scene_blend = blend;
    Ok(LineKind::Attribute)
}

fn parse_depth_check(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let enabled = parse_on_off("depth_check", params)?;
    ctx.pass_mut()?.depth_check = enabled;
    Ok(LineKind::Attribute)
}

fn parse_depth_write(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let enabled = parse_on_off("depth_write", params)?;
    ctx.pass_mut()?.depth_write = enabled;
    Ok(LineKind::Attribute)
}

fn parse_depth_func(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("depth_func", &tokens, &[1])?;
    let func = parse_enum::<CompareFunction>("depth_func", tokens[0])?;
    ctx.pass_mut()?.depth_func = func;
    Ok(LineKind::Attribute)
}

fn parse_depth_bias(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("depth_bias", &tokens, &[1, 2])?;
    let bias = parse_reals("depth_bias", &tokens)?;
    let pass = ctx.pass_mut()?;
    pass.depth_bias_constant = bias[0];
    pass.depth_bias_slope_scale = bias.get(1).copied().unwrap_or(0.0);
    Ok(LineKind::Attribute)
}

// ── culling and lighting ────────────────────────────────────────────

fn parse_cull_hardware(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("cull_hardware", &tokens, &[1])?;
    let mode = parse_enum::<CullingMode>("cull_hardware", tokens[0])?;
    ctx.pass_mut()?.cull_hardware = mode;
    Ok(LineKind::Attribute)
}

fn parse_cull_software(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("cull_software", &tokens, &[1])?;
    let mode = parse_enum::<ManualCullingMode>("cull_software", tokens[0])?;
    ctx.pass_mut()?.cull_software = mode;
    Ok(LineKind::Attribute)
}

fn parse_lighting(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let enabled = parse_on_off("lighting", params)?;
    ctx.pass_mut()?.lighting = enabled;
    Ok(LineKind::Attribute)
}

fn parse_shading(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("shading", &tokens, &[1])?;
    let shading = parse_enum::<ShadeOptions>("shading", tokens[0])?;
    ctx.pass_mut()?.shading = shading;
    Ok(LineKind::Attribute)
}

/// `once`, `once_per_light` or `once_per_light <light type>`.
fn parse_iteration(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("iteration", &tokens, &[1, 2])?;
    let iteration = if tokens[0].eq_ignore_ascii_case("once") && tokens.len() == 1 {
        PassIteration::Once
    } else if tokens[0].eq_ignore_ascii_case("once_per_light") {
        let light = match tokens.get(1) {
            Some(token) => Some(parse_enum::<LightType>("iteration", token)?),
            None => None,
        };
        PassIteration::OncePerLight(light)
    } else {
        return Err(ScriptError::InvalidValue {
            attribute: "iteration".to_owned(),
            value: params.trim().to_owned(),
            legal: "'once', 'once_per_light [point|directional|spot]'".to_owned(),
        });
    };
    ctx.pass_mut()?.iteration = iteration;
    Ok(LineKind::Attribute)
}

fn parse_max_lights(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("max_lights", &tokens, &[1])?;
    let max_lights = parse_number("max_lights", tokens[0])?;
    ctx.pass_mut()?.max_lights = max_lights;
    Ok(LineKind::Attribute)
}

/// `fog_override false`, `fog_override true` or
/// `fog_override true <type> <r> <g> <b> <density> <start> <end>`.
fn parse_fog_override(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("fog_override", &tokens, &[1, 8])?;
    let override_scene = parse_switch("fog_override", tokens[0], ("true", "false"))?;

    let mut fog = ctx.pass_mut()?.fog;
    fog.override_scene = override_scene;
    if override_scene && tokens.len() == 8 {
        fog.mode = parse_enum::<FogMode>("fog_override", tokens[1])?;
        let values = parse_reals("fog_override", &tokens[2..])?;
        fog.colour = ColourValue::new(values[0], values[1], values[2], 1.0);
        fog.density = values[3];
        fog.start = values[4];
        fog.end = values[5];
    }
    ctx.pass_mut()?.fog = fog;
    Ok(LineKind::Attribute)
}

fn parse_colour_write(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let enabled = parse_on_off("colour_write", params)?;
    ctx.pass_mut()?.colour_write = enabled;
    Ok(LineKind::Attribute)
}

// ── blocks ──────────────────────────────────────────────────────────

fn parse_texture_unit(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let pass = ctx.pass_mut()?;
    let index = pass.create_texture_unit();
    let name = params.trim();
    if !name.is_empty() {
        pass.texture_units[index].name = Some(name.to_owned());
    }

    ctx.state_level += 1;
    ctx.texture_unit = Some(index);
    ctx.section = Section::TextureUnit;
    Ok(LineKind::BlockHeader)
}

/// Binds a program to one of the pass's slots and opens its parameter block.
///
/// A reference to an unknown program, or to one of the wrong kind, is
/// reported but the block is still entered; parameter commands inside it
/// are then ignored.
fn bind_program_ref(
    slot: ProgramSlot,
    params: &str,
    ctx: &mut ScriptContext<'_>,
) -> Result<LineKind, ScriptError> {
    let attribute = slot.keyword();
    let name = params.trim();
    if name.is_empty() {
        ctx.report(ScriptError::MissingName(attribute.to_owned()));
        ctx.skip_next_block = true;
        return Ok(LineKind::BlockHeader);
    }

    ctx.section = Section::ProgramRef;
    ctx.program = None;
    ctx.program_parameters = None;

    let defaults = match ctx.registry.programs.get(name) {
        None => {
            ctx.report(ScriptError::UndefinedProgram {
                attribute: attribute.to_owned(),
                kind: slot.kind(),
                program: name.to_owned(),
            });
            return Ok(LineKind::BlockHeader);
        }
        Some(program) if program.kind != slot.kind() => {
            let err = ScriptError::ProgramKindMismatch {
                attribute: attribute.to_owned(),
                program: name.to_owned(),
                actual: program.kind,
                expected: slot.kind(),
            };
            ctx.report(err);
            return Ok(LineKind::BlockHeader);
        }
        Some(program) => program.default_parameters.clone(),
    };

    // re-binding the same program keeps the parameters set so far
    let binding = ctx.pass_mut()?.programs.slot_mut(slot);
    if binding.as_ref().is_none_or(|b| b.program != name) {
        *binding = Some(ProgramBinding {
            program: name.to_owned(),
            parameters: defaults,
        });
    }

    ctx.program = Some(name.to_owned());
    ctx.program_parameters = Some(ParamTarget::Pass(slot));
    Ok(LineKind::BlockHeader)
}

fn parse_vertex_program_ref(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    bind_program_ref(ProgramSlot::Vertex, params, ctx)
}

fn parse_fragment_program_ref(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    bind_program_ref(ProgramSlot::Fragment, params, ctx)
}

fn parse_shadow_caster_vertex_program_ref(
    params: &str,
    ctx: &mut ScriptContext<'_>,
) -> Result<LineKind, ScriptError> {
    bind_program_ref(ProgramSlot::ShadowCasterVertex, params, ctx)
}

fn parse_shadow_caster_fragment_program_ref(
    params: &str,
    ctx: &mut ScriptContext<'_>,
) -> Result<LineKind, ScriptError> {
    bind_program_ref(ProgramSlot::ShadowCasterFragment, params, ctx)
}

fn parse_shadow_receiver_vertex_program_ref(
    params: &str,
    ctx: &mut ScriptContext<'_>,
) -> Result<LineKind, ScriptError> {
    bind_program_ref(ProgramSlot::ShadowReceiverVertex, params, ctx)
}

fn parse_shadow_receiver_fragment_program_ref(
    params: &str,
    ctx: &mut ScriptContext<'_>,
) -> Result<LineKind, ScriptError> {
    bind_program_ref(ProgramSlot::ShadowReceiverFragment, params, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ResourceRegistry, ScriptEnum};

    fn with_pass<F: FnOnce(&mut ScriptContext<'_>)>(f: F) -> ResourceRegistry {
        let mut registry = ResourceRegistry::default();
        let index = registry.materials.create("M", "t").unwrap();
        {
            let mut ctx = ScriptContext::new("t", &mut registry);
            ctx.material = Some(index);
            ctx.technique = Some(0);
            ctx.pass = Some(0);
            ctx.section = Section::Pass;
            f(&mut ctx);
        }
        registry
    }

    fn first_pass(registry: &ResourceRegistry) -> &crate::model::Pass {
        &registry.materials.get("M").unwrap().techniques[0].passes[0]
    }

    #[test]
    fn test_colour_forms() {
        let registry = with_pass(|ctx| {
            parse_ambient("0.5 0.5 0.5", ctx).unwrap();
            parse_diffuse("vertexcolour", ctx).unwrap();
            parse_specular("1 0 0 0.5 40", ctx).unwrap();
            assert!(parse_emissive("1", ctx).is_err());
        });
        let pass = first_pass(&registry);
        assert_eq!(pass.ambient, ColourValue::new(0.5, 0.5, 0.5, 1.0));
        assert!(pass.vertex_colour_tracking.diffuse);
        assert_eq!(pass.diffuse, ColourValue::WHITE);
        assert_eq!(pass.specular, ColourValue::new(1.0, 0.0, 0.0, 0.5));
        assert_eq!(pass.shininess, 40.0);
        assert_eq!(pass.emissive, ColourValue::ZERO);
    }

    #[test]
    fn test_specular_vertexcolour() {
        let registry = with_pass(|ctx| {
            parse_specular("vertexcolour 12", ctx).unwrap();
            assert!(parse_specular("1 1 12", ctx).is_err());
        });
        let pass = first_pass(&registry);
        assert!(pass.vertex_colour_tracking.specular);
        assert_eq!(pass.shininess, 12.0);
    }

    #[test]
    fn test_scene_blend_forms() {
        let test_cases = vec![
            ("add", Some((SceneBlendFactor::One, SceneBlendFactor::One))),
            (
                "alpha_blend",
                Some((SceneBlendFactor::SourceAlpha, SceneBlendFactor::OneMinusSourceAlpha)),
            ),
            ("src_colour one", Some((SceneBlendFactor::SourceColour, SceneBlendFactor::One))),
            ("src_colour", None),
            ("one one one", None),
        ];
        for (params, expected) in test_cases {
            let mut result = None;
            let registry = with_pass(|ctx| result = Some(parse_scene_blend(params, ctx).is_ok()));
            let blend = first_pass(&registry).scene_blend;
            match expected {
                Some((source, dest)) => {
                    assert_eq!(result, Some(true), "{params}");
                    assert_eq!(blend, SceneBlend { source, dest }, "{params}");
                }
                None => {
                    assert_eq!(result, Some(false), "{params}");
                    assert_eq!(blend, SceneBlend::REPLACE, "{params}");
                }
            }
        }
    }

    #[test]
    fn test_iteration_and_fog() {
        let registry = with_pass(|ctx| {
            parse_iteration("once_per_light point", ctx).unwrap();
            parse_fog_override("true exp 1 0 0 0.002 100 1000", ctx).unwrap();
            assert!(parse_iteration("twice", ctx).is_err());
            assert!(parse_fog_override("true exp 1 0 0", ctx).is_err());
        });
        let pass = first_pass(&registry);
        assert_eq!(pass.iteration, PassIteration::OncePerLight(Some(LightType::Point)));
        assert!(pass.fog.override_scene);
        assert_eq!(pass.fog.mode, FogMode::Exp);
        assert_eq!(pass.fog.end, 1000.0);
    }

    #[test]
    fn test_texture_unit_opens_block() {
        with_pass(|ctx| {
            assert_eq!(parse_texture_unit("", ctx).unwrap(), LineKind::BlockHeader);
            assert_eq!(ctx.section, Section::TextureUnit);
            assert_eq!(ctx.texture_unit, Some(0));
            assert_eq!(ctx.state_level, 0);
        });
    }

    #[test]
    fn test_undefined_program_ref_still_opens_block() {
        let registry = with_pass(|ctx| {
            let kind = parse_vertex_program_ref("Missing", ctx).unwrap();
            assert_eq!(kind, LineKind::BlockHeader);
            assert_eq!(ctx.section, Section::ProgramRef);
            assert!(ctx.program_parameters.is_none());
            assert!(!ctx.has_supported_program());
        });
        assert!(first_pass(&registry).programs.vertex.is_none());
    }

    #[test]
    fn test_program_ref_tokens() {
        for slot in ProgramSlot::ALL {
            assert!(slot.keyword().ends_with(&format!("{}_program_ref", slot.kind())));
        }
        assert_eq!(LightType::Spot.token(), "spot");
    }
}
