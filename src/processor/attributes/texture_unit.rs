//! Texture unit commands.

use super::values::{
    expect_count, parse_colour, parse_enum, parse_number, parse_reals, parse_switch, split_params,
    wrong_count,
};
use crate::error::ScriptError;
use crate::model::{
    AlphaBlendMode, ColourBlendMode, ColourValue, CompareFunction, EnvMapType,
    ExternalTextureSource, LayerBlendOperation, LayerBlendSource, LayerBlendType,
    MAX_ANIMATION_FRAMES, SceneBlend,
    SceneBlendFactor, TextureAddressingMode, TextureEffect, TextureFilterPreset, TextureFiltering,
    TextureTransformType, TextureType, UvwAddressingMode, WaveformType,
};
use crate::processor::context::{ScriptContext, Section};
use crate::processor::dispatch::{Attribute, LineKind};

pub const ATTRIBUTES: &[Attribute] = &[
    Attribute::new(&[Section::TextureUnit], &["texture"], parse_texture),
    Attribute::new(&[Section::TextureUnit], &["anim_texture"], parse_anim_texture),
    Attribute::new(&[Section::TextureUnit], &["cubic_texture"], parse_cubic_texture),
    Attribute::new(&[Section::TextureUnit], &["texture_alias"], parse_texture_alias),
    Attribute::new(&[Section::TextureUnit], &["texture_source"], parse_texture_source),
    Attribute::new(&[Section::TextureUnit], &["tex_coord_set"], parse_tex_coord_set),
    Attribute::new(&[Section::TextureUnit], &["tex_address_mode"], parse_tex_address_mode),
    Attribute::new(&[Section::TextureUnit], &["tex_border_colour"], parse_tex_border_colour),
    Attribute::new(&[Section::TextureUnit], &["filtering"], parse_filtering),
    Attribute::new(&[Section::TextureUnit], &["max_anisotropy"], parse_max_anisotropy),
    Attribute::new(&[Section::TextureUnit], &["colour_op", "color_op"], parse_colour_op),
    Attribute::new(&[Section::TextureUnit], &["colour_op_ex", "color_op_ex"], parse_colour_op_ex),
    Attribute::new(
        &[Section::TextureUnit],
        &["colour_op_multipass_fallback", "color_op_multipass_fallback"],
        parse_colour_op_multipass_fallback,
    ),
    Attribute::new(&[Section::TextureUnit], &["alpha_op_ex"], parse_alpha_op_ex),
    Attribute::new(&[Section::TextureUnit], &["alpha_rejection"], parse_alpha_rejection),
    Attribute::new(&[Section::TextureUnit], &["env_map"], parse_env_map),
    Attribute::new(&[Section::TextureUnit], &["scroll"], parse_scroll),
    Attribute::new(&[Section::TextureUnit], &["scroll_anim"], parse_scroll_anim),
    Attribute::new(&[Section::TextureUnit], &["rotate"], parse_rotate),
    Attribute::new(&[Section::TextureUnit], &["rotate_anim"], parse_rotate_anim),
    Attribute::new(&[Section::TextureUnit], &["scale"], parse_scale),
    Attribute::new(&[Section::TextureUnit], &["wave_xform"], parse_wave_xform),
];

// ── texture selection ───────────────────────────────────────────────

fn parse_texture(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("texture", &tokens, &[1, 2])?;
    let texture_type = match tokens.get(1) {
        Some(token) => parse_enum::<TextureType>("texture", token)?,
        None => TextureType::TwoD,
    };
    let unit = ctx.texture_unit_mut()?;
    unit.set_texture_name(tokens[0]);
    unit.texture_type = texture_type;
    Ok(LineKind::Attribute)
}

/// `anim_texture <base> <frames> <duration>` or
/// `anim_texture <frame1> <frame2> ... <duration>`.
fn parse_anim_texture(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    if tokens.len() < 3 {
        return Err(wrong_count("anim_texture", "at least 3"));
    }

    let frame_count = if tokens.len() == 3 {
        tokens[1].parse::<usize>().ok().filter(|&n| n > 0)
    } else {
        None
    };
    let Some((duration, frames)) = tokens.split_last() else {
        return Err(wrong_count("anim_texture", "at least 3"));
    };
    let duration = parse_number("anim_texture", duration)?;
    if frame_count.is_some_and(|n| n > MAX_ANIMATION_FRAMES) {
        return Err(ScriptError::InvalidParameter {
            attribute: "anim_texture".to_owned(),
            reason: format!("at most {MAX_ANIMATION_FRAMES} frames are allowed"),
        });
    }

    let unit = ctx.texture_unit_mut()?;
    match frame_count {
        Some(count) => unit.set_animated_texture_base(tokens[0], count, duration),
        None => unit.set_animated_texture_frames(frames, duration),
    }
    Ok(LineKind::Attribute)
}

/// `cubic_texture <base> combinedUVW|separateUV` or
/// `cubic_texture <front> <back> <left> <right> <up> <down> separateUV`.
fn parse_cubic_texture(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("cubic_texture", &tokens, &[2, 7])?;
    let combined = parse_switch("cubic_texture", tokens[tokens.len() - 1], ("combinedUVW", "separateUV"))?;

    let unit = ctx.texture_unit_mut()?;
    if tokens.len() == 2 {
        unit.set_cubic_texture_base(tokens[0], combined);
        return Ok(LineKind::Attribute);
    }
    if combined {
        return Err(ScriptError::InvalidParameter {
            attribute: "cubic_texture".to_owned(),
            reason: "six separate faces require 'separateUV'".to_owned(),
        });
    }
    unit.set_cubic_texture_faces(&tokens[..6]);
    Ok(LineKind::Attribute)
}

fn parse_texture_alias(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("texture_alias", &tokens, &[1])?;
    ctx.texture_unit_mut()?.texture_alias = Some(tokens[0].to_owned());
    Ok(LineKind::Attribute)
}

/// Opens a block of plugin specific `key value` lines.
fn parse_texture_source(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    if tokens.len() != 1 {
        ctx.report(wrong_count("texture_source", "1"));
        ctx.skip_next_block = true;
        return Ok(LineKind::BlockHeader);
    }

    ctx.texture_unit_mut()?.external_source = Some(ExternalTextureSource {
        plugin: tokens[0].to_owned(),
        parameters: Vec::new(),
    });
    ctx.section = Section::TextureSource;
    Ok(LineKind::BlockHeader)
}

// ── sampling ────────────────────────────────────────────────────────

fn parse_tex_coord_set(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("tex_coord_set", &tokens, &[1])?;
    let set = parse_number("tex_coord_set", tokens[0])?;
    ctx.texture_unit_mut()?.tex_coord_set = set;
    Ok(LineKind::Attribute)
}

/// One mode for all of u, v and w, or `<u> <v> [<w>]` with w defaulting to wrap.
fn parse_tex_address_mode(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("tex_address_mode", &tokens, &[1, 2, 3])?;
    let modes = tokens
        .iter()
        .map(|t| parse_enum::<TextureAddressingMode>("tex_address_mode", t))
        .collect::<Result<Vec<_>, _>>()?;
    let address_mode = match modes.as_slice() {
        [all] => UvwAddressingMode {
            u: *all,
            v: *all,
            w: *all,
        },
        [u, v] => UvwAddressingMode {
            u: *u,
            v: *v,
            w: TextureAddressingMode::Wrap,
        },
        [u, v, w, ..] => UvwAddressingMode { u: *u, v: *v, w: *w },
        [] => return Err(wrong_count("tex_address_mode", "1, 2 or 3")),
    };
    ctx.texture_unit_mut()?.address_mode = address_mode;
    Ok(LineKind::Attribute)
}

fn parse_tex_border_colour(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    let colour = parse_colour("tex_border_colour", &tokens)?;
    ctx.texture_unit_mut()?.border_colour = colour;
    Ok(LineKind::Attribute)
}

/// A preset name or explicit `<min> <mag> <mip>` filters.
fn parse_filtering(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("filtering", &tokens, &[1, 3])?;
    let filtering = if tokens.len() == 1 {
        parse_enum::<TextureFilterPreset>("filtering", tokens[0])?.filtering()
    } else {
        TextureFiltering {
            min: parse_enum("filtering", tokens[0])?,
            mag: parse_enum("filtering", tokens[1])?,
            mip: parse_enum("filtering", tokens[2])?,
        }
    };
    ctx.texture_unit_mut()?.filtering = filtering;
    Ok(LineKind::Attribute)
}

fn parse_max_anisotropy(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("max_anisotropy", &tokens, &[1])?;
    let max = parse_number("max_anisotropy", tokens[0])?;
    ctx.texture_unit_mut()?.max_anisotropy = max;
    Ok(LineKind::Attribute)
}

// ── blending ────────────────────────────────────────────────────────

fn parse_colour_op(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("colour_op", &tokens, &[1])?;
    let blend = parse_enum::<LayerBlendType>("colour_op", tokens[0])?;
    ctx.texture_unit_mut()?.set_colour_operation(blend);
    Ok(LineKind::Attribute)
}

/// Leading `operation source1 source2` of the extended blend commands.
fn parse_blend_head(
    attribute: &str,
    tokens: &[&str],
) -> Result<(LayerBlendOperation, LayerBlendSource, LayerBlendSource), ScriptError> {
    Ok((
        parse_enum(attribute, tokens[0])?,
        parse_enum(attribute, tokens[1])?,
        parse_enum(attribute, tokens[2])?,
    ))
}

/// Consumes the next `count` tokens of `rest`, failing if there are too few.
fn take<'t>(attribute: &str, rest: &mut &'t [&'t str], count: usize) -> Result<&'t [&'t str], ScriptError> {
    if rest.len() < count {
        return Err(ScriptError::InvalidParameter {
            attribute: attribute.to_owned(),
            reason: "missing manual blend values".to_owned(),
        });
    }
    let (taken, remaining) = rest.split_at(count);
    *rest = remaining;
    Ok(taken)
}

/// `colour_op_ex <op> <src1> <src2> [<factor>] [<r> <g> <b>] [<r> <g> <b>]`
///
/// The factor is only present for `blend_manual`; each manual colour only
/// for a `src_manual` source, in source order.
fn parse_colour_op_ex(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    const ATTR: &str = "colour_op_ex";
    let tokens = split_params(params);
    if !(3..=10).contains(&tokens.len()) {
        return Err(wrong_count(ATTR, "3 to 10"));
    }
    let (operation, source1, source2) = parse_blend_head(ATTR, &tokens)?;

    let mut blend = ColourBlendMode {
        operation,
        source1,
        source2,
        ..ColourBlendMode::default()
    };
    let mut rest: &[&str] = &tokens[3..];
    if operation == LayerBlendOperation::BlendManual {
        blend.factor = parse_number(ATTR, take(ATTR, &mut rest, 1)?[0])?;
    }
    if source1 == LayerBlendSource::Manual {
        let c = parse_reals(ATTR, take(ATTR, &mut rest, 3)?)?;
        blend.colour_arg1 = ColourValue::new(c[0], c[1], c[2], 1.0);
    }
    if source2 == LayerBlendSource::Manual {
        let c = parse_reals(ATTR, take(ATTR, &mut rest, 3)?)?;
        blend.colour_arg2 = ColourValue::new(c[0], c[1], c[2], 1.0);
    }

    ctx.texture_unit_mut()?.colour_blend = blend;
    Ok(LineKind::Attribute)
}

fn parse_colour_op_multipass_fallback(
    params: &str,
    ctx: &mut ScriptContext<'_>,
) -> Result<LineKind, ScriptError> {
    const ATTR: &str = "colour_op_multipass_fallback";
    let tokens = split_params(params);
    expect_count(ATTR, &tokens, &[2])?;
    let fallback = SceneBlend {
        source: parse_enum::<SceneBlendFactor>(ATTR, tokens[0])?,
        dest: parse_enum::<SceneBlendFactor>(ATTR, tokens[1])?,
    };
    ctx.texture_unit_mut()?.colour_blend_fallback = fallback;
    Ok(LineKind::Attribute)
}

/// `alpha_op_ex <op> <src1> <src2> [<factor>] [<a1>] [<a2>]`
fn parse_alpha_op_ex(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    const ATTR: &str = "alpha_op_ex";
    let tokens = split_params(params);
    if !(3..=6).contains(&tokens.len()) {
        return Err(wrong_count(ATTR, "3 to 6"));
    }
    let (operation, source1, source2) = parse_blend_head(ATTR, &tokens)?;

    let mut blend = AlphaBlendMode {
        operation,
        source1,
        source2,
        ..AlphaBlendMode::default()
    };
    let mut rest: &[&str] = &tokens[3..];
    if operation == LayerBlendOperation::BlendManual {
        blend.factor = parse_number(ATTR, take(ATTR, &mut rest, 1)?[0])?;
    }
    if source1 == LayerBlendSource::Manual {
        blend.alpha_arg1 = parse_number(ATTR, take(ATTR, &mut rest, 1)?[0])?;
    }
    if source2 == LayerBlendSource::Manual {
        blend.alpha_arg2 = parse_number(ATTR, take(ATTR, &mut rest, 1)?[0])?;
    }

    ctx.texture_unit_mut()?.alpha_blend = blend;
    Ok(LineKind::Attribute)
}

fn parse_alpha_rejection(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("alpha_rejection", &tokens, &[2])?;
    let func = parse_enum::<CompareFunction>("alpha_rejection", tokens[0])?;
    let value = parse_number::<u8>("alpha_rejection", tokens[1])?;
    ctx.texture_unit_mut()?.alpha_rejection = (func, value);
    Ok(LineKind::Attribute)
}

// ── effects and transforms ──────────────────────────────────────────

fn parse_env_map(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("env_map", &tokens, &[1])?;
    let env = if tokens[0].eq_ignore_ascii_case("off") {
        None
    } else {
        Some(parse_enum::<EnvMapType>("env_map", tokens[0]).map_err(|err| match err {
            ScriptError::InvalidValue { attribute, value, legal } => ScriptError::InvalidValue {
                attribute,
                value,
                legal: format!("'off', {legal}"),
            },
            other => other,
        })?)
    };
    ctx.texture_unit_mut()?.set_environment_map(env);
    Ok(LineKind::Attribute)
}

fn parse_pair(attribute: &str, params: &str) -> Result<(f32, f32), ScriptError> {
    let tokens = split_params(params);
    expect_count(attribute, &tokens, &[2])?;
    let v = parse_reals(attribute, &tokens)?;
    Ok((v[0], v[1]))
}

fn parse_single(attribute: &str, params: &str) -> Result<f32, ScriptError> {
    let tokens = split_params(params);
    expect_count(attribute, &tokens, &[1])?;
    parse_number(attribute, tokens[0])
}

fn parse_scroll(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let scroll = parse_pair("scroll", params)?;
    ctx.texture_unit_mut()?.scroll = scroll;
    Ok(LineKind::Attribute)
}

fn parse_scroll_anim(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let (u_speed, v_speed) = parse_pair("scroll_anim", params)?;
    ctx.texture_unit_mut()?.set_scroll_animation(u_speed, v_speed);
    Ok(LineKind::Attribute)
}

fn parse_rotate(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let angle = parse_single("rotate", params)?;
    ctx.texture_unit_mut()?.rotation = angle;
    Ok(LineKind::Attribute)
}

fn parse_rotate_anim(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let speed = parse_single("rotate_anim", params)?;
    ctx.texture_unit_mut()?.set_rotate_animation(speed);
    Ok(LineKind::Attribute)
}

fn parse_scale(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let scale = parse_pair("scale", params)?;
    ctx.texture_unit_mut()?.scale = scale;
    Ok(LineKind::Attribute)
}

/// `wave_xform <transform> <waveform> <base> <frequency> <phase> <amplitude>`
fn parse_wave_xform(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    let tokens = split_params(params);
    expect_count("wave_xform", &tokens, &[6])?;
    let transform = parse_enum::<TextureTransformType>("wave_xform", tokens[0])?;
    let waveform = parse_enum::<WaveformType>("wave_xform", tokens[1])?;
    let v = parse_reals("wave_xform", &tokens[2..])?;
    ctx.texture_unit_mut()?.effects.push(TextureEffect::Transform {
        transform,
        waveform,
        base: v[0],
        frequency: v[1],
        phase: v[2],
        amplitude: v[3],
    });
    Ok(LineKind::Attribute)
}
