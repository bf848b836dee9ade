//! Numeric program parameters.
//!
//! The same four commands fill a pass's program binding inside a
//! `*_program_ref` block and a program's defaults inside `default_params`.
//! Either way nothing happens unless the target program exists and the
//! render system supports it.

use super::values::{parse_number, parse_reals, split_params, wrong_count};
use crate::error::ScriptError;
use crate::model::{AutoConstantData, AutoConstantExtra, AutoConstantType, GpuProgramParameters, ScriptEnum};
use crate::processor::context::{ScriptContext, Section};
use crate::processor::dispatch::{Attribute, LineKind};

const PARAM_SECTIONS: &[Section] = &[Section::ProgramRef, Section::DefaultParameters];

pub const ATTRIBUTES: &[Attribute] = &[
    Attribute::new(PARAM_SECTIONS, &["param_indexed"], parse_param_indexed),
    Attribute::new(PARAM_SECTIONS, &["param_indexed_auto"], parse_param_indexed_auto),
    Attribute::new(PARAM_SECTIONS, &["param_named"], parse_param_named),
    Attribute::new(PARAM_SECTIONS, &["param_named_auto"], parse_param_named_auto),
];

/// Largest element count a type tag may declare; a 4x4 matrix.
const MAX_ELEMENTS: usize = 16;

/// Values of a manual constant, zero padded to whole registers.
#[derive(Debug, Clone, PartialEq)]
enum ManualConstant {
    Float(Vec<f32>),
    Int(Vec<i32>),
}

impl ManualConstant {
    fn registers(&self) -> usize {
        match self {
            ManualConstant::Float(v) => v.len() / 4,
            ManualConstant::Int(v) => v.len() / 4,
        }
    }

    fn write(&self, parameters: &mut GpuProgramParameters, index: usize) {
        match self {
            ManualConstant::Float(v) => parameters.set_constant_floats(index, v),
            ManualConstant::Int(v) => parameters.set_constant_ints(index, v),
        }
    }
}

/// Element count and kind of a type tag such as `float3`, `int` or `matrix4x4`.
fn parse_type_tag(attribute: &str, tag: &str) -> Result<(usize, bool), ScriptError> {
    let unknown = || ScriptError::UnknownParameterType {
        attribute: attribute.to_owned(),
        type_tag: tag.to_owned(),
    };
    let tag_lower = tag.to_ascii_lowercase();
    if tag_lower == "matrix4x4" {
        return Ok((16, false));
    }
    let (suffix, is_int) = if let Some(suffix) = tag_lower.strip_prefix("float") {
        (suffix, false)
    } else if let Some(suffix) = tag_lower.strip_prefix("int") {
        (suffix, true)
    } else {
        return Err(unknown());
    };
    let dims = if suffix.is_empty() {
        1
    } else {
        suffix.parse::<usize>().map_err(|_| unknown())?
    };
    if dims == 0 || dims > MAX_ELEMENTS {
        return Err(unknown());
    }
    Ok((dims, is_int))
}

/// `<type> <values...>`; the value count must match the type exactly.
fn parse_manual_constant(attribute: &str, tokens: &[&str]) -> Result<ManualConstant, ScriptError> {
    let Some((tag, values)) = tokens.split_first() else {
        return Err(wrong_count(attribute, "a type and its values"));
    };
    let (dims, is_int) = parse_type_tag(attribute, tag)?;
    if values.len() != dims {
        return Err(wrong_count(attribute, &dims.saturating_add(2).to_string()));
    }

    let padded = dims.div_ceil(4) * 4;
    if is_int {
        let mut ints = values
            .iter()
            .map(|v| parse_number::<i32>(attribute, v))
            .collect::<Result<Vec<_>, _>>()?;
        ints.resize(padded, 0);
        Ok(ManualConstant::Int(ints))
    } else {
        let mut floats = parse_reals(attribute, values)?;
        floats.resize(padded, 0.0);
        Ok(ManualConstant::Float(floats))
    }
}

/// `<kind> [<extra>]`; the extra argument is required exactly when the kind takes one.
fn parse_auto_constant(
    attribute: &str,
    tokens: &[&str],
) -> Result<(AutoConstantType, AutoConstantData), ScriptError> {
    let Some((kind, extra)) = tokens.split_first() else {
        return Err(wrong_count(attribute, "2 or 3"));
    };
    let kind = AutoConstantType::lookup(kind).ok_or_else(|| ScriptError::UnknownAutoConstant {
        attribute: attribute.to_owned(),
        value: (*kind).to_owned(),
    })?;
    let data = match (kind.extra(), extra) {
        (AutoConstantExtra::None, []) => AutoConstantData::Int(0),
        (AutoConstantExtra::Int, [value]) => AutoConstantData::Int(parse_number(attribute, value)?),
        (AutoConstantExtra::Real, [value]) => AutoConstantData::Real(parse_number(attribute, value)?),
        (AutoConstantExtra::None, _) => return Err(wrong_count(attribute, "2")),
        (_, _) => return Err(wrong_count(attribute, "3")),
    };
    Ok((kind, data))
}

fn target<'c>(ctx: &'c mut ScriptContext<'_>) -> Result<&'c mut GpuProgramParameters, ScriptError> {
    ctx.program_parameters_mut()
        .ok_or(ScriptError::MissingContext("program parameters"))
}

fn resolve_name(
    attribute: &str,
    parameters: &mut GpuProgramParameters,
    name: &str,
    registers: usize,
) -> Result<usize, ScriptError> {
    parameters
        .named_index(name, registers)
        .ok_or_else(|| ScriptError::InvalidParameter {
            attribute: attribute.to_owned(),
            reason: "named parameters are not supported by low-level programs".to_owned(),
        })
}

fn parse_param_indexed(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    const ATTR: &str = "param_indexed";
    if !ctx.has_supported_program() {
        return Ok(LineKind::Attribute);
    }
    let tokens = split_params(params);
    let Some((index, rest)) = tokens.split_first() else {
        return Err(wrong_count(ATTR, "at least 3"));
    };
    let index = parse_number::<usize>(ATTR, index)?;
    let constant = parse_manual_constant(ATTR, rest)?;
    if index.checked_add(constant.registers()).is_none() {
        return Err(ScriptError::InvalidParameter {
            attribute: ATTR.to_owned(),
            reason: format!("register {index} is out of range"),
        });
    }
    constant.write(target(ctx)?, index);
    Ok(LineKind::Attribute)
}

fn parse_param_named(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    const ATTR: &str = "param_named";
    if !ctx.has_supported_program() {
        return Ok(LineKind::Attribute);
    }
    let tokens = split_params(params);
    let Some((name, rest)) = tokens.split_first() else {
        return Err(wrong_count(ATTR, "at least 3"));
    };
    let constant = parse_manual_constant(ATTR, rest)?;
    let parameters = target(ctx)?;
    let index = resolve_name(ATTR, parameters, name, constant.registers())?;
    constant.write(parameters, index);
    Ok(LineKind::Attribute)
}

fn parse_param_indexed_auto(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    const ATTR: &str = "param_indexed_auto";
    if !ctx.has_supported_program() {
        return Ok(LineKind::Attribute);
    }
    let tokens = split_params(params);
    let Some((index, rest)) = tokens.split_first() else {
        return Err(wrong_count(ATTR, "2 or 3"));
    };
    let index = parse_number::<usize>(ATTR, index)?;
    let (kind, data) = parse_auto_constant(ATTR, rest)?;
    target(ctx)?.set_auto_constant(index, kind, data);
    Ok(LineKind::Attribute)
}

fn parse_param_named_auto(params: &str, ctx: &mut ScriptContext<'_>) -> Result<LineKind, ScriptError> {
    const ATTR: &str = "param_named_auto";
    if !ctx.has_supported_program() {
        return Ok(LineKind::Attribute);
    }
    let tokens = split_params(params);
    let Some((name, rest)) = tokens.split_first() else {
        return Err(wrong_count(ATTR, "2 or 3"));
    };
    let (kind, data) = parse_auto_constant(ATTR, rest)?;
    // matrices span four registers
    let registers = if kind.token().contains("matrix") { 4 } else { 1 };
    let parameters = target(ctx)?;
    let index = resolve_name(ATTR, parameters, name, registers)?;
    parameters.set_auto_constant(index, kind, data);
    Ok(LineKind::Attribute)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags() {
        let test_cases = vec![
            ("float", Some((1, false))),
            ("float3", Some((3, false))),
            ("FLOAT4", Some((4, false))),
            ("int2", Some((2, true))),
            ("matrix4x4", Some((16, false))),
            ("float0", None),
            ("double", None),
            ("floatx", None),
            ("float17", None),
            ("float18446744073709551615", None),
            ("int99999999999999999999", None),
        ];
        for (tag, expected) in test_cases {
            assert_eq!(parse_type_tag("param_indexed", tag).ok(), expected, "{tag}");
        }
    }

    #[test]
    fn test_manual_constant_padding() {
        assert_eq!(
            parse_manual_constant("param_indexed", &["float3", "1", "2", "3"]).unwrap(),
            ManualConstant::Float(vec![1.0, 2.0, 3.0, 0.0])
        );
        assert_eq!(
            parse_manual_constant("param_indexed", &["int", "7"]).unwrap(),
            ManualConstant::Int(vec![7, 0, 0, 0])
        );
        let five = parse_manual_constant("param_indexed", &["float5", "1", "1", "1", "1", "1"]).unwrap();
        assert_eq!(five.registers(), 2);
    }

    #[test]
    fn test_oversized_type_tag_is_an_error() {
        let err = parse_manual_constant("param_indexed", &["float18446744073709551615", "1"]).unwrap_err();
        assert!(matches!(err, ScriptError::UnknownParameterType { .. }));
    }

    #[test]
    fn test_matrix_requires_sixteen_values() {
        let values = vec!["1"; 17];
        for count in [15, 17] {
            let mut tokens = vec!["matrix4x4"];
            tokens.extend_from_slice(&values[..count]);
            let err = parse_manual_constant("param_indexed", &tokens).unwrap_err();
            assert!(matches!(err, ScriptError::ParameterCount { .. }), "{count}");
        }
        let mut tokens = vec!["matrix4x4"];
        tokens.extend_from_slice(&values[..16]);
        assert!(parse_manual_constant("param_indexed", &tokens).is_ok());
    }

    #[test]
    fn test_auto_constant_extras() {
        let test_cases = vec![
            (vec!["worldviewproj_matrix"], true),
            (vec!["worldviewproj_matrix", "0"], false),
            (vec!["light_position", "1"], true),
            (vec!["light_position"], false),
            (vec!["time", "2.5"], true),
            (vec!["time", "x"], false),
            (vec!["no_such_constant"], false),
        ];
        for (tokens, ok) in test_cases {
            assert_eq!(
                parse_auto_constant("param_named_auto", &tokens).is_ok(),
                ok,
                "{tokens:?}"
            );
        }
        assert_eq!(
            parse_auto_constant("param_named_auto", &["time", "2.5"]).unwrap(),
            (AutoConstantType::Time, AutoConstantData::Real(2.5))
        );
    }
}
