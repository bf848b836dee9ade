//! Parameter parsing shared by the handlers.

use std::str::FromStr;

use crate::error::ScriptError;
use crate::model::{ColourValue, ScriptEnum};

pub fn split_params(params: &str) -> Vec<&str> {
    params.split_whitespace().collect()
}

pub fn wrong_count(attribute: &str, expected: &str) -> ScriptError {
    ScriptError::ParameterCount {
        attribute: attribute.to_owned(),
        expected: expected.to_owned(),
    }
}

/// Fails unless `tokens` has exactly one of the `allowed` lengths.
pub fn expect_count(attribute: &str, tokens: &[&str], allowed: &[usize]) -> Result<(), ScriptError> {
    if allowed.contains(&tokens.len()) {
        return Ok(());
    }
    let expected = allowed
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(" or ");
    Err(wrong_count(attribute, &expected))
}

pub fn parse_number<T: FromStr>(attribute: &str, token: &str) -> Result<T, ScriptError> {
    token.parse().map_err(|_| ScriptError::InvalidNumber {
        attribute: attribute.to_owned(),
        value: token.to_owned(),
    })
}

pub fn parse_reals(attribute: &str, tokens: &[&str]) -> Result<Vec<f32>, ScriptError> {
    tokens.iter().map(|t| parse_number(attribute, t)).collect()
}

pub fn parse_enum<T: ScriptEnum>(attribute: &str, token: &str) -> Result<T, ScriptError> {
    T::lookup(token).ok_or_else(|| ScriptError::InvalidValue {
        attribute: attribute.to_owned(),
        value: token.to_owned(),
        legal: T::legal_values(),
    })
}

/// Two-word switch such as `on`/`off` or `true`/`false`.
pub fn parse_switch(attribute: &str, token: &str, (on, off): (&str, &str)) -> Result<bool, ScriptError> {
    if token.eq_ignore_ascii_case(on) {
        Ok(true)
    } else if token.eq_ignore_ascii_case(off) {
        Ok(false)
    } else {
        Err(ScriptError::InvalidValue {
            attribute: attribute.to_owned(),
            value: token.to_owned(),
            legal: format!("'{on}' or '{off}'"),
        })
    }
}

pub fn parse_on_off(attribute: &str, params: &str) -> Result<bool, ScriptError> {
    let tokens = split_params(params);
    expect_count(attribute, &tokens, &[1])?;
    parse_switch(attribute, tokens[0], ("on", "off"))
}

pub fn parse_true_false(attribute: &str, params: &str) -> Result<bool, ScriptError> {
    let tokens = split_params(params);
    expect_count(attribute, &tokens, &[1])?;
    parse_switch(attribute, tokens[0], ("true", "false"))
}

/// `r g b [a]`; alpha defaults to one.
pub fn parse_colour(attribute: &str, tokens: &[&str]) -> Result<ColourValue, ScriptError> {
    expect_count(attribute, tokens, &[3, 4])?;
    let c = parse_reals(attribute, tokens)?;
    Ok(ColourValue::new(c[0], c[1], c[2], c.get(3).copied().unwrap_or(1.0)))
}
