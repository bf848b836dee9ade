//! In-memory object graph built by the compiler.
//!
//! Materials own techniques, techniques own passes, passes own texture
//! units and program bindings. GPU programs live in their own manager and
//! are referenced from passes by name.
pub mod material;
pub mod program;
pub mod texture;

pub use material::*;
pub use program::*;
pub use texture::*;

use serde::Serialize;

use crate::config::Capabilities;

/// RGBA colour, components nominally in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColourValue {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColourValue {
    pub const WHITE: ColourValue = ColourValue::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: ColourValue = ColourValue::new(0.0, 0.0, 0.0, 1.0);
    pub const ZERO: ColourValue = ColourValue::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

/// An enum whose values are spelled as fixed tokens in scripts.
///
/// `TOKENS` maps every accepted spelling to its value; the first spelling
/// listed for a value is the canonical one used when writing scripts.
pub trait ScriptEnum: Copy + PartialEq + 'static {
    const TOKENS: &'static [(&'static str, Self)];

    /// Case-insensitive token lookup.
    fn lookup(token: &str) -> Option<Self> {
        Self::TOKENS
            .iter()
            .find(|(t, _)| t.eq_ignore_ascii_case(token))
            .map(|(_, v)| *v)
    }

    /// Human readable list of accepted tokens, for error messages.
    fn legal_values() -> String {
        Self::TOKENS
            .iter()
            .map(|(t, _)| format!("'{t}'"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn token(self) -> &'static str {
        Self::TOKENS
            .iter()
            .find(|(_, v)| *v == self)
            .map(|(t, _)| *t)
            .unwrap_or("")
    }
}

/// Everything a set of scripts compiles into.
#[derive(Debug, Serialize)]
pub struct ResourceRegistry {
    pub materials: MaterialManager,
    pub programs: GpuProgramManager,
}

impl ResourceRegistry {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            materials: MaterialManager::default(),
            programs: GpuProgramManager::new(capabilities),
        }
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new(Capabilities::default())
    }
}
