//! Per-section keyword handlers.
mod material;
mod params;
mod pass;
mod program;
mod texture_unit;
mod values;

use super::dispatch::Attribute;

/// Every handler table; the registry is built from these.
pub const ALL: &[&[Attribute]] = &[
    material::ATTRIBUTES,
    pass::ATTRIBUTES,
    texture_unit::ATTRIBUTES,
    program::ATTRIBUTES,
    params::ATTRIBUTES,
];
