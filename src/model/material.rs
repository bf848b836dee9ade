//! Materials, techniques and passes.

use std::collections::HashMap;

use serde::Serialize;

use super::{ColourValue, GpuProgramParameters, GpuProgramType, ScriptEnum, TextureUnitState};
use crate::error::ScriptError;

// ─────────────────────────────────────────────────────
// Render state enums
// ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SceneBlendFactor {
    One,
    Zero,
    DestColour,
    SourceColour,
    OneMinusDestColour,
    OneMinusSourceColour,
    DestAlpha,
    SourceAlpha,
    OneMinusDestAlpha,
    OneMinusSourceAlpha,
}

impl ScriptEnum for SceneBlendFactor {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("one", Self::One),
        ("zero", Self::Zero),
        ("dest_colour", Self::DestColour),
        ("src_colour", Self::SourceColour),
        ("one_minus_dest_colour", Self::OneMinusDestColour),
        ("one_minus_src_colour", Self::OneMinusSourceColour),
        ("dest_alpha", Self::DestAlpha),
        ("src_alpha", Self::SourceAlpha),
        ("one_minus_dest_alpha", Self::OneMinusDestAlpha),
        ("one_minus_src_alpha", Self::OneMinusSourceAlpha),
    ];
}

/// Shorthand blend modes accepted by the one-parameter form of `scene_blend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneBlendType {
    Add,
    Modulate,
    AlphaBlend,
    ColourBlend,
}

impl ScriptEnum for SceneBlendType {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("add", Self::Add),
        ("modulate", Self::Modulate),
        ("alpha_blend", Self::AlphaBlend),
        ("colour_blend", Self::ColourBlend),
    ];
}

impl SceneBlendType {
    pub fn factors(self) -> SceneBlend {
        use SceneBlendFactor::*;
        let (source, dest) = match self {
            SceneBlendType::Add => (One, One),
            SceneBlendType::Modulate => (DestColour, Zero),
            SceneBlendType::AlphaBlend => (SourceAlpha, OneMinusSourceAlpha),
            SceneBlendType::ColourBlend => (SourceColour, OneMinusSourceColour),
        };
        SceneBlend { source, dest }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SceneBlend {
    pub source: SceneBlendFactor,
    pub dest: SceneBlendFactor,
}

impl SceneBlend {
    pub const REPLACE: SceneBlend = SceneBlend {
        source: SceneBlendFactor::One,
        dest: SceneBlendFactor::Zero,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CompareFunction {
    AlwaysFail,
    AlwaysPass,
    Less,
    LessEqual,
    Equal,
    NotEqual,
    GreaterEqual,
    Greater,
}

impl ScriptEnum for CompareFunction {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("always_fail", Self::AlwaysFail),
        ("always_pass", Self::AlwaysPass),
        ("less", Self::Less),
        ("less_equal", Self::LessEqual),
        ("equal", Self::Equal),
        ("not_equal", Self::NotEqual),
        ("greater_equal", Self::GreaterEqual),
        ("greater", Self::Greater),
    ];
}

/// Hardware culling, expressed as the vertex winding that gets culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CullingMode {
    None,
    Clockwise,
    Anticlockwise,
}

impl ScriptEnum for CullingMode {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("none", Self::None),
        ("clockwise", Self::Clockwise),
        ("anticlockwise", Self::Anticlockwise),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ManualCullingMode {
    None,
    Back,
    Front,
}

impl ScriptEnum for ManualCullingMode {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("none", Self::None),
        ("back", Self::Back),
        ("front", Self::Front),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ShadeOptions {
    Flat,
    Gouraud,
    Phong,
}

impl ScriptEnum for ShadeOptions {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("flat", Self::Flat),
        ("gouraud", Self::Gouraud),
        ("phong", Self::Phong),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LightType {
    Point,
    Directional,
    Spot,
}

impl ScriptEnum for LightType {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("point", Self::Point),
        ("directional", Self::Directional),
        ("spot", Self::Spot),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FogMode {
    None,
    Linear,
    Exp,
    Exp2,
}

impl ScriptEnum for FogMode {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("none", Self::None),
        ("linear", Self::Linear),
        ("exp", Self::Exp),
        ("exp2", Self::Exp2),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PassIteration {
    Once,
    /// Run once per light, optionally only for lights of one type.
    OncePerLight(Option<LightType>),
}

/// Which material colours follow the vertex colour instead of a constant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VertexColourTracking {
    pub ambient: bool,
    pub diffuse: bool,
    pub specular: bool,
    pub emissive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FogSettings {
    /// When false the scene fog applies and the rest is ignored.
    pub override_scene: bool,
    pub mode: FogMode,
    pub colour: ColourValue,
    pub density: f32,
    pub start: f32,
    pub end: f32,
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            override_scene: false,
            mode: FogMode::None,
            colour: ColourValue::WHITE,
            density: 0.001,
            start: 0.0,
            end: 1.0,
        }
    }
}

// ─────────────────────────────────────────────────────
// Program bindings
// ─────────────────────────────────────────────────────

/// The six places a pass can bind a GPU program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProgramSlot {
    Vertex,
    Fragment,
    ShadowCasterVertex,
    ShadowCasterFragment,
    ShadowReceiverVertex,
    ShadowReceiverFragment,
}

impl ProgramSlot {
    pub const ALL: [ProgramSlot; 6] = [
        ProgramSlot::Vertex,
        ProgramSlot::Fragment,
        ProgramSlot::ShadowCasterVertex,
        ProgramSlot::ShadowCasterFragment,
        ProgramSlot::ShadowReceiverVertex,
        ProgramSlot::ShadowReceiverFragment,
    ];

    pub fn kind(self) -> GpuProgramType {
        match self {
            ProgramSlot::Vertex
            | ProgramSlot::ShadowCasterVertex
            | ProgramSlot::ShadowReceiverVertex => GpuProgramType::Vertex,
            ProgramSlot::Fragment
            | ProgramSlot::ShadowCasterFragment
            | ProgramSlot::ShadowReceiverFragment => GpuProgramType::Fragment,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            ProgramSlot::Vertex => "vertex_program_ref",
            ProgramSlot::Fragment => "fragment_program_ref",
            ProgramSlot::ShadowCasterVertex => "shadow_caster_vertex_program_ref",
            ProgramSlot::ShadowCasterFragment => "shadow_caster_fragment_program_ref",
            ProgramSlot::ShadowReceiverVertex => "shadow_receiver_vertex_program_ref",
            ProgramSlot::ShadowReceiverFragment => "shadow_receiver_fragment_program_ref",
        }
    }
}

/// A pass's use of a program, with its own copy of the parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramBinding {
    pub program: String,
    pub parameters: GpuProgramParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgramBindings {
    pub vertex: Option<ProgramBinding>,
    pub fragment: Option<ProgramBinding>,
    pub shadow_caster_vertex: Option<ProgramBinding>,
    pub shadow_caster_fragment: Option<ProgramBinding>,
    pub shadow_receiver_vertex: Option<ProgramBinding>,
    pub shadow_receiver_fragment: Option<ProgramBinding>,
}

impl ProgramBindings {
    pub fn slot(&self, slot: ProgramSlot) -> Option<&ProgramBinding> {
        match slot {
            ProgramSlot::Vertex => self.vertex.as_ref(),
            ProgramSlot::Fragment => self.fragment.as_ref(),
            ProgramSlot::ShadowCasterVertex => self.shadow_caster_vertex.as_ref(),
            ProgramSlot::ShadowCasterFragment => self.shadow_caster_fragment.as_ref(),
            ProgramSlot::ShadowReceiverVertex => self.shadow_receiver_vertex.as_ref(),
            ProgramSlot::ShadowReceiverFragment => self.shadow_receiver_fragment.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, slot: ProgramSlot) -> &mut Option<ProgramBinding> {
        match slot {
            ProgramSlot::Vertex => &mut self.vertex,
            ProgramSlot::Fragment => &mut self.fragment,
            ProgramSlot::ShadowCasterVertex => &mut self.shadow_caster_vertex,
            ProgramSlot::ShadowCasterFragment => &mut self.shadow_caster_fragment,
            ProgramSlot::ShadowReceiverVertex => &mut self.shadow_receiver_vertex,
            ProgramSlot::ShadowReceiverFragment => &mut self.shadow_receiver_fragment,
        }
    }
}

// ─────────────────────────────────────────────────────
// Object graph
// ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pass {
    pub name: Option<String>,
    pub index: usize,
    pub ambient: ColourValue,
    pub diffuse: ColourValue,
    pub specular: ColourValue,
    pub emissive: ColourValue,
    pub shininess: f32,
    pub vertex_colour_tracking: VertexColourTracking,
    pub scene_blend: SceneBlend,
    pub depth_check: bool,
    pub depth_write: bool,
    pub depth_func: CompareFunction,
    pub depth_bias_constant: f32,
    pub depth_bias_slope_scale: f32,
    pub cull_hardware: CullingMode,
    pub cull_software: ManualCullingMode,
    pub lighting: bool,
    pub shading: ShadeOptions,
    pub iteration: PassIteration,
    pub max_lights: u16,
    pub fog: FogSettings,
    pub colour_write: bool,
    pub texture_units: Vec<TextureUnitState>,
    pub programs: ProgramBindings,
}

impl Pass {
    pub fn new(index: usize) -> Self {
        Self {
            name: None,
            index,
            ambient: ColourValue::WHITE,
            diffuse: ColourValue::WHITE,
            specular: ColourValue::ZERO,
            emissive: ColourValue::ZERO,
            shininess: 0.0,
            vertex_colour_tracking: VertexColourTracking::default(),
            scene_blend: SceneBlend::REPLACE,
            depth_check: true,
            depth_write: true,
            depth_func: CompareFunction::LessEqual,
            depth_bias_constant: 0.0,
            depth_bias_slope_scale: 0.0,
            cull_hardware: CullingMode::Clockwise,
            cull_software: ManualCullingMode::Back,
            lighting: true,
            shading: ShadeOptions::Gouraud,
            iteration: PassIteration::Once,
            max_lights: 8,
            fog: FogSettings::default(),
            colour_write: true,
            texture_units: Vec::new(),
            programs: ProgramBindings::default(),
        }
    }

    /// Appends a texture unit and returns its index.
    pub fn create_texture_unit(&mut self) -> usize {
        self.texture_units.push(TextureUnitState::default());
        self.texture_units.len() - 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Technique {
    pub name: Option<String>,
    pub lod_index: u16,
    pub passes: Vec<Pass>,
}

impl Technique {
    /// Appends a pass and returns its index.
    pub fn create_pass(&mut self) -> usize {
        let index = self.passes.len();
        self.passes.push(Pass::new(index));
        index
    }

    pub fn pass_index(&self, name: &str) -> Option<usize> {
        self.passes
            .iter()
            .position(|p| p.name.as_deref() == Some(name))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Material {
    pub name: String,
    /// Script the material was declared in.
    pub origin: String,
    pub lod_distances: Vec<f32>,
    pub receive_shadows: bool,
    pub transparency_casts_shadows: bool,
    pub techniques: Vec<Technique>,
}

impl Material {
    /// A fresh material carries one technique with one pass, ready to render.
    pub fn new(name: &str, origin: &str) -> Self {
        let mut technique = Technique::default();
        technique.create_pass();
        Self {
            name: name.to_owned(),
            origin: origin.to_owned(),
            lod_distances: Vec::new(),
            receive_shadows: true,
            transparency_casts_shadows: false,
            techniques: vec![technique],
        }
    }

    /// Appends a technique and returns its index.
    pub fn create_technique(&mut self) -> usize {
        self.techniques.push(Technique::default());
        self.techniques.len() - 1
    }

    pub fn remove_all_techniques(&mut self) {
        self.techniques.clear();
    }

    /// Replaces the texture of every unit whose alias appears in `aliases`.
    /// Returns how many units changed.
    pub fn apply_texture_aliases(&mut self, aliases: &[(String, String)]) -> usize {
        let mut applied = 0;
        for unit in self
            .techniques
            .iter_mut()
            .flat_map(|t| t.passes.iter_mut())
            .flat_map(|p| p.texture_units.iter_mut())
        {
            let Some(alias) = unit.texture_alias.as_deref() else {
                continue;
            };
            if let Some((_, texture)) = aliases.iter().rev().find(|(a, _)| a == alias) {
                unit.set_texture_name(texture);
                applied += 1;
            }
        }
        applied
    }
}

/// Material factory; names are unique and declaration order is kept.
#[derive(Debug, Default, Serialize)]
pub struct MaterialManager {
    materials: Vec<Material>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl MaterialManager {
    /// Creates a material and returns its index.
    pub fn create(&mut self, name: &str, origin: &str) -> Result<usize, ScriptError> {
        if self.by_name.contains_key(name) {
            return Err(ScriptError::DuplicateMaterial(name.to_owned()));
        }
        let index = self.materials.len();
        self.materials.push(Material::new(name, origin));
        self.by_name.insert(name.to_owned(), index);
        Ok(index)
    }

    pub fn get(&self, name: &str) -> Option<&Material> {
        self.by_name.get(name).map(|&i| &self.materials[i])
    }

    pub fn get_index(&self, index: usize) -> Option<&Material> {
        self.materials.get(index)
    }

    pub fn get_index_mut(&mut self, index: usize) -> Option<&mut Material> {
        self.materials.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.iter()
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_material_rejected() {
        let mut manager = MaterialManager::default();
        assert_eq!(manager.create("Rock", "a.material").unwrap(), 0);
        let err = manager.create("Rock", "b.material").unwrap_err();
        assert!(matches!(err, ScriptError::DuplicateMaterial(ref n) if n == "Rock"));
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.get("Rock").unwrap().origin, "a.material");
    }

    #[test]
    fn test_new_material_has_default_technique() {
        let mut material = Material::new("M", "m");
        assert_eq!(material.techniques.len(), 1);
        assert_eq!(material.techniques[0].passes.len(), 1);
        material.remove_all_techniques();
        assert_eq!(material.create_technique(), 0);
    }

    #[test]
    fn test_apply_texture_aliases() {
        let mut material = Material::new("M", "m");
        let pass = &mut material.techniques[0].passes[0];
        let first = pass.create_texture_unit();
        pass.create_texture_unit();
        pass.texture_units[first].texture_alias = Some("DiffuseMap".into());
        pass.texture_units[first].set_texture_name("placeholder.png");

        let aliases = vec![("DiffuseMap".to_string(), "rock.png".to_string())];
        assert_eq!(material.apply_texture_aliases(&aliases), 1);

        let units = &material.techniques[0].passes[0].texture_units;
        assert_eq!(units[0].frames, vec!["rock.png".to_string()]);
        assert!(units[1].frames.is_empty());
    }

    #[test]
    fn test_pass_lookup_by_name() {
        let mut technique = Technique::default();
        let a = technique.create_pass();
        technique.passes[a].name = Some("base".into());
        technique.create_pass();
        assert_eq!(technique.pass_index("base"), Some(0));
        assert_eq!(technique.pass_index("missing"), None);
    }
}
