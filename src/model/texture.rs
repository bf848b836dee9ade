//! Texture units: one texture sampling stage of a pass.

use serde::Serialize;

use super::{ColourValue, CompareFunction, SceneBlend, SceneBlendFactor, ScriptEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextureType {
    OneD,
    TwoD,
    ThreeD,
    Cubic,
}

impl ScriptEnum for TextureType {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("1d", Self::OneD),
        ("2d", Self::TwoD),
        ("3d", Self::ThreeD),
        ("cubic", Self::Cubic),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextureAddressingMode {
    Wrap,
    Clamp,
    Mirror,
    Border,
}

impl ScriptEnum for TextureAddressingMode {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("wrap", Self::Wrap),
        ("clamp", Self::Clamp),
        ("mirror", Self::Mirror),
        ("border", Self::Border),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UvwAddressingMode {
    pub u: TextureAddressingMode,
    pub v: TextureAddressingMode,
    pub w: TextureAddressingMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FilterOptions {
    None,
    Point,
    Linear,
    Anisotropic,
}

impl ScriptEnum for FilterOptions {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("none", Self::None),
        ("point", Self::Point),
        ("linear", Self::Linear),
        ("anisotropic", Self::Anisotropic),
    ];
}

/// The one-word form of `filtering`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilterPreset {
    None,
    Bilinear,
    Trilinear,
    Anisotropic,
}

impl ScriptEnum for TextureFilterPreset {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("none", Self::None),
        ("bilinear", Self::Bilinear),
        ("trilinear", Self::Trilinear),
        ("anisotropic", Self::Anisotropic),
    ];
}

impl TextureFilterPreset {
    pub fn filtering(self) -> TextureFiltering {
        use FilterOptions::*;
        let (min, mag, mip) = match self {
            TextureFilterPreset::None => (Point, Point, None),
            TextureFilterPreset::Bilinear => (Linear, Linear, Point),
            TextureFilterPreset::Trilinear => (Linear, Linear, Linear),
            TextureFilterPreset::Anisotropic => (Anisotropic, Anisotropic, Linear),
        };
        TextureFiltering { min, mag, mip }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TextureFiltering {
    pub min: FilterOptions,
    pub mag: FilterOptions,
    pub mip: FilterOptions,
}

/// Simple blend modes of `colour_op`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerBlendType {
    Replace,
    Add,
    Modulate,
    AlphaBlend,
}

impl ScriptEnum for LayerBlendType {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("replace", Self::Replace),
        ("add", Self::Add),
        ("modulate", Self::Modulate),
        ("alpha_blend", Self::AlphaBlend),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayerBlendOperation {
    Source1,
    Source2,
    Modulate,
    ModulateX2,
    ModulateX4,
    Add,
    AddSigned,
    AddSmooth,
    Subtract,
    BlendDiffuseAlpha,
    BlendTextureAlpha,
    BlendCurrentAlpha,
    BlendManual,
    DotProduct,
    BlendDiffuseColour,
}

impl ScriptEnum for LayerBlendOperation {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("source1", Self::Source1),
        ("source2", Self::Source2),
        ("modulate", Self::Modulate),
        ("modulate_x2", Self::ModulateX2),
        ("modulate_x4", Self::ModulateX4),
        ("add", Self::Add),
        ("add_signed", Self::AddSigned),
        ("add_smooth", Self::AddSmooth),
        ("subtract", Self::Subtract),
        ("blend_diffuse_alpha", Self::BlendDiffuseAlpha),
        ("blend_texture_alpha", Self::BlendTextureAlpha),
        ("blend_current_alpha", Self::BlendCurrentAlpha),
        ("blend_manual", Self::BlendManual),
        ("dotproduct", Self::DotProduct),
        ("blend_diffuse_colour", Self::BlendDiffuseColour),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LayerBlendSource {
    Current,
    Texture,
    Diffuse,
    Specular,
    Manual,
}

impl ScriptEnum for LayerBlendSource {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("src_current", Self::Current),
        ("src_texture", Self::Texture),
        ("src_diffuse", Self::Diffuse),
        ("src_specular", Self::Specular),
        ("src_manual", Self::Manual),
    ];
}

/// Colour blend stage setup; `src_manual` sources read the manual values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColourBlendMode {
    pub operation: LayerBlendOperation,
    pub source1: LayerBlendSource,
    pub source2: LayerBlendSource,
    pub colour_arg1: ColourValue,
    pub colour_arg2: ColourValue,
    pub factor: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlphaBlendMode {
    pub operation: LayerBlendOperation,
    pub source1: LayerBlendSource,
    pub source2: LayerBlendSource,
    pub alpha_arg1: f32,
    pub alpha_arg2: f32,
    pub factor: f32,
}

impl Default for ColourBlendMode {
    fn default() -> Self {
        Self {
            operation: LayerBlendOperation::Modulate,
            source1: LayerBlendSource::Texture,
            source2: LayerBlendSource::Current,
            colour_arg1: ColourValue::WHITE,
            colour_arg2: ColourValue::WHITE,
            factor: 0.0,
        }
    }
}

impl Default for AlphaBlendMode {
    fn default() -> Self {
        Self {
            operation: LayerBlendOperation::Modulate,
            source1: LayerBlendSource::Texture,
            source2: LayerBlendSource::Current,
            alpha_arg1: 1.0,
            alpha_arg2: 1.0,
            factor: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EnvMapType {
    Spherical,
    Planar,
    CubicReflection,
    CubicNormal,
}

impl ScriptEnum for EnvMapType {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("spherical", Self::Spherical),
        ("planar", Self::Planar),
        ("cubic_reflection", Self::CubicReflection),
        ("cubic_normal", Self::CubicNormal),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TextureTransformType {
    ScrollX,
    ScrollY,
    Rotate,
    ScaleX,
    ScaleY,
}

impl ScriptEnum for TextureTransformType {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("scroll_x", Self::ScrollX),
        ("scroll_y", Self::ScrollY),
        ("rotate", Self::Rotate),
        ("scale_x", Self::ScaleX),
        ("scale_y", Self::ScaleY),
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WaveformType {
    Sine,
    Triangle,
    Square,
    Sawtooth,
    InverseSawtooth,
}

impl ScriptEnum for WaveformType {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("sine", Self::Sine),
        ("triangle", Self::Triangle),
        ("square", Self::Square),
        ("sawtooth", Self::Sawtooth),
        ("inverse_sawtooth", Self::InverseSawtooth),
    ];
}

/// Time-varying texture coordinate effects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum TextureEffect {
    EnvironmentMap(EnvMapType),
    ScrollAnim {
        u_speed: f32,
        v_speed: f32,
    },
    RotateAnim {
        speed: f32,
    },
    Transform {
        transform: TextureTransformType,
        waveform: WaveformType,
        base: f32,
        frequency: f32,
        phase: f32,
        amplitude: f32,
    },
}

/// Texture provided by an external source plugin instead of a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExternalTextureSource {
    pub plugin: String,
    pub parameters: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextureUnitState {
    pub name: Option<String>,
    pub texture_alias: Option<String>,
    /// One entry for a plain texture, several for animated or six-face cubic textures.
    pub frames: Vec<String>,
    pub texture_type: TextureType,
    pub cubic: bool,
    pub animation_duration: f32,
    pub tex_coord_set: u32,
    pub address_mode: UvwAddressingMode,
    pub border_colour: ColourValue,
    pub filtering: TextureFiltering,
    pub max_anisotropy: u32,
    pub colour_blend: ColourBlendMode,
    pub alpha_blend: AlphaBlendMode,
    pub colour_blend_fallback: SceneBlend,
    pub alpha_rejection: (CompareFunction, u8),
    pub scroll: (f32, f32),
    pub rotation: f32,
    pub scale: (f32, f32),
    pub effects: Vec<TextureEffect>,
    pub external_source: Option<ExternalTextureSource>,
}

impl Default for TextureUnitState {
    fn default() -> Self {
        Self {
            name: None,
            texture_alias: None,
            frames: Vec::new(),
            texture_type: TextureType::TwoD,
            cubic: false,
            animation_duration: 0.0,
            tex_coord_set: 0,
            address_mode: UvwAddressingMode {
                u: TextureAddressingMode::Wrap,
                v: TextureAddressingMode::Wrap,
                w: TextureAddressingMode::Wrap,
            },
            border_colour: ColourValue::BLACK,
            filtering: TextureFilterPreset::Bilinear.filtering(),
            max_anisotropy: 1,
            colour_blend: ColourBlendMode::default(),
            alpha_blend: AlphaBlendMode::default(),
            colour_blend_fallback: SceneBlend {
                source: SceneBlendFactor::DestColour,
                dest: SceneBlendFactor::Zero,
            },
            alpha_rejection: (CompareFunction::AlwaysPass, 0),
            scroll: (0.0, 0.0),
            rotation: 0.0,
            scale: (1.0, 1.0),
            effects: Vec::new(),
            external_source: None,
        }
    }
}

/// Most frames an animated texture may have.
pub const MAX_ANIMATION_FRAMES: usize = 32;

const CUBE_FACE_SUFFIXES: [&str; 6] = ["_fr", "_bk", "_lf", "_rt", "_up", "_dn"];

/// Splits `name.ext` into `("name", ".ext")`; the extension may be empty.
fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => name.split_at(pos),
        None => (name, ""),
    }
}

impl TextureUnitState {
    pub fn texture_name(&self) -> Option<&str> {
        self.frames.first().map(String::as_str)
    }

    pub fn set_texture_name(&mut self, name: &str) {
        self.frames = vec![name.to_owned()];
        self.animation_duration = 0.0;
        self.cubic = false;
    }

    /// `base.ext` with `frames` frames becomes `base_0.ext`, `base_1.ext`, …
    pub fn set_animated_texture_base(&mut self, base: &str, frames: usize, duration: f32) {
        let (stem, ext) = split_extension(base);
        self.frames = (0..frames).map(|i| format!("{stem}_{i}{ext}")).collect();
        self.animation_duration = duration;
        self.cubic = false;
    }

    pub fn set_animated_texture_frames(&mut self, frames: &[&str], duration: f32) {
        self.frames = frames.iter().map(|f| (*f).to_owned()).collect();
        self.animation_duration = duration;
        self.cubic = false;
    }

    /// Combined UVW keeps one cube map texture; otherwise six 2D faces are derived.
    pub fn set_cubic_texture_base(&mut self, base: &str, combined_uvw: bool) {
        if combined_uvw {
            self.frames = vec![base.to_owned()];
            self.texture_type = TextureType::Cubic;
        } else {
            let (stem, ext) = split_extension(base);
            self.frames = CUBE_FACE_SUFFIXES
                .iter()
                .map(|suffix| format!("{stem}{suffix}{ext}"))
                .collect();
            self.texture_type = TextureType::TwoD;
        }
        self.cubic = true;
        self.animation_duration = 0.0;
    }

    pub fn set_cubic_texture_faces(&mut self, faces: &[&str]) {
        self.frames = faces.iter().map(|f| (*f).to_owned()).collect();
        self.texture_type = TextureType::TwoD;
        self.cubic = true;
        self.animation_duration = 0.0;
    }

    /// Picks the blend stage and multipass fallback matching a simple mode.
    pub fn set_colour_operation(&mut self, blend: LayerBlendType) {
        use LayerBlendOperation as Op;
        use SceneBlendFactor::*;
        let (operation, fallback) = match blend {
            LayerBlendType::Replace => (Op::Source1, (One, Zero)),
            LayerBlendType::Add => (Op::Add, (One, One)),
            LayerBlendType::Modulate => (Op::Modulate, (DestColour, Zero)),
            LayerBlendType::AlphaBlend => {
                (Op::BlendTextureAlpha, (SourceAlpha, OneMinusSourceAlpha))
            }
        };
        self.colour_blend = ColourBlendMode {
            operation,
            ..ColourBlendMode::default()
        };
        self.colour_blend_fallback = SceneBlend {
            source: fallback.0,
            dest: fallback.1,
        };
    }

    pub fn set_environment_map(&mut self, env: Option<EnvMapType>) {
        self.effects
            .retain(|e| !matches!(e, TextureEffect::EnvironmentMap(_)));
        if let Some(env) = env {
            self.effects.push(TextureEffect::EnvironmentMap(env));
        }
    }

    pub fn set_scroll_animation(&mut self, u_speed: f32, v_speed: f32) {
        self.effects
            .retain(|e| !matches!(e, TextureEffect::ScrollAnim { .. }));
        self.effects
            .push(TextureEffect::ScrollAnim { u_speed, v_speed });
    }

    pub fn set_rotate_animation(&mut self, speed: f32) {
        self.effects
            .retain(|e| !matches!(e, TextureEffect::RotateAnim { .. }));
        self.effects.push(TextureEffect::RotateAnim { speed });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_animated_frame_names() {
        let mut unit = TextureUnitState::default();
        unit.set_animated_texture_base("flame.png", 3, 1.5);
        assert_eq!(unit.frames, vec!["flame_0.png", "flame_1.png", "flame_2.png"]);
        assert_eq!(unit.animation_duration, 1.5);
    }

    #[test]
    fn test_cubic_face_names() {
        let mut unit = TextureUnitState::default();
        unit.set_cubic_texture_base("sky.jpg", false);
        assert_eq!(
            unit.frames,
            vec!["sky_fr.jpg", "sky_bk.jpg", "sky_lf.jpg", "sky_rt.jpg", "sky_up.jpg", "sky_dn.jpg"]
        );
        assert!(unit.cubic);

        unit.set_cubic_texture_base("sky.dds", true);
        assert_eq!(unit.frames, vec!["sky.dds"]);
        assert_eq!(unit.texture_type, TextureType::Cubic);
    }

    #[test]
    fn test_effects_replace_previous() {
        let mut unit = TextureUnitState::default();
        unit.set_scroll_animation(0.1, 0.0);
        unit.set_scroll_animation(0.2, 0.3);
        unit.set_environment_map(Some(EnvMapType::Spherical));
        unit.set_environment_map(None);
        assert_eq!(
            unit.effects,
            vec![TextureEffect::ScrollAnim {
                u_speed: 0.2,
                v_speed: 0.3
            }]
        );
    }
}
