//! GPU program definitions and their parameter blocks.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use super::ScriptEnum;
use crate::config::Capabilities;
use crate::error::ScriptError;

/// Language tag of programs written in native assembler.
pub const ASSEMBLER_LANGUAGE: &str = "asm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GpuProgramType {
    Vertex,
    Fragment,
}

impl fmt::Display for GpuProgramType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GpuProgramType::Vertex => "vertex",
            GpuProgramType::Fragment => "fragment",
        })
    }
}

// ─────────────────────────────────────────────────────
// Auto constants
// ─────────────────────────────────────────────────────

/// Extra argument an auto constant takes after its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoConstantExtra {
    None,
    Int,
    Real,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AutoConstantType {
    WorldMatrix,
    InverseWorldMatrix,
    TransposeWorldMatrix,
    InverseTransposeWorldMatrix,
    WorldMatrixArray3x4,
    WorldMatrixArray,
    ViewMatrix,
    InverseViewMatrix,
    TransposeViewMatrix,
    InverseTransposeViewMatrix,
    ProjectionMatrix,
    InverseProjectionMatrix,
    TransposeProjectionMatrix,
    InverseTransposeProjectionMatrix,
    ViewProjMatrix,
    InverseViewProjMatrix,
    TransposeViewProjMatrix,
    InverseTransposeViewProjMatrix,
    WorldViewMatrix,
    InverseWorldViewMatrix,
    TransposeWorldViewMatrix,
    InverseTransposeWorldViewMatrix,
    WorldViewProjMatrix,
    InverseWorldViewProjMatrix,
    TransposeWorldViewProjMatrix,
    InverseTransposeWorldViewProjMatrix,
    RenderTargetFlipping,
    FogColour,
    FogParams,
    AmbientLightColour,
    LightDiffuseColour,
    LightSpecularColour,
    LightAttenuation,
    LightPosition,
    LightDirection,
    LightPositionObjectSpace,
    LightDirectionObjectSpace,
    LightDistanceObjectSpace,
    LightPositionViewSpace,
    LightDirectionViewSpace,
    ShadowExtrusionDistance,
    CameraPosition,
    CameraPositionObjectSpace,
    TextureViewProjMatrix,
    Custom,
    Time,
    Time0X,
    CosTime0X,
    SinTime0X,
    TanTime0X,
    Time0XPacked,
    Time01,
    CosTime01,
    SinTime01,
    TanTime01,
    Time01Packed,
    Time02Pi,
    CosTime02Pi,
    SinTime02Pi,
    TanTime02Pi,
    Time02PiPacked,
    FrameTime,
    Fps,
    ViewportWidth,
    ViewportHeight,
    InverseViewportWidth,
    InverseViewportHeight,
    ViewDirection,
    ViewSideVector,
    ViewUpVector,
    Fov,
    NearClipDistance,
    FarClipDistance,
    PassNumber,
}

impl ScriptEnum for AutoConstantType {
    const TOKENS: &'static [(&'static str, Self)] = &[
        ("world_matrix", Self::WorldMatrix),
        ("inverse_world_matrix", Self::InverseWorldMatrix),
        ("transpose_world_matrix", Self::TransposeWorldMatrix),
        ("inverse_transpose_world_matrix", Self::InverseTransposeWorldMatrix),
        ("world_matrix_array_3x4", Self::WorldMatrixArray3x4),
        ("world_matrix_array", Self::WorldMatrixArray),
        ("view_matrix", Self::ViewMatrix),
        ("inverse_view_matrix", Self::InverseViewMatrix),
        ("transpose_view_matrix", Self::TransposeViewMatrix),
        ("inverse_transpose_view_matrix", Self::InverseTransposeViewMatrix),
        ("projection_matrix", Self::ProjectionMatrix),
        ("inverse_projection_matrix", Self::InverseProjectionMatrix),
        ("transpose_projection_matrix", Self::TransposeProjectionMatrix),
        ("inverse_transpose_projection_matrix", Self::InverseTransposeProjectionMatrix),
        ("viewproj_matrix", Self::ViewProjMatrix),
        ("inverse_viewproj_matrix", Self::InverseViewProjMatrix),
        ("transpose_viewproj_matrix", Self::TransposeViewProjMatrix),
        ("inverse_transpose_viewproj_matrix", Self::InverseTransposeViewProjMatrix),
        ("worldview_matrix", Self::WorldViewMatrix),
        ("inverse_worldview_matrix", Self::InverseWorldViewMatrix),
        ("transpose_worldview_matrix", Self::TransposeWorldViewMatrix),
        ("inverse_transpose_worldview_matrix", Self::InverseTransposeWorldViewMatrix),
        ("worldviewproj_matrix", Self::WorldViewProjMatrix),
        ("inverse_worldviewproj_matrix", Self::InverseWorldViewProjMatrix),
        ("transpose_worldviewproj_matrix", Self::TransposeWorldViewProjMatrix),
        ("inverse_transpose_worldviewproj_matrix", Self::InverseTransposeWorldViewProjMatrix),
        ("render_target_flipping", Self::RenderTargetFlipping),
        ("fog_colour", Self::FogColour),
        ("fog_params", Self::FogParams),
        ("ambient_light_colour", Self::AmbientLightColour),
        ("light_diffuse_colour", Self::LightDiffuseColour),
        ("light_specular_colour", Self::LightSpecularColour),
        ("light_attenuation", Self::LightAttenuation),
        ("light_position", Self::LightPosition),
        ("light_direction", Self::LightDirection),
        ("light_position_object_space", Self::LightPositionObjectSpace),
        ("light_direction_object_space", Self::LightDirectionObjectSpace),
        ("light_distance_object_space", Self::LightDistanceObjectSpace),
        ("light_position_view_space", Self::LightPositionViewSpace),
        ("light_direction_view_space", Self::LightDirectionViewSpace),
        ("shadow_extrusion_distance", Self::ShadowExtrusionDistance),
        ("camera_position", Self::CameraPosition),
        ("camera_position_object_space", Self::CameraPositionObjectSpace),
        ("texture_viewproj_matrix", Self::TextureViewProjMatrix),
        ("custom", Self::Custom),
        ("time", Self::Time),
        ("time_0_x", Self::Time0X),
        ("costime_0_x", Self::CosTime0X),
        ("sintime_0_x", Self::SinTime0X),
        ("tantime_0_x", Self::TanTime0X),
        ("time_0_x_packed", Self::Time0XPacked),
        ("time_0_1", Self::Time01),
        ("costime_0_1", Self::CosTime01),
        ("sintime_0_1", Self::SinTime01),
        ("tantime_0_1", Self::TanTime01),
        ("time_0_1_packed", Self::Time01Packed),
        ("time_0_2pi", Self::Time02Pi),
        ("costime_0_2pi", Self::CosTime02Pi),
        ("sintime_0_2pi", Self::SinTime02Pi),
        ("tantime_0_2pi", Self::TanTime02Pi),
        ("time_0_2pi_packed", Self::Time02PiPacked),
        ("frame_time", Self::FrameTime),
        ("fps", Self::Fps),
        ("viewport_width", Self::ViewportWidth),
        ("viewport_height", Self::ViewportHeight),
        ("inverse_viewport_width", Self::InverseViewportWidth),
        ("inverse_viewport_height", Self::InverseViewportHeight),
        ("view_direction", Self::ViewDirection),
        ("view_side_vector", Self::ViewSideVector),
        ("view_up_vector", Self::ViewUpVector),
        ("fov", Self::Fov),
        ("near_clip_distance", Self::NearClipDistance),
        ("far_clip_distance", Self::FarClipDistance),
        ("pass_number", Self::PassNumber),
    ];
}

impl AutoConstantType {
    pub fn extra(self) -> AutoConstantExtra {
        use AutoConstantType::*;
        match self {
            LightDiffuseColour
            | LightSpecularColour
            | LightAttenuation
            | LightPosition
            | LightDirection
            | LightPositionObjectSpace
            | LightDirectionObjectSpace
            | LightDistanceObjectSpace
            | LightPositionViewSpace
            | LightDirectionViewSpace
            | ShadowExtrusionDistance
            | Custom => AutoConstantExtra::Int,
            Time | Time0X | CosTime0X | SinTime0X | TanTime0X | Time0XPacked | Time01
            | CosTime01 | SinTime01 | TanTime01 | Time01Packed | Time02Pi | CosTime02Pi
            | SinTime02Pi | TanTime02Pi | Time02PiPacked | FrameTime => AutoConstantExtra::Real,
            _ => AutoConstantExtra::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum AutoConstantData {
    Int(usize),
    Real(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AutoConstantEntry {
    pub index: usize,
    pub kind: AutoConstantType,
    pub data: AutoConstantData,
}

// ─────────────────────────────────────────────────────
// Parameter block
// ─────────────────────────────────────────────────────

/// Constant registers of a program, four components each.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GpuProgramParameters {
    pub float_constants: BTreeMap<usize, [f32; 4]>,
    pub int_constants: BTreeMap<usize, [i32; 4]>,
    pub auto_constants: Vec<AutoConstantEntry>,
    /// Parameter name to first register; only high-level programs have names.
    pub named: BTreeMap<String, usize>,
    #[serde(skip)]
    allows_named: bool,
    #[serde(skip)]
    next_named_register: usize,
}

impl GpuProgramParameters {
    pub fn with_named_parameters() -> Self {
        Self {
            allows_named: true,
            ..Self::default()
        }
    }

    /// Writes `values` into consecutive registers starting at `index`.
    /// A trailing partial register is zero filled.
    pub fn set_constant_floats(&mut self, index: usize, values: &[f32]) {
        for (offset, chunk) in values.chunks(4).enumerate() {
            let mut register = [0.0; 4];
            register[..chunk.len()].copy_from_slice(chunk);
            self.float_constants.insert(index + offset, register);
        }
    }

    pub fn set_constant_ints(&mut self, index: usize, values: &[i32]) {
        for (offset, chunk) in values.chunks(4).enumerate() {
            let mut register = [0; 4];
            register[..chunk.len()].copy_from_slice(chunk);
            self.int_constants.insert(index + offset, register);
        }
    }

    /// Binds an auto constant, replacing any previous one at `index`.
    pub fn set_auto_constant(&mut self, index: usize, kind: AutoConstantType, data: AutoConstantData) {
        let entry = AutoConstantEntry { index, kind, data };
        match self.auto_constants.iter_mut().find(|e| e.index == index) {
            Some(existing) => *existing = entry,
            None => self.auto_constants.push(entry),
        }
    }

    /// Resolves `name` to its first register, reserving `registers`
    /// registers for a name seen for the first time.
    pub fn named_index(&mut self, name: &str, registers: usize) -> Option<usize> {
        if !self.allows_named {
            return None;
        }
        if let Some(&index) = self.named.get(name) {
            return Some(index);
        }
        let index = self.next_named_register;
        self.next_named_register += registers.max(1);
        self.named.insert(name.to_owned(), index);
        Some(index)
    }
}

// ─────────────────────────────────────────────────────
// Programs
// ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuProgram {
    pub name: String,
    pub kind: GpuProgramType,
    pub language: String,
    pub source_file: String,
    /// Assembler syntax code; empty for high-level programs.
    pub syntax: String,
    pub custom_parameters: Vec<(String, String)>,
    pub skeletal_animation: bool,
    pub morph_animation: bool,
    pub pose_animation_count: u16,
    pub default_parameters: GpuProgramParameters,
}

impl GpuProgram {
    pub fn is_high_level(&self) -> bool {
        self.language != ASSEMBLER_LANGUAGE
    }

    pub fn custom_parameter(&self, name: &str) -> Option<&str> {
        self.custom_parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the render system described by `capabilities` can run this program.
    pub fn is_supported_by(&self, capabilities: &Capabilities) -> bool {
        if !self.is_high_level() {
            return capabilities.supports_syntax(&self.syntax);
        }
        if !capabilities.has_language(&self.language) {
            return false;
        }
        let targets = self
            .custom_parameter("profiles")
            .into_iter()
            .chain(self.custom_parameter("target"))
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>();
        targets.is_empty() || targets.iter().any(|t| capabilities.supports_syntax(t))
    }
}

/// Creates programs on behalf of the compiler.
///
/// The compiler only knows programs by name; everything it needs to do to
/// a program after creation goes through here as well.
pub trait ProgramFactory {
    fn create_low_level(
        &mut self,
        name: &str,
        source_file: &str,
        kind: GpuProgramType,
        syntax: &str,
    ) -> Result<(), ScriptError>;

    fn create_high_level(
        &mut self,
        name: &str,
        language: &str,
        kind: GpuProgramType,
    ) -> Result<(), ScriptError>;

    fn set_source_file(&mut self, name: &str, source_file: &str);

    /// Returns false when the program's language does not know `parameter`.
    fn set_named_parameter(&mut self, name: &str, parameter: &str, value: &str) -> bool;

    fn program_mut(&mut self, name: &str) -> Option<&mut GpuProgram>;

    fn is_supported(&self, name: &str) -> bool;
}

#[derive(Debug, Serialize)]
pub struct GpuProgramManager {
    #[serde(skip)]
    capabilities: Capabilities,
    programs: Vec<GpuProgram>,
    #[serde(skip)]
    by_name: HashMap<String, usize>,
}

impl GpuProgramManager {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            programs: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub fn get(&self, name: &str) -> Option<&GpuProgram> {
        self.by_name.get(name).map(|&i| &self.programs[i])
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut GpuProgram> {
        self.by_name.get(name).map(|&i| &mut self.programs[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &GpuProgram> {
        self.programs.iter()
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    fn insert(&mut self, program: GpuProgram) -> Result<(), ScriptError> {
        if self.by_name.contains_key(&program.name) {
            return Err(ScriptError::ProgramCreation {
                program: program.name,
                reason: "a program with this name already exists".to_owned(),
            });
        }
        log::debug!("created {} program {}", program.kind, program.name);
        self.by_name.insert(program.name.clone(), self.programs.len());
        self.programs.push(program);
        Ok(())
    }
}

impl ProgramFactory for GpuProgramManager {
    fn create_low_level(
        &mut self,
        name: &str,
        source_file: &str,
        kind: GpuProgramType,
        syntax: &str,
    ) -> Result<(), ScriptError> {
        self.insert(GpuProgram {
            name: name.to_owned(),
            kind,
            language: ASSEMBLER_LANGUAGE.to_owned(),
            source_file: source_file.to_owned(),
            syntax: syntax.to_owned(),
            custom_parameters: Vec::new(),
            skeletal_animation: false,
            morph_animation: false,
            pose_animation_count: 0,
            default_parameters: GpuProgramParameters::default(),
        })
    }

    fn create_high_level(
        &mut self,
        name: &str,
        language: &str,
        kind: GpuProgramType,
    ) -> Result<(), ScriptError> {
        if !self.capabilities.has_language(language) {
            return Err(ScriptError::ProgramCreation {
                program: name.to_owned(),
                reason: format!("no high-level program support for language '{language}'"),
            });
        }
        self.insert(GpuProgram {
            name: name.to_owned(),
            kind,
            language: language.to_owned(),
            source_file: String::new(),
            syntax: String::new(),
            custom_parameters: Vec::new(),
            skeletal_animation: false,
            morph_animation: false,
            pose_animation_count: 0,
            default_parameters: GpuProgramParameters::with_named_parameters(),
        })
    }

    fn set_source_file(&mut self, name: &str, source_file: &str) {
        if let Some(program) = self.get_mut(name) {
            program.source_file = source_file.to_owned();
        }
    }

    fn set_named_parameter(&mut self, name: &str, parameter: &str, value: &str) -> bool {
        let Some(&index) = self.by_name.get(name) else {
            return false;
        };
        let program = &mut self.programs[index];
        let known = self
            .capabilities
            .language_parameters(&program.language)
            .is_some_and(|names| names.iter().any(|n| n == parameter));
        if !known {
            return false;
        }
        match program
            .custom_parameters
            .iter_mut()
            .find(|(n, _)| n == parameter)
        {
            Some(entry) => entry.1 = value.to_owned(),
            None => program
                .custom_parameters
                .push((parameter.to_owned(), value.to_owned())),
        }
        true
    }

    fn program_mut(&mut self, name: &str) -> Option<&mut GpuProgram> {
        self.get_mut(name)
    }

    fn is_supported(&self, name: &str) -> bool {
        self.get(name)
            .is_some_and(|p| p.is_supported_by(&self.capabilities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_registers_zero_filled() {
        let mut params = GpuProgramParameters::default();
        params.set_constant_floats(2, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(params.float_constants[&2], [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(params.float_constants[&3], [5.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_named_index_allocation() {
        let mut low = GpuProgramParameters::default();
        assert_eq!(low.named_index("tint", 1), None);

        let mut high = GpuProgramParameters::with_named_parameters();
        assert_eq!(high.named_index("world", 4), Some(0));
        assert_eq!(high.named_index("tint", 1), Some(4));
        assert_eq!(high.named_index("world", 4), Some(0));
        assert_eq!(high.named_index("scale", 1), Some(5));
    }

    #[test]
    fn test_auto_constant_replaces_same_index() {
        let mut params = GpuProgramParameters::default();
        params.set_auto_constant(0, AutoConstantType::WorldMatrix, AutoConstantData::Int(0));
        params.set_auto_constant(0, AutoConstantType::ViewMatrix, AutoConstantData::Int(0));
        assert_eq!(params.auto_constants.len(), 1);
        assert_eq!(params.auto_constants[0].kind, AutoConstantType::ViewMatrix);
    }

    #[test]
    fn test_auto_constant_extras() {
        let test_cases = vec![
            ("worldviewproj_matrix", AutoConstantExtra::None),
            ("light_position_object_space", AutoConstantExtra::Int),
            ("custom", AutoConstantExtra::Int),
            ("sintime_0_2pi", AutoConstantExtra::Real),
        ];
        for (token, expected) in test_cases {
            let kind = AutoConstantType::lookup(token).unwrap();
            assert_eq!(kind.extra(), expected, "{token}");
        }
    }

    #[test]
    fn test_program_support() {
        let mut manager = GpuProgramManager::new(Capabilities::default());
        manager
            .create_low_level("A", "a.asm", GpuProgramType::Vertex, "vs_1_1")
            .unwrap();
        manager
            .create_low_level("B", "b.asm", GpuProgramType::Vertex, "vs_9_9")
            .unwrap();
        manager
            .create_high_level("C", "cg", GpuProgramType::Fragment)
            .unwrap();
        assert!(manager.set_named_parameter("C", "profiles", "ps_9_9 arbfp1"));
        assert!(!manager.set_named_parameter("C", "attach", "x"));

        assert!(manager.is_supported("A"));
        assert!(!manager.is_supported("B"));
        assert!(manager.is_supported("C"));
        assert!(!manager.is_supported("missing"));

        let err = manager
            .create_high_level("D", "unknown", GpuProgramType::Vertex)
            .unwrap_err();
        assert!(matches!(err, ScriptError::ProgramCreation { .. }));
        let err = manager
            .create_low_level("A", "a.asm", GpuProgramType::Vertex, "vs_1_1")
            .unwrap_err();
        assert!(matches!(err, ScriptError::ProgramCreation { .. }));
    }
}
