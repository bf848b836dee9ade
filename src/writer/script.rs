//! Re-emit compiled objects as canonical script text.
//!
//! Only attributes that differ from their defaults are written, so a
//! compiled and exported script parses back into the same objects.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::model::{
    AlphaBlendMode, AutoConstantData, AutoConstantEntry, AutoConstantExtra, ColourBlendMode,
    ColourValue, CompareFunction, CullingMode, GpuProgram, GpuProgramParameters,
    LayerBlendOperation, LayerBlendSource, ManualCullingMode, Material, Pass, PassIteration,
    ProgramSlot, ResourceRegistry, SceneBlend, ScriptEnum, ShadeOptions, TextureEffect,
    TextureType, TextureUnitState,
};

const INDENT: usize = 4;

/// Writes `export.material` with every program followed by every material.
pub fn emit(registry: &ResourceRegistry, out_dir: &Path) -> io::Result<()> {
    let path = out_dir.join("export.material");
    let mut out = BufWriter::new(File::create(&path)?);

    writeln!(out, "// Auto-generated - DO NOT EDIT\n")?;
    for program in registry.programs.iter() {
        write_program(&mut out, program)?;
        writeln!(out)?;
    }
    for material in registry.materials.iter() {
        write_material(&mut out, material)?;
        writeln!(out)?;
    }
    out.flush()?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Tracks indentation while writing nested blocks.
struct BlockWriter<'w, W: Write> {
    out: &'w mut W,
    depth: usize,
}

impl<'w, W: Write> BlockWriter<'w, W> {
    fn new(out: &'w mut W) -> Self {
        Self { out, depth: 0 }
    }

    fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{:width$}{}", "", text, width = self.depth * INDENT)
    }

    fn open(&mut self, header: &str) -> io::Result<()> {
        self.line(header)?;
        self.line("{")?;
        self.depth += 1;
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.depth = self.depth.saturating_sub(1);
        self.line("}")
    }
}

fn colour(c: ColourValue) -> String {
    format!("{} {} {} {}", c.r, c.g, c.b, c.a)
}

fn rgb(c: ColourValue) -> String {
    format!("{} {} {}", c.r, c.g, c.b)
}

/// `keyword` or `keyword name`.
fn header(keyword: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{keyword} {name}"),
        None => keyword.to_owned(),
    }
}

// ── programs ────────────────────────────────────────────────────────

pub fn write_program<W: Write>(out: &mut W, program: &GpuProgram) -> io::Result<()> {
    let mut w = BlockWriter::new(out);
    w.open(&format!("{}_program {} {}", program.kind, program.name, program.language))?;
    w.line(&format!("source {}", program.source_file))?;
    if !program.is_high_level() {
        w.line(&format!("syntax {}", program.syntax))?;
    }
    for (name, value) in &program.custom_parameters {
        w.line(&format!("{name} {value}"))?;
    }
    if program.skeletal_animation {
        w.line("includes_skeletal_animation true")?;
    }
    if program.morph_animation {
        w.line("includes_morph_animation true")?;
    }
    if program.pose_animation_count > 0 {
        w.line(&format!("includes_pose_animation {}", program.pose_animation_count))?;
    }
    if !is_empty(&program.default_parameters) {
        w.open("default_params")?;
        write_parameters(&mut w, &program.default_parameters)?;
        w.close()?;
    }
    w.close()
}

fn is_empty(parameters: &GpuProgramParameters) -> bool {
    parameters.float_constants.is_empty()
        && parameters.int_constants.is_empty()
        && parameters.auto_constants.is_empty()
}

fn join<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(T::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// One `param_*` line per parameter, in register order.
///
/// Registers that carry a name are written with `param_named*` so that
/// parsing the output allocates the same registers again; a named manual
/// constant takes up to three unnamed registers that follow it.
fn write_parameters<W: Write>(w: &mut BlockWriter<'_, W>, parameters: &GpuProgramParameters) -> io::Result<()> {
    let names: BTreeMap<usize, &str> = parameters
        .named
        .iter()
        .map(|(name, &index)| (index, name.as_str()))
        .collect();

    let mut lines = manual_lines(&parameters.float_constants, "float", &names);
    lines.extend(manual_lines(&parameters.int_constants, "int", &names));
    for AutoConstantEntry { index, kind, data } in &parameters.auto_constants {
        let extra = match (kind.extra(), data) {
            (AutoConstantExtra::None, _) => String::new(),
            (_, AutoConstantData::Int(v)) => format!(" {v}"),
            (_, AutoConstantData::Real(v)) => format!(" {v}"),
        };
        let target = match names.get(index) {
            Some(name) => format!("param_named_auto {name}"),
            None => format!("param_indexed_auto {index}"),
        };
        lines.push((*index, format!("{target} {}{extra}", kind.token())));
    }

    lines.sort_by_key(|(index, _)| *index);
    for (_, line) in lines {
        w.line(&line)?;
    }
    Ok(())
}

fn manual_lines<T: ToString + Copy>(
    constants: &BTreeMap<usize, [T; 4]>,
    type_name: &str,
    names: &BTreeMap<usize, &str>,
) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut registers = constants.iter().peekable();
    while let Some((&index, values)) = registers.next() {
        let Some(name) = names.get(&index) else {
            lines.push((index, format!("param_indexed {index} {type_name}4 {}", join(values))));
            continue;
        };
        let mut all = values.to_vec();
        let mut next = index + 1;
        while let Some(&(&following, more)) = registers.peek() {
            if following != next || names.contains_key(&following) || all.len() >= 16 {
                break;
            }
            all.extend_from_slice(more);
            next += 1;
            registers.next();
        }
        lines.push((
            index,
            format!("param_named {name} {type_name}{} {}", all.len(), join(&all)),
        ));
    }
    lines
}

// ── materials ───────────────────────────────────────────────────────

pub fn write_material<W: Write>(out: &mut W, material: &Material) -> io::Result<()> {
    let mut w = BlockWriter::new(out);
    w.open(&format!("material {}", material.name))?;
    if !material.lod_distances.is_empty() {
        w.line(&format!("lod_distances {}", join(&material.lod_distances)))?;
    }
    if !material.receive_shadows {
        w.line("receive_shadows off")?;
    }
    if material.transparency_casts_shadows {
        w.line("transparency_casts_shadows on")?;
    }

    for technique in &material.techniques {
        w.open(&header("technique", technique.name.as_deref()))?;
        if technique.lod_index != 0 {
            w.line(&format!("lod_index {}", technique.lod_index))?;
        }
        for pass in &technique.passes {
            write_pass(&mut w, pass)?;
        }
        w.close()?;
    }
    w.close()
}

/// Material colour, or `vertexcolour` when it tracks the vertex colour.
fn tracked(is_tracked: bool, value: ColourValue) -> String {
    if is_tracked { "vertexcolour".to_owned() } else { colour(value) }
}

fn write_pass<W: Write>(w: &mut BlockWriter<'_, W>, pass: &Pass) -> io::Result<()> {
    let defaults = Pass::new(pass.index);
    let tracking = pass.vertex_colour_tracking;
    w.open(&header("pass", pass.name.as_deref()))?;

    if tracking.ambient || pass.ambient != defaults.ambient {
        w.line(&format!("ambient {}", tracked(tracking.ambient, pass.ambient)))?;
    }
    if tracking.diffuse || pass.diffuse != defaults.diffuse {
        w.line(&format!("diffuse {}", tracked(tracking.diffuse, pass.diffuse)))?;
    }
    if tracking.specular || pass.specular != defaults.specular || pass.shininess != 0.0 {
        let specular = tracked(tracking.specular, pass.specular);
        w.line(&format!("specular {specular} {}", pass.shininess))?;
    }
    if tracking.emissive || pass.emissive != defaults.emissive {
        w.line(&format!("emissive {}", tracked(tracking.emissive, pass.emissive)))?;
    }
    if pass.scene_blend != SceneBlend::REPLACE {
        let SceneBlend { source, dest } = pass.scene_blend;
        w.line(&format!("scene_blend {} {}", source.token(), dest.token()))?;
    }
    if !pass.depth_check {
        w.line("depth_check off")?;
    }
    if !pass.depth_write {
        w.line("depth_write off")?;
    }
    if pass.depth_func != CompareFunction::LessEqual {
        w.line(&format!("depth_func {}", pass.depth_func.token()))?;
    }
    if pass.depth_bias_constant != 0.0 || pass.depth_bias_slope_scale != 0.0 {
        w.line(&format!(
            "depth_bias {} {}",
            pass.depth_bias_constant, pass.depth_bias_slope_scale
        ))?;
    }
    if pass.cull_hardware != CullingMode::Clockwise {
        w.line(&format!("cull_hardware {}", pass.cull_hardware.token()))?;
    }
    if pass.cull_software != ManualCullingMode::Back {
        w.line(&format!("cull_software {}", pass.cull_software.token()))?;
    }
    if !pass.lighting {
        w.line("lighting off")?;
    }
    if pass.shading != ShadeOptions::Gouraud {
        w.line(&format!("shading {}", pass.shading.token()))?;
    }
    match pass.iteration {
        PassIteration::Once => {}
        PassIteration::OncePerLight(None) => w.line("iteration once_per_light")?,
        PassIteration::OncePerLight(Some(light)) => {
            w.line(&format!("iteration once_per_light {}", light.token()))?
        }
    }
    if pass.max_lights != defaults.max_lights {
        w.line(&format!("max_lights {}", pass.max_lights))?;
    }
    if pass.fog.override_scene {
        let fog = pass.fog;
        w.line(&format!(
            "fog_override true {} {} {} {} {}",
            fog.mode.token(),
            rgb(fog.colour),
            fog.density,
            fog.start,
            fog.end
        ))?;
    }
    if !pass.colour_write {
        w.line("colour_write off")?;
    }

    for unit in &pass.texture_units {
        write_texture_unit(w, unit)?;
    }
    for slot in ProgramSlot::ALL {
        if let Some(binding) = pass.programs.slot(slot) {
            w.open(&format!("{} {}", slot.keyword(), binding.program))?;
            write_parameters(w, &binding.parameters)?;
            w.close()?;
        }
    }
    w.close()
}

fn write_texture_unit<W: Write>(w: &mut BlockWriter<'_, W>, unit: &TextureUnitState) -> io::Result<()> {
    let defaults = TextureUnitState::default();
    w.open(&header("texture_unit", unit.name.as_deref()))?;

    if let Some(alias) = &unit.texture_alias {
        w.line(&format!("texture_alias {alias}"))?;
    }
    write_texture_selection(w, unit)?;
    if unit.tex_coord_set != 0 {
        w.line(&format!("tex_coord_set {}", unit.tex_coord_set))?;
    }

    let mode = unit.address_mode;
    if mode != defaults.address_mode {
        if mode.u == mode.v && mode.v == mode.w {
            w.line(&format!("tex_address_mode {}", mode.u.token()))?;
        } else {
            w.line(&format!(
                "tex_address_mode {} {} {}",
                mode.u.token(),
                mode.v.token(),
                mode.w.token()
            ))?;
        }
    }
    if unit.border_colour != defaults.border_colour {
        w.line(&format!("tex_border_colour {}", colour(unit.border_colour)))?;
    }
    if unit.filtering != defaults.filtering {
        let f = unit.filtering;
        w.line(&format!("filtering {} {} {}", f.min.token(), f.mag.token(), f.mip.token()))?;
    }
    if unit.max_anisotropy != defaults.max_anisotropy {
        w.line(&format!("max_anisotropy {}", unit.max_anisotropy))?;
    }

    if unit.colour_blend != defaults.colour_blend {
        w.line(&colour_op_ex(&unit.colour_blend))?;
    }
    if unit.colour_blend_fallback != defaults.colour_blend_fallback {
        let SceneBlend { source, dest } = unit.colour_blend_fallback;
        w.line(&format!("colour_op_multipass_fallback {} {}", source.token(), dest.token()))?;
    }
    if unit.alpha_blend != defaults.alpha_blend {
        w.line(&alpha_op_ex(&unit.alpha_blend))?;
    }
    if unit.alpha_rejection != defaults.alpha_rejection {
        let (func, value) = unit.alpha_rejection;
        w.line(&format!("alpha_rejection {} {value}", func.token()))?;
    }

    if unit.scroll != defaults.scroll {
        w.line(&format!("scroll {} {}", unit.scroll.0, unit.scroll.1))?;
    }
    if unit.rotation != 0.0 {
        w.line(&format!("rotate {}", unit.rotation))?;
    }
    if unit.scale != defaults.scale {
        w.line(&format!("scale {} {}", unit.scale.0, unit.scale.1))?;
    }
    for effect in &unit.effects {
        let text = match *effect {
            TextureEffect::EnvironmentMap(env) => format!("env_map {}", env.token()),
            TextureEffect::ScrollAnim { u_speed, v_speed } => format!("scroll_anim {u_speed} {v_speed}"),
            TextureEffect::RotateAnim { speed } => format!("rotate_anim {speed}"),
            TextureEffect::Transform {
                transform,
                waveform,
                base,
                frequency,
                phase,
                amplitude,
            } => format!(
                "wave_xform {} {} {base} {frequency} {phase} {amplitude}",
                transform.token(),
                waveform.token()
            ),
        };
        w.line(&text)?;
    }
    w.close()
}

fn write_texture_selection<W: Write>(w: &mut BlockWriter<'_, W>, unit: &TextureUnitState) -> io::Result<()> {
    if let Some(source) = &unit.external_source {
        w.open(&format!("texture_source {}", source.plugin))?;
        for (key, value) in &source.parameters {
            w.line(&format!("{key} {value}"))?;
        }
        return w.close();
    }

    match unit.frames.as_slice() {
        [] => Ok(()),
        [single] if unit.cubic => w.line(&format!("cubic_texture {single} combinedUVW")),
        faces if unit.cubic => w.line(&format!("cubic_texture {} separateUV", faces.join(" "))),
        [single] if unit.animation_duration == 0.0 => {
            if unit.texture_type == TextureType::TwoD {
                w.line(&format!("texture {single}"))
            } else {
                w.line(&format!("texture {single} {}", unit.texture_type.token()))
            }
        }
        frames => w.line(&format!(
            "anim_texture {} {}",
            frames.join(" "),
            unit.animation_duration
        )),
    }
}

fn manual_factor(operation: LayerBlendOperation, factor: f32) -> String {
    if operation == LayerBlendOperation::BlendManual {
        format!(" {factor}")
    } else {
        String::new()
    }
}

fn colour_op_ex(blend: &ColourBlendMode) -> String {
    let mut text = format!(
        "colour_op_ex {} {} {}{}",
        blend.operation.token(),
        blend.source1.token(),
        blend.source2.token(),
        manual_factor(blend.operation, blend.factor)
    );
    if blend.source1 == LayerBlendSource::Manual {
        text.push(' ');
        text.push_str(&rgb(blend.colour_arg1));
    }
    if blend.source2 == LayerBlendSource::Manual {
        text.push(' ');
        text.push_str(&rgb(blend.colour_arg2));
    }
    text
}

fn alpha_op_ex(blend: &AlphaBlendMode) -> String {
    let mut text = format!(
        "alpha_op_ex {} {} {}{}",
        blend.operation.token(),
        blend.source1.token(),
        blend.source2.token(),
        manual_factor(blend.operation, blend.factor)
    );
    if blend.source1 == LayerBlendSource::Manual {
        text.push_str(&format!(" {}", blend.alpha_arg1));
    }
    if blend.source2 == LayerBlendSource::Manual {
        text.push_str(&format!(" {}", blend.alpha_arg2));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::MaterialCompiler;

    fn to_text(material: &Material) -> String {
        let mut out = Vec::new();
        write_material(&mut out, material).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_default_pass_is_bare() {
        let mut material = Material::new("Plain", "p");
        material.techniques[0].passes[0].name = Some("base".into());
        let expected = "\
material Plain
{
    technique
    {
        pass base
        {
        }
    }
}
";
        assert_eq!(to_text(&material), expected);
    }

    #[test]
    fn test_export_parses_back() {
        let source = "
fragment_program Fp asm
{
    source fp.asm
    syntax ps_2_0
}
material Glass
{
    receive_shadows off
    technique
    {
        pass
        {
            diffuse vertexcolour
            specular 1 1 1 1 32
            scene_blend alpha_blend
            depth_write off
            iteration once_per_light spot
            texture_unit
            {
                anim_texture flame.png 2 0.5
                tex_address_mode clamp mirror wrap
                colour_op_ex blend_manual src_texture src_manual 0.5 1 0 0
                wave_xform scroll_x sine 0 1 0 0.5
            }
            texture_unit
            {
                cubic_texture sky.jpg separateUV
            }
            fragment_program_ref Fp
            {
                param_indexed 0 float2 1 2
                param_indexed_auto 1 time 2
            }
        }
    }
}
";
        let compiler = MaterialCompiler::new();
        let mut first = ResourceRegistry::default();
        let report = compiler.parse_script(source.as_bytes(), "a", &mut first).unwrap();
        assert!(report.is_clean(), "{:?}", report.diagnostics);

        let mut exported = Vec::new();
        for program in first.programs.iter() {
            write_program(&mut exported, program).unwrap();
        }
        for material in first.materials.iter() {
            write_material(&mut exported, material).unwrap();
        }

        let mut second = ResourceRegistry::default();
        let report = compiler.parse_script(exported.as_slice(), "b", &mut second).unwrap();
        assert!(report.is_clean(), "{:?}", report.diagnostics);
        let mut reparsed = second.materials.get("Glass").unwrap().clone();
        reparsed.origin = "a".into();
        assert_eq!(first.materials.get("Glass"), Some(&reparsed));
        assert_eq!(
            first.programs.get("Fp").unwrap().source_file,
            second.programs.get("Fp").unwrap().source_file
        );
    }

    #[test]
    fn test_named_parameters_keep_their_registers() {
        let source = "
vertex_program Vp cg
{
    source vp.cg
    default_params
    {
        param_named m matrix4x4 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15 16
        param_named_auto t time 1.5
        param_named c float4 1 2 3 4
    }
}
";
        let compiler = MaterialCompiler::new();
        let mut first = ResourceRegistry::default();
        compiler.parse_script(source.as_bytes(), "a", &mut first).unwrap();
        let program = first.programs.get("Vp").unwrap();

        let mut out = Vec::new();
        write_program(&mut out, program).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines = text.lines().map(str::trim).collect::<Vec<_>>();
        let m = lines.iter().position(|l| l.starts_with("param_named m float16 1 2 3")).unwrap();
        let t = lines.iter().position(|l| *l == "param_named_auto t time 1.5").unwrap();
        let c = lines.iter().position(|l| *l == "param_named c float4 1 2 3 4").unwrap();
        assert!(m < t && t < c);

        let mut second = ResourceRegistry::default();
        let report = compiler.parse_script(text.as_bytes(), "b", &mut second).unwrap();
        assert!(report.is_clean(), "{:?}", report.diagnostics);
        assert_eq!(
            second.programs.get("Vp").unwrap().default_parameters,
            program.default_parameters
        );
    }

    #[test]
    fn test_program_header() {
        let mut registry = ResourceRegistry::default();
        MaterialCompiler::new()
            .parse_script(
                "vertex_program Skin cg\n{\nsource skin.cg\nentry_point main\nincludes_skeletal_animation true\n}\n"
                    .as_bytes(),
                "p",
                &mut registry,
            )
            .unwrap();
        let mut out = Vec::new();
        write_program(&mut out, registry.programs.get("Skin").unwrap()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("vertex_program Skin cg\n{\n    source skin.cg\n"));
        assert!(text.contains("    entry_point main\n"));
        assert!(text.contains("    includes_skeletal_animation true\n"));
        assert!(!text.contains("syntax"));
    }
}
