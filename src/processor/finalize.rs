//! Turns a finished program definition into a real program.

use super::context::{ParamTarget, ParserState, PendingProgramDefinition, ScriptContext, Section};
use super::dispatch::AttributeRegistry;
use crate::error::ScriptError;
use crate::model::{ASSEMBLER_LANGUAGE, ProgramFactory};

/// Creates the program described by `def` and returns its name.
///
/// Missing fields and rejected custom parameters are pushed to `warnings`
/// and creation goes ahead; only a failure of the factory itself is an error.
pub fn create_program<F: ProgramFactory + ?Sized>(
    def: &PendingProgramDefinition,
    factory: &mut F,
    warnings: &mut Vec<ScriptError>,
) -> Result<String, ScriptError> {
    let is_assembler = def.language == ASSEMBLER_LANGUAGE;
    if def.source_file.is_empty() {
        warnings.push(ScriptError::MissingProgramField {
            program: def.name.clone(),
            field: "source file",
        });
    }
    if is_assembler && def.syntax.is_empty() {
        warnings.push(ScriptError::MissingProgramField {
            program: def.name.clone(),
            field: "syntax code",
        });
    }

    if is_assembler {
        factory.create_low_level(&def.name, &def.source_file, def.kind, &def.syntax)?;
        if !def.custom_parameters.is_empty() {
            log::debug!(
                "{}: {} custom parameters ignored on an assembler program",
                def.name,
                def.custom_parameters.len()
            );
        }
    } else {
        factory.create_high_level(&def.name, &def.language, def.kind)?;
        factory.set_source_file(&def.name, &def.source_file);
        for (parameter, value) in &def.custom_parameters {
            if !factory.set_named_parameter(&def.name, parameter, value) {
                warnings.push(ScriptError::RejectedProgramParameter {
                    program: def.name.clone(),
                    parameter: parameter.clone(),
                });
            }
        }
    }

    if let Some(program) = factory.program_mut(&def.name) {
        program.skeletal_animation = def.skeletal_animation;
        program.morph_animation = def.morph_animation;
        program.pose_animation_count = def.pose_animation_count;
    }
    Ok(def.name.clone())
}

/// Runs when a program block closes: creates the program, then replays the
/// buffered `default_params` lines against its default parameters.
pub fn finish_program_definition(attributes: &AttributeRegistry, ctx: &mut ScriptContext<'_>) {
    let ParserState::BuildingProgram(def) = std::mem::take(&mut ctx.state) else {
        return;
    };

    let lines = std::mem::take(&mut ctx.default_parameter_lines);
    let mut warnings = Vec::new();
    let created = create_program(&def, &mut ctx.registry.programs, &mut warnings);
    for warning in warnings {
        ctx.report(warning);
    }
    let name = match created {
        Ok(name) => name,
        Err(err) => {
            ctx.report(err);
            return;
        }
    };

    if lines.is_empty() {
        return;
    }
    if !ctx.registry.programs.is_supported(&name) {
        log::debug!("{name} is not supported, {} default parameter lines skipped", lines.len());
        return;
    }

    let closing_line = ctx.line_number;
    ctx.program = Some(name.clone());
    ctx.program_parameters = Some(ParamTarget::ProgramDefaults(name));
    for line in &lines {
        ctx.line_number = line.number;
        attributes.invoke(Section::DefaultParameters, &line.text, ctx);
    }
    ctx.line_number = closing_line;
    ctx.program = None;
    ctx.program_parameters = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Capabilities;
    use crate::error::ErrorClass;
    use crate::model::{GpuProgramManager, GpuProgramType, ResourceRegistry};
    use crate::processor::lexer::ScriptLine;

    fn definition(name: &str, language: &str) -> PendingProgramDefinition {
        let mut def = PendingProgramDefinition::new(name, GpuProgramType::Fragment, language);
        def.source_file = format!("{name}.src");
        def
    }

    #[test]
    fn test_missing_fields_do_not_abort() {
        let mut manager = GpuProgramManager::new(Capabilities::default());
        let mut def = definition("Asm", "asm");
        def.source_file.clear();
        let mut warnings = Vec::new();

        assert_eq!(create_program(&def, &mut manager, &mut warnings).unwrap(), "Asm");
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().all(|w| w.class() == ErrorClass::MissingField));
        assert!(manager.get("Asm").is_some());
    }

    #[test]
    fn test_custom_parameters() {
        let mut manager = GpuProgramManager::new(Capabilities::default());
        let mut def = definition("Blur", "hlsl");
        def.custom_parameters = vec![
            ("entry_point".into(), "main_ps".into()),
            ("attach".into(), "other".into()),
        ];
        def.pose_animation_count = 2;
        let mut warnings = Vec::new();

        create_program(&def, &mut manager, &mut warnings).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            ScriptError::RejectedProgramParameter { parameter, .. } if parameter == "attach"
        ));
        let program = manager.get("Blur").unwrap();
        assert_eq!(program.custom_parameter("entry_point"), Some("main_ps"));
        assert_eq!(program.source_file, "Blur.src");
        assert_eq!(program.pose_animation_count, 2);
    }

    #[test]
    fn test_factory_failure() {
        let mut manager = GpuProgramManager::new(Capabilities::default());
        let mut warnings = Vec::new();
        let err = create_program(&definition("X", "renderman"), &mut manager, &mut warnings).unwrap_err();
        assert_eq!(err.class(), ErrorClass::Resource);
        assert!(manager.is_empty());
    }

    #[test]
    fn test_default_lines_replayed_with_their_line_numbers() {
        let attributes = AttributeRegistry::new();
        let mut registry = ResourceRegistry::default();
        let mut ctx = ScriptContext::new("t", &mut registry);
        let mut def = definition("Fp", "asm");
        def.syntax = "ps_2_0".into();
        ctx.state = ParserState::BuildingProgram(def);
        ctx.default_parameter_lines = vec![
            ScriptLine {
                number: 7,
                text: "param_indexed 2 float2 0.5 0.25".into(),
            },
            ScriptLine {
                number: 8,
                text: "param_indexed 3 float2 1".into(),
            },
        ];
        ctx.line_number = 10;

        finish_program_definition(&attributes, &mut ctx);
        assert_eq!(ctx.line_number, 10);
        assert!(ctx.program_parameters.is_none());
        let report = ctx.into_report();
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].line, 8);

        let defaults = &registry.programs.get("Fp").unwrap().default_parameters;
        assert_eq!(defaults.float_constants.get(&2), Some(&[0.5, 0.25, 0.0, 0.0]));
        assert!(!defaults.float_constants.contains_key(&3));
    }

    #[test]
    fn test_unsupported_program_skips_defaults() {
        let attributes = AttributeRegistry::new();
        let mut registry = ResourceRegistry::default();
        let mut ctx = ScriptContext::new("t", &mut registry);
        let mut def = definition("Old", "asm");
        def.syntax = "fp10".into();
        ctx.state = ParserState::BuildingProgram(def);
        ctx.default_parameter_lines = vec![ScriptLine {
            number: 3,
            text: "param_indexed 0 float 1".into(),
        }];

        finish_program_definition(&attributes, &mut ctx);
        assert!(ctx.into_report().is_clean());
        assert!(registry.programs.get("Old").unwrap().default_parameters.float_constants.is_empty());
    }
}
