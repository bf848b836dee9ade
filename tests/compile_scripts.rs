use std::fs;

use material_script::config::{Capabilities, load_from_json};
use material_script::error::ErrorClass;
use material_script::model::{CullingMode, ProgramSlot, TextureEffect, TextureType};
use material_script::processor::{Compiled, SourceScript, run};
use material_script::writer::script::{write_material, write_program};

fn compile(path: &str, capabilities: Capabilities) -> Compiled {
    let text = fs::read_to_string(path).unwrap();
    let scripts = vec![SourceScript {
        name: path.to_string(),
        text,
    }];
    run(&scripts, capabilities).expect("compiles")
}

#[test]
fn compiles_example_script() {
    let compiled = compile("tests/data/example.material", Capabilities::default());
    assert_eq!(compiled.diagnostic_count(), 0);

    let registry = &compiled.registry;
    assert_eq!(registry.programs.len(), 3);
    assert_eq!(registry.materials.len(), 2);

    let rock = registry.materials.get("Rock").unwrap();
    assert_eq!(rock.lod_distances, vec![100.0, 250.0]);
    assert_eq!(rock.techniques.len(), 2);

    // the second `pass base` re-opened the first pass
    let passes = &rock.techniques[0].passes;
    assert_eq!(passes.len(), 2);
    assert_eq!(passes[0].name.as_deref(), Some("base"));
    assert_eq!(passes[0].cull_hardware, CullingMode::None);
    assert_eq!(passes[0].shininess, 16.0);
    assert_eq!(passes[1].name.as_deref(), Some("detail"));
    assert!(!passes[1].depth_write);
    assert_eq!(passes[1].texture_units[0].frames, vec!["rock_detail.png"]);

    // alias resolved when the material closed
    assert_eq!(passes[0].texture_units[0].frames, vec!["rock_diffuse.png"]);

    let fallback = &rock.techniques[1];
    assert_eq!(fallback.name.as_deref(), Some("fallback"));
    assert_eq!(fallback.lod_index, 1);
    let receiver = fallback.passes[0]
        .programs
        .slot(ProgramSlot::ShadowReceiverFragment)
        .unwrap();
    assert_eq!(receiver.program, "Shadow");
    assert_eq!(receiver.parameters.auto_constants.len(), 1);
    assert_eq!(
        receiver.parameters.float_constants.get(&4),
        Some(&[0.5, 0.5, 0.0, 0.0])
    );
}

#[test]
fn binding_starts_from_program_defaults() {
    let compiled = compile("tests/data/example.material", Capabilities::default());
    let registry = &compiled.registry;

    let skinning = registry.programs.get("Skinning").unwrap();
    assert!(skinning.skeletal_animation);
    assert_eq!(skinning.custom_parameter("entry_point"), Some("main_vp"));
    let defaults = &skinning.default_parameters;
    assert_eq!(defaults.named.get("worldViewProj"), Some(&0));
    // a matrix takes four registers
    assert_eq!(defaults.named.get("lightPos"), Some(&4));
    assert_eq!(defaults.named.get("ambient"), Some(&5));

    let rock = registry.materials.get("Rock").unwrap();
    let binding = rock.techniques[0].passes[0].programs.vertex.as_ref().unwrap();
    assert_eq!(binding.program, "Skinning");
    assert_eq!(binding.parameters.auto_constants.len(), 2);
    assert_eq!(
        binding.parameters.float_constants.get(&5),
        Some(&[0.2, 0.2, 0.2, 1.0])
    );
    assert_eq!(
        defaults.float_constants.get(&5),
        Some(&[0.1, 0.1, 0.1, 1.0])
    );
}

#[test]
fn unsupported_program_keeps_empty_parameters() {
    let compiled = compile("tests/data/example.material", Capabilities::default());
    let registry = &compiled.registry;

    let legacy = registry.programs.get("Legacy").unwrap();
    assert!(!legacy.is_supported_by(registry.programs.capabilities()));
    assert!(legacy.default_parameters.float_constants.is_empty());

    let water = registry.materials.get("Water").unwrap();
    assert!(!water.receive_shadows);
    assert!(water.transparency_casts_shadows);
    let pass = &water.techniques[0].passes[0];
    let binding = pass.programs.fragment.as_ref().unwrap();
    assert!(binding.parameters.float_constants.is_empty());

    let ripple = &pass.texture_units[0];
    assert_eq!(ripple.frames.len(), 4);
    assert_eq!(ripple.frames[3], "ripple_3.png");
    assert_eq!(ripple.animation_duration, 2.0);
    assert_eq!(ripple.effects.len(), 2);
    assert_eq!(ripple.colour_blend.factor, 0.4);

    let sky = &pass.texture_units[1];
    assert_eq!(sky.texture_type, TextureType::Cubic);
    assert!(matches!(sky.effects[0], TextureEffect::EnvironmentMap(_)));
}

#[test]
fn capabilities_file_changes_support() {
    let json = fs::read_to_string("tests/data/capabilities.json").unwrap();
    let capabilities = load_from_json(&json).unwrap();
    assert!(!capabilities.has_language("hlsl"));

    let compiled = compile("tests/data/example.material", capabilities);
    assert_eq!(compiled.diagnostic_count(), 0);

    let registry = &compiled.registry;
    let caps = registry.programs.capabilities();
    assert!(registry.programs.get("Skinning").unwrap().is_supported_by(caps));

    // fp10 is listed, so Legacy's defaults and the Water binding now apply
    let legacy = registry.programs.get("Legacy").unwrap();
    assert_eq!(
        legacy.default_parameters.float_constants.get(&0),
        Some(&[1.0, 1.0, 1.0, 1.0])
    );
    let water = registry.materials.get("Water").unwrap();
    let binding = water.techniques[0].passes[0].programs.fragment.as_ref().unwrap();
    assert_eq!(
        binding.parameters.float_constants.get(&1),
        Some(&[3.0, 0.0, 0.0, 0.0])
    );
}

#[test]
fn missing_language_leaves_references_undefined() {
    let capabilities = load_from_json(r#"{ "languages": {} }"#).unwrap();
    let compiled = compile("tests/data/example.material", capabilities);

    let report = &compiled.reports[0];
    // program creation fails, then the vertex_program_ref in Rock
    assert_eq!(report.diagnostics.len(), 2);
    assert_eq!(report.count(ErrorClass::Resource), 2);
    assert!(compiled.registry.programs.get("Skinning").is_none());

    let rock = compiled.registry.materials.get("Rock").unwrap();
    let pass = &rock.techniques[0].passes[0];
    assert!(pass.programs.vertex.is_none());
    assert_eq!(pass.texture_units.len(), 1);
}

#[test]
fn reports_broken_script() {
    let compiled = compile("tests/data/broken.material", Capabilities::default());
    let report = &compiled.reports[0];

    let found = report
        .diagnostics
        .iter()
        .map(|d| (d.class, d.line))
        .collect::<Vec<_>>();
    assert_eq!(report.diagnostics.len(), 5);
    assert_eq!(found[0], (ErrorClass::UnknownCommand, 7));
    assert_eq!(found[1], (ErrorClass::Malformed, 8));
    assert_eq!(found[2], (ErrorClass::Resource, 9));
    assert_eq!(found[3], (ErrorClass::Duplicate, 21));
    assert_eq!(found[4].0, ErrorClass::Structural);

    assert_eq!(report.duplicate_materials().count(), 1);
    assert!(
        report.diagnostics[0]
            .to_string()
            .contains("in material Broken at line 7")
    );

    let broken = compiled.registry.materials.get("Broken").unwrap();
    assert_eq!(broken.techniques.len(), 1);
    let pass = &broken.techniques[0].passes[0];
    assert!(pass.programs.fragment.is_none());
    assert_eq!(pass.texture_units[0].frames, vec!["a.png"]);
}

#[test]
fn exported_script_compiles_to_same_objects() {
    let first = compile("tests/data/example.material", Capabilities::default());

    let mut text = Vec::new();
    for program in first.registry.programs.iter() {
        write_program(&mut text, program).unwrap();
    }
    for material in first.registry.materials.iter() {
        write_material(&mut text, material).unwrap();
    }
    let scripts = vec![SourceScript {
        name: "tests/data/example.material".to_string(),
        text: String::from_utf8(text).unwrap(),
    }];
    let second = run(&scripts, Capabilities::default()).unwrap();
    assert_eq!(second.diagnostic_count(), 0);

    for program in first.registry.programs.iter() {
        assert_eq!(second.registry.programs.get(&program.name), Some(program));
    }
    for material in first.registry.materials.iter() {
        assert_eq!(second.registry.materials.get(&material.name), Some(material));
    }
}
