//! Dump the compiled registry and the diagnostics as JSON.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::processor::Compiled;

pub fn emit(compiled: &Compiled, out_dir: &Path) -> io::Result<()> {
    let registry = &compiled.registry;
    write_json(
        &out_dir.join("materials.json"),
        &registry.materials.iter().collect::<Vec<_>>(),
    )?;
    write_json(
        &out_dir.join("programs.json"),
        &registry.programs.iter().collect::<Vec<_>>(),
    )?;
    write_json(&out_dir.join("diagnostics.json"), &compiled.reports)?;
    Ok(())
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    out.flush()?;
    log::info!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Material;

    #[test]
    fn test_material_json_shape() {
        let material = Material::new("Rock", "rock.material");
        let value = serde_json::to_value(&material).unwrap();
        assert_eq!(value["name"], "Rock");
        assert_eq!(value["techniques"][0]["passes"][0]["lighting"], true);
        assert_eq!(value["techniques"][0]["passes"][0]["depth_func"], "LessEqual");
        assert_eq!(value["techniques"][0]["passes"][0]["iteration"], "Once");
    }
}
