//! Render-system capabilities the compiler checks programs against.
//!
//! The file is plain JSON:
//!
//! ```json
//! {
//!   "syntaxes": ["arbvp1", "arbfp1", "vs_1_1", "ps_2_0"],
//!   "languages": { "cg": ["entry_point", "profiles", "compile_arguments"] }
//! }
//! ```
//!
//! Both keys are optional; a missing key keeps the built-in default.

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Low-level program syntax codes the hardware runs.
    pub syntaxes: BTreeSet<String>,
    /// High-level languages and the custom parameter names each accepts.
    pub languages: BTreeMap<String, Vec<String>>,
}

impl Default for Capabilities {
    fn default() -> Self {
        let syntaxes = [
            "arbvp1", "arbfp1", "vs_1_1", "vs_2_0", "vs_2_x", "vs_3_0", "ps_1_1", "ps_1_2",
            "ps_1_3", "ps_1_4", "ps_2_0", "ps_2_x", "ps_3_0", "fp20", "fp30", "fp40", "vp20",
            "vp30", "vp40",
        ];
        let languages = [
            ("cg", &["entry_point", "profiles", "compile_arguments"][..]),
            ("hlsl", &["entry_point", "target"][..]),
            ("glsl", &["attach"][..]),
        ];
        Self {
            syntaxes: syntaxes.iter().map(|s| (*s).to_owned()).collect(),
            languages: languages
                .iter()
                .map(|(lang, params)| {
                    (
                        (*lang).to_owned(),
                        params.iter().map(|p| (*p).to_owned()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl Capabilities {
    pub fn supports_syntax(&self, syntax: &str) -> bool {
        self.syntaxes.contains(&syntax.to_ascii_lowercase())
    }

    pub fn has_language(&self, language: &str) -> bool {
        self.languages.contains_key(language)
    }

    pub fn language_parameters(&self, language: &str) -> Option<&[String]> {
        self.languages.get(language).map(Vec::as_slice)
    }
}

/// Parse a capabilities JSON document.
pub fn load_from_json(json: &str) -> Result<Capabilities> {
    let mut caps: Capabilities =
        serde_json::from_str(json).map_err(|e| anyhow!("Failed to parse capabilities: {}", e))?;
    caps.syntaxes = caps
        .syntaxes
        .into_iter()
        .map(|s| s.to_ascii_lowercase())
        .collect();
    log::debug!(
        "capabilities: {} syntaxes, {} languages",
        caps.syntaxes.len(),
        caps.languages.len()
    );
    Ok(caps)
}
