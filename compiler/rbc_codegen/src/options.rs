//! Compilation options.
//!
//! Deserialized from JSON; unknown keys are ignored.
//!
//! ```json
//! {
//!   "warnings": true,
//!   "optimizations": { "const_cache": true, "builtin_methods": ["Fixnum", "Array"] },
//!   "require_include": { "paths": ["lib"], "files": ["helper"] }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{CodegenError, CodegenResult};

/// Optimization names in the order their plugins are instantiated.
///
/// `direct_self_call` follows `cache_call`: it rewrites the cached call sites
/// the latter produces.
pub const OPTIMIZATIONS: [&str; 7] = [
    "const_cache",
    "case_optimize",
    "inline_methods",
    "builtin_methods",
    "cache_call",
    "direct_self_call",
    "ivar_cache",
];

/// Session configuration.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Enable the diagnostics plugin.
    pub warnings: bool,
    pub optimizations: Optimizations,
    pub require_include: Option<RequireInclude>,
}

/// `"all"` or a per-optimization map.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Optimizations {
    Preset(String),
    Selected(BTreeMap<String, OptSetting>),
}

impl Default for Optimizations {
    fn default() -> Self {
        Optimizations::Selected(BTreeMap::new())
    }
}

/// Setting for one optimization: on/off, or on with arguments.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum OptSetting {
    Flag(bool),
    Args(Vec<String>),
}

/// Include paths and the features to inline from them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RequireInclude {
    pub paths: Vec<PathBuf>,
    /// Features eligible for inlining; empty means any feature found.
    pub files: Vec<String>,
}

impl CompileOptions {
    /// Every optimization enabled with default arguments.
    pub fn all_optimizations() -> Self {
        CompileOptions {
            optimizations: Optimizations::Preset("all".to_string()),
            ..CompileOptions::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Enabled optimizations with their arguments, in instantiation order.
    ///
    /// Each optimization appears at most once no matter how the map was
    /// written; names outside [`OPTIMIZATIONS`] are ignored.
    pub fn enabled_optimizations(&self) -> CodegenResult<Vec<(&'static str, Vec<String>)>> {
        match &self.optimizations {
            Optimizations::Preset(preset) if preset == "all" => {
                Ok(OPTIMIZATIONS.iter().map(|&name| (name, Vec::new())).collect())
            }
            Optimizations::Preset(other) => Err(CodegenError::user(format!(
                "unknown optimization preset `{other}` (expected \"all\")"
            ))),
            Optimizations::Selected(map) => Ok(OPTIMIZATIONS
                .iter()
                .filter_map(|&name| match map.get(name)? {
                    OptSetting::Flag(true) => Some((name, Vec::new())),
                    OptSetting::Flag(false) => None,
                    OptSetting::Args(args) => Some((name, args.clone())),
                })
                .collect()),
        }
    }

    /// Turn on `name`, replacing any earlier setting.
    pub fn enable(&mut self, name: &str, args: Vec<String>) {
        let setting = if args.is_empty() {
            OptSetting::Flag(true)
        } else {
            OptSetting::Args(args)
        };
        match &mut self.optimizations {
            Optimizations::Selected(map) => {
                map.insert(name.to_string(), setting);
            }
            Optimizations::Preset(_) => {
                let mut map: BTreeMap<String, OptSetting> = OPTIMIZATIONS
                    .iter()
                    .map(|&n| (n.to_string(), OptSetting::Flag(true)))
                    .collect();
                map.insert(name.to_string(), setting);
                self.optimizations = Optimizations::Selected(map);
            }
        }
    }
}
