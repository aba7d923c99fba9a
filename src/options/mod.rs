//! Repro options with TOML file support.
//!
//! Every section uses `#[serde(default)]`, so a file that only overrides
//! `[texture_to_buffer]` (or nothing at all) still loads.

use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::ReproError;
use crate::gpu::context::GpuOptions;
use crate::repro::occlusion::OcclusionOptions;
use crate::repro::stencil_clear::StencilClearOptions;
use crate::repro::texture_to_buffer::TextureToBufferOptions;

/// Top-level options container.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct ReproOptions {
    /// Adapter selection.
    pub gpu: GpuOptions,
    /// Occlusion-query repro.
    pub occlusion: OcclusionOptions,
    /// Stencil-clear repro.
    pub stencil_clear: StencilClearOptions,
    /// Texture-to-buffer repro.
    pub texture_to_buffer: TextureToBufferOptions,
}

impl ReproOptions {
    /// Generate JSON Schema describing the options file.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(ReproOptions)
    }

    /// Parse options from TOML text. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// [`ReproError::OptionsParse`] on malformed TOML,
    /// [`ReproError::UnknownFormat`] for an unknown texture format name.
    pub fn from_toml(content: &str) -> Result<Self, ReproError> {
        let options: Self = toml::from_str(content)
            .map_err(|e| ReproError::OptionsParse(e.to_string()))?;
        let _ = options.texture_to_buffer.resolve_formats()?;
        Ok(options)
    }

    /// Load options from a TOML file.
    ///
    /// # Errors
    ///
    /// [`ReproError::Io`] if the file cannot be read, otherwise as
    /// [`ReproOptions::from_toml`].
    pub fn load(path: &Path) -> Result<Self, ReproError> {
        let content = std::fs::read_to_string(path).map_err(ReproError::Io)?;
        let options = Self::from_toml(&content)?;
        log::info!("loaded options from {}", path.display());
        Ok(options)
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// [`ReproError::OptionsParse`] if serialization fails, [`ReproError::Io`]
    /// if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), ReproError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ReproError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ReproError::Io)?;
        }
        std::fs::write(path, content).map_err(ReproError::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::context::AdapterPreference;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = ReproOptions::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed = ReproOptions::from_toml(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[texture_to_buffer]
formats = ["rgba8unorm", "rg32float"]
"#;
        let opts = ReproOptions::from_toml(toml_str).unwrap();
        assert_eq!(opts.texture_to_buffer.formats.len(), 2);
        // Everything else should be default
        assert_eq!(opts.texture_to_buffer.width, 64);
        assert_eq!(opts.texture_to_buffer.buffer_size, 2048);
        assert_eq!(opts.occlusion.iterations, 256);
        assert_eq!(opts.gpu.adapter, AdapterPreference::LowPower);
    }

    #[test]
    fn adapter_preference_is_snake_case() {
        let opts = ReproOptions::from_toml(
            r#"
[gpu]
adapter = "high_performance"
"#,
        )
        .unwrap();
        assert_eq!(opts.gpu.adapter, AdapterPreference::HighPerformance);
    }

    #[test]
    fn unknown_format_is_rejected_on_load() {
        let err = ReproOptions::from_toml(
            r#"
[texture_to_buffer]
formats = ["astc"]
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ReproError::UnknownFormat(_)));
    }

    #[test]
    fn malformed_toml_is_an_options_error() {
        assert!(matches!(
            ReproOptions::from_toml("[occlusion\niterations = 3"),
            Err(ReproError::OptionsParse(_))
        ));
    }

    #[test]
    fn schema_has_every_section() {
        let schema_value =
            serde_json::to_value(ReproOptions::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();
        for section in ["gpu", "occlusion", "stencil_clear", "texture_to_buffer"] {
            assert!(props.contains_key(section), "{section}");
        }
    }
}
