// THEORY:
// `ScannerConfig` is the harness's view of a TOML config file: the library's
// `PipelineConfig` under `[pipeline]`, plus the two things only the harness
// knows about, the external recognizer command and the camera device.
// Command-line flags are applied on top after loading.

use anyhow::Context;
use mrz_vision::PipelineConfig;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    pub pipeline: PipelineConfig,
    pub engine: EngineConfig,
    pub camera: CameraConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Program that reads a PNG on stdin and prints recognized lines.
    pub program: Option<String>,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub device: i32,
    pub width: u32,
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: 0,
            width: 1280,
            height: 720,
        }
    }
}

impl ScannerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let mut config: ScannerConfig = toml::from_str(text)?;
        config.pipeline = config.pipeline.validated()?;
        Ok(config)
    }
}
