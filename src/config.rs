//! Viewer settings
//!
//! Every constant of the page lives here. The defaults reproduce the flower
//! page exactly; a page may override any subset through `runWithConfig(json)`.

use serde::{Deserialize, Serialize};

use crate::error::ViewerError;


/// What the scene shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubjectConfig {
    /// A glTF asset fetched relative to the page
    Gltf { path: String },
    /// The procedural spinning cube test scene
    Cube { color: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 25.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 3.0, 5.0],
            target: [0.0, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient_intensity: f32,
    pub directional_intensity: f32,
    /// The directional light shines from here towards the origin
    pub directional_position: [f32; 3],
    /// Shadow map edge length in texels, `None` disables shadows
    pub shadow_map_size: Option<u32>,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient_intensity: 2.0,
            directional_intensity: 5.0,
            directional_position: [5.0, 5.0, 5.0],
            shadow_map_size: Some(1024),
        }
    }
}

impl LightingConfig {
    pub fn directional_direction(&self) -> [f32; 3] {
        let [x, y, z] = self.directional_position;
        [-x, -y, -z]
    }
}

/// Material rewrite for textured (petal/leaf) materials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransparencyConfig {
    /// Fragments with alpha below this are discarded
    pub alpha_cutoff: f32,
}

impl Default for TransparencyConfig {
    fn default() -> Self {
        Self { alpha_cutoff: 0.9 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub canvas_id: String,
    pub subject: SubjectConfig,
    /// Clear colour as 0xRRGGBB
    pub background: u32,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub transparency: TransparencyConfig,
    /// Radians added to the model's Y rotation every frame
    pub rotation_step: f32,
    pub log_level: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::flower()
    }
}

impl ViewerConfig {
    pub fn flower() -> Self {
        Self {
            canvas_id: "canvas3d".to_string(),
            subject: SubjectConfig::Gltf {
                path: "Flower11/Flower11.gltf".to_string(),
            },
            background: 0x87ceeb,
            camera: CameraConfig::default(),
            lighting: LightingConfig::default(),
            transparency: TransparencyConfig::default(),
            rotation_step: 0.001,
            log_level: "info".to_string(),
        }
    }

    pub fn cube() -> Self {
        Self {
            subject: SubjectConfig::Cube { color: 0x44aa88 },
            lighting: LightingConfig {
                shadow_map_size: None,
                ..LightingConfig::default()
            },
            rotation_step: 0.01,
            ..Self::flower()
        }
    }

    /// Parses a JSON override; absent fields keep the flower defaults
    pub fn from_json(json: &str) -> Result<Self, ViewerError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }

    /// Background as 0..1 RGB
    pub fn background_rgb(&self) -> [f32; 3] {
        hex_to_rgb(self.background)
    }
}

pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}
