//! Page-session state shared by the event handlers
//!
//! Everything here is plain data: the renderer mirrors it into three-d
//! objects, the DOM listeners feed it scroll readings. It lives exactly as
//! long as the page.

use crate::animation::AnimationPlayer;
use crate::config::ViewerConfig;
use crate::error::ViewerError;
use crate::scene::{ModelDescription, MorphMesh};
use crate::scroll::{ScrollMetrics, ScrollScrubber};
use crate::utils::is_float_zero;


/// Drawing surface size in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}


/// Perspective projection parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub aspect: f32,
}

impl Projection {
    /// Refreshes the aspect from `surface`; a zero height keeps the old one
    pub fn fit(&mut self, surface: SurfaceSize) {
        if surface.height == 0 {
            return;
        }
        self.aspect = surface.width as f32 / surface.height as f32;
    }
}


/// The loaded model as far as the frame loop is concerned
#[derive(Debug, Clone, PartialEq)]
pub struct ModelState {
    pub name: String,
    /// Accumulated rotation about +Y in radians
    pub rotation_y: f32,
}


/// What one frame tick should present
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUpdate {
    /// Model rotation about +Y, `None` while nothing is loaded
    pub rotation_y: Option<f32>,
    /// Pose to re-apply on top of the rotation, the last scroll-forced time
    pub pose_time: Option<f32>,
}


pub struct AppState {
    surface: SurfaceSize,
    projection: Projection,
    model: Option<ModelState>,
    scrubber: ScrollScrubber,
    morph_meshes: Vec<MorphMesh>,
    rotation_step: f32,
}

impl AppState {
    pub fn new(config: &ViewerConfig, surface: SurfaceSize) -> Self {
        let mut projection = Projection {
            fov_degrees: config.camera.fov_degrees,
            near: config.camera.near,
            far: config.camera.far,
            aspect: 1.0,
        };
        projection.fit(surface);
        Self {
            surface,
            projection,
            model: None,
            scrubber: ScrollScrubber::Inactive,
            morph_meshes: Vec::new(),
            rotation_step: config.rotation_step,
        }
    }

    /// Registers a successfully loaded asset.
    /// Binds the first clip to a paused, play-once player; any other clips are ignored.
    pub fn install_model(&mut self, name: &str, description: &ModelDescription) {
        self.model = Some(ModelState {
            name: name.to_string(),
            rotation_y: 0.0,
        });

        for morph in description.morph_meshes.iter() {
            tracing::info!(
                "Added morph mesh: {} | Morphs: {}",
                morph.name,
                morph.target_count
            );
            self.morph_meshes.push(morph.clone());
        }
        tracing::info!("Total morph meshes found: {}", self.morph_meshes.len());

        match description.first_clip() {
            Some(clip) => {
                tracing::info!(
                    "Found animation {:?}: duration {}s, {} tracks",
                    clip.name,
                    clip.duration,
                    clip.track_count
                );
                if description.clips.len() > 1 {
                    tracing::debug!("ignoring {} further clips", description.clips.len() - 1);
                }
                if clip.is_morph_only() {
                    tracing::warn!(
                        "Animation {:?} only drives morph weights, scrolling will not move the model",
                        clip.name
                    );
                }
                if self.scrubber.attach(AnimationPlayer::for_scroll(clip.clone())) {
                    tracing::info!("Animation ready for scroll control");
                }
            }
            None => tracing::warn!("No animations found in {}", name),
        }
    }

    /// Registers a model that has no animation (the cube scene)
    pub fn install_static_model(&mut self, name: &str) {
        self.model = Some(ModelState {
            name: name.to_string(),
            rotation_y: 0.0,
        });
    }

    /// The model never arrives; scroll control stays inactive for the session
    pub fn load_failed(&self, error: &ViewerError) {
        tracing::error!("Error loading model: {}", error);
    }

    /// Forces the animation pose for a scroll reading.
    /// Returns the player's new time, `None` while no clip is bound.
    pub fn on_scroll(&mut self, metrics: &ScrollMetrics) -> Option<f32> {
        self.scrubber.scrub(metrics)
    }

    pub fn on_resize(&mut self, surface: SurfaceSize) {
        self.surface = surface;
        self.projection.fit(surface);
    }

    /// Advances the idle rotation. Animation time is read, never written.
    pub fn on_frame(&mut self) -> FrameUpdate {
        let step = self.rotation_step;
        let rotation_y = self.model.as_mut().map(|model| {
            if !is_float_zero(step, f32::EPSILON) {
                model.rotation_y = (model.rotation_y + step) % std::f32::consts::TAU;
            }
            model.rotation_y
        });
        FrameUpdate {
            rotation_y,
            pose_time: self.animation_time(),
        }
    }

    pub fn surface(&self) -> SurfaceSize {
        self.surface
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn model(&self) -> Option<&ModelState> {
        self.model.as_ref()
    }

    pub fn player(&self) -> Option<&AnimationPlayer> {
        self.scrubber.player()
    }

    pub fn animation_time(&self) -> Option<f32> {
        self.player().map(AnimationPlayer::time)
    }

    pub fn is_scroll_active(&self) -> bool {
        self.scrubber.is_active()
    }

    pub fn morph_meshes(&self) -> &[MorphMesh] {
        &self.morph_meshes
    }
}
