use std::{cell::RefCell, rc::Rc};

use three_d::*;
use wasm_bindgen::{closure::Closure, JsCast};

use crate::config::{SubjectConfig, ViewerConfig};
use crate::error::ViewerError;
use crate::scene::{load_model, LoadedModel};
use crate::scroll::ScrollMetrics;
use crate::state::{AppState, SurfaceSize};
use crate::utils::*;


/// The one thing in the scene besides the lights
enum Subject {
    /// Loaded asset; `base` holds each part's own transformation from the file
    Model {
        model: Model<PhysicalMaterial>,
        base: Vec<Mat4>,
    },
    Cube(Gm<Mesh, PhysicalMaterial>),
}

impl Subject {
    fn rotate(&mut self, angle: f32) {
        match self {
            Self::Model { model, base } => {
                let rotation = Mat4::from_angle_y(radians(angle));
                for (part, base) in model.iter_mut().zip(base.iter()) {
                    part.geometry.set_transformation(rotation * *base);
                }
            }
            Self::Cube(cube) => {
                let rotation = Mat4::from_angle_x(radians(angle)) * Mat4::from_angle_y(radians(angle));
                // CpuMesh::cube spans -1..1
                cube.geometry.set_transformation(rotation * Mat4::from_scale(0.5));
            }
        }
    }

    /// Forces the key-frame pose at `time` seconds.
    /// Must follow every [Self::rotate], which resets the parts to their rest pose.
    fn pose(&mut self, time: f32) {
        if let Self::Model { model, .. } = self {
            model.animate(time);
        }
    }

    fn objects(&self) -> Vec<&dyn Object> {
        match self {
            Self::Model { model, .. } => model.iter().map(|part| part as &dyn Object).collect(),
            Self::Cube(cube) => vec![cube as &dyn Object],
        }
    }
}


fn srgba(hex: u32) -> Srgba {
    Srgba::new_opaque((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}


pub struct Viewer {
    context: Context,
    camera: Camera,
    ambient: AmbientLight,
    directional: DirectionalLight,
    subject: Option<Subject>,
    state: AppState,
    config: ViewerConfig,
}

impl Viewer {
    pub fn new(context: &Context, viewport: Viewport, config: ViewerConfig) -> Self {
        let state = AppState::new(&config, SurfaceSize::new(viewport.width, viewport.height));
        let projection = state.projection();

        let camera = Camera::new_perspective(
            viewport,
            Vec3::from(config.camera.position),
            Vec3::from(config.camera.target),
            vec3(0.0, 1.0, 0.0),
            degrees(projection.fov_degrees),
            projection.near,
            projection.far,
        );

        let lighting = &config.lighting;
        let ambient = AmbientLight::new(context, lighting.ambient_intensity, Srgba::WHITE);
        let directional = DirectionalLight::new(
            context,
            lighting.directional_intensity,
            Srgba::WHITE,
            &Vec3::from(lighting.directional_direction()),
        );

        Self {
            context: context.clone(),
            camera,
            ambient,
            directional,
            subject: None,
            state,
            config,
        }
    }

    /// Uploads a decoded asset and binds its first clip to scroll
    pub fn install(&mut self, loaded: LoadedModel) -> Result<(), ViewerError> {
        let LoadedModel { path, description, mut cpu_model } = loaded;

        let cutoff = self.config.transparency.alpha_cutoff;
        for material in cpu_model.materials.iter_mut() {
            if material.albedo_texture.is_some() {
                material.alpha_cutout = Some(cutoff);
                tracing::debug!("install(): alpha cutout {} on {}", cutoff, material.name);
            }
        }

        let mut model = Model::<PhysicalMaterial>::new(&self.context, &cpu_model)
            .map_err(|e| ViewerError::Renderer(e.to_string()))?;

        // petals and leaves: both faces, depth written, blended after the opaque pass
        for part in model.iter_mut() {
            if part.material.albedo_texture.is_some() {
                part.material.render_states = RenderStates {
                    cull: Cull::None,
                    depth_test: DepthTest::Less,
                    write_mask: WriteMask::COLOR_AND_DEPTH,
                    blend: Blend::TRANSPARENCY,
                };
                part.material.is_transparent = true;
            }
        }
        tracing::info!(
            "install(): transparency fix on {:?}",
            description.textured_materials
        );

        let clip_name = description.first_clip().and_then(|clip| clip.name.clone());
        model.choose_animation(clip_name.as_deref());
        let base: Vec<Mat4> = model.iter().map(|part| part.geometry.transformation()).collect();

        self.state.install_model(&path, &description);
        self.subject = Some(Subject::Model { model, base });

        self.on_scroll(scroll_metrics());
        Ok(())
    }

    pub fn install_cube(&mut self, color: u32) {
        let cube = Gm::new(
            Mesh::new(&self.context, &CpuMesh::cube()),
            PhysicalMaterial::new_opaque(
                &self.context,
                &CpuMaterial {
                    albedo: srgba(color),
                    ..Default::default()
                },
            ),
        );
        self.state.install_static_model("cube");
        self.subject = Some(Subject::Cube(cube));
    }

    /// Completion of the asynchronous load; failures only get logged
    pub fn finish_load(&mut self, result: Result<LoadedModel, ViewerError>) {
        if let Err(e) = result.and_then(|loaded| self.install(loaded)) {
            self.state.load_failed(&e);
        }
    }

    pub fn on_scroll(&mut self, metrics: ScrollMetrics) {
        if let Some(time) = self.state.on_scroll(&metrics) {
            if let Some(subject) = self.subject.as_mut() {
                subject.pose(time);
            }
        }
    }

    pub fn on_resize(&mut self, viewport: Viewport) {
        self.state.on_resize(SurfaceSize::new(viewport.width, viewport.height));
        if viewport.height == 0 {
            return;
        }
        let projection = self.state.projection();
        self.camera.set_viewport(viewport);
        self.camera.set_perspective_projection(
            degrees(projection.fov_degrees),
            projection.near,
            projection.far,
        );
        tracing::debug!(
            "on_resize(): {}x{}, aspect {:.3}",
            viewport.width,
            viewport.height,
            projection.aspect
        );
    }

    pub fn frame(&mut self, frame_input: &FrameInput) {
        let viewport = frame_input.viewport;
        if SurfaceSize::new(viewport.width, viewport.height) != self.state.surface() {
            self.on_resize(viewport);
        }

        let update = self.state.on_frame();
        if let Some(subject) = self.subject.as_mut() {
            if let Some(angle) = update.rotation_y {
                subject.rotate(angle);
            }
            if let Some(time) = update.pose_time {
                subject.pose(time);
            }
        }

        if let (Some(size), Some(Subject::Model { model, .. })) =
            (self.config.lighting.shadow_map_size, &self.subject)
        {
            self.directional.generate_shadow_map(size, model.iter());
        }

        let [r, g, b] = self.config.background_rgb();
        let objects = self.subject.as_ref().map(Subject::objects).unwrap_or_default();
        frame_input
            .screen()
            .clear(ClearState::color_and_depth(r, g, b, 1.0, 1.0))
            .render(&self.camera, objects, &[&self.ambient, &self.directional]);
    }
}


/// Re-poses the model on every page scroll, for the life of the page
fn listen_for_scroll(viewer: &Rc<RefCell<Viewer>>) -> Result<(), ViewerError> {
    let window = web_sys::window().ok_or(ViewerError::NoWindow)?;
    let viewer = Rc::clone(viewer);
    let on_scroll = Closure::wrap(Box::new(move || {
        viewer.borrow_mut().on_scroll(scroll_metrics());
    }) as Box<dyn FnMut()>);
    window
        .add_event_listener_with_callback("scroll", on_scroll.as_ref().unchecked_ref())
        .map_err(|e| ViewerError::Window(format!("{:?}", e)))?;
    on_scroll.forget();
    Ok(())
}


pub fn main(config: ViewerConfig) -> Result<(), ViewerError> {
    let canvas = find_canvas(&config.canvas_id)?;
    tracing::info!(
        "main(): canvas #{}: {}x{}",
        config.canvas_id,
        canvas.width(),
        canvas.height()
    );

    #[allow(unused_mut)]
    let mut settings = WindowSettings {
        title: "Scroll Bloom".to_string(),
        surface_settings: SurfaceSettings {
            multisamples: 4,
            ..Default::default()
        },
        ..Default::default()
    };
    #[cfg(target_arch = "wasm32")]
    {
        settings.canvas = Some(canvas);
    }
    let window = Window::new(settings).map_err(|e| ViewerError::Window(e.to_string()))?;

    let context = window.gl();
    let viewer = Rc::new(RefCell::new(Viewer::new(&context, window.viewport(), config.clone())));
    listen_for_scroll(&viewer)?;

    match config.subject {
        SubjectConfig::Gltf { path } => {
            let viewer = Rc::clone(&viewer);
            execute_future(async move {
                let result = load_model(&path).await;
                viewer.borrow_mut().finish_load(result);
            });
        }
        SubjectConfig::Cube { color } => viewer.borrow_mut().install_cube(color),
    }

    window.render_loop(move |frame_input| {
        viewer.borrow_mut().frame(&frame_input);
        FrameOutput::default()
    });
    Ok(())
}
