//! Camera, renderer surface and orbit navigation, kept consistent with the window.

use crate::camera::{OrbitControls, PerspectiveCamera};
use crate::scene::Scene;
use glam::Vec3;
use std::f32::consts::PI;

pub const FIELD_OF_VIEW_DEG: f32 = 60.0;
pub const NEAR_PLANE: f32 = 0.5;
pub const FAR_PLANE: f32 = 1000.0;
pub const INITIAL_CAMERA_POSITION: Vec3 = Vec3::new(0.0, 50.0, -50.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    fn is_drawable(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// Output settings recorded for the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererSettings {
    pub pixel_ratio: f64,
    pub antialias: bool,
    pub shadows: bool,
    pub soft_shadows: bool,
    pub gamma_correct_output: bool,
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            pixel_ratio: 1.0,
            antialias: true,
            shadows: true,
            soft_shadows: true,
            gamma_correct_output: true,
        }
    }
}

/// Draws frames. Implemented by the GPU backend and by test doubles.
pub trait FrameRenderer {
    /// Resize the output surface.
    fn resize(&mut self, size: SurfaceSize);

    /// Submit `scene` as seen from `camera`.
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> anyhow::Result<()>;
}

/// Platform input, translated by whoever owns the window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewportEvent {
    Resized(SurfaceSize),
    /// Pointer drag with the primary button held, in physical pixels.
    Drag { dx: f32, dy: f32 },
    /// Wheel steps; positive zooms in.
    Wheel(f32),
}

pub struct Viewport<R> {
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    pub settings: RendererSettings,
    renderer: R,
    size: SurfaceSize,
}

impl<R: FrameRenderer> Viewport<R> {
    /// Camera looking at the origin from above the board, orbit controls
    /// disabled and auto-rotating until the game starts.
    pub fn initialize(size: SurfaceSize, pixel_ratio: f64, mut renderer: R) -> Self {
        let mut camera = PerspectiveCamera::new(FIELD_OF_VIEW_DEG, size.aspect(), NEAR_PLANE, FAR_PLANE);
        camera.position = INITIAL_CAMERA_POSITION;
        camera.look_at(Vec3::ZERO);

        let mut controls = OrbitControls::default();
        controls.enable_damping = true;
        controls.damping_factor = 0.05;
        controls.enable_keys = false;
        controls.screen_space_panning = false;
        controls.enable_pan = false;
        controls.rotate_speed = 0.5;
        controls.min_polar_angle = PI * 0.1;
        controls.max_polar_angle = PI * 0.5;
        controls.min_distance = 10.0;
        controls.max_distance = 400.0;
        controls.auto_rotate = true;
        controls.enabled = false;

        renderer.resize(size);
        log::info!("Viewport initialised at {}x{}", size.width, size.height);

        Self {
            camera,
            controls,
            settings: RendererSettings {
                pixel_ratio,
                ..Default::default()
            },
            renderer,
            size,
        }
    }

    /// Keeps the projection and the render surface in step with the window.
    /// Repeating the current size, or a zero-area size, changes nothing.
    pub fn on_resize(&mut self, new_size: SurfaceSize) {
        if new_size == self.size || !new_size.is_drawable() {
            return;
        }
        self.size = new_size;
        self.camera.aspect = new_size.aspect();
        self.camera.update_projection_matrix();
        self.renderer.resize(new_size);
        log::debug!("Viewport resized to {}x{}", new_size.width, new_size.height);
    }

    pub fn handle_event(&mut self, event: ViewportEvent) {
        match event {
            ViewportEvent::Resized(size) => self.on_resize(size),
            ViewportEvent::Drag { dx, dy } => {
                self.controls.rotate_by_pixels(dx, dy, self.size.height)
            }
            ViewportEvent::Wheel(steps) => self.controls.zoom_by(steps),
        }
    }

    pub fn enable_navigation(&mut self) {
        self.controls.auto_rotate = false;
        self.controls.enabled = true;
    }

    /// Stops reacting to input and goes back to the idle auto-rotation.
    pub fn disable_navigation(&mut self) {
        self.controls.enabled = false;
        self.controls.auto_rotate = true;
    }

    pub fn update_controls(&mut self) {
        self.controls.update(&mut self.camera);
    }

    pub fn render(&mut self, scene: &Scene) -> anyhow::Result<()> {
        self.renderer.render(scene, &self.camera)
    }

    pub fn size(&self) -> SurfaceSize {
        self.size
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records what the viewport asked of the renderer.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingRenderer {
        pub sizes: Vec<SurfaceSize>,
        pub frames: usize,
        pub last_entity_count: usize,
    }

    impl FrameRenderer for RecordingRenderer {
        fn resize(&mut self, size: SurfaceSize) {
            self.sizes.push(size);
        }

        fn render(&mut self, scene: &Scene, _camera: &PerspectiveCamera) -> anyhow::Result<()> {
            self.frames += 1;
            self.last_entity_count = scene.len();
            Ok(())
        }
    }

    fn viewport(width: u32, height: u32) -> Viewport<RecordingRenderer> {
        Viewport::initialize(SurfaceSize::new(width, height), 1.0, RecordingRenderer::default())
    }

    #[test]
    fn initial_camera_and_controls() {
        let vp = viewport(800, 600);
        assert_eq!(vp.camera.fov_deg, 60.0);
        assert_eq!(vp.camera.aspect, 800.0 / 600.0);
        assert_eq!(vp.camera.position, INITIAL_CAMERA_POSITION);
        assert_eq!(vp.camera.target, Vec3::ZERO);
        assert!(!vp.controls.enabled);
        assert!(vp.controls.auto_rotate);
        assert!(!vp.controls.enable_pan);
        assert_eq!(vp.renderer().sizes, vec![SurfaceSize::new(800, 600)]);
    }

    #[test]
    fn orbit_limits_apply_from_the_first_update() {
        let mut vp = viewport(800, 600);
        assert!(vp.controls.enable_damping);
        assert!(!vp.controls.enable_keys);
        assert_eq!(vp.controls.rotate_speed, 0.5);
        assert_eq!(vp.controls.min_distance, 10.0);
        assert_eq!(vp.controls.max_distance, 400.0);

        let radius = vp.camera.position.length();
        vp.update_controls();
        assert!((vp.camera.position.length() - radius).abs() < 1e-3);
        assert!(vp.camera.position.y > 0.0);
    }

    #[test]
    fn resize_updates_aspect_and_surface() {
        let mut vp = viewport(800, 600);
        vp.on_resize(SurfaceSize::new(1024, 768));

        assert_eq!(vp.camera.aspect, 1024.0 / 768.0);
        assert_eq!(vp.size(), SurfaceSize::new(1024, 768));
        assert_eq!(vp.renderer().sizes.last(), Some(&SurfaceSize::new(1024, 768)));

        let expected = glam::Mat4::perspective_rh(60f32.to_radians(), 1024.0 / 768.0, 0.5, 1000.0);
        assert_eq!(vp.camera.projection(), expected);
    }

    #[test]
    fn repeated_size_is_a_no_op() {
        let mut vp = viewport(800, 600);
        vp.on_resize(SurfaceSize::new(1024, 768));
        vp.on_resize(SurfaceSize::new(1024, 768));
        vp.handle_event(ViewportEvent::Resized(SurfaceSize::new(1024, 768)));
        assert_eq!(vp.renderer().sizes.len(), 2);
    }

    #[test]
    fn zero_area_resize_is_ignored() {
        let mut vp = viewport(800, 600);
        vp.on_resize(SurfaceSize::new(0, 0));
        assert_eq!(vp.size(), SurfaceSize::new(800, 600));
        assert_eq!(vp.camera.aspect, 800.0 / 600.0);
    }

    #[test]
    fn navigation_toggles() {
        let mut vp = viewport(800, 600);
        vp.enable_navigation();
        assert!(vp.controls.enabled);
        assert!(!vp.controls.auto_rotate);

        vp.disable_navigation();
        assert!(!vp.controls.enabled);
        assert!(vp.controls.auto_rotate);
    }

    #[test]
    fn drag_is_ignored_until_navigation_is_enabled() {
        let mut vp = viewport(800, 600);
        vp.controls.auto_rotate = false;
        let before = vp.camera.position;

        vp.handle_event(ViewportEvent::Drag { dx: 120.0, dy: 0.0 });
        for _ in 0..10 {
            vp.update_controls();
        }
        assert!((vp.camera.position - before).length() < 1e-3);

        vp.enable_navigation();
        vp.handle_event(ViewportEvent::Drag { dx: 120.0, dy: 0.0 });
        vp.update_controls();
        assert!((vp.camera.position - before).length() > 1e-2);
    }
}
