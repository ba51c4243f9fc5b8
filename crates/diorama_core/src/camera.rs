use glam::{Mat4, Vec3};
use std::f32::consts::PI;

/// Perspective camera looking at a target point.
#[derive(Debug, Clone)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov_deg: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
    pub target: Vec3,
    proj: Mat4,
}

impl PerspectiveCamera {
    pub fn new(fov_deg: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            fov_deg,
            aspect,
            near,
            far,
            position: Vec3::ZERO,
            target: Vec3::NEG_Z,
            proj: Mat4::IDENTITY, // placeholder
        };
        camera.update_projection_matrix();
        camera
    }

    /// Must be called after changing `fov_deg`, `aspect`, `near` or `far`.
    pub fn update_projection_matrix(&mut self) {
        self.proj = Mat4::perspective_rh(self.fov_deg.to_radians(), self.aspect, self.near, self.far);
    }

    pub fn look_at(&mut self, target: Vec3) {
        self.target = target;
    }

    pub fn projection(&self) -> Mat4 {
        self.proj
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj * self.view()
    }
}

/// Spherical coordinates of an offset around the orbit target (Y up).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spherical {
    radius: f32,
    /// Polar angle from +Y.
    phi: f32,
    /// Azimuth around Y, measured from +Z toward +X.
    theta: f32,
}

impl Spherical {
    fn from_offset(v: Vec3) -> Self {
        let radius = v.length();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
            theta: v.x.atan2(v.z),
        }
    }

    fn to_offset(self) -> Vec3 {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        Vec3::new(
            self.radius * sin_phi * sin_theta,
            self.radius * cos_phi,
            self.radius * sin_phi * cos_theta,
        )
    }
}

/// Damped orbit navigation around a target.
///
/// User input only accumulates into pending deltas; `update()` (once per
/// frame) applies auto-rotation and a damped share of the pending deltas,
/// clamps the polar angle and repositions the camera.
#[derive(Debug, Clone)]
pub struct OrbitControls {
    pub target: Vec3,
    /// Whether user input is accepted. `update()` runs either way.
    pub enabled: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_pan: bool,
    pub enable_keys: bool,
    pub screen_space_panning: bool,
    pub enable_zoom: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub auto_rotate: bool,
    /// 2.0 is one revolution per 30 seconds at 60 fps.
    pub auto_rotate_speed: f32,
    pub min_polar_angle: f32,
    pub max_polar_angle: f32,
    pub min_distance: f32,
    pub max_distance: f32,

    pending_theta: f32,
    pending_phi: f32,
    pending_scale: f32,
}

impl Default for OrbitControls {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            enabled: true,
            enable_damping: false,
            damping_factor: 0.05,
            enable_pan: true,
            enable_keys: true,
            screen_space_panning: true,
            enable_zoom: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            min_polar_angle: 0.0,
            max_polar_angle: PI,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            pending_theta: 0.0,
            pending_phi: 0.0,
            pending_scale: 1.0,
        }
    }
}

impl OrbitControls {
    /// Angle turned per update while auto-rotating.
    fn auto_rotation_angle(&self) -> f32 {
        2.0 * PI / 60.0 / 60.0 * self.auto_rotate_speed
    }

    /// Drag by `(dx, dy)` pixels on a surface `viewport_height` pixels tall.
    pub fn rotate_by_pixels(&mut self, dx: f32, dy: f32, viewport_height: u32) {
        if !self.enabled {
            return;
        }
        let height = viewport_height.max(1) as f32;
        self.pending_theta -= 2.0 * PI * dx / height * self.rotate_speed;
        self.pending_phi -= 2.0 * PI * dy / height * self.rotate_speed;
    }

    /// Wheel input; positive steps move the camera toward the target.
    pub fn zoom_by(&mut self, steps: f32) {
        if !self.enabled || !self.enable_zoom {
            return;
        }
        self.pending_scale *= 0.95f32.powf(self.zoom_speed * steps);
    }

    /// Applies one frame of orbit motion to `camera`.
    pub fn update(&mut self, camera: &mut PerspectiveCamera) {
        let mut spherical = Spherical::from_offset(camera.position - self.target);

        if self.auto_rotate {
            self.pending_theta -= self.auto_rotation_angle();
        }

        if self.enable_damping {
            spherical.theta += self.pending_theta * self.damping_factor;
            spherical.phi += self.pending_phi * self.damping_factor;
        } else {
            spherical.theta += self.pending_theta;
            spherical.phi += self.pending_phi;
        }

        spherical.phi = spherical
            .phi
            .clamp(self.min_polar_angle, self.max_polar_angle)
            .clamp(f32::EPSILON, PI - f32::EPSILON);

        spherical.radius = (spherical.radius * self.pending_scale)
            .clamp(self.min_distance, self.max_distance);

        camera.position = self.target + spherical.to_offset();
        camera.look_at(self.target);

        if self.enable_damping {
            self.pending_theta *= 1.0 - self.damping_factor;
            self.pending_phi *= 1.0 - self.damping_factor;
        } else {
            self.pending_theta = 0.0;
            self.pending_phi = 0.0;
        }
        self.pending_scale = 1.0;
    }

    /// Current polar angle of `camera` around the target.
    pub fn polar_angle(&self, camera: &PerspectiveCamera) -> f32 {
        Spherical::from_offset(camera.position - self.target).phi
    }

    /// Current azimuth of `camera` around the target.
    pub fn azimuth(&self, camera: &PerspectiveCamera) -> f32 {
        Spherical::from_offset(camera.position - self.target).theta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at(position: Vec3) -> PerspectiveCamera {
        let mut camera = PerspectiveCamera::new(60.0, 4.0 / 3.0, 0.5, 1000.0);
        camera.position = position;
        camera
    }

    #[test]
    fn spherical_round_trip() {
        let v = Vec3::new(3.0, 4.0, -12.0);
        let back = Spherical::from_offset(v).to_offset();
        assert!((back - v).length() < 1e-4);
    }

    #[test]
    fn auto_rotate_turns_one_revolution_in_1800_updates() {
        let mut controls = OrbitControls {
            auto_rotate: true,
            ..Default::default()
        };
        let mut camera = camera_at(Vec3::new(0.0, 50.0, -50.0));
        let start = camera.position;

        for _ in 0..900 {
            controls.update(&mut camera);
        }
        // Half way round.
        assert!((camera.position - Vec3::new(0.0, 50.0, 50.0)).length() < 0.05);

        for _ in 0..900 {
            controls.update(&mut camera);
        }
        assert!((camera.position - start).length() < 0.05);
    }

    #[test]
    fn polar_angle_is_clamped() {
        let mut controls = OrbitControls {
            min_polar_angle: PI * 0.1,
            max_polar_angle: PI * 0.5,
            ..Default::default()
        };
        let mut camera = camera_at(Vec3::new(0.0, 50.0, -50.0));

        // Drag far downward: camera would swing below the horizon.
        controls.rotate_by_pixels(0.0, -10_000.0, 600);
        controls.update(&mut camera);
        assert!((controls.polar_angle(&camera) - PI * 0.5).abs() < 1e-4);

        controls.rotate_by_pixels(0.0, 10_000.0, 600);
        controls.update(&mut camera);
        assert!((controls.polar_angle(&camera) - PI * 0.1).abs() < 1e-4);
    }

    #[test]
    fn disabled_controls_ignore_input_but_keep_auto_rotating() {
        let mut controls = OrbitControls {
            enabled: false,
            auto_rotate: true,
            ..Default::default()
        };
        let mut camera = camera_at(Vec3::new(0.0, 50.0, -50.0));
        let phi = controls.polar_angle(&camera);

        controls.rotate_by_pixels(0.0, 300.0, 600);
        controls.zoom_by(10.0);
        controls.update(&mut camera);

        assert!((controls.polar_angle(&camera) - phi).abs() < 1e-5);
        assert!((camera.position.length() - Vec3::new(0.0, 50.0, -50.0).length()).abs() < 1e-3);
        assert!(camera.position.x.abs() > 0.0);
    }

    #[test]
    fn damping_spreads_a_drag_over_several_frames() {
        let mut controls = OrbitControls {
            enable_damping: true,
            damping_factor: 0.05,
            ..Default::default()
        };
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 10.0));
        controls.rotate_by_pixels(-60.0, 0.0, 600);

        let mut previous = controls.azimuth(&camera);
        let mut steps = Vec::new();
        for _ in 0..3 {
            controls.update(&mut camera);
            let now = controls.azimuth(&camera);
            steps.push(now - previous);
            previous = now;
        }
        assert!(steps.iter().all(|s| *s > 0.0));
        assert!(steps[1] < steps[0] && steps[2] < steps[1]);
    }

    #[test]
    fn zoom_is_clamped_to_distance_range() {
        let mut controls = OrbitControls {
            min_distance: 10.0,
            max_distance: 100.0,
            ..Default::default()
        };
        let mut camera = camera_at(Vec3::new(0.0, 0.0, 50.0));
        controls.zoom_by(1_000.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - 10.0).abs() < 1e-3);

        controls.zoom_by(-1_000.0);
        controls.update(&mut camera);
        assert!((camera.position.length() - 100.0).abs() < 1e-2);
    }
}
