//! Math utilities and types
//!
//! Provides the fundamental math types for the renderer and the placement
//! system. Matrices follow nalgebra's column-vector convention: a transform
//! `B * A` applies `A` first.

pub use nalgebra::{
    Vector2, Vector3, Vector4,
    Matrix3, Matrix4,
    Point3,
    Quaternion,
    Unit,
};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type (texture-coordinate transforms)
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// 2 * Pi
    pub const TAU: f32 = 2.0 * PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Cardinal and intercardinal unit directions in world space (Z up)
    pub mod axes {
        use super::super::Vec3;

        /// +X
        pub fn xp() -> Vec3 { Vec3::new(1.0, 0.0, 0.0) }
        /// -X
        pub fn xn() -> Vec3 { Vec3::new(-1.0, 0.0, 0.0) }
        /// +Y
        pub fn yp() -> Vec3 { Vec3::new(0.0, 1.0, 0.0) }
        /// -Y
        pub fn yn() -> Vec3 { Vec3::new(0.0, -1.0, 0.0) }
        /// +Z (up)
        pub fn zp() -> Vec3 { Vec3::new(0.0, 0.0, 1.0) }
        /// -Z (down)
        pub fn zn() -> Vec3 { Vec3::new(0.0, 0.0, -1.0) }

        /// Diagonal between +X and +Y
        pub fn xp_yp() -> Vec3 {
            Vec3::new(1.0, 1.0, 0.0).normalize()
        }

        /// Diagonal between +X and -Y
        pub fn xp_yn() -> Vec3 {
            Vec3::new(1.0, -1.0, 0.0).normalize()
        }
    }
}

/// Math utility functions
pub mod utils {
    use super::constants;

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Linear interpolation
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// Convert a hue/saturation/lightness triple (all in `[0, 1]`) to RGB
    pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
        if s <= 0.0 {
            return [l, l, l];
        }
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        let channel = |mut t: f32| {
            if t < 0.0 { t += 1.0; }
            if t > 1.0 { t -= 1.0; }
            if t < 1.0 / 6.0 {
                p + (q - p) * 6.0 * t
            } else if t < 0.5 {
                q
            } else if t < 2.0 / 3.0 {
                p + (q - p) * (2.0 / 3.0 - t) * 6.0
            } else {
                p
            }
        };
        [channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0)]
    }
}

/// Extension trait for 2D homogeneous transforms used on texture coordinates
pub trait Mat3Ext {
    /// Non-uniform scale
    fn uv_scale(sx: f32, sy: f32) -> Mat3;

    /// Translation
    fn uv_translate(tx: f32, ty: f32) -> Mat3;

    /// Counter-clockwise rotation by `radians` about the origin
    fn uv_rotate(radians: f32) -> Mat3;

    /// Apply to a texture coordinate
    fn apply_uv(&self, s: f32, t: f32) -> Vec2;
}

impl Mat3Ext for Mat3 {
    fn uv_scale(sx: f32, sy: f32) -> Mat3 {
        Mat3::new(
            sx,  0.0, 0.0,
            0.0, sy,  0.0,
            0.0, 0.0, 1.0,
        )
    }

    fn uv_translate(tx: f32, ty: f32) -> Mat3 {
        Mat3::new(
            1.0, 0.0, tx,
            0.0, 1.0, ty,
            0.0, 0.0, 1.0,
        )
    }

    fn uv_rotate(radians: f32) -> Mat3 {
        let (s, c) = radians.sin_cos();
        Mat3::new(
            c,   -s,  0.0,
            s,   c,   0.0,
            0.0, 0.0, 1.0,
        )
    }

    fn apply_uv(&self, s: f32, t: f32) -> Vec2 {
        let v = self * Vec3::new(s, t, 1.0);
        Vec2::new(v.x, v.y)
    }
}

/// Extension trait for Mat4 with camera and screen projections
pub trait Mat4Ext {
    /// OpenGL-style perspective projection from a vertical field of view in
    /// degrees and a viewport size
    fn perspective_fov(fov_y_deg: f32, width: f32, height: f32, near: f32, far: f32) -> Mat4;

    /// Orthographic projection mapping `(0..width, 0..height)` to clip space
    /// with the origin in the top-left corner
    fn screen_ortho(width: f32, height: f32) -> Mat4;

    /// Rotation part of a view matrix built from Quake-style angles
    /// `[pitch, yaw, roll]` in degrees (world is Z up, camera looks down +X)
    fn view_rotation(angles: [f32; 3]) -> Mat4;

    /// Full view matrix: translate by `-origin`, then [`Mat4Ext::view_rotation`]
    fn view_matrix(origin: Vec3, angles: [f32; 3]) -> Mat4;
}

impl Mat4Ext for Mat4 {
    fn perspective_fov(fov_y_deg: f32, width: f32, height: f32, near: f32, far: f32) -> Mat4 {
        let aspect = if height > 0.0 { width / height } else { 1.0 };
        let f = 1.0 / (utils::deg_to_rad(fov_y_deg) * 0.5).tan();

        let mut result = Mat4::zeros();
        result[(0, 0)] = f / aspect;
        result[(1, 1)] = f;
        result[(2, 2)] = -(far + near) / (far - near);
        result[(2, 3)] = -(2.0 * far * near) / (far - near);
        result[(3, 2)] = -1.0;
        result
    }

    fn screen_ortho(width: f32, height: f32) -> Mat4 {
        Mat4::new(
            2.0 / width, 0.0,           0.0,  -1.0,
            0.0,         -2.0 / height, 0.0,  1.0,
            0.0,         0.0,           -1.0, 0.0,
            0.0,         0.0,           0.0,  1.0,
        )
    }

    fn view_rotation(angles: [f32; 3]) -> Mat4 {
        let pitch = utils::deg_to_rad(angles[0]);
        let yaw = utils::deg_to_rad(angles[1]);
        let roll = utils::deg_to_rad(angles[2]);

        let (sp, cp) = pitch.sin_cos();
        let (sy, cy) = yaw.sin_cos();
        let (sr, cr) = roll.sin_cos();

        let forward = Vec3::new(cp * cy, cp * sy, -sp);
        let right = Vec3::new(
            -sr * sp * cy + cr * sy,
            -sr * sp * sy - cr * cy,
            -sr * cp,
        );
        let up = Vec3::new(
            cr * sp * cy + sr * sy,
            cr * sp * sy - sr * cy,
            cr * cp,
        );

        Mat4::new(
            right.x,    right.y,    right.z,    0.0,
            up.x,       up.y,       up.z,       0.0,
            -forward.x, -forward.y, -forward.z, 0.0,
            0.0,        0.0,        0.0,        1.0,
        )
    }

    fn view_matrix(origin: Vec3, angles: [f32; 3]) -> Mat4 {
        Self::view_rotation(angles) * Mat4::new_translation(&-origin)
    }
}
