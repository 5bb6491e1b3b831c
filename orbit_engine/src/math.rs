//! Pure matrix constructors
//!
//! Right-handed, column vectors, depth mapped to `[0, 1]`. Rotation matrices
//! follow the row layouts the shaders were authored against: the x and z
//! rotations turn clockwise for positive angles when viewed down their axis,
//! the y rotation counter-clockwise.

use glam::{Mat4, Vec3, Vec4};

fn from_rows(r0: Vec4, r1: Vec4, r2: Vec4, r3: Vec4) -> Mat4 {
    Mat4::from_cols(r0, r1, r2, r3).transpose()
}

pub fn make_identity() -> Mat4 {
    Mat4::IDENTITY
}

/// Right-handed perspective projection
///
/// `near == far` or a zero field of view gives a non-invertible matrix.
pub fn make_perspective(fov_radians: f32, aspect: f32, near: f32, far: f32) -> Mat4 {
    let ys = 1.0 / (fov_radians * 0.5).tan();
    let xs = ys / aspect;
    let zs = far / (near - far);
    from_rows(
        Vec4::new(xs, 0.0, 0.0, 0.0),
        Vec4::new(0.0, ys, 0.0, 0.0),
        Vec4::new(0.0, 0.0, zs, near * zs),
        Vec4::new(0.0, 0.0, -1.0, 0.0),
    )
}

pub fn make_x_rotate(angle_radians: f32) -> Mat4 {
    let (s, c) = angle_radians.sin_cos();
    from_rows(
        Vec4::new(1.0, 0.0, 0.0, 0.0),
        Vec4::new(0.0, c, s, 0.0),
        Vec4::new(0.0, -s, c, 0.0),
        Vec4::W,
    )
}

pub fn make_y_rotate(angle_radians: f32) -> Mat4 {
    let (s, c) = angle_radians.sin_cos();
    from_rows(
        Vec4::new(c, 0.0, s, 0.0),
        Vec4::new(0.0, 1.0, 0.0, 0.0),
        Vec4::new(-s, 0.0, c, 0.0),
        Vec4::W,
    )
}

pub fn make_z_rotate(angle_radians: f32) -> Mat4 {
    let (s, c) = angle_radians.sin_cos();
    from_rows(
        Vec4::new(c, s, 0.0, 0.0),
        Vec4::new(-s, c, 0.0, 0.0),
        Vec4::new(0.0, 0.0, 1.0, 0.0),
        Vec4::W,
    )
}

pub fn make_translate(v: Vec3) -> Mat4 {
    Mat4::from_translation(v)
}

pub fn make_scale(v: Vec3) -> Mat4 {
    Mat4::from_scale(v)
}

#[cfg(test)]
#[path = "math_tests.rs"]
mod tests;
