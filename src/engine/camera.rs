use cgmath::{Deg, EuclideanSpace, Matrix4, Point3, Vector3};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Fly camera. `ground` is the yaw around +y, `sky` the pitch, both in radians.
#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: Vector3<f32>,
    pub aspect: f32,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
    pub ground: f32,
    pub sky: f32,
}

impl Camera {
    pub fn get_forward_vec(&self) -> Vector3<f32> {
        Vector3::new(self.sky.cos() * self.ground.cos(), self.sky.sin(), self.sky.cos() * self.ground.sin())
    }

    pub fn get_walking_vec(&self) -> Vector3<f32> {
        Vector3::new(self.ground.cos(), 0.0, self.ground.sin())
    }

    pub fn get_right_vec(&self) -> Vector3<f32> {
        Vector3::new(-self.ground.sin(), 0.0, self.ground.cos())
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_to_rh(Point3::from_vec(self.eye), self.get_forward_vec(), Vector3::unit_y())
    }

    /// Perspective projection with depth remapped to wgpu's 0..1 range.
    pub fn projection_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(Deg(self.fovy), self.aspect, self.znear, self.zfar)
    }
}
