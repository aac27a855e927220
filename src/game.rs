use std::time::Instant;

use bytemuck::NoUninit;
use cgmath::{Vector2, Vector3};
use wgpu::RenderPass;
use winit::{event::KeyEvent, keyboard::{KeyCode, PhysicalKey::Code}};

use crate::{
    assets::WaterAssets,
    config::AppConfig,
    engine::{
        binding::Descriptor,
        camera::Camera,
        window::{SurfaceContext, WindowConfig, WindowHandler},
    },
    water::Water,
};

pub struct Game {
    camera: Camera,
    speed: f32,
    start_time: Instant,
    keys_down: Vec<KeyCode>,
    water: Water,
}

#[repr(C)]
#[derive(NoUninit, Copy, Clone, Debug, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_pos: [f32; 2],
    pub normal: [f32; 3],
}

impl Descriptor for Vertex {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

impl Game {
    pub fn new(surface_context: &SurfaceContext, config: &AppConfig, assets: &WaterAssets) -> anyhow::Result<Self> {
        let screen_size = [surface_context.config().width as f32, surface_context.config().height as f32];
        let camera = Camera {
            eye: config.camera.eye.into(),
            aspect: screen_size[0] / screen_size[1],
            fovy: config.camera.fovy,
            znear: config.camera.znear,
            zfar: config.camera.zfar,
            ground: 0.0,
            sky: -0.2,
        };
        let water = Water::new(surface_context.device(), surface_context.queue(), surface_context.config().format, &config.water, assets)?;
        Ok(Self {
            camera,
            speed: config.camera.speed,
            start_time: Instant::now(),
            keys_down: vec![],
            water,
        })
    }

    fn move_camera(&mut self, delta: f64) {
        let speed = self.speed * delta as f32;
        if self.keys_down.contains(&KeyCode::KeyW) {
            self.camera.eye += self.camera.get_walking_vec() * speed;
        }
        if self.keys_down.contains(&KeyCode::KeyS) {
            self.camera.eye -= self.camera.get_walking_vec() * speed;
        }
        if self.keys_down.contains(&KeyCode::KeyA) {
            self.camera.eye -= self.camera.get_right_vec() * speed;
        }
        if self.keys_down.contains(&KeyCode::KeyD) {
            self.camera.eye += self.camera.get_right_vec() * speed;
        }
        if self.keys_down.contains(&KeyCode::Space) {
            self.camera.eye += Vector3::unit_y() * speed;
        }
        if self.keys_down.contains(&KeyCode::ShiftLeft) {
            self.camera.eye -= Vector3::unit_y() * speed;
        }
    }
}

impl WindowHandler for Game {
    fn resize(&mut self, _surface_ctx: &SurfaceContext, new_size: Vector2<u32>) {
        self.camera.aspect = new_size.x as f32 / new_size.y as f32;
    }

    fn render<'a: 'b, 'b>(&'a mut self, surface_ctx: &SurfaceContext, render_pass: &mut RenderPass<'b>, delta: f64) {
        self.move_camera(delta);
        let time = self.start_time.elapsed().as_secs_f64();
        self.water.render(surface_ctx.queue(), render_pass, self.camera.view_matrix(), self.camera.projection_matrix(), time);
    }

    fn config(&self) -> Option<WindowConfig> {
        // midsummer night sky
        Some(WindowConfig { background_color: Some(wgpu::Color { r: 0.02, g: 0.03, b: 0.08, a: 1.0 }) })
    }

    fn input_event(&mut self, _surface_ctx: &SurfaceContext, input_event: &KeyEvent) {
        if let Code(code) = input_event.physical_key {
            if input_event.state.is_pressed() {
                if !self.keys_down.contains(&code) {
                    self.keys_down.push(code);
                }
            } else if let Some(i) = self.keys_down.iter().position(|x| x == &code) {
                self.keys_down.remove(i);
            }
        }
    }

    fn mouse_motion(&mut self, _surface_ctx: &SurfaceContext, delta: (f64, f64)) {
        self.camera.ground += (delta.0 / 500.0) as f32;
        self.camera.sky -= (delta.1 / 500.0) as f32;
        self.camera.sky = self.camera.sky.clamp(std::f32::consts::PI * -0.499, std::f32::consts::PI * 0.499);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_struct() {
        let layout = Vertex::desc();
        assert_eq!(layout.array_stride as usize, std::mem::size_of::<Vertex>());
        assert_eq!(std::mem::size_of::<Vertex>(), 8 * 4);
        let locations: Vec<_> = layout.attributes.iter().map(|a| (a.shader_location, a.offset)).collect();
        assert_eq!(locations, vec![(0, 0), (1, 12), (2, 20)]);
    }
}
