use bytemuck::NoUninit;
use cgmath::{Matrix4, SquareMatrix, Vector3};
use wgpu::{BindGroup, Device, Queue, TextureFormat};

use crate::{
    assets::WaterAssets,
    config::WaterConfig,
    engine::{
        binding::{Descriptor, UniformBinding},
        model::{Model, Render},
        shader::{Shader, ShaderConfig},
        texture::{SamplerOptions, Texture},
    },
    error::WaterError,
    game::Vertex,
};

/// Flat grid of `vertex_count` x `vertex_count` vertices spanning `size` x `size`
/// in local space, anchored at the origin corner.
#[derive(Clone, Debug, PartialEq)]
pub struct WaterMesh {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
    pub vertex_count: u32,
    pub size: f32,
}

impl WaterMesh {
    /// Generates against the default `wgpu::Limits::max_buffer_size`.
    pub fn generate(vertex_count: u32, size: f32) -> Result<Self, WaterError> {
        Self::generate_within(vertex_count, size, wgpu::Limits::default().max_buffer_size)
    }

    /// Vertex and index buffer sizes in bytes for a `vertex_count` grid.
    pub fn buffer_sizes(vertex_count: u32) -> (u64, u64) {
        let vertices = vertex_count as u64 * vertex_count as u64;
        let cells = vertex_count.saturating_sub(1) as u64;
        (
            vertices * std::mem::size_of::<Vertex>() as u64,
            cells * cells * 6 * std::mem::size_of::<u32>() as u64,
        )
    }

    /// Rejects grids whose buffers would exceed `max_buffer_size` before allocating anything.
    pub fn generate_within(vertex_count: u32, size: f32, max_buffer_size: u64) -> Result<Self, WaterError> {
        if vertex_count < 2 || !(size.is_finite() && size > 0.0) {
            return Err(WaterError::InvalidGrid { vertex_count, size });
        }
        let (vertex_bytes, index_bytes) = Self::buffer_sizes(vertex_count);
        let bytes = vertex_bytes.max(index_bytes);
        // indices are u32
        let addressable = vertex_count as u64 * vertex_count as u64 <= u32::MAX as u64 + 1;
        if bytes > max_buffer_size || !addressable {
            return Err(WaterError::GridTooLarge { vertex_count, bytes, limit: max_buffer_size });
        }
        let last = (vertex_count - 1) as f32;
        let mut vertices = Vec::with_capacity(vertex_count as usize * vertex_count as usize);
        for gz in 0..vertex_count {
            for gx in 0..vertex_count {
                let u = gx as f32 / last;
                let v = gz as f32 / last;
                vertices.push(Vertex {
                    position: [u * size, 0.0, v * size],
                    tex_pos: [u, v],
                    normal: [0.0, 1.0, 0.0],
                });
            }
        }
        let cells = vertex_count - 1;
        let mut indices = Vec::with_capacity(cells as usize * cells as usize * 6);
        for gz in 0..cells {
            for gx in 0..cells {
                let top_left = gz * vertex_count + gx;
                let top_right = top_left + 1;
                let bottom_left = (gz + 1) * vertex_count + gx;
                let bottom_right = bottom_left + 1;
                indices.extend_from_slice(&[top_left, bottom_left, top_right, top_right, bottom_left, bottom_right]);
            }
        }
        Ok(Self { vertices, indices, vertex_count, size })
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Local-space min and max corners.
    pub fn bounds(&self) -> (Vector3<f32>, Vector3<f32>) {
        (Vector3::new(0.0, 0.0, 0.0), Vector3::new(self.size, 0.0, self.size))
    }

    pub fn world_bounds(&self, position: Vector3<f32>) -> (Vector3<f32>, Vector3<f32>) {
        let (min, max) = self.bounds();
        (min + position, max + position)
    }
}

#[repr(C)]
#[derive(NoUninit, Copy, Clone, Debug)]
pub struct WaterUniforms {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    /// time, tiling, flow speed, unused
    pub params: [f32; 4],
}

impl WaterUniforms {
    pub fn new(view: Matrix4<f32>, projection: Matrix4<f32>, model: Matrix4<f32>, time: f64, tiling: f32, flow_speed: f32) -> Self {
        Self {
            view: view.into(),
            projection: projection.into(),
            model: model.into(),
            params: [time as f32, tiling, flow_speed, 0.0],
        }
    }
}

/// Animated, textured water plane. Geometry, texture and pipeline are built once in `new`.
pub struct Water {
    mesh: WaterMesh,
    model: Model,
    texture: Texture,
    texture_binding: BindGroup,
    uniforms: UniformBinding<WaterUniforms>,
    shader: Shader,
    position: Vector3<f32>,
    model_matrix: Matrix4<f32>,
    tiling: f32,
    flow_speed: f32,
}

impl Water {
    pub fn new(device: &Device, queue: &Queue, format: TextureFormat, config: &WaterConfig, assets: &WaterAssets) -> Result<Self, WaterError> {
        let mesh = WaterMesh::generate_within(config.vertex_count, config.size, device.limits().max_buffer_size)?;
        log::debug!(
            "Water mesh: {} vertices, {} triangles over {}x{}",
            mesh.vertices.len(),
            mesh.triangle_count(),
            mesh.size,
            mesh.size
        );
        let model = Model::new(&mesh.vertices, &mesh.indices, device);
        let texture = Texture::from_image(
            device,
            queue,
            &assets.texture,
            "Water Texture",
            Some(SamplerOptions {
                address_mode: config.wrap_mode.into(),
                filter_mode: config.filter_mode.into(),
            }),
        );
        let texture_layout = Texture::layout(device);
        let texture_binding = texture.bind_group(device, &texture_layout);
        let position = config.position();
        let model_matrix = Matrix4::from_translation(position);
        let uniforms = UniformBinding::new(
            device,
            "Water Uniforms",
            WaterUniforms::new(Matrix4::identity(), Matrix4::identity(), model_matrix, 0.0, config.tiling, config.flow_speed),
            None,
        );
        let shader = Shader::new(
            &assets.vertex_source,
            &assets.fragment_source,
            device,
            format,
            vec![&uniforms.layout, &texture_layout],
            &[Vertex::desc()],
            ShaderConfig {
                cull_mode: None,
                depth_write: false,
                alpha_blend: true,
            },
        );
        Ok(Self {
            mesh,
            model,
            texture,
            texture_binding,
            uniforms,
            shader,
            position,
            model_matrix,
            tiling: config.tiling,
            flow_speed: config.flow_speed,
        })
    }

    pub fn mesh(&self) -> &WaterMesh {
        &self.mesh
    }

    pub fn position(&self) -> Vector3<f32> {
        self.position
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.model_matrix
    }

    pub fn texture_size(&self) -> (u32, u32) {
        (self.texture.texture.width(), self.texture.texture.height())
    }

    pub fn vertex_count(&self) -> u32 {
        self.model.num_vertices
    }

    pub fn index_count(&self) -> u32 {
        self.model.num_indices
    }

    /// Records one draw of the whole plane. The uniform write is staged on `queue`
    /// and takes effect for the command buffer this pass belongs to.
    pub fn render<'a: 'b, 'b>(&'a self, queue: &Queue, render_pass: &mut wgpu::RenderPass<'b>, view: Matrix4<f32>, projection: Matrix4<f32>, time: f64) {
        let uniforms = WaterUniforms::new(view, projection, self.model_matrix, time, self.tiling, self.flow_speed);
        self.uniforms.write(queue, &uniforms);
        render_pass.set_pipeline(&self.shader.pipeline);
        render_pass.set_bind_group(0, &self.uniforms.binding, &[]);
        render_pass.set_bind_group(1, &self.texture_binding, &[]);
        self.model.render(render_pass);
    }
}

#[cfg(test)]
mod tests {
    use cgmath::InnerSpace;
    use image::{DynamicImage, Rgba, RgbaImage};

    use super::*;

    fn position(vertex: &Vertex) -> Vector3<f32> {
        vertex.position.into()
    }

    #[test]
    fn grid_has_expected_counts() {
        for vertex_count in [2, 3, 17, 512] {
            let mesh = WaterMesh::generate(vertex_count, 100.0).unwrap();
            let n = vertex_count as usize;
            assert_eq!(mesh.vertices.len(), n * n);
            assert_eq!(mesh.triangle_count(), (n - 1) * (n - 1) * 2);
            assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        }
    }

    #[test]
    fn vertices_stay_inside_footprint() {
        let mesh = WaterMesh::generate(33, 100.0).unwrap();
        let offset = Vector3::new(0.0, -0.05, 0.0);
        let (min, max) = mesh.world_bounds(offset);
        for vertex in &mesh.vertices {
            let world = position(vertex) + offset;
            assert!(world.x >= min.x && world.x <= max.x);
            assert!(world.z >= min.z && world.z <= max.z);
            assert_eq!(world.y, -0.05);
            assert!(vertex.tex_pos.iter().all(|t| (0.0..=1.0).contains(t)));
        }
        assert_eq!(mesh.vertices[0].position, [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertices.last().unwrap().position, [100.0, 0.0, 100.0]);
        assert_eq!(max - min, Vector3::new(100.0, 0.0, 100.0));
    }

    #[test]
    fn triangles_face_up() {
        let mesh = WaterMesh::generate(5, 10.0).unwrap();
        for triangle in mesh.indices.chunks(3) {
            let a = position(&mesh.vertices[triangle[0] as usize]);
            let b = position(&mesh.vertices[triangle[1] as usize]);
            let c = position(&mesh.vertices[triangle[2] as usize]);
            let normal = (b - a).cross(c - a).normalize();
            assert!((normal.y - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn rejects_degenerate_grids() {
        assert!(matches!(WaterMesh::generate(1, 100.0), Err(WaterError::InvalidGrid { vertex_count: 1, .. })));
        assert!(matches!(WaterMesh::generate(0, 100.0), Err(WaterError::InvalidGrid { .. })));
        assert!(matches!(WaterMesh::generate(8, 0.0), Err(WaterError::InvalidGrid { .. })));
        assert!(matches!(WaterMesh::generate(8, -3.0), Err(WaterError::InvalidGrid { .. })));
        assert!(matches!(WaterMesh::generate(8, f32::NAN), Err(WaterError::InvalidGrid { .. })));
    }

    #[test]
    fn oversized_grids_fail_before_allocating() {
        let limit = 256 << 20;
        assert!(matches!(
            WaterMesh::generate_within(3000, 100.0, limit),
            Err(WaterError::GridTooLarge { vertex_count: 3000, bytes: 288_000_000, .. })
        ));
        assert!(matches!(WaterMesh::generate(65_535, 1.0), Err(WaterError::GridTooLarge { .. })));
        assert!(matches!(WaterMesh::generate_within(70_000, 1.0, u64::MAX), Err(WaterError::GridTooLarge { .. })));
        assert!(WaterMesh::buffer_sizes(2896).0 <= limit);
        assert!(WaterMesh::buffer_sizes(2897).0 > limit);
        assert_eq!(WaterMesh::buffer_sizes(3), (9 * 32, 4 * 6 * 4));
    }

    #[test]
    fn uniforms_carry_time_and_translation() {
        assert_eq!(std::mem::size_of::<WaterUniforms>() % 16, 0);
        let model = Matrix4::from_translation(Vector3::new(0.0, -0.05, 0.0));
        let uniforms = WaterUniforms::new(Matrix4::identity(), Matrix4::identity(), model, 12.5, 16.0, 0.02);
        assert_eq!(uniforms.params, [12.5, 16.0, 0.02, 0.0]);
        assert_eq!(uniforms.model[3], [0.0, -0.05, 0.0, 1.0]);
        let identity: [[f32; 4]; 4] = Matrix4::<f32>::identity().into();
        assert_eq!(uniforms.view, identity);
    }

    fn headless_device() -> Option<(Device, Queue)> {
        pollster::block_on(async {
            let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
            let adapter = instance.request_adapter(&wgpu::RequestAdapterOptions::default()).await?;
            adapter
                .request_device(
                    &wgpu::DeviceDescriptor {
                        label: None,
                        required_features: wgpu::Features::empty(),
                        required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                    },
                    None,
                )
                .await
                .ok()
        })
    }

    fn test_assets() -> WaterAssets {
        WaterAssets {
            vertex_source: include_str!("../res/water_vs.wgsl").to_string(),
            fragment_source: include_str!("../res/water_fs.wgsl").to_string(),
            texture: DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([30, 90, 170, 255]))),
        }
    }

    fn read_buffer(device: &Device, queue: &Queue, buffer: &wgpu::Buffer) -> Vec<u8> {
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Buffer"),
            size: buffer.size(),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, buffer.size());
        queue.submit([encoder.finish()]);
        let slice = staging.slice(..);
        slice.map_async(wgpu::MapMode::Read, |result| result.unwrap());
        let _ = device.poll(wgpu::Maintain::Wait);
        let bytes = slice.get_mapped_range().to_vec();
        staging.unmap();
        bytes
    }

    #[test]
    fn rendering_leaves_geometry_untouched() {
        let Some((device, queue)) = headless_device() else {
            eprintln!("no graphics adapter, skipping");
            return;
        };
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let config = WaterConfig {
            vertex_count: 16,
            size: 10.0,
            ..Default::default()
        };
        let water = Water::new(&device, &queue, format, &config, &test_assets()).unwrap();
        let expected = WaterMesh::generate(16, 10.0).unwrap();
        assert_eq!(water.texture_size(), (2, 2));
        assert_eq!(water.model_matrix(), Matrix4::from_translation(water.position()));
        assert_eq!(water.vertex_count(), 16 * 16);
        assert_eq!(water.index_count() as usize, 15 * 15 * 6);

        let extent = wgpu::Extent3d { width: 8, height: 8, depth_or_array_layers: 1 };
        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Test Target"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());
        let depth = crate::engine::texture::DepthTexture::create_depth_texture(&device, 8, 8, "Test Depth");
        let view = Matrix4::look_at_rh(cgmath::Point3::new(5.0, 5.0, 15.0), cgmath::Point3::new(5.0, 0.0, 5.0), Vector3::unit_y());
        let projection = crate::engine::camera::OPENGL_TO_WGPU_MATRIX * cgmath::perspective(cgmath::Deg(70.0), 1.0, 0.1, 100.0);

        for time in [0.0, 1.5, 1000.0] {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
            {
                let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: None,
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view: &target_view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                        view: &depth.view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
                water.render(&queue, &mut render_pass, view, projection, time);
            }
            queue.submit([encoder.finish()]);

            let vertex_bytes = read_buffer(&device, &queue, &water.model.vertex_buffer);
            let index_bytes = read_buffer(&device, &queue, &water.model.index_buffer);
            assert_eq!(vertex_bytes.as_slice(), bytemuck::cast_slice::<Vertex, u8>(&expected.vertices), "vertex buffer changed at time {time}");
            assert_eq!(index_bytes.as_slice(), bytemuck::cast_slice::<u32, u8>(&expected.indices), "index buffer changed at time {time}");
        }
    }

    #[test]
    fn construction_rejects_grids_over_the_device_buffer_limit() {
        let Some((device, queue)) = headless_device() else {
            eprintln!("no graphics adapter, skipping");
            return;
        };
        let limit = device.limits().max_buffer_size;
        let vertex_count = (2..=u16::MAX as u32).find(|&n| WaterMesh::buffer_sizes(n).0 > limit).unwrap_or(70_000);
        let config = WaterConfig { vertex_count, ..Default::default() };
        let result = Water::new(&device, &queue, wgpu::TextureFormat::Rgba8UnormSrgb, &config, &test_assets());
        assert!(matches!(result, Err(WaterError::GridTooLarge { .. })));
    }
}
