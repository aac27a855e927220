use std::marker::PhantomData;

use bytemuck::{bytes_of, NoUninit};
use wgpu::{util::DeviceExt, BindGroup, BindGroupLayout, Buffer, Device, Queue, ShaderStages};

pub trait Descriptor {
    fn desc<'a>() -> wgpu::VertexBufferLayout<'a>;
}

/// One POD value living in a uniform buffer, with the layout and bind group to use it.
pub struct UniformBinding<T: NoUninit> {
    pub buffer: Buffer,
    pub layout: BindGroupLayout,
    pub binding: BindGroup,
    _value: PhantomData<T>,
}

impl<T: NoUninit> UniformBinding<T> {
    pub fn new(device: &Device, name: &str, value: T, visibility: Option<ShaderStages>) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{name} Buffer")),
            contents: bytes_of(&value),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{name} Layout")),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: visibility.unwrap_or(ShaderStages::VERTEX_FRAGMENT),
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let binding = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{name} Bind Group")),
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        Self { buffer, layout, binding, _value: PhantomData }
    }

    /// Staged on the queue; lands before the next submitted command buffer.
    pub fn write(&self, queue: &Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytes_of(value));
    }
}
