use std::{sync::Arc, time::Instant};

use cgmath::Vector2;
use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::{DeviceEvent, DeviceId, ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey::Code},
    window::{Window, WindowId},
};

use crate::error::WaterError;

use super::texture::DepthTexture;

pub struct WindowConfig {
    pub background_color: Option<wgpu::Color>,
}

pub trait WindowHandler {
    fn resize(&mut self, surface_ctx: &SurfaceContext, new_size: Vector2<u32>);
    fn render<'a: 'b, 'b>(&'a mut self, surface_ctx: &SurfaceContext, render_pass: &mut wgpu::RenderPass<'b>, delta: f64);
    fn config(&self) -> Option<WindowConfig>;
    fn input_event(&mut self, surface_ctx: &SurfaceContext, input_event: &KeyEvent);
    fn mouse_motion(&mut self, surface_ctx: &SurfaceContext, delta: (f64, f64));
}

/// Window, surface and device for a single graphics context. Only the event loop thread touches it.
pub struct SurfaceContext {
    window: Arc<Window>,
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_texture: DepthTexture,
}

impl SurfaceContext {
    pub async fn new(window: Arc<Window>) -> Result<Self, WaterError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(WaterError::NoAdapter)?;
        let info = adapter.get_info();
        log::info!("Using adapter {} ({:?})", info.name, info.backend);
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: None,
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                },
                None,
            )
            .await?;
        device.on_uncaptured_error(Box::new(|error| log::error!("wgpu error: {error}")));
        let size = window.inner_size();
        let config = surface
            .get_default_config(&adapter, size.width.max(1), size.height.max(1))
            .ok_or(WaterError::NoAdapter)?;
        surface.configure(&device, &config);
        let depth_texture = DepthTexture::create_depth_texture(&device, config.width, config.height, "Depth Texture");
        Ok(Self { window, surface, device, queue, config, depth_texture })
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn config(&self) -> &wgpu::SurfaceConfiguration {
        &self.config
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.reconfigure();
    }

    fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = DepthTexture::create_depth_texture(&self.device, self.config.width, self.config.height, "Depth Texture");
    }
}

/// Drives a `WindowHandler` from winit. The handler is built by `ready` once the
/// first window and device exist.
pub struct Surface<H, F> {
    ready: F,
    state: Option<(SurfaceContext, H)>,
    last_frame: Instant,
    error: Option<anyhow::Error>,
}

impl<H, F> Surface<H, F>
where
    H: WindowHandler,
    F: Fn(&SurfaceContext) -> anyhow::Result<H>,
{
    pub fn new(ready: F) -> Self {
        Self {
            ready,
            state: None,
            last_frame: Instant::now(),
            error: None,
        }
    }

    /// The error that stopped the event loop, if any.
    pub fn take_error(&mut self) -> Option<anyhow::Error> {
        self.error.take()
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, error: anyhow::Error) {
        log::error!("{error:#}");
        self.error = Some(error);
        event_loop.exit();
    }

    fn init(&self, event_loop: &ActiveEventLoop) -> anyhow::Result<(SurfaceContext, H)> {
        let window = event_loop.create_window(Window::default_attributes().with_title("A Midsummer Night: Water"))?;
        let surface_ctx = pollster::block_on(SurfaceContext::new(Arc::new(window)))?;
        let handler = (self.ready)(&surface_ctx)?;
        Ok((surface_ctx, handler))
    }

    fn render_frame(&mut self, event_loop: &ActiveEventLoop) {
        let Some((surface_ctx, handler)) = &mut self.state else {
            return;
        };
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;
        let output = match surface_ctx.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost, reconfiguring");
                surface_ctx.reconfigure();
                return;
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                self.fail(event_loop, anyhow::anyhow!("surface out of memory"));
                return;
            }
            Err(error) => {
                log::warn!("Skipping frame: {error}");
                return;
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let background = handler
            .config()
            .and_then(|config| config.background_color)
            .unwrap_or(wgpu::Color::BLACK);
        let surface_ctx: &SurfaceContext = surface_ctx;
        let mut encoder = surface_ctx.device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Frame Encoder") });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(background),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &surface_ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            handler.render(surface_ctx, &mut render_pass, delta);
        }
        surface_ctx.queue.submit([encoder.finish()]);
        output.present();
    }
}

impl<H, F> ApplicationHandler for Surface<H, F>
where
    H: WindowHandler,
    F: Fn(&SurfaceContext) -> anyhow::Result<H>,
{
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match self.init(event_loop) {
            Ok(state) => {
                self.last_frame = Instant::now();
                self.state = Some(state);
            }
            Err(error) => self.fail(event_loop, error),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(new_size) => {
                if let Some((surface_ctx, handler)) = &mut self.state {
                    surface_ctx.resize(new_size);
                    handler.resize(surface_ctx, Vector2::new(new_size.width, new_size.height));
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == Code(KeyCode::Escape) && event.state == ElementState::Pressed {
                    event_loop.exit();
                    return;
                }
                if let Some((surface_ctx, handler)) = &mut self.state {
                    handler.input_event(surface_ctx, &event);
                }
            }
            WindowEvent::RedrawRequested => self.render_frame(event_loop),
            _ => {}
        }
    }

    fn device_event(&mut self, _event_loop: &ActiveEventLoop, _device_id: DeviceId, event: DeviceEvent) {
        if let DeviceEvent::MouseMotion { delta } = event {
            if let Some((surface_ctx, handler)) = &mut self.state {
                handler.mouse_motion(surface_ctx, delta);
            }
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some((surface_ctx, _)) = &self.state {
            surface_ctx.window.request_redraw();
        }
    }
}
