use std::{
    ops::Deref,
    sync::{Arc, Mutex},
};

use anyhow::{anyhow, Context};
use log::{info, warn};
use wgpu::SurfaceConfiguration;
use winit::{dpi::PhysicalSize, window::Window};

#[derive(Debug, Clone)]
pub struct GraphicsContext(Arc<GraphicsContextInner>);

impl Deref for GraphicsContext {
    type Target = GraphicsContextInner;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug)]
pub struct GraphicsContextInner {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub surface: wgpu::Surface<'static>,
    pub surface_format: wgpu::TextureFormat,
    pub surface_config: Mutex<SurfaceConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Copy)]
pub struct GraphicsContextConfig {
    pub present_mode: wgpu::PresentMode,
    /// used if the surface supports it, otherwise the first sRGB format it offers
    pub surface_format: wgpu::TextureFormat,
}

impl Default for GraphicsContextConfig {
    fn default() -> Self {
        Self {
            present_mode: wgpu::PresentMode::AutoVsync,
            surface_format: wgpu::TextureFormat::Bgra8UnormSrgb,
        }
    }
}

impl GraphicsContext {
    pub fn new(
        config: GraphicsContextConfig,
        rt: &tokio::runtime::Runtime,
        window: Arc<Window>,
    ) -> anyhow::Result<Self> {
        rt.block_on(initialize_graphics_context(config, window))
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        match self.surface_config.lock() {
            Ok(config) => PhysicalSize::new(config.width, config.height),
            Err(_) => PhysicalSize::new(0, 0),
        }
    }

    pub fn new_encoder(&self) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Encoder"),
            })
    }

    /// Reconfigures the surface if it went stale, so the next frame can succeed.
    pub fn new_surface_texture_and_view(
        &self,
    ) -> anyhow::Result<(wgpu::SurfaceTexture, wgpu::TextureView)> {
        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(err @ (wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                self.reconfigure();
                return Err(anyhow!("surface needs to be recreated: {err}"));
            }
            Err(err) => return Err(err.into()),
        };
        let view = output.texture.create_view(&Default::default());
        Ok((output, view))
    }

    /// Zero sized surfaces (minimized windows) are not configured.
    pub fn resize(&self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        let Ok(mut config) = self.surface_config.lock() else {
            warn!("surface config lock poisoned, skipping resize");
            return;
        };
        config.width = size.width;
        config.height = size.height;
        self.surface.configure(&self.device, &config);
    }

    fn reconfigure(&self) {
        if let Ok(config) = self.surface_config.lock() {
            self.surface.configure(&self.device, &config);
        }
    }
}

pub async fn initialize_graphics_context(
    config: GraphicsContextConfig,
    window: Arc<Window>,
) -> anyhow::Result<GraphicsContext> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        ..Default::default()
    });

    let size = window.inner_size();
    let surface = instance.create_surface(window)?;
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        })
        .await
        .context("no compatible graphics adapter")?;
    info!("Using adapter {:?}", adapter.get_info().name);

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
            },
            None,
        )
        .await?;

    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = if surface_caps.formats.contains(&config.surface_format) {
        config.surface_format
    } else {
        surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?
    };
    let alpha_mode = surface_caps
        .alpha_modes
        .first()
        .copied()
        .unwrap_or(wgpu::CompositeAlphaMode::Auto);

    let surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode: config.present_mode,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(&device, &surface_config);
    let surface_config = Mutex::new(surface_config);

    let ctx = GraphicsContextInner {
        instance,
        adapter,
        device,
        queue,
        surface,
        surface_config,
        surface_format,
    };
    Ok(GraphicsContext(Arc::new(ctx)))
}
