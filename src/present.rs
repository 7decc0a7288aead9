use winit::dpi::PhysicalSize;

use crate::{scene::Scene, Camera, GraphicsContext};

/// Turns a scene and a camera into pixels. Errors are per frame, the loop logs them and keeps going.
pub trait Renderer {
    fn render(&mut self, scene: &Scene, camera: &Camera) -> anyhow::Result<()>;

    fn resize(&mut self, size: PhysicalSize<u32>);
}

/// Clears the window surface to the scene background. Splat and mesh rasterisation plug in as further passes.
#[derive(Debug)]
pub struct ClearPass {
    ctx: GraphicsContext,
}

impl ClearPass {
    pub fn new(ctx: GraphicsContext) -> Self {
        ClearPass { ctx }
    }
}

impl Renderer for ClearPass {
    fn render(&mut self, scene: &Scene, _camera: &Camera) -> anyhow::Result<()> {
        let (surface_texture, view) = self.ctx.new_surface_texture_and_view()?;
        let mut encoder = self.ctx.new_encoder();
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("clear to background"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(scene.background.into()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.ctx.resize(size);
    }
}
