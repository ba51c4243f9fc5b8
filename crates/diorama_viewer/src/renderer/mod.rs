//! GPU backend for the viewport: every entity's mesh vertices and the snow
//! field are drawn as points through one camera uniform.

pub mod context;
pub mod points;

use self::{
    context::{GfxContext, DEPTH_FORMAT},
    points::{CameraUniform, InstanceRaw, PointsPipeline},
};
use anyhow::anyhow;
use diorama_core::{
    camera::PerspectiveCamera,
    scene::{Color, Model, Scene},
    viewport::{FrameRenderer, SurfaceSize},
};
use glam::Mat4;
use std::{collections::HashMap, sync::Arc};
use wgpu::util::DeviceExt;
use winit::window::Window;

/// Vertex buffer of one loaded model, shared by all its clones.
struct ModelGpu {
    vertices: wgpu::Buffer,
    count: u32,
}

impl ModelGpu {
    fn new(device: &wgpu::Device, model: &Model) -> Option<Self> {
        let positions = &model.geometry.positions;
        if positions.is_empty() {
            return None;
        }
        let vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Model Vertices"),
            contents: bytemuck::cast_slice(positions.as_slice()),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Some(Self {
            vertices,
            count: positions.len() as u32,
        })
    }
}

struct SnowGpu {
    vertices: wgpu::Buffer,
    count: u32,
}

pub struct GpuRenderer {
    gfx: GfxContext,
    points: PointsPipeline,
    camera_buf: wgpu::Buffer,
    camera_bind: wgpu::BindGroup,
    /// Keyed by model address; models stay in the scene for the whole run.
    models: HashMap<usize, ModelGpu>,
    instances: wgpu::Buffer,
    instance_capacity: usize,
    snow: Option<SnowGpu>,
}

impl GpuRenderer {
    pub async fn new(window: Arc<Window>) -> anyhow::Result<Self> {
        let gfx = GfxContext::new(window).await?;
        let points = PointsPipeline::new(&gfx.device, gfx.config.format, DEPTH_FORMAT);

        let camera_buf = gfx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Camera UBO"),
            size: std::mem::size_of::<CameraUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind = gfx.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera Bind Group"),
            layout: &points.camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buf.as_entire_binding(),
            }],
        });

        let instance_capacity = 64;
        let instances = create_instance_buffer(&gfx.device, instance_capacity);

        Ok(Self {
            gfx,
            points,
            camera_buf,
            camera_bind,
            models: HashMap::new(),
            instances,
            instance_capacity,
            snow: None,
        })
    }

    fn upload_instances(&mut self, data: &[InstanceRaw]) {
        if data.is_empty() {
            return;
        }
        if data.len() > self.instance_capacity {
            self.instance_capacity = data.len().next_power_of_two();
            self.instances = create_instance_buffer(&self.gfx.device, self.instance_capacity);
        }
        self.gfx
            .queue
            .write_buffer(&self.instances, 0, bytemuck::cast_slice(data));
    }

    fn upload_snow(&mut self, positions: &[glam::Vec3]) {
        let count = positions.len() as u32;
        match &self.snow {
            Some(snow) if snow.count == count => {
                self.gfx
                    .queue
                    .write_buffer(&snow.vertices, 0, bytemuck::cast_slice(positions));
            }
            _ => {
                let vertices = self
                    .gfx
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Snow Vertices"),
                        contents: bytemuck::cast_slice(positions),
                        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                    });
                self.snow = Some(SnowGpu { vertices, count });
            }
        }
    }
}

impl FrameRenderer for GpuRenderer {
    fn resize(&mut self, size: SurfaceSize) {
        self.gfx.resize(size.width, size.height);
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> anyhow::Result<()> {
        let frame = match self.gfx.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.gfx.reconfigure();
                return Ok(());
            }
            Err(e) => return Err(anyhow!("Failed to acquire frame: {e}")),
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let uniform = CameraUniform {
            view_proj: camera.view_proj().to_cols_array_2d(),
        };
        self.gfx
            .queue
            .write_buffer(&self.camera_buf, 0, bytemuck::bytes_of(&uniform));

        for entity in scene.entities() {
            let key = Arc::as_ptr(&entity.model) as usize;
            if !self.models.contains_key(&key) {
                if let Some(gpu) = ModelGpu::new(&self.gfx.device, &entity.model) {
                    log::debug!("Uploaded '{}' ({} vertices)", entity.model.name, gpu.count);
                    self.models.insert(key, gpu);
                }
            }
        }

        let mut instances: Vec<InstanceRaw> = scene
            .entities()
            .iter()
            .map(|entity| {
                let [r, g, b] = entity.model.base_color();
                InstanceRaw {
                    model: entity.transform.matrix().to_cols_array_2d(),
                    color: [srgb_to_linear(r), srgb_to_linear(g), srgb_to_linear(b), 1.0],
                }
            })
            .collect();

        let snow_instance = instances.len() as u32;
        let draw_snow = match &scene.particles {
            Some(field) if !field.is_empty() => {
                self.upload_snow(field.positions());
                let [r, g, b] = field.style.color;
                instances.push(InstanceRaw {
                    model: Mat4::IDENTITY.to_cols_array_2d(),
                    color: [r, g, b, field.style.opacity],
                });
                true
            }
            _ => false,
        };
        self.upload_instances(&instances);

        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear_color(scene.background)),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.gfx.depth,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.points.pipeline);
            pass.set_bind_group(0, &self.camera_bind, &[]);
            pass.set_vertex_buffer(1, self.instances.slice(..));

            for (index, entity) in scene.entities().iter().enumerate() {
                let key = Arc::as_ptr(&entity.model) as usize;
                if let Some(model) = self.models.get(&key) {
                    let instance = index as u32;
                    pass.set_vertex_buffer(0, model.vertices.slice(..));
                    pass.draw(0..model.count, instance..instance + 1);
                }
            }

            if let (true, Some(snow)) = (draw_snow, &self.snow) {
                pass.set_vertex_buffer(0, snow.vertices.slice(..));
                pass.draw(0..snow.count, snow_instance..snow_instance + 1);
            }
        }

        self.gfx.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instances"),
        size: (capacity * std::mem::size_of::<InstanceRaw>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

/// Scene colours are authored in sRGB; the surface expects linear values.
fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn clear_color(color: Color) -> wgpu::Color {
    wgpu::Color {
        r: srgb_to_linear(color.r) as f64,
        g: srgb_to_linear(color.g) as f64,
        b: srgb_to_linear(color.b) as f64,
        a: 1.0,
    }
}
