//! wgpu backend
//!
//! Renders into an offscreen `Rgba8Unorm` texture. Presenting reads the
//! texture back so hosts without a swapchain can still composite it.

use super::{size_mismatch, BlendMode, GpuContext, GpuError};
use bytemuck::{Pod, Zeroable};
use tiny_skia::Pixmap;
use wgpu::util::DeviceExt;

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const SHADER: &str = r#"
struct View {
    size: vec2<f32>,
    padding: vec2<f32>,
};

@group(0) @binding(0)
var<uniform> view: View;

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) color: vec4<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) color: vec4<f32>) -> VertexOutput {
    var out: VertexOutput;
    let x = (position.x / view.size.x) * 2.0 - 1.0;
    let y = 1.0 - (position.y / view.size.y) * 2.0;
    out.position = vec4<f32>(x, y, 0.0, 1.0);
    out.color = color;
    return out;
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct InkVertex {
    position: [f32; 2],
    color: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ViewUniform {
    size: [f32; 2],
    padding: [f32; 2],
}

/// Contiguous vertex range sharing one blend mode
struct DrawBatch {
    blend: BlendMode,
    vertices: std::ops::Range<u32>,
}

struct RenderTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// Headless wgpu render target with ink and eraser pipelines
pub struct WgpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    adapter_name: String,
    target: RenderTarget,
    ink_pipeline: wgpu::RenderPipeline,
    erase_pipeline: wgpu::RenderPipeline,
    view_buffer: wgpu::Buffer,
    view_bind_group: wgpu::BindGroup,
    vertices: Vec<InkVertex>,
    batches: Vec<DrawBatch>,
    pending_clear: bool,
}

impl WgpuContext {
    /// Create a new context on the first available adapter
    pub fn new(width: u32, height: u32) -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            force_fallback_adapter: false,
            compatible_surface: None,
        }))
        .ok_or_else(|| GpuError::InitializationFailed("no compatible adapter".to_string()))?;

        let info = adapter.get_info();
        let adapter_name = format!("{} ({:?})", info.name, info.backend);

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("pdf-ink-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                memory_hints: Default::default(),
            },
            None,
        ))
        .map_err(|error| GpuError::DeviceCreationFailed(error.to_string()))?;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("pdf-ink-shader"),
            source: wgpu::ShaderSource::Wgsl(SHADER.into()),
        });

        let view_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("pdf-ink-view-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(
                        std::mem::size_of::<ViewUniform>() as u64
                    ),
                },
                count: None,
            }],
        });

        let view_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("pdf-ink-view"),
            contents: bytemuck::bytes_of(&view_uniform(width.max(1), height.max(1))),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let view_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("pdf-ink-view-bind-group"),
            layout: &view_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: view_buffer.as_entire_binding(),
            }],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("pdf-ink-pipeline-layout"),
            bind_group_layouts: &[&view_layout],
            push_constant_ranges: &[],
        });

        let ink_pipeline = create_pipeline(&device, &layout, &shader, BlendMode::Ink);
        let erase_pipeline = create_pipeline(&device, &layout, &shader, BlendMode::Erase);
        let target = create_target(&device, width, height)?;

        Ok(Self {
            device,
            queue,
            adapter_name,
            target,
            ink_pipeline,
            erase_pipeline,
            view_buffer,
            view_bind_group,
            vertices: Vec::new(),
            batches: Vec::new(),
            pending_clear: true,
        })
    }

    fn discard_queued(&mut self) {
        self.vertices.clear();
        self.batches.clear();
    }
}

impl GpuContext for WgpuContext {
    fn describe(&self) -> String {
        format!("wgpu {}", self.adapter_name)
    }

    fn size(&self) -> (u32, u32) {
        (self.target.width, self.target.height)
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), GpuError> {
        self.target = create_target(&self.device, width, height)?;
        self.queue.write_buffer(
            &self.view_buffer,
            0,
            bytemuck::bytes_of(&view_uniform(self.target.width, self.target.height)),
        );
        self.discard_queued();
        self.pending_clear = true;
        Ok(())
    }

    fn clear(&mut self) {
        self.discard_queued();
        self.pending_clear = true;
    }

    fn upload(&mut self, source: &Pixmap) -> Result<(), GpuError> {
        let source_size = (source.width(), source.height());
        if source_size != self.size() {
            return Err(size_mismatch(self.size(), source_size));
        }

        self.discard_queued();
        self.pending_clear = false;
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            source.data(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(self.target.width * 4),
                rows_per_image: Some(self.target.height),
            },
            extent(self.target.width, self.target.height),
        );
        Ok(())
    }

    fn draw_triangles(&mut self, positions: &[[f32; 2]], color: [f32; 4], blend: BlendMode) {
        let count = positions.len() - positions.len() % 3;
        if count == 0 {
            return;
        }

        let start = self.vertices.len() as u32;
        self.vertices
            .extend(positions[..count].iter().map(|&position| InkVertex { position, color }));
        let end = self.vertices.len() as u32;

        match self.batches.last_mut() {
            Some(batch) if batch.blend == blend && batch.vertices.end == start => {
                batch.vertices.end = end;
            }
            _ => self.batches.push(DrawBatch { blend, vertices: start..end }),
        }
    }

    fn flush(&mut self) -> Result<(), GpuError> {
        if self.vertices.is_empty() && !self.pending_clear {
            return Ok(());
        }

        let vertex_buffer = (!self.vertices.is_empty()).then(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("pdf-ink-vertices"),
                contents: bytemuck::cast_slice(&self.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });

        let descriptor = wgpu::CommandEncoderDescriptor { label: Some("pdf-ink-flush") };
        let mut encoder = self.device.create_command_encoder(&descriptor);
        {
            let load = if self.pending_clear {
                wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
            } else {
                wgpu::LoadOp::Load
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("pdf-ink-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target.view,
                    resolve_target: None,
                    ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if let Some(buffer) = &vertex_buffer {
                pass.set_bind_group(0, &self.view_bind_group, &[]);
                pass.set_vertex_buffer(0, buffer.slice(..));
                for batch in &self.batches {
                    let pipeline = match batch.blend {
                        BlendMode::Ink => &self.ink_pipeline,
                        BlendMode::Erase => &self.erase_pipeline,
                    };
                    pass.set_pipeline(pipeline);
                    pass.draw(batch.vertices.clone(), 0..1);
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
        self.discard_queued();
        self.pending_clear = false;
        Ok(())
    }

    fn read_pixels(&mut self, target: &mut Pixmap) -> Result<(), GpuError> {
        self.flush()?;

        let target_size = (target.width(), target.height());
        if target_size != self.size() {
            return Err(size_mismatch(self.size(), target_size));
        }

        let (width, height) = self.size();
        let row_bytes = width * 4;
        let padded_row_bytes = row_bytes.div_ceil(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT)
            * wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

        let output = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("pdf-ink-readback"),
            size: u64::from(padded_row_bytes) * u64::from(height),
            usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let descriptor = wgpu::CommandEncoderDescriptor { label: Some("pdf-ink-readback") };
        let mut encoder = self.device.create_command_encoder(&descriptor);
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &output,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(height),
                },
            },
            extent(width, height),
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = output.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            if sender.send(result).is_err() {
                log::debug!("readback receiver dropped before the buffer was mapped");
            }
        });
        self.device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|error| GpuError::ReadbackFailed(error.to_string()))?
            .map_err(|error| GpuError::ReadbackFailed(error.to_string()))?;

        {
            let mapped = slice.get_mapped_range();
            let rows = target.data_mut().chunks_exact_mut(row_bytes as usize);
            for (row, padded) in rows.zip(mapped.chunks(padded_row_bytes as usize)) {
                row.copy_from_slice(&padded[..row_bytes as usize]);
            }
        }
        output.unmap();
        Ok(())
    }
}

fn view_uniform(width: u32, height: u32) -> ViewUniform {
    ViewUniform { size: [width as f32, height as f32], padding: [0.0; 2] }
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d { width, height, depth_or_array_layers: 1 }
}

fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    let component = |src_factor, dst_factor| wgpu::BlendComponent {
        src_factor,
        dst_factor,
        operation: wgpu::BlendOperation::Add,
    };

    match mode {
        BlendMode::Ink => wgpu::BlendState {
            color: component(wgpu::BlendFactor::SrcAlpha, wgpu::BlendFactor::OneMinusSrcAlpha),
            alpha: component(wgpu::BlendFactor::One, wgpu::BlendFactor::OneMinusSrcAlpha),
        },
        BlendMode::Erase => wgpu::BlendState {
            color: component(wgpu::BlendFactor::Zero, wgpu::BlendFactor::OneMinusSrcAlpha),
            alpha: component(wgpu::BlendFactor::Zero, wgpu::BlendFactor::OneMinusSrcAlpha),
        },
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    mode: BlendMode,
) -> wgpu::RenderPipeline {
    let label = match mode {
        BlendMode::Ink => "pdf-ink-ink-pipeline",
        BlendMode::Erase => "pdf-ink-erase-pipeline",
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<InkVertex>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4],
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: Some(blend_state(mode)),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn create_target(device: &wgpu::Device, width: u32, height: u32) -> Result<RenderTarget, GpuError> {
    let (width, height) = (width.max(1), height.max(1));
    let max = device.limits().max_texture_dimension_2d;
    if width > max || height > max {
        return Err(GpuError::TextureCreationFailed(format!(
            "{width}x{height} exceeds the device limit of {max}"
        )));
    }

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("pdf-ink-target"),
        size: extent(width, height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::COPY_SRC
            | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    Ok(RenderTarget { texture, view, width, height })
}
