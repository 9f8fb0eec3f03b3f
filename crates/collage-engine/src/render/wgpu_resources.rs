use std::any::Any;
use std::collections::HashMap;
use std::num::NonZeroU64;
use std::panic::{self, AssertUnwindSafe};

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use image::RgbaImage;
use wgpu::util::DeviceExt;

use crate::coords::ColorRgba;

use super::geometry::{
    ChannelOrder, FrameKind, GeometryResources, RawPixels, ResourceConfig, RowOrder, TextureId,
    QUAD_INDICES, QUAD_POSITIONS, QUAD_TEXCOORDS,
};
use super::{FatalError, GpuError};

const TRANSFORM_SIZE: u64 = std::mem::size_of::<TransformUniform>() as u64;
const COPY_ROW_ALIGN: u32 = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;

/// wgpu implementation of [`GeometryResources`].
///
/// Draws are recorded between `bind` and `unbind`; `unbind` uploads the
/// transforms and encodes one render pass per active target:
/// - the presentation view set through [`set_target`], if any
/// - an offscreen capture texture, for [`FrameKind::Capture`] frames
///
/// The capture texture is then copied into a mappable buffer that
/// [`read_pixels`] drains.
///
/// [`set_target`]: Self::set_target
/// [`read_pixels`]: GeometryResources::read_pixels
pub struct WgpuResources {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    config: ResourceConfig,

    width: u32,
    height: u32,

    pipeline: Option<QuadPipeline>,
    textures: HashMap<TextureId, GpuTexture>,
    next_texture: u32,

    target: Option<wgpu::TextureView>,
    capture: Option<CaptureTarget>,

    frame: Option<FrameRecording>,
    readback: Option<Readback>,
}

struct QuadPipeline {
    pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    transform_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    positions: wgpu::Buffer,
    texcoords: wgpu::Buffer,
    indices: wgpu::Buffer,

    transform_stride: u64,
    transform_capacity: usize,
    transform_ubo: wgpu::Buffer,
    transform_group: wgpu::BindGroup,

    placeholder: GpuTexture,
}

struct GpuTexture {
    _texture: wgpu::Texture,
    group: wgpu::BindGroup,
}

struct CaptureTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    width: u32,
    height: u32,
}

struct FrameRecording {
    kind: FrameKind,
    draws: Vec<(Mat4, Option<TextureId>)>,
}

struct Readback {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padded_row: u32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct TransformUniform {
    mvp: [[f32; 4]; 4],
}

impl WgpuResources {
    /// Creates uninitialized resources rendering in `format`.
    ///
    /// `format` must match the surface the frames are presented to; the
    /// capture texture uses it as well so one pipeline serves both passes.
    pub fn new(
        device: wgpu::Device,
        queue: wgpu::Queue,
        format: wgpu::TextureFormat,
        config: ResourceConfig,
    ) -> Self {
        Self {
            device,
            queue,
            format,
            config,
            width: 0,
            height: 0,
            pipeline: None,
            textures: HashMap::new(),
            next_texture: 1,
            target: None,
            capture: None,
            frame: None,
            readback: None,
        }
    }

    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Sets (or clears) the presentation view for the next frames.
    pub fn set_target(&mut self, view: Option<wgpu::TextureView>) {
        self.target = view;
    }

    fn texture_format(&self) -> wgpu::TextureFormat {
        if self.format.is_srgb() {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        }
    }

    fn build_pipeline(&self) -> Result<QuadPipeline, FatalError> {
        let device = &self.device;

        let shader = guarded(|| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("collage quad shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("shaders/quad.wgsl").into()),
            })
        })
        .map_err(FatalError::ShaderCompile)?;

        let transform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("collage transform bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(TRANSFORM_SIZE),
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("collage texture bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("collage quad pipeline layout"),
            bind_group_layouts: &[&transform_layout, &texture_layout],
            immediate_size: 0,
        });

        let position_attrs = wgpu::vertex_attr_array![0 => Float32x3];
        let texcoord_attrs = wgpu::vertex_attr_array![1 => Float32x2];

        let pipeline = guarded(|| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("collage quad pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    compilation_options: Default::default(),
                    buffers: &[
                        wgpu::VertexBufferLayout {
                            array_stride: std::mem::size_of::<[f32; 3]>() as u64,
                            step_mode: wgpu::VertexStepMode::Vertex,
                            attributes: &position_attrs,
                        },
                        wgpu::VertexBufferLayout {
                            array_stride: std::mem::size_of::<[f32; 2]>() as u64,
                            step_mode: wgpu::VertexStepMode::Vertex,
                            attributes: &texcoord_attrs,
                        },
                    ],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: Some(straight_alpha_blend()),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        })
        .map_err(FatalError::PipelineLink)?;

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("collage image sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        let positions = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("collage quad positions"),
            contents: bytemuck::cast_slice(&QUAD_POSITIONS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let texcoords = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("collage quad texcoords"),
            contents: bytemuck::cast_slice(&QUAD_TEXCOORDS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let indices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("collage quad indices"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let align = u64::from(device.limits().min_uniform_buffer_offset_alignment.max(1));
        let transform_stride = TRANSFORM_SIZE.div_ceil(align) * align;
        let transform_capacity = 64;
        let (transform_ubo, transform_group) =
            self.transform_buffer(&transform_layout, transform_stride, transform_capacity);

        let fill = RgbaImage::from_pixel(1, 1, image::Rgba(self.config.placeholder_color.to_rgba8()));
        let placeholder = self.upload(&texture_layout, &sampler, &fill, "collage placeholder");

        Ok(QuadPipeline {
            pipeline,
            texture_layout,
            transform_layout,
            sampler,
            positions,
            texcoords,
            indices,
            transform_stride,
            transform_capacity,
            transform_ubo,
            transform_group,
            placeholder,
        })
    }

    fn transform_buffer(
        &self,
        layout: &wgpu::BindGroupLayout,
        stride: u64,
        capacity: usize,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("collage transform ubo"),
            size: stride * capacity as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("collage transform bind group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(TRANSFORM_SIZE),
                }),
            }],
        });
        (buffer, group)
    }

    fn upload(
        &self,
        layout: &wgpu::BindGroupLayout,
        sampler: &wgpu::Sampler,
        image: &RgbaImage,
        label: &str,
    ) -> GpuTexture {
        let (width, height) = image.dimensions();
        let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.texture_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width * 4),
                rows_per_image: Some(height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        GpuTexture { _texture: texture, group }
    }

    fn ensure_capture_target(&mut self) {
        if let Some(c) = &self.capture {
            if c.width == self.width && c.height == self.height {
                return;
            }
        }
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("collage capture target"),
            size: wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.capture = Some(CaptureTarget {
            texture,
            view,
            width: self.width,
            height: self.height,
        });
    }

    /// Grows the transform buffer to hold `count` entries.
    fn ensure_transform_capacity(&mut self, count: usize) {
        let Some(p) = self.pipeline.as_ref() else { return };
        if count <= p.transform_capacity {
            return;
        }
        let capacity = count.next_power_of_two();
        let (ubo, group) = self.transform_buffer(&p.transform_layout, p.transform_stride, capacity);
        if let Some(p) = self.pipeline.as_mut() {
            p.transform_ubo = ubo;
            p.transform_group = group;
            p.transform_capacity = capacity;
        }
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        draws: &[(Mat4, Option<TextureId>)],
    ) {
        let Some(p) = self.pipeline.as_ref() else { return };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("collage pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_value(self.config.clear_color, self.format)),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_pipeline(&p.pipeline);
        rpass.set_vertex_buffer(0, p.positions.slice(..));
        rpass.set_vertex_buffer(1, p.texcoords.slice(..));
        rpass.set_index_buffer(p.indices.slice(..), wgpu::IndexFormat::Uint16);

        for (i, (_, texture)) in draws.iter().enumerate() {
            let offset = (i as u64 * p.transform_stride) as u32;
            let group = match texture.and_then(|t| self.textures.get(&t)) {
                Some(t) => &t.group,
                None => &p.placeholder.group,
            };
            rpass.set_bind_group(0, &p.transform_group, &[offset]);
            rpass.set_bind_group(1, group, &[]);
            rpass.draw_indexed(0..QUAD_INDICES.len() as u32, 0, 0..1);
        }
    }
}

impl GeometryResources for WgpuResources {
    fn initialize(&mut self) -> Result<(), FatalError> {
        if self.pipeline.is_some() {
            return Ok(());
        }
        self.pipeline = Some(self.build_pipeline()?);
        log::info!("quad pipeline ready (format: {:?})", self.format);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.pipeline.is_some()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn create_texture(&mut self, image: &RgbaImage) -> Result<TextureId, GpuError> {
        let (width, height) = image.dimensions();
        let Some(p) = self.pipeline.as_ref() else {
            return Err(GpuError::NotInitialized);
        };
        let max = self.device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(GpuError::TextureUpload {
                width,
                height,
                reason: format!("dimensions must be within 1..={max}"),
            });
        }

        let id = TextureId(self.next_texture);
        let label = format!("collage image {id}");
        let texture = self.upload(&p.texture_layout, &p.sampler, image, &label);
        self.next_texture += 1;
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        self.textures.remove(&texture);
    }

    fn bind(&mut self, frame: FrameKind) -> Result<(), GpuError> {
        if self.pipeline.is_none() {
            return Err(GpuError::NotInitialized);
        }
        if frame == FrameKind::Capture {
            self.readback = None;
        }
        self.frame = Some(FrameRecording { kind: frame, draws: Vec::new() });
        Ok(())
    }

    fn draw(&mut self, world: &Mat4, model: &Mat4, texture: Option<TextureId>) {
        match self.frame.as_mut() {
            Some(f) => f.draws.push((*world * *model, texture)),
            None => log::warn!("draw outside bind/unbind ignored"),
        }
    }

    fn unbind(&mut self) {
        let Some(frame) = self.frame.take() else { return };
        if self.width == 0 || self.height == 0 {
            return;
        }
        let capture = frame.kind == FrameKind::Capture;
        if self.target.is_none() && !capture {
            return;
        }

        self.ensure_transform_capacity(frame.draws.len());
        if capture {
            self.ensure_capture_target();
        }
        let Some(p) = self.pipeline.as_ref() else { return };

        let stride = p.transform_stride as usize;
        let mut bytes = vec![0u8; stride * frame.draws.len().max(1)];
        for (i, (mvp, _)) in frame.draws.iter().enumerate() {
            let u = TransformUniform { mvp: mvp.to_cols_array_2d() };
            bytes[i * stride..i * stride + TRANSFORM_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(&u));
        }
        self.queue.write_buffer(&p.transform_ubo, 0, &bytes);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("collage frame encoder"),
        });

        if let Some(view) = self.target.as_ref() {
            self.encode_pass(&mut encoder, view, &frame.draws);
        }

        if capture {
            if let Some(c) = self.capture.as_ref() {
                self.encode_pass(&mut encoder, &c.view, &frame.draws);

                let padded_row = (c.width * 4).div_ceil(COPY_ROW_ALIGN) * COPY_ROW_ALIGN;
                let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("collage capture readback"),
                    size: u64::from(padded_row) * u64::from(c.height),
                    usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
                    mapped_at_creation: false,
                });
                encoder.copy_texture_to_buffer(
                    wgpu::TexelCopyTextureInfo {
                        texture: &c.texture,
                        mip_level: 0,
                        origin: wgpu::Origin3d::ZERO,
                        aspect: wgpu::TextureAspect::All,
                    },
                    wgpu::TexelCopyBufferInfo {
                        buffer: &buffer,
                        layout: wgpu::TexelCopyBufferLayout {
                            offset: 0,
                            bytes_per_row: Some(padded_row),
                            rows_per_image: Some(c.height),
                        },
                    },
                    wgpu::Extent3d {
                        width: c.width,
                        height: c.height,
                        depth_or_array_layers: 1,
                    },
                );
                self.readback = Some(Readback {
                    buffer,
                    width: c.width,
                    height: c.height,
                    padded_row,
                });
            }
        }

        self.queue.submit(Some(encoder.finish()));
    }

    fn read_pixels(&mut self) -> Result<RawPixels, GpuError> {
        let Some(rb) = self.readback.take() else {
            return Err(GpuError::NoCapturePending);
        };

        let slice = rb.buffer.slice(..);
        let (sender, receiver) = crossbeam_channel::bounded(1);
        slice.map_async(wgpu::MapMode::Read, move |r| {
            let _ = sender.send(r);
        });
        self.device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| GpuError::Readback(e.to_string()))?;
        receiver
            .recv()
            .map_err(|e| GpuError::Readback(e.to_string()))?
            .map_err(|e| GpuError::Readback(e.to_string()))?;

        let row = rb.width as usize * 4;
        let mut data = Vec::with_capacity(row * rb.height as usize);
        {
            let mapped = slice.get_mapped_range();
            for y in 0..rb.height as usize {
                let start = y * rb.padded_row as usize;
                data.extend_from_slice(&mapped[start..start + row]);
            }
        }
        rb.buffer.unmap();

        let channel_order = match self.format {
            wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => {
                ChannelOrder::Bgra
            }
            _ => ChannelOrder::Rgba,
        };

        Ok(RawPixels {
            width: rb.width,
            height: rb.height,
            data,
            row_order: RowOrder::TopDown,
            channel_order,
        })
    }

    fn destroy(&mut self) {
        if self.pipeline.is_none() && self.textures.is_empty() {
            return;
        }
        self.frame = None;
        self.readback = None;
        self.capture = None;
        self.target = None;
        self.textures.clear();
        self.pipeline = None;
        log::debug!("quad pipeline destroyed");
    }
}

/// Clear colours are sRGB bytes; an sRGB target would encode them again.
fn clear_value(color: ColorRgba, format: wgpu::TextureFormat) -> wgpu::Color {
    if format.is_srgb() { color.to_linear().to_wgpu() } else { color.to_wgpu() }
}

fn straight_alpha_blend() -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::SrcAlpha,
        dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState { color: component, alpha: component }
}

/// Runs a wgpu creation call, turning a validation panic from the default
/// uncaptured-error handler into an error message.
fn guarded<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(panic_message)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(s) => *s,
        Err(payload) => match payload.downcast::<&'static str>() {
            Ok(s) => (*s).to_string(),
            Err(_) => "unknown wgpu validation failure".to_string(),
        },
    }
}
