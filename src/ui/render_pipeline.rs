use wgpu::{self, util::DeviceExt};

// Blur settings for the two composited views of the same geometry
const GLOW_BLUR_RADIUS: f32 = 12.0;
const GLOW_BRIGHTNESS: f32 = 1.2;
const SHARP_BLUR_RADIUS: f32 = 2.0;
const SHARP_BRIGHTNESS: f32 = 1.1;

// Window backdrop, linearized from the page background
const BACKGROUND_COLOR: wgpu::Color = wgpu::Color {
    r: 0.0030,
    g: 0.0052,
    b: 0.0070,
    a: 1.0,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct AuraVertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl AuraVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<AuraVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x4,
                },
            ],
        }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BlurUniforms {
    direction: [f32; 2],
    radius: f32,
    brightness: f32,
}

struct SceneTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

fn create_scene_target(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
    label: &str,
) -> SceneTarget {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    SceneTarget {
        _texture: texture,
        view,
    }
}

/// Pipelines and offscreen targets for the aura
///
/// The same frame's geometry is rendered into two scene textures and each
/// is composited onto the surface through a separable gaussian blur: a
/// heavy pass for the soft glow and a light pass that keeps the ribbon
/// definition.
pub struct AuraRenderPipelines {
    aura_pipeline: wgpu::RenderPipeline,
    blur_write_pipeline: wgpu::RenderPipeline,
    blur_composite_pipeline: wgpu::RenderPipeline,
    blur_bind_group_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,

    vertex_buffer: wgpu::Buffer,
    vertex_capacity: usize,

    glow_scene: SceneTarget,
    sharp_scene: SceneTarget,
    scratch: SceneTarget,

    glow_h_uniform: wgpu::Buffer,
    glow_v_uniform: wgpu::Buffer,
    sharp_h_uniform: wgpu::Buffer,
    sharp_v_uniform: wgpu::Buffer,
    bind_glow_h: wgpu::BindGroup,
    bind_glow_v: wgpu::BindGroup,
    bind_sharp_h: wgpu::BindGroup,
    bind_sharp_v: wgpu::BindGroup,

    format: wgpu::TextureFormat,
}

impl AuraRenderPipelines {
    pub fn new(
        device: &wgpu::Device,
        config: &wgpu::SurfaceConfiguration,
        max_vertices: usize,
    ) -> Self {
        let aura_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Aura Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("aura.wgsl").into()),
        });

        let aura_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Aura Pipeline Layout"),
            bind_group_layouts: &[],
            push_constant_ranges: &[],
        });

        let aura_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Aura Render Pipeline"),
            layout: Some(&aura_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &aura_shader,
                entry_point: Some("vs_main"),
                buffers: &[AuraVertex::desc()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &aura_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let blur_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blur Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("blur.wgsl").into()),
        });

        let blur_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Blur Bind Group Layout"),
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
                    wgpu::BindGroupLayoutEntry {
                        binding: 2,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(
                                std::mem::size_of::<BlurUniforms>() as u64,
                            ),
                        },
                        count: None,
                    },
                ],
            });

        let blur_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Blur Pipeline Layout"),
                bind_group_layouts: &[&blur_bind_group_layout],
                push_constant_ranges: &[],
            });

        let make_blur_pipeline = |label: &str, blend: Option<wgpu::BlendState>| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&blur_pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &blur_shader,
                    entry_point: Some("vs_main"),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &blur_shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: config.format,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
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
                multiview: None,
                cache: None,
            })
        };

        // Horizontal pass writes the scratch texture outright; the vertical
        // pass composites over whatever is already on the surface
        let blur_write_pipeline = make_blur_pipeline("Blur Write Pipeline", None);
        let blur_composite_pipeline =
            make_blur_pipeline("Blur Composite Pipeline", Some(wgpu::BlendState::ALPHA_BLENDING));

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Blur Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let uniform = |label: &str, direction: [f32; 2], radius: f32, brightness: f32| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::bytes_of(&BlurUniforms {
                    direction,
                    radius,
                    brightness,
                }),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        };

        let glow_h_uniform = uniform("Glow H Uniform", [1.0, 0.0], GLOW_BLUR_RADIUS, 1.0);
        let glow_v_uniform =
            uniform("Glow V Uniform", [0.0, 1.0], GLOW_BLUR_RADIUS, GLOW_BRIGHTNESS);
        let sharp_h_uniform = uniform("Sharp H Uniform", [1.0, 0.0], SHARP_BLUR_RADIUS, 1.0);
        let sharp_v_uniform =
            uniform("Sharp V Uniform", [0.0, 1.0], SHARP_BLUR_RADIUS, SHARP_BRIGHTNESS);

        let vertex_capacity = max_vertices.max(64);
        let vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Aura Vertex Buffer"),
            size: (vertex_capacity * std::mem::size_of::<AuraVertex>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let glow_scene =
            create_scene_target(device, config.format, config.width, config.height, "Glow Scene");
        let sharp_scene = create_scene_target(
            device,
            config.format,
            config.width,
            config.height,
            "Sharp Scene",
        );
        let scratch =
            create_scene_target(device, config.format, config.width, config.height, "Blur Scratch");

        let bind = |label: &str, view: &wgpu::TextureView, uniform: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &blur_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniform.as_entire_binding(),
                    },
                ],
            })
        };

        let bind_glow_h = bind("Glow H Bind Group", &glow_scene.view, &glow_h_uniform);
        let bind_glow_v = bind("Glow V Bind Group", &scratch.view, &glow_v_uniform);
        let bind_sharp_h = bind("Sharp H Bind Group", &sharp_scene.view, &sharp_h_uniform);
        let bind_sharp_v = bind("Sharp V Bind Group", &scratch.view, &sharp_v_uniform);

        Self {
            aura_pipeline,
            blur_write_pipeline,
            blur_composite_pipeline,
            blur_bind_group_layout,
            sampler,
            vertex_buffer,
            vertex_capacity,
            glow_scene,
            sharp_scene,
            scratch,
            glow_h_uniform,
            glow_v_uniform,
            sharp_h_uniform,
            sharp_v_uniform,
            bind_glow_h,
            bind_glow_v,
            bind_sharp_h,
            bind_sharp_v,
            format: config.format,
        }
    }

    /// Recreate the offscreen targets for a new surface size.
    /// The animation clock and smoothing state live elsewhere and are
    /// untouched by a resize.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        self.glow_scene = create_scene_target(device, self.format, width, height, "Glow Scene");
        self.sharp_scene = create_scene_target(device, self.format, width, height, "Sharp Scene");
        self.scratch = create_scene_target(device, self.format, width, height, "Blur Scratch");

        let bind = |label: &str, view: &wgpu::TextureView, uniform: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &self.blur_bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&self.sampler),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: uniform.as_entire_binding(),
                    },
                ],
            })
        };

        self.bind_glow_h = bind("Glow H Bind Group", &self.glow_scene.view, &self.glow_h_uniform);
        self.bind_glow_v = bind("Glow V Bind Group", &self.scratch.view, &self.glow_v_uniform);
        self.bind_sharp_h =
            bind("Sharp H Bind Group", &self.sharp_scene.view, &self.sharp_h_uniform);
        self.bind_sharp_v = bind("Sharp V Bind Group", &self.scratch.view, &self.sharp_v_uniform);
    }

    fn scene_pass<'a>(
        encoder: &'a mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        label: &str,
    ) -> wgpu::RenderPass<'a> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }

    fn blur_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        bind_group: &wgpu::BindGroup,
        composite: bool,
        label: &str,
    ) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: if composite {
                        wgpu::LoadOp::Load
                    } else {
                        wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT)
                    },
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        pass.set_pipeline(if composite {
            &self.blur_composite_pipeline
        } else {
            &self.blur_write_pipeline
        });
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// Render one frame of ribbons and composite both blurred views onto
    /// the surface.
    ///
    /// `glow_ribbons` and `sharp_ribbons` are triangle-strip vertex runs;
    /// each run is drawn as its own strip so consecutive ribbons do not
    /// bridge.
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        surface_view: &wgpu::TextureView,
        glow_ribbons: &[Vec<AuraVertex>],
        sharp_ribbons: &[Vec<AuraVertex>],
    ) {
        // Pack every ribbon into one buffer, tracking draw ranges per scene
        let mut vertices: Vec<AuraVertex> = Vec::new();
        let mut glow_ranges = Vec::with_capacity(glow_ribbons.len());
        let mut sharp_ranges = Vec::with_capacity(sharp_ribbons.len());

        for ribbon in glow_ribbons {
            let start = vertices.len() as u32;
            vertices.extend_from_slice(ribbon);
            glow_ranges.push(start..vertices.len() as u32);
        }
        for ribbon in sharp_ribbons {
            let start = vertices.len() as u32;
            vertices.extend_from_slice(ribbon);
            sharp_ranges.push(start..vertices.len() as u32);
        }

        if vertices.len() > self.vertex_capacity {
            self.vertex_capacity = vertices.len().next_power_of_two();
            self.vertex_buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("Aura Vertex Buffer"),
                size: (self.vertex_capacity * std::mem::size_of::<AuraVertex>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
        }
        if !vertices.is_empty() {
            queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }

        // Scene passes: same model, two views
        {
            let mut pass = Self::scene_pass(encoder, &self.glow_scene.view, "Glow Scene Pass");
            pass.set_pipeline(&self.aura_pipeline);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            for range in &glow_ranges {
                pass.draw(range.clone(), 0..1);
            }
        }
        {
            let mut pass = Self::scene_pass(encoder, &self.sharp_scene.view, "Sharp Scene Pass");
            pass.set_pipeline(&self.aura_pipeline);
            pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
            for range in &sharp_ranges {
                pass.draw(range.clone(), 0..1);
            }
        }

        // Backdrop clear on the surface
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: surface_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(BACKGROUND_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }

        // Glow view: heavy blur, then composite
        self.blur_pass(encoder, &self.scratch.view, &self.bind_glow_h, false, "Glow Blur H");
        self.blur_pass(encoder, surface_view, &self.bind_glow_v, true, "Glow Blur V");

        // Sharp view: light blur over the glow
        self.blur_pass(encoder, &self.scratch.view, &self.bind_sharp_h, false, "Sharp Blur H");
        self.blur_pass(encoder, surface_view, &self.bind_sharp_v, true, "Sharp Blur V");
    }
}
