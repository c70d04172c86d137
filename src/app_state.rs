use std::sync::Arc;

use anyhow::Context;
use instant::Instant;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::animator::{Animator, PointerOffset, SceneSnapshot};
use crate::camera::{CameraUniform, SceneCamera};
use crate::color::{Color, ScenePalette};
use crate::config::NetworkConfig;
use crate::models::{GlowInstance, LineVertex, Vertex2D};
use crate::rng::Lcg;
use crate::scene::network::NetworkTopology;
use crate::scene::starfield::Starfield;

// 页面背景色，画布边缘由 CSS 渐变接手
const CLEAR_COLOR_RGB: (u8, u8, u8) = (0x03, 0x07, 0x12);
// 公告板边长相对于快照尺寸的倍率
const NODE_QUAD_SCALE: f32 = 2.0;
const PARTICLE_QUAD_SCALE: f32 = 6.0;
const STAR_QUAD_SCALE: f32 = 4.0;
// 挂起的标签页恢复时帧间隔可能是分钟级，截断避免粒子一步跳过整条边
const MAX_FRAME_DELTA: f32 = 0.25;

const LINES_WGSL: &str = include_str!("./shaders/lines.wgsl");
const GLOW_WGSL: &str = include_str!("./shaders/glow.wgsl");

pub struct State {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub is_surface_configured: bool,

    pub camera: SceneCamera,
    pub camera_buffer: wgpu::Buffer,
    pub camera_bind_group: wgpu::BindGroup,
    pub camera_uniform: CameraUniform,
    // 星空用不旋转、不视差的相机，只跟随投影矩阵
    pub backdrop_camera_buffer: wgpu::Buffer,
    pub backdrop_camera_bind_group: wgpu::BindGroup,
    pub backdrop_camera_uniform: CameraUniform,

    pub line_render_pipeline: wgpu::RenderPipeline,
    pub glow_render_pipeline: wgpu::RenderPipeline,

    pub quad_vertex_buffer: wgpu::Buffer,
    pub quad_index_buffer: wgpu::Buffer,

    pub node_instances: Vec<GlowInstance>,
    pub node_instance_buffer: wgpu::Buffer,
    pub particle_instances: Vec<GlowInstance>,
    pub particle_instance_buffer: wgpu::Buffer,
    pub star_instances: Vec<GlowInstance>,
    pub star_instance_buffer: wgpu::Buffer,
    pub line_vertices: Vec<LineVertex>,
    pub line_vertex_buffer: wgpu::Buffer,

    pub network_config: NetworkConfig,
    pub animator: Animator,
    /// Latest normalized cursor sample, overwritten by input events and
    /// read once per tick. Last write wins.
    pub pointer: PointerOffset,

    pub last_tick_instant: Instant,
    pub last_fps_instant: Instant,
    pub frame_count_in_second: u32,
    pub current_fps: u32,
}

impl State {
    // Now takes Arc<Window> for setup, doesn't store it.
    pub async fn new(window_arc: Arc<Window>, network_config: NetworkConfig) -> anyhow::Result<State> {
        let size = window_arc.inner_size();

        let gpu = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        // Surface itself is !Send on WASM due to HtmlCanvasElement
        let surface = gpu
            .create_surface(window_arc)
            .context("creating render surface")?;

        let adapter = gpu
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no compatible GPU adapter")?;
        let adapter_info = adapter.get_info();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("requesting device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let texture_format = surface_caps.formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .unwrap_or_else(|| {
                log::warn!("No sRGB surface format found, falling back to {:?}", surface_caps.formats[0]);
                surface_caps.formats[0]
            });

        // 确定是否需要着色器进行 sRGB 输出转换
        let needs_shader_srgb_output_conversion = !texture_format.is_srgb();

        log::info!(
            "Using {} ({:?}, Target Format: {:?}), Needs Shader sRGB Output Conversion: {}",
            adapter_info.name,
            adapter_info.backend,
            texture_format,
            needs_shader_srgb_output_conversion
        );

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: texture_format,
            width: size.width,
            height: size.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let camera = SceneCamera::new(size.width, size.height);
        let camera_uniform = CameraUniform {
            view_model: camera.build_view_model_matrix(0.0, 0.0).to_cols_array_2d(),
            proj: camera.build_proj_matrix().to_cols_array_2d(),
            needs_srgb_output_conversion: needs_shader_srgb_output_conversion as u32,
            _padding: [0; 3],
        };

        let camera_buffer = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Camera Buffer"),
                contents: bytemuck::cast_slice(&[camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            }
        );

        let backdrop_camera_uniform = CameraUniform {
            view_model: camera.build_view_model_matrix(0.0, 0.0).to_cols_array_2d(),
            proj: camera.build_proj_matrix().to_cols_array_2d(),
            needs_srgb_output_conversion: needs_shader_srgb_output_conversion as u32,
            _padding: [0; 3],
        };

        let backdrop_camera_buffer = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Backdrop Camera Buffer"),
                contents: bytemuck::cast_slice(&[backdrop_camera_uniform]),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            }
        );

        let camera_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }
            ],
            label: Some("Camera Bind Group Layout"),
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: camera_buffer.as_entire_binding(),
                }
            ],
            label: Some("Camera Bind Group"),
        });

        let backdrop_camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: backdrop_camera_buffer.as_entire_binding(),
                }
            ],
            label: Some("Backdrop Camera Bind Group"),
        });

        // --- 着色器模块 ---
        let lines_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Lines Shader"),
            source: wgpu::ShaderSource::Wgsl(LINES_WGSL.into()),
        });

        let glow_shader_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Glow Shader"),
            source: wgpu::ShaderSource::Wgsl(GLOW_WGSL.into()),
        });

        // --- 渲染管线布局 ---
        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Render Pipeline Layout"),
            bind_group_layouts: &[
                &camera_bind_group_layout,
            ],
            push_constant_ranges: &[],
        });

        // --- 线段渲染管线 ---
        let line_render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Line Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &lines_shader_module,
                entry_point: Some("vs_main"),
                buffers: &[
                    LineVertex::layout(),
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &lines_shader_module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: texture_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::LineList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        // --- 发光公告板渲染管线 (节点与粒子共用) ---
        let glow_render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Glow Render Pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &glow_shader_module,
                entry_point: Some("vs_main"),
                buffers: &[
                    Vertex2D::layout(),
                    GlowInstance::layout(),
                ],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &glow_shader_module,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: texture_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: Some(wgpu::Face::Back),
                unclipped_depth: false,
                polygon_mode: wgpu::PolygonMode::Fill,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
            cache: None,
        });

        let quad_vertex_buffer = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Quad Vertex Buffer"),
                contents: bytemuck::cast_slice(Vertex2D::QUAD_VERTICES.as_slice()),
                usage: wgpu::BufferUsages::VERTEX,
            }
        );

        let quad_index_buffer = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Quad Index Buffer"),
                contents: bytemuck::cast_slice(Vertex2D::QUAD_INDICES.as_slice()),
                usage: wgpu::BufferUsages::INDEX,
            }
        );

        let animator = build_animator(&network_config)?;

        // 首帧 update() 会填充并按需扩容，这里先建空缓冲
        let node_instances: Vec<GlowInstance> = Vec::new();
        let particle_instances: Vec<GlowInstance> = Vec::new();
        let star_instances: Vec<GlowInstance> = Vec::new();
        let line_vertices: Vec<LineVertex> = Vec::new();

        let node_instance_buffer = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Node Instance Buffer"),
                contents: bytemuck::cast_slice(&node_instances),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            }
        );
        let particle_instance_buffer = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Particle Instance Buffer"),
                contents: bytemuck::cast_slice(&particle_instances),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            }
        );
        let star_instance_buffer = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Star Instance Buffer"),
                contents: bytemuck::cast_slice(&star_instances),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            }
        );
        let line_vertex_buffer = device.create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("Line Vertex Buffer"),
                contents: bytemuck::cast_slice(&line_vertices),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            }
        );

        Ok(Self {
            surface, device, queue, config, is_surface_configured: false,
            camera, camera_buffer, camera_bind_group, camera_uniform,
            backdrop_camera_buffer, backdrop_camera_bind_group, backdrop_camera_uniform,
            line_render_pipeline, glow_render_pipeline,
            quad_vertex_buffer, quad_index_buffer,
            node_instances, node_instance_buffer,
            particle_instances, particle_instance_buffer,
            star_instances, star_instance_buffer,
            line_vertices, line_vertex_buffer,
            network_config, animator,
            pointer: PointerOffset::default(),
            last_tick_instant: Instant::now(),
            last_fps_instant: Instant::now(),
            frame_count_in_second: 0, current_fps: 0,
        })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            log::info!("Resize {}, {}", width, height);
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);

            self.camera.update_aspect_ratio(width, height);
            let proj = self.camera.build_proj_matrix().to_cols_array_2d();
            self.camera_uniform.proj = proj;
            self.backdrop_camera_uniform.proj = proj;
            self.is_surface_configured = true;
            // No request_redraw here, it's App's responsibility
        }
    }

    /// Rebuilds topology and animator from a new config. On failure the
    /// current scene keeps running untouched.
    pub fn rebuild_network(&mut self, network_config: NetworkConfig) -> anyhow::Result<()> {
        self.animator = build_animator(&network_config)?;
        self.network_config = network_config;
        Ok(())
    }

    /// Advances the animation by the wall-clock frame delta and stages the
    /// resulting snapshot into the GPU-facing vectors.
    pub fn update(&mut self) {
        let now = Instant::now();
        let dt = (now - self.last_tick_instant).as_secs_f32().min(MAX_FRAME_DELTA);
        self.last_tick_instant = now;

        let snapshot = self.animator.tick(dt, self.pointer);
        self.stage_snapshot(&snapshot);

        self.camera_uniform.view_model = self
            .camera
            .build_view_model_matrix(snapshot.yaw, snapshot.tilt)
            .to_cols_array_2d();
        self.queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::cast_slice(&[self.camera_uniform]),
        );
        self.queue.write_buffer(
            &self.backdrop_camera_buffer,
            0,
            bytemuck::cast_slice(&[self.backdrop_camera_uniform]),
        );

        self.update_gpu_buffers();
    }

    fn stage_snapshot(&mut self, snapshot: &SceneSnapshot) {
        self.node_instances.clear();
        for node in &snapshot.nodes {
            self.node_instances.push(GlowInstance {
                center: node.position.to_array(),
                size: node.radius * NODE_QUAD_SCALE,
                color: node.color.into_linear_rgba(),
            });
        }

        self.particle_instances.clear();
        for particle in &snapshot.particles {
            self.particle_instances.push(GlowInstance {
                center: particle.position.to_array(),
                size: particle.size * PARTICLE_QUAD_SCALE,
                color: particle.color.into_linear_rgba(),
            });
        }

        self.star_instances.clear();
        for star in &snapshot.stars {
            self.star_instances.push(GlowInstance {
                center: star.position.to_array(),
                size: star.size * STAR_QUAD_SCALE,
                color: star.color.into_linear_rgba(),
            });
        }

        self.line_vertices.clear();
        for edge in &snapshot.edges {
            self.line_vertices.push(LineVertex {
                position: edge.start.to_array(),
                color: edge.start_color.into_linear_rgba(),
            });
            self.line_vertices.push(LineVertex {
                position: edge.end.to_array(),
                color: edge.end_color.into_linear_rgba(),
            });
        }
    }

    fn update_gpu_buffers(&mut self) {
        let node_data = bytemuck::cast_slice(&self.node_instances);
        let particle_data = bytemuck::cast_slice(&self.particle_instances);
        let star_data = bytemuck::cast_slice(&self.star_instances);
        let line_data = bytemuck::cast_slice(&self.line_vertices);

        if self.node_instance_buffer.size() < node_data.len() as u64 {
            self.node_instance_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Node Instance Buffer (Resized)"),
                contents: node_data,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        } else {
            self.queue.write_buffer(&self.node_instance_buffer, 0, node_data);
        }

        if self.particle_instance_buffer.size() < particle_data.len() as u64 {
            self.particle_instance_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Particle Instance Buffer (Resized)"),
                contents: particle_data,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        } else {
            self.queue.write_buffer(&self.particle_instance_buffer, 0, particle_data);
        }

        if self.star_instance_buffer.size() < star_data.len() as u64 {
            self.star_instance_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Star Instance Buffer (Resized)"),
                contents: star_data,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        } else {
            self.queue.write_buffer(&self.star_instance_buffer, 0, star_data);
        }

        if self.line_vertex_buffer.size() < line_data.len() as u64 {
            self.line_vertex_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Line Vertex Buffer (Resized)"),
                contents: line_data,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        } else {
            self.queue.write_buffer(&self.line_vertex_buffer, 0, line_data);
        }
    }

    pub fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        if !self.is_surface_configured {
            return Ok(());
        }

        // --- FPS Calculation ---
        self.frame_count_in_second += 1;
        let now = Instant::now();
        let elapsed = (now - self.last_fps_instant).as_secs_f32();

        if elapsed >= 1.0 {
            self.current_fps = self.frame_count_in_second;
            self.frame_count_in_second = 0;
            self.last_fps_instant = now;
            log::debug!("FPS: {}", self.current_fps);
        }
        // --- End FPS Calculation ---

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(
                            Color::from(CLEAR_COLOR_RGB).into_linear_wgpu_color(),
                        ),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // 无深度缓冲，画家算法：星空最先画，落在一切之后
            render_pass.set_pipeline(&self.glow_render_pipeline);
            render_pass.set_bind_group(0, &self.backdrop_camera_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);
            render_pass.set_vertex_buffer(1, self.star_instance_buffer.slice(..));
            render_pass.draw_indexed(
                0..Vertex2D::QUAD_INDICES.len() as u32,
                0,
                0..self.star_instances.len() as u32,
            );

            render_pass.set_bind_group(0, &self.camera_bind_group, &[]);

            render_pass.set_pipeline(&self.line_render_pipeline);
            render_pass.set_vertex_buffer(0, self.line_vertex_buffer.slice(..));
            render_pass.draw(0..self.line_vertices.len() as u32, 0..1);

            render_pass.set_pipeline(&self.glow_render_pipeline);
            render_pass.set_vertex_buffer(0, self.quad_vertex_buffer.slice(..));
            render_pass.set_index_buffer(self.quad_index_buffer.slice(..), wgpu::IndexFormat::Uint16);

            render_pass.set_vertex_buffer(1, self.node_instance_buffer.slice(..));
            render_pass.draw_indexed(
                0..Vertex2D::QUAD_INDICES.len() as u32,
                0,
                0..self.node_instances.len() as u32,
            );

            render_pass.set_vertex_buffer(1, self.particle_instance_buffer.slice(..));
            render_pass.draw_indexed(
                0..Vertex2D::QUAD_INDICES.len() as u32,
                0,
                0..self.particle_instances.len() as u32,
            );
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

fn build_animator(network_config: &NetworkConfig) -> anyhow::Result<Animator> {
    let palette = ScenePalette::from_config(network_config)?;
    let topology = NetworkTopology::generate(network_config)?;
    let starfield = Starfield::generate(network_config);
    // Reassignment randomness is deliberately not tied to the topology
    // seed; see the particle wrap policy in `animator`.
    Ok(Animator::new(topology, palette, starfield, Lcg::from_clock()))
}
