use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wgpu;
use winit::window::Window;

use super::aura::{
    self, build_ring_points, core_alpha, core_width, fill_alpha, layer_params, ribbon_band,
    stroke_band, AuraModel,
};
use super::render_pipeline::{AuraRenderPipelines, AuraVertex};
use crate::config::AppConfig;
use crate::frame_scheduler::{FrameClock, FrameScheduler, SubscriptionId};
use crate::voice_activity::{ActivitySnapshot, ActivityTracker};
use crate::voice_session::VoiceSession;

// Ring geometry scale relative to the smaller surface dimension
const BASE_RADIUS_FACTOR: f32 = 0.33;

pub struct WindowState {
    pub window: Arc<Window>,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    render_pipelines: AuraRenderPipelines,

    clock: FrameClock,
    scheduler: FrameScheduler,
    subscriptions: Vec<SubscriptionId>,
    model: Arc<Mutex<AuraModel>>,

    segments: usize,
    layers: usize,

    running: Arc<AtomicBool>,
    // Once false, draw() no longer requests the next redraw, so no pending
    // reschedule outlives the teardown
    active: bool,
}

impl WindowState {
    pub fn new(
        window: Arc<Window>,
        session: Arc<Mutex<VoiceSession>>,
        snapshot: Arc<RwLock<ActivitySnapshot>>,
        running: Arc<AtomicBool>,
        app_config: &AppConfig,
    ) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone()).unwrap();

        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::default(),
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .unwrap();

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
            },
            None,
        ))
        .unwrap();

        let size = window.inner_size();

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .filter(|f| f.is_srgb())
            .next()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        surface.configure(&device, &config);

        let segments = app_config.aura_config.segments.max(3);
        let layers = app_config.aura_config.layers.max(1);

        // Every layer's band on the glow scene, plus the foreground band
        // and its core stroke on the sharp scene
        let max_vertices = (layers + 2) * (segments + 1) * 2;
        let render_pipelines = AuraRenderPipelines::new(&device, &config, max_vertices);

        // Wire the per-frame pipeline: pending mic acquisition first, then
        // the tracker publishes the snapshot, then the model consumes it,
        // in registration order within each tick
        let mut scheduler = FrameScheduler::new();
        let mut subscriptions = Vec::new();

        let (bindings, connection) = {
            let session = session.lock();
            (session.bindings_handle(), session.state_handle())
        };

        let session_for_tick = session.clone();
        subscriptions.push(scheduler.subscribe(move |_| session_for_tick.lock().poll_mic()));

        let tracker = ActivityTracker::new(bindings, connection, snapshot.clone());
        subscriptions.push(scheduler.subscribe(move |_| tracker.update()));

        let model = Arc::new(Mutex::new(AuraModel::new()));
        let model_for_tick = model.clone();
        let snapshot_for_tick = snapshot.clone();
        subscriptions.push(scheduler.subscribe(move |_| {
            let snap = *snapshot_for_tick.read();
            model_for_tick
                .lock()
                .advance(snap.mode, snap.dominant_level);
        }));

        Self {
            window,
            surface,
            device,
            queue,
            config,
            render_pipelines,
            clock: FrameClock::new(),
            scheduler,
            subscriptions,
            model,
            segments,
            layers,
            running,
            active: true,
        }
    }

    /// Reconfigure the surface and offscreen targets. The animation clock
    /// keeps running through a resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.render_pipelines.resize(&self.device, width, height);
        }
    }

    /// Run one frame: advance every tick subscriber, tessellate the rings,
    /// render both views, and request the next redraw.
    pub fn draw(&mut self) {
        if !self.active {
            return;
        }

        let tick = self.clock.tick();
        self.scheduler.tick(tick);

        let (rms, color, alpha) = {
            let model = self.model.lock();
            (model.smoothed_rms(), model.color(), model.alpha())
        };
        let amp = aura::amp(rms);

        let w = self.config.width as f32;
        let h = self.config.height as f32;
        let cx = w / 2.0;
        let cy = h / 2.0;
        let base_radius = w.min(h) * BASE_RADIUS_FACTOR;

        let rgb = color.to_rgb();
        let core_rgb = color.core_highlight().to_rgb();

        let mut glow_ribbons = Vec::with_capacity(self.layers);
        let mut sharp_ribbons = Vec::with_capacity(2);

        for layer in 0..self.layers {
            let params = layer_params(layer, alpha, base_radius);
            let points =
                build_ring_points(cx, cy, params.radius, tick.t, rms, params.offset, self.segments);

            let band = ribbon_band(&points);
            let fill = [rgb[0], rgb[1], rgb[2], fill_alpha(params.alpha, amp)];
            let band_verts = to_ndc_vertices(&band, w, h, fill);

            // Glow view gets every layer; the sharp view keeps only the
            // foreground layer plus its bright core stroke
            glow_ribbons.push(band_verts.clone());
            if layer == 0 {
                sharp_ribbons.push(band_verts);

                let stroke = stroke_band(&points, core_width(amp));
                let core = [
                    core_rgb[0],
                    core_rgb[1],
                    core_rgb[2],
                    core_alpha(params.alpha, amp),
                ];
                sharp_ribbons.push(to_ndc_vertices(&stroke, w, h, core));
            }
        }

        let output = self.surface.get_current_texture().unwrap();
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        self.render_pipelines.draw(
            &self.device,
            &self.queue,
            &mut encoder,
            &view,
            &glow_ribbons,
            &sharp_ribbons,
        );

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        // Request redraw to keep the animation loop going
        if self.active {
            self.window.request_redraw();
        }
    }

    /// Stop the frame loop and release every tick subscription.
    pub fn quit(&mut self) {
        self.active = false;
        for id in self.subscriptions.drain(..) {
            self.scheduler.unsubscribe(id);
        }
        self.running.store(false, Ordering::Relaxed);
    }
}

fn to_ndc_vertices(band: &[[f32; 2]], w: f32, h: f32, color: [f32; 4]) -> Vec<AuraVertex> {
    band.iter()
        .map(|p| AuraVertex {
            position: [p[0] / w * 2.0 - 1.0, 1.0 - p[1] / h * 2.0],
            color,
        })
        .collect()
}
