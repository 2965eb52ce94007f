use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use effects::{ResizeDebouncer, Viewport};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::window::{Window, WindowBuilder};

use crate::compositor::Compositor;
use crate::gpu::GpuState;
use crate::runtime::{BoxedTimeSource, FrameClock, FrameScheduler, SystemTimeSource, TimeSource};
use crate::types::RendererConfig;

const SOFTWARE_FPS_CAP: f32 = 15.0;
const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// Counts presented frames and reports the rate periodically.
struct FrameStats {
    window_start: Instant,
    frames: u32,
}

impl FrameStats {
    fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
        }
    }

    fn record(&mut self, now: Instant, active_ripples: usize) {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= STATS_INTERVAL {
            let fps = self.frames as f32 / elapsed.as_secs_f32();
            debug!(fps, active_ripples, "render stats");
            self.window_start = now;
            self.frames = 0;
        }
    }
}

/// Compositor plus the window it presents to.
///
/// Field order matters: the compositor owns the surface and must drop before
/// the window.
pub(crate) struct WindowState {
    compositor: Compositor<GpuState>,
    window: Arc<Window>,
    debouncer: ResizeDebouncer,
    scheduler: FrameScheduler,
    clock: FrameClock,
    time: BoxedTimeSource,
    stats: FrameStats,
    closed: bool,
}

impl WindowState {
    pub(crate) fn new(window: Arc<Window>, config: &RendererConfig) -> Result<Self> {
        let size = window.inner_size();
        let mut config = config.clone();
        if size.width > 0 && size.height > 0 {
            config.surface_size = (size.width, size.height);
        }
        let (width, height) = config.surface_size;
        let viewport = Viewport::new(width, height).context("window has no drawable area")?;

        let gpu = GpuState::new(window.as_ref(), &config)?;
        let mut target_fps = config.target_fps;
        if gpu.adapter_profile().is_software() && target_fps.is_none() {
            warn!(
                adapter = %gpu.adapter_profile().name,
                cap = SOFTWARE_FPS_CAP,
                "software rasterizer detected; capping frame rate (override with --fps)"
            );
            target_fps = Some(SOFTWARE_FPS_CAP);
        }

        let header = &config.header;
        let mut compositor = Compositor::new(gpu, header, viewport, config.seed);
        let model_path = header
            .effects()
            .model
            .then(|| header.model.path.as_deref())
            .flatten();
        compositor.start_model(model_path);

        info!(
            width,
            height,
            preset = %header.effects.preset,
            fps = ?target_fps,
            "window renderer ready"
        );

        let now = Instant::now();
        Ok(Self {
            compositor,
            window,
            debouncer: ResizeDebouncer::new(header.window.resize_debounce),
            scheduler: FrameScheduler::new(target_fps),
            clock: FrameClock::new(),
            time: Box::new(SystemTimeSource::new()),
            stats: FrameStats::new(now),
            closed: false,
        })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>, now: Instant) {
        let Ok(viewport) = Viewport::new(size.width, size.height) else {
            debug!("ignoring zero-sized resize");
            return;
        };
        self.compositor.backend_mut().resize_surface(size);
        self.debouncer.push(viewport, now);
    }

    /// Normalizes against the live window size; the compositor viewport
    /// trails it until the resize debounce settles.
    fn handle_cursor(&mut self, x: f64, y: f64) {
        let size = self.window.inner_size();
        match Viewport::new(size.width, size.height) {
            Ok(surface) => self.compositor.pointer_moved_within(x, y, surface),
            Err(_) => self.compositor.pointer_moved(x, y),
        }
    }

    fn render_frame(&mut self, elwt: &EventLoopWindowTarget<()>) {
        let now = Instant::now();
        if let Some(viewport) = self.debouncer.poll(now) {
            self.compositor.resize(viewport);
        }
        let dt = self.clock.tick(self.time.sample());
        match self.compositor.tick(dt) {
            Ok(report) => {
                self.scheduler.mark_rendered(now);
                self.stats.record(now, report.active_ripples);
            }
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                debug!("surface lost or outdated; reconfiguring");
                self.compositor.backend_mut().reconfigure_surface();
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                error!("surface out of memory; exiting");
                self.close(elwt);
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("surface timeout; retrying next frame");
            }
            Err(other) => {
                warn!(error = ?other, "surface error; retrying next frame");
            }
        }
    }

    fn schedule(&mut self, elwt: &EventLoopWindowTarget<()>) {
        if self.closed {
            return;
        }
        let now = Instant::now();
        if self.scheduler.ready_for_frame(now) {
            tracing::trace!("scheduler: issuing redraw now");
            self.window.request_redraw();
            elwt.set_control_flow(ControlFlow::Wait);
            return;
        }
        let deadline = match (self.scheduler.next_deadline(), self.debouncer.deadline()) {
            (Some(frame), Some(resize)) => Some(frame.min(resize)),
            (frame, resize) => frame.or(resize),
        };
        match deadline {
            Some(deadline) => {
                let ms = deadline.saturating_duration_since(now).as_millis();
                tracing::trace!(deadline_ms = ms, "scheduler: waiting until next frame");
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            }
            None => elwt.set_control_flow(ControlFlow::Wait),
        }
    }

    fn close(&mut self, elwt: &EventLoopWindowTarget<()>) {
        if !self.closed {
            self.compositor.shutdown();
            self.closed = true;
        }
        elwt.exit();
    }
}

pub(crate) fn run_window(config: RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let (width, height) = config.surface_size;
    let window = WindowBuilder::new()
        .with_title(config.header.window.title.clone())
        .with_inner_size(PhysicalSize::new(width, height))
        .build(&event_loop)
        .context("failed to create window")?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, &config)?;
    state.window().request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => state.close(elwt),
                    WindowEvent::CursorMoved { position, .. } => {
                        state.handle_cursor(position.x, position.y);
                    }
                    WindowEvent::MouseInput {
                        state: ElementState::Pressed,
                        button: MouseButton::Left,
                        ..
                    } => state.compositor.click(),
                    WindowEvent::Resized(size) => state.handle_resize(size, Instant::now()),
                    WindowEvent::ScaleFactorChanged {
                        mut inner_size_writer,
                        ..
                    } => {
                        // Keep the current physical size when the scale factor changes.
                        let size = state.compositor.backend().size();
                        let _ = inner_size_writer.request_inner_size(size);
                    }
                    WindowEvent::RedrawRequested if !state.closed => state.render_frame(elwt),
                    _ => {}
                }
            }
            Event::AboutToWait => state.schedule(elwt),
            Event::LoopExiting => {
                if !state.closed {
                    state.compositor.shutdown();
                    state.closed = true;
                }
            }
            _ => {}
        })
        .map_err(|err| anyhow!("window event loop error: {err}"))
}
