// Vulkan bootstrap renderer
//
// Stands up a window, a Vulkan instance/device/swapchain and one fixed
// graphics pipeline, then runs an empty frame loop until the window
// asks to close. No draw submission yet.

mod backend;
mod config;
mod error;
mod scene;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowAttributes},
};

use backend::{PipelineBundle, Swapchain, VulkanContext};
use config::Config;
use error::SetupError;
use scene::Scene;

fn main() -> Result<()> {
    let config = Config::load();
    init_logging();
    log::info!(
        "Starting {} ({}x{})",
        config.window.title,
        config.window.width,
        config.window.height
    );

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config);
    event_loop.run_app(&mut app)?;

    // The single fatal handler: backend errors propagate here, get
    // logged once, and terminate the process with a nonzero status.
    if let Some(err) = app.setup_error.take() {
        log::error!("Fatal setup error: {}", err);
        return Err(err.into());
    }

    log::info!("Clean exit");
    Ok(())
}

fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}

/// Render loop state machine. `Exiting` is terminal: once the exit
/// flag has been OR-ed in, the loop never resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Exiting,
}

impl LoopState {
    pub fn advance(self, close_requested: bool) -> LoopState {
        match self {
            LoopState::Exiting => LoopState::Exiting,
            LoopState::Running if close_requested => LoopState::Exiting,
            LoopState::Running => LoopState::Running,
        }
    }
}

/// Wall-clock timing for one loop iteration.
pub struct FrameTimer {
    frame_start: Instant,
    pub last_seconds: f64,
    pub last_millis: u64,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self {
            frame_start: Instant::now(),
            last_seconds: 0.0,
            last_millis: 0,
        }
    }

    pub fn start(&mut self) {
        self.frame_start = Instant::now();
    }

    pub fn finish(&mut self) -> f64 {
        let elapsed = self.frame_start.elapsed();
        self.last_seconds = elapsed.as_secs_f64();
        self.last_millis = elapsed.as_millis() as u64;
        self.last_seconds
    }
}

/// Application state. Vulkan objects are torn down in reverse creation
/// order in Drop: pipeline, swapchain, then the context.
struct App {
    config: Config,
    window: Option<Arc<Window>>,

    context: Option<VulkanContext>,
    swapchain: Option<Swapchain>,
    pipeline: Option<PipelineBundle>,

    scene: Scene,
    loop_state: LoopState,
    close_requested: bool,
    timer: FrameTimer,

    /// Set on window resize; recorded but not yet consumed (swapchain
    /// recreation is not wired up in this snapshot).
    needs_resize: bool,

    setup_error: Option<SetupError>,

    frame_count: u32,
    last_title_update: Instant,
}

impl App {
    fn new(config: Config) -> Self {
        Self {
            config,
            window: None,
            context: None,
            swapchain: None,
            pipeline: None,
            scene: Scene::new(),
            loop_state: LoopState::Running,
            close_requested: false,
            timer: FrameTimer::new(),
            needs_resize: false,
            setup_error: None,
            frame_count: 0,
            last_title_update: Instant::now(),
        }
    }

    /// Ordered Vulkan setup: context, swapchain, pipeline. Each stage
    /// consumes the previous stage's handles; any failure stops here
    /// and propagates to main.
    fn init_vulkan(&mut self, window: &Window) -> Result<(), SetupError> {
        let enable_validation = cfg!(debug_assertions) && self.config.debug.validation_layers;

        let context = VulkanContext::new(window, &self.config.window.title, enable_validation)?;

        let size = window.inner_size();
        let swapchain = Swapchain::new(&context, size.width, size.height)?;

        let pipeline = PipelineBundle::new(
            &context,
            swapchain.format,
            swapchain.extent,
            Path::new(&self.config.graphics.vert_shader),
            Path::new(&self.config.graphics.frag_shader),
        )?;

        self.context = Some(context);
        self.swapchain = Some(swapchain);
        self.pipeline = Some(pipeline);

        log::info!("Vulkan setup complete");
        Ok(())
    }

    /// One loop iteration: sample time, run the scene, poll the exit
    /// condition, sample again.
    fn frame(&mut self) {
        self.timer.start();

        self.scene.update();

        self.loop_state = self.loop_state.advance(self.close_requested);

        self.timer.finish();
        self.update_title();
    }

    fn update_title(&mut self) {
        self.frame_count += 1;

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_title_update).as_secs_f64();
        if elapsed < 1.0 {
            return;
        }

        if let Some(ref window) = self.window {
            let fps = self.frame_count as f64 / elapsed;
            window.set_title(&format!(
                "{} - {:.0} FPS ({:.2}ms)",
                self.config.window.title,
                fps,
                self.timer.last_seconds * 1000.0,
            ));
        }

        self.frame_count = 0;
        self.last_title_update = now;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attributes = WindowAttributes::default()
            .with_title(&self.config.window.title)
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(window_attributes) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("Failed to create window: {:?}", e);
                event_loop.exit();
                return;
            }
        };

        if let Err(e) = self.init_vulkan(&window) {
            self.setup_error = Some(e);
            event_loop.exit();
            return;
        }

        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested");
                self.close_requested = true;
            }

            WindowEvent::Resized(size) => {
                log::debug!("Window resized to {}x{}", size.width, size.height);
                self.needs_resize = true;
            }

            WindowEvent::RedrawRequested => {
                self.frame();
                if self.loop_state == LoopState::Exiting {
                    if let Some(ref context) = self.context {
                        context.wait_idle();
                    }
                    event_loop.exit();
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                use winit::keyboard::{KeyCode, PhysicalKey};

                if event.state.is_pressed() {
                    if let PhysicalKey::Code(KeyCode::Escape) = event.physical_key {
                        log::info!("ESC pressed, exiting");
                        self.close_requested = true;
                    }
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }
}

impl Drop for App {
    fn drop(&mut self) {
        log::info!("Shutting down");

        self.scene.shutdown();

        if let Some(ref context) = self.context {
            context.wait_idle();
        }

        // Reverse creation order. The destroy calls are idempotent, so
        // the subsequent implicit drops are no-ops.
        if let Some(mut pipeline) = self.pipeline.take() {
            pipeline.destroy();
        }
        if let Some(mut swapchain) = self.swapchain.take() {
            swapchain.destroy();
        }
        self.context.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_state_latches_on_close_request() {
        let state = LoopState::Running;
        assert_eq!(state.advance(false), LoopState::Running);
        assert_eq!(state.advance(true), LoopState::Exiting);
    }

    #[test]
    fn exiting_is_terminal() {
        let state = LoopState::Exiting;
        assert_eq!(state.advance(false), LoopState::Exiting);
        assert_eq!(state.advance(true), LoopState::Exiting);
    }

    #[test]
    fn frame_timer_reports_consistent_units() {
        let mut timer = FrameTimer::new();
        timer.start();
        let seconds = timer.finish();

        assert!(seconds >= 0.0);
        assert_eq!(seconds, timer.last_seconds);
        // Milliseconds are the truncated seconds reading.
        assert!((timer.last_millis as f64) <= timer.last_seconds * 1000.0 + 1.0);
    }
}
