use std::sync::{Arc, Mutex};
use std::thread;

use anyhow::{Context, Result, anyhow};
use winit::window::Window;

use crate::core::App;
use crate::device::{PresentBackend, PresentationSurface};
use crate::ime::{InputMethodAdapter, SharedIme};
use crate::window::{PlatformError, WindowHost};

use super::config::{LoopMode, RuntimeConfig};
use super::frame_loop::{FrameLoop, RemotePump};
use super::handlers::default_chain;
use super::shared::LoopShared;

/// Process-level entry point: window, surface and frame loop.
pub struct Runtime;

impl Runtime {
    /// Creates the window, hands it to `make` for the backend and application,
    /// and runs until the window closes or the application exits.
    ///
    /// Teardown order: application detach, surface destroy, window destroy.
    pub fn run<B, A, F>(config: RuntimeConfig, make: F) -> Result<()>
    where
        B: PresentBackend,
        A: App<B>,
        F: FnOnce(Arc<Window>) -> Result<(B, A)> + Send + 'static,
    {
        log::info!("starting \"{}\" ({:?})", config.title, config.mode);
        match config.mode {
            LoopMode::SingleThread => run_single(config, make),
            LoopMode::WorkerThread => run_worker(config, make),
        }
    }
}

fn run_single<B, A, F>(config: RuntimeConfig, make: F) -> Result<()>
where
    B: PresentBackend,
    A: App<B>,
    F: FnOnce(Arc<Window>) -> Result<(B, A)>,
{
    let shared = Arc::new(LoopShared::new());
    let ime: SharedIme = Arc::new(Mutex::new(InputMethodAdapter::platform_default()));

    let mut host = WindowHost::create(
        &config.title,
        config.width,
        config.height,
        default_chain(&shared, &ime),
        Arc::clone(&shared),
    )?;
    let window = host.window().ok_or(PlatformError::WindowGone)?;

    let (backend, app) = make(Arc::clone(&window))?;
    let surface = PresentationSurface::new(backend, config.surface.clone());
    let mut frame_loop = FrameLoop::new(surface, app, window, shared, ime, &config)
        .context("failed to create presentation surface")?;

    frame_loop.run(&mut host);

    frame_loop.shutdown();
    drop(frame_loop);
    host.destroy();
    Ok(())
}

fn run_worker<B, A, F>(config: RuntimeConfig, make: F) -> Result<()>
where
    B: PresentBackend,
    A: App<B>,
    F: FnOnce(Arc<Window>) -> Result<(B, A)> + Send + 'static,
{
    let shared = Arc::new(LoopShared::new());
    let ime: SharedIme = Arc::new(Mutex::new(InputMethodAdapter::platform_default()));

    let mut host = WindowHost::create(
        &config.title,
        config.width,
        config.height,
        default_chain(&shared, &ime),
        Arc::clone(&shared),
    )?;
    let window = host.window().ok_or(PlatformError::WindowGone)?;

    let render = {
        let shared = Arc::clone(&shared);
        let mut pump = RemotePump::new(host.proxy(), Arc::clone(&shared));

        thread::Builder::new()
            .name("flipframe-render".into())
            .spawn(move || {
                let result = (|| -> Result<()> {
                    let (backend, app) = make(Arc::clone(&window))?;
                    let surface = PresentationSurface::new(backend, config.surface.clone());
                    let mut frame_loop = FrameLoop::new(surface, app, window, Arc::clone(&shared), ime, &config)
                        .context("failed to create presentation surface")?;

                    frame_loop.run(&mut pump);
                    frame_loop.shutdown();
                    Ok(())
                })();

                shared.request_exit();
                pump.wake();
                result
            })
            .context("failed to spawn render thread")?
    };

    while host.pump_messages(true) {}
    shared.request_exit();

    let result = render
        .join()
        .unwrap_or_else(|_| Err(anyhow!("render thread panicked")));
    host.destroy();
    result
}
