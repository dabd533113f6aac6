//! Command-line entry point for the haywire remote volume rendering client.

use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec3};
use haywire::camera::ViewInput;
use haywire::error::ClientError;
use haywire::options::ClientOptions;
use haywire::process::{Launcher, ServerStatus};
use haywire::render_loop::RenderHost;
use haywire::transport::TcpBinding;
use haywire::viewport::{RetainedFrame, ViewportDriver};
use web_time::{Duration, Instant};

const WIDTH: u32 = 800;
const HEIGHT: u32 = 600;
const REDRAW_INTERVAL: Duration = Duration::from_millis(16);

/// Forwards render status to the log.
struct LogHost;

impl RenderHost for LogHost {
    fn update_stats(&self, kind: &str, info: &str) {
        log::info!("[{kind}] {info}");
    }

    fn tag_redraw(&self) {}
}

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let options_path = args.get(1).map(String::as_str);
    let seconds = args
        .get(2)
        .and_then(|s| s.parse::<f32>().ok())
        .unwrap_or(10.0);

    if let Err(e) = run(options_path, Duration::from_secs_f32(seconds)) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(
    options_path: Option<&str>,
    duration: Duration,
) -> Result<(), ClientError> {
    let mut options = match options_path {
        Some(path) => ClientOptions::load(Path::new(path))?,
        None => ClientOptions::default(),
    };
    options.connection.apply_env();

    // Without a server command the server is assumed to be up already.
    let mut launcher = Launcher::default();
    let launch = !options.server.command.trim().is_empty();
    if launch {
        launcher.start(&options)?;
    }

    let host: Arc<dyn RenderHost> = Arc::new(LogHost);
    let mut driver = ViewportDriver::tcp(options, Arc::downgrade(&host));
    let result = if launch {
        render(&mut driver, &mut launcher, duration)
    } else {
        render(&mut driver, &mut true, duration)
    };
    driver.shutdown();
    launcher.stop();
    result
}

fn render(
    driver: &mut ViewportDriver<TcpBinding>,
    server: &mut impl ServerStatus,
    duration: Duration,
) -> Result<(), ClientError> {
    let mut view = ViewInput::perspective(WIDTH, HEIGHT, Mat4::IDENTITY);
    driver.sync(&view, server)?;

    // Bounds arrive with the first frame; aim at the dataset once known.
    let mut aimed = false;
    let mut presenter = RetainedFrame::default();
    let begin = Instant::now();
    while begin.elapsed() < duration {
        driver.draw(&view, &mut presenter)?;
        if let Some(e) = driver.take_error() {
            return Err(e);
        }
        if !aimed {
            if let Some(bounds) = driver.query_bounds()? {
                log::info!(
                    "Dataset bounds {} .. {}, scalars {:?}",
                    bounds.lower,
                    bounds.upper,
                    bounds.scalar_range
                );
                let distance = bounds.size.length().max(1.0) * 1.5;
                let eye =
                    bounds.center + Vec3::new(0.0, -distance, distance * 0.5);
                view.view_matrix =
                    Mat4::look_at_rh(eye, bounds.center, Vec3::Z);
                aimed = true;
            }
        }
        std::thread::sleep(REDRAW_INTERVAL);
    }
    log::info!("Presented {} frames", presenter.uploads());
    Ok(())
}
