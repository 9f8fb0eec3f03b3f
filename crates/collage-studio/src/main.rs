mod loader;
mod save;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use winit::dpi::LogicalSize;

use collage_engine::canvas::{CanvasConfig, CanvasRenderer, render_offscreen};
use collage_engine::device::{GpuInit, HeadlessGpu};
use collage_engine::logging::{LoggingConfig, init_logging};
use collage_engine::render::{SoftwareResources, WgpuResources};
use collage_engine::scene::SceneConfig;
use collage_engine::window::{CanvasRuntime, RuntimeConfig};

use loader::FsImageLoader;
use save::SaveListener;

/// Arrange images on a zoomable canvas and save captures as PNG.
#[derive(Debug, Parser)]
#[command(name = "collage-studio", version)]
struct Args {
    /// Image paths or file:// URLs.
    #[arg(required = true)]
    images: Vec<String>,

    /// Capture output path.
    #[arg(short, long, default_value = "collage.png")]
    output: PathBuf,

    /// Render offscreen at WIDTHxHEIGHT, save one capture and exit.
    #[arg(long, value_name = "WxH", value_parser = parse_size)]
    headless: Option<(u32, u32)>,

    /// Backend for --headless.
    #[arg(long, value_enum, default_value_t = Backend::Software)]
    backend: Backend,

    /// Seed for tile placement.
    #[arg(long)]
    seed: Option<u64>,

    /// env_logger filter, e.g. "debug" or "collage_engine=debug".
    #[arg(long)]
    log: Option<String>,

    /// Decoder threads (0 = one per core).
    #[arg(long, default_value_t = 0)]
    threads: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Backend {
    Software,
    Wgpu,
}

fn parse_size(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let w: u32 = w.trim().parse().map_err(|e| format!("bad width: {e}"))?;
    let h: u32 = h.trim().parse().map_err(|e| format!("bad height: {e}"))?;
    if w == 0 || h == 0 {
        return Err("size must be non-zero".into());
    }
    Ok((w, h))
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(LoggingConfig {
        env_filter: args.log.clone(),
        ..Default::default()
    });

    let config = CanvasConfig {
        scene: SceneConfig { seed: args.seed, ..Default::default() },
        ..Default::default()
    };
    let loader = Arc::new(FsImageLoader::new(args.threads)?);
    let mut renderer = CanvasRenderer::new(config, loader);
    renderer.handle().add_images(args.images.iter().cloned());

    match args.headless {
        Some((w, h)) => run_headless(&args, renderer, w, h),
        None => {
            renderer.set_listener(Some(Box::new(SaveListener::new(args.output.clone()))));
            let window = RuntimeConfig {
                title: format!("collage ({} images)", args.images.len()),
                initial_size: LogicalSize::new(1280.0, 720.0),
            };
            CanvasRuntime::run(window, GpuInit::default(), renderer)
        }
    }
}

fn run_headless(args: &Args, mut renderer: CanvasRenderer, width: u32, height: u32) -> Result<()> {
    let resource_config = renderer.config().resources.clone();

    let image = match args.backend {
        Backend::Software => {
            let mut resources = SoftwareResources::new(resource_config);
            render_offscreen(&mut renderer, &mut resources, width, height)?
        }
        Backend::Wgpu => {
            let gpu = pollster::block_on(HeadlessGpu::new(GpuInit::default()))?;
            let mut resources = WgpuResources::new(gpu.device, gpu.queue, gpu.format, resource_config);
            render_offscreen(&mut renderer, &mut resources, width, height)?
        }
    };

    if renderer.scene().is_empty() {
        log::warn!("none of the {} images could be loaded; saving a blank canvas", args.images.len());
    }

    save::save_png(&args.output, &image)
        .with_context(|| format!("failed to save {}", args.output.display()))?;
    log::info!("capture saved to {}", args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headless_saves_blank_canvas_when_nothing_loads() {
        let out = std::env::temp_dir().join(format!("collage-blank-{}.png", std::process::id()));
        let args = Args::try_parse_from([
            "collage-studio",
            "/definitely/not/here.png",
            "--headless",
            "6x4",
            "--output",
            out.to_str().unwrap(),
        ])
        .unwrap();

        let loader = Arc::new(FsImageLoader::new(1).unwrap());
        let renderer = CanvasRenderer::new(CanvasConfig::default(), loader);
        renderer.handle().add_images(args.images.iter().cloned());
        run_headless(&args, renderer, 6, 4).unwrap();

        let img = image::open(&out).unwrap().into_rgba8();
        std::fs::remove_file(&out).ok();
        assert_eq!(img.dimensions(), (6, 4));
        assert!(img.pixels().all(|p| p.0 == [77, 128, 26, 0]));
    }

    #[test]
    fn parses_sizes() {
        assert_eq!(parse_size("640x480"), Ok((640, 480)));
        assert_eq!(parse_size("10X20"), Ok((10, 20)));
        assert!(parse_size("0x5").is_err());
        assert!(parse_size("640").is_err());
    }

    #[test]
    fn cli_requires_images() {
        assert!(Args::try_parse_from(["collage-studio"]).is_err());
        let args = Args::try_parse_from(["collage-studio", "a.png", "--headless", "8x4", "--seed", "3"]).unwrap();
        assert_eq!(args.headless, Some((8, 4)));
        assert_eq!(args.seed, Some(3));
        assert_eq!(args.backend, Backend::Software);
    }
}
