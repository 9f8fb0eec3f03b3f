//! Both backends must clear to the same bytes.

use collage_engine::device::{GpuInit, HeadlessGpu};
use collage_engine::render::{GeometryResources, ResourceConfig, SoftwareResources, WgpuResources};
use collage_engine::scene::{PixelBuffer, Scene, SceneConfig};

const CLEAR: [u8; 4] = [77, 128, 26, 0];

fn capture_empty<R: GeometryResources>(res: &mut R, w: u32, h: u32) -> PixelBuffer {
    let mut scene = Scene::new(SceneConfig { seed: Some(1), ..Default::default() });
    scene.initialize(res).unwrap();
    res.resize(w, h);
    scene.set_surface_size(w, h);
    scene.begin_loading(0).unwrap();
    scene.transition_to_ready().unwrap();
    scene.request_capture();
    scene.render_frame(res, 0.0).unwrap().unwrap()
}

#[test]
fn software_clear_matches_configured_bytes() {
    let mut res = SoftwareResources::new(ResourceConfig::default());
    let img = capture_empty(&mut res, 6, 4);
    assert!(img.pixels().all(|p| p.0 == CLEAR));
}

#[test]
fn wgpu_clear_matches_software_on_srgb_target() {
    let gpu = match pollster::block_on(HeadlessGpu::new(GpuInit::default())) {
        Ok(gpu) => gpu,
        Err(e) => {
            eprintln!("no adapter, skipping: {e:#}");
            return;
        }
    };
    assert!(gpu.format.is_srgb());
    let mut res = WgpuResources::new(gpu.device, gpu.queue, gpu.format, ResourceConfig::default());
    let img = capture_empty(&mut res, 6, 4);

    assert_eq!(img.dimensions(), (6, 4));
    for p in img.pixels() {
        for (got, want) in p.0.iter().zip(CLEAR) {
            assert!(got.abs_diff(want) <= 1, "{:?} vs {CLEAR:?}", p.0);
        }
    }
}
