use anyhow::{bail, Context};

use crate::render::GeometryResources;
use crate::scene::{PixelBuffer, SceneState};

use super::CanvasRenderer;

/// Drives `renderer` without a window: creates a `width`x`height` surface,
/// waits until every queued load has settled and returns one captured frame.
///
/// Queue the images with [`CanvasRenderer::handle`] before calling this.
pub fn render_offscreen<R: GeometryResources + ?Sized>(
    renderer: &mut CanvasRenderer,
    resources: &mut R,
    width: u32,
    height: u32,
) -> anyhow::Result<PixelBuffer> {
    renderer
        .on_surface_created(resources)
        .context("failed to initialize offscreen resources")?;
    renderer.on_surface_changed(resources, width, height);
    renderer.process_commands(resources);

    loop {
        match renderer.scene().state() {
            SceneState::Ready => break,
            SceneState::Disposed => bail!("canvas disposed before it became ready"),
            SceneState::Loading => renderer.wait_for_commands(resources),
        }
    }

    let image = renderer.render_capture(resources).context("offscreen capture failed")?;
    log::info!("rendered {}x{} offscreen", image.width(), image.height());
    Ok(image)
}
