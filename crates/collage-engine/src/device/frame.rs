/// An acquired swapchain image.
///
/// Short-lived: hand `view` to the geometry resources, draw, then call
/// [`Gpu::present`](super::Gpu::present). Holding it blocks the next acquire.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}
