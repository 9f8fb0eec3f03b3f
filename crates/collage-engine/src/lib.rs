//! Collage canvas engine.
//!
//! A zoomable 2D canvas of image tiles rendered through wgpu: the scene model,
//! its GPU geometry resources, the threaded command front and the winit
//! runtime that hosts it in a window.

pub mod canvas;
pub mod coords;
pub mod device;
pub mod input;
pub mod logging;
pub mod render;
pub mod scene;
pub mod time;
pub mod window;
