//! Turning 3D geometry into pixel shader invocations.
//!
//! This module is the rendering pipeline of `swrast`. Data flows one way:
//! the [vertex processor][pipeline] caches and shades vertices, [clips][clip]
//! primitives against the homogeneous view volume, transforms them to screen
//! space, and feeds them to the [rasterizer][raster], which scan-converts
//! them with the analytic [edge and parameter equations][eqn] and calls the
//! bound [pixel shader][shader] once per covered pixel.

pub mod cache;
pub mod clip;
pub mod eqn;
pub mod pipeline;
pub mod raster;
pub mod shader;
pub mod stats;

pub use {
    eqn::{PixelData, TriangleEquations},
    pipeline::{CullMode, DrawMode, VertexProcessor},
    raster::{RasterMode, Rasterize, Rasterizer},
    shader::{PixelShader, VertexShader, VertexShaderInput},
    stats::Stats,
};
