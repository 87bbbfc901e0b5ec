//! A software 3D rasterization pipeline.
//!
//! `swrast` turns indexed vertex data into pixel shader invocations. The
//! pipeline is a one-way data flow: a [vertex processor][render::pipeline]
//! runs a user-supplied vertex shader over deduplicated vertices, clips the
//! resulting primitives against the homogeneous view volume, applies the
//! perspective division and viewport transform, and hands the surviving
//! points, lines, and triangles to a [rasterizer][render::raster] that
//! converts them into perspective-correct interpolated fragments.
//!
//! Shaders are plain types carrying compile-time capability constants, so
//! the per-pixel inner loops are monomorphized and branch-free on them.
//! The library itself owns no surface: pixel shaders write wherever they
//! like, which keeps windowing, image I/O, and texturing out of scope.
//!
//! # Features
//! * `rayon`: rasterizes independent 8×8 blocks and scanlines on the rayon
//!   thread pool. Requires pixel shaders to be `Send + Sync`.

pub mod geom;
pub mod render;
pub mod util;

/// The most commonly used items, re-exported in one place.
pub mod prelude {
    pub use crate::geom::{Vertex, MAX_A_VARS, MAX_P_VARS};
    pub use crate::render::{
        eqn::{PixelData, TriangleEquations},
        pipeline::{CullMode, DrawMode, VertexProcessor},
        raster::{RasterMode, Rasterize, Rasterizer},
        shader::{PixelShader, VertexShader, VertexShaderInput, MAX_VERTEX_ATTRIBS},
        stats::Stats,
    };
}
