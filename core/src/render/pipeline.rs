//! The vertex processor: the front half of the pipeline.
//!
//! [`VertexProcessor`] pulls vertices through a user-supplied vertex
//! shader (deduplicated by a small [cache][super::cache]), clips the
//! assembled primitives against the view volume, applies the perspective
//! division and viewport transform, culls backfaces, and hands the
//! surviving primitives to the wired [rasterizer][super::raster] in
//! batches. Within one [`draw_elements`][VertexProcessor::draw_elements]
//! call, primitives reach the rasterizer in submission order.

use log::trace;

use crate::geom::Vertex;

use super::cache::VertexCache;
use super::clip::{lerp_vertex, outcode, LineClipper, PolyClipper, PLANES};
use super::raster::Rasterize;
use super::shader::{
    DummyVertexShader, VertexShader, VertexShaderImpl, VertexShaderInput,
    VsBridge, MAX_VERTEX_ATTRIBS,
};
use super::stats::Stats;

/// Primitive draw mode.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DrawMode {
    Point,
    Line,
    Triangle,
}

impl DrawMode {
    /// Number of indices per primitive.
    fn index_count(self) -> usize {
        match self {
            Self::Point => 1,
            Self::Line => 2,
            Self::Triangle => 3,
        }
    }
}

/// Triangle culling mode.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CullMode {
    /// Keep all triangles.
    None,
    /// Cull counter-clockwise triangles.
    CCW,
    /// Cull clockwise triangles.
    #[default]
    CW,
}

/// Primitives accumulated before a batch is flushed through
/// clip/transform/draw.
pub const BATCH_PRIMITIVES: usize = 1024;

#[derive(Copy, Clone, Debug, Default)]
struct Viewport {
    px: f32,
    py: f32,
    ox: f32,
    oy: f32,
}

#[derive(Copy, Clone, Debug)]
struct DepthRange {
    n: f32,
    f: f32,
}

#[derive(Copy, Clone)]
struct Attribute<'b> {
    buffer: &'b [u8],
    stride: usize,
}

/// Processes vertices and feeds primitives to a rasterizer.
///
/// One processor is one logical draw stream: the scratch vectors it keeps
/// between pipeline stages are reused across draw calls and must not be
/// shared across threads.
pub struct VertexProcessor<'r, 'b> {
    rasterizer: &'r dyn Rasterize,
    viewport: Viewport,
    depth_range: DepthRange,
    cull_mode: CullMode,
    shader: Box<dyn VertexShaderImpl>,
    attributes: [Attribute<'b>; MAX_VERTEX_ATTRIBS],

    stats: Stats,

    // Batch scratch state
    vertices_out: Vec<Vertex>,
    indices_out: Vec<i32>,
    clip_masks: Vec<u8>,
    already_processed: Vec<bool>,
    poly_clipper: PolyClipper,
}

impl<'r, 'b> VertexProcessor<'r, 'b> {
    /// Creates a processor feeding `rasterizer`.
    ///
    /// Defaults: clockwise culling, depth range (0, 1), empty viewport,
    /// no-op vertex shader.
    pub fn new(rasterizer: &'r dyn Rasterize) -> Self {
        Self {
            rasterizer,
            viewport: Viewport::default(),
            depth_range: DepthRange { n: 0.0, f: 1.0 },
            cull_mode: CullMode::CW,
            shader: Box::new(VsBridge(DummyVertexShader)),
            attributes: [Attribute { buffer: &[], stride: 0 };
                MAX_VERTEX_ATTRIBS],
            stats: Stats::new(),
            vertices_out: Vec::new(),
            indices_out: Vec::new(),
            clip_masks: Vec::new(),
            already_processed: Vec::new(),
            poly_clipper: PolyClipper::new(),
        }
    }

    /// Sets the viewport. Top-left is (0, 0); y grows downward on screen.
    pub fn set_viewport(&mut self, x: i32, y: i32, width: i32, height: i32) {
        let px = width as f32 / 2.0;
        let py = height as f32 / 2.0;
        self.viewport = Viewport {
            px,
            py,
            ox: x as f32 + px,
            oy: y as f32 + py,
        };
    }

    /// Sets the depth range the clip-space z is mapped to.
    /// The default is (0, 1).
    pub fn set_depth_range(&mut self, n: f32, f: f32) {
        self.depth_range = DepthRange { n, f };
    }

    /// Sets the cull mode. The default is [`CullMode::CW`].
    pub fn set_cull_mode(&mut self, mode: CullMode) {
        self.cull_mode = mode;
    }

    /// Binds a vertex shader.
    ///
    /// # Panics
    /// If the shader declares more attribute streams or output variables
    /// than the supported maximums.
    pub fn set_vertex_shader<V: VertexShader + 'static>(&mut self, shader: V) {
        assert!(V::ATTRIB_COUNT <= MAX_VERTEX_ATTRIBS);
        assert!(V::A_VAR_COUNT <= crate::geom::MAX_A_VARS);
        assert!(V::P_VAR_COUNT <= crate::geom::MAX_P_VARS);
        self.shader = Box::new(VsBridge(shader));
    }

    /// Binds attribute stream `index` to `buffer` with the given stride in
    /// bytes. The buffer is borrowed for the lifetime of the processor and
    /// never written.
    ///
    /// # Panics
    /// If `index` is out of range.
    pub fn set_vertex_attrib(
        &mut self,
        index: usize,
        stride: usize,
        buffer: &'b [u8],
    ) {
        assert!(index < MAX_VERTEX_ATTRIBS);
        self.attributes[index] = Attribute { buffer, stride };
    }

    /// Returns a snapshot of the accumulated statistics.
    pub fn stats(&self) -> Stats {
        self.stats.clone()
    }

    /// Zeroes the accumulated statistics.
    pub fn reset_stats(&mut self) {
        self.stats = Stats::new();
    }

    /// Draws a number of points, lines, or triangles.
    ///
    /// Each consecutive group of 1/2/3 indices forms one primitive; a
    /// trailing partial group is ignored. An index of −1 in the first
    /// slot of a group skips that primitive.
    pub fn draw_elements(&mut self, mode: DrawMode, indices: &[i32]) {
        self.vertices_out.clear();
        self.indices_out.clear();

        self.stats.calls += 1;

        let prim_size = mode.index_count();
        let mut cache = VertexCache::new();

        for prim in indices.chunks_exact(prim_size) {
            if prim[0] == -1 {
                continue;
            }

            for &index in prim {
                self.stats.verts.i += 1;

                if let Some(out) = cache.lookup(index) {
                    self.indices_out.push(out);
                } else {
                    let out = self.vertices_out.len() as i32;

                    let input = self.vertex_input(index);
                    let mut vertex = Vertex::default();
                    self.shader.process(&input, &mut vertex);
                    self.stats.verts.o += 1;

                    self.vertices_out.push(vertex);
                    self.indices_out.push(out);
                    cache.set(index, out);
                }
            }

            if self.indices_out.len() / prim_size >= BATCH_PRIMITIVES {
                self.process_primitives(mode);
                self.vertices_out.clear();
                self.indices_out.clear();
                cache.clear();
            }
        }

        self.process_primitives(mode);
    }

    fn vertex_input(&self, index: i32) -> VertexShaderInput<'b> {
        let mut slots: [&'b [u8]; MAX_VERTEX_ATTRIBS] =
            [&[]; MAX_VERTEX_ATTRIBS];
        for (slot, attr) in
            slots.iter_mut().zip(&self.attributes[..self.shader.attrib_count()])
        {
            *slot = &attr.buffer[attr.stride * index as usize..];
        }
        VertexShaderInput { slots }
    }

    fn process_primitives(&mut self, mode: DrawMode) {
        if self.indices_out.is_empty() {
            return;
        }
        trace!(
            "flushing batch: {} vertices, {} indices",
            self.vertices_out.len(),
            self.indices_out.len()
        );

        self.stats.prims.i += self.indices_out.len() / mode.index_count();

        self.clip_primitives(mode);
        self.transform_vertices();
        self.draw_primitives(mode);
    }

    fn clip_primitives(&mut self, mode: DrawMode) {
        match mode {
            DrawMode::Point => self.clip_points(),
            DrawMode::Line => self.clip_lines(),
            DrawMode::Triangle => self.clip_triangles(),
        }
    }

    fn update_clip_masks(&mut self) {
        self.clip_masks.clear();
        self.clip_masks
            .extend(self.vertices_out.iter().map(outcode));
    }

    fn clip_points(&mut self) {
        self.update_clip_masks();

        for i in 0..self.indices_out.len() {
            if self.clip_masks[self.indices_out[i] as usize] != 0 {
                self.indices_out[i] = -1;
            }
        }
    }

    fn clip_lines(&mut self) {
        self.update_clip_masks();

        for i in (0..self.indices_out.len()).step_by(2) {
            let i0 = self.indices_out[i] as usize;
            let i1 = self.indices_out[i + 1] as usize;

            let v0 = self.vertices_out[i0];
            let v1 = self.vertices_out[i1];

            let mask = self.clip_masks[i0] | self.clip_masks[i1];

            let mut clipper = LineClipper::new();
            for plane in &PLANES {
                if mask & plane.bit != 0 {
                    clipper.clip_to_plane(&v0, &v1, plane);
                }
            }

            if clipper.fully_clipped {
                self.indices_out[i] = -1;
                self.indices_out[i + 1] = -1;
                continue;
            }

            let avars = self.shader.avar_count();
            let pvars = self.shader.pvar_count();

            if self.clip_masks[i0] != 0 {
                let v = lerp_vertex(&v0, &v1, clipper.t0, avars, pvars);
                self.vertices_out.push(v);
                self.indices_out[i] = self.vertices_out.len() as i32 - 1;
            }
            if self.clip_masks[i1] != 0 {
                let v = lerp_vertex(&v0, &v1, clipper.t1, avars, pvars);
                self.vertices_out.push(v);
                self.indices_out[i + 1] = self.vertices_out.len() as i32 - 1;
            }
        }
    }

    fn clip_triangles(&mut self) {
        self.update_clip_masks();

        let avars = self.shader.avar_count();
        let pvars = self.shader.pvar_count();

        let n = self.indices_out.len();
        for i in (0..n).step_by(3) {
            let i0 = self.indices_out[i];
            let i1 = self.indices_out[i + 1];
            let i2 = self.indices_out[i + 2];

            let mask = self.clip_masks[i0 as usize]
                | self.clip_masks[i1 as usize]
                | self.clip_masks[i2 as usize];

            self.poly_clipper.init(i0, i1, i2, avars, pvars);
            for plane in &PLANES {
                if mask & plane.bit != 0 {
                    self.poly_clipper
                        .clip_to_plane(&mut self.vertices_out, plane);
                }
            }

            if self.poly_clipper.fully_clipped() {
                self.indices_out[i] = -1;
                self.indices_out[i + 1] = -1;
                self.indices_out[i + 2] = -1;
                continue;
            }

            let indices = self.poly_clipper.indices();
            self.indices_out[i] = indices[0];
            self.indices_out[i + 1] = indices[1];
            self.indices_out[i + 2] = indices[2];

            // Retriangulate the clipped polygon as a fan rooted at the
            // first vertex, appending the extra triangles to the batch.
            for k in 3..indices.len() {
                self.indices_out.push(indices[0]);
                self.indices_out.push(indices[k - 1]);
                self.indices_out.push(indices[k]);
            }
        }
    }

    /// Perspective division, viewport transform, and depth-range mapping
    /// for every live vertex. `w` is preserved; the variables are left
    /// untouched for the rasterizer.
    fn transform_vertices(&mut self) {
        self.already_processed.clear();
        self.already_processed.resize(self.vertices_out.len(), false);

        for &index in &self.indices_out {
            if index == -1 {
                continue;
            }
            let index = index as usize;
            if self.already_processed[index] {
                continue;
            }

            let v = &mut self.vertices_out[index];

            // Perspective division; clipping guarantees w != 0 here.
            let invw = 1.0 / v.w;
            v.x *= invw;
            v.y *= invw;
            v.z *= invw;

            // Viewport transform. The y axis flips: clip space has y up,
            // the screen has y down.
            v.x = self.viewport.px * v.x + self.viewport.ox;
            v.y = self.viewport.py * -v.y + self.viewport.oy;
            v.z = 0.5 * (self.depth_range.f - self.depth_range.n) * v.z
                + 0.5 * (self.depth_range.n + self.depth_range.f);

            self.already_processed[index] = true;
        }
    }

    fn draw_primitives(&mut self, mode: DrawMode) {
        match mode {
            DrawMode::Triangle => {
                self.cull_triangles();
                self.stats.prims.o += self
                    .indices_out
                    .chunks_exact(3)
                    .filter(|p| p[0] != -1)
                    .count();
                self.rasterizer
                    .draw_triangle_list(&self.vertices_out, &self.indices_out);
            }
            DrawMode::Line => {
                self.stats.prims.o += self
                    .indices_out
                    .chunks_exact(2)
                    .filter(|p| p[0] != -1)
                    .count();
                self.rasterizer
                    .draw_line_list(&self.vertices_out, &self.indices_out);
            }
            DrawMode::Point => {
                self.stats.prims.o +=
                    self.indices_out.iter().filter(|&&i| i != -1).count();
                self.rasterizer
                    .draw_point_list(&self.vertices_out, &self.indices_out);
            }
        }
    }

    /// Backface culling in screen space.
    ///
    /// `facing < 0` is the clockwise side. Kept triangles with
    /// `facing ≥ 0` get their first and third indices swapped so the
    /// rasterizer always sees a winding with positive signed area.
    fn cull_triangles(&mut self) {
        let mut i = 0;
        while i + 3 <= self.indices_out.len() {
            let idx = [
                self.indices_out[i],
                self.indices_out[i + 1],
                self.indices_out[i + 2],
            ];
            if idx[0] == -1 {
                i += 3;
                continue;
            }

            let v0 = &self.vertices_out[idx[0] as usize];
            let v1 = &self.vertices_out[idx[1] as usize];
            let v2 = &self.vertices_out[idx[2] as usize];

            let facing = (v0.x - v1.x) * (v2.y - v1.y)
                - (v2.x - v1.x) * (v0.y - v1.y);

            if facing < 0.0 {
                if self.cull_mode == CullMode::CW {
                    self.indices_out[i] = -1;
                    self.indices_out[i + 1] = -1;
                    self.indices_out[i + 2] = -1;
                }
            } else if self.cull_mode == CullMode::CCW {
                self.indices_out[i] = -1;
                self.indices_out[i + 1] = -1;
                self.indices_out[i + 2] = -1;
            } else {
                self.indices_out.swap(i, i + 2);
            }

            i += 3;
        }
    }
}
