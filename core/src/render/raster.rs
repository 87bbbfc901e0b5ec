//! Scan conversion of points, lines, and triangles.
//!
//! Triangles are converted with analytic [edge and parameter
//! equations][super::eqn] in one of three modes: **Span** walks scanlines
//! of the flat-top/flat-bottom halves, **Block** classifies 8×8 tiles
//! against the edges and skips per-pixel tests in fully covered tiles, and
//! **Adaptive** picks per triangle based on bounding-box shape. All modes
//! cover exactly the pixels whose center sample passes the edge tests and
//! the top-left fill rule, so adjacent triangles never overdraw or leave
//! gaps along a shared edge.
//!
//! Lines are stepped with an integer DDA and points are a single scissor
//! test, both copying the requested attributes straight from the vertex.

use std::cell::RefCell;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::geom::{Vertex, MAX_A_VARS, MAX_P_VARS};
use crate::util::Rect;

use super::eqn::{EdgeData, PixelData, TriangleEquations};
use super::shader::{DummyPixelShader, PixelShader, ThreadSafe};
use super::stats::{Blocks, Stats};

/// Side length of the square tile used by block-mode rasterization.
pub const BLOCK_SIZE: i32 = 8;

/// Triangle rasterization mode.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum RasterMode {
    /// Scanline spans over the flat-split triangle halves.
    #[default]
    Span,
    /// 8×8 tile cover testing.
    Block,
    /// Block for compact triangles, Span for narrow or elongated ones.
    Adaptive,
}

/// Interface between the vertex processor and a rasterizer.
///
/// Vertices are post-viewport; `indices` address into `vertices`, and an
/// index of `-1` in the first slot of a primitive marks a clipped or
/// culled primitive that must be skipped.
pub trait Rasterize {
    /// Draws a list of points.
    fn draw_point_list(&self, vertices: &[Vertex], indices: &[i32]);

    /// Draws a list of lines.
    fn draw_line_list(&self, vertices: &[Vertex], indices: &[i32]);

    /// Draws a list of triangles.
    fn draw_triangle_list(&self, vertices: &[Vertex], indices: &[i32]);
}

/// Rasterizer with a configurable scissor rectangle, raster mode, and
/// pixel shader.
///
/// A freshly constructed rasterizer has an empty scissor rectangle and a
/// no-op shader; it draws nothing until both are configured.
pub struct Rasterizer {
    scissor: Rect,
    mode: RasterMode,
    shader: Box<dyn CompiledShader>,
    stats: RefCell<Stats>,
}

impl Rasterizer {
    pub fn new() -> Self {
        Self {
            scissor: Rect::EMPTY,
            mode: RasterMode::Span,
            shader: Box::new(Compiled(DummyPixelShader)),
            stats: RefCell::new(Stats::new()),
        }
    }

    /// Sets the raster mode. The default is [`RasterMode::Span`].
    pub fn set_raster_mode(&mut self, mode: RasterMode) {
        self.mode = mode;
    }

    /// Sets the scissor rectangle.
    ///
    /// No pixel outside the half-open region `[x, x+width) × [y, y+height)`
    /// is ever drawn.
    pub fn set_scissor(&mut self, x: i32, y: i32, width: i32, height: i32) {
        self.scissor = Rect::new(x, y, width, height);
    }

    /// Binds a pixel shader, compiling the raster inner loops for its
    /// capability constants.
    ///
    /// # Panics
    /// If the shader declares more variables than the vertex capacity.
    pub fn set_pixel_shader<P: PixelShader + 'static>(&mut self, shader: P) {
        assert!(P::A_VAR_COUNT <= MAX_A_VARS);
        assert!(P::P_VAR_COUNT <= MAX_P_VARS);
        log::debug!(
            "binding pixel shader: z={} w={} avars={} pvars={}",
            P::INTERPOLATE_Z,
            P::INTERPOLATE_W,
            P::A_VAR_COUNT,
            P::P_VAR_COUNT
        );
        self.shader = Box::new(Compiled(shader));
    }

    /// Returns a snapshot of the accumulated statistics.
    pub fn stats(&self) -> Stats {
        self.stats.borrow().clone()
    }

    /// Zeroes the accumulated statistics.
    pub fn reset_stats(&self) {
        *self.stats.borrow_mut() = Stats::new();
    }
}

impl Default for Rasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Rasterize for Rasterizer {
    fn draw_point_list(&self, vertices: &[Vertex], indices: &[i32]) {
        let mut stats = self.stats.borrow_mut();
        for &i in indices {
            if i == -1 {
                continue;
            }
            stats.prims.i += 1;
            self.shader
                .draw_point(self.scissor, &vertices[i as usize], &mut stats);
        }
    }

    fn draw_line_list(&self, vertices: &[Vertex], indices: &[i32]) {
        let mut stats = self.stats.borrow_mut();
        for prim in indices.chunks_exact(2) {
            if prim[0] == -1 {
                continue;
            }
            stats.prims.i += 1;
            self.shader.draw_line(
                self.scissor,
                &vertices[prim[0] as usize],
                &vertices[prim[1] as usize],
                &mut stats,
            );
        }
    }

    fn draw_triangle_list(&self, vertices: &[Vertex], indices: &[i32]) {
        let mut stats = self.stats.borrow_mut();
        for prim in indices.chunks_exact(3) {
            if prim[0] == -1 {
                continue;
            }
            stats.prims.i += 1;
            self.shader.draw_triangle(
                self.scissor,
                self.mode,
                &vertices[prim[0] as usize],
                &vertices[prim[1] as usize],
                &vertices[prim[2] as usize],
                &mut stats,
            );
        }
    }
}

// The type-erased form of a bound pixel shader: one object carrying the
// raster paths monomorphized for the shader's capability constants.
trait CompiledShader: ThreadSafe {
    fn draw_point(&self, scissor: Rect, v: &Vertex, stats: &mut Stats);
    fn draw_line(&self, scissor: Rect, v0: &Vertex, v1: &Vertex, stats: &mut Stats);
    #[allow(clippy::too_many_arguments)]
    fn draw_triangle(
        &self,
        scissor: Rect,
        mode: RasterMode,
        v0: &Vertex,
        v1: &Vertex,
        v2: &Vertex,
        stats: &mut Stats,
    );
}

struct Compiled<P>(P);

impl<P: PixelShader> CompiledShader for Compiled<P> {
    fn draw_point(&self, scissor: Rect, v: &Vertex, stats: &mut Stats) {
        if !scissor.covers(v.x, v.y) {
            return;
        }
        let p = PixelData::from_vertex(
            v,
            P::A_VAR_COUNT,
            P::INTERPOLATE_Z,
            P::INTERPOLATE_W,
        );
        self.0.draw_pixel(&p);
        stats.frags += 1;
        stats.prims.o += 1;
    }

    fn draw_line(&self, scissor: Rect, v0: &Vertex, v1: &Vertex, stats: &mut Stats) {
        let frags = line::<P>(&self.0, scissor, v0, v1);
        stats.frags += frags;
        stats.prims.o += (frags > 0) as usize;
    }

    fn draw_triangle(
        &self,
        scissor: Rect,
        mode: RasterMode,
        v0: &Vertex,
        v1: &Vertex,
        v2: &Vertex,
        stats: &mut Stats,
    ) {
        match mode {
            RasterMode::Span => tri_span::<P>(&self.0, scissor, v0, v1, v2, stats),
            RasterMode::Block => tri_block::<P>(&self.0, scissor, v0, v1, v2, stats),
            RasterMode::Adaptive => {
                // Narrow or elongated bounding boxes make poor tile
                // candidates.
                let min_x = v0.x.min(v1.x).min(v2.x);
                let max_x = v0.x.max(v1.x).max(v2.x);
                let min_y = v0.y.min(v1.y).min(v2.y);
                let max_y = v0.y.max(v1.y).max(v2.y);
                let orient = (max_x - min_x) / (max_y - min_y);

                if orient > 0.4 && orient < 1.6 {
                    tri_block::<P>(&self.0, scissor, v0, v1, v2, stats)
                } else {
                    tri_span::<P>(&self.0, scissor, v0, v1, v2, stats)
                }
            }
        }
    }
}

//
// Point and line paths
//

fn line<P: PixelShader>(
    shader: &P,
    scissor: Rect,
    v0: &Vertex,
    v1: &Vertex,
) -> usize {
    let adx = (v1.x as i32 - v0.x as i32).abs();
    let ady = (v1.y as i32 - v0.y as i32).abs();
    let steps = adx.max(ady);

    let mut frags = 0;
    let mut emit = |v: &Vertex| {
        if scissor.covers(v.x, v.y) {
            let p = PixelData::from_vertex(
                v,
                P::A_VAR_COUNT,
                P::INTERPOLATE_Z,
                P::INTERPOLATE_W,
            );
            shader.draw_pixel(&p);
            frags += 1;
        }
    };

    if steps == 0 {
        emit(v0);
        return frags;
    }

    let step = vertex_step::<P>(v0, v1, steps as f32);
    let mut v = *v0;
    // Both endpoints are sampled: steps + 1 pixels on an unclipped line.
    for _ in 0..=steps {
        emit(&v);
        step_vertex::<P>(&mut v, &step);
    }
    frags
}

fn vertex_step<P: PixelShader>(v0: &Vertex, v1: &Vertex, steps: f32) -> Vertex {
    let mut step = Vertex::new(
        (v1.x - v0.x) / steps,
        (v1.y - v0.y) / steps,
        0.0,
        0.0,
    );
    if P::INTERPOLATE_Z {
        step.z = (v1.z - v0.z) / steps;
    }
    if P::INTERPOLATE_W {
        step.w = (v1.w - v0.w) / steps;
    }
    for i in 0..P::A_VAR_COUNT {
        step.avar[i] = (v1.avar[i] - v0.avar[i]) / steps;
    }
    step
}

fn step_vertex<P: PixelShader>(v: &mut Vertex, step: &Vertex) {
    v.x += step.x;
    v.y += step.y;
    if P::INTERPOLATE_Z {
        v.z += step.z;
    }
    if P::INTERPOLATE_W {
        v.w += step.w;
    }
    for i in 0..P::A_VAR_COUNT {
        v.avar[i] += step.avar[i];
    }
}

//
// Span mode
//

fn tri_span<P: PixelShader>(
    shader: &P,
    scissor: Rect,
    v0: &Vertex,
    v1: &Vertex,
    v2: &Vertex,
    stats: &mut Stats,
) {
    let eqn = TriangleEquations::new(v0, v1, v2, P::A_VAR_COUNT, P::P_VAR_COUNT);

    // Backfacing or degenerate.
    if eqn.area2 <= 0.0 {
        return;
    }

    // Sort vertices from top to bottom.
    let mut t = v0;
    let mut m = v1;
    let mut b = v2;
    if t.y > m.y {
        std::mem::swap(&mut t, &mut m);
    }
    if m.y > b.y {
        std::mem::swap(&mut m, &mut b);
    }
    if t.y > m.y {
        std::mem::swap(&mut t, &mut m);
    }

    let dy = b.y - t.y;
    let iy = m.y - t.y;

    let mut frags = 0;
    if m.y == t.y {
        let (l, r) = if m.x < t.x { (m, t) } else { (t, m) };
        frags += top_flat::<P>(shader, scissor, &eqn, l, r, b);
    } else if m.y == b.y {
        let (l, r) = if m.x < b.x { (m, b) } else { (b, m) };
        frags += bottom_flat::<P>(shader, scissor, &eqn, t, l, r);
    } else {
        // Split at m.y: v4 sits on the long edge t-b at the same height
        // as m.
        let mut v4 = Vertex::new(t.x + ((b.x - t.x) / dy) * iy, m.y, 0.0, 0.0);
        if P::INTERPOLATE_Z {
            v4.z = t.z + ((b.z - t.z) / dy) * iy;
        }
        if P::INTERPOLATE_W {
            v4.w = t.w + ((b.w - t.w) / dy) * iy;
        }
        for i in 0..P::A_VAR_COUNT {
            v4.avar[i] = t.avar[i] + ((b.avar[i] - t.avar[i]) / dy) * iy;
        }

        let (l, r) = if m.x < v4.x { (m, &v4) } else { (&v4, m) };

        frags += bottom_flat::<P>(shader, scissor, &eqn, t, l, r);
        frags += top_flat::<P>(shader, scissor, &eqn, l, r, b);
    }

    stats.frags += frags;
    stats.prims.o += 1;
}

// Flat-bottomed half: apex v0 on top, base v1-v2 below. Scanlines run
// top to bottom.
fn bottom_flat<P: PixelShader>(
    shader: &P,
    scissor: Rect,
    eqn: &TriangleEquations,
    v0: &Vertex,
    v1: &Vertex,
    v2: &Vertex,
) -> usize {
    let invslope1 = (v1.x - v0.x) / (v1.y - v0.y);
    let invslope2 = (v2.x - v0.x) / (v2.y - v0.y);

    let y0 = ((v0.y + 0.5) as i32).max(scissor.top);
    let y1 = ((v1.y + 0.5) as i32).min(scissor.bottom);

    let row = |y: i32| {
        let dy = (y as f32 - v0.y) + 0.5;
        let x1 = v0.x + invslope1 * dy + 0.5;
        let x2 = v0.x + invslope2 * dy + 0.5;

        let xl = scissor.left.max(x1 as i32);
        let xr = scissor.right.min(x2 as i32);

        span::<P>(shader, eqn, xl, y, xr)
    };

    #[cfg(feature = "rayon")]
    {
        (y0..y1).into_par_iter().map(row).sum()
    }
    #[cfg(not(feature = "rayon"))]
    {
        (y0..y1).map(row).sum()
    }
}

// Flat-topped half: base v0-v1 on top, apex v2 below. Scanlines run
// bottom to top.
fn top_flat<P: PixelShader>(
    shader: &P,
    scissor: Rect,
    eqn: &TriangleEquations,
    v0: &Vertex,
    v1: &Vertex,
    v2: &Vertex,
) -> usize {
    let invslope1 = (v2.x - v0.x) / (v2.y - v0.y);
    let invslope2 = (v2.x - v1.x) / (v2.y - v1.y);

    let y0 = ((v2.y - 0.5) as i32).min(scissor.bottom - 1);
    let y1 = ((v0.y - 0.5) as i32).max(scissor.top - 1);

    let row = |y: i32| {
        let dy = (y as f32 - v2.y) + 0.5;
        let x1 = v2.x + invslope1 * dy + 0.5;
        let x2 = v2.x + invslope2 * dy + 0.5;

        let xl = scissor.left.max(x1 as i32);
        let xr = scissor.right.min(x2 as i32);

        span::<P>(shader, eqn, xl, y, xr)
    };

    #[cfg(feature = "rayon")]
    {
        (y1 + 1..=y0).into_par_iter().map(row).sum()
    }
    #[cfg(not(feature = "rayon"))]
    {
        (y1 + 1..=y0).rev().map(row).sum()
    }
}

// Fills one scanline, evaluating the equations once at the leftmost
// sample and stepping per pixel.
fn span<P: PixelShader>(
    shader: &P,
    eqn: &TriangleEquations,
    x0: i32,
    y: i32,
    x1: i32,
) -> usize {
    if x0 >= x1 {
        return 0;
    }

    let xf = x0 as f32 + 0.5;
    let yf = y as f32 + 0.5;

    let mut p = PixelData::new(
        eqn,
        xf,
        yf,
        P::A_VAR_COUNT,
        P::P_VAR_COUNT,
        P::INTERPOLATE_Z,
        P::INTERPOLATE_W,
    );
    p.y = y;

    for x in x0..x1 {
        p.x = x;
        shader.draw_pixel(&p);
        p.step_x(
            eqn,
            P::A_VAR_COUNT,
            P::P_VAR_COUNT,
            P::INTERPOLATE_Z,
            P::INTERPOLATE_W,
        );
    }
    (x1 - x0) as usize
}

//
// Block mode
//

fn tri_block<P: PixelShader>(
    shader: &P,
    scissor: Rect,
    v0: &Vertex,
    v1: &Vertex,
    v2: &Vertex,
    stats: &mut Stats,
) {
    let eqn = TriangleEquations::new(v0, v1, v2, P::A_VAR_COUNT, P::P_VAR_COUNT);

    // Backfacing or degenerate.
    if eqn.area2 <= 0.0 {
        return;
    }

    // Triangle bounding box, clipped to the scissor rect.
    let min_x = (v0.x.min(v1.x).min(v2.x) as i32).max(scissor.left);
    let max_x = (v0.x.max(v1.x).max(v2.x) as i32).min(scissor.right);
    let min_y = (v0.y.min(v1.y).min(v2.y) as i32).max(scissor.top);
    let max_y = (v0.y.max(v1.y).max(v2.y) as i32).min(scissor.bottom);

    if min_x > max_x || min_y > max_y {
        return;
    }

    // Round down to the block grid.
    let min_x = min_x & !(BLOCK_SIZE - 1);
    let max_x = max_x & !(BLOCK_SIZE - 1);
    let min_y = min_y & !(BLOCK_SIZE - 1);
    let max_y = max_y & !(BLOCK_SIZE - 1);

    let s = (BLOCK_SIZE - 1) as f32;

    let steps_x = (max_x - min_x) / BLOCK_SIZE + 1;
    let steps_y = (max_y - min_y) / BLOCK_SIZE + 1;

    let process = |i: i32| -> (Blocks, usize) {
        let sx = i % steps_x;
        let sy = i / steps_x;

        let x = min_x + sx * BLOCK_SIZE;
        let y = min_y + sy * BLOCK_SIZE;

        // Sample at pixel centers.
        let xf = x as f32 + 0.5;
        let yf = y as f32 + 0.5;

        // Edge values at the four block corners.
        let e00 = EdgeData::new(&eqn, xf, yf);
        let mut e01 = e00;
        e01.step_y_by(&eqn, s);
        let mut e10 = e00;
        e10.step_x_by(&eqn, s);
        let mut e11 = e01;
        e11.step_x_by(&eqn, s);

        let t00 = e00.tests(&eqn);
        let t01 = e01.tests(&eqn);
        let t10 = e10.tests(&eqn);
        let t11 = e11.tests(&eqn);

        let all = |t: [bool; 3]| t[0] && t[1] && t[2];
        let same = |t: [bool; 3]| t[0] == t[1] && t[1] == t[2];

        let result = all(t00) as u32 + all(t01) as u32 + all(t10) as u32 + all(t11) as u32;

        let mut counts = Blocks::default();
        let frags;
        if result == 4 {
            // Fully covered.
            counts.full = 1;
            frags = block::<P, false>(shader, scissor, &eqn, x, y);
        } else if result == 0 {
            // All corners out. A small triangle can still slice the block
            // without covering a corner; it does so only if some corner
            // sees disagreeing per-edge results.
            if same(t00) && same(t01) && same(t10) && same(t11) {
                counts.skipped = 1;
                frags = 0;
            } else {
                counts.sliced = 1;
                frags = block::<P, true>(shader, scissor, &eqn, x, y);
            }
        } else {
            // Partially covered.
            counts.partial = 1;
            frags = block::<P, true>(shader, scissor, &eqn, x, y);
        }
        (counts, frags)
    };

    #[cfg(feature = "rayon")]
    let (blocks, frags) = (0..steps_x * steps_y)
        .into_par_iter()
        .map(process)
        .reduce(Default::default, |a, b| (a.0 + b.0, a.1 + b.1));
    #[cfg(not(feature = "rayon"))]
    let (blocks, frags) = (0..steps_x * steps_y)
        .map(process)
        .fold((Blocks::default(), 0), |a, b| (a.0 + b.0, a.1 + b.1));

    stats.blocks += blocks;
    stats.frags += frags;
    stats.prims.o += 1;
}

// Rasterizes one 8x8 block, clamped to the scissor rect. With TEST_EDGES
// every pixel is tested against the three edges; without, the whole block
// is known to be covered.
fn block<P: PixelShader, const TEST_EDGES: bool>(
    shader: &P,
    scissor: Rect,
    eqn: &TriangleEquations,
    x: i32,
    y: i32,
) -> usize {
    let x0 = x.max(scissor.left);
    let y0 = y.max(scissor.top);
    let x1 = (x + BLOCK_SIZE).min(scissor.right);
    let y1 = (y + BLOCK_SIZE).min(scissor.bottom);

    let xf = x0 as f32 + 0.5;
    let yf = y0 as f32 + 0.5;

    let mut po = PixelData::new(
        eqn,
        xf,
        yf,
        P::A_VAR_COUNT,
        P::P_VAR_COUNT,
        P::INTERPOLATE_Z,
        P::INTERPOLATE_W,
    );
    let mut eo = EdgeData::default();
    if TEST_EDGES {
        eo = EdgeData::new(eqn, xf, yf);
    }

    let mut frags = 0;
    for yy in y0..y1 {
        let mut pi = po;
        let mut ei = eo;

        for xx in x0..x1 {
            if !TEST_EDGES || ei.test(eqn) {
                pi.x = xx;
                pi.y = yy;
                shader.draw_pixel(&pi);
                frags += 1;
            }

            pi.step_x(
                eqn,
                P::A_VAR_COUNT,
                P::P_VAR_COUNT,
                P::INTERPOLATE_Z,
                P::INTERPOLATE_W,
            );
            if TEST_EDGES {
                ei.step_x(eqn);
            }
        }

        po.step_y(
            eqn,
            P::A_VAR_COUNT,
            P::P_VAR_COUNT,
            P::INTERPOLATE_Z,
            P::INTERPOLATE_W,
        );
        if TEST_EDGES {
            eo.step_y(eqn);
        }
    }
    frags
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    type PixelMap = Arc<Mutex<HashMap<(i32, i32), ([f32; 3], f32)>>>;

    // Records every drawn pixel with its first three affine vars and
    // draw count.
    struct Recorder(PixelMap);

    impl PixelShader for Recorder {
        const A_VAR_COUNT: usize = 3;

        fn draw_pixel(&self, p: &PixelData<'_>) {
            let mut pixels = self.0.lock().unwrap();
            let e = pixels
                .entry((p.x, p.y))
                .or_insert(([0.0; 3], 0.0));
            e.0 = [p.avar[0], p.avar[1], p.avar[2]];
            e.1 += 1.0;
        }
    }

    fn recording_rasterizer(mode: RasterMode) -> (Rasterizer, PixelMap) {
        let pixels: PixelMap = Default::default();
        let mut rast = Rasterizer::new();
        rast.set_scissor(0, 0, 128, 128);
        rast.set_raster_mode(mode);
        rast.set_pixel_shader(Recorder(pixels.clone()));
        (rast, pixels)
    }

    fn vert(x: f32, y: f32, rgb: [f32; 3]) -> Vertex {
        let mut v = Vertex::new(x, y, 0.0, 1.0);
        v.avar[..3].copy_from_slice(&rgb);
        v
    }

    const RED: [f32; 3] = [1.0, 0.0, 0.0];
    const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
    const BLUE: [f32; 3] = [0.0, 0.0, 1.0];

    // Edge slopes are dyadic rationals, so no pixel center ever lands
    // exactly on an edge and all three modes agree pixel for pixel.
    fn big_tri() -> [Vertex; 3] {
        [
            vert(4.0, 4.0, RED),
            vert(120.0, 20.0, GREEN),
            vert(24.0, 68.0, BLUE),
        ]
    }

    #[test]
    fn modes_cover_identical_pixels() {
        let tri = big_tri();
        let mut sets = vec![];
        for mode in [RasterMode::Span, RasterMode::Block, RasterMode::Adaptive] {
            let (rast, pixels) = recording_rasterizer(mode);
            rast.draw_triangle_list(&tri, &[0, 1, 2]);

            let pixels = pixels.lock().unwrap();
            assert!(!pixels.is_empty());

            let mut keys: Vec<_> = pixels.keys().copied().collect();
            keys.sort();
            sets.push((keys, pixels.clone()));
        }

        assert_eq!(sets[0].0, sets[1].0, "span and block pixel sets differ");
        assert_eq!(sets[0].0, sets[2].0, "span and adaptive pixel sets differ");

        for key in &sets[0].0 {
            let a = sets[0].1[key].0;
            let b = sets[1].1[key].0;
            for i in 0..3 {
                assert!(
                    (a[i] - b[i]).abs() <= 1e-4,
                    "value mismatch at {key:?}: {a:?} vs {b:?}"
                );
            }
        }
    }

    #[test]
    fn backfacing_triangle_is_skipped() {
        let [a, b, c] = big_tri();
        for mode in [RasterMode::Span, RasterMode::Block] {
            let (rast, pixels) = recording_rasterizer(mode);
            rast.draw_triangle_list(&[c, b, a], &[0, 1, 2]);
            assert!(pixels.lock().unwrap().is_empty());
            assert_eq!(rast.stats().prims.o, 0);
        }
    }

    #[test]
    fn shared_edge_pixels_drawn_exactly_once() {
        // Quad split along the diagonal (8, 0)-(14, 10); both triangles
        // wound so that area2 > 0.
        let quad = [
            vert(8.0, 0.0, RED),
            vert(0.0, 6.0, RED),
            vert(14.0, 10.0, RED),
            vert(20.0, 3.0, RED),
        ];
        for mode in [RasterMode::Span, RasterMode::Block] {
            let (rast, pixels) = recording_rasterizer(mode);
            rast.draw_triangle_list(&quad, &[0, 2, 1, 0, 3, 2]);

            let pixels = pixels.lock().unwrap();
            assert!(!pixels.is_empty());
            for (pos, (_, count)) in pixels.iter() {
                assert_eq!(*count, 1.0, "pixel {pos:?} drawn {count} times");
            }
        }
    }

    #[test]
    fn spans_clamped_to_scissor() {
        let tri = big_tri();
        for mode in [RasterMode::Span, RasterMode::Block, RasterMode::Adaptive] {
            let (mut rast, pixels) = recording_rasterizer(mode);
            rast.set_scissor(20, 10, 30, 25);
            rast.draw_triangle_list(&tri, &[0, 1, 2]);

            let pixels = pixels.lock().unwrap();
            assert!(!pixels.is_empty());
            for &(x, y) in pixels.keys() {
                assert!((20..50).contains(&x) && (10..35).contains(&y));
            }
        }
    }

    #[test]
    fn fully_covered_blocks_hit_the_fast_path() {
        let (rast, _) = recording_rasterizer(RasterMode::Block);
        rast.draw_triangle_list(&big_tri(), &[0, 1, 2]);

        let blocks = rast.stats().blocks;
        assert!(blocks.full > 0);
        assert!(blocks.partial > 0);
    }

    #[test]
    fn tiny_triangle_slicing_a_block_is_not_dropped() {
        // Thin sliver crossing a block horizontally without covering any
        // of its four corner samples.
        let tri = [
            vert(0.0, 11.4, RED),
            vert(16.0, 11.4, RED),
            vert(16.0, 12.6, RED),
        ];
        let (rast, pixels) = recording_rasterizer(RasterMode::Block);
        rast.draw_triangle_list(&tri, &[0, 1, 2]);

        assert!(!pixels.lock().unwrap().is_empty());
        assert!(rast.stats().blocks.sliced > 0);
    }

    #[test]
    fn line_dda_covers_major_axis() {
        let (rast, pixels) = recording_rasterizer(RasterMode::Span);
        let a = vert(3.0, 4.0, RED);
        let b = vert(23.0, 14.0, GREEN);
        rast.draw_line_list(&[a, b], &[0, 1]);

        let pixels = pixels.lock().unwrap();
        // max(|dx|, |dy|) + 1 pixels, both endpoints included
        assert_eq!(pixels.len(), 21);
        assert!(pixels.contains_key(&(3, 4)));
        assert!(pixels.contains_key(&(23, 14)));
    }

    #[test]
    fn point_respects_scissor() {
        let (rast, pixels) = recording_rasterizer(RasterMode::Span);
        let inside = vert(5.0, 5.0, RED);
        let outside = vert(-1.0, 5.0, RED);
        rast.draw_point_list(&[inside, outside], &[0, 1]);

        let pixels = pixels.lock().unwrap();
        assert_eq!(pixels.len(), 1);
        assert!(pixels.contains_key(&(5, 5)));
    }

    #[test]
    fn sentinel_index_skips_primitive() {
        let (rast, pixels) = recording_rasterizer(RasterMode::Span);
        rast.draw_triangle_list(&big_tri(), &[-1, 1, 2]);
        assert!(pixels.lock().unwrap().is_empty());
    }
}
