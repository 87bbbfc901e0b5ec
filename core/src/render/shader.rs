//! Vertex and pixel shader protocols.
//!
//! Shaders are user-supplied types that customize the two programmable
//! stages of the pipeline. Their capabilities — how many variables they
//! consume, whether depth or w should be interpolated — are associated
//! constants, so the rasterizer monomorphizes its inner loops per shader
//! type and the per-pixel code carries no branches on them.

use std::mem::size_of;

use bytemuck::Pod;

use crate::geom::Vertex;

use super::eqn::PixelData;

/// Maximum number of vertex attribute streams.
pub const MAX_VERTEX_ATTRIBS: usize = 8;

/// Marker bound for shaders crossing into parallel rasterization.
///
/// With the `rayon` feature enabled this requires `Send + Sync`; without
/// it, every type qualifies.
#[cfg(feature = "rayon")]
pub trait ThreadSafe: Send + Sync {}
#[cfg(feature = "rayon")]
impl<T: Send + Sync + ?Sized> ThreadSafe for T {}

#[cfg(not(feature = "rayon"))]
pub trait ThreadSafe {}
#[cfg(not(feature = "rayon"))]
impl<T: ?Sized> ThreadSafe for T {}

/// A pixel shader: invoked once per covered pixel with fully interpolated
/// attributes.
///
/// The capability constants are a contract. The rasterizer computes and
/// steps exactly the fields they request; everything else in the
/// [`PixelData`] stays zeroed. Counts must not exceed
/// [`MAX_A_VARS`][crate::geom::MAX_A_VARS] /
/// [`MAX_P_VARS`][crate::geom::MAX_P_VARS] — checked when the shader is
/// bound.
///
/// The rasterizer calls [`draw_pixel`][Self::draw_pixel] exactly once per
/// covered pixel and promises no invocation order within a single
/// primitive. Output therefore happens through `&self`; shaders own their
/// surface access (shared interior-mutable buffers, atomics, or plain
/// accumulation).
pub trait PixelShader: ThreadSafe {
    /// Whether to interpolate the z component.
    const INTERPOLATE_Z: bool = false;

    /// Whether to interpolate the w component.
    const INTERPOLATE_W: bool = false;

    /// How many affine variables to interpolate.
    const A_VAR_COUNT: usize = 0;

    /// How many perspective variables to interpolate.
    const P_VAR_COUNT: usize = 0;

    /// Called for every covered pixel.
    fn draw_pixel(&self, p: &PixelData<'_>);
}

/// A vertex shader: turns raw attribute bytes into a clip-space vertex.
///
/// `ATTRIB_COUNT` declares how many attribute streams the shader reads
/// (bound-checked against [`MAX_VERTEX_ATTRIBS`]); the variable counts
/// declare how many output variables it fills in, which the vertex
/// processor needs when interpolating new vertices during clipping.
pub trait VertexShader {
    /// Number of vertex attribute streams this shader reads.
    const ATTRIB_COUNT: usize;

    /// How many affine variables the output vertices carry.
    const A_VAR_COUNT: usize = 0;

    /// How many perspective variables the output vertices carry.
    const P_VAR_COUNT: usize = 0;

    /// Processes a single vertex into clip space.
    fn process_vertex(&self, input: &VertexShaderInput<'_>, out: &mut Vertex);
}

/// Per-vertex attribute data handed to a vertex shader.
///
/// Slot `k` holds the bytes of attribute stream `k` starting at the
/// current vertex; undeclared slots are empty.
pub struct VertexShaderInput<'a> {
    pub(crate) slots: [&'a [u8]; MAX_VERTEX_ATTRIBS],
}

impl<'a> VertexShaderInput<'a> {
    /// Reinterprets the head of attribute slot `k` as a `T`.
    ///
    /// # Panics
    /// If the slot holds fewer than `size_of::<T>()` bytes or is not
    /// aligned for `T`, which means the bound buffer, its stride, or the
    /// vertex index is wrong.
    pub fn attrib<T: Pod>(&self, k: usize) -> &'a T {
        bytemuck::from_bytes(&self.slots[k][..size_of::<T>()])
    }

    /// The raw bytes of attribute slot `k`, from the current vertex to the
    /// end of the bound buffer.
    pub fn bytes(&self, k: usize) -> &'a [u8] {
        self.slots[k]
    }
}

// Object-safe bridge storing a bound vertex shader together with its
// capability constants.
pub(crate) trait VertexShaderImpl {
    fn attrib_count(&self) -> usize;
    fn avar_count(&self) -> usize;
    fn pvar_count(&self) -> usize;
    fn process(&self, input: &VertexShaderInput<'_>, out: &mut Vertex);
}

pub(crate) struct VsBridge<V>(pub V);

impl<V: VertexShader> VertexShaderImpl for VsBridge<V> {
    fn attrib_count(&self) -> usize {
        V::ATTRIB_COUNT
    }
    fn avar_count(&self) -> usize {
        V::A_VAR_COUNT
    }
    fn pvar_count(&self) -> usize {
        V::P_VAR_COUNT
    }
    fn process(&self, input: &VertexShaderInput<'_>, out: &mut Vertex) {
        self.0.process_vertex(input, out);
    }
}

/// Binds a freshly constructed processor: reads nothing, outputs the
/// default vertex.
pub(crate) struct DummyVertexShader;

impl VertexShader for DummyVertexShader {
    const ATTRIB_COUNT: usize = 0;

    fn process_vertex(&self, _: &VertexShaderInput<'_>, _: &mut Vertex) {}
}

/// Bound by a freshly constructed rasterizer: interpolates nothing and
/// draws nothing.
pub(crate) struct DummyPixelShader;

impl PixelShader for DummyPixelShader {
    fn draw_pixel(&self, _: &PixelData<'_>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_attribute_access() {
        let data: [f32; 4] = [1.0, 2.0, 3.0, 4.0];
        let bytes: &[u8] = bytemuck::cast_slice(&data);

        let input = VertexShaderInput {
            slots: [bytes, &[], &[], &[], &[], &[], &[], &[]],
        };
        assert_eq!(*input.attrib::<f32>(0), 1.0);
        assert_eq!(*input.attrib::<[f32; 4]>(0), data);
        assert_eq!(input.bytes(0).len(), 16);
    }
}
