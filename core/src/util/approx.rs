//! Testing and asserting approximate equality.

use std::iter::zip;

/// Trait for testing approximate equality of floating-point values.
///
/// Two values are considered approximately equal if their absolute
/// difference is within a small epsilon relative to their magnitude.
/// Strict `==` comparison is too brittle for values accumulated through
/// incremental stepping.
pub trait ApproxEq<Other: ?Sized = Self> {
    /// Returns whether `self` and `other` are approximately equal,
    /// using the default relative epsilon.
    fn approx_eq(&self, other: &Other) -> bool {
        self.approx_eq_eps(other, 1e-6)
    }

    /// Returns whether `self` and `other` are approximately equal,
    /// using the relative epsilon `rel_eps`.
    fn approx_eq_eps(&self, other: &Other, rel_eps: f32) -> bool;
}

impl ApproxEq for f32 {
    fn approx_eq_eps(&self, other: &Self, rel_eps: f32) -> bool {
        (self - other).abs() <= rel_eps * self.abs().max(1.0)
    }
}

impl<T: ApproxEq> ApproxEq for [T] {
    fn approx_eq_eps(&self, other: &Self, rel_eps: f32) -> bool {
        self.len() == other.len()
            && zip(self, other).all(|(s, o)| s.approx_eq_eps(o, rel_eps))
    }
}

impl<T: ApproxEq, const N: usize> ApproxEq<Self> for [T; N] {
    fn approx_eq_eps(&self, other: &Self, rel_eps: f32) -> bool {
        self.as_slice().approx_eq_eps(other, rel_eps)
    }
}

/// Asserts that two expressions are approximately equal.
///
/// An optional third argument overrides the relative epsilon.
#[macro_export]
macro_rules! assert_approx_eq {
    ($a:expr, $b:expr) => {
        assert_approx_eq!($a, $b, eps = 1e-6)
    };
    ($a:expr, $b:expr, eps = $eps:expr) => {{
        use $crate::util::approx::ApproxEq;
        let (a, b) = (&$a, &$b);
        assert!(
            a.approx_eq_eps(b, $eps),
            "{:?} != {:?} (eps {:?})",
            a,
            b,
            $eps
        )
    }};
}
