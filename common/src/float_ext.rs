/// Tolerant float comparison for filter outputs and test assertions.
pub trait FloatExt: Copy {
    /// `|self - other| <= EPSILON`.
    fn approximately_eq(self, other: Self) -> bool;

    fn approximately_eq_within(self, other: Self, tolerance: Self) -> bool;
}

macro_rules! impl_float_ext {
    ($ty:ty) => {
        impl FloatExt for $ty {
            #[inline]
            fn approximately_eq(self, other: Self) -> bool {
                self.approximately_eq_within(other, crate::EPSILON as $ty)
            }

            #[inline]
            fn approximately_eq_within(self, other: Self, tolerance: Self) -> bool {
                (self - other).abs() <= tolerance
            }
        }
    };
}

impl_float_ext!(f32);
impl_float_ext!(f64);
