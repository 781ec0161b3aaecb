use std::ops::{Deref, DerefMut, Index, IndexMut};

/// A single image plane: `width * height` samples stored row by row.
///
/// Derefs to the flat sample slice, so whole-plane passes can use slice
/// iterators directly while filters address samples by `(x, y)` or by row.
#[derive(Debug, Clone, PartialEq)]
pub struct Buffer2<T> {
    width: usize,
    height: usize,
    pixels: Vec<T>,
}

impl<T> Buffer2<T> {
    /// Wraps row-major `pixels`.
    ///
    /// # Panics
    ///
    /// Panics if `pixels` does not hold exactly `width * height` samples.
    pub fn new(width: usize, height: usize, pixels: Vec<T>) -> Self {
        assert!(
            pixels.len() == width * height,
            "{}x{} plane needs {} samples, got {}",
            width,
            height,
            width * height,
            pixels.len()
        );
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn same_shape<U>(&self, other: &Buffer2<U>) -> bool {
        (self.width, self.height) == (other.width, other.height)
    }

    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [T] {
        &mut self.pixels
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.width;
        &self.pixels[start..start + self.width]
    }

    /// Same-shaped plane with `f` applied to every sample.
    pub fn map<U, F>(&self, f: F) -> Buffer2<U>
    where
        F: Fn(&T) -> U,
    {
        Buffer2::new(self.width, self.height, self.pixels.iter().map(f).collect())
    }

    /// Same-shaped plane built from `f(self[i], other[i])`.
    ///
    /// # Panics
    ///
    /// Panics if the two planes differ in shape.
    pub fn zip_map<U, V, F>(&self, other: &Buffer2<U>, f: F) -> Buffer2<V>
    where
        F: Fn(&T, &U) -> V,
    {
        assert!(
            self.same_shape(other),
            "plane shape mismatch: {}x{} vs {}x{}",
            self.width,
            self.height,
            other.width,
            other.height
        );
        let pixels = self
            .pixels
            .iter()
            .zip(&other.pixels)
            .map(|(a, b)| f(a, b))
            .collect();
        Buffer2::new(self.width, self.height, pixels)
    }

    #[inline]
    fn offset(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height, "({x}, {y}) is outside the plane");
        y * self.width + x
    }
}

impl<T: Clone> Buffer2<T> {
    pub fn new_filled(width: usize, height: usize, value: T) -> Self {
        Self::new(width, height, vec![value; width * height])
    }
}

impl<T: Clone + Default> Buffer2<T> {
    pub fn new_default(width: usize, height: usize) -> Self {
        Self::new_filled(width, height, T::default())
    }
}

impl Buffer2<f32> {
    /// Mean sample value, summed in f64. An empty plane has mean 0.
    pub fn mean(&self) -> f64 {
        match self.pixels.len() {
            0 => 0.0,
            n => self.pixels.iter().map(|&v| f64::from(v)).sum::<f64>() / n as f64,
        }
    }

    /// Largest sample, `None` when the plane is empty.
    pub fn max_value(&self) -> Option<f32> {
        self.pixels.iter().copied().reduce(f32::max)
    }
}

impl<T> Index<(usize, usize)> for Buffer2<T> {
    type Output = T;

    #[inline]
    fn index(&self, (x, y): (usize, usize)) -> &T {
        &self.pixels[self.offset(x, y)]
    }
}

impl<T> IndexMut<(usize, usize)> for Buffer2<T> {
    #[inline]
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        let i = self.offset(x, y);
        &mut self.pixels[i]
    }
}

impl<T> Deref for Buffer2<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.pixels
    }
}

impl<T> DerefMut for Buffer2<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        &mut self.pixels
    }
}
