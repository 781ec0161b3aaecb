//! Scale-space filters: Gaussian blur and local dispersion.
//!
//! Both filters are separable and run row-parallel. They use different
//! border modes: the blur replicates edge samples, the box average behind
//! the dispersion estimate reflects around the edge sample (reflect-101).


mod dispersion;
mod gaussian;

pub use dispersion::{box_mean, local_dispersion_plane, DISPERSION_FLOOR};
pub use gaussian::{blur_sigma, gaussian_blur_plane, gaussian_kernel_1d, MIN_SIGMA};

use crate::image::WorkingImage;

/// How out-of-range sample indices are folded back into the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Border {
    /// `aaa|abcd|ddd`
    Replicate,
    /// `dcb|abcd|cba`
    Reflect101,
}

impl Border {
    /// Maps a possibly out-of-range index into `0..len`.
    #[inline]
    pub fn index(self, i: isize, len: usize) -> usize {
        debug_assert!(len > 0);
        match self {
            Border::Replicate => i.clamp(0, len as isize - 1) as usize,
            Border::Reflect101 => {
                if len == 1 {
                    return 0;
                }
                let period = 2 * (len as isize - 1);
                let m = i.rem_euclid(period);
                if m >= len as isize {
                    (period - m) as usize
                } else {
                    m as usize
                }
            }
        }
    }
}

/// Gaussian blur of every channel with a `kernel_size`-tap kernel.
pub fn blur(image: &WorkingImage, kernel_size: usize, sigma_perc: f32) -> WorkingImage {
    image.map_planes(|plane| gaussian_blur_plane(plane, kernel_size, sigma_perc))
}

/// Local standard deviation of every channel over a `kernel_size` window.
pub fn local_dispersion(image: &WorkingImage, kernel_size: usize) -> WorkingImage {
    image.map_planes(|plane| local_dispersion_plane(plane, kernel_size))
}
