//! Separable Gaussian blur with replicated borders.

use common::parallel::par_rows_mut;
use common::Buffer2;

use super::Border;

/// Lower bound on sigma so that tiny `sigma_perc` values stay well defined.
pub const MIN_SIGMA: f32 = 0.01;

/// Sigma for a kernel of `kernel_size` taps: a fraction of the half-width.
#[inline]
pub fn blur_sigma(kernel_size: usize, sigma_perc: f32) -> f32 {
    let half_width = (kernel_size.saturating_sub(1)) as f32 / 2.0;
    (sigma_perc * half_width).max(MIN_SIGMA)
}

/// Normalized 1D Gaussian of exactly `size` taps centred on `size / 2`.
pub fn gaussian_kernel_1d(size: usize, sigma: f32) -> Vec<f32> {
    assert!(size % 2 == 1, "Kernel size must be odd");
    assert!(sigma > 0.0, "Sigma must be positive");

    let radius = (size / 2) as f64;
    let two_sigma_sq = 2.0 * sigma as f64 * sigma as f64;

    let raw: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - radius;
            (-x * x / two_sigma_sq).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();

    raw.iter().map(|&v| (v / sum) as f32).collect()
}

/// Blurs one plane with a `kernel_size`×`kernel_size` Gaussian.
///
/// The 2D kernel is the outer product of [`gaussian_kernel_1d`], so rows are
/// convolved first and columns second.
pub fn gaussian_blur_plane(
    plane: &Buffer2<f32>,
    kernel_size: usize,
    sigma_perc: f32,
) -> Buffer2<f32> {
    let kernel = gaussian_kernel_1d(kernel_size, blur_sigma(kernel_size, sigma_perc));
    let (width, height) = (plane.width(), plane.height());
    let radius = (kernel.len() / 2) as isize;

    let mut temp = Buffer2::new_default(width, height);
    par_rows_mut(temp.pixels_mut(), width, |y, out_row| {
        let in_row = plane.row(y);
        for (x, out) in out_row.iter_mut().enumerate() {
            let mut sum = 0.0f32;
            for (k, &kval) in kernel.iter().enumerate() {
                let sx = Border::Replicate.index(x as isize + k as isize - radius, width);
                sum += in_row[sx] * kval;
            }
            *out = sum;
        }
    });

    let mut output = Buffer2::new_default(width, height);
    par_rows_mut(output.pixels_mut(), width, |y, out_row| {
        for (k, &kval) in kernel.iter().enumerate() {
            let sy = Border::Replicate.index(y as isize + k as isize - radius, height);
            for (out, &v) in out_row.iter_mut().zip(temp.row(sy)) {
                *out += v * kval;
            }
        }
    });

    output
}
