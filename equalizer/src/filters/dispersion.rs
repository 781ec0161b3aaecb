//! Box average and local standard deviation with reflect-101 borders.

use common::parallel::{par_rows_mut, ROWS_PER_CHUNK};
use common::Buffer2;
use rayon::prelude::*;

use super::Border;

/// Added to the variance before the square root; keeps the result strictly positive.
pub const DISPERSION_FLOOR: f32 = 1e-12;

/// Normalized `kernel_size`×`kernel_size` box average.
///
/// Both passes keep a running f64 window sum, so the cost does not depend
/// on the kernel size.
pub fn box_mean(plane: &Buffer2<f32>, kernel_size: usize) -> Buffer2<f32> {
    assert!(kernel_size % 2 == 1, "Kernel size must be odd");

    let (width, height) = (plane.width(), plane.height());
    let radius = (kernel_size / 2) as isize;
    let inv_k = 1.0 / kernel_size as f64;
    let reflect_x = |i: isize| Border::Reflect101.index(i, width);
    let reflect_y = |i: isize| Border::Reflect101.index(i, height);

    let mut temp = Buffer2::new_default(width, height);
    par_rows_mut(temp.pixels_mut(), width, |y, out_row| {
        let in_row = plane.row(y);
        let mut sum: f64 = (-radius..=radius)
            .map(|t| in_row[reflect_x(t)] as f64)
            .sum();
        out_row[0] = (sum * inv_k) as f32;
        for x in 1..width as isize {
            sum += in_row[reflect_x(x + radius)] as f64;
            sum -= in_row[reflect_x(x - 1 - radius)] as f64;
            out_row[x as usize] = (sum * inv_k) as f32;
        }
    });

    let mut output = Buffer2::new_default(width, height);
    output
        .pixels_mut()
        .par_chunks_mut(width * ROWS_PER_CHUNK)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let y_start = (chunk_idx * ROWS_PER_CHUNK) as isize;
            let mut acc = vec![0.0f64; width];
            for t in -radius..=radius {
                add_row(&mut acc, temp.row(reflect_y(y_start + t)), 1.0);
            }

            for (local_y, out_row) in chunk.chunks_mut(width).enumerate() {
                let y = y_start + local_y as isize;
                if local_y > 0 {
                    add_row(&mut acc, temp.row(reflect_y(y + radius)), 1.0);
                    add_row(&mut acc, temp.row(reflect_y(y - 1 - radius)), -1.0);
                }
                for (out, &a) in out_row.iter_mut().zip(acc.iter()) {
                    *out = (a * inv_k) as f32;
                }
            }
        });

    output
}

#[inline]
fn add_row(acc: &mut [f64], row: &[f32], sign: f64) {
    for (a, &v) in acc.iter_mut().zip(row) {
        *a += sign * v as f64;
    }
}

/// Local standard deviation `sqrt(max(0, E[x²] - E[x]²) + floor)` over a box window.
pub fn local_dispersion_plane(plane: &Buffer2<f32>, kernel_size: usize) -> Buffer2<f32> {
    let mean = box_mean(plane, kernel_size);
    let mean_sq = box_mean(&plane.map(|&v| v * v), kernel_size);

    mean.zip_map(&mean_sq, |&mu, &mu2| {
        let variance = (mu2 as f64 - mu as f64 * mu as f64).max(0.0) as f32;
        (variance + DISPERSION_FLOOR).sqrt()
    })
}
