//! Rayon helpers shared by the image filters.

use rayon::prelude::*;

/// Rows handed to one rayon task by [`par_rows_mut`].
pub const ROWS_PER_CHUNK: usize = 8;

/// Runs `f` over `items` on the rayon pool, at most `limit` items in flight,
/// and hands each result to `sink` in input order.
///
/// Items are processed in waves of `limit`. A wave's results are passed to
/// `sink` before the next wave starts, so only one wave of results exists at
/// a time unless the sink keeps them.
///
/// # Panics
///
/// Panics if `limit` is 0.
pub fn par_map_in_waves<T, R, F, S>(items: &[T], limit: usize, f: F, mut sink: S)
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync,
    S: FnMut(R),
{
    assert!(limit > 0, "parallel limit must be at least 1");

    for wave in items.chunks(limit) {
        let results: Vec<R> = wave.par_iter().map(&f).collect();
        results.into_iter().for_each(&mut sink);
    }
}

/// Runs `f(y, row)` for every row of a row-major `width`-wide buffer.
///
/// Rows are grouped into chunks of [`ROWS_PER_CHUNK`] per task so that
/// neighbouring threads don't write into the same cache lines.
pub fn par_rows_mut<T, F>(output: &mut [T], width: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync,
{
    if width == 0 || output.is_empty() {
        return;
    }
    assert_eq!(output.len() % width, 0, "buffer is not a whole number of rows");

    output
        .par_chunks_mut(width * ROWS_PER_CHUNK)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let first_row = chunk_idx * ROWS_PER_CHUNK;
            chunk
                .chunks_mut(width)
                .enumerate()
                .for_each(|(offset, row)| f(first_row + offset, row));
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn collect_in_waves(kernels: &[usize], limit: usize) -> Vec<usize> {
        let mut out = Vec::new();
        par_map_in_waves(kernels, limit, |&k| k * k, |taps| out.push(taps));
        out
    }

    #[test]
    fn test_kernel_results_keep_schedule_order() {
        let kernels: Vec<usize> = (3..=63).step_by(2).collect();
        let taps = collect_in_waves(&kernels, 5);
        assert_eq!(taps.len(), kernels.len());
        assert!(taps.iter().zip(&kernels).all(|(&t, &k)| t == k * k));
    }

    #[test]
    fn test_limit_larger_than_input() {
        assert_eq!(collect_in_waves(&[3, 5], 64), vec![9, 25]);
        assert!(collect_in_waves(&[], 2).is_empty());
    }

    #[test]
    #[should_panic(expected = "parallel limit must be at least 1")]
    fn test_zero_limit_panics() {
        par_map_in_waves(&[3usize, 5], 0, |&k| k, |_| {});
    }

    #[test]
    fn test_waves_never_exceed_limit() {
        let kernels: Vec<usize> = (3..=33).step_by(2).collect();
        let running = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let mut out = Vec::new();

        par_map_in_waves(
            &kernels,
            2,
            |&k| {
                let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(1));
                running.fetch_sub(1, Ordering::SeqCst);
                k
            },
            |k| out.push(k),
        );

        assert_eq!(out, kernels);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[test]
    fn test_sink_sees_a_wave_before_the_next_starts() {
        let kernels: Vec<usize> = (0..9).collect();
        let started = AtomicUsize::new(0);
        let mut started_when_sunk = Vec::new();

        par_map_in_waves(
            &kernels,
            3,
            |&k| {
                started.fetch_add(1, Ordering::SeqCst);
                k
            },
            |_| started_when_sunk.push(started.load(Ordering::SeqCst)),
        );

        assert_eq!(started_when_sunk, vec![3, 3, 3, 6, 6, 6, 9, 9, 9]);
    }

    #[test]
    fn test_rows_receive_their_own_index() {
        // 19 rows: the last chunk is partial
        let (width, height) = (3, 19);
        let mut plane = vec![usize::MAX; width * height];

        par_rows_mut(&mut plane, width, |y, row| row.fill(y));

        for (y, row) in plane.chunks(width).enumerate() {
            assert!(row.iter().all(|&v| v == y), "row {y}");
        }
    }

    #[test]
    fn test_rows_on_empty_plane() {
        let mut plane: Vec<f32> = Vec::new();
        par_rows_mut(&mut plane, 4, |_, _| panic!("no rows to visit"));
        par_rows_mut(&mut [1.0f32; 4], 0, |_, _| panic!("zero width"));
    }
}
