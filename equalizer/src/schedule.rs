//! Kernel schedule: the odd window sizes that define the band cascade.

use serde::Serialize;

use crate::error::{Error, Result};

pub const MIN_KERNEL: usize = 3;
const KERNEL_STEP: usize = 2;

/// Strictly increasing odd kernel sizes `3, 5, 7, ..., max_kernel`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct KernelSchedule(Vec<usize>);

impl KernelSchedule {
    /// Fails with [`Error::InvalidKernelSize`] when `max_kernel` is even or below 3.
    pub fn build(max_kernel: usize) -> Result<Self> {
        if max_kernel < MIN_KERNEL || max_kernel % 2 == 0 {
            return Err(Error::InvalidKernelSize {
                max_kernel: i64::try_from(max_kernel).unwrap_or(i64::MAX),
            });
        }
        Ok(Self(
            (MIN_KERNEL..=max_kernel).step_by(KERNEL_STEP).collect(),
        ))
    }

    /// Number of bands (and weight layers) this schedule produces.
    pub fn n_bands(&self) -> usize {
        self.0.len()
    }

    pub fn kernels(&self) -> &[usize] {
        &self.0
    }

    pub fn max_kernel(&self) -> usize {
        self.0.last().copied().unwrap_or(MIN_KERNEL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_nine() {
        let schedule = KernelSchedule::build(9).unwrap();
        assert_eq!(schedule.kernels(), &[3, 5, 7, 9]);
        assert_eq!(schedule.n_bands(), 4);
        assert_eq!(schedule.max_kernel(), 9);
    }

    #[test]
    fn test_build_minimum() {
        let schedule = KernelSchedule::build(3).unwrap();
        assert_eq!(schedule.kernels(), &[3]);
    }

    #[test]
    fn test_even_and_small_kernels_rejected() {
        for max_kernel in [0, 1, 2, 4, 64] {
            let err = KernelSchedule::build(max_kernel).unwrap_err();
            assert!(
                matches!(err, Error::InvalidKernelSize { max_kernel: k } if k == max_kernel as i64),
                "max_kernel={max_kernel} should be rejected"
            );
        }
    }

    #[test]
    fn test_length_and_oddness_invariants() {
        for max_kernel in (3..=127).step_by(2) {
            let schedule = KernelSchedule::build(max_kernel).unwrap();
            let kernels = schedule.kernels();
            assert_eq!(kernels.len(), (max_kernel - 3) / 2 + 1);
            assert!(kernels.iter().all(|k| k % 2 == 1));
            assert!(kernels.windows(2).all(|w| w[0] < w[1]));
            assert_eq!(kernels[0], 3);
        }
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let schedule = KernelSchedule::build(7).unwrap();
        assert_eq!(serde_json::to_string(&schedule).unwrap(), "[3,5,7]");
    }
}
