use num_complex::Complex32;
use rustfft::num_traits::Zero;

use crate::prelude::{FilterError, FilterResult};

/// Allocates a zeroed buffer, reporting allocation failure instead of
/// aborting the process.
fn alloc_zeroed<T: Clone>(length: usize, zero: T, what: &'static str) -> FilterResult<Vec<T>> {
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(length)
        .map_err(|_| FilterError::Allocation(what))?;
    buffer.resize(length, zero);
    Ok(buffer)
}

pub fn alloc_complex(length: usize, what: &'static str) -> FilterResult<Vec<Complex32>> {
    alloc_zeroed(length, Complex32::zero(), what)
}

pub fn alloc_real(length: usize, what: &'static str) -> FilterResult<Vec<f32>> {
    alloc_zeroed(length, 0.0, what)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_zeroed() {
        let complex = alloc_complex(8, "test").unwrap();
        assert_eq!(complex.len(), 8);
        assert!(complex.iter().all(|c| *c == Complex32::zero()));

        let real = alloc_real(4, "test").unwrap();
        assert_eq!(real, vec![0.0; 4]);
    }

    #[test]
    fn impossible_request_reports_allocation_failure() {
        assert_eq!(
            alloc_real(usize::MAX, "huge"),
            Err(FilterError::Allocation("huge"))
        );
    }
}
