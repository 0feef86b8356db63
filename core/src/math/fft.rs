use std::sync::Arc;

use num_complex::Complex32;
use rustfft::{num_traits::Zero, Fft, FftPlanner};

use crate::prelude::{FilterError, FilterResult};

/// Narrow plan/execute interface to a complex-to-complex inverse FFT backend.
///
/// The transform is unnormalised: `out[j] = sum_k in[k] * exp(+2 pi i j k / n)`.
pub trait InverseTransform: Send {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Transforms `input` into `output`, leaving `input` untouched.
    fn execute(&mut self, input: &[Complex32], output: &mut [Complex32]) -> FilterResult<()>;
}

/// `rustfft` backed inverse plan with its own scratch space.
pub struct InverseFftPlan {
    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex32>,
}

impl InverseFftPlan {
    pub fn new(size: usize) -> FilterResult<Self> {
        if size == 0 {
            return Err(FilterError::ZeroPoints);
        }
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_inverse(size);
        let scratch_len = fft.get_inplace_scratch_len();
        let mut scratch = Vec::new();
        scratch
            .try_reserve_exact(scratch_len)
            .map_err(|_| FilterError::Allocation("inverse FFT scratch"))?;
        scratch.resize(scratch_len, Complex32::zero());
        Ok(Self { fft, scratch })
    }
}

impl InverseTransform for InverseFftPlan {
    fn len(&self) -> usize {
        self.fft.len()
    }

    fn execute(&mut self, input: &[Complex32], output: &mut [Complex32]) -> FilterResult<()> {
        let size = self.fft.len();
        if input.len() != size || output.len() != size {
            return Err(FilterError::PlanSizeMismatch {
                plan: size,
                buffer: input.len().max(output.len()),
            });
        }
        output.copy_from_slice(input);
        self.fft.process_with_scratch(output, &mut self.scratch);
        Ok(())
    }
}
