use num_complex::Complex32;
use serde::{Deserialize, Serialize};

use crate::prelude::FilterResult;
use crate::processing::workspace::alloc_complex;

/// Physical parameters of an inspiral template.
///
/// Copied by value into every event found with the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateParams {
    /// Position of the template in its bank.
    pub number: u32,
    /// Component masses in solar masses.
    pub mass1: f32,
    pub mass2: f32,
    pub total_mass: f32,
    /// Symmetric mass ratio `m1 m2 / M^2`.
    pub eta: f32,
    pub mu: f32,
    pub chirp_mass: f32,
}

impl TemplateParams {
    pub fn from_masses(mass1: f32, mass2: f32) -> Self {
        let total_mass = mass1 + mass2;
        let mu = mass1 * mass2 / total_mass;
        let eta = mu / total_mass;
        Self {
            number: 0,
            mass1,
            mass2,
            total_mass,
            eta,
            mu,
            chirp_mass: total_mass * eta.powf(0.6),
        }
    }

    pub fn with_number(mut self, number: u32) -> Self {
        self.number = number;
        self
    }
}

/// Frequency-domain template samples and their normalisation.
#[derive(Debug, Clone, PartialEq)]
pub struct ChirpTemplate {
    pub data: Vec<Complex32>,
    pub tmplt_norm: f32,
}

impl ChirpTemplate {
    pub fn new(data: Vec<Complex32>, tmplt_norm: f32) -> Self {
        Self { data, tmplt_norm }
    }

    /// All-zero template of `num_points` samples, ready to be filled in.
    pub fn zeroed(num_points: usize) -> FilterResult<Self> {
        Ok(Self {
            data: alloc_complex(num_points, "template data")?,
            tmplt_norm: 0.0,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// `|T[k]|^2` for every frequency bin, the input to chi-squared bin
    /// placement.
    pub fn power(&self) -> Vec<f32> {
        self.data.iter().map(|c| c.norm_sqr()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_masses_have_quarter_eta() {
        let params = TemplateParams::from_masses(1.4, 1.4);
        assert!((params.eta - 0.25).abs() < 1e-7);
        assert!((params.total_mass - 2.8).abs() < 1e-6);
        assert!((params.mu - 0.7).abs() < 1e-6);
        assert!((params.chirp_mass - 1.2188).abs() < 1e-3);
    }

    #[test]
    fn zeroed_template_has_requested_length() {
        let tmplt = ChirpTemplate::zeroed(64).unwrap();
        assert_eq!(tmplt.len(), 64);
        assert!(tmplt.data.iter().all(|c| c.norm_sqr() == 0.0));
    }

    #[test]
    fn power_is_squared_magnitude() {
        let tmplt = ChirpTemplate::new(vec![Complex32::new(3.0, 4.0), Complex32::new(0.0, 1.0)], 1.0);
        assert_eq!(tmplt.power(), vec![25.0, 1.0]);
    }
}
