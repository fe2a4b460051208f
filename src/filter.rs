use std::f64::consts::PI;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterError {
    #[error("sampling interval must be positive")]
    BadDelta,

    #[error("cut-off frequency must be positive")]
    BadCutOff,
}

/// Single-pole low-pass filter over a sampled signal.
///
/// `delta` is the sampling interval in seconds, `cut_off` the -3dB frequency
/// in hertz. The first sample seeds the filter; each later sample moves the
/// output by `alpha * (x - y)`.
#[derive(Debug, Clone)]
pub struct LowPassFilter {
    alpha: f64,
    y: Option<f64>,
}

impl LowPassFilter {
    pub fn construct(delta: f64, cut_off: f64) -> Result<Self, FilterError> {
        if delta <= 0.0 {
            return Err(FilterError::BadDelta);
        }

        if cut_off <= 0.0 {
            return Err(FilterError::BadCutOff);
        }

        let rc = 1.0 / (2.0 * PI * cut_off);
        let alpha = delta / (rc + delta);

        Ok(Self { alpha, y: None })
    }

    pub fn compute(&mut self, x: f64) -> f64 {
        let y = match self.y {
            None => x,
            Some(y) => y + self.alpha * (x - y),
        };

        self.y = Some(y);
        y
    }
}

// --------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            LowPassFilter::construct(0.0, 0.01),
            Err(FilterError::BadDelta)
        ));
        assert!(matches!(
            LowPassFilter::construct(10.0, -1.0),
            Err(FilterError::BadCutOff)
        ));
    }

    #[test]
    fn first_sample_seeds_the_output() {
        let mut lpf = LowPassFilter::construct(10.0, 0.01).unwrap();
        assert_eq!(lpf.compute(12.3), 12.3);
    }

    #[test]
    fn output_converges_on_a_constant_input() {
        let mut lpf = LowPassFilter::construct(10.0, 0.01).unwrap();
        lpf.compute(0.0);

        let mut y = 0.0;
        for _ in 0..200 {
            y = lpf.compute(50.0);
        }

        assert!((y - 50.0).abs() < 0.5, "did not converge: {y}");
    }

    #[test]
    fn step_response_is_monotonic_and_bounded() {
        let mut lpf = LowPassFilter::construct(1.0, 0.05).unwrap();
        lpf.compute(0.0);

        let mut previous = 0.0;
        for _ in 0..20 {
            let y = lpf.compute(10.0);
            assert!(y > previous && y < 10.0);
            previous = y;
        }
    }
}
