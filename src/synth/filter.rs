//! Swept two-pole low-pass filter
//!
//! Butterworth biquad whose cutoff may change on every sample.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Lowest cutoff the filter accepts, in Hz
const MIN_CUTOFF_HZ: f64 = 1.0;
/// Highest cutoff as a fraction of the sample rate (below Nyquist)
const MAX_CUTOFF_RATIO: f64 = 0.45;

/// Biquad filter coefficients, normalized by a0
#[derive(Debug, Clone, Copy)]
struct Coefficients {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl Coefficients {
    /// Low-pass design from the half-power bandwidth `alpha`
    fn low_pass(cutoff: f64, sample_rate: f64, q: f64) -> Self {
        let omega = 2.0 * PI * cutoff / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = (1.0 - cos_omega) / 2.0;
        let b1 = 1.0 - cos_omega;
        let b2 = (1.0 - cos_omega) / 2.0;
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha;

        Self {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }
}

/// Two-pole low-pass with persistent feedback registers
#[derive(Debug, Clone)]
pub struct LowPass {
    sample_rate: f64,
    cutoff: f64,
    coeffs: Coefficients,

    // Direct Form II transposed state
    z1: f64,
    z2: f64,
}

impl LowPass {
    /// Create a filter with its cutoff at the top of the range
    pub fn new(sample_rate: f64) -> Self {
        let cutoff = sample_rate * MAX_CUTOFF_RATIO;
        Self {
            sample_rate,
            cutoff,
            coeffs: Coefficients::low_pass(cutoff, sample_rate, FRAC_1_SQRT_2),
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Current cutoff in Hz
    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Set cutoff frequency in Hz, clamped below Nyquist
    pub fn set_cutoff(&mut self, hz: f64) {
        let hz = if hz.is_nan() { MIN_CUTOFF_HZ } else { hz };
        let hz = hz.clamp(MIN_CUTOFF_HZ, self.sample_rate * MAX_CUTOFF_RATIO);

        // Coefficients only depend on the cutoff
        if hz != self.cutoff {
            self.cutoff = hz;
            self.coeffs = Coefficients::low_pass(hz, self.sample_rate, FRAC_1_SQRT_2);
        }
    }

    /// Clear the feedback registers
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }

    /// Feedback register contents
    pub fn memory(&self) -> (f64, f64) {
        (self.z1, self.z2)
    }

    /// Process a single sample at the current cutoff
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.coeffs.b0 * input + self.z1;

        self.z1 = self.coeffs.b1 * input - self.coeffs.a1 * output + self.z2;
        self.z2 = self.coeffs.b2 * input - self.coeffs.a2 * output;

        output
    }

    /// Retune and process in one step
    pub fn process_at(&mut self, input: f64, cutoff: f64) -> f64 {
        self.set_cutoff(cutoff);
        self.process(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_creation() {
        let filter = LowPass::new(48000.0);
        assert_eq!(filter.cutoff(), 48000.0 * 0.45);
        assert_eq!(filter.memory(), (0.0, 0.0));
    }

    #[test]
    fn test_filter_cutoff_clamping() {
        let mut filter = LowPass::new(44100.0);

        filter.set_cutoff(0.01);
        assert_eq!(filter.cutoff(), 1.0);

        filter.set_cutoff(25000.0);
        assert!(filter.cutoff() < 44100.0 * 0.5);

        filter.set_cutoff(f64::NAN);
        assert_eq!(filter.cutoff(), 1.0);

        filter.set_cutoff(-500.0);
        assert_eq!(filter.cutoff(), 1.0);
    }

    fn triangle(i: usize, period: usize) -> f64 {
        let t = (i % period) as f64 / period as f64;
        if t < 0.5 { 4.0 * t - 1.0 } else { 3.0 - 4.0 * t }
    }

    #[test]
    fn test_low_cutoff_flattens_fast_triangle() {
        // 1 kHz triangle through a 20 Hz corner
        let mut filter = LowPass::new(48000.0);
        let mut peak = 0.0f64;
        for i in 0..9600 {
            let output = filter.process_at(triangle(i, 48), 20.0);
            if i > 4800 {
                peak = peak.max(output.abs());
            }
        }
        assert!(peak < 0.01, "residual ripple {}", peak);
    }

    #[test]
    fn test_high_cutoff_tracks_slow_ramp() {
        // 10 Hz triangle well under a 20 kHz corner
        let mut filter = LowPass::new(48000.0);
        let mut worst = 0.0f64;
        for i in 0..9600 {
            let input = triangle(i, 4800);
            let output = filter.process_at(input, 20000.0);
            if i > 100 {
                worst = worst.max((output - input).abs());
            }
        }
        assert!(worst < 0.01, "tracking error {}", worst);
    }

    #[test]
    fn test_unity_gain_at_rest_level() {
        // An idle envelope holds -1; every cutoff must settle there
        for cutoff in [20.0, 632.0, 20000.0] {
            let mut filter = LowPass::new(48000.0);
            let mut output = 0.0;
            for _ in 0..48000 {
                output = filter.process_at(-1.0, cutoff);
            }
            assert!((output + 1.0).abs() < 1e-6, "cutoff {} settled at {}", cutoff, output);
        }
    }

    #[test]
    fn test_swept_cutoff_stays_stable() {
        let mut filter = LowPass::new(48000.0);
        for i in 0..48000 {
            // Sweep from 20 Hz to 20 kHz and back every 4800 samples
            let sweep = ((i % 4800) as f64 / 4800.0 * 2.0 * PI).sin() * 0.5 + 0.5;
            let cutoff = 20.0 * 1000f64.powf(sweep);
            let input = if (i / 50) % 2 == 0 { 1.0 } else { -1.0 };
            let output = filter.process_at(input, cutoff);
            assert!(output.is_finite());
            assert!(output.abs() < 2.0);
        }
    }

    #[test]
    fn test_dc_settles_to_unity() {
        let mut filter = LowPass::new(48000.0);
        filter.set_cutoff(1000.0);
        let mut output = 0.0;
        for _ in 0..4800 {
            output = filter.process(0.5);
        }
        assert!((output - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_filter_reset() {
        let mut filter = LowPass::new(44100.0);
        filter.set_cutoff(1000.0);

        for _ in 0..100 {
            filter.process(1.0);
        }

        filter.reset();
        assert_eq!(filter.memory(), (0.0, 0.0));

        let output = filter.process(0.0);
        assert!(output.abs() < 0.001, "Expected near-zero after reset, got {}", output);
    }
}
