//! Deterministic phase screens superposed on the retrieved hologram.

use crate::constraints::{hard_quantize, wrap_phase, PhaseLevels};
use crate::error::{Error, Result};
use crate::{centred_par_iter, PhaseMap};
use ndarray::{Array1, Array2};
use std::f64::consts::PI;

/// Physical sample positions along each axis, zero at index `len/2`.
///
/// Returns the `(y, x)` axes.
pub fn cartesian_coordinates(size: [usize; 2], sampling_step: f64) -> (Array1<f64>, Array1<f64>) {
    let axis = |len: usize| {
        Array1::from_shape_fn(len, |i| (i as f64 - (len / 2) as f64) * sampling_step)
    };
    (axis(size[0]), axis(size[1]))
}

/// Phase of a perfect converging lens, wrapped onto `[0, 2π)` and optionally discretized.
///
/// * `focal_length` - focal length, in the same unit as `wavelength` and `sampling_step`
/// * `wavelength` - wavelength of the illumination
/// * `size` - shape of the screen, normally the hologram grid
/// * `sampling_step` - pixel pitch of the screen
/// * `levels` - number of phase levels, 0 keeps the phase continuous
pub fn lens(
    focal_length: f64,
    wavelength: f64,
    size: [usize; 2],
    sampling_step: f64,
    levels: PhaseLevels,
) -> Result<PhaseMap> {
    for &(name, value) in &[
        ("focal length", focal_length),
        ("wavelength", wavelength),
        ("sampling step", sampling_step),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "{} must be finite and positive, got {}",
                name, value
            )));
        }
    }

    let mut phase: PhaseMap = Array2::zeros(size);
    centred_par_iter(&mut phase, (sampling_step, sampling_step), |(y, x), e| {
        let r2 = y * y + x * x;
        //let theta = -2.0 * PI / wavelength * ((r2 + f * f).sqrt() - f); // numerically unstable - cancellation
        let theta = -2.0 * PI / wavelength * (r2 / ((r2 + focal_length * focal_length).sqrt() + focal_length)); // stable
        *e = wrap_phase(theta);
    });

    Ok(hard_quantize(phase.view(), levels))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn coordinates_are_centred() {
        let (y, x) = cartesian_coordinates([4, 5], 0.5);
        assert_eq!(y.to_vec(), vec![-1.0, -0.5, 0.0, 0.5]);
        assert_eq!(x.to_vec(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn lens_is_flat_on_axis_and_symmetric() {
        let phase = lens(0.005, 850e-9, [64, 64], 750e-9, PhaseLevels::CONTINUOUS).unwrap();
        assert_eq!(phase[[32, 32]], 0.0);
        assert_abs_diff_eq!(phase[[32, 40]], phase[[40, 32]], epsilon = 1e-12);
        assert_abs_diff_eq!(phase[[32, 24]], phase[[32, 40]], epsilon = 1e-12);
        assert!(phase.iter().all(|&p| p >= 0.0 && p < 2.0 * PI));
    }

    #[test]
    fn lens_matches_paraxial_near_axis() {
        let f = 0.01;
        let wavelength = 500e-9;
        let step = 1e-6;
        let phase = lens(f, wavelength, [16, 16], step, PhaseLevels::CONTINUOUS).unwrap();
        let r = 3.0 * step;
        let paraxial = wrap_phase(-PI * r * r / (wavelength * f));
        assert_abs_diff_eq!(phase[[8, 11]], paraxial, epsilon = 1e-9);
    }

    #[test]
    fn lens_discretized() {
        let levels = PhaseLevels::new(4);
        let phase = lens(0.002, 850e-9, [32, 32], 1e-6, levels).unwrap();
        let allowed = levels.values();
        assert!(phase.iter().all(|p| allowed.contains(p)));
    }

    #[test]
    fn lens_rejects_bad_parameters() {
        assert!(lens(0.0, 850e-9, [8, 8], 1e-6, PhaseLevels::CONTINUOUS).is_err());
        assert!(lens(0.01, f64::NAN, [8, 8], 1e-6, PhaseLevels::CONTINUOUS).is_err());
        assert!(lens(0.01, 850e-9, [8, 8], -1e-6, PhaseLevels::CONTINUOUS).is_err());
    }
}
