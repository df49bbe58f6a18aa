//! Design of quantized phase-only diffractive optical elements.
//!
//! The core is the iterative Fourier transform algorithm in [`ifta()`], which alternates between the
//! hologram plane and the image plane through the centred transform in [`Propagator`], enforcing a
//! target amplitude in one plane and a (possibly quantized) phase-only constraint in the other.
//!
//! The remaining modules are the collaborators needed to use it: a cross shaped target
//! generator, a lens phase screen, and closed form sizing of the optical layout.

use crate::error::check_same_shape;
use ndarray::{Array2, ArrayView2, Zip};
use num_complex::Complex;

pub mod constraints;
pub mod error;
mod fft2;
pub mod geometry;
pub mod ifta;
pub mod pattern;
pub mod screens;

pub use crate::constraints::{
    amplitude_match, hard_quantize, relax, soft_quantize, unit_amplitude, PhaseLevels,
};
pub use crate::error::{Error, Result};
pub use crate::fft2::{to_holo_plane, to_image_plane, Propagator};
pub use crate::ifta::{ifta, ifta_soft_quantization, IftaOutput, IftaParams, InitialPhase};

/// Complex samples of one optical plane.
pub type ComplexField = Array2<Complex<f64>>;

/// Phase in radians, one value per hologram pixel.
pub type PhaseMap = Array2<f64>;

/// Fraction of the image-plane energy that falls inside the region of interest.
///
/// The region of interest is every pixel where `target` is positive.
///
/// * `recovery_intensity` - The image-plane irradiance, `|field|^2`
/// * `target` - The target pattern, defined on the same grid
pub fn efficiency(recovery_intensity: ArrayView2<f64>, target: ArrayView2<f64>) -> Result<f64> {
    check_same_shape("efficiency", target.shape(), recovery_intensity.shape())?;

    if recovery_intensity.iter().any(|e| !e.is_finite()) {
        return Err(Error::NonFinite("recovery intensity"));
    }
    if recovery_intensity.iter().any(|&e| e < 0.0) {
        return Err(Error::InvalidParameter(
            "recovery intensity must not be negative".to_string(),
        ));
    }
    if !target.iter().any(|&t| t > 0.0) {
        return Err(Error::DegenerateEnergy("target pattern"));
    }

    let (inside, outside) = recovery_intensity
        .iter()
        .zip(target.iter())
        .fold((0.0, 0.0), |(inside, outside), (&i, &t)| {
            if t > 0.0 {
                (inside + i, outside)
            } else {
                (inside, outside + i)
            }
        });

    let total = inside + outside;
    if total <= 0.0 {
        return Err(Error::DegenerateEnergy("recovery intensity"));
    }
    Ok(inside / total)
}

/// Superposes two phase functions on the same substrate by elementwise addition.
///
/// The sum is not wrapped, use [`discretize`] to bring it back onto fabricable levels.
pub fn combine(phase_a: ArrayView2<f64>, phase_b: ArrayView2<f64>) -> Result<PhaseMap> {
    check_same_shape("phase combination", phase_a.shape(), phase_b.shape())?;
    let mut out = phase_a.to_owned();
    Zip::from(&mut out)
        .and(&phase_b)
        .par_for_each(|a, &b| *a += b);
    Ok(out)
}

/// Hard quantizes an arbitrary phase map to `levels` for fabrication output.
pub fn discretize(phase: ArrayView2<f64>, levels: PhaseLevels) -> PhaseMap {
    hard_quantize(phase, levels)
}

/// Visits every element with its physical coordinates `(y, x)`, measured from index `(H/2, W/2)`.
pub(crate) fn centred_par_iter<T: Send, F: Fn((f64, f64), &mut T) + Sync + Send>(
    array: &mut Array2<T>,
    (dh, dw): (f64, f64),
    f: F,
) {
    let h = array.shape()[0];
    let w = array.shape()[1];
    Zip::indexed(array).par_for_each(|(y, x), e| {
        let y = (y as f64 - (h / 2) as f64) * dh;
        let x = (x as f64 - (w / 2) as f64) * dw;
        f((y, x), e)
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::arr2;
    use std::f64::consts::PI;

    #[test]
    fn efficiency_all_inside() {
        let target = arr2(&[[1.0, 0.0], [0.5, 0.0]]);
        let intensity = arr2(&[[2.0, 0.0], [3.0, 0.0]]);
        assert_eq!(efficiency(intensity.view(), target.view()), Ok(1.0));
    }

    #[test]
    fn efficiency_fraction() {
        let target = arr2(&[[1.0, 0.0], [0.0, 0.0]]);
        let intensity = arr2(&[[1.0, 1.0], [1.0, 1.0]]);
        assert_abs_diff_eq!(efficiency(intensity.view(), target.view()).unwrap(), 0.25);
    }

    #[test]
    fn efficiency_tends_to_zero() {
        let target = arr2(&[[1.0, 0.0]]);
        let mut last = 1.0;
        for &inside in &[1.0, 1e-3, 1e-6, 1e-9] {
            let intensity = arr2(&[[inside, 1.0]]);
            let eff = efficiency(intensity.view(), target.view()).unwrap();
            assert!(eff >= 0.0 && eff <= 1.0);
            assert!(eff < last);
            last = eff;
        }
        assert!(last < 1e-8);
    }

    #[test]
    fn efficiency_errors() {
        let target = arr2(&[[1.0, 0.0]]);
        let dark = arr2(&[[0.0, 0.0]]);
        assert_eq!(
            efficiency(dark.view(), target.view()),
            Err(Error::DegenerateEnergy("recovery intensity"))
        );

        let empty = arr2(&[[0.0, 0.0]]);
        let lit = arr2(&[[1.0, 1.0]]);
        assert_eq!(
            efficiency(lit.view(), empty.view()),
            Err(Error::DegenerateEnergy("target pattern"))
        );

        let nan = arr2(&[[f64::NAN, 1.0]]);
        assert_eq!(
            efficiency(nan.view(), target.view()),
            Err(Error::NonFinite("recovery intensity"))
        );

        let wide = arr2(&[[1.0, 1.0, 1.0]]);
        assert!(matches!(
            efficiency(wide.view(), target.view()),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn combine_adds() {
        let a = arr2(&[[0.0, PI], [1.0, 2.0]]);
        let b = arr2(&[[PI, PI], [-1.0, 0.5]]);
        let sum = combine(a.view(), b.view()).unwrap();
        assert_eq!(sum, arr2(&[[PI, 2.0 * PI], [0.0, 2.5]]));
    }

    #[test]
    fn combine_rejects_unequal_shapes() {
        let a = Array2::<f64>::zeros([4, 4]);
        let b = Array2::<f64>::zeros([4, 2]);
        assert!(matches!(
            combine(a.view(), b.view()),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn discretize_combined_phase() {
        let a = arr2(&[[0.1, PI - 0.1]]);
        let b = arr2(&[[2.0 * PI, PI]]);
        let sum = combine(a.view(), b.view()).unwrap();
        let out = discretize(sum.view(), PhaseLevels::new(2));
        assert_eq!(out, arr2(&[[0.0, 0.0]]));
    }

    #[test]
    fn centred_coordinates() {
        let mut a = Array2::<(f64, f64)>::from_elem([4, 3], (0.0, 0.0));
        centred_par_iter(&mut a, (0.5, 2.0), |yx, e| *e = yx);
        assert_eq!(a[[2, 1]], (0.0, 0.0));
        assert_eq!(a[[0, 0]], (-1.0, -2.0));
        assert_eq!(a[[3, 2]], (0.5, 2.0));
    }
}
