//! Plane constraints applied between propagations.
//!
//! Phases are in radians. Quantized phases are always reported on `[0, 2π)`.

use crate::error::{check_same_shape, Error, Result};
use crate::{ComplexField, PhaseMap};
use ndarray::{ArrayView2, Zip};
use num_complex::Complex;
use std::convert::TryFrom;
use std::f64::consts::TAU;

/// Number of equally spaced phase levels over one 2π cycle. Zero keeps the phase continuous.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct PhaseLevels(usize);

impl PhaseLevels {
    pub const CONTINUOUS: PhaseLevels = PhaseLevels(0);

    pub fn new(count: usize) -> Self {
        PhaseLevels(count)
    }

    pub fn count(self) -> usize {
        self.0
    }

    pub fn is_continuous(self) -> bool {
        self.0 == 0
    }

    /// Spacing between adjacent levels, `None` when continuous.
    pub fn step(self) -> Option<f64> {
        if self.is_continuous() {
            None
        } else {
            Some(TAU / self.0 as f64)
        }
    }

    /// The admissible phase values `{0, 2π/n, .., (n-1)2π/n}`.
    pub fn values(self) -> Vec<f64> {
        match self.step() {
            Some(step) => (0..self.0).map(|k| k as f64 * step).collect(),
            None => Vec::new(),
        }
    }
}

impl From<usize> for PhaseLevels {
    fn from(count: usize) -> Self {
        PhaseLevels(count)
    }
}

impl TryFrom<i64> for PhaseLevels {
    type Error = Error;

    fn try_from(count: i64) -> Result<Self> {
        usize::try_from(count)
            .map(PhaseLevels)
            .map_err(|_| Error::InvalidLevelCount(count))
    }
}

/// Wraps a phase onto `[0, 2π)`.
pub fn wrap_phase(phase: f64) -> f64 {
    let wrapped = phase.rem_euclid(TAU);
    // rem_euclid rounds tiny negative inputs up to exactly 2π
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Phase of a complex sample, with zero amplitude mapped to phase 0.
pub fn phase_of(value: Complex<f64>) -> f64 {
    if value.norm_sqr() == 0.0 {
        0.0
    } else {
        value.arg()
    }
}

// Index of the nearest level counted from zero without wrapping, ties round up.
fn nearest_level_index(wrapped: f64, step: f64) -> f64 {
    (wrapped / step + 0.5).floor()
}

pub(crate) fn quantize_value(phase: f64, levels: PhaseLevels) -> f64 {
    match levels.step() {
        None => phase,
        Some(step) => {
            let index = nearest_level_index(wrap_phase(phase), step) as usize % levels.count();
            index as f64 * step
        }
    }
}

pub(crate) fn soft_quantize_value(phase: f64, levels: PhaseLevels, strength: f64) -> f64 {
    match levels.step() {
        None => phase,
        Some(_) if strength <= 0.0 => phase,
        Some(_) if strength >= 1.0 => quantize_value(phase, levels),
        Some(step) => {
            let wrapped = wrap_phase(phase);
            // move along the short way, the top level may sit at 2π rather than 0
            let target = nearest_level_index(wrapped, step) * step;
            wrap_phase(wrapped + strength * (target - wrapped))
        }
    }
}

/// Maps every phase sample to the nearest of `levels` values on `[0, 2π)`.
///
/// Ties go to the higher level. Continuous levels return the input unchanged.
pub fn hard_quantize(phase: ArrayView2<f64>, levels: PhaseLevels) -> PhaseMap {
    let mut out = phase.to_owned();
    if !levels.is_continuous() {
        out.par_map_inplace(|p| *p = quantize_value(*p, levels));
    }
    out
}

/// Moves each phase sample a fraction `strength` of the way toward its hard quantized level.
///
/// `strength == 0` returns the input unchanged, `strength == 1` is identical to [`hard_quantize`].
pub fn soft_quantize(phase: ArrayView2<f64>, levels: PhaseLevels, strength: f64) -> Result<PhaseMap> {
    if !(0.0..=1.0).contains(&strength) {
        return Err(Error::InvalidParameter(format!(
            "soft quantization strength must lie in [0, 1], got {}",
            strength
        )));
    }
    let mut out = phase.to_owned();
    if !levels.is_continuous() && strength > 0.0 {
        out.par_map_inplace(|p| *p = soft_quantize_value(*p, levels, strength));
    }
    Ok(out)
}

pub(crate) fn match_amplitude(value: Complex<f64>, target_amplitude: f64) -> Complex<f64> {
    let amplitude = value.norm();
    if target_amplitude > 0.0 && amplitude > 0.0 {
        value * (target_amplitude / amplitude)
    } else {
        Complex::new(0.0, 0.0)
    }
}

/// Keeps the phase of `field` and replaces its amplitude with `target_amplitude`.
///
/// Outside the target support the field is set to zero. Pixels where the field has no amplitude
/// carry no phase to keep, and are also set to zero.
pub fn amplitude_match(
    field: ArrayView2<Complex<f64>>,
    target_amplitude: ArrayView2<f64>,
) -> Result<ComplexField> {
    check_same_shape("amplitude match", field.shape(), target_amplitude.shape())?;
    let mut out = field.to_owned();
    Zip::from(&mut out)
        .and(&target_amplitude)
        .par_for_each(|e, &t| *e = match_amplitude(*e, t));
    Ok(out)
}

pub(crate) fn relax_value(projected: Complex<f64>, current: Complex<f64>, rfact: f64) -> Complex<f64> {
    projected * rfact + current * (1.0 - rfact)
}

/// `rfact * projected + (1 - rfact) * current`.
///
/// `rfact == 1` keeps the plain projection, larger values over-relax past it.
pub fn relax(
    projected: ArrayView2<Complex<f64>>,
    current: ArrayView2<Complex<f64>>,
    rfact: f64,
) -> Result<ComplexField> {
    check_same_shape("relaxation", projected.shape(), current.shape())?;
    let mut out = projected.to_owned();
    Zip::from(&mut out)
        .and(&current)
        .par_for_each(|e, &c| *e = relax_value(*e, c, rfact));
    Ok(out)
}

pub(crate) fn unit_amplitude_value(value: Complex<f64>) -> Complex<f64> {
    Complex::from_polar(1.0, phase_of(value))
}

/// Projects onto phase-only fields: amplitude 1 everywhere, phase kept.
pub fn unit_amplitude(field: ArrayView2<Complex<f64>>) -> ComplexField {
    let mut out = field.to_owned();
    out.par_map_inplace(|e| *e = unit_amplitude_value(*e));
    out
}
