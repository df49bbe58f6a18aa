//! Iterative Fourier transform algorithm.
//!
//! Each iteration propagates the phase-only hologram to the image plane, pulls the amplitude
//! toward the target with a relaxed projection, propagates back, and projects onto phase-only
//! (and optionally quantized) hologram fields.
//!
//! Two policies are fixed here:
//! * outside the target support the image-plane amplitude is driven to zero, and
//! * the starting hologram has unit amplitude and a phase chosen by [`InitialPhase`].

use crate::constraints::{
    match_amplitude, phase_of, quantize_value, relax_value, soft_quantize_value, wrap_phase,
    PhaseLevels,
};
use crate::error::{Error, Result};
use crate::fft2::{pad_2d_to, Propagator};
use crate::{efficiency, ComplexField, PhaseMap};
use ndarray::{Array2, ArrayView2, Zip};
use num_complex::Complex;
use num_integer::Integer;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::f64::consts::TAU;
use tracing::{debug, enabled, trace, Level};

/// Phase of the hologram before the first iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitialPhase {
    /// Zero everywhere.
    ///
    /// A flat hologram focuses to the single on-axis pixel, and if the target covers that pixel
    /// the amplitude match keeps only it, so the loop stays at that spot. Only useful for
    /// targets that exclude the centre.
    Flat,
    /// Uniform on `[0, 2π)`, drawn in row-major order from a ChaCha8 stream seeded with `seed`.
    Random { seed: u64 },
}

impl Default for InitialPhase {
    fn default() -> Self {
        InitialPhase::Random { seed: 0 }
    }
}

impl InitialPhase {
    pub fn generate(self, shape: [usize; 2]) -> PhaseMap {
        match self {
            InitialPhase::Flat => Array2::zeros(shape),
            InitialPhase::Random { seed } => {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                Array2::from_shape_fn(shape, |_| rng.gen_range(0.0..TAU))
            }
        }
    }
}

/// Parameters of one IFTA run.
#[derive(Clone, Debug, PartialEq)]
pub struct IftaParams {
    /// Hologram grid `[rows, columns]`, both even.
    pub holo_size: [usize; 2],
    pub levels: PhaseLevels,
    pub compute_efficiency: bool,
    /// Relaxation factor of the image-plane projection, 1.0 is a plain projection.
    pub rfact: f64,
    pub n_iter: usize,
    pub initial_phase: InitialPhase,
}

impl IftaParams {
    /// Continuous phase, efficiency on, plain projection, 100 iterations, random start with seed 0.
    pub fn new(holo_size: [usize; 2]) -> Self {
        IftaParams {
            holo_size,
            levels: PhaseLevels::CONTINUOUS,
            compute_efficiency: true,
            rfact: 1.0,
            n_iter: 100,
            initial_phase: InitialPhase::default(),
        }
    }

    pub fn with_levels(mut self, levels: PhaseLevels) -> Self {
        self.levels = levels;
        self
    }

    pub fn with_efficiency(mut self, compute_efficiency: bool) -> Self {
        self.compute_efficiency = compute_efficiency;
        self
    }

    pub fn with_rfact(mut self, rfact: f64) -> Self {
        self.rfact = rfact;
        self
    }

    pub fn with_iterations(mut self, n_iter: usize) -> Self {
        self.n_iter = n_iter;
        self
    }

    pub fn with_initial_phase(mut self, initial_phase: InitialPhase) -> Self {
        self.initial_phase = initial_phase;
        self
    }

    pub fn validate(&self) -> Result<()> {
        let [h, w] = self.holo_size;
        if h == 0 || w == 0 || h.is_odd() || w.is_odd() {
            return Err(Error::InvalidGridSize(self.holo_size));
        }
        if !self.rfact.is_finite() || self.rfact <= 0.0 {
            return Err(Error::InvalidRelaxation(self.rfact));
        }
        Ok(())
    }
}

/// Result of an IFTA run.
#[derive(Clone, Debug)]
pub struct IftaOutput {
    /// Hologram phase on `[0, 2π)`, quantized when levels were requested.
    pub phase: PhaseMap,
    /// Image-plane field propagated in the last iteration, before the amplitude constraint.
    ///
    /// This is the image of the hologram the last iteration started from, not of the returned
    /// `phase`, which comes out of that iteration's final projection. With zero iterations it is
    /// the unpropagated starting hologram.
    pub recovery: ComplexField,
    /// Energy fraction of `recovery` inside the target support, if requested.
    ///
    /// Like `recovery` it describes the phase one update before `phase`. Propagate `phase` and
    /// call [`efficiency`](crate::efficiency) to score the returned hologram itself.
    pub efficiency: Option<f64>,
}

impl IftaOutput {
    pub fn recovery_intensity(&self) -> Array2<f64> {
        self.recovery.map(|e| e.norm_sqr())
    }
}

/// IFTA with the phase hard quantized to `params.levels` on every iteration.
pub fn ifta(target: ArrayView2<f64>, params: &IftaParams) -> Result<IftaOutput> {
    run(target, params, Quantization::Hard)
}

/// IFTA with soft quantization annealed from strength 0 on the first iteration to 1.
///
/// The continuous phase is free to move early on, and is locked onto the fabricable levels for
/// the tail of the run so the quantized solution can still be refined. The returned phase is fully
/// quantized. See [`anneal_strength`].
pub fn ifta_soft_quantization(target: ArrayView2<f64>, params: &IftaParams) -> Result<IftaOutput> {
    run(target, params, Quantization::Annealed)
}

/// Share of the iterations spent ramping the soft quantization strength up to 1.
pub const ANNEAL_RAMP: f64 = 0.8;

/// Anneal schedule: a linear ramp from 0 that reaches 1.0 at `ANNEAL_RAMP * n_iter` and holds.
///
/// Never decreasing, and always exactly 1.0 on the final iteration.
pub fn anneal_strength(iteration: usize, n_iter: usize) -> f64 {
    if n_iter <= 1 || iteration + 1 >= n_iter {
        return 1.0;
    }
    (iteration as f64 / (ANNEAL_RAMP * n_iter as f64)).min(1.0)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Quantization {
    Hard,
    Annealed,
}

/// Checks the target and embeds it, centred, in the hologram grid.
fn embed_target(target: ArrayView2<f64>, holo_size: [usize; 2]) -> Result<Array2<f64>> {
    if target.iter().any(|t| !t.is_finite()) {
        return Err(Error::NonFinite("target pattern"));
    }
    if target.iter().any(|&t| t < 0.0) {
        return Err(Error::InvalidParameter(
            "target pattern must not be negative".to_string(),
        ));
    }
    if !target.iter().any(|&t| t > 0.0) {
        return Err(Error::EmptyTarget);
    }
    let shape = [target.shape()[0], target.shape()[1]];
    if shape[0] > holo_size[0] || shape[1] > holo_size[1] {
        return Err(Error::TargetTooLarge {
            target: shape,
            holo: holo_size,
        });
    }
    Ok(pad_2d_to(target, holo_size))
}

fn holo_field(phase: &PhaseMap) -> ComplexField {
    let mut field = Array2::zeros(phase.raw_dim());
    Zip::from(&mut field)
        .and(phase)
        .par_for_each(|e, &p| *e = Complex::from_polar(1.0, p));
    field
}

fn energy(field: &ComplexField) -> f64 {
    field.iter().map(|e| e.norm_sqr()).sum()
}

fn roi_fraction(field: &ComplexField, target: &Array2<f64>, total: f64) -> f64 {
    let inside: f64 = field
        .iter()
        .zip(target.iter())
        .filter(|&(_, &t)| t > 0.0)
        .map(|(e, _)| e.norm_sqr())
        .sum();
    inside / total
}

fn run(target: ArrayView2<f64>, params: &IftaParams, quantization: Quantization) -> Result<IftaOutput> {
    params.validate()?;
    let holo_size = params.holo_size;
    let target = embed_target(target, holo_size)?;

    // irradiance target, the constraint acts on amplitude
    let target_amplitude = target.map(|t| t.sqrt());
    let target_energy: f64 = target.sum();

    let levels = params.levels;
    let rfact = params.rfact;
    let propagator = Propagator::new(holo_size);

    debug!(
        ?holo_size,
        levels = levels.count(),
        rfact,
        n_iter = params.n_iter,
        ?quantization,
        "starting ifta"
    );

    let mut phase = params.initial_phase.generate(holo_size);
    let mut recovery = holo_field(&phase);

    for i in 0..params.n_iter {
        let mut image = propagator.to_image_plane(holo_field(&phase))?;
        if i + 1 == params.n_iter {
            recovery = image.clone();
        }

        // rescale the target to the propagated energy so the projection conserves power
        let field_energy = energy(&image);
        let scale = if field_energy > 0.0 {
            (field_energy / target_energy).sqrt()
        } else {
            0.0
        };

        if enabled!(Level::TRACE) {
            let roi = if field_energy > 0.0 {
                roi_fraction(&image, &target, field_energy)
            } else {
                0.0
            };
            trace!(iteration = i, roi, "image plane");
        }

        Zip::from(&mut image)
            .and(&target_amplitude)
            .par_for_each(|e, &t| *e = relax_value(match_amplitude(*e, t * scale), *e, rfact));

        let holo = propagator.to_holo_plane(image)?;

        match quantization {
            Quantization::Hard => {
                Zip::from(&mut phase)
                    .and(&holo)
                    .par_for_each(|p, &e| *p = quantize_value(wrap_phase(phase_of(e)), levels));
            }
            Quantization::Annealed => {
                let strength = anneal_strength(i, params.n_iter);
                trace!(iteration = i, strength, "soft quantization");
                Zip::from(&mut phase).and(&holo).par_for_each(|p, &e| {
                    *p = soft_quantize_value(wrap_phase(phase_of(e)), levels, strength)
                });
            }
        }
    }

    let efficiency = if params.compute_efficiency {
        let intensity = recovery.map(|e| e.norm_sqr());
        Some(efficiency(intensity.view(), target.view())?)
    } else {
        None
    };

    debug!(?efficiency, "finished ifta");

    Ok(IftaOutput {
        phase,
        recovery,
        efficiency,
    })
}
