use crate::error::{check_same_shape, Result};
use ndarray::parallel::prelude::{IntoParallelIterator, ParallelIterator};
use ndarray::{s, Array2, ArrayView2, ArrayViewMut2, Axis, Zip};
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;
use rustfft::{Fft, FftDirection, FftPlanner};
use std::sync::Arc;
use unchecked_index::{get_unchecked, get_unchecked_mut};

/// Centred, unitary 2D DFT pair linking the hologram plane and the image plane.
///
/// The zero spatial frequency sits at `(H/2, W/2)` in both planes, which removes the need for
/// ifft_shift before and fft_shift after each transform. Both directions are scaled by `1/sqrt(H*W)`
/// so the total energy `sum(|a|^2)` is the same on both sides.
///
/// Plans are built once per grid shape and shared between calls.
pub struct Propagator {
    shape: [usize; 2],
    forward: [Arc<dyn Fft<f64>>; 2],
    inverse: [Arc<dyn Fft<f64>>; 2],
}

impl Propagator {
    pub fn new(shape: [usize; 2]) -> Self {
        let mut planner = FftPlanner::new();
        Propagator {
            shape,
            forward: [
                planner.plan_fft(shape[0], FftDirection::Forward),
                planner.plan_fft(shape[1], FftDirection::Forward),
            ],
            inverse: [
                planner.plan_fft(shape[0], FftDirection::Inverse),
                planner.plan_fft(shape[1], FftDirection::Inverse),
            ],
        }
    }

    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    /// Propagate a hologram-plane field to the image plane.
    pub fn to_image_plane(&self, field: Array2<Complex<f64>>) -> Result<Array2<Complex<f64>>> {
        check_same_shape("image plane transform", &self.shape, field.shape())?;
        Ok(self.apply(field, &self.forward))
    }

    /// Propagate an image-plane field back to the hologram plane.
    pub fn to_holo_plane(&self, field: Array2<Complex<f64>>) -> Result<Array2<Complex<f64>>> {
        check_same_shape("hologram plane transform", &self.shape, field.shape())?;
        Ok(self.apply(field, &self.inverse))
    }

    fn apply(
        &self,
        field: Array2<Complex<f64>>,
        plans: &[Arc<dyn Fft<f64>>; 2],
    ) -> Array2<Complex<f64>> {
        let mut field = if field.is_standard_layout() {
            field
        } else {
            field.as_standard_layout().into_owned()
        };
        // fft along axis1, iteration over axis0
        centred_fft_lanes(field.view_mut(), Axis(1), &plans[1]);
        // fft along axis0, iteration over axis1
        centred_fft_lanes(field.view_mut(), Axis(0), &plans[0]);
        field
    }
}

/// Forward centred transform with a one-off plan.
pub fn to_image_plane(field: Array2<Complex<f64>>) -> Array2<Complex<f64>> {
    let shape = [field.shape()[0], field.shape()[1]];
    let propagator = Propagator::new(shape);
    propagator.apply(field, &propagator.forward)
}

/// Inverse centred transform with a one-off plan.
pub fn to_holo_plane(field: Array2<Complex<f64>>) -> Array2<Complex<f64>> {
    let shape = [field.shape()[0], field.shape()[1]];
    let propagator = Propagator::new(shape);
    propagator.apply(field, &propagator.inverse)
}

/// Runs `fft` over every lane along `axis`, treating index len/2 as the origin on input and output.
fn centred_fft_lanes(mut input: ArrayViewMut2<Complex<f64>>, axis: Axis, fft: &Arc<dyn Fft<f64>>) {
    let len = input.len_of(axis);
    if len == 0 {
        return;
    }
    let half = len / 2;
    let normalisation = 1.0 / (len as f64).sqrt();
    let across = Axis(1 - axis.index());

    Zip::from(input.axis_iter_mut(across))
        .into_par_iter()
        .for_each_init(
            || {
                (
                    vec![Zero::zero(); len],
                    vec![Zero::zero(); fft.get_inplace_scratch_len()],
                )
            },
            |(fft_buffer, scratch), lane| {
                let mut lane = lane.0;
                let fft_buffer = fft_buffer.as_mut_slice();
                debug_assert_eq!(lane.len(), fft_buffer.len());

                // gather equivalent to ifft_shift, half rounds down
                unsafe {
                    let mut k = 0;
                    for &e in lane.slice(s![half..]) {
                        *get_unchecked_mut(&mut *fft_buffer, k) = e;
                        k += 1;
                    }
                    for &e in lane.slice(s![..half]) {
                        *get_unchecked_mut(&mut *fft_buffer, k) = e;
                        k += 1;
                    }
                }

                fft.process_with_scratch(fft_buffer, scratch);

                // fft_shift then normalise on write back
                unsafe {
                    let mut k = 0;
                    for e in lane.slice_mut(s![half..]) {
                        *e = *get_unchecked(&*fft_buffer, k) * normalisation;
                        k += 1;
                    }
                    for e in lane.slice_mut(s![..half]) {
                        *e = *get_unchecked(&*fft_buffer, k) * normalisation;
                        k += 1;
                    }
                }
            },
        );
}

/// Zero pads `input` to `out_shape`, keeping element `(m0/2, m1/2)` on `(out0/2, out1/2)`.
///
/// Callers must ensure `out_shape` is no smaller than the input on either axis.
pub fn pad_2d_to<T: Clone + Zero>(input: ArrayView2<T>, out_shape: [usize; 2]) -> Array2<T> {
    let m0 = input.shape()[0];
    let m1 = input.shape()[1];
    debug_assert!(m0 <= out_shape[0] && m1 <= out_shape[1]);
    let mut out = Array2::zeros(out_shape);
    let slice = s![
        out_shape[0] / 2 - m0 / 2..m0 + out_shape[0] / 2 - m0 / 2,
        out_shape[1] / 2 - m1 / 2..m1 + out_shape[1] / 2 - m1 / 2
    ];
    out.slice_mut(slice).assign(&input);
    out
}

#[cfg(test)]
mod tests {
    use super::{pad_2d_to, to_holo_plane, to_image_plane, Propagator};
    use crate::error::Error;
    use ndarray::{arr2, Array2};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use rustfft::num_complex::Complex;

    fn random_field(shape: [usize; 2], seed: u64) -> Array2<Complex<f64>> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        Array2::from_shape_fn(shape, |_| {
            Complex::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
        })
    }

    fn energy(a: &Array2<Complex<f64>>) -> f64 {
        a.iter().map(|e| e.norm_sqr()).sum()
    }

    #[test]
    fn test_round_trip_even() {
        let input = random_field([8, 6], 1);
        let output = to_holo_plane(to_image_plane(input.clone()));
        for (a, b) in input.iter().zip(output.iter()) {
            assert!((a - b).norm() < 1e-12, "{}", (a - b).norm());
        }
    }

    #[test]
    fn test_round_trip_odd() {
        let input = random_field([5, 7], 2);
        let output = to_holo_plane(to_image_plane(input.clone()));
        for (a, b) in input.iter().zip(output.iter()) {
            assert!((a - b).norm() < 1e-12, "{}", (a - b).norm());
        }
    }

    #[test]
    fn test_parseval() {
        let input = random_field([16, 12], 3);
        let before = energy(&input);
        let after = energy(&to_image_plane(input));
        assert!((before - after).abs() < 1e-9 * before);
    }

    #[test]
    fn test_dc_lands_at_centre() {
        let input = Array2::from_elem([6, 4], Complex::new(1.0, 0.0));
        let output = to_image_plane(input);
        for ((y, x), e) in output.indexed_iter() {
            if (y, x) == (3, 2) {
                assert!((e - Complex::new(24f64.sqrt(), 0.0)).norm() < 1e-12);
            } else {
                assert!(e.norm() < 1e-12, "{:?} {}", (y, x), e);
            }
        }
    }

    #[test]
    fn test_centred_point_is_flat() {
        let mut input = Array2::zeros([4, 8]);
        input[[2, 4]] = Complex::new(1.0, 0.0);
        let output = to_holo_plane(input);
        let expected = Complex::new(1.0 / 32f64.sqrt(), 0.0);
        for e in output.iter() {
            assert!((e - expected).norm() < 1e-12);
        }
    }

    #[test]
    fn test_propagator_matches_one_off() {
        let input = random_field([10, 10], 4);
        let propagator = Propagator::new([10, 10]);
        let a = propagator.to_image_plane(input.clone()).unwrap();
        let b = to_image_plane(input);
        assert_eq!(a, b);
    }

    #[test]
    fn test_propagator_rejects_other_shape() {
        let propagator = Propagator::new([4, 4]);
        let err = propagator.to_image_plane(Array2::zeros([4, 6])).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_transposed_input() {
        let input = random_field([6, 4], 5);
        let transposed = input.t().to_owned();
        let expected = to_image_plane(transposed.clone());
        let output = to_image_plane(input.reversed_axes());
        assert_eq!(output.shape(), expected.shape());
        for (a, b) in output.iter().zip(expected.iter()) {
            assert!((a - b).norm() < 1e-12);
        }
    }

    #[test]
    fn test_pad_2d_to_centres() {
        let input = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let out = pad_2d_to(input.view(), [4, 6]);
        assert_eq!(out.shape(), &[4, 6]);
        assert_eq!(out[[1, 2]], 1.0);
        assert_eq!(out[[2, 3]], 4.0);
        assert_eq!(out.sum(), 10.0);
    }
}
