//! Closed form sizing of the source, hologram and image plane layout.
//!
//! All quantities are in SI units, angles in degrees where named `_deg`.

use crate::error::{Error, Result};
use num_integer::Integer;
use std::f64::consts::PI;

fn check_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!(
            "{} must be finite and positive, got {}",
            name, value
        )))
    }
}

/// Calculate the aperture diameter from numerical aperture and focal length
///
/// * na - numerical aperture
/// * fl - focal length
/// * n - optical density of adjacent medium (1.0 for air)
pub fn diameter(na: f64, fl: f64, n: f64) -> f64 {
    let na = na / n;
    2.0 * fl * na / (1.0 - na * na).sqrt()
}

/// Calculate the numerical aperture from diameter and focal length
///
/// * d - aperture diameter
/// * fl - focal length
/// * n - optical density of adjacent medium (1.0 for air)
pub fn na(d: f64, fl: f64, n: f64) -> f64 {
    // simplify NA = n sin(atan(D/(2f)))
    n * d / (4.0 * fl * fl + d * d).sqrt()
}

/// Waist radius of a Gaussian beam with the given full far-field divergence angle.
pub fn gaussian_waist(wavelength: f64, divergence_deg: f64) -> f64 {
    let half_angle = (0.5 * divergence_deg).to_radians();
    wavelength / (PI * half_angle)
}

/// Rayleigh range of a Gaussian beam with the given waist radius.
pub fn rayleigh_range(wavelength: f64, waist: f64) -> f64 {
    PI * waist * waist / wavelength
}

/// 1/e^2 radius of a Gaussian beam after propagating `z` from its waist.
pub fn gaussian_beam_radius(wavelength: f64, divergence_deg: f64, z: f64) -> Result<f64> {
    check_positive("wavelength", wavelength)?;
    check_positive("divergence", divergence_deg)?;
    let w0 = gaussian_waist(wavelength, divergence_deg);
    let zr = rayleigh_range(wavelength, w0);
    Ok(w0 * (1.0 + (z / zr) * (z / zr)).sqrt())
}

/// Smallest collector side length that captures `efficiency` of a Gaussian beam of radius `w_z`.
///
/// The collector is taken as the circle inscribed in the square optic, which encloses
/// `1 - exp(-2 r^2 / w^2)` of the beam power.
pub fn collector_length_min(w_z: f64, efficiency: f64) -> Result<f64> {
    check_positive("beam radius", w_z)?;
    if !(efficiency > 0.0 && efficiency < 1.0) {
        return Err(Error::InvalidParameter(format!(
            "collection efficiency must lie in (0, 1), got {}",
            efficiency
        )));
    }
    let r = w_z * (-(1.0 - efficiency).ln() / 2.0).sqrt();
    Ok(2.0 * r)
}

/// Focal length conjugating a Gaussian source waist at `d1` before the lens to an image waist
/// `d2` after it.
///
/// Solves the Gaussian beam imaging relation `1/(s + zr^2/(s - f)) + 1/s'' = 1/f`, which reduces to
/// a quadratic in `f`. Returns the focal length and its deviation from the thin lens value
/// `d1 d2 / (d1 + d2)`.
pub fn focal_length(d1: f64, d2: f64, wavelength: f64, divergence_deg: f64) -> Result<(f64, f64)> {
    check_positive("source distance", d1)?;
    check_positive("image distance", d2)?;
    check_positive("wavelength", wavelength)?;
    check_positive("divergence", divergence_deg)?;

    let zr = rayleigh_range(wavelength, gaussian_waist(wavelength, divergence_deg));
    let (s, v) = (d1, d2);
    let a = s + v;
    let b = s * s + zr * zr + 2.0 * v * s;
    let c = v * (s * s + zr * zr);
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Err(Error::InvalidParameter(format!(
            "no focal length images a waist at {} m onto {} m",
            d1, d2
        )));
    }
    // the other root tends to f = d1, a lens placed at the waist
    let f = (b - discriminant.sqrt()) / (2.0 * a);
    let thin = s * v / (s + v);
    Ok((f, f - thin))
}

/// Largest optic side length whose outermost lens fringe is no thinner than `fringe_min`.
///
/// The local fringe period of a lens is `wavelength / sin(theta)`, so the limit is the aperture
/// whose numerical aperture equals `wavelength / fringe_min`.
pub fn optic_side_length_max(wavelength: f64, focal_length: f64, fringe_min: f64) -> Result<f64> {
    check_positive("wavelength", wavelength)?;
    check_positive("focal length", focal_length)?;
    check_positive("minimal fringe length", fringe_min)?;
    let na = wavelength / fringe_min;
    if na >= 1.0 {
        return Ok(f64::INFINITY);
    }
    Ok(diameter(na, focal_length, 1.0))
}

/// Sample pitch in the image plane for a hologram of side `holo_length` imaged at `d2`.
pub fn image_pitch(wavelength: f64, d2: f64, holo_length: f64) -> f64 {
    wavelength * d2 / holo_length
}

/// Number of whole pixels of `pitch` fitting in `length`, rounded up to an even count.
pub fn even_holo_size(length: f64, pitch: f64) -> Result<usize> {
    check_positive("hologram length", length)?;
    check_positive("pixel pitch", pitch)?;
    let n = (length / pitch).floor() as usize;
    let n = if n.is_odd() { n + 1 } else { n };
    if n == 0 {
        return Err(Error::InvalidParameter(format!(
            "hologram of {} m holds no pixel of {} m",
            length, pitch
        )));
    }
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn na_diameter_inverse() {
        let d = diameter(0.3, 0.01, 1.0);
        assert_abs_diff_eq!(na(d, 0.01, 1.0), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn beam_radius_far_field() {
        // far from the waist the radius grows at the half angle
        let w = gaussian_beam_radius(850e-9, 16.0, 0.01).unwrap();
        let expected = 0.01 * (8.0f64).to_radians();
        assert_abs_diff_eq!(w, expected, epsilon = expected * 1e-3);
        let w0 = gaussian_beam_radius(850e-9, 16.0, 0.0).unwrap();
        assert_abs_diff_eq!(w0, gaussian_waist(850e-9, 16.0), epsilon = 1e-15);
    }

    #[test]
    fn collector_captures_requested_power() {
        let w = 1e-3;
        let l = collector_length_min(w, 0.5).unwrap();
        let r = l / 2.0;
        let captured = 1.0 - (-2.0 * r * r / (w * w)).exp();
        assert_abs_diff_eq!(captured, 0.5, epsilon = 1e-12);
        assert!(collector_length_min(w, 1.0).is_err());
        assert!(collector_length_min(w, 0.0).is_err());
    }

    #[test]
    fn focal_length_near_thin_lens() {
        let (f, diff) = focal_length(0.01, 0.03, 850e-9, 16.0).unwrap();
        assert_abs_diff_eq!(f, 0.0075, epsilon = 1e-6);
        assert_abs_diff_eq!(f - diff, 0.0075, epsilon = 1e-15);
        assert!(diff.abs() < 1e-6);
    }

    #[test]
    fn fringe_limit() {
        let l = optic_side_length_max(850e-9, 0.0075, 2e-6).unwrap();
        let half_angle = (0.5 * l / 0.0075).atan();
        assert_abs_diff_eq!(850e-9 / half_angle.sin(), 2e-6, epsilon = 1e-12);
        assert_eq!(
            optic_side_length_max(850e-9, 0.0075, 500e-9).unwrap(),
            f64::INFINITY
        );
    }

    #[test]
    fn even_sizes() {
        assert_eq!(even_holo_size(10.5e-6, 1e-6).unwrap(), 10);
        assert_eq!(even_holo_size(11.5e-6, 1e-6).unwrap(), 12);
        assert!(even_holo_size(0.5e-6, 1e-6).is_err());
        assert_abs_diff_eq!(image_pitch(850e-9, 0.03, 1e-3), 2.55e-5, epsilon = 1e-15);
    }
}
