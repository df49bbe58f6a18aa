use doe_ifta::geometry::{
    collector_length_min, even_holo_size, focal_length, gaussian_beam_radius, image_pitch,
    optic_side_length_max,
};
use doe_ifta::pattern::cross;
use doe_ifta::screens::lens;
use doe_ifta::{combine, discretize, ifta, ifta_soft_quantization, IftaParams, PhaseLevels};
use image::{Rgb, RgbImage};
use ndarray::ArrayView2;
use palette::{Lch, Srgb};
use tracing::info;
use tracing_subscriber::EnvFilter;

pub fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // geometry
    let d1 = 0.01; // distance source waist - hologram
    let d2 = 0.03; // distance hologram - image plane
    let target_length = 0.01;
    let target_width = target_length / 5.0;

    let n_levels = PhaseLevels::new(2);
    let n_replication = 2.0;
    let light_collection_efficiency_min = 0.5;

    // hardware
    let wavelength = 850e-9;
    let divergence = 16.0; // full angle, degrees
    let fringe_length_min = 2e-6;
    let optic_pp = 750e-9;

    let (f, f_deviation) = focal_length(d1, d2, wavelength, divergence)?;
    let optic_length_max = optic_side_length_max(wavelength, f, fringe_length_min)?;
    let w_z = gaussian_beam_radius(wavelength, divergence, d1)?;
    let optic_length_min = collector_length_min(w_z, light_collection_efficiency_min)?;
    info!(f, f_deviation, optic_length_min, optic_length_max, "optic sizing");

    let optic_length = 1.1 * optic_length_min;
    let holo_size = even_holo_size(optic_length / n_replication, optic_pp)?;
    let holo_length = holo_size as f64 * optic_pp;
    let image_pp = image_pitch(wavelength, d2, holo_length);

    let target_size = (target_length / image_pp).floor() as usize;
    let width = (target_width / image_pp).floor() as usize;
    info!(holo_size, holo_length, image_pp, target_size, width, "sampling");

    let target = cross(target_size, width, [target_size + 10, target_size + 10])?;

    let params = IftaParams::new([holo_size, holo_size])
        .with_levels(n_levels)
        .with_rfact(1.2)
        .with_iterations(100);

    let hard = ifta(target.view(), &params)?;
    let soft = ifta_soft_quantization(target.view(), &params)?;
    info!(
        hard = ?hard.efficiency,
        soft = ?soft.efficiency,
        "efficiency"
    );

    let phase_lens = lens(
        f,
        wavelength,
        [holo_size, holo_size],
        holo_length / holo_size as f64,
        PhaseLevels::CONTINUOUS,
    )?;
    let phase_holo_lens = combine(hard.phase.view(), phase_lens.view())?;
    let phase_holo_lens_discretized = discretize(phase_holo_lens.view(), n_levels);

    save_real_image("cross_target.png", target.view(), 1.0, true)?;
    save_real_image("cross_recovery.png", hard.recovery_intensity().view(), 1.0, true)?;
    save_real_image("cross_recovery_soft.png", soft.recovery_intensity().view(), 1.0, true)?;
    save_phase_image("cross_holo.png", hard.phase.view())?;
    save_phase_image("cross_holo_soft.png", soft.phase.view())?;
    save_phase_image("cross_lens.png", phase_lens.view())?;
    save_phase_image("cross_holo_lens.png", phase_holo_lens.view())?;
    save_phase_image("cross_holo_lens_discretized.png", phase_holo_lens_discretized.view())?;
    Ok(())
}

pub fn save_real_image<T: AsRef<std::path::Path> + std::fmt::Debug>(
    file_name: T,
    arr: ArrayView2<f64>,
    amp: f64,
    normalise: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if let &[h, w, ..] = arr.shape() {
        let mut max: f64 = arr.iter().fold(0.0, |max, val| val.max(max));
        let sum = arr.iter().fold(0.0, |sum, val| val + sum);
        info!(h, w, max, sum, file = ?file_name, "saving");

        let mut img = RgbImage::new(w as u32, h as u32);
        if !normalise || max == 0.0 {
            max = 1.0;
        }

        for (x, y, p) in img.enumerate_pixels_mut() {
            let value = arr[[y as usize, x as usize]] / max;
            let value = (value * amp).min(1.0);

            let colour = Srgb::from(Lch::new(value * 70.0, value * 128.0, 280.0 - 245.0 * value));
            *p = Rgb([
                (colour.red * 255.0) as u8,
                (colour.green * 255.0) as u8,
                (colour.blue * 255.0) as u8,
            ]);
        }

        img.save(file_name)?;
    }
    Ok(())
}

// phase wraps around the hue circle
pub fn save_phase_image<T: AsRef<std::path::Path> + std::fmt::Debug>(
    file_name: T,
    arr: ArrayView2<f64>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let &[h, w, ..] = arr.shape() {
        info!(h, w, file = ?file_name, "saving");

        let mut img = RgbImage::new(w as u32, h as u32);
        for (x, y, p) in img.enumerate_pixels_mut() {
            let theta = arr[[y as usize, x as usize]];
            let colour = Srgb::from(Lch::new(
                70.0f64,
                60.0,
                360.0 * (theta / std::f64::consts::TAU).rem_euclid(1.0),
            ));
            *p = Rgb([
                (colour.red * 255.0) as u8,
                (colour.green * 255.0) as u8,
                (colour.blue * 255.0) as u8,
            ]);
        }

        img.save(file_name)?;
    }
    Ok(())
}
