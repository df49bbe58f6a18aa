use crate::error::{Error, Result};
use ndarray::{Array2, Zip};

// true when `i` lies in the band of `len` pixels centred on `centre`
fn in_band(i: usize, centre: usize, len: usize) -> bool {
    let start = centre - len / 2;
    i >= start && i < start + len
}

/// Binary cross made of a horizontal and a vertical bar, centred on `(H/2, W/2)` of a zero support.
///
/// * `cross_size` - Length of each bar in pixels
/// * `width` - Thickness of each bar in pixels
/// * `support_size` - Shape of the returned array
pub fn cross(cross_size: usize, width: usize, support_size: [usize; 2]) -> Result<Array2<f64>> {
    if width == 0 || cross_size == 0 {
        return Err(Error::InvalidParameter(
            "cross size and width must be positive".to_string(),
        ));
    }
    if width > cross_size {
        return Err(Error::InvalidParameter(format!(
            "cross width {} exceeds cross size {}",
            width, cross_size
        )));
    }
    if cross_size > support_size[0] || cross_size > support_size[1] {
        return Err(Error::TargetTooLarge {
            target: [cross_size, cross_size],
            holo: support_size,
        });
    }

    let c0 = support_size[0] / 2;
    let c1 = support_size[1] / 2;

    let mut pattern = Array2::zeros(support_size);
    Zip::indexed(&mut pattern).par_for_each(|(y, x), e| {
        let horizontal = in_band(y, c0, width) && in_band(x, c1, cross_size);
        let vertical = in_band(x, c1, width) && in_band(y, c0, cross_size);
        if horizontal || vertical {
            *e = 1.0;
        }
    });
    Ok(pattern)
}
