use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Every precondition violation the design routines can report.
///
/// All of these are detected before the iteration loop starts, so a failed run never yields a partial result.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("shape mismatch in {context}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        context: &'static str,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    #[error("target of shape {target:?} does not fit in hologram grid {holo:?}")]
    TargetTooLarge { target: [usize; 2], holo: [usize; 2] },
    #[error("hologram grid must be non-zero and even on both axes, got {0:?}")]
    InvalidGridSize([usize; 2]),
    #[error("quantization level count must not be negative, got {0}")]
    InvalidLevelCount(i64),
    #[error("relaxation factor must be finite and positive, got {0}")]
    InvalidRelaxation(f64),
    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
    #[error("target pattern has no positive element")]
    EmptyTarget,
    #[error("zero total energy in {0}")]
    DegenerateEnergy(&'static str),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub(crate) fn check_same_shape(context: &'static str, expected: &[usize], found: &[usize]) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            context,
            expected: expected.to_vec(),
            found: found.to_vec(),
        })
    }
}
