//! Core shared errors (renderer-agnostic).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Spin step must be a finite number of degrees, got {0}")]
    InvalidSpinStep(f32),
}

pub type CoreResult<T> = Result<T, CoreError>;
