use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

/// Errors raised while setting up or running a simulation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Non-finite value during {stage} at t = {t} s")]
    NonFinite { stage: &'static str, t: f64 },

    #[error("Integration failed during {stage}: {reason}")]
    Integration { stage: &'static str, reason: String },
}

impl SimError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SimError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Fails unless `value` is finite and strictly positive.
pub fn require_positive(name: &'static str, value: f64) -> SimResult<()> {
    if !value.is_finite() {
        return Err(SimError::invalid(name, format!("must be finite, got {value}")));
    }
    if value <= 0.0 {
        return Err(SimError::invalid(name, format!("must be > 0, got {value}")));
    }
    Ok(())
}

/// Fails unless `value` is finite.
pub fn require_finite(name: &'static str, value: f64) -> SimResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(SimError::invalid(name, format!("must be finite, got {value}")))
    }
}
