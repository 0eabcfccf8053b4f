//! Generation parameter validation.
//!
//! Validation runs before any file or network access, so a rejected call
//! has no side effects.

use crate::error::{VisionError, VisionResult};
use crate::types::config::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use std::ops::RangeInclusive;

/// Accepted `max_tokens` values.
pub const MAX_TOKENS_RANGE: RangeInclusive<u32> = 100..=4000;

/// Accepted `temperature` and `top_p` values.
pub const UNIT_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Accepted `presence_penalty` and `frequency_penalty` values.
pub const PENALTY_RANGE: RangeInclusive<f64> = 0.0..=2.0;

/// Sampling options for one completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    /// Completion length limit.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
    /// Nucleus sampling.
    pub top_p: Option<f64>,
    /// Presence penalty.
    pub presence_penalty: Option<f64>,
    /// Frequency penalty.
    pub frequency_penalty: Option<f64>,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            top_p: None,
            presence_penalty: None,
            frequency_penalty: None,
        }
    }
}

impl GenerationParams {
    /// Checks every parameter against its bounds.
    ///
    /// # Errors
    ///
    /// Returns [`VisionError::Validation`] naming the first parameter that
    /// is out of range.
    pub fn validate(&self) -> VisionResult<()> {
        if !MAX_TOKENS_RANGE.contains(&self.max_tokens) {
            return Err(VisionError::validation(
                "max_tokens",
                format!(
                    "must be between {} and {}, got {}",
                    MAX_TOKENS_RANGE.start(),
                    MAX_TOKENS_RANGE.end(),
                    self.max_tokens
                ),
            ));
        }

        check_float("temperature", self.temperature, &UNIT_RANGE)?;

        if let Some(top_p) = self.top_p {
            check_float("top_p", top_p, &UNIT_RANGE)?;
        }
        if let Some(penalty) = self.presence_penalty {
            check_float("presence_penalty", penalty, &PENALTY_RANGE)?;
        }
        if let Some(penalty) = self.frequency_penalty {
            check_float("frequency_penalty", penalty, &PENALTY_RANGE)?;
        }

        Ok(())
    }
}

// NaN fails `contains`, so it is rejected along with out-of-range values.
fn check_float(name: &str, value: f64, range: &RangeInclusive<f64>) -> VisionResult<()> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(VisionError::validation(
            name,
            format!(
                "must be between {:.1} and {:.1}, got {value}",
                range.start(),
                range.end()
            ),
        ))
    }
}
