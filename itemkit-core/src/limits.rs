//! Coercion limits and configuration

use crate::error::{ItemError, Result};

/// Hard cap on [`Limits::max_nesting_depth`]
pub const HARD_MAX_NESTING_DEPTH: usize = 256;

/// Limits applied while coercing raw maps into items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limits {
    /// Maximum nesting depth of items inside items (default: 64, hard: 256)
    pub max_nesting_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_nesting_depth: 64,
        }
    }
}

impl Limits {
    /// Check the configuration against the hard caps
    pub fn validate(&self) -> Result<()> {
        if self.max_nesting_depth == 0 {
            return Err(ItemError::InvalidLimits(
                "max_nesting_depth must be at least 1".to_string(),
            ));
        }
        if self.max_nesting_depth > HARD_MAX_NESTING_DEPTH {
            return Err(ItemError::InvalidLimits(format!(
                "max_nesting_depth {} exceeds hard limit {}",
                self.max_nesting_depth, HARD_MAX_NESTING_DEPTH
            )));
        }
        Ok(())
    }
}
