use crate::{ErrorCode, ValueError};

/// Default maximum nesting depth accepted by the validator.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Default maximum element count of a single object or array.
///
/// This is a safety limit; adjust explicitly for your deployment.
pub const DEFAULT_MAX_CONTAINER_LEN: usize = 1 << 20;

/// Resource limits enforced while validating untrusted bytes.
///
/// Limits are checked deterministically during the single validation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    /// Maximum total input length in bytes.
    pub max_input_bytes: usize,
    /// Maximum nesting depth. The root aggregate is at depth 1.
    pub max_depth: usize,
    /// Maximum element count of any single object or array.
    pub max_container_len: usize,
}

impl ParseLimits {
    /// Construct explicit limits.
    ///
    /// # Errors
    ///
    /// Returns `InvalidLimits` if `max_depth` is zero, since no buffer could ever validate.
    pub const fn new(
        max_input_bytes: usize,
        max_depth: usize,
        max_container_len: usize,
    ) -> Result<Self, ValueError> {
        if max_depth == 0 {
            return Err(ValueError::of(ErrorCode::InvalidLimits));
        }
        Ok(Self {
            max_input_bytes,
            max_depth,
            max_container_len,
        })
    }

    /// Construct limits derived from a maximum message size.
    ///
    /// The defaults are:
    /// - `max_input_bytes = max_message_bytes`
    /// - `max_depth = DEFAULT_MAX_DEPTH`
    /// - `max_container_len` capped by `DEFAULT_MAX_CONTAINER_LEN`
    #[must_use]
    pub fn for_bytes(max_message_bytes: usize) -> Self {
        Self {
            max_input_bytes: max_message_bytes,
            max_depth: DEFAULT_MAX_DEPTH,
            max_container_len: max_message_bytes.min(DEFAULT_MAX_CONTAINER_LEN),
        }
    }
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self::for_bytes(usize::MAX)
    }
}
