use thiserror::Error;

/// Errors raised while turning a device snapshot into a [`ControlState`]
///
/// [`ControlState`]: super::ControlState
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MotionError {
    /// The snapshot is shorter than the configured axis or button layout
    #[error("snapshot has no {kind} at index {index} (only {len} reported)")]
    Validation {
        kind: InputKind,
        index: usize,
        len: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Axis,
    Button,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKind::Axis => f.write_str("axis"),
            InputKind::Button => f.write_str("button"),
        }
    }
}
