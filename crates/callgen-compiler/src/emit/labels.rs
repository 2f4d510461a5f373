//! Forward-jump labels.
//!
//! A label records the offset of a u16 placeholder; patching it writes the
//! distance from the end of the placeholder to the current position.

/// A pending forward jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpLabel(pub(crate) usize);

impl JumpLabel {
    /// Get the bytecode offset of the placeholder.
    pub fn offset(&self) -> usize {
        self.0
    }
}

/// Pending targets of a `LookupSwitch`, in key order of emission.
#[derive(Debug)]
pub struct SwitchLabels {
    pub default: JumpLabel,
    pub cases: Vec<JumpLabel>,
}
