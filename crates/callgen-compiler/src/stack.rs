//! Operand stack bookkeeping.
//!
//! Tracks the static type of every value the emitted code leaves on the
//! machine stack, so lowering can decide on casts and restore balance after
//! branches.

use callgen_core::{CompilationError, DataType};

type Result<T> = std::result::Result<T, CompilationError>;

/// Static types of the values currently on the operand stack (top last).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperandStack {
    slots: Vec<DataType>,
}

impl OperandStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn top(&self) -> Option<DataType> {
        self.slots.last().copied()
    }

    pub fn slots(&self) -> &[DataType] {
        &self.slots
    }

    pub fn push(&mut self, ty: DataType) {
        self.slots.push(ty);
    }

    pub fn pop(&mut self) -> Result<DataType> {
        self.slots.pop().ok_or_else(underflow)
    }

    /// Drop the top `count` entries.
    pub fn remove(&mut self, count: usize) -> Result<()> {
        let new_len = self.slots.len().checked_sub(count).ok_or_else(underflow)?;
        self.slots.truncate(new_len);
        Ok(())
    }

    /// Replace the top `count` entries with a single `ty`.
    pub fn replace(&mut self, ty: DataType, count: usize) -> Result<()> {
        self.remove(count)?;
        self.push(ty);
        Ok(())
    }

    /// `b a -> a b`
    pub fn swap(&mut self) -> Result<()> {
        let len = self.slots.len();
        if len < 2 {
            return Err(underflow());
        }
        self.slots.swap(len - 1, len - 2);
        Ok(())
    }

    /// `a -> a a`
    pub fn dup(&mut self) -> Result<()> {
        let top = self.top().ok_or_else(underflow)?;
        self.push(top);
        Ok(())
    }

    /// `b a -> a b a`
    pub fn dup_x1(&mut self) -> Result<()> {
        let a = self.pop()?;
        let b = self.pop()?;
        self.slots.extend([a, b, a]);
        Ok(())
    }

    /// `c b a -> b a c b a`
    pub fn dup2_x1(&mut self) -> Result<()> {
        let a = self.pop()?;
        let b = self.pop()?;
        let c = self.pop()?;
        self.slots.extend([b, a, c, b, a]);
        Ok(())
    }

    /// Capture the current state, for restoring at the start of each branch.
    pub fn snapshot(&self) -> Vec<DataType> {
        self.slots.clone()
    }

    pub fn restore(&mut self, snapshot: Vec<DataType>) {
        self.slots = snapshot;
    }
}

fn underflow() -> CompilationError {
    CompilationError::internal("operand stack underflow")
}
