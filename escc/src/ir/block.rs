//! Basic blocks (`spec.md §4.2`).
//!
//! Each block keeps a small inline peephole cache of its last few pushed
//! instructions (mirroring `ir_block.h`'s 4-slot `recent` array), used by
//! the optimizer's CSE/copy-propagation passes to look backward without
//! rescanning the whole instruction vector.

use crate::arena::Handle;

use super::inst::Instruction;

const PEEPHOLE_DEPTH: usize = 4;

/// A straight-line sequence of instructions with explicit predecessor and
/// successor edges (populated once the enclosing function's CFG is wired
/// up during lowering).
#[derive(Debug, Clone, Default)]
pub struct BasicBlock {
    pub instructions: Vec<Instruction>,
    pub preds: Vec<Handle<BasicBlock>>,
    pub succs: Vec<Handle<BasicBlock>>,
    /// Indices into `instructions` for the last up to
    /// [`PEEPHOLE_DEPTH`] pushes, most recent last.
    recent: Vec<usize>,
}

impl BasicBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, inst: Instruction) -> usize {
        let idx = self.instructions.len();
        self.instructions.push(inst);
        self.recent.push(idx);
        if self.recent.len() > PEEPHOLE_DEPTH {
            self.recent.remove(0);
        }
        idx
    }

    /// Most-recently-pushed instructions, oldest first, capped at the
    /// peephole window depth.
    pub fn recent(&self) -> impl Iterator<Item = &Instruction> {
        self.recent.iter().map(move |&i| &self.instructions[i])
    }

    /// Indices into `instructions` backing [`Self::recent`], for callers
    /// that need to snapshot the window before mutating instructions in
    /// place (e.g. `optimize::cse`'s peephole fast path).
    pub fn recent_indices(&self) -> &[usize] {
        &self.recent
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::inst::Opcode;

    #[test]
    fn peephole_window_caps_at_four() {
        let mut block = BasicBlock::new();
        for _ in 0..10 {
            block.push(Instruction::new(Opcode::Nop, 0));
        }
        assert_eq!(block.recent().count(), 4);
        assert_eq!(block.instructions.len(), 10);
    }
}
