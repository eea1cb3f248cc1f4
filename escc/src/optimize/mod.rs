//! IR optimizer (`spec.md §4.6`): a fixed-point pipeline of independent
//! passes, each implementing [`OptPass`] over a single [`Function`].
//!
//! Mirrors the teacher crate's `aot::optimizer` module: an
//! `OptimizationPass` trait plus an `OptimizationPipeline` driver that
//! iterates every pass until a round changes nothing or `MAX_ITERATIONS` is
//! hit. Passes here operate on the lower-level arena IR rather than an AST,
//! so each one re-derives its own notion of "did anything change" from the
//! `Function`'s blocks directly.

use std::time::{Duration, Instant};

use crate::ir::{Function, Module};

mod cfg_simplify;
mod constant_fold;
mod copy_prop;
mod cse;
mod dce;
mod strength_reduction;

pub use cfg_simplify::CfgSimplify;
pub use constant_fold::ConstantFold;
pub use copy_prop::CopyPropagation;
pub use cse::CommonSubexpressionElimination;
pub use dce::DeadCodeElimination;
pub use strength_reduction::StrengthReduction;

/// One optimization pass over a single function. Returns whether it changed
/// anything, the same convention the fixed-point driver uses to detect
/// convergence.
pub trait OptPass {
    fn name(&self) -> &str;
    fn run(&mut self, function: &mut Function) -> bool;
}

/// Per-pass-category counts, each counting the number of *iterations* in
/// which that pass reported a change (not individual instructions touched).
#[derive(Debug, Clone, Copy, Default)]
pub struct PassCounts {
    pub constant_fold: u32,
    pub copy_propagation: u32,
    pub strength_reduction: u32,
    pub common_subexpression: u32,
    pub dead_code: u32,
    pub cfg_simplify: u32,
}

/// Summary returned to the caller once optimization finishes. No logging
/// crate is involved (`spec.md §6`'s ambient logging decision): the caller
/// decides what, if anything, to do with these numbers.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptimizerStats {
    pub functions_processed: u32,
    pub total_iterations: u32,
    pub counts: PassCounts,
    pub elapsed: Duration,
}

const MAX_ITERATIONS: u32 = 10;

/// Run every pass to a fixed point over every function in `module`
/// (`spec.md §4.6`): for each function, iterate up to [`MAX_ITERATIONS`]
/// times, stopping as soon as one full iteration changes nothing.
pub fn run_fixed_point(module: &mut Module) -> OptimizerStats {
    let start = Instant::now();
    let mut stats = OptimizerStats::default();

    let mut constant_fold = ConstantFold::new();
    let mut copy_propagation = CopyPropagation::new();
    let mut strength_reduction = StrengthReduction::new();
    let mut cse = CommonSubexpressionElimination::new();
    let mut dce = DeadCodeElimination::new();
    let mut cfg_simplify = CfgSimplify::new();

    for function in &mut module.functions {
        stats.functions_processed += 1;
        for _ in 0..MAX_ITERATIONS {
            stats.total_iterations += 1;
            let mut changed = false;

            if constant_fold.run(function) {
                stats.counts.constant_fold += 1;
                changed = true;
            }
            if copy_propagation.run(function) {
                stats.counts.copy_propagation += 1;
                changed = true;
            }
            if strength_reduction.run(function) {
                stats.counts.strength_reduction += 1;
                changed = true;
            }
            if cse.run(function) {
                stats.counts.common_subexpression += 1;
                changed = true;
            }
            if dce.run(function) {
                stats.counts.dead_code += 1;
                changed = true;
            }
            if cfg_simplify.run(function) {
                stats.counts.cfg_simplify += 1;
                changed = true;
            }

            if !changed {
                break;
            }
        }
    }

    stats.elapsed = start.elapsed();
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{IrBuilder, Opcode};
    use crate::typeck::{IntKind, Type};

    #[test]
    fn fixed_point_converges_within_max_iterations() {
        let mut b = IrBuilder::new();
        b.function_create("f", Type::Int(IntKind::Int32));
        let entry = b.block_create();
        b.block_set_current(entry);
        let sum = b.add(b.imm(2.0), b.imm(3.0), 1);
        b.return_(sum, 1);
        let mut module = b.module;

        let stats = run_fixed_point(&mut module);
        assert_eq!(stats.functions_processed, 1);
        assert!(stats.total_iterations <= MAX_ITERATIONS);

        let f = &module.functions[0];
        let block = f.blocks.get(entry);
        let ret = block.instructions.last().unwrap();
        assert_eq!(ret.opcode, Opcode::Return);
        assert_eq!(ret.left, crate::ir::Value::Immediate(5.0));
    }
}
