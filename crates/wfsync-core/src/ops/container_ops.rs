//! Loop and parallel descriptor regeneration
//!
//! `WorkflowState::loops` and `WorkflowState::parallels` are derived from the
//! container blocks and their children. They are rebuilt only by operations
//! that can change container membership; edge edits and unrelated block
//! edits never touch them.

use std::collections::BTreeMap;

use crate::model::{BlockType, Loop, LoopType, Parallel, ParallelType, WorkflowState};

/// Iteration count used when a loop block does not configure one
pub const DEFAULT_LOOP_ITERATIONS: u32 = 5;

/// Branch count used when a count-parallel block does not configure one
pub const DEFAULT_PARALLEL_COUNT: u32 = 5;

/// Rebuild the loop descriptors from loop blocks and their direct children
pub fn regenerate_loops(state: &mut WorkflowState) {
    let mut loops = BTreeMap::new();

    for block in state.blocks.values() {
        if block.block_type != BlockType::Loop {
            continue;
        }

        let data = block.data.clone().unwrap_or_default();
        let loop_type = data.loop_type.unwrap_or_default();
        let for_each_items = match loop_type {
            LoopType::ForEach => data.collection.clone(),
            _ => None,
        };
        let while_condition = match loop_type {
            LoopType::While | LoopType::DoWhile => data.while_condition.clone(),
            _ => None,
        };

        loops.insert(
            block.id.clone(),
            Loop {
                id: block.id.clone(),
                nodes: state.children_of(&block.id),
                iterations: data.count.unwrap_or(DEFAULT_LOOP_ITERATIONS),
                loop_type,
                for_each_items,
                while_condition,
            },
        );
    }

    tracing::debug!(loop_count = loops.len(), "regenerated loops");
    state.loops = loops;
}

/// Rebuild the parallel descriptors from parallel blocks and their direct children
pub fn regenerate_parallels(state: &mut WorkflowState) {
    let mut parallels = BTreeMap::new();

    for block in state.blocks.values() {
        if block.block_type != BlockType::Parallel {
            continue;
        }

        let data = block.data.clone().unwrap_or_default();
        let parallel_type = data.parallel_type.unwrap_or_default();
        let count = match parallel_type {
            ParallelType::Count => Some(data.count.unwrap_or(DEFAULT_PARALLEL_COUNT)),
            ParallelType::Collection => data.count,
        };

        parallels.insert(
            block.id.clone(),
            Parallel {
                id: block.id.clone(),
                nodes: state.children_of(&block.id),
                count,
                distribution: data.collection.clone(),
                parallel_type,
            },
        );
    }

    tracing::debug!(parallel_count = parallels.len(), "regenerated parallels");
    state.parallels = parallels;
}

/// Rebuild both descriptor maps
pub fn regenerate_containers(state: &mut WorkflowState) {
    regenerate_loops(state);
    regenerate_parallels(state);
}
