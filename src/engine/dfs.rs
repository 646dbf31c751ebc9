//! Depth-first traversal policy.
//!
//! Follows the current branch down until the depth bound, then backtracks:
//! next unanswered sibling first, oracle-generated siblings for lone
//! children, and finally a fresh top-level request seeded with the full
//! answered history.

use tracing::debug;

use super::{next_unanswered_sibling, TraversalContext, TraversalEngine};
use crate::error::{AppError, AppResult};
use crate::topics::extract_aspects;
use crate::tree::QuestionTree;

/// Advance depth-first from the just-answered node.
pub(crate) async fn advance(
    engine: &TraversalEngine,
    tree: &mut QuestionTree,
    ctx: &mut TraversalContext,
    answered_id: &str,
) -> AppResult<Option<String>> {
    let depth = tree
        .depth_of(answered_id)
        .ok_or_else(|| AppError::invariant(format!("unknown answered node: {}", answered_id)))?;

    if depth >= ctx.max_depth {
        debug!(depth, "Depth bound reached, backtracking");
        if let Some(next) = backtrack(engine, tree, ctx, answered_id).await? {
            return Ok(Some(next));
        }
        return engine.request_top_level(tree, ctx).await;
    }

    // Below the bound: ask for children of the answered node, seeding the
    // oracle with its answer's aspects as candidate subtopics.
    let aspects = tree
        .find(answered_id)
        .map(|n| n.answer.as_deref().map(extract_aspects).unwrap_or_default())
        .unwrap_or_default();
    let uncovered = (!aspects.is_empty()).then_some(aspects);

    if let Some(child) = engine
        .request_children(tree, ctx, answered_id, uncovered)
        .await?
    {
        return Ok(Some(child));
    }

    // No child produced (oracle stopped the branch or only duplicates):
    // fall through to sibling generation, then fresh top-level questions.
    debug!(node = %answered_id, "No child produced, falling back to backtracking");
    if let Some(next) = backtrack(engine, tree, ctx, answered_id).await? {
        return Ok(Some(next));
    }
    engine.request_top_level(tree, ctx).await
}

/// Walk upward from `from`, looking for the next node to visit.
///
/// At each level: an already-materialized unanswered sibling wins; a lone
/// child whose parent has its own parent triggers an oracle request for new
/// siblings, seeded with the parent's history and the parent's answer
/// aspects as uncovered aspects. Returns `None` when the walk reaches the
/// root without progress.
async fn backtrack(
    engine: &TraversalEngine,
    tree: &mut QuestionTree,
    ctx: &mut TraversalContext,
    from: &str,
) -> AppResult<Option<String>> {
    let mut current = from.to_string();

    loop {
        if let Some(sibling) = next_unanswered_sibling(tree, &current) {
            debug!(sibling = %sibling, "Backtracked to materialized sibling");
            return Ok(Some(sibling));
        }

        let Some(parent) = tree.parent_of(&current) else {
            return Ok(None);
        };
        let parent_id = parent.id.clone();
        let lone_child = parent.children.len() == 1;
        let has_grandparent = tree.parent_of(&parent_id).is_some();
        let parent_aspects = parent
            .answer
            .as_deref()
            .map(extract_aspects)
            .unwrap_or_default();

        if lone_child && has_grandparent {
            let uncovered = (!parent_aspects.is_empty()).then_some(parent_aspects);
            if let Some(sibling) = engine
                .request_children(tree, ctx, &parent_id, uncovered)
                .await?
            {
                debug!(sibling = %sibling, "Backtracking produced a new sibling");
                return Ok(Some(sibling));
            }
        }

        current = parent_id;
    }
}
