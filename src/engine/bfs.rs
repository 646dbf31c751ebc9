//! Breadth-first traversal policy.
//!
//! Keeps each level covered before descending: sibling generation is driven
//! by the parent's uncovered aspects, lateral moves keep early levels broad,
//! and a rebalancing scan grows under-covered depth-2 branches before the
//! engine gives up on a level.

use std::collections::BTreeSet;

use tracing::debug;

use super::{
    answer_aspects, next_unanswered_sibling, TraversalContext, TraversalEngine,
    INNER_SIBLING_CAP, TOP_LEVEL_SIBLING_CAP,
};
use crate::error::{AppError, AppResult};
use crate::topics::{
    desired_child_count, extract_aspects, extract_topics, MAX_ASPECTS_PER_NODE,
};
use crate::tree::QuestionTree;

/// Advance breadth-first from the just-answered node.
pub(crate) async fn advance(
    engine: &TraversalEngine,
    tree: &mut QuestionTree,
    ctx: &mut TraversalContext,
    answered_id: &str,
) -> AppResult<Option<String>> {
    let depth = tree
        .depth_of(answered_id)
        .ok_or_else(|| AppError::invariant(format!("unknown answered node: {}", answered_id)))?;
    let parent = tree
        .parent_of(answered_id)
        .ok_or_else(|| AppError::invariant(format!("answered node has no parent: {}", answered_id)))?;
    let parent_id = parent.id.clone();
    let sibling_count = parent.children.len();
    let parent_is_root = parent_id == tree.root_id();

    // The complete set of aspects this level should cover. The root has no
    // answer, so the top level covers the design prompt itself.
    let level_aspects: Vec<String> = if parent_is_root {
        extract_aspects(engine.design_prompt())
    } else {
        answer_aspects(parent)
    };
    let uncovered = uncovered_aspects(tree, &parent_id, &level_aspects);

    // A lone top-level question means the level was never seeded: grow it
    // before anything else.
    if parent_is_root && sibling_count == 1 {
        let seed = (!level_aspects.is_empty()).then(|| level_aspects.clone());
        if let Some(first) = engine.request_children(tree, ctx, &parent_id, seed).await? {
            return Ok(Some(first));
        }
    }

    // At depth 2, once the owning depth-1 ancestor has enough children,
    // move laterally to a depth-1 node that still needs children. This keeps
    // the tree broad before it gets deep.
    if depth == 2 && !parent_is_root {
        let ancestor_need = level_aspects.len().min(MAX_ASPECTS_PER_NODE);
        if sibling_count >= ancestor_need {
            if let Some(next) = grow_needy_at_depth(engine, tree, ctx, 1, &parent_id).await? {
                return Ok(Some(next));
            }
        }
    }

    // A materialized, unanswered next sibling needs no oracle call.
    if let Some(sibling) = next_unanswered_sibling(tree, answered_id) {
        debug!(sibling = %sibling, "Visiting materialized sibling");
        return Ok(Some(sibling));
    }

    // Grow this level while aspects remain uncovered and the level cap
    // allows.
    let cap = if depth == 1 {
        TOP_LEVEL_SIBLING_CAP
    } else {
        INNER_SIBLING_CAP
    };
    if !uncovered.is_empty() && sibling_count < cap {
        if let Some(first) = engine
            .request_children(tree, ctx, &parent_id, Some(uncovered))
            .await?
        {
            return Ok(Some(first));
        }
    }

    // Deep in the tree with no local progress: rebalance coverage across
    // branches by growing a depth-2 node whose answer mentioned more aspects
    // than it has children.
    if depth >= 3 {
        if let Some(next) = grow_needy_at_depth(engine, tree, ctx, 2, "").await? {
            return Ok(Some(next));
        }
    }

    // The level cannot widen further: descend by growing children under the
    // first node at this depth whose answer still deserves follow-ups.
    if let Some(next) = grow_needy_at_depth(engine, tree, ctx, depth, "").await? {
        return Ok(Some(next));
    }

    // Level complete: every node answered with enough children. Move to the
    // next depth before falling back to fresh top-level questions.
    if level_complete(tree, depth) {
        let next_level: Vec<(String, bool)> = tree
            .nodes_at_depth(depth + 1)
            .iter()
            .map(|n| (n.id.clone(), n.is_answered()))
            .collect();

        if let Some((id, _)) = next_level.iter().find(|(_, answered)| !answered) {
            debug!(node = %id, "Descending to unanswered node at next depth");
            return Ok(Some(id.clone()));
        }
        for (id, _) in &next_level {
            if let Some(next) = grow_if_needy(engine, tree, ctx, id).await? {
                return Ok(Some(next));
            }
        }
    }

    engine.request_top_level(tree, ctx).await
}

/// Aspects of the level that no answered sibling has touched yet.
///
/// An aspect counts as covered when its topic labels intersect the combined
/// topics of any answered child of `parent_id`; an aspect with no
/// recognizable topics stays uncovered.
fn uncovered_aspects(tree: &QuestionTree, parent_id: &str, aspects: &[String]) -> Vec<String> {
    let Some(parent) = tree.find(parent_id) else {
        return aspects.to_vec();
    };

    let mut covered_topics: BTreeSet<String> = BTreeSet::new();
    for child in parent.children.iter().filter(|c| c.is_answered()) {
        covered_topics.extend(extract_topics(&child.question));
        if let Some(answer) = &child.answer {
            covered_topics.extend(extract_topics(answer));
        }
    }

    aspects
        .iter()
        .filter(|aspect| {
            let aspect_topics = extract_topics(aspect);
            aspect_topics.is_empty() || aspect_topics.is_disjoint(&covered_topics)
        })
        .cloned()
        .collect()
}

/// Whether every node at `depth` is answered and has as many children as
/// its answer deserves.
fn level_complete(tree: &QuestionTree, depth: usize) -> bool {
    tree.nodes_at_depth(depth).iter().all(|n| {
        n.is_answered()
            && n.children.len()
                >= n.answer.as_deref().map(desired_child_count).unwrap_or(0)
    })
}

/// Find an answered node at `depth` (other than `skip_id`) whose answer
/// mentioned more aspects than it has children, and grow it.
async fn grow_needy_at_depth(
    engine: &TraversalEngine,
    tree: &mut QuestionTree,
    ctx: &mut TraversalContext,
    depth: usize,
    skip_id: &str,
) -> AppResult<Option<String>> {
    let candidates: Vec<String> = tree
        .nodes_at_depth(depth)
        .iter()
        .filter(|n| n.id != skip_id)
        .map(|n| n.id.clone())
        .collect();

    for id in candidates {
        if let Some(next) = grow_if_needy(engine, tree, ctx, &id).await? {
            debug!(node = %id, depth, "Rebalancing: growing under-covered node");
            return Ok(Some(next));
        }
    }
    Ok(None)
}

/// Grow `id` with new children if its answer deserves more than it has.
async fn grow_if_needy(
    engine: &TraversalEngine,
    tree: &mut QuestionTree,
    ctx: &mut TraversalContext,
    id: &str,
) -> AppResult<Option<String>> {
    let Some(node) = tree.find(id) else {
        return Ok(None);
    };
    if !node.is_answered() {
        return Ok(None);
    }
    let deserved = node.answer.as_deref().map(desired_child_count).unwrap_or(0);
    if node.children.len() >= deserved {
        return Ok(None);
    }

    let aspects = answer_aspects(node);
    let uncovered = uncovered_aspects(tree, id, &aspects);
    let seed = (!uncovered.is_empty()).then_some(uncovered);
    engine.request_children(tree, ctx, id, seed).await
}
