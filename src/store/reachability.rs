//! Reachability checks used to block cyclic moves.
//!
//! The walk ascends from the candidate towards the root, so it costs at most
//! the depth of the tree and never touches sibling subtrees.

/// Returns true when `candidate` is `ancestor` itself or lies anywhere below it.
///
/// `parent_of` yields the parent id of a node, or `None` at the root (or for an
/// unknown id). A walk longer than `max_hops` means the parent relation is
/// already corrupt; it is reported as reachable so callers refuse the move.
pub fn is_descendant_or_self<'a, F>(
    ancestor: &str,
    candidate: &'a str,
    max_hops: usize,
    parent_of: F,
) -> bool
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut current = candidate;
    for _ in 0..=max_hops {
        if current == ancestor {
            return true;
        }
        match parent_of(current) {
            Some(parent) => current = parent,
            None => return false,
        }
    }
    true
}
