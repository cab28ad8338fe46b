//! RFC 6241 §6 subtree filtering.
//!
//! A filter is a partial tree describing which parts of a data tree the
//! peer wants back. Both trees share the abstract [`Node`] shape, and the
//! algorithm is a recursive walk over sibling lists:
//!
//! - a filter node with children is a *containment* node — a matching
//!   data node is included shallowly and its subtree re-filtered;
//! - a filter leaf with a value is a *content match* — the data leaf must
//!   carry the same text, and a mismatch excludes the whole containing
//!   branch (this is how list entries are selected by key);
//! - a filter leaf without a value *selects* the named node with its
//!   entire subtree;
//! - filter attributes act as selectors that must all be present with
//!   equal values on the data node.
//!
//! Value comparison is exact string equality on trimmed text. There is no
//! YANG-type canonicalization (`10` does not match `010`, `true` does not
//! match `1`); schema-aware comparison belongs to the data layer above.
//!
//! Filtering is pure and CPU-only: no I/O, no partial output on error.

use crate::error::{NetconfError, Result};
use crate::xml::Node;

/// Outcome of matching one data node against one filter node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchOutcome {
    /// Names differ, or an attribute selector failed.
    NoMatch,
    /// Names (and any attribute selectors) agree; recurse.
    TagMatch,
    /// Content-match leaf with equal value.
    ContentMatch,
    /// Content-match leaf with differing value; poisons the branch.
    ContentMismatch,
}

/// Apply a subtree filter to an rpc-reply data tree.
///
/// `filter` and `data` are the respective container elements (e.g.
/// `<filter>` and `<data>`); their own names are not matched. The result
/// carries `data`'s root with the minimal matching projection beneath it,
/// preserving the data tree's sibling order. An empty filter (no
/// children, attributes or value) selects everything.
pub fn apply_rpc_filter(filter: &Node, data: &Node) -> Result<Node> {
    validate_filter(filter)?;

    if filter.is_bare() {
        return Ok(data.clone());
    }

    let mut result = shallow(data);
    for data_child in &data.children {
        for filter_child in &filter.children {
            add_subtree(filter_child, data_child, &mut result);
        }
    }
    Ok(result)
}

/// Apply a subtree filter to a notification body.
///
/// The filter's children are matched against the single top-level body
/// element. An empty filter delivers the body unfiltered; `Ok(None)` is
/// the explicit nothing-matched marker, distinct from any error.
pub fn apply_notification_filter(filter: &Node, body: &Node) -> Result<Option<Node>> {
    validate_filter(filter)?;

    if filter.is_bare() {
        return Ok(Some(body.clone()));
    }

    let mut scratch = Node::new(body.name.clone());
    for filter_child in &filter.children {
        add_subtree(filter_child, body, &mut scratch);
    }
    Ok(scratch.children.into_iter().next())
}

/// Reject structurally invalid filter trees before any recursion.
///
/// A content-match leaf may not have children, and mixing a value with
/// attribute selectors on one node is undefined in RFC 6241 — both are
/// caller errors, not wire conditions.
fn validate_filter(node: &Node) -> Result<()> {
    if node.value.is_some() && !node.children.is_empty() {
        return Err(NetconfError::FilterValidation(format!(
            "content-match node {} must not have children",
            node.name
        )));
    }
    if node.value.is_some() && !node.attributes.is_empty() {
        return Err(NetconfError::FilterValidation(format!(
            "node {} mixes a content match with attribute selectors",
            node.name
        )));
    }
    for child in &node.children {
        validate_filter(child)?;
    }
    Ok(())
}

fn shallow(node: &Node) -> Node {
    Node {
        name: node.name.clone(),
        attributes: node.attributes.clone(),
        value: node.value.clone(),
        children: Vec::new(),
    }
}

/// Recursive step: match `src` against `filter` and, on success, append
/// the projected copy to `dst_parent`.
fn add_subtree(filter: &Node, src: &Node, dst_parent: &mut Node) -> MatchOutcome {
    let outcome = matches(src, filter);
    if outcome == MatchOutcome::NoMatch || outcome == MatchOutcome::ContentMismatch {
        return outcome;
    }

    let filter_has_children = !filter.children.is_empty();
    // a filter leaf selects the data node to full depth
    let mut copied = if filter_has_children {
        shallow(src)
    } else {
        src.clone()
    };
    let mut should_append = !filter_has_children;

    if filter_has_children {
        let mut content_matching = 0usize;
        for src_child in &src.children {
            for filter_child in &filter.children {
                let child_outcome = add_subtree(filter_child, src_child, &mut copied);
                if child_outcome == MatchOutcome::ContentMismatch {
                    // a failed content match excludes the whole branch
                    return MatchOutcome::NoMatch;
                }
                if child_outcome == MatchOutcome::ContentMatch {
                    content_matching += 1;
                }
                should_append |= child_outcome != MatchOutcome::NoMatch;
            }
        }
        // when every filter child is a content match, the entry is
        // selected as a whole: include it to full depth
        if content_matching == filter.children.len() {
            copied = src.clone();
        }
    }

    if should_append {
        dst_parent.children.push(copied);
    }
    outcome
}

/// Shallow comparison of one data node against one filter node: names
/// must agree, then content, then attribute selectors.
fn matches(src: &Node, filter: &Node) -> MatchOutcome {
    if src.name != filter.name {
        return MatchOutcome::NoMatch;
    }

    if let Some(wanted) = filter.text() {
        return if src.text() == Some(wanted) {
            MatchOutcome::ContentMatch
        } else {
            MatchOutcome::ContentMismatch
        };
    }

    if !filter.attributes.is_empty() {
        for selector in &filter.attributes {
            let found = src
                .attributes
                .iter()
                .find(|a| a.name == selector.name)
                .map(|a| a.value.as_str());
            if found != Some(selector.value.as_str()) {
                return MatchOutcome::NoMatch;
            }
        }
    }
    MatchOutcome::TagMatch
}
