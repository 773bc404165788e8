//! Candidate selection and ordering.

use std::cmp::Ordering;
use std::collections::HashSet;

use atlas_catalog::{CatalogEntity, MediaCheck};

use crate::options::{CandidateOrder, SelectionPolicy, SelectionScope};

/// Pick the entities to reconcile, ordered by `policy`, at most `limit`.
///
/// Pure. Duplicate ids keep their first occurrence, so no entity is handed
/// to two workers in one pass.
pub fn select_candidates(
    entities: &[CatalogEntity],
    policy: &SelectionPolicy,
    check: &MediaCheck,
    limit: Option<usize>,
) -> Vec<CatalogEntity> {
    let mut seen = HashSet::new();
    let mut selected: Vec<CatalogEntity> = entities
        .iter()
        .filter(|e| seen.insert(e.id.as_str()))
        .filter(|e| match policy.scope {
            SelectionScope::All => true,
            SelectionScope::NeedsMedia => check.classify(e.media_url()).needs_reconciliation(),
        })
        .cloned()
        .collect();

    match policy.order {
        CandidateOrder::FeaturedFirst => {
            let featured: Vec<String> = policy
                .featured
                .iter()
                .map(|f| f.trim().to_lowercase())
                .filter(|f| !f.is_empty())
                .collect();
            selected.sort_by(|a, b| {
                let ra = featured_rank(&a.name, &featured);
                let rb = featured_rank(&b.name, &featured);
                match (ra, rb) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
                .then_with(|| by_name(a, b))
            });
        }
        CandidateOrder::Alphabetical => selected.sort_by(by_name),
        CandidateOrder::StalestFirst => selected.sort_by(|a, b| {
            // None (never updated) sorts before any timestamp.
            a.media_updated_at
                .cmp(&b.media_updated_at)
                .then_with(|| by_name(a, b))
        }),
    }

    if let Some(limit) = limit {
        selected.truncate(limit);
    }
    selected
}

/// Position of the first featured entry matching `name`.
fn featured_rank(name: &str, featured: &[String]) -> Option<usize> {
    let name = name.trim().to_lowercase();
    featured
        .iter()
        .position(|f| name == *f || name.contains(f.as_str()))
}

fn by_name(a: &CatalogEntity, b: &CatalogEntity) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}

#[cfg(test)]
#[path = "tests/selector_tests.rs"]
mod tests;
