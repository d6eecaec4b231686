//! Read-only repository operations.

use serde::Serialize;
use strsim::{jaro_winkler, normalized_levenshtein};

use super::CatalogRepository;
use crate::inheritance::resolve_with;
use crate::models::{CatalogItem, CatalogStats, IntegrityIssue, SearchQuery};

/// Minimum similarity for a name to be offered as a suggestion.
const MIN_SUGGESTION_SCORE: f64 = 0.75;

/// "Did you mean" candidate for a search that found nothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Suggestion {
    pub id: String,
    pub name: String,
    pub score: f64,
}

impl CatalogRepository {
    /// Search effective views. Results keep stored order.
    pub fn search(&self, query: &SearchQuery) -> Vec<CatalogItem> {
        let arena = self.load_arena();
        arena
            .iter()
            .filter(|item| query.include_variants || !item.is_variant)
            .map(|item| resolve_with(item, |id| arena.get(id)).into_item())
            .filter(|item| query.matches(item))
            .collect()
    }

    /// Active items whose name is close to `text`, best first.
    pub fn suggest(&self, text: &str, limit: usize) -> Vec<Suggestion> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let arena = self.load_arena();
        let mut suggestions: Vec<Suggestion> = arena
            .iter()
            .filter(|item| item.is_active)
            .filter_map(|item| {
                let name = item.name.to_lowercase();
                let score = jaro_winkler(&needle, &name).max(normalized_levenshtein(&needle, &name));
                (score >= MIN_SUGGESTION_SCORE).then(|| Suggestion {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    score,
                })
            })
            .collect();

        suggestions.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        suggestions.truncate(limit);
        suggestions
    }

    /// Dashboard counters.
    pub fn stats(&self) -> CatalogStats {
        let arena = self.load_arena();
        let mut stats = CatalogStats {
            total: arena.len(),
            ..Default::default()
        };

        for item in arena.iter() {
            if item.is_active {
                stats.active += 1;
            } else {
                stats.inactive += 1;
            }
            if item.is_family {
                stats.families += 1;
            }
            if item.is_variant {
                stats.variants += 1;
                if resolve_with(item, |id| arena.get(id)).is_orphaned() {
                    stats.orphaned += 1;
                }
            }
            if item.is_standalone() {
                stats.standalone += 1;
            }
            *stats.by_type.entry(item.item_type).or_insert(0) += 1;
        }
        stats
    }

    /// Scan the stored collection for broken family/variant links.
    pub fn check_integrity(&self) -> Vec<IntegrityIssue> {
        let arena = self.load_arena();
        let mut issues: Vec<IntegrityIssue> = arena
            .duplicate_ids()
            .into_iter()
            .map(|id| IntegrityIssue::DuplicateId { id })
            .collect();

        for item in arena.iter() {
            if item.is_family && item.is_variant {
                issues.push(IntegrityIssue::ConflictingFlags { id: item.id.clone() });
            }

            if item.is_variant {
                let family = item
                    .parent_id
                    .as_deref()
                    .and_then(|id| arena.get(id))
                    .filter(|family| family.is_family);
                match family {
                    None => issues.push(IntegrityIssue::OrphanedVariant {
                        id: item.id.clone(),
                        parent_id: item.parent_id.clone(),
                    }),
                    Some(family) if !family.has_variant(&item.id) => {
                        issues.push(IntegrityIssue::UnlistedVariant {
                            family_id: family.id.clone(),
                            variant_id: item.id.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }

            if item.is_family {
                for variant_id in &item.variants {
                    let points_back = arena.get(variant_id).map_or(false, |v| {
                        v.is_variant && v.parent_id.as_deref() == Some(item.id.as_str())
                    });
                    if !points_back {
                        issues.push(IntegrityIssue::DanglingVariantLink {
                            family_id: item.id.clone(),
                            variant_id: variant_id.clone(),
                        });
                    }
                }
            }
        }

        if !issues.is_empty() {
            tracing::warn!(count = issues.len(), "catalog integrity issues found");
        }
        issues
    }
}
