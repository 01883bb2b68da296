//! Source attribution by content category.
//!
//! Each category carries a fixed list of trusted reference outlets. The
//! workflow's source-attribution stage merges this list with whatever
//! sources the evaluators themselves cited.

use std::collections::BTreeSet;

use crosscheck_core::ContentCategory;

/// Trusted reference sources for a content category.
pub fn trusted_sources(category: ContentCategory) -> &'static [&'static str] {
    match category {
        ContentCategory::Health => &["WHO", "CDC", "PubMed"],
        ContentCategory::Politics => &["Reuters", "AP", "Government"],
        ContentCategory::General => &["Snopes", "FactCheck.org"],
    }
}

/// Merge trusted sources for a category with evaluator-cited sources.
pub fn attribute_sources(
    category: ContentCategory,
    cited: &BTreeSet<String>,
) -> BTreeSet<String> {
    let mut sources: BTreeSet<String> = trusted_sources(category)
        .iter()
        .map(|s| s.to_string())
        .collect();
    sources.extend(cited.iter().cloned());
    sources
}
