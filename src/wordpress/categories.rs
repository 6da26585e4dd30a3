//! Category slug resolution.
//!
//! WordPress category slugs are often accented or pluralized inconsistently,
//! so a lookup that misses on the exact slug falls back to a search and
//! matches candidates with diacritics and case folded away.

use tracing::debug;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::models::Category;
use super::WordPressClient;
use crate::upstream::{self, UpstreamError};

impl WordPressClient {
    /// Resolve a category slug to its numeric id.
    ///
    /// Tries an exact slug lookup first, then a search filtered through
    /// [`pick_category`]. `Ok(None)` means no category matched.
    ///
    /// # Errors
    ///
    /// Returns an error if either WordPress request fails.
    pub async fn resolve_category_id(&self, slug: &str) -> Result<Option<u64>, UpstreamError> {
        let exact = self.query_categories(&[("slug", slug)]).await?;
        if let Some(category) = exact.first() {
            debug!(slug = %slug, id = category.id, "Resolved category by exact slug");
            return Ok(Some(category.id));
        }

        let candidates = self.query_categories(&[("search", slug)]).await?;
        let resolved = pick_category(slug, &candidates).map(|c| c.id);
        debug!(
            slug = %slug,
            candidates = candidates.len(),
            id = ?resolved,
            "Resolved category by search"
        );
        Ok(resolved)
    }

    async fn query_categories(&self, filter: &[(&str, &str)]) -> Result<Vec<Category>, UpstreamError> {
        let request = self
            .http()
            .get(self.endpoint("categories"))
            .query(filter);
        upstream::send(self.http(), request).await?.json()
    }
}

/// Choose the best category for `query` among search candidates.
///
/// Preference order: normalized slug equal to the normalized query, then
/// normalized name containing it, then the first candidate.
#[must_use]
pub fn pick_category<'a>(query: &str, candidates: &'a [Category]) -> Option<&'a Category> {
    let needle = fold_diacritics(query);

    candidates
        .iter()
        .find(|c| fold_diacritics(&c.slug) == needle)
        .or_else(|| {
            candidates
                .iter()
                .find(|c| fold_diacritics(&c.name).contains(&needle))
        })
        .or_else(|| candidates.first())
}

/// Canonically decompose, strip combining marks, and lowercase.
#[must_use]
pub fn fold_diacritics(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}
