//! WordPress REST payloads and their normalized forms.

use serde::{Deserialize, Serialize};

/// A `{ "rendered": "..." }` field as WordPress returns it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

/// A post exactly as `/wp/v2/posts?_embed` returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPost {
    pub id: u64,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: Rendered,
    #[serde(default)]
    pub excerpt: Rendered,
    #[serde(default)]
    pub content: Rendered,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub categories: Vec<u64>,
    #[serde(default)]
    pub featured_media: u64,
    #[serde(default)]
    pub author: u64,
    #[serde(rename = "_embedded", default)]
    pub embedded: Option<Embedded>,
}

/// The `_embedded` block pulled in by `_embed`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Embedded {
    /// Term groups. The first group holds the post's categories.
    #[serde(rename = "wp:term", default)]
    pub terms: Vec<Vec<EmbeddedTerm>>,
    #[serde(rename = "wp:featuredmedia", default)]
    pub featured_media: Vec<EmbeddedMedia>,
    #[serde(default)]
    pub author: Vec<EmbeddedAuthor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedTerm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

// Media and author entries can be error objects when the viewer lacks
// permission, so every field is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedMedia {
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddedAuthor {
    pub name: Option<String>,
}

/// A normalized WordPress article.
///
/// Only [`RawPost`] can produce one, so the derived category arrays are
/// always populated exactly once per fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: u64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub date: String,
    pub link: String,
    pub categories: Vec<u64>,
    pub categories_names: Vec<String>,
    pub categories_slugs: Vec<String>,
    pub featured_media: u64,
    pub author: u64,
    pub featured_image_url: Option<String>,
    pub author_name: Option<String>,
}

impl From<RawPost> for Post {
    fn from(raw: RawPost) -> Self {
        let embedded = raw.embedded.unwrap_or_default();

        let (categories_names, categories_slugs) = embedded
            .terms
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|term| (term.name, term.slug))
            .unzip();

        let featured_image_url = embedded
            .featured_media
            .into_iter()
            .next()
            .and_then(|m| m.source_url)
            .filter(|u| !u.is_empty());

        let author_name = embedded
            .author
            .into_iter()
            .next()
            .and_then(|a| a.name)
            .filter(|n| !n.is_empty());

        Self {
            id: raw.id,
            slug: raw.slug,
            title: raw.title.rendered,
            excerpt: raw.excerpt.rendered,
            content: raw.content.rendered,
            date: raw.date,
            link: raw.link,
            categories: raw.categories,
            categories_names,
            categories_slugs,
            featured_media: raw.featured_media,
            author: raw.author,
            featured_image_url,
            author_name,
        }
    }
}

/// A WordPress category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub count: u64,
}

/// Result of a full-text search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults {
    pub posts: Vec<Post>,
    pub total: u64,
    pub total_pages: u64,
}
