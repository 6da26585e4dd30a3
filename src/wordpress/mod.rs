//! WordPress REST API client.
//!
//! Every fetch goes through [`upstream::send`] with the configured timeout,
//! and every post is normalized exactly once, on the way out of the raw
//! payload.

mod categories;
mod models;

use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

pub use categories::{fold_diacritics, pick_category};
pub use models::{Category, Post, RawPost, SearchResults};

use crate::cache::{tags, CacheSpec, Cached, ResourceKind};
use crate::config::{Config, MAX_PER_PAGE};
use crate::constants::CLIENT_USER_AGENT;
use crate::upstream::{self, UpstreamError};

/// Client for the `/wp/v2` endpoints of a WordPress site.
#[derive(Debug, Clone)]
pub struct WordPressClient {
    client: Client,
    base_url: String,
    cache: CacheSpec,
    default_per_page: u32,
    max_pages: u32,
}

impl WordPressClient {
    /// Create a client from the application configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.wordpress_timeout)
            .user_agent(CLIENT_USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: config.wordpress_api_url.clone(),
            cache: config.cache,
            default_per_page: config.default_per_page,
            max_pages: config.max_pages,
        })
    }

    #[must_use]
    pub const fn cache_spec(&self) -> &CacheSpec {
        &self.cache
    }

    fn http(&self) -> &Client {
        &self.client
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/wp/v2/{resource}", self.base_url)
    }

    /// Clamp paging inputs to values WordPress accepts.
    #[must_use]
    pub fn paging(&self, per_page: u32, page: u32) -> (u32, u32) {
        let per_page = match per_page {
            0 => self.default_per_page,
            n => n.min(MAX_PER_PAGE),
        };
        (per_page, page.max(1))
    }

    /// Fetch a page of posts, newest first, with any extra filters applied.
    async fn query_posts(
        &self,
        filter: &[(&str, String)],
        per_page: u32,
        page: u32,
    ) -> Result<(Vec<Post>, upstream::UpstreamResponse), UpstreamError> {
        let (per_page, page) = self.paging(per_page, page);

        let request = self
            .client
            .get(self.endpoint("posts"))
            .query(&[
                ("_embed", "true".to_string()),
                ("per_page", per_page.to_string()),
                ("page", page.to_string()),
                ("orderby", "date".to_string()),
                ("order", "desc".to_string()),
            ])
            .query(filter);

        let response = upstream::send(&self.client, request).await?;
        let raw: Vec<RawPost> = response.json()?;

        let mut posts: Vec<Post> = raw.into_iter().map(Post::from).collect();
        posts.truncate(per_page as usize);

        debug!(count = posts.len(), per_page, page, "Fetched posts");
        Ok((posts, response))
    }

    /// Fetch the latest posts.
    ///
    /// # Errors
    ///
    /// Returns an error on a non-2xx status, an empty body, a timeout, or an
    /// undecodable payload.
    pub async fn fetch_post_list(
        &self,
        per_page: u32,
        page: u32,
    ) -> Result<Cached<Vec<Post>>, UpstreamError> {
        let (posts, _) = self.query_posts(&[], per_page, page).await?;
        Ok(Cached::new(
            posts,
            ResourceKind::PostsList,
            &self.cache,
            vec![tags::POSTS.to_string()],
        ))
    }

    /// Fetch a single post by exact slug. An empty result is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request itself fails.
    pub async fn fetch_post_by_slug(&self, slug: &str) -> Result<Option<Cached<Post>>, UpstreamError> {
        let (posts, _) = self
            .query_posts(&[("slug", slug.to_string())], 1, 1)
            .await?;

        Ok(posts.into_iter().next().map(|post| {
            let tags = vec![tags::POSTS.to_string(), tags::post(&post.slug)];
            Cached::new(post, ResourceKind::Post, &self.cache, tags)
        }))
    }

    /// Fetch the latest posts in a category.
    ///
    /// Category cache tags are always keyed by slug, so a list fetched by raw
    /// id carries only the `posts` tag.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn fetch_posts_by_category_id(
        &self,
        category_id: u64,
        per_page: u32,
        page: u32,
    ) -> Result<Cached<Vec<Post>>, UpstreamError> {
        self.posts_in_category(category_id, per_page, page, vec![tags::POSTS.to_string()])
            .await
    }

    /// Fetch the latest posts in the category matching `slug`.
    ///
    /// A slug that does not resolve yields an empty list, the same as a
    /// category with no posts. Callers cannot tell the two apart.
    ///
    /// # Errors
    ///
    /// Returns an error only if the post request fails after the category
    /// resolved.
    pub async fn fetch_posts_by_category_slug(
        &self,
        slug: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Cached<Vec<Post>>, UpstreamError> {
        let category_tags = vec![tags::POSTS.to_string(), tags::category(slug)];

        match self.resolve_category_id(slug).await {
            Ok(Some(id)) => {
                self.posts_in_category(id, per_page, page, category_tags)
                    .await
            }
            Ok(None) => {
                debug!(slug = %slug, "Category slug did not resolve");
                Ok(Cached::new(
                    Vec::new(),
                    ResourceKind::PostsList,
                    &self.cache,
                    category_tags,
                ))
            }
            Err(e) => {
                warn!(slug = %slug, kind = e.kind(), "Category resolution failed: {e}");
                Ok(Cached::new(
                    Vec::new(),
                    ResourceKind::PostsList,
                    &self.cache,
                    category_tags,
                ))
            }
        }
    }

    async fn posts_in_category(
        &self,
        category_id: u64,
        per_page: u32,
        page: u32,
        tags: Vec<String>,
    ) -> Result<Cached<Vec<Post>>, UpstreamError> {
        let (posts, _) = self
            .query_posts(&[("categories", category_id.to_string())], per_page, page)
            .await?;
        Ok(Cached::new(posts, ResourceKind::PostsList, &self.cache, tags))
    }

    /// Full-text search. Search is best-effort: any failure is logged and
    /// returns empty results.
    pub async fn search_posts(&self, query: &str, per_page: u32, page: u32) -> SearchResults {
        match self
            .query_posts(&[("search", query.to_string())], per_page, page)
            .await
        {
            Ok((posts, response)) => {
                let total = response
                    .header_u64("x-wp-total")
                    .unwrap_or(posts.len() as u64);
                let total_pages = response
                    .header_u64("x-wp-totalpages")
                    .unwrap_or(u64::from(!posts.is_empty()));
                SearchResults {
                    posts,
                    total,
                    total_pages,
                }
            }
            Err(e) => {
                warn!(query = %query, kind = e.kind(), "Search failed: {e}");
                SearchResults::default()
            }
        }
    }

    /// Fetch the category listing used for site navigation, most used first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn fetch_categories(&self) -> Result<Cached<Vec<Category>>, UpstreamError> {
        let request = self.client.get(self.endpoint("categories")).query(&[
            ("per_page", MAX_PER_PAGE.to_string()),
            ("orderby", "count".to_string()),
            ("order", "desc".to_string()),
        ]);
        let categories: Vec<Category> = upstream::send(&self.client, request).await?.json()?;

        Ok(Cached::new(
            categories,
            ResourceKind::Categories,
            &self.cache,
            vec![tags::CATEGORIES.to_string()],
        ))
    }

    /// Page through every post, up to the configured page limit.
    ///
    /// Stops at the first short page, or when WordPress rejects a page past
    /// the end with HTTP 400.
    ///
    /// # Errors
    ///
    /// Returns an error if any page other than an out-of-range one fails.
    pub async fn fetch_all_posts(&self, per_page: u32) -> Result<Vec<Post>, UpstreamError> {
        let (per_page, _) = self.paging(per_page, 1);
        let mut all = Vec::new();

        for page in 1..=self.max_pages {
            let posts = match self.query_posts(&[], per_page, page).await {
                Ok((posts, _)) => posts,
                Err(e) if e.status() == Some(StatusCode::BAD_REQUEST) && page > 1 => break,
                Err(e) => return Err(e),
            };

            let short_page = posts.len() < per_page as usize;
            all.extend(posts);
            if short_page {
                break;
            }
        }

        debug!(count = all.len(), "Fetched all posts");
        Ok(all)
    }
}
