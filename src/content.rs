//! Host content catalog as seen by the gate.

use crate::protocol::models::ContentId;
use dashmap::DashMap;

/// What the gate needs to know about a content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentMeta {
    /// Content id.
    pub id: ContentId,
    /// Content type, e.g. `post` or `page`.
    pub content_type: String,
    /// Whether the item is published.
    pub published: bool,
    /// Category ids.
    pub categories: Vec<u64>,
    /// Tag ids.
    pub tags: Vec<u64>,
    /// Per-item override switching protection off.
    pub protection_disabled: bool,
    /// Stored excerpt, used for teaser previews.
    pub excerpt: String,
}

impl ContentMeta {
    /// A published item of the given type with no taxonomy.
    pub fn new(id: ContentId, content_type: impl Into<String>) -> Self {
        Self {
            id,
            content_type: content_type.into(),
            published: true,
            categories: Vec::new(),
            tags: Vec::new(),
            protection_disabled: false,
            excerpt: String::new(),
        }
    }

    /// Set category ids.
    pub fn with_categories(mut self, categories: &[u64]) -> Self {
        self.categories = categories.to_vec();
        self
    }

    /// Set tag ids.
    pub fn with_tags(mut self, tags: &[u64]) -> Self {
        self.tags = tags.to_vec();
        self
    }

    /// Set the excerpt.
    pub fn with_excerpt(mut self, excerpt: impl Into<String>) -> Self {
        self.excerpt = excerpt.into();
        self
    }

    /// Mark as not published.
    pub fn unpublished(mut self) -> Self {
        self.published = false;
        self
    }

    /// Switch protection off for this item.
    pub fn without_protection(mut self) -> Self {
        self.protection_disabled = true;
        self
    }
}

/// Lookup of content items, implemented by the host.
pub trait ContentCatalog: Send + Sync {
    /// Metadata for a content id, if it exists.
    fn get(&self, id: ContentId) -> Option<ContentMeta>;
}

/// In-memory catalog.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    items: DashMap<ContentId, ContentMeta>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item.
    pub fn insert(&self, meta: ContentMeta) {
        self.items.insert(meta.id, meta);
    }

    /// Remove an item.
    pub fn remove(&self, id: ContentId) -> Option<ContentMeta> {
        self.items.remove(&id).map(|(_, meta)| meta)
    }
}

impl ContentCatalog for MemoryCatalog {
    fn get(&self, id: ContentId) -> Option<ContentMeta> {
        self.items.get(&id).map(|m| m.value().clone())
    }
}
