//! Knowledge base - a small, static catalog of platform guidance.
//!
//! Loaded once at start-up (built-in or from a JSON file) and never mutated
//! afterwards, so it is shared across requests behind an `Arc` without locking.

mod catalog;
pub mod retriever;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use crate::search::normalizer::normalize;

pub use retriever::{ScoredItem, MAX_RESULTS};

static BUILTIN: LazyLock<Arc<KnowledgeBase>> =
    LazyLock::new(|| Arc::new(KnowledgeBase::builtin()));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: String,
    pub category: String,
    pub keywords: Vec<String>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    items: Vec<KnowledgeItem>,
}

impl KnowledgeBase {
    /// Build a catalog, normalizing and de-duplicating keywords. Item order is
    /// kept: it breaks ties during retrieval.
    pub fn new(items: Vec<KnowledgeItem>) -> Result<Self> {
        let mut seen = HashSet::new();
        let mut normalized = Vec::with_capacity(items.len());

        for mut item in items {
            if item.id.trim().is_empty() {
                bail!("knowledge item with empty id");
            }
            if !seen.insert(item.id.clone()) {
                bail!("duplicate knowledge item id: {}", item.id);
            }
            let mut keywords: Vec<String> = Vec::with_capacity(item.keywords.len());
            for kw in item.keywords.iter().map(|k| normalize(k)) {
                if !kw.is_empty() && !keywords.contains(&kw) {
                    keywords.push(kw);
                }
            }
            item.keywords = keywords;
            normalized.push(item);
        }

        Ok(Self { items: normalized })
    }

    pub fn builtin() -> Self {
        let items = catalog::BUILTIN_ITEMS
            .iter()
            .map(|(id, category, keywords, content)| KnowledgeItem {
                id: id.to_string(),
                category: category.to_string(),
                keywords: keywords.iter().map(|k| k.to_string()).collect(),
                content: content.to_string(),
            })
            .collect();
        Self::new(items).unwrap_or_else(|e| {
            tracing::error!(error = %e, "Built-in knowledge catalog is invalid");
            Self { items: Vec::new() }
        })
    }

    /// Process-wide built-in catalog.
    pub fn shared_builtin() -> Arc<Self> {
        BUILTIN.clone()
    }

    /// Load a catalog from a JSON array of items.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read knowledge catalog {}", path.display()))?;
        let items: Vec<KnowledgeItem> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse knowledge catalog {}", path.display()))?;
        let kb = Self::new(items)?;
        tracing::info!(path = %path.display(), items = kb.len(), "Loaded knowledge catalog");
        Ok(kb)
    }

    pub fn items(&self) -> &[KnowledgeItem] {
        &self.items
    }

    pub fn get(&self, id: &str) -> Option<&KnowledgeItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, keywords: &[&str]) -> KnowledgeItem {
        KnowledgeItem {
            id: id.to_string(),
            category: "test".to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            content: format!("content of {}", id),
        }
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let kb = KnowledgeBase::builtin();
        assert!(kb.len() >= 10);
        assert!(kb.get("booking-cancel").is_some());
        for item in kb.items() {
            assert!(!item.keywords.is_empty(), "{} has no keywords", item.id);
        }
    }

    #[test]
    fn test_keywords_are_normalized_and_deduplicated() {
        let kb = KnowledgeBase::new(vec![item("a", &["Huy Lich", "hủy lịch", "  CANCEL "])]).unwrap();
        assert_eq!(kb.items()[0].keywords, vec!["hủy lịch", "cancel"]);
    }

    #[test]
    fn test_rejects_duplicate_ids() {
        assert!(KnowledgeBase::new(vec![item("a", &["x"]), item("a", &["y"])]).is_err());
        assert!(KnowledgeBase::new(vec![item(" ", &["x"])]).is_err());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("kb-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"[{"id":"x","category":"c","keywords":["Gia Su"],"content":"hello"}]"#,
        )
        .unwrap();
        let kb = KnowledgeBase::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(kb.items()[0].keywords, vec!["gia sư"]);
    }
}
