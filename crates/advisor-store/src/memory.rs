//! In-Memory Stores
//!
//! For development and tests. Same upsert semantics as the MongoDB
//! implementations: one document per key, full overwrite.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;
use crate::records::{NewsArticle, PortfolioRecord, ProfileRecord, UserId};
use crate::{NewsStore, PortfolioStore, ProfileStore};

/// In-memory portfolio table
#[derive(Default)]
pub struct MemoryPortfolioStore {
    records: RwLock<HashMap<UserId, PortfolioRecord>>,
}

impl MemoryPortfolioStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored portfolios (test helper)
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PortfolioStore for MemoryPortfolioStore {
    async fn upsert(&self, record: &PortfolioRecord) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .insert(record.user_id, record.clone());
        Ok(())
    }

    async fn find(&self, user_id: UserId) -> Result<Option<PortfolioRecord>> {
        Ok(self.records.read().unwrap().get(&user_id).cloned())
    }
}

/// In-memory profile table
#[derive(Default)]
pub struct MemoryProfileStore {
    records: RwLock<HashMap<UserId, ProfileRecord>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn upsert(&self, record: &ProfileRecord) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .insert(record.user_id, record.clone());
        Ok(())
    }

    async fn find(&self, user_id: UserId) -> Result<Option<ProfileRecord>> {
        Ok(self.records.read().unwrap().get(&user_id).cloned())
    }
}

/// In-memory news table keyed by URL
#[derive(Default)]
pub struct MemoryNewsStore {
    articles: RwLock<HashMap<String, NewsArticle>>,
}

impl MemoryNewsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.articles.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl NewsStore for MemoryNewsStore {
    async fn insert_if_new(&self, article: &NewsArticle) -> Result<bool> {
        let mut articles = self.articles.write().unwrap();
        if articles.contains_key(&article.url) {
            return Ok(false);
        }
        articles.insert(article.url.clone(), article.clone());
        Ok(true)
    }
}
