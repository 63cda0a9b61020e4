//! MongoDB Stores
//!
//! Production persistence. Portfolios and profiles are upserted keyed by
//! `user_id` (full overwrite, no history); news articles are inserted only
//! when their URL has not been seen.

use async_trait::async_trait;
use mongodb::bson::{doc, to_document};
use mongodb::{Client, Collection, Database};

use crate::error::Result;
use crate::records::{NewsArticle, PortfolioRecord, ProfileRecord, UserId};
use crate::{NewsStore, PortfolioStore, ProfileStore};

const PORTFOLIOS: &str = "portfolios";
const PROFILES: &str = "profiles";
const NEWS: &str = "news";

/// MongoDB-backed store serving all three collections
#[derive(Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connect to the given URI and select a database
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        let db = client.database(db_name);
        tracing::info!(db = db_name, "MongoDB client initialized");
        Ok(Self { db })
    }

    /// Round-trip a ping to verify the connection
    pub async fn ping(&self) -> Result<()> {
        self.db.run_command(doc! { "ping": 1 }).await?;
        Ok(())
    }

    fn portfolios(&self) -> Collection<PortfolioRecord> {
        self.db.collection(PORTFOLIOS)
    }

    fn profiles(&self) -> Collection<ProfileRecord> {
        self.db.collection(PROFILES)
    }

    fn news(&self) -> Collection<NewsArticle> {
        self.db.collection(NEWS)
    }
}

#[async_trait]
impl PortfolioStore for MongoStore {
    async fn upsert(&self, record: &PortfolioRecord) -> Result<()> {
        self.portfolios()
            .update_one(
                doc! { "user_id": record.user_id },
                doc! { "$set": to_document(record)? },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn find(&self, user_id: UserId) -> Result<Option<PortfolioRecord>> {
        Ok(self.portfolios().find_one(doc! { "user_id": user_id }).await?)
    }
}

#[async_trait]
impl ProfileStore for MongoStore {
    async fn upsert(&self, record: &ProfileRecord) -> Result<()> {
        self.profiles()
            .update_one(
                doc! { "user_id": record.user_id },
                doc! { "$set": to_document(record)? },
            )
            .upsert(true)
            .await?;
        Ok(())
    }

    async fn find(&self, user_id: UserId) -> Result<Option<ProfileRecord>> {
        Ok(self.profiles().find_one(doc! { "user_id": user_id }).await?)
    }
}

#[async_trait]
impl NewsStore for MongoStore {
    async fn insert_if_new(&self, article: &NewsArticle) -> Result<bool> {
        let existing = self
            .news()
            .find_one(doc! { "url": &article.url })
            .await?;
        if existing.is_some() {
            return Ok(false);
        }
        self.news().insert_one(article).await?;
        Ok(true)
    }
}
