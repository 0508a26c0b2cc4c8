pub mod memory;
pub mod traits;
#[cfg(feature = "upstash")]
pub mod upstash;

use crate::{config::RetrievalConfig, error::Result};
use std::sync::Arc;

pub use memory::InMemoryVectorStore;
pub use traits::VectorStore;
#[cfg(feature = "upstash")]
pub use upstash::UpstashVectorStore;

/// Hosted index when one is configured, otherwise process memory.
pub async fn store_from_config(config: &RetrievalConfig) -> Result<Arc<dyn VectorStore>> {
    if let Some(upstash_config) = &config.upstash {
        #[cfg(feature = "upstash")]
        {
            let store = UpstashVectorStore::new(upstash_config.clone()).await?;
            log::info!("✅ Using Upstash vector storage");
            return Ok(Arc::new(store));
        }
        #[cfg(not(feature = "upstash"))]
        {
            let _ = upstash_config;
            log::warn!("⚠️  Upstash configured but the feature is not enabled");
        }
    }

    log::info!("📦 Using in-memory vector storage");
    Ok(Arc::new(InMemoryVectorStore::new()))
}
