pub mod provider_disk;
pub mod provider_embed;

use crate::traits::UiAssetProvider;
use std::path::Path;
use std::sync::Arc;

/// Picks the disk provider when an assets directory is configured, otherwise
/// the copy embedded in the binary.
pub fn create_frontend(assets_dir: Option<&Path>) -> Arc<dyn UiAssetProvider> {
    match assets_dir {
        Some(dir) => {
            tracing::info!("💿 Frontend: serving UI from {}", dir.display());
            Arc::new(provider_disk::DiskFrontend::new(dir))
        }
        None => {
            tracing::info!("📦 Frontend: serving embedded UI");
            Arc::new(provider_embed::EmbedFrontend::new())
        }
    }
}
