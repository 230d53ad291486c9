//! The portal page compiled into the binary.

use crate::traits::UiAssetProvider;
use crate::{Error, Result};
use async_trait::async_trait;
use rust_embed::RustEmbed;
use std::borrow::Cow;

// Everything under `portal-core/ui/` (index.html, index.js, style.css).
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/ui/"]
struct PortalUi;

/// Serves the portal page from `PortalUi`. This is the default frontend;
/// `--assets-dir` swaps in `DiskFrontend` for UI work without a rebuild.
#[derive(Debug, Default)]
pub struct EmbedFrontend;

impl EmbedFrontend {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UiAssetProvider for EmbedFrontend {
    async fn get_asset(&self, path: &str) -> Result<(Cow<'static, [u8]>, String)> {
        let file = PortalUi::get(path).ok_or_else(|| Error::AssetNotFound(path.to_string()))?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        Ok((file.data, mime.essence_str().to_string()))
    }
}
