//! Skin texture lookups for fake players.
//!
//! Lookups may be slow (a file read here, a web request in a real host), so
//! they run on tokio tasks. Results come back over a channel and are drained
//! by the tick loop, which keeps the replication core single-threaded.

use async_trait::async_trait;
use phantom_replication::{EntityHandle, SignedTexture};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum TextureError {
    #[error("Failed to read texture file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed texture file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Resolves a player name to its signed skin texture.
#[async_trait]
pub trait TextureResolver: Send + Sync {
    /// `Ok(None)` when the name has no known texture.
    async fn resolve(&self, name: &str) -> Result<Option<SignedTexture>, TextureError>;
}

/// Resolver that knows no textures; players keep the default skin.
#[derive(Debug, Default)]
pub struct NoTextures;

#[async_trait]
impl TextureResolver for NoTextures {
    async fn resolve(&self, _name: &str) -> Result<Option<SignedTexture>, TextureError> {
        Ok(None)
    }
}

/// Reads textures from a JSON object keyed by player name.
///
/// ```json
/// { "Banker": { "value": "...", "signature": "..." } }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileTextures {
    path: PathBuf,
}

impl JsonFileTextures {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TextureResolver for JsonFileTextures {
    async fn resolve(&self, name: &str) -> Result<Option<SignedTexture>, TextureError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let mut textures: HashMap<String, SignedTexture> = serde_json::from_str(&content)?;
        Ok(textures.remove(name))
    }
}

/// Result of one lookup, keyed by the entity that asked for it.
#[derive(Debug)]
pub struct ResolvedTexture {
    pub entity: EntityHandle,
    pub name: String,
    pub texture: Option<SignedTexture>,
}

/// Runs lookups in the background and hands results back to the tick loop.
pub struct TextureLoader {
    resolver: Arc<dyn TextureResolver>,
    tx: mpsc::UnboundedSender<ResolvedTexture>,
    rx: mpsc::UnboundedReceiver<ResolvedTexture>,
    in_flight: usize,
}

impl TextureLoader {
    pub fn new(resolver: Arc<dyn TextureResolver>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            resolver,
            tx,
            rx,
            in_flight: 0,
        }
    }

    /// Starts a lookup for `name` on behalf of `entity`.
    ///
    /// Must be called from within a tokio runtime. A failed lookup is
    /// logged and reported as `texture: None`.
    pub fn request(&mut self, entity: EntityHandle, name: impl Into<String>) {
        let name = name.into();
        let resolver = self.resolver.clone();
        let tx = self.tx.clone();
        self.in_flight += 1;

        tokio::spawn(async move {
            let texture = match resolver.resolve(&name).await {
                Ok(texture) => texture,
                Err(e) => {
                    warn!("⚠️ Texture lookup for {} failed: {}", name, e);
                    None
                }
            };
            // The loader may be gone during shutdown.
            let _ = tx.send(ResolvedTexture { entity, name, texture });
        });
    }

    /// Lookups started but not yet drained.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Takes every result that has arrived so far without waiting.
    pub fn drain(&mut self) -> Vec<ResolvedTexture> {
        let mut ready = Vec::new();
        while let Ok(resolved) = self.rx.try_recv() {
            debug!("🎨 Texture lookup for {} finished", resolved.name);
            ready.push(resolved);
        }
        self.in_flight = self.in_flight.saturating_sub(ready.len());
        ready
    }

    /// Waits for the next result. Used where a caller has nothing else to do.
    pub async fn next(&mut self) -> Option<ResolvedTexture> {
        let resolved = self.rx.recv().await?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(resolved)
    }
}

impl std::fmt::Debug for TextureLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureLoader")
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}
