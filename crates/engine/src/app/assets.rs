use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::JoinHandle;

use image::ImageReader;
use tracing::{debug, warn};

const PLACEHOLDER_SIZE: u32 = 32;
const PLACEHOLDER_COLOR: [u8; 4] = [255, 0, 255, 255];

/// A decoded RGBA image ready to blit into the frame buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpriteImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl SpriteImage {
    /// Deterministic stand-in installed when a load fails, so draw code never
    /// has to branch on a missing slot.
    pub fn placeholder() -> Self {
        let pixel_count = (PLACEHOLDER_SIZE * PLACEHOLDER_SIZE) as usize;
        let mut rgba = Vec::with_capacity(pixel_count * 4);
        for _ in 0..pixel_count {
            rgba.extend_from_slice(&PLACEHOLDER_COLOR);
        }
        Self {
            width: PLACEHOLDER_SIZE,
            height: PLACEHOLDER_SIZE,
            rgba,
        }
    }
}

/// Session-constant art loaded once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaticAsset {
    PlayerSheet,
    Projectile,
    FlameBurst,
    Explosion,
}

/// Per-clan art variants; all three are evicted together when the owning
/// record is removed from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClanVariant {
    Base,
    Hit,
    Formation,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetKey {
    Static(StaticAsset),
    Clan {
        clan_id: String,
        variant: ClanVariant,
    },
}

/// The seam between the live-state synchronizer and asset storage.
pub trait AssetStore {
    fn request(&mut self, key: AssetKey, relative_path: &str);
    fn evict_clan(&mut self, clan_id: &str);
}

struct LoadRequest {
    key: AssetKey,
    path: PathBuf,
}

struct LoadComplete {
    key: AssetKey,
    image: SpriteImage,
}

/// Image cache with fire-and-forget population. Loads run on a single
/// background thread; the render loop never awaits one. Completions are
/// observed by `pump` at tick boundaries, which keeps all cache mutation on
/// the event-processing thread.
///
/// The single loader thread also guarantees completions arrive in request
/// order, so a re-request for the same key always wins over the load it
/// replaced.
pub struct AssetCache {
    asset_root: PathBuf,
    images: HashMap<AssetKey, SpriteImage>,
    request_tx: Option<Sender<LoadRequest>>,
    complete_rx: Receiver<LoadComplete>,
    worker: Option<JoinHandle<()>>,
}

impl AssetCache {
    pub fn new(asset_root: PathBuf) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<LoadRequest>();
        let (complete_tx, complete_rx) = mpsc::channel::<LoadComplete>();
        let worker = std::thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || loader_main(request_rx, complete_tx))
            .ok();
        if worker.is_none() {
            warn!("asset_loader_spawn_failed");
        }
        Self {
            asset_root,
            images: HashMap::new(),
            request_tx: Some(request_tx),
            complete_rx,
            worker,
        }
    }

    pub fn get(&self, key: &AssetKey) -> Option<&SpriteImage> {
        self.images.get(key)
    }

    /// Applies every load that completed since the previous tick. Returns the
    /// number of cache slots written.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.complete_rx.try_recv() {
                Ok(complete) => {
                    // Replace, never merge: a re-load fully supersedes the
                    // previous handle for this key.
                    self.images.insert(complete.key, complete.image);
                    applied += 1;
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        applied
    }

    #[cfg(test)]
    fn apply_completion(&mut self, key: AssetKey, image: SpriteImage) {
        self.images.insert(key, image);
    }
}

impl AssetStore for AssetCache {
    fn request(&mut self, key: AssetKey, relative_path: &str) {
        let path = self.asset_root.join(relative_path);
        debug!(path = %path.display(), "asset_requested");
        let Some(tx) = self.request_tx.as_ref() else {
            return;
        };
        if tx.send(LoadRequest { key, path }).is_err() {
            warn!("asset_loader_gone");
        }
    }

    fn evict_clan(&mut self, clan_id: &str) {
        self.images.retain(|key, _| match key {
            AssetKey::Clan { clan_id: id, .. } => id != clan_id,
            AssetKey::Static(_) => true,
        });
    }
}

impl Drop for AssetCache {
    fn drop(&mut self) {
        // Closing the request channel lets the loader exit; completions that
        // fire after this point are dropped with the channel.
        self.request_tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

fn loader_main(request_rx: Receiver<LoadRequest>, complete_tx: Sender<LoadComplete>) {
    while let Ok(request) = request_rx.recv() {
        let image = load_or_placeholder(&request.path);
        if complete_tx
            .send(LoadComplete {
                key: request.key,
                image,
            })
            .is_err()
        {
            break;
        }
    }
}

/// Decodes the image at `path`, or installs the deterministic placeholder on
/// any failure. Load failures are recovered locally and never propagated.
pub(crate) fn load_or_placeholder(path: &Path) -> SpriteImage {
    match load_sprite(path) {
        Ok(image) => image,
        Err(error) => {
            warn!(path = %path.display(), error = %error, "asset_load_failed");
            SpriteImage::placeholder()
        }
    }
}

fn load_sprite(path: &Path) -> Result<SpriteImage, image::ImageError> {
    let decoded = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    let rgba = decoded.to_rgba8();
    Ok(SpriteImage {
        width: rgba.width(),
        height: rgba.height(),
        rgba: rgba.into_raw(),
    })
}
