//! Image storage: content-addressed raster pool plus cell-span placements.
//!
//! Pixel decoding (sixel, PNG-in-iTerm-proto, etc.) is out of scope — the
//! pool stores opaque raster payloads keyed by `(format, size, bytes)` and
//! hands out [`ImageId`]s; a [`RasterizedImage`] binds an image to a layout
//! so per-cell fragments can be addressed without re-decoding.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

/// Monotonically assigned image identifier.
pub type ImageId = u32;

static NEXT_IMAGE_ID: AtomicU32 = AtomicU32::new(1);

fn next_image_id() -> ImageId {
    NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Raster pixel format of a decoded image payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFormat {
    Rgb,
    Rgba,
    /// Sixel decodes to indexed-color cells; kept as a distinct format so
    /// the pool doesn't conflate it with true-color payloads.
    SixelIndexed,
}

/// Pixel dimensions of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// A decoded, content-addressed raster image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub id: ImageId,
    pub format: ImageFormat,
    pub size: ImageSize,
    pub pixels: Vec<u8>,
}

/// How a rasterized image is aligned within its cell span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageAlignment {
    #[default]
    TopLeft,
    Center,
    TopRight,
}

/// How a rasterized image's pixel data maps onto its cell span when the two
/// aspect ratios disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageResizePolicy {
    #[default]
    NoResize,
    Stretch,
    PreserveAspectRatio,
}

/// A [`Image`] bound to a cell-grid placement: span, per-cell pixel size,
/// alignment, and resize policy. Produces per-cell pixel fragments on
/// demand rather than precomputing them eagerly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterizedImage {
    pub image_id: ImageId,
    pub alignment: ImageAlignment,
    pub resize: ImageResizePolicy,
    pub default_color: [u8; 4],
    /// Cell span (columns, rows) this image occupies.
    pub cell_span: (u16, u16),
    /// Pixel size of a single cell as rendered.
    pub cell_size: (u32, u32),
}

impl RasterizedImage {
    /// Byte offset range into the source image's pixel buffer (assuming a
    /// tightly packed RGBA raster) that corresponds to the fragment shown
    /// in cell `(col, row)` of this placement. Returns `None` if the cell
    /// lies outside the span.
    pub fn fragment_rect(&self, col: u16, row: u16) -> Option<(u32, u32, u32, u32)> {
        if col >= self.cell_span.0 || row >= self.cell_span.1 {
            return None;
        }
        let x = col as u32 * self.cell_size.0;
        let y = row as u32 * self.cell_size.1;
        Some((x, y, self.cell_size.0, self.cell_size.1))
    }
}

/// A reference to one cell's fragment of a rasterized image, stored inline
/// in the cell grid (per spec's `ImageFragmentRef`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageFragmentRef {
    pub image_id: ImageId,
    pub col: u16,
    pub row: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ContentKey {
    format: ImageFormatKey,
    width: u32,
    height: u32,
    hash: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ImageFormatKey {
    Rgb,
    Rgba,
    SixelIndexed,
}

impl From<ImageFormat> for ImageFormatKey {
    fn from(f: ImageFormat) -> Self {
        match f {
            ImageFormat::Rgb => ImageFormatKey::Rgb,
            ImageFormat::Rgba => ImageFormatKey::Rgba,
            ImageFormat::SixelIndexed => ImageFormatKey::SixelIndexed,
        }
    }
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}

/// Content-addressed image store with reference-counted eviction.
///
/// Lifetime rule: when an image's refcount reaches zero it is dropped and
/// `on_evict` (supplied at call time, since the pool has no callback to the
/// owning Terminal) is invoked with the evicted id so dependent
/// rasterizations/cell fragments can be invalidated.
#[derive(Debug, Default)]
pub struct ImagePool {
    images: HashMap<ImageId, (Image, u32)>,
    by_content: HashMap<ContentKey, ImageId>,
    max_images: usize,
}

impl ImagePool {
    pub fn new(max_images: usize) -> Self {
        Self {
            images: HashMap::new(),
            by_content: HashMap::new(),
            max_images,
        }
    }

    /// Intern an image by content, incrementing its refcount. Returns
    /// `None` if the pool is at capacity and this is genuinely new content.
    pub fn acquire(&mut self, format: ImageFormat, size: ImageSize, pixels: Vec<u8>) -> Option<ImageId> {
        let key = ContentKey {
            format: format.into(),
            width: size.width,
            height: size.height,
            hash: fnv1a64(&pixels),
        };
        if let Some(&id) = self.by_content.get(&key) {
            if let Some((_, refcount)) = self.images.get_mut(&id) {
                *refcount += 1;
            }
            return Some(id);
        }
        if self.max_images != 0 && self.images.len() >= self.max_images {
            return None;
        }
        let id = next_image_id();
        self.images.insert(
            id,
            (
                Image {
                    id,
                    format,
                    size,
                    pixels,
                },
                1,
            ),
        );
        self.by_content.insert(key, id);
        Some(id)
    }

    pub fn get(&self, id: ImageId) -> Option<&Image> {
        self.images.get(&id).map(|(img, _)| img)
    }

    /// Release one reference; evicts (and returns the id) if this was the
    /// last reference.
    pub fn release(&mut self, id: ImageId) -> Option<ImageId> {
        let evict = match self.images.get_mut(&id) {
            Some((_, refcount)) => {
                *refcount = refcount.saturating_sub(1);
                *refcount == 0
            }
            None => false,
        };
        if evict {
            if let Some((img, _)) = self.images.remove(&id) {
                let key = ContentKey {
                    format: img.format.into(),
                    width: img.size.width,
                    height: img.size.height,
                    hash: fnv1a64(&img.pixels),
                };
                self.by_content.remove(&key);
            }
            Some(id)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Deferred discard queue: `discardImage(id)` is callable from any task;
/// ids are queued here and drained on the next render-task tick under the
/// primary mutex (see Concurrency & Resource Model).
#[derive(Debug, Default)]
pub struct DiscardQueue {
    pending: Vec<ImageId>,
}

impl DiscardQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, id: ImageId) {
        self.pending.push(id);
    }

    /// Drain all queued ids, releasing each through `pool`.
    pub fn drain(&mut self, pool: &mut ImagePool) -> Vec<ImageId> {
        self.pending
            .drain(..)
            .filter_map(|id| pool.release(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_dedups_by_content() {
        let mut pool = ImagePool::new(0);
        let size = ImageSize {
            width: 2,
            height: 2,
        };
        let id1 = pool
            .acquire(ImageFormat::Rgba, size, vec![1, 2, 3, 4])
            .unwrap();
        let id2 = pool
            .acquire(ImageFormat::Rgba, size, vec![1, 2, 3, 4])
            .unwrap();
        assert_eq!(id1, id2);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn release_evicts_at_zero_refcount() {
        let mut pool = ImagePool::new(0);
        let size = ImageSize {
            width: 1,
            height: 1,
        };
        let id = pool.acquire(ImageFormat::Rgb, size, vec![9, 9, 9]).unwrap();
        pool.acquire(ImageFormat::Rgb, size, vec![9, 9, 9]).unwrap(); // second ref
        assert!(pool.release(id).is_none());
        assert_eq!(pool.release(id), Some(id));
        assert!(pool.get(id).is_none());
    }

    #[test]
    fn pool_capacity_rejects_new_content() {
        let mut pool = ImagePool::new(1);
        let size = ImageSize {
            width: 1,
            height: 1,
        };
        assert!(pool.acquire(ImageFormat::Rgb, size, vec![1]).is_some());
        assert!(pool.acquire(ImageFormat::Rgb, size, vec![2]).is_none());
    }

    #[test]
    fn discard_queue_defers_release() {
        let mut pool = ImagePool::new(0);
        let size = ImageSize {
            width: 1,
            height: 1,
        };
        let id = pool.acquire(ImageFormat::Rgb, size, vec![5]).unwrap();
        let mut queue = DiscardQueue::new();
        queue.enqueue(id);
        assert!(pool.get(id).is_some());
        let evicted = queue.drain(&mut pool);
        assert_eq!(evicted, vec![id]);
        assert!(pool.get(id).is_none());
    }
}
