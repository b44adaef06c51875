//! Letter glyph icons
//!
//! When no real icon can be found, a site is represented by a pre-rendered
//! glyph of its first letter. Glyphs live in a directory as `{char}.png` or
//! `{unicode-character-name}.png` (`latin-small-letter-a-with-grave.png`).
//! `x.png` doubles as the default tile; if it is missing a plain grey tile is
//! generated at startup.

use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::LetterIconConfig;
use crate::errors::{AppError, AppResult};
use crate::fetcher::FetchResult;
use crate::imaging;
use crate::utils::UrlUtils;

/// Letter used when nothing better can be derived
pub const DEFAULT_LETTER: char = 'x';

const GENERATED_TILE_SIZE: u32 = 256;
const GENERATED_TILE_COLOUR: [u8; 4] = [0x9e, 0x9e, 0x9e, 0xff];

/// Letter representing a page URL: first character of the site label
///
/// ```rust
/// use icon_proxy::resolver::letters::letter_for_url;
///
/// assert_eq!(letter_for_url("https://Example.co.uk"), 'e');
/// assert_eq!(letter_for_url("www.github.com"), 'g');
/// assert_eq!(letter_for_url("http://"), 'x');
/// ```
pub fn letter_for_url(page_url: &str) -> char {
    UrlUtils::host_of(page_url)
        .and_then(|host| UrlUtils::site_label(&host))
        .map(|label| letter_for_name(&label))
        .unwrap_or(DEFAULT_LETTER)
}

/// Lowercased first character of a name, or the default letter
pub fn letter_for_name(name: &str) -> char {
    name.trim()
        .chars()
        .next()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .unwrap_or(DEFAULT_LETTER)
}

/// File stem for a character's Unicode name: lowercase, hyphen separated
pub fn unicode_file_stem(letter: char) -> Option<String> {
    unicode_names2::name(letter).map(|name| name.to_string().to_lowercase().replace(' ', "-"))
}

/// Directory-backed glyph lookup with an in-memory memo
pub struct LetterIconStore {
    directory: PathBuf,
    default_icon: Bytes,
    memo: Mutex<LruCache<char, Bytes>>,
}

impl std::fmt::Debug for LetterIconStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LetterIconStore")
            .field("directory", &self.directory)
            .field("default_icon_bytes", &self.default_icon.len())
            .finish()
    }
}

impl LetterIconStore {
    /// Load the default tile and prepare the memo
    pub fn open(config: &LetterIconConfig) -> AppResult<Self> {
        let capacity = NonZeroUsize::new(config.memo_capacity)
            .ok_or_else(|| AppError::configuration("letters.memo_capacity must be non-zero"))?;

        let default_path = config.directory.join(format!("{DEFAULT_LETTER}.png"));
        let default_icon = match std::fs::read(&default_path) {
            Ok(bytes) => {
                info!("Loaded default letter icon from {}", default_path.display());
                Bytes::from(bytes)
            }
            Err(e) => {
                warn!(
                    "Default letter icon {} unavailable ({}), using generated tile",
                    default_path.display(),
                    e
                );
                imaging::solid_tile(GENERATED_TILE_SIZE, GENERATED_TILE_COLOUR).map_err(|e| {
                    AppError::internal(format!("Failed to generate default tile: {e}"))
                })?
            }
        };

        Ok(Self {
            directory: config.directory.clone(),
            default_icon,
            memo: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Unresized bytes of the default tile
    pub fn default_icon(&self) -> Bytes {
        self.default_icon.clone()
    }

    /// Glyph bytes for a letter: by literal character, then by Unicode name,
    /// then the default tile
    pub async fn icon_for(&self, letter: char) -> Bytes {
        if let Some(bytes) = self.memo.lock().await.get(&letter) {
            return bytes.clone();
        }

        let icon = self.lookup(letter).await;
        self.memo.lock().await.put(letter, icon.clone());
        icon
    }

    /// Letter glyph normalized to `size`, degrading to the default tile
    pub async fn render(&self, letter: char, size: u32) -> Bytes {
        let glyph = self.icon_for(letter).await;
        match imaging::normalize_blocking(FetchResult::Raster(glyph), size).await {
            Ok(png) => png,
            Err(e) => {
                warn!("Letter icon for {:?} failed to normalize: {}", letter, e);
                self.render_default(size).await
            }
        }
    }

    /// Default tile normalized to `size`, or its raw bytes if even that fails
    pub async fn render_default(&self, size: u32) -> Bytes {
        match imaging::normalize_blocking(FetchResult::Raster(self.default_icon()), size).await {
            Ok(png) => png,
            Err(e) => {
                warn!("Default tile failed to normalize: {}", e);
                self.default_icon()
            }
        }
    }

    async fn lookup(&self, letter: char) -> Bytes {
        // Only plain alphanumerics map directly to a file name
        if letter.is_alphanumeric()
            && let Some(bytes) = self.read_glyph(&letter.to_string()).await
        {
            return bytes;
        }
        if let Some(stem) = unicode_file_stem(letter)
            && let Some(bytes) = self.read_glyph(&stem).await
        {
            return bytes;
        }
        debug!("No letter icon for {:?}, using default", letter);
        self.default_icon()
    }

    async fn read_glyph(&self, stem: &str) -> Option<Bytes> {
        let path = self.directory.join(format!("{stem}.png"));
        tokio::fs::read(&path).await.ok().map(Bytes::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;
    use rstest::rstest;

    fn store_in(dir: &Path) -> LetterIconStore {
        LetterIconStore::open(&LetterIconConfig {
            directory: dir.to_path_buf(),
            memo_capacity: 8,
        })
        .unwrap()
    }

    fn tile(colour: [u8; 4]) -> Bytes {
        imaging::solid_tile(32, colour).unwrap()
    }

    #[rstest]
    #[case("https://Example.co.uk", 'e')]
    #[case("github.com", 'g')]
    #[case("https://www.Zalando.de/shoes", 'z')]
    #[case("localhost", 'l')]
    #[case("http://", 'x')]
    #[case("", 'x')]
    fn test_letter_for_url(#[case] url: &str, #[case] expected: char) {
        assert_eq!(letter_for_url(url), expected);
    }

    #[test]
    fn test_letter_for_name() {
        assert_eq!(letter_for_name("Jack"), 'j');
        assert_eq!(letter_for_name("Élodie"), 'é');
        assert_eq!(letter_for_name(""), 'x');
    }

    #[test]
    fn test_unicode_file_stem() {
        assert_eq!(
            unicode_file_stem('à').as_deref(),
            Some("latin-small-letter-a-with-grave")
        );
        assert_eq!(unicode_file_stem('/').as_deref(), Some("solidus"));
    }

    #[tokio::test]
    async fn test_generated_default_when_directory_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir.path().join("missing"));
        let icon = store.icon_for('q').await;
        assert_eq!(icon, store.default_icon());
        assert!(imaging::verify_png(&icon).is_ok());
    }

    #[tokio::test]
    async fn test_lookup_order() {
        let dir = tempfile::tempdir().unwrap();
        let literal = tile([255, 0, 0, 255]);
        let named = tile([0, 255, 0, 255]);
        let default = tile([0, 0, 255, 255]);
        std::fs::write(dir.path().join("e.png"), &literal).unwrap();
        std::fs::write(dir.path().join("latin-small-letter-e-with-acute.png"), &named).unwrap();
        std::fs::write(dir.path().join("x.png"), &default).unwrap();

        let store = store_in(dir.path());
        assert_eq!(store.icon_for('e').await, literal);
        assert_eq!(store.icon_for('é').await, named);
        assert_eq!(store.icon_for('q').await, default);
    }

    #[tokio::test]
    async fn test_memoized_lookups_survive_file_removal() {
        let dir = tempfile::tempdir().unwrap();
        let glyph = tile([1, 2, 3, 255]);
        std::fs::write(dir.path().join("a.png"), &glyph).unwrap();

        let store = store_in(dir.path());
        assert_eq!(store.icon_for('a').await, glyph);
        std::fs::remove_file(dir.path().join("a.png")).unwrap();
        assert_eq!(store.icon_for('a').await, glyph);
    }

    #[tokio::test]
    async fn test_non_alphanumeric_letters_do_not_touch_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("solidus.png"), tile([7, 7, 7, 255])).unwrap();
        let store = store_in(dir.path());
        // '/' resolves by name only, never as a path component
        assert_ne!(store.icon_for('/').await, store.default_icon());
        assert_eq!(store.icon_for('.').await, store.default_icon());
    }

    #[tokio::test]
    async fn test_render_sizes_and_degrades() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.png"), b"not a png").unwrap();
        let store = store_in(dir.path());

        let rendered = store.render('b', 48).await;
        let img = image::load_from_memory(&rendered).unwrap();
        assert_eq!(img.dimensions(), (48, 48));
        assert_eq!(rendered, store.render_default(48).await);
    }
}
