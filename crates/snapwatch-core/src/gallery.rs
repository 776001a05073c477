//! Gallery reader — lists downloaded media straight from disk.
//!
//! Layout under the media root:
//!
//! ```text
//! <root>/<identity>/stories/<file>
//! <root>/<identity>/highlights/<album>/<file>
//! <root>/<identity>/spotlights/<file>
//! ```
//!
//! Nothing is cached; every call reflects the current directory contents. A
//! missing directory means "no media", never an error.

use std::{fs, io, path::Path};

use serde::{Deserialize, Serialize};

/// File extensions (lowercase, without the dot) that are listed.
pub const MEDIA_EXTENSIONS: &[&str] = &["jpg", "png", "mp4"];

/// A named highlight album with at least one media item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighlightAlbum {
  pub album: String,
  pub items: Vec<String>,
}

/// Everything downloaded for one identity, as URLs under the media mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryEntry {
  pub snap_user:  String,
  pub stories:    Vec<String>,
  pub highlights: Vec<HighlightAlbum>,
  pub spotlights: Vec<String>,
}

/// Build the gallery for `identities`, in the order given.
///
/// `url_prefix` is the mount point of `media_root` (e.g. `/snap_media`).
pub fn list_gallery(
  media_root: &Path,
  url_prefix: &str,
  identities: &[String],
) -> Vec<GalleryEntry> {
  let prefix = url_prefix.trim_end_matches('/');
  identities
    .iter()
    .map(|identity| entry_for(media_root, prefix, identity))
    .collect()
}

fn entry_for(media_root: &Path, prefix: &str, identity: &str) -> GalleryEntry {
  let base = media_root.join(identity);

  let stories = media_files(&base.join("stories"))
    .into_iter()
    .map(|f| format!("{prefix}/{identity}/stories/{f}"))
    .collect();

  let highlights = sorted_names(&base.join("highlights"), |meta| meta.is_dir())
    .into_iter()
    .filter_map(|album| {
      let items: Vec<String> = media_files(&base.join("highlights").join(&album))
        .into_iter()
        .map(|f| format!("{prefix}/{identity}/highlights/{album}/{f}"))
        .collect();
      (!items.is_empty()).then_some(HighlightAlbum { album, items })
    })
    .collect();

  let spotlights = media_files(&base.join("spotlights"))
    .into_iter()
    .map(|f| format!("{prefix}/{identity}/spotlights/{f}"))
    .collect();

  GalleryEntry {
    snap_user: identity.to_owned(),
    stories,
    highlights,
    spotlights,
  }
}

/// Sorted media filenames directly inside `dir`.
fn media_files(dir: &Path) -> Vec<String> {
  let mut names = sorted_names(dir, |meta| meta.is_file());
  names.retain(|n| is_media_file(n));
  names
}

/// Sorted entry names in `dir` whose metadata passes `keep`. Symlinks are
/// followed. Unreadable or missing directories yield an empty list.
fn sorted_names(dir: &Path, keep: impl Fn(&fs::Metadata) -> bool) -> Vec<String> {
  let read = match fs::read_dir(dir) {
    Ok(r) => r,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Vec::new(),
    Err(e) => {
      tracing::warn!(dir = %dir.display(), error = %e, "cannot read media directory");
      return Vec::new();
    }
  };

  let mut names: Vec<String> = read
    .filter_map(|entry| entry.ok())
    .filter(|entry| fs::metadata(entry.path()).is_ok_and(|meta| keep(&meta)))
    .filter_map(|entry| entry.file_name().into_string().ok())
    .collect();
  names.sort();
  names
}

/// `true` if `name` ends in one of [`MEDIA_EXTENSIONS`], ignoring case.
pub fn is_media_file(name: &str) -> bool {
  Path::new(name)
    .extension()
    .and_then(|e| e.to_str())
    .is_some_and(|ext| {
      MEDIA_EXTENSIONS
        .iter()
        .any(|allowed| ext.eq_ignore_ascii_case(allowed))
    })
}
