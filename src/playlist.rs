use crate::model::Track;
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Fixed, ordered track list. Never empty once constructed.
#[derive(Debug, Clone)]
pub struct Playlist {
    tracks: Vec<Track>,
}

impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Result<Self> {
        if tracks.is_empty() {
            anyhow::bail!("playlist must contain at least one track");
        }
        Ok(Self { tracks })
    }

    pub fn builtin() -> Self {
        Self {
            tracks: vec![
                Track::new(
                    "シャイニングスター",
                    "詩歩",
                    "public/shining_star.jpg",
                    "shining_star.mp3",
                ),
                Track::new(
                    "Burning Heart",
                    "KEI",
                    "public/burning_heart.jpg",
                    "burning_heart.mp3",
                ),
                Track::new("12345", "Mary", "public/12345.jpg", "12345.mp3"),
                Track::new("ハルジオン", "KEI", "public/halzion.jpg", "halzion.mp3"),
                Track::new(
                    "Bipolar Disorder Outside ver.",
                    "森田交一",
                    "public/outside.png",
                    "outside.mp3",
                ),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

impl Default for Playlist {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Resolves opaque track references against a local asset directory.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    root: PathBuf,
}

impl AssetResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve(&self, reference: &str) -> Option<PathBuf> {
        let trimmed = reference.trim();
        if trimmed.is_empty() || is_remote(trimmed) {
            return None;
        }

        let candidate = Path::new(trimmed);
        if candidate.is_absolute() {
            return Some(candidate.to_path_buf());
        }
        Some(self.root.join(candidate))
    }
}

fn is_remote(reference: &str) -> bool {
    reference.split_once("://").is_some_and(|(scheme, _)| {
        !scheme.is_empty()
            && scheme
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_playlist_has_five_songs_in_order() {
        let playlist = Playlist::builtin();
        assert_eq!(playlist.len(), 5);
        assert_eq!(playlist.get(0).map(|t| t.title.as_str()), Some("シャイニングスター"));
        assert_eq!(playlist.get(1).map(|t| t.title.as_str()), Some("Burning Heart"));
        assert_eq!(
            playlist.get(4).map(|t| t.title.as_str()),
            Some("Bipolar Disorder Outside ver.")
        );
        assert_eq!(playlist.get(5), None);
    }

    #[test]
    fn empty_playlist_is_rejected() {
        let err = Playlist::new(Vec::new()).expect_err("empty");
        assert!(format!("{err}").contains("at least one track"));
    }

    #[test]
    fn relative_refs_join_the_asset_root() {
        let resolver = AssetResolver::new("assets");
        assert_eq!(
            resolver.resolve("public/12345.jpg"),
            Some(PathBuf::from("assets").join("public/12345.jpg"))
        );
    }

    #[test]
    fn remote_and_blank_refs_do_not_resolve() {
        let resolver = AssetResolver::new("assets");
        assert_eq!(resolver.resolve("https://example.com/a.mp3"), None);
        assert_eq!(resolver.resolve("   "), None);
    }
}
