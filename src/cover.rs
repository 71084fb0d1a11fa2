use crate::model::Track;
use crate::playlist::AssetResolver;
use image::DynamicImage;
use image::imageops::FilterType;
use lofty::file::TaggedFileExt;
use lofty::picture::PictureType;
use lofty::probe::Probe;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use std::path::Path;

const UPPER_HALF_BLOCK: &str = "\u{2580}";

/// Keeps the decoded cover of the current track and its last rendering.
#[derive(Default)]
pub struct CoverCache {
    key: Option<String>,
    image: Option<DynamicImage>,
    rendered: Option<((u16, u16), Vec<Line<'static>>)>,
}

impl CoverCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Half-block rows for `track` at `width` x `height` cells, or `None`
    /// when no cover can be found.
    pub fn lines_for(
        &mut self,
        track: &Track,
        assets: &AssetResolver,
        width: u16,
        height: u16,
    ) -> Option<&[Line<'static>]> {
        let key = format!("{}\n{}", track.cover_ref, track.audio_ref);
        if self.key.as_deref() != Some(key.as_str()) {
            self.image = load_cover(track, assets);
            self.rendered = None;
            self.key = Some(key);
        }

        let image = self.image.as_ref()?;
        let stale = self
            .rendered
            .as_ref()
            .is_none_or(|(size, _)| *size != (width, height));
        if stale {
            self.rendered = Some(((width, height), half_block_lines(image, width, height)));
        }
        self.rendered.as_ref().map(|(_, lines)| lines.as_slice())
    }
}

/// Cover file first, then the front cover embedded in the audio file.
pub fn load_cover(track: &Track, assets: &AssetResolver) -> Option<DynamicImage> {
    if let Some(path) = assets.resolve(&track.cover_ref) {
        match image::open(&path) {
            Ok(image) => return Some(image),
            Err(err) => {
                tracing::debug!(path = %path.display(), error = %err, "cover image unavailable");
            }
        }
    }

    let audio = assets.resolve(&track.audio_ref)?;
    let bytes = embedded_cover_art(&audio)?;
    image::load_from_memory(&bytes)
        .inspect_err(|err| {
            tracing::debug!(path = %audio.display(), error = %err, "embedded cover undecodable");
        })
        .ok()
}

pub fn embedded_cover_art(path: &Path) -> Option<Vec<u8>> {
    let tagged_file = Probe::open(path).ok()?.read().ok()?;
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())?;
    let pictures = tag.pictures();
    pictures
        .iter()
        .find(|picture| picture.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())
        .map(|picture| picture.data().to_vec())
}

/// Each cell shows two vertically stacked pixels: the top one as the
/// foreground of an upper half block, the bottom one as its background.
pub fn half_block_lines(image: &DynamicImage, width: u16, height: u16) -> Vec<Line<'static>> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let pixels = image
        .resize_exact(
            u32::from(width),
            u32::from(height) * 2,
            FilterType::Triangle,
        )
        .to_rgb8();

    (0..u32::from(height))
        .map(|row| {
            let spans: Vec<Span<'static>> = (0..u32::from(width))
                .map(|col| {
                    let top = pixels.get_pixel(col, row * 2);
                    let bottom = pixels.get_pixel(col, row * 2 + 1);
                    Span::styled(
                        UPPER_HALF_BLOCK,
                        Style::default()
                            .fg(Color::Rgb(top[0], top[1], top[2]))
                            .bg(Color::Rgb(bottom[0], bottom[1], bottom[2])),
                    )
                })
                .collect();
            Line::from(spans)
        })
        .collect()
}
