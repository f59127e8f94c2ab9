use std::path::{Path, PathBuf};

use image::{Rgba, RgbaImage};
use rusttype::{Font, Scale, point};
use snafu::{OptionExt as _, ResultExt as _, Snafu};

#[derive(Debug, Snafu)]
pub enum FaceError {
    #[snafu(display("Failed to read font {}: {source}", path.display()))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Not a usable TrueType/OpenType font: {}", path.display()))]
    Parse { path: PathBuf },
}

pub type FaceResult<T> = std::result::Result<T, FaceError>;

/// Ink bounds of a rendered string, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextExtent {
    pub width: u32,
    pub height: u32,
}

/// A font at a fixed pixel size that can measure and draw single lines.
pub trait Typeface {
    /// Nominal size in pixels. Line advance is derived from it.
    fn size(&self) -> u32;

    fn measure(&self, text: &str) -> TextExtent;

    /// Draw `text` with the top of its line box at `(x, y)`.
    fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, text: &str);
}

/// Font file and pixel size, as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSpec {
    pub path: PathBuf,
    pub size: u32,
}

impl FontSpec {
    pub fn new(path: impl Into<PathBuf>, size: u32) -> Self {
        Self {
            path: path.into(),
            size,
        }
    }
}

/// The three faces of a poster.
#[derive(Debug, Clone)]
pub struct PosterFonts<F> {
    pub hashtag: F,
    pub title: F,
    pub body: F,
}

pub struct RusttypeFace {
    font: Font<'static>,
    size: u32,
}

impl RusttypeFace {
    pub fn from_bytes(bytes: Vec<u8>, size: u32, path: &Path) -> FaceResult<Self> {
        let font = Font::try_from_vec(bytes).context(ParseSnafu { path })?;
        Ok(Self { font, size })
    }

    pub fn load(spec: &FontSpec) -> FaceResult<Self> {
        let bytes = std::fs::read(&spec.path).context(ReadSnafu { path: &spec.path })?;
        Self::from_bytes(bytes, spec.size, &spec.path)
    }

    fn scale(&self) -> Scale {
        Scale::uniform(self.size as f32)
    }
}

impl std::fmt::Debug for RusttypeFace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RusttypeFace")
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}

impl PosterFonts<RusttypeFace> {
    pub fn load(hashtag: &FontSpec, title: &FontSpec, body: &FontSpec) -> FaceResult<Self> {
        Ok(Self {
            hashtag: RusttypeFace::load(hashtag)?,
            title: RusttypeFace::load(title)?,
            body: RusttypeFace::load(body)?,
        })
    }
}

impl Typeface for RusttypeFace {
    fn size(&self) -> u32 {
        self.size
    }

    fn measure(&self, text: &str) -> TextExtent {
        let scale = self.scale();
        let ascent = self.font.v_metrics(scale).ascent;

        let mut bounds: Option<(i32, i32, i32, i32)> = None;
        for glyph in self.font.layout(text, scale, point(0.0, ascent)) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            bounds = Some(match bounds {
                None => (bb.min.x, bb.min.y, bb.max.x, bb.max.y),
                Some((x0, y0, x1, y1)) => (
                    x0.min(bb.min.x),
                    y0.min(bb.min.y),
                    x1.max(bb.max.x),
                    y1.max(bb.max.y),
                ),
            });
        }

        bounds
            .map(|(x0, y0, x1, y1)| TextExtent {
                width: (x1 - x0).unsigned_abs(),
                height: (y1 - y0).unsigned_abs(),
            })
            .unwrap_or_default()
    }

    fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, text: &str) {
        let scale = self.scale();
        let ascent = self.font.v_metrics(scale).ascent;
        let origin = point(x as f32, y as f32 + ascent);

        for glyph in self.font.layout(text, scale, origin) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let px = gx as i32 + bb.min.x;
                let py = gy as i32 + bb.min.y;
                blend_pixel(canvas, px, py, color, coverage);
            });
        }
    }
}

/// Alpha-blend `color` at `coverage` (0..=1) over an opaque canvas pixel.
pub(crate) fn blend_pixel(canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, coverage: f32) {
    let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
        return;
    };
    if canvas.width() <= x || canvas.height() <= y {
        return;
    }
    let alpha = coverage.clamp(0.0, 1.0) * (color.0[3] as f32 / 255.0);
    if alpha <= 0.0 {
        return;
    }

    let dst = canvas.get_pixel_mut(x, y);
    for c in 0..3 {
        dst.0[c] = (color.0[c] as f32 * alpha + dst.0[c] as f32 * (1.0 - alpha)).round() as u8;
    }
    dst.0[3] = 255;
}

#[cfg(any(test, feature = "test-utils"))]
pub use self::block::BlockFace;

#[cfg(any(test, feature = "test-utils"))]
mod block {
    use image::{Rgba, RgbaImage};

    use super::{TextExtent, Typeface};

    /// Draws every non-space character as a solid box `size * 3 / 5` wide and
    /// `size` tall. Measurements are exact, which keeps layout tests stable.
    #[derive(Debug, Clone, Copy)]
    pub struct BlockFace {
        pub size: u32,
    }

    impl BlockFace {
        pub fn new(size: u32) -> Self {
            Self { size }
        }

        pub fn advance(&self) -> u32 {
            self.size * 3 / 5
        }
    }

    impl Typeface for BlockFace {
        fn size(&self) -> u32 {
            self.size
        }

        fn measure(&self, text: &str) -> TextExtent {
            let chars = text.chars().count() as u32;
            if chars == 0 {
                return TextExtent::default();
            }
            TextExtent {
                width: chars * self.advance(),
                height: self.size,
            }
        }

        fn draw(&self, canvas: &mut RgbaImage, x: i32, y: i32, color: Rgba<u8>, text: &str) {
            let advance = self.advance() as i32;
            for (i, c) in text.chars().enumerate() {
                if c == ' ' {
                    continue;
                }
                let left = x + i as i32 * advance;
                for dy in 0..self.size as i32 {
                    for dx in 0..(advance - 1).max(1) {
                        super::blend_pixel(canvas, left + dx, y + dy, color, 1.0);
                    }
                }
            }
        }
    }
}
