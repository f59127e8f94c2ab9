//! Poster composition: background photo on top, accent footer band below
//! carrying the hashtag badge, title and body.

use std::ffi::OsString;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageError, Rgba, RgbaImage};
use snafu::{ResultExt as _, Snafu};
use tracing::{debug, warn};
use trendposter_util_error::FmtCompact as _;

use crate::LOG_TARGET;
use crate::face::{FaceResult, FontSpec, PosterFonts, RusttypeFace, Typeface, blend_pixel};
use crate::layout::{block_height, wrap};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Debug, Snafu)]
pub enum PosterError {
    #[snafu(display("Failed to load background {}: {source}", path.display()))]
    BackgroundLoad { path: PathBuf, source: ImageError },
    #[snafu(display("Failed to write {}: {source}", path.display()))]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("Failed to encode {}: {source}", path.display()))]
    Encode { path: PathBuf, source: ImageError },
}

pub type PosterResult<T> = std::result::Result<T, PosterError>;

/// Fixed geometry and colors of the poster.
#[derive(Debug, Clone)]
pub struct PosterStyle {
    pub accent: Rgba<u8>,
    pub text_color: Rgba<u8>,
    /// Maximum text width as a fraction of the canvas width.
    pub text_width_ratio: f32,
    pub title_spacing: u32,
    pub body_spacing: u32,
    pub footer_padding: u32,
    /// Room reserved in the footer for the hashtag badge.
    pub badge_area: u32,
    pub badge_top: u32,
    pub badge_padding_x: u32,
    pub badge_padding_y: u32,
    /// Gap between the badge and the first title line.
    pub badge_gap: u32,
    /// Gap between the title block and the body block.
    pub block_gap: u32,
    pub margin_x: u32,
    pub logo_width_ratio: f32,
    pub logo_offset: (u32, u32),
    pub jpeg_quality: u8,
}

impl Default for PosterStyle {
    fn default() -> Self {
        Self {
            accent: Rgba([253, 34, 66, 255]),
            text_color: WHITE,
            text_width_ratio: 0.9,
            title_spacing: 5,
            body_spacing: 6,
            footer_padding: 40,
            badge_area: 80,
            badge_top: 20,
            badge_padding_x: 20,
            badge_padding_y: 10,
            badge_gap: 30,
            block_gap: 20,
            margin_x: 50,
            logo_width_ratio: 0.15,
            logo_offset: (30, 30),
            jpeg_quality: 90,
        }
    }
}

/// Everything needed to build a [`Compositor`], created once at startup.
#[derive(Debug, Clone)]
pub struct PosterConfig {
    pub hashtag_font: FontSpec,
    pub title_font: FontSpec,
    pub body_font: FontSpec,
    pub hashtag: String,
    pub logo: PathBuf,
    pub style: PosterStyle,
}

/// Inputs of a single render.
#[derive(Debug, Clone, Copy)]
pub struct PosterSpec<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub hashtag: &'a str,
    pub logo: &'a Path,
    pub background: &'a Path,
    pub output: &'a Path,
}

/// Summary of a written poster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPoster {
    pub width: u32,
    pub height: u32,
    pub footer_height: u32,
    pub title_lines: Vec<String>,
    pub body_lines: Vec<String>,
}

pub struct Compositor<F> {
    fonts: PosterFonts<F>,
    style: PosterStyle,
}

impl Compositor<RusttypeFace> {
    pub fn from_config(config: &PosterConfig) -> FaceResult<Self> {
        let fonts = PosterFonts::load(
            &config.hashtag_font,
            &config.title_font,
            &config.body_font,
        )?;
        Ok(Self::new(fonts, config.style.clone()))
    }
}

impl<F> Compositor<F>
where
    F: Typeface,
{
    pub fn new(fonts: PosterFonts<F>, style: PosterStyle) -> Self {
        Self { fonts, style }
    }

    pub fn style(&self) -> &PosterStyle {
        &self.style
    }

    fn max_text_width(&self, canvas_width: u32) -> u32 {
        (canvas_width as f32 * self.style.text_width_ratio) as u32
    }

    /// Height of the footer band for the given wrapped text.
    pub fn footer_height(&self, title_lines: usize, body_lines: usize) -> u32 {
        let style = &self.style;
        block_height(title_lines, self.fonts.title.size(), style.title_spacing)
            + block_height(body_lines, self.fonts.body.size(), style.body_spacing)
            + style.footer_padding * 2
            + style.badge_area
    }

    /// Render the poster for `spec` and write it as JPEG to `spec.output`.
    ///
    /// Any error leaves `spec.output` untouched; reporting it is up to the
    /// caller. A logo that cannot be loaded is logged and left out.
    pub fn compose(&self, spec: &PosterSpec<'_>) -> PosterResult<RenderedPoster> {
        let background = image::open(spec.background)
            .context(BackgroundLoadSnafu {
                path: spec.background,
            })?
            .into_rgb8();
        let background = DynamicImage::ImageRgb8(background).into_rgba8();

        let logo = match load_logo(spec.logo) {
            Ok(logo) => Some(logo),
            Err(err) => {
                warn!(
                    target: LOG_TARGET,
                    path = %spec.logo.display(),
                    err = %err.fmt_compact(),
                    "Failed to load logo, continuing without it"
                );
                None
            }
        };

        let (canvas, rendered) = self.render(&background, logo.as_ref(), spec);
        save_jpeg(canvas, spec.output, self.style.jpeg_quality)?;

        debug!(
            target: LOG_TARGET,
            output = %spec.output.display(),
            width = rendered.width,
            height = rendered.height,
            "Poster written"
        );
        Ok(rendered)
    }

    /// Lay out and draw the poster in memory.
    pub fn render(
        &self,
        background: &RgbaImage,
        logo: Option<&RgbaImage>,
        spec: &PosterSpec<'_>,
    ) -> (RgbaImage, RenderedPoster) {
        let style = &self.style;
        let (width, height) = background.dimensions();
        let max_width = self.max_text_width(width);

        let title_lines = wrap(spec.title, |s| self.fonts.title.measure(s).width, max_width);
        let body_lines = wrap(spec.body, |s| self.fonts.body.measure(s).width, max_width);

        let footer_height = self.footer_height(title_lines.len(), body_lines.len());
        let total_height = height + footer_height;

        let mut canvas = RgbaImage::from_pixel(width, total_height, WHITE);
        imageops::replace(&mut canvas, background, 0, 0);

        let footer_y = i64::from(height);
        fill_rect(
            &mut canvas,
            0,
            footer_y,
            i64::from(width),
            i64::from(total_height),
            style.accent,
        );

        if let Some(logo) = logo {
            self.paste_logo(&mut canvas, logo);
        }

        let badge_bottom = self.draw_badge(&mut canvas, spec.hashtag, footer_y);

        let mut y = badge_bottom + i64::from(style.badge_gap);
        for line in &title_lines {
            self.fonts
                .title
                .draw(&mut canvas, style.margin_x as i32, y as i32, style.text_color, line);
            y += i64::from(self.fonts.title.size() + style.title_spacing);
        }

        y += i64::from(style.block_gap);
        for line in &body_lines {
            self.fonts
                .body
                .draw(&mut canvas, style.margin_x as i32, y as i32, style.text_color, line);
            y += i64::from(self.fonts.body.size() + style.body_spacing);
        }

        let rendered = RenderedPoster {
            width,
            height: total_height,
            footer_height,
            title_lines,
            body_lines,
        };
        (canvas, rendered)
    }

    fn paste_logo(&self, canvas: &mut RgbaImage, logo: &RgbaImage) {
        let style = &self.style;
        let target_width = ((canvas.width() as f32 * style.logo_width_ratio) as u32).max(1);
        if logo.width() == 0 {
            return;
        }
        let ratio = target_width as f32 / logo.width() as f32;
        let target_height = ((logo.height() as f32 * ratio) as u32).max(1);

        let resized = imageops::resize(logo, target_width, target_height, FilterType::Lanczos3);
        imageops::overlay(
            canvas,
            &resized,
            i64::from(style.logo_offset.0),
            i64::from(style.logo_offset.1),
        );
    }

    /// Draw the white hashtag badge centered below the footer edge; returns
    /// the badge's bottom edge.
    fn draw_badge(&self, canvas: &mut RgbaImage, hashtag: &str, footer_y: i64) -> i64 {
        let style = &self.style;
        let extent = self.fonts.hashtag.measure(hashtag);
        let (text_w, text_h) = (i64::from(extent.width), i64::from(extent.height));
        let pad_x = i64::from(style.badge_padding_x);
        let pad_y = i64::from(style.badge_padding_y);

        let text_x = (i64::from(canvas.width()) - text_w).div_euclid(2);
        let x1 = text_x - pad_x;
        let y1 = footer_y + i64::from(style.badge_top);
        let x2 = x1 + text_w + pad_x * 2;
        let y2 = y1 + text_h + pad_y * 2;

        fill_rect(canvas, x1, y1, x2, y2, WHITE);
        self.fonts.hashtag.draw(
            canvas,
            text_x as i32,
            (y1 + pad_y) as i32,
            style.accent,
            hashtag,
        );
        y2
    }
}

fn load_logo(path: &Path) -> Result<RgbaImage, ImageError> {
    Ok(image::open(path)?.into_rgba8())
}

/// Fill the inclusive rectangle `(x1, y1)..=(x2, y2)`, clipped to the canvas.
fn fill_rect(canvas: &mut RgbaImage, x1: i64, y1: i64, x2: i64, y2: i64, color: Rgba<u8>) {
    let x_end = x2.min(i64::from(canvas.width()) - 1);
    let y_end = y2.min(i64::from(canvas.height()) - 1);
    for y in y1.max(0)..=y_end {
        for x in x1.max(0)..=x_end {
            blend_pixel(canvas, x as i32, y as i32, color, 1.0);
        }
    }
}

/// Encode in memory, then move into place, so a failure never leaves a
/// partial file at `path`.
fn save_jpeg(canvas: RgbaImage, path: &Path, quality: u8) -> PosterResult<()> {
    let rgb = DynamicImage::ImageRgba8(canvas).into_rgb8();
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(&rgb)
        .context(EncodeSnafu { path })?;

    let mut tmp_name = path.file_name().map(OsString::from).unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, buf.into_inner())
        .and_then(|()| fs::rename(&tmp_path, path))
        .context(WriteSnafu { path })
}

#[cfg(test)]
mod tests {
    use image::{Rgb, RgbImage};

    use super::*;
    use crate::face::BlockFace;

    fn compositor() -> Compositor<BlockFace> {
        Compositor::new(
            PosterFonts {
                hashtag: BlockFace::new(30),
                title: BlockFace::new(40),
                body: BlockFace::new(24),
            },
            PosterStyle::default(),
        )
    }

    fn write_background(dir: &Path, width: u32, height: u32) -> PathBuf {
        let path = dir.join("background.png");
        RgbImage::from_pixel(width, height, Rgb([10, 120, 200]))
            .save(&path)
            .unwrap();
        path
    }

    fn spec<'a>(
        title: &'a str,
        body: &'a str,
        background: &'a Path,
        logo: &'a Path,
        output: &'a Path,
    ) -> PosterSpec<'a> {
        PosterSpec {
            title,
            body,
            hashtag: "#trending",
            logo,
            background,
            output,
        }
    }

    #[test]
    fn footer_height_follows_line_counts() {
        let c = compositor();
        assert_eq!(c.footer_height(0, 0), 40 * 2 + 80);
        assert_eq!(c.footer_height(2, 3), 2 * 45 + 3 * 30 + 40 * 2 + 80);
    }

    #[test_log::test]
    fn compose_long_title_without_logo() {
        let dir = tempfile::tempdir().unwrap();
        let background = write_background(dir.path(), 1000, 600);
        let output = dir.path().join("poster.jpg");
        let missing_logo = dir.path().join("no-such-logo.png");
        let title = "judul ".repeat(50);

        let rendered = compositor()
            .compose(&spec(
                &title,
                "Short body.",
                &background,
                &missing_logo,
                &output,
            ))
            .unwrap();

        assert!(600 < rendered.height);
        assert_eq!(rendered.width, 1000);
        assert_eq!(rendered.height, 600 + rendered.footer_height);
        assert!(1 < rendered.title_lines.len());
        assert_eq!(rendered.body_lines, vec!["Short body."]);

        let written = image::open(&output).unwrap();
        assert_eq!(written.width(), 1000);
        assert_eq!(written.height(), rendered.height);
    }

    #[test_log::test]
    fn missing_background_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("poster.jpg");
        let missing = dir.path().join("missing.png");

        let res = compositor().compose(&spec("T", "B", &missing, &missing, &output));

        assert!(matches!(res, Err(PosterError::BackgroundLoad { .. })));
        assert!(!output.exists());
    }

    #[test_log::test]
    fn unwritable_output_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let background = write_background(dir.path(), 300, 200);
        let output = dir.path().join("gone").join("poster.jpg");

        let res = compositor().compose(&spec("T", "B", &background, &background, &output));

        assert!(matches!(res, Err(PosterError::Write { .. })), "{res:?}");
        assert!(!output.exists());
    }

    #[test]
    fn failed_encode_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("poster.jpg");

        // JPEG dimensions are limited to 16 bits.
        let res = save_jpeg(RgbaImage::new(70_000, 1), &output, 90);

        assert!(matches!(res, Err(PosterError::Encode { .. })), "{res:?}");
        assert!(!output.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn render_paints_footer_badge_and_photo() {
        let c = compositor();
        let background = RgbaImage::from_pixel(400, 200, Rgba([0, 0, 0, 255]));
        let (canvas, rendered) = c.render(
            &background,
            None,
            &spec("T", "", Path::new("bg"), Path::new("logo"), Path::new("out")),
        );

        assert_eq!(canvas.height(), rendered.height);
        // Photo region untouched.
        assert_eq!(*canvas.get_pixel(5, 5), Rgba([0, 0, 0, 255]));
        // Footer corner is accent colored.
        assert_eq!(*canvas.get_pixel(0, rendered.height - 1), c.style().accent);
        // Badge sits centered 20px below the footer edge, padded white.
        assert_eq!(*canvas.get_pixel(200, 200 + 21), WHITE);
        // Left of the badge stays accent.
        assert_eq!(*canvas.get_pixel(10, 200 + 21), c.style().accent);
    }

    #[test]
    fn render_pastes_logo_at_offset() {
        let c = compositor();
        let background = RgbaImage::from_pixel(400, 200, Rgba([0, 0, 0, 255]));
        let logo = RgbaImage::from_pixel(10, 5, Rgba([0, 255, 0, 255]));
        let (canvas, _) = c.render(
            &background,
            Some(&logo),
            &spec("T", "B", Path::new("bg"), Path::new("logo"), Path::new("out")),
        );

        // 15% of 400 = 60px wide, 30px tall at (30, 30).
        for (x, y) in [(31, 31), (88, 58)] {
            let px = canvas.get_pixel(x, y).0;
            assert!(200 < px[1] && px[0] < 50, "pixel at {x},{y}: {px:?}");
        }
        assert_eq!(*canvas.get_pixel(95, 31), Rgba([0, 0, 0, 255]));
    }
}
