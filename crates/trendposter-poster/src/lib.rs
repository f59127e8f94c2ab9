pub mod compose;
pub mod face;
pub mod layout;

pub use compose::{
    Compositor, PosterConfig, PosterError, PosterResult, PosterSpec, PosterStyle, RenderedPoster,
};
pub use face::{
    FaceError, FaceResult, FontSpec, PosterFonts, RusttypeFace, TextExtent, Typeface,
};
pub use layout::wrap;

pub const LOG_TARGET: &str = "trendposter::poster";
