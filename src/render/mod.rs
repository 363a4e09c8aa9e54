//! Preview swatches shown with a proposal.

pub mod linear;

use crate::error::RenderError;

pub use linear::LinearGradientRenderer;

pub const PREVIEW_FILE_NAME: &str = "gradient.png";

/// Turns a color pair into encoded image bytes.
pub trait SwatchRenderer: Send + Sync {
    fn render(&self, primary: u32, secondary: u32) -> Result<Vec<u8>, RenderError>;
}
