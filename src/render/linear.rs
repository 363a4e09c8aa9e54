use super::SwatchRenderer;
use crate::error::RenderError;

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 200;
pub const MAX_DIMENSION: u32 = 4096;

/// Horizontal two-stop gradient, primary on the left edge and secondary on
/// the right, encoded as an 8-bit RGB PNG.
#[derive(Debug, Clone, Copy)]
pub struct LinearGradientRenderer {
    width: u32,
    height: u32,
}

impl LinearGradientRenderer {
    pub fn new(width: u32, height: u32) -> Result<Self, RenderError> {
        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(RenderError::InvalidSize { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn row(&self, primary: u32, secondary: u32) -> Vec<u8> {
        let from = channels(primary);
        let to = channels(secondary);
        let span = f64::from(self.width.saturating_sub(1).max(1));

        let mut row = Vec::with_capacity(self.width as usize * 3);
        for x in 0..self.width {
            let t = f64::from(x) / span;
            for (start, end) in from.iter().zip(to.iter()) {
                row.push(mix(*start, *end, t));
            }
        }
        row
    }
}

impl Default for LinearGradientRenderer {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl SwatchRenderer for LinearGradientRenderer {
    fn render(&self, primary: u32, secondary: u32) -> Result<Vec<u8>, RenderError> {
        let row = self.row(primary, secondary);
        let mut pixels = Vec::with_capacity(row.len() * self.height as usize);
        for _ in 0..self.height {
            pixels.extend_from_slice(&row);
        }

        let mut encoded = Vec::new();
        let mut encoder = png::Encoder::new(&mut encoded, self.width, self.height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&pixels)?;
        writer.finish()?;
        Ok(encoded)
    }
}

fn channels(color: u32) -> [u8; 3] {
    let [_, red, green, blue] = color.to_be_bytes();
    [red, green, blue]
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn mix(start: u8, end: u8, t: f64) -> u8 {
    let value = f64::from(start) + (f64::from(end) - f64::from(start)) * t;
    value.round().clamp(0.0, 255.0) as u8
}
