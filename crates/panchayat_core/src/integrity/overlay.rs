//! Capture-stamp overlay rendered with an 8x8 bitmap font.

use crate::model::location::GeoPoint;
use chrono::NaiveDateTime;
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Cursor;

const ORIGIN_X: u32 = 10;
const ORIGIN_Y: u32 = 10;
const GLYPH_SIZE: u32 = 8;
const SCALE: u32 = 2;
const LINE_GAP: u32 = 4;
const TEXT_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

#[derive(Debug)]
pub enum OverlayError {
    Image(image::ImageError),
    UnsupportedFormat,
}

impl Display for OverlayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Image(err) => write!(f, "{err}"),
            Self::UnsupportedFormat => write!(f, "unrecognized image format"),
        }
    }
}

impl Error for OverlayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Image(err) => Some(err),
            Self::UnsupportedFormat => None,
        }
    }
}

impl From<image::ImageError> for OverlayError {
    fn from(value: image::ImageError) -> Self {
        Self::Image(value)
    }
}

/// Text stamped onto the photo, one entry per line.
pub fn overlay_lines(captured_at: NaiveDateTime, location: Option<GeoPoint>) -> Vec<String> {
    let mut lines = vec![format!("Time: {}", captured_at.format("%Y-%m-%d %H:%M"))];
    if let Some(point) = location {
        lines.push(format!(
            "Lat: {:.4}, Long: {:.4}",
            point.latitude, point.longitude
        ));
    }
    lines
}

/// Draws the overlay and re-encodes in the source format.
pub fn annotate(
    bytes: &[u8],
    captured_at: NaiveDateTime,
    location: Option<GeoPoint>,
) -> Result<Vec<u8>, OverlayError> {
    let format = image::guess_format(bytes).map_err(|_| OverlayError::UnsupportedFormat)?;
    let decoded = image::load_from_memory_with_format(bytes, format)?;

    let mut canvas = decoded.to_rgba8();
    let line_height = GLYPH_SIZE * SCALE + LINE_GAP;
    for (index, line) in overlay_lines(captured_at, location).iter().enumerate() {
        let y = ORIGIN_Y + line_height * index as u32;
        draw_line(&mut canvas, ORIGIN_X, y, line);
    }

    let annotated = DynamicImage::ImageRgba8(canvas);
    // JPEG has no alpha channel.
    let annotated = if format == ImageFormat::Jpeg {
        DynamicImage::ImageRgb8(annotated.to_rgb8())
    } else {
        annotated
    };

    let mut out = Cursor::new(Vec::new());
    annotated.write_to(&mut out, format)?;
    Ok(out.into_inner())
}

fn draw_line(canvas: &mut RgbaImage, x: u32, y: u32, text: &str) {
    let advance = GLYPH_SIZE * SCALE;
    for (index, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        draw_glyph(canvas, x + advance * index as u32, y, &glyph);
    }
}

fn draw_glyph(canvas: &mut RgbaImage, x: u32, y: u32, glyph: &[u8; 8]) {
    for (row, bits) in glyph.iter().enumerate() {
        for col in 0..GLYPH_SIZE {
            if bits & (1 << col) == 0 {
                continue;
            }
            for dy in 0..SCALE {
                for dx in 0..SCALE {
                    let px = x + col * SCALE + dx;
                    let py = y + row as u32 * SCALE + dy;
                    if px < canvas.width() && py < canvas.height() {
                        canvas.put_pixel(px, py, TEXT_COLOR);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{annotate, overlay_lines, OverlayError};
    use crate::model::location::GeoPoint;
    use chrono::NaiveDate;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn captured_at() -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(9, 26, 53)
            .unwrap()
    }

    #[test]
    fn lines_include_coordinates_to_four_decimals() {
        let lines = overlay_lines(captured_at(), Some(GeoPoint::new(26.846_694, 80.946_166)));
        assert_eq!(lines[0], "Time: 2025-03-14 09:26");
        assert_eq!(lines[1], "Lat: 26.8467, Long: 80.9462");
    }

    #[test]
    fn lines_without_coordinates_only_carry_time() {
        assert_eq!(overlay_lines(captured_at(), None).len(), 1);
    }

    #[test]
    fn annotate_paints_red_text_near_origin() {
        let blank = DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            200,
            80,
            Rgba([255, 255, 255, 255]),
        ));
        let mut png = Cursor::new(Vec::new());
        blank.write_to(&mut png, ImageFormat::Png).unwrap();

        let annotated = annotate(&png.into_inner(), captured_at(), None).unwrap();
        let decoded = image::load_from_memory(&annotated).unwrap().to_rgba8();

        assert_eq!(decoded.dimensions(), (200, 80));
        let has_red = (10..26)
            .flat_map(|y| (10..100).map(move |x| (x, y)))
            .any(|(x, y)| *decoded.get_pixel(x, y) == Rgba([255, 0, 0, 255]));
        assert!(has_red);
    }

    #[test]
    fn annotate_rejects_unknown_bytes() {
        let err = annotate(b"plain text", captured_at(), None).unwrap_err();
        assert!(matches!(err, OverlayError::UnsupportedFormat));
    }
}
