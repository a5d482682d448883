use std::path::PathBuf;

use ab_glyph::{FontVec, PxScale};
use image::{imageops, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use serde::{Deserialize, Serialize};

use crate::error::ContextError;

/// Font sizes of the labels are clamped to this many pixels.
const MAX_LABEL_FONT_SIZE: f32 = 512.0;
/// Width of a glyph of the built-in face, in font pixels.
const BITMAP_GLYPH_WIDTH: u32 = 5;
/// Height of a glyph of the built-in face, in font pixels.
const BITMAP_GLYPH_HEIGHT: u32 = 7;
/// Horizontal distance between two glyphs of the built-in face, in font pixels.
const BITMAP_ADVANCE: u32 = 6;
/// Cell height the font size is divided by to get the magnification of the built-in face.
const BITMAP_CELL_HEIGHT: f32 = 8.0;
/// Largest magnification of the built-in face, reached at a font size of 512.
const MAX_BITMAP_MAGNIFICATION: u32 = 64;

/// The look of the caption strip drawn above a labelled screenshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelStyle {
    /// Font size in pixels.
    pub font_size: f32,
    pub padding_x: u32,
    pub padding_y: u32,
    /// Thickness of the strip outline in pixels.
    pub border_width: u32,
    /// RGB colour of the outline and of the text.
    pub color: [u8; 3],
    /// TrueType files tried in order; the built-in face is used when none loads.
    pub font_paths: Vec<PathBuf>,
}

impl Default for LabelStyle {
    fn default() -> Self {
        LabelStyle {
            font_size: 26.0,
            padding_x: 20,
            padding_y: 10,
            border_width: 2,
            color: [0x00, 0x33, 0x66],
            font_paths: vec![
                PathBuf::from("arial.ttf"),
                PathBuf::from("C:\\Windows\\Fonts\\arial.ttf"),
                PathBuf::from("/Library/Fonts/Arial.ttf"),
                PathBuf::from("/System/Library/Fonts/Supplemental/Arial.ttf"),
                PathBuf::from("/usr/share/fonts/truetype/msttcorefonts/Arial.ttf"),
                PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            ],
        }
    }
}

/// The face the labels are written with.
pub enum Typeface {
    TrueType(FontVec),
    /// A 5x7 pixel face compiled into the crate, magnified to the font size.
    Bitmap,
}

impl std::fmt::Debug for Typeface {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Typeface::TrueType(_) => formatter.write_str("Typeface::TrueType"),
            Typeface::Bitmap => formatter.write_str("Typeface::Bitmap"),
        }
    }
}

impl Typeface {
    /// Loads the first font of the candidates that can be read and parsed, falling back to the
    /// built-in face.
    pub fn load(font_paths: &[PathBuf]) -> Typeface {
        for font_path in font_paths {
            match Typeface::from_path(font_path) {
                Ok(typeface) => {
                    log::debug!("Using the typeface {:?} for the labels", font_path);
                    return typeface;
                }
                Err(error) => log::debug!("{}", error),
            }
        }
        log::debug!("No preferred typeface available, using the built-in one");

        Typeface::Bitmap
    }

    pub fn from_path(font_path: &std::path::Path) -> Result<Typeface, ContextError> {
        let font_bytes = std::fs::read(font_path).map_err(|error| {
            ContextError::with_error(format!("Unable to read the font {:?}", font_path), &error)
        })?;
        let font = FontVec::try_from_vec(font_bytes).map_err(|error| {
            ContextError::with_error(format!("Unable to parse the font {:?}", font_path), &error)
        })?;

        Ok(Typeface::TrueType(font))
    }

    /// The extent in pixels of the rendered text.
    pub fn text_size(&self, text: &str, font_size: f32) -> (u32, u32) {
        match self {
            Typeface::TrueType(font) => text_size(PxScale::from(font_size), font, text),
            Typeface::Bitmap => {
                let magnification = bitmap_magnification(font_size);
                let glyph_count = text.chars().count() as u32;
                if glyph_count == 0 {
                    return (0, 0);
                }
                let width = glyph_count
                    .saturating_mul(BITMAP_ADVANCE)
                    .saturating_sub(BITMAP_ADVANCE - BITMAP_GLYPH_WIDTH)
                    .saturating_mul(magnification);
                (width, BITMAP_GLYPH_HEIGHT * magnification)
            }
        }
    }

    /// Draws the text with its top-left corner at the given position.
    pub fn draw_text(
        &self,
        canvas: &mut RgbImage,
        text: &str,
        font_size: f32,
        color: Rgb<u8>,
        position: (i32, i32),
    ) {
        match self {
            Typeface::TrueType(font) => draw_text_mut(
                canvas,
                color,
                position.0,
                position.1,
                PxScale::from(font_size),
                font,
                text,
            ),
            Typeface::Bitmap => {
                let magnification = bitmap_magnification(font_size) as i32;
                let advance = BITMAP_ADVANCE as i32 * magnification;
                let mut glyph_x = position.0;
                for character in text.chars() {
                    // Glyphs past the right edge are never visible
                    if glyph_x >= canvas.width() as i32 {
                        break;
                    }
                    draw_bitmap_glyph(canvas, character, (glyph_x, position.1), magnification, color);
                    glyph_x = glyph_x.saturating_add(advance);
                }
            }
        }
    }
}

/// The integer scale of the built-in face for a font size, between 1 and
/// `MAX_BITMAP_MAGNIFICATION`.
fn bitmap_magnification(font_size: f32) -> u32 {
    let magnification = (font_size / BITMAP_CELL_HEIGHT).round();
    if magnification.is_nan() {
        return 1;
    }
    // The cast saturates, negative sizes become zero
    (magnification as u32).clamp(1, MAX_BITMAP_MAGNIFICATION)
}

fn draw_bitmap_glyph(
    canvas: &mut RgbImage,
    character: char,
    origin: (i32, i32),
    magnification: i32,
    color: Rgb<u8>,
) {
    let (canvas_width, canvas_height) = (canvas.width() as i32, canvas.height() as i32);
    for (row, pattern) in bitmap_glyph(character).iter().enumerate() {
        for column in 0..BITMAP_GLYPH_WIDTH as i32 {
            if pattern & (1 << (BITMAP_GLYPH_WIDTH as i32 - 1 - column)) == 0 {
                continue;
            }
            for dy in 0..magnification {
                for dx in 0..magnification {
                    let x = origin.0 + column * magnification + dx;
                    let y = origin.1 + row as i32 * magnification + dy;
                    if (0..canvas_width).contains(&x) && (0..canvas_height).contains(&y) {
                        canvas.put_pixel(x as u32, y as u32, color);
                    }
                }
            }
        }
    }
}

/// Rows of the built-in face, bit 4 being the leftmost pixel. Lowercase letters share the
/// uppercase shapes.
fn bitmap_glyph(character: char) -> [u8; 7] {
    match character.to_ascii_uppercase() {
        'A' => [0b01110, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'B' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10001, 0b10001, 0b11110],
        'C' => [0b01110, 0b10001, 0b10000, 0b10000, 0b10000, 0b10001, 0b01110],
        'D' => [0b11110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11110],
        'E' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b11111],
        'F' => [0b11111, 0b10000, 0b10000, 0b11110, 0b10000, 0b10000, 0b10000],
        'G' => [0b01110, 0b10001, 0b10000, 0b10111, 0b10001, 0b10001, 0b01111],
        'H' => [0b10001, 0b10001, 0b10001, 0b11111, 0b10001, 0b10001, 0b10001],
        'I' => [0b01110, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        'J' => [0b00111, 0b00010, 0b00010, 0b00010, 0b00010, 0b10010, 0b01100],
        'K' => [0b10001, 0b10010, 0b10100, 0b11000, 0b10100, 0b10010, 0b10001],
        'L' => [0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b10000, 0b11111],
        'M' => [0b10001, 0b11011, 0b10101, 0b10101, 0b10001, 0b10001, 0b10001],
        'N' => [0b10001, 0b11001, 0b10101, 0b10011, 0b10001, 0b10001, 0b10001],
        'O' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'P' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10000, 0b10000, 0b10000],
        'Q' => [0b01110, 0b10001, 0b10001, 0b10001, 0b10101, 0b10010, 0b01101],
        'R' => [0b11110, 0b10001, 0b10001, 0b11110, 0b10100, 0b10010, 0b10001],
        'S' => [0b01111, 0b10000, 0b10000, 0b01110, 0b00001, 0b00001, 0b11110],
        'T' => [0b11111, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100, 0b00100],
        'U' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01110],
        'V' => [0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b01010, 0b00100],
        'W' => [0b10001, 0b10001, 0b10001, 0b10101, 0b10101, 0b10101, 0b01010],
        'X' => [0b10001, 0b10001, 0b01010, 0b00100, 0b01010, 0b10001, 0b10001],
        'Y' => [0b10001, 0b10001, 0b01010, 0b00100, 0b00100, 0b00100, 0b00100],
        'Z' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b11111],
        '0' => [0b01110, 0b10001, 0b10011, 0b10101, 0b11001, 0b10001, 0b01110],
        '1' => [0b00100, 0b01100, 0b00100, 0b00100, 0b00100, 0b00100, 0b01110],
        '2' => [0b01110, 0b10001, 0b00001, 0b00110, 0b01000, 0b10000, 0b11111],
        '3' => [0b01110, 0b10001, 0b00001, 0b00110, 0b00001, 0b10001, 0b01110],
        '4' => [0b00010, 0b00110, 0b01010, 0b10010, 0b11111, 0b00010, 0b00010],
        '5' => [0b11111, 0b10000, 0b11110, 0b00001, 0b00001, 0b10001, 0b01110],
        '6' => [0b01110, 0b10000, 0b10000, 0b11110, 0b10001, 0b10001, 0b01110],
        '7' => [0b11111, 0b00001, 0b00010, 0b00100, 0b01000, 0b10000, 0b10000],
        '8' => [0b01110, 0b10001, 0b10001, 0b01110, 0b10001, 0b10001, 0b01110],
        '9' => [0b01110, 0b10001, 0b10001, 0b01111, 0b00001, 0b00001, 0b01110],
        ' ' => [0; 7],
        '_' => [0, 0, 0, 0, 0, 0, 0b11111],
        '-' => [0, 0, 0, 0b11111, 0, 0, 0],
        '+' => [0, 0b00100, 0b00100, 0b11111, 0b00100, 0b00100, 0],
        '.' => [0, 0, 0, 0, 0, 0b01100, 0b01100],
        ',' => [0, 0, 0, 0, 0b01100, 0b00100, 0b01000],
        ':' => [0, 0b01100, 0b01100, 0, 0b01100, 0b01100, 0],
        '/' => [0b00001, 0b00010, 0b00010, 0b00100, 0b01000, 0b01000, 0b10000],
        '(' => [0b00010, 0b00100, 0b01000, 0b01000, 0b01000, 0b00100, 0b00010],
        ')' => [0b01000, 0b00100, 0b00010, 0b00010, 0b00010, 0b00100, 0b01000],
        '%' => [0b11001, 0b11010, 0b00100, 0b01000, 0b10000, 0b01011, 0b10011],
        _ => [0b11111, 0b10001, 0b10001, 0b10001, 0b10001, 0b10001, 0b11111],
    }
}

/// Stamps captions above screenshots.
#[derive(Debug)]
pub struct LabelCompositor {
    style: LabelStyle,
    typeface: Typeface,
}

impl LabelCompositor {
    pub fn new(style: LabelStyle, typeface: Typeface) -> Self {
        LabelCompositor { style, typeface }
    }

    /// Builds a compositor with the first typeface of the style that loads.
    pub fn from_style(style: LabelStyle) -> Self {
        let typeface = Typeface::load(&style.font_paths);
        LabelCompositor { style, typeface }
    }

    pub fn style(&self) -> &LabelStyle {
        &self.style
    }

    /// Returns a new image made of a bordered strip holding the centred label, with the
    /// original image right below it.
    pub fn add_label(&self, image: &RgbImage, label: &str) -> RgbImage {
        let style = &self.style;
        let color = Rgb(style.color);
        let font_size = style.font_size.clamp(1.0, MAX_LABEL_FONT_SIZE);
        let (text_width, text_height) = self.typeface.text_size(label, font_size);

        let strip_height = text_height.saturating_add(style.padding_y.saturating_mul(2));
        let width = image
            .width()
            .max(text_width.saturating_add(style.padding_x.saturating_mul(2)));
        let height = image.height().saturating_add(strip_height);
        let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));

        for inset in 0..style.border_width {
            let inner_width = width.saturating_sub(2 * inset);
            let inner_height = strip_height.saturating_sub(2 * inset);
            if inner_width > 0 && inner_height > 0 {
                let rect = Rect::at(inset as i32, inset as i32).of_size(inner_width, inner_height);
                draw_hollow_rect_mut(&mut canvas, rect, color);
            }
        }

        let text_x = ((width - text_width) / 2) as i32;
        self.typeface.draw_text(
            &mut canvas,
            label,
            font_size,
            color,
            (text_x, style.padding_y.min(i32::MAX as u32) as i32),
        );
        imageops::replace(&mut canvas, image, 0, strip_height as i64);

        canvas
    }
}
