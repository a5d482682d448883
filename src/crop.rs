use std::ops::Range;
use std::str::FromStr;

use image::{imageops, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::ContextError;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Which white margins are removed from a screenshot before it is placed in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CropMode {
    #[default]
    None,
    /// Left and right margins only.
    Sides,
    /// Top and bottom margins only.
    #[serde(alias = "topbottom")]
    TopBottom,
    /// Sides first, then top and bottom.
    Both,
}

impl CropMode {
    pub fn crops_sides(self) -> bool {
        matches!(self, CropMode::Sides | CropMode::Both)
    }

    pub fn crops_top_bottom(self) -> bool {
        matches!(self, CropMode::TopBottom | CropMode::Both)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CropMode::None => "none",
            CropMode::Sides => "sides",
            CropMode::TopBottom => "topbottom",
            CropMode::Both => "both",
        }
    }
}

impl std::fmt::Display for CropMode {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for CropMode {
    type Err = ContextError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "none" => Ok(CropMode::None),
            "sides" => Ok(CropMode::Sides),
            "topbottom" | "top-bottom" => Ok(CropMode::TopBottom),
            "both" => Ok(CropMode::Both),
            other => Err(ContextError::with_context(format!(
                "Unknown crop mode {:?}, expected one of none, sides, topbottom, both",
                other
            ))),
        }
    }
}

/// The columns spanned by non-white pixels, or `None` when the image is entirely white.
pub fn content_columns(image: &RgbImage) -> Option<Range<u32>> {
    let (width, height) = image.dimensions();
    let is_content_column = |x: u32| (0..height).any(|y| *image.get_pixel(x, y) != WHITE);

    let left = (0..width).find(|&x| is_content_column(x))?;
    let right = (left..width).rev().find(|&x| is_content_column(x))? + 1;
    Some(left..right)
}

/// The rows spanned by non-white pixels, or `None` when the image is entirely white.
pub fn content_rows(image: &RgbImage) -> Option<Range<u32>> {
    let (width, height) = image.dimensions();
    let is_content_row = |y: u32| (0..width).any(|x| *image.get_pixel(x, y) != WHITE);

    let top = (0..height).find(|&y| is_content_row(y))?;
    let bottom = (top..height).rev().find(|&y| is_content_row(y))? + 1;
    Some(top..bottom)
}

/// Removes the pure-white margins selected by `mode`.
///
/// An image without any non-white pixel has no bounding box and is returned unchanged.
pub fn crop_white_margins(image: &RgbImage, mode: CropMode) -> RgbImage {
    let mut cropped = image.clone();

    if mode.crops_sides() {
        match content_columns(&cropped) {
            Some(columns) => {
                let height = cropped.height();
                let narrowed = imageops::crop_imm(
                    &cropped,
                    columns.start,
                    0,
                    columns.end - columns.start,
                    height,
                )
                .to_image();
                cropped = narrowed;
            }
            None => log::debug!("No content column found, leaving the sides untouched"),
        }
    }
    if mode.crops_top_bottom() {
        match content_rows(&cropped) {
            Some(rows) => {
                let width = cropped.width();
                let shortened =
                    imageops::crop_imm(&cropped, 0, rows.start, width, rows.end - rows.start)
                        .to_image();
                cropped = shortened;
            }
            None => log::debug!("No content row found, leaving top and bottom untouched"),
        }
    }

    cropped
}
