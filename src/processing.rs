use std::path::Path;

use image::RgbImage;

use crate::classifier::Classifier;
use crate::crop::{crop_white_margins, CropMode};
use crate::error::ContextError;
use crate::label::LabelCompositor;

/// Turns an image file into the picture inserted in a document.
pub trait ImagePreparer {
    fn prepare(&self, path: &Path) -> Result<RgbImage, ContextError>;
}

/// Decodes a screenshot, crops its white margins and stamps its label, as configured.
///
/// The derivative lives in memory only; nothing is written next to the source file.
#[derive(Debug)]
pub struct ImageProcessor<'a> {
    classifier: &'a Classifier,
    crop_mode: CropMode,
    labels: Option<&'a LabelCompositor>,
}

impl<'a> ImageProcessor<'a> {
    pub fn new(
        classifier: &'a Classifier,
        crop_mode: CropMode,
        labels: Option<&'a LabelCompositor>,
    ) -> Self {
        ImageProcessor {
            classifier,
            crop_mode,
            labels,
        }
    }

    /// Applies the crop and the label to an already decoded image.
    pub fn process(&self, image: RgbImage, path: &Path) -> RgbImage {
        let image = match self.crop_mode {
            CropMode::None => image,
            crop_mode => crop_white_margins(&image, crop_mode),
        };
        match self.labels {
            Some(compositor) => {
                let label = self.classifier.extract_label(path);
                compositor.add_label(&image, &label)
            }
            None => image,
        }
    }
}

impl ImagePreparer for ImageProcessor<'_> {
    fn prepare(&self, path: &Path) -> Result<RgbImage, ContextError> {
        let image = image::open(path).map_err(|error| {
            ContextError::with_error(format!("Unable to decode the image {:?}", path), &error)
        })?;

        Ok(self.process(image.to_rgb8(), path))
    }
}
