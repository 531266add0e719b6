//! Image width sweep.
//!
//! Each step prints a width label and a bar image scaled to exactly that many
//! dots. The widest step that still shows both the left and the right bar is
//! the printer's usable raster width.

use std::io::Cursor;
use std::sync::OnceLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{DynamicImage, GrayImage, ImageFormat, Luma};

use crate::error::RenderError;
use crate::printer::Profile;
use crate::task::{Alignment, ImageTask, Task, TextTask};

use super::{Calibration, SubJob, SweepRange};

const BAR_IMAGE_WIDTH: u32 = 400;
const BAR_IMAGE_HEIGHT: u32 = 40;
const BAR_WIDTH: u32 = 6;
const MIDLINE_HEIGHT: u32 = 2;

/// Sweeps `image_width_px`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCalibration;

impl Calibration for ImageCalibration {
    fn name(&self) -> &'static str {
        "image_width"
    }

    fn default_range(&self) -> (i64, i64, i64) {
        (450, 700, 10)
    }

    fn bounds(&self) -> (i64, i64) {
        (10, 1500)
    }

    fn header(&self, range: &SweepRange) -> Vec<Task> {
        vec![
            Task::centered("--- IMAGE WIDTH CALIBRATION ---"),
            Task::centered(format!("Range: {}-{} px", range.start(), range.end())),
            Task::centered("Find the widest line"),
            Task::centered("with visible BOTH bars |"),
            Task::feed(1),
        ]
    }

    fn iteration(&self, value: i64, base: &Profile) -> Result<SubJob, RenderError> {
        let width = u32::try_from(value)
            .map_err(|_| RenderError::EncodeError(format!("invalid image width {value}")))?;
        let profile = Profile {
            image_width_px: width,
            ..base.clone()
        };

        let tasks = vec![
            Task::Text(TextTask {
                value: format!("{width} px"),
                align: Alignment::Center,
                wrap: false,
            }),
            Task::Image(ImageTask {
                data: bar_image()?,
                align: Alignment::Center,
            }),
        ];

        Ok(SubJob {
            value,
            profile,
            tasks,
        })
    }
}

/// Base64 PNG with a solid bar at each edge and a thin midline.
fn bar_image() -> Result<String, RenderError> {
    static CACHE: OnceLock<Result<String, RenderError>> = OnceLock::new();
    CACHE.get_or_init(encode_bar_image).clone()
}

fn encode_bar_image() -> Result<String, RenderError> {
    let mid = BAR_IMAGE_HEIGHT / 2 - MIDLINE_HEIGHT / 2;
    let img = GrayImage::from_fn(BAR_IMAGE_WIDTH, BAR_IMAGE_HEIGHT, |x, y| {
        let bar = x < BAR_WIDTH || x >= BAR_IMAGE_WIDTH - BAR_WIDTH;
        let midline = (mid..mid + MIDLINE_HEIGHT).contains(&y);
        if bar || midline { Luma([0]) } else { Luma([255]) }
    });

    let mut png = Cursor::new(Vec::new());
    DynamicImage::ImageLuma8(img)
        .write_to(&mut png, ImageFormat::Png)
        .map_err(|e| RenderError::EncodeError(e.to_string()))?;
    Ok(STANDARD.encode(png.into_inner()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render;

    #[test]
    fn test_bar_image_decodes() {
        let data = bar_image().unwrap();
        let img = render::image::decode(&data).unwrap();
        assert_eq!((img.width(), img.height()), (BAR_IMAGE_WIDTH, BAR_IMAGE_HEIGHT));
    }

    #[test]
    fn test_iteration_overrides_width() {
        let sub = ImageCalibration.iteration(512, &Profile::default()).unwrap();
        assert_eq!(sub.profile.image_width_px, 512);
        assert_eq!(sub.profile.total_chars, Profile::default().total_chars);
        assert_eq!(sub.tasks.len(), 2);
        assert_eq!(sub.tasks[1].kind(), "image");
    }

    #[test]
    fn test_bars_survive_scaling() {
        let sub = ImageCalibration.iteration(480, &Profile::default()).unwrap();
        let Task::Image(task) = &sub.tasks[1] else {
            panic!("expected image task");
        };
        let bitmap = render::image::to_bitmap(
            &render::image::decode(&task.data).unwrap(),
            sub.profile.image_width_px,
        )
        .unwrap();

        assert_eq!(bitmap.width, 480);
        let row = bitmap.height / 4;
        assert!(bitmap.is_set(0, row));
        assert!(bitmap.is_set(479, row));
        assert!(!bitmap.is_set(240, row));
    }

    #[test]
    fn test_header_mentions_range() {
        let range = SweepRange::new(450, 700, 10).unwrap();
        let header = ImageCalibration.header(&range);
        assert!(matches!(
            &header[1],
            Task::Text(t) if t.value == "Range: 450-700 px"
        ));
    }
}
