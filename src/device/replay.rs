//! Capture sources backed by image files

use super::types::ScreenCapture;
use crate::error::{SkillError, SkillResult};
use crate::skill_automation::match_image::{DisplayBounds, MonitorRegion};
use image::{RgbImage, imageops};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Cut `region` out of a full-screen frame.
///
/// A frame that already has the region's size is taken as pre-cropped.
pub fn crop_to_region(frame: &RgbImage, region: &MonitorRegion) -> SkillResult<RgbImage> {
    if frame.dimensions() == (region.width, region.height) {
        return Ok(frame.clone());
    }
    let fits = region.x >= 0
        && region.y >= 0
        && region.x as u64 + region.width as u64 <= frame.width() as u64
        && region.y as u64 + region.height as u64 <= frame.height() as u64;
    if !fits {
        return Err(SkillError::capture_failed(format!(
            "region {:?} does not fit in a {}x{} frame",
            region.as_array(),
            frame.width(),
            frame.height()
        )));
    }
    Ok(imageops::crop_imm(frame, region.x as u32, region.y as u32, region.width, region.height).to_image())
}

/// Replays a directory of PNG frames in file-name order, one per capture
pub struct FrameSequenceCapture {
    frames: Vec<PathBuf>,
    next: AtomicUsize,
    looping: bool,
}

impl FrameSequenceCapture {
    pub fn from_dir(directory: impl AsRef<Path>, looping: bool) -> SkillResult<Self> {
        let directory = directory.as_ref();
        let entries = std::fs::read_dir(directory).map_err(|source| SkillError::Io {
            path: directory.to_path_buf(),
            source,
        })?;

        let mut frames: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .and_then(|ext| ext.to_str())
                        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
            })
            .collect();
        frames.sort();

        if frames.is_empty() {
            return Err(SkillError::capture_failed(format!(
                "no PNG frames in {}",
                directory.display()
            )));
        }
        log::info!("🎞️ Loaded {} frames from {}", frames.len(), directory.display());
        Ok(Self::from_paths(frames, looping))
    }

    pub fn from_paths(frames: Vec<PathBuf>, looping: bool) -> Self {
        Self {
            frames,
            next: AtomicUsize::new(0),
            looping,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    fn next_frame(&self) -> SkillResult<&Path> {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        let index = if self.looping && !self.frames.is_empty() {
            index % self.frames.len()
        } else {
            index
        };
        self.frames
            .get(index)
            .map(PathBuf::as_path)
            .ok_or_else(|| SkillError::capture_failed("frame sequence exhausted"))
    }
}

impl ScreenCapture for FrameSequenceCapture {
    fn capture(&self, region: &MonitorRegion) -> SkillResult<RgbImage> {
        let path = self.next_frame()?;
        log::debug!("📸 Replaying frame {}", path.display());
        let frame = image::open(path)
            .map_err(|e| SkillError::capture_failed(format!("{}: {}", path.display(), e)))?
            .to_rgb8();
        crop_to_region(&frame, region)
    }

    fn display_bounds(&self) -> Option<DisplayBounds> {
        let first = self.frames.first()?;
        let (width, height) = image::image_dimensions(first).ok()?;
        Some(DisplayBounds::new(width, height))
    }
}

/// Returns the same image on every capture
pub struct StillCapture {
    image: RgbImage,
}

impl StillCapture {
    pub fn new(image: RgbImage) -> Self {
        Self { image }
    }

    pub fn open(path: impl AsRef<Path>) -> SkillResult<Self> {
        let path = path.as_ref();
        let image = image::open(path)
            .map_err(|source| SkillError::ImageCodec {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        Ok(Self::new(image))
    }
}

impl ScreenCapture for StillCapture {
    fn capture(&self, region: &MonitorRegion) -> SkillResult<RgbImage> {
        crop_to_region(&self.image, region)
    }

    fn display_bounds(&self) -> Option<DisplayBounds> {
        Some(DisplayBounds::new(self.image.width(), self.image.height()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("skill-trigger-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_crop_full_frame() {
        let frame = RgbImage::from_fn(40, 30, |x, y| Rgb([x as u8, y as u8, 0]));
        let region = MonitorRegion::new(5, 7, 10, 8).unwrap();
        let crop = crop_to_region(&frame, &region).unwrap();
        assert_eq!(crop.dimensions(), (10, 8));
        assert_eq!(crop.get_pixel(0, 0), &Rgb([5, 7, 0]));

        let outside = MonitorRegion::new(35, 0, 10, 8).unwrap();
        assert!(matches!(
            crop_to_region(&frame, &outside),
            Err(SkillError::CaptureFailed { .. })
        ));
    }

    #[test]
    fn test_pre_cropped_frame_passes_through() {
        let frame = RgbImage::from_pixel(10, 8, Rgb([1, 2, 3]));
        let region = MonitorRegion::new(500, 600, 10, 8).unwrap();
        assert_eq!(crop_to_region(&frame, &region).unwrap(), frame);
    }

    #[test]
    fn test_frame_sequence_order_and_exhaustion() {
        let dir = temp_dir("frames");
        for (name, shade) in [("002.png", 20u8), ("001.png", 10), ("003.png", 30)] {
            RgbImage::from_pixel(4, 4, Rgb([shade, 0, 0]))
                .save(dir.join(name))
                .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let region = MonitorRegion::new(0, 0, 4, 4).unwrap();
        let capture = FrameSequenceCapture::from_dir(&dir, false).unwrap();
        assert_eq!(capture.len(), 3);
        assert_eq!(capture.display_bounds(), Some(DisplayBounds::new(4, 4)));

        let shades: Vec<u8> = (0..3)
            .map(|_| capture.capture(&region).unwrap().get_pixel(0, 0)[0])
            .collect();
        assert_eq!(shades, vec![10, 20, 30]);
        assert!(matches!(
            capture.capture(&region),
            Err(SkillError::CaptureFailed { .. })
        ));

        let looping = FrameSequenceCapture::from_dir(&dir, true).unwrap();
        for _ in 0..3 {
            looping.capture(&region).unwrap();
        }
        assert_eq!(looping.capture(&region).unwrap().get_pixel(0, 0)[0], 10);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_empty_directory_rejected() {
        let dir = temp_dir("empty-frames");
        assert!(FrameSequenceCapture::from_dir(&dir, false).is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
