//! Monitor region management

use crate::error::{SkillError, SkillResult};
use serde::{Deserialize, Serialize};

/// Size and origin of the active display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl DisplayBounds {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }
}

/// Screen rectangle captured on every detection cycle.
///
/// Persisted as `[x, y, width, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[i32; 4]", into = "[i32; 4]")]
pub struct MonitorRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl MonitorRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> SkillResult<Self> {
        if width == 0 || height == 0 {
            return Err(SkillError::InvalidRegion {
                description: format!("{width}x{height} has no area"),
            });
        }
        // Persisted as four i32 values
        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(SkillError::InvalidRegion {
                description: format!("{width}x{height} exceeds {}", i32::MAX),
            });
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Region spanned by two opposite corners, in either order
    pub fn from_corners(x1: i32, y1: i32, x2: i32, y2: i32) -> SkillResult<Self> {
        let width = x1.abs_diff(x2);
        let height = y1.abs_diff(y2);
        Self::new(x1.min(x2), y1.min(y2), width, height)
    }

    /// Intersect with the display. Never grows the region; errors when
    /// nothing of it is on screen.
    pub fn clamp_to(&self, bounds: DisplayBounds) -> SkillResult<Self> {
        let left = i64::from(self.x).max(i64::from(bounds.x));
        let top = i64::from(self.y).max(i64::from(bounds.y));
        let right = (i64::from(self.x) + i64::from(self.width))
            .min(i64::from(bounds.x) + i64::from(bounds.width));
        let bottom = (i64::from(self.y) + i64::from(self.height))
            .min(i64::from(bounds.y) + i64::from(bounds.height));

        if right <= left || bottom <= top {
            return Err(SkillError::InvalidRegion {
                description: format!(
                    "{}x{} at ({}, {}) lies outside the {}x{} display",
                    self.width, self.height, self.x, self.y, bounds.width, bounds.height
                ),
            });
        }

        let clamped = Self {
            x: left as i32,
            y: top as i32,
            width: (right - left) as u32,
            height: (bottom - top) as u32,
        };
        if clamped != *self {
            log::info!(
                "📐 Monitor region clamped from {:?} to {:?}",
                self.as_array(),
                clamped.as_array()
            );
        }
        Ok(clamped)
    }

    pub fn as_array(&self) -> [i32; 4] {
        let clamp = |v: u32| i32::try_from(v).unwrap_or(i32::MAX);
        [self.x, self.y, clamp(self.width), clamp(self.height)]
    }

    pub fn from_array(values: [i32; 4]) -> SkillResult<Self> {
        let [x, y, width, height] = values;
        if width <= 0 || height <= 0 {
            return Err(SkillError::InvalidRegion {
                description: format!("{width}x{height} has no area"),
            });
        }
        Self::new(x, y, width as u32, height as u32)
    }

    /// Check if this region contains a screen point
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        let (x, y) = (i64::from(x), i64::from(y));
        x >= i64::from(self.x)
            && x < i64::from(self.x) + i64::from(self.width)
            && y >= i64::from(self.y)
            && y < i64::from(self.y) + i64::from(self.height)
    }
}

impl TryFrom<[i32; 4]> for MonitorRegion {
    type Error = SkillError;

    fn try_from(values: [i32; 4]) -> Result<Self, Self::Error> {
        Self::from_array(values)
    }
}

impl From<MonitorRegion> for [i32; 4] {
    fn from(region: MonitorRegion) -> Self {
        region.as_array()
    }
}
