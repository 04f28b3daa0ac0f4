//! Geometry and classification types shared by the emotion pipeline.

use serde::{Deserialize, Serialize};

/// Axis-aligned face bounding box in frame pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl FaceBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn centroid(&self) -> (f32, f32) {
        (
            self.x as f32 + self.width as f32 / 2.0,
            self.y as f32 + self.height as f32 / 2.0,
        )
    }

    pub fn area(&self) -> f32 {
        self.width as f32 * self.height as f32
    }

    pub fn diagonal(&self) -> f32 {
        (self.area_sides_squared()).sqrt()
    }

    fn area_sides_squared(&self) -> f32 {
        let w = self.width as f32;
        let h = self.height as f32;
        w * w + h * h
    }

    pub fn centroid_distance(&self, other: &FaceBox) -> f32 {
        let (ax, ay) = self.centroid();
        let (bx, by) = other.centroid();
        ((ax - bx).powi(2) + (ay - by).powi(2)).sqrt()
    }

    /// Intersection over union, 0.0 for disjoint boxes.
    pub fn iou(&self, other: &FaceBox) -> f32 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = (self.x + self.width).min(other.x + other.width);
        let bottom = (self.y + self.height).min(other.y + other.height);

        if right <= left || bottom <= top {
            return 0.0;
        }

        let intersection = (right - left) as f32 * (bottom - top) as f32;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }

    /// Both sides at least `min_size` pixels.
    pub fn is_at_least(&self, min_size: u32) -> bool {
        self.width >= min_size && self.height >= min_size
    }

    /// Clip the box to a `width` x `height` frame. `None` if nothing remains.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<FaceBox> {
        if self.x >= width || self.y >= height {
            return None;
        }
        let w = self.width.min(width - self.x);
        let h = self.height.min(height - self.y);
        if w == 0 || h == 0 {
            return None;
        }
        Some(FaceBox::new(self.x, self.y, w, h))
    }
}

/// Output of the emotion classifier for one face crop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub emotion: String,
    pub confidence: f32,
}

/// A detected and classified face in one frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaceReading {
    pub face: FaceBox,
    pub emotion: String,
    pub confidence: f32,
}
