//! Screen geometry in logical (click-space) coordinates.

use serde::{Deserialize, Serialize};

/// A point in logical screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A rectangular screen region in logical coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Center of this region.
    pub fn center(&self) -> Point {
        Point::new((self.x + self.w / 2) as i32, (self.y + self.h / 2) as i32)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x as i32
            && point.x < (self.x + self.w) as i32
            && point.y >= self.y as i32
            && point.y < (self.y + self.h) as i32
    }

    /// Clip this region so it fits inside a `width` x `height` screen.
    pub fn clipped_to(&self, width: u32, height: u32) -> Region {
        let x = self.x.min(width.saturating_sub(1));
        let y = self.y.min(height.saturating_sub(1));
        Region {
            x,
            y,
            w: self.w.min(width.saturating_sub(x)),
            h: self.h.min(height.saturating_sub(y)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_of_region() {
        let region = Region::new(100, 200, 40, 20);
        assert_eq!(region.center(), Point::new(120, 210));
    }

    #[test]
    fn contains_is_half_open() {
        let region = Region::new(10, 10, 10, 10);
        assert!(region.contains(Point::new(10, 10)));
        assert!(region.contains(Point::new(19, 19)));
        assert!(!region.contains(Point::new(20, 10)));
        assert!(!region.contains(Point::new(9, 15)));
    }

    #[test]
    fn clips_to_screen_bounds() {
        let region = Region::new(1000, 2200, 200, 200).clipped_to(1080, 2280);
        assert_eq!(region.x, 1000);
        assert_eq!(region.w, 80);
        assert_eq!(region.y, 2200);
        assert_eq!(region.h, 80);
    }
}
