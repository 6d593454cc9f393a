use serde::{Deserialize, Serialize};

/// A 2D point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// A bounding box defined by top-left corner, width, and height.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Pixel area shared by two axis-aligned boxes.
    ///
    /// Boxes that only touch along an edge or at a corner share no area.
    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        let width = (right - left).max(0.0);
        let height = (bottom - top).max(0.0);
        width * height
    }
}

/// Head orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Orientation {
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
}

impl Orientation {
    pub const fn new(roll: f64, pitch: f64, yaw: f64) -> Self {
        Self { roll, pitch, yaw }
    }
}

/// A facial keypoint together with the annotator's visibility confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub position: Point,
    pub visibility: f64,
}

impl Landmark {
    pub const fn new(x: f64, y: f64, visibility: f64) -> Self {
        Self {
            position: Point::new(x, y),
            visibility,
        }
    }

    /// Whether the landmark is confident enough to crop around.
    /// The comparison is strict: a score equal to the threshold is rejected.
    pub fn is_visible(&self, threshold: f64) -> bool {
        self.visibility > threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_distance_and_midpoint() {
        let a = Point::new(1.0, 2.0);
        let b = Point::new(4.0, 6.0);

        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.midpoint(&b), Point::new(2.5, 4.0));
    }

    #[test]
    fn self_intersection_is_area() {
        let bbox = BoundingBox::new(100.0, 100.0, 70.0, 40.0);
        assert_eq!(bbox.intersection_area(&bbox), bbox.area());
        assert_eq!(bbox.area(), 2800.0);
    }

    #[test]
    fn partial_overlap() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 8.0, 10.0, 10.0);
        assert_eq!(a.intersection_area(&b), 10.0);
        assert_eq!(b.intersection_area(&a), 10.0);
    }

    #[test]
    fn touching_boxes_do_not_intersect() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);

        // Shared edge
        let right = BoundingBox::new(10.0, 0.0, 5.0, 10.0);
        let below = BoundingBox::new(0.0, 10.0, 10.0, 5.0);
        assert_eq!(a.intersection_area(&right), 0.0);
        assert_eq!(a.intersection_area(&below), 0.0);

        // Shared corner
        let corner = BoundingBox::new(10.0, 10.0, 3.0, 3.0);
        assert_eq!(a.intersection_area(&corner), 0.0);

        // Disjoint
        let far = BoundingBox::new(50.0, 50.0, 3.0, 3.0);
        assert_eq!(a.intersection_area(&far), 0.0);
    }

    #[test]
    fn contained_box() {
        let outer = BoundingBox::new(0.0, 0.0, 100.0, 100.0);
        let inner = BoundingBox::new(10.0, 20.0, 5.0, 4.0);
        assert_eq!(outer.intersection_area(&inner), inner.area());
    }

    #[test]
    fn landmark_visibility_is_strict() {
        assert!(Landmark::new(0.0, 0.0, 0.9).is_visible(0.5));
        assert!(!Landmark::new(0.0, 0.0, 0.5).is_visible(0.5));
        assert!(!Landmark::new(0.0, 0.0, 0.3).is_visible(0.5));
    }
}
