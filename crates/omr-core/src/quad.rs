use nalgebra::Point2;

/// Four ordered vertices describing a detected region in source-image pixel
/// coordinates: top-left, top-right, bottom-right, bottom-left.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quadrilateral {
    pub top_left: Point2<f32>,
    pub top_right: Point2<f32>,
    pub bottom_right: Point2<f32>,
    pub bottom_left: Point2<f32>,
}

impl Quadrilateral {
    /// Build from four points in arbitrary winding order, re-ordering them by
    /// the sum/difference rule: top-left has the smallest `x+y`, bottom-right
    /// the largest; top-right has the smallest `x-y`, bottom-left the largest.
    pub fn from_unordered(points: [Point2<f32>; 4]) -> Self {
        let ordered = order_quad_points(points);
        Self {
            top_left: ordered[0],
            top_right: ordered[1],
            bottom_right: ordered[2],
            bottom_left: ordered[3],
        }
    }

    pub fn as_array(&self) -> [Point2<f32>; 4] {
        [self.top_left, self.top_right, self.bottom_right, self.bottom_left]
    }

    /// Shoelace-formula area of the polygon.
    pub fn area(&self) -> f64 {
        let pts = self.as_array();
        let mut sum = 0.0_f64;
        for i in 0..4 {
            let a = pts[i];
            let b = pts[(i + 1) % 4];
            sum += a.x as f64 * b.y as f64 - b.x as f64 * a.y as f64;
        }
        (sum / 2.0).abs()
    }

    /// `width / height` of the axis-aligned bounding box.
    pub fn bbox_aspect(&self) -> f64 {
        let pts = self.as_array();
        let (mut min_x, mut max_x) = (f32::MAX, f32::MIN);
        let (mut min_y, mut max_y) = (f32::MAX, f32::MIN);
        for p in pts {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        let w = (max_x - min_x) as f64;
        let h = (max_y - min_y) as f64;
        if h.abs() < 1e-9 {
            0.0
        } else {
            w / h
        }
    }

    /// Center x-coordinate of the axis-aligned bounding box.
    pub fn bbox_center_x(&self) -> f64 {
        let pts = self.as_array();
        let (mut min_x, mut max_x) = (f32::MAX, f32::MIN);
        for p in pts {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
        }
        ((min_x + max_x) / 2.0) as f64
    }

    pub fn bbox_top_y(&self) -> f32 {
        self.as_array().iter().map(|p| p.y).fold(f32::MAX, f32::min)
    }

    /// Center y-coordinate of the axis-aligned bounding box.
    pub fn bbox_center_y(&self) -> f64 {
        let pts = self.as_array();
        let (mut min_y, mut max_y) = (f32::MAX, f32::MIN);
        for p in pts {
            min_y = min_y.min(p.y);
            max_y = max_y.max(p.y);
        }
        ((min_y + max_y) / 2.0) as f64
    }

    /// Destination width for rectification: the larger of the top/bottom edge lengths.
    pub fn dest_width(&self) -> f32 {
        let top = dist(self.top_left, self.top_right);
        let bottom = dist(self.bottom_left, self.bottom_right);
        top.max(bottom)
    }

    /// Destination height for rectification: the larger of the left/right edge lengths.
    pub fn dest_height(&self) -> f32 {
        let left = dist(self.top_left, self.bottom_left);
        let right = dist(self.top_right, self.bottom_right);
        left.max(right)
    }
}

fn dist(a: Point2<f32>, b: Point2<f32>) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Order four arbitrary points as top-left, top-right, bottom-right, bottom-left
/// using the sum/difference rule from the perspective-rectification contract.
pub fn order_quad_points(points: [Point2<f32>; 4]) -> [Point2<f32>; 4] {
    let mut by_sum = points;
    by_sum.sort_by(|a, b| (a.x + a.y).partial_cmp(&(b.x + b.y)).unwrap());
    let top_left = by_sum[0];
    let bottom_right = by_sum[3];

    let mut by_diff = points;
    by_diff.sort_by(|a, b| (a.x - a.y).partial_cmp(&(b.x - b.y)).unwrap());
    let top_right = by_diff[3];
    let bottom_left = by_diff[0];

    [top_left, top_right, bottom_right, bottom_left]
}

/// A [`Quadrilateral`] plus the bounding-box metrics the region detector uses
/// for part-specific filtering.
#[derive(Clone, Copy, Debug)]
pub struct Region {
    pub quad: Quadrilateral,
    pub area: f64,
    pub bbox_aspect: f64,
}

impl Region {
    pub fn new(quad: Quadrilateral) -> Self {
        Self { area: quad.area(), bbox_aspect: quad.bbox_aspect(), quad }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_a_rotated_square() {
        // Supply points in a shuffled order; all four corners of a unit square.
        let pts = [
            Point2::new(10.0, 0.0),
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
        ];
        let q = Quadrilateral::from_unordered(pts);
        assert_eq!(q.top_left, Point2::new(0.0, 0.0));
        assert_eq!(q.top_right, Point2::new(10.0, 0.0));
        assert_eq!(q.bottom_right, Point2::new(10.0, 10.0));
        assert_eq!(q.bottom_left, Point2::new(0.0, 10.0));
    }

    #[test]
    fn area_of_unit_square_scaled() {
        let pts = [
            Point2::new(0.0, 0.0),
            Point2::new(100.0, 0.0),
            Point2::new(100.0, 200.0),
            Point2::new(0.0, 200.0),
        ];
        let q = Quadrilateral::from_unordered(pts);
        assert!((q.area() - 20_000.0).abs() < 1e-6);
        assert!((q.bbox_aspect() - 0.5).abs() < 1e-6);
    }
}
