use serde::{Deserialize, Serialize};

/// One (t, y) sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub t: f64,
    pub y: f64,
}

impl Point {
    pub fn new(t: f64, y: f64) -> Self {
        Self { t, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((t, y): (f64, f64)) -> Self {
        Self { t, y }
    }
}

/// Points produced by the Euler integrator, starting at (t0, y0).
///
/// Built once by `integrate` and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Trajectory {
    points: Vec<Point>,
}

impl Trajectory {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, t: f64, y: f64) {
        self.points.push(Point { t, y });
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<&Point> {
        self.points.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point> {
        self.points.iter()
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.t).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }
}

impl FromIterator<Point> for Trajectory {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a Trajectory {
    type Item = &'a Point;
    type IntoIter = std::slice::Iter<'a, Point>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// g(t) sampled on a uniform grid spanning [t0, t_end].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExactCurve {
    points: Vec<Point>,
}

impl ExactCurve {
    pub(crate) fn from_points(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.t).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.y).collect()
    }
}
