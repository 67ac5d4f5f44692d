//! Natural cubic spline through tone-curve control points.
//!
//! Control points live in the unit square with an inverted y axis: `y = 1`
//! is black and `y = 0` is white, so the identity curve runs from `(0, 1)`
//! to `(1, 0)`. The spline is interpolating, with zero second derivative at
//! both ends.
//!
//! # Algorithm
//!
//! Second derivatives `M_i` come from the tridiagonal system
//!
//! ```text
//! a_i M_{i-1} + b_i M_i + c_i M_{i+1} = d_i
//! a_i = (x_i - x_{i-1}) / 6
//! b_i = (x_{i+1} - x_{i-1}) / 3
//! c_i = (x_{i+1} - x_i) / 6
//! d_i = (y_{i+1} - y_i) / (x_{i+1} - x_i) - (y_i - y_{i-1}) / (x_i - x_{i-1})
//! ```
//!
//! with the first and last rows pinned to `M = 0`, solved in O(n) by the
//! Thomas algorithm.

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ControlPoint;

// ============================================================================
// Solver
// ============================================================================

/// Solve for the second derivative at every control point.
///
/// # Arguments
///
/// * `points` - At least two points with strictly increasing x
///
/// # Returns
///
/// One second derivative per point; the first and last are zero.
pub fn solve_natural_spline(points: &[ControlPoint]) -> Result<Vec<f64>, DomainError> {
    let n = points.len();
    if n < 2 {
        return Err(DomainError::InsufficientPoints { count: n });
    }
    validate_order(points)?;

    let mut sub = vec![0.0f64; n];
    let mut diag = vec![0.0f64; n];
    let mut sup = vec![0.0f64; n];
    let mut rhs = vec![0.0f64; n];
    diag[0] = 1.0;
    diag[n - 1] = 1.0;

    for i in 1..n - 1 {
        let (prev, cur, next) = (points[i - 1], points[i], points[i + 1]);
        let dx_prev = f64::from(cur.x) - f64::from(prev.x);
        let dx_next = f64::from(next.x) - f64::from(cur.x);
        let dx_span = f64::from(next.x) - f64::from(prev.x);
        let dy_prev = f64::from(cur.y) - f64::from(prev.y);
        let dy_next = f64::from(next.y) - f64::from(cur.y);

        sub[i] = dx_prev / 6.0;
        diag[i] = dx_span / 3.0;
        sup[i] = dx_next / 6.0;
        rhs[i] = dy_next / dx_next - dy_prev / dx_prev;
    }

    // Forward elimination
    for i in 1..n {
        let m = sub[i] / diag[i - 1];
        diag[i] -= m * sup[i - 1];
        rhs[i] -= m * rhs[i - 1];
    }

    // Back substitution
    let mut solution = vec![0.0f64; n];
    solution[n - 1] = rhs[n - 1] / diag[n - 1];
    for i in (0..n - 1).rev() {
        solution[i] = (rhs[i] - sup[i] * solution[i + 1]) / diag[i];
    }

    Ok(solution)
}

fn validate_order(points: &[ControlPoint]) -> Result<(), DomainError> {
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(DomainError::NotFinite);
    }
    for (i, pair) in points.windows(2).enumerate() {
        if pair[1].x == pair[0].x {
            return Err(DomainError::DuplicateX { x: pair[1].x });
        }
        if pair[1].x < pair[0].x {
            return Err(DomainError::PointOutOfOrder { index: i + 1 });
        }
    }
    Ok(())
}

fn validate_in_unit_square(x: f32, y: f32) -> Result<(), DomainError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(DomainError::NotFinite);
    }
    if !(0.0..=1.0).contains(&x) || !(0.0..=1.0).contains(&y) {
        return Err(DomainError::PointOutOfRange { x, y });
    }
    Ok(())
}

// ============================================================================
// Editable spline
// ============================================================================

/// One user edit of a curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CurveEdit {
    Insert { x: f32, y: f32 },
    Move { index: usize, x: f32, y: f32 },
    Delete { index: usize },
    Reset,
}

/// Ordered control points of one tone curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ControlPoint>", into = "Vec<ControlPoint>")]
pub struct Spline {
    points: Vec<ControlPoint>,
}

impl Default for Spline {
    fn default() -> Self {
        Self::identity()
    }
}

impl TryFrom<Vec<ControlPoint>> for Spline {
    type Error = DomainError;

    fn try_from(points: Vec<ControlPoint>) -> Result<Self, Self::Error> {
        Self::from_points(points)
    }
}

impl From<Spline> for Vec<ControlPoint> {
    fn from(spline: Spline) -> Self {
        spline.points
    }
}

impl Spline {
    /// The straight line from black to white.
    pub fn identity() -> Self {
        Self {
            points: vec![ControlPoint::new(0.0, 1.0), ControlPoint::new(1.0, 0.0)],
        }
    }

    /// Build from arbitrary points, sorting them by x.
    pub fn from_points(mut points: Vec<ControlPoint>) -> Result<Self, DomainError> {
        if points.len() < 2 {
            return Err(DomainError::InsufficientPoints {
                count: points.len(),
            });
        }
        for p in &points {
            validate_in_unit_square(p.x, p.y)?;
        }
        points.sort_by(|a, b| a.x.total_cmp(&b.x));
        validate_order(&points)?;
        Ok(Self { points })
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// True only for exactly the two identity endpoints.
    pub fn is_identity(&self) -> bool {
        self.points.len() == 2
            && self.points[0] == ControlPoint::new(0.0, 1.0)
            && self.points[1] == ControlPoint::new(1.0, 0.0)
    }

    pub fn reset(&mut self) {
        *self = Self::identity();
    }

    /// Add a point, keeping x order. Returns its index.
    pub fn insert(&mut self, point: ControlPoint) -> Result<usize, DomainError> {
        validate_in_unit_square(point.x, point.y)?;
        let index = self.points.partition_point(|p| p.x < point.x);
        if self.points.get(index).is_some_and(|p| p.x == point.x) {
            return Err(DomainError::DuplicateX { x: point.x });
        }
        self.points.insert(index, point);
        Ok(index)
    }

    /// True when x can sit at `index` without passing a neighbour.
    pub fn is_point_contained(&self, x: f32, index: usize) -> bool {
        let after_prev = index == 0 || self.points.get(index - 1).map_or(true, |p| p.x < x);
        let before_next = self.points.get(index + 1).map_or(true, |p| x < p.x);
        after_prev && before_next
    }

    /// Move a point. A move that would reach or pass a neighbour is
    /// rejected and the point stays where it was.
    pub fn move_point(&mut self, index: usize, x: f32, y: f32) -> Result<(), DomainError> {
        let len = self.points.len();
        if index >= len {
            return Err(DomainError::IndexOutOfRange { index, len });
        }
        validate_in_unit_square(x, y)?;
        if !self.is_point_contained(x, index) {
            return Err(DomainError::PointOutOfOrder { index });
        }
        self.points[index] = ControlPoint::new(x, y);
        Ok(())
    }

    /// Remove a point. Dropping below two points resets to identity.
    pub fn delete(&mut self, index: usize) -> Result<(), DomainError> {
        let len = self.points.len();
        if index >= len {
            return Err(DomainError::IndexOutOfRange { index, len });
        }
        self.points.remove(index);
        if self.points.len() < 2 {
            self.reset();
        }
        Ok(())
    }

    pub fn apply_edit(&mut self, edit: &CurveEdit) -> Result<(), DomainError> {
        match *edit {
            CurveEdit::Insert { x, y } => self.insert(ControlPoint::new(x, y)).map(|_| ()),
            CurveEdit::Move { index, x, y } => self.move_point(index, x, y),
            CurveEdit::Delete { index } => self.delete(index),
            CurveEdit::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    pub fn solve(&self) -> Result<SolvedSpline, DomainError> {
        let derivatives = solve_natural_spline(&self.points)?;
        Ok(SolvedSpline {
            points: self.points.clone(),
            derivatives,
        })
    }
}

// ============================================================================
// Evaluation
// ============================================================================

/// A spline together with its solved second derivatives.
#[derive(Debug, Clone, PartialEq)]
pub struct SolvedSpline {
    points: Vec<ControlPoint>,
    derivatives: Vec<f64>,
}

impl SolvedSpline {
    pub fn derivatives(&self) -> &[f64] {
        &self.derivatives
    }

    /// Curve value at `x`, held flat outside the first and last point.
    pub fn evaluate(&self, x: f64) -> f64 {
        let pts = &self.points;
        let (first, last) = (pts[0], pts[pts.len() - 1]);
        if x <= f64::from(first.x) {
            return f64::from(first.y);
        }
        if x >= f64::from(last.x) {
            return f64::from(last.y);
        }

        let i = find_interval(pts, x);
        let (x1, y1) = (f64::from(pts[i].x), f64::from(pts[i].y));
        let (x2, y2) = (f64::from(pts[i + 1].x), f64::from(pts[i + 1].y));

        let delta = x2 - x1;
        let b = (x - x1) / delta;
        let a = 1.0 - b;
        let tc = (a * a * a - a) * self.derivatives[i];
        let td = (b * b * b - b) * self.derivatives[i + 1];
        a * y1 + b * y2 + (delta * delta / 6.0) * (tc + td)
    }

    /// Output intensity for each of the 256 input levels, in [0, 1].
    pub fn applied_curve(&self) -> [f32; 256] {
        let mut curve = [0.0f32; 256];
        for (i, out) in curve.iter_mut().enumerate() {
            let y = self.evaluate(i as f64 / 255.0).clamp(0.0, 1.0);
            *out = (1.0 - y) as f32;
        }
        curve
    }
}

/// Binary search for the segment containing x.
fn find_interval(points: &[ControlPoint], x: f64) -> usize {
    let n = points.len();
    if n <= 2 {
        return 0;
    }

    let mut low = 0;
    let mut high = n - 2;

    while low < high {
        let mid = (low + high).div_ceil(2);
        if f64::from(points[mid].x) <= x {
            low = mid;
        } else {
            high = mid - 1;
        }
    }

    low
}
