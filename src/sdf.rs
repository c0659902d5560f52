//! # Signed distance fields of polygonal shapes
//!
//! A [`Shape`] is a set of closed polygonal [`Boundary`] loops; loops flagged
//! as holes cut material out of the loop that contains them. The signed
//! distance of a point is its Euclidean distance to the nearest boundary
//! segment, positive inside the material and negative outside. Inside/outside
//! is decided by even-odd crossing over *all* loops, so it does not depend on
//! the winding direction of the input.
//!
//! [`rasterise`] samples a shape on a square grid over `[xymin, xymax]^2` with
//! the same convention as the rest of the crate: row index follows `y`,
//! column index follows `x`, and the first/last row/column sit exactly on the
//! bounds.
//!
//! ## Text format
//!
//! [`Shape`] implements `FromStr` for the plain numeric format produced by
//! the geometry generator:
//!
//! ```text
//! <num_boundaries>
//! <num_points> <is_hole>
//! <x> <y>
//! ...
//! ```
//!
//! Numbers may be separated by any whitespace or commas.

use std::str::FromStr;

use log::{debug, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::arrays::Array2;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::errors::{Result, ShapeSpaceError};
use crate::sampling::linspace;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Distance from `p` to the closed segment `a -> b`.
pub fn segment_distance(p: &Point, a: &Point, b: &Point) -> f64 {
    let (vx, vy) = (b.x - a.x, b.y - a.y);
    let len2 = vx * vx + vy * vy;
    let t = if len2 > 0.0 {
        (((p.x - a.x) * vx + (p.y - a.y) * vy) / len2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    p.distance(&Point::new(a.x + t * vx, a.y + t * vy))
}

/// One closed polygonal loop; the last point connects back to the first.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub points: Vec<Point>,
    pub is_hole: bool,
}

impl Boundary {
    pub fn new(points: Vec<Point>, is_hole: bool) -> Self {
        Self { points, is_hole }
    }

    /// Segments `(p_i, p_{i+1})`, closing with `(p_last, p_0)`.
    pub fn segments(&self) -> impl Iterator<Item = (&Point, &Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (&self.points[i], &self.points[(i + 1) % n]))
    }

    /// Shoelace area, positive for counter-clockwise loops.
    pub fn signed_area(&self) -> f64 {
        0.5 * self.segments().map(|(a, b)| a.x * b.y - b.x * a.y).sum::<f64>()
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() >= 0.0
    }

    pub fn distance(&self, p: &Point) -> f64 {
        self.segments()
            .map(|(a, b)| segment_distance(p, a, b))
            .fold(f64::INFINITY, f64::min)
    }

    /// Even-odd crossing test.
    pub fn contains(&self, p: &Point) -> bool {
        let mut inside = false;
        for (a, b) in self.segments() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub boundaries: Vec<Boundary>,
}

impl Shape {
    pub fn new(boundaries: Vec<Boundary>) -> Self {
        Self { boundaries }
    }

    /// Material area: outer loops minus holes.
    pub fn area(&self) -> f64 {
        self.boundaries
            .iter()
            .map(|b| {
                let a = b.signed_area().abs();
                if b.is_hole {
                    -a
                } else {
                    a
                }
            })
            .sum()
    }

    pub fn contains(&self, p: &Point) -> bool {
        self.boundaries.iter().filter(|b| b.contains(p)).count() % 2 == 1
    }

    pub fn unsigned_distance(&self, p: &Point) -> f64 {
        self.boundaries
            .iter()
            .map(|b| b.distance(p))
            .fold(f64::INFINITY, f64::min)
    }

    /// Positive inside the material, negative outside.
    pub fn signed_distance(&self, p: &Point) -> f64 {
        let d = self.unsigned_distance(p);
        if self.contains(p) {
            d
        } else {
            -d
        }
    }

    /// Signed distance at each point.
    pub fn evaluate(&self, points: &[Point]) -> Vec<f64> {
        points.par_iter().map(|p| self.signed_distance(p)).collect()
    }
}

fn next_number<T: FromStr>(tokens: &mut dyn Iterator<Item = &str>, what: &str) -> Result<T> {
    let tok = tokens
        .next()
        .ok_or_else(|| ShapeSpaceError::ShapeParse(format!("unexpected end of input, expected {}", what)))?;
    tok.parse::<T>()
        .map_err(|_| ShapeSpaceError::ShapeParse(format!("invalid {}: {:?}", what, tok)))
}

impl FromStr for Shape {
    type Err = ShapeSpaceError;

    fn from_str(s: &str) -> Result<Self> {
        let mut tokens = s
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty());

        let num_bounds: usize = next_number(&mut tokens, "boundary count")?;
        let mut boundaries = Vec::with_capacity(num_bounds);

        for b in 0..num_bounds {
            let num_points: usize = next_number(&mut tokens, "point count")?;
            if num_points == 0 {
                return Err(ShapeSpaceError::ShapeParse(format!("boundary {} has no points", b)));
            }
            let hole: i64 = next_number(&mut tokens, "hole flag")?;

            let mut points = Vec::with_capacity(num_points);
            for _ in 0..num_points {
                let x: f64 = next_number(&mut tokens, "x coordinate")?;
                let y: f64 = next_number(&mut tokens, "y coordinate")?;
                points.push(Point::new(x, y));
            }
            boundaries.push(Boundary::new(points, hole != 0));
        }

        debug!("Parsed shape with {} boundaries", boundaries.len());
        Ok(Shape { boundaries })
    }
}

/// Sample the signed distance of `shape` on a `res x res` grid over
/// `[xymin, xymax]^2`; entry `(row, col)` holds the value at `(x_col, y_row)`.
pub fn rasterise(shape: &Shape, xymin: f64, xymax: f64, res: usize) -> Result<DenseMatrix<f64>> {
    if !(xymin.is_finite() && xymax.is_finite()) || xymin >= xymax {
        return Err(ShapeSpaceError::InvalidBounds { lb: xymin, ub: xymax });
    }
    if res == 0 {
        return Err(ShapeSpaceError::DegenerateMesh(res));
    }
    info!("Rasterising SDF on {}x{} grid over [{}, {}]", res, res, xymin, xymax);

    let span = xymax - xymin;
    let coords: Vec<f64> = linspace(res).into_iter().map(|t| xymin + t * span).collect();
    let flat: Vec<f64> = coords
        .par_iter()
        .flat_map_iter(|&y| {
            coords.iter().map(move |&x| shape.signed_distance(&Point::new(x, y)))
        })
        .collect();

    Ok(DenseMatrix::from_iterator(flat.into_iter(), res, res, 0))
}
