use approx::assert_abs_diff_eq;
use smartcore::linalg::basic::arrays::{Array, Array2};
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::errors::ShapeSpaceError;
use crate::interpolation::*;
use crate::tests::test_helpers::{matrix, random_vec};

use log::debug;

fn plateau() -> FeatureGrid {
    FeatureGrid::from_matrix(&matrix(vec![
        vec![0.0, 0.0, 0.0, 0.0],
        vec![0.0, 1.0, 1.0, 0.0],
        vec![0.0, 1.0, 1.0, 0.0],
        vec![0.0, 0.0, 0.0, 0.0],
    ])).unwrap()
}

fn random_grid(channels: usize, rows: usize, cols: usize, seed: u64) -> FeatureGrid {
    FeatureGrid::new(channels, rows, cols, random_vec(channels * rows * cols, seed)).unwrap()
}

#[test]
fn test_plateau_scenario() {
    crate::tests::init();
    let grid = plateau();
    let out = GridInterpolator::default().interpolate(&grid, &[[0.5, 0.5], [0.01, 0.01]]);

    assert_eq!(out.shape(), (2, 1));
    assert_abs_diff_eq!(*out.get((0, 0)), 1.0, epsilon = 1e-12);
    assert!(out.get((1, 0)).abs() < 1e-4, "near-corner value {}", out.get((1, 0)));
}

#[test]
fn test_corners_return_stored_values() {
    let grid = FeatureGrid::from_matrix(&matrix(vec![
        vec![1.0, 2.0, 3.0, 4.0],
        vec![5.0, 6.0, 7.0, 8.0],
        vec![9.0, 10.0, 11.0, 12.0],
        vec![13.0, 14.0, 15.0, 16.0],
    ])).unwrap();
    let points = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
    let out = GridInterpolator::default().interpolate(&grid, &points);

    // x follows columns, y follows rows
    assert_abs_diff_eq!(*out.get((0, 0)), 1.0, epsilon = 1e-6);
    assert_abs_diff_eq!(*out.get((1, 0)), 4.0, epsilon = 1e-6);
    assert_abs_diff_eq!(*out.get((2, 0)), 13.0, epsilon = 1e-6);
    assert_abs_diff_eq!(*out.get((3, 0)), 16.0, epsilon = 1e-6);
}

#[test]
fn test_interior_nodes_are_exact() {
    let grid = random_grid(1, 5, 5, 1);
    let mut points = Vec::new();
    let mut expected = Vec::new();
    for r in 1..4 {
        for c in 1..4 {
            points.push([c as f64 / 4.0, r as f64 / 4.0]);
            expected.push(grid.get(0, r, c));
        }
    }
    let out = GridInterpolator::default().interpolate(&grid, &points);
    for (i, e) in expected.iter().enumerate() {
        assert_abs_diff_eq!(*out.get((i, 0)), *e, epsilon = 1e-12);
    }
}

#[test]
fn test_no_overshoot_between_monotone_nodes() {
    // strictly increasing along x in every row
    let grid = FeatureGrid::from_matrix(&DenseMatrix::from_iterator(
        (0..4).flat_map(|r| (0..4).map(move |c| (c * c) as f64 + r as f64 * 0.1)),
        4,
        4,
        0,
    )).unwrap();
    let interp = GridInterpolator::default();
    let points: Vec<[f64; 2]> = (0..=60).map(|i| [i as f64 / 60.0, 1.0 / 3.0]).collect();
    let out = interp.interpolate(&grid, &points);

    for (i, p) in points.iter().enumerate() {
        let x = (p[0] * 3.0).min(3.0 - 1e-12);
        let c0 = x.floor() as usize;
        let c1 = (c0 + 1).min(3);
        let (lo, hi) = (grid.get(0, 1, c0), grid.get(0, 1, c1));
        let v = *out.get((i, 0));
        assert!(v >= lo - 1e-9 && v <= hi + 1e-9, "{} outside [{}, {}] at x={}", v, lo, hi, p[0]);
    }
    for i in 1..points.len() {
        assert!(out.get((i - 1, 0)) <= out.get((i, 0)));
    }
}

#[test]
fn test_smoothstep_range_and_endpoints() {
    assert_eq!(smoothstep(2.0, 5.0, 0.0), 2.0);
    assert_eq!(smoothstep(2.0, 5.0, 1.0), 5.0);
    assert_abs_diff_eq!(smoothstep(2.0, 5.0, 0.5), 3.5, epsilon = 1e-15);
    for i in 0..=20 {
        let v = smoothstep(-1.0, 1.0, i as f64 / 20.0);
        assert!((-1.0..=1.0).contains(&v));
    }
    assert_abs_diff_eq!(linstep(2.0, 5.0, 0.25), 2.75, epsilon = 1e-15);
}

#[test]
fn test_blend_modes() {
    let grid = FeatureGrid::from_matrix(&matrix(vec![vec![0.0, 1.0], vec![2.0, 3.0]])).unwrap();
    let p = [[0.25, 0.5]];

    let linear = GridInterpolator::default().with_blend(Blend::Linear).interpolate(&grid, &p);
    assert_abs_diff_eq!(*linear.get((0, 0)), 1.25, epsilon = 1e-12);

    // smoothstep(0.25) = 0.15625, smoothstep(0.5) = 0.5
    let smooth = GridInterpolator::default().interpolate(&grid, &p);
    assert_abs_diff_eq!(*smooth.get((0, 0)), 1.15625, epsilon = 1e-12);
}

#[test]
fn test_channels_are_interpolated_independently() {
    let base = random_vec(25, 5);
    let data: Vec<f64> = base.iter().copied().chain(base.iter().map(|v| 2.0 * v + 1.0)).collect();
    let grid = FeatureGrid::new(2, 5, 5, data).unwrap();

    let points: Vec<[f64; 2]> = (0..10).map(|i| [0.07 * i as f64 + 0.1, 0.9 - 0.08 * i as f64]).collect();
    let out = GridInterpolator::default().interpolate(&grid, &points);
    assert_eq!(out.shape(), (10, 2));
    for i in 0..10 {
        assert_abs_diff_eq!(*out.get((i, 1)), 2.0 * out.get((i, 0)) + 1.0, epsilon = 1e-12);
    }
}

#[test]
fn test_out_of_range_points_are_clamped() {
    let grid = plateau();
    let interp = GridInterpolator::default();
    let inside = interp.interpolate(&grid, &[[0.0, 0.4], [1.0, 0.4]]);
    let outside = interp.interpolate(&grid, &[[-3.0, 0.4], [7.5, 0.4]]);
    assert_abs_diff_eq!(*inside.get((0, 0)), *outside.get((0, 0)), epsilon = 1e-12);
    assert_abs_diff_eq!(*inside.get((1, 0)), *outside.get((1, 0)), epsilon = 1e-12);

    let grads = interp.interpolate_with_gradient(&grid, &[[-3.0, 0.4]]);
    assert_eq!(*grads.d_dx.get((0, 0)), 0.0);
}

#[test]
fn test_coordinate_gradient_matches_finite_differences() {
    let grid = random_grid(2, 6, 5, 9);
    let interp = GridInterpolator::default();
    let points = [[0.37, 0.61], [0.12, 0.83], [0.9, 0.05]];
    let out = interp.interpolate_with_gradient(&grid, &points);

    let h = 1e-6;
    for (i, p) in points.iter().enumerate() {
        let plus_x = interp.interpolate(&grid, &[[p[0] + h, p[1]]]);
        let minus_x = interp.interpolate(&grid, &[[p[0] - h, p[1]]]);
        let plus_y = interp.interpolate(&grid, &[[p[0], p[1] + h]]);
        let minus_y = interp.interpolate(&grid, &[[p[0], p[1] - h]]);
        for c in 0..2 {
            let fd_x = (plus_x.get((0, c)) - minus_x.get((0, c))) / (2.0 * h);
            let fd_y = (plus_y.get((0, c)) - minus_y.get((0, c))) / (2.0 * h);
            assert_abs_diff_eq!(*out.d_dx.get((i, c)), fd_x, epsilon = 1e-5);
            assert_abs_diff_eq!(*out.d_dy.get((i, c)), fd_y, epsilon = 1e-5);
            assert_abs_diff_eq!(*out.values.get((i, c)), *interp.interpolate(&grid, &[*p]).get((0, c)));
        }
    }
}

#[test]
fn test_smooth_gradient_vanishes_at_nodes() {
    let grid = random_grid(1, 5, 5, 4);
    let out = GridInterpolator::default().interpolate_with_gradient(&grid, &[[0.25, 0.5], [0.75, 0.25]]);
    for i in 0..2 {
        assert_abs_diff_eq!(*out.d_dx.get((i, 0)), 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(*out.d_dy.get((i, 0)), 0.0, epsilon = 1e-12);
    }

    // the linear blend has a constant slope inside the cell
    let lin = GridInterpolator::default()
        .with_blend(Blend::Linear)
        .interpolate_with_gradient(&grid, &[[0.3, 0.5]]);
    let expected = (grid.get(0, 2, 2) - grid.get(0, 2, 1)) * 4.0;
    assert_abs_diff_eq!(*lin.d_dx.get((0, 0)), expected, epsilon = 1e-10);
}

#[test]
fn test_grid_gradient_is_adjoint_of_interpolation() {
    let grid = random_grid(2, 4, 6, 21);
    let interp = GridInterpolator::default();
    let points: Vec<[f64; 2]> = (0..15).map(|i| [(i as f64 * 0.37) % 1.0, (i as f64 * 0.61) % 1.0]).collect();
    let upstream_flat = random_vec(points.len() * 2, 22);
    let upstream = DenseMatrix::from_iterator(upstream_flat.iter().copied(), points.len(), 2, 0);

    let values = interp.interpolate(&grid, &points);
    let grad = interp.grid_gradient(&grid, &points, &upstream).unwrap();
    assert_eq!(grad.shape(), grid.shape());

    // interpolation is linear in the grid: <grad, grid> = <upstream, values>
    let lhs: f64 = grad.data().iter().zip(grid.data().iter()).map(|(a, b)| a * b).sum();
    let mut rhs = 0.0;
    for i in 0..points.len() {
        for c in 0..2 {
            rhs += upstream.get((i, c)) * values.get((i, c));
        }
    }
    debug!("adjoint check: {} vs {}", lhs, rhs);
    assert_abs_diff_eq!(lhs, rhs, epsilon = 1e-10);
}

#[test]
fn test_grid_gradient_weights_sum_to_one_per_point() {
    let grid = FeatureGrid::zeros(1, 5, 5).unwrap();
    let points: Vec<[f64; 2]> = (0..7).map(|i| [0.13 * i as f64, 1.0 - 0.11 * i as f64]).collect();
    let ones = DenseMatrix::from_iterator(std::iter::repeat(1.0).take(7), 7, 1, 0);
    let grad = GridInterpolator::default().grid_gradient(&grid, &points, &ones).unwrap();
    assert_abs_diff_eq!(grad.data().iter().sum::<f64>(), 7.0, epsilon = 1e-12);
}

#[test]
fn test_grid_gradient_rejects_bad_upstream() {
    let grid = random_grid(2, 3, 3, 2);
    let upstream = DenseMatrix::from_iterator(std::iter::repeat(1.0).take(4), 4, 1, 0);
    let err = GridInterpolator::default()
        .grid_gradient(&grid, &[[0.5, 0.5]; 4], &upstream)
        .unwrap_err();
    assert!(matches!(err, ShapeSpaceError::ShapeMismatch { .. }));
}

#[test]
fn test_feature_grid_construction() {
    let err = FeatureGrid::new(2, 3, 3, vec![0.0; 17]).unwrap_err();
    assert_eq!(
        err,
        ShapeSpaceError::GridData { channels: 2, rows: 3, cols: 3, expected: 18, found: 17 }
    );

    let a = matrix(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    let b = matrix(vec![vec![5.0, 6.0], vec![7.0, 8.0]]);
    let grid = FeatureGrid::from_channels(&[a.clone(), b]).unwrap();
    assert_eq!(grid.shape(), (2, 2, 2));
    assert_eq!(grid.get(1, 1, 0), 7.0);
    let first = grid.channel(0);
    for r in 0..2 {
        for c in 0..2 {
            assert_eq!(first.get((r, c)), a.get((r, c)));
        }
    }

    let bad = matrix(vec![vec![1.0, 2.0, 3.0]]);
    assert!(FeatureGrid::from_channels(&[a, bad]).is_err());

    let mut z = FeatureGrid::zeros(1, 2, 2).unwrap();
    z.set(0, 1, 1, 3.0);
    assert_eq!(z.data(), &[0.0, 0.0, 0.0, 3.0]);
}

#[test]
fn test_epsilon_is_kept_in_range() {
    assert_eq!(GridInterpolator::new(0.7).epsilon, 0.5);
    assert_eq!(GridInterpolator::new(-1.0).epsilon, 0.0);
    assert_eq!(GridInterpolator::default().epsilon, DEFAULT_EPSILON);
    assert_eq!(GridInterpolator::default().blend, Blend::Smooth);
}

#[test]
fn test_free_function_matches_default_interpolator() {
    let grid = random_grid(1, 4, 4, 8);
    let points = [[0.2, 0.3], [0.8, 0.45]];
    let a = interpolate(&grid, &points, DEFAULT_EPSILON);
    let b = GridInterpolator::default().interpolate(&grid, &points);
    for i in 0..points.len() {
        assert_eq!(a.get((i, 0)), b.get((i, 0)));
    }
}

#[test]
fn test_feature_grid_rejects_empty_spatial_dims() {
    for (rows, cols) in [(0, 3), (3, 0), (0, 0)] {
        let err = FeatureGrid::new(1, rows, cols, Vec::new()).unwrap_err();
        assert!(matches!(err, ShapeSpaceError::GridData { .. }), "{}x{} gave {:?}", rows, cols, err);
        assert!(FeatureGrid::zeros(2, rows, cols).is_err());
    }
    assert_eq!(
        FeatureGrid::new(1, 0, 3, Vec::new()).unwrap_err(),
        ShapeSpaceError::GridData { channels: 1, rows: 0, cols: 3, expected: 0, found: 0 }
    );
    let empty = FeatureGrid::from_channels(&[]).unwrap();
    assert_eq!(empty.shape(), (0, 0, 0));
}
