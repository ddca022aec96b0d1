// Host-side tests for the Fibonacci-sphere layout.

use crystal_core::layout::{fibonacci_position, layout_cluster, LayoutConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[test]
fn layout_positions_are_distinct_and_off_center() {
    let cfg = LayoutConfig::default();
    for n in 1..=64usize {
        let mut rng = StdRng::seed_from_u64(n as u64);
        let positions = layout_cluster(n, &cfg, &mut rng);
        assert_eq!(positions.len(), n);
        for (i, p) in positions.iter().enumerate() {
            assert!(p.is_finite());
            assert!(p.length() > 0.0, "n={n} i={i} sits at the origin");
            for q in &positions[i + 1..] {
                assert!(p.distance(*q) > 1e-3, "n={n}: duplicate position {p:?}");
            }
        }
    }
}

#[test]
fn layout_is_reproducible_with_a_seed() {
    let cfg = LayoutConfig::default();
    let a = layout_cluster(40, &cfg, &mut StdRng::seed_from_u64(99));
    let b = layout_cluster(40, &cfg, &mut StdRng::seed_from_u64(99));
    let c = layout_cluster(40, &cfg, &mut StdRng::seed_from_u64(100));
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn layout_stays_within_jittered_shell() {
    let cfg = LayoutConfig::default();
    let (lo, hi) = cfg.radius_jitter;
    let half = cfg.height_variation * 0.5;
    let min = cfg.base_radius * lo - half;
    let max = cfg.base_radius * hi + half;
    let mut rng = StdRng::seed_from_u64(3);
    for p in layout_cluster(200, &cfg, &mut rng) {
        let d = p.length();
        assert!(d >= min - 1e-3 && d <= max + 1e-3, "distance {d} outside {min}..{max}");
    }
}

#[test]
fn without_jitter_points_lie_on_the_sphere() {
    let cfg = LayoutConfig {
        base_radius: 10.0,
        height_variation: 0.0,
        radius_jitter: (1.0, 1.0),
    };
    let mut rng = StdRng::seed_from_u64(0);
    let n = 25;
    for i in 0..n {
        let p = fibonacci_position(n, i, &cfg, &mut rng);
        assert!((p.length() - 10.0).abs() < 1e-3);
    }
    // the spiral starts at the north pole
    let first = fibonacci_position(n, 0, &cfg, &mut rng);
    assert!(first.x.abs() < 1e-5 && first.z.abs() < 1e-5);
    assert!((first.y - 10.0).abs() < 1e-4);
}

#[test]
fn polar_angle_descends_with_index() {
    let cfg = LayoutConfig {
        base_radius: 5.0,
        height_variation: 0.0,
        radius_jitter: (1.0, 1.0),
    };
    let mut rng = StdRng::seed_from_u64(1);
    let ys: Vec<f32> = layout_cluster(30, &cfg, &mut rng).iter().map(|p| p.y).collect();
    for w in ys.windows(2) {
        assert!(w[1] < w[0]);
    }
}
