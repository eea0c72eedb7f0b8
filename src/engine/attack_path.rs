//! Looping playback of attack vectors along arcing cubic Bézier curves.
//!
//! Progress wraps modulo 1.0, so a path replays indefinitely until cleared.
//! The animator never schedules itself: the frame driver calls `advance`
//! and must stop once a path is inactive.

use super::vector::Vector3;
use crate::error::{Result, ThreatMapError};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use uuid::Uuid;

/// Cubic Bézier curve in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicBezier {
    pub p0: Vector3,
    pub p1: Vector3,
    pub p2: Vector3,
    pub p3: Vector3,
}

impl CubicBezier {
    pub fn new(control_points: [Vector3; 4]) -> Self {
        let [p0, p1, p2, p3] = control_points;
        Self { p0, p1, p2, p3 }
    }

    /// Arc from `source` to `target` with both inner control points lifted
    /// above the chord by `arc_height_factor` × chord length.
    pub fn arc(source: Vector3, target: Vector3, arc_height_factor: f64) -> Self {
        let lift = Vector3::UP.scale(source.distance_to(&target) * arc_height_factor);
        Self {
            p0: source,
            p1: source.lerp(&target, 0.25).add(&lift),
            p2: source.lerp(&target, 0.75).add(&lift),
            p3: target,
        }
    }

    pub fn point_at(&self, t: f64) -> Vector3 {
        let u = 1.0 - t;
        let b0 = u * u * u;
        let b1 = 3.0 * u * u * t;
        let b2 = 3.0 * u * t * t;
        let b3 = t * t * t;
        self.p0
            .scale(b0)
            .add(&self.p1.scale(b1))
            .add(&self.p2.scale(b2))
            .add(&self.p3.scale(b3))
    }
}

/// One visualized attack vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimatedPath {
    pub id: Uuid,
    pub curve: CubicBezier,
    /// Always in [0, 1).
    pub progress_fraction: f64,
    pub speed_per_tick: f64,
    pub active: bool,
    /// Source/target entity ids when created from a threat pair.
    pub endpoints: Option<(u64, u64)>,
}

impl AnimatedPath {
    pub fn new(curve: CubicBezier, speed_per_tick: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            curve,
            progress_fraction: 0.0,
            speed_per_tick,
            active: true,
            endpoints: None,
        }
    }

    pub fn position(&self) -> Vector3 {
        self.curve.point_at(self.progress_fraction)
    }

    /// Fade-in/fade-out pulse over one loop.
    pub fn opacity(&self) -> f64 {
        (self.progress_fraction * PI).sin()
    }
}

/// Build a path directly from four control points.
pub fn create_path(control_points: [Vector3; 4], speed_per_tick: f64) -> AnimatedPath {
    AnimatedPath::new(CubicBezier::new(control_points), speed_per_tick)
}

/// Move `path` forward by `delta_fraction` and return the new position.
pub fn advance(path: &mut AnimatedPath, delta_fraction: f64) -> Result<Vector3> {
    if !path.active {
        return Err(ThreatMapError::InactivePath(path.id));
    }
    if !delta_fraction.is_finite() {
        return Err(ThreatMapError::InvalidDelta(delta_fraction));
    }
    path.progress_fraction = wrap_unit(path.progress_fraction + delta_fraction);
    Ok(path.position())
}

pub fn clear(path: &mut AnimatedPath) {
    path.active = false;
}

fn wrap_unit(p: f64) -> f64 {
    let wrapped = p.rem_euclid(1.0);
    // rem_euclid can round tiny negatives up to exactly 1.0
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}

/// Owns every live attack vector path.
#[derive(Debug, Default)]
pub struct PathAnimator {
    paths: Vec<AnimatedPath>,
}

impl PathAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_path(&mut self, control_points: [Vector3; 4], speed_per_tick: f64) -> Uuid {
        let path = create_path(control_points, speed_per_tick);
        let id = path.id;
        self.paths.push(path);
        id
    }

    /// Arcing path between two threats. Replaces any existing path for the
    /// same source/target pair.
    pub fn create_vector_path(
        &mut self,
        source_id: u64,
        source: Vector3,
        target_id: u64,
        target: Vector3,
        arc_height_factor: f64,
        speed_per_tick: f64,
    ) -> Uuid {
        let before = self.paths.len();
        self.paths
            .retain(|p| p.endpoints != Some((source_id, target_id)));
        if self.paths.len() != before {
            log::debug!("Superseded attack vector {} -> {}", source_id, target_id);
        }

        let mut path = AnimatedPath::new(CubicBezier::arc(source, target, arc_height_factor), speed_per_tick);
        path.endpoints = Some((source_id, target_id));
        let id = path.id;
        self.paths.push(path);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<&AnimatedPath> {
        self.paths.iter().find(|p| p.id == id)
    }

    pub fn advance(&mut self, id: Uuid, delta_fraction: f64) -> Result<Vector3> {
        let path = self
            .paths
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ThreatMapError::UnknownPath(id))?;
        advance(path, delta_fraction)
    }

    pub fn clear(&mut self, id: Uuid) -> Result<()> {
        let path = self
            .paths
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(ThreatMapError::UnknownPath(id))?;
        clear(path);
        Ok(())
    }

    pub fn clear_all(&mut self) {
        self.paths.iter_mut().for_each(clear);
    }

    /// Drop inactive paths. Returns how many were removed.
    pub fn prune_inactive(&mut self) -> usize {
        let before = self.paths.len();
        self.paths.retain(|p| p.active);
        before - self.paths.len()
    }

    pub fn paths(&self) -> &[AnimatedPath] {
        &self.paths
    }

    pub fn paths_mut(&mut self) -> impl Iterator<Item = &mut AnimatedPath> {
        self.paths.iter_mut()
    }

    pub fn active_count(&self) -> usize {
        self.paths.iter().filter(|p| p.active).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vector3, b: Vector3) -> bool {
        a.distance_to(&b) < 1e-9
    }

    fn sample_path() -> AnimatedPath {
        AnimatedPath::new(
            CubicBezier::arc(Vector3::new(0.0, 0.0, 0.0), Vector3::new(100.0, 0.0, 0.0), 0.5),
            0.01,
        )
    }

    #[test]
    fn test_curve_endpoints() {
        let curve = CubicBezier::arc(Vector3::new(1.0, 2.0, 3.0), Vector3::new(-4.0, 0.0, 9.0), 0.5);
        assert!(close(curve.point_at(0.0), Vector3::new(1.0, 2.0, 3.0)));
        assert!(close(curve.point_at(1.0), Vector3::new(-4.0, 0.0, 9.0)));
    }

    #[test]
    fn test_arc_rises_above_chord() {
        let curve = CubicBezier::arc(Vector3::ZERO, Vector3::new(100.0, 0.0, 0.0), 0.5);
        let apex = curve.point_at(0.5);
        // Both inner control points sit 50 above the chord: apex = 0.75 * 50.
        assert!((apex.y - 37.5).abs() < 1e-9, "apex y = {}", apex.y);
        assert!((apex.x - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_full_loop_returns_to_start() {
        let mut path = sample_path();
        let start = path.position();
        let mut last = start;
        for _ in 0..4 {
            last = advance(&mut path, 0.25).unwrap();
        }
        assert_eq!(path.progress_fraction, 0.0);
        assert!(close(last, start));
    }

    #[test]
    fn test_many_small_steps_wrap() {
        let mut path = sample_path();
        for _ in 0..10 {
            advance(&mut path, 0.1).unwrap();
        }
        let p = path.progress_fraction;
        // Accumulated rounding may leave progress just below 1.0 instead of 0.0.
        assert!(p < 1e-9 || p > 1.0 - 1e-9, "progress should wrap near 0, got {}", p);
        assert!(path.active);
    }

    #[test]
    fn test_progress_stays_in_unit_interval() {
        let mut path = sample_path();
        for delta in [0.7, 0.7, 2.3, -0.4, -1e-18, 0.0] {
            advance(&mut path, delta).unwrap();
            assert!(
                (0.0..1.0).contains(&path.progress_fraction),
                "progress out of range: {}",
                path.progress_fraction
            );
        }
    }

    #[test]
    fn test_does_not_stop_at_end() {
        let mut path = sample_path();
        advance(&mut path, 0.9).unwrap();
        advance(&mut path, 0.2).unwrap();
        assert!(path.active);
        assert!((path.progress_fraction - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_advance_after_clear_fails() {
        let mut path = sample_path();
        clear(&mut path);
        assert_eq!(advance(&mut path, 0.1), Err(ThreatMapError::InactivePath(path.id)));
        assert_eq!(path.progress_fraction, 0.0);
    }

    #[test]
    fn test_non_finite_delta_rejected() {
        let mut path = sample_path();
        assert!(matches!(advance(&mut path, f64::NAN), Err(ThreatMapError::InvalidDelta(_))));
        assert_eq!(path.progress_fraction, 0.0);
    }

    #[test]
    fn test_opacity_pulse() {
        let mut path = sample_path();
        assert!(path.opacity().abs() < 1e-12);
        advance(&mut path, 0.5).unwrap();
        assert!((path.opacity() - 1.0).abs() < 1e-12);
        advance(&mut path, 0.25).unwrap();
        assert!((path.opacity() - (0.75 * PI).sin()).abs() < 1e-12);
    }

    #[test]
    fn test_animator_supersedes_same_pair() {
        let mut animator = PathAnimator::new();
        let first = animator.create_vector_path(1, Vector3::ZERO, 2, Vector3::new(10.0, 0.0, 0.0), 0.5, 0.01);
        let other = animator.create_vector_path(2, Vector3::ZERO, 3, Vector3::new(5.0, 0.0, 0.0), 0.5, 0.01);
        let second = animator.create_vector_path(1, Vector3::ZERO, 2, Vector3::new(20.0, 0.0, 0.0), 0.5, 0.01);

        assert_eq!(animator.paths().len(), 2);
        assert!(animator.get(first).is_none());
        assert!(animator.get(other).is_some());
        assert!(animator.get(second).is_some());
    }

    #[test]
    fn test_animator_clear_and_prune() {
        let mut animator = PathAnimator::new();
        let a = animator.create_path([Vector3::ZERO; 4], 0.01);
        let b = animator.create_path([Vector3::ZERO; 4], 0.01);

        animator.clear(a).unwrap();
        assert_eq!(animator.active_count(), 1);
        assert_eq!(animator.advance(a, 0.1), Err(ThreatMapError::InactivePath(a)));
        assert!(animator.advance(b, 0.1).is_ok());

        assert_eq!(animator.prune_inactive(), 1);
        assert_eq!(animator.advance(a, 0.1), Err(ThreatMapError::UnknownPath(a)));
        assert!(animator.clear(a).is_err());
    }
}
