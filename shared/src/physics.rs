//! Pure physics and scoring math, factored out of `GameObject` bookkeeping
//! so World can call it without taking any locks.

use crate::constants::*;
use crate::entities::GameObject;

/// Gravitational attraction between two bodies.
///
/// Deliberately `1/r²`, not the `1/r` a Newtonian force law would use: the
/// squared distance is never reduced to a real distance before dividing.
/// This is an intentional gameplay tuning inherited unchanged from the
/// original design, not a bug to "fix" — preserving it exactly is part of
/// matching client and host physics.
///
/// Returns the force applied to `a`; the force on `b` is its negation.
pub fn gravity_force(a: &GameObject, b: &GameObject) -> (f32, f32) {
    let dx = b.position_x - a.position_x;
    let dy = b.position_y - a.position_y;
    let dist_sq = (dx * dx + dy * dy).max(f32::EPSILON);
    let angle = dy.atan2(dx) + std::f32::consts::PI;

    let mass_a = mass_of(a.radius);
    let mass_b = mass_of(b.radius);
    let magnitude = GRAVITY * mass_a * mass_b / dist_sq;

    (magnitude * angle.cos(), magnitude * angle.sin())
}

/// Spring force pulling a system-owned object back toward its anchor.
pub fn anchor_spring_force(obj: &GameObject, stiffness: f32) -> (f32, f32) {
    let dx = obj.root_x - obj.position_x;
    let dy = obj.root_y - obj.position_y;
    (dx * stiffness, dy * stiffness)
}

/// A circular body's mass is proportional to its area, not its radius.
pub fn mass_of(radius: f32) -> f32 {
    radius * radius
}

/// Linear interpolation of a GameObject's lifetime from its radius: the
/// largest possible object lives the shortest time, the smallest lives the
/// longest, so big objects can't simply camp the arena forever.
pub fn duration_for_radius(radius: f32) -> std::time::Duration {
    let t = ((radius - MIN_SIZE) / (MAX_CREATION_SIZE - MIN_SIZE)).clamp(0.0, 1.0);
    let secs = MAX_DURATION_SECS + t * (MIN_DURATION_SECS - MAX_DURATION_SECS);
    std::time::Duration::from_secs_f32(secs)
}

/// Linear interpolation of a GameObject's score value from its radius.
pub fn value_for_radius(radius: f32) -> u32 {
    let t = ((radius - MIN_SIZE) / (MAX_CREATION_SIZE - MIN_SIZE)).clamp(0.0, 1.0);
    let value = MIN_VALUE as f32 + t * (MAX_VALUE - MIN_VALUE) as f32;
    value.round() as u32
}

/// Outcome of merging two GameObjects: the new body's physical and
/// ownership state, plus whichever player should be debited the system's
/// adoption cost (`None` unless ownership fell through to the system slot).
pub struct MergeResult {
    pub position_x: f32,
    pub position_y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub radius: f32,
    pub value: u32,
    pub owner: u16,
    pub system_adoption_cost: Option<u32>,
}

/// Computes the combined body from a contact between `a` and `b`, or `None`
/// if the contact should not merge at all (radius overflow or both bodies
/// too slow to be "closing").
pub fn merge(a: &GameObject, b: &GameObject) -> Option<MergeResult> {
    let radius = (a.radius * a.radius + b.radius * b.radius).sqrt();
    if radius > MAX_SIZE {
        return None;
    }

    let speed_a = a.velocity_x * a.velocity_x + a.velocity_y * a.velocity_y;
    let speed_b = b.velocity_x * b.velocity_x + b.velocity_y * b.velocity_y;
    if speed_a < MERGE_VELOCITY_THRESHOLD && speed_b < MERGE_VELOCITY_THRESHOLD {
        return None;
    }

    let mass_a = mass_of(a.radius);
    let mass_b = mass_of(b.radius);
    let total_mass = mass_a + mass_b;

    let position_x = (a.position_x * mass_a + b.position_x * mass_b) / total_mass;
    let position_y = (a.position_y * mass_a + b.position_y * mass_b) / total_mass;
    let velocity_x = (a.velocity_x * mass_a + b.velocity_x * mass_b) / total_mass;
    let velocity_y = (a.velocity_y * mass_a + b.velocity_y * mass_b) / total_mass;

    let (owner, system_adoption_cost) = merge_owner(a, b);
    let value = a.value + b.value + MERGE_BONUS;

    Some(MergeResult {
        position_x,
        position_y,
        velocity_x,
        velocity_y,
        radius,
        value,
        owner,
        system_adoption_cost: system_adoption_cost.then_some(value),
    })
}

/// Decides who owns a merged body: the common owner if both objects share
/// one; whichever owner is at least `SCALE_THRESHOLD` times the other's
/// radius; otherwise the system slot, which "buys" the merged object off
/// both players.
fn merge_owner(a: &GameObject, b: &GameObject) -> (u16, bool) {
    if a.player_id == b.player_id {
        return (a.player_id, false);
    }
    if a.radius >= b.radius * SCALE_THRESHOLD {
        return (a.player_id, false);
    }
    if b.radius >= a.radius * SCALE_THRESHOLD {
        return (b.player_id, false);
    }
    (SYSTEM_PLAYER_ID, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use std::time::Instant;

    fn object(player_id: u16, x: f32, y: f32, vx: f32, vy: f32, radius: f32) -> GameObject {
        let now = Instant::now();
        GameObject {
            object_id: 0,
            player_id,
            position_x: x,
            position_y: y,
            velocity_x: vx,
            velocity_y: vy,
            radius,
            value: value_for_radius(radius),
            creation: now,
            expiry: now + duration_for_radius(radius),
            root_x: x,
            root_y: y,
            last_sync_id: 0,
        }
    }

    #[test]
    fn gravity_pulls_bodies_toward_each_other() {
        let a = object(1, 0.0, 0.0, 0.0, 0.0, 1.0);
        let b = object(1, 10.0, 0.0, 0.0, 0.0, 1.0);
        let (fx, _fy) = gravity_force(&a, &b);
        assert!(fx > 0.0, "a should be pulled toward positive x");
    }

    #[test]
    fn gravity_is_inverse_square_not_inverse_linear() {
        let a = object(1, 0.0, 0.0, 0.0, 0.0, 1.0);
        let near = object(1, 2.0, 0.0, 0.0, 0.0, 1.0);
        let far = object(1, 4.0, 0.0, 0.0, 0.0, 1.0);
        let (f_near, _) = gravity_force(&a, &near);
        let (f_far, _) = gravity_force(&a, &far);
        // Doubling distance should quarter the force, not halve it.
        assert_approx_eq!(f_near / f_far, 4.0, 0.01);
    }

    #[test]
    fn duration_and_value_interpolate_inversely() {
        let short = duration_for_radius(MAX_CREATION_SIZE);
        let long = duration_for_radius(MIN_SIZE);
        assert!(short < long);

        assert_eq!(value_for_radius(MIN_SIZE), MIN_VALUE);
        assert_eq!(value_for_radius(MAX_CREATION_SIZE), MAX_VALUE);
    }

    #[test]
    fn merge_rejects_when_both_bodies_are_slow() {
        let a = object(1, 0.0, 0.0, 0.1, 0.0, 1.0);
        let b = object(2, 1.0, 0.0, 0.0, 0.1, 1.0);
        assert!(merge(&a, &b).is_none());
    }

    #[test]
    fn merge_proceeds_when_either_body_is_fast() {
        let a = object(1, 0.0, 0.0, 100.0, 0.0, 1.0);
        let b = object(2, 1.0, 0.0, 0.0, 0.0, 1.0);
        assert!(merge(&a, &b).is_some());
    }

    #[test]
    fn merge_rejects_oversized_result() {
        let a = object(1, 0.0, 0.0, 100.0, 0.0, MAX_SIZE);
        let b = object(2, 1.0, 0.0, 0.0, 0.0, MAX_SIZE);
        assert!(merge(&a, &b).is_none());
    }

    #[test]
    fn merge_same_owner_keeps_owner() {
        let a = object(1, 0.0, 0.0, 100.0, 0.0, 1.0);
        let b = object(1, 1.0, 0.0, 0.0, 0.0, 1.0);
        let result = merge(&a, &b).unwrap();
        assert_eq!(result.owner, 1);
        assert!(result.system_adoption_cost.is_none());
    }

    #[test]
    fn merge_dominant_radius_keeps_larger_owner() {
        let a = object(1, 0.0, 0.0, 100.0, 0.0, 2.0);
        let b = object(2, 1.0, 0.0, 0.0, 0.0, 1.0);
        let result = merge(&a, &b).unwrap();
        assert_eq!(result.owner, 1);
    }

    #[test]
    fn merge_comparable_sizes_fall_to_system() {
        let a = object(1, 0.0, 0.0, 100.0, 0.0, 1.0);
        let b = object(2, 1.0, 0.0, 0.0, 0.0, 1.0);
        let result = merge(&a, &b).unwrap();
        assert_eq!(result.owner, SYSTEM_PLAYER_ID);
        assert!(result.system_adoption_cost.is_some());
    }
}
