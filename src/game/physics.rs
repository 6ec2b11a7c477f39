//! Car physics: one fixed-size integration step per client input

use crate::ws::protocol::InputCommand;

/// Speed gained (or lost, when braking) per step
pub const ACCEL: f64 = 0.4;
/// Speed retained per step with normal grip
pub const FRICTION: f64 = 0.96;
/// Speed retained per step while drifting
pub const DRIFT_FRICTION: f64 = 0.99;
/// Heading change per step, in radians
pub const TURN_SPEED: f64 = 0.06;
/// Below this absolute speed steering has no effect
pub const MIN_TURN_SPEED: f64 = 0.1;

pub const WORLD_WIDTH: f64 = 3000.0;
pub const WORLD_HEIGHT: f64 = 3000.0;

/// The part of a player that physics reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Kinematics {
    pub x: f64,
    pub y: f64,
    /// Heading in radians, never normalized
    pub angle: f64,
    /// Signed scalar speed along the heading
    pub speed: f64,
    pub drifting: bool,
}

/// Physics system for advancing cars
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance a car by one step under the given input.
    ///
    /// Pure and deterministic. Acceleration is applied first, then steering
    /// (scaled by direction of travel), then friction, then movement along the
    /// new heading. Position is clamped to the world; speed is left as-is, so a
    /// car pressed against a wall keeps its stored speed.
    pub fn step(state: Kinematics, input: &InputCommand) -> Kinematics {
        let mut next = state;

        if input.up {
            next.speed += ACCEL;
        }
        if input.down {
            next.speed -= ACCEL;
        }

        // Reversing inverts steering, like a real car
        if next.speed.abs() > MIN_TURN_SPEED {
            let dir = if next.speed > 0.0 { 1.0 } else { -1.0 };
            if input.left {
                next.angle -= TURN_SPEED * dir;
            }
            if input.right {
                next.angle += TURN_SPEED * dir;
            }
        }

        next.drifting = input.drift;
        next.speed *= if next.drifting { DRIFT_FRICTION } else { FRICTION };

        next.x += next.angle.cos() * next.speed;
        next.y += next.angle.sin() * next.speed;

        let (x, y) = Self::clamp_to_world(next.x, next.y);
        next.x = x;
        next.y = y;

        next
    }

    /// Clamp a point into the world rectangle
    pub fn clamp_to_world(x: f64, y: f64) -> (f64, f64) {
        (x.clamp(0.0, WORLD_WIDTH), y.clamp(0.0, WORLD_HEIGHT))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at_rest() -> Kinematics {
        Kinematics {
            x: 1500.0,
            y: 1500.0,
            ..Default::default()
        }
    }

    fn input(up: bool, down: bool, left: bool, right: bool, drift: bool) -> InputCommand {
        InputCommand {
            up,
            down,
            left,
            right,
            drift,
        }
    }

    #[test]
    fn test_accelerate_then_friction() {
        let next = PhysicsSystem::step(at_rest(), &input(true, false, false, false, false));
        assert!((next.speed - ACCEL * FRICTION).abs() < 1e-12);
        assert!((next.x - (1500.0 + ACCEL * FRICTION)).abs() < 1e-12);
        assert_eq!(next.y, 1500.0);
    }

    #[test]
    fn test_up_and_down_cancel() {
        let mut state = at_rest();
        state.speed = 5.0;
        let next = PhysicsSystem::step(state, &input(true, true, false, false, false));
        assert!((next.speed - 5.0 * FRICTION).abs() < 1e-12);
    }

    #[test]
    fn test_no_turning_while_stopped() {
        let mut state = at_rest();
        state.angle = 1.25;
        state.speed = 0.1;
        for turn in [
            input(false, false, true, false, false),
            input(false, false, false, true, false),
            input(false, false, true, true, true),
        ] {
            let next = PhysicsSystem::step(state, &turn);
            assert_eq!(next.angle, 1.25);
        }
    }

    #[test]
    fn test_turn_direction_follows_travel() {
        let mut forward = at_rest();
        forward.speed = 5.0;
        let next = PhysicsSystem::step(forward, &input(false, false, false, true, false));
        assert!((next.angle - TURN_SPEED).abs() < 1e-12);

        let mut reverse = at_rest();
        reverse.speed = -5.0;
        let next = PhysicsSystem::step(reverse, &input(false, false, false, true, false));
        assert!((next.angle + TURN_SPEED).abs() < 1e-12);
    }

    #[test]
    fn test_left_and_right_cancel() {
        let mut state = at_rest();
        state.speed = 5.0;
        state.angle = 0.5;
        let next = PhysicsSystem::step(state, &input(false, false, true, true, false));
        assert!((next.angle - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_drift_flag_is_not_sticky() {
        let drifting = PhysicsSystem::step(at_rest(), &input(false, false, false, false, true));
        assert!(drifting.drifting);
        let released = PhysicsSystem::step(drifting, &InputCommand::default());
        assert!(!released.drifting);
    }

    #[test]
    fn test_friction_monotonic_decay() {
        for initial in [12.0, -12.0] {
            let mut state = at_rest();
            state.speed = initial;
            for _ in 0..500 {
                let next = PhysicsSystem::step(state, &InputCommand::default());
                assert!(next.speed.abs() < state.speed.abs());
                assert_eq!(next.speed.signum(), initial.signum());
                state = next;
            }
            assert!(state.speed.abs() < 1e-6);
        }
    }

    #[test]
    fn test_drift_retains_more_speed() {
        let mut grip = at_rest();
        grip.speed = 10.0;
        let mut slide = grip;
        for _ in 0..50 {
            grip = PhysicsSystem::step(grip, &InputCommand::default());
            slide = PhysicsSystem::step(slide, &input(false, false, false, false, true));
            assert!(slide.speed.abs() > grip.speed.abs());
        }
    }

    #[test]
    fn test_boundary_clamp_keeps_speed() {
        let state = Kinematics {
            x: WORLD_WIDTH - 1.0,
            y: 2.0,
            angle: 0.0,
            speed: 20.0,
            drifting: false,
        };
        let next = PhysicsSystem::step(state, &InputCommand::default());
        assert_eq!(next.x, WORLD_WIDTH);
        assert!(next.speed > 0.0);

        let state = Kinematics {
            angle: -std::f64::consts::FRAC_PI_2,
            ..state
        };
        let next = PhysicsSystem::step(state, &InputCommand::default());
        assert_eq!(next.y, 0.0);
    }

    #[test]
    fn test_position_stays_in_world() {
        use rand::{Rng, SeedableRng};
        use rand_chacha::ChaCha8Rng;

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut state = at_rest();
        for _ in 0..20_000 {
            let cmd = input(
                rng.gen_bool(0.7),
                rng.gen_bool(0.2),
                rng.gen_bool(0.3),
                rng.gen_bool(0.3),
                rng.gen_bool(0.4),
            );
            state = PhysicsSystem::step(state, &cmd);
            assert!((0.0..=WORLD_WIDTH).contains(&state.x));
            assert!((0.0..=WORLD_HEIGHT).contains(&state.y));
        }
    }
}
