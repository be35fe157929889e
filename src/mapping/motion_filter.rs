//! Mouse Motion Filter
//!
//! Turns raw pointer displacement into a right-stick vector:
//!
//! 1. `delta = pointer - last_pointer` (first sample only latches the position)
//! 2. per axis: power-law curve, clamp to `[-1, 1]`, deadzone
//! 3. large jumps (`speed > 0.5`) are blended toward the target with weight
//!    0.15, small ones snap straight to it
//! 4. with no motion for longer than [`IDLE_TIMEOUT`] the stick returns to rest
//!
//! The filter performs no I/O; pointer recentering for relative mode is done
//! by the sampling loop, which then calls [`MotionState::latch`].

use super::StickVector;
use crate::persistence::Settings;
use std::time::{Duration, Instant};

/// Stick returns to neutral once the pointer has been still this long.
pub const IDLE_TIMEOUT: Duration = Duration::from_millis(50);

/// Summed per-axis jump above which the output is smoothed instead of snapped.
pub const SMOOTHING_SPEED_THRESHOLD: f32 = 0.5;

/// Weight of the new sample when smoothing.
pub const SMOOTHING_BLEND: f32 = 0.15;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterParams {
    pub sensitivity: f32,
    pub exponent: f32,
    pub deadzone: f32,
}

impl FilterParams {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            sensitivity: settings.mouse_sensitivity as f32,
            exponent: settings.response_exponent as f32,
            deadzone: settings.deadzone_threshold as f32,
        }
    }
}

/// Pointer-derived part of the loop's runtime state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MotionState {
    pub last_pointer: Option<(i32, i32)>,
    /// Smoothed right-stick position, persists across ticks
    pub stick: StickVector,
    pub last_motion: Option<Instant>,
}

/// `sensitivity * |delta|^exponent * sign(delta)`
pub fn shape_axis(delta: f32, sensitivity: f32, exponent: f32) -> f32 {
    if delta == 0.0 {
        return 0.0;
    }
    sensitivity * delta.abs().powf(exponent) * delta.signum()
}

/// Values strictly inside the threshold are forced to zero.
pub fn apply_deadzone(value: f32, threshold: f32) -> f32 {
    if value.abs() < threshold {
        0.0
    } else {
        value
    }
}

/// Curve, clamp and deadzone for one axis.
pub fn shaped_target(delta: i32, params: &FilterParams) -> f32 {
    let shaped = shape_axis(delta as f32, params.sensitivity, params.exponent).clamp(-1.0, 1.0);
    apply_deadzone(shaped, params.deadzone)
}

impl MotionState {
    /// Neutral stick and no motion history; the pointer latch is kept.
    pub fn reset(&mut self) {
        self.stick = StickVector::NEUTRAL;
        self.last_motion = None;
    }

    /// Measures future deltas from `position`.
    pub fn latch(&mut self, position: (i32, i32)) {
        self.last_pointer = Some(position);
    }

    pub fn update(self, pointer: (i32, i32), params: &FilterParams, now: Instant) -> MotionState {
        filter_motion(pointer, self, params, now).1
    }
}

/// One filter step. Returns the stick to emit and the state for the next tick.
pub fn filter_motion(
    pointer: (i32, i32),
    previous: MotionState,
    params: &FilterParams,
    now: Instant,
) -> (StickVector, MotionState) {
    let mut next = previous;
    next.last_pointer = Some(pointer);

    let Some((last_x, last_y)) = previous.last_pointer else {
        return (next.stick, next);
    };

    let dx = pointer.0.saturating_sub(last_x);
    let dy = pointer.1.saturating_sub(last_y);

    if dx != 0 || dy != 0 {
        next.last_motion = Some(now);

        let target_x = shaped_target(dx, params);
        let target_y = shaped_target(dy, params);

        let speed = (target_x - previous.stick.x).abs() + (target_y - previous.stick.y).abs();
        next.stick = if speed > SMOOTHING_SPEED_THRESHOLD {
            StickVector::new(
                (1.0 - SMOOTHING_BLEND) * previous.stick.x + SMOOTHING_BLEND * target_x,
                (1.0 - SMOOTHING_BLEND) * previous.stick.y + SMOOTHING_BLEND * target_y,
            )
        } else {
            StickVector::new(target_x, target_y)
        };
    } else {
        let idle = match previous.last_motion {
            Some(last) => now.saturating_duration_since(last) > IDLE_TIMEOUT,
            None => true,
        };
        if idle {
            next.stick = StickVector::NEUTRAL;
        }
    }

    (next.stick, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn params(sensitivity: f32, deadzone: f32) -> FilterParams {
        FilterParams {
            sensitivity,
            exponent: 1.0,
            deadzone,
        }
    }

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn first_sample_only_latches() {
        let t0 = Instant::now();
        let (stick, state) = filter_motion((500, 300), MotionState::default(), &params(0.05, 0.01), t0);

        assert_eq!(stick, StickVector::NEUTRAL);
        assert_eq!(state.last_pointer, Some((500, 300)));
        assert_eq!(state.last_motion, None);
    }

    #[test]
    fn large_jump_is_smoothed_and_decays_after_idle() {
        // sensitivity 0.05, deadzone 0.01, delta (20, 0)
        let p = params(0.05, 0.01);
        let t0 = Instant::now();
        let state = MotionState {
            last_pointer: Some((100, 100)),
            ..MotionState::default()
        };

        assert_eq!(shaped_target(20, &p), 1.0);

        let (stick, state) = filter_motion((120, 100), state, &p, t0);
        assert!(approx(stick.x, SMOOTHING_BLEND));
        assert_eq!(stick.y, 0.0);

        // Still within the idle window: unchanged
        let (stick, state) = filter_motion((120, 100), state, &p, t0 + Duration::from_millis(40));
        assert!(approx(stick.x, SMOOTHING_BLEND));

        let (stick, _) = filter_motion((120, 100), state, &p, t0 + Duration::from_millis(60));
        assert_eq!(stick, StickVector::NEUTRAL);
    }

    #[test]
    fn idle_threshold_is_exclusive() {
        let p = params(0.05, 0.01);
        let t0 = Instant::now();
        let state = MotionState {
            last_pointer: Some((0, 0)),
            ..MotionState::default()
        };
        let (_, state) = filter_motion((2, 0), state, &p, t0);
        let (stick, _) = filter_motion((2, 0), state, &p, t0 + IDLE_TIMEOUT);
        assert!(approx(stick.x, 0.1));
    }

    #[test]
    fn small_motion_snaps_to_target() {
        let p = params(0.05, 0.01);
        let state = MotionState {
            last_pointer: Some((0, 0)),
            stick: StickVector::new(0.2, 0.0),
            last_motion: None,
        };
        let (stick, _) = filter_motion((2, -3), state, &p, Instant::now());
        assert!(approx(stick.x, 0.1));
        assert!(approx(stick.y, -0.15));
    }

    #[test]
    fn tiny_motion_falls_in_deadzone() {
        let p = params(0.001, 0.01);
        let state = MotionState {
            last_pointer: Some((0, 0)),
            ..MotionState::default()
        };
        let (stick, state) = filter_motion((5, 0), state, &p, Instant::now());
        assert_eq!(stick, StickVector::NEUTRAL);
        // It still counts as motion for the idle timer
        assert!(state.last_motion.is_some());
    }

    #[test]
    fn response_exponent_shapes_delta() {
        assert!(approx(shape_axis(4.0, 0.1, 2.0), 1.6));
        assert!(approx(shape_axis(-4.0, 0.1, 0.5), -0.2));
        assert_eq!(shape_axis(0.0, 0.1, 0.0), 0.0);
    }

    #[test]
    fn zero_delta_stream_is_idempotent() {
        let p = params(0.05, 0.01);
        let t0 = Instant::now();
        let mut state = MotionState {
            last_pointer: Some((10, 10)),
            ..MotionState::default()
        };
        state = state.update((30, 10), &p, t0);
        state = state.update((30, 10), &p, t0 + Duration::from_millis(100));
        let settled = state;
        for i in 1..20 {
            state = state.update((30, 10), &p, t0 + Duration::from_millis(100 + i));
            assert_eq!(state.stick, settled.stick);
        }
    }

    #[test]
    fn reset_keeps_latch() {
        let mut state = MotionState {
            last_pointer: Some((1, 2)),
            stick: StickVector::new(0.4, 0.4),
            last_motion: Some(Instant::now()),
        };
        state.reset();
        assert_eq!(state.last_pointer, Some((1, 2)));
        assert_eq!(state.stick, StickVector::NEUTRAL);
        assert_eq!(state.last_motion, None);
    }

    proptest! {
        #[test]
        fn deadzone_zeroes_strictly_inside(threshold in 0.0f32..1.0, value in -1.0f32..1.0) {
            let filtered = apply_deadzone(value, threshold);
            if value.abs() < threshold {
                prop_assert_eq!(filtered, 0.0);
            } else {
                prop_assert_eq!(filtered, value);
            }
        }

        #[test]
        fn output_always_within_unit_range(
            sensitivity in 0.0f32..10.0,
            dx in -2000i32..2000,
            dy in -2000i32..2000,
        ) {
            let p = params(sensitivity, 0.01);
            let state = MotionState { last_pointer: Some((0, 0)), ..MotionState::default() };
            let (stick, _) = filter_motion((dx, dy), state, &p, Instant::now());
            prop_assert!((-1.0..=1.0).contains(&stick.x));
            prop_assert!((-1.0..=1.0).contains(&stick.y));
        }
    }
}
