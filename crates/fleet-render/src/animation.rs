//! Marker glide between consecutive reported positions

use fleet_core::Position;
use std::time::{Duration, Instant};

/// Where a marker is in its glide
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationState {
    Idle {
        at: Position,
    },
    Animating {
        from: Position,
        to: Position,
        started_at: Instant,
    },
}

/// Linear marker animation
///
/// Retargeting mid-flight starts the new glide from wherever the marker
/// currently is, so a burst of reports never makes the marker jump.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerAnimation {
    state: AnimationState,
    duration: Duration,
}

impl MarkerAnimation {
    pub fn new(at: Position, duration: Duration) -> Self {
        Self {
            state: AnimationState::Idle { at },
            duration,
        }
    }

    pub fn state(&self) -> AnimationState {
        self.state
    }

    pub fn is_animating(&self) -> bool {
        matches!(self.state, AnimationState::Animating { .. })
    }

    /// Final position of the current glide
    pub fn target(&self) -> Position {
        match self.state {
            AnimationState::Idle { at } => at,
            AnimationState::Animating { to, .. } => to,
        }
    }

    /// On-screen position at `now`
    pub fn position_at(&self, now: Instant) -> Position {
        match self.state {
            AnimationState::Idle { at } => at,
            AnimationState::Animating {
                from,
                to,
                started_at,
            } => from.interpolate(&to, self.progress(started_at, now)),
        }
    }

    /// Begin gliding toward `to` from the current on-screen position
    pub fn retarget(&mut self, to: Position, now: Instant) {
        let from = self.position_at(now);
        self.state = AnimationState::Animating {
            from,
            to,
            started_at: now,
        };
    }

    /// Advance to `now`, returning the position to draw if the marker moved
    pub fn tick(&mut self, now: Instant) -> Option<Position> {
        match self.state {
            AnimationState::Idle { .. } => None,
            AnimationState::Animating {
                from,
                to,
                started_at,
            } => {
                let progress = self.progress(started_at, now);
                if progress >= 1.0 {
                    self.state = AnimationState::Idle { at: to };
                    Some(to)
                } else {
                    Some(from.interpolate(&to, progress))
                }
            }
        }
    }

    fn progress(&self, started_at: Instant, now: Instant) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        let elapsed = now.saturating_duration_since(started_at);
        (elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GLIDE: Duration = Duration::from_millis(600);

    #[test]
    fn test_idle_does_not_tick() {
        let mut anim = MarkerAnimation::new(Position::new(1.0, 1.0), GLIDE);
        assert_eq!(anim.tick(Instant::now()), None);
        assert!(!anim.is_animating());
    }

    #[test]
    fn test_glide_reaches_target() {
        let t0 = Instant::now();
        let mut anim = MarkerAnimation::new(Position::new(0.0, 0.0), GLIDE);
        anim.retarget(Position::new(10.0, 20.0), t0);

        let mid = anim.tick(t0 + Duration::from_millis(300)).unwrap();
        assert!((mid.longitude - 5.0).abs() < 1e-9);
        assert!((mid.latitude - 10.0).abs() < 1e-9);
        assert!(anim.is_animating());

        let end = anim.tick(t0 + Duration::from_millis(700)).unwrap();
        assert_eq!(end, Position::new(10.0, 20.0));
        assert_eq!(
            anim.state(),
            AnimationState::Idle {
                at: Position::new(10.0, 20.0)
            }
        );
    }

    #[test]
    fn test_retarget_starts_from_current_position() {
        let t0 = Instant::now();
        let mut anim = MarkerAnimation::new(Position::new(0.0, 0.0), GLIDE);
        anim.retarget(Position::new(10.0, 0.0), t0);

        let t1 = t0 + Duration::from_millis(300);
        anim.retarget(Position::new(10.0, 10.0), t1);

        match anim.state() {
            AnimationState::Animating { from, to, .. } => {
                assert!((from.longitude - 5.0).abs() < 1e-9);
                assert_eq!(to, Position::new(10.0, 10.0));
            }
            other => panic!("expected animation, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_duration_snaps() {
        let t0 = Instant::now();
        let mut anim = MarkerAnimation::new(Position::new(0.0, 0.0), Duration::ZERO);
        anim.retarget(Position::new(3.0, 4.0), t0);

        assert_eq!(anim.tick(t0), Some(Position::new(3.0, 4.0)));
        assert!(!anim.is_animating());
    }
}
