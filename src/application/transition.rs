//! Scene transition controller
//!
//! Serializes the hand-off of the local avatar between scenes. The animated
//! shrink that used to hide the avatar is modeled as an explicit two-state
//! machine advanced by the tick loop; cancellation is a state transition,
//! not a callback race. At most one hand-off animation is in flight at any
//! time.

use crate::application::ports::AvatarRenderer;
use crate::domain::value_objects::{AvatarId, SceneKey};

/// Seconds the shrink animation takes from full scale to zero.
pub const HAND_OFF_DURATION: f32 = 1.0;

/// Emitted exactly once when a hand-off animation finishes; the session
/// performs the membership mutation in response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandOff {
    pub from: SceneKey,
    pub to: SceneKey,
}

#[derive(Debug)]
enum State {
    Idle,
    Transitioning {
        from: SceneKey,
        to: SceneKey,
        avatar: AvatarId,
        elapsed: f32,
    },
}

/// Two-state machine: Idle and Transitioning.
#[derive(Debug)]
pub struct TransitionController {
    state: State,
    duration: f32,
}

impl TransitionController {
    pub fn new() -> Self {
        Self::with_duration(HAND_OFF_DURATION)
    }

    pub fn with_duration(duration: f32) -> Self {
        Self {
            state: State::Idle,
            duration: duration.max(f32::EPSILON),
        }
    }

    pub fn is_transitioning(&self) -> bool {
        matches!(self.state, State::Transitioning { .. })
    }

    /// Enter Transitioning. A request arriving mid-flight kills the current
    /// animation first (scale restored) and restarts toward the new target.
    pub fn begin(
        &mut self,
        from: SceneKey,
        to: SceneKey,
        avatar: AvatarId,
        renderer: &mut dyn AvatarRenderer,
    ) {
        if let State::Transitioning {
            avatar: current, ..
        } = self.state
        {
            tracing::debug!("Superseding in-flight hand-off for {}", current);
            renderer.set_avatar_scale(current, 1.0);
        }

        renderer.set_avatar_scale(avatar, 1.0);
        self.state = State::Transitioning {
            from,
            to,
            avatar,
            elapsed: 0.0,
        };
    }

    /// Drive the animation by one frame. Returns the hand-off exactly once,
    /// at completion; the controller is Idle again by then.
    pub fn advance(&mut self, delta: f32, renderer: &mut dyn AvatarRenderer) -> Option<HandOff> {
        let State::Transitioning {
            from,
            to,
            avatar,
            ref mut elapsed,
        } = self.state
        else {
            return None;
        };

        *elapsed += delta;
        let progress = (*elapsed / self.duration).min(1.0);
        renderer.set_avatar_scale(avatar, 1.0 - progress);

        if progress < 1.0 {
            return None;
        }

        self.state = State::Idle;
        Some(HandOff { from, to })
    }

    /// Abort any in-flight animation and force Idle. Called on teardown; a
    /// stuck Transitioning state is a defect, not a terminal state.
    pub fn cancel(&mut self, renderer: &mut dyn AvatarRenderer) {
        if let State::Transitioning { avatar, .. } = self.state {
            renderer.set_avatar_scale(avatar, 1.0);
            self.state = State::Idle;
        }
    }
}

impl Default for TransitionController {
    fn default() -> Self {
        Self::new()
    }
}
