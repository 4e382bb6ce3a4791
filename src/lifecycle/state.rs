use serde::Serialize;

use crate::error::{ControllerError, Result};

/// Position of a controller or host in its lifecycle.
///
/// Variants are declared in rank order so the derived `Ord` decides the
/// direction of a transition: `Destroyed` ranks below every live state,
/// which makes reaching it a backward move from anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Destroyed,
    Uninitialized,
    Created,
    Started,
    Resumed,
}

impl LifecycleState {
    /// True strictly between creation and destruction.
    pub fn is_alive(self) -> bool {
        matches!(
            self,
            LifecycleState::Created | LifecycleState::Started | LifecycleState::Resumed
        )
    }

    /// Validate that `target` can be reached from `self` through legal steps.
    ///
    /// Checked up front so a bad request fails before any hook fires.
    pub fn check_reachable(self, target: LifecycleState) -> Result<()> {
        if self == target {
            return Ok(());
        }
        let reachable = match (self, target) {
            (LifecycleState::Destroyed, _) => false,
            (_, LifecycleState::Uninitialized) => false,
            (LifecycleState::Uninitialized, LifecycleState::Destroyed) => false,
            _ => true,
        };
        if reachable {
            Ok(())
        } else {
            Err(ControllerError::IllegalTransition {
                from: self,
                to: target,
            })
        }
    }

    /// The single adjacent state one step from `self` towards `target`.
    ///
    /// Forward: `Uninitialized -> Created -> Started -> Resumed`.
    /// Backward: `Resumed -> Started -> Created -> Destroyed`; there is no
    /// backward step into `Uninitialized`.
    pub fn step_towards(self, target: LifecycleState) -> Result<Option<LifecycleState>> {
        if self == target {
            return Ok(None);
        }
        let next = if self < target {
            match self {
                LifecycleState::Uninitialized => Some(LifecycleState::Created),
                LifecycleState::Created => Some(LifecycleState::Started),
                LifecycleState::Started => Some(LifecycleState::Resumed),
                _ => None,
            }
        } else {
            match self {
                LifecycleState::Created => Some(LifecycleState::Destroyed),
                LifecycleState::Started => Some(LifecycleState::Created),
                LifecycleState::Resumed => Some(LifecycleState::Started),
                _ => None,
            }
        };
        next.map(Some).ok_or(ControllerError::IllegalTransition {
            from: self,
            to: target,
        })
    }
}

/// Hook-level event fired by a single adjacent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Create,
    Start,
    Resume,
    Pause,
    Stop,
    Destroy,
}

impl LifecycleEvent {
    pub const ALL: [LifecycleEvent; 6] = [
        LifecycleEvent::Create,
        LifecycleEvent::Start,
        LifecycleEvent::Resume,
        LifecycleEvent::Pause,
        LifecycleEvent::Stop,
        LifecycleEvent::Destroy,
    ];

    /// Event for an adjacent `from -> to` step, `None` if the pair is not adjacent.
    pub fn between(from: LifecycleState, to: LifecycleState) -> Option<LifecycleEvent> {
        use LifecycleState::*;
        match (from, to) {
            (Uninitialized, Created) => Some(LifecycleEvent::Create),
            (Created, Started) => Some(LifecycleEvent::Start),
            (Started, Resumed) => Some(LifecycleEvent::Resume),
            (Resumed, Started) => Some(LifecycleEvent::Pause),
            (Started, Created) => Some(LifecycleEvent::Stop),
            (Created, Destroyed) => Some(LifecycleEvent::Destroy),
            _ => None,
        }
    }

    pub fn is_forward(self) -> bool {
        matches!(
            self,
            LifecycleEvent::Create | LifecycleEvent::Start | LifecycleEvent::Resume
        )
    }

    pub fn target_state(self) -> LifecycleState {
        match self {
            LifecycleEvent::Create | LifecycleEvent::Stop => LifecycleState::Created,
            LifecycleEvent::Start | LifecycleEvent::Pause => LifecycleState::Started,
            LifecycleEvent::Resume => LifecycleState::Resumed,
            LifecycleEvent::Destroy => LifecycleState::Destroyed,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleEvent::Create => "on_create",
            LifecycleEvent::Start => "on_start",
            LifecycleEvent::Resume => "on_resume",
            LifecycleEvent::Pause => "on_pause",
            LifecycleEvent::Stop => "on_stop",
            LifecycleEvent::Destroy => "on_destroy",
        }
    }
}

/// A committed state change as delivered to signal observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

impl Transition {
    pub fn new(from: LifecycleState, to: LifecycleState) -> Self {
        Self { from, to }
    }

    pub fn is_forward(&self) -> bool {
        self.to > self.from
    }

    /// Hook event for this transition when it spans exactly one step.
    pub fn event(&self) -> Option<LifecycleEvent> {
        LifecycleEvent::between(self.from, self.to)
    }
}
