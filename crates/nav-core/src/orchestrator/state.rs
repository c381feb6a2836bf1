//! Navigation State
//!
//! The explicit state machine, goal directives and per-agent navigation
//! memory.

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use nav_events::{ResourceType, Vec2};

use crate::config::{NavConfig, StuckConfig};
use crate::field::FieldKind;
use crate::steering::WanderState;

/// A directive from the decision layer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavGoal {
    Target(Vec2),
    SearchFor(ResourceType),
    Explore,
    ReturnHome,
}

impl fmt::Display for NavGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavGoal::Target(p) => write!(f, "target({:.1}, {:.1})", p.x, p.y),
            NavGoal::SearchFor(r) => write!(f, "search_for({})", r),
            NavGoal::Explore => f.write_str("explore"),
            NavGoal::ReturnHome => f.write_str("return_home"),
        }
    }
}

/// What a seeking agent is heading for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeekGoal {
    /// A literal position
    Position,
    Resource(ResourceType),
    Home,
}

impl SeekGoal {
    /// The field that leads toward this goal, if any.
    pub fn field_kind(&self) -> Option<FieldKind> {
        match self {
            SeekGoal::Position => None,
            SeekGoal::Resource(r) => Some(FieldKind::Resource(*r)),
            SeekGoal::Home => Some(FieldKind::Home),
        }
    }

    pub fn for_goal(goal: NavGoal) -> Option<SeekGoal> {
        match goal {
            NavGoal::Target(_) => Some(SeekGoal::Position),
            NavGoal::SearchFor(r) => Some(SeekGoal::Resource(r)),
            NavGoal::ReturnHome => Some(SeekGoal::Home),
            NavGoal::Explore => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavState {
    Idle,
    Seeking(SeekGoal),
    Arriving,
    Verifying,
    Exploring,
    Stuck,
}

impl NavState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavState::Idle => "idle",
            NavState::Seeking(_) => "seeking",
            NavState::Arriving => "arriving",
            NavState::Verifying => "verifying",
            NavState::Exploring => "exploring",
            NavState::Stuck => "stuck",
        }
    }

    /// States in which the agent is expected to make progress.
    pub fn is_moving(&self) -> bool {
        matches!(self, NavState::Seeking(_) | NavState::Arriving | NavState::Exploring)
    }
}

impl Default for NavState {
    fn default() -> Self {
        NavState::Idle
    }
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavState::Seeking(SeekGoal::Resource(r)) => write!(f, "seeking({})", r),
            NavState::Seeking(SeekGoal::Home) => f.write_str("seeking(home)"),
            NavState::Seeking(SeekGoal::Position) => f.write_str("seeking(position)"),
            other => f.write_str(other.as_str()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NavTransition {
    pub from: NavState,
    pub to: NavState,
}

/// Something the caller may want to react to; never an error
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavNotice {
    /// The target has infinite cost in the relevant field; steering directly instead
    FieldUnreachable { kind: FieldKind, target: Vec2 },
    Stuck { episode: u32 },
    /// A heavier planner could help get from `from` to `to`
    PlannerRequested { from: Vec2, to: Vec2 },
    GaveUp { goal: Option<NavGoal> },
    /// The agent stands on an aggregated sighting and sees nothing there
    SightingEmpty { resource: ResourceType, position: Vec2 },
}

/// Position-delta-over-window liveness check
#[derive(Debug, Clone, PartialEq)]
pub struct StuckDetector {
    window: u64,
    min_displacement: f32,
    samples: VecDeque<Vec2>,
}

impl StuckDetector {
    pub fn new(window: u64, min_displacement: f32) -> Self {
        Self {
            window: window.max(1),
            min_displacement,
            samples: VecDeque::new(),
        }
    }

    pub fn from_config(config: &StuckConfig) -> Self {
        Self::new(config.window, config.min_displacement)
    }

    /// Record this tick's position; true once per full window without progress.
    ///
    /// A detection clears the window, so another detection needs another
    /// full window of no progress.
    pub fn observe(&mut self, position: Vec2) -> bool {
        self.samples.push_back(position);
        let needed = self.window as usize + 1;
        while self.samples.len() > needed {
            self.samples.pop_front();
        }
        if self.samples.len() < needed {
            return false;
        }

        let moved = match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => first.distance(*last),
            _ => return false,
        };
        if moved < self.min_displacement {
            self.samples.clear();
            true
        } else {
            false
        }
    }

    /// True while the last full window shows at least `min_displacement` of travel.
    pub fn progressing(&self) -> bool {
        if self.samples.len() < self.window as usize + 1 {
            return false;
        }
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => first.distance(*last) >= self.min_displacement,
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
    }

    pub fn window(&self) -> u64 {
        self.window
    }
}

/// Component: one agent's navigation state and memory
#[derive(Component, Debug, Clone, PartialEq)]
pub struct NavAgent {
    pub(crate) state: NavState,
    pub(crate) goal: Option<NavGoal>,
    /// Explicit target being approached, if any
    pub(crate) target: Option<Vec2>,
    /// Gradient record that led to the current target
    pub(crate) pursued: Option<u64>,
    pub(crate) wander: WanderState,
    /// Heading the wander state returns to when the goal changes
    pub(crate) rest_heading: f32,
    pub(crate) stuck: StuckDetector,
    /// Consecutive stuck episodes; a full window of progress clears it
    pub(crate) stuck_episodes: u32,
    pub(crate) detour: Option<Vec2>,
    pub(crate) detour_ticks: u64,
    /// State to go back to once the detour is done
    pub(crate) resume: Option<NavState>,
    /// Whether a discovery has been broadcast for the current goal
    pub(crate) announced: bool,
    /// Whether the agent is already steering around an unreachable field
    pub(crate) field_fallback: bool,
}

impl NavAgent {
    pub fn new(config: &NavConfig) -> Self {
        Self {
            state: NavState::Idle,
            goal: None,
            target: None,
            pursued: None,
            wander: WanderState::new(0.0, &config.steering),
            rest_heading: 0.0,
            stuck: StuckDetector::from_config(&config.stuck),
            stuck_episodes: 0,
            detour: None,
            detour_ticks: 0,
            resume: None,
            announced: false,
            field_fallback: false,
        }
    }

    /// Start wandering along `heading`, and return to it on every goal change.
    pub fn with_wander_heading(mut self, heading: f32) -> Self {
        self.rest_heading = heading.rem_euclid(360.0);
        self.wander.reset(self.rest_heading);
        self
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn wander_heading(&self) -> f32 {
        self.wander.heading
    }

    pub fn goal(&self) -> Option<NavGoal> {
        self.goal
    }

    pub fn target(&self) -> Option<Vec2> {
        self.target
    }

    pub fn pursued_record(&self) -> Option<u64> {
        self.pursued
    }

    pub fn stuck_episodes(&self) -> u32 {
        self.stuck_episodes
    }

    pub fn is_idle(&self) -> bool {
        self.state == NavState::Idle && self.goal.is_none()
    }

    /// Forget everything tied to the current goal's pursuit.
    pub(crate) fn reset_pursuit(&mut self) {
        self.target = None;
        self.pursued = None;
        self.detour = None;
        self.detour_ticks = 0;
        self.resume = None;
        self.wander.reset(self.rest_heading);
        self.stuck.reset();
        self.stuck_episodes = 0;
        self.announced = false;
        self.field_fallback = false;
    }
}

impl Default for NavAgent {
    fn default() -> Self {
        Self::new(&NavConfig::default())
    }
}
