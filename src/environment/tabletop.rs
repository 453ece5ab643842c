//! Symbolic tabletop scene
//!
//! A desk with an LED, a lightbulb, a drawer, a sliding door and three
//! coloured blocks. Subtasks succeed when their preconditions hold in the
//! current scene, mirroring the CALVIN-style subtask set.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::json;
use tracing::debug;

use super::{EnvironmentSession, EpisodeStart, Policy};
use crate::domain::{ActionVocabulary, Checkpoint};
use crate::error::{EvalError, Result};

const DEFAULT_TASK: &str = "open the drawer and turn off the led";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockColor {
    Red,
    Blue,
    Pink,
}

impl BlockColor {
    pub const ALL: [BlockColor; 3] = [BlockColor::Red, BlockColor::Blue, BlockColor::Pink];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockColor::Red => "red",
            BlockColor::Blue => "blue",
            BlockColor::Pink => "pink",
        }
    }
}

impl fmt::Display for BlockColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BlockColor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "red" => Ok(BlockColor::Red),
            "blue" => Ok(BlockColor::Blue),
            "pink" => Ok(BlockColor::Pink),
            _ => Err(format!("Unknown block colour: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockLocation {
    Table,
    Drawer,
    Slider,
    Gripper,
}

impl BlockLocation {
    fn phrase(&self) -> &'static str {
        match self {
            BlockLocation::Table => "on the table",
            BlockLocation::Drawer => "in the drawer",
            BlockLocation::Slider => "in the sliding cabinet",
            BlockLocation::Gripper => "in the gripper",
        }
    }
}

/// Complete symbolic state of the desk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneState {
    pub led_on: bool,
    pub lightbulb_on: bool,
    pub drawer_open: bool,
    pub slider_left: bool,
    pub blocks: BTreeMap<BlockColor, BlockLocation>,
}

impl Default for SceneState {
    fn default() -> Self {
        Self {
            led_on: true,
            lightbulb_on: true,
            drawer_open: true,
            slider_left: false,
            blocks: BlockColor::ALL
                .into_iter()
                .map(|c| (c, BlockLocation::Table))
                .collect(),
        }
    }
}

impl SceneState {
    pub fn held(&self) -> Option<BlockColor> {
        self.blocks
            .iter()
            .find(|(_, loc)| **loc == BlockLocation::Gripper)
            .map(|(color, _)| *color)
    }

    /// Apply a subtask. `None` if the action is not part of the vocabulary.
    pub fn apply(&mut self, action: &str) -> Option<bool> {
        let achieved = match action {
            "turn_on_led" => toggle(&mut self.led_on, true),
            "turn_off_led" => toggle(&mut self.led_on, false),
            "turn_on_lightbulb" => toggle(&mut self.lightbulb_on, true),
            "turn_off_lightbulb" => toggle(&mut self.lightbulb_on, false),
            "open_drawer" => toggle(&mut self.drawer_open, true),
            "close_drawer" => toggle(&mut self.drawer_open, false),
            "move_slider_left" => toggle(&mut self.slider_left, true),
            "move_slider_right" => toggle(&mut self.slider_left, false),
            "place_in_drawer" => {
                let drawer_open = self.drawer_open;
                self.place(BlockLocation::Drawer, drawer_open)
            }
            "place_in_slider" => self.place(BlockLocation::Slider, true),
            "place_on_table" => self.place(BlockLocation::Table, true),
            other => {
                let color = other
                    .strip_prefix("lift_")
                    .and_then(|rest| rest.strip_suffix("_block"))
                    .and_then(|c| c.parse::<BlockColor>().ok())?;
                self.lift(color)
            }
        };
        Some(achieved)
    }

    fn lift(&mut self, color: BlockColor) -> bool {
        if self.held().is_some() {
            return false;
        }
        let reachable = match self.blocks.get(&color) {
            Some(BlockLocation::Table | BlockLocation::Slider) => true,
            Some(BlockLocation::Drawer) => self.drawer_open,
            _ => false,
        };
        if reachable {
            self.blocks.insert(color, BlockLocation::Gripper);
        }
        reachable
    }

    fn place(&mut self, target: BlockLocation, reachable: bool) -> bool {
        let Some(color) = self.held() else {
            return false;
        };
        if !reachable {
            return false;
        }
        self.blocks.insert(color, target);
        true
    }

    pub fn describe(&self) -> String {
        let mut sentences = vec![
            format!("The led is {}.", on_off(self.led_on)),
            format!("The lightbulb is {}.", on_off(self.lightbulb_on)),
            format!(
                "The drawer is {}.",
                if self.drawer_open { "open" } else { "closed" }
            ),
            format!(
                "The sliding door is on the {}.",
                if self.slider_left { "left" } else { "right" }
            ),
        ];
        for (color, loc) in &self.blocks {
            sentences.push(format!("The {} block is {}.", color, loc.phrase()));
        }
        if self.held().is_none() {
            sentences.push("The gripper is empty.".to_string());
        }
        sentences.join(" ")
    }
}

fn toggle(flag: &mut bool, target: bool) -> bool {
    if *flag == target {
        return false;
    }
    *flag = target;
    true
}

fn on_off(on: bool) -> &'static str {
    if on {
        "on"
    } else {
        "off"
    }
}

/// Subtasks understood by the tabletop scene
pub fn tabletop_vocabulary() -> ActionVocabulary {
    let mut vocabulary = ActionVocabulary::new();
    for (id, description) in [
        ("turn_on_led", "turn on the led"),
        ("turn_off_led", "turn off the led"),
        ("turn_on_lightbulb", "turn on the lightbulb"),
        ("turn_off_lightbulb", "turn off the lightbulb"),
        ("open_drawer", "open the drawer"),
        ("close_drawer", "close the drawer"),
        ("move_slider_left", "move the sliding door to the left"),
        ("move_slider_right", "move the sliding door to the right"),
    ] {
        vocabulary.insert(id, description);
    }
    for color in BlockColor::ALL {
        vocabulary.insert(
            format!("lift_{}_block", color),
            format!("lift the {} block", color),
        );
    }
    vocabulary.insert("place_in_drawer", "place in the drawer");
    vocabulary.insert("place_in_slider", "place in the sliding cabinet");
    vocabulary.insert("place_on_table", "place on the table");
    vocabulary
}

/// Environment session over a [`SceneState`]
#[derive(Debug, Clone)]
pub struct TabletopSession {
    initial: SceneState,
    state: SceneState,
    episodes: u32,
}

impl TabletopSession {
    pub fn new() -> Self {
        Self::with_initial_state(SceneState::default())
    }

    pub fn with_initial_state(initial: SceneState) -> Self {
        Self {
            state: initial.clone(),
            initial,
            episodes: 0,
        }
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    /// Number of resets performed on this session
    pub fn episodes(&self) -> u32 {
        self.episodes
    }
}

impl Default for TabletopSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvironmentSession for TabletopSession {
    fn reset(&mut self) -> Result<EpisodeStart> {
        self.state = self.initial.clone();
        self.episodes += 1;
        debug!(episode = self.episodes, "Tabletop scene reset");

        Ok(EpisodeStart {
            env_description: self.state.describe(),
            task_description: DEFAULT_TASK.to_string(),
            vocabulary: tabletop_vocabulary(),
        })
    }

    fn describe(&self) -> Result<String> {
        Ok(self.state.describe())
    }

    fn rollout(&mut self, policy: &mut dyn Policy, action: &str) -> Result<bool> {
        debug!(
            checkpoint = %policy.checkpoint(),
            device = policy.device(),
            action,
            "Tabletop rollout"
        );
        self.state.apply(action).ok_or_else(|| {
            EvalError::EnvironmentFault(format!("tabletop scene has no subtask '{}'", action))
        })
    }

    fn scene_info(&self) -> serde_json::Value {
        json!({
            "fixed_objects": {
                "led": u8::from(self.state.led_on),
                "lightbulb": u8::from(self.state.lightbulb_on),
                "drawer": if self.state.drawer_open { "open" } else { "closed" },
                "slider": if self.state.slider_left { "left" } else { "right" },
            },
            "movable_objects": self.state.blocks,
        })
    }
}

/// Policy handle restored from a checkpoint for the tabletop scene
#[derive(Debug, Clone)]
pub struct TabletopPolicy {
    checkpoint: Checkpoint,
    device: u32,
}

impl TabletopPolicy {
    pub fn new(checkpoint: Checkpoint, device: u32) -> Self {
        Self { checkpoint, device }
    }
}

impl Policy for TabletopPolicy {
    fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    fn device(&self) -> u32 {
        self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> TabletopPolicy {
        TabletopPolicy::new(Checkpoint::new("epoch=1.ckpt"), 0)
    }

    #[test]
    fn test_default_instruction_plan_succeeds() {
        let mut session = TabletopSession::new();
        session.reset().unwrap();
        let mut policy = policy();

        for action in ["turn_off_led", "lift_pink_block", "place_in_drawer", "turn_off_lightbulb"] {
            assert!(session.rollout(&mut policy, action).unwrap(), "{action}");
        }
        assert_eq!(
            session.state().blocks.get(&BlockColor::Pink),
            Some(&BlockLocation::Drawer)
        );
        assert!(!session.state().led_on);
    }

    #[test]
    fn test_repeated_toggle_fails() {
        let mut session = TabletopSession::new();
        let mut policy = policy();
        assert!(session.rollout(&mut policy, "turn_off_led").unwrap());
        assert!(!session.rollout(&mut policy, "turn_off_led").unwrap());
    }

    #[test]
    fn test_place_requires_open_drawer_and_held_block() {
        let mut state = SceneState::default();
        assert_eq!(state.apply("place_in_drawer"), Some(false));

        state.drawer_open = false;
        assert_eq!(state.apply("lift_red_block"), Some(true));
        assert_eq!(state.apply("place_in_drawer"), Some(false));
        assert_eq!(state.apply("lift_blue_block"), Some(false));
    }

    #[test]
    fn test_unknown_action_is_a_fault() {
        let mut session = TabletopSession::new();
        let err = session.rollout(&mut policy(), "lift_green_block").unwrap_err();
        assert!(matches!(err, EvalError::EnvironmentFault(_)));
    }

    #[test]
    fn test_reset_restores_initial_scene() {
        let mut session = TabletopSession::new();
        session.rollout(&mut policy(), "close_drawer").unwrap();
        let start = session.reset().unwrap();

        assert!(session.state().drawer_open);
        assert_eq!(session.episodes(), 1);
        assert!(start.env_description.contains("The drawer is open."));
        assert!(start.vocabulary.contains("lift_pink_block"));
    }

    #[test]
    fn test_scene_info_fixed_objects() {
        let session = TabletopSession::new();
        let info = session.scene_info();
        assert_eq!(info["fixed_objects"]["led"], 1);
        assert_eq!(info["fixed_objects"]["drawer"], "open");
        assert_eq!(info["movable_objects"]["pink"], "table");
    }

    #[test]
    fn test_every_vocabulary_action_is_understood() {
        let vocabulary = tabletop_vocabulary();
        for id in vocabulary.ids() {
            assert!(SceneState::default().apply(id).is_some(), "{id}");
        }
    }
}
