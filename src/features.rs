//! Meta-commands that change interpreter behaviour or ask for introspection.
//!
//! The vocabulary (`auto_tag: on`, `reflect on ...`, `suggest actions`, ...) is disjoint
//! from the command grammar, so these lines never reach the command parser.

use crate::builtin::parse_switch;
use crate::ports::{Registry, Role, not_available};
use crate::session::{SessionState, Toggles};
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Toggle {
    EnhancedMode,
    AutoTag,
    SelfEdit,
    AgentMode,
    DebugMode,
}

impl Toggle {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_lowercase().as_str() {
            "enhanced_mode" => Some(Toggle::EnhancedMode),
            "auto_tag" => Some(Toggle::AutoTag),
            "self_edit" => Some(Toggle::SelfEdit),
            "agent_mode" => Some(Toggle::AgentMode),
            "debug_mode" => Some(Toggle::DebugMode),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Toggle::EnhancedMode => "Enhanced parsing",
            Toggle::AutoTag => "Auto-tagging",
            Toggle::SelfEdit => "Self-edit mode",
            Toggle::AgentMode => "Agent mode",
            Toggle::DebugMode => "Debug mode",
        }
    }

    fn slot(self, toggles: &mut Toggles) -> &mut bool {
        match self {
            Toggle::EnhancedMode => &mut toggles.enhanced_mode,
            Toggle::AutoTag => &mut toggles.auto_tag_enabled,
            Toggle::SelfEdit => &mut toggles.self_edit_mode,
            Toggle::AgentMode => &mut toggles.agent_mode,
            Toggle::DebugMode => &mut toggles.debug_mode,
        }
    }
}

pub struct EnhancedFeatureParser {
    toggle: Regex,
    reflect: Regex,
    suggest: Regex,
}

impl EnhancedFeatureParser {
    pub fn new() -> Self {
        let compile = |pattern: &str| {
            Regex::new(pattern).unwrap_or_else(|e| panic!("invalid feature pattern {pattern}: {e}"))
        };
        Self {
            toggle: compile(
                r"(?i)^(enhanced_mode|auto_tag|self_edit|agent_mode|debug_mode)\s*:\s*(\S*)\s*$",
            ),
            reflect: compile(r#"(?i)^reflect\s+on\s+"?([^"]+?)"?\s*$"#),
            suggest: compile(r#"(?i)^suggest(?:\s+actions)?(?:\s+for\s+"?([^"]+?)"?)?\s*$"#),
        }
    }

    pub fn can_handle(&self, line: &str) -> bool {
        let line = line.trim();
        self.toggle.is_match(line) || self.reflect.is_match(line) || self.suggest.is_match(line)
    }

    /// Handle `line` if it belongs to the feature vocabulary.
    ///
    /// Toggles are written straight into `session`. Returns `None` when the line is not
    /// a feature command.
    pub fn parse_enhanced_features(
        &self,
        line: &str,
        session: &mut SessionState,
        registry: &Registry,
    ) -> Option<String> {
        let line = line.trim();

        if let Some(caps) = self.toggle.captures(line) {
            let toggle = Toggle::from_keyword(&caps[1])?;
            return Some(self.apply_toggle(toggle, &caps[2], session, registry));
        }
        if let Some(caps) = self.reflect.captures(line) {
            return Some(reflect(caps[1].trim(), registry));
        }
        if let Some(caps) = self.suggest.captures(line) {
            return Some(suggest(caps.get(1).map(|m| m.as_str().trim()), registry));
        }
        None
    }

    fn apply_toggle(
        &self,
        toggle: Toggle,
        value: &str,
        session: &mut SessionState,
        registry: &Registry,
    ) -> String {
        let Some(enabled) = parse_switch(value) else {
            return format!(
                "Unknown value '{value}' for {}; use on or off",
                toggle.label()
            );
        };
        *toggle.slot(&mut session.toggles) = enabled;
        debug!(?toggle, enabled, "feature toggled");

        let mut out = format!(
            "{} {}",
            toggle.label(),
            if enabled { "enabled" } else { "disabled" }
        );
        if toggle == Toggle::AgentMode {
            for note in agent_mode_side_effects(enabled, registry) {
                out.push('\n');
                out.push_str(&note);
            }
        }
        out
    }
}

impl Default for EnhancedFeatureParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Let the goal system and the agent follow the agent-mode toggle.
fn agent_mode_side_effects(enabled: bool, registry: &Registry) -> Vec<String> {
    let mut notes = Vec::new();
    if let Some(goals) = &registry.goal_system {
        notes.push(
            goals
                .set_agent_mode(enabled)
                .unwrap_or_else(|e| format!("goal_system failed: {e:#}")),
        );
    }
    if let Some(agent) = &registry.agent {
        let note = if enabled {
            agent.activate()
        } else {
            agent.deactivate().map(|_| "Agent deactivated".to_string())
        };
        notes.push(note.unwrap_or_else(|e| format!("agent failed: {e:#}")));
    }
    notes
}

fn reflect(topic: &str, registry: &Registry) -> String {
    let Some(memory) = &registry.memory else {
        return format!("Reflection unavailable: {}", not_available(Role::Memory));
    };
    match memory.recall(topic, &[], None) {
        Ok(found) if found.is_empty() => format!("No memories about '{topic}' to reflect on yet"),
        Ok(found) => {
            let mut out = format!("Reflecting on '{topic}' ({} memories):", found.len());
            for item in found {
                out.push_str(&format!("\n  - {item}"));
            }
            out
        }
        Err(e) => format!("Reflection unavailable: memory failed: {e:#}"),
    }
}

fn suggest(topic: Option<&str>, registry: &Registry) -> String {
    let Some(goals) = &registry.goal_system else {
        return format!("Suggestions unavailable: {}", not_available(Role::GoalSystem));
    };
    let active = match goals.get_active_goals() {
        Ok(active) => active,
        Err(e) => return format!("Suggestions unavailable: goal_system failed: {e:#}"),
    };

    let mut suggestions: Vec<String> = active
        .iter()
        .map(|goal| format!("Work toward goal: {goal}"))
        .collect();
    if let Some(topic) = topic {
        suggestions.push(format!("recall {topic}"));
        suggestions.push(format!("analyze {topic}"));
    }
    if suggestions.is_empty() {
        suggestions.push("goal: \"<what you want to achieve>\" priority: high".to_string());
        suggestions.push("remember(\"<something worth keeping>\")".to_string());
    }

    let mut out = String::from("Suggested actions:");
    for (i, s) in suggestions.iter().enumerate() {
        out.push_str(&format!("\n  {}. {s}", i + 1));
    }
    out
}

const STOP_WORDS: &[&str] = &[
    "about", "after", "also", "been", "before", "from", "have", "into", "just", "like", "more",
    "only", "over", "some", "than", "that", "their", "them", "then", "there", "these", "they",
    "this", "very", "what", "when", "where", "which", "while", "will", "with", "would", "your",
];

/// Up to three keyword tags derived from `content`: lowercase words of four or more
/// letters, stop words dropped, in first-seen order.
pub fn auto_tags(content: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    content
        .split(|c: char| !c.is_alphabetic())
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= 4 && !STOP_WORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .take(3)
        .collect()
}
