use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Closed set of tags identifying which rule matched a line.
///
/// Every basic command has an enhanced counterpart only where the grammar defines
/// a richer form; anything else that fails to match is [`CommandType::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommandType {
    Remember,
    Recall,
    Goal,
    Agent,
    Plugin,
    Define,
    Think,
    Analyze,
    Assistant,
    Debug,
    Meta,
    EnhancedRemember,
    EnhancedGoal,
    EnhancedAgent,
    EnhancedPlugin,
    Unknown,
}

impl CommandType {
    /// Every tag, basic ones first.
    pub const ALL: [CommandType; 16] = [
        CommandType::Remember,
        CommandType::Recall,
        CommandType::Goal,
        CommandType::Agent,
        CommandType::Plugin,
        CommandType::Define,
        CommandType::Think,
        CommandType::Analyze,
        CommandType::Assistant,
        CommandType::Debug,
        CommandType::Meta,
        CommandType::EnhancedRemember,
        CommandType::EnhancedGoal,
        CommandType::EnhancedAgent,
        CommandType::EnhancedPlugin,
        CommandType::Unknown,
    ];

    /// Stable snake_case identifier, e.g. `enhanced_remember`.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandType::Remember => "remember",
            CommandType::Recall => "recall",
            CommandType::Goal => "goal",
            CommandType::Agent => "agent",
            CommandType::Plugin => "plugin",
            CommandType::Define => "define",
            CommandType::Think => "think",
            CommandType::Analyze => "analyze",
            CommandType::Assistant => "assistant",
            CommandType::Debug => "debug",
            CommandType::Meta => "meta",
            CommandType::EnhancedRemember => "enhanced_remember",
            CommandType::EnhancedGoal => "enhanced_goal",
            CommandType::EnhancedAgent => "enhanced_agent",
            CommandType::EnhancedPlugin => "enhanced_plugin",
            CommandType::Unknown => "unknown",
        }
    }

    /// Human label used in output.
    pub fn label(self) -> &'static str {
        match self {
            CommandType::Remember => "Memory Storage",
            CommandType::Recall => "Memory Recall",
            CommandType::Goal => "Goal Setting",
            CommandType::Agent => "Agent Control",
            CommandType::Plugin => "Plugin Invocation",
            CommandType::Define => "Function Definition",
            CommandType::Think => "Thinking",
            CommandType::Analyze => "Analysis",
            CommandType::Assistant => "Assistant Query",
            CommandType::Debug => "Debug Message",
            CommandType::Meta => "Meta Plugin",
            CommandType::EnhancedRemember => "Enhanced Memory Storage",
            CommandType::EnhancedGoal => "Enhanced Goal Setting",
            CommandType::EnhancedAgent => "Enhanced Agent Control",
            CommandType::EnhancedPlugin => "Enhanced Plugin Invocation",
            CommandType::Unknown => "Unknown Command",
        }
    }

    /// True for the richer variants tried before the basic rules.
    pub fn is_enhanced(self) -> bool {
        matches!(
            self,
            CommandType::EnhancedRemember
                | CommandType::EnhancedGoal
                | CommandType::EnhancedAgent
                | CommandType::EnhancedPlugin
        )
    }
}

impl fmt::Display for CommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parameter value extracted by a rule.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    List(Vec<String>),
    Number(f64),
    Map(BTreeMap<String, String>),
}

impl ParamValue {
    /// The text, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The items, if this is a `List` value.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// The number, if this is a `Number` value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The key/value pairs, if this is a `Map` value.
    pub fn as_map(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ParamValue::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        ParamValue::Text(s.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        ParamValue::Text(s)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(items: Vec<String>) -> Self {
        ParamValue::List(items)
    }
}

pub type Parameters = BTreeMap<String, ParamValue>;

/// Outcome of parsing one line. Immutable once produced; derived variants are built
/// with the `with_*` methods, which return a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseResult {
    command_type: CommandType,
    parameters: Parameters,
    raw_line: String,
}

impl ParseResult {
    /// Build a result from the fields a rule extracted.
    pub fn new(
        command_type: CommandType,
        parameters: Parameters,
        raw_line: impl Into<String>,
    ) -> Self {
        Self {
            command_type,
            parameters,
            raw_line: raw_line.into(),
        }
    }

    /// The result for a line no rule claimed: `parameters = {raw: line}`.
    pub fn unknown(raw_line: &str) -> Self {
        let mut parameters = Parameters::new();
        parameters.insert("raw".to_string(), ParamValue::from(raw_line));
        Self::new(CommandType::Unknown, parameters, raw_line)
    }

    /// Tag of the rule that matched.
    pub fn command_type(&self) -> CommandType {
        self.command_type
    }

    /// Human label of the command type.
    pub fn command_name(&self) -> &'static str {
        self.command_type.label()
    }

    /// All extracted fields.
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// The line exactly as it was given to the parser.
    pub fn raw_line(&self) -> &str {
        &self.raw_line
    }

    /// True when the line was matched by an enhanced rule.
    pub fn enhanced(&self) -> bool {
        self.command_type.is_enhanced()
    }

    /// A single field by name.
    pub fn param(&self, key: &str) -> Option<&ParamValue> {
        self.parameters.get(key)
    }

    /// A text field by name; `None` if absent or not text.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(ParamValue::as_text)
    }

    /// Copy of this result with one parameter added or replaced.
    pub fn with_param(&self, key: &str, value: impl Into<ParamValue>) -> Self {
        let mut next = self.clone();
        next.parameters.insert(key.to_string(), value.into());
        next
    }
}

/// Outcome of executing one parsed command.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
    pub command_type: CommandType,
    pub execution_time: Duration,
    pub metadata: BTreeMap<String, String>,
    /// Present only when `success` is false.
    pub error: Option<String>,
}

impl ExecutionResult {
    /// A successful run with the handler's output.
    pub fn succeeded(
        command_type: CommandType,
        output: String,
        execution_time: Duration,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            success: true,
            output,
            command_type,
            execution_time,
            metadata,
            error: None,
        }
    }

    /// A failed run; `output` is a readable message built from `error`.
    pub fn failed(
        command_type: CommandType,
        error: String,
        execution_time: Duration,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        Self {
            success: false,
            output: format!("Error executing {}: {}", command_type.label(), error),
            command_type,
            execution_time,
            metadata,
            error: Some(error),
        }
    }
}
