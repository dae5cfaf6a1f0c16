use crate::block::BlockType;
use crate::command::{CommandType, ParamValue, Parameters, ParseResult};
use crate::lexer::{split_list, split_pairs, unquote};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// One entry of a pattern table.
///
/// A rule either claims a line and returns the fields it extracted, or declines it.
/// Rules never fail: malformed input is simply not matched.
pub trait Rule {
    /// The tag produced when this rule matches.
    fn command_type(&self) -> CommandType;

    /// Try to claim `line` (already trimmed).
    fn try_match(&self, line: &str) -> Option<Parameters>;
}

fn regex(pattern: &str) -> Regex {
    // Patterns are literals in this file; a bad one is a programming error caught by tests.
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid rule pattern {pattern}: {e}"))
}

fn named<'h>(caps: &regex::Captures<'h>, name: &str) -> Option<&'h str> {
    caps.name(name).map(|m| m.as_str())
}

/// `remember("<content>") as "<tags>" [category: "<c>"] [confidence: <n>]`
struct EnhancedRemember {
    pattern: Regex,
}

impl EnhancedRemember {
    fn new() -> Self {
        Self {
            pattern: regex(
                r#"(?i)^remember\s*\(\s*"(?P<content>[^"]*)"\s*\)\s+as\s+"(?P<tags>[^"]*)"(?:\s+category:\s*"(?P<category>[^"]*)")?(?:\s+confidence:\s*(?P<confidence>\d+(?:\.\d+)?|\.\d+))?\s*$"#,
            ),
        }
    }
}

impl Rule for EnhancedRemember {
    fn command_type(&self) -> CommandType {
        CommandType::EnhancedRemember
    }

    fn try_match(&self, line: &str) -> Option<Parameters> {
        let caps = self.pattern.captures(line)?;
        let tags = split_list(named(&caps, "tags")?, ',').ok()?;

        let mut params = Parameters::new();
        params.insert("content".into(), named(&caps, "content")?.into());
        params.insert("tags".into(), ParamValue::List(tags));
        if let Some(category) = named(&caps, "category") {
            params.insert("category".into(), category.into());
        }
        if let Some(confidence) = named(&caps, "confidence") {
            params.insert(
                "confidence".into(),
                ParamValue::Number(confidence.parse().ok()?),
            );
        }
        Some(params)
    }
}

static PRIORITY: LazyLock<Regex> = LazyLock::new(|| regex(r"(?i)\bpriority:\s*(\w+)"));
static DEADLINE: LazyLock<Regex> =
    LazyLock::new(|| regex(r#"(?i)\bdeadline:\s*(?:"([^"]*)"|(\S+))"#));
static ASSIGNED_AGENT: LazyLock<Regex> =
    LazyLock::new(|| regex(r#"(?i)\bagent:\s*"?([\w-]+)"?"#));

/// `goal: "<text>" priority: <p> [deadline: <d>] [agent: <a>]`
struct EnhancedGoal {
    pattern: Regex,
}

impl EnhancedGoal {
    fn new() -> Self {
        Self {
            pattern: regex(
                r#"(?i)^goal:\s*(?:"(?P<quoted>[^"]*)"|(?P<bare>[^"]+?))(?P<rest>\s+(?:priority|deadline|agent):.*)$"#,
            ),
        }
    }
}

impl Rule for EnhancedGoal {
    fn command_type(&self) -> CommandType {
        CommandType::EnhancedGoal
    }

    fn try_match(&self, line: &str) -> Option<Parameters> {
        let caps = self.pattern.captures(line)?;
        let goal = named(&caps, "quoted").or_else(|| named(&caps, "bare"))?;
        let rest = named(&caps, "rest")?;

        let priority = PRIORITY
            .captures(rest)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_lowercase());
        let deadline = DEADLINE
            .captures(rest)
            .and_then(|c| c.get(1).or_else(|| c.get(2)))
            .map(|m| m.as_str().to_string());
        // An agent clause alone is not enough to make this an enhanced goal.
        if priority.is_none() && deadline.is_none() {
            return None;
        }

        let mut params = Parameters::new();
        params.insert("goal".into(), goal.trim().into());
        if let Some(priority) = priority {
            params.insert("priority".into(), priority.into());
        }
        if let Some(deadline) = deadline {
            params.insert("deadline".into(), deadline.into());
        }
        if let Some(agent) = ASSIGNED_AGENT.captures(rest).and_then(|c| c.get(1)) {
            params.insert("agent".into(), agent.as_str().into());
        }
        Some(params)
    }
}

/// `agent: <mode> specialization: "<text>"`
struct EnhancedAgent {
    pattern: Regex,
}

impl EnhancedAgent {
    fn new() -> Self {
        Self {
            pattern: regex(
                r#"(?i)^agent:\s*"?(?P<mode>[^"\s]+)"?\s+specialization:\s*(?:"(?P<quoted>[^"]*)"|(?P<bare>[^"]+?))\s*$"#,
            ),
        }
    }
}

impl Rule for EnhancedAgent {
    fn command_type(&self) -> CommandType {
        CommandType::EnhancedAgent
    }

    fn try_match(&self, line: &str) -> Option<Parameters> {
        let caps = self.pattern.captures(line)?;
        let specialization = named(&caps, "quoted").or_else(|| named(&caps, "bare"))?;

        let mut params = Parameters::new();
        params.insert("mode".into(), named(&caps, "mode")?.to_lowercase().into());
        params.insert("specialization".into(), specialization.into());
        Some(params)
    }
}

/// `plugin: <name>(<k>=<v>, ...)`
struct EnhancedPlugin {
    pattern: Regex,
}

impl EnhancedPlugin {
    fn new() -> Self {
        Self {
            pattern: regex(r"(?i)^plugin:\s*(?P<name>[A-Za-z_][\w-]*)\s*\((?P<args>.*)\)\s*$"),
        }
    }
}

impl Rule for EnhancedPlugin {
    fn command_type(&self) -> CommandType {
        CommandType::EnhancedPlugin
    }

    fn try_match(&self, line: &str) -> Option<Parameters> {
        let caps = self.pattern.captures(line)?;
        let args: BTreeMap<String, String> = split_pairs(named(&caps, "args")?)
            .ok()?
            .into_iter()
            .collect();

        let mut params = Parameters::new();
        params.insert("plugin".into(), named(&caps, "name")?.into());
        params.insert("args".into(), ParamValue::Map(args));
        Some(params)
    }
}

/// Single-capture rule keyed by a command keyword. The capture becomes `content`.
struct BasicRule {
    command_type: CommandType,
    pattern: Regex,
}

impl BasicRule {
    fn new(command_type: CommandType, pattern: &str) -> Self {
        Self {
            command_type,
            pattern: regex(pattern),
        }
    }
}

impl Rule for BasicRule {
    fn command_type(&self) -> CommandType {
        self.command_type
    }

    fn try_match(&self, line: &str) -> Option<Parameters> {
        let content = self.pattern.captures(line)?.get(1)?.as_str();
        let content = unquote(content);
        if content.is_empty() {
            return None;
        }
        let mut params = Parameters::new();
        params.insert("content".into(), content.into());
        Some(params)
    }
}

static BLOCK_START: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"(?i)^\s*(define|if|while|for|context|config|settings|preferences)\b")
});

/// Turns one line of text into a [`ParseResult`].
///
/// Two explicit rule lists are kept: enhanced rules are always tried before basic
/// rules, and within each list the first match wins.
pub struct CommandParser {
    enhanced: Vec<Box<dyn Rule>>,
    basic: Vec<Box<dyn Rule>>,
}

impl CommandParser {
    pub fn new() -> Self {
        let enhanced: Vec<Box<dyn Rule>> = vec![
            Box::new(EnhancedRemember::new()),
            Box::new(EnhancedGoal::new()),
            Box::new(EnhancedAgent::new()),
            Box::new(EnhancedPlugin::new()),
        ];
        let basic: Vec<Box<dyn Rule>> = vec![
            Box::new(BasicRule::new(
                CommandType::Remember,
                r#"(?i)^remember\s*\(\s*("[^"]*"|[^)]*?)\s*\)"#,
            )),
            Box::new(BasicRule::new(
                CommandType::Recall,
                r"(?i)^recall\b\s*\(?\s*(.+?)\s*\)?\s*$",
            )),
            Box::new(BasicRule::new(CommandType::Goal, r"(?i)^goal:\s*(.+?)\s*$")),
            Box::new(BasicRule::new(CommandType::Agent, r"(?i)^agent:\s*(.+?)\s*$")),
            Box::new(BasicRule::new(CommandType::Plugin, r"(?i)^plugin:\s*(.+?)\s*$")),
            Box::new(BasicRule::new(
                CommandType::Define,
                r"(?i)^define\s+(\w+\s*\([^)]*\))\s*:?\s*\{?\s*$",
            )),
            Box::new(BasicRule::new(
                CommandType::Think,
                r"(?i)^think\b\s*(?:about\s+)?(.+?)\s*$",
            )),
            Box::new(BasicRule::new(CommandType::Analyze, r"(?i)^analyze\b\s*(.+?)\s*$")),
            Box::new(BasicRule::new(
                CommandType::Assistant,
                r"(?i)^assistant:\s*(.+?)\s*$",
            )),
            Box::new(BasicRule::new(CommandType::Debug, r"(?i)^debug:\s*(.+?)\s*$")),
            Box::new(BasicRule::new(CommandType::Meta, r"(?i)^meta:\s*(.+?)\s*$")),
        ];
        Self { enhanced, basic }
    }

    /// Parse with both rule lists. Total: unmatched input yields `unknown`.
    pub fn parse(&self, line: &str) -> ParseResult {
        self.parse_with(line, true)
    }

    /// Parse with basic rules only.
    pub fn parse_basic(&self, line: &str) -> ParseResult {
        self.parse_with(line, false)
    }

    pub fn parse_with(&self, line: &str, enhanced: bool) -> ParseResult {
        let trimmed = line.trim();
        if enhanced {
            if let Some(result) = Self::first_match(&self.enhanced, trimmed, line) {
                return result;
            }
        }
        Self::first_match(&self.basic, trimmed, line).unwrap_or_else(|| ParseResult::unknown(line))
    }

    fn first_match(rules: &[Box<dyn Rule>], trimmed: &str, raw: &str) -> Option<ParseResult> {
        rules.iter().find_map(|rule| {
            rule.try_match(trimmed)
                .map(|params| ParseResult::new(rule.command_type(), params, raw))
        })
    }

    /// Whether `line` opens a multi-line block.
    pub fn is_block_start(&self, line: &str) -> bool {
        BLOCK_START.is_match(line)
    }

    /// Classify a block opener.
    pub fn get_block_type(&self, line: &str) -> BlockType {
        let Some(caps) = BLOCK_START.captures(line) else {
            return BlockType::Unknown;
        };
        match caps[1].to_lowercase().as_str() {
            "define" => BlockType::Function,
            "if" | "while" | "for" => BlockType::Control,
            "context" => BlockType::Context,
            "config" | "settings" | "preferences" => BlockType::Config,
            _ => BlockType::Unknown,
        }
    }
}

impl Default for CommandParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(items: &[&str]) -> ParamValue {
        ParamValue::List(items.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_enhanced_remember_with_tags_and_category() {
        let parser = CommandParser::new();
        let parsed =
            parser.parse(r#"remember("AetherraCode rocks") as "ai,lang" category: "notes""#);

        assert_eq!(parsed.command_type(), CommandType::EnhancedRemember);
        assert!(parsed.enhanced());
        assert_eq!(parsed.text("content"), Some("AetherraCode rocks"));
        assert_eq!(parsed.param("tags"), Some(&list(&["ai", "lang"])));
        assert_eq!(parsed.text("category"), Some("notes"));
        assert!(parsed.param("confidence").is_none());
    }

    #[test]
    fn test_enhanced_remember_confidence() {
        let parser = CommandParser::new();
        let parsed = parser.parse(r#"remember("x") as "a" confidence: 0.75"#);
        assert_eq!(
            parsed.param("confidence").and_then(ParamValue::as_number),
            Some(0.75)
        );
    }

    #[test]
    fn test_malformed_enhanced_remember_falls_back_to_basic() {
        let parser = CommandParser::new();
        let parsed = parser.parse(r#"remember("note") as "unterminated"#);
        assert_eq!(parsed.command_type(), CommandType::Remember);
        assert!(!parsed.enhanced());
        assert_eq!(parsed.text("content"), Some("note"));
    }

    #[test]
    fn test_enhanced_goal() {
        let parser = CommandParser::new();
        let parsed = parser.parse(r#"goal: "ship v1" priority: high"#);
        assert_eq!(parsed.command_type(), CommandType::EnhancedGoal);

        let mut expected = Parameters::new();
        expected.insert("goal".into(), "ship v1".into());
        expected.insert("priority".into(), "high".into());
        assert_eq!(parsed.parameters(), &expected);
    }

    #[test]
    fn test_enhanced_goal_deadline_and_agent() {
        let parser = CommandParser::new();
        let parsed = parser.parse(r#"goal: write docs deadline: "friday" agent: scribe"#);
        assert_eq!(parsed.command_type(), CommandType::EnhancedGoal);
        assert_eq!(parsed.text("goal"), Some("write docs"));
        assert_eq!(parsed.text("deadline"), Some("friday"));
        assert_eq!(parsed.text("agent"), Some("scribe"));
        assert!(parsed.param("priority").is_none());
    }

    #[test]
    fn test_goal_with_agent_only_is_basic() {
        let parser = CommandParser::new();
        let parsed = parser.parse(r#"goal: "tidy up" agent: janitor"#);
        assert_eq!(parsed.command_type(), CommandType::Goal);
    }

    #[test]
    fn test_enhanced_agent() {
        let parser = CommandParser::new();
        let parsed = parser.parse(r#"agent: ON specialization: "data analysis""#);
        assert_eq!(parsed.command_type(), CommandType::EnhancedAgent);
        assert_eq!(parsed.text("mode"), Some("on"));
        assert_eq!(parsed.text("specialization"), Some("data analysis"));
    }

    #[test]
    fn test_enhanced_plugin_args() {
        let parser = CommandParser::new();
        let parsed = parser.parse(r#"plugin: calc(x=1, label="a, b")"#);
        assert_eq!(parsed.command_type(), CommandType::EnhancedPlugin);
        assert_eq!(parsed.text("plugin"), Some("calc"));
        let args = parsed.param("args").and_then(ParamValue::as_map).unwrap();
        assert_eq!(args.get("x").map(String::as_str), Some("1"));
        assert_eq!(args.get("label").map(String::as_str), Some("a, b"));
    }

    #[test]
    fn test_plugin_with_bad_args_is_basic() {
        let parser = CommandParser::new();
        let parsed = parser.parse("plugin: calc(x)");
        assert_eq!(parsed.command_type(), CommandType::Plugin);
        assert_eq!(parsed.text("content"), Some("calc(x)"));
    }

    #[test]
    fn test_basic_rules() {
        let parser = CommandParser::new();
        let cases = [
            ("remember(\"buy milk\")", CommandType::Remember, "buy milk"),
            ("recall \"milk\"", CommandType::Recall, "milk"),
            ("recall(\"milk\")", CommandType::Recall, "milk"),
            ("goal: learn rust", CommandType::Goal, "learn rust"),
            ("agent: on", CommandType::Agent, "on"),
            ("plugin: weather", CommandType::Plugin, "weather"),
            ("define add(a, b)", CommandType::Define, "add(a, b)"),
            ("think about lifetimes", CommandType::Think, "lifetimes"),
            ("analyze logs", CommandType::Analyze, "logs"),
            ("assistant: what now?", CommandType::Assistant, "what now?"),
            ("debug: checkpoint", CommandType::Debug, "checkpoint"),
            ("meta: list", CommandType::Meta, "list"),
        ];
        for (line, ty, content) in cases {
            let parsed = parser.parse(line);
            assert_eq!(parsed.command_type(), ty, "line: {line}");
            assert_eq!(parsed.text("content"), Some(content), "line: {line}");
            assert!(!parsed.enhanced());
        }
    }

    #[test]
    fn test_keyword_prefix_does_not_match() {
        let parser = CommandParser::new();
        assert_eq!(parser.parse("analyzer logs").command_type(), CommandType::Unknown);
        assert_eq!(parser.parse("debug_mode: on").command_type(), CommandType::Unknown);
    }

    #[test]
    fn test_unknown_line() {
        let parser = CommandParser::new();
        let parsed = parser.parse("zzz not a command");
        assert_eq!(parsed.command_type(), CommandType::Unknown);
        assert_eq!(parsed.text("raw"), Some("zzz not a command"));
        assert_eq!(parsed.parameters().len(), 1);
    }

    #[test]
    fn test_parse_basic_skips_enhanced_rules() {
        let parser = CommandParser::new();
        let parsed = parser.parse_basic(r#"goal: "ship v1" priority: high"#);
        assert_eq!(parsed.command_type(), CommandType::Goal);
        assert_eq!(parsed.text("content"), Some(r#""ship v1" priority: high"#));
    }

    #[test]
    fn test_block_start_and_type() {
        let parser = CommandParser::new();
        assert!(parser.is_block_start("define add(a, b)"));
        assert!(parser.is_block_start("  while x < 3:"));
        assert!(!parser.is_block_start("defined"));
        assert!(!parser.is_block_start("remember(\"x\")"));

        assert_eq!(parser.get_block_type("define f()"), BlockType::Function);
        assert_eq!(parser.get_block_type("if ready:"), BlockType::Control);
        assert_eq!(parser.get_block_type("for x in xs"), BlockType::Control);
        assert_eq!(parser.get_block_type("context work:"), BlockType::Context);
        assert_eq!(parser.get_block_type("settings {"), BlockType::Config);
        assert_eq!(parser.get_block_type("hello"), BlockType::Unknown);
    }
}
