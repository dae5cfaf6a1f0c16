//! Multi-line block assembly.
//!
//! The [`LineProcessor`] sits in front of the command parser. It is a two-state machine:
//! `Normal` lets ordinary lines through, `InBlock` buffers lines until an explicit
//! terminator (`end` or `}`) or a dedent closes the block.

use crate::lexer::split_list;
use crate::parser::CommandParser;
use crate::ports::{ExecutorContext, Registry, Role, not_available};
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use tracing::{debug, info};

/// Kind of block, decided by its opening keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockType {
    Function,
    Control,
    Config,
    Context,
    Unknown,
}

impl BlockType {
    /// Lowercase name used in reports, e.g. `function`.
    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Function => "function",
            BlockType::Control => "control",
            BlockType::Config => "config",
            BlockType::Context => "context",
            BlockType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The block being assembled. Exists only while the processor is in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockState {
    pub block_type: BlockType,
    /// Raw lines in arrival order, opening line first.
    pub block_buffer: Vec<String>,
    /// Indentation column of the opening line.
    pub block_indent: usize,
}

#[derive(Debug, Default)]
enum LineState {
    #[default]
    Normal,
    InBlock(BlockState),
}

/// What the processor did with a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    /// Not block text; parse and execute it as an ordinary command.
    Forward,
    /// Appended to the current block; nothing to show.
    Buffered,
    /// A block was opened or explicitly closed.
    Output(String),
    /// The line dedented past the opener. The block was closed with `report` and the
    /// line itself still has to be processed as top-level input.
    DedentClosed { report: String },
}

/// Indentation column of `line`; a tab counts as four columns.
pub fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}

fn is_close_marker(trimmed: &str) -> bool {
    trimmed.eq_ignore_ascii_case("end") || trimmed == "}"
}

static FUNCTION_SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*define\s+(\w+)\s*(?:\(([^)]*)\))?")
        .unwrap_or_else(|e| panic!("invalid signature pattern: {e}"))
});

/// Body lines that count as statements: not blank, not comments.
fn statements(body: &[String]) -> usize {
    body.iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .count()
}

/// Leading keyword and the rest of the opener, with trailing `:`/`{` removed.
fn split_opener(opener: &str) -> (String, String) {
    let opener = opener.trim().trim_end_matches(&['{', ':'][..]).trim();
    match opener.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword.to_lowercase(), rest.trim().to_string()),
        None => (opener.to_lowercase(), String::new()),
    }
}

#[derive(Debug, Default)]
pub struct LineProcessor {
    state: LineState,
}

impl LineProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a block is currently being assembled.
    pub fn in_block(&self) -> bool {
        matches!(self.state, LineState::InBlock(_))
    }

    /// The open block, if any.
    pub fn block_state(&self) -> Option<&BlockState> {
        match &self.state {
            LineState::InBlock(block) => Some(block),
            LineState::Normal => None,
        }
    }

    /// Drop any half-built block without executing it.
    pub fn reset(&mut self) {
        self.state = LineState::Normal;
    }

    /// Feed one line through the state machine.
    pub fn process(
        &mut self,
        line: &str,
        parser: &CommandParser,
        registry: &Registry,
    ) -> LineOutcome {
        if !self.in_block() {
            if !parser.is_block_start(line) {
                return LineOutcome::Forward;
            }
            let block_type = parser.get_block_type(line);
            let block_indent = indent_of(line);
            debug!(%block_type, block_indent, "block opened");
            self.state = LineState::InBlock(BlockState {
                block_type,
                block_buffer: vec![line.to_string()],
                block_indent,
            });
            return LineOutcome::Output(format!("Starting {block_type} block: {}", line.trim()));
        }

        let LineState::InBlock(block) = &mut self.state else {
            return LineOutcome::Forward;
        };
        let trimmed = line.trim();
        if is_close_marker(trimmed) {
            return match self.close_block(registry) {
                Some(report) => LineOutcome::Output(report),
                None => LineOutcome::Forward,
            };
        }

        if !trimmed.is_empty() && indent_of(line) <= block.block_indent {
            debug!("block closed by dedent");
            return match self.close_block(registry) {
                Some(report) => LineOutcome::DedentClosed { report },
                None => LineOutcome::Forward,
            };
        }

        block.block_buffer.push(line.to_string());
        LineOutcome::Buffered
    }

    /// Close the current block as if a terminator had been read.
    pub fn force_end_block(&mut self, registry: &Registry) -> Option<String> {
        self.close_block(registry)
    }

    fn close_block(&mut self, registry: &Registry) -> Option<String> {
        let LineState::InBlock(block) = std::mem::take(&mut self.state) else {
            return None;
        };
        info!(
            block_type = %block.block_type,
            lines = block.block_buffer.len(),
            "block closed"
        );
        Some(execute_block(block, registry))
    }
}

/// Summarise a closed block and forward it to the matching collaborator.
fn execute_block(block: BlockState, registry: &Registry) -> String {
    let (opener, body) = block
        .block_buffer
        .split_first()
        .map(|(first, rest)| (first.as_str(), rest))
        .unwrap_or(("", &[][..]));
    let count = statements(body);
    let body_text = body.join("\n");

    if block.block_type == BlockType::Function {
        let caps = FUNCTION_SIGNATURE.captures(opener);
        let name = caps
            .as_ref()
            .and_then(|c| c.get(1))
            .map_or("anonymous", |m| m.as_str());
        let params = caps
            .as_ref()
            .and_then(|c| c.get(2))
            .and_then(|m| split_list(m.as_str(), ',').ok())
            .unwrap_or_default();

        let report = format!(
            "Function '{name}({})' defined with {count} statement(s)",
            params.join(", ")
        );
        let note = match &registry.functions {
            Some(functions) => functions
                .define_function(name, &params, &body_text)
                .unwrap_or_else(|e| format!("functions failed: {e:#}")),
            None => not_available(Role::Functions),
        };
        return format!("{report}\n{note}");
    }

    let (keyword, rest) = split_opener(opener);
    let report = match block.block_type {
        BlockType::Control => format!("Control block '{keyword}' with {count} statement(s)"),
        BlockType::Config => {
            let settings = body
                .iter()
                .map(|l| l.trim())
                .filter(|l| !l.starts_with('#') && (l.contains(':') || l.contains('=')))
                .count();
            format!("Config block '{keyword}' with {settings} setting(s)")
        }
        BlockType::Context => {
            let name = if rest.is_empty() { "default" } else { rest.as_str() };
            format!("Context block '{name}' with {count} operation(s)")
        }
        BlockType::Function | BlockType::Unknown => {
            format!("Block with {} line(s)", block.block_buffer.len())
        }
    };

    let context = ExecutorContext {
        block_type: block.block_type,
        indent: block.block_indent,
        line_count: block.block_buffer.len(),
    };
    let note = match &registry.block_executor {
        Some(executor) => executor
            .execute_block(&block.block_buffer.join("\n"), &context)
            .unwrap_or_else(|e| format!("block_executor failed: {e:#}")),
        None => not_available(Role::BlockExecutor),
    };
    format!("{report}\n{note}")
}
