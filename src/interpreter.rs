use crate::block::{BlockType, LineOutcome, LineProcessor};
use crate::command::{CommandType, ExecutionResult, ParseResult};
use crate::config::InterpreterConfig;
use crate::engine::ExecutionEngine;
use crate::fallback::FallbackSystemManager;
use crate::features::{EnhancedFeatureParser, auto_tags};
use crate::parser::CommandParser;
use crate::ports::{ComponentProvider, ComponentSet, NoRealComponents, Omission, Registry, Role};
use crate::session::{SessionState, Toggles};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info, warn};

const HELP: &str = "\
Commands:
  remember(\"text\")                         store a memory
  recall <query>                           search memories
  goal: <text>                             set a goal
  agent: on|off                            switch the agent
  plugin: <name> [args]                    invoke a plugin
  define <name>(<params>)                  declare a function (opens a block)
  think [about] <topic>                    think about a topic
  analyze <topic>                          analyse a topic
  assistant: <question>                    ask the assistant
  debug: <message>                         emit a debug message
  meta: <command>                          run a meta plugin

Enhanced forms:
  remember(\"text\") as \"tag1,tag2\" [category: \"c\"] [confidence: 0.9]
  goal: \"text\" priority: high [deadline: \"friday\"] [agent: name]
  agent: on specialization: \"data analysis\"
  plugin: <name>(key=value, ...)

Blocks (close with `end`, `}` or by dedenting):
  define <name>(<params>)   if / while / for   context <name>   config / settings / preferences

Features:
  enhanced_mode|auto_tag|self_edit|agent_mode|debug_mode: on|off
  reflect on <topic>
  suggest [actions] [for <topic>]";

/// Snapshot of the interpreter, as returned by [`Interpreter::get_system_status`].
#[derive(Debug, Clone, PartialEq)]
pub struct SystemStatus {
    pub demo_mode: bool,
    pub available: Vec<Role>,
    pub omitted: Vec<(Role, Omission)>,
    pub in_block: bool,
    pub block_type: Option<BlockType>,
    pub buffered_lines: usize,
    pub history_len: usize,
    pub execution_stats: BTreeMap<CommandType, u64>,
    pub toggles: Toggles,
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on_off = |b: bool| if b { "on" } else { "off" };
        let available: Vec<_> = self.available.iter().map(|r| r.name()).collect();

        writeln!(f, "Demo mode: {}", on_off(self.demo_mode))?;
        writeln!(f, "Components: {}", available.join(", "))?;
        for (role, why) in &self.omitted {
            writeln!(f, "  omitted {role}: {why}")?;
        }
        match self.block_type {
            Some(block_type) if self.in_block => writeln!(
                f,
                "Block: {block_type} ({} line(s) buffered)",
                self.buffered_lines
            )?,
            _ => writeln!(f, "Block: none")?,
        }
        writeln!(f, "History: {} command(s)", self.history_len)?;
        for (command_type, count) in &self.execution_stats {
            writeln!(f, "  {command_type}: {count}")?;
        }
        write!(
            f,
            "Toggles: enhanced_mode={} auto_tag={} self_edit={} agent_mode={} debug_mode={}",
            on_off(self.toggles.enhanced_mode),
            on_off(self.toggles.auto_tag_enabled),
            on_off(self.toggles.self_edit_mode),
            on_off(self.toggles.agent_mode),
            on_off(self.toggles.debug_mode),
        )
    }
}

/// The command-language interpreter.
///
/// Feeds each line through the enhanced feature parser, the block line processor,
/// the command parser and the execution engine, in that order. Every failure is
/// turned into text; nothing escapes [`Interpreter::execute`].
///
/// Example
/// ```
/// use aetherra_interpreter::Interpreter;
/// let mut interp = Interpreter::default();
/// let out = interp.execute(r#"remember("rust is fun")"#);
/// assert_eq!(out, "[demo] memory stored: rust is fun");
/// assert!(interp.get_system_status().demo_mode);
/// ```
pub struct Interpreter {
    session: SessionState,
    fallback: FallbackSystemManager,
    provider: Box<dyn ComponentProvider>,
    config: InterpreterConfig,
    registry: Registry,
    parser: CommandParser,
    line_processor: LineProcessor,
    features: EnhancedFeatureParser,
    engine: ExecutionEngine,
    last_result: Option<ExecutionResult>,
}

impl Interpreter {
    /// Create an interpreter that takes its real components from `provider`.
    pub fn new(config: InterpreterConfig, provider: Box<dyn ComponentProvider>) -> Self {
        let session = SessionState::new(config.toggles);
        let mut fallback = FallbackSystemManager::new();
        let set = Self::acquire_components(&config, provider.as_ref(), &mut fallback);
        let registry = Registry::build(set);
        info!(demo_mode = fallback.is_demo_mode(), "interpreter ready");

        Self {
            session,
            fallback,
            provider,
            config,
            registry,
            parser: CommandParser::new(),
            line_processor: LineProcessor::new(),
            features: EnhancedFeatureParser::new(),
            engine: ExecutionEngine::new(),
            last_result: None,
        }
    }

    /// Create an interpreter with no real subsystems, i.e. in demo mode.
    pub fn with_config(config: InterpreterConfig) -> Self {
        Self::new(config, Box::new(NoRealComponents))
    }

    /// All real components or none: any acquisition error selects the full fallback set.
    fn acquire_components(
        config: &InterpreterConfig,
        provider: &dyn ComponentProvider,
        fallback: &mut FallbackSystemManager,
    ) -> ComponentSet {
        if config.force_demo_mode {
            info!("demo mode forced by configuration");
            return fallback.enable_demo_mode();
        }
        match provider.acquire() {
            Ok(set) => {
                fallback.disable_demo_mode();
                set
            }
            Err(e) => {
                warn!(error = %e, "real components unavailable, using demo fallbacks");
                fallback.enable_demo_mode()
            }
        }
    }

    /// Execute one line and return the text to show.
    ///
    /// `line` may be a whole command or one line of a block. Lines that only feed a
    /// block produce empty text.
    pub fn execute(&mut self, line: &str) -> String {
        if let Some(tracked) = self.session.track(line) {
            debug!(line = tracked, "tracked");
        }
        self.route(line)
    }

    fn route(&mut self, line: &str) -> String {
        if let Some(out) = self
            .features
            .parse_enhanced_features(line, &mut self.session, &self.registry)
        {
            return out;
        }

        match self.line_processor.process(line, &self.parser, &self.registry) {
            LineOutcome::Output(out) => out,
            LineOutcome::Buffered => String::new(),
            LineOutcome::DedentClosed { report } => {
                let rest = self.route(line);
                if rest.is_empty() {
                    report
                } else {
                    format!("{report}\n{rest}")
                }
            }
            LineOutcome::Forward if line.trim().is_empty() => String::new(),
            LineOutcome::Forward => {
                let parsed = self.parse_command(line);
                self.execute_command(&parsed).output
            }
        }
    }

    /// Parse `line` the way [`Interpreter::execute`] would, honouring the enhanced-mode
    /// toggle.
    pub fn parse_command(&self, line: &str) -> ParseResult {
        self.parser
            .parse_with(line, self.session.toggles.enhanced_mode)
    }

    /// Run an already parsed command through the engine.
    pub fn execute_command(&mut self, parsed: &ParseResult) -> ExecutionResult {
        let parsed = self.with_auto_tags(parsed);
        let mut result = self.engine.execute(&parsed, &self.registry);
        if result.success {
            self.session.record_success(result.command_type);
        }
        if self.session.toggles.debug_mode {
            self.report_to_debug_system(&parsed, &mut result);
        }
        self.last_result = Some(result.clone());
        result
    }

    fn with_auto_tags(&self, parsed: &ParseResult) -> ParseResult {
        if !self.session.toggles.auto_tag_enabled
            || parsed.command_type() != CommandType::Remember
            || parsed.param("tags").is_some()
        {
            return parsed.clone();
        }
        let tags = parsed.text("content").map(auto_tags).unwrap_or_default();
        if tags.is_empty() {
            return parsed.clone();
        }
        debug!(?tags, "auto-tagged");
        parsed.with_param("tags", tags)
    }

    fn report_to_debug_system(&self, parsed: &ParseResult, result: &mut ExecutionResult) {
        let Some(debug_system) = &self.registry.debug_system else {
            return;
        };
        let message = format!(
            "{} ({}) in {:?}: {}",
            result.command_type,
            parsed.raw_line().trim(),
            result.execution_time,
            if result.success { "ok" } else { "failed" }
        );
        if let Err(e) = debug_system.debug(&message) {
            warn!(error = %e, "debug system rejected message");
        }

        let Some(error) = result.error.clone() else {
            return;
        };
        if let Err(e) = debug_system.detect_and_store_error(&error, parsed.raw_line()) {
            warn!(error = %e, "debug system could not store error");
        }
        match debug_system.suggest_fix(&error) {
            Ok(fix) => result.output.push_str(&format!(
                "\nSuggested fix: {} (confidence {:.0}%, risk: {})",
                fix.fix,
                fix.confidence * 100.0,
                fix.risk
            )),
            Err(e) => warn!(error = %e, "debug system could not suggest a fix"),
        }
    }

    /// Result of the most recent engine execution.
    pub fn last_result(&self) -> Option<&ExecutionResult> {
        self.last_result.as_ref()
    }

    /// Every non-blank line given to [`Interpreter::execute`], trimmed, oldest first.
    pub fn get_command_history(&self) -> &[String] {
        &self.session.command_history
    }

    /// A snapshot of components, block state, history, stats and toggles.
    pub fn get_system_status(&self) -> SystemStatus {
        let block = self.line_processor.block_state();
        SystemStatus {
            demo_mode: self.fallback.is_demo_mode(),
            available: self.registry.available(),
            omitted: self.registry.omitted().to_vec(),
            in_block: self.line_processor.in_block(),
            block_type: block.map(|b| b.block_type),
            buffered_lines: block.map_or(0, |b| b.block_buffer.len()),
            history_len: self.session.command_history.len(),
            execution_stats: self.session.execution_stats.clone(),
            toggles: self.session.toggles,
        }
    }

    /// Engine-side counters; equal to the session stats unless the session was cleared.
    pub fn engine_stats(&self) -> &BTreeMap<CommandType, u64> {
        self.engine.stats()
    }

    /// Clear history, stats and any open block, then rewire all components.
    pub fn reset_interpreter(&mut self) -> String {
        self.session.clear();
        self.line_processor.reset();
        self.last_result = None;

        let set =
            Self::acquire_components(&self.config, self.provider.as_ref(), &mut self.fallback);
        self.registry = Registry::build(set);
        self.parser = CommandParser::new();
        self.line_processor = LineProcessor::new();
        self.features = EnhancedFeatureParser::new();
        self.engine = ExecutionEngine::new();
        info!(demo_mode = self.fallback.is_demo_mode(), "interpreter reset");

        format!(
            "Interpreter reset (demo mode: {})",
            if self.fallback.is_demo_mode() { "on" } else { "off" }
        )
    }

    /// Close a block that was never terminated.
    pub fn force_end_block(&mut self) -> String {
        self.line_processor
            .force_end_block(&self.registry)
            .unwrap_or_else(|| "No active block to end".to_string())
    }

    /// Usage text listing commands, enhanced forms, blocks and features.
    pub fn get_help(&self) -> String {
        HELP.to_string()
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::with_config(InterpreterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AcquireError;
    use crate::ports::tests::{FailingMemory, RecordingDebug, RecordingMemory, StubFunctions};

    struct FailingProvider;

    impl ComponentProvider for FailingProvider {
        fn acquire(&self) -> Result<ComponentSet, AcquireError> {
            Err(AcquireError::RoleFailed {
                role: "agent",
                reason: "handshake refused".into(),
            })
        }
    }

    struct MemoryOnlyProvider(RecordingMemory);

    impl ComponentProvider for MemoryOnlyProvider {
        fn acquire(&self) -> Result<ComponentSet, AcquireError> {
            Ok(ComponentSet {
                memory: Some(Box::new(self.0.clone())),
                functions: Some(Box::new(StubFunctions)),
                ..Default::default()
            })
        }
    }

    struct DebuggedProvider(RecordingDebug);

    impl ComponentProvider for DebuggedProvider {
        fn acquire(&self) -> Result<ComponentSet, AcquireError> {
            Ok(ComponentSet {
                memory: Some(Box::new(FailingMemory)),
                functions: Some(Box::new(StubFunctions)),
                debug_system: Some(Box::new(self.0.clone())),
                ..Default::default()
            })
        }
    }

    #[test]
    fn test_failed_acquisition_uses_full_fallback_set() {
        let interp = Interpreter::new(InterpreterConfig::default(), Box::new(FailingProvider));
        let status = interp.get_system_status();
        assert!(status.demo_mode);
        assert_eq!(status.available, Role::TIERED.to_vec());
    }

    #[test]
    fn test_real_components_are_not_mixed_with_fallbacks() {
        let memory = RecordingMemory::default();
        let mut interp = Interpreter::new(
            InterpreterConfig::default(),
            Box::new(MemoryOnlyProvider(memory.clone())),
        );
        let status = interp.get_system_status();
        assert!(!status.demo_mode);
        assert_eq!(status.available, vec![Role::Memory, Role::Functions]);
        assert_eq!(interp.execute("goal: learn"), "goal_system not available");

        assert_eq!(interp.execute("remember(\"real\")"), "stored: real");
        assert_eq!(memory.stored.borrow().len(), 1);
    }

    #[test]
    fn test_blank_lines_are_not_tracked() {
        let mut interp = Interpreter::default();
        assert_eq!(interp.execute(""), "");
        assert_eq!(interp.execute("   "), "");
        interp.execute("recall x");
        assert_eq!(interp.get_command_history(), ["recall x"]);
    }

    #[test]
    fn test_stats_are_mirrored() {
        let mut interp = Interpreter::default();
        interp.execute("recall x");
        interp.execute("recall y");
        interp.execute("agent: sideways");
        let status = interp.get_system_status();
        assert_eq!(status.execution_stats[&CommandType::Recall], 2);
        assert!(!status.execution_stats.contains_key(&CommandType::Agent));
        assert_eq!(interp.engine_stats(), &status.execution_stats);
        assert!(!interp.last_result().unwrap().success);
    }

    #[test]
    fn test_auto_tag_applies_to_plain_remember() {
        let memory = RecordingMemory::default();
        let mut interp = Interpreter::new(
            InterpreterConfig::default().with_auto_tag(true),
            Box::new(MemoryOnlyProvider(memory.clone())),
        );
        interp.execute("remember(\"Rust ownership rules\")");
        assert_eq!(
            memory.stored.borrow()[0].1,
            vec!["rust", "ownership", "rules"]
        );
    }

    #[test]
    fn test_enhanced_mode_off_uses_basic_rules() {
        let mut interp = Interpreter::default();
        interp.execute("enhanced_mode: off");
        let parsed = interp.parse_command(r#"goal: "ship" priority: high"#);
        assert_eq!(parsed.command_type(), CommandType::Goal);
    }

    #[test]
    fn test_debug_mode_appends_fix_on_failure() {
        let mut interp = Interpreter::with_config(InterpreterConfig::demo().with_debug_mode(true));
        let out = interp.execute("agent: sideways");
        assert!(out.starts_with("Error executing Agent Control"));
        assert!(out.ends_with(
            "Suggested fix: [demo] no fix available (confidence 0%, risk: none)"
        ));
    }

    #[test]
    fn test_debug_mode_forwards_every_execution() {
        let debug = RecordingDebug::default();
        let mut interp = Interpreter::new(
            InterpreterConfig::default().with_debug_mode(true),
            Box::new(DebuggedProvider(debug.clone())),
        );

        let out = interp.execute("think rust");
        assert_eq!(
            out,
            "Error executing Thinking: memory failed: disk full\n\
             Suggested fix: free some space (confidence 50%, risk: low)"
        );
        interp.execute("assistant: hi");

        let messages = debug.messages.borrow();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("think (think rust) in "));
        assert!(messages[0].ends_with(": failed"));
        assert!(messages[1].starts_with("assistant (assistant: hi) in "));
        assert!(messages[1].ends_with(": ok"));

        assert_eq!(
            *debug.errors.borrow(),
            vec![("memory failed: disk full".to_string(), "think rust".to_string())]
        );
    }

    #[test]
    fn test_debug_mode_off_sends_nothing() {
        let debug = RecordingDebug::default();
        let mut interp = Interpreter::new(
            InterpreterConfig::default(),
            Box::new(DebuggedProvider(debug.clone())),
        );
        assert_eq!(
            interp.execute("think rust"),
            "Error executing Thinking: memory failed: disk full"
        );
        assert!(debug.messages.borrow().is_empty());
        assert!(debug.errors.borrow().is_empty());
    }

    #[test]
    fn test_reset_clears_history_and_block() {
        let mut interp = Interpreter::default();
        interp.execute("auto_tag: on");
        interp.execute("define f(x)");
        assert!(interp.get_system_status().in_block);

        let out = interp.reset_interpreter();
        assert_eq!(out, "Interpreter reset (demo mode: on)");
        let status = interp.get_system_status();
        assert!(!status.in_block);
        assert_eq!(status.history_len, 0);
        assert!(status.execution_stats.is_empty());
        assert!(status.toggles.auto_tag_enabled);
    }

    #[test]
    fn test_force_end_block() {
        let mut interp = Interpreter::default();
        assert_eq!(interp.force_end_block(), "No active block to end");
        interp.execute("while busy:");
        interp.execute("    think hard");
        let out = interp.force_end_block();
        assert!(out.starts_with("Control block 'while' with 1 statement(s)"));
        assert!(!interp.get_system_status().in_block);
    }

    #[test]
    fn test_status_display() {
        let interp = Interpreter::default();
        let text = interp.get_system_status().to_string();
        assert!(text.starts_with("Demo mode: on\nComponents: memory, functions, goal_system"));
        assert!(text.contains("Block: none"));
        assert!(text.ends_with("debug_mode=off"));
    }
}
