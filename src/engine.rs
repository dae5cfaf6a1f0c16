use crate::builtin::handler_for;
use crate::command::{CommandType, ExecutionResult, ParseResult};
use crate::ports::Registry;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, warn};

/// Runs parsed commands through their handlers.
///
/// The engine times each handler call and maps its `Result` to an [`ExecutionResult`].
/// It keeps its own per-type success counter; the interpreter mirrors it into the session.
#[derive(Debug, Default)]
pub struct ExecutionEngine {
    stats: BTreeMap<CommandType, u64>,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `parsed` through its handler. Never panics or propagates a fault.
    pub fn execute(&mut self, parsed: &ParseResult, registry: &Registry) -> ExecutionResult {
        let command_type = parsed.command_type();
        let mut metadata = BTreeMap::new();
        metadata.insert("enhanced".to_string(), parsed.enhanced().to_string());
        metadata.insert("command_name".to_string(), parsed.command_name().to_string());

        let start = Instant::now();
        let outcome = handler_for(command_type).handle(parsed, registry);
        let elapsed = start.elapsed();

        match outcome {
            Ok(output) => {
                *self.stats.entry(command_type).or_insert(0) += 1;
                debug!(%command_type, ?elapsed, "command executed");
                ExecutionResult::succeeded(command_type, output, elapsed, metadata)
            }
            Err(fault) => {
                warn!(%command_type, error = %fault, "command failed");
                ExecutionResult::failed(command_type, fault.to_string(), elapsed, metadata)
            }
        }
    }

    /// Successful executions per command type.
    pub fn stats(&self) -> &BTreeMap<CommandType, u64> {
        &self.stats
    }
}
