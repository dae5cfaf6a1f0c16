use thiserror::Error;

/// Failure raised by a command handler.
///
/// Faults never cross [`crate::Interpreter::execute`]; the execution engine turns them
/// into an unsuccessful [`crate::command::ExecutionResult`].
#[derive(Debug, Error)]
pub enum Fault {
    /// The command matched a rule but its arguments make no sense for the handler.
    #[error("invalid arguments for {command}: {reason}")]
    InvalidArguments {
        command: &'static str,
        reason: String,
    },

    /// A collaborator returned an error while serving the command.
    #[error("{role} failed: {source:#}")]
    Collaborator {
        role: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Fault {
    pub fn invalid(command: &'static str, reason: impl Into<String>) -> Self {
        Fault::InvalidArguments {
            command,
            reason: reason.into(),
        }
    }

    pub fn collaborator(role: &'static str, source: anyhow::Error) -> Self {
        Fault::Collaborator { role, source }
    }
}

/// Reasons why the real collaborators could not be acquired.
#[derive(Debug, Error)]
pub enum AcquireError {
    /// No real subsystem is configured at all.
    #[error("no real subsystems configured")]
    NotConfigured,

    /// A single role failed to come up; the whole real set is discarded.
    #[error("failed to acquire {role}: {reason}")]
    RoleFailed { role: &'static str, reason: String },
}

/// Extension used by handlers to tag collaborator errors with their role.
pub(crate) trait CollaboratorResultExt<T> {
    fn by(self, role: &'static str) -> Result<T, Fault>;
}

impl<T> CollaboratorResultExt<T> for anyhow::Result<T> {
    fn by(self, role: &'static str) -> Result<T, Fault> {
        self.map_err(|e| Fault::collaborator(role, e))
    }
}
