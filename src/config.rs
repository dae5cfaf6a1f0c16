use crate::session::Toggles;

/// Construction-time settings of an [`crate::Interpreter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InterpreterConfig {
    /// Skip real-component acquisition and wire the fallback set directly.
    pub force_demo_mode: bool,
    /// Initial toggle values for the session.
    pub toggles: Toggles,
}

impl InterpreterConfig {
    pub fn demo() -> Self {
        Self {
            force_demo_mode: true,
            ..Self::default()
        }
    }

    pub fn with_debug_mode(mut self, enabled: bool) -> Self {
        self.toggles.debug_mode = enabled;
        self
    }

    pub fn with_auto_tag(mut self, enabled: bool) -> Self {
        self.toggles.auto_tag_enabled = enabled;
        self
    }

    pub fn with_enhanced_mode(mut self, enabled: bool) -> Self {
        self.toggles.enhanced_mode = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_toggles() {
        let config = InterpreterConfig::demo()
            .with_debug_mode(true)
            .with_auto_tag(true)
            .with_enhanced_mode(false);
        assert!(config.force_demo_mode);
        assert!(config.toggles.debug_mode);
        assert!(config.toggles.auto_tag_enabled);
        assert!(!config.toggles.enhanced_mode);
    }
}
