// ─── Launch State Machine ───
// One attempt moves forward through these states. Terminal states never
// transition again.

use serde::Serialize;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::ValidationPhase;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LaunchState {
    #[default]
    Init,
    JavaCheck,
    JavaProvisioning,
    JavaReady,
    JavaFailed,
    ValidateVersion,
    ValidateAssets,
    ValidateLibraries,
    ValidateFiles,
    Downloading,
    Extracting,
    Launching,
    Running,
    Exited,
    Crashed,
}

impl LaunchState {
    pub fn is_terminal(self) -> bool {
        matches!(self, LaunchState::JavaFailed | LaunchState::Exited | LaunchState::Crashed)
    }

    pub fn can_transition_to(self, next: LaunchState) -> bool {
        use LaunchState::*;
        matches!(
            (self, next),
            (Init, JavaCheck)
                | (JavaCheck, JavaReady)
                | (JavaCheck, JavaProvisioning)
                | (JavaProvisioning, JavaReady)
                | (JavaProvisioning, JavaFailed)
                | (JavaReady, ValidateVersion)
                | (ValidateVersion, ValidateAssets)
                | (ValidateAssets, ValidateLibraries)
                | (ValidateLibraries, ValidateFiles)
                | (ValidateFiles, Downloading)
                | (Downloading, Extracting)
                | (Downloading, Launching)
                | (Extracting, Launching)
                | (Launching, Running)
                | (Running, Exited)
                | (Running, Crashed)
        )
    }

    /// Move to `next`, rejecting edges the attempt cannot take.
    pub fn transition(&mut self, next: LaunchState) -> LauncherResult<()> {
        if !self.can_transition_to(next) {
            return Err(LauncherError::Launch(format!(
                "invalid launch state transition {self:?} -> {next:?}"
            )));
        }
        *self = next;
        Ok(())
    }
}

impl From<ValidationPhase> for LaunchState {
    fn from(phase: ValidationPhase) -> Self {
        match phase {
            ValidationPhase::Version => LaunchState::ValidateVersion,
            ValidationPhase::Assets => LaunchState::ValidateAssets,
            ValidationPhase::Libraries => LaunchState::ValidateLibraries,
            ValidationPhase::Files => LaunchState::ValidateFiles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::LaunchState::*;
    use super::*;

    #[test]
    fn happy_path_with_provisioning() {
        let mut state = LaunchState::default();
        for next in [
            JavaCheck,
            JavaProvisioning,
            JavaReady,
            ValidateVersion,
            ValidateAssets,
            ValidateLibraries,
            ValidateFiles,
            Downloading,
            Extracting,
            Launching,
            Running,
            Crashed,
        ] {
            state.transition(next).unwrap();
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn extraction_is_optional() {
        let mut state = Downloading;
        state.transition(Launching).unwrap();
        assert_eq!(state, Launching);
    }

    #[test]
    fn terminal_and_skipped_edges_are_rejected() {
        let mut state = JavaFailed;
        assert!(state.transition(ValidateVersion).is_err());
        assert_eq!(state, JavaFailed);

        let mut state = JavaCheck;
        assert!(matches!(state.transition(JavaFailed), Err(LauncherError::Launch(_))));

        let mut state = ValidateVersion;
        assert!(state.transition(ValidateLibraries).is_err());
    }

    #[test]
    fn serializes_in_screaming_case() {
        assert_eq!(serde_json::to_string(&JavaProvisioning).unwrap(), "\"JAVA_PROVISIONING\"");
    }
}
