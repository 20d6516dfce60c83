//! Exit-on-last-removed policy.
//!
//! Read only when the population transitions to empty. Callers that empty and
//! immediately repopulate (reconfiguration) suspend it first and restore the
//! previous value afterwards.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitPolicy {
    exit_on_last_removed: bool,
}

impl Default for ExitPolicy {
    fn default() -> Self {
        Self {
            exit_on_last_removed: true,
        }
    }
}

impl ExitPolicy {
    pub fn is_exit_on_last_removed(&self) -> bool {
        self.exit_on_last_removed
    }

    pub fn set_exit_on_last_removed(&mut self, value: bool) {
        self.exit_on_last_removed = value;
    }

    /// Disable the policy, returning the value to hand back to [`ExitPolicy::restore`].
    pub fn suspend(&mut self) -> bool {
        let prior = self.exit_on_last_removed;
        self.exit_on_last_removed = false;
        prior
    }

    pub fn restore(&mut self, prior: bool) {
        self.exit_on_last_removed = prior;
    }
}
