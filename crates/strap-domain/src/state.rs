use std::fmt;

/// Outcome of collapsing working-tree and remote state into one decision.
///
/// Derived fresh on every check; never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateDecision {
    UpToDate,
    UpdateAvailable,
    LocalChanges,
    NotARepository,
}

impl UpdateDecision {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateDecision::UpToDate => "up-to-date",
            UpdateDecision::UpdateAvailable => "update-available",
            UpdateDecision::LocalChanges => "blocked-by-local-changes",
            UpdateDecision::NotARepository => "not-a-repository",
        }
    }
}

/// Why a restart was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartReason {
    EnterEnvironment,
    UpdateApplied,
}

impl RestartReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RestartReason::EnterEnvironment => "enter-environment",
            RestartReason::UpdateApplied => "update-applied",
        }
    }
}

/// A commit identifier. Comparison uses the full hash; display uses the
/// conventional short prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Revision(String);

impl Revision {
    pub const SHORT_LEN: usize = 8;

    pub fn new(full: impl Into<String>) -> Self {
        Self(full.into().trim().to_string())
    }

    pub fn full(&self) -> &str {
        &self.0
    }

    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(Self::SHORT_LEN)
            .map_or(self.0.len(), |(idx, _)| idx);
        &self.0[..end]
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

/// Local and remote tips for the configured branch.
#[derive(Clone, Debug)]
pub struct RevisionPair {
    pub local: Revision,
    pub remote: Revision,
}

impl RevisionPair {
    #[must_use]
    pub fn needs_update(&self) -> bool {
        self.local != self.remote
    }
}
