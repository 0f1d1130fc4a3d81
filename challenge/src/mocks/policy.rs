//! Mock assignment policy for testing.

use crate::policy::{AssignmentPolicy, AssignmentRejected};
use crate::session::SubjectName;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Behavior {
    Accept,
    Reject,
    Panic,
}

/// Mock assignment policy.
///
/// Records every `(subject, identity)` pair it is asked about.
#[derive(Debug, Clone)]
pub struct MockAssignmentPolicy {
    behavior: Behavior,
    calls: Arc<Mutex<Vec<(SubjectName, String)>>>,
}

impl MockAssignmentPolicy {
    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create a mock that accepts every binding.
    #[must_use]
    pub fn accepting() -> Self {
        Self::with_behavior(Behavior::Accept)
    }

    /// Create a mock that rejects every binding.
    #[must_use]
    pub fn rejecting() -> Self {
        Self::with_behavior(Behavior::Reject)
    }

    /// Create a mock that panics, standing in for a policy bug.
    #[must_use]
    pub fn panicking() -> Self {
        Self::with_behavior(Behavior::Panic)
    }

    /// Calls received, oldest first.
    #[must_use]
    #[allow(clippy::unwrap_used)] // Test mock: mutex poisoning is a test failure
    pub fn calls(&self) -> Vec<(SubjectName, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockAssignmentPolicy {
    fn default() -> Self {
        Self::accepting()
    }
}

impl AssignmentPolicy for MockAssignmentPolicy {
    #[allow(clippy::unwrap_used, clippy::panic)] // Test mock
    async fn assign(&self, subject: &SubjectName, identity: &str) -> Result<(), AssignmentRejected> {
        self.calls
            .lock()
            .unwrap()
            .push((subject.clone(), identity.to_string()));

        match self.behavior {
            Behavior::Accept => Ok(()),
            Behavior::Reject => Err(AssignmentRejected),
            Behavior::Panic => panic!("assignment policy failed for {subject}"),
        }
    }
}
