//! Assignment policies.
//!
//! The assignment policy is the single point where business rules decide
//! whether a verified external identity may be bound to the certificate
//! subject being requested. A rejection carries no reason; the requester
//! only ever sees `invalid-access-code`.

use crate::session::SubjectName;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// The identity was not accepted for the subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Identity was not accepted for this subject")]
pub struct AssignmentRejected;

/// Binds a verified identity to a certificate subject name.
///
/// Called at most once per attempt, and only after the ID token verified.
pub trait AssignmentPolicy: Send + Sync {
    /// Decide whether `identity` may obtain a certificate for `subject`.
    ///
    /// # Errors
    ///
    /// Returns [`AssignmentRejected`] to refuse the binding.
    fn assign(
        &self,
        subject: &SubjectName,
        identity: &str,
    ) -> impl Future<Output = Result<(), AssignmentRejected>> + Send;
}

/// Accepts every verified identity and logs the binding.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl AssignmentPolicy for AcceptAll {
    async fn assign(&self, subject: &SubjectName, identity: &str) -> Result<(), AssignmentRejected> {
        tracing::info!(subject = %subject, identity = %identity, "Subject applied by identity");
        Ok(())
    }
}

/// Accepts email identities whose domain is on an allow-list.
///
/// Domains compare case-insensitively.
#[derive(Debug, Clone)]
pub struct AllowedDomains {
    domains: Vec<String>,
}

impl AllowedDomains {
    /// Create a policy allowing `domains` (e.g. `"example.com"`).
    #[must_use]
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            domains: domains
                .into_iter()
                .map(|d| d.as_ref().trim_start_matches('@').to_ascii_lowercase())
                .collect(),
        }
    }

    fn allows(&self, identity: &str) -> bool {
        let Some((local, domain)) = identity.rsplit_once('@') else {
            return false;
        };
        !local.is_empty()
            && !domain.is_empty()
            && self.domains.iter().any(|d| d.eq_ignore_ascii_case(domain))
    }
}

impl AssignmentPolicy for AllowedDomains {
    async fn assign(&self, subject: &SubjectName, identity: &str) -> Result<(), AssignmentRejected> {
        if self.allows(identity) {
            Ok(())
        } else {
            tracing::warn!(subject = %subject, identity = %identity, "Identity domain not allowed");
            Err(AssignmentRejected)
        }
    }
}

/// One identity per subject name.
///
/// The first identity to claim a subject owns it for the lifetime of the
/// policy; later claims by the same identity succeed, claims by others are
/// rejected. Bindings are in memory only.
#[derive(Debug, Clone, Default)]
pub struct UniqueBinding {
    bindings: Arc<Mutex<HashMap<SubjectName, String>>>,
}

impl UniqueBinding {
    /// Create an empty binding table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity currently bound to `subject`.
    #[must_use]
    pub fn bound_identity(&self, subject: &SubjectName) -> Option<String> {
        self.bindings
            .lock()
            .ok()
            .and_then(|bindings| bindings.get(subject).cloned())
    }

    fn bind(&self, subject: &SubjectName, identity: &str) -> Result<(), AssignmentRejected> {
        let mut bindings = self.bindings.lock().map_err(|_| AssignmentRejected)?;
        match bindings.get(subject) {
            Some(owner) if owner != identity => Err(AssignmentRejected),
            Some(_) => Ok(()),
            None => {
                bindings.insert(subject.clone(), identity.to_string());
                Ok(())
            }
        }
    }
}

impl AssignmentPolicy for UniqueBinding {
    async fn assign(&self, subject: &SubjectName, identity: &str) -> Result<(), AssignmentRejected> {
        let result = self.bind(subject, identity);
        if result.is_err() {
            tracing::warn!(subject = %subject, identity = %identity, "Subject already bound to another identity");
        }
        result
    }
}
