//! Inbound challenge requests.

use crate::constants::parameters;
use crate::error::{ChallengeError, Result};
use std::collections::HashMap;
use std::fmt;

/// Raw challenge parameters, name to bytes.
pub type ParameterKV = HashMap<String, Vec<u8>>;

/// One challenge attempt as delivered by the issuance layer.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ChallengeRequest {
    parameters: ParameterKV,
}

impl ChallengeRequest {
    /// Create an empty request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing parameter map.
    #[must_use]
    pub const fn from_parameters(parameters: ParameterKV) -> Self {
        Self { parameters }
    }

    /// Add one parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// Non-empty value of parameter `name`.
    ///
    /// An empty value is treated as absent.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&[u8]> {
        self.parameters
            .get(name)
            .map(Vec::as_slice)
            .filter(|value| !value.is_empty())
    }

    /// All parameters.
    #[must_use]
    pub const fn parameters(&self) -> &ParameterKV {
        &self.parameters
    }

    /// Extract `(oidc-id, access-code)`.
    ///
    /// # Errors
    ///
    /// Returns [`ChallengeError::MissingParameter`] naming the first absent
    /// parameter.
    pub fn oidc_parameters(&self) -> Result<(&[u8], &[u8])> {
        let oidc_id = self
            .parameter(parameters::OIDC_ID)
            .ok_or(ChallengeError::MissingParameter(parameters::OIDC_ID))?;
        let access_code = self
            .parameter(parameters::ACCESS_CODE)
            .ok_or(ChallengeError::MissingParameter(parameters::ACCESS_CODE))?;
        Ok((oidc_id, access_code))
    }
}

// Values may hold authorization codes; only names are printed.
impl fmt::Debug for ChallengeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.parameters.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("ChallengeRequest")
            .field("parameters", &names)
            .finish()
    }
}
