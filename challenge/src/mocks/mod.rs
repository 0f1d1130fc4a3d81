//! Mock capability implementations for testing.
//!
//! In-memory, deterministic stand-ins for the token endpoint, the ID token
//! verifier, and the assignment policy. Each records what it was called with.

pub mod exchange;
pub mod policy;
pub mod verifier;

pub use exchange::MockTokenExchanger;
pub use policy::MockAssignmentPolicy;
pub use verifier::MockIdTokenVerifier;
