pub mod client;
pub mod envelope;

pub use client::{HttpPolicySource, PolicySource, SourceError, StaticPolicySource};
pub use envelope::parse_policy_envelope;
