//! Capability discovery
//!
//! [`CardResolver`] fetches an agent's card from its well-known location and
//! [`AgentCardCache`] keeps resolved cards per endpoint with a time-to-live.

pub mod cache;
pub mod resolver;

pub use cache::AgentCardCache;
pub use resolver::CardResolver;
