//! # Load Balancer Family
//!
//! Lifecycle shells for load balancer instances, their listeners and the
//! backend servers attached to a listener. All three share one [`SlbApi`]
//! handle.
//!
//! [`SlbApi`]: crate::client::SlbApi

pub mod backend;
pub mod instance;
pub mod listener;

pub use backend::Backend;
pub use instance::LoadBalancerInstance;
pub use listener::Listener;
