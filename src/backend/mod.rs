// Gateway module for backend access - follows the Train Station Pattern
// All external access must go through this gateway

// Private submodules - not directly accessible from outside
mod factory;
mod http;
mod traits;

// Public re-exports - the ONLY way to access backend functionality
pub use factory::GatewayFactory;
pub use http::HttpGateway;
pub use traits::Gateway;

#[cfg(test)]
pub use traits::MockGateway;
