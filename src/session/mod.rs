/*!
 * Session Resource Pool
 * Reuse of expensive per-entity session objects under bounded memory
 */

pub mod pool;
pub mod types;

pub use pool::{SessionHandle, SessionPool};
pub use types::{PoolStats, Session};
