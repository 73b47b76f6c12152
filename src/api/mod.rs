//! Provides the remote backend client and the query layer built on top of it.
//!
//! Includes:
//! - `supabase`: RPC client for the remote analytics backend.
//! - `service`: remote-first analytics queries with local fallback.
//! - `live`: cached live per-city snapshots.
//! - `refresh`: memoized refetch-on-key-change controller.

mod live;
mod refresh;
mod service;
mod supabase;

#[cfg(test)]
mod test_support;

pub use live::*;
pub use refresh::*;
pub use service::*;
pub use supabase::*;
