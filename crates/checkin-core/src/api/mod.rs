//! Remote store gateway.
//!
//! `RemoteStore` is the seam the sync engine and record directory talk to.
//! Two HTTP backends implement it:
//!
//! - `SupabaseClient`: PostgREST table `presencas`
//! - `SheetsClient`: Google Apps Script web app over a spreadsheet
//!
//! `RemoteBackend` picks one of them (or none) from configuration.

pub mod backend;
pub mod error;
mod http;
pub mod sheets;
pub mod store;
pub mod supabase;
#[cfg(test)]
mod test_server;

pub use backend::RemoteBackend;
pub use error::GatewayError;
pub use sheets::SheetsClient;
pub use store::RemoteStore;
pub use supabase::SupabaseClient;
