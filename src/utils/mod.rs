pub mod columns;
pub mod config;
pub mod env;

pub use columns::ImportColumns;
pub use config::ReconcileConfig;
pub use env::load_env;
