// src/utils/env.rs

use log::debug;

/// Load variables from a `.env` file if one is present. Missing files are
/// fine; real environment variables always win.
pub fn load_env() {
    match dotenv::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(_) => debug!("No .env file found; using process environment"),
    }
}
