//! Command handlers.
//!
//! Handlers follow the canonical pattern, `pub async fn execute(...) ->
//! Result<()>`: thin wrappers that validate input, drive the composed
//! session or a port, and format output for the terminal. Port wiring
//! stays in `bootstrap`.

pub mod devices;
pub mod talk;
