//! Audio adapters for banter.
//!
//! Currently just input device discovery through `cpal`. Capture itself is
//! owned by whichever transcript source the frontend wires in.

#![deny(unused_crate_dependencies)]

pub mod devices;

pub use devices::CpalDeviceRegistry;
