//! Security module
//!
//! Stores the inference API token in a private file and the OS keyring.

pub mod keyring;

pub use keyring::{delete_hf_api_key, get_hf_api_key, has_hf_api_key, load_api_key, set_hf_api_key};
