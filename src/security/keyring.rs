//! Hugging Face API token storage
//!
//! The token is written to a `0600` file next to the config and mirrored
//! into the OS keyring when one is available. Reads check the file first:
//! without a platform backend the keyring crate keeps credentials in
//! process memory only.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const SERVICE_NAME: &str = "bella-chat";
const KEYRING_USER: &str = "huggingface-api-key";
const KEY_FILE: &str = "hf_api_key.txt";

fn keyring_entry() -> Option<keyring::Entry> {
    keyring::Entry::new(SERVICE_NAME, KEYRING_USER)
        .map_err(|e| debug!(error = %e, "Keyring unavailable"))
        .ok()
}

fn key_file() -> Result<PathBuf> {
    let dir = crate::config::config_path()?
        .parent()
        .context("Config path has no parent")?
        .to_path_buf();
    Ok(dir.join(KEY_FILE))
}

fn write_key_file(path: &Path, key: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("Failed to create config directory")?;
    }
    fs::write(path, key).context("Failed to write HF API key file")?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .context("Failed to set file permissions")?;
    }
    Ok(())
}

/// Trimmed file contents, `None` when missing or blank
fn read_key_file(path: &Path) -> Option<String> {
    let key = fs::read_to_string(path).ok()?;
    let key = key.trim();
    (!key.is_empty()).then(|| key.to_string())
}

/// Store the token in the key file and, when possible, the keyring
pub fn set_hf_api_key(key: &str) -> Result<()> {
    let key = key.trim();
    if key.is_empty() {
        anyhow::bail!("API key is empty");
    }

    write_key_file(&key_file()?, key)?;

    if let Some(entry) = keyring_entry() {
        if let Err(e) = entry.set_password(key) {
            debug!(error = %e, "Keyring write failed, key file only");
        }
    }
    Ok(())
}

/// The stored token, if any. The key file wins over the keyring.
pub fn load_api_key() -> Option<String> {
    if let Some(key) = key_file().ok().as_deref().and_then(read_key_file) {
        return Some(key);
    }
    keyring_entry()
        .and_then(|entry| entry.get_password().ok())
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

pub fn get_hf_api_key() -> Result<String> {
    load_api_key()
        .context("No HF API key stored. Run 'bella config --set-hf-api-key YOUR_KEY' first.")
}

/// Remove the token from both the keyring and the key file
pub fn delete_hf_api_key() -> Result<()> {
    if let Some(entry) = keyring_entry() {
        let _ = entry.delete_credential();
    }

    let path = key_file()?;
    if path.exists() {
        fs::remove_file(&path).context("Failed to delete HF API key file")?;
    }
    Ok(())
}

pub fn has_hf_api_key() -> bool {
    load_api_key().is_some()
}
