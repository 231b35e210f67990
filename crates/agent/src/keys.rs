// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SSH key provisioning for git access.
//!
//! Each agent process generates a fresh RSA key pair at startup. The private
//! key is written where git's SSH command reads it; the public key is
//! published in the agent registry so it can be registered with the version
//! control server.

use ssh_key::private::{KeypairData, RsaKeypair};
use ssh_key::rand_core::OsRng;
use ssh_key::{LineEnding, PrivateKey};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const RSA_KEY_BITS: usize = 4096;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("could not generate SSH key: {0}")]
    Generate(#[from] ssh_key::Error),

    #[error("could not write SSH key to {0}: {1}")]
    Write(PathBuf, #[source] std::io::Error),
}

/// The key pair an agent authenticates git operations with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentKey {
    private_key_path: PathBuf,
    public_key: String,
}

impl AgentKey {
    pub fn private_key_path(&self) -> &Path {
        &self.private_key_path
    }

    /// Public key in OpenSSH `authorized_keys` format
    pub fn public_key(&self) -> &str {
        &self.public_key
    }
}

/// Generate an RSA-4096 key pair and write the private key to `path`
/// (owner-only) and the public key next to it as `<path>.pub`.
pub fn provision(path: &Path, comment: &str) -> Result<AgentKey, KeyError> {
    provision_with_bits(path, comment, RSA_KEY_BITS)
}

pub fn provision_with_bits(path: &Path, comment: &str, bits: usize) -> Result<AgentKey, KeyError> {
    tracing::info!(path = %path.display(), bits, "generating SSH key pair");
    let keypair = RsaKeypair::random(&mut OsRng, bits)?;
    let private = PrivateKey::new(KeypairData::Rsa(keypair), comment)?;
    let pem = private.to_openssh(LineEnding::LF)?;
    let public_key = private.public_key().to_openssh()?;

    write_private_key(path, pem.as_bytes()).map_err(|e| KeyError::Write(path.to_path_buf(), e))?;
    let public_path = public_key_path(path);
    std::fs::write(&public_path, format!("{}\n", public_key))
        .map_err(|e| KeyError::Write(public_path, e))?;

    Ok(AgentKey {
        private_key_path: path.to_path_buf(),
        public_key,
    })
}

fn public_key_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".pub");
    PathBuf::from(name)
}

fn write_private_key(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    restrict_permissions(path);
    Ok(())
}

/// An existing file keeps its mode on open, so tighten it explicitly.
/// Filesystems without permission bits only get a warning.
#[cfg(unix)]
fn restrict_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        tracing::warn!(path = %path.display(), error = %e, "could not restrict SSH key permissions");
    }
}

#[cfg(not(unix))]
fn restrict_permissions(path: &Path) {
    tracing::warn!(path = %path.display(), "SSH key permissions are not restricted on this platform");
}

#[cfg(test)]
#[path = "keys_tests.rs"]
mod tests;
