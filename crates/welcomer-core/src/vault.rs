//! Passphrase encryption for the token cache at rest.
//!
//! `path` holds the plaintext cache while a run is active; between runs only
//! `path.enc` exists. Each operation produces the other form and then deletes
//! its source, so at most one of the two files is on disk once it returns.
//!
//! File layout: `WLC1` magic, 16-byte Argon2i salt, then an `orion` AEAD box
//! (XChaCha20-Poly1305, nonce included).

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use orion::{aead, kdf};
use tracing::debug;

use crate::config::Passphrase;

const MAGIC: &[u8; 4] = b"WLC1";
const SALT_LEN: usize = 16;
const KDF_ITERATIONS: u32 = 3;
const KDF_MEMORY_KIB: u32 = 1 << 14;
const KEY_LEN: u32 = 32;

/// Errors from encrypting or decrypting the cache file.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    /// The source file does not exist.
    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),

    /// Reading, writing or deleting a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The encrypted file is not in the expected format.
    #[error("Unrecognised cache file: {0}")]
    Format(String),

    /// Key derivation or authentication failed (wrong passphrase or tampered file).
    #[error("Decryption failed: wrong passphrase or corrupt file")]
    Crypto,
}

impl From<orion::errors::UnknownCryptoError> for VaultError {
    fn from(_err: orion::errors::UnknownCryptoError) -> Self {
        Self::Crypto
    }
}

/// Result type for vault operations.
pub type VaultResult<T> = std::result::Result<T, VaultError>;

/// The ciphertext sibling of `path` (`path` with `.enc` appended).
#[must_use]
pub fn encrypted_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".enc");
    PathBuf::from(name)
}

/// Encrypts `path` into `path.enc`, then deletes `path`.
///
/// # Errors
///
/// Returns [`VaultError::Missing`] if there is no plaintext, or an I/O or
/// crypto error. On error the plaintext is left where it was.
pub fn encrypt(path: &Path, passphrase: &Passphrase) -> VaultResult<()> {
    let target = encrypted_path(path);
    let plaintext = read_source(path)?;
    let sealed = seal(&plaintext, passphrase)?;

    replace(path, &target, &sealed)?;
    debug!("Encrypted {} -> {}", path.display(), target.display());
    Ok(())
}

/// Decrypts `path.enc` into `path`, then deletes `path.enc`.
///
/// # Errors
///
/// Returns [`VaultError::Missing`] if there is no ciphertext, or a format,
/// crypto or I/O error. On error nothing on disk is changed.
pub fn decrypt(path: &Path, passphrase: &Passphrase) -> VaultResult<()> {
    let source = encrypted_path(path);
    let sealed = read_source(&source)?;
    let plaintext = open(&sealed, passphrase)?;

    replace(&source, path, &plaintext)?;
    debug!("Decrypted {} -> {}", source.display(), path.display());
    Ok(())
}

/// Encrypts bytes under a key derived from `passphrase` with a fresh salt.
///
/// # Errors
///
/// Returns [`VaultError::Crypto`] if the passphrase is empty or sealing fails.
pub fn seal(plaintext: &[u8], passphrase: &Passphrase) -> VaultResult<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    orion::util::secure_rand_bytes(&mut salt)?;

    let key = derive_key(passphrase, &salt)?;
    let ciphertext = aead::seal(&key, plaintext)?;

    let mut out = Vec::with_capacity(MAGIC.len() + SALT_LEN + ciphertext.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&salt);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Reverses [`seal`].
///
/// # Errors
///
/// Returns [`VaultError::Format`] for foreign data and [`VaultError::Crypto`]
/// for a wrong passphrase or tampered ciphertext.
pub fn open(sealed: &[u8], passphrase: &Passphrase) -> VaultResult<Vec<u8>> {
    let body = sealed
        .strip_prefix(MAGIC.as_slice())
        .ok_or_else(|| VaultError::Format("missing header".into()))?;
    if body.len() <= SALT_LEN {
        return Err(VaultError::Format("file is truncated".into()));
    }

    let (salt, ciphertext) = body.split_at(SALT_LEN);
    let key = derive_key(passphrase, salt)?;
    Ok(aead::open(&key, ciphertext)?)
}

fn derive_key(passphrase: &Passphrase, salt: &[u8]) -> VaultResult<aead::SecretKey> {
    let password = kdf::Password::from_slice(passphrase.expose().as_bytes())?;
    let salt = kdf::Salt::from_slice(salt)?;
    let derived = kdf::derive_key(&password, &salt, KDF_ITERATIONS, KDF_MEMORY_KIB, KEY_LEN)?;
    Ok(aead::SecretKey::from_slice(derived.unprotected_as_bytes())?)
}

fn read_source(path: &Path) -> VaultResult<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => VaultError::Missing(path.to_path_buf()),
        _ => VaultError::Io(e),
    })
}

/// Writes `contents` to `target` and deletes `source`. If the delete fails the
/// new `target` is removed again so only one form remains.
fn replace(source: &Path, target: &Path, contents: &[u8]) -> VaultResult<()> {
    fs::write(target, contents)?;
    if let Err(e) = fs::remove_file(source) {
        let _ = fs::remove_file(target);
        return Err(e.into());
    }
    Ok(())
}
