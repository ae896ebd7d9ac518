// File Operations for RSA Keys
// Reads and writes textual key files, one "<name>: <integer>" field per line

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::Lines;

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::rsa::{RsaBigInt, RsaError, RsaKeyPair, RsaPrivateKey, RsaPublicKey};

/// Environment variable overriding the public key file location
pub const PUBLIC_KEY_ENV: &str = "RSA_PUBLIC_KEY_FILE";
/// Environment variable overriding the private key file location
pub const PRIVATE_KEY_ENV: &str = "RSA_PRIVATE_KEY_FILE";

/// Errors that can occur during key file operations
#[derive(Debug, Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("missing field `{field}`")]
    MissingField { field: &'static str },
    #[error("expected field `{expected}`, found `{line}`")]
    UnexpectedField { expected: &'static str, line: String },
    #[error("unexpected trailing line `{line}`")]
    TrailingLine { line: String },
    #[error("field `{field}` is not a non-negative integer: `{value}`")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{} is a directory, not a key file", .path.display())]
    NotAFile { path: PathBuf },
    #[error("invalid key: {0}")]
    InvalidKey(#[from] RsaError),
}

/// Result type for file operations
pub type FileResult<T> = Result<T, FileError>;

/// Where the key files live
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyFileConfig {
    pub public_key_path: PathBuf,
    pub private_key_path: PathBuf,
}

impl Default for KeyFileConfig {
    fn default() -> Self {
        Self {
            public_key_path: PathBuf::from("publickey.txt"),
            private_key_path: PathBuf::from("privatekey.txt"),
        }
    }
}

impl KeyFileConfig {
    /// Defaults, overridden by `RSA_PUBLIC_KEY_FILE` / `RSA_PRIVATE_KEY_FILE`
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| env::var(name).ok())
    }

    fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(PUBLIC_KEY_ENV).filter(|path| !path.is_empty()) {
            self.public_key_path = PathBuf::from(path);
        }
        if let Some(path) = lookup(PRIVATE_KEY_ENV).filter(|path| !path.is_empty()) {
            self.private_key_path = PathBuf::from(path);
        }
        self
    }

    pub fn with_public_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.public_key_path = path.into();
        self
    }

    pub fn with_private_key_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.private_key_path = path.into();
        self
    }
}

/// Render a public key as `n: <n>` and `e: <e>` lines
pub fn format_public_key(key: &RsaPublicKey) -> String {
    format!("n: {}\ne: {}\n", key.n(), key.e())
}

/// Render a private key as `p: <p>`, `q: <q>` and `d: <d>` lines
pub fn format_private_key(key: &RsaPrivateKey) -> String {
    format!("p: {}\nq: {}\nd: {}\n", key.p(), key.q(), key.d())
}

/// Reads labelled fields in a fixed order, skipping blank lines
struct FieldReader<'a> {
    lines: Lines<'a>,
}

impl<'a> FieldReader<'a> {
    fn new(text: &'a str) -> Self {
        Self { lines: text.lines() }
    }

    fn next_line(&mut self) -> Option<&'a str> {
        self.lines.by_ref().map(str::trim).find(|line| !line.is_empty())
    }

    fn field(&mut self, name: &'static str) -> FileResult<RsaBigInt> {
        let line = self.next_line().ok_or(FileError::MissingField { field: name })?;

        let value = line
            .split_once(':')
            .filter(|(label, _)| label.trim() == name)
            .map(|(_, value)| value.trim())
            .ok_or_else(|| FileError::UnexpectedField {
                expected: name,
                line: line.to_string(),
            })?;

        value.parse().map_err(|_| FileError::InvalidNumber {
            field: name,
            value: value.to_string(),
        })
    }

    fn finish(mut self) -> FileResult<()> {
        match self.next_line() {
            Some(line) => Err(FileError::TrailingLine {
                line: line.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// Parse the `n`, `e` layout written by `format_public_key`
pub fn parse_public_key(text: &str) -> FileResult<RsaPublicKey> {
    let mut reader = FieldReader::new(text);
    let n = reader.field("n")?;
    let e = reader.field("e")?;
    reader.finish()?;

    Ok(RsaPublicKey::new(n, e)?)
}

/// Parse the `p`, `q`, `d` layout written by `format_private_key`
pub fn parse_private_key(text: &str) -> FileResult<RsaPrivateKey> {
    let mut reader = FieldReader::new(text);
    let p = reader.field("p")?;
    let q = reader.field("q")?;
    let d = reader.field("d")?;
    reader.finish()?;

    Ok(RsaPrivateKey::new(p, q, d)?)
}

/// Write `contents` to a temporary file next to `path`; nothing is visible at
/// `path` until `commit`
fn stage(path: &Path, contents: &[u8]) -> FileResult<NamedTempFile> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(contents)?;
    file.as_file().sync_all()?;
    Ok(file)
}

fn commit(staged: NamedTempFile, path: &Path) -> FileResult<()> {
    let existed = path.exists();
    staged.persist(path).map_err(|err| FileError::Io(err.error))?;

    if existed {
        info!(path = %path.display(), "replaced existing key file");
    } else {
        info!(path = %path.display(), "created key file");
    }
    Ok(())
}

/// Save a public key, replacing any file already at `path`
pub fn save_public_key(path: &Path, key: &RsaPublicKey) -> FileResult<()> {
    let staged = stage(path, format_public_key(key).as_bytes())?;
    commit(staged, path)
}

/// Save a private key, replacing any file already at `path`
pub fn save_private_key(path: &Path, key: &RsaPrivateKey) -> FileResult<()> {
    let staged = stage(path, format_private_key(key).as_bytes())?;
    commit(staged, path)
}

fn ensure_not_directory(path: &Path) -> FileResult<()> {
    if path.is_dir() {
        return Err(FileError::NotAFile {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

fn read_previous(path: &Path) -> FileResult<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err.into()),
    }
}

/// Put back what was at `path` before a commit: the old contents, or nothing
fn restore(path: &Path, previous: Option<Vec<u8>>) -> FileResult<()> {
    match previous {
        Some(contents) => {
            stage(path, &contents)?
                .persist(path)
                .map_err(|err| FileError::Io(err.error))?;
        }
        None => fs::remove_file(path)?,
    }
    warn!(path = %path.display(), "rolled back key file");
    Ok(())
}

/// Move both staged files into place. If the private key cannot be moved,
/// the public key file is returned to its previous state.
fn commit_pair(
    public: NamedTempFile,
    public_path: &Path,
    private: NamedTempFile,
    private_path: &Path,
) -> FileResult<()> {
    let previous = read_previous(public_path)?;
    commit(public, public_path)?;

    if let Err(err) = commit(private, private_path) {
        if let Err(restore_err) = restore(public_path, previous) {
            warn!(path = %public_path.display(), error = %restore_err, "could not roll back key file");
        }
        return Err(err);
    }
    Ok(())
}

/// Save both keys to the configured locations. Either both files are
/// written or neither location changes.
pub fn save_keypair(config: &KeyFileConfig, keypair: &RsaKeyPair) -> FileResult<()> {
    ensure_not_directory(&config.public_key_path)?;
    ensure_not_directory(&config.private_key_path)?;

    let public = stage(
        &config.public_key_path,
        format_public_key(&keypair.public_key).as_bytes(),
    )?;
    let private = stage(
        &config.private_key_path,
        format_private_key(&keypair.private_key).as_bytes(),
    )?;

    commit_pair(public, &config.public_key_path, private, &config.private_key_path)
}

pub fn load_public_key(path: &Path) -> FileResult<RsaPublicKey> {
    debug!(path = %path.display(), "loading public key");
    parse_public_key(&fs::read_to_string(path)?)
}

pub fn load_private_key(path: &Path) -> FileResult<RsaPrivateKey> {
    debug!(path = %path.display(), "loading private key");
    parse_private_key(&fs::read_to_string(path)?)
}

/// Load both keys and check that they belong together
pub fn load_keypair(config: &KeyFileConfig) -> FileResult<RsaKeyPair> {
    let public_key = load_public_key(&config.public_key_path)?;
    let private_key = load_private_key(&config.private_key_path)?;

    Ok(RsaKeyPair::from_parts(public_key, private_key)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::bigint::from_u64;
    use crate::rsa::generate_keypair;
    use tempfile::tempdir;

    fn textbook_keypair() -> RsaKeyPair {
        generate_keypair(&from_u64(3), &from_u64(11)).unwrap()
    }

    fn config_in(dir: &Path) -> KeyFileConfig {
        KeyFileConfig::default()
            .with_public_key_path(dir.join("publickey.txt"))
            .with_private_key_path(dir.join("privatekey.txt"))
    }

    #[test]
    fn test_format_keys() {
        let keypair = textbook_keypair();
        assert_eq!(format_public_key(&keypair.public_key), "n: 33\ne: 3\n");
        assert_eq!(format_private_key(&keypair.private_key), "p: 3\nq: 11\nd: 7\n");
    }

    #[test]
    fn test_parse_keys() {
        let keypair = textbook_keypair();
        assert_eq!(parse_public_key("n: 33\ne: 3").unwrap(), keypair.public_key);
        assert_eq!(
            parse_private_key("  p: 3\n\nq:11\r\nd: 7\n\n").unwrap(),
            keypair.private_key
        );
    }

    #[test]
    fn test_parse_large_values() {
        let n = "340282366920938463463374607431768211457";
        let key = parse_public_key(&format!("n: {}\ne: 65537\n", n)).unwrap();
        assert_eq!(key.n().to_string(), n);
        assert_eq!(format_public_key(&key), format!("n: {}\ne: 65537\n", n));
    }

    #[test]
    fn test_parse_malformed() {
        assert!(matches!(
            parse_public_key("n: 33\n"),
            Err(FileError::MissingField { field: "e" })
        ));
        assert!(matches!(
            parse_public_key("e: 3\nn: 33\n"),
            Err(FileError::UnexpectedField { expected: "n", .. })
        ));
        assert!(matches!(
            parse_public_key("n: 33\ne: three\n"),
            Err(FileError::InvalidNumber { field: "e", .. })
        ));
        assert!(matches!(
            parse_public_key("n: -33\ne: 3\n"),
            Err(FileError::InvalidNumber { field: "n", .. })
        ));
        assert!(matches!(
            parse_public_key("n: 33\ne: 3\nd: 7\n"),
            Err(FileError::TrailingLine { .. })
        ));
        assert!(matches!(
            parse_private_key("p: 4\nq: 11\nd: 7\n"),
            Err(FileError::InvalidKey(RsaError::InvalidArgument(_)))
        ));
    }

    #[test]
    fn test_save_and_load_keypair() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let keypair = textbook_keypair();

        save_keypair(&config, &keypair).unwrap();

        assert_eq!(fs::read_to_string(&config.public_key_path).unwrap(), "n: 33\ne: 3\n");
        assert_eq!(
            fs::read_to_string(&config.private_key_path).unwrap(),
            "p: 3\nq: 11\nd: 7\n"
        );
        assert_eq!(load_keypair(&config).unwrap(), keypair);

        // Only the two key files remain, no staging leftovers
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("publickey.txt");
        fs::write(&path, "stale contents that are longer than the key").unwrap();

        save_public_key(&path, &textbook_keypair().public_key).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "n: 33\ne: 3\n");
    }

    #[test]
    fn test_save_into_missing_directory_leaves_nothing() {
        let dir = tempdir().unwrap();
        let config = KeyFileConfig::default()
            .with_public_key_path(dir.path().join("publickey.txt"))
            .with_private_key_path(dir.path().join("missing").join("privatekey.txt"));

        let result = save_keypair(&config, &textbook_keypair());
        assert!(matches!(result, Err(FileError::Io(_))));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_keypair_rejects_directory_target() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        fs::create_dir(&config.private_key_path).unwrap();

        let result = save_keypair(&config, &textbook_keypair());
        assert!(matches!(result, Err(FileError::NotAFile { ref path }) if path == &config.private_key_path));
        assert!(!config.public_key_path.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_save_keypair_keeps_old_public_key_on_directory_target() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        fs::write(&config.public_key_path, "n: 35\ne: 5\n").unwrap();
        fs::create_dir(&config.private_key_path).unwrap();

        assert!(save_keypair(&config, &textbook_keypair()).is_err());
        assert_eq!(
            fs::read_to_string(&config.public_key_path).unwrap(),
            "n: 35\ne: 5\n"
        );
    }

    #[test]
    fn test_commit_pair_rolls_back_public_key() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let keypair = textbook_keypair();

        // A non-empty directory cannot be replaced by a rename
        fs::create_dir(&config.private_key_path).unwrap();
        fs::write(config.private_key_path.join("keep"), "").unwrap();

        // No previous public key: the new one is removed again
        let public = stage(&config.public_key_path, format_public_key(&keypair.public_key).as_bytes()).unwrap();
        let private = stage(&config.private_key_path, format_private_key(&keypair.private_key).as_bytes()).unwrap();
        let result = commit_pair(public, &config.public_key_path, private, &config.private_key_path);
        assert!(matches!(result, Err(FileError::Io(_))));
        assert!(!config.public_key_path.exists());

        // Previous public key: its contents come back
        fs::write(&config.public_key_path, "n: 35\ne: 5\n").unwrap();
        let public = stage(&config.public_key_path, format_public_key(&keypair.public_key).as_bytes()).unwrap();
        let private = stage(&config.private_key_path, format_private_key(&keypair.private_key).as_bytes()).unwrap();
        let result = commit_pair(public, &config.public_key_path, private, &config.private_key_path);
        assert!(matches!(result, Err(FileError::Io(_))));
        assert_eq!(
            fs::read_to_string(&config.public_key_path).unwrap(),
            "n: 35\ne: 5\n"
        );

        // The public key file and the directory, no staging leftovers
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_load_mismatched_keys() {
        let dir = tempdir().unwrap();
        let config = config_in(dir.path());
        let other = generate_keypair(&from_u64(5), &from_u64(7)).unwrap();

        save_public_key(&config.public_key_path, &textbook_keypair().public_key).unwrap();
        save_private_key(&config.private_key_path, &other.private_key).unwrap();

        assert!(matches!(load_keypair(&config), Err(FileError::InvalidKey(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        let result = load_public_key(&dir.path().join("nope.txt"));
        assert!(matches!(result, Err(FileError::Io(_))));
    }

    #[test]
    fn test_config_overrides() {
        let config = KeyFileConfig::default().with_overrides(|name| match name {
            PUBLIC_KEY_ENV => Some("keys/pub.txt".to_string()),
            PRIVATE_KEY_ENV => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.public_key_path, PathBuf::from("keys/pub.txt"));
        assert_eq!(config.private_key_path, PathBuf::from("privatekey.txt"));
    }
}
