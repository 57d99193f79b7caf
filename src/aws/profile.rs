//! Writes credentials into the shared AWS credentials file.
//!
//! Only the three credential keys of the target profile are touched. Other
//! profiles, comments, unknown keys and line endings are carried through byte
//! for byte, so the file is edited line by line instead of being re-rendered
//! from a parsed INI model.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use secrecy::ExposeSecret;

use super::TemporaryCredentials;

pub const ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
pub const SESSION_TOKEN: &str = "aws_session_token";

/// The shared credentials file (`~/.aws/credentials` by default).
#[derive(Debug, Clone)]
pub struct CredentialsFile {
    path: PathBuf,
}

impl CredentialsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `$AWS_SHARED_CREDENTIALS_FILE`, falling back to `~/.aws/credentials`.
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os("AWS_SHARED_CREDENTIALS_FILE") {
            return Ok(PathBuf::from(path));
        }
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".aws").join("credentials"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create or update `profile` with `credentials`.
    pub fn save(&self, profile: &str, credentials: &TemporaryCredentials) -> Result<()> {
        anyhow::ensure!(
            !profile.trim().is_empty() && !profile.contains(['[', ']', '\n', '\r']),
            "Invalid profile name: {profile:?}"
        );

        let existing = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to read credentials file: {}", self.path.display())
                })
            }
        };

        let values = [
            (ACCESS_KEY_ID, credentials.access_key_id.as_str()),
            (
                SECRET_ACCESS_KEY,
                credentials.secret_access_key.expose_secret(),
            ),
            (SESSION_TOKEN, credentials.session_token.expose_secret()),
        ];
        let updated = upsert_section(&existing, profile, &values);
        self.write(&updated)?;

        tracing::info!(profile, path = %self.path.display(), "Saved credentials");
        Ok(())
    }

    fn write(&self, content: &str) -> Result<()> {
        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create directory: {}", dir.display()))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
        tmp.write_all(content.as_bytes())
            .context("Failed to write credentials")?;
        tmp.persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| {
                format!("Failed to replace credentials file: {}", self.path.display())
            })?;
        Ok(())
    }
}

/// Section name if `line` is a `[section]` header.
fn section_name(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    trimmed
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
}

/// Key of a `key = value` line.
fn key_name(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if trimmed.starts_with(['#', ';']) {
        return None;
    }
    trimmed.split_once('=').map(|(key, _)| key.trim())
}

fn upsert_section(content: &str, section: &str, values: &[(&str, &str)]) -> String {
    let newline = if content.contains("\r\n") { "\r\n" } else { "\n" };
    let lines: Vec<&str> = content.split_inclusive('\n').collect();

    let Some(start) = lines
        .iter()
        .position(|line| section_name(line) == Some(section))
    else {
        let mut out = content.to_string();
        let ends_blank = lines.last().is_some_and(|line| line.trim().is_empty());
        if !out.is_empty() && !ends_blank {
            if !out.ends_with('\n') {
                out.push_str(newline);
            }
            out.push_str(newline);
        }
        out.push_str(&format!("[{section}]{newline}"));
        for (key, value) in values {
            out.push_str(&format!("{key} = {value}{newline}"));
        }
        return out;
    };

    let end = lines[start + 1..]
        .iter()
        .position(|line| section_name(line).is_some())
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());

    let mut body: Vec<String> = lines[start + 1..end].iter().map(|l| l.to_string()).collect();
    for (key, value) in values {
        let line = format!("{key} = {value}{newline}");
        match body.iter().position(|l| key_name(l) == Some(key)) {
            Some(i) => body[i] = line,
            None => {
                // Insert after the last non-blank line so the blank line that
                // separates this section from the next one stays in place.
                let at = body
                    .iter()
                    .rposition(|l| !l.trim().is_empty())
                    .map(|i| i + 1)
                    .unwrap_or(0);
                if let Some(prev) = at.checked_sub(1).and_then(|i| body.get_mut(i)) {
                    if !prev.ends_with('\n') {
                        prev.push_str(newline);
                    }
                }
                body.insert(at, line);
            }
        }
    }

    let mut out = String::with_capacity(content.len());
    for line in &lines[..=start] {
        out.push_str(line);
    }
    if !out.ends_with('\n') {
        out.push_str(newline);
    }
    for line in &body {
        out.push_str(line);
    }
    for line in &lines[end..] {
        out.push_str(line);
    }
    out
}
