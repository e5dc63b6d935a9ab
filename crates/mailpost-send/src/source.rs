//! Attaching files from disk.

use crate::error::Result;
use mailpost_mime::Message;
use std::path::Path;
use tracing::debug;

/// Reads a file and attaches it under its file name.
///
/// An empty file removes any attachment with the same name.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if the file cannot be read and
/// [`Error::Mime`](crate::Error::Mime) if the path has no usable file name.
pub fn attach_file(message: &mut Message, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let data = std::fs::read(path)?;
    debug!(path = %path.display(), size = data.len(), "read attachment");

    let name = path.to_string_lossy();
    message.attach(&name, data)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Error;

    fn message() -> Message {
        Message::new("", "", &["a@b.com"], &[] as &[&str]).unwrap()
    }

    #[test]
    fn test_attach_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        std::fs::write(&path, "region,total\nnorth,42\n").unwrap();

        let mut message = message();
        attach_file(&mut message, &path).unwrap();
        assert!(message.has("report.csv"));
        assert_eq!(message.attachment_names().collect::<Vec<_>>(), vec!["report.csv"]);
    }

    #[test]
    fn test_attach_empty_file_removes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "notes").unwrap();

        let mut message = message();
        attach_file(&mut message, &path).unwrap();
        std::fs::write(&path, "").unwrap();
        attach_file(&mut message, &path).unwrap();
        assert!(!message.has("notes.txt"));
    }

    #[test]
    fn test_attach_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut message = message();

        let err = attach_file(&mut message, dir.path().join("missing.txt")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
