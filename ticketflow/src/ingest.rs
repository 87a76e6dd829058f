//! Upload validation.
//!
//! An [`Upload`] only becomes a [`Dataset`] after it passes the CSV check, so
//! no remote call can ever be made with a rejected file.

use crate::errors::TicketflowError;
use crate::utils::content_digest;
use std::path::Path;
use std::sync::Arc;

/// The MIME type accepted for uploads.
pub const CSV_MIME: &str = "text/csv";

/// A file handed to the pipeline, not yet validated.
#[derive(Debug, Clone)]
pub struct Upload {
    file_name: String,
    mime_type: Option<String>,
    content: String,
}

impl Upload {
    /// Creates an upload from a name and its text content.
    #[must_use]
    pub fn new(file_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            content: content.into(),
        }
    }

    /// Sets the MIME type reported by the caller.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Reads an upload from disk.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read as UTF-8 text.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, TicketflowError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self::new(file_name, content))
    }

    /// The file name as given.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Whether the upload looks like a CSV file.
    ///
    /// A reported MIME type wins; without one the extension decides.
    #[must_use]
    pub fn is_csv(&self) -> bool {
        match self.mime_type.as_deref() {
            Some(mime) => mime
                .split(';')
                .next()
                .is_some_and(|essence| essence.trim().eq_ignore_ascii_case(CSV_MIME)),
            None => Path::new(&self.file_name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("csv")),
        }
    }

    /// Validates the upload and turns it into a dataset.
    ///
    /// # Errors
    ///
    /// Returns [`TicketflowError::InvalidInput`] for non-CSV or empty files.
    pub fn validate(self) -> Result<Dataset, TicketflowError> {
        if !self.is_csv() {
            return Err(TicketflowError::InvalidInput(format!(
                "Please upload a valid CSV file ('{}' is not CSV)",
                self.file_name
            )));
        }
        if self.content.trim().is_empty() {
            return Err(TicketflowError::InvalidInput(format!(
                "'{}' is empty",
                self.file_name
            )));
        }
        let digest = content_digest(&self.content);
        Ok(Dataset {
            file_name: self.file_name,
            content: Arc::from(self.content),
            digest,
        })
    }
}

/// Validated, immutable CSV text for one run.
#[derive(Debug, Clone)]
pub struct Dataset {
    file_name: String,
    content: Arc<str>,
    digest: String,
}

impl Dataset {
    /// The original file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The raw CSV text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// SHA-256 hex digest of the content.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Number of non-blank lines after the header.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count()
            .saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "ticket_id,subject\nT-1,Login\nT-2,Refund\n";

    #[test]
    fn test_csv_by_extension() {
        assert!(Upload::new("tickets.csv", SAMPLE).is_csv());
        assert!(Upload::new("TICKETS.CSV", SAMPLE).is_csv());
        assert!(!Upload::new("tickets.txt", SAMPLE).is_csv());
        assert!(!Upload::new("tickets", SAMPLE).is_csv());
    }

    #[test]
    fn test_mime_type_wins() {
        let upload = Upload::new("export.txt", SAMPLE).with_mime_type("text/csv; charset=utf-8");
        assert!(upload.is_csv());

        let upload = Upload::new("export.csv", SAMPLE).with_mime_type("text/plain");
        assert!(!upload.is_csv());
    }

    #[test]
    fn test_validate_rejects_non_csv() {
        let err = Upload::new("notes.txt", SAMPLE).validate().unwrap_err();
        assert!(matches!(err, TicketflowError::InvalidInput(_)));
    }

    #[test]
    fn test_validate_rejects_empty() {
        let err = Upload::new("tickets.csv", "  \n").validate().unwrap_err();
        assert!(matches!(err, TicketflowError::InvalidInput(_)));
    }

    #[test]
    fn test_dataset_fields() {
        let dataset = Upload::new("tickets.csv", SAMPLE).validate().unwrap();
        assert_eq!(dataset.file_name(), "tickets.csv");
        assert_eq!(dataset.content(), SAMPLE);
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.digest().len(), 64);
    }

    #[tokio::test]
    async fn test_from_path() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        write!(file, "{SAMPLE}").unwrap();

        let upload = Upload::from_path(file.path()).await.unwrap();
        assert!(upload.file_name().ends_with(".csv"));
        assert!(upload.validate().is_ok());
    }
}
