//! Validation gate for the submission form.
//!
//! Nothing reaches the network unless [`validate_submission`] returns a
//! [`Submission`]; that type has no public constructor, so the pipeline can
//! only ever run on input that passed every rule.
//!
//! All rules run independently and every violation is reported at once,
//! one message per field.

use crate::services::{UploadFile, PDF_MIME};
use std::collections::BTreeMap;
use std::fmt;

/// A form field that can carry a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    CompanyName,
    JobTitle,
    JobDescription,
    File,
}

impl Field {
    /// Form control name of the field.
    pub fn name(self) -> &'static str {
        match self {
            Field::CompanyName => "company-name",
            Field::JobTitle => "job-title",
            Field::JobDescription => "job-description",
            Field::File => "file",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw text fields as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionFields {
    pub company_name: String,
    pub job_title: String,
    pub job_description: String,
}

impl SubmissionFields {
    pub fn new(
        company_name: impl Into<String>,
        job_title: impl Into<String>,
        job_description: impl Into<String>,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            job_title: job_title.into(),
            job_description: job_description.into(),
        }
    }
}

/// Field-scoped validation messages. Empty means "proceed".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<Field, String>);

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(f, m)| (*f, m.as_str()))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// The user edited a text field: drop its error once the value is usable.
    pub fn field_changed(&mut self, field: Field, value: &str) {
        if field != Field::File && !value.trim().is_empty() {
            self.0.remove(&field);
        }
    }

    /// The user picked (or removed) a file. Only a new file clears the file error.
    pub fn file_selected(&mut self, file: Option<&UploadFile>) {
        if file.is_some() {
            self.0.remove(&Field::File);
        }
    }

    fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// A submission that passed the gate: trimmed fields plus a PDF within limits.
#[derive(Debug, Clone)]
pub struct Submission {
    company_name: String,
    job_title: String,
    job_description: String,
    file: UploadFile,
}

impl Submission {
    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn job_title(&self) -> &str {
        &self.job_title
    }

    pub fn job_description(&self) -> &str {
        &self.job_description
    }

    pub fn file(&self) -> &UploadFile {
        &self.file
    }
}

/// Check the form without side effects.
pub fn validate(
    fields: &SubmissionFields,
    file: Option<&UploadFile>,
    max_file_size: u64,
) -> FormErrors {
    let mut errors = FormErrors::default();

    if fields.company_name.trim().is_empty() {
        errors.insert(Field::CompanyName, "Company name is required.");
    }
    if fields.job_title.trim().is_empty() {
        errors.insert(Field::JobTitle, "Job title is required.");
    }
    if fields.job_description.trim().is_empty() {
        errors.insert(Field::JobDescription, "Job description is required.");
    }

    match file {
        None => errors.insert(Field::File, "A resume file is required."),
        Some(f) if f.mime_type != PDF_MIME => {
            errors.insert(Field::File, "Only PDF files are allowed.")
        }
        Some(f) if f.size() > max_file_size => errors.insert(
            Field::File,
            format!("File is too large (max {}).", size_limit(max_file_size)),
        ),
        Some(_) => {}
    }

    errors
}

/// Human form of a byte limit, rounded up to the largest whole unit.
fn size_limit(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    if bytes >= MIB {
        format!("{}MB", bytes.div_ceil(MIB))
    } else if bytes >= KIB {
        format!("{}KB", bytes.div_ceil(KIB))
    } else {
        format!("{bytes} bytes")
    }
}

/// Run the gate and, on success, hand back the trimmed submission.
pub fn validate_submission(
    fields: &SubmissionFields,
    file: Option<UploadFile>,
    max_file_size: u64,
) -> Result<Submission, FormErrors> {
    let errors = validate(fields, file.as_ref(), max_file_size);
    match file {
        Some(file) if errors.is_empty() => Ok(Submission {
            company_name: fields.company_name.trim().to_string(),
            job_title: fields.job_title.trim().to_string(),
            job_description: fields.job_description.trim().to_string(),
            file,
        }),
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MAX_FILE_SIZE;

    fn pdf(size: usize) -> UploadFile {
        UploadFile::new("cv.pdf", PDF_MIME, vec![0u8; size])
    }

    fn fields() -> SubmissionFields {
        SubmissionFields::new("Acme", "Engineer", "Build things")
    }

    #[test]
    fn valid_submission_is_trimmed() {
        let raw = SubmissionFields::new("  Acme ", "Engineer\n", " Build things ");
        let s = validate_submission(&raw, Some(pdf(2 * 1024 * 1024)), DEFAULT_MAX_FILE_SIZE)
            .unwrap();
        assert_eq!(s.company_name(), "Acme");
        assert_eq!(s.job_title(), "Engineer");
        assert_eq!(s.job_description(), "Build things");
    }

    #[test]
    fn reports_every_violation_together() {
        let raw = SubmissionFields::new("   ", "", "\t");
        let errors = validate(&raw, None, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(errors.len(), 4);
        assert_eq!(errors.get(Field::CompanyName), Some("Company name is required."));
        assert_eq!(errors.get(Field::JobTitle), Some("Job title is required."));
        assert_eq!(
            errors.get(Field::JobDescription),
            Some("Job description is required.")
        );
        assert_eq!(errors.get(Field::File), Some("A resume file is required."));
    }

    #[test]
    fn rejects_wrong_mime_type() {
        let doc = UploadFile::new("cv.docx", "application/msword", vec![1, 2, 3]);
        let errors = validate(&fields(), Some(&doc), DEFAULT_MAX_FILE_SIZE);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get(Field::File), Some("Only PDF files are allowed."));
    }

    #[test]
    fn size_limit_is_inclusive() {
        let max = DEFAULT_MAX_FILE_SIZE as usize;
        assert!(validate(&fields(), Some(&pdf(max)), DEFAULT_MAX_FILE_SIZE).is_empty());

        let errors = validate(&fields(), Some(&pdf(max + 1)), DEFAULT_MAX_FILE_SIZE);
        assert_eq!(errors.get(Field::File), Some("File is too large (max 5MB)."));
    }

    #[test]
    fn small_limits_are_not_reported_as_zero() {
        let errors = validate(&fields(), Some(&pdf(600 * 1024)), 500 * 1024);
        assert_eq!(errors.get(Field::File), Some("File is too large (max 500KB)."));

        let errors = validate(&fields(), Some(&pdf(2048)), 1500);
        assert_eq!(errors.get(Field::File), Some("File is too large (max 2KB)."));

        let errors = validate(&fields(), Some(&pdf(10)), 9);
        assert_eq!(errors.get(Field::File), Some("File is too large (max 9 bytes)."));

        assert_eq!(size_limit(3 * 1024 * 1024 + 1), "4MB");
    }

    #[test]
    fn corrected_values_clear_only_their_error() {
        let mut errors = validate(&SubmissionFields::default(), None, DEFAULT_MAX_FILE_SIZE);

        errors.field_changed(Field::JobTitle, "  ");
        assert!(errors.get(Field::JobTitle).is_some());

        errors.field_changed(Field::JobTitle, "Engineer");
        assert!(errors.get(Field::JobTitle).is_none());
        assert!(errors.get(Field::CompanyName).is_some());

        errors.file_selected(None);
        assert!(errors.get(Field::File).is_some());

        errors.file_selected(Some(&pdf(10)));
        assert!(errors.get(Field::File).is_none());
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn rejected_submission_returns_errors() {
        let err = validate_submission(&fields(), None, DEFAULT_MAX_FILE_SIZE).unwrap_err();
        assert_eq!(err.to_string(), "file: A resume file is required.");
    }
}
