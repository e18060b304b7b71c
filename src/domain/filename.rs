//! Sanitized file names.
use std::fmt;

use super::TypeConstraintError;

/// File name restricted to `[A-Za-z0-9._-]` without consecutive dots.
///
/// Only constructed through [`SanitizedFilename::sanitize`] or checked with
/// [`SanitizedFilename::parse`], so an unsanitized name never reaches storage.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct SanitizedFilename(String);

impl SanitizedFilename {
    /// Sanitize a client-supplied name.
    ///
    /// A missing name, or one that reduces to nothing but `""` or `.`, is an error.
    pub fn sanitize(raw: Option<&str>) -> Result<Self, TypeConstraintError> {
        let raw = raw.ok_or(TypeConstraintError::MissingFilename)?;
        let sanitized = Self::from_raw(raw);
        if sanitized.is_blank() {
            return Err(TypeConstraintError::EmptyFilename(raw.to_string()));
        }
        Ok(sanitized)
    }

    /// Replace every character outside `[A-Za-z0-9.-]` with `_` and collapse dot runs.
    pub fn from_raw(raw: &str) -> Self {
        let mut sanitized = String::with_capacity(raw.len());
        for c in raw.chars() {
            let c = if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            };
            if c == '.' && sanitized.ends_with('.') {
                continue;
            }
            sanitized.push(c);
        }
        Self(sanitized)
    }

    /// Accept a name that is already in sanitized form, e.g. the last segment of a URI.
    pub fn parse(value: &str) -> Result<Self, TypeConstraintError> {
        let sanitized = Self::from_raw(value);
        if sanitized.is_blank() || sanitized.0 != value {
            return Err(TypeConstraintError::UnsanitizedFilename(value.to_string()));
        }
        Ok(sanitized)
    }

    /// `""` and `.` cannot name a file below a directory.
    pub fn is_blank(&self) -> bool {
        matches!(self.0.as_str(), "" | ".")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Substring after the last dot, empty when there is none.
    pub fn extension(&self) -> &str {
        extension_of(&self.0)
    }
}

impl fmt::Display for SanitizedFilename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl AsRef<str> for SanitizedFilename {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn extension_of(filename: &str) -> &str {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sanitize(raw: &str) -> String {
        SanitizedFilename::from_raw(raw).into_string()
    }

    fn is_clean(value: &str) -> bool {
        !value.contains("..")
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    }

    #[test]
    fn replaces_disallowed_characters() {
        assert_eq!(sanitize("My Resume (final).pdf"), "My_Resume__final_.pdf");
        assert_eq!(sanitize("a/b\\c.txt"), "a_b_c.txt");
        assert_eq!(sanitize("übung.pdf"), "_bung.pdf");
    }

    #[test]
    fn collapses_dot_runs() {
        assert_eq!(sanitize("../../etc/passwd"), "._._etc_passwd");
        assert_eq!(sanitize("archive...tar..gz"), "archive.tar.gz");
        assert_eq!(sanitize(".hidden"), ".hidden");
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "",
            "..",
            "plain.pdf",
            "with space.png",
            "...",
            "a..b...c",
            "ünï©ødé 🎉.md",
            "x.\u{0}.y",
            "-_-.--",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input {input:?}");
            assert!(is_clean(&once), "input {input:?} produced {once:?}");
        }
    }

    #[test]
    fn missing_name_is_rejected() {
        assert!(matches!(
            SanitizedFilename::sanitize(None),
            Err(TypeConstraintError::MissingFilename)
        ));
        assert_eq!(
            SanitizedFilename::sanitize(Some("a b")).unwrap().as_str(),
            "a_b"
        );
    }

    #[test]
    fn names_without_usable_characters_are_rejected() {
        for raw in ["", ".", "..", "..."] {
            assert!(
                matches!(
                    SanitizedFilename::sanitize(Some(raw)),
                    Err(TypeConstraintError::EmptyFilename(_))
                ),
                "{raw:?} should be rejected"
            );
        }
        assert_eq!(SanitizedFilename::sanitize(Some("..a")).unwrap().as_str(), ".a");
    }

    #[test]
    fn parse_only_accepts_sanitized_names() {
        assert!(SanitizedFilename::parse("slides.pdf").is_ok());
        assert!(SanitizedFilename::parse("my slides.pdf").is_err());
        assert!(SanitizedFilename::parse("a..pdf").is_err());
        assert!(SanitizedFilename::parse("").is_err());
        assert!(SanitizedFilename::parse(".").is_err());
    }

    #[test]
    fn extension_is_text_after_last_dot() {
        assert_eq!(extension_of("report.final.PDF"), "PDF");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of("dir.d/README"), "");
        assert_eq!(SanitizedFilename::from_raw("clip.mp4").extension(), "mp4");
    }
}
