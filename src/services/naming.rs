//! Generation of storage file names.
use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use uuid::Uuid;

use crate::domain::SanitizedFilename;

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Source of the random part of generated names.
pub trait TokenSource: Send + Sync {
    /// Eight lower-case hexadecimal characters.
    fn token(&self) -> String;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UuidTokenSource;

impl TokenSource for UuidTokenSource {
    fn token(&self) -> String {
        let mut token = Uuid::new_v4().simple().to_string();
        token.truncate(8);
        token
    }
}

/// Millisecond timestamp with `:` and `.` replaced, e.g. `2024-01-15T10-30-00-123`.
pub fn format_timestamp(now: NaiveDateTime) -> String {
    now.format("%Y-%m-%dT%H-%M-%S-%3f").to_string()
}

/// Build a storage name from a prefix, the current time and either the original
/// name or a random token followed by the original extension.
///
/// Uniqueness is probabilistic: two uploads in the same millisecond only differ
/// by their token, and nothing checks the target for existence.
pub fn generate_filename(
    prefix: &str,
    sanitized: &SanitizedFilename,
    keep_original: bool,
    now: NaiveDateTime,
    tokens: &dyn TokenSource,
) -> SanitizedFilename {
    let timestamp = format_timestamp(now);
    let generated = if keep_original {
        format!("{prefix}{timestamp}_{sanitized}")
    } else {
        format!(
            "{prefix}{timestamp}_{}.{}",
            tokens.token(),
            sanitized.extension()
        )
    };
    SanitizedFilename::from_raw(&generated)
}

/// Name generator bound to a clock and a token source.
#[derive(Clone)]
pub struct FilenameGenerator {
    clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenSource>,
}

impl FilenameGenerator {
    pub fn new() -> Self {
        Self::with_sources(Arc::new(SystemClock), Arc::new(UuidTokenSource))
    }

    pub fn with_sources(clock: Arc<dyn Clock>, tokens: Arc<dyn TokenSource>) -> Self {
        Self { clock, tokens }
    }

    pub fn generate(
        &self,
        prefix: &str,
        sanitized: &SanitizedFilename,
        keep_original: bool,
    ) -> SanitizedFilename {
        generate_filename(
            prefix,
            sanitized,
            keep_original,
            self.clock.now(),
            self.tokens.as_ref(),
        )
    }
}

impl Default for FilenameGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FilenameGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilenameGenerator").finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::NaiveDate;

    use super::*;

    pub(crate) struct FixedClock(pub NaiveDateTime);

    impl Clock for FixedClock {
        fn now(&self) -> NaiveDateTime {
            self.0
        }
    }

    pub(crate) struct FixedToken(pub &'static str);

    impl TokenSource for FixedToken {
        fn token(&self) -> String {
            self.0.to_string()
        }
    }

    pub(crate) fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_milli_opt(10, 30, 0, 123)
            .unwrap()
    }

    #[test]
    fn timestamp_has_millisecond_precision() {
        assert_eq!(format_timestamp(fixed_time()), "2024-01-15T10-30-00-123");
    }

    #[test]
    fn keep_original_appends_sanitized_name() {
        let name = SanitizedFilename::from_raw("My Notes.md");
        let generated = generate_filename(
            "Markdown_",
            &name,
            true,
            fixed_time(),
            &FixedToken("deadbeef"),
        );
        assert_eq!(
            generated.as_str(),
            "Markdown_2024-01-15T10-30-00-123_My_Notes.md"
        );
    }

    #[test]
    fn random_mode_keeps_only_extension() {
        let name = SanitizedFilename::from_raw("My Resume (final).pdf");
        let generated = generate_filename(
            "LectureAttachment_",
            &name,
            false,
            fixed_time(),
            &FixedToken("0a1b2c3d"),
        );
        assert_eq!(
            generated.as_str(),
            "LectureAttachment_2024-01-15T10-30-00-123_0a1b2c3d.pdf"
        );
    }

    #[test]
    fn uuid_tokens_are_short_hex() {
        let token = UuidTokenSource.token();
        assert_eq!(token.len(), 8);
        assert!(token.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
        assert_ne!(UuidTokenSource.token(), UuidTokenSource.token());
    }

    #[test]
    fn generator_uses_its_sources() {
        let generator = FilenameGenerator::with_sources(
            Arc::new(FixedClock(fixed_time())),
            Arc::new(FixedToken("cafebabe")),
        );
        let generated = generator.generate("Temp_", &SanitizedFilename::from_raw("a.zip"), false);
        assert_eq!(generated.as_str(), "Temp_2024-01-15T10-30-00-123_cafebabe.zip");
    }
}
