//! Closed catalog of file categories and the storage layout each one uses.
use std::fmt;
use std::str::FromStr;

use super::TypeConstraintError;

/// Extensions accepted by the markdown editor. Lower-case, without leading dots.
pub const MARKDOWN_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "svg", "pdf"];

/// Video container formats.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "webm", "ogg", "mov", "avi", "mkv", "flv", "wmv", "m4v",
];

/// Documents, archives, images and videos accepted for regular uploads.
pub const GENERIC_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "pdf", "zip", "tar", "txt", "rtf", "md", "htm", "html",
    "json", "doc", "docx", "csv", "xls", "xlsx", "ppt", "pptx", "pages", "pages-tef", "numbers",
    "key", "odt", "ods", "odp", "odg", "odc", "odi", "odf", "mp4", "webm", "ogg", "mov", "avi",
    "mkv", "flv", "wmv", "m4v",
];

/// Segment name used in an encoded path when an entity has no id yet.
pub const PLACEHOLDER_ID: &str = "placeholder";

/// Which extension allow-list applies to a category.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExtensionPolicy {
    Generic,
    Markdown,
    Video,
}

impl ExtensionPolicy {
    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            ExtensionPolicy::Generic => GENERIC_EXTENSIONS,
            ExtensionPolicy::Markdown => MARKDOWN_EXTENSIONS,
            ExtensionPolicy::Video => VIDEO_EXTENSIONS,
        }
    }

    /// Case-insensitive membership test.
    pub fn allows(self, extension: &str) -> bool {
        self.allowed_extensions()
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }
}

/// One element of a category layout. The file name always follows the last element.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PathSegment {
    /// Fixed directory name.
    Literal(&'static str),
    /// Entity id slot, named for error messages.
    Id(&'static str),
}

/// Kind of file being stored. Not extensible by clients.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum FileCategory {
    TemporaryUpload,
    MarkdownAsset,
    ConversationAsset,
    DragAndDropBackground,
    DragItem,
    CourseIcon,
    ProfilePicture,
    ExamUserSignature,
    ExamUserImage,
    LectureAttachment,
    AttachmentUnit,
    Slide,
    StudentVersionSlides,
    AttachmentVideoUnit,
    FileUploadSubmission,
}

impl FileCategory {
    pub const ALL: [FileCategory; 15] = [
        FileCategory::TemporaryUpload,
        FileCategory::MarkdownAsset,
        FileCategory::ConversationAsset,
        FileCategory::DragAndDropBackground,
        FileCategory::DragItem,
        FileCategory::CourseIcon,
        FileCategory::ProfilePicture,
        FileCategory::ExamUserSignature,
        FileCategory::ExamUserImage,
        FileCategory::LectureAttachment,
        FileCategory::AttachmentUnit,
        FileCategory::Slide,
        FileCategory::StudentVersionSlides,
        FileCategory::AttachmentVideoUnit,
        FileCategory::FileUploadSubmission,
    ];

    /// Directory layout below the upload root, shared by encoding and decoding.
    ///
    /// The same layout is used for the external URI and the storage path, so a
    /// new category only has to be described here.
    pub fn layout(self) -> &'static [PathSegment] {
        use PathSegment::{Id, Literal};

        match self {
            FileCategory::TemporaryUpload => &[Literal("temp")],
            FileCategory::MarkdownAsset => &[Literal("markdown")],
            FileCategory::ConversationAsset => &[
                Literal("courses"),
                Id("courseId"),
                Literal("conversations"),
                Id("conversationId"),
            ],
            FileCategory::DragAndDropBackground => &[
                Literal("drag-and-drop"),
                Literal("backgrounds"),
                Id("questionId"),
            ],
            FileCategory::DragItem => &[
                Literal("drag-and-drop"),
                Literal("drag-items"),
                Id("dragItemId"),
            ],
            FileCategory::CourseIcon => &[Literal("course"), Literal("icons"), Id("courseId")],
            FileCategory::ProfilePicture => &[
                Literal("user"),
                Literal("profile-pictures"),
                Id("userId"),
            ],
            FileCategory::ExamUserSignature => &[
                Literal("exam-user"),
                Literal("signatures"),
                Id("examUserId"),
            ],
            FileCategory::ExamUserImage => &[Literal("exam-user"), Id("examUserId")],
            FileCategory::LectureAttachment => &[
                Literal("attachments"),
                Literal("lecture"),
                Id("lectureId"),
            ],
            FileCategory::AttachmentUnit => &[
                Literal("attachments"),
                Literal("attachment-unit"),
                Id("attachmentUnitId"),
            ],
            FileCategory::Slide => &[
                Literal("attachments"),
                Literal("attachment-unit"),
                Id("attachmentUnitId"),
                Literal("slide"),
                Id("slideId"),
            ],
            FileCategory::StudentVersionSlides => &[
                Literal("attachments"),
                Literal("attachment-unit"),
                Id("attachmentUnitId"),
                Literal("student"),
            ],
            FileCategory::AttachmentVideoUnit => &[
                Literal("attachments"),
                Literal("attachment-video-unit"),
                Id("attachmentVideoUnitId"),
            ],
            FileCategory::FileUploadSubmission => &[
                Literal("file-upload-exercises"),
                Id("exerciseId"),
                Literal("submissions"),
                Id("submissionId"),
            ],
        }
    }

    /// Prefix placed in front of generated file names.
    pub fn filename_prefix(self) -> &'static str {
        match self {
            FileCategory::TemporaryUpload => "Temp_",
            FileCategory::MarkdownAsset => "Markdown_",
            FileCategory::ConversationAsset => "",
            FileCategory::DragAndDropBackground => "DragAndDropBackground_",
            FileCategory::DragItem => "DragItem_",
            FileCategory::CourseIcon => "CourseIcon_",
            FileCategory::ProfilePicture => "ProfilePicture_",
            FileCategory::ExamUserSignature => "ExamUserSignature_",
            FileCategory::ExamUserImage => "ExamUserImage_",
            FileCategory::LectureAttachment => "LectureAttachment_",
            FileCategory::AttachmentUnit => "AttachmentUnit_",
            FileCategory::Slide => "AttachmentUnitSlide_",
            FileCategory::StudentVersionSlides => "StudentVersionSlides_",
            FileCategory::AttachmentVideoUnit => "AttachmentVideoUnit_",
            FileCategory::FileUploadSubmission => "FileUploadSubmission_",
        }
    }

    /// Whether generated names always keep the sanitized original name.
    ///
    /// Conversation assets carry no prefix, so the original name is what keeps
    /// them recognizable.
    pub fn keeps_original_name(self) -> bool {
        match self {
            FileCategory::ConversationAsset => true,
            FileCategory::TemporaryUpload
            | FileCategory::MarkdownAsset
            | FileCategory::DragAndDropBackground
            | FileCategory::DragItem
            | FileCategory::CourseIcon
            | FileCategory::ProfilePicture
            | FileCategory::ExamUserSignature
            | FileCategory::ExamUserImage
            | FileCategory::LectureAttachment
            | FileCategory::AttachmentUnit
            | FileCategory::Slide
            | FileCategory::StudentVersionSlides
            | FileCategory::AttachmentVideoUnit
            | FileCategory::FileUploadSubmission => false,
        }
    }

    pub fn extension_policy(self) -> ExtensionPolicy {
        match self {
            FileCategory::MarkdownAsset | FileCategory::ConversationAsset => {
                ExtensionPolicy::Markdown
            }
            FileCategory::AttachmentVideoUnit => ExtensionPolicy::Video,
            FileCategory::TemporaryUpload
            | FileCategory::DragAndDropBackground
            | FileCategory::DragItem
            | FileCategory::CourseIcon
            | FileCategory::ProfilePicture
            | FileCategory::ExamUserSignature
            | FileCategory::ExamUserImage
            | FileCategory::LectureAttachment
            | FileCategory::AttachmentUnit
            | FileCategory::Slide
            | FileCategory::StudentVersionSlides
            | FileCategory::FileUploadSubmission => ExtensionPolicy::Generic,
        }
    }

    /// Leading literal segments, i.e. the category's base directory.
    pub fn base_segments(self) -> impl Iterator<Item = &'static str> {
        self.layout().iter().map_while(|segment| match segment {
            PathSegment::Literal(name) => Some(*name),
            PathSegment::Id(_) => None,
        })
    }

    /// Base directory relative to the upload root, e.g. `attachments/lecture`.
    pub fn base_path(self) -> String {
        self.base_segments().collect::<Vec<_>>().join("/")
    }

    /// Number of embedded entity ids (0, 1 or 2).
    pub fn id_count(self) -> usize {
        self.layout()
            .iter()
            .filter(|segment| matches!(segment, PathSegment::Id(_)))
            .count()
    }

    /// Human-readable layout, e.g. `attachments/lecture/<lectureId>/<filename>`.
    pub fn describe_layout(self) -> String {
        let mut parts: Vec<String> = self
            .layout()
            .iter()
            .map(|segment| match segment {
                PathSegment::Literal(name) => (*name).to_string(),
                PathSegment::Id(name) => format!("<{name}>"),
            })
            .collect();
        parts.push("<filename>".to_string());
        parts.join("/")
    }

    pub fn name(self) -> &'static str {
        match self {
            FileCategory::TemporaryUpload => "temporary-upload",
            FileCategory::MarkdownAsset => "markdown-asset",
            FileCategory::ConversationAsset => "conversation-asset",
            FileCategory::DragAndDropBackground => "drag-and-drop-background",
            FileCategory::DragItem => "drag-item",
            FileCategory::CourseIcon => "course-icon",
            FileCategory::ProfilePicture => "profile-picture",
            FileCategory::ExamUserSignature => "exam-user-signature",
            FileCategory::ExamUserImage => "exam-user-image",
            FileCategory::LectureAttachment => "lecture-attachment",
            FileCategory::AttachmentUnit => "attachment-unit",
            FileCategory::Slide => "slide",
            FileCategory::StudentVersionSlides => "student-version-slides",
            FileCategory::AttachmentVideoUnit => "attachment-video-unit",
            FileCategory::FileUploadSubmission => "file-upload-submission",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FileCategory {
    type Err = TypeConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FileCategory::ALL
            .into_iter()
            .find(|category| category.name() == s)
            .ok_or_else(|| TypeConstraintError::UnknownCategory(s.to_string()))
    }
}
