//! Course model - modules, lessons and their content payloads.

use serde::{Deserialize, Serialize};
use crate::id::{CourseId, LessonId, ModuleId};

/// A course is an ordered sequence of modules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Unique identifier
    pub id: CourseId,

    /// Course title
    pub title: String,

    /// Modules in authoring order
    pub modules: Vec<Module>,
}

impl Course {
    /// Create an empty course.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: CourseId::new(),
            title: title.into(),
            modules: Vec::new(),
        }
    }

    /// Append a module.
    pub fn with_module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    /// Lessons in flattened order: module order, then lesson order.
    pub fn lesson_order(&self) -> Vec<LessonRef<'_>> {
        self.modules
            .iter()
            .enumerate()
            .flat_map(|(module_index, module)| {
                module
                    .lessons
                    .iter()
                    .enumerate()
                    .map(move |(lesson_index, lesson)| LessonRef {
                        position: Position::new(module_index, lesson_index),
                        module_id: module.id,
                        lesson,
                    })
            })
            .collect()
    }

    /// Total number of lessons across all modules.
    pub fn total_lessons(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }

    /// Look up a lesson by position.
    pub fn lesson_at(&self, position: Position) -> Option<&Lesson> {
        self.modules
            .get(position.module_index)?
            .lessons
            .get(position.lesson_index)
    }

    /// Find a lesson and its module by lesson ID.
    pub fn find_lesson(&self, id: LessonId) -> Option<LessonRef<'_>> {
        self.lesson_order().into_iter().find(|r| r.lesson.id == id)
    }
}

/// A module groups lessons inside a course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    /// Unique identifier
    pub id: ModuleId,

    /// Module title
    pub title: String,

    /// Lessons in authoring order
    pub lessons: Vec<Lesson>,
}

impl Module {
    /// Create an empty module.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: ModuleId::new(),
            title: title.into(),
            lessons: Vec::new(),
        }
    }

    /// Append a lesson.
    pub fn with_lesson(mut self, lesson: Lesson) -> Self {
        self.lessons.push(lesson);
        self
    }
}

/// A single unit of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    /// Unique identifier
    pub id: LessonId,

    /// Lesson title
    pub title: String,

    /// Content payload
    pub content: LessonContent,

    /// Declared duration in minutes
    #[serde(default)]
    pub duration_minutes: Option<u32>,

    /// Point value
    #[serde(default)]
    pub points: u32,
}

impl Lesson {
    /// Create a lesson with the given content.
    pub fn new(title: impl Into<String>, content: LessonContent) -> Self {
        Self {
            id: LessonId::new(),
            title: title.into(),
            content,
            duration_minutes: None,
            points: 0,
        }
    }
}

/// Position of a lesson: (module index, lesson index within module).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Index of the module in the course
    pub module_index: usize,

    /// Index of the lesson in its module
    pub lesson_index: usize,
}

impl Position {
    /// Create a position.
    pub fn new(module_index: usize, lesson_index: usize) -> Self {
        Self {
            module_index,
            lesson_index,
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.module_index + 1, self.lesson_index + 1)
    }
}

/// A lesson together with its place in the flattened order.
#[derive(Debug, Clone, Copy)]
pub struct LessonRef<'a> {
    /// Module/lesson indices
    pub position: Position,

    /// Owning module
    pub module_id: ModuleId,

    /// The lesson itself
    pub lesson: &'a Lesson,
}

/// Content type of a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    /// Video lesson
    Video,
    /// Quiz lesson
    Quiz,
    /// Reading
    Text,
    /// Downloadable file
    File,
    /// Several payloads in one lesson
    Mixed,
}

impl ContentKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Video => "video",
            ContentKind::Quiz => "quiz",
            ContentKind::Text => "text",
            ContentKind::File => "file",
            ContentKind::Mixed => "mixed",
        }
    }
}

/// Type-specific lesson payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LessonContent {
    /// Video to watch
    Video(VideoContent),
    /// Quiz to submit
    Quiz(QuizContent),
    /// Text to read
    Text(TextContent),
    /// File to view
    File(FileContent),
    /// Any combination of the above
    Mixed(MixedContent),
}

impl LessonContent {
    /// The declared content type.
    pub fn kind(&self) -> ContentKind {
        match self {
            LessonContent::Video(_) => ContentKind::Video,
            LessonContent::Quiz(_) => ContentKind::Quiz,
            LessonContent::Text(_) => ContentKind::Text,
            LessonContent::File(_) => ContentKind::File,
            LessonContent::Mixed(_) => ContentKind::Mixed,
        }
    }

    /// The payload that decides completion for this lesson.
    ///
    /// Mixed lessons are gated by their first present payload, in the order
    /// video, quiz, text, file: watching is the strongest engagement signal.
    /// Returns `None` for a mixed lesson with no payload at all.
    pub fn gate(&self) -> Option<ContentGate<'_>> {
        match self {
            LessonContent::Video(v) => Some(ContentGate::Video(v)),
            LessonContent::Quiz(q) => Some(ContentGate::Quiz(q)),
            LessonContent::Text(t) => Some(ContentGate::Text(t)),
            LessonContent::File(f) => Some(ContentGate::File(f)),
            LessonContent::Mixed(m) => m
                .video
                .as_ref()
                .map(ContentGate::Video)
                .or_else(|| m.quiz.as_ref().map(ContentGate::Quiz))
                .or_else(|| m.text.as_ref().map(ContentGate::Text))
                .or_else(|| m.file.as_ref().map(ContentGate::File)),
        }
    }
}

/// Borrowed view of the payload that gates completion.
#[derive(Debug, Clone, Copy)]
pub enum ContentGate<'a> {
    /// Gated by watching
    Video(&'a VideoContent),
    /// Gated by quiz submissions
    Quiz(&'a QuizContent),
    /// Gated by reading time
    Text(&'a TextContent),
    /// Gated by viewing time
    File(&'a FileContent),
}

impl ContentGate<'_> {
    /// Whether the payload carries enough data to be completed at all.
    pub fn is_usable(&self) -> bool {
        match self {
            ContentGate::Video(v) => !v.url.trim().is_empty(),
            ContentGate::Quiz(q) => !q.questions.is_empty(),
            ContentGate::Text(t) => !t.body.trim().is_empty(),
            ContentGate::File(f) => !f.url.trim().is_empty(),
        }
    }

    /// Content type of the gating payload.
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentGate::Video(_) => ContentKind::Video,
            ContentGate::Quiz(_) => ContentKind::Quiz,
            ContentGate::Text(_) => ContentKind::Text,
            ContentGate::File(_) => ContentKind::File,
        }
    }
}

/// Video payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoContent {
    /// Stream URL
    pub url: String,

    /// Authored duration, if known before the player loads metadata
    #[serde(default)]
    pub duration_seconds: Option<f64>,
}

/// Quiz payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuizContent {
    /// Questions in display order
    pub questions: Vec<QuizQuestion>,
}

impl QuizContent {
    /// Count correct answers. `answers[i]` is the chosen option for question `i`.
    pub fn score(&self, answers: &[usize]) -> u32 {
        self.questions
            .iter()
            .zip(answers)
            .filter(|(q, a)| q.correct_option == **a)
            .count() as u32
    }

    /// Number of questions.
    pub fn total_questions(&self) -> u32 {
        self.questions.len() as u32
    }
}

/// A multiple choice question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// Question text
    pub prompt: String,

    /// Answer options
    pub options: Vec<String>,

    /// Index into `options` of the correct answer
    pub correct_option: usize,
}

/// Reading payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextContent {
    /// Body text (markdown)
    pub body: String,
}

/// Downloadable/viewable file payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileContent {
    /// File URL
    pub url: String,

    /// Display name
    #[serde(default)]
    pub file_name: String,
}

/// A lesson carrying more than one payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MixedContent {
    /// Video part
    #[serde(default)]
    pub video: Option<VideoContent>,

    /// Quiz part
    #[serde(default)]
    pub quiz: Option<QuizContent>,

    /// Text part
    #[serde(default)]
    pub text: Option<TextContent>,

    /// File part
    #[serde(default)]
    pub file: Option<FileContent>,
}
