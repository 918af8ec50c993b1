//! Progression coordinator: navigation and completion recording for one
//! student working through one course.
//!
//! The coordinator owns the session's [`ProgressionState`]. Completed and
//! accessible sets only change after the progress store confirms a write;
//! store failures are logged and reported as `false`, never as errors to the
//! navigation caller.

use std::sync::Arc;

use lessonflow_core::{
    Course, CourseId, CourseProgress, Lesson, LessonCompletion, LessonId, Position,
    ProgressionConfig, StudentId,
};
use lessonflow_storage::{CourseCatalog, ProgressStore, StorageError};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::evaluator::CompletionVerdict;
use crate::playback::SeekOutcome;
use crate::quiz::QuizVerdict;
use crate::resolver::{LessonGraph, LessonNode, ProgressionState};
use crate::tracker::{completion_percentage, ProgressSnapshot};
use crate::visit::LessonVisit;

/// Errors raised while opening a session.
#[derive(Debug, thiserror::Error)]
pub enum ProgressionError {
    /// The catalog has no such course
    #[error("Course not found: {0}")]
    CourseNotFound(CourseId),

    /// Catalog or progress store failure
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result of feeding an engagement event to the open lesson.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VisitOutcome {
    /// Verdict after the event
    pub verdict: CompletionVerdict,

    /// The lesson is recorded as completed
    pub lesson_completed: bool,
}

/// Result of a quiz submission.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuizSubmission {
    /// Attempt tracker verdict
    pub quiz: QuizVerdict,

    /// The lesson is recorded as completed
    pub lesson_completed: bool,
}

/// Drives one student's session in one course.
pub struct ProgressionCoordinator {
    student: StudentId,
    course: Course,
    graph: LessonGraph,
    state: ProgressionState,
    store: Arc<dyn ProgressStore>,
    config: ProgressionConfig,
    course_progress: CourseProgress,
    visit: Option<LessonVisit>,
    auto_advance_until: Option<Instant>,
}

impl ProgressionCoordinator {
    /// Open a session: load the course from the catalog and hydrate progress.
    pub async fn open(
        student: StudentId,
        course_id: CourseId,
        catalog: &dyn CourseCatalog,
        store: Arc<dyn ProgressStore>,
        config: ProgressionConfig,
    ) -> Result<Self, ProgressionError> {
        let course = catalog
            .get_course(course_id)
            .await?
            .ok_or(ProgressionError::CourseNotFound(course_id))?;
        Self::with_course(student, course, store, config).await
    }

    /// Open a session for an already loaded course.
    pub async fn with_course(
        student: StudentId,
        course: Course,
        store: Arc<dyn ProgressStore>,
        config: ProgressionConfig,
    ) -> Result<Self, ProgressionError> {
        let course_progress = store.get_course_progress(&student, course.id).await?;
        let graph = LessonGraph::from_course(&course);
        let state = graph.resolve(course_progress.completed_lesson_ids());

        info!(
            "Opened course '{}' for {}: {}/{} lessons completed",
            course.title,
            student,
            state.completed_lesson_ids().len(),
            graph.len()
        );

        let mut coordinator = Self {
            student,
            course,
            graph,
            state,
            store,
            config,
            course_progress,
            visit: None,
            auto_advance_until: None,
        };
        coordinator.open_visit();
        Ok(coordinator)
    }

    // === Navigation ===

    /// Move to a lesson by position. Only accessible lessons can be entered.
    pub fn navigate_to_lesson(&mut self, module_index: usize, lesson_index: usize) -> bool {
        let Some(index) = self.graph.index_at(Position::new(module_index, lesson_index)) else {
            debug!("No lesson at {}.{}", module_index + 1, lesson_index + 1);
            return false;
        };
        let Some(node) = self.graph.node(index) else {
            return false;
        };
        if !self.state.is_accessible(node.id) {
            debug!("Lesson '{}' is locked", node.title);
            return false;
        }
        self.move_to(index);
        true
    }

    /// Move to the next lesson in flattened order.
    ///
    /// Meant to be called right after the current lesson completed, which is
    /// what unlocks the successor, so accessibility is not checked again.
    pub fn navigate_to_next(&mut self) -> bool {
        let Some(next) = self.state.current_index().and_then(|i| self.graph.successor(i)) else {
            return false;
        };
        self.auto_advance_until = Some(Instant::now() + self.config.auto_advance_delay());
        self.move_to(next);
        true
    }

    /// Move to the previous lesson. Reviewing is never gated.
    pub fn navigate_to_previous(&mut self) -> bool {
        let Some(prev) = self.state.current_index().and_then(|i| self.graph.predecessor(i)) else {
            return false;
        };
        self.move_to(prev);
        true
    }

    fn move_to(&mut self, index: usize) {
        self.state.set_current_index(index);
        self.open_visit();
        if let Some(node) = self.graph.node(index) {
            debug!("Now at lesson {} '{}'", node.position, node.title);
        }
    }

    fn open_visit(&mut self) {
        self.visit = self
            .current_lesson()
            .map(|lesson| LessonVisit::open(lesson, &self.config));
    }

    // === Completion ===

    /// Record completion of the current lesson.
    ///
    /// Returns `false` without touching state if `lesson_id` is not the
    /// current lesson (a stale callback) or if the store rejects the write.
    pub async fn mark_lesson_completed(&mut self, lesson_id: LessonId, time_spent_seconds: u64) -> bool {
        let Some(node) = self.current_node().cloned() else {
            return false;
        };
        if node.id != lesson_id {
            debug!("Ignoring completion for {}: current lesson is {}", lesson_id, node.id);
            return false;
        }
        if self.state.is_completed(lesson_id) {
            return true;
        }

        let completion = LessonCompletion {
            course_id: self.course.id,
            module_id: node.module_id,
            lesson_id,
            lesson_title: node.title.clone(),
            time_spent_seconds,
        };
        if let Err(e) = self.store.record_lesson_completion(&self.student, completion).await {
            warn!("Failed to record completion of '{}': {}", node.title, e);
            return false;
        }

        self.state = self.graph.recompute(&self.state, lesson_id);
        info!(
            "Completed lesson '{}' ({}%)",
            node.title,
            self.course_completion_percentage()
        );

        self.record_aggregate_completions(&node).await;
        self.refresh_course_progress().await;
        true
    }

    async fn record_aggregate_completions(&self, node: &LessonNode) {
        let module_done = self
            .graph
            .module_lessons(node.module_id)
            .all(|n| self.state.is_completed(n.id));
        if module_done {
            if let Err(e) = self
                .store
                .record_module_completion(&self.student, self.course.id, node.module_id)
                .await
            {
                warn!("Failed to record module completion: {}", e);
            }
        }

        if !self.graph.is_empty() && self.state.completed_lesson_ids().len() == self.graph.len() {
            match self.store.record_course_completion(&self.student, self.course.id).await {
                Ok(_) => info!("Course '{}' completed by {}", self.course.title, self.student),
                Err(e) => warn!("Failed to record course completion: {}", e),
            }
        }
    }

    async fn refresh_course_progress(&mut self) -> bool {
        match self.store.get_course_progress(&self.student, self.course.id).await {
            Ok(progress) => {
                self.course_progress = progress;
                true
            }
            Err(e) => {
                warn!("Failed to refresh course progress: {}", e);
                false
            }
        }
    }

    /// Re-read progress from the store, e.g. after another device completed
    /// lessons. Completion is monotone, so remote completions are merged into
    /// the local set. Returns `false` and keeps the current state on failure.
    pub async fn refresh(&mut self) -> bool {
        if !self.refresh_course_progress().await {
            return false;
        }
        let current = self.state.current_index();
        let merged = self
            .state
            .completed_lesson_ids()
            .iter()
            .copied()
            .chain(self.course_progress.completed_lesson_ids())
            .collect::<Vec<_>>();
        self.state = self.graph.resolve(merged);
        if let Some(index) = current {
            self.state.set_current_index(index);
        }
        true
    }

    // === Visit events ===

    fn visit_for(&mut self, lesson_id: LessonId) -> Option<&mut LessonVisit> {
        match self.visit.as_mut() {
            Some(visit) if visit.lesson_id() == lesson_id => Some(visit),
            _ => {
                debug!("Ignoring event for lesson {} that is not open", lesson_id);
                None
            }
        }
    }

    /// Complete the open lesson if its visit says so.
    async fn settle_visit(&mut self, lesson_id: LessonId) -> Option<VisitOutcome> {
        let visit = self.visit.as_ref()?;
        let verdict = visit.verdict(&self.config);
        let time_spent = visit.time_spent_seconds();

        let lesson_completed = if verdict.completed {
            self.mark_lesson_completed(lesson_id, time_spent).await
        } else {
            self.state.is_completed(lesson_id)
        };
        Some(VisitOutcome {
            verdict,
            lesson_completed,
        })
    }

    /// Playback-time update from the video player.
    pub async fn on_playback_update(&mut self, lesson_id: LessonId, current: f64, total: f64) -> Option<VisitOutcome> {
        self.visit_for(lesson_id)?.on_time_update(current, total);
        self.settle_visit(lesson_id).await
    }

    /// The video player reached the end.
    pub async fn on_playback_ended(&mut self, lesson_id: LessonId) -> Option<VisitOutcome> {
        self.visit_for(lesson_id)?.on_ended();
        self.settle_visit(lesson_id).await
    }

    /// Seek request from the video player.
    pub fn request_seek(&mut self, lesson_id: LessonId, new_time: f64) -> Option<SeekOutcome> {
        let outcome = self.visit_for(lesson_id)?.seek(new_time)?;
        if !outcome.is_allowed() {
            debug!("Rejected seek to {:.1}s: cannot skip ahead", new_time);
        }
        Some(outcome)
    }

    /// Submit a quiz: `score` correct answers out of `total_questions`, which
    /// must equal the quiz's own question count.
    pub async fn submit_quiz(&mut self, lesson_id: LessonId, score: u32, total_questions: u32) -> Option<QuizSubmission> {
        let quiz = self.visit_for(lesson_id)?.submit_quiz(score, total_questions)?;
        self.settle_quiz(lesson_id, quiz).await
    }

    /// Submit chosen options, one per question, to be scored against the quiz.
    pub async fn submit_quiz_answers(&mut self, lesson_id: LessonId, answers: &[usize]) -> Option<QuizSubmission> {
        let quiz = self.visit_for(lesson_id)?.submit_answers(answers)?;
        self.settle_quiz(lesson_id, quiz).await
    }

    async fn settle_quiz(&mut self, lesson_id: LessonId, quiz: QuizVerdict) -> Option<QuizSubmission> {
        let outcome = self.settle_visit(lesson_id).await?;
        Some(QuizSubmission {
            quiz,
            lesson_completed: outcome.lesson_completed,
        })
    }

    /// Clear the last quiz result for a retry.
    pub fn reset_quiz(&mut self, lesson_id: LessonId) -> bool {
        self.visit_for(lesson_id).is_some_and(|visit| visit.reset_quiz())
    }

    /// Seconds a text or file lesson stayed in view.
    pub async fn record_engagement(&mut self, lesson_id: LessonId, seconds: f64) -> Option<VisitOutcome> {
        self.visit_for(lesson_id)?.add_engagement(seconds);
        self.settle_visit(lesson_id).await
    }

    // === Queries ===

    fn current_node(&self) -> Option<&LessonNode> {
        self.state.current_index().and_then(|i| self.graph.node(i))
    }

    /// The lesson at the current position.
    pub fn current_lesson(&self) -> Option<&Lesson> {
        self.current_node()
            .and_then(|node| self.course.lesson_at(node.position))
    }

    /// Current (module, lesson) position.
    pub fn current_position(&self) -> Option<Position> {
        self.current_node().map(|node| node.position)
    }

    /// Whether a lesson may be entered.
    pub fn is_lesson_accessible(&self, lesson_id: LessonId) -> bool {
        self.state.is_accessible(lesson_id)
    }

    /// Whether a lesson is completed.
    pub fn is_lesson_completed(&self, lesson_id: LessonId) -> bool {
        self.state.is_completed(lesson_id)
    }

    /// Whether a lesson follows the current one.
    pub fn has_next_lesson(&self) -> bool {
        self.state
            .current_index()
            .and_then(|i| self.graph.successor(i))
            .is_some()
    }

    /// Whether a lesson precedes the current one.
    pub fn has_previous_lesson(&self) -> bool {
        self.state
            .current_index()
            .and_then(|i| self.graph.predecessor(i))
            .is_some()
    }

    /// Completed lessons out of all lessons, rounded percent.
    pub fn course_completion_percentage(&self) -> u8 {
        completion_percentage(self.state.completed_lesson_ids().len(), self.graph.len())
    }

    /// Whether an automatic move to the next lesson just happened.
    pub fn is_auto_advancing(&self) -> bool {
        self.auto_advance_until
            .is_some_and(|until| Instant::now() < until)
    }

    /// Session state.
    pub fn state(&self) -> &ProgressionState {
        &self.state
    }

    /// The course being taken.
    pub fn course(&self) -> &Course {
        &self.course
    }

    /// Student owning the session.
    pub fn student(&self) -> &StudentId {
        &self.student
    }

    /// Progress as last read from the store.
    pub fn course_progress(&self) -> &CourseProgress {
        &self.course_progress
    }

    /// Verdict of the open lesson visit.
    pub fn current_verdict(&self) -> Option<CompletionVerdict> {
        self.visit.as_ref().map(|v| v.verdict(&self.config))
    }

    /// Per-module summary of the session.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::capture(&self.course, self.state.completed_lesson_ids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lessonflow_core::{
        LessonContent, Module, ProgressEntryType, QuizContent, QuizQuestion, TextContent,
        VideoContent,
    };
    use lessonflow_storage::MemoryStorage;
    use std::time::Duration;

    fn question(n: usize) -> QuizQuestion {
        QuizQuestion {
            prompt: format!("Question {}", n),
            options: vec!["yes".to_string(), "no".to_string()],
            correct_option: 0,
        }
    }

    /// Module A: 1 video, 2 quiz. Module B: 3 text.
    fn scenario_course() -> Course {
        Course::new("Ownership")
            .with_module(
                Module::new("A")
                    .with_lesson(Lesson::new(
                        "Intro video",
                        LessonContent::Video(VideoContent {
                            url: "https://cdn.example.com/intro.mp4".to_string(),
                            duration_seconds: None,
                        }),
                    ))
                    .with_lesson(Lesson::new(
                        "Check yourself",
                        LessonContent::Quiz(QuizContent {
                            questions: (0..10).map(question).collect(),
                        }),
                    )),
            )
            .with_module(Module::new("B").with_lesson(Lesson::new(
                "Reading",
                LessonContent::Text(TextContent {
                    body: "Borrowing rules".to_string(),
                }),
            )))
    }

    fn lesson_ids(course: &Course) -> Vec<LessonId> {
        course.lesson_order().iter().map(|r| r.lesson.id).collect()
    }

    async fn open(store: Arc<MemoryStorage>, course: Course) -> ProgressionCoordinator {
        ProgressionCoordinator::with_course(
            StudentId::new("student-1"),
            course,
            store,
            ProgressionConfig::default(),
        )
        .await
        .unwrap()
    }

    async fn watch(coordinator: &mut ProgressionCoordinator, lesson: LessonId, until: u32) -> Option<VisitOutcome> {
        let mut last = None;
        for t in 0..=until {
            last = coordinator.on_playback_update(lesson, f64::from(t), 100.0).await;
        }
        last
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store.clone(), course).await;

        assert!(coordinator.is_lesson_accessible(ids[0]));
        assert!(!coordinator.is_lesson_accessible(ids[1]));
        assert!(!coordinator.is_lesson_accessible(ids[2]));

        let outcome = watch(&mut coordinator, ids[0], 96).await.unwrap();
        assert!(outcome.lesson_completed);
        assert!(coordinator.is_lesson_completed(ids[0]));
        assert!(coordinator.is_lesson_accessible(ids[1]));
        assert!(!coordinator.is_lesson_accessible(ids[2]));

        assert!(coordinator.navigate_to_next());
        assert_eq!(coordinator.current_position(), Some(Position::new(0, 1)));

        let submission = coordinator.submit_quiz(ids[1], 8, 10).await.unwrap();
        assert!(submission.quiz.passed);
        assert!(submission.lesson_completed);
        assert!(coordinator.is_lesson_accessible(ids[2]));
        assert_eq!(coordinator.course_completion_percentage(), 67);

        // Module A is done, so the store holds a module completion too.
        assert_eq!(coordinator.course_progress().module_completions.len(), 1);
        assert!(coordinator.course_progress().course_completion.is_none());
    }

    #[tokio::test]
    async fn test_finishing_course_records_course_completion() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store.clone(), course).await;

        watch(&mut coordinator, ids[0], 100).await;
        coordinator.navigate_to_next();
        coordinator.submit_quiz(ids[1], 10, 10).await;
        coordinator.navigate_to_next();
        let outcome = coordinator.record_engagement(ids[2], 30.0).await.unwrap();

        assert!(outcome.lesson_completed);
        assert_eq!(coordinator.course_completion_percentage(), 100);
        assert!(coordinator.snapshot().is_complete());
        assert!(coordinator.course_progress().course_completion.is_some());
        assert_eq!(coordinator.course_progress().module_completions.len(), 2);
    }

    #[tokio::test]
    async fn test_aggregate_write_failure_keeps_lesson_completion() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store.clone(), course).await;

        store
            .set_fail_writes_for(ProgressEntryType::ModuleCompleted, true)
            .await;
        store
            .set_fail_writes_for(ProgressEntryType::CourseCompleted, true)
            .await;

        assert!(coordinator.mark_lesson_completed(ids[0], 1).await);
        coordinator.navigate_to_next();
        // Last lesson of module A: the module record fails, the lesson stands.
        assert!(coordinator.mark_lesson_completed(ids[1], 1).await);
        assert!(coordinator.is_lesson_completed(ids[1]));
        assert!(coordinator.is_lesson_accessible(ids[2]));
        assert!(coordinator.course_progress().module_completions.is_empty());
        assert_eq!(coordinator.course_progress().completed_lesson_ids().len(), 2);

        coordinator.navigate_to_next();
        assert!(coordinator.mark_lesson_completed(ids[2], 1).await);
        assert_eq!(coordinator.course_completion_percentage(), 100);
        assert!(coordinator.course_progress().course_completion.is_none());
    }

    #[tokio::test]
    async fn test_completion_is_idempotent() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store.clone(), course).await;

        assert!(coordinator.mark_lesson_completed(ids[0], 100).await);
        let accessible = coordinator.state().accessible_lesson_ids().clone();
        assert!(coordinator.mark_lesson_completed(ids[0], 100).await);

        assert_eq!(coordinator.state().accessible_lesson_ids(), &accessible);
        let progress = store
            .get_course_progress(&StudentId::new("student-1"), coordinator.course().id)
            .await
            .unwrap();
        assert_eq!(progress.completed_lesson_ids().len(), 1);
        assert_eq!(progress.detailed_progress.len(), 1);
    }

    #[tokio::test]
    async fn test_completion_for_other_lesson_is_ignored() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store.clone(), course).await;

        assert!(!coordinator.mark_lesson_completed(ids[1], 10).await);
        assert!(!coordinator.is_lesson_completed(ids[1]));
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_store_failure_leaves_state_unchanged() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store.clone(), course).await;
        let before = coordinator.state().clone();

        store.set_fail_writes(true);
        assert!(!coordinator.mark_lesson_completed(ids[0], 100).await);
        assert_eq!(coordinator.state(), &before);
        assert!(!coordinator.is_lesson_accessible(ids[1]));

        // The next playback event retries once the store is back.
        let outcome = watch(&mut coordinator, ids[0], 96).await.unwrap();
        assert!(!outcome.lesson_completed);
        store.set_fail_writes(false);
        let outcome = coordinator.on_playback_update(ids[0], 97.0, 100.0).await.unwrap();
        assert!(outcome.lesson_completed);
        assert!(coordinator.is_lesson_accessible(ids[1]));
    }

    #[tokio::test]
    async fn test_late_events_for_other_lessons_are_ignored() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store.clone(), course).await;

        watch(&mut coordinator, ids[0], 50).await;
        coordinator.mark_lesson_completed(ids[0], 50).await;
        assert!(coordinator.navigate_to_next());

        // A timeupdate from the video that was just left.
        assert!(coordinator.on_playback_update(ids[0], 99.0, 100.0).await.is_none());
        assert!(coordinator.request_seek(ids[0], 10.0).is_none());
        assert!(coordinator.submit_quiz(ids[2], 10, 10).await.is_none());
        assert!(!coordinator.is_lesson_completed(ids[1]));
    }

    #[tokio::test]
    async fn test_locked_lessons_cannot_be_entered() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let mut coordinator = open(store, course).await;

        assert!(!coordinator.navigate_to_lesson(1, 0));
        assert!(!coordinator.navigate_to_lesson(5, 0));
        assert_eq!(coordinator.current_position(), Some(Position::new(0, 0)));
        assert!(coordinator.navigate_to_lesson(0, 0));
    }

    #[tokio::test]
    async fn test_previous_is_never_gated() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store, course).await;

        assert!(!coordinator.has_previous_lesson());
        assert!(!coordinator.navigate_to_previous());

        coordinator.mark_lesson_completed(ids[0], 1).await;
        coordinator.navigate_to_next();
        assert!(coordinator.has_previous_lesson());
        assert!(coordinator.navigate_to_previous());
        assert_eq!(coordinator.current_lesson().unwrap().id, ids[0]);
        assert!(coordinator.has_next_lesson());
    }

    #[tokio::test]
    async fn test_seek_ahead_is_rejected() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store, course).await;

        watch(&mut coordinator, ids[0], 20).await;
        let outcome = coordinator.request_seek(ids[0], 60.0).unwrap();
        assert_eq!(outcome, SeekOutcome::Rejected { max_position: 20.0 });
        assert!(coordinator.request_seek(ids[0], 5.0).unwrap().is_allowed());
    }

    #[tokio::test]
    async fn test_exhausted_quiz_unlocks_next_lesson() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store, course).await;

        coordinator.mark_lesson_completed(ids[0], 1).await;
        coordinator.navigate_to_next();

        let first = coordinator.submit_quiz(ids[1], 2, 10).await.unwrap();
        assert!(!first.lesson_completed);
        assert!(coordinator.reset_quiz(ids[1]));

        let second = coordinator.submit_quiz(ids[1], 3, 10).await.unwrap();
        assert!(second.quiz.completed);
        assert!(!second.quiz.passed);
        assert!(second.lesson_completed);
        assert!(coordinator.is_lesson_accessible(ids[2]));
    }

    #[tokio::test]
    async fn test_quiz_question_count_cannot_be_understated() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store, course).await;

        coordinator.mark_lesson_completed(ids[0], 1).await;
        coordinator.navigate_to_next();

        assert!(coordinator.submit_quiz(ids[1], 1, 1).await.is_none());
        assert!(!coordinator.is_lesson_completed(ids[1]));
        assert!(!coordinator.is_lesson_accessible(ids[2]));
    }

    #[tokio::test]
    async fn test_quiz_answers_unlock_next_lesson() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store, course).await;

        coordinator.mark_lesson_completed(ids[0], 1).await;
        coordinator.navigate_to_next();

        // Option 0 is correct for every question; seven right answers is 70%.
        let answers = [0, 0, 0, 0, 0, 0, 0, 1, 1, 1];
        let submission = coordinator.submit_quiz_answers(ids[1], &answers).await.unwrap();
        assert!(submission.quiz.passed);
        assert!(submission.lesson_completed);
        assert!(coordinator.is_lesson_accessible(ids[2]));
    }

    #[tokio::test]
    async fn test_hydration_resumes_at_frontier() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);

        let mut first = open(store.clone(), course.clone()).await;
        first.mark_lesson_completed(ids[0], 90).await;
        drop(first);

        let resumed = open(store, course).await;
        assert!(resumed.is_lesson_completed(ids[0]));
        assert_eq!(resumed.current_position(), Some(Position::new(0, 1)));
        assert_eq!(resumed.course_completion_percentage(), 33);
    }

    #[tokio::test]
    async fn test_refresh_merges_remote_completions() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store.clone(), course.clone()).await;

        // Another device completes the first lesson.
        let mut other = open(store.clone(), course).await;
        other.mark_lesson_completed(ids[0], 100).await;

        assert!(!coordinator.is_lesson_completed(ids[0]));
        assert!(coordinator.refresh().await);
        assert!(coordinator.is_lesson_completed(ids[0]));
        assert!(coordinator.is_lesson_accessible(ids[1]));

        store.set_fail_reads(true);
        assert!(!coordinator.refresh().await);
        assert!(coordinator.is_lesson_completed(ids[0]));
    }

    #[tokio::test]
    async fn test_open_reports_missing_course_and_read_failure() {
        let store = Arc::new(MemoryStorage::new());
        let result = ProgressionCoordinator::open(
            StudentId::new("s"),
            CourseId::new(),
            store.as_ref(),
            store.clone(),
            ProgressionConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(ProgressionError::CourseNotFound(_))));

        let course = scenario_course();
        store.save_course(&course).await.unwrap();
        store.set_fail_reads(true);
        let result = ProgressionCoordinator::open(
            StudentId::new("s"),
            course.id,
            store.as_ref(),
            store.clone(),
            ProgressionConfig::default(),
        )
        .await;
        assert!(matches!(result, Err(ProgressionError::Storage(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_advance_flag_expires() {
        let store = Arc::new(MemoryStorage::new());
        let course = scenario_course();
        let ids = lesson_ids(&course);
        let mut coordinator = open(store, course).await;

        coordinator.mark_lesson_completed(ids[0], 1).await;
        assert!(!coordinator.is_auto_advancing());
        assert!(coordinator.navigate_to_next());
        assert!(coordinator.is_auto_advancing());

        tokio::time::advance(Duration::from_millis(1499)).await;
        assert!(coordinator.is_auto_advancing());
        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(!coordinator.is_auto_advancing());
    }

    #[tokio::test]
    async fn test_empty_course() {
        let store = Arc::new(MemoryStorage::new());
        let mut coordinator = open(store, Course::new("Empty")).await;

        assert!(coordinator.current_lesson().is_none());
        assert!(!coordinator.has_next_lesson());
        assert!(!coordinator.navigate_to_next());
        assert_eq!(coordinator.course_completion_percentage(), 0);
        assert!(!coordinator.mark_lesson_completed(LessonId::new(), 0).await);
    }
}
