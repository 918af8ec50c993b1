//! Ephemeral engagement state of the lesson currently open.

use lessonflow_core::{ContentGate, Lesson, LessonContent, LessonId, ProgressionConfig};
use tokio::time::Instant;
use tracing::debug;

use crate::evaluator::{self, CompletionVerdict, ContentCompletionState};
use crate::playback::{PlaybackGuard, SeekOutcome};
use crate::quiz::{QuizAttemptTracker, QuizVerdict};

/// Engagement tracker matching the lesson's gating payload.
#[derive(Debug, Clone)]
enum Engagement {
    Video(PlaybackGuard),
    Quiz(QuizAttemptTracker),
    Text { read_time_seconds: f64 },
    File { view_time_seconds: f64 },
    /// Mixed lesson without any payload.
    Unusable,
}

/// One visit to one lesson.
///
/// Dropped when the student navigates away; only the resulting completion
/// reaches the progress store.
#[derive(Debug, Clone)]
pub struct LessonVisit {
    lesson_id: LessonId,
    content: LessonContent,
    engagement: Engagement,
    opened_at: Instant,
}

impl LessonVisit {
    /// Open a visit for a lesson.
    pub fn open(lesson: &Lesson, config: &ProgressionConfig) -> Self {
        let engagement = match lesson.content.gate() {
            Some(ContentGate::Video(video)) => {
                let mut guard = PlaybackGuard::new(config.video_threshold_ratio());
                if let Some(duration) = video.duration_seconds {
                    guard.set_duration(duration);
                }
                Engagement::Video(guard)
            }
            Some(ContentGate::Quiz(_)) => Engagement::Quiz(QuizAttemptTracker::new(config)),
            Some(ContentGate::Text(_)) => Engagement::Text { read_time_seconds: 0.0 },
            Some(ContentGate::File(_)) => Engagement::File { view_time_seconds: 0.0 },
            None => Engagement::Unusable,
        };

        Self {
            lesson_id: lesson.id,
            content: lesson.content.clone(),
            engagement,
            opened_at: Instant::now(),
        }
    }

    /// Lesson this visit belongs to.
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    /// Playback-time update. Ignored unless the lesson is gated by a video.
    pub fn on_time_update(&mut self, current: f64, total: f64) {
        if let Engagement::Video(guard) = &mut self.engagement {
            guard.on_time_update(current, total);
        }
    }

    /// The player reached the end of the video.
    pub fn on_ended(&mut self) {
        if let Engagement::Video(guard) = &mut self.engagement {
            guard.on_ended();
        }
    }

    /// Seek request. `None` if the lesson is not gated by a video.
    pub fn seek(&mut self, new_time: f64) -> Option<SeekOutcome> {
        match &mut self.engagement {
            Engagement::Video(guard) => Some(guard.seek(new_time)),
            _ => None,
        }
    }

    /// Quiz submission. `None` if the lesson is not gated by a quiz or the
    /// submission is malformed, including a question count that differs from
    /// the quiz itself.
    pub fn submit_quiz(&mut self, score: u32, total_questions: u32) -> Option<QuizVerdict> {
        let expected = match self.content.gate() {
            Some(ContentGate::Quiz(quiz)) => quiz.total_questions(),
            _ => return None,
        };
        if total_questions != expected {
            debug!(
                "Rejected quiz submission over {} questions, quiz has {}",
                total_questions, expected
            );
            return None;
        }
        match &mut self.engagement {
            Engagement::Quiz(tracker) => {
                tracker.start();
                tracker.submit(score, total_questions)
            }
            _ => None,
        }
    }

    /// Score chosen options against the quiz and submit the result.
    /// `answers[i]` is the option picked for question `i`; missing answers
    /// count as wrong.
    pub fn submit_answers(&mut self, answers: &[usize]) -> Option<QuizVerdict> {
        let (score, total) = match self.content.gate() {
            Some(ContentGate::Quiz(quiz)) => (quiz.score(answers), quiz.total_questions()),
            _ => return None,
        };
        self.submit_quiz(score, total)
    }

    /// Clear the last quiz result for a retry.
    pub fn reset_quiz(&mut self) -> bool {
        match &mut self.engagement {
            Engagement::Quiz(tracker) => tracker.reset(),
            _ => false,
        }
    }

    /// Add seconds the text or file stayed in view.
    pub fn add_engagement(&mut self, seconds: f64) {
        if !(seconds.is_finite() && seconds > 0.0) {
            return;
        }
        match &mut self.engagement {
            Engagement::Text { read_time_seconds } => *read_time_seconds += seconds,
            Engagement::File { view_time_seconds } => *view_time_seconds += seconds,
            _ => {}
        }
    }

    /// Engagement state as seen by the evaluators.
    pub fn completion_state(&self, config: &ProgressionConfig) -> Option<ContentCompletionState> {
        match &self.engagement {
            Engagement::Video(guard) => Some(guard.completion_state()),
            Engagement::Quiz(tracker) => Some(tracker.completion_state()),
            Engagement::Text { read_time_seconds } => Some(ContentCompletionState::Text {
                read_time_seconds: *read_time_seconds,
                read: *read_time_seconds >= config.min_content_read_time_seconds,
            }),
            Engagement::File { view_time_seconds } => Some(ContentCompletionState::File {
                view_time_seconds: *view_time_seconds,
                viewed: *view_time_seconds >= config.min_file_view_time_seconds,
            }),
            Engagement::Unusable => None,
        }
    }

    /// Current completion verdict.
    ///
    /// A video also counts once the guard reported it watched, which covers
    /// the `ended` event firing before the ratio threshold.
    pub fn verdict(&self, config: &ProgressionConfig) -> CompletionVerdict {
        let Some(state) = self.completion_state(config) else {
            return CompletionVerdict::NOT_COMPLETED;
        };
        let gate = self.content.gate();
        let verdict = evaluator::evaluate(gate, &state, config);

        match (&self.engagement, gate) {
            (Engagement::Video(guard), Some(gate)) if guard.is_completed() && gate.is_usable() => {
                CompletionVerdict {
                    completed: true,
                    progress_percent: verdict.progress_percent,
                }
            }
            _ => verdict,
        }
    }

    /// Seconds of engagement to report with the completion.
    pub fn time_spent_seconds(&self) -> u64 {
        let seconds = match &self.engagement {
            Engagement::Video(guard) => guard.watch_time(),
            Engagement::Text { read_time_seconds } => *read_time_seconds,
            Engagement::File { view_time_seconds } => *view_time_seconds,
            Engagement::Quiz(_) | Engagement::Unusable => self.opened_at.elapsed().as_secs_f64(),
        };
        seconds.max(0.0).round() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lessonflow_core::{MixedContent, QuizContent, QuizQuestion, TextContent, VideoContent};

    fn video_lesson(duration: Option<f64>) -> Lesson {
        Lesson::new(
            "Video",
            LessonContent::Video(VideoContent {
                url: "https://cdn.example.com/v.mp4".to_string(),
                duration_seconds: duration,
            }),
        )
    }

    fn quiz_content() -> QuizContent {
        QuizContent {
            questions: vec![QuizQuestion {
                prompt: "Borrow or move?".to_string(),
                options: vec!["borrow".to_string(), "move".to_string()],
                correct_option: 0,
            }],
        }
    }

    #[test]
    fn test_video_visit_completes_at_threshold() {
        let config = ProgressionConfig::default();
        let mut visit = LessonVisit::open(&video_lesson(None), &config);

        for t in 0..=90 {
            visit.on_time_update(f64::from(t), 100.0);
        }
        assert!(!visit.verdict(&config).completed);

        for t in 91..=96 {
            visit.on_time_update(f64::from(t), 100.0);
        }
        let verdict = visit.verdict(&config);
        assert!(verdict.completed);
        assert_eq!(verdict.progress_percent, 96.0);
        assert_eq!(visit.time_spent_seconds(), 96);
    }

    #[test]
    fn test_ended_completes_video_below_threshold() {
        let config = ProgressionConfig::default();
        let mut visit = LessonVisit::open(&video_lesson(None), &config);
        for t in 0..=80 {
            visit.on_time_update(f64::from(t), 100.0);
        }
        visit.on_ended();
        assert!(visit.verdict(&config).completed);
    }

    #[test]
    fn test_authored_duration_seeds_guard() {
        let config = ProgressionConfig::default();
        let mut visit = LessonVisit::open(&video_lesson(Some(100.0)), &config);
        // The player has not reported a duration yet.
        for t in 0..=96 {
            visit.on_time_update(f64::from(t), 0.0);
        }
        assert!(visit.verdict(&config).completed);
    }

    #[test]
    fn test_mixed_lesson_routes_to_video() {
        let config = ProgressionConfig::default();
        let lesson = Lesson::new(
            "Mixed",
            LessonContent::Mixed(MixedContent {
                video: Some(VideoContent {
                    url: "https://cdn.example.com/v.mp4".to_string(),
                    duration_seconds: None,
                }),
                quiz: Some(quiz_content()),
                text: None,
                file: None,
            }),
        );
        let mut visit = LessonVisit::open(&lesson, &config);

        assert!(visit.submit_quiz(1, 1).is_none());
        assert!(visit.seek(0.0).is_some());
    }

    #[test]
    fn test_text_visit_accumulates_read_time() {
        let config = ProgressionConfig::default();
        let lesson = Lesson::new(
            "Read",
            LessonContent::Text(TextContent { body: "Lifetimes".to_string() }),
        );
        let mut visit = LessonVisit::open(&lesson, &config);

        visit.add_engagement(20.0);
        visit.add_engagement(-5.0);
        assert!(!visit.verdict(&config).completed);
        visit.add_engagement(10.0);
        assert!(visit.verdict(&config).completed);
        assert_eq!(visit.time_spent_seconds(), 30);
    }

    #[test]
    fn test_quiz_visit_submission() {
        let config = ProgressionConfig::default();
        let lesson = Lesson::new("Quiz", LessonContent::Quiz(quiz_content()));
        let mut visit = LessonVisit::open(&lesson, &config);

        let verdict = visit.submit_quiz(1, 1).unwrap();
        assert!(verdict.passed);
        assert!(visit.verdict(&config).completed);
        assert!(visit.seek(10.0).is_none());
    }

    #[test]
    fn test_quiz_submission_must_match_question_count() {
        let config = ProgressionConfig::default();
        let mut quiz = quiz_content();
        quiz.questions.push(QuizQuestion {
            prompt: "Copy or clone?".to_string(),
            options: vec!["copy".to_string(), "clone".to_string()],
            correct_option: 1,
        });
        let lesson = Lesson::new("Quiz", LessonContent::Quiz(quiz));
        let mut visit = LessonVisit::open(&lesson, &config);

        assert!(visit.submit_quiz(1, 1).is_none());
        assert!(visit.submit_quiz(3, 3).is_none());
        assert!(!visit.verdict(&config).completed);

        let verdict = visit.submit_quiz(1, 2).unwrap();
        assert_eq!(verdict.attempts, 1);
        assert_eq!(verdict.percentage, 50.0);
    }

    #[test]
    fn test_quiz_answers_are_scored_against_content() {
        let config = ProgressionConfig::default();
        let lesson = Lesson::new("Quiz", LessonContent::Quiz(quiz_content()));

        let mut wrong = LessonVisit::open(&lesson, &config);
        let verdict = wrong.submit_answers(&[1]).unwrap();
        assert!(!verdict.passed);
        assert_eq!(verdict.percentage, 0.0);

        let mut right = LessonVisit::open(&lesson, &config);
        assert!(right.submit_answers(&[0]).unwrap().passed);
        assert!(right.verdict(&config).completed);

        let mut unanswered = LessonVisit::open(&lesson, &config);
        assert!(!unanswered.submit_answers(&[]).unwrap().passed);
    }

    #[test]
    fn test_empty_mixed_lesson_never_completes() {
        let config = ProgressionConfig::default();
        let lesson = Lesson::new("Broken", LessonContent::Mixed(MixedContent::default()));
        let mut visit = LessonVisit::open(&lesson, &config);
        visit.add_engagement(1000.0);
        assert_eq!(visit.verdict(&config), CompletionVerdict::NOT_COMPLETED);
        assert!(visit.completion_state(&config).is_none());
    }

    #[test]
    fn test_video_without_url_never_completes() {
        let config = ProgressionConfig::default();
        let lesson = Lesson::new("No url", LessonContent::Video(VideoContent::default()));
        let mut visit = LessonVisit::open(&lesson, &config);
        visit.on_ended();
        assert!(!visit.verdict(&config).completed);
    }
}
