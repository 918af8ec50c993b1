//! LessonFlow CLI - course progression from the command line.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use lessonflow_core::{Course, CourseId, LessonId, ProgressionConfig, StudentId};
use lessonflow_progress::{ProgressionCoordinator, VisitOutcome};
use lessonflow_storage::{CourseCatalog, JsonStorage};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lessonflow")]
#[command(about = "Course progression and completion gating", long_about = None)]
struct Cli {
    /// Storage root directory
    #[arg(long, global = true, default_value = ".lessonflow")]
    storage: PathBuf,

    /// Progression config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a course definition from a JSON file
    Import {
        /// Path to the course JSON
        file: PathBuf,
    },
    /// List imported courses
    Courses,
    /// Show a student's progress in a course
    Status {
        /// Student ID
        #[arg(long)]
        student: String,
        /// Course ID
        #[arg(long)]
        course: String,
    },
    /// Report engagement with a lesson and record completion if earned
    Complete {
        /// Student ID
        #[arg(long)]
        student: String,
        /// Course ID
        #[arg(long)]
        course: String,
        /// Lesson ID
        #[arg(long)]
        lesson: String,
        /// Seconds of video watched
        #[arg(long, requires = "duration", conflicts_with_all = ["score", "answers", "seconds"])]
        watched: Option<f64>,
        /// Video duration in seconds
        #[arg(long, requires = "watched")]
        duration: Option<f64>,
        /// Correct quiz answers. Attempts are counted per invocation: each
        /// run is a fresh visit, so a failed run never exhausts the quiz
        #[arg(long, requires = "total", conflicts_with_all = ["answers", "seconds"])]
        score: Option<u32>,
        /// Quiz question count, must match the quiz
        #[arg(long, requires = "score")]
        total: Option<u32>,
        /// Chosen option per question, comma separated (e.g. 0,2,1).
        /// Counted per invocation like --score
        #[arg(long, value_delimiter = ',', conflicts_with = "seconds")]
        answers: Option<Vec<usize>>,
        /// Seconds a text or file lesson stayed in view
        #[arg(long)]
        seconds: Option<f64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ProgressionConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => ProgressionConfig::default(),
    };
    let storage = Arc::new(JsonStorage::new(&cli.storage).await?);

    match cli.command {
        Commands::Import { file } => {
            let json = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let course: Course = serde_json::from_str(&json)?;
            storage.save_course(&course).await?;
            info!("Imported course '{}'", course.title);
            println!(
                "Imported: {} - {} ({} modules, {} lessons)",
                course.id,
                course.title,
                course.modules.len(),
                course.total_lessons()
            );
        }
        Commands::Courses => {
            let courses = storage.list_courses().await?;
            println!("Courses ({})", courses.len());
            for course in courses {
                println!("  {} | {} lessons | {}", course.id, course.total_lessons(), course.title);
            }
        }
        Commands::Status { student, course } => {
            let coordinator = open(&storage, student, &course, config).await?;
            print_status(&coordinator);
        }
        Commands::Complete {
            student,
            course,
            lesson,
            watched,
            duration,
            score,
            total,
            answers,
            seconds,
        } => {
            let lesson_id: LessonId = lesson
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid lesson ID"))?;
            let mut coordinator = open(&storage, student, &course, config).await?;

            let Some(position) = coordinator
                .course()
                .find_lesson(lesson_id)
                .map(|r| r.position)
            else {
                bail!("Lesson {} is not part of this course", lesson_id);
            };
            if !coordinator.navigate_to_lesson(position.module_index, position.lesson_index) {
                bail!("Lesson {} is locked", position);
            }

            let quiz = match (score, total, &answers) {
                (Some(score), Some(total), _) => Some(
                    coordinator
                        .submit_quiz(lesson_id, score, total)
                        .await
                        .with_context(|| format!("Invalid quiz submission {}/{}", score, total))?,
                ),
                (_, _, Some(answers)) => Some(
                    coordinator
                        .submit_quiz_answers(lesson_id, answers)
                        .await
                        .context("Lesson is not gated by a quiz")?,
                ),
                _ => None,
            };

            let outcome = match (watched, duration, seconds, quiz) {
                (Some(watched), Some(duration), ..) => {
                    coordinator.on_playback_update(lesson_id, watched, duration).await
                }
                (_, _, _, Some(submission)) => {
                    println!(
                        "Quiz: {:.0}% ({:?})",
                        submission.quiz.percentage, submission.quiz.state
                    );
                    coordinator.current_verdict().map(|verdict| VisitOutcome {
                        verdict,
                        lesson_completed: submission.lesson_completed,
                    })
                }
                (_, _, Some(seconds), _) => coordinator.record_engagement(lesson_id, seconds).await,
                _ => coordinator.current_verdict().map(|verdict| VisitOutcome {
                    verdict,
                    lesson_completed: coordinator.is_lesson_completed(lesson_id),
                }),
            };

            match outcome {
                Some(outcome) if outcome.lesson_completed => {
                    println!("Lesson {} completed", position);
                }
                Some(outcome) => {
                    println!(
                        "Lesson {} not completed yet ({:.0}%)",
                        position, outcome.verdict.progress_percent
                    );
                }
                None => warn!("Lesson {} did not accept this kind of engagement", position),
            }
            println!("Course progress: {}%", coordinator.course_completion_percentage());
        }
    }

    Ok(())
}

async fn open(
    storage: &Arc<JsonStorage>,
    student: String,
    course: &str,
    config: ProgressionConfig,
) -> Result<ProgressionCoordinator> {
    let course_id: CourseId = course
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid course ID"))?;
    let coordinator = ProgressionCoordinator::open(
        StudentId::new(student),
        course_id,
        storage.as_ref(),
        storage.clone(),
        config,
    )
    .await?;
    Ok(coordinator)
}

fn print_status(coordinator: &ProgressionCoordinator) {
    let snapshot = coordinator.snapshot();
    let current = coordinator.current_lesson().map(|l| l.id);

    println!("{} - {}", coordinator.course().title, coordinator.student());
    println!(
        "  Progress: {}/{} lessons ({}%)",
        snapshot.completed_lessons, snapshot.total_lessons, snapshot.percentage
    );

    for (module, progress) in coordinator.course().modules.iter().zip(&snapshot.modules) {
        println!(
            "  {} [{}/{}]",
            module.title, progress.completed_lessons, progress.total_lessons
        );
        for lesson in &module.lessons {
            let marker = if coordinator.is_lesson_completed(lesson.id) {
                "DONE"
            } else if coordinator.is_lesson_accessible(lesson.id) {
                "OPEN"
            } else {
                "LOCKED"
            };
            let pointer = if Some(lesson.id) == current { ">" } else { " " };
            println!(
                "   {} {:<6} {} | {} | {}",
                pointer,
                marker,
                lesson.id,
                lesson.content.kind().as_str(),
                lesson.title
            );
        }
    }

    if coordinator.course_progress().course_completion.is_some() {
        println!("  Course completed");
    }
}
