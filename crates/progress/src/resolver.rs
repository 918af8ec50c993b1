//! Lesson accessibility.
//!
//! Lessons unlock along a strict linear chain over the flattened course
//! order: the first lesson is always open, and every other lesson opens once
//! its immediate predecessor is completed. The accessible set is therefore
//! always a contiguous prefix of the course.

use std::collections::{HashMap, HashSet};

use lessonflow_core::{Course, LessonId, ModuleId, Position};
use serde::Serialize;

/// A lesson in the flattened order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonNode {
    /// Lesson ID
    pub id: LessonId,

    /// Owning module
    pub module_id: ModuleId,

    /// Module/lesson indices
    pub position: Position,

    /// Lesson title
    pub title: String,
}

/// Flattened lesson order of a course.
#[derive(Debug, Clone)]
pub struct LessonGraph {
    nodes: Vec<LessonNode>,
    by_id: HashMap<LessonId, usize>,
    by_position: HashMap<Position, usize>,
}

impl LessonGraph {
    /// Flatten a course: module order, then lesson order within each module.
    pub fn from_course(course: &Course) -> Self {
        let nodes: Vec<LessonNode> = course
            .lesson_order()
            .into_iter()
            .map(|r| LessonNode {
                id: r.lesson.id,
                module_id: r.module_id,
                position: r.position,
                title: r.lesson.title.clone(),
            })
            .collect();
        let by_id = nodes.iter().enumerate().map(|(i, n)| (n.id, i)).collect();
        let by_position = nodes.iter().enumerate().map(|(i, n)| (n.position, i)).collect();

        Self {
            nodes,
            by_id,
            by_position,
        }
    }

    /// Number of lessons.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the course has no lessons.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Lesson at a flattened index.
    pub fn node(&self, index: usize) -> Option<&LessonNode> {
        self.nodes.get(index)
    }

    /// All lessons in order.
    pub fn nodes(&self) -> &[LessonNode] {
        &self.nodes
    }

    /// Flattened index of a lesson.
    pub fn index_of(&self, id: LessonId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    /// Flattened index of a (module, lesson) position.
    pub fn index_at(&self, position: Position) -> Option<usize> {
        self.by_position.get(&position).copied()
    }

    /// Next lesson in flattened order, crossing module boundaries.
    pub fn successor(&self, index: usize) -> Option<usize> {
        let next = index + 1;
        (next < self.nodes.len()).then_some(next)
    }

    /// Previous lesson in flattened order.
    pub fn predecessor(&self, index: usize) -> Option<usize> {
        index.checked_sub(1).filter(|&i| i < self.nodes.len())
    }

    /// Lessons of one module.
    pub fn module_lessons(&self, module_id: ModuleId) -> impl Iterator<Item = &LessonNode> {
        self.nodes.iter().filter(move |n| n.module_id == module_id)
    }

    /// Lessons the student may enter given the completed set.
    pub fn accessible_set(&self, completed: &HashSet<LessonId>) -> HashSet<LessonId> {
        let mut accessible = HashSet::new();
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 && !completed.contains(&self.nodes[i - 1].id) {
                break;
            }
            accessible.insert(node.id);
        }
        accessible
    }

    /// First incomplete lesson; the last lesson once everything is completed.
    pub fn frontier(&self, completed: &HashSet<LessonId>) -> Option<usize> {
        self.nodes
            .iter()
            .position(|n| !completed.contains(&n.id))
            .or_else(|| self.nodes.len().checked_sub(1))
    }

    /// Build session state from the completed set, positioned at the frontier.
    pub fn resolve(&self, completed: impl IntoIterator<Item = LessonId>) -> ProgressionState {
        let completed: HashSet<LessonId> = completed
            .into_iter()
            .filter(|id| self.by_id.contains_key(id))
            .collect();
        let accessible = self.accessible_set(&completed);
        let current = self.frontier(&completed);

        ProgressionState {
            completed_lesson_ids: completed,
            accessible_lesson_ids: accessible,
            current_index: current,
        }
    }

    /// Recompute after a newly completed lesson, keeping the current position.
    pub fn recompute(&self, state: &ProgressionState, completed: LessonId) -> ProgressionState {
        let mut next = self.resolve(
            state
                .completed_lesson_ids
                .iter()
                .copied()
                .chain(std::iter::once(completed)),
        );
        next.current_index = state.current_index;
        next
    }
}

/// Per-session progression state.
///
/// Completed and accessible sets are only ever produced by [`LessonGraph`];
/// the coordinator moves the current position.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProgressionState {
    completed_lesson_ids: HashSet<LessonId>,
    accessible_lesson_ids: HashSet<LessonId>,
    current_index: Option<usize>,
}

impl ProgressionState {
    /// Completed lessons.
    pub fn completed_lesson_ids(&self) -> &HashSet<LessonId> {
        &self.completed_lesson_ids
    }

    /// Lessons the student may enter.
    pub fn accessible_lesson_ids(&self) -> &HashSet<LessonId> {
        &self.accessible_lesson_ids
    }

    /// Flattened index of the current lesson, `None` for an empty course.
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Whether a lesson is completed.
    pub fn is_completed(&self, id: LessonId) -> bool {
        self.completed_lesson_ids.contains(&id)
    }

    /// Whether a lesson is accessible.
    pub fn is_accessible(&self, id: LessonId) -> bool {
        self.accessible_lesson_ids.contains(&id)
    }

    pub(crate) fn set_current_index(&mut self, index: usize) {
        self.current_index = Some(index);
    }
}
