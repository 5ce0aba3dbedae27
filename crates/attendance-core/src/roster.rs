//! The ordered set of known students.

use std::collections::{BTreeSet, HashSet};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AttendanceError, Result};
use crate::models::Student;

/// Class-filter value meaning "every class".
pub const ALL_CLASSES: &str = "All";

/// Students in insertion order, unique by `name`.
///
/// Serializes as a plain array; snapshots are read back through
/// [`Roster::from_students`] so the uniqueness check always runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Roster {
    students: Vec<Student>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from a stored snapshot.
    ///
    /// Later entries that repeat an earlier name are dropped.
    pub fn from_students(students: Vec<Student>) -> Self {
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(students.len());
        for student in students {
            if seen.insert(student.name.clone()) {
                kept.push(student);
            } else {
                warn!(name = %student.name, "dropping duplicate student from snapshot");
            }
        }
        Self { students: kept }
    }

    /// The five students an empty installation starts with.
    pub fn demo() -> Self {
        Self::from_students(vec![
            Student::new("Alice Johnson", "S001", "ClassA"),
            Student::new("Bob Smith", "S002", "ClassA"),
            Student::new("Charlie Brown", "S003", "ClassB"),
            Student::new("David Garcia", "S004", "ClassB"),
            Student::new("Emma Wilson", "S005", "ClassC"),
        ])
    }

    // ── Mutation ──────────────────────────────────────────────────────────────

    /// Append a student. The name is trimmed before the uniqueness check.
    pub fn add(&mut self, mut student: Student) -> Result<()> {
        student.name = student.name.trim().to_string();
        student.id = student.id.trim().to_string();
        if student.name.is_empty() {
            return Err(AttendanceError::EmptyStudentName);
        }
        if self.contains(&student.name) {
            return Err(AttendanceError::DuplicateStudent(student.name));
        }
        debug!(name = %student.name, "student added to roster");
        self.students.push(student);
        Ok(())
    }

    /// Remove the student called `name`, returning it if it was present.
    pub fn remove(&mut self, name: &str) -> Option<Student> {
        let idx = self.students.iter().position(|s| s.name == name)?;
        Some(self.students.remove(idx))
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn contains(&self, name: &str) -> bool {
        self.students.iter().any(|s| s.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&Student> {
        self.students.iter().find(|s| s.name == name)
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Student> {
        self.students.iter()
    }

    pub fn len(&self) -> usize {
        self.students.len()
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    /// Distinct non-empty class names, sorted.
    pub fn classes(&self) -> Vec<String> {
        self.students
            .iter()
            .filter(|s| !s.class.is_empty())
            .map(|s| s.class.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Students in `class`; `None` or [`ALL_CLASSES`] selects everyone.
    pub fn in_class(&self, class: Option<&str>) -> Vec<&Student> {
        self.students
            .iter()
            .filter(|s| class_matches(s, class))
            .collect()
    }

    /// Case-insensitive substring search over name and id, narrowed by class.
    pub fn search(&self, query: &str, class: Option<&str>) -> Vec<&Student> {
        let needle = query.trim().to_lowercase();
        self.students
            .iter()
            .filter(|s| {
                s.name.to_lowercase().contains(&needle) || s.id.to_lowercase().contains(&needle)
            })
            .filter(|s| class_matches(s, class))
            .collect()
    }

    /// Generated id for the `offset`-th student about to be appended.
    ///
    /// `S001` for the first student of an empty roster, `S004` for the second
    /// pending student of a three-student roster, and so on.
    pub fn next_generated_id(&self, offset: usize) -> String {
        format!("S{:03}", self.students.len() + offset + 1)
    }
}

fn class_matches(student: &Student, class: Option<&str>) -> bool {
    match class {
        None | Some(ALL_CLASSES) => true,
        Some(c) => student.class == c,
    }
}

impl<'a> IntoIterator for &'a Roster {
    type Item = &'a Student;
    type IntoIter = std::slice::Iter<'a, Student>;

    fn into_iter(self) -> Self::IntoIter {
        self.students.iter()
    }
}
