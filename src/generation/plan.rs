//! Lesson plans: which sections a lesson type contains and in what order.

use crate::error::LessonError;
use crate::types::sections::{
    DIALOGUE, DISCUSSION, GRAMMAR, PRONUNCIATION, READING, VOCABULARY, WARMUP,
};
use crate::validation::ValidatorRegistry;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::warn;

pub const DEFAULT_LESSON_TYPE: &str = "discussion";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub name: String,
    /// Lower runs earlier.
    pub priority: u32,
    pub dependencies: BTreeSet<String>,
}

impl SectionSpec {
    pub fn new(name: &str, priority: u32, dependencies: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            priority,
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonPlan {
    pub lesson_type: String,
    pub sections: Vec<SectionSpec>,
}

impl LessonPlan {
    /// Plan for a lesson type; unknown types get the discussion plan.
    pub fn for_lesson_type(lesson_type: &str) -> Self {
        let normalized = lesson_type.trim().to_ascii_lowercase();
        let sections = match normalized.as_str() {
            "discussion" => discussion_sections(),
            "grammar" => vec![
                SectionSpec::new(WARMUP, 0, &[]),
                SectionSpec::new(VOCABULARY, 1, &[]),
                SectionSpec::new(GRAMMAR, 2, &[]),
                SectionSpec::new(READING, 3, &[VOCABULARY]),
                SectionSpec::new(DISCUSSION, 4, &[READING]),
            ],
            "pronunciation" => vec![
                SectionSpec::new(WARMUP, 0, &[]),
                SectionSpec::new(VOCABULARY, 1, &[]),
                SectionSpec::new(PRONUNCIATION, 2, &[VOCABULARY]),
                SectionSpec::new(DIALOGUE, 3, &[VOCABULARY]),
            ],
            "conversation" => vec![
                SectionSpec::new(WARMUP, 0, &[]),
                SectionSpec::new(VOCABULARY, 1, &[]),
                SectionSpec::new(DIALOGUE, 2, &[VOCABULARY]),
                SectionSpec::new(DISCUSSION, 3, &[VOCABULARY]),
            ],
            other => {
                warn!(
                    lesson_type = other,
                    fallback = DEFAULT_LESSON_TYPE,
                    "unknown lesson type, using default plan"
                );
                return Self {
                    lesson_type: DEFAULT_LESSON_TYPE.to_string(),
                    sections: discussion_sections(),
                };
            }
        };
        Self {
            lesson_type: normalized,
            sections,
        }
    }

    pub fn section(&self, name: &str) -> Option<&SectionSpec> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sections sorted by (priority, name).
    pub fn ordered(&self) -> Vec<&SectionSpec> {
        let mut ordered: Vec<&SectionSpec> = self.sections.iter().collect();
        ordered.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        ordered
    }

    pub fn validate(&self, validators: &ValidatorRegistry) -> Result<(), LessonError> {
        if self.sections.is_empty() {
            return Err(LessonError::InvalidPlan(format!(
                "Lesson plan '{}' has no sections",
                self.lesson_type
            )));
        }

        let mut names = HashSet::new();
        for section in &self.sections {
            if !names.insert(section.name.as_str()) {
                return Err(LessonError::InvalidPlan(format!(
                    "Section '{}' appears more than once",
                    section.name
                )));
            }
            if !validators.contains(&section.name) {
                return Err(LessonError::UnknownSection(section.name.clone()));
            }
        }

        for section in &self.sections {
            if let Some(missing) = section
                .dependencies
                .iter()
                .find(|dep| !names.contains(dep.as_str()))
            {
                return Err(LessonError::InvalidPlan(format!(
                    "Section '{}' depends on '{}', which is not in the plan",
                    section.name, missing
                )));
            }
        }

        if let Some(section) = self.find_cycle() {
            return Err(LessonError::InvalidPlan(format!(
                "Dependency cycle through section '{}'",
                section
            )));
        }
        Ok(())
    }

    /// Kahn's algorithm; returns a section left over when the graph is not acyclic.
    fn find_cycle(&self) -> Option<&str> {
        let mut remaining: HashMap<&str, usize> = self
            .sections
            .iter()
            .map(|s| (s.name.as_str(), s.dependencies.len()))
            .collect();
        let mut ready: Vec<&str> = remaining
            .iter()
            .filter(|(_, deps)| **deps == 0)
            .map(|(name, _)| *name)
            .collect();

        while let Some(done) = ready.pop() {
            remaining.remove(done);
            for section in &self.sections {
                if section.dependencies.contains(done) {
                    if let Some(count) = remaining.get_mut(section.name.as_str()) {
                        *count -= 1;
                        if *count == 0 {
                            ready.push(section.name.as_str());
                        }
                    }
                }
            }
        }

        remaining.keys().min().copied()
    }
}

fn discussion_sections() -> Vec<SectionSpec> {
    vec![
        SectionSpec::new(WARMUP, 0, &[]),
        SectionSpec::new(VOCABULARY, 1, &[]),
        SectionSpec::new(READING, 2, &[VOCABULARY]),
        SectionSpec::new(DISCUSSION, 3, &[READING]),
        SectionSpec::new(DIALOGUE, 4, &[VOCABULARY]),
    ]
}
