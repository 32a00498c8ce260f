//! SessionParameters - per-run learner profile

use serde::{Deserialize, Serialize};

/// Names of every session parameter, in declaration order
pub const PARAMETER_NAMES: [&str; 6] = [
    "course",
    "background",
    "name",
    "topic",
    "primary_language",
    "course_expertise",
];

/// Expertise levels offered to learners
pub const EXPERTISE_LEVELS: [&str; 3] = ["Novice", "Intermediate", "Advanced"];

/// Learner profile and topic, supplied once at pipeline start
///
/// Missing fields fall back to the demo profile when deserialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionParameters {
    /// Course the topic belongs to (e.g., "Data Analytics")
    pub course: String,

    /// Learner's field of interest, used to pick relevant examples
    pub background: String,

    /// Learner's name
    pub name: String,

    /// Topic to explain (e.g., "p-values")
    pub topic: String,

    /// Preferred language of the explanation
    pub primary_language: String,

    /// Novice / Intermediate / Advanced
    pub course_expertise: String,
}

impl Default for SessionParameters {
    fn default() -> Self {
        Self {
            course: "Data Analytics".to_string(),
            background: "Software Engineering".to_string(),
            name: "Raj".to_string(),
            topic: "p-values".to_string(),
            primary_language: "English".to_string(),
            course_expertise: "Novice".to_string(),
        }
    }
}

impl SessionParameters {
    /// Look up a parameter by its variable name
    pub fn get(&self, name: &str) -> Option<&str> {
        let value = match name {
            "course" => &self.course,
            "background" => &self.background,
            "name" => &self.name,
            "topic" => &self.topic,
            "primary_language" => &self.primary_language,
            "course_expertise" => &self.course_expertise,
            _ => return None,
        };
        Some(value.as_str())
    }

    /// Whether `name` is a session parameter
    pub fn is_parameter(name: &str) -> bool {
        PARAMETER_NAMES.contains(&name)
    }

    /// Iterate `(name, value)` pairs in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        PARAMETER_NAMES
            .iter()
            .filter_map(move |name| self.get(name).map(|value| (*name, value)))
    }

    /// Whether `course_expertise` is one of the known levels
    pub fn has_known_expertise(&self) -> bool {
        EXPERTISE_LEVELS
            .iter()
            .any(|level| level.eq_ignore_ascii_case(&self.course_expertise))
    }
}
