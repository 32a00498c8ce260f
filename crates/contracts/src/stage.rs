//! StageDefinition / StageOutput - one unit of render + invoke + store work

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Declarative description of a pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Stage name (e.g., "Intro")
    pub name: String,

    /// Section title shown to the learner
    pub title: String,

    /// User prompt template with `{placeholder}` syntax
    pub template: String,

    /// Optional system prompt, rendered with the same bindings
    #[serde(default)]
    pub system_template: Option<String>,

    /// Variables bound while rendering, in declaration order
    pub required_inputs: Vec<String>,

    /// Pipeline state key the generated text is stored under
    pub output_key: String,
}

impl StageDefinition {
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        template: impl Into<String>,
        output_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
            template: template.into(),
            system_template: None,
            required_inputs: Vec::new(),
            output_key: output_key.into(),
        }
    }

    /// Attach a system prompt template
    pub fn with_system(mut self, system_template: impl Into<String>) -> Self {
        self.system_template = Some(system_template.into());
        self
    }

    /// Declare required inputs (duplicates are ignored)
    pub fn requires<I, S>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for input in inputs {
            let input = input.into();
            if !self.required_inputs.contains(&input) {
                self.required_inputs.push(input);
            }
        }
        self
    }

    /// Whether this stage reads `name`
    pub fn depends_on(&self, name: &str) -> bool {
        self.required_inputs.iter().any(|input| input == name)
    }
}

/// Result of one completed stage, emitted to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageOutput {
    /// 1-based position in the pipeline
    pub index: usize,

    /// Stage name
    pub stage: String,

    /// Section title
    pub title: String,

    /// Key the text was stored under
    pub output_key: String,

    /// Generated text
    pub text: String,

    /// Wall time of the render + invoke round trip
    #[serde(with = "duration_ms")]
    pub elapsed: Duration,
}

mod duration_ms {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_deduplicates() {
        let stage = StageDefinition::new("Example", "Example", "{a} {b}", "example_response")
            .requires(["a", "b", "a"]);
        assert_eq!(stage.required_inputs, vec!["a", "b"]);
        assert!(stage.depends_on("b"));
        assert!(!stage.depends_on("c"));
    }

    #[test]
    fn test_output_serializes_elapsed_ms() {
        let output = StageOutput {
            index: 1,
            stage: "Intro".into(),
            title: "Introduction".into(),
            output_key: "intro_response".into(),
            text: "hello".into(),
            elapsed: Duration::from_millis(1500),
        };
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["elapsed"], 1500);
        assert_eq!(json["stage"], "Intro");
    }
}
