//! Pipeline orchestrator - runs stages strictly in order.
//!
//! Each stage renders its prompt from session parameters and earlier outputs,
//! calls the backend, stores the text under its output key and emits a
//! `StageOutput` before the next stage starts. The first failure ends the run.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use contracts::{
    GenerationError, GenerationRequest, PipelineState, SessionParameters, StageDefinition,
    StageOutput, StageOverride, TemplateError, TextGenerator, TutorConfig, TutorError,
    DEFAULT_MODEL, DEFAULT_STAGE_TIMEOUT_SECS, DEFAULT_TEMPERATURE,
};
use futures::Stream;
use observability::{record_generation_error, record_stage_completed};
use tracing::{debug, info, warn};

use crate::stages::tutor_stages;
use crate::template::Template;
use crate::validation::{validate_overrides, validate_stages};

/// Backend parameters applied to every stage
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Default model identifier
    pub model: String,

    /// Default sampling temperature
    pub temperature: f64,

    /// Default completion token limit
    pub max_tokens: Option<u32>,

    /// Per-stage timeout (None = wait indefinitely)
    pub stage_timeout: Option<Duration>,

    /// Per-stage overrides keyed by stage name
    pub overrides: BTreeMap<String, StageOverride>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            stage_timeout: Some(Duration::from_secs(DEFAULT_STAGE_TIMEOUT_SECS)),
            overrides: BTreeMap::new(),
        }
    }
}

impl From<&TutorConfig> for PipelineConfig {
    fn from(config: &TutorConfig) -> Self {
        Self {
            model: config.backend.model.clone(),
            temperature: config.backend.temperature,
            max_tokens: config.backend.max_tokens,
            stage_timeout: Some(Duration::from_secs(config.backend.stage_timeout_secs)),
            overrides: config.stages.clone(),
        }
    }
}

impl PipelineConfig {
    /// Resolve `(model, temperature, max_tokens)` for a stage
    pub fn settings_for(&self, stage: &str) -> (String, f64, Option<u32>) {
        let stage_override = self.overrides.get(stage);
        let model = stage_override
            .and_then(|o| o.model.clone())
            .unwrap_or_else(|| self.model.clone());
        let temperature = stage_override
            .and_then(|o| o.temperature)
            .unwrap_or(self.temperature);
        let max_tokens = stage_override
            .and_then(|o| o.max_tokens)
            .or(self.max_tokens);
        (model, temperature, max_tokens)
    }
}

/// Stage with templates parsed once at construction
#[derive(Debug)]
struct CompiledStage {
    definition: StageDefinition,
    template: Template,
    system: Option<Template>,
}

impl CompiledStage {
    fn compile(definition: StageDefinition) -> Result<Self, TutorError> {
        let template = Template::parse(&definition.template)
            .map_err(|e| TutorError::template(&definition.name, e))?;
        let system = definition
            .system_template
            .as_deref()
            .map(Template::parse)
            .transpose()
            .map_err(|e| TutorError::template(&definition.name, e))?;
        Ok(Self {
            definition,
            template,
            system,
        })
    }
}

/// Main pipeline orchestrator
///
/// Holds the validated stage table, the backend and the backend parameters.
/// Every call to [`Pipeline::run`] / [`Pipeline::start`] begins a fresh run
/// with empty state.
pub struct Pipeline<G> {
    stages: Arc<[CompiledStage]>,
    generator: Arc<G>,
    config: Arc<PipelineConfig>,
}

impl<G> Clone for Pipeline<G> {
    fn clone(&self) -> Self {
        Self {
            stages: Arc::clone(&self.stages),
            generator: Arc::clone(&self.generator),
            config: Arc::clone(&self.config),
        }
    }
}

impl<G: TextGenerator + Sync + 'static> Pipeline<G> {
    /// Create a pipeline over the built-in tutoring stages
    ///
    /// # Errors
    /// Stage table or override validation failure.
    pub fn new(generator: G, config: PipelineConfig) -> Result<Self, TutorError> {
        Self::with_stages(generator, config, tutor_stages())
    }

    /// Create a pipeline over a custom stage table
    ///
    /// # Errors
    /// `TemplateError`, `DuplicateOutputError` or a configuration error when
    /// the table is inconsistent.
    pub fn with_stages(
        generator: G,
        config: PipelineConfig,
        stages: Vec<StageDefinition>,
    ) -> Result<Self, TutorError> {
        validate_stages(&stages)?;
        validate_overrides(&stages, &config.overrides)?;

        let compiled = stages
            .into_iter()
            .map(CompiledStage::compile)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            stages = compiled.len(),
            backend = generator.name(),
            model = %config.model,
            "Pipeline stage table validated"
        );

        Ok(Self {
            stages: compiled.into(),
            generator: Arc::new(generator),
            config: Arc::new(config),
        })
    }

    /// Stage definitions in execution order
    pub fn stages(&self) -> impl Iterator<Item = &StageDefinition> {
        self.stages.iter().map(|stage| &stage.definition)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn generator(&self) -> &G {
        &self.generator
    }

    /// Begin a run; drive it with [`PipelineRun::next_stage`]
    pub fn start(&self, params: SessionParameters) -> PipelineRun<G> {
        info!(
            topic = %params.topic,
            course = %params.course,
            expertise = %params.course_expertise,
            stages = self.stages.len(),
            "Pipeline run started"
        );

        PipelineRun {
            stages: Arc::clone(&self.stages),
            generator: Arc::clone(&self.generator),
            config: Arc::clone(&self.config),
            params,
            state: PipelineState::new(),
            cursor: 0,
            finished: false,
            started: Instant::now(),
        }
    }

    /// Lazy sequence of stage outputs
    ///
    /// Yields one item per completed stage. A failure is yielded as the last
    /// item and no further stages run.
    pub fn run(
        &self,
        params: SessionParameters,
    ) -> impl Stream<Item = Result<StageOutput, TutorError>> + Send {
        self.start(params).into_stream()
    }
}

/// A single, non-restartable pipeline run
pub struct PipelineRun<G> {
    stages: Arc<[CompiledStage]>,
    generator: Arc<G>,
    config: Arc<PipelineConfig>,
    params: SessionParameters,
    state: PipelineState,
    cursor: usize,
    finished: bool,
    started: Instant,
}

impl<G: TextGenerator + Sync + 'static> PipelineRun<G> {
    /// Execute the next stage
    ///
    /// Returns `None` once every stage completed or after the first error.
    pub async fn next_stage(&mut self) -> Option<Result<StageOutput, TutorError>> {
        if self.finished {
            return None;
        }

        let stages = Arc::clone(&self.stages);
        let Some(stage) = stages.get(self.cursor) else {
            self.finished = true;
            info!(
                stages = self.state.len(),
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "Pipeline run completed"
            );
            return None;
        };

        let index = self.cursor + 1;
        match self.execute(index, stage).await {
            Ok(output) => {
                self.cursor += 1;
                Some(Ok(output))
            }
            Err(err) => {
                self.finished = true;
                warn!(
                    stage = %stage.definition.name,
                    completed = self.state.len(),
                    error = %err,
                    "Pipeline halted"
                );
                Some(Err(err))
            }
        }
    }

    /// Convert into a stream of stage outputs
    pub fn into_stream(self) -> impl Stream<Item = Result<StageOutput, TutorError>> + Send {
        futures::stream::unfold(self, |mut run| async move {
            let item = run.next_stage().await;
            item.map(|item| (item, run))
        })
    }

    /// Outputs produced so far (still available after a failure)
    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn into_state(self) -> PipelineState {
        self.state
    }

    pub fn params(&self) -> &SessionParameters {
        &self.params
    }

    /// Number of stages completed so far
    pub fn completed(&self) -> usize {
        self.cursor
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Render, invoke, store
    async fn execute(
        &mut self,
        index: usize,
        stage: &CompiledStage,
    ) -> Result<StageOutput, TutorError> {
        let definition = &stage.definition;
        let started = Instant::now();

        let request = self.render(stage)?;
        debug!(
            stage = %definition.name,
            index,
            model = %request.model,
            prompt_chars = request.prompt.len(),
            "Invoking backend"
        );

        let text = self.invoke(&request).await.map_err(|e| {
            record_generation_error(&definition.name, e.kind());
            TutorError::generation(&definition.name, e)
        })?;

        self.state.insert(&definition.output_key, text.clone())?;

        let elapsed = started.elapsed();
        record_stage_completed(&definition.name, elapsed, request.prompt.len(), text.len());
        info!(
            stage = %definition.name,
            index,
            elapsed_ms = elapsed.as_millis() as u64,
            response_chars = text.len(),
            "Stage completed"
        );

        Ok(StageOutput {
            index,
            stage: definition.name.clone(),
            title: definition.title.clone(),
            output_key: definition.output_key.clone(),
            text,
            elapsed,
        })
    }

    /// Bind only the stage's declared inputs, then render both templates
    fn render(&self, stage: &CompiledStage) -> Result<GenerationRequest, TutorError> {
        let definition = &stage.definition;

        let mut bindings: HashMap<&str, &str> = HashMap::new();
        for input in &definition.required_inputs {
            let value = self
                .params
                .get(input)
                .or_else(|| self.state.get(input))
                .ok_or_else(|| {
                    TutorError::template(
                        &definition.name,
                        TemplateError::Unbound {
                            placeholder: input.clone(),
                        },
                    )
                })?;
            bindings.insert(input.as_str(), value);
        }

        let prompt = stage
            .template
            .render(&bindings)
            .map_err(|e| TutorError::template(&definition.name, e))?;
        let system = stage
            .system
            .as_ref()
            .map(|template| template.render(&bindings))
            .transpose()
            .map_err(|e| TutorError::template(&definition.name, e))?;

        let (model, temperature, max_tokens) = self.config.settings_for(&definition.name);

        Ok(GenerationRequest {
            stage: definition.name.clone(),
            system,
            prompt,
            model,
            temperature,
            max_tokens,
        })
    }

    /// Call the backend under the per-stage timeout
    async fn invoke(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        match self.config.stage_timeout {
            Some(limit) => match tokio::time::timeout(limit, self.generator.generate(request)).await
            {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout {
                    elapsed_ms: limit.as_millis() as u64,
                }),
            },
            None => self.generator.generate(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use llm_client::EchoGenerator;

    use crate::stages::STAGE_ORDER;

    fn params() -> SessionParameters {
        SessionParameters {
            course: "Data Analytics".into(),
            background: "Software Engineering".into(),
            name: "Raj".into(),
            topic: "p-values".into(),
            primary_language: "English".into(),
            course_expertise: "Novice".into(),
        }
    }

    #[tokio::test]
    async fn test_runs_all_stages_in_order() {
        let generator = EchoGenerator::new();
        let pipeline = Pipeline::new(generator.clone(), PipelineConfig::default()).unwrap();

        let outputs: Vec<_> = pipeline.run(params()).collect().await;

        assert_eq!(outputs.len(), 6);
        let names: Vec<_> = outputs
            .iter()
            .map(|o| o.as_ref().unwrap().stage.as_str())
            .collect();
        assert_eq!(names, STAGE_ORDER.to_vec());
        assert_eq!(generator.invoked_stages(), STAGE_ORDER.to_vec());
    }

    #[tokio::test]
    async fn test_outputs_thread_into_later_prompts() {
        let generator = EchoGenerator::new();
        let pipeline = Pipeline::new(generator.clone(), PipelineConfig::default()).unwrap();

        let mut run = pipeline.start(params());
        let intro = run.next_stage().await.unwrap().unwrap();
        let key_concepts = run.next_stage().await.unwrap().unwrap();

        let calls = generator.calls();
        assert_eq!(intro.text, format!("Intro:{}", calls[0].prompt.len()));
        assert_eq!(
            key_concepts.text,
            format!("KeyConcepts:{}", calls[1].prompt.len())
        );
        assert!(calls[1].prompt.contains(&intro.text));
        assert_eq!(run.state().get("intro_response"), Some(intro.text.as_str()));
    }

    #[tokio::test]
    async fn test_intro_system_prompt_rendered() {
        let generator = EchoGenerator::new();
        let pipeline = Pipeline::new(generator.clone(), PipelineConfig::default()).unwrap();

        let mut run = pipeline.start(params());
        run.next_stage().await.unwrap().unwrap();

        let system = generator.calls()[0].system.clone().unwrap();
        assert!(system.contains("Raj"));
        assert!(system.contains("Novice"));
        assert!(!system.contains('{'));
    }

    #[tokio::test]
    async fn test_failure_halts_run() {
        let generator = EchoGenerator::failing_at(
            "Application",
            GenerationError::RateLimited {
                message: "quota".into(),
            },
        );
        let pipeline = Pipeline::new(generator.clone(), PipelineConfig::default()).unwrap();

        let mut run = pipeline.start(params());
        assert!(run.next_stage().await.unwrap().is_ok());
        assert!(run.next_stage().await.unwrap().is_ok());

        let err = run.next_stage().await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            TutorError::Generation { ref stage, source: GenerationError::RateLimited { .. } }
                if stage == "Application"
        ));

        assert!(run.next_stage().await.is_none());
        assert!(run.is_finished());
        assert_eq!(run.completed(), 2);
        assert_eq!(run.state().len(), 2);
        assert_eq!(generator.call_count(), 3);
    }

    #[tokio::test]
    async fn test_stage_timeout() {
        let generator = EchoGenerator::new().with_delay(Duration::from_millis(200));
        let config = PipelineConfig {
            stage_timeout: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        let pipeline = Pipeline::new(generator, config).unwrap();

        let outputs: Vec<_> = pipeline.run(params()).collect().await;
        assert_eq!(outputs.len(), 1);
        let err = outputs.into_iter().next().unwrap().unwrap_err();
        assert!(err.as_generation().is_some_and(GenerationError::is_timeout));
    }

    #[tokio::test]
    async fn test_stage_overrides_applied() {
        let generator = EchoGenerator::new();
        let mut config = PipelineConfig {
            model: "base-model".into(),
            max_tokens: Some(300),
            ..Default::default()
        };
        config.overrides.insert(
            "Visualize".into(),
            StageOverride {
                model: Some("gpt-4".into()),
                temperature: Some(0.2),
                max_tokens: None,
            },
        );
        let pipeline = Pipeline::new(generator.clone(), config).unwrap();
        let _: Vec<_> = pipeline.run(params()).collect().await;

        let calls = generator.calls();
        assert_eq!(calls[0].model, "base-model");
        assert_eq!(calls[0].temperature, DEFAULT_TEMPERATURE);
        assert_eq!(calls[5].model, "gpt-4");
        assert_eq!(calls[5].temperature, 0.2);
        assert_eq!(calls[5].max_tokens, Some(300));
    }

    #[test]
    fn test_unknown_override_rejected() {
        let mut config = PipelineConfig::default();
        config
            .overrides
            .insert("Summary".into(), StageOverride::default());
        assert!(Pipeline::new(EchoGenerator::new(), config).is_err());
    }

    #[test]
    fn test_config_from_tutor_config() {
        let mut tutor = TutorConfig::default();
        tutor.backend.model = "gpt-4".into();
        tutor.backend.stage_timeout_secs = 45;
        let config = PipelineConfig::from(&tutor);
        assert_eq!(config.model, "gpt-4");
        assert_eq!(config.stage_timeout, Some(Duration::from_secs(45)));
    }

    #[test]
    fn test_settings_for_falls_back_per_field() {
        let mut config = PipelineConfig {
            max_tokens: Some(512),
            ..Default::default()
        };
        config.overrides.insert(
            "Analyze".into(),
            StageOverride {
                temperature: Some(0.1),
                ..Default::default()
            },
        );

        let (model, temperature, max_tokens) = config.settings_for("Analyze");
        assert_eq!(model, config.model);
        assert_eq!(temperature, 0.1);
        assert_eq!(max_tokens, Some(512));

        let (_, temperature, _) = config.settings_for("Intro");
        assert_eq!(temperature, config.temperature);
    }
}
