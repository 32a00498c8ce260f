//! # Integration Tests
//!
//! End-to-end flows across crates.
//!
//! Covers:
//! - contract smoke tests
//! - config file -> pipeline -> echo backend
//! - pipeline -> HTTP backend against a mock server

#[cfg(test)]
mod contract_tests {
    #[test]
    fn test_stage_table_matches_stage_order() {
        let stages = orchestrator::tutor_stages();
        let names: Vec<_> = stages.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, orchestrator::STAGE_ORDER.to_vec());
        assert!(orchestrator::validate_stages(&stages).is_ok());
    }

    #[test]
    fn test_stage_outputs_never_shadow_parameters() {
        for stage in orchestrator::tutor_stages() {
            assert!(!contracts::SessionParameters::is_parameter(&stage.output_key));
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::time::Duration;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{
        GenerationError, SessionParameters, StageOutput, TutorError, PARAMETER_NAMES,
    };
    use futures::StreamExt;
    use llm_client::EchoGenerator;
    use orchestrator::{Pipeline, PipelineConfig, Template, STAGE_ORDER};

    const CONFIG: &str = r#"
version = "V1"

[backend]
model = "gpt-4-1106-preview"
temperature = 0.7
stage_timeout_secs = 30

[session]
course = "Data Analytics"
background = "Software Engineering"
name = "Raj"
topic = "p-values"
primary_language = "English"
course_expertise = "Novice"

[stages.Visualize]
model = "gpt-4"
"#;

    async fn collect(pipeline: &Pipeline<EchoGenerator>) -> Vec<Result<StageOutput, TutorError>> {
        pipeline.run(SessionParameters::default()).collect().await
    }

    /// Config file -> Pipeline -> EchoGenerator
    #[tokio::test]
    async fn test_e2e_echo_pipeline_from_config() {
        let config = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let generator = EchoGenerator::new();
        let pipeline = Pipeline::new(generator.clone(), PipelineConfig::from(&config)).unwrap();

        let outputs: Vec<StageOutput> = pipeline
            .run(config.session.clone())
            .map(|r| r.unwrap())
            .collect()
            .await;

        let stages: Vec<_> = outputs.iter().map(|o| o.stage.as_str()).collect();
        assert_eq!(stages, STAGE_ORDER.to_vec());
        let indices: Vec<_> = outputs.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4, 5, 6]);

        // Each stage's reply is "<stage>:<prompt length>"
        let calls = generator.calls();
        for (output, request) in outputs.iter().zip(&calls) {
            assert_eq!(output.text, EchoGenerator::reply_for(request));
        }
        assert_eq!(calls[5].model, "gpt-4");
        assert_eq!(calls[4].model, "gpt-4-1106-preview");
    }

    /// Every prompt carries the literal values of its required inputs
    #[tokio::test]
    async fn test_prompts_contain_required_inputs() {
        let generator = EchoGenerator::new();
        let pipeline = Pipeline::new(generator.clone(), PipelineConfig::default()).unwrap();
        let params = SessionParameters::default();

        let mut run = pipeline.start(params.clone());
        while let Some(result) = run.next_stage().await {
            result.unwrap();
        }
        let state = run.into_state();

        let definitions: Vec<_> = pipeline.stages().cloned().collect();
        let output_keys: Vec<&str> = definitions.iter().map(|d| d.output_key.as_str()).collect();
        for (definition, request) in definitions.iter().zip(generator.calls()) {
            let rendered = match &request.system {
                Some(system) => format!("{system}\n{}", request.prompt),
                None => request.prompt.clone(),
            };
            for input in &definition.required_inputs {
                let value = params
                    .get(input)
                    .or_else(|| state.get(input))
                    .unwrap();
                assert!(
                    rendered.contains(value),
                    "{} prompt is missing {input}",
                    definition.name
                );
            }
            let texts = std::iter::once(&request.prompt).chain(request.system.as_ref());
            for text in texts {
                for name in PARAMETER_NAMES.iter().copied().chain(output_keys.iter().copied()) {
                    let placeholder = format!("{{{name}}}");
                    assert!(
                        !text.contains(&placeholder),
                        "{} left {placeholder} unrendered",
                        definition.name
                    );
                }
                let reparsed = Template::parse(text).unwrap();
                assert!(reparsed.placeholders().is_empty(), "{}", definition.name);
            }
        }
    }

    /// Raj / p-values with the echo backend
    #[tokio::test]
    async fn test_echo_scenario_threads_intro() {
        let generator = EchoGenerator::new();
        let pipeline = Pipeline::new(generator.clone(), PipelineConfig::default()).unwrap();

        let outputs = collect(&pipeline).await;
        let intro = outputs[0].as_ref().unwrap();
        let key_concepts = outputs[1].as_ref().unwrap();
        let calls = generator.calls();

        assert_eq!(intro.stage, "Intro");
        assert_eq!(intro.text, format!("Intro:{}", calls[0].prompt.len()));
        assert_eq!(key_concepts.stage, "KeyConcepts");
        assert_eq!(
            key_concepts.text,
            format!("KeyConcepts:{}", calls[1].prompt.len())
        );
        assert!(calls[1].prompt.contains(&intro.text));
        assert!(calls[0].prompt.contains("p-values"));
    }

    /// Failure at stage k: k-1 outputs, then the error, then nothing
    #[tokio::test]
    async fn test_failure_at_each_stage() {
        for (k, stage) in STAGE_ORDER.iter().enumerate() {
            let generator = EchoGenerator::failing_at(
                *stage,
                GenerationError::Transport {
                    message: "connection reset".into(),
                },
            );
            let pipeline = Pipeline::new(generator.clone(), PipelineConfig::default()).unwrap();

            let outputs = collect(&pipeline).await;

            assert_eq!(outputs.len(), k + 1, "failing at {stage}");
            assert!(outputs[..k].iter().all(Result::is_ok));
            let err = outputs[k].as_ref().unwrap_err();
            assert!(matches!(
                err.as_generation(),
                Some(GenerationError::Transport { .. })
            ));
            assert_eq!(generator.call_count(), k + 1);
        }
    }

    /// Two runs with the same inputs produce the same sequence
    #[tokio::test]
    async fn test_runs_are_idempotent() {
        let pipeline = Pipeline::new(EchoGenerator::new(), PipelineConfig::default()).unwrap();

        let texts = |outputs: Vec<Result<StageOutput, TutorError>>| -> Vec<(String, String)> {
            outputs
                .into_iter()
                .map(|r| r.unwrap())
                .map(|o| (o.stage, o.text))
                .collect()
        };

        let first = texts(collect(&pipeline).await);
        let second = texts(collect(&pipeline).await);
        assert_eq!(first.len(), 6);
        assert_eq!(first, second);
    }

    /// Partial outputs stay readable after a timeout
    #[tokio::test]
    async fn test_timeout_keeps_partial_state() {
        let config = PipelineConfig {
            stage_timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let pipeline =
            Pipeline::new(EchoGenerator::new().with_delay(Duration::from_millis(500)), config)
                .unwrap();

        let mut run = pipeline.start(SessionParameters::default());
        let err = run.next_stage().await.unwrap().unwrap_err();
        assert!(matches!(
            err,
            TutorError::Generation {
                source: GenerationError::Timeout { elapsed_ms: 50 },
                ..
            }
        ));
        assert!(run.next_stage().await.is_none());
        assert!(run.state().is_empty());
    }
}

#[cfg(test)]
mod http_tests {
    use futures::StreamExt;
    use llm_client::{OpenAiClient, OpenAiConfig};
    use mockito::{Matcher, Server};
    use orchestrator::{Pipeline, PipelineConfig};

    use contracts::{GenerationError, SessionParameters, TutorError};

    fn client_for(server: &Server) -> OpenAiClient {
        OpenAiClient::new(OpenAiConfig::new(server.url(), "sk-test")).unwrap()
    }

    /// Pipeline -> OpenAiClient -> mock chat-completions server
    #[tokio::test]
    async fn test_e2e_http_pipeline() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"section text"}}]}"#)
            .expect(6)
            .create_async()
            .await;

        let pipeline = Pipeline::new(client_for(&server), PipelineConfig::default()).unwrap();
        let outputs: Vec<_> = pipeline.run(SessionParameters::default()).collect().await;

        assert_eq!(outputs.len(), 6);
        for output in &outputs {
            assert_eq!(output.as_ref().unwrap().text, "section text");
        }
        mock.assert_async().await;
    }

    /// The tutor persona is sent as the system message of the first stage
    #[tokio::test]
    async fn test_intro_sends_system_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::Regex(r#""role":"system""#.to_string()))
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"intro"}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let pipeline = Pipeline::new(client_for(&server), PipelineConfig::default()).unwrap();
        let mut run = pipeline.start(SessionParameters::default());
        let intro = run.next_stage().await.unwrap().unwrap();

        assert_eq!(intro.text, "intro");
        mock.assert_async().await;
    }

    /// A rejected credential halts the run at the first stage
    #[tokio::test]
    async fn test_auth_failure_halts_pipeline() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .with_body(r#"{"error":{"message":"Incorrect API key provided"}}"#)
            .expect(1)
            .create_async()
            .await;

        let pipeline = Pipeline::new(client_for(&server), PipelineConfig::default()).unwrap();
        let outputs: Vec<_> = pipeline.run(SessionParameters::default()).collect().await;

        assert_eq!(outputs.len(), 1);
        let err = outputs.into_iter().next().unwrap().unwrap_err();
        assert!(matches!(
            err,
            TutorError::Generation { ref stage, source: GenerationError::Auth { .. } }
                if stage == "Intro"
        ));
        mock.assert_async().await;
    }
}
