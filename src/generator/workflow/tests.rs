#[cfg(test)]
mod tests {
    use crate::config::{Config, SectionSpec};
    use crate::generator::context::GeneratorContext;
    use crate::generator::errors::PipelineError;
    use crate::generator::events::{EventSink, ResearchEvent};
    use crate::generator::types::SummaryStatus;
    use crate::generator::workflow::{TimingKeys, TimingScope, build_report, run};
    use crate::llm::{LLMClient, LanguageModel};
    use crate::web::{SearchHit, WebSource};

    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// 按提示词内容返回脚本化回复的模型
    #[derive(Default)]
    struct ScriptedModel {
        fail_vectors: bool,
        failing_sections: Vec<&'static str>,
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, _model: &str, _system: &str, user_prompt: &str) -> Result<String> {
            if user_prompt.contains("Reply with the single word") {
                return Ok("ready".to_string());
            }
            if user_prompt.contains("distinct market research queries") {
                if self.fail_vectors {
                    return Err(anyhow!("429 rate limited"));
                }
                return Ok(r#"["widget demand", "widget rivals"]"#.to_string());
            }
            if user_prompt.starts_with("Summarize verified intelligence for: ") {
                let query = user_prompt
                    .trim_start_matches("Summarize verified intelligence for: ")
                    .split('.')
                    .next()
                    .unwrap_or_default();
                return Ok(format!("Intel about {} [1].", query));
            }
            if user_prompt.contains("generate visualization data") {
                return Ok(r#"{"swot": {"Strengths": 7}}"#.to_string());
            }
            if let Some(title) = self
                .failing_sections
                .iter()
                .find(|title| user_prompt.contains(&format!("write the '{}' section", title)))
            {
                return Err(anyhow!("section {} exploded", title));
            }
            if user_prompt.contains("section of a report for") {
                return Ok("Section body grounded in research.".to_string());
            }
            Err(anyhow!("unexpected prompt"))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    /// 预设搜索结果和网页内容的检索源
    #[derive(Default)]
    struct ScriptedWeb {
        hits: HashMap<String, Vec<SearchHit>>,
        pages: HashMap<String, String>,
    }

    impl ScriptedWeb {
        fn with_hits(mut self, query: &str, urls: &[&str]) -> Self {
            self.hits.insert(
                query.to_string(),
                urls.iter()
                    .map(|url| SearchHit {
                        url: url.to_string(),
                        title: format!("Title of {}", url),
                    })
                    .collect(),
            );
            self
        }

        fn with_page(mut self, url: &str, text: &str) -> Self {
            self.pages.insert(url.to_string(), text.to_string());
            self
        }
    }

    #[async_trait]
    impl WebSource for ScriptedWeb {
        async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>> {
            match self.hits.get(query) {
                Some(hits) => Ok(hits.iter().take(max_results).cloned().collect()),
                None => Err(anyhow!("search backend unavailable")),
            }
        }

        async fn fetch_text(&self, url: &str) -> Result<String> {
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| anyhow!("HTTP 404 for {}", url))
        }
    }

    fn test_config(temp_dir: &TempDir) -> Config {
        let mut config = Config {
            topic: "Widgets".to_string(),
            output_path: temp_dir.path().join("Widgets_Report"),
            ..Default::default()
        };
        config.llm.retry_attempts = 2;
        config.llm.retry_delay_ms = 0;
        config.llm.model_primary = "primary".to_string();
        config.llm.model_fallback = "fallback".to_string();
        config.web.retry_attempts = 1;
        config.web.retry_delay_ms = 0;
        config.research.num_vectors = 2;
        config
    }

    fn context_with(config: Config, model: ScriptedModel, web: ScriptedWeb) -> GeneratorContext {
        let llm_client = LLMClient::with_model(config.llm.clone(), Arc::new(model));
        GeneratorContext::with_backends(config, llm_client, Arc::new(web))
    }

    fn healthy_web() -> ScriptedWeb {
        ScriptedWeb::default()
            .with_hits("widget demand", &["https://a.example", "https://b.example"])
            .with_hits("widget rivals", &["https://c.example"])
            .with_page("https://a.example", "Widget demand rose 12% in 2025.")
            .with_page("https://b.example", "Analysts expect continued growth.")
            .with_page("https://c.example", "Acme and Globex dominate the market.")
    }

    #[tokio::test]
    async fn test_run_writes_markdown_report() {
        let temp_dir = TempDir::new().unwrap();
        let context = context_with(
            test_config(&temp_dir),
            ScriptedModel::default(),
            healthy_web(),
        );

        let output = run(&context).await.unwrap();

        assert_eq!(output, temp_dir.path().join("Widgets_Report.md"));
        let markdown = std::fs::read_to_string(&output).unwrap();
        assert!(markdown.starts_with("# Pegasus Intelligence Report: Widgets\n\n"));
        for spec in &context.config.report.sections {
            assert!(markdown.contains(&format!("## {}\n\n", spec.title)));
        }
        assert!(markdown.contains("### 1. widget demand"));
        assert!(markdown.contains("| Strengths | 7 |"));
    }

    #[tokio::test]
    async fn test_failing_section_becomes_placeholder() {
        let temp_dir = TempDir::new().unwrap();
        let model = ScriptedModel {
            failing_sections: vec!["SWOT Analysis"],
            ..Default::default()
        };
        let context = context_with(test_config(&temp_dir), model, healthy_web());

        let report = build_report(&context, &mut TimingScope::new()).await.unwrap();

        assert_eq!(report.sections.len(), 7);
        let swot = &report.sections[1];
        assert!(swot.degraded);
        assert!(swot.content.starts_with("*Section generation failed: "));
        assert_eq!(report.degraded_sections(), 1);
        assert!(!report.sections[0].degraded);
    }

    #[tokio::test]
    async fn test_failed_fetch_skips_only_that_source() {
        let temp_dir = TempDir::new().unwrap();
        let web = ScriptedWeb::default()
            .with_hits("widget demand", &["https://a.example", "https://dead.example"])
            .with_hits("widget rivals", &["https://c.example"])
            .with_page("https://a.example", "Widget demand rose 12% in 2025.")
            .with_page("https://c.example", "Acme and Globex dominate the market.");
        let context = context_with(test_config(&temp_dir), ScriptedModel::default(), web);

        let report = build_report(&context, &mut TimingScope::new()).await.unwrap();

        let demand = &report.vectors[0];
        assert_eq!(demand.status, SummaryStatus::Synthesized);
        assert_eq!(demand.citations.len(), 1);
        assert_eq!(demand.citations[0].url, "https://a.example");
        assert_eq!(demand.summary, "Intel about widget demand [1].");
    }

    #[tokio::test]
    async fn test_failed_search_yields_placeholder_summary() {
        let temp_dir = TempDir::new().unwrap();
        let web = ScriptedWeb::default()
            .with_hits("widget demand", &["https://a.example"])
            .with_page("https://a.example", "Widget demand rose 12% in 2025.");
        let context = context_with(test_config(&temp_dir), ScriptedModel::default(), web);

        let report = build_report(&context, &mut TimingScope::new()).await.unwrap();

        assert_eq!(report.vectors.len(), 2);
        assert_eq!(report.vectors[0].status, SummaryStatus::Synthesized);
        assert_eq!(report.vectors[1].vector.query, "widget rivals");
        assert_eq!(report.vectors[1].status, SummaryStatus::Placeholder);
        assert!(report.vectors[1].citations.is_empty());
        assert_eq!(report.sections.len(), 7);
    }

    #[tokio::test]
    async fn test_vector_generation_exhaustion_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let model = ScriptedModel {
            fail_vectors: true,
            ..Default::default()
        };
        let context = context_with(test_config(&temp_dir), model, healthy_web());

        let err = run(&context).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoResearchVectors(_))
        ));
        assert!(!temp_dir.path().join("Widgets_Report.md").exists());
    }

    #[tokio::test]
    async fn test_empty_topic_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.topic = "   ".to_string();
        let context = context_with(config, ScriptedModel::default(), healthy_web());

        let err = run(&context).await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::EmptyTopic)
        ));
    }

    #[tokio::test]
    async fn test_events_stream_progress_to_completion() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.report.sections = vec![SectionSpec::new("Executive Summary", "Summarize.")];
        let (sink, mut rx) = EventSink::channel();
        let context =
            context_with(config, ScriptedModel::default(), healthy_web()).with_events(sink);

        let output = run(&context).await.unwrap();
        drop(context);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(
            events.first(),
            Some(&ResearchEvent::Deployed {
                topic: "Widgets".to_string()
            })
        );
        assert_eq!(events.last(), Some(&ResearchEvent::Finished { output }));
        assert!(events.contains(&ResearchEvent::Progress(50)));
        assert!(events.contains(&ResearchEvent::Progress(90)));
        assert!(events.contains(&ResearchEvent::Progress(100)));
        assert!(events.iter().any(|e| matches!(
            e,
            ResearchEvent::SourceFound { vector_index: 2, url } if url == "https://c.example"
        )));

        let progress: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                ResearchEvent::Progress(p) => Some(*p),
                _ => None,
            })
            .collect();
        assert!(progress.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test]
    async fn test_charts_can_be_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        config.research.include_charts = false;
        let context = context_with(config, ScriptedModel::default(), healthy_web());

        let report = build_report(&context, &mut TimingScope::new()).await.unwrap();

        assert!(report.chart_data.is_none());
    }

    #[test]
    fn test_timing_scope_records_phases() {
        let mut timing = TimingScope::new();
        timing.start_phase(TimingKeys::RESEARCH);
        std::thread::sleep(Duration::from_millis(5));
        let duration = timing.end_phase(TimingKeys::RESEARCH).unwrap();

        assert!(duration >= Duration::from_millis(5));
        assert!(timing.end_phase(TimingKeys::COMPOSE).is_none());
        assert_eq!(timing.get_phase_durations().len(), 1);

        let report = timing.generate_timing_report();
        assert!(report.contains("总执行时间"));
        assert!(report.contains("- research: "));
        assert!(!report.contains("- compose: "));
    }
}
