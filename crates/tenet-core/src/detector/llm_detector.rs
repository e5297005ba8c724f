//! Contradiction detector backed by an LLM.

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use std::sync::Arc;
use std::time::Duration;

use super::json_parser::{parse_batch_results, parse_check_result};
use super::prompts;
use crate::config::DetectorConfig;
use crate::error::{TenetError, TenetResult};
use crate::traits::{ContradictionDetector, GenerationOptions, Llm};
use crate::types::{
    BatchContradictionResult, ContradictionCheckResult, ContradictionContext, ExistingItemForCheck,
    Message,
};

const UNPARSEABLE: &str = "Detector response could not be parsed";

/// Asks an LLM whether a new statement makes existing ones obsolete.
///
/// Transient LLM failures are retried with exponential backoff and then
/// returned as errors. Output the model got wrong (unparseable JSON, omitted
/// items) degrades to zero-confidence "no contradiction" results, which the
/// engine's threshold discards.
pub struct LlmContradictionDetector {
    llm: Arc<dyn Llm>,
    config: DetectorConfig,
}

impl LlmContradictionDetector {
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self::with_config(llm, DetectorConfig::default())
    }

    pub fn with_config(llm: Arc<dyn Llm>, config: DetectorConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    fn options(&self, json_object: bool) -> GenerationOptions {
        let options = GenerationOptions::judgment(self.config.temperature, self.config.max_tokens);
        if json_object && self.llm.supports_json_mode() {
            options.json()
        } else {
            options
        }
    }

    async fn generate(&self, messages: Vec<Message>, options: GenerationOptions) -> TenetResult<String> {
        let policy = &self.config.retry;
        let generate_once = || async {
            self.llm
                .generate(&messages, Some(options.clone()))
                .await
        };

        let response = generate_once
            .retry(
                ExponentialBuilder::default()
                    .with_max_times(policy.max_retries as usize)
                    .with_min_delay(Duration::from_millis(policy.initial_delay_ms))
                    .with_max_delay(Duration::from_millis(policy.max_delay_ms))
                    .with_factor(policy.multiplier),
            )
            .when(|e: &TenetError| e.is_transient())
            .notify(|err: &TenetError, dur: Duration| {
                tracing::warn!(
                    model = self.llm.model_name(),
                    "Contradiction check failed, retrying in {:?}: {}",
                    dur,
                    err
                );
            })
            .await?;

        if let Some(usage) = response.usage {
            tracing::debug!(
                model = self.llm.model_name(),
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Contradiction check completed"
            );
        }
        Ok(response.content.unwrap_or_default())
    }
}

#[async_trait]
impl ContradictionDetector for LlmContradictionDetector {
    async fn check_contradiction(
        &self,
        new_content: &str,
        existing_content: &str,
        context: &ContradictionContext,
    ) -> TenetResult<ContradictionCheckResult> {
        let messages = vec![
            Message::system(prompts::contradiction_system_prompt()),
            Message::user(prompts::build_check_message(new_content, existing_content, context)),
        ];
        let content = self.generate(messages, self.options(true)).await?;

        match parse_check_result(&content) {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable contradiction verdict, treating as no contradiction");
                Ok(ContradictionCheckResult::not_analyzed(UNPARSEABLE))
            }
        }
    }

    async fn batch_check_contradictions(
        &self,
        new_content: &str,
        existing: &[ExistingItemForCheck],
        context: &ContradictionContext,
    ) -> TenetResult<Vec<BatchContradictionResult>> {
        if existing.is_empty() {
            return Ok(Vec::new());
        }

        if existing.len() <= self.config.single_check_max_items {
            let mut results = Vec::with_capacity(existing.len());
            for item in existing {
                let result = self
                    .check_contradiction(new_content, &item.display_text(), context)
                    .await?;
                results.push(BatchContradictionResult::new(item.id.clone(), result));
            }
            return Ok(results);
        }

        let messages = vec![
            Message::system(prompts::batch_contradiction_system_prompt()),
            Message::user(prompts::build_batch_message(new_content, existing, context)),
        ];
        // JSON mode forces an object, but the batch answer is an array
        let content = self.generate(messages, self.options(false)).await?;

        match parse_batch_results(&content, existing) {
            Ok(results) => {
                let flagged = results.iter().filter(|r| r.result.is_contradiction).count();
                tracing::debug!(checked = existing.len(), flagged, "Batched contradiction check complete");
                Ok(results)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable batched verdicts, treating as no contradictions");
                Ok(existing
                    .iter()
                    .map(|item| {
                        BatchContradictionResult::new(
                            item.id.clone(),
                            ContradictionCheckResult::not_analyzed(UNPARSEABLE),
                        )
                    })
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryPolicy;
    use crate::traits::{LlmResponse, ResponseFormat};
    use crate::types::{KnowledgeKind, LifeArea};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays canned responses and records what it was sent.
    struct ScriptedLlm {
        responses: Mutex<VecDeque<TenetResult<LlmResponse>>>,
        calls: Mutex<Vec<(Vec<Message>, Option<GenerationOptions>)>>,
    }

    impl ScriptedLlm {
        fn new(responses: Vec<TenetResult<LlmResponse>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Llm for ScriptedLlm {
        async fn generate(
            &self,
            messages: &[Message],
            options: Option<GenerationOptions>,
        ) -> TenetResult<LlmResponse> {
            self.calls.lock().unwrap().push((messages.to_vec(), options));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TenetError::llm("script exhausted")))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn ctx() -> ContradictionContext {
        ContradictionContext::new(KnowledgeKind::Fact, Some(LifeArea::Relationships))
    }

    fn fast_retry() -> DetectorConfig {
        DetectorConfig {
            retry: RetryPolicy {
                max_retries: 2,
                initial_delay_ms: 1,
                max_delay_ms: 2,
                multiplier: 1.0,
            },
            ..Default::default()
        }
    }

    fn items(n: usize) -> Vec<ExistingItemForCheck> {
        (0..n)
            .map(|i| ExistingItemForCheck {
                id: format!("item-{}", i),
                content: format!("statement {}", i),
                title: None,
            })
            .collect()
    }

    fn ok(text: &str) -> TenetResult<LlmResponse> {
        Ok(LlmResponse::text(text))
    }

    #[tokio::test]
    async fn test_single_check_uses_json_mode_and_low_temperature() {
        let llm = ScriptedLlm::new(vec![ok(
            r#"{"isContradiction": true, "confidence": 0.9, "explanation": "now dating"}"#,
        )]);
        let detector = LlmContradictionDetector::new(llm.clone());

        let result = detector
            .check_contradiction("User is dating", "User is single", &ctx())
            .await
            .unwrap();
        assert!(result.qualifies());

        let calls = llm.calls.lock().unwrap();
        let (messages, options) = &calls[0];
        assert_eq!(messages.len(), 2);
        let options = options.as_ref().unwrap();
        assert_eq!(options.temperature, Some(0.1));
        assert_eq!(options.max_tokens, Some(1000));
        assert!(matches!(options.response_format, Some(ResponseFormat::Json)));
    }

    #[tokio::test]
    async fn test_small_batch_uses_individual_checks() {
        let llm = ScriptedLlm::new(vec![
            ok(r#"{"isContradiction": false, "confidence": 0.9, "explanation": "unrelated"}"#),
            ok(r#"{"isContradiction": true, "confidence": 0.8, "explanation": "replaced"}"#),
        ]);
        let detector = LlmContradictionDetector::new(llm.clone());

        let results = detector
            .batch_check_contradictions("new", &items(2), &ctx())
            .await
            .unwrap();
        assert_eq!(llm.call_count(), 2);
        assert_eq!(results[0].item_id, "item-0");
        assert!(!results[0].result.is_contradiction);
        assert_eq!(results[1].item_id, "item-1");
        assert!(results[1].result.is_contradiction);
    }

    #[tokio::test]
    async fn test_large_batch_uses_one_call() {
        let llm = ScriptedLlm::new(vec![ok(
            r#"[{"itemId": "item-2", "isContradiction": true, "confidence": 0.95, "explanation": "moved"}]"#,
        )]);
        let detector = LlmContradictionDetector::new(llm.clone());

        let results = detector
            .batch_check_contradictions("Lives in Porto", &items(3), &ctx())
            .await
            .unwrap();
        assert_eq!(llm.call_count(), 1);
        assert_eq!(results.len(), 3);
        assert!(results[2].result.qualifies());
        assert_eq!(results[0].result.confidence, 0.0);

        let calls = llm.calls.lock().unwrap();
        assert!(calls[0].1.as_ref().unwrap().response_format.is_none());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_llm() {
        let llm = ScriptedLlm::new(vec![]);
        let detector = LlmContradictionDetector::new(llm.clone());
        let results = detector
            .batch_check_contradictions("new", &[], &ctx())
            .await
            .unwrap();
        assert!(results.is_empty());
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_output_degrades_to_no_contradiction() {
        let llm = ScriptedLlm::new(vec![ok("I would rather not say.")]);
        let detector = LlmContradictionDetector::new(llm);
        let result = detector
            .check_contradiction("a", "b", &ctx())
            .await
            .unwrap();
        assert!(!result.is_contradiction);
        assert_eq!(result.confidence, 0.0);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let llm = ScriptedLlm::new(vec![
            Err(TenetError::rate_limit("slow down")),
            ok(r#"{"isContradiction": false, "confidence": 0.9, "explanation": "fine"}"#),
        ]);
        let detector = LlmContradictionDetector::with_config(llm.clone(), fast_retry());
        let result = detector.check_contradiction("a", "b", &ctx()).await.unwrap();
        assert!(!result.is_contradiction);
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_retries_propagate() {
        let llm = ScriptedLlm::new(vec![
            Err(TenetError::llm("down")),
            Err(TenetError::llm("down")),
            Err(TenetError::llm("down")),
        ]);
        let detector = LlmContradictionDetector::with_config(llm.clone(), fast_retry());
        let err = detector.check_contradiction("a", "b", &ctx()).await.unwrap_err();
        assert!(matches!(err, TenetError::Llm { .. }));
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let llm = ScriptedLlm::new(vec![Err(TenetError::authentication("bad key"))]);
        let detector = LlmContradictionDetector::with_config(llm.clone(), fast_retry());
        let err = detector.check_contradiction("a", "b", &ctx()).await.unwrap_err();
        assert!(matches!(err, TenetError::Authentication { .. }));
        assert_eq!(llm.call_count(), 1);
    }
}
