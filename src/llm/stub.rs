use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::{EngineError, SynthesisEngine};

/// One scripted answer from the stub, optionally delivered after a delay.
#[derive(Debug, Clone)]
pub struct StubReply {
    pub delay: Option<Duration>,
    pub outcome: Result<String, EngineError>,
}

impl StubReply {
    pub fn text(text: impl Into<String>) -> Self {
        StubReply {
            delay: None,
            outcome: Ok(text.into()),
        }
    }

    pub fn error(err: EngineError) -> Self {
        StubReply {
            delay: None,
            outcome: Err(err),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Responder = Box<dyn Fn(&str) -> StubReply + Send + Sync>;

enum Script {
    Queue(VecDeque<StubReply>),
    Cycle(Vec<StubReply>),
    Responder(Responder),
}

/// Deterministic engine for tests and dry runs. Never touches the network.
pub struct StubEngine {
    script: Mutex<Script>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubEngine {
    fn with_script(script: Script) -> Self {
        StubEngine {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Replies in order, then fails with [`EngineError::Exhausted`].
    pub fn scripted(replies: Vec<StubReply>) -> Self {
        Self::with_script(Script::Queue(replies.into()))
    }

    /// Replies in order and starts over when the list runs out.
    pub fn cycling(responses: Vec<String>) -> Self {
        Self::with_script(Script::Cycle(
            responses.into_iter().map(StubReply::text).collect(),
        ))
    }

    /// Computes each reply from the prompt.
    pub fn from_fn(responder: impl Fn(&str) -> StubReply + Send + Sync + 'static) -> Self {
        Self::with_script(Script::Responder(Box::new(responder)))
    }

    /// Always answers with a minimal, structurally valid report.
    pub fn canned() -> Self {
        Self::from_fn(|_| StubReply::text(canned_report_json()))
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self, prompt: &str, call: usize) -> StubReply {
        let mut script = match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match &mut *script {
            Script::Queue(queue) => queue
                .pop_front()
                .unwrap_or_else(|| StubReply::error(EngineError::Exhausted)),
            Script::Cycle(replies) if replies.is_empty() => StubReply::error(EngineError::Exhausted),
            Script::Cycle(replies) => replies[call % replies.len()].clone(),
            Script::Responder(responder) => responder(prompt),
        }
    }
}

#[async_trait]
impl SynthesisEngine for StubEngine {
    fn name(&self) -> &str {
        "stub"
    }

    async fn invoke(&self, prompt: &str) -> Result<String, EngineError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let reply = self.next_reply(prompt, call);
        if let Some(delay) = reply.delay {
            tokio::time::sleep(delay).await;
        }
        reply.outcome
    }
}

/// Smallest report body that passes validation for any story.
pub fn canned_report_json() -> String {
    json!({
        "executiveSummary": "Synthesis was produced by the offline stub engine; no model was consulted.",
        "storyStatus": "DEVELOPING",
        "timeline": [],
        "significance": {
            "level": "MODERATE",
            "reasoning": "No live assessment was performed."
        },
        "entities": [],
        "sources": [],
        "factualBasis": [],
        "informationGaps": ["Live synthesis was not performed for this story."],
        "claims": [],
        "contradictions": []
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_replies_then_exhausts() {
        let engine = StubEngine::scripted(vec![
            StubReply::text("one"),
            StubReply::error(EngineError::RateLimited("slow down".into())),
        ]);
        assert_eq!(engine.invoke("a").await.unwrap(), "one");
        assert!(matches!(
            engine.invoke("b").await,
            Err(EngineError::RateLimited(_))
        ));
        assert_eq!(engine.invoke("c").await, Err(EngineError::Exhausted));
        assert_eq!(engine.call_count(), 3);
        assert_eq!(engine.prompts(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_cycling_wraps_around() {
        let engine = StubEngine::cycling(vec!["x".into(), "y".into()]);
        let mut seen = Vec::new();
        for _ in 0..3 {
            seen.push(engine.invoke("p").await.unwrap());
        }
        assert_eq!(seen, vec!["x", "y", "x"]);
    }

    #[tokio::test]
    async fn test_responder_sees_prompt() {
        let engine = StubEngine::from_fn(|prompt| StubReply::text(prompt.to_uppercase()));
        assert_eq!(engine.invoke("abc").await.unwrap(), "ABC");
    }
}
