use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::application::services::KnowledgeIndex;
use crate::domain::{
    ports::{Cache, CompletionClient},
    CacheKey, GeneratedAnswer, PipelineError, RespondRequest, ScoredChunk,
};

/// Composes cache, knowledge index, and completion client into
/// "answer this query using this knowledge".
///
/// Both external calls are fronted by the cache: retrieval results are keyed
/// on `(query, top_k)`, completions on `(query, context text)`. Cache writes
/// are fire-and-forget; cache read faults degrade to misses. Concurrent
/// identical queries racing the first cache write are serialized by a
/// per-key single-flight guard so the upstream call happens once.
pub struct Responder {
    index: Arc<KnowledgeIndex>,
    completion: Arc<dyn CompletionClient>,
    cache: Arc<dyn Cache>,
    persona_preamble: String,
    top_k: usize,
    retrieval_ttl: Duration,
    completion_ttl: Duration,
    in_flight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// One entry of a batch outcome, pairing the request with its result so
/// callers can report per-item success or failure in input order.
pub struct BatchItem {
    pub request: RespondRequest,
    pub outcome: Result<GeneratedAnswer, PipelineError>,
}

impl Responder {
    pub fn new(
        index: Arc<KnowledgeIndex>,
        completion: Arc<dyn CompletionClient>,
        cache: Arc<dyn Cache>,
        persona_preamble: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            index,
            completion,
            cache,
            persona_preamble: persona_preamble.into(),
            top_k,
            retrieval_ttl: Duration::from_secs(3600),
            completion_ttl: Duration::from_secs(3600),
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_ttls(mut self, retrieval_ttl: Duration, completion_ttl: Duration) -> Self {
        self.retrieval_ttl = retrieval_ttl;
        self.completion_ttl = completion_ttl;
        self
    }

    /// Answers a single request. An empty index (or a downgraded retrieval
    /// failure) still produces an answer from the persona-only prompt;
    /// completion failures and cancellation propagate to the caller.
    #[instrument(skip(self, cancel), fields(query_len = request.query.len()))]
    pub async fn respond(
        &self,
        request: &RespondRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedAnswer, PipelineError> {
        let retrieved = self.cached_retrieval(&request.query, cancel).await?;

        let context = retrieved
            .iter()
            .map(|r| r.chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let text = self
            .cached_completion(&request.query, &context, cancel)
            .await?;

        Ok(GeneratedAnswer::new(
            text,
            retrieved.into_iter().map(|r| r.chunk).collect(),
        ))
    }

    /// Processes independent requests one by one, preserving input order.
    /// A failure in item N does not roll back earlier results and does not
    /// halt item N+1.
    #[instrument(skip(self, requests, cancel), fields(count = requests.len()))]
    pub async fn respond_batch(
        &self,
        requests: &[RespondRequest],
        cancel: &CancellationToken,
    ) -> Vec<BatchItem> {
        let mut items = Vec::with_capacity(requests.len());
        for request in requests {
            let outcome = self.respond(request, cancel).await;
            items.push(BatchItem {
                request: request.clone(),
                outcome,
            });
        }
        items
    }

    async fn cached_retrieval(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let key = CacheKey::retrieval(query, self.top_k);

        if let Some(cached) = self.cache_lookup(&key).await {
            match serde_json::from_str::<Vec<ScoredChunk>>(&cached) {
                Ok(results) => return Ok(results),
                Err(e) => warn!(error = %e, "stale retrieval cache entry, refetching"),
            }
        }

        let results = self
            .suspend_point(cancel, self.index.search(query, self.top_k))
            .await?;

        match serde_json::to_string(&results) {
            Ok(json) => self.cache_store(&key, &json, self.retrieval_ttl).await,
            Err(e) => warn!(error = %e, "could not serialize retrieval result"),
        }

        Ok(results)
    }

    async fn cached_completion(
        &self,
        query: &str,
        context: &str,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let key = CacheKey::completion(query, context);

        if let Some(cached) = self.cache_lookup(&key).await {
            return Ok(cached);
        }

        let guard = self.flight_guard(&key).await;
        let _held = guard.lock().await;

        // Another flight may have finished while we waited for the guard.
        if let Some(cached) = self.cache_lookup(&key).await {
            return Ok(cached);
        }

        let system_prompt = self.build_system_prompt(context);
        let outcome = self
            .suspend_point(cancel, self.completion.complete(&system_prompt, query))
            .await
            .and_then(|r| r);

        if let Ok(text) = &outcome {
            self.cache_store(&key, text, self.completion_ttl).await;
        }
        self.release_flight(&key).await;

        outcome
    }

    /// The instructional preamble establishing the deployment's persona,
    /// with retrieved chunk text appended as reference material.
    fn build_system_prompt(&self, context: &str) -> String {
        if context.is_empty() {
            self.persona_preamble.clone()
        } else {
            format!("{}\n\nReference material:\n{}", self.persona_preamble, context)
        }
    }

    async fn cache_lookup(&self, key: &CacheKey) -> Option<String> {
        match self.cache.get(key).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, kind = key.kind().as_str(), "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn cache_store(&self, key: &CacheKey, value: &str, ttl: Duration) {
        if let Err(e) = self.cache.set(key, value, ttl).await {
            warn!(error = %e, kind = key.kind().as_str(), "cache write failed, continuing");
        }
    }

    /// Suspends at an external-call boundary, resolving early if the
    /// surrounding channel disconnects.
    async fn suspend_point<F>(
        &self,
        cancel: &CancellationToken,
        fut: F,
    ) -> Result<F::Output, PipelineError>
    where
        F: Future,
    {
        cancel
            .run_until_cancelled(fut)
            .await
            .ok_or(PipelineError::Cancelled)
    }

    async fn flight_guard(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut map = self.in_flight.lock().await;
        map.entry(key.storage_key())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn release_flight(&self, key: &CacheKey) {
        let mut map = self.in_flight.lock().await;
        map.remove(&key.storage_key());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::domain::ports::EmbeddingService;
    use crate::domain::{Embedding, KnowledgeChunk};
    use crate::infrastructure::{InMemoryCache, InMemoryVectorStore};

    const PERSONA: &str =
        "You are an intelligent HR assistant. Be concise, accurate, and polite.";

    struct LetterEmbedding;

    #[async_trait]
    impl EmbeddingService for LetterEmbedding {
        async fn embed(&self, text: &str) -> Result<Embedding, PipelineError> {
            let mut counts = vec![0.0f32; 26];
            for c in text.to_ascii_lowercase().bytes() {
                if c.is_ascii_lowercase() {
                    counts[(c - b'a') as usize] += 1.0;
                }
            }
            Ok(Embedding::new(counts))
        }

        async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, PipelineError> {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }

        fn dimension(&self) -> usize {
            26
        }
    }

    /// Counts calls and answers with a fixed string; queries containing
    /// `fail` produce a completion error instead.
    struct StubCompletion {
        calls: AtomicUsize,
        reply: String,
    }

    impl StubCompletion {
        fn new(reply: &str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply: reply.to_string(),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionClient for StubCompletion {
        async fn complete(
            &self,
            _system_prompt: &str,
            user_query: &str,
        ) -> Result<String, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if user_query.contains("fail") {
                return Err(PipelineError::completion("quota exceeded"));
            }
            Ok(self.reply.clone())
        }
    }

    fn empty_index() -> Arc<KnowledgeIndex> {
        Arc::new(KnowledgeIndex::new(
            Arc::new(LetterEmbedding),
            Arc::new(InMemoryVectorStore::new()),
        ))
    }

    fn responder(index: Arc<KnowledgeIndex>, completion: Arc<StubCompletion>) -> Responder {
        Responder::new(
            index,
            completion,
            Arc::new(InMemoryCache::new()),
            PERSONA,
            3,
        )
    }

    #[tokio::test]
    async fn test_empty_index_still_produces_answer() {
        let completion = Arc::new(StubCompletion::new("General guidance only."));
        let responder = responder(empty_index(), completion.clone());

        let answer = responder
            .respond(&RespondRequest::new("What is the PTO policy?"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(answer.text, "General guidance only.");
        assert!(answer.source_chunks.is_empty());
        assert_eq!(completion.call_count(), 1);
    }

    #[tokio::test]
    async fn test_pto_policy_scenario() {
        let index = empty_index();
        index
            .index_chunk(
                &KnowledgeChunk::new("Employees accrue 15 PTO days/year.")
                    .with_tag("type", "policy"),
            )
            .await
            .unwrap();

        let completion = Arc::new(StubCompletion::new(
            "Per company policy, employees accrue 15 PTO days each year.",
        ));
        let responder = responder(index, completion);

        let answer = responder
            .respond(&RespondRequest::new("What is the PTO policy?"), &CancellationToken::new())
            .await
            .unwrap();

        assert!(answer.text.contains("15 PTO days"));
        assert_eq!(answer.source_chunks.len(), 1);
        assert_eq!(
            answer.source_chunks[0].text,
            "Employees accrue 15 PTO days/year."
        );
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let completion = Arc::new(StubCompletion::new("Cached reply."));
        let responder = responder(empty_index(), completion.clone());
        let cancel = CancellationToken::new();
        let request = RespondRequest::new("What is the PTO policy?");

        let first = responder.respond(&request, &cancel).await.unwrap();
        let second = responder.respond(&request, &cancel).await.unwrap();

        assert_eq!(first.text, second.text);
        assert_eq!(completion.call_count(), 1);
    }

    #[tokio::test]
    async fn test_completion_failure_surfaces_as_error() {
        let completion = Arc::new(StubCompletion::new("unused"));
        let responder = responder(empty_index(), completion);

        let result = responder
            .respond(&RespondRequest::new("please fail this one"), &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(PipelineError::Completion(_))));
    }

    #[tokio::test]
    async fn test_batch_preserves_order_and_isolates_failures() {
        let completion = Arc::new(StubCompletion::new("ok"));
        let responder = responder(empty_index(), completion);

        let requests = vec![
            RespondRequest::new("first question"),
            RespondRequest::new("second question should fail"),
            RespondRequest::new("third question"),
        ];

        let items = responder
            .respond_batch(&requests, &CancellationToken::new())
            .await;

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].request.query, "first question");
        assert!(items[0].outcome.is_ok());
        assert!(matches!(
            items[1].outcome,
            Err(PipelineError::Completion(_))
        ));
        assert!(items[2].outcome.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_channel_short_circuits() {
        let completion = Arc::new(StubCompletion::new("never sent"));
        let responder = responder(empty_index(), completion.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = responder
            .respond(&RespondRequest::new("What is the PTO policy?"), &cancel)
            .await;

        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert_eq!(completion.call_count(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_identical_queries_deduplicate() {
        let completion = Arc::new(StubCompletion::new("single flight"));
        let responder = Arc::new(responder(empty_index(), completion.clone()));
        let cancel = CancellationToken::new();
        let request = RespondRequest::new("What is the PTO policy?");

        let (a, b) = tokio::join!(
            responder.respond(&request, &cancel),
            responder.respond(&request, &cancel)
        );

        assert_eq!(a.unwrap().text, "single flight");
        assert_eq!(b.unwrap().text, "single flight");
        assert_eq!(completion.call_count(), 1);
    }

    #[tokio::test]
    async fn test_source_chunks_are_subset_of_retrieval() {
        let index = empty_index();
        let chunks = vec![
            KnowledgeChunk::new("Employees accrue 15 PTO days/year."),
            KnowledgeChunk::new("Health insurance enrollment opens in November."),
        ];
        index.index_chunks(&chunks).await.unwrap();

        let completion = Arc::new(StubCompletion::new("answer"));
        let responder = responder(index, completion);

        let answer = responder
            .respond(&RespondRequest::new("PTO days"), &CancellationToken::new())
            .await
            .unwrap();

        let indexed: Vec<uuid::Uuid> = chunks.iter().map(|c| c.id).collect();
        assert!(!answer.source_chunks.is_empty());
        for chunk in &answer.source_chunks {
            assert!(indexed.contains(&chunk.id));
        }
    }

    #[tokio::test]
    async fn test_persona_only_prompt_when_no_context() {
        struct PromptCapture {
            saw_reference_block: AtomicUsize,
        }

        #[async_trait]
        impl CompletionClient for PromptCapture {
            async fn complete(
                &self,
                system_prompt: &str,
                _user_query: &str,
            ) -> Result<String, PipelineError> {
                if system_prompt.contains("Reference material:") {
                    self.saw_reference_block.fetch_add(1, Ordering::SeqCst);
                }
                assert!(system_prompt.starts_with(PERSONA));
                Ok("done".into())
            }
        }

        let capture = Arc::new(PromptCapture {
            saw_reference_block: AtomicUsize::new(0),
        });
        let responder = Responder::new(
            empty_index(),
            capture.clone(),
            Arc::new(InMemoryCache::new()),
            PERSONA,
            3,
        );

        responder
            .respond(&RespondRequest::new("anything"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(capture.saw_reference_block.load(Ordering::SeqCst), 0);
    }
}
