use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::bedrock::GenerateText;
use crate::cache::PromptCache;
use crate::metrics::{CACHE_HITS, CACHE_MISSES, CACHE_SIZE};
use crate::models::QueuedPrompt;

// Single-owner worker: every cache lookup and insert goes through this one
// task, so the insert-only capacity check never races. Handlers talk to it
// over the queue and get their answer back on the oneshot channel.
pub async fn invoke_worker(
    mut rx: mpsc::Receiver<QueuedPrompt>,
    client: Arc<dyn GenerateText>,
    cache: PromptCache,
) {
    info!("invoke worker started - processing prompts sequentially");

    // keep receiving prompts from the queue
    while let Some(queued) = rx.recv().await {
        // check cache first
        if let Some(answer) = cache.get(&queued.cache_key) {
            CACHE_HITS.inc();
            debug!("cache hit");
            let _ = queued.response_tx.send(Ok(answer));
            continue;
        }
        CACHE_MISSES.inc();

        // log the length only, never the prompt itself
        info!(
            prompt_chars = queued.prompt.chars().count(),
            "cache miss - invoking model"
        );

        let result = client.generate(&queued.prompt).await;

        if let Ok(answer) = &result {
            cache.insert(queued.cache_key.clone(), answer.clone());
            CACHE_SIZE.set(cache.len() as f64);
        }

        // handler may have given up waiting; nothing to do then
        let _ = queued.response_tx.send(result);
    }
}
