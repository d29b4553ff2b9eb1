use tokio::sync::mpsc;

use crate::models::{CorsHeaders, QueuedPrompt};

// app's shared state; the cache is deliberately absent - the worker owns it
pub struct AppState {
    pub model_id: String,
    pub max_prompt_length: usize,
    pub cors: CorsHeaders,
    pub queue_tx: mpsc::Sender<QueuedPrompt>,
}
