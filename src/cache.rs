use dashmap::DashMap;

// Answers cached for the lifetime of the process. Insert-only: once the
// cap is reached new answers are still returned to callers but never
// retained. No eviction, no TTL.
pub struct PromptCache {
    entries: DashMap<String, String>,
    max_entries: usize,
}

impl PromptCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    // Insert unless the answer is empty or the cap is already reached
    pub fn insert(&self, key: String, answer: String) {
        if answer.is_empty() || self.entries.len() >= self.max_entries {
            return;
        }
        self.entries.insert(key, answer);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// Create a cache key (hash of the normalized prompt). Lowercasing and
// trimming raises the hit rate; md5 is fast and the keys are not
// security sensitive.
pub fn cache_key(prompt: &str) -> String {
    let normalized = prompt.to_lowercase();
    format!("{:x}", md5::compute(normalized.trim()))
}
