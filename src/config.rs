use clap::Parser;

// CLI argument structure; every knob also reads from the environment so the
// binary can be configured the same way the hosted deployment is
#[derive(Parser, Debug, Clone)]
#[command(name = "bedrock-chat-gateway")]
#[command(about = "Caching chat backend for the Bedrock Converse API")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, default_value_t = 8080, env = "PORT")]
    pub port: u16,

    // Region the Bedrock runtime endpoint lives in
    #[arg(long, default_value = "us-east-1", env = "AWS_REGION")]
    pub region: String,

    // Model to invoke (Nova Micro is the cheapest)
    #[arg(long, default_value = "amazon.nova-micro-v1:0", env = "MODEL_ID")]
    pub model_id: String,

    // Override the Bedrock runtime endpoint (local stacks, tests)
    #[arg(long, env = "BEDROCK_ENDPOINT")]
    pub endpoint: Option<String>,

    // Bearer token for the Bedrock runtime API
    #[arg(long, env = "AWS_BEARER_TOKEN_BEDROCK", hide_env_values = true)]
    pub api_key: Option<String>,

    // Reject prompts longer than this many characters
    #[arg(long, default_value_t = 2000, env = "MAX_PROMPT_LENGTH")]
    pub max_prompt_length: usize,

    // Maximum number of cached answers
    #[arg(long, default_value_t = 100, env = "CACHE_MAX_ENTRIES")]
    pub cache_max_entries: usize,

    // Value sent back in Access-Control-Allow-Origin
    #[arg(long, default_value = "*", env = "ALLOWED_ORIGIN")]
    pub allowed_origin: String,

    // Log verbosity (tracing filter directive)
    #[arg(long, default_value = "warn", env = "LOG_LEVEL")]
    pub log_level: String,
}
