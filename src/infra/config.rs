// src/infra/config.rs — API credential loading
//
// Credentials are resolved once at process start (env vars, with an optional
// .env file loaded first) and passed into the resolver by value. The core
// never reads the environment itself, which keeps it testable.

#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub google_api_key: Option<String>,
}

impl Credentials {
    /// Load credentials from the process environment, after loading a `.env`
    /// file from the current directory tree if one exists.
    pub fn from_env() -> Self {
        // dotenv never overrides variables already set in the environment.
        let _ = dotenv::dotenv();
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            google_api_key: std::env::var("GOOGLE_API_KEY").ok(),
        }
    }
}
