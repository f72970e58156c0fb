use openai_chat_http::{ChatParams, ClientOptions, EnvKey, OpenAiClient};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Summary {
    title: String,
    keywords: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_owned());
    let mut options = ClientOptions::default().with_max_retries(3);
    if let Ok(base_url) = std::env::var("OPENAI_BASE_URL") {
        options = options.with_base_url(base_url);
    }

    let client = OpenAiClient::with_provider(EnvKey::default(), model).with_options(options);

    let (text, status) = client
        .chat(&ChatParams::new("You are a concise assistant.", "Name three Rust web frameworks."))
        .await?;
    println!("{text}\n[{status}]");

    let (summary, status) = client
        .chat_json::<Summary>(&ChatParams::new(
            "Reply with a JSON object {\"title\": string, \"keywords\": [string]}.",
            "Summarize: exponential backoff with jitter spreads out client retries.",
        ))
        .await?;
    println!("{summary:?}\n[{status}]");

    Ok(())
}
