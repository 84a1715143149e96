//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）、提示词、LlmOracle

pub mod deepseek;
pub mod message;
pub mod mock;
pub mod openai;
pub mod oracle;
pub mod prompts;
pub mod traits;

pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT, DEEPSEEK_REASONER};
pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use oracle::{decision_schema_json, extract_json, is_affirmative, parse_decision, LlmOracle};
pub use traits::LlmClient;

use std::sync::Arc;

use crate::config::LlmSection;

/// 根据 [llm] 配置与环境变量创建 LLM 客户端
///
/// - provider = mock，或没有任何 API Key：MockLlmClient
/// - 有 DEEPSEEK_API_KEY，或 provider = deepseek 且有 OPENAI_API_KEY：DeepSeek
/// - 否则：OpenAI 兼容端点（base_url 可配置）
pub fn create_llm_from_config(cfg: &LlmSection) -> Arc<dyn LlmClient> {
    let provider = cfg.provider.to_lowercase();
    let has_deepseek_key = std::env::var("DEEPSEEK_API_KEY").is_ok();
    let has_openai_key = std::env::var("OPENAI_API_KEY").is_ok();

    if provider == "mock" {
        tracing::info!("Using Mock LLM (configured)");
        return Arc::new(MockLlmClient::new());
    }
    if has_deepseek_key || (provider == "deepseek" && has_openai_key) {
        let client = create_deepseek_client(cfg);
        tracing::info!("Using DeepSeek LLM ({})", client.model());
        Arc::new(client)
    } else if has_openai_key {
        tracing::info!("Using OpenAI LLM ({})", cfg.model);
        Arc::new(
            OpenAiClient::new(cfg.base_url.as_deref(), &cfg.model, None)
                .with_temperature(cfg.temperature),
        )
    } else {
        tracing::warn!("No API key set, using Mock LLM");
        Arc::new(MockLlmClient::new())
    }
}
