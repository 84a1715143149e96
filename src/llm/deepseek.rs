//! DeepSeek 后端（OpenAI 兼容格式，Base URL https://api.deepseek.com）

use crate::config::LlmSection;
use crate::llm::OpenAiClient;

pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_CHAT: &str = "deepseek-chat";
pub const DEEPSEEK_REASONER: &str = "deepseek-reasoner";

/// 创建 DeepSeek 客户端
///
/// - Key：`DEEPSEEK_API_KEY`，其次 `OPENAI_API_KEY`
/// - 模型：[llm].model 为 deepseek-* 时使用之，否则 `DEEPSEEK_MODEL`，默认 deepseek-chat
/// - [llm].base_url 可覆盖官方端点（自建代理）
pub fn create_deepseek_client(cfg: &LlmSection) -> OpenAiClient {
    let api_key = std::env::var("DEEPSEEK_API_KEY")
        .ok()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());

    let model = Some(cfg.model.clone())
        .filter(|m| m.starts_with("deepseek"))
        .or_else(|| std::env::var("DEEPSEEK_MODEL").ok())
        .unwrap_or_else(|| DEEPSEEK_CHAT.to_string());
    let base_url = cfg.base_url.as_deref().unwrap_or(DEEPSEEK_BASE_URL);

    OpenAiClient::new(Some(base_url), &model, api_key.as_deref()).with_temperature(cfg.temperature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_deepseek_model_kept() {
        let cfg = LlmSection {
            provider: "deepseek".into(),
            model: DEEPSEEK_REASONER.into(),
            ..Default::default()
        };
        assert_eq!(create_deepseek_client(&cfg).model(), DEEPSEEK_REASONER);
    }
}
