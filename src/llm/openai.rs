//! OpenAI 兼容 Chat Completion 客户端（async_openai）
//!
//! base_url 可指向 OpenAI、DeepSeek 或自建代理；temperature 来自 [llm] 配置。

use std::sync::atomic::{AtomicU64, Ordering};

use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::llm::{LlmClient, Message, Role};

/// 累计 token 用量
#[derive(Debug, Default)]
pub struct TokenUsage {
    prompt: AtomicU64,
    completion: AtomicU64,
}

impl TokenUsage {
    pub fn record(&self, prompt: u64, completion: u64) {
        self.prompt.fetch_add(prompt, Ordering::Relaxed);
        self.completion.fetch_add(completion, Ordering::Relaxed);
    }

    /// (prompt, completion, total)
    pub fn totals(&self) -> (u64, u64, u64) {
        let p = self.prompt.load(Ordering::Relaxed);
        let c = self.completion.load(Ordering::Relaxed);
        (p, c, p + c)
    }
}

fn to_request_message(m: &Message) -> Result<ChatCompletionRequestMessage, String> {
    let content = m.content.clone();
    let msg = match m.role {
        Role::System => ChatCompletionRequestSystemMessageArgs::default()
            .content(content)
            .build()
            .map(ChatCompletionRequestMessage::System),
        Role::User => ChatCompletionRequestUserMessageArgs::default()
            .content(content)
            .build()
            .map(ChatCompletionRequestMessage::User),
        Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
            .content(content)
            .build()
            .map(ChatCompletionRequestMessage::Assistant),
    };
    msg.map_err(|e| format!("invalid {:?} message: {}", m.role, e))
}

pub struct OpenAiClient {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: Option<f32>,
    usage: TokenUsage,
}

impl OpenAiClient {
    /// api_key 为空时依次尝试 OPENAI_API_KEY、占位 key（请求会被服务端拒绝）
    pub fn new(base_url: Option<&str>, model: &str, api_key: Option<&str>) -> Self {
        let api_key = api_key
            .map(String::from)
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .unwrap_or_else(|| "sk-placeholder".to_string());
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(url) = base_url {
            config = config.with_api_base(url);
        }
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
            temperature: None,
            usage: TokenUsage::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()?;
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&self.model).messages(messages);
        if let Some(t) = self.temperature {
            args.temperature(t);
        }
        let request = args.build().map_err(|e| e.to_string())?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| e.to_string())?;
        if let Some(u) = &response.usage {
            self.usage
                .record(u.prompt_tokens as u64, u.completion_tokens as u64);
            tracing::debug!(
                model = %self.model,
                prompt_tokens = u.prompt_tokens,
                completion_tokens = u.completion_tokens,
                "llm completion"
            );
        }

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.usage.totals()
    }
}
