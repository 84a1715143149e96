//! Echo 能力（测试与演示用）

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::tools::{Capability, ResolvedArgs, OUTPUT_VAR_ARG};
use crate::value::Value;

/// Echo 能力：把 text 参数原样作为文本结果返回
pub struct EchoCapability;

#[async_trait]
impl Capability for EchoCapability {
    fn name(&self) -> &str {
        "echo"
    }

    fn description(&self) -> &str {
        "Store a piece of text as a variable (for testing)."
    }

    fn parameters_schema(&self) -> Json {
        serde_json::json!({
            "type": "object",
            "properties": {
                "text": { "type": "string", "description": "Text to store" },
                OUTPUT_VAR_ARG: { "type": "string", "description": "Name of the variable to store the text" }
            },
            "required": ["text", OUTPUT_VAR_ARG]
        })
    }

    async fn invoke(&self, args: ResolvedArgs) -> Result<Value, String> {
        let text = args.get_str("text").unwrap_or("(empty)");
        Ok(Value::text(text))
    }
}
