//! 沙箱文件能力
//!
//! SafeFs 绑定 root_dir，所有路径经 resolve 校验必须在 root 下（禁止 ../ 逃逸）；
//! LoadJsonCapability 基于 SafeFs 把 JSON 文件读入 Scratchpad（对象数组变为表格）。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value as Json;

use crate::tools::{Capability, ResolvedArgs, OUTPUT_VAR_ARG};
use crate::value::Value;

/// 沙箱文件系统：绑定根目录，resolve 校验路径在根下，防止路径逃逸
#[derive(Debug, Clone)]
pub struct SafeFs {
    root_dir: PathBuf,
}

impl SafeFs {
    pub fn new(root_dir: impl AsRef<Path>) -> Self {
        let root = root_dir.as_ref().to_path_buf();
        let root_dir = root.canonicalize().unwrap_or(root);
        Self { root_dir }
    }

    /// 检查路径是否在沙箱内
    pub fn resolve(&self, path: &str) -> Result<PathBuf, String> {
        let path = path.trim_start_matches("./");
        let full = self.root_dir.join(path);
        let canonical = full
            .canonicalize()
            .map_err(|_| format!("Path not found: {}", path))?;
        let root_canon = self
            .root_dir
            .canonicalize()
            .unwrap_or_else(|_| self.root_dir.clone());
        if canonical.starts_with(root_canon) {
            Ok(canonical)
        } else {
            Err(format!("Path escapes workspace: {}", path)) // 如 ../../etc/passwd
        }
    }

    pub async fn read_file(&self, path: &str) -> Result<String, String> {
        let resolved = self.resolve(path)?;
        tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| format!("Read failed: {}", e))
    }
}

/// load_json 能力：读取工作区内的 JSON 文件
pub struct LoadJsonCapability {
    fs: SafeFs,
}

impl LoadJsonCapability {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            fs: SafeFs::new(root),
        }
    }
}

#[async_trait]
impl Capability for LoadJsonCapability {
    fn name(&self) -> &str {
        "load_json"
    }

    fn description(&self) -> &str {
        "Load a JSON file from the workspace. An array of objects becomes a table."
    }

    fn parameters_schema(&self) -> Json {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": { "type": "string", "description": "File path relative to the workspace" },
                OUTPUT_VAR_ARG: { "type": "string", "description": "Name of the variable to store the data" }
            },
            "required": ["path", OUTPUT_VAR_ARG]
        })
    }

    async fn invoke(&self, args: ResolvedArgs) -> Result<Value, String> {
        let path = args.require_str("path")?;
        let content = self.fs.read_file(path).await?;
        let json: Json =
            serde_json::from_str(&content).map_err(|e| format!("Invalid JSON in {}: {}", path, e))?;
        Ok(Value::from(json))
    }
}
