//! 可观测性：tracing 订阅器初始化
//!
//! 默认级别 info，RUST_LOG 可覆盖；日志写 stderr，stdout 留给回答与 JSON 报告。

use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

pub fn init() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    // 重复初始化（如测试中）时忽略
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
