//! 日志接口（Logger）
//!
//! 总线消费的注入式日志能力：按级别输出消息与键值字段。
//! 日志失败不向总线传播，接口不返回错误、不阻塞调用方。
//! 默认实现 [`TracingLogger`] 转发给 `tracing` 宏，结构化字段由
//! 订阅端（subscriber）统一呈现；测试可注入 [`NoopLogger`] 或自定义桩。
//!
/// 注入式日志接口：消息 + 键值字段，按级别输出
pub trait Logger: Send + Sync {
    fn debug(&self, msg: &str, fields: &[(&str, String)]);
    fn info(&self, msg: &str, fields: &[(&str, String)]);
    fn warn(&self, msg: &str, fields: &[(&str, String)]);
    fn error(&self, msg: &str, fields: &[(&str, String)]);
}

/// 基于 tracing 的默认实现
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        Self
    }
}

impl Logger for TracingLogger {
    fn debug(&self, msg: &str, fields: &[(&str, String)]) {
        tracing::debug!(fields = ?fields, "{msg}");
    }

    fn info(&self, msg: &str, fields: &[(&str, String)]) {
        tracing::info!(fields = ?fields, "{msg}");
    }

    fn warn(&self, msg: &str, fields: &[(&str, String)]) {
        tracing::warn!(fields = ?fields, "{msg}");
    }

    fn error(&self, msg: &str, fields: &[(&str, String)]) {
        tracing::error!(fields = ?fields, "{msg}");
    }
}

/// 丢弃全部日志的实现（测试/基准用）
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn debug(&self, _msg: &str, _fields: &[(&str, String)]) {}
    fn info(&self, _msg: &str, _fields: &[(&str, String)]) {}
    fn warn(&self, _msg: &str, _fields: &[(&str, String)]) {}
    fn error(&self, _msg: &str, _fields: &[(&str, String)]) {}
}
