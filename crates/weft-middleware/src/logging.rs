use std::borrow::Cow;
use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tracing::{Level, dispatcher};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};
use weft_core::config::{LogLevel, LoggingConfig};
use weft_core::{
    Body, Flow, Interceptor, InterceptorDescriptor, Message, Operation, Phase, PolicyProvider,
};

/// 日志拦截器配置。
///
/// # 教案式说明
/// - **意图（Why）**：不同线路的日志分类与级别各不相同，配置结构把差异外部化，拦截器本身保持无状态；
/// - **结构（How）**：携带 [`InterceptorDescriptor`]、日志分类 `channel` 与普通事件级别 `level`；
/// - **契约（What）**：
///   - `channel` 作为结构化字段写入每条记录，便于在后端按线路筛选；
///   - `level` 只作用于请求与正常响应，故障响应固定以 `WARN` 输出；
/// - **风险提示（Trade-offs）**：高频线路使用 `Info` 可能造成日志风暴，需在配置层调低级别或依赖
///   `EnvFilter` 过滤。
#[derive(Clone, Debug)]
pub struct LoggingInterceptorConfig {
    pub descriptor: InterceptorDescriptor,
    pub channel: Cow<'static, str>,
    pub level: Level,
}

impl Default for LoggingInterceptorConfig {
    fn default() -> Self {
        Self::from_config(&LoggingConfig::default())
    }
}

impl LoggingInterceptorConfig {
    /// 由运行时 `[logging]` 段构造。
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            descriptor: InterceptorDescriptor::new(
                "weft.middleware.logging",
                "observability",
                "records request, response and fault events of an invocation",
            ),
            channel: Cow::Owned(config.target.clone()),
            level: tracing_level(config.level),
        }
    }
}

/// 把配置级别映射为 `tracing` 级别。
pub fn tracing_level(level: LogLevel) -> Level {
    match level {
        LogLevel::Trace => Level::TRACE,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Info => Level::INFO,
        LogLevel::Warn => Level::WARN,
        LogLevel::Error => Level::ERROR,
    }
}

fn body_kind(message: &Message) -> &'static str {
    match message.body() {
        Some(Body::Args(_)) => "args",
        Some(Body::Value(_)) => "value",
        Some(Body::Raw(_)) => "raw",
        None if message.is_fault() => "fault",
        None => "empty",
    }
}

/// `tracing` 宏要求级别为常量，这里按运行期级别分派。
macro_rules! emit {
    ($level:expr, $($rest:tt)+) => {{
        let level = $level;
        if level == Level::TRACE {
            tracing::trace!($($rest)+)
        } else if level == Level::DEBUG {
            tracing::debug!($($rest)+)
        } else if level == Level::INFO {
            tracing::info!($($rest)+)
        } else if level == Level::WARN {
            tracing::warn!($($rest)+)
        } else {
            tracing::error!($($rest)+)
        }
    }};
}

/// 记录调用请求、响应与故障的拦截器。
///
/// # 教案式说明
/// - **意图（Why）**：统一在链路中记录调用事件，避免各业务目标手写重复的日志代码；
/// - **契约（What）**：只观察不修改，消息原样放行；作为策略提供者时对每个操作都挂载同一个实例。
#[derive(Clone, Debug, Default)]
pub struct LoggingInterceptor {
    config: LoggingInterceptorConfig,
}

impl LoggingInterceptor {
    pub fn new(config: LoggingInterceptorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoggingInterceptorConfig {
        &self.config
    }
}

impl Interceptor for LoggingInterceptor {
    fn descriptor(&self) -> InterceptorDescriptor {
        self.config.descriptor.clone()
    }

    fn on_request(&self, message: Message) -> Flow {
        let operation = message.operation().map(|op| op.name.as_str()).unwrap_or("-");
        emit!(
            self.config.level,
            channel = %self.config.channel,
            weft.direction = "request",
            weft.event = "invoke",
            message_id = %message.id(),
            operation,
            body = body_kind(&message),
            "invocation request"
        );
        Flow::Continue(message)
    }

    fn on_response(&self, message: Message) -> Message {
        let operation = message.operation().map(|op| op.name.as_str()).unwrap_or("-");
        let correlation = message
            .correlation_id()
            .map(|id| id.to_string())
            .unwrap_or_default();
        match message.fault() {
            Some(fault) => tracing::warn!(
                channel = %self.config.channel,
                weft.direction = "response",
                weft.event = "fault",
                correlation = %correlation,
                operation,
                code = %fault.code,
                fault_type = fault.fault_type.as_deref().unwrap_or("-"),
                "invocation fault: {}",
                fault.message
            ),
            None => emit!(
                self.config.level,
                channel = %self.config.channel,
                weft.direction = "response",
                weft.event = "reply",
                correlation = %correlation,
                operation,
                body = body_kind(&message),
                "invocation response"
            ),
        }
        message
    }
}

impl PolicyProvider for LoggingInterceptor {
    fn phase(&self) -> Phase {
        Phase::ImplementationPolicy
    }

    fn create_interceptor(&self, _operation: &Operation) -> weft_core::Result<Option<Arc<dyn Interceptor>>> {
        Ok(Some(Arc::new(self.clone())))
    }
}

/// 安装状态的全局标记，保证 `install_subscriber` 只生效一次。
static INSTALLED: OnceLock<()> = OnceLock::new();

/// 订阅器安装失败的原因。
#[derive(Debug, Error)]
pub enum InstallError {
    /// 外部提前设置了全局订阅器，无法覆盖。
    #[error("a global tracing subscriber was already installed elsewhere")]
    SubscriberAlreadySet,
    /// `filter` 指令无法解析。
    #[error("invalid log filter `{directive}`")]
    InvalidFilter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to set the global tracing subscriber")]
    SetGlobalSubscriber(#[source] tracing::subscriber::SetGlobalDefaultError),
}

/// 按 `[logging]` 段安装全局 `fmt + EnvFilter` 订阅器。
///
/// # 教案式说明
/// - **逻辑（How）**：
///   1. 本函数已成功执行过时直接返回 `Ok`，重复调用是幂等的；
///   2. 外部已设置全局订阅器时返回 [`InstallError::SubscriberAlreadySet`]；
///   3. 过滤器优先取 `filter`，其次 `RUST_LOG`，最后退化为 `level`；
/// - **契约（What）**：两个线程同时首次安装时，后完成的一方得到 [`InstallError::SetGlobalSubscriber`]。
pub fn install_subscriber(config: &LoggingConfig) -> Result<(), InstallError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    if dispatcher::has_been_set() {
        return Err(InstallError::SubscriberAlreadySet);
    }

    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter(config)?)
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber)
        .map_err(InstallError::SetGlobalSubscriber)?;
    let _ = INSTALLED.set(());
    Ok(())
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, InstallError> {
    if let Some(directive) = &config.filter {
        return EnvFilter::try_new(directive).map_err(|source| InstallError::InvalidFilter {
            directive: directive.clone(),
            source,
        });
    }
    Ok(EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing_level(config.level).as_str().to_lowercase())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;
    use weft_core::FaultBody;

    #[test]
    fn config_follows_logging_section() {
        let config = LoggingInterceptorConfig::from_config(&LoggingConfig {
            target: "orders".into(),
            level: LogLevel::Debug,
            filter: None,
        });
        assert_eq!(config.channel, "orders");
        assert_eq!(config.level, Level::DEBUG);
        assert_eq!(config.descriptor.category(), "observability");
    }

    #[test]
    fn invalid_filter_is_reported() {
        let err = build_env_filter(&LoggingConfig {
            filter: Some("weft=verbose".into()),
            ..LoggingConfig::default()
        })
        .expect_err("非法指令");
        assert!(matches!(err, InstallError::InvalidFilter { .. }));
    }

    #[test]
    #[traced_test]
    fn request_and_fault_are_logged_without_altering_the_message() {
        let interceptor = LoggingInterceptor::default();
        let request = Message::request(vec![json!(1)]);
        let forwarded = interceptor.on_request(request.clone()).into_message();
        assert_eq!(forwarded, request);
        assert!(logs_contain("invocation request"));

        let reply = request.reply_fault(FaultBody::business("Overdrawn", "balance too low"));
        let returned = interceptor.on_response(reply.clone());
        assert_eq!(returned, reply);
        assert!(logs_contain("invocation fault: balance too low"));
        assert!(logs_contain("Overdrawn"));
    }
}
