//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为装配期（内省、绑定分配、链路构建）与调用期（拦截器、目标调用）提供统一的错误载体；
//! - 各子 crate 的领域枚举（`RegistryError`、`IntrospectionError`、`ChainError` 等）通过 `From`
//!   汇聚到 [`CoreError`]，让组件激活路径只面对一种错误类型。
//!
//! ## 设计要求（What）
//! - 错误码遵循 `<领域>.<语义>` 约定，集中登记在 [`codes`]；
//! - 调用期错误不得以 `Err` 形式穿越拦截器边界，需转换为 [`crate::FaultBody`] 随消息传递。

use std::borrow::Cow;
use std::error::Error;
use std::fmt;

/// 稳定错误码登记表。
///
/// 新增错误码时需同步更新此处，保持可检索。
pub mod codes {
    /// 显式声明的数据绑定在懒加载后仍无法解析。
    pub const DATABINDING_UNRESOLVED: &str = "databinding.unresolved";
    /// 绑定声明源读取失败。
    pub const DATABINDING_DECLARATION: &str = "databinding.declaration";
    /// 插件表中找不到声明所引用的实现。
    pub const DATABINDING_PLUGIN_MISSING: &str = "databinding.plugin_missing";
    /// 参数注解个数与参数个数不一致。
    pub const INTROSPECTION_PARAMETER_MISMATCH: &str = "introspection.parameter_mismatch";
    /// 同一接口内出现重名操作。
    pub const INTROSPECTION_DUPLICATE_OPERATION: &str = "introspection.duplicate_operation";
    /// 内省阶段找不到方法对应的操作。
    pub const INTROSPECTION_UNKNOWN_OPERATION: &str = "introspection.unknown_operation";
    /// 调用链缺少尾部调用器。
    pub const CHAIN_NO_INVOKER: &str = "chain.no_invoker";
    /// 线缆格式或传输提供者构造拦截器失败。
    pub const CHAIN_PROVIDER: &str = "chain.provider";
    /// 消息未携带可路由的目标操作。
    pub const CHAIN_OPERATION_UNKNOWN: &str = "chain.operation_unknown";
    /// 业务目标在执行过程中 panic。
    pub const INVOCATION_TARGET_PANIC: &str = "invocation.target_panic";
    /// 业务目标返回的业务故障。
    pub const INVOCATION_BUSINESS_FAULT: &str = "invocation.business_fault";
    /// 消息体形状与操作签名不符。
    pub const INVOCATION_BODY_SHAPE: &str = "invocation.body_shape";
    /// 线缆格式编解码失败。
    pub const WIREFORMAT_CODEC: &str = "wireformat.codec";
    /// 包装元素构造或拆解失败。
    pub const TRANSFORM_WRAPPER: &str = "transform.wrapper";
    /// 值在两种绑定之间转换失败。
    pub const TRANSFORM_MEDIATION: &str = "transform.mediation";
    /// 配置文件无法读取或解析。
    pub const CONFIG_INVALID: &str = "config.invalid";
}

/// 错误的粗粒度分类，供激活路径与可观测性决定处置策略。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// 绑定解析、内省等装配期失败，应阻止组件启动。
    Resolution,
    /// 配置缺失或格式非法。
    Configuration,
    /// 单次调用失败，随故障体返回调用方。
    Invocation,
    /// 无法归类的内部错误。
    Internal,
}

impl ErrorCategory {
    /// 依据错误码前缀推断分类。
    pub fn from_code(code: &str) -> Self {
        match code.split('.').next() {
            Some("databinding" | "introspection" | "chain") => ErrorCategory::Resolution,
            Some("config") => ErrorCategory::Configuration,
            Some("invocation" | "wireformat" | "transform") => ErrorCategory::Invocation,
            _ => ErrorCategory::Internal,
        }
    }
}

type ErrorCause = Box<dyn Error + Send + Sync + 'static>;

/// `CoreError` 是所有 weft crate 共享的错误值。
///
/// # 教案式说明
/// - **意图 (Why)**：组件激活路径需要一次性拿到“哪个环节、因为什么”而失败，稳定错误码便于告警聚合；
/// - **契约 (What)**：`code` 必须来自 [`codes`]；`message` 面向排障人员；`cause` 可选保存底层错误；
/// - **执行 (How)**：分类默认由错误码前缀推断，可通过 [`with_category`](Self::with_category) 覆盖；
/// - **权衡 (Trade-offs)**：`message` 使用 `Cow`，静态文本零分配，动态文本承担一次堆分配。
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    category: ErrorCategory,
    cause: Option<ErrorCause>,
}

impl CoreError {
    /// 构造核心错误，分类按错误码前缀推断。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            category: ErrorCategory::from_code(code),
            cause: None,
        }
    }

    /// 附加底层原因。
    pub fn with_cause(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 覆盖默认分类。
    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = category;
        self
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 人类可读描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 错误分类。
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// 底层原因（若有）。
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }
}

impl fmt::Debug for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreError")
            .field("code", &self.code)
            .field("message", &self.message)
            .field("category", &self.category)
            .field("cause", &self.cause.as_ref().map(|c| c.to_string()))
            .finish()
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_ref()
            .map(|cause| cause.as_ref() as &(dyn Error + 'static))
    }
}

/// 统一的 `Result` 别名。
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_follows_code_prefix() {
        assert_eq!(
            CoreError::new(codes::DATABINDING_UNRESOLVED, "x").category(),
            ErrorCategory::Resolution
        );
        assert_eq!(
            CoreError::new(codes::WIREFORMAT_CODEC, "x").category(),
            ErrorCategory::Invocation
        );
        assert_eq!(
            CoreError::new(codes::CONFIG_INVALID, "x").category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            CoreError::new("unknown.code", "x").category(),
            ErrorCategory::Internal
        );
    }

    #[test]
    fn cause_is_exposed_as_source() {
        let io = std::io::Error::other("disk");
        let err = CoreError::new(codes::CONFIG_INVALID, "cannot read").with_cause(io);
        assert_eq!(err.source().map(|s| s.to_string()), Some("disk".to_owned()));
        assert_eq!(err.to_string(), "[config.invalid] cannot read");
    }
}
