//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 汇总注册表与内省阶段的失败，它们都发生在组件激活路径上，应阻止组件启动；
//! - 通过 `From` 转为 [`CoreError`]，错误码统一落在 `databinding.*` 与 `introspection.*`。

use thiserror::Error;
use weft_core::CoreError;
use weft_core::error::codes;

/// 注册表错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：区分“声明源读不出来”“声明写错了”“插件表里没有实现”“显式引用解析不到”四类问题，
///   排障时可以直接定位到配置还是代码；
/// - **契约 (What)**：派生 `Clone`，以便一次性懒加载的结果被多个调用方读取；
/// - **权衡 (Trade-offs)**：声明源的底层错误只保留文本，换取可克隆。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("declaration source failed: {reason}")]
    Declarations { reason: String },

    #[error("malformed binding declaration at line {line}: `{content}`")]
    MalformedDeclaration { line: usize, content: String },

    #[error("no plugin constructor registered for `{class}` (binding `{binding}`)")]
    PluginMissing { class: String, binding: String },

    #[error("data binding `{binding}` referenced by {location} is not registered")]
    Unresolved { binding: String, location: String },
}

impl From<RegistryError> for CoreError {
    fn from(value: RegistryError) -> Self {
        let code = match &value {
            RegistryError::Declarations { .. } | RegistryError::MalformedDeclaration { .. } => {
                codes::DATABINDING_DECLARATION
            }
            RegistryError::PluginMissing { .. } => codes::DATABINDING_PLUGIN_MISSING,
            RegistryError::Unresolved { .. } => codes::DATABINDING_UNRESOLVED,
        };
        CoreError::new(code, value.to_string())
    }
}

/// 内省错误域：描述符本身畸形。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntrospectionError {
    #[error(
        "operation `{operation}` declares {declared} parameters but {annotated} annotation sets"
    )]
    ParameterMismatch {
        operation: String,
        declared: usize,
        annotated: usize,
    },

    #[error("interface `{interface}` has no operation for method `{method}`")]
    UnknownOperation { interface: String, method: String },

    #[error("operation `{operation}` declares {declared} parameters but the skeleton has {actual}")]
    ArityMismatch {
        operation: String,
        declared: usize,
        actual: usize,
    },
}

impl From<IntrospectionError> for CoreError {
    fn from(value: IntrospectionError) -> Self {
        let code = match &value {
            IntrospectionError::ParameterMismatch { .. }
            | IntrospectionError::ArityMismatch { .. } => codes::INTROSPECTION_PARAMETER_MISMATCH,
            IntrospectionError::UnknownOperation { .. } => codes::INTROSPECTION_UNKNOWN_OPERATION,
        };
        CoreError::new(code, value.to_string())
    }
}
