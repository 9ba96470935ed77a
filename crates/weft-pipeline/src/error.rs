//! 链路构建期的错误域。

use thiserror::Error;
use weft_core::CoreError;
use weft_core::error::codes;
use weft_databinding::RegistryError;

/// 链路构建错误。
///
/// # 教案式说明
/// - **意图 (Why)**：构建失败意味着组件装配有误，需要在激活路径上同步报告并阻止组件启动；
/// - **契约 (What)**：
///   - `NoInvoker`：某个操作找不到业务调用器；
///   - `Provider`：协议提供者创建拦截器或改写接口契约失败，保留底层 [`CoreError`]；
///   - `UnknownOperation`：绑定侧接口中的操作在组件接口中不存在；
///   - `Binding`：显式声明的绑定在懒加载后仍未登记。
/// - **权衡 (Trade-offs)**：调用期错误不走这里，它们以故障体形式留在消息中。
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain `{chain}` has no invoker")]
    NoInvoker { chain: String },

    #[error("provider `{provider}` failed while building the wire")]
    Provider {
        provider: String,
        #[source]
        source: CoreError,
    },

    #[error("operation `{operation}` is not part of interface `{interface}`")]
    UnknownOperation { interface: String, operation: String },

    #[error(transparent)]
    Binding(#[from] RegistryError),
}

impl ChainError {
    pub(crate) fn provider(provider: impl Into<String>, source: CoreError) -> Self {
        ChainError::Provider {
            provider: provider.into(),
            source,
        }
    }
}

impl From<ChainError> for CoreError {
    fn from(value: ChainError) -> Self {
        match value {
            ChainError::Binding(inner) => inner.into(),
            ChainError::NoInvoker { .. } => CoreError::new(codes::CHAIN_NO_INVOKER, value.to_string()),
            ChainError::UnknownOperation { .. } => {
                CoreError::new(codes::CHAIN_OPERATION_UNKNOWN, value.to_string())
            }
            ChainError::Provider { .. } => {
                let message = value.to_string();
                CoreError::new(codes::CHAIN_PROVIDER, message).with_cause(value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unresolved_binding_keeps_its_code() {
        let err: CoreError = ChainError::from(RegistryError::Unresolved {
            binding: "sdo".into(),
            location: "Catalog#find".into(),
        })
        .into();
        assert_eq!(err.code(), codes::DATABINDING_UNRESOLVED);
    }

    #[test]
    fn provider_failure_chains_the_cause() {
        let err: CoreError = ChainError::provider(
            "wireformat.json",
            CoreError::new(codes::WIREFORMAT_CODEC, "bad contract"),
        )
        .into();
        assert_eq!(err.code(), codes::CHAIN_PROVIDER);
        assert!(err.cause().is_some());
    }
}
