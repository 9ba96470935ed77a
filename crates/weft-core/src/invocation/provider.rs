//! 绑定协议向链路构建器提供的能力面。
//!
//! 协议实现（HTTP、JMS、JSON-RPC 等）只需实现这里的 trait，链路构建器读取 `phase()`
//! 并把 `create_interceptor()` 的结果放到声明的阶段上。

use std::sync::Arc;

use crate::error::Result;
use crate::model::{Interface, Operation};

use super::interceptor::{Interceptor, Phase};

/// 传输提供者：负责原始协议 I/O，并在响应时把故障体翻译为线缆故障。
pub trait TransportProvider: Send + Sync {
    fn create_interceptor(&self) -> Result<Arc<dyn Interceptor>>;
}

/// 操作选择提供者。
pub trait OperationSelectorProvider: Send + Sync {
    fn phase(&self) -> Phase {
        Phase::OperationSelection
    }

    /// `operations` 为该绑定可路由的全部操作。
    fn create_interceptor(&self, operations: &[Arc<Operation>]) -> Result<Arc<dyn Interceptor>>;
}

/// 线缆格式提供者。
///
/// # 契约说明（What）
/// - `format_id` 是格式身份：请求与响应格式身份相同时链路只放置一个拦截器；
/// - `configure_interface_contract` 可以改写绑定侧接口契约，使其反映线缆上的数据形状，默认不改写。
pub trait WireFormatProvider: Send + Sync {
    fn format_id(&self) -> &str;

    fn phase(&self) -> Phase {
        Phase::WireFormat
    }

    fn create_interceptor(&self) -> Result<Arc<dyn Interceptor>>;

    fn configure_interface_contract(&self, _interface: &mut Interface) -> Result<()> {
        Ok(())
    }
}

/// 策略提供者：按操作决定是否插入策略拦截器。
pub trait PolicyProvider: Send + Sync {
    fn phase(&self) -> Phase {
        Phase::ImplementationPolicy
    }

    fn create_interceptor(&self, operation: &Operation) -> Result<Option<Arc<dyn Interceptor>>>;
}
