//! # weft-middleware
//!
//! ## 角色定位（Why）
//! - 通过 `weft-core` 的提供者契约接入调用链的常用组件，链路构建器只看到 trait，不依赖具体实现；
//! - 同时承担进程级日志订阅器的安装入口。
//!
//! ## 模块地图（What）
//! - [`logging`]：[`LoggingInterceptor`] 与 [`install_subscriber`]；
//! - [`wireformat`]：[`JsonWireFormat`]；
//! - [`selector`]：[`OperationNameSelector`]；
//! - [`transport`]：[`InMemoryTransport`]，把故障体翻译为线缆故障。

pub mod logging;
pub mod selector;
pub mod transport;
pub mod wireformat;

pub use logging::{
    InstallError, LoggingInterceptor, LoggingInterceptorConfig, install_subscriber, tracing_level,
};
pub use selector::{OPERATION_HEADER, OperationNameSelector};
pub use transport::{InMemoryTransport, STATUS_FAULT, STATUS_HEADER, STATUS_OK};
pub use wireformat::{JSON_FORMAT_ID, JsonWireFormat};
