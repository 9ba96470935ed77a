//! # weft-core
//!
//! ## 角色定位（Why）
//! - 组件装配运行时的契约层：数据类型模型、调用消息、拦截器/调用器、协议提供者与数据绑定能力面；
//! - 不包含任何解析算法或链路实现，`weft-databinding`、`weft-pipeline`、`weft-middleware` 均以此为依赖根。
//!
//! ## 模块地图（What）
//! - [`model`]：`DataType`、`Operation`、`WrapperInfo`、`Interface` 与反射描述符；
//! - [`databinding`]：`DataBinding`、`ExceptionHandler`、`WrapperHandler`；
//! - [`invocation`]：`Message`、`FaultBody`、`Interceptor`、`Invoker`、`Phase` 与各类 Provider；
//! - [`config`]：TOML 配置模型；
//! - [`error`]：`CoreError` 与稳定错误码。

pub mod config;
pub mod databinding;
pub mod error;
pub mod invocation;
pub mod model;

pub use databinding::{
    DataBinding, ExceptionHandler, IntrospectionContext, TransformationContext, WrapperHandler,
};
pub use error::{CoreError, ErrorCategory, Result};
pub use invocation::{
    Body, FaultBody, Flow, Interceptor, InterceptorDescriptor, Invoker, Message, MessageId,
    OperationSelectorProvider, Phase, PolicyProvider, TransportProvider, WireFormatProvider,
};
pub use model::{
    Annotation, BindingOrigin, ClassDescriptor, DataType, ElementInfo, Interface, LogicalType,
    Operation, PhysicalType, PropertyDescriptor, QName, ScalarKind, WrapperInfo, XmlType,
    binding_ids, find_data_binding, find_data_type,
};
