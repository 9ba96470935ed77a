//! # weft-pipeline
//!
//! ## 角色定位（Why）
//! - 把解析完成的接口契约与绑定协议能力装配成可并发复用的调用链，并提供链路执行器；
//! - 调用期故障以 [`weft_core::FaultBody`] 在消息中流转，只在最外层调用方边界才转为 `Err`。
//!
//! ## 模块地图（What）
//! - [`chain`]：按阶段排序的 [`InvocationChain`] 与执行器；
//! - [`invoker`]：业务目标 [`TargetInvoker`] 与按操作分发的 [`OperationDispatcher`]；
//! - [`transform`]：转换判定与 [`DataTransformationInterceptor`]；
//! - [`builder`] / [`wire`]：[`WireBuilder`] 产出 [`RuntimeWire`]；
//! - [`error`]：装配期错误 [`ChainError`]。

pub mod builder;
pub mod chain;
pub mod error;
pub mod invoker;
pub mod transform;
pub mod wire;

pub use builder::{BindingProviders, ComponentTargets, WireBuilder};
pub use chain::{ChainEntry, InvocationChain};
pub use error::ChainError;
pub use invoker::{OperationDispatcher, TargetFn, TargetInvoker};
pub use transform::{
    CopyMediator, DataTransformationInterceptor, Mediator, is_transformation_required,
};
pub use wire::RuntimeWire;
