//! # weft-databinding
//!
//! ## 角色定位（Why）
//! - 为组件接口的每个操作决定“值以什么数据格式在线缆上表示”：逐位置内省、统一到操作级、
//!   再为包装风格操作计算包装类型；
//! - 解析结果在链路构建期一次性产出，调用期只读。
//!
//! ## 流水线（How）
//! 1. [`introspect::OperationIntrospector`]：反射描述转操作骨架，写入声明式绑定；
//! 2. [`assignment::DataBindingAssigner`]：通过 [`registry::DataBindingRegistry`] 为未决定的位置挑选绑定，
//!    并推导操作级绑定；
//! 3. [`wrapper::WrapperResolver`]：按操作级绑定的包装处理器计算包装类型；
//! 4. [`processor::InterfaceProcessor`]：串联以上三步并缓存结果。
//!
//! ## 扩展点（What）
//! - 自定义绑定实现 [`weft_core::DataBinding`] 后直接 `register`，或通过
//!   [`declaration::BindingPlugins`] 配合声明源懒加载。

pub mod assignment;
pub mod builtin;
pub mod declaration;
pub mod error;
pub mod introspect;
pub mod processor;
pub mod registry;
pub mod wrapper;

pub use assignment::{DataBindingAssigner, derive_operation_binding, needs_operation_binding};
pub use declaration::{
    BindingPlugins, DeclarationSource, LazyDataBinding, PluginConstructor,
    ServiceFileDeclarations, StaticDeclarations,
};
pub use error::{IntrospectionError, RegistryError};
pub use introspect::{InterfaceDescriptor, MethodDescriptor, OperationIntrospector};
pub use processor::InterfaceProcessor;
pub use registry::{DataBindingRegistry, LoadReport};
pub use wrapper::WrapperResolver;
