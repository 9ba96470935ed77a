//! # processor 模块说明
//!
//! ## 角色定位（Why）
//! - 串起内省、分配、包装解析三段流水线，产出只读的 `Arc<Interface>`；
//! - 结果按接口身份缓存，重复激活同一接口时不再重新内省。
//!
//! ## 契约说明（What）
//! - 流水线内部的可变性只存在于构建期间，交付后的接口不再修改；
//! - 任一阶段失败即返回错误，组件不应启动。

use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;
use weft_core::{Interface, Result};

use crate::assignment::DataBindingAssigner;
use crate::introspect::{InterfaceDescriptor, OperationIntrospector};
use crate::registry::DataBindingRegistry;
use crate::wrapper::WrapperResolver;

/// 接口处理器。
///
/// # 教案式说明
/// - **意图 (Why)**：组件激活只需要一个入口即可拿到解析完成的接口契约；
/// - **流程 (How)**：缓存命中直接返回；否则依次执行 [`OperationIntrospector`]、
///   [`DataBindingAssigner`]、[`WrapperResolver`]，再以 `entry().or_insert` 写入缓存，
///   并发首算时以先写入者为准；
/// - **权衡 (Trade-offs)**：缓存键为接口名，同名不同内容的描述符需要先 [`invalidate`](Self::invalidate)。
#[derive(Debug)]
pub struct InterfaceProcessor {
    registry: Arc<DataBindingRegistry>,
    introspector: OperationIntrospector,
    cache: DashMap<String, Arc<Interface>>,
}

impl InterfaceProcessor {
    pub fn new(registry: Arc<DataBindingRegistry>) -> Self {
        Self {
            registry,
            introspector: OperationIntrospector::new(),
            cache: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<DataBindingRegistry> {
        &self.registry
    }

    /// 从反射描述解析接口。
    pub fn process(&self, descriptor: &InterfaceDescriptor) -> Result<Arc<Interface>> {
        if let Some(hit) = self.cache.get(&descriptor.name) {
            return Ok(Arc::clone(hit.value()));
        }
        let mut interface = self.introspector.introspect(descriptor)?;
        DataBindingAssigner::new(&self.registry).assign_interface(&mut interface, Some(descriptor))?;
        self.resolve_wrappers(&mut interface);
        Ok(self.publish(interface))
    }

    /// 处理装配模型预先填充的接口骨架（例如 WSDL 派生的接口）。
    pub fn process_skeleton(&self, mut interface: Interface) -> Result<Arc<Interface>> {
        if let Some(hit) = self.cache.get(interface.name()) {
            return Ok(Arc::clone(hit.value()));
        }
        DataBindingAssigner::new(&self.registry).assign_interface(&mut interface, None)?;
        self.resolve_wrappers(&mut interface);
        Ok(self.publish(interface))
    }

    pub fn cached(&self, name: &str) -> Option<Arc<Interface>> {
        self.cache.get(name).map(|entry| Arc::clone(entry.value()))
    }

    pub fn invalidate(&self, name: &str) -> bool {
        self.cache.remove(name).is_some()
    }

    fn resolve_wrappers(&self, interface: &mut Interface) {
        let resolver = WrapperResolver::new(&self.registry);
        interface.for_each_operation_mut(|operation| resolver.resolve(operation));
    }

    fn publish(&self, interface: Interface) -> Arc<Interface> {
        let name = interface.name().to_owned();
        debug!(interface = %name, "interface contract resolved");
        let entry = self.cache.entry(name).or_insert_with(|| Arc::new(interface));
        Arc::clone(entry.value())
    }
}
