//! # assignment 模块说明
//!
//! ## 角色定位（Why）
//! - 为每个位置决定数据绑定，并在所有参与位置一致时推导操作级绑定；
//! - 是解析流水线的算法核心，纯内存计算，给定注册顺序时结果确定。
//!
//! ## 契约说明（What）
//! - 已声明的位置不被通用内省覆盖；
//! - 操作级绑定只在“当前为空或等于占位标识 `xml:element`”时重算；
//! - 推导集合中数组标记由元素绑定代替，普通对象与简单标量两种默认绑定不计入；
//!   剩余恰好一个时写入，否则保持为空，混合绑定是合法结果。

use std::collections::BTreeMap;

use tracing::debug;
use weft_core::{DataType, Interface, Operation, binding_ids};

use crate::error::IntrospectionError;
use crate::introspect::{InterfaceDescriptor, MethodDescriptor};
use crate::registry::DataBindingRegistry;

/// 触发操作级绑定重算的占位标识。
pub const AMBIGUOUS_PLACEHOLDER: &str = binding_ids::XML_ELEMENT;

/// 操作级绑定是否需要（重新）推导。
pub fn needs_operation_binding(operation: &Operation) -> bool {
    match operation.data_binding.as_deref() {
        None => true,
        Some(id) => id.eq_ignore_ascii_case(AMBIGUOUS_PLACEHOLDER),
    }
}

/// 计算操作级绑定候选；不修改操作。
pub fn derive_operation_binding(operation: &Operation) -> Option<String> {
    let mut candidates: BTreeMap<String, String> = BTreeMap::new();
    let mut contribute = |data_type: &DataType| {
        let id = match data_type.data_binding() {
            Some(id) if id.eq_ignore_ascii_case(binding_ids::ARRAY) => {
                data_type.nested().and_then(DataType::data_binding)
            }
            other => other,
        };
        if let Some(id) = id.filter(|id| !binding_ids::is_default(id)) {
            candidates
                .entry(id.to_lowercase())
                .or_insert_with(|| id.to_owned());
        }
    };

    for input in &operation.inputs {
        contribute(input);
    }
    if let Some(output) = &operation.output {
        contribute(output);
    }
    for fault in &operation.faults {
        contribute(fault.nested().unwrap_or(fault));
    }

    let mut ids = candidates.into_values();
    match (ids.next(), ids.next()) {
        (Some(only), None) => Some(only),
        _ => None,
    }
}

/// 数据绑定分配引擎。
///
/// # 教案式说明
/// - **意图 (Why)**：同一个接口可能混用多种绑定，分配必须逐位置进行，再尝试统一到操作级；
/// - **流程 (How)**：
///   1. 输入、输出交给注册表通用内省，附带对应位置的注解；
///   2. 故障以异常模式内省，命中异常处理器时故障形状与绑定一起写入；
///   3. 满足重算条件时推导操作级绑定；
/// - **契约 (What)**：按底层方法名或逻辑名定位操作，二者指向同一实例。
#[derive(Debug)]
pub struct DataBindingAssigner<'r> {
    registry: &'r DataBindingRegistry,
}

impl<'r> DataBindingAssigner<'r> {
    pub fn new(registry: &'r DataBindingRegistry) -> Self {
        Self { registry }
    }

    /// 为整个接口分配；`descriptor` 提供各位置的注解。
    pub fn assign_interface(
        &self,
        interface: &mut Interface,
        descriptor: Option<&InterfaceDescriptor>,
    ) -> Result<(), IntrospectionError> {
        let Some(descriptor) = descriptor else {
            return interface
                .try_for_each_operation_mut(|operation| self.assign_operation(operation, None));
        };
        let interface_name = interface.name().to_owned();
        for method in descriptor.methods.iter().filter(|method| !method.excluded) {
            interface
                .with_operation_mut(&method.name, |operation| {
                    self.assign_operation(operation, Some(method))
                })
                .ok_or_else(|| IntrospectionError::UnknownOperation {
                    interface: interface_name.clone(),
                    method: method.name.clone(),
                })??;
        }
        Ok(())
    }

    /// 为单个操作分配。
    pub fn assign_operation(
        &self,
        operation: &mut Operation,
        method: Option<&MethodDescriptor>,
    ) -> Result<(), IntrospectionError> {
        if let Some(method) = method {
            method.validate()?;
            if method.parameter_types.len() != operation.inputs.len() {
                return Err(IntrospectionError::ArityMismatch {
                    operation: operation.name.clone(),
                    declared: method.parameter_types.len(),
                    actual: operation.inputs.len(),
                });
            }
        }

        for (index, input) in operation.inputs.iter_mut().enumerate() {
            let annotations = method.map(|m| m.annotations_for(index)).unwrap_or(&[]);
            self.registry.introspect_type(input, annotations, false);
        }
        if let Some(output) = operation.output.as_mut() {
            let annotations = method.map(|m| m.annotations.as_slice()).unwrap_or(&[]);
            self.registry.introspect_type(output, annotations, false);
        }
        for fault in operation.faults.iter_mut() {
            self.registry.introspect_type(fault, &[], true);
        }

        self.unify(operation);
        Ok(())
    }

    /// 满足条件时推导并写入操作级绑定。
    pub fn unify(&self, operation: &mut Operation) {
        if !needs_operation_binding(operation) {
            return;
        }
        match derive_operation_binding(operation) {
            Some(id) => {
                debug!(operation = %operation.name, binding = %id, "operation binding derived");
                operation.data_binding = Some(id);
            }
            None => {
                debug!(
                    operation = %operation.name,
                    current = ?operation.data_binding,
                    "operation binding left as is"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::{ClassDescriptor, PhysicalType, ScalarKind};

    fn bound(id: &str) -> DataType {
        DataType::bound(id, PhysicalType::Any)
    }

    #[test]
    fn single_non_default_binding_unifies() {
        let operation = Operation::new("get")
            .with_input(bound("JAXB"))
            .with_output(bound("JAXB"));
        assert_eq!(derive_operation_binding(&operation).as_deref(), Some("JAXB"));
    }

    #[test]
    fn mixed_bindings_stay_unset() {
        let operation = Operation::new("get")
            .with_input(bound("JAXB"))
            .with_output(bound("SDO"));
        assert_eq!(derive_operation_binding(&operation), None);
    }

    #[test]
    fn defaults_never_count() {
        let operation = Operation::new("get")
            .with_input(bound(binding_ids::PLAIN_OBJECT))
            .with_input(bound(binding_ids::SIMPLE))
            .with_output(bound(binding_ids::PLAIN_OBJECT));
        assert_eq!(derive_operation_binding(&operation), None);
    }

    #[test]
    fn case_variants_count_as_one_binding() {
        let operation = Operation::new("get")
            .with_input(bound("JAXB"))
            .with_output(bound("jaxb"));
        assert_eq!(derive_operation_binding(&operation).as_deref(), Some("JAXB"));
    }

    #[test]
    fn arrays_contribute_their_element_binding() {
        let mut array = DataType::new(PhysicalType::array_of(PhysicalType::class(
            ClassDescriptor::new("Item"),
        )));
        array.assign_binding(binding_ids::ARRAY, weft_core::BindingOrigin::Introspected);
        array
            .nested_mut()
            .expect("数组有元素类型")
            .declare_binding("X");
        let operation = Operation::new("list")
            .with_input(array)
            .with_input(DataType::bound(
                binding_ids::SIMPLE,
                PhysicalType::Scalar(ScalarKind::Int),
            ));
        assert_eq!(derive_operation_binding(&operation).as_deref(), Some("X"));
    }

    #[test]
    fn explicit_operation_binding_is_left_alone() {
        let registry = DataBindingRegistry::with_builtins();
        let mut operation = Operation::new("get")
            .with_data_binding("SDO")
            .with_input(bound("JAXB"));
        DataBindingAssigner::new(&registry)
            .assign_operation(&mut operation, None)
            .expect("分配成功");
        assert_eq!(operation.data_binding.as_deref(), Some("SDO"));
    }

    #[test]
    fn placeholder_operation_binding_is_recomputed() {
        let registry = DataBindingRegistry::with_builtins();
        let mut operation = Operation::new("get")
            .with_data_binding(binding_ids::XML_ELEMENT)
            .with_input(bound("JAXB"))
            .with_output(bound("JAXB"));
        DataBindingAssigner::new(&registry)
            .assign_operation(&mut operation, None)
            .expect("分配成功");
        assert_eq!(operation.data_binding.as_deref(), Some("JAXB"));
    }

    #[test]
    fn skeleton_arity_must_match_method() {
        let registry = DataBindingRegistry::with_builtins();
        let mut operation = Operation::new("get").with_input(bound("JAXB"));
        let method = MethodDescriptor::new("get");
        let err = DataBindingAssigner::new(&registry)
            .assign_operation(&mut operation, Some(&method))
            .expect_err("参数个数不符");
        assert!(matches!(err, IntrospectionError::ArityMismatch { .. }));
    }
}
