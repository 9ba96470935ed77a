//! 包装解析：通过操作级绑定的包装处理器计算包装类型。

use tracing::debug;
use weft_core::Operation;

use crate::assignment::{derive_operation_binding, needs_operation_binding};
use crate::registry::DataBindingRegistry;

/// 包装解析器。
///
/// # 教案式说明
/// - **意图 (Why)**：包装风格操作在线缆上只有一个元素，下游需要知道该元素对应的类型；
/// - **流程 (How)**：
///   1. 仅处理带 [`weft_core::WrapperInfo`] 的操作；
///   2. 操作级绑定为空或等于 `xml:element` 占位时，先重跑一次操作级推导，避免基于陈旧决定计算；
///   3. 在注册表中查找操作级绑定；有包装处理器时分别计算输入、输出方向（各自允许为空）；
///   4. 找不到绑定或绑定没有包装处理器时，两个方向都显式置空，关闭包装类型生成；
/// - **契约 (What)**：不产生错误，缺少处理器是有意的抑制而非失败。
#[derive(Debug)]
pub struct WrapperResolver<'r> {
    registry: &'r DataBindingRegistry,
}

impl<'r> WrapperResolver<'r> {
    pub fn new(registry: &'r DataBindingRegistry) -> Self {
        Self { registry }
    }

    pub fn resolve(&self, operation: &mut Operation) {
        if operation.wrapper.is_none() {
            return;
        }
        if needs_operation_binding(operation) {
            if let Some(id) = derive_operation_binding(operation) {
                operation.data_binding = Some(id);
            }
        }

        let binding = operation
            .data_binding
            .as_deref()
            .and_then(|id| self.registry.lookup(id));
        let (input, output) = match binding.as_ref().and_then(|b| b.wrapper_handler()) {
            Some(handler) => (
                handler.wrapper_type(operation, true),
                handler.wrapper_type(operation, false),
            ),
            None => {
                debug!(
                    operation = %operation.name,
                    binding = ?operation.data_binding,
                    "no wrapper handler, wrapper types suppressed"
                );
                (None, None)
            }
        };

        if let Some(wrapper) = operation.wrapper.as_mut() {
            wrapper.input_wrapper_type = input;
            wrapper.output_wrapper_type = output;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::{DataType, ElementInfo, PhysicalType, QName, WrapperInfo, binding_ids};

    fn wrapped(binding: &str) -> Operation {
        let mut wrapper = WrapperInfo::new(
            Some(ElementInfo::new(QName::new("urn:shop", "place"))),
            vec![ElementInfo::new(QName::new("urn:shop", "item"))],
            Some(ElementInfo::new(QName::new("urn:shop", "placeResponse"))),
            vec![ElementInfo::new(QName::new("urn:shop", "id"))],
        );
        wrapper.input_wrapper_type = Some(DataType::new(PhysicalType::Any));
        wrapper.output_wrapper_type = Some(DataType::new(PhysicalType::Any));
        Operation::new("place")
            .with_data_binding(binding)
            .with_input(DataType::bound(binding, PhysicalType::Any))
            .with_wrapper(wrapper)
    }

    #[test]
    fn handler_supplies_both_directions() {
        let registry = DataBindingRegistry::with_builtins();
        let mut operation = wrapped(binding_ids::XML_ELEMENT);
        WrapperResolver::new(&registry).resolve(&mut operation);
        let wrapper = operation.wrapper.expect("包装信息保留");
        assert_eq!(
            wrapper
                .input_wrapper_type
                .as_ref()
                .and_then(DataType::xml_element),
            Some(&QName::new("urn:shop", "place"))
        );
        assert!(wrapper.output_wrapper_type.is_some());
    }

    #[test]
    fn unknown_binding_suppresses_wrapper_types() {
        let registry = DataBindingRegistry::with_builtins();
        let mut operation = wrapped("JAXB");
        WrapperResolver::new(&registry).resolve(&mut operation);
        let wrapper = operation.wrapper.expect("包装信息保留");
        assert!(operation.wrapper_style);
        assert!(wrapper.input_wrapper_type.is_none());
        assert!(wrapper.output_wrapper_type.is_none());
    }
}
