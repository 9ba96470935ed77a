//! 解析流水线的端到端性质：确定性、覆盖优先级、操作级统一、默认排除、数组透明与包装抑制。

use std::sync::Arc;

use proptest::prelude::*;
use weft_core::{
    Annotation, BindingOrigin, ClassDescriptor, DataBinding, DataType, ElementInfo,
    IntrospectionContext, PhysicalType, QName, ScalarKind, WrapperInfo, binding_ids,
};
use weft_databinding::{
    DataBindingAssigner, DataBindingRegistry, InterfaceDescriptor, InterfaceProcessor,
    MethodDescriptor, OperationIntrospector,
};

/// 认领带指定标记注解的结构类，没有包装处理器。
struct MarkerBinding {
    name: &'static str,
    marker: &'static str,
}

impl DataBinding for MarkerBinding {
    fn name(&self) -> &str {
        self.name
    }

    fn introspect(&self, data_type: &mut DataType, _ctx: &IntrospectionContext<'_>) -> bool {
        let claims = data_type
            .physical()
            .as_class()
            .is_some_and(|class| class.has_marker(self.marker));
        claims && data_type.assign_binding(self.name, BindingOrigin::Introspected)
    }
}

fn registry() -> Arc<DataBindingRegistry> {
    let registry = DataBindingRegistry::with_builtins();
    registry.register(Arc::new(MarkerBinding {
        name: "JAXB",
        marker: "jaxb",
    }));
    registry.register(Arc::new(MarkerBinding {
        name: "SDO",
        marker: "sdo",
    }));
    Arc::new(registry)
}

fn marked(name: &str, marker: &str) -> PhysicalType {
    PhysicalType::class(ClassDescriptor::new(name).with_annotation(Annotation::Marker(marker.into())))
}

fn shape(kind: u8) -> PhysicalType {
    match kind % 6 {
        0 => PhysicalType::Scalar(ScalarKind::Int),
        1 => marked("Order", "jaxb"),
        2 => marked("Customer", "sdo"),
        3 => PhysicalType::class(ClassDescriptor::new("Bean")),
        4 => PhysicalType::array_of(marked("Line", "jaxb")),
        _ => PhysicalType::Any,
    }
}

fn signature(kinds: &[u8], output: Option<u8>) -> InterfaceDescriptor {
    let mut method = MethodDescriptor::new("call");
    for kind in kinds {
        method = method.param(shape(*kind), Vec::new());
    }
    if let Some(kind) = output {
        method = method.returns(shape(kind));
    }
    InterfaceDescriptor::new("Determinism").method(method)
}

fn bindings_of(registry: &DataBindingRegistry, descriptor: &InterfaceDescriptor) -> Vec<Option<String>> {
    let mut interface = OperationIntrospector::new()
        .introspect(descriptor)
        .expect("合法描述");
    DataBindingAssigner::new(registry)
        .assign_interface(&mut interface, Some(descriptor))
        .expect("分配成功");
    let operation = interface.operation("call").expect("操作存在");
    operation
        .data_types()
        .flat_map(|data_type| {
            std::iter::once(data_type.data_binding().map(str::to_owned)).chain(
                data_type
                    .nested()
                    .map(|nested| nested.data_binding().map(str::to_owned)),
            )
        })
        .chain(std::iter::once(operation.data_binding.clone()))
        .collect()
}

proptest! {
    #[test]
    fn assignment_is_deterministic(
        kinds in prop::collection::vec(any::<u8>(), 0..6),
        output in prop::option::of(any::<u8>()),
    ) {
        let registry = registry();
        let descriptor = signature(&kinds, output);
        let first = bindings_of(&registry, &descriptor);
        let second = bindings_of(&registry, &descriptor);
        prop_assert_eq!(first, second);
    }
}

#[test]
fn parameter_annotation_survives_class_default_and_introspection() {
    let registry = registry();
    registry.register(Arc::new(MarkerBinding {
        name: "A",
        marker: "a",
    }));
    registry.register(Arc::new(MarkerBinding {
        name: "B",
        marker: "b",
    }));
    let descriptor = InterfaceDescriptor::new("Orders")
        .annotate(Annotation::data_binding("A"))
        .method(
            MethodDescriptor::new("place")
                .param(marked("Order", "a"), vec![Annotation::data_type("B")])
                .returns(marked("Receipt", "a")),
        );
    let interface = InterfaceProcessor::new(registry)
        .process(&descriptor)
        .expect("解析成功");
    let operation = interface.operation("place").expect("操作存在");
    assert_eq!(operation.inputs[0].data_binding(), Some("B"));
    assert_eq!(operation.inputs[0].origin(), BindingOrigin::Declared);
    assert_eq!(
        operation.output.as_ref().and_then(DataType::data_binding),
        Some("A")
    );
}

#[test]
fn agreeing_positions_unify_and_disagreeing_positions_do_not() {
    let processor = InterfaceProcessor::new(registry());
    let descriptor = InterfaceDescriptor::new("Catalog")
        .method(
            MethodDescriptor::new("same")
                .param(marked("Query", "jaxb"), Vec::new())
                .returns(marked("Result", "jaxb")),
        )
        .method(
            MethodDescriptor::new("mixed")
                .param(marked("Query", "jaxb"), Vec::new())
                .returns(marked("Graph", "sdo")),
        );
    let interface = processor.process(&descriptor).expect("解析成功");
    assert_eq!(
        interface.operation("same").and_then(|op| op.data_binding.as_deref()),
        Some("JAXB")
    );
    let mixed = interface.operation("mixed").expect("操作存在");
    assert_eq!(mixed.data_binding, None);
    assert_eq!(mixed.inputs[0].data_binding(), Some("JAXB"));
    assert_eq!(
        mixed.output.as_ref().and_then(DataType::data_binding),
        Some("SDO")
    );
}

#[test]
fn default_bindings_alone_leave_operation_unset() {
    let processor = InterfaceProcessor::new(registry());
    let descriptor = InterfaceDescriptor::new("Calculator").method(
        MethodDescriptor::new("add")
            .param(PhysicalType::Scalar(ScalarKind::Int), Vec::new())
            .param(PhysicalType::class(ClassDescriptor::new("Bean")), Vec::new())
            .returns(PhysicalType::Scalar(ScalarKind::Long)),
    );
    let interface = processor.process(&descriptor).expect("解析成功");
    let operation = interface.operation("add").expect("操作存在");
    assert_eq!(operation.inputs[0].data_binding(), Some(binding_ids::SIMPLE));
    assert_eq!(
        operation.inputs[1].data_binding(),
        Some(binding_ids::PLAIN_OBJECT)
    );
    assert_eq!(operation.data_binding, None);
}

#[test]
fn array_positions_contribute_their_element_binding() {
    let processor = InterfaceProcessor::new(registry());
    let descriptor = InterfaceDescriptor::new("Lines").method(
        MethodDescriptor::new("bulk")
            .param(PhysicalType::array_of(marked("Line", "jaxb")), Vec::new())
            .param(PhysicalType::Scalar(ScalarKind::Int), Vec::new()),
    );
    let interface = processor.process(&descriptor).expect("解析成功");
    let operation = interface.operation("bulk").expect("操作存在");
    assert_eq!(operation.inputs[0].data_binding(), Some(binding_ids::ARRAY));
    assert_eq!(
        operation.inputs[0].nested().and_then(DataType::data_binding),
        Some("JAXB")
    );
    assert_eq!(operation.data_binding.as_deref(), Some("JAXB"));
}

#[test]
fn binding_without_wrapper_handler_suppresses_wrapper_types() {
    let processor = InterfaceProcessor::new(registry());
    let wrapper = WrapperInfo::new(
        Some(ElementInfo::new(QName::new("urn:crm", "lookup"))),
        vec![ElementInfo::new(QName::new("urn:crm", "id"))],
        Some(ElementInfo::new(QName::new("urn:crm", "lookupResponse"))),
        vec![ElementInfo::new(QName::new("urn:crm", "customer"))],
    );
    let descriptor = InterfaceDescriptor::new("Crm")
        .annotate(Annotation::wrapped_data_binding("SDO"))
        .method(
            MethodDescriptor::new("lookup")
                .param(marked("CustomerId", "sdo"), Vec::new())
                .returns(marked("Customer", "sdo"))
                .wrapper(wrapper),
        );
    let interface = processor.process(&descriptor).expect("解析成功");
    let operation = interface.operation("lookup").expect("操作存在");
    assert!(operation.wrapper_style);
    let wrapper = operation.wrapper.as_ref().expect("包装信息保留");
    assert!(wrapper.input_wrapper_type.is_none());
    assert!(wrapper.output_wrapper_type.is_none());
}

#[test]
fn processed_interfaces_are_cached_by_name() {
    let processor = InterfaceProcessor::new(registry());
    let descriptor = InterfaceDescriptor::new("Cached").method(
        MethodDescriptor::new("ping").param(PhysicalType::Scalar(ScalarKind::Int), Vec::new()),
    );
    let first = processor.process(&descriptor).expect("解析成功");
    let second = processor.process(&descriptor).expect("解析成功");
    assert!(Arc::ptr_eq(&first, &second));
    assert!(processor.invalidate("Cached"));
    let third = processor.process(&descriptor).expect("解析成功");
    assert!(!Arc::ptr_eq(&first, &third));
}

fn out_of_stock() -> PhysicalType {
    PhysicalType::class(
        ClassDescriptor::new("OutOfStock")
            .throwable()
            .with_annotation(Annotation::WebFault {
                element: QName::new("urn:shop", "outOfStock"),
            })
            .with_property("faultInfo", PhysicalType::Scalar(ScalarKind::String)),
    )
}

#[test]
fn web_fault_alone_decides_the_operation_binding() {
    let processor = InterfaceProcessor::new(registry());
    let descriptor = InterfaceDescriptor::new("Shop").method(
        MethodDescriptor::new("buy")
            .param(PhysicalType::Scalar(ScalarKind::Int), Vec::new())
            .throws(out_of_stock()),
    );
    let interface = processor.process(&descriptor).expect("解析成功");
    let operation = interface.operation("buy").expect("操作存在");
    let fault = &operation.faults[0];
    assert_eq!(fault.data_binding(), Some(binding_ids::XML_ELEMENT));
    let shape = fault.nested().expect("故障形状已写入");
    assert_eq!(shape.xml_element(), Some(&QName::new("urn:shop", "outOfStock")));
    assert_eq!(shape.physical(), &PhysicalType::Scalar(ScalarKind::String));
    assert_eq!(operation.data_binding.as_deref(), Some(binding_ids::XML_ELEMENT));
}

#[test]
fn class_default_does_not_hide_the_fault_element() {
    let processor = InterfaceProcessor::new(registry());
    let descriptor = InterfaceDescriptor::new("Warehouse")
        .annotate(Annotation::data_binding("JAXB"))
        .method(
            MethodDescriptor::new("reserve")
                .param(marked("Order", "jaxb"), Vec::new())
                .throws(out_of_stock()),
        );
    let interface = processor.process(&descriptor).expect("解析成功");
    let operation = interface.operation("reserve").expect("操作存在");
    assert_eq!(operation.inputs[0].data_binding(), Some("JAXB"));
    let fault = &operation.faults[0];
    assert_eq!(fault.data_binding(), Some(binding_ids::XML_ELEMENT));
    assert_eq!(fault.origin(), BindingOrigin::Introspected);
    assert_eq!(
        fault.nested().and_then(DataType::xml_element),
        Some(&QName::new("urn:shop", "outOfStock"))
    );
}
