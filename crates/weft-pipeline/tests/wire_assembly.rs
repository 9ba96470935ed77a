//! 线路装配与调用的端到端行为：线缆格式去重、阶段顺序、故障不外泄、绑定校验与接口转换。

use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{Value, json};
use weft_core::error::codes;
use weft_core::{
    Body, DataType, ElementInfo, FaultBody, Flow, Interceptor, InterceptorDescriptor, Interface,
    Message, Operation, OperationSelectorProvider, Phase, PhysicalType, PolicyProvider, QName,
    Result, ScalarKind, TransportProvider, WireFormatProvider, WrapperInfo, binding_ids,
};
use weft_databinding::DataBindingRegistry;
use weft_databinding::builtin::ELEMENT_KEY;
use weft_pipeline::{
    BindingProviders, ChainError, ComponentTargets, InvocationChain, WireBuilder,
};

struct Passthrough(String);

impl Interceptor for Passthrough {
    fn descriptor(&self) -> InterceptorDescriptor {
        InterceptorDescriptor::new(self.0.clone(), "test", "forwards unchanged")
    }

    fn on_request(&self, message: Message) -> Flow {
        Flow::Continue(message)
    }
}

struct StubTransport;

impl TransportProvider for StubTransport {
    fn create_interceptor(&self) -> Result<Arc<dyn Interceptor>> {
        Ok(Arc::new(Passthrough("transport".into())))
    }
}

struct StubFormat {
    id: &'static str,
    wraps: bool,
}

impl WireFormatProvider for StubFormat {
    fn format_id(&self) -> &str {
        self.id
    }

    fn create_interceptor(&self) -> Result<Arc<dyn Interceptor>> {
        Ok(Arc::new(Passthrough(self.id.to_owned())))
    }

    fn configure_interface_contract(&self, interface: &mut Interface) -> Result<()> {
        if self.wraps {
            interface.for_each_operation_mut(|operation| *operation = wrapped(operation));
        }
        Ok(())
    }
}

/// 从 `operation` 头部选择操作。
struct HeaderSelector;

struct HeaderSelectorInterceptor {
    operations: Vec<Arc<Operation>>,
}

impl Interceptor for HeaderSelectorInterceptor {
    fn descriptor(&self) -> InterceptorDescriptor {
        InterceptorDescriptor::new("selector", "test", "selects by header")
    }

    fn on_request(&self, mut message: Message) -> Flow {
        let selected = message
            .header("operation")
            .and_then(|name| self.operations.iter().find(|op| op.answers_to(name)))
            .cloned();
        if let Some(operation) = selected {
            message.set_operation(operation);
        }
        Flow::Continue(message)
    }
}

impl OperationSelectorProvider for HeaderSelector {
    fn create_interceptor(&self, operations: &[Arc<Operation>]) -> Result<Arc<dyn Interceptor>> {
        Ok(Arc::new(HeaderSelectorInterceptor {
            operations: operations.to_vec(),
        }))
    }
}

/// 拒绝所有调用的业务策略。
struct DenyAll;

struct DenyInterceptor;

impl Interceptor for DenyInterceptor {
    fn descriptor(&self) -> InterceptorDescriptor {
        InterceptorDescriptor::new("deny", "policy", "rejects every request")
    }

    fn on_request(&self, mut message: Message) -> Flow {
        message.set_fault(FaultBody::business("AccessDenied", "caller not authorized"));
        Flow::Continue(message)
    }
}

impl PolicyProvider for DenyAll {
    fn create_interceptor(&self, _operation: &Operation) -> Result<Option<Arc<dyn Interceptor>>> {
        Ok(Some(Arc::new(DenyInterceptor)))
    }
}

fn int() -> DataType {
    DataType::bound(binding_ids::SIMPLE, PhysicalType::Scalar(ScalarKind::Int))
}

fn calculator() -> Arc<Interface> {
    let mut interface = Interface::new("Calculator");
    interface
        .add_operation(
            Operation::new("add")
                .with_input(int())
                .with_input(int())
                .with_output(int()),
        )
        .expect("操作唯一");
    interface
        .add_operation(
            Operation::new("divide")
                .with_input(int())
                .with_input(int())
                .with_output(int()),
        )
        .expect("操作唯一");
    Arc::new(interface)
}

fn wrapped(operation: &Operation) -> Operation {
    let element = |local: String| ElementInfo::new(QName::new("urn:calc", local));
    let mut wrapped = Operation::new(operation.name.clone())
        .with_data_binding(binding_ids::XML_ELEMENT)
        .with_input(DataType::bound(binding_ids::XML_ELEMENT, PhysicalType::Any))
        .with_output(DataType::bound(binding_ids::XML_ELEMENT, PhysicalType::Any))
        .with_wrapper(WrapperInfo::new(
            Some(element(operation.name.clone())),
            vec![element("a".into()), element("b".into())],
            Some(element(format!("{}Response", operation.name))),
            vec![element("result".into())],
        ));
    wrapped.accessor = operation.accessor.clone();
    wrapped
}

fn targets() -> ComponentTargets {
    ComponentTargets::new()
        .with_fn("add", |args: Vec<Value>| {
            Ok(json!(args.iter().filter_map(Value::as_i64).sum::<i64>()))
        })
        .with_fn("divide", |args: Vec<Value>| {
            match (args.first().and_then(Value::as_i64), args.get(1).and_then(Value::as_i64)) {
                (Some(_), Some(0)) => Err(FaultBody::business("DivideByZero", "divisor is zero")),
                (Some(a), Some(b)) => Ok(json!(a / b)),
                _ => Err(FaultBody::business("BadArguments", "two integers expected")),
            }
        })
}

fn builder() -> WireBuilder {
    WireBuilder::new(Arc::new(DataBindingRegistry::with_builtins()))
}

fn format_names(chain: &InvocationChain) -> Vec<String> {
    chain
        .interceptors_at(Phase::WireFormat)
        .map(|interceptor| interceptor.descriptor().name().to_owned())
        .collect()
}

#[test]
fn identical_request_and_response_formats_attach_once() {
    let providers = BindingProviders::new()
        .transport(Arc::new(StubTransport))
        .selector(Arc::new(HeaderSelector))
        .wire_format(Arc::new(StubFormat {
            id: "wireformat.json",
            wraps: false,
        }))
        .response_format(Arc::new(StubFormat {
            id: "wireformat.json",
            wraps: false,
        }));
    let wire = builder()
        .build("calc", calculator(), &providers, &targets())
        .expect("装配成功");
    assert_eq!(format_names(wire.binding_chain()), vec!["wireformat.json"]);

    let phases: Vec<Phase> = wire
        .binding_chain()
        .entries()
        .iter()
        .map(|entry| entry.phase())
        .collect();
    assert_eq!(
        phases,
        vec![Phase::Transport, Phase::OperationSelection, Phase::WireFormat]
    );
}

#[test]
fn distinct_response_format_follows_request_format() {
    let providers = BindingProviders::new()
        .transport(Arc::new(StubTransport))
        .wire_format(Arc::new(StubFormat {
            id: "wireformat.soap",
            wraps: false,
        }))
        .response_format(Arc::new(StubFormat {
            id: "wireformat.json",
            wraps: false,
        }));
    let wire = builder()
        .build("calc", calculator(), &providers, &targets())
        .expect("装配成功");
    assert_eq!(
        format_names(wire.binding_chain()),
        vec!["wireformat.soap", "wireformat.json"]
    );
}

#[test]
fn business_fault_is_returned_as_data() {
    let providers = BindingProviders::new()
        .transport(Arc::new(StubTransport))
        .selector(Arc::new(HeaderSelector));
    let wire = builder()
        .build("calc", calculator(), &providers, &targets())
        .expect("装配成功");

    let reply = wire.invoke_binding(
        Message::request(vec![json!(4), json!(0)]).with_header("operation", "divide"),
    );
    let fault = reply.fault().expect("故障体");
    assert_eq!(fault.fault_type.as_deref(), Some("DivideByZero"));
    assert!(reply.body().is_none());

    assert_eq!(
        wire.call("divide", vec![json!(9), json!(3)]),
        Ok(Some(json!(3)))
    );
    let err = wire
        .call("divide", vec![json!(1), json!(0)])
        .expect_err("故障只在调用方边界变成 Err");
    assert_eq!(err.code, codes::INVOCATION_BUSINESS_FAULT);
}

#[test]
fn policy_fault_short_circuits_before_the_target() {
    let providers = BindingProviders::new().policy(Arc::new(DenyAll));
    let wire = builder()
        .build("calc", calculator(), &providers, &targets())
        .expect("装配成功");
    let reply = wire.invoke("add", vec![json!(1), json!(2)]);
    assert_eq!(
        reply.fault().and_then(|f| f.fault_type.as_deref()),
        Some("AccessDenied")
    );
    let chain = wire.chain("add").expect("操作链");
    assert_eq!(chain.interceptors_at(Phase::BindingPolicy).count(), 1);
}

#[test]
fn unselected_operation_is_a_fault_not_a_panic() {
    let wire = builder()
        .build("calc", calculator(), &BindingProviders::new(), &targets())
        .expect("装配成功");
    let reply = wire.invoke_binding(Message::request(vec![json!(1)]));
    assert_eq!(
        reply.fault().map(|f| f.code.as_str()),
        Some(codes::CHAIN_OPERATION_UNKNOWN)
    );
}

#[test]
fn unresolved_declared_binding_fails_the_build() {
    let mut interface = Interface::new("Catalog");
    interface
        .add_operation(Operation::new("find").with_input(DataType::bound("sdo", PhysicalType::Any)))
        .expect("操作唯一");
    let targets = ComponentTargets::new().with_fn("find", |_args: Vec<Value>| Ok(Value::Null));
    let err = builder()
        .build("catalog", Arc::new(interface), &BindingProviders::new(), &targets)
        .expect_err("sdo 未登记");
    assert!(matches!(err, ChainError::Binding(_)));
    let core: weft_core::CoreError = err.into();
    assert_eq!(core.code(), codes::DATABINDING_UNRESOLVED);
}

#[test]
fn operation_without_target_fails_the_build() {
    let targets = ComponentTargets::new().with_fn("add", |_args: Vec<Value>| Ok(Value::Null));
    let err = builder()
        .build("calc", calculator(), &BindingProviders::new(), &targets)
        .expect_err("divide 没有实现");
    assert!(matches!(err, ChainError::NoInvoker { chain } if chain == "calc/Calculator#divide"));
}

#[test]
fn wrapper_style_binding_contract_is_transformed_for_the_component() {
    let providers = BindingProviders::new()
        .selector(Arc::new(HeaderSelector))
        .wire_format(Arc::new(StubFormat {
            id: "wireformat.xml",
            wraps: true,
        }));
    let service = calculator();
    let wire = builder()
        .build("calc", Arc::clone(&service), &providers, &targets())
        .expect("装配成功");

    assert!(!service.operation("add").is_some_and(|op| op.wrapper_style));
    assert!(wire.binding_interface().operation("add").is_some_and(|op| op.wrapper_style));
    let chain = wire.chain("add").expect("操作链");
    assert_eq!(chain.interceptors_at(Phase::Interface).count(), 1);

    let request = Message::request(vec![json!({ ELEMENT_KEY: "{urn:calc}add", "a": 2, "b": 5 })])
        .with_header("operation", "add");
    let reply = wire.invoke_binding(request);
    assert_eq!(
        reply.body(),
        Some(&Body::Value(json!({ ELEMENT_KEY: "{urn:calc}addResponse", "result": 7 })))
    );
}

#[derive(Clone, Copy, Debug)]
struct Attach {
    phase: usize,
}

proptest! {
    #[test]
    fn chain_entries_stay_phase_ordered_and_stable(
        attachments in prop::collection::vec((0..Phase::ALL.len()).prop_map(|phase| Attach { phase }), 0..24),
    ) {
        let mut chain = InvocationChain::new("random");
        for (index, attach) in attachments.iter().enumerate() {
            chain.add_interceptor(Phase::ALL[attach.phase], Arc::new(Passthrough(index.to_string())));
        }
        let observed: Vec<(Phase, usize)> = chain
            .entries()
            .iter()
            .map(|entry| {
                let index = entry.descriptor().name().parse::<usize>().unwrap_or(usize::MAX);
                (entry.phase(), index)
            })
            .collect();
        let mut expected: Vec<(Phase, usize)> = attachments
            .iter()
            .enumerate()
            .map(|(index, attach)| (Phase::ALL[attach.phase], index))
            .collect();
        expected.sort_by_key(|(phase, _)| *phase);
        prop_assert_eq!(observed, expected);
    }
}
