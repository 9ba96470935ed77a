//! # transform 模块说明
//!
//! ## 角色定位（Why）
//! - 绑定侧接口契约（经线缆格式改写）与组件侧接口契约可能在包装风格或数据绑定上不同，
//!   此时需要在接口阶段插入数据转换拦截器；
//! - 两侧一致时不插入，调用路径上不产生额外开销。
//!
//! ## 契约说明（What）
//! - [`is_transformation_required`] 比较包装风格、输出绑定、输入个数与逐个输入绑定；
//!   任一侧绑定未知时视为无需转换；
//! - [`DataTransformationInterceptor`] 只改写正文，故障体原样放行。

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use weft_core::error::codes;
use weft_core::{
    Body, CoreError, DataType, FaultBody, Flow, Interceptor, InterceptorDescriptor, Message,
    Operation, Result, TransformationContext, WrapperHandler,
};
use weft_databinding::DataBindingRegistry;

fn binding_differs(source: Option<&DataType>, target: Option<&DataType>) -> bool {
    let (Some(source), Some(target)) = (source, target) else {
        return false;
    };
    match (source.data_binding(), target.data_binding()) {
        (Some(source), Some(target)) => !source.eq_ignore_ascii_case(target),
        _ => false,
    }
}

/// 两个操作之间是否需要数据转换。
///
/// 输出方向以目标为源、调用方为目标比较。
pub fn is_transformation_required(source: &Operation, target: &Operation) -> bool {
    if std::ptr::eq(source, target) {
        return false;
    }
    if source.wrapper_style != target.wrapper_style {
        return true;
    }
    if binding_differs(target.output.as_ref(), source.output.as_ref()) {
        return true;
    }
    if source.inputs.len() != target.inputs.len() {
        return true;
    }
    source
        .inputs
        .iter()
        .zip(&target.inputs)
        .any(|(source, target)| binding_differs(Some(source), Some(target)))
}

/// 单个值在两种数据表示之间的中介。
pub trait Mediator: Send + Sync {
    /// 把 `value` 从 `source` 形状转为 `target` 形状；任一侧缺省表示形状未知。
    fn mediate(
        &self,
        value: Value,
        source: Option<&DataType>,
        target: Option<&DataType>,
        ctx: &TransformationContext<'_>,
    ) -> Result<Value>;
}

/// 默认中介：按目标绑定的 `copy` 复制，形成按值传递语义；找不到绑定时原样返回。
#[derive(Debug)]
pub struct CopyMediator {
    registry: Arc<DataBindingRegistry>,
}

impl CopyMediator {
    pub fn new(registry: Arc<DataBindingRegistry>) -> Self {
        Self { registry }
    }
}

impl Mediator for CopyMediator {
    fn mediate(
        &self,
        value: Value,
        source: Option<&DataType>,
        target: Option<&DataType>,
        _ctx: &TransformationContext<'_>,
    ) -> Result<Value> {
        let Some(data_type) = target.or(source) else {
            return Ok(value);
        };
        match data_type
            .data_binding()
            .and_then(|id| self.registry.lookup(id))
        {
            Some(binding) => binding.copy(&value, data_type),
            None => Ok(value),
        }
    }
}

/// 数据转换拦截器。
///
/// # 教案式说明
/// - **意图 (Why)**：调用方按绑定侧契约传参，组件按自身契约接收，两者之间的包装/拆包与逐值中介
///   集中在一个拦截器里完成；
/// - **流程 (How)**：
///   - 请求：源为包装风格、目标不是时，用源绑定的包装处理器拆出子元素；反之用目标绑定的包装处理器
///     创建包装元素并逐个写入（已经是包装实例时原样放行）；其余情况逐位置中介；
///   - 响应：方向相反，输出包装至多一个子元素；
///   - 任一步失败写入 `transform.*` 故障，执行器随即短路；
/// - **契约 (What)**：不持有调用期状态，可被并发复用。
pub struct DataTransformationInterceptor {
    source: Arc<Operation>,
    target: Arc<Operation>,
    registry: Arc<DataBindingRegistry>,
    mediator: Arc<dyn Mediator>,
}

impl DataTransformationInterceptor {
    pub fn new(
        source: Arc<Operation>,
        target: Arc<Operation>,
        registry: Arc<DataBindingRegistry>,
        mediator: Arc<dyn Mediator>,
    ) -> Self {
        Self {
            source,
            target,
            registry,
            mediator,
        }
    }

    pub fn source(&self) -> &Arc<Operation> {
        &self.source
    }

    pub fn target(&self) -> &Arc<Operation> {
        &self.target
    }

    fn with_wrapper_handler<R>(
        &self,
        operation: &Operation,
        f: impl FnOnce(&dyn WrapperHandler) -> Result<R>,
    ) -> Result<R> {
        let binding = operation
            .data_binding
            .as_deref()
            .and_then(|id| self.registry.lookup(id));
        match binding.as_ref().and_then(|binding| binding.wrapper_handler()) {
            Some(handler) => f(handler),
            None => Err(CoreError::new(
                codes::TRANSFORM_WRAPPER,
                format!(
                    "operation `{}` is wrapper style but binding {:?} has no wrapper handler",
                    operation.name, operation.data_binding
                ),
            )),
        }
    }

    fn mediate(
        &self,
        value: Value,
        source: Option<&DataType>,
        target: Option<&DataType>,
        ctx: &TransformationContext<'_>,
    ) -> Result<Value> {
        self.mediator.mediate(value, source, target, ctx).map_err(|err| {
            CoreError::new(
                codes::TRANSFORM_MEDIATION,
                format!("mediation failed: {}", err.message()),
            )
            .with_cause(err)
        })
    }

    fn transform_input(&self, args: Vec<Value>) -> Result<Vec<Value>> {
        let source = self.source.as_ref();
        let target = self.target.as_ref();
        let ctx = TransformationContext::new(source, target);

        match (wrapped(source), wrapped(target)) {
            (true, false) => {
                let children = source
                    .wrapper
                    .as_ref()
                    .map(|info| info.child_elements(true))
                    .unwrap_or_default();
                let wrapper = args.into_iter().next().unwrap_or(Value::Null);
                let values = self.with_wrapper_handler(source, |handler| {
                    handler.children(&wrapper, children, &ctx)
                })?;
                if values.len() != target.inputs.len() {
                    return Err(CoreError::new(
                        codes::TRANSFORM_WRAPPER,
                        format!(
                            "wrapper of `{}` carries {} children but `{}` takes {} arguments",
                            source.name,
                            values.len(),
                            target.name,
                            target.inputs.len()
                        ),
                    ));
                }
                values
                    .into_iter()
                    .zip(&target.inputs)
                    .map(|(value, data_type)| self.mediate(value, None, Some(data_type), &ctx))
                    .collect()
            }
            (false, true) => {
                let Some(info) = target.wrapper.as_ref() else {
                    return Ok(args);
                };
                let Some(element) = info.wrapper_element(true) else {
                    return Ok(args);
                };
                let children = info.child_elements(true);
                let wrapper = self.with_wrapper_handler(target, |handler| {
                    if let [single] = args.as_slice() {
                        if handler.is_instance(single, element, children, &ctx) {
                            return Ok(single.clone());
                        }
                    }
                    if args.len() != children.len() {
                        return Err(CoreError::new(
                            codes::TRANSFORM_WRAPPER,
                            format!(
                                "`{}` passes {} arguments but wrapper of `{}` has {} children",
                                source.name,
                                args.len(),
                                target.name,
                                children.len()
                            ),
                        ));
                    }
                    let mut wrapper = handler.create(element, &ctx)?;
                    for (index, (child, value)) in children.iter().zip(args.iter()).enumerate() {
                        let value =
                            self.mediate(value.clone(), source.inputs.get(index), None, &ctx)?;
                        handler.set_child(&mut wrapper, index, child, value)?;
                    }
                    Ok(wrapper)
                })?;
                Ok(vec![wrapper])
            }
            _ => args
                .into_iter()
                .enumerate()
                .map(|(index, value)| {
                    self.mediate(value, source.inputs.get(index), target.inputs.get(index), &ctx)
                })
                .collect(),
        }
    }

    fn transform_output(&self, value: Value) -> Result<Value> {
        let source = self.source.as_ref();
        let target = self.target.as_ref();
        let ctx = TransformationContext::new(target, source);

        match (wrapped(target), wrapped(source)) {
            (true, false) => {
                let children = target
                    .wrapper
                    .as_ref()
                    .map(|info| info.child_elements(false))
                    .unwrap_or_default();
                let mut values = self.with_wrapper_handler(target, |handler| {
                    handler.children(&value, children, &ctx)
                })?;
                let first = if values.is_empty() {
                    Value::Null
                } else {
                    values.swap_remove(0)
                };
                self.mediate(first, None, source.output.as_ref(), &ctx)
            }
            (false, true) => {
                let Some(info) = source.wrapper.as_ref() else {
                    return Ok(value);
                };
                let Some(element) = info.wrapper_element(false) else {
                    return Ok(value);
                };
                let children = info.child_elements(false);
                let value = self.mediate(value, target.output.as_ref(), None, &ctx)?;
                self.with_wrapper_handler(source, |handler| {
                    let mut wrapper = handler.create(element, &ctx)?;
                    if let Some(child) = children.first() {
                        handler.set_child(&mut wrapper, 0, child, value)?;
                    }
                    Ok(wrapper)
                })
            }
            _ => self.mediate(value, target.output.as_ref(), source.output.as_ref(), &ctx),
        }
    }
}

fn wrapped(operation: &Operation) -> bool {
    operation.wrapper_style && operation.wrapper.is_some()
}

impl Interceptor for DataTransformationInterceptor {
    fn descriptor(&self) -> InterceptorDescriptor {
        InterceptorDescriptor::new(
            "weft.transform.data",
            "interface",
            "wraps, unwraps and mediates values between binding and component contracts",
        )
    }

    fn on_request(&self, mut message: Message) -> Flow {
        if message.is_fault() {
            return Flow::Continue(message);
        }
        let args = match message.take_body() {
            Some(Body::Args(args)) => args,
            Some(Body::Value(value)) => vec![value],
            Some(other) => {
                message.set_body(other);
                return Flow::Continue(message);
            }
            None => return Flow::Continue(message),
        };
        match self.transform_input(args) {
            Ok(args) => message.set_body(Body::Args(args)),
            Err(err) => {
                debug!(operation = %self.target.name, error = %err, "request transformation failed");
                message.set_fault(FaultBody::from_error(&err));
            }
        }
        Flow::Continue(message)
    }

    fn on_response(&self, mut message: Message) -> Message {
        if message.is_fault() {
            return message;
        }
        let value = match message.take_body() {
            Some(Body::Value(value)) => value,
            Some(other) => {
                message.set_body(other);
                return message;
            }
            None => return message,
        };
        match self.transform_output(value) {
            Ok(value) => message.set_body(Body::Value(value)),
            Err(err) => {
                debug!(operation = %self.target.name, error = %err, "response transformation failed");
                message.set_fault(FaultBody::from_error(&err));
            }
        }
        message
    }
}

impl fmt::Debug for DataTransformationInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataTransformationInterceptor")
            .field("source", &self.source.name)
            .field("target", &self.target.name)
            .finish()
    }
}
