//! # wire 模块说明
//!
//! ## 角色定位（Why）
//! - 运行时线路对应一个（组件、服务、绑定）三元组：绑定级链负责传输、操作选择与线缆格式，
//!   尾部的分发器再把调用交给逐操作的链（接口转换、策略、业务调用器）；
//! - 线路由 [`WireBuilder`](crate::WireBuilder) 在装配期构建，之后只读，可被任意线程并发调用。

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use weft_core::error::codes;
use weft_core::{Body, CoreError, FaultBody, Interface, Message, Operation};

use crate::chain::InvocationChain;
use crate::invoker::OperationDispatcher;

/// 装配完成的运行时线路。
pub struct RuntimeWire {
    name: String,
    service: Arc<Interface>,
    binding_interface: Arc<Interface>,
    binding_operations: Vec<Arc<Operation>>,
    binding_chain: Arc<InvocationChain>,
    dispatcher: Arc<OperationDispatcher>,
}

impl RuntimeWire {
    pub(crate) fn new(
        name: String,
        service: Arc<Interface>,
        binding_interface: Arc<Interface>,
        binding_operations: Vec<Arc<Operation>>,
        binding_chain: Arc<InvocationChain>,
        dispatcher: Arc<OperationDispatcher>,
    ) -> Self {
        Self {
            name,
            service,
            binding_interface,
            binding_operations,
            binding_chain,
            dispatcher,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 组件侧接口契约。
    pub fn service(&self) -> &Arc<Interface> {
        &self.service
    }

    /// 经线缆格式改写后的绑定侧接口契约。
    pub fn binding_interface(&self) -> &Arc<Interface> {
        &self.binding_interface
    }

    pub fn binding_chain(&self) -> &Arc<InvocationChain> {
        &self.binding_chain
    }

    /// 按逻辑名或底层方法名取操作链。
    pub fn chain(&self, operation: &str) -> Option<&Arc<InvocationChain>> {
        self.dispatcher.resolve(operation)
    }

    /// 从传输层入口驱动一次调用，完整经过绑定级链。
    pub fn invoke_binding(&self, message: Message) -> Message {
        self.binding_chain.run(message)
    }

    /// 本地引用调用：跳过绑定级链，直接进入操作链。
    ///
    /// 消息上的操作被设置为绑定侧契约中的同名操作，与经过操作选择器时一致。
    pub fn invoke(&self, operation: &str, args: Vec<Value>) -> Message {
        let request = Message::request(args);
        let Some(chain) = self.dispatcher.resolve(operation) else {
            let error = CoreError::new(
                codes::CHAIN_OPERATION_UNKNOWN,
                format!("wire `{}` has no operation `{operation}`", self.name),
            );
            return request.reply_fault(FaultBody::from_error(&error));
        };
        let request = match self.binding_operation(operation) {
            Some(binding_operation) => request.with_operation(binding_operation),
            None => request,
        };
        chain.run(request)
    }

    /// 调用方边界：把返回消息转为 `Result`。
    pub fn call(&self, operation: &str, args: Vec<Value>) -> Result<Option<Value>, FaultBody> {
        match self.invoke(operation, args).into_result()? {
            Some(Body::Value(value)) => Ok(Some(value)),
            Some(Body::Args(mut args)) if args.len() == 1 => Ok(args.pop()),
            Some(other) => Err(FaultBody::from_error(&CoreError::new(
                codes::INVOCATION_BODY_SHAPE,
                format!("unexpected response body {other:?}"),
            ))),
            None => Ok(None),
        }
    }

    /// 绑定侧契约中的操作，与操作选择器看到的实例相同。
    pub fn binding_operation(&self, name: &str) -> Option<Arc<Operation>> {
        self.binding_operations
            .iter()
            .find(|operation| operation.answers_to(name))
            .cloned()
    }
}

impl fmt::Debug for RuntimeWire {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuntimeWire")
            .field("name", &self.name)
            .field("binding_chain", &self.binding_chain)
            .field("operations", &self.dispatcher.chains().len())
            .finish()
    }
}
