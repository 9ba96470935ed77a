//! 业务目标调用器与按操作分发的调用器。

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};
use weft_core::error::codes;
use weft_core::{Body, CoreError, FaultBody, Invoker, Message};

use crate::chain::InvocationChain;

/// 业务目标函数：按参数下标接收实参，返回值或声明式故障。
pub type TargetFn = dyn Fn(Vec<Value>) -> Result<Value, FaultBody> + Send + Sync;

/// 业务目标调用器。
///
/// # 教案式说明
/// - **意图 (Why)**：业务实现抛出的异常不能以控制流形式穿越链路，必须落成故障体；
/// - **契约 (What)**：
///   - 目标返回 `Err` 时响应携带该故障体，正文为空；
///   - 开启隔离时目标 panic 被捕获为 `invocation.target_panic` 故障；
///   - 单向操作成功后响应不带正文；
///   - 收到未解码的原始字节时返回 `invocation.body_shape` 故障，说明链上缺少线缆格式拦截器；
/// - **权衡 (Trade-offs)**：捕获 panic 需要 `AssertUnwindSafe`，目标内部若持有被 panic 打断的锁，
///   后续调用仍可能观察到中毒状态，这部分由业务自行处理。
pub struct TargetInvoker {
    name: String,
    target: Arc<TargetFn>,
    isolate_panics: bool,
}

impl TargetInvoker {
    pub fn new<F>(name: impl Into<String>, target: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, FaultBody> + Send + Sync + 'static,
    {
        Self::from_shared(name, Arc::new(target))
    }

    pub fn from_shared(name: impl Into<String>, target: Arc<TargetFn>) -> Self {
        Self {
            name: name.into(),
            target,
            isolate_panics: true,
        }
    }

    pub fn isolate_panics(mut self, isolate: bool) -> Self {
        self.isolate_panics = isolate;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, args: Vec<Value>) -> Result<Value, FaultBody> {
        if !self.isolate_panics {
            return (self.target)(args);
        }
        match catch_unwind(AssertUnwindSafe(|| (self.target)(args))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = panic_reason(payload.as_ref());
                warn!(target_name = %self.name, %reason, "business target panicked");
                Err(FaultBody::from_error(&CoreError::new(
                    codes::INVOCATION_TARGET_PANIC,
                    format!("target `{}` panicked: {reason}", self.name),
                )))
            }
        }
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

impl Invoker for TargetInvoker {
    fn invoke(&self, mut message: Message) -> Message {
        if message.is_fault() {
            return message;
        }
        let args = match message.take_body() {
            None => Vec::new(),
            Some(Body::Args(args)) => args,
            Some(Body::Value(value)) => vec![value],
            Some(Body::Raw(bytes)) => {
                let error = CoreError::new(
                    codes::INVOCATION_BODY_SHAPE,
                    format!(
                        "target `{}` received {} undecoded bytes",
                        self.name,
                        bytes.len()
                    ),
                );
                return message.reply_fault(FaultBody::from_error(&error));
            }
        };
        let one_way = message.operation().is_some_and(|op| op.non_blocking);

        match self.call(args) {
            Ok(_) if one_way => message,
            Ok(value) => message.reply(Body::Value(value)),
            Err(fault) => {
                debug!(target_name = %self.name, code = %fault.code, "business fault captured");
                message.reply_fault(fault)
            }
        }
    }
}

impl fmt::Debug for TargetInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetInvoker")
            .field("name", &self.name)
            .field("isolate_panics", &self.isolate_panics)
            .finish()
    }
}

/// 按消息上已选定的操作把调用分发到对应的操作链。
///
/// 操作按逻辑名与底层方法名两种键登记，指向同一条链。
#[derive(Debug, Default)]
pub struct OperationDispatcher {
    interface: String,
    chains: Vec<Arc<InvocationChain>>,
    index: HashMap<String, usize>,
}

impl OperationDispatcher {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            ..Self::default()
        }
    }

    /// 登记一条操作链；链未绑定操作时以链名为键。
    pub fn insert(&mut self, chain: Arc<InvocationChain>) {
        let slot = self.chains.len();
        match chain.operation() {
            Some(operation) => {
                self.index.insert(operation.name.clone(), slot);
                if let Some(accessor) = &operation.accessor {
                    self.index.insert(accessor.clone(), slot);
                }
            }
            None => {
                self.index.insert(chain.name().to_owned(), slot);
            }
        }
        self.chains.push(chain);
    }

    pub fn resolve(&self, name: &str) -> Option<&Arc<InvocationChain>> {
        self.index.get(name).and_then(|slot| self.chains.get(*slot))
    }

    pub fn chains(&self) -> &[Arc<InvocationChain>] {
        &self.chains
    }

    fn unknown(&self, message: Message, detail: String) -> Message {
        let error = CoreError::new(codes::CHAIN_OPERATION_UNKNOWN, detail);
        warn!(interface = %self.interface, error = %error, "dispatch failed");
        message.reply_fault(FaultBody::from_error(&error))
    }
}

impl Invoker for OperationDispatcher {
    fn invoke(&self, message: Message) -> Message {
        if message.is_fault() {
            return message;
        }
        let Some(name) = message.operation().map(|op| op.name.clone()) else {
            let detail = format!("no operation selected for interface `{}`", self.interface);
            return self.unknown(message, detail);
        };
        match self.resolve(&name) {
            Some(chain) => chain.run(message),
            None => {
                let detail = format!("interface `{}` has no operation `{name}`", self.interface);
                self.unknown(message, detail)
            }
        }
    }
}
