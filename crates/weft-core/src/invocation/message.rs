//! # message 模块说明
//!
//! ## 角色定位（Why）
//! - [`Message`] 是单次调用的信封，在调用链中前向流动、响应时逆向流回；
//! - 故障以 [`FaultBody`] 作为数据随消息传递，不以语言层面的错误穿越拦截器边界。
//!
//! ## 契约说明（What）
//! - 正文与故障体互斥：写入正文会清除故障，写入故障会丢弃正文；
//! - 只有面向调用方的最外层通过 [`Message::into_result`] 把故障转换为 `Err`。

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, codes};
use crate::model::Operation;

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// 进程内唯一的消息标识。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u64);

impl MessageId {
    /// 分配新的标识；只要求唯一，不要求跨线程严格递增。
    pub fn next() -> Self {
        MessageId(NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "msg-{}", self.0)
    }
}

/// 消息正文。
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    /// 按参数下标排列的实参。
    Args(Vec<Value>),
    /// 单个已解码值，通常是返回值。
    Value(Value),
    /// 传输层尚未解码的原始字节。
    Raw(Bytes),
}

impl Body {
    pub fn as_args(&self) -> Option<&[Value]> {
        match self {
            Body::Args(args) => Some(args),
            _ => None,
        }
    }
}

/// 调用期故障体。
///
/// - `code` 为稳定错误码或业务故障码；
/// - `fault_type` 为业务异常的类型名（若可知），供线缆层选择故障元素；
/// - `detail` 为结构化细节。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaultBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl FaultBody {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            fault_type: None,
            detail: None,
        }
    }

    /// 业务目标抛出的声明式故障。
    pub fn business(fault_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: codes::INVOCATION_BUSINESS_FAULT.to_owned(),
            message: message.into(),
            fault_type: Some(fault_type.into()),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// 把运行时错误转为故障体。
    pub fn from_error(error: &CoreError) -> Self {
        Self::new(error.code(), error.message())
    }
}

impl From<CoreError> for FaultBody {
    fn from(error: CoreError) -> Self {
        FaultBody::from_error(&error)
    }
}

impl fmt::Display for FaultBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fault_type {
            Some(fault_type) => write!(f, "[{}] {fault_type}: {}", self.code, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}

impl std::error::Error for FaultBody {}

#[derive(Clone, Debug, Default, PartialEq)]
enum Payload {
    #[default]
    Empty,
    Body(Body),
    Fault(FaultBody),
}

/// 单次调用的信封。
///
/// # 教案式说明
/// - **意图 (Why)**：拦截器之间只通过消息交换状态，链本身保持无状态，可被多线程并发复用；
/// - **契约 (What)**：
///   - [`set_body`](Self::set_body) 清除故障，[`set_fault`](Self::set_fault) 丢弃正文；
///   - `operation` 由操作选择器写入，线缆格式据此解码；
///   - `headers` 承载绑定上下文，例如传输层提取的操作名；
/// - **权衡 (Trade-offs)**：按值流转，拦截器返回新的消息，避免共享可变引用。
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    id: MessageId,
    correlation_id: Option<MessageId>,
    operation: Option<Arc<Operation>>,
    headers: BTreeMap<String, String>,
    payload: Payload,
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

impl Message {
    pub fn new() -> Self {
        Self {
            id: MessageId::next(),
            correlation_id: None,
            operation: None,
            headers: BTreeMap::new(),
            payload: Payload::Empty,
        }
    }

    /// 以实参构造请求。
    pub fn request(args: Vec<Value>) -> Self {
        Self::new().with_body(Body::Args(args))
    }

    /// 以原始字节构造入站请求。
    pub fn raw(bytes: impl Into<Bytes>) -> Self {
        Self::new().with_body(Body::Raw(bytes.into()))
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.set_body(body);
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn with_operation(mut self, operation: Arc<Operation>) -> Self {
        self.operation = Some(operation);
        self
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn correlation_id(&self) -> Option<MessageId> {
        self.correlation_id
    }

    /// 构造与本消息关联的响应，保留操作与头部。
    pub fn reply(&self, body: Body) -> Message {
        Message {
            id: MessageId::next(),
            correlation_id: Some(self.id),
            operation: self.operation.clone(),
            headers: self.headers.clone(),
            payload: Payload::Body(body),
        }
    }

    /// 构造与本消息关联的故障响应。
    pub fn reply_fault(&self, fault: FaultBody) -> Message {
        Message {
            id: MessageId::next(),
            correlation_id: Some(self.id),
            operation: self.operation.clone(),
            headers: self.headers.clone(),
            payload: Payload::Fault(fault),
        }
    }

    pub fn operation(&self) -> Option<&Arc<Operation>> {
        self.operation.as_ref()
    }

    pub fn set_operation(&mut self, operation: Arc<Operation>) {
        self.operation = Some(operation);
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.headers.insert(key.into(), value.into());
    }

    pub fn body(&self) -> Option<&Body> {
        match &self.payload {
            Payload::Body(body) => Some(body),
            _ => None,
        }
    }

    pub fn take_body(&mut self) -> Option<Body> {
        match std::mem::take(&mut self.payload) {
            Payload::Body(body) => Some(body),
            other => {
                self.payload = other;
                None
            }
        }
    }

    pub fn set_body(&mut self, body: Body) {
        self.payload = Payload::Body(body);
    }

    pub fn fault(&self) -> Option<&FaultBody> {
        match &self.payload {
            Payload::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    pub fn set_fault(&mut self, fault: FaultBody) {
        self.payload = Payload::Fault(fault);
    }

    pub fn is_fault(&self) -> bool {
        matches!(self.payload, Payload::Fault(_))
    }

    /// 调用方边界：故障转为 `Err`，正文转为 `Ok`。
    pub fn into_result(self) -> Result<Option<Body>, FaultBody> {
        match self.payload {
            Payload::Empty => Ok(None),
            Payload::Body(body) => Ok(Some(body)),
            Payload::Fault(fault) => Err(fault),
        }
    }
}
