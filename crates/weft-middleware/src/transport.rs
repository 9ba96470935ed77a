//! # transport 模块说明
//!
//! ## 角色定位（Why）
//! - 进程内传输：请求以原始字节进入绑定级链，响应以原始字节离开，用于本地联调与测试；
//! - 它是故障体离开运行时的出口：响应方向把 [`FaultBody`] 翻译为线缆故障（JSON 字节 + 状态头），
//!   链路内部的故障从不以 `Err` 形式出现。

use std::sync::Arc;

use bytes::Bytes;
use tracing::warn;
use weft_core::{
    Body, FaultBody, Flow, Interceptor, InterceptorDescriptor, Message, TransportProvider,
};

/// 响应状态头。
pub const STATUS_HEADER: &str = "weft.status";
pub const STATUS_OK: &str = "ok";
pub const STATUS_FAULT: &str = "fault";

/// 进程内传输提供者。
#[derive(Clone, Copy, Debug, Default)]
pub struct InMemoryTransport;

impl InMemoryTransport {
    /// 构造入站请求：原始字节加操作名头部。
    pub fn request(header: &str, operation: &str, payload: impl Into<Bytes>) -> Message {
        Message::raw(payload).with_header(header, operation)
    }

    /// 读取线缆响应：`Ok` 为正常响应字节，`Err` 为线缆故障字节。
    pub fn response(message: &Message) -> Result<Bytes, Bytes> {
        let bytes = match message.body() {
            Some(Body::Raw(bytes)) => bytes.clone(),
            _ => Bytes::new(),
        };
        if message.header(STATUS_HEADER) == Some(STATUS_FAULT) {
            Err(bytes)
        } else {
            Ok(bytes)
        }
    }
}

impl TransportProvider for InMemoryTransport {
    fn create_interceptor(&self) -> weft_core::Result<Arc<dyn Interceptor>> {
        Ok(Arc::new(InMemoryTransportInterceptor))
    }
}

struct InMemoryTransportInterceptor;

fn encode_fault(fault: &FaultBody) -> Bytes {
    match serde_json::to_vec(fault) {
        Ok(bytes) => Bytes::from(bytes),
        Err(_) => Bytes::from(fault.to_string()),
    }
}

impl Interceptor for InMemoryTransportInterceptor {
    fn descriptor(&self) -> InterceptorDescriptor {
        InterceptorDescriptor::new(
            "weft.transport.in-memory",
            "transport",
            "carries raw bytes in process and maps faults to wire faults",
        )
    }

    fn on_request(&self, message: Message) -> Flow {
        Flow::Continue(message)
    }

    fn on_response(&self, mut message: Message) -> Message {
        let wire_fault = message.fault().map(|fault| {
            warn!(
                code = %fault.code,
                fault_type = fault.fault_type.as_deref().unwrap_or("-"),
                "invocation returned a fault"
            );
            encode_fault(fault)
        });
        match wire_fault {
            Some(bytes) => {
                message.set_body(Body::Raw(bytes));
                message.set_header(STATUS_HEADER, STATUS_FAULT);
            }
            None => message.set_header(STATUS_HEADER, STATUS_OK),
        }
        message
    }
}
