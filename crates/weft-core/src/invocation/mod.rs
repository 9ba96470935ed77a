//! 调用期契约：消息、拦截器、调用器与协议提供者。

pub mod interceptor;
pub mod message;
pub mod provider;

pub use interceptor::{Flow, Interceptor, InterceptorDescriptor, Invoker, Phase};
pub use message::{Body, FaultBody, Message, MessageId};
pub use provider::{OperationSelectorProvider, PolicyProvider, TransportProvider, WireFormatProvider};
