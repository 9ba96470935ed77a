//! # interceptor 契约模块
//!
//! ## 角色定位（Why）
//! - 调用链被表达为“按阶段排序的拦截器值 + 尾部调用器”，由链路执行器统一驱动；
//! - 拦截器不再持有下一跳引用，前向/逆向流转与短路都由执行器负责，避免隐藏的共享可变状态。
//!
//! ## 契约说明（What）
//! - 拦截器必须无状态或只依赖消息本身，同一实例会被并发调用；
//! - 收到故障消息时，除非专门实现故障映射，否则原样返回。

use std::borrow::Cow;
use std::fmt;

use super::message::Message;

/// 调用链中的排序槽位，声明顺序即执行顺序。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    /// 原始协议 I/O，总在最前。
    Transport,
    /// 把入站请求映射到具体操作。
    OperationSelection,
    /// 请求/响应线缆格式编解码。
    WireFormat,
    /// 绑定侧策略。
    BindingPolicy,
    /// 接口间数据转换。
    Interface,
    /// 实现侧策略。
    ImplementationPolicy,
}

impl Phase {
    pub const ALL: [Phase; 6] = [
        Phase::Transport,
        Phase::OperationSelection,
        Phase::WireFormat,
        Phase::BindingPolicy,
        Phase::Interface,
        Phase::ImplementationPolicy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Transport => "transport",
            Phase::OperationSelection => "operation-selection",
            Phase::WireFormat => "wire-format",
            Phase::BindingPolicy => "binding-policy",
            Phase::Interface => "interface",
            Phase::ImplementationPolicy => "implementation-policy",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 拦截器的自描述元数据，供链路日志与诊断使用。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InterceptorDescriptor {
    name: Cow<'static, str>,
    category: Cow<'static, str>,
    summary: Cow<'static, str>,
}

impl InterceptorDescriptor {
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        category: impl Into<Cow<'static, str>>,
        summary: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            summary: summary.into(),
        }
    }

    pub fn anonymous(category: impl Into<Cow<'static, str>>) -> Self {
        Self::new("anonymous", category, "unspecified interceptor")
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }
}

/// 请求阶段的处理结果。
#[derive(Debug)]
pub enum Flow {
    /// 继续交给下一个拦截器；若消息已携带故障，执行器会停止前向传递。
    Continue(Message),
    /// 就地应答，跳过剩余拦截器与调用器。
    Return(Message),
}

impl Flow {
    pub fn into_message(self) -> Message {
        match self {
            Flow::Continue(message) | Flow::Return(message) => message,
        }
    }
}

/// 调用链上的拦截器。
///
/// # 教案式说明
/// - **意图 (Why)**：传输、操作选择、线缆格式、策略等关注点需要按阶段插入同一条链；
/// - **契约 (What)**：
///   - `on_request` 可以替换正文、写入故障短路，或原样放行；
///   - `on_response` 在响应逆向流回时调用，只对请求阶段已经经过的拦截器生效，默认原样返回；
///   - 两个方法都不得 panic 来表达失败，失败应写成故障体。
pub trait Interceptor: Send + Sync + 'static {
    fn descriptor(&self) -> InterceptorDescriptor;

    fn on_request(&self, message: Message) -> Flow;

    fn on_response(&self, message: Message) -> Message {
        message
    }
}

/// 调用链尾部的调用器：业务分发或下一级链路。
pub trait Invoker: Send + Sync + 'static {
    fn invoke(&self, message: Message) -> Message;
}
