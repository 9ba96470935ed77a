//! # chain 模块说明
//!
//! ## 角色定位（Why）
//! - 调用链是“按阶段排序的拦截器列表 + 尾部调用器”，构建一次后被所有在途调用并发复用；
//! - 执行器集中处理前向传递、短路与逆向响应，拦截器本身不持有下一跳。
//!
//! ## 执行语义（How）
//! 1. 前向：按挂载顺序调用 `on_request`；返回 [`Flow::Return`] 或消息携带故障时立即停止；
//! 2. 尾部：未被短路时交给调用器；没有调用器时写入 `chain.no_invoker` 故障；
//! 3. 逆向：对请求阶段经过的每个拦截器（含触发短路者）逆序调用 `on_response`。
//!
//! ## 契约（What）
//! - 同一阶段内保持挂载顺序，不同阶段按 [`Phase`] 声明顺序排列；
//! - 执行器从不以 `Err` 或 panic 的形式把故障带出链路。

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};
use weft_core::error::codes;
use weft_core::{
    CoreError, FaultBody, Flow, Interceptor, InterceptorDescriptor, Invoker, Message, Operation,
    Phase,
};

/// 链上的一个挂载点。
#[derive(Clone)]
pub struct ChainEntry {
    phase: Phase,
    interceptor: Arc<dyn Interceptor>,
}

impl ChainEntry {
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn interceptor(&self) -> &Arc<dyn Interceptor> {
        &self.interceptor
    }

    pub fn descriptor(&self) -> InterceptorDescriptor {
        self.interceptor.descriptor()
    }
}

impl fmt::Debug for ChainEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainEntry")
            .field("phase", &self.phase)
            .field("interceptor", &self.interceptor.descriptor().name())
            .finish()
    }
}

/// 调用链。
///
/// # 教案式说明
/// - **意图 (Why)**：每个（组件、服务、绑定、操作）组合一条链，装配期构建，调用期只读；
/// - **契约 (What)**：
///   - [`add_interceptor`](Self::add_interceptor) 把拦截器插到同阶段已有条目之后、后续阶段之前；
///   - [`run`](Self::run) 对任意输入都返回消息，故障以 [`FaultBody`] 承载；
///   - 绑定了操作的链会为尚未选定操作的消息补上该操作；
/// - **权衡 (Trade-offs)**：插入为 O(n)，链长通常个位数，换取执行期顺序遍历无额外查找。
#[derive(Clone)]
pub struct InvocationChain {
    name: String,
    operation: Option<Arc<Operation>>,
    entries: Vec<ChainEntry>,
    invoker: Option<Arc<dyn Invoker>>,
}

impl InvocationChain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operation: None,
            entries: Vec::new(),
            invoker: None,
        }
    }

    /// 绑定到单个操作的链，名称取操作名。
    pub fn for_operation(operation: Arc<Operation>) -> Self {
        Self {
            name: operation.name.clone(),
            operation: Some(operation),
            entries: Vec::new(),
            invoker: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operation(&self) -> Option<&Arc<Operation>> {
        self.operation.as_ref()
    }

    /// 在 `phase` 挂载拦截器。
    pub fn add_interceptor(&mut self, phase: Phase, interceptor: Arc<dyn Interceptor>) -> &mut Self {
        let position = self
            .entries
            .iter()
            .position(|entry| entry.phase > phase)
            .unwrap_or(self.entries.len());
        trace!(
            chain = %self.name,
            %phase,
            interceptor = %interceptor.descriptor().name(),
            position,
            "interceptor attached"
        );
        self.entries.insert(position, ChainEntry { phase, interceptor });
        self
    }

    pub fn set_invoker(&mut self, invoker: Arc<dyn Invoker>) -> &mut Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn invoker(&self) -> Option<&Arc<dyn Invoker>> {
        self.invoker.as_ref()
    }

    pub fn entries(&self) -> &[ChainEntry] {
        &self.entries
    }

    /// 某一阶段的拦截器，按挂载顺序。
    pub fn interceptors_at(&self, phase: Phase) -> impl Iterator<Item = &Arc<dyn Interceptor>> {
        self.entries
            .iter()
            .filter(move |entry| entry.phase == phase)
            .map(ChainEntry::interceptor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 驱动一次调用。
    pub fn run(&self, mut message: Message) -> Message {
        if message.operation().is_none() {
            if let Some(operation) = &self.operation {
                message.set_operation(Arc::clone(operation));
            }
        }

        let mut visited = 0;
        let mut short_circuited = false;
        for entry in &self.entries {
            visited += 1;
            match entry.interceptor.on_request(message) {
                Flow::Continue(next) => {
                    message = next;
                    if message.is_fault() {
                        debug!(
                            chain = %self.name,
                            interceptor = %entry.interceptor.descriptor().name(),
                            "fault raised on request path, skipping the rest of the chain"
                        );
                        short_circuited = true;
                        break;
                    }
                }
                Flow::Return(reply) => {
                    trace!(
                        chain = %self.name,
                        interceptor = %entry.interceptor.descriptor().name(),
                        "request answered in place"
                    );
                    message = reply;
                    short_circuited = true;
                    break;
                }
            }
        }

        if !short_circuited {
            message = match &self.invoker {
                Some(invoker) => invoker.invoke(message),
                None => {
                    let error = CoreError::new(
                        codes::CHAIN_NO_INVOKER,
                        format!("chain `{}` has no invoker", self.name),
                    );
                    message.reply_fault(FaultBody::from_error(&error))
                }
            };
        }

        for entry in self.entries[..visited].iter().rev() {
            message = entry.interceptor.on_response(message);
        }
        message
    }
}

impl Invoker for InvocationChain {
    fn invoke(&self, message: Message) -> Message {
        self.run(message)
    }
}

impl fmt::Debug for InvocationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationChain")
            .field("name", &self.name)
            .field("operation", &self.operation.as_ref().map(|op| op.name.as_str()))
            .field("entries", &self.entries)
            .field("has_invoker", &self.invoker.is_some())
            .finish()
    }
}
