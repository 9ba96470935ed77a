use std::borrow::Cow;
use std::sync::Arc;

use weft_core::error::codes;
use weft_core::{
    CoreError, FaultBody, Flow, Interceptor, InterceptorDescriptor, Message, Operation,
    OperationSelectorProvider,
};

/// 默认读取的操作名头部。
pub const OPERATION_HEADER: &str = "operation";

/// 按头部中的操作名选择目标操作。
///
/// 已经带有操作的消息原样放行；头部缺失或名称无法解析时以 `chain.operation_unknown` 故障短路。
/// 名称既可以是逻辑名，也可以是底层方法名。
#[derive(Clone, Debug)]
pub struct OperationNameSelector {
    header: Cow<'static, str>,
}

impl Default for OperationNameSelector {
    fn default() -> Self {
        Self::new(OPERATION_HEADER)
    }
}

impl OperationNameSelector {
    pub fn new(header: impl Into<Cow<'static, str>>) -> Self {
        Self {
            header: header.into(),
        }
    }
}

impl OperationSelectorProvider for OperationNameSelector {
    fn create_interceptor(
        &self,
        operations: &[Arc<Operation>],
    ) -> weft_core::Result<Arc<dyn Interceptor>> {
        Ok(Arc::new(SelectorInterceptor {
            header: self.header.clone(),
            operations: operations.to_vec(),
        }))
    }
}

struct SelectorInterceptor {
    header: Cow<'static, str>,
    operations: Vec<Arc<Operation>>,
}

impl SelectorInterceptor {
    fn unknown(&self, mut message: Message, detail: String) -> Flow {
        tracing::debug!(header = %self.header, "{detail}");
        message.set_fault(FaultBody::from_error(&CoreError::new(
            codes::CHAIN_OPERATION_UNKNOWN,
            detail,
        )));
        Flow::Continue(message)
    }
}

impl Interceptor for SelectorInterceptor {
    fn descriptor(&self) -> InterceptorDescriptor {
        InterceptorDescriptor::new(
            "weft.selector.operation-name",
            "operation-selection",
            "selects the target operation from a message header",
        )
    }

    fn on_request(&self, mut message: Message) -> Flow {
        if message.operation().is_some() || message.is_fault() {
            return Flow::Continue(message);
        }
        let Some(name) = message.header(&self.header).map(str::to_owned) else {
            let detail = format!("request carries no `{}` header", self.header);
            return self.unknown(message, detail);
        };
        match self.operations.iter().find(|op| op.answers_to(&name)) {
            Some(operation) => {
                message.set_operation(Arc::clone(operation));
                Flow::Continue(message)
            }
            None => {
                let detail = format!("no operation answers to `{name}`");
                self.unknown(message, detail)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operations() -> Vec<Arc<Operation>> {
        let mut get = Operation::new("getQuote");
        get.accessor = Some("get_quote".into());
        vec![Arc::new(get), Arc::new(Operation::new("cancel"))]
    }

    fn selector() -> Arc<dyn Interceptor> {
        OperationNameSelector::default()
            .create_interceptor(&operations())
            .expect("构造选择器")
    }

    #[test]
    fn resolves_logical_and_accessor_names() {
        for name in ["getQuote", "get_quote"] {
            let message = selector()
                .on_request(Message::new().with_header(OPERATION_HEADER, name))
                .into_message();
            assert_eq!(message.operation().map(|op| op.name.as_str()), Some("getQuote"));
        }
    }

    #[test]
    fn unknown_or_missing_name_is_a_fault() {
        let message = selector()
            .on_request(Message::new().with_header(OPERATION_HEADER, "refund"))
            .into_message();
        assert_eq!(
            message.fault().map(|f| f.code.as_str()),
            Some(codes::CHAIN_OPERATION_UNKNOWN)
        );

        let message = selector().on_request(Message::new()).into_message();
        assert!(message.is_fault());
    }

    #[test]
    fn custom_header_is_honoured() {
        let selector = OperationNameSelector::new("x-op")
            .create_interceptor(&operations())
            .expect("构造选择器");
        let message = selector
            .on_request(Message::new().with_header("x-op", "cancel"))
            .into_message();
        assert_eq!(message.operation().map(|op| op.name.as_str()), Some("cancel"));
    }
}
