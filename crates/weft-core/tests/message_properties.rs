//! 消息正文/故障体互斥性的性质测试。
//!
//! # 教案式说明
//! - **意图 (Why)**：拦截器任意交替写入正文与故障体时，消息必须始终处于“只有正文”或“只有故障”之一，
//!   否则下游无法判断是否该继续转换正文；
//! - **方法 (How)**：用 proptest 生成随机写入序列，逐步比对消息状态与最后一次写入；
//! - **契约 (What)**：最后一次写入决定状态，`into_result` 与之对应。

use proptest::prelude::*;
use serde_json::json;
use weft_core::{Body, FaultBody, Message};

#[derive(Clone, Debug)]
enum Write {
    Body(i64),
    Fault(String),
}

fn write_strategy() -> impl Strategy<Value = Write> {
    prop_oneof![
        any::<i64>().prop_map(Write::Body),
        "[a-z]{1,8}".prop_map(Write::Fault),
    ]
}

proptest! {
    #[test]
    fn last_write_decides_payload(writes in prop::collection::vec(write_strategy(), 1..32)) {
        let mut message = Message::new();
        for write in &writes {
            match write {
                Write::Body(value) => message.set_body(Body::Value(json!(value))),
                Write::Fault(code) => message.set_fault(FaultBody::new(code.clone(), "fault")),
            }
            prop_assert!(message.is_fault() != message.body().is_some());
        }

        match writes.last() {
            Some(Write::Body(value)) => {
                prop_assert_eq!(message.into_result().ok().flatten(), Some(Body::Value(json!(value))));
            }
            Some(Write::Fault(code)) => {
                let fault = message.into_result().err();
                prop_assert_eq!(fault.map(|f| f.code), Some(code.clone()));
            }
            None => unreachable!("序列至少包含一次写入"),
        }
    }
}
