//! JSON 线缆格式：请求方向把原始字节解码为实参，响应方向把返回值编码回字节。

use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;
use tracing::debug;
use weft_core::error::codes;
use weft_core::{
    Body, CoreError, FaultBody, Flow, Interceptor, InterceptorDescriptor, Message,
    WireFormatProvider,
};

/// JSON 线缆格式的身份标识。
pub const JSON_FORMAT_ID: &str = "wireformat.json";

/// JSON 线缆格式提供者。
///
/// # 教案式说明
/// - **契约（What）**：
///   - 请求体为 JSON 数组时逐项作为实参，其他 JSON 值作为唯一实参；
///   - 响应的 `Value`/`Args` 编码为 JSON 字节，单向操作的空响应保持为空；
///   - 故障不编码，交给传输层翻译；
///   - 解码失败以 `wireformat.codec` 故障短路；
/// - **权衡（Trade-offs）**：不改写接口契约，绑定侧与组件侧形状一致，因此不会触发接口转换。
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonWireFormat;

impl WireFormatProvider for JsonWireFormat {
    fn format_id(&self) -> &str {
        JSON_FORMAT_ID
    }

    fn create_interceptor(&self) -> weft_core::Result<Arc<dyn Interceptor>> {
        Ok(Arc::new(JsonCodecInterceptor))
    }
}

#[derive(Debug)]
struct JsonCodecInterceptor;

fn codec_fault(direction: &str, err: &serde_json::Error) -> FaultBody {
    FaultBody::from_error(&CoreError::new(
        codes::WIREFORMAT_CODEC,
        format!("json {direction} failed: {err}"),
    ))
}

impl Interceptor for JsonCodecInterceptor {
    fn descriptor(&self) -> InterceptorDescriptor {
        InterceptorDescriptor::new(
            "weft.wireformat.json",
            "wire-format",
            "decodes JSON request bodies and encodes JSON responses",
        )
    }

    fn on_request(&self, mut message: Message) -> Flow {
        let bytes = match message.take_body() {
            Some(Body::Raw(bytes)) => bytes,
            Some(other) => {
                message.set_body(other);
                return Flow::Continue(message);
            }
            None => return Flow::Continue(message),
        };
        match serde_json::from_slice::<Value>(&bytes) {
            Ok(Value::Array(args)) => message.set_body(Body::Args(args)),
            Ok(value) => message.set_body(Body::Args(vec![value])),
            Err(err) => {
                debug!(message_id = %message.id(), error = %err, "json request decode failed");
                message.set_fault(codec_fault("decode", &err));
            }
        }
        Flow::Continue(message)
    }

    fn on_response(&self, mut message: Message) -> Message {
        let encoded = match message.body() {
            Some(Body::Value(value)) => serde_json::to_vec(value),
            Some(Body::Args(args)) => serde_json::to_vec(args),
            _ => return message,
        };
        match encoded {
            Ok(bytes) => message.set_body(Body::Raw(Bytes::from(bytes))),
            Err(err) => message.set_fault(codec_fault("encode", &err)),
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn interceptor() -> Arc<dyn Interceptor> {
        JsonWireFormat.create_interceptor().expect("构造拦截器")
    }

    #[test]
    fn array_body_becomes_positional_arguments() {
        let message = interceptor()
            .on_request(Message::raw(Bytes::from_static(b"[1, \"two\"]")))
            .into_message();
        assert_eq!(message.body(), Some(&Body::Args(vec![json!(1), json!("two")])));
    }

    #[test]
    fn object_body_becomes_single_argument() {
        let message = interceptor()
            .on_request(Message::raw(Bytes::from_static(b"{\"a\":1}")))
            .into_message();
        assert_eq!(message.body(), Some(&Body::Args(vec![json!({"a": 1})])));
    }

    #[test]
    fn malformed_body_is_a_codec_fault() {
        let message = interceptor()
            .on_request(Message::raw(Bytes::from_static(b"[1,")))
            .into_message();
        assert_eq!(
            message.fault().map(|f| f.code.as_str()),
            Some(codes::WIREFORMAT_CODEC)
        );
    }

    #[test]
    fn response_value_is_encoded_and_faults_pass_through() {
        let request = Message::request(vec![]);
        let reply = interceptor().on_response(request.reply(Body::Value(json!({"ok": true}))));
        assert_eq!(
            reply.body(),
            Some(&Body::Raw(Bytes::from_static(b"{\"ok\":true}")))
        );

        let fault = request.reply_fault(FaultBody::business("Nope", "denied"));
        assert_eq!(interceptor().on_response(fault.clone()), fault);
    }
}
