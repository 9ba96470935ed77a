//! # databinding 契约模块
//!
//! ## 角色定位（Why）
//! - 定义“数据绑定”这一可插拔策略的能力面：类型内省、异常故障形状、包装元素处理；
//! - 注册表（`weft-databinding`）与链路（`weft-pipeline`）都只依赖这里的 trait，不依赖具体实现。
//!
//! ## 契约说明（What）
//! - 运行期的值统一用 [`serde_json::Value`] 表达，绑定负责在其上实现构造、拆解与复制；
//! - 所有实现需满足 `Send + Sync + 'static`，可放入 `Arc` 在调用线程间共享；
//! - 实现不得在实例字段里缓存单次调用的数据。

use serde_json::Value;

use crate::error::Result;
use crate::model::{Annotation, DataType, ElementInfo, Operation};

/// 内省时可见的上下文。
#[derive(Clone, Copy, Debug, Default)]
pub struct IntrospectionContext<'a> {
    /// 该位置上的注解（参数注解或方法注解）。
    pub annotations: &'a [Annotation],
    /// 所属操作名，仅用于日志。
    pub operation: Option<&'a str>,
}

impl<'a> IntrospectionContext<'a> {
    pub fn new(annotations: &'a [Annotation]) -> Self {
        Self {
            annotations,
            operation: None,
        }
    }

    pub fn for_operation(mut self, operation: &'a str) -> Self {
        self.operation = Some(operation);
        self
    }
}

/// 调用期数据转换的上下文：源操作与目标操作。
#[derive(Clone, Copy, Debug, Default)]
pub struct TransformationContext<'a> {
    pub source: Option<&'a Operation>,
    pub target: Option<&'a Operation>,
}

impl<'a> TransformationContext<'a> {
    pub fn new(source: &'a Operation, target: &'a Operation) -> Self {
        Self {
            source: Some(source),
            target: Some(target),
        }
    }
}

/// 异常处理器：把异常类映射为线缆上的故障形状。
pub trait ExceptionHandler: Send + Sync {
    /// 计算异常对应的故障形状；返回 `None` 表示本绑定不识别该异常。
    ///
    /// 返回的形状可以与异常类本身结构不同，例如解包为故障消息元素。
    fn fault_type(&self, exception: &DataType) -> Option<DataType>;
}

/// 包装处理器：在包装元素与其逻辑子参数之间构造、拆解。
///
/// # 教案式说明
/// - **意图 (Why)**：包装风格操作在线缆上只有一个元素，而目标实现期望多个独立参数；
/// - **契约 (What)**：
///   - [`children`](Self::children) 返回值的顺序必须与 `child_elements` 的声明顺序完全一致，
///     顺序错位会把参数值路由到错误的位置；
///   - [`wrapper_type`](Self::wrapper_type) 对某个方向返回 `None` 是合法结果，表示该方向没有包装；
///   - [`set_child`](Self::set_child) 的 `index` 与 `child_elements` 下标对应。
pub trait WrapperHandler: Send + Sync {
    /// 为包装元素创建空实例。
    fn create(&self, element: &ElementInfo, ctx: &TransformationContext<'_>) -> Result<Value>;

    /// 计算操作在指定方向上的包装类型。
    fn wrapper_type(&self, operation: &Operation, input: bool) -> Option<DataType>;

    /// 按声明顺序取出子元素值。
    fn children(
        &self,
        wrapper: &Value,
        child_elements: &[ElementInfo],
        ctx: &TransformationContext<'_>,
    ) -> Result<Vec<Value>>;

    /// 写入第 `index` 个子元素。
    fn set_child(
        &self,
        wrapper: &mut Value,
        index: usize,
        child_element: &ElementInfo,
        value: Value,
    ) -> Result<()>;

    /// 判断值是否已经是该包装元素的实例。
    fn is_instance(
        &self,
        value: &Value,
        element: &ElementInfo,
        child_elements: &[ElementInfo],
        ctx: &TransformationContext<'_>,
    ) -> bool;
}

/// `DataBinding` 是注册表中的一条可插拔策略。
///
/// # 教案式说明
/// - **意图 (Why)**：一个接口内不同参数可以由不同技术表达（普通对象、XML 元素、SDO 等），
///   需要一个统一的能力面让注册表按顺序询问“这个类型归你吗”；
/// - **契约 (What)**：
///   - `name` 为规范标识，`aliases` 为辅助标识，二者在注册表中大小写不敏感；
///   - `introspect` 命中时需要把绑定标识（以及必要时的逻辑类型）写入 `data_type` 并返回 `true`，
///     不命中时不得修改 `data_type`；
///   - `exception_handler` / `wrapper_handler` 可选，缺省为 `None`；
///   - `copy` 用于按值传递语义，默认克隆。
/// - **权衡 (Trade-offs)**：`introspect` 接收可变引用而非返回新值，保持与多阶段原地补全一致。
pub trait DataBinding: Send + Sync + 'static {
    /// 规范标识。
    fn name(&self) -> &str;

    /// 辅助标识。
    fn aliases(&self) -> &[String] {
        &[]
    }

    /// 判断并认领数据类型。
    fn introspect(&self, data_type: &mut DataType, ctx: &IntrospectionContext<'_>) -> bool;

    fn exception_handler(&self) -> Option<&dyn ExceptionHandler> {
        None
    }

    fn wrapper_handler(&self) -> Option<&dyn WrapperHandler> {
        None
    }

    /// 复制一个值，供跨组件按值传递。
    fn copy(&self, value: &Value, _data_type: &DataType) -> Result<Value> {
        Ok(value.clone())
    }
}
