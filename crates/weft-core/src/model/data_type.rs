//! # data_type 模块说明
//!
//! ## 角色定位（Why）
//! - [`DataType`] 描述操作签名中某一个位置（参数、返回值、故障）的数据形状，是解析流水线的叶子依赖；
//! - 绑定标识在内省、分配、包装解析三个阶段被逐步写入，本模块负责守住“显式声明优先”的不变式。
//!
//! ## 契约说明（What）
//! - 绑定标识初始为空；声明式来源（参数注解、接口默认）写入后，通用内省不会再覆盖；
//! - 数组与列表的逻辑类型是嵌套的 `DataType`，元素类型拥有独立的绑定标识；
//! - 每个 `DataType` 只属于一个操作位置，不在操作之间共享。

use std::fmt;

use super::types::PhysicalType;
use super::xml::{QName, XmlType};

/// 内置绑定标识。
pub mod binding_ids {
    /// 普通对象默认绑定，兜底使用，扫描谓词时跳过。
    pub const PLAIN_OBJECT: &str = "object";
    /// 简单标量绑定。
    pub const SIMPLE: &str = "simple";
    /// 数组标记绑定，聚合操作级绑定时透明。
    pub const ARRAY: &str = "array";
    /// 通用 XML 元素绑定；同时是触发操作级绑定重算的占位标识。
    pub const XML_ELEMENT: &str = "xml:element";
    /// IDL 输入/输出/故障视角标识，供线缆格式改写接口契约时使用。
    pub const IDL_INPUT: &str = "idl:input";
    pub const IDL_OUTPUT: &str = "idl:output";
    pub const IDL_FAULT: &str = "idl:fault";

    /// 不参与操作级绑定推导的默认绑定。
    pub fn is_default(id: &str) -> bool {
        id.eq_ignore_ascii_case(PLAIN_OBJECT) || id.eq_ignore_ascii_case(SIMPLE)
    }
}

/// 绑定标识的来源。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BindingOrigin {
    #[default]
    Unset,
    /// 注解或接口级默认显式声明，必须在链路构建前可解析。
    Declared,
    /// 由某个绑定的 `introspect` 谓词或异常处理器命中。
    Introspected,
    /// 无谓词命中，兜底为普通对象绑定。
    Fallback,
}

/// 逻辑（结构）类型。
#[derive(Clone, Debug, PartialEq)]
pub enum LogicalType {
    /// 与物理类型一致。
    Physical(PhysicalType),
    /// XML 元素/类型形状。
    Xml(XmlType),
    /// 嵌套的数据类型：数组、列表的元素，或异常处理器计算出的故障形状。
    Nested(Box<DataType>),
}

/// 操作签名中单个位置的数据形状。
///
/// # 教案式说明
/// - **意图 (Why)**：同一份签名可能混用多种绑定技术，绑定标识必须落在每个位置上而不是操作上；
/// - **契约 (What)**：
///   - [`declare_binding`](Self::declare_binding) 写入声明式绑定，之后 [`assign_binding`](Self::assign_binding)
///     对该字段不再生效；
///   - [`set_fault_shape`](Self::set_fault_shape) 同时覆盖绑定与逻辑类型，两者不会出现半更新状态；
/// - **执行 (How)**：[`DataType::new`] 按物理类型推出初始逻辑类型，集合类型自动生成嵌套元素；
/// - **权衡 (Trade-offs)**：物理类型在逻辑类型中会复制一份，换取逻辑类型可独立改写。
#[derive(Clone, Debug, PartialEq)]
pub struct DataType {
    data_binding: Option<String>,
    origin: BindingOrigin,
    physical: PhysicalType,
    logical: LogicalType,
}

impl DataType {
    /// 以物理类型构造未绑定的数据类型。
    pub fn new(physical: PhysicalType) -> Self {
        let logical = match physical.element_type() {
            Some(element) => LogicalType::Nested(Box::new(DataType::new(element.clone()))),
            None => LogicalType::Physical(physical.clone()),
        };
        Self {
            data_binding: None,
            origin: BindingOrigin::Unset,
            physical,
            logical,
        }
    }

    /// 以给定逻辑类型构造。
    pub fn with_logical(physical: PhysicalType, logical: LogicalType) -> Self {
        Self {
            data_binding: None,
            origin: BindingOrigin::Unset,
            physical,
            logical,
        }
    }

    /// 构造并立即声明绑定。
    pub fn bound(id: impl Into<String>, physical: PhysicalType) -> Self {
        let mut data_type = Self::new(physical);
        data_type.declare_binding(id);
        data_type
    }

    pub fn data_binding(&self) -> Option<&str> {
        self.data_binding.as_deref()
    }

    pub fn origin(&self) -> BindingOrigin {
        self.origin
    }

    pub fn is_bound(&self) -> bool {
        self.data_binding.is_some()
    }

    /// 写入声明式绑定，总是生效。
    pub fn declare_binding(&mut self, id: impl Into<String>) {
        self.data_binding = Some(id.into());
        self.origin = BindingOrigin::Declared;
    }

    /// 写入内省结果；若已存在声明式绑定则忽略并返回 `false`。
    pub fn assign_binding(&mut self, id: impl Into<String>, origin: BindingOrigin) -> bool {
        if self.origin == BindingOrigin::Declared {
            return false;
        }
        self.data_binding = Some(id.into());
        self.origin = origin;
        true
    }

    /// 以异常处理器计算出的故障形状覆盖绑定与逻辑类型。
    pub fn set_fault_shape(&mut self, id: impl Into<String>, shape: DataType) {
        self.data_binding = Some(id.into());
        self.origin = BindingOrigin::Introspected;
        self.logical = LogicalType::Nested(Box::new(shape));
    }

    pub fn physical(&self) -> &PhysicalType {
        &self.physical
    }

    pub fn logical(&self) -> &LogicalType {
        &self.logical
    }

    pub fn set_logical(&mut self, logical: LogicalType) {
        self.logical = logical;
    }

    /// 嵌套逻辑类型（数组元素或故障形状）。
    pub fn nested(&self) -> Option<&DataType> {
        match &self.logical {
            LogicalType::Nested(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn nested_mut(&mut self) -> Option<&mut DataType> {
        match &mut self.logical {
            LogicalType::Nested(inner) => Some(inner),
            _ => None,
        }
    }

    /// XML 元素名：自身的 XML 逻辑类型，或嵌套故障形状的元素名。
    pub fn xml_element(&self) -> Option<&QName> {
        match &self.logical {
            LogicalType::Xml(xml) => xml.element.as_ref(),
            LogicalType::Nested(inner) => inner.xml_element(),
            LogicalType::Physical(_) => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            self.physical,
            self.data_binding.as_deref().unwrap_or("?")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::ScalarKind;

    #[test]
    fn arrays_carry_a_nested_element_type() {
        let data_type = DataType::new(PhysicalType::array_of(PhysicalType::Scalar(
            ScalarKind::Int,
        )));
        let nested = data_type.nested().expect("数组应生成嵌套元素类型");
        assert_eq!(nested.physical(), &PhysicalType::Scalar(ScalarKind::Int));
        assert!(!nested.is_bound());
    }

    #[test]
    fn declared_binding_survives_introspection_assignment() {
        let mut data_type = DataType::bound("B", PhysicalType::Any);
        assert!(!data_type.assign_binding("A", BindingOrigin::Introspected));
        assert_eq!(data_type.data_binding(), Some("B"));
        assert_eq!(data_type.origin(), BindingOrigin::Declared);
    }

    #[test]
    fn default_ids_are_case_insensitive() {
        assert!(binding_ids::is_default("OBJECT"));
        assert!(binding_ids::is_default("simple"));
        assert!(!binding_ids::is_default("xml:element"));
    }
}
