//! # types 模块说明
//!
//! ## 角色定位（Why）
//! - 装配模型交给运行时的是“反射描述符”，而不是活的语言类型；本模块定义这些描述符：
//!   物理类型 [`PhysicalType`]、结构类描述 [`ClassDescriptor`] 与注解 [`Annotation`]；
//! - 数据绑定的 `introspect` 谓词只依赖这些值做判定，因此整条解析流水线是纯内存计算。
//!
//! ## 契约说明（What）
//! - 描述符一经构造即视为只读，放入 `Arc` 在多个 `DataType` 之间共享；
//! - 类型身份以 `ClassDescriptor::name` 为准，注解与属性顺序参与相等比较。

use std::fmt;
use std::sync::Arc;

use super::xml::QName;

/// 标量种类。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Char,
    Int,
    Long,
    Float,
    Double,
    String,
    Bytes,
}

/// 单个值位置在语言层面的表示。
///
/// `Any` 对应“任意对象”，是唯一不会被默认绑定兜底的物理类型。
#[derive(Clone, Debug, PartialEq)]
pub enum PhysicalType {
    Any,
    Scalar(ScalarKind),
    Class(Arc<ClassDescriptor>),
    Array(Box<PhysicalType>),
    List(Box<PhysicalType>),
}

impl PhysicalType {
    pub fn class(descriptor: ClassDescriptor) -> Self {
        PhysicalType::Class(Arc::new(descriptor))
    }

    pub fn array_of(element: PhysicalType) -> Self {
        PhysicalType::Array(Box::new(element))
    }

    pub fn list_of(element: PhysicalType) -> Self {
        PhysicalType::List(Box::new(element))
    }

    /// 集合类型的元素类型。
    pub fn element_type(&self) -> Option<&PhysicalType> {
        match self {
            PhysicalType::Array(element) | PhysicalType::List(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self, PhysicalType::Any)
    }

    pub fn as_class(&self) -> Option<&ClassDescriptor> {
        match self {
            PhysicalType::Class(class) => Some(class),
            _ => None,
        }
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhysicalType::Any => f.write_str("any"),
            PhysicalType::Scalar(kind) => write!(f, "{kind:?}"),
            PhysicalType::Class(class) => f.write_str(&class.name),
            PhysicalType::Array(element) => write!(f, "{element}[]"),
            PhysicalType::List(element) => write!(f, "List<{element}>"),
        }
    }
}

/// 注解（元数据标记）。
///
/// # 教案式说明
/// - **意图 (Why)**：绑定选择、包装判定、故障形状都由声明式元数据驱动；用枚举表达常见标记，
///   让谓词匹配保持穷尽检查；
/// - **契约 (What)**：
///   - `DataBinding` 出现在接口或方法上，声明默认绑定与是否包装风格；
///   - `DataType` 出现在参数或方法上，显式指定该位置的绑定；
///   - `XmlRootElement` / `XmlType` 描述结构类的 XML 形状，`prop_order` 即子元素声明顺序；
///   - `WebFault` 声明异常对应的故障元素；
///   - `Marker` 留给第三方绑定自定义判定。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Annotation {
    DataBinding { id: String, wrapped: bool },
    DataType { id: String },
    XmlRootElement { name: QName },
    XmlType { name: QName, prop_order: Vec<String> },
    WebFault { element: QName },
    Marker(String),
}

impl Annotation {
    pub fn data_binding(id: impl Into<String>) -> Self {
        Annotation::DataBinding {
            id: id.into(),
            wrapped: false,
        }
    }

    pub fn wrapped_data_binding(id: impl Into<String>) -> Self {
        Annotation::DataBinding {
            id: id.into(),
            wrapped: true,
        }
    }

    pub fn data_type(id: impl Into<String>) -> Self {
        Annotation::DataType { id: id.into() }
    }
}

/// 在注解列表中查找 `DataBinding` 声明，返回 `(id, wrapped)`。
pub fn find_data_binding(annotations: &[Annotation]) -> Option<(&str, bool)> {
    annotations.iter().find_map(|annotation| match annotation {
        Annotation::DataBinding { id, wrapped } => Some((id.as_str(), *wrapped)),
        _ => None,
    })
}

/// 在注解列表中查找 `DataType` 覆盖声明。
pub fn find_data_type(annotations: &[Annotation]) -> Option<&str> {
    annotations.iter().find_map(|annotation| match annotation {
        Annotation::DataType { id } => Some(id.as_str()),
        _ => None,
    })
}

/// 结构类的一条属性。
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub physical: PhysicalType,
}

/// 结构类（含异常类）的反射描述。
#[derive(Clone, Debug, PartialEq)]
pub struct ClassDescriptor {
    pub name: String,
    pub annotations: Vec<Annotation>,
    pub supertypes: Vec<String>,
    pub properties: Vec<PropertyDescriptor>,
    pub throwable: bool,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
            supertypes: Vec::new(),
            properties: Vec::new(),
            throwable: false,
        }
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn with_supertype(mut self, name: impl Into<String>) -> Self {
        self.supertypes.push(name.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, physical: PhysicalType) -> Self {
        self.properties.push(PropertyDescriptor {
            name: name.into(),
            physical,
        });
        self
    }

    /// 标记为异常类。
    pub fn throwable(mut self) -> Self {
        self.throwable = true;
        self
    }

    /// 自身或直接父类型是否为 `name`。
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.supertypes.iter().any(|s| s == name)
    }

    pub fn has_marker(&self, marker: &str) -> bool {
        self.annotations
            .iter()
            .any(|a| matches!(a, Annotation::Marker(m) if m == marker))
    }

    pub fn xml_root_element(&self) -> Option<&QName> {
        self.annotations.iter().find_map(|a| match a {
            Annotation::XmlRootElement { name } => Some(name),
            _ => None,
        })
    }

    /// schema 类型名与声明的属性顺序。
    pub fn xml_type(&self) -> Option<(&QName, &[String])> {
        self.annotations.iter().find_map(|a| match a {
            Annotation::XmlType { name, prop_order } => Some((name, prop_order.as_slice())),
            _ => None,
        })
    }

    pub fn web_fault(&self) -> Option<&QName> {
        self.annotations.iter().find_map(|a| match a {
            Annotation::WebFault { element } => Some(element),
            _ => None,
        })
    }

    /// 子属性的声明顺序：优先 `XmlType::prop_order`，否则按属性登记顺序。
    pub fn property_order(&self) -> Vec<&str> {
        match self.xml_type() {
            Some((_, order)) if !order.is_empty() => order.iter().map(String::as_str).collect(),
            _ => self.properties.iter().map(|p| p.name.as_str()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_order_prefers_declared_prop_order() {
        let class = ClassDescriptor::new("Order")
            .with_property("id", PhysicalType::Scalar(ScalarKind::Long))
            .with_property("item", PhysicalType::Scalar(ScalarKind::String))
            .with_annotation(Annotation::XmlType {
                name: QName::local("OrderType"),
                prop_order: vec!["item".into(), "id".into()],
            });
        assert_eq!(class.property_order(), vec!["item", "id"]);
    }

    #[test]
    fn property_order_falls_back_to_registration_order() {
        let class = ClassDescriptor::new("Order")
            .with_property("id", PhysicalType::Scalar(ScalarKind::Long))
            .with_property("item", PhysicalType::Scalar(ScalarKind::String));
        assert_eq!(class.property_order(), vec!["id", "item"]);
    }

    #[test]
    fn annotation_lookup_helpers() {
        let annotations = vec![
            Annotation::Marker("x".into()),
            Annotation::wrapped_data_binding("xml:element"),
            Annotation::data_type("JAXB"),
        ];
        assert_eq!(find_data_binding(&annotations), Some(("xml:element", true)));
        assert_eq!(find_data_type(&annotations), Some("JAXB"));
        assert_eq!(find_data_type(&[]), None);
    }
}
