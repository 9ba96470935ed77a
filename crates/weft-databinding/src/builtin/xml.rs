//! 通用 XML 元素绑定。
//!
//! 运行期的元素实例用 JSON 对象表达：`"@element"` 键记录元素限定名，其余键为子元素本地名。

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use weft_core::error::codes;
use weft_core::{
    BindingOrigin, ClassDescriptor, CoreError, DataBinding, DataType, ElementInfo,
    ExceptionHandler, IntrospectionContext, LogicalType, Operation, PhysicalType, QName, Result,
    TransformationContext, WrapperHandler, XmlType, binding_ids,
};

/// 元素实例中保存元素名的键；XML 本地名不可能以 `@` 开头。
pub const ELEMENT_KEY: &str = "@element";

/// 元素名到结构类的目录，用于计算包装类型并校验子元素顺序。
#[derive(Clone, Debug, Default)]
pub struct ElementCatalog {
    classes: HashMap<QName, Arc<ClassDescriptor>>,
}

impl ElementCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以类的根元素名登记；类没有根元素注解时返回 `false`。
    pub fn register(&mut self, class: ClassDescriptor) -> bool {
        match class.xml_root_element().cloned() {
            Some(element) => {
                self.classes.insert(element, Arc::new(class));
                true
            }
            None => false,
        }
    }

    pub fn with(mut self, class: ClassDescriptor) -> Self {
        self.register(class);
        self
    }

    pub fn get(&self, element: &QName) -> Option<&Arc<ClassDescriptor>> {
        self.classes.get(element)
    }
}

/// 把带 `WebFault` 注解的异常类映射为故障元素形状。
#[derive(Debug)]
pub struct XmlFaultHandler {
    binding: String,
}

impl ExceptionHandler for XmlFaultHandler {
    fn fault_type(&self, exception: &DataType) -> Option<DataType> {
        let class = exception.physical().as_class()?;
        if !class.throwable {
            return None;
        }
        let element = class.web_fault()?;
        let physical = class
            .properties
            .iter()
            .find(|property| property.name == "faultInfo")
            .map(|property| property.physical.clone())
            .unwrap_or(PhysicalType::Any);
        let mut shape =
            DataType::with_logical(physical, LogicalType::Xml(XmlType::element(element.clone())));
        shape.assign_binding(self.binding.as_str(), BindingOrigin::Introspected);
        Some(shape)
    }
}

/// JSON 对象形式的包装元素处理器。
///
/// # 教案式说明
/// - **意图 (Why)**：包装风格操作需要在一个元素与多个参数之间互转；
/// - **契约 (What)**：
///   - `children` 严格按 `child_elements` 顺序取值，缺失的单值子元素为 `null`，缺失的多值子元素为空数组；
///   - 若目录中登记了包装类且其声明的属性顺序与 `child_elements` 不一致，返回 `transform.wrapper` 错误，
///     而不是把值错配到别的参数；
///   - `set_child` 以子元素本地名为键写入。
#[derive(Debug)]
pub struct XmlElementWrapperHandler {
    binding: String,
    catalog: ElementCatalog,
}

impl XmlElementWrapperHandler {
    fn wrapper_class(&self, wrapper: &Map<String, Value>) -> Option<&Arc<ClassDescriptor>> {
        let element = wrapper.get(ELEMENT_KEY)?.as_str()?;
        self.catalog
            .classes
            .iter()
            .find(|(name, _)| name.to_string() == element)
            .map(|(_, class)| class)
    }
}

fn not_an_element(detail: &str) -> CoreError {
    CoreError::new(
        codes::TRANSFORM_WRAPPER,
        format!("wrapper instance is not an element object: {detail}"),
    )
}

impl WrapperHandler for XmlElementWrapperHandler {
    fn create(&self, element: &ElementInfo, _ctx: &TransformationContext<'_>) -> Result<Value> {
        let mut object = Map::new();
        object.insert(ELEMENT_KEY.to_owned(), Value::String(element.name.to_string()));
        Ok(Value::Object(object))
    }

    fn wrapper_type(&self, operation: &Operation, input: bool) -> Option<DataType> {
        let element = operation.wrapper.as_ref()?.wrapper_element(input)?;
        let physical = self
            .catalog
            .get(&element.name)
            .map(|class| PhysicalType::Class(Arc::clone(class)))
            .unwrap_or(PhysicalType::Any);
        let mut xml = XmlType::element(element.name.clone());
        if let Some(type_name) = &element.type_name {
            xml = xml.with_type_name(type_name.clone());
        }
        let mut wrapper_type = DataType::with_logical(physical, LogicalType::Xml(xml));
        wrapper_type.assign_binding(self.binding.as_str(), BindingOrigin::Introspected);
        Some(wrapper_type)
    }

    fn children(
        &self,
        wrapper: &Value,
        child_elements: &[ElementInfo],
        _ctx: &TransformationContext<'_>,
    ) -> Result<Vec<Value>> {
        let object = wrapper
            .as_object()
            .ok_or_else(|| not_an_element(&wrapper.to_string()))?;

        if let Some(class) = self.wrapper_class(object) {
            let declared = class.property_order();
            let given: Vec<&str> = child_elements.iter().map(|c| c.name.local.as_str()).collect();
            if !declared.is_empty() && declared != given {
                return Err(CoreError::new(
                    codes::TRANSFORM_WRAPPER,
                    format!(
                        "child elements {given:?} do not follow the declared order {declared:?} of `{}`",
                        class.name
                    ),
                ));
            }
        }

        Ok(child_elements
            .iter()
            .map(|child| match object.get(&child.name.local) {
                Some(value) => value.clone(),
                None if child.many => Value::Array(Vec::new()),
                None => Value::Null,
            })
            .collect())
    }

    fn set_child(
        &self,
        wrapper: &mut Value,
        index: usize,
        child_element: &ElementInfo,
        value: Value,
    ) -> Result<()> {
        let object = wrapper.as_object_mut().ok_or_else(|| {
            not_an_element(&format!("cannot set child #{index} `{}`", child_element.name))
        })?;
        object.insert(child_element.name.local.clone(), value);
        Ok(())
    }

    fn is_instance(
        &self,
        value: &Value,
        element: &ElementInfo,
        child_elements: &[ElementInfo],
        _ctx: &TransformationContext<'_>,
    ) -> bool {
        let Some(object) = value.as_object() else {
            return false;
        };
        let expected = element.name.to_string();
        if object.get(ELEMENT_KEY).and_then(Value::as_str) != Some(expected.as_str()) {
            return false;
        }
        object.keys().filter(|key| key.as_str() != ELEMENT_KEY).all(|key| {
            child_elements
                .iter()
                .any(|child| &child.name.local == key)
        })
    }
}

/// 通用 XML 元素绑定。
///
/// 认领带 `XmlRootElement` 注解的结构类，逻辑类型改写为对应的 XML 元素；
/// 同时提供故障元素形状与包装元素处理。
#[derive(Debug)]
pub struct XmlElementDataBinding {
    name: String,
    wrapper: XmlElementWrapperHandler,
    faults: XmlFaultHandler,
}

impl XmlElementDataBinding {
    pub fn new() -> Self {
        Self::named(binding_ids::XML_ELEMENT)
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            wrapper: XmlElementWrapperHandler {
                binding: name.to_owned(),
                catalog: ElementCatalog::new(),
            },
            faults: XmlFaultHandler {
                binding: name.to_owned(),
            },
        }
    }

    pub fn with_catalog(mut self, catalog: ElementCatalog) -> Self {
        self.wrapper.catalog = catalog;
        self
    }
}

impl Default for XmlElementDataBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl DataBinding for XmlElementDataBinding {
    fn name(&self) -> &str {
        &self.name
    }

    fn introspect(&self, data_type: &mut DataType, _ctx: &IntrospectionContext<'_>) -> bool {
        let Some(class) = data_type.physical().as_class() else {
            return false;
        };
        let Some(element) = class.xml_root_element() else {
            return false;
        };
        let mut xml = XmlType::element(element.clone());
        if let Some((type_name, _)) = class.xml_type() {
            xml = xml.with_type_name(type_name.clone());
        }
        if !data_type.assign_binding(self.name.as_str(), BindingOrigin::Introspected) {
            return false;
        }
        data_type.set_logical(LogicalType::Xml(xml));
        true
    }

    fn exception_handler(&self) -> Option<&dyn ExceptionHandler> {
        Some(&self.faults)
    }

    fn wrapper_handler(&self) -> Option<&dyn WrapperHandler> {
        Some(&self.wrapper)
    }
}
