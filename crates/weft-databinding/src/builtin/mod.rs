//! 内置数据绑定：普通对象、简单标量、数组标记与通用 XML 元素。
//!
//! 登记顺序即内省扫描顺序：数组、标量、XML 元素，普通对象作为兜底最后登记且不参与扫描。

mod xml;

use std::sync::Arc;

use weft_core::{
    BindingOrigin, DataBinding, DataType, IntrospectionContext, PhysicalType, binding_ids,
};

pub use xml::{
    ELEMENT_KEY, ElementCatalog, XmlElementDataBinding, XmlElementWrapperHandler, XmlFaultHandler,
};

use crate::declaration::BindingPlugins;

/// 内置绑定在插件表中的类名。
pub mod plugin_classes {
    pub const PLAIN_OBJECT: &str = "weft.databinding.PlainObjectDataBinding";
    pub const SIMPLE: &str = "weft.databinding.SimpleDataBinding";
    pub const ARRAY: &str = "weft.databinding.ArrayDataBinding";
    pub const XML_ELEMENT: &str = "weft.databinding.XmlElementDataBinding";
}

/// 普通对象绑定：任何非 `Any` 类型都可以兜底到这里。
#[derive(Debug)]
pub struct PlainObjectDataBinding {
    name: String,
}

impl PlainObjectDataBinding {
    pub fn new() -> Self {
        Self::named(binding_ids::PLAIN_OBJECT)
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }
}

impl Default for PlainObjectDataBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl DataBinding for PlainObjectDataBinding {
    fn name(&self) -> &str {
        &self.name
    }

    fn introspect(&self, data_type: &mut DataType, _ctx: &IntrospectionContext<'_>) -> bool {
        if data_type.physical().is_any() {
            return false;
        }
        data_type.assign_binding(self.name.as_str(), BindingOrigin::Introspected)
    }
}

/// 简单标量绑定。
#[derive(Debug)]
pub struct SimpleDataBinding {
    name: String,
}

impl SimpleDataBinding {
    pub fn new() -> Self {
        Self::named(binding_ids::SIMPLE)
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }
}

impl Default for SimpleDataBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl DataBinding for SimpleDataBinding {
    fn name(&self) -> &str {
        &self.name
    }

    fn introspect(&self, data_type: &mut DataType, _ctx: &IntrospectionContext<'_>) -> bool {
        if !matches!(data_type.physical(), PhysicalType::Scalar(_)) {
            return false;
        }
        data_type.assign_binding(self.name.as_str(), BindingOrigin::Introspected)
    }
}

/// 数组标记绑定。
///
/// 元素类型由注册表单独内省；聚合操作级绑定时以元素绑定代替本标记。
#[derive(Debug)]
pub struct ArrayDataBinding {
    name: String,
}

impl ArrayDataBinding {
    pub fn new() -> Self {
        Self::named(binding_ids::ARRAY)
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_owned(),
        }
    }
}

impl Default for ArrayDataBinding {
    fn default() -> Self {
        Self::new()
    }
}

impl DataBinding for ArrayDataBinding {
    fn name(&self) -> &str {
        &self.name
    }

    fn introspect(&self, data_type: &mut DataType, _ctx: &IntrospectionContext<'_>) -> bool {
        if !matches!(data_type.physical(), PhysicalType::Array(_)) {
            return false;
        }
        data_type.assign_binding(self.name.as_str(), BindingOrigin::Introspected)
    }
}

/// 按扫描顺序返回内置绑定实例。
pub fn builtin_bindings() -> Vec<Arc<dyn DataBinding>> {
    vec![
        Arc::new(ArrayDataBinding::new()),
        Arc::new(SimpleDataBinding::new()),
        Arc::new(XmlElementDataBinding::new()),
        Arc::new(PlainObjectDataBinding::new()),
    ]
}

/// 包含全部内置绑定构造函数的插件表。
pub fn builtin_plugins() -> BindingPlugins {
    BindingPlugins::new()
        .with(plugin_classes::PLAIN_OBJECT, |name: &str| {
            Arc::new(PlainObjectDataBinding::named(name)) as Arc<dyn DataBinding>
        })
        .with(plugin_classes::SIMPLE, |name: &str| {
            Arc::new(SimpleDataBinding::named(name)) as Arc<dyn DataBinding>
        })
        .with(plugin_classes::ARRAY, |name: &str| {
            Arc::new(ArrayDataBinding::named(name)) as Arc<dyn DataBinding>
        })
        .with(plugin_classes::XML_ELEMENT, |name: &str| {
            Arc::new(XmlElementDataBinding::named(name)) as Arc<dyn DataBinding>
        })
}
