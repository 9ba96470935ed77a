//! # declaration 模块说明
//!
//! ## 角色定位（Why）
//! - 注册表的懒加载从外部声明源读取 `{class, type, name}` 条目，并通过显式插件表把 `class`
//!   映射到构造函数，取代按字符串动态加载实现；
//! - [`LazyDataBinding`] 让声明在登记时只占一个门面，真正的实现直到首次使用才构造。
//!
//! ## 契约说明（What）
//! - 声明源可能被多次构造，但注册表保证只读取一次；
//! - 插件构造函数接收声明的 `type` 作为绑定名，使实现与注册键保持一致。

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::debug;
use weft_core::config::BindingDeclaration;
use weft_core::{
    DataBinding, DataType, ExceptionHandler, IntrospectionContext, Result, WrapperHandler,
};

use crate::error::RegistryError;

/// 声明源。
pub trait DeclarationSource: Send + Sync {
    fn declarations(&self) -> std::result::Result<Vec<BindingDeclaration>, RegistryError>;
}

/// 内存中的固定声明列表，通常来自配置文件。
#[derive(Clone, Debug, Default)]
pub struct StaticDeclarations(pub Vec<BindingDeclaration>);

impl DeclarationSource for StaticDeclarations {
    fn declarations(&self) -> std::result::Result<Vec<BindingDeclaration>, RegistryError> {
        Ok(self.0.clone())
    }
}

/// 服务文件格式的声明：每行 `plugin.Class;type=<id>,name=<alias>`。
///
/// `#` 之后为注释，空行忽略；`type` 必填，`name` 可选，未知属性忽略。
#[derive(Clone, Debug)]
pub struct ServiceFileDeclarations {
    text: String,
}

impl ServiceFileDeclarations {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// 解析整份文本。
    pub fn parse(text: &str) -> std::result::Result<Vec<BindingDeclaration>, RegistryError> {
        let mut declarations = Vec::new();
        for (index, raw) in text.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let malformed = || RegistryError::MalformedDeclaration {
                line: index + 1,
                content: raw.to_owned(),
            };
            let (class, attributes) = match line.split_once(';') {
                Some((class, attributes)) => (class.trim(), attributes),
                None => (line, ""),
            };
            if class.is_empty() {
                return Err(malformed());
            }
            let mut binding_type = None;
            let mut name = None;
            for attribute in attributes.split(',').filter(|a| !a.trim().is_empty()) {
                let (key, value) = attribute.split_once('=').ok_or_else(malformed)?;
                match key.trim() {
                    "type" => binding_type = Some(value.trim().to_owned()),
                    "name" => name = Some(value.trim().to_owned()),
                    _ => {}
                }
            }
            let binding_type = binding_type.filter(|t| !t.is_empty()).ok_or_else(malformed)?;
            declarations.push(BindingDeclaration {
                class: class.to_owned(),
                binding_type,
                name: name.filter(|n| !n.is_empty()),
            });
        }
        Ok(declarations)
    }
}

impl DeclarationSource for ServiceFileDeclarations {
    fn declarations(&self) -> std::result::Result<Vec<BindingDeclaration>, RegistryError> {
        Self::parse(&self.text)
    }
}

/// 插件构造函数：参数为声明的绑定名。
pub type PluginConstructor = Arc<dyn Fn(&str) -> Arc<dyn DataBinding> + Send + Sync>;

/// 显式插件表：`class` 到构造函数的映射，在进程启动时填充。
#[derive(Clone, Default)]
pub struct BindingPlugins {
    constructors: HashMap<String, PluginConstructor>,
}

impl BindingPlugins {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个插件；同名后者覆盖前者。
    pub fn register<F>(&mut self, class: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&str) -> Arc<dyn DataBinding> + Send + Sync + 'static,
    {
        self.constructors.insert(class.into(), Arc::new(constructor));
        self
    }

    pub fn with<F>(mut self, class: impl Into<String>, constructor: F) -> Self
    where
        F: Fn(&str) -> Arc<dyn DataBinding> + Send + Sync + 'static,
    {
        self.register(class, constructor);
        self
    }

    /// 合并另一张插件表，同名以 `other` 为准。
    pub fn extend(&mut self, other: BindingPlugins) {
        self.constructors.extend(other.constructors);
    }

    pub fn get(&self, class: &str) -> Option<&PluginConstructor> {
        self.constructors.get(class)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.constructors.contains_key(class)
    }
}

impl fmt::Debug for BindingPlugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<_> = self.constructors.keys().collect();
        classes.sort();
        f.debug_struct("BindingPlugins")
            .field("classes", &classes)
            .finish()
    }
}

/// 声明式绑定的懒加载门面。
///
/// # 教案式说明
/// - **意图 (Why)**：启动期只登记名称与别名，实际实现延迟到第一次内省或取处理器时构造，降低启动成本；
/// - **契约 (What)**：规范名为声明的 `type`，别名为 `name`；构造函数至多执行一次，并发首用时
///   其余线程阻塞等待同一实例；
/// - **执行 (How)**：`OnceLock` 保存委托实例，所有能力调用转发给委托。
pub struct LazyDataBinding {
    declaration: BindingDeclaration,
    aliases: Vec<String>,
    constructor: PluginConstructor,
    instance: OnceLock<Arc<dyn DataBinding>>,
}

impl LazyDataBinding {
    pub fn new(declaration: BindingDeclaration, constructor: PluginConstructor) -> Self {
        let aliases = declaration.name.iter().cloned().collect();
        Self {
            declaration,
            aliases,
            constructor,
            instance: OnceLock::new(),
        }
    }

    pub fn declaration(&self) -> &BindingDeclaration {
        &self.declaration
    }

    /// 委托实例是否已经构造。
    pub fn is_instantiated(&self) -> bool {
        self.instance.get().is_some()
    }

    fn delegate(&self) -> &Arc<dyn DataBinding> {
        self.instance.get_or_init(|| {
            debug!(
                binding = %self.declaration.binding_type,
                class = %self.declaration.class,
                "instantiating declared data binding"
            );
            (self.constructor)(&self.declaration.binding_type)
        })
    }
}

impl fmt::Debug for LazyDataBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyDataBinding")
            .field("declaration", &self.declaration)
            .field("instantiated", &self.is_instantiated())
            .finish()
    }
}

impl DataBinding for LazyDataBinding {
    fn name(&self) -> &str {
        &self.declaration.binding_type
    }

    fn aliases(&self) -> &[String] {
        &self.aliases
    }

    fn introspect(&self, data_type: &mut DataType, ctx: &IntrospectionContext<'_>) -> bool {
        self.delegate().introspect(data_type, ctx)
    }

    fn exception_handler(&self) -> Option<&dyn ExceptionHandler> {
        self.delegate().exception_handler()
    }

    fn wrapper_handler(&self) -> Option<&dyn WrapperHandler> {
        self.delegate().wrapper_handler()
    }

    fn copy(&self, value: &Value, data_type: &DataType) -> Result<Value> {
        self.delegate().copy(value, data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use weft_core::{PhysicalType, binding_ids};

    use crate::builtin::SimpleDataBinding;

    #[test]
    fn service_file_lines_are_parsed() {
        let declarations = ServiceFileDeclarations::parse(
            "# data bindings\n\
             plugins.Sdo;type=commonj.sdo,name=sdo\n\
             \n\
             plugins.Dom ; type = dom # trailing comment\n",
        )
        .expect("合法声明");
        assert_eq!(
            declarations,
            vec![
                BindingDeclaration::new("plugins.Sdo", "commonj.sdo").with_name("sdo"),
                BindingDeclaration::new("plugins.Dom", "dom"),
            ]
        );
    }

    #[test]
    fn missing_type_is_malformed() {
        let err = ServiceFileDeclarations::parse("plugins.Sdo;name=sdo").expect_err("缺少 type");
        assert_eq!(
            err,
            RegistryError::MalformedDeclaration {
                line: 1,
                content: "plugins.Sdo;name=sdo".into()
            }
        );
    }

    #[test]
    fn lazy_binding_instantiates_once_on_first_use() {
        let constructed = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&constructed);
        let constructor: PluginConstructor = Arc::new(move |name: &str| {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(SimpleDataBinding::named(name)) as Arc<dyn DataBinding>
        });
        let lazy = LazyDataBinding::new(
            BindingDeclaration::new("plugins.Simple", "scalar").with_name("prim"),
            constructor,
        );
        assert_eq!(lazy.name(), "scalar");
        assert_eq!(lazy.aliases(), ["prim".to_owned()]);
        assert!(!lazy.is_instantiated());

        let mut data_type = DataType::new(PhysicalType::Scalar(weft_core::ScalarKind::Int));
        assert!(lazy.introspect(&mut data_type, &IntrospectionContext::default()));
        assert!(lazy.wrapper_handler().is_none());
        assert_eq!(data_type.data_binding(), Some("scalar"));
        assert_ne!(data_type.data_binding(), Some(binding_ids::SIMPLE));
        assert_eq!(constructed.load(Ordering::SeqCst), 1);
    }
}
