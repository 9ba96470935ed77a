//! # registry 模块说明
//!
//! ## 角色定位（Why）
//! - 进程内唯一的数据绑定注册表，以依赖注入方式传给内省、分配、包装解析与链路构建；
//! - 读多写少：写入只发生在启动与扩展加载期，调用期只有并发读取。
//!
//! ## 并发模型（How）
//! - 整张表由 [`ArcSwap`] 持有，写入采用“克隆 - 修改 - 整表替换”，读路径零锁；
//! - 写者之间由 `parking_lot::Mutex` 串行化，避免丢失更新；
//! - 声明式懒加载由 [`OnceLock`] 保证全进程至多执行一次，并发触发者阻塞等待同一结果，
//!   其 acquire/release 语义保证加载完成后的表对所有读者可见。

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use tracing::{debug, info, warn};
use weft_core::config::RegistryConfig;
use weft_core::{
    Annotation, BindingOrigin, DataBinding, DataType, Interface, IntrospectionContext,
    binding_ids,
};

use crate::builtin::{builtin_bindings, builtin_plugins};
use crate::declaration::{BindingPlugins, DeclarationSource, LazyDataBinding, StaticDeclarations};
use crate::error::RegistryError;

/// 注册表快照：登记顺序列表 + 小写键索引。
#[derive(Clone, Default)]
struct RegistryTable {
    ordered: Vec<Arc<dyn DataBinding>>,
    keys: HashMap<String, Arc<dyn DataBinding>>,
}

impl RegistryTable {
    fn get(&self, key: &str) -> Option<Arc<dyn DataBinding>> {
        self.keys.get(key).cloned()
    }

    fn upsert(&mut self, binding: Arc<dyn DataBinding>) -> Option<Arc<dyn DataBinding>> {
        let name = binding.name().to_lowercase();
        let replaced = self.keys.get(&name).cloned();
        self.keys.insert(name, Arc::clone(&binding));
        for alias in binding.aliases() {
            self.keys.insert(alias.to_lowercase(), Arc::clone(&binding));
        }
        // 旧绑定仍有键存活（例如只被占用了别名）时两者并存，新绑定排到末尾。
        let slot = replaced
            .as_ref()
            .filter(|old| !self.keys.values().any(|live| Arc::ptr_eq(live, old)))
            .and_then(|old| self.ordered.iter().position(|b| Arc::ptr_eq(b, old)));
        match slot {
            Some(position) => self.ordered[position] = Arc::clone(&binding),
            None => self.ordered.push(Arc::clone(&binding)),
        }
        self.compact();
        replaced
    }

    fn remove(&mut self, key: &str) -> Option<Arc<dyn DataBinding>> {
        let removed = self.keys.get(key).cloned()?;
        self.keys.retain(|_, binding| !Arc::ptr_eq(binding, &removed));
        self.compact();
        Some(removed)
    }

    /// 丢弃已经没有任何键指向的条目。
    fn compact(&mut self) {
        let keys = &self.keys;
        self.ordered
            .retain(|binding| keys.values().any(|live| Arc::ptr_eq(live, binding)));
    }
}

/// 一次性懒加载的结果。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// 成功登记的声明数。
    pub registered: usize,
    /// 因插件缺失被跳过的声明。
    pub skipped: Vec<RegistryError>,
    /// 声明源本身失败时的错误。
    pub failure: Option<RegistryError>,
}

/// `DataBindingRegistry` 是数据绑定的进程级注册表。
///
/// # 教案式说明
/// - **意图 (Why)**：绑定按名称（大小写不敏感）查找，并按登记顺序参与类型内省；
///   声明式绑定延迟到首次未命中时再批量登记，降低启动成本；
/// - **契约 (What)**：
///   - [`register`](Self::register) 以小写规范名与各别名为键，同键后者覆盖前者且不报错；
///     旧绑定被完全取代时新绑定接管其扫描位置，旧绑定仍保有其他键时两者并存；
///   - [`lookup`](Self::lookup) 未命中时触发一次性懒加载并重试一次；
///   - [`introspect_type`](Self::introspect_type) 按登记顺序扫描并跳过普通对象绑定；
/// - **权衡 (Trade-offs)**：每次写入复制整张表，写入代价随绑定数线性增长，换取读路径无锁。
pub struct DataBindingRegistry {
    table: ArcSwap<RegistryTable>,
    revision: AtomicU64,
    writer: Mutex<()>,
    source: Option<Arc<dyn DeclarationSource>>,
    plugins: BindingPlugins,
    loaded: OnceLock<LoadReport>,
}

impl Default for DataBindingRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DataBindingRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .bindings()
            .iter()
            .map(|binding| binding.name().to_owned())
            .collect();
        f.debug_struct("DataBindingRegistry")
            .field("bindings", &names)
            .field("revision", &self.revision())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl DataBindingRegistry {
    /// 空注册表，没有声明源。
    pub fn new() -> Self {
        Self {
            table: ArcSwap::from_pointee(RegistryTable::default()),
            revision: AtomicU64::new(0),
            writer: Mutex::new(()),
            source: None,
            plugins: BindingPlugins::new(),
            loaded: OnceLock::new(),
        }
    }

    /// 带声明源与插件表的注册表。
    pub fn with_declarations(source: Arc<dyn DeclarationSource>, plugins: BindingPlugins) -> Self {
        Self {
            source: Some(source),
            plugins,
            ..Self::new()
        }
    }

    /// 立即登记全部内置绑定的注册表。
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register_builtins();
        registry
    }

    /// 按配置构造：内置绑定可选，声明解析使用内置插件表加上 `plugins`。
    pub fn from_config(config: &RegistryConfig, plugins: BindingPlugins) -> Self {
        let mut table = builtin_plugins();
        table.extend(plugins);
        let registry = Self::with_declarations(
            Arc::new(StaticDeclarations(config.declarations.clone())),
            table,
        );
        if config.builtins {
            registry.register_builtins();
        }
        registry
    }

    pub fn register_builtins(&self) {
        for binding in builtin_bindings() {
            self.register(binding);
        }
    }

    /// 登记绑定，返回被同名替换的旧绑定。
    pub fn register(&self, binding: Arc<dyn DataBinding>) -> Option<Arc<dyn DataBinding>> {
        let _guard = self.writer.lock();
        let mut next = RegistryTable::clone(&self.table.load());
        let name = binding.name().to_owned();
        let replaced = next.upsert(binding);
        self.table.store(Arc::new(next));
        let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
        match &replaced {
            Some(_) => info!(binding = %name, revision, "data binding replaced"),
            None => debug!(binding = %name, revision, "data binding registered"),
        }
        replaced
    }

    /// 移除绑定及其全部别名。
    pub fn remove(&self, id: &str) -> Option<Arc<dyn DataBinding>> {
        let _guard = self.writer.lock();
        let mut next = RegistryTable::clone(&self.table.load());
        let removed = next.remove(&id.to_lowercase())?;
        self.table.store(Arc::new(next));
        let revision = self.revision.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(binding = %removed.name(), revision, "data binding removed");
        Some(removed)
    }

    /// 大小写不敏感查找；首次未命中时触发懒加载并重试一次。
    pub fn lookup(&self, id: &str) -> Option<Arc<dyn DataBinding>> {
        let key = id.to_lowercase();
        if let Some(binding) = self.table.load().get(&key) {
            return Some(binding);
        }
        if self.is_loaded() {
            return None;
        }
        self.load_declarations();
        self.table.load().get(&key)
    }

    /// 执行（或等待）一次性声明加载。
    pub fn load_declarations(&self) -> &LoadReport {
        self.loaded.get_or_init(|| self.run_declaration_load())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.get().is_some()
    }

    fn run_declaration_load(&self) -> LoadReport {
        let mut report = LoadReport::default();
        let Some(source) = &self.source else {
            return report;
        };
        let declarations = match source.declarations() {
            Ok(declarations) => declarations,
            Err(err) => {
                warn!(error = %err, "data binding declarations could not be read");
                report.failure = Some(err);
                return report;
            }
        };
        for declaration in declarations {
            match self.plugins.get(&declaration.class) {
                Some(constructor) => {
                    let lazy = LazyDataBinding::new(declaration, Arc::clone(constructor));
                    self.register(Arc::new(lazy));
                    report.registered += 1;
                }
                None => {
                    let err = RegistryError::PluginMissing {
                        class: declaration.class.clone(),
                        binding: declaration.binding_type.clone(),
                    };
                    warn!(error = %err, "skipping data binding declaration");
                    report.skipped.push(err);
                }
            }
        }
        info!(
            registered = report.registered,
            skipped = report.skipped.len(),
            "data binding declarations loaded"
        );
        report
    }

    /// 登记顺序的绑定快照。
    pub fn bindings(&self) -> Vec<Arc<dyn DataBinding>> {
        self.table.load().ordered.clone()
    }

    /// 每次写入递增的修订号。
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// 通用类型内省。
    ///
    /// # 教案级说明
    /// - **意图 (Why)**：为尚未绑定的位置挑选第一个认领它的绑定；
    /// - **流程 (How)**：
    ///   1. 确保声明已加载；
    ///   2. 先为尚未绑定的嵌套元素类型（数组、列表元素）递归内省，即便外层已经绑定；
    ///   3. 非故障位置已有绑定时视为已决定，直接返回 `true`；
    ///   4. 按登记顺序扫描（跳过普通对象绑定）：故障位置只询问异常处理器，命中后同时改写绑定与逻辑类型，
    ///      即便该位置已带有接口级默认绑定；其余位置询问 `introspect` 谓词；
    ///   5. 无人认领且物理类型不是 `Any` 时兜底为普通对象绑定并返回 `false`。
    pub fn introspect_type(
        &self,
        data_type: &mut DataType,
        annotations: &[Annotation],
        is_exception: bool,
    ) -> bool {
        self.load_declarations();

        if let Some(element) = data_type.nested_mut() {
            self.introspect_type(element, &[], false);
        }
        let was_bound = data_type.is_bound();
        if was_bound && !is_exception {
            return true;
        }
        let table = self.table.load_full();
        self.scan(&table, data_type, annotations, is_exception) || was_bound
    }

    fn scan(
        &self,
        table: &RegistryTable,
        data_type: &mut DataType,
        annotations: &[Annotation],
        is_exception: bool,
    ) -> bool {
        let ctx = IntrospectionContext::new(annotations);
        for binding in &table.ordered {
            if binding.name().eq_ignore_ascii_case(binding_ids::PLAIN_OBJECT) {
                continue;
            }
            if is_exception {
                let shape = binding
                    .exception_handler()
                    .and_then(|handler| handler.fault_type(data_type));
                if let Some(shape) = shape {
                    data_type.set_fault_shape(binding.name(), shape);
                    return true;
                }
                continue;
            }
            if binding.introspect(data_type, &ctx) {
                return true;
            }
        }
        if !data_type.physical().is_any() {
            data_type.assign_binding(binding_ids::PLAIN_OBJECT, BindingOrigin::Fallback);
        }
        false
    }

    /// 校验接口中所有显式声明的绑定都已登记（必要时触发懒加载）。
    pub fn verify_interface(&self, interface: &Interface) -> Result<(), RegistryError> {
        for operation in interface.operations() {
            if let Some(id) = &operation.data_binding {
                self.require(id, || format!("{}#{}", interface.name(), operation.name))?;
            }
            let positions = operation
                .inputs
                .iter()
                .enumerate()
                .map(|(index, data_type)| (format!("input {index}"), data_type))
                .chain(
                    operation
                        .output
                        .iter()
                        .map(|data_type| ("output".to_owned(), data_type)),
                )
                .chain(
                    operation
                        .faults
                        .iter()
                        .enumerate()
                        .map(|(index, data_type)| (format!("fault {index}"), data_type)),
                );
            for (position, data_type) in positions {
                let mut current = Some(data_type);
                while let Some(data_type) = current {
                    if data_type.origin() == BindingOrigin::Declared {
                        if let Some(id) = data_type.data_binding() {
                            self.require(id, || {
                                format!("{}#{} {position}", interface.name(), operation.name)
                            })?;
                        }
                    }
                    current = data_type.nested();
                }
            }
        }
        Ok(())
    }

    fn require(&self, id: &str, location: impl FnOnce() -> String) -> Result<(), RegistryError> {
        match self.lookup(id) {
            Some(_) => Ok(()),
            None => Err(RegistryError::Unresolved {
                binding: id.to_owned(),
                location: location(),
            }),
        }
    }
}
