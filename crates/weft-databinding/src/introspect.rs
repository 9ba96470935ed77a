//! # introspect 模块说明
//!
//! ## 角色定位（Why）
//! - 把装配模型交付的接口反射描述（[`InterfaceDescriptor`]）转成 [`Interface`]/[`Operation`]
//!   骨架，每个位置一个尚未内省的 [`DataType`]；
//! - 声明式绑定（接口默认、方法默认、参数覆盖）在这里写入，早于注册表的通用内省。
//!
//! ## 契约说明（What）
//! - 参数注解组数与参数个数不一致属于畸形输入，直接报错，不产出半成品操作；
//! - 显式覆盖引用了未登记的绑定时不在此处报错，留到链路构建前统一校验；
//! - 被排除的方法不生成操作。

use tracing::debug;
use weft_core::{
    Annotation, DataType, Interface, Operation, PhysicalType, WrapperInfo, find_data_binding,
    find_data_type,
};

use crate::error::IntrospectionError;

/// 接口级反射描述。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InterfaceDescriptor {
    pub name: String,
    pub remotable: bool,
    pub annotations: Vec<Annotation>,
    pub methods: Vec<MethodDescriptor>,
}

impl InterfaceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn remotable(mut self) -> Self {
        self.remotable = true;
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// 按底层方法名查找。
    pub fn find_method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|method| method.name == name)
    }
}

/// 方法级反射描述。
///
/// `parameter_annotations` 与 `parameter_types` 按下标对应；为空表示所有参数都没有注解。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MethodDescriptor {
    pub name: String,
    pub operation_name: Option<String>,
    pub excluded: bool,
    pub parameter_types: Vec<PhysicalType>,
    pub parameter_annotations: Vec<Vec<Annotation>>,
    pub return_type: Option<PhysicalType>,
    pub annotations: Vec<Annotation>,
    pub faults: Vec<PhysicalType>,
    pub wrapper: Option<WrapperInfo>,
    pub non_blocking: bool,
}

impl MethodDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// 追加一个参数及其注解。
    pub fn param(mut self, physical: PhysicalType, annotations: Vec<Annotation>) -> Self {
        if self.parameter_annotations.len() < self.parameter_types.len() {
            self.parameter_annotations
                .resize(self.parameter_types.len(), Vec::new());
        }
        self.parameter_types.push(physical);
        self.parameter_annotations.push(annotations);
        self
    }

    pub fn returns(mut self, physical: PhysicalType) -> Self {
        self.return_type = Some(physical);
        self
    }

    pub fn throws(mut self, physical: PhysicalType) -> Self {
        self.faults.push(physical);
        self
    }

    pub fn annotate(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// 以不同于方法名的逻辑名暴露。
    pub fn renamed(mut self, operation_name: impl Into<String>) -> Self {
        self.operation_name = Some(operation_name.into());
        self
    }

    pub fn excluded(mut self) -> Self {
        self.excluded = true;
        self
    }

    pub fn wrapper(mut self, wrapper: WrapperInfo) -> Self {
        self.wrapper = Some(wrapper);
        self
    }

    pub fn one_way(mut self) -> Self {
        self.non_blocking = true;
        self
    }

    /// 第 `index` 个参数的注解。
    pub fn annotations_for(&self, index: usize) -> &[Annotation] {
        self.parameter_annotations
            .get(index)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 校验注解组数与参数个数一致。
    pub fn validate(&self) -> Result<(), IntrospectionError> {
        let annotated = self.parameter_annotations.len();
        if annotated != 0 && annotated != self.parameter_types.len() {
            return Err(IntrospectionError::ParameterMismatch {
                operation: self.name.clone(),
                declared: self.parameter_types.len(),
                annotated,
            });
        }
        Ok(())
    }
}

/// 操作内省器。
///
/// # 教案式说明
/// - **意图 (Why)**：描述符到操作骨架的转换只做结构映射与声明式绑定，保持纯函数，便于缓存；
/// - **流程 (How)**：
///   1. 读取接口级 `DataBinding` 注解作为默认绑定与包装风格；方法级注解覆盖接口级；
///   2. 每个参数先写入默认绑定，再写入参数级 `DataType` 覆盖；
///   3. 返回值使用方法级 `DataType` 覆盖；故障只写入默认绑定；
///   4. 逻辑名与方法名不同时记录在 `accessor`。
#[derive(Clone, Copy, Debug, Default)]
pub struct OperationIntrospector;

impl OperationIntrospector {
    pub fn new() -> Self {
        Self
    }

    pub fn introspect(&self, descriptor: &InterfaceDescriptor) -> weft_core::Result<Interface> {
        let class_default = find_data_binding(&descriptor.annotations);
        let mut interface = Interface::new(descriptor.name.clone()).remotable(descriptor.remotable);
        for method in descriptor.methods.iter().filter(|method| !method.excluded) {
            let operation = self.introspect_method(method, class_default)?;
            interface.add_operation(operation)?;
        }
        debug!(
            interface = %descriptor.name,
            operations = interface.operations().len(),
            "interface introspected"
        );
        Ok(interface)
    }

    /// 单个方法到操作骨架。
    pub fn introspect_method(
        &self,
        method: &MethodDescriptor,
        class_default: Option<(&str, bool)>,
    ) -> Result<Operation, IntrospectionError> {
        method.validate()?;

        let defaults = find_data_binding(&method.annotations).or(class_default);
        let default_binding = defaults.map(|(id, _)| id);
        let wrapped = defaults.is_some_and(|(_, wrapped)| wrapped);

        let name = method
            .operation_name
            .clone()
            .unwrap_or_else(|| method.name.clone());
        let mut operation = Operation::new(name);
        if operation.name != method.name {
            operation.accessor = Some(method.name.clone());
        }
        operation.data_binding = default_binding.map(str::to_owned);
        operation.non_blocking = method.non_blocking;
        operation.wrapper_style = wrapped || method.wrapper.is_some();
        operation.wrapper = method.wrapper.clone();

        operation.inputs = method
            .parameter_types
            .iter()
            .enumerate()
            .map(|(index, physical)| {
                declared(
                    physical,
                    default_binding,
                    find_data_type(method.annotations_for(index)),
                )
            })
            .collect();
        operation.output = method.return_type.as_ref().map(|physical| {
            declared(
                physical,
                default_binding,
                find_data_type(&method.annotations),
            )
        });
        operation.faults = method
            .faults
            .iter()
            .map(|physical| declared(physical, default_binding, None))
            .collect();
        Ok(operation)
    }
}

fn declared(
    physical: &PhysicalType,
    default_binding: Option<&str>,
    explicit: Option<&str>,
) -> DataType {
    let mut data_type = DataType::new(physical.clone());
    if let Some(id) = explicit.or(default_binding) {
        data_type.declare_binding(id);
    }
    data_type
}
