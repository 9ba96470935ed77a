//! 操作与包装信息模型。

use super::data_type::DataType;
use super::xml::ElementInfo;

/// 包装风格操作的包装关系。
///
/// - `*_wrapper_element` 与 `*_child_elements` 来自接口元数据（例如 WSDL 的 wrapper 元素及其子元素，
///   子元素顺序即 schema 声明顺序）；
/// - `*_wrapper_type` 由包装解析阶段通过绑定的包装处理器计算；绑定没有包装处理器时两者都被显式置空。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WrapperInfo {
    pub input_wrapper_element: Option<ElementInfo>,
    pub output_wrapper_element: Option<ElementInfo>,
    pub input_child_elements: Vec<ElementInfo>,
    pub output_child_elements: Vec<ElementInfo>,
    pub input_wrapper_type: Option<DataType>,
    pub output_wrapper_type: Option<DataType>,
}

impl WrapperInfo {
    pub fn new(
        input_wrapper_element: Option<ElementInfo>,
        input_child_elements: Vec<ElementInfo>,
        output_wrapper_element: Option<ElementInfo>,
        output_child_elements: Vec<ElementInfo>,
    ) -> Self {
        Self {
            input_wrapper_element,
            output_wrapper_element,
            input_child_elements,
            output_child_elements,
            input_wrapper_type: None,
            output_wrapper_type: None,
        }
    }

    /// 指定方向的包装元素。
    pub fn wrapper_element(&self, input: bool) -> Option<&ElementInfo> {
        if input {
            self.input_wrapper_element.as_ref()
        } else {
            self.output_wrapper_element.as_ref()
        }
    }

    /// 指定方向的子元素，顺序即声明顺序。
    pub fn child_elements(&self, input: bool) -> &[ElementInfo] {
        if input {
            &self.input_child_elements
        } else {
            &self.output_child_elements
        }
    }

    pub fn wrapper_type(&self, input: bool) -> Option<&DataType> {
        if input {
            self.input_wrapper_type.as_ref()
        } else {
            self.output_wrapper_type.as_ref()
        }
    }
}

/// 接口上的一个可调用操作。
///
/// # 教案式说明
/// - **意图 (Why)**：操作在激活期构造一次、由解析流水线原地补全，调用期只读共享；
/// - **契约 (What)**：
///   - `inputs.len()` 等于底层方法声明的参数个数，顺序即参数下标；
///   - `accessor` 记录与逻辑名不同的底层方法名，两者在 [`crate::Interface`] 中解析到同一操作；
///   - `data_binding` 只在所有参与位置的非默认绑定一致时才被推导写入；
///   - `wrapper` 仅在 `wrapper_style` 为真时有意义。
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    pub name: String,
    pub accessor: Option<String>,
    pub inputs: Vec<DataType>,
    pub output: Option<DataType>,
    pub faults: Vec<DataType>,
    pub data_binding: Option<String>,
    pub wrapper_style: bool,
    pub wrapper: Option<WrapperInfo>,
    pub non_blocking: bool,
}

impl Operation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accessor: None,
            inputs: Vec::new(),
            output: None,
            faults: Vec::new(),
            data_binding: None,
            wrapper_style: false,
            wrapper: None,
            non_blocking: false,
        }
    }

    pub fn with_input(mut self, input: DataType) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_output(mut self, output: DataType) -> Self {
        self.output = Some(output);
        self
    }

    pub fn with_fault(mut self, fault: DataType) -> Self {
        self.faults.push(fault);
        self
    }

    pub fn with_data_binding(mut self, id: impl Into<String>) -> Self {
        self.data_binding = Some(id.into());
        self
    }

    /// 标记为包装风格并挂载包装信息。
    pub fn with_wrapper(mut self, wrapper: WrapperInfo) -> Self {
        self.wrapper_style = true;
        self.wrapper = Some(wrapper);
        self
    }

    /// 逻辑名或底层方法名是否指向本操作。
    pub fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.accessor.as_deref() == Some(name)
    }

    /// 遍历所有位置（输入、输出、故障）的可变引用。
    pub fn data_types_mut(&mut self) -> impl Iterator<Item = &mut DataType> {
        self.inputs
            .iter_mut()
            .chain(self.output.iter_mut())
            .chain(self.faults.iter_mut())
    }

    pub fn data_types(&self) -> impl Iterator<Item = &DataType> {
        self.inputs
            .iter()
            .chain(self.output.iter())
            .chain(self.faults.iter())
    }
}
