//! 数据类型模型：解析流水线的输入与输出。

pub mod data_type;
pub mod interface;
pub mod operation;
pub mod types;
pub mod xml;

pub use data_type::{BindingOrigin, DataType, LogicalType, binding_ids};
pub use interface::Interface;
pub use operation::{Operation, WrapperInfo};
pub use types::{
    Annotation, ClassDescriptor, PhysicalType, PropertyDescriptor, ScalarKind, find_data_binding,
    find_data_type,
};
pub use xml::{ElementInfo, QName, XmlType};
