//! XML Infoset 侧的最小命名模型：限定名、元素描述与 XML 类型。

use std::fmt;

/// 命名空间限定名。
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub namespace: String,
    pub local: String,
}

impl QName {
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            local: local.into(),
        }
    }

    /// 无命名空间的限定名。
    pub fn local(local: impl Into<String>) -> Self {
        Self::new(String::new(), local)
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            f.write_str(&self.local)
        } else {
            write!(f, "{{{}}}{}", self.namespace, self.local)
        }
    }
}

/// 包装元素或其子元素的结构描述。
///
/// `many` 表示元素可重复（`maxOccurs > 1`），`nillable` 表示允许显式空值。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ElementInfo {
    pub name: QName,
    pub type_name: Option<QName>,
    pub many: bool,
    pub nillable: bool,
}

impl ElementInfo {
    pub fn new(name: QName) -> Self {
        Self {
            name,
            type_name: None,
            many: false,
            nillable: false,
        }
    }

    pub fn with_type(mut self, type_name: QName) -> Self {
        self.type_name = Some(type_name);
        self
    }

    pub fn many(mut self) -> Self {
        self.many = true;
        self
    }

    pub fn nillable(mut self) -> Self {
        self.nillable = true;
        self
    }
}

/// 逻辑类型的 XML 视角：全局元素名与/或 schema 类型名。
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct XmlType {
    pub element: Option<QName>,
    pub type_name: Option<QName>,
}

impl XmlType {
    pub fn element(element: QName) -> Self {
        Self {
            element: Some(element),
            type_name: None,
        }
    }

    pub fn with_type_name(mut self, type_name: QName) -> Self {
        self.type_name = Some(type_name);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qname_display_uses_clark_notation() {
        assert_eq!(QName::new("urn:a", "order").to_string(), "{urn:a}order");
        assert_eq!(QName::local("order").to_string(), "order");
    }
}
