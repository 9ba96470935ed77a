//! # config 模块说明
//!
//! ## 角色定位（Why）
//! - 运行时的可调项集中在一份 TOML 文档中：注册表声明、链路构建开关、日志输出；
//! - 解析失败以 [`ConfigError`] 返回，再经 `From` 汇入 [`CoreError`]。
//!
//! ## 示例
//! ```toml
//! [registry]
//! builtins = true
//! declarations = [
//!     { class = "weft.xml.XmlElementDataBinding", type = "xml:dom", name = "dom" },
//! ]
//!
//! [chain]
//! verify_declared_bindings = true
//!
//! [logging]
//! target = "weft::invocation"
//! level = "debug"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{CoreError, codes};

/// 配置解析错误。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration file `{path}`")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl From<ConfigError> for CoreError {
    fn from(value: ConfigError) -> Self {
        let message = value.to_string();
        CoreError::new(codes::CONFIG_INVALID, message).with_cause(value)
    }
}

/// 一条声明式绑定登记：`{class, type, name}`。
///
/// - `class` 在插件表中查找构造函数；
/// - `type` 成为规范标识；
/// - `name` 成为别名（可选）。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct BindingDeclaration {
    pub class: String,
    #[serde(rename = "type")]
    pub binding_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl BindingDeclaration {
    pub fn new(class: impl Into<String>, binding_type: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            binding_type: binding_type.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// 注册表配置。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// 是否立即登记内置绑定。
    pub builtins: bool,
    /// 懒加载时读取的声明。
    pub declarations: Vec<BindingDeclaration>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            builtins: true,
            declarations: Vec::new(),
        }
    }
}

/// 链路构建配置。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ChainConfig {
    /// 构建链路前校验所有声明式绑定都可解析。
    pub verify_declared_bindings: bool,
    /// 业务目标 panic 时转为故障体。
    pub isolate_target_panics: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            verify_declared_bindings: true,
            isolate_target_panics: true,
        }
    }
}

/// 日志级别。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

/// 日志配置。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 调用日志使用的 target。
    pub target: String,
    pub level: LogLevel,
    /// `EnvFilter` 指令；为空时使用 `RUST_LOG` 或 `level`。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            target: "weft::invocation".to_owned(),
            level: LogLevel::Info,
            filter: None,
        }
    }
}

/// 运行时配置根。
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub registry: RegistryConfig,
    pub chain: ChainConfig,
    pub logging: LoggingConfig,
}

impl RuntimeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }
}
