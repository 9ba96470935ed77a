//! 接口：操作集合及其名称索引。

use std::collections::HashMap;

use crate::error::{CoreError, Result, codes};

use super::operation::Operation;

/// 组件服务或引用所暴露的接口契约。
///
/// # 教案式说明
/// - **意图 (Why)**：底层方法名与逻辑操作名可能不同（显式重命名），解析流水线按任一名字查找时
///   必须落到同一个 [`Operation`] 上，才能保证后续阶段修改的是同一份实例；
/// - **契约 (What)**：
///   - 索引同时登记逻辑名与底层方法名；名字冲突视为畸形输入；
///   - 操作的 `name`/`accessor` 归接口所有，可变访问只通过闭包进行，闭包返回后两者还原为登记时的值，
///     索引因此始终有效；
/// - **权衡 (Trade-offs)**：不提供可变切片，批量修改改用
///   [`for_each_operation_mut`](Self::for_each_operation_mut) 与
///   [`try_for_each_operation_mut`](Self::try_for_each_operation_mut)。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Interface {
    name: String,
    remotable: bool,
    operations: Vec<Operation>,
    index: HashMap<String, usize>,
}

impl Interface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            remotable: false,
            operations: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn remotable(mut self, remotable: bool) -> Self {
        self.remotable = remotable;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_remotable(&self) -> bool {
        self.remotable
    }

    /// 登记操作；逻辑名或底层方法名与已有操作冲突时报错。
    pub fn add_operation(&mut self, operation: Operation) -> Result<usize> {
        let position = self.operations.len();
        let mut names = vec![operation.name.clone()];
        if let Some(accessor) = &operation.accessor {
            if accessor != &operation.name {
                names.push(accessor.clone());
            }
        }
        if let Some(taken) = names.iter().find(|name| self.index.contains_key(*name)) {
            return Err(CoreError::new(
                codes::INTROSPECTION_DUPLICATE_OPERATION,
                format!("interface `{}` already defines operation `{taken}`", self.name),
            ));
        }
        for name in names {
            self.index.insert(name, position);
        }
        self.operations.push(operation);
        Ok(position)
    }

    /// 按逻辑名或底层方法名查找。
    pub fn operation(&self, name: &str) -> Option<&Operation> {
        self.index.get(name).map(|&position| &self.operations[position])
    }

    /// 按逻辑名或底层方法名修改单个操作；名字未登记时返回 `None`。
    pub fn with_operation_mut<R>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Operation) -> R,
    ) -> Option<R> {
        let position = *self.index.get(name)?;
        self.operations
            .get_mut(position)
            .map(|operation| pinned(operation, f))
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn for_each_operation_mut(&mut self, mut f: impl FnMut(&mut Operation)) {
        for operation in &mut self.operations {
            pinned(operation, &mut f);
        }
    }

    /// 逐个修改操作，遇到第一个错误即停止。
    pub fn try_for_each_operation_mut<E>(
        &mut self,
        mut f: impl FnMut(&mut Operation) -> std::result::Result<(), E>,
    ) -> std::result::Result<(), E> {
        self.operations
            .iter_mut()
            .try_for_each(|operation| pinned(operation, &mut f))
    }
}

/// 执行 `f` 后把操作身份还原为登记时的值。
fn pinned<R>(operation: &mut Operation, f: impl FnOnce(&mut Operation) -> R) -> R {
    let name = operation.name.clone();
    let accessor = operation.accessor.clone();
    let result = f(operation);
    operation.name = name;
    operation.accessor = accessor;
    result
}
