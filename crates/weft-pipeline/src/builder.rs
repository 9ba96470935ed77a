//! # builder 模块说明
//!
//! ## 角色定位（Why）
//! - 把绑定协议提供者、组件接口与业务目标装配成 [`RuntimeWire`]；
//! - 装配期发现的问题（绑定未登记、提供者失败、操作缺少调用器）同步返回 [`ChainError`]，
//!   阻止组件启动。
//!
//! ## 装配规则（How）
//! 1. 克隆服务接口，交给请求线缆格式（以及标识不同的响应线缆格式）改写为绑定侧契约；
//! 2. 按配置校验两侧契约中显式声明的绑定均已登记；
//! 3. 绑定级链：传输拦截器在 [`Phase::Transport`]，操作选择器在其声明阶段，随后请求线缆格式；
//!    响应线缆格式仅在格式标识与请求不同时追加；
//! 4. 操作链：绑定策略在 [`Phase::BindingPolicy`]，实现策略在其声明阶段；两侧契约需要转换时在 [`Phase::Interface`] 插入
//!    [`DataTransformationInterceptor`]；尾部为业务调用器。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};
use weft_core::config::ChainConfig;
use weft_core::{
    FaultBody, Interface, Invoker, Operation, OperationSelectorProvider, Phase, PolicyProvider,
    TransportProvider, WireFormatProvider,
};
use weft_databinding::DataBindingRegistry;

use crate::chain::InvocationChain;
use crate::error::ChainError;
use crate::invoker::{OperationDispatcher, TargetFn, TargetInvoker};
use crate::transform::{
    CopyMediator, DataTransformationInterceptor, Mediator, is_transformation_required,
};
use crate::wire::RuntimeWire;

/// 单个绑定声明的协议能力。
#[derive(Clone, Default)]
pub struct BindingProviders {
    transport: Option<Arc<dyn TransportProvider>>,
    selector: Option<Arc<dyn OperationSelectorProvider>>,
    request_format: Option<Arc<dyn WireFormatProvider>>,
    response_format: Option<Arc<dyn WireFormatProvider>>,
    policies: Vec<Arc<dyn PolicyProvider>>,
}

impl BindingProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transport(mut self, provider: Arc<dyn TransportProvider>) -> Self {
        self.transport = Some(provider);
        self
    }

    pub fn selector(mut self, provider: Arc<dyn OperationSelectorProvider>) -> Self {
        self.selector = Some(provider);
        self
    }

    /// 请求与响应共用的线缆格式。
    pub fn wire_format(mut self, provider: Arc<dyn WireFormatProvider>) -> Self {
        self.request_format = Some(provider);
        self
    }

    /// 单独的响应线缆格式。
    pub fn response_format(mut self, provider: Arc<dyn WireFormatProvider>) -> Self {
        self.response_format = Some(provider);
        self
    }

    /// 绑定侧策略，逐操作挂载在 [`Phase::BindingPolicy`]。
    pub fn policy(mut self, provider: Arc<dyn PolicyProvider>) -> Self {
        self.policies.push(provider);
        self
    }

    /// 与请求格式标识不同的响应格式。
    fn distinct_response_format(&self) -> Option<&Arc<dyn WireFormatProvider>> {
        let response = self.response_format.as_ref()?;
        match &self.request_format {
            Some(request) if request.format_id() == response.format_id() => None,
            _ => Some(response),
        }
    }
}

impl fmt::Debug for BindingProviders {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingProviders")
            .field("transport", &self.transport.is_some())
            .field("selector", &self.selector.is_some())
            .field(
                "request_format",
                &self.request_format.as_ref().map(|p| p.format_id().to_owned()),
            )
            .field(
                "response_format",
                &self.response_format.as_ref().map(|p| p.format_id().to_owned()),
            )
            .field("policies", &self.policies.len())
            .finish()
    }
}

enum TargetSlot {
    Invoker(Arc<dyn Invoker>),
    Function(Arc<TargetFn>),
}

/// 组件实现：操作名到业务目标的映射。
#[derive(Default)]
pub struct ComponentTargets {
    slots: HashMap<String, TargetSlot>,
}

impl ComponentTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以业务函数实现操作；是否隔离 panic 由 [`ChainConfig`] 决定。
    pub fn with_fn<F>(mut self, operation: impl Into<String>, target: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, FaultBody> + Send + Sync + 'static,
    {
        self.slots
            .insert(operation.into(), TargetSlot::Function(Arc::new(target)));
        self
    }

    /// 以自定义调用器实现操作，例如下一条线路。
    pub fn with_invoker(mut self, operation: impl Into<String>, invoker: Arc<dyn Invoker>) -> Self {
        self.slots
            .insert(operation.into(), TargetSlot::Invoker(invoker));
        self
    }

    fn resolve(&self, operation: &Operation, isolate_panics: bool) -> Option<Arc<dyn Invoker>> {
        let slot = self.slots.get(&operation.name).or_else(|| {
            operation
                .accessor
                .as_ref()
                .and_then(|accessor| self.slots.get(accessor))
        })?;
        Some(match slot {
            TargetSlot::Invoker(invoker) => Arc::clone(invoker),
            TargetSlot::Function(target) => Arc::new(
                TargetInvoker::from_shared(operation.name.clone(), Arc::clone(target))
                    .isolate_panics(isolate_panics),
            ),
        })
    }
}

impl fmt::Debug for ComponentTargets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut operations: Vec<_> = self.slots.keys().collect();
        operations.sort();
        f.debug_struct("ComponentTargets")
            .field("operations", &operations)
            .finish()
    }
}

/// 运行时线路构建器。
///
/// # 教案式说明
/// - **意图 (Why)**：链路构建集中在一处，保证阶段顺序、线缆格式去重与绑定校验在所有线路上一致；
/// - **契约 (What)**：
///   - 线缆格式按标识比较，同标识的请求/响应格式只挂载一次；
///   - 服务接口不会被修改，提供者改写的是其克隆；
///   - 实现策略由构建器持有，对它构建的所有线路生效；
/// - **权衡 (Trade-offs)**：每条线路持有一份绑定侧接口副本，换取提供者可以自由改写契约。
pub struct WireBuilder {
    registry: Arc<DataBindingRegistry>,
    config: ChainConfig,
    mediator: Arc<dyn Mediator>,
    implementation_policies: Vec<Arc<dyn PolicyProvider>>,
}

impl WireBuilder {
    pub fn new(registry: Arc<DataBindingRegistry>) -> Self {
        let mediator = Arc::new(CopyMediator::new(Arc::clone(&registry)));
        Self {
            registry,
            config: ChainConfig::default(),
            mediator,
            implementation_policies: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: ChainConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_mediator(mut self, mediator: Arc<dyn Mediator>) -> Self {
        self.mediator = mediator;
        self
    }

    pub fn with_implementation_policy(mut self, provider: Arc<dyn PolicyProvider>) -> Self {
        self.implementation_policies.push(provider);
        self
    }

    pub fn registry(&self) -> &Arc<DataBindingRegistry> {
        &self.registry
    }

    /// 为 `component` 的服务 `service` 在给定绑定上构建线路。
    pub fn build(
        &self,
        component: &str,
        service: Arc<Interface>,
        providers: &BindingProviders,
        targets: &ComponentTargets,
    ) -> Result<RuntimeWire, ChainError> {
        let wire_name = format!("{component}/{}", service.name());
        let binding_interface = Arc::new(self.binding_contract(&service, providers)?);

        if self.config.verify_declared_bindings {
            self.registry.verify_interface(&service)?;
            self.registry.verify_interface(&binding_interface)?;
        }

        let binding_operations: Vec<Arc<Operation>> = binding_interface
            .operations()
            .iter()
            .cloned()
            .map(Arc::new)
            .collect();

        let mut dispatcher = OperationDispatcher::new(service.name());
        for source in &binding_operations {
            let target = service.operation(&source.name).ok_or_else(|| {
                ChainError::UnknownOperation {
                    interface: service.name().to_owned(),
                    operation: source.name.clone(),
                }
            })?;
            let chain = self.operation_chain(
                &wire_name,
                Arc::clone(source),
                Arc::new(target.clone()),
                providers,
                targets,
            )?;
            dispatcher.insert(Arc::new(chain));
        }
        let dispatcher = Arc::new(dispatcher);

        let mut binding_chain = InvocationChain::new(format!("{wire_name}#binding"));
        if let Some(transport) = &providers.transport {
            let interceptor = transport
                .create_interceptor()
                .map_err(|err| ChainError::provider("transport", err))?;
            binding_chain.add_interceptor(Phase::Transport, interceptor);
        }
        if let Some(selector) = &providers.selector {
            let interceptor = selector
                .create_interceptor(&binding_operations)
                .map_err(|err| ChainError::provider("operation-selector", err))?;
            binding_chain.add_interceptor(selector.phase(), interceptor);
        }
        if let Some(format) = &providers.request_format {
            let interceptor = format
                .create_interceptor()
                .map_err(|err| ChainError::provider(format.format_id(), err))?;
            binding_chain.add_interceptor(format.phase(), interceptor);
        }
        if let Some(format) = providers.distinct_response_format() {
            let interceptor = format
                .create_interceptor()
                .map_err(|err| ChainError::provider(format.format_id(), err))?;
            binding_chain.add_interceptor(format.phase(), interceptor);
        }
        binding_chain.set_invoker(Arc::clone(&dispatcher) as Arc<dyn Invoker>);

        info!(
            wire = %wire_name,
            binding_interceptors = binding_chain.len(),
            operations = dispatcher.chains().len(),
            "runtime wire built"
        );
        Ok(RuntimeWire::new(
            wire_name,
            service,
            binding_interface,
            binding_operations,
            Arc::new(binding_chain),
            dispatcher,
        ))
    }

    fn binding_contract(
        &self,
        service: &Interface,
        providers: &BindingProviders,
    ) -> Result<Interface, ChainError> {
        let mut contract = service.clone();
        if let Some(format) = &providers.request_format {
            format
                .configure_interface_contract(&mut contract)
                .map_err(|err| ChainError::provider(format.format_id(), err))?;
        }
        if let Some(format) = providers.distinct_response_format() {
            format
                .configure_interface_contract(&mut contract)
                .map_err(|err| ChainError::provider(format.format_id(), err))?;
        }
        Ok(contract)
    }

    fn operation_chain(
        &self,
        wire_name: &str,
        source: Arc<Operation>,
        target: Arc<Operation>,
        providers: &BindingProviders,
        targets: &ComponentTargets,
    ) -> Result<InvocationChain, ChainError> {
        let mut chain = InvocationChain::for_operation(Arc::clone(&target));

        let policies = providers
            .policies
            .iter()
            .map(|provider| (Phase::BindingPolicy, provider))
            .chain(
                self.implementation_policies
                    .iter()
                    .map(|provider| (provider.phase(), provider)),
            );
        for (phase, provider) in policies {
            let interceptor = provider
                .create_interceptor(&target)
                .map_err(|err| ChainError::provider(phase.as_str(), err))?;
            if let Some(interceptor) = interceptor {
                chain.add_interceptor(phase, interceptor);
            }
        }

        if is_transformation_required(&source, &target) {
            debug!(
                wire = %wire_name,
                operation = %target.name,
                "contracts differ, data transformation attached"
            );
            chain.add_interceptor(
                Phase::Interface,
                Arc::new(DataTransformationInterceptor::new(
                    source,
                    Arc::clone(&target),
                    Arc::clone(&self.registry),
                    Arc::clone(&self.mediator),
                )),
            );
        }

        let invoker = targets
            .resolve(&target, self.config.isolate_target_panics)
            .ok_or_else(|| ChainError::NoInvoker {
                chain: format!("{wire_name}#{}", target.name),
            })?;
        chain.set_invoker(invoker);
        Ok(chain)
    }
}

impl fmt::Debug for WireBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireBuilder")
            .field("config", &self.config)
            .field("implementation_policies", &self.implementation_policies.len())
            .finish()
    }
}
