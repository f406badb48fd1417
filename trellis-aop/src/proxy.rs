//! 代理工厂
//!
//! 两种代理策略：
//! - `ContractProxy`：目标类实现了至少一个契约时使用，只暴露契约上声明的方法
//! - `SubclassProxy`：没有契约时使用，可覆盖的方法走拦截器链，final / 私有方法直接调用目标
//!
//! 两者都实现 `BeanObject`，容器缓存和注入看到的就是代理本身。

use std::sync::Arc;

use trellis_core::{
    invoke_object_method, is_object_method, Arguments, BeanObject, BeanRef, ClassMetadata, Instance,
    MethodMetadata, MethodResult,
};

use crate::advised::AdvisedSupport;
use crate::error::AopError;
use crate::joinpoint::MethodInvocation;

/// AOP 代理
pub trait AopProxy: BeanObject {
    fn advised(&self) -> &Arc<AdvisedSupport>;

    /// 以容器句柄的形式返回代理
    fn get_proxy(self: Arc<Self>) -> BeanRef;
}

/// 代理类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyStrategy {
    Contract,
    Subclass,
}

pub struct ProxyFactory;

impl ProxyFactory {
    /// 根据目标类是否实现契约选择代理策略
    pub fn strategy_for(class: &ClassMetadata) -> ProxyStrategy {
        if class.has_contracts() {
            ProxyStrategy::Contract
        } else {
            ProxyStrategy::Subclass
        }
    }

    pub fn create_aop_proxy(advised: Arc<AdvisedSupport>) -> Arc<dyn AopProxy> {
        match Self::strategy_for(advised.target_class()) {
            ProxyStrategy::Contract => Arc::new(ContractProxy::new(advised)),
            ProxyStrategy::Subclass => Arc::new(SubclassProxy::new(advised)),
        }
    }
}

/// 为一次调用创建新的 MethodInvocation 并执行
fn dispatch(proxy: &dyn BeanObject, advised: &AdvisedSupport, method: &MethodMetadata, args: Arguments) -> MethodResult {
    let chain = advised.get_interceptors_and_dynamic_interception_advice(method.name());
    tracing::trace!(
        "Proxy call {}::{} through {} interceptor(s)",
        advised.target_class().name(),
        method.name(),
        chain.len()
    );
    MethodInvocation::new(
        proxy,
        advised.target(),
        advised.target_class(),
        method,
        args,
        chain,
    )
    .proceed()
}

fn no_such_method(class: &ClassMetadata, method: &str) -> anyhow::Error {
    AopError::NoSuchMethod {
        class: class.name().to_string(),
        method: method.to_string(),
    }
    .into()
}

/// 基于契约的代理
pub struct ContractProxy {
    advised: Arc<AdvisedSupport>,
}

impl ContractProxy {
    pub fn new(advised: Arc<AdvisedSupport>) -> Self {
        Self { advised }
    }

    /// 契约上声明的方法
    fn exposes(&self, method: &str) -> bool {
        self.advised
            .target_class()
            .contracts()
            .iter()
            .any(|contract| contract.declares(method))
    }
}

impl BeanObject for ContractProxy {
    fn class(&self) -> &Arc<ClassMetadata> {
        self.advised.target_class()
    }

    fn target(&self) -> &Instance {
        self.advised.target()
    }

    fn runtime_type(&self) -> String {
        let contracts: Vec<&str> = self
            .advised
            .target_class()
            .contracts()
            .iter()
            .map(|c| c.name())
            .collect();
        format!("$Proxy[{}]", contracts.join(", "))
    }

    fn is_proxy(&self) -> bool {
        true
    }

    fn invoke(&self, method: &str, args: Arguments) -> MethodResult {
        if is_object_method(method) {
            return invoke_object_method(self, method, &args);
        }
        let class = self.advised.target_class();
        if !self.exposes(method) {
            return Err(AopError::MethodNotExposed {
                class: class.name().to_string(),
                method: method.to_string(),
            }
            .into());
        }
        let metadata = class.method(method).ok_or_else(|| no_such_method(class, method))?;
        dispatch(self, &self.advised, metadata, args)
    }
}

impl AopProxy for ContractProxy {
    fn advised(&self) -> &Arc<AdvisedSupport> {
        &self.advised
    }

    fn get_proxy(self: Arc<Self>) -> BeanRef {
        self
    }
}

/// 基于子类的代理
pub struct SubclassProxy {
    advised: Arc<AdvisedSupport>,
}

impl SubclassProxy {
    pub fn new(advised: Arc<AdvisedSupport>) -> Self {
        Self { advised }
    }
}

impl BeanObject for SubclassProxy {
    fn class(&self) -> &Arc<ClassMetadata> {
        self.advised.target_class()
    }

    fn target(&self) -> &Instance {
        self.advised.target()
    }

    fn runtime_type(&self) -> String {
        format!("{}$$Proxy", self.advised.target_class().name())
    }

    fn is_proxy(&self) -> bool {
        true
    }

    fn invoke(&self, method: &str, args: Arguments) -> MethodResult {
        if is_object_method(method) {
            return invoke_object_method(self, method, &args);
        }
        let class = self.advised.target_class();
        let metadata = class.method(method).ok_or_else(|| no_such_method(class, method))?;
        if !metadata.overridable() {
            tracing::trace!("{}::{} cannot be overridden, calling target directly", class.name(), method);
            return metadata.invoke(self.advised.target().as_ref(), &args);
        }
        dispatch(self, &self.advised, metadata, args)
    }
}

impl AopProxy for SubclassProxy {
    fn advised(&self) -> &Arc<AdvisedSupport> {
        &self.advised
    }

    fn get_proxy(self: Arc<Self>) -> BeanRef {
        self
    }
}
