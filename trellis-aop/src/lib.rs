//! Trellis AOP - 面向切面编程支持
//!
//! 基于配置的单切面 AOP：
//! - 切点表达式匹配类名和方法签名
//! - 前置、返回后、异常三种通知，由同一个切面实例提供
//! - 契约代理（只暴露契约方法）和子类代理（final / 私有方法不拦截）
//! - 通过 BeanPostProcessor 在 Bean 实例化后替换为代理
//! - 通过 ApplicationPlugin 自动接入应用启动流程

pub mod advice;
pub mod advised;
pub mod aspect;
pub mod bean_post_processor;
pub mod config;
pub mod error;
pub mod error_info;
pub mod interceptor;
pub mod joinpoint;
pub mod plugin;
pub mod pointcut;
pub mod proxy;
pub mod registry;

#[cfg(test)]
mod testing;

// 重新导出核心类型
pub use advice::{
    advice_body, AdviceBody, AdviceContext, AdviceInvoker, AdviceKind, AdviceMethod, AdviceParam,
};
pub use advised::AdvisedSupport;
pub use aspect::{get_all_aspect_registrations, AspectBuilder, AspectMetadata, AspectRegistration};
pub use bean_post_processor::AopBeanPostProcessor;
pub use config::AopConfig;
pub use error::{AopError, AopResult};
pub use error_info::ErrorInfo;
pub use interceptor::{
    AfterReturningAdviceInterceptor, AfterThrowingAdviceInterceptor, MethodBeforeAdviceInterceptor,
    MethodInterceptor, MethodMatcher,
};
pub use joinpoint::{ChainElement, JoinPoint, MethodInvocation};
pub use plugin::AopPlugin;
pub use pointcut::Pointcut;
pub use proxy::{AopProxy, ContractProxy, ProxyFactory, ProxyStrategy, SubclassProxy};
pub use registry::{get_global_registry, AspectRegistry};

// 导出 inventory 供宏使用
pub use inventory;

/// 预导入模块
pub mod prelude {
    pub use crate::advice::{AdviceContext, AdviceKind, AdviceParam};
    pub use crate::aspect::{AspectBuilder, AspectMetadata};
    pub use crate::config::AopConfig;
    pub use crate::error::{AopError, AopResult};
    pub use crate::error_info::ErrorInfo;
    pub use crate::joinpoint::JoinPoint;
    pub use crate::plugin::AopPlugin;
    pub use crate::registry::{get_global_registry, AspectRegistry};
    pub use crate::submit_aspect;
}
