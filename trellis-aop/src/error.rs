//! AOP 模块错误类型
//!
//! 配置、切点解析、代理分派阶段的错误。目标方法和通知方法自身的失败
//! 仍然是 `anyhow::Error`，原样穿过拦截器链。

use thiserror::Error;

use crate::advice::AdviceKind;

#[derive(Debug, Error)]
pub enum AopError {
    #[error("Invalid pointcut expression '{expression}': {reason}")]
    InvalidPointcut { expression: String, reason: String },

    #[error("Missing AOP configuration property '{0}'")]
    MissingProperty(&'static str),

    #[error("Aspect '{0}' is not registered")]
    AspectNotFound(String),

    #[error("Aspect '{aspect}' has no advice method '{method}'")]
    AdviceMethodNotFound { aspect: String, method: String },

    #[error("Advice '{aspect}::{method}' cannot be used as {kind} advice: {reason}")]
    AdviceSignatureMismatch {
        aspect: String,
        method: String,
        kind: AdviceKind,
        reason: String,
    },

    #[error("Failed to instantiate aspect '{aspect}': {source}")]
    AspectCreationFailed {
        aspect: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Method '{method}' is not declared on any contract of '{class}'")]
    MethodNotExposed { class: String, method: String },

    #[error("No such method '{class}::{method}'")]
    NoSuchMethod { class: String, method: String },
}

pub type AopResult<T> = std::result::Result<T, AopError>;
