//! 方法拦截器与三种通知适配器
//!
//! 适配器决定通知相对于目标调用的执行时机：前置、返回后、异常后。

use trellis_core::{ClassMetadata, MethodMetadata, MethodResult};

use crate::advice::AdviceInvoker;
use crate::error_info::ErrorInfo;
use crate::joinpoint::{JoinPoint, MethodInvocation};

/// 方法拦截器
///
/// 拦截器自己决定何时（以及是否）调用 `invocation.proceed()`。
pub trait MethodInterceptor: Send + Sync {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> MethodResult;

    fn name(&self) -> &str {
        "MethodInterceptor"
    }
}

/// 方法匹配器
///
/// 在拦截器链中只作为标记存在，执行时被跳过。
pub trait MethodMatcher: Send + Sync {
    fn matches(&self, method: &MethodMetadata, class: &ClassMetadata) -> bool;
}

/// 前置通知
///
/// 先执行通知，再继续调用链；通知失败时目标方法不会执行。
pub struct MethodBeforeAdviceInterceptor {
    advice: AdviceInvoker,
}

impl MethodBeforeAdviceInterceptor {
    pub fn new(advice: AdviceInvoker) -> Self {
        Self { advice }
    }
}

impl MethodInterceptor for MethodBeforeAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> MethodResult {
        self.advice.invoke_advice_method(invocation, None, None)?;
        invocation.proceed()
    }

    fn name(&self) -> &str {
        "MethodBeforeAdviceInterceptor"
    }
}

/// 返回后通知
///
/// 目标方法正常返回后执行通知，返回值不会被替换；目标方法失败时通知不执行。
pub struct AfterReturningAdviceInterceptor {
    advice: AdviceInvoker,
}

impl AfterReturningAdviceInterceptor {
    pub fn new(advice: AdviceInvoker) -> Self {
        Self { advice }
    }
}

impl MethodInterceptor for AfterReturningAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> MethodResult {
        let value = invocation.proceed()?;
        self.advice
            .invoke_advice_method(invocation, Some(&value), None)?;
        Ok(value)
    }

    fn name(&self) -> &str {
        "AfterReturningAdviceInterceptor"
    }
}

/// 异常通知
///
/// 目标方法失败时执行通知，然后原样返回原始失败；通知自身失败时以通知的失败为准。
pub struct AfterThrowingAdviceInterceptor {
    advice: AdviceInvoker,

    /// 配置的异常类型名，仅用于日志
    throwing_name: Option<String>,
}

impl AfterThrowingAdviceInterceptor {
    pub fn new(advice: AdviceInvoker) -> Self {
        Self {
            advice,
            throwing_name: None,
        }
    }

    pub fn with_throwing_name(mut self, name: impl Into<String>) -> Self {
        self.throwing_name = Some(name.into());
        self
    }

    pub fn throwing_name(&self) -> Option<&str> {
        self.throwing_name.as_deref()
    }
}

impl MethodInterceptor for AfterThrowingAdviceInterceptor {
    fn invoke(&self, invocation: &mut MethodInvocation<'_>) -> MethodResult {
        match invocation.proceed() {
            Ok(value) => Ok(value),
            Err(failure) => {
                tracing::debug!(
                    "{} failed ({}), expected type: {}",
                    invocation.signature(),
                    ErrorInfo::from_anyhow(&failure).summary(),
                    self.throwing_name.as_deref().unwrap_or("any")
                );
                self.advice
                    .invoke_advice_method(invocation, None, Some(&failure))?;
                Err(failure)
            }
        }
    }

    fn name(&self) -> &str {
        "AfterThrowingAdviceInterceptor"
    }
}
