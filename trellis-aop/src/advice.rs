//! 通知（Advice）描述与调用
//!
//! 通知方法不靠参数个数猜测要传什么，而是通过 `AdviceParam` 显式声明需要
//! 连接点、返回值、失败中的哪几项。声明在构建代理配置时按通知类型校验。

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use trellis_core::{Instance, Value};

use crate::error::{AopError, AopResult};
use crate::joinpoint::JoinPoint;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceKind {
    /// 前置通知
    Before,
    /// 返回后通知
    AfterReturning,
    /// 异常通知
    AfterThrowing,
}

impl AdviceKind {
    /// 该类型的通知可以接收的参数
    pub fn allowed_params(&self) -> &'static [AdviceParam] {
        match self {
            AdviceKind::Before => &[AdviceParam::JoinPoint],
            AdviceKind::AfterReturning => &[AdviceParam::JoinPoint, AdviceParam::ReturnValue],
            AdviceKind::AfterThrowing => &[AdviceParam::JoinPoint, AdviceParam::Failure],
        }
    }
}

impl fmt::Display for AdviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdviceKind::Before => write!(f, "before"),
            AdviceKind::AfterReturning => write!(f, "after-returning"),
            AdviceKind::AfterThrowing => write!(f, "after-throwing"),
        }
    }
}

/// 通知方法声明的参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdviceParam {
    JoinPoint,
    ReturnValue,
    Failure,
}

/// 传给通知方法的上下文，只包含通知声明过的部分
pub struct AdviceContext<'a> {
    join_point: Option<&'a mut dyn JoinPoint>,
    return_value: Option<&'a Value>,
    failure: Option<&'a anyhow::Error>,
}

impl<'a> AdviceContext<'a> {
    pub fn join_point(&self) -> Option<&(dyn JoinPoint + 'a)> {
        self.join_point.as_deref()
    }

    pub fn join_point_mut(&mut self) -> Option<&mut (dyn JoinPoint + 'a)> {
        self.join_point.as_deref_mut()
    }

    /// 目标方法的返回值
    pub fn return_value<T: Any>(&self) -> Option<&T> {
        self.return_value?.downcast_ref::<T>()
    }

    pub fn raw_return_value(&self) -> Option<&Value> {
        self.return_value
    }

    /// 目标方法的失败（原样，可 `downcast_ref` 到原始错误类型）
    pub fn failure(&self) -> Option<&anyhow::Error> {
        self.failure
    }
}

/// 通知方法体：接收切面实例和上下文
pub type AdviceBody =
    Arc<dyn Fn(&(dyn Any + Send + Sync), &mut AdviceContext<'_>) -> anyhow::Result<()> + Send + Sync>;

/// 把闭包包装成通知方法体
pub fn advice_body<F>(body: F) -> AdviceBody
where
    F: Fn(&(dyn Any + Send + Sync), &mut AdviceContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(body)
}

/// 通知方法描述
#[derive(Clone)]
pub struct AdviceMethod {
    name: String,
    params: Vec<AdviceParam>,
    body: AdviceBody,
}

impl AdviceMethod {
    pub fn new(name: impl Into<String>, params: &[AdviceParam], body: AdviceBody) -> Self {
        Self {
            name: name.into(),
            params: params.to_vec(),
            body,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[AdviceParam] {
        &self.params
    }

    pub fn declares(&self, param: AdviceParam) -> bool {
        self.params.contains(&param)
    }

    /// 校验参数声明是否适用于给定的通知类型
    pub fn validate(&self, aspect: &str, kind: AdviceKind) -> AopResult<()> {
        let mismatch = |reason: String| AopError::AdviceSignatureMismatch {
            aspect: aspect.to_string(),
            method: self.name.clone(),
            kind,
            reason,
        };

        for (index, param) in self.params.iter().enumerate() {
            if !kind.allowed_params().contains(param) {
                return Err(mismatch(format!("parameter {:?} is not available", param)));
            }
            if self.params[..index].contains(param) {
                return Err(mismatch(format!("parameter {:?} declared twice", param)));
            }
        }
        Ok(())
    }
}

impl fmt::Debug for AdviceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdviceMethod")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish()
    }
}

/// 通知调用器：持有切面实例和一个通知方法
pub struct AdviceInvoker {
    aspect_name: String,
    aspect: Instance,
    method: AdviceMethod,
}

impl AdviceInvoker {
    pub fn new(aspect_name: impl Into<String>, aspect: Instance, method: AdviceMethod) -> Self {
        Self {
            aspect_name: aspect_name.into(),
            aspect,
            method,
        }
    }

    pub fn aspect_name(&self) -> &str {
        &self.aspect_name
    }

    pub fn method(&self) -> &AdviceMethod {
        &self.method
    }

    /// 按通知声明的参数组装上下文并调用通知方法
    ///
    /// 通知方法的失败原样返回给调用方。
    pub fn invoke_advice_method<'a>(
        &self,
        join_point: &'a mut (dyn JoinPoint + 'a),
        return_value: Option<&'a Value>,
        failure: Option<&'a anyhow::Error>,
    ) -> anyhow::Result<()> {
        let mut context = AdviceContext {
            join_point: if self.method.declares(AdviceParam::JoinPoint) {
                Some(join_point)
            } else {
                None
            },
            return_value: return_value.filter(|_| self.method.declares(AdviceParam::ReturnValue)),
            failure: failure.filter(|_| self.method.declares(AdviceParam::Failure)),
        };

        tracing::trace!("Invoking advice {}::{}", self.aspect_name, self.method.name);
        (self.method.body)(self.aspect.as_ref(), &mut context)
    }
}

impl fmt::Debug for AdviceInvoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.aspect_name, self.method.name)
    }
}
