//! AOP 配置
//!
//! 从 Environment 读取切点表达式、切面类和各通知方法名。每次容器刷新构建一次，
//! 之后以 `Arc` 在所有代理之间共享。

use trellis_core::constants::{
    ASPECT_AFTER_KEY, ASPECT_AFTER_THROWING_NAME_KEY, ASPECT_AFTER_THROW_KEY, ASPECT_BEFORE_KEY,
    ASPECT_CLASS_KEY, POINT_CUT_KEY,
};
use trellis_core::Environment;

use crate::error::{AopError, AopResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AopConfig {
    /// 切点表达式
    point_cut: String,

    /// 切面类
    aspect_class: String,

    /// 前置通知方法
    aspect_before: Option<String>,

    /// 返回后通知方法
    aspect_after: Option<String>,

    /// 异常通知方法
    aspect_after_throw: Option<String>,

    /// 异常类型名
    aspect_after_throwing_name: Option<String>,
}

impl AopConfig {
    pub fn new(point_cut: impl Into<String>, aspect_class: impl Into<String>) -> Self {
        Self {
            point_cut: point_cut.into(),
            aspect_class: aspect_class.into(),
            aspect_before: None,
            aspect_after: None,
            aspect_after_throw: None,
            aspect_after_throwing_name: None,
        }
    }

    pub fn with_before(mut self, method: impl Into<String>) -> Self {
        self.aspect_before = Some(method.into());
        self
    }

    pub fn with_after(mut self, method: impl Into<String>) -> Self {
        self.aspect_after = Some(method.into());
        self
    }

    pub fn with_after_throw(mut self, method: impl Into<String>) -> Self {
        self.aspect_after_throw = Some(method.into());
        self
    }

    pub fn with_after_throwing_name(mut self, name: impl Into<String>) -> Self {
        self.aspect_after_throwing_name = Some(name.into());
        self
    }

    /// 从 Environment 读取配置
    ///
    /// 没有配置 `pointCut` 时返回 `None`（不启用 AOP）；配置了切点却没有切面类时报错。
    pub fn from_environment(environment: &Environment) -> AopResult<Option<Self>> {
        let Some(point_cut) = environment.get_string(POINT_CUT_KEY) else {
            return Ok(None);
        };
        let aspect_class = environment
            .get_string(ASPECT_CLASS_KEY)
            .ok_or(AopError::MissingProperty(ASPECT_CLASS_KEY))?;

        Ok(Some(Self {
            point_cut,
            aspect_class,
            aspect_before: environment.get_string(ASPECT_BEFORE_KEY),
            aspect_after: environment.get_string(ASPECT_AFTER_KEY),
            aspect_after_throw: environment.get_string(ASPECT_AFTER_THROW_KEY),
            aspect_after_throwing_name: environment.get_string(ASPECT_AFTER_THROWING_NAME_KEY),
        }))
    }

    pub fn point_cut(&self) -> &str {
        &self.point_cut
    }

    pub fn aspect_class(&self) -> &str {
        &self.aspect_class
    }

    pub fn aspect_before(&self) -> Option<&str> {
        self.aspect_before.as_deref()
    }

    pub fn aspect_after(&self) -> Option<&str> {
        self.aspect_after.as_deref()
    }

    pub fn aspect_after_throw(&self) -> Option<&str> {
        self.aspect_after_throw.as_deref()
    }

    pub fn aspect_after_throwing_name(&self) -> Option<&str> {
        self.aspect_after_throwing_name.as_deref()
    }
}
