//! 切面（Aspect）定义
//!
//! 切面是横切关注点的模块化：一个可实例化的类型加上一组具名的通知方法。
//! 配置中的 `aspectBefore` / `aspectAfter` / `aspectAfterThrow` 通过名字引用这些方法。

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use trellis_core::Instance;

use crate::advice::{advice_body, AdviceContext, AdviceMethod, AdviceParam};
use crate::error::{AopError, AopResult};

type AspectConstructor = Arc<dyn Fn() -> anyhow::Result<Instance> + Send + Sync>;

/// 切面元数据
#[derive(Clone)]
pub struct AspectMetadata {
    name: String,
    constructor: Option<AspectConstructor>,
    advices: Vec<AdviceMethod>,
}

impl AspectMetadata {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn advices(&self) -> &[AdviceMethod] {
        &self.advices
    }

    pub fn advice(&self, method: &str) -> Option<&AdviceMethod> {
        self.advices.iter().find(|a| a.name() == method)
    }

    /// 按名称查找通知方法，找不到时报错
    pub fn require_advice(&self, method: &str) -> AopResult<&AdviceMethod> {
        self.advice(method).ok_or_else(|| AopError::AdviceMethodNotFound {
            aspect: self.name.clone(),
            method: method.to_string(),
        })
    }

    /// 创建切面实例
    pub fn instantiate(&self) -> AopResult<Instance> {
        let constructor = self.constructor.as_ref().ok_or_else(|| AopError::AspectCreationFailed {
            aspect: self.name.clone(),
            source: anyhow::anyhow!("aspect has no constructor"),
        })?;
        constructor().map_err(|source| AopError::AspectCreationFailed {
            aspect: self.name.clone(),
            source,
        })
    }
}

impl fmt::Debug for AspectMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AspectMetadata")
            .field("name", &self.name)
            .field("advices", &self.advices)
            .finish()
    }
}

/// 切面构建器
pub struct AspectBuilder<T> {
    metadata: AspectMetadata,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> AspectBuilder<T> {
    /// 以 Rust 类型名作为切面名
    pub fn new() -> Self {
        Self::named(type_name::<T>())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            metadata: AspectMetadata {
                name: name.into(),
                constructor: None,
                advices: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.metadata.constructor = Some(Arc::new(move || {
            let aspect = constructor()?;
            Ok(Arc::new(aspect) as Instance)
        }));
        self
    }

    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(|| Ok(T::default()))
    }

    /// 注册通知方法，`params` 声明它需要的上下文
    pub fn advice<F>(mut self, name: &str, params: &[AdviceParam], body: F) -> Self
    where
        F: Fn(&T, &mut AdviceContext<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let aspect_name = self.metadata.name.clone();
        let method = AdviceMethod::new(
            name,
            params,
            advice_body(move |aspect, context| {
                let aspect = aspect.downcast_ref::<T>().ok_or_else(|| {
                    anyhow::anyhow!("Aspect instance is not of type '{}'", aspect_name)
                })?;
                body(aspect, context)
            }),
        );
        self.metadata.advices.retain(|a| a.name() != name);
        self.metadata.advices.push(method);
        self
    }

    pub fn build(self) -> AspectMetadata {
        self.metadata
    }
}

impl<T: Any + Send + Sync> Default for AspectBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 切面注册器
///
/// 用于 inventory 自动收集切面
pub struct AspectRegistration {
    pub create: fn() -> AspectMetadata,
}

inventory::collect!(AspectRegistration);

/// 注册切面到全局清单
#[macro_export]
macro_rules! submit_aspect {
    ($create:expr) => {
        $crate::inventory::submit! {
            $crate::AspectRegistration { create: $create }
        }
    };
}

/// 获取所有注册的切面
pub fn get_all_aspect_registrations() -> impl Iterator<Item = &'static AspectRegistration> {
    inventory::iter::<AspectRegistration>.into_iter()
}
