//! 切面注册表
//!
//! 按切面类名保存 `AspectMetadata`，配置项 `aspectClass` 在这里查找

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::aspect::{get_all_aspect_registrations, AspectMetadata};
use crate::error::{AopError, AopResult};

/// 全局切面注册表
///
/// 首次访问时加载所有通过 `submit_aspect!` 提交的切面
static GLOBAL_ASPECT_REGISTRY: Lazy<Arc<AspectRegistry>> =
    Lazy::new(|| Arc::new(AspectRegistry::scan()));

/// 获取全局切面注册表
pub fn get_global_registry() -> &'static Arc<AspectRegistry> {
    &GLOBAL_ASPECT_REGISTRY
}

/// 切面注册表
#[derive(Debug, Default)]
pub struct AspectRegistry {
    aspects: HashMap<String, Arc<AspectMetadata>>,
}

impl AspectRegistry {
    /// 创建新的切面注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册切面，同名切面以后注册的为准
    pub fn register(&mut self, aspect: AspectMetadata) {
        tracing::debug!("Registering aspect: {}", aspect.name());
        if let Some(previous) = self.aspects.insert(aspect.name().to_string(), Arc::new(aspect)) {
            tracing::warn!("Aspect '{}' registered twice, keeping the latest", previous.name());
        }
    }

    /// 批量注册切面
    pub fn register_all(&mut self, aspects: impl IntoIterator<Item = AspectMetadata>) {
        for aspect in aspects {
            self.register(aspect);
        }
    }

    /// 构建器风格的批量注册
    pub fn with_aspects(mut self, aspects: impl IntoIterator<Item = AspectMetadata>) -> Self {
        self.register_all(aspects);
        self
    }

    /// 加载所有通过 inventory 注册的切面
    pub fn scan() -> Self {
        let mut registry = Self::new();
        registry.register_all(get_all_aspect_registrations().map(|r| (r.create)()));
        tracing::debug!("Loaded {} aspect(s) from inventory", registry.len());
        registry
    }

    pub fn get(&self, name: &str) -> Option<Arc<AspectMetadata>> {
        self.aspects.get(name).cloned()
    }

    /// 查找切面，找不到时报错
    pub fn require(&self, name: &str) -> AopResult<Arc<AspectMetadata>> {
        self.get(name)
            .ok_or_else(|| AopError::AspectNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.aspects.contains_key(name)
    }

    /// 所有切面名称（排序后）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.aspects.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.aspects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::AspectBuilder;
    use crate::testing::{log_aspect, LOG_ASPECT};
    use crate::submit_aspect;

    #[derive(Default)]
    struct Metrics;

    fn metrics_aspect() -> AspectMetadata {
        AspectBuilder::<Metrics>::named("registry_fixture::MetricsAspect")
            .default_constructor()
            .build()
    }

    submit_aspect!(metrics_aspect);

    #[test]
    fn test_register_and_require() {
        let registry = AspectRegistry::new().with_aspects(vec![log_aspect(Default::default())]);
        assert!(registry.contains(LOG_ASPECT));
        assert_eq!(registry.require(LOG_ASPECT).unwrap().name(), LOG_ASPECT);
        assert!(matches!(
            registry.require("demo::aspect::Missing"),
            Err(AopError::AspectNotFound(name)) if name == "demo::aspect::Missing"
        ));
    }

    #[test]
    fn test_scan_collects_submitted_aspects() {
        let registry = AspectRegistry::scan();
        assert!(registry.contains("registry_fixture::MetricsAspect"));
        assert!(get_global_registry().contains("registry_fixture::MetricsAspect"));
    }
}
