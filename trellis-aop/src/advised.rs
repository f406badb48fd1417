//! 代理配置（AdvisedSupport）
//!
//! AOP 配置 + 一个具体的目标对象。切点判定在构建时完成且只做一次；
//! 命中时为每个命中方法签名的方法预先组装好拦截器链。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use trellis_core::{ClassMetadata, Instance};

use crate::advice::{AdviceInvoker, AdviceKind};
use crate::aspect::AspectMetadata;
use crate::config::AopConfig;
use crate::error::AopResult;
use crate::interceptor::{
    AfterReturningAdviceInterceptor, AfterThrowingAdviceInterceptor, MethodBeforeAdviceInterceptor,
    MethodInterceptor,
};
use crate::joinpoint::ChainElement;
use crate::pointcut::Pointcut;
use crate::registry::AspectRegistry;

pub struct AdvisedSupport {
    config: Arc<AopConfig>,
    pointcut: Arc<Pointcut>,
    target_class: Arc<ClassMetadata>,
    target: Instance,
    matched: bool,

    /// 方法名 -> 拦截器链，只有命中的方法才有
    method_cache: HashMap<String, Arc<[ChainElement]>>,
}

impl AdvisedSupport {
    /// 构建代理配置
    ///
    /// 类未命中切点时不会创建切面实例，也不组装拦截器链。
    pub fn new(
        config: Arc<AopConfig>,
        pointcut: Arc<Pointcut>,
        aspects: &AspectRegistry,
        target_class: Arc<ClassMetadata>,
        target: Instance,
    ) -> AopResult<Self> {
        let matched = pointcut.matches_class(target_class.name());
        let mut advised = Self {
            config,
            pointcut,
            target_class,
            target,
            matched,
            method_cache: HashMap::new(),
        };
        if matched {
            advised.parse(aspects)?;
        }
        Ok(advised)
    }

    fn parse(&mut self, aspects: &AspectRegistry) -> AopResult<()> {
        let aspect = aspects.require(self.config.aspect_class())?;
        let interceptors = self.build_interceptors(&aspect)?;

        for method in self.target_class.methods() {
            let signature = method.signature(self.target_class.name());
            if !self.pointcut.matches_method(&signature) {
                continue;
            }
            tracing::trace!("Advising {}", signature);
            let chain: Vec<ChainElement> = interceptors
                .iter()
                .map(|i| ChainElement::Interceptor(Arc::clone(i)))
                .collect();
            self.method_cache.insert(method.name().to_string(), Arc::from(chain));
        }

        tracing::debug!(
            "Class '{}' matched pointcut '{}', {} method(s) advised",
            self.target_class.name(),
            self.pointcut.expression(),
            self.method_cache.len()
        );
        Ok(())
    }

    /// 按 before / afterReturning / afterThrowing 的顺序创建拦截器，共享同一个切面实例
    fn build_interceptors(&self, aspect: &AspectMetadata) -> AopResult<Vec<Arc<dyn MethodInterceptor>>> {
        let instance = aspect.instantiate()?;
        let invoker = |method: &str, kind: AdviceKind| -> AopResult<AdviceInvoker> {
            let advice = aspect.require_advice(method)?;
            advice.validate(aspect.name(), kind)?;
            Ok(AdviceInvoker::new(aspect.name(), Arc::clone(&instance), advice.clone()))
        };

        let mut interceptors: Vec<Arc<dyn MethodInterceptor>> = Vec::new();
        if let Some(method) = self.config.aspect_before() {
            interceptors.push(Arc::new(MethodBeforeAdviceInterceptor::new(invoker(
                method,
                AdviceKind::Before,
            )?)));
        }
        if let Some(method) = self.config.aspect_after() {
            interceptors.push(Arc::new(AfterReturningAdviceInterceptor::new(invoker(
                method,
                AdviceKind::AfterReturning,
            )?)));
        }
        if let Some(method) = self.config.aspect_after_throw() {
            let mut interceptor =
                AfterThrowingAdviceInterceptor::new(invoker(method, AdviceKind::AfterThrowing)?);
            if let Some(name) = self.config.aspect_after_throwing_name() {
                interceptor = interceptor.with_throwing_name(name);
            }
            interceptors.push(Arc::new(interceptor));
        }
        Ok(interceptors)
    }

    /// 目标类是否命中切点（构建时已确定）
    pub fn pointcut_match(&self) -> bool {
        self.matched
    }

    /// 获取方法的拦截器链，未命中的方法返回空链
    pub fn get_interceptors_and_dynamic_interception_advice(&self, method: &str) -> Arc<[ChainElement]> {
        self.method_cache
            .get(method)
            .cloned()
            .unwrap_or_else(|| Arc::from(Vec::new()))
    }

    pub fn config(&self) -> &Arc<AopConfig> {
        &self.config
    }

    pub fn target_class(&self) -> &Arc<ClassMetadata> {
        &self.target_class
    }

    pub fn target(&self) -> &Instance {
        &self.target
    }

    /// 已组装拦截器链的方法名
    pub fn advised_methods(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.method_cache.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for AdvisedSupport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisedSupport")
            .field("target_class", &self.target_class.name())
            .field("pointcut", &self.pointcut.expression())
            .field("matched", &self.matched)
            .field("advised_methods", &self.advised_methods())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AopError;
    use crate::testing::{calculator_class, log_aspect, Calculator, LOG_ASPECT};

    fn advised(config: AopConfig, aspects: &AspectRegistry) -> AopResult<AdvisedSupport> {
        let pointcut = Arc::new(Pointcut::parse(config.point_cut()).unwrap());
        AdvisedSupport::new(
            Arc::new(config),
            pointcut,
            aspects,
            Arc::new(calculator_class()),
            Arc::new(Calculator::default()),
        )
    }

    fn aspects() -> AspectRegistry {
        AspectRegistry::new().with_aspects(vec![log_aspect(Default::default())])
    }

    #[test]
    fn test_matched_class_builds_chains_for_matching_methods() {
        let config = AopConfig::new("pub i32 demo::service::Calculator::.*(..)", LOG_ASPECT)
            .with_before("before")
            .with_after("afterReturning")
            .with_after_throw("afterThrowing");
        let advised = advised(config, &aspects()).unwrap();

        assert!(advised.pointcut_match());
        assert_eq!(advised.advised_methods(), vec!["add", "divide"]);
        assert_eq!(advised.get_interceptors_and_dynamic_interception_advice("add").len(), 3);
        assert!(advised
            .get_interceptors_and_dynamic_interception_advice("version")
            .is_empty());
    }

    #[test]
    fn test_unmatched_class_skips_aspect_resolution() {
        let config = AopConfig::new("pub .* demo::web::.*::.*(..)", "demo::aspect::Missing")
            .with_before("before");
        let advised = advised(config, &AspectRegistry::new()).unwrap();
        assert!(!advised.pointcut_match());
        assert!(advised.advised_methods().is_empty());
    }

    #[test]
    fn test_configuration_errors() {
        let missing_aspect = AopConfig::new("pub .* demo::service::.*::.*(..)", "demo::aspect::Missing");
        assert!(matches!(
            advised(missing_aspect, &aspects()),
            Err(AopError::AspectNotFound(_))
        ));

        let missing_method = AopConfig::new("pub .* demo::service::.*::.*(..)", LOG_ASPECT)
            .with_before("nope");
        assert!(matches!(
            advised(missing_method, &aspects()),
            Err(AopError::AdviceMethodNotFound { .. })
        ));

        let wrong_kind = AopConfig::new("pub .* demo::service::.*::.*(..)", LOG_ASPECT)
            .with_before("misplaced");
        assert!(matches!(
            advised(wrong_kind, &aspects()),
            Err(AopError::AdviceSignatureMismatch { kind: AdviceKind::Before, .. })
        ));
    }
}
