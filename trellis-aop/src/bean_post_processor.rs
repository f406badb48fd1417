//! AOP BeanPostProcessor - 为命中切点的 Bean 创建代理
//!
//! 每个新实例化的 Bean 都会经过这里：
//! 1. 没有配置 `pointCut` 时原样返回
//! 2. 用 AOP 配置和目标对象构建 `AdvisedSupport`
//! 3. 类未命中切点时原样返回，否则返回代理

use std::sync::Arc;

use once_cell::sync::OnceCell;
use trellis_core::prelude::*;

use crate::advised::AdvisedSupport;
use crate::config::AopConfig;
use crate::error::AopResult;
use crate::pointcut::Pointcut;
use crate::proxy::ProxyFactory;
use crate::registry::AspectRegistry;

/// 配置来源
enum ConfigSource {
    Environment(Arc<Environment>),
    Fixed(AopConfig),
}

type ResolvedConfig = Option<(Arc<AopConfig>, Arc<Pointcut>)>;

/// AOP BeanPostProcessor
///
/// 配置在第一次用到时解析，之后所有 Bean 共享同一份配置和编译好的切点。
///
/// ```ignore
/// use trellis_aop::AopBeanPostProcessor;
///
/// let processor = AopBeanPostProcessor::new(Arc::clone(context.environment()));
/// context.add_bean_post_processor(Arc::new(processor));
/// ```
pub struct AopBeanPostProcessor {
    aspects: Arc<AspectRegistry>,
    source: ConfigSource,
    resolved: OnceCell<ResolvedConfig>,
}

impl AopBeanPostProcessor {
    /// 从 Environment 读取配置，切面使用全局注册表
    pub fn new(environment: Arc<Environment>) -> Self {
        Self {
            aspects: Arc::clone(crate::get_global_registry()),
            source: ConfigSource::Environment(environment),
            resolved: OnceCell::new(),
        }
    }

    /// 使用固定的配置
    pub fn with_config(config: AopConfig) -> Self {
        Self {
            aspects: Arc::clone(crate::get_global_registry()),
            source: ConfigSource::Fixed(config),
            resolved: OnceCell::new(),
        }
    }

    /// 使用指定的切面注册表
    pub fn with_aspects(mut self, aspects: Arc<AspectRegistry>) -> Self {
        self.aspects = aspects;
        self
    }

    /// 解析配置并编译切点，只执行一次
    ///
    /// 返回 `None` 表示没有启用 AOP
    pub fn resolve_config(&self) -> AopResult<Option<&Arc<AopConfig>>> {
        let resolved = self.resolved.get_or_try_init(|| -> AopResult<ResolvedConfig> {
            let config = match &self.source {
                ConfigSource::Environment(environment) => AopConfig::from_environment(environment)?,
                ConfigSource::Fixed(config) => Some(config.clone()),
            };
            let Some(config) = config else {
                tracing::debug!("No pointcut configured, AOP proxying is disabled");
                return Ok(None);
            };
            let pointcut = Pointcut::parse(config.point_cut())?;
            tracing::info!(
                "AOP enabled: pointcut '{}' advised by '{}'",
                config.point_cut(),
                config.aspect_class()
            );
            Ok(Some((Arc::new(config), Arc::new(pointcut))))
        })?;
        Ok(resolved.as_ref().map(|(config, _)| config))
    }

    fn wrap_if_necessary(&self, bean: BeanRef, bean_name: &str) -> AopResult<BeanRef> {
        self.resolve_config()?;
        let Some(Some((config, pointcut))) = self.resolved.get() else {
            return Ok(bean);
        };

        let advised = AdvisedSupport::new(
            Arc::clone(config),
            Arc::clone(pointcut),
            &self.aspects,
            Arc::clone(bean.class()),
            Arc::clone(bean.target()),
        )?;
        if !advised.pointcut_match() {
            tracing::trace!("Bean '{}' does not match pointcut, skipping proxy", bean_name);
            return Ok(bean);
        }

        let proxy = ProxyFactory::create_aop_proxy(Arc::new(advised)).get_proxy();
        tracing::info!("Created AOP proxy for bean '{}': {}", bean_name, proxy.runtime_type());
        Ok(proxy)
    }
}

impl BeanPostProcessor for AopBeanPostProcessor {
    fn name(&self) -> &str {
        "AopBeanPostProcessor"
    }

    fn order(&self) -> i32 {
        2000
    }

    fn post_process_after_instantiation(
        &self,
        bean: BeanRef,
        bean_name: &str,
    ) -> ContainerResult<BeanRef> {
        self.wrap_if_necessary(bean, bean_name)
            .map_err(|e| ContainerError::PostProcessingFailed {
                processor: self.name().to_string(),
                name: bean_name.to_string(),
                source: e.into(),
            })
    }
}
