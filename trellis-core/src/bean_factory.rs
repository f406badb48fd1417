//! Bean Factory - 核心容器接口
//!
//! 参考 Spring 的 BeanFactory 架构设计

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::bean::{BeanDefinition, BeanRef, BeanWrapper, PlainBean};
use crate::bean_post_processor::BeanPostProcessor;
use crate::class::type_key;
use crate::error::{ContainerError, ContainerResult};
use crate::registry::TypeRegistry;
use crate::utils::dependency::{
    topological_sort, validate_dependency_graph, DependencyValidationError,
};

/// BeanFactory - 最基础的容器接口
///
/// 不包含泛型方法，可以作为 trait object 使用
pub trait BeanFactory: Send + Sync {
    /// 通过名称（Bean 名或全限定类名）获取 Bean
    fn get_bean(&self, name: &str) -> ContainerResult<BeanRef>;

    /// 检查是否包含指定名称的 Bean 定义
    fn contains_bean(&self, name: &str) -> bool;
}

/// BeanFactoryExt - BeanFactory 的泛型扩展
pub trait BeanFactoryExt: BeanFactory {
    /// 以类型名作为 Bean 名获取 Bean，`dyn Trait` 按契约名查找
    fn get_bean_by_type<T: ?Sized + 'static>(&self) -> ContainerResult<BeanRef> {
        self.get_bean(type_key::<T>())
    }
}

impl<F: BeanFactory + ?Sized> BeanFactoryExt for F {}

/// ListableBeanFactory - 可列举的 Bean 工厂
pub trait ListableBeanFactory: BeanFactory {
    /// 按注册顺序返回所有 Bean 定义名称
    fn get_bean_definition_names(&self) -> Vec<String>;

    /// 获取 Bean 定义的数量
    fn get_bean_definition_count(&self) -> usize;
}

/// ConfigurableBeanFactory - 可配置的 Bean 工厂
pub trait ConfigurableBeanFactory: BeanFactory {
    /// 批量注册 Bean 定义，任何一个名称冲突则整批都不注册
    fn register_bean_definitions(&self, definitions: Vec<BeanDefinition>) -> ContainerResult<()>;

    /// 注册单个 Bean 定义
    fn register_bean_definition(&self, definition: BeanDefinition) -> ContainerResult<()> {
        self.register_bean_definitions(vec![definition])
    }

    /// 获取单个 Bean 定义
    fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition>;

    /// 添加 BeanPostProcessor
    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>);

    /// 获取所有 BeanPostProcessor
    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>>;
}

/// ConfigurableListableBeanFactory - 可配置且可列举的 Bean 工厂
pub trait ConfigurableListableBeanFactory: ListableBeanFactory + ConfigurableBeanFactory {
    /// 按注册顺序预实例化所有非延迟单例，失败的 Bean 汇总后一起报告
    fn preinstantiate_singletons(&self) -> ContainerResult<()>;

    /// 按依赖顺序预实例化单例，循环依赖和缺失依赖直接报错
    fn preinstantiate_singletons_in_dependency_order(&self) -> ContainerResult<()>;

    /// 清空单例缓存
    fn destroy_singletons(&self) -> ContainerResult<()>;

    /// Bean 名称 -> 其字段依赖的 Bean 名称
    fn get_dependency_graph(&self) -> HashMap<String, Vec<String>>;
}

/// 按注册顺序保存的 Bean 定义表
#[derive(Debug, Default)]
struct DefinitionTable {
    order: Vec<String>,
    by_name: HashMap<String, BeanDefinition>,
}

impl DefinitionTable {
    fn iter(&self) -> impl Iterator<Item = &BeanDefinition> {
        self.order.iter().filter_map(|name| self.by_name.get(name))
    }

    /// 先按 Bean 名查找，找不到时按全限定类名查找第一个匹配的定义
    fn resolve(&self, name: &str) -> Option<&BeanDefinition> {
        self.by_name
            .get(name)
            .or_else(|| self.iter().find(|d| d.bean_class_name == name))
    }
}

/// DefaultListableBeanFactory - ConfigurableListableBeanFactory 的默认实现
pub struct DefaultListableBeanFactory {
    /// 类型元数据来源
    type_registry: Arc<TypeRegistry>,

    /// Bean 定义存储
    definitions: RwLock<DefinitionTable>,

    /// 单例缓存，同一个 Bean 以 Bean 名和全限定类名各存一份
    singletons: RwLock<HashMap<String, BeanWrapper>>,

    /// Bean 后置处理器列表（按 order 排序）
    bean_post_processors: RwLock<Vec<Arc<dyn BeanPostProcessor>>>,
}

impl DefaultListableBeanFactory {
    /// 创建新的 Bean 工厂
    pub fn new(type_registry: Arc<TypeRegistry>) -> Self {
        Self {
            type_registry,
            definitions: RwLock::new(DefinitionTable::default()),
            singletons: RwLock::new(HashMap::new()),
            bean_post_processors: RwLock::new(Vec::new()),
        }
    }

    pub fn type_registry(&self) -> &Arc<TypeRegistry> {
        &self.type_registry
    }

    /// 只查单例缓存，不会触发创建
    pub fn get_singleton(&self, name: &str) -> Option<BeanRef> {
        self.singletons
            .read()
            .get(name)
            .map(|wrapper| Arc::clone(wrapper.wrapped_instance()))
    }

    pub fn contains_singleton(&self, name: &str) -> bool {
        self.singletons.read().contains_key(name)
    }

    /// 单例缓存中的键数量（每个 Bean 至少占两个键）
    pub fn singleton_count(&self) -> usize {
        self.singletons.read().len()
    }

    /// 单例缓存中的包装器，可用于查看运行时类型
    pub fn get_bean_wrapper(&self, name: &str) -> Option<BeanWrapper> {
        self.singletons.read().get(name).cloned()
    }

    fn resolve_definition(&self, name: &str) -> ContainerResult<BeanDefinition> {
        self.definitions.read().resolve(name).cloned().ok_or_else(|| {
            tracing::debug!("Bean '{}' not found in container", name);
            ContainerError::BeanNotFound(name.to_string())
        })
    }

    /// 实例化原始对象并依次应用后置处理器
    fn create_bean(&self, definition: &BeanDefinition) -> ContainerResult<BeanRef> {
        let name = &definition.factory_bean_name;
        let class = self
            .type_registry
            .get(&definition.bean_class_name)
            .ok_or_else(|| ContainerError::ClassNotFound(definition.bean_class_name.clone()))?;

        let instance = class
            .instantiate()
            .map_err(|source| ContainerError::BeanCreationFailed {
                name: name.clone(),
                source,
            })?;

        let mut bean: BeanRef = Arc::new(PlainBean::new(class, instance));

        let processors = self.bean_post_processors.read();
        for processor in processors.iter() {
            bean = processor.post_process_after_instantiation(bean, name)?;
            tracing::trace!(
                "Post processor '{}' applied to '{}' ({})",
                processor.name(),
                name,
                bean.runtime_type()
            );
        }

        Ok(bean)
    }

    /// 字段注入：只从单例缓存中取依赖，取不到时跳过
    fn populate_bean(&self, name: &str, bean: &BeanRef) {
        let class = Arc::clone(bean.class());
        let target = bean.target();

        for field in class.fields() {
            let dependency = field.dependency_name();
            match self.get_singleton(dependency) {
                Some(value) => {
                    if field.inject(target.as_ref(), value) {
                        tracing::debug!(
                            "Injected '{}' into field '{}' of bean '{}'",
                            dependency,
                            field.name(),
                            name
                        );
                    }
                }
                None => {
                    tracing::debug!(
                        "Dependency '{}' of field '{}' on bean '{}' is not instantiated yet, skipping injection",
                        dependency,
                        field.name(),
                        name
                    );
                }
            }
        }
    }

    /// 依次创建给定的 Bean，收集所有失败
    fn instantiate_all(&self, names: Vec<String>) -> ContainerResult<()> {
        let mut failures = Vec::new();

        for name in names {
            if let Err(e) = self.get_bean(&name) {
                tracing::error!("Failed to pre-instantiate bean '{}': {}", name, e);
                failures.push(format!("{}: {}", name, e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ContainerError::StartupFailed(failures))
        }
    }
}

fn dependency_error(error: DependencyValidationError) -> ContainerError {
    match error {
        DependencyValidationError::CircularDependency { cycle } => {
            ContainerError::CircularDependency(cycle.join(" -> "))
        }
        missing @ DependencyValidationError::MissingDependency { .. } => {
            ContainerError::DependencyValidationFailed(missing.to_string())
        }
    }
}

impl BeanFactory for DefaultListableBeanFactory {
    fn get_bean(&self, name: &str) -> ContainerResult<BeanRef> {
        tracing::trace!("Requesting bean: '{}'", name);

        if let Some(bean) = self.get_singleton(name) {
            tracing::debug!("Returning cached instance of singleton bean '{}'", name);
            return Ok(bean);
        }

        let definition = self.resolve_definition(name)?;
        let class_name = definition.bean_class_name.as_str();

        // 同一个类已经实例化过（例如通过另一个契约名），复用同一个实例
        if let Some(existing) = self.get_singleton(class_name) {
            tracing::debug!("Aliasing bean '{}' to existing instance of '{}'", name, class_name);
            let mut singletons = self.singletons.write();
            for key in [name, definition.factory_bean_name.as_str()] {
                singletons
                    .entry(key.to_string())
                    .or_insert_with(|| BeanWrapper::new(Arc::clone(&existing)));
            }
            return Ok(existing);
        }

        tracing::info!("Creating shared instance of singleton bean '{}'", name);
        let created = self.create_bean(&definition)?;

        // 并发创建时先写入的实例胜出
        let (bean, inserted) = {
            let mut singletons = self.singletons.write();
            let winner = singletons
                .get(class_name)
                .map(|wrapper| Arc::clone(wrapper.wrapped_instance()));
            let (bean, inserted) = match winner {
                Some(winner) => (winner, false),
                None => {
                    singletons.insert(class_name.to_string(), BeanWrapper::new(Arc::clone(&created)));
                    (created, true)
                }
            };
            for key in [name, definition.factory_bean_name.as_str()] {
                singletons
                    .entry(key.to_string())
                    .or_insert_with(|| BeanWrapper::new(Arc::clone(&bean)));
            }
            (bean, inserted)
        };

        if inserted {
            self.populate_bean(&definition.factory_bean_name, &bean);
            tracing::debug!(
                "Singleton bean '{}' created and cached as {}",
                definition.factory_bean_name,
                bean.runtime_type()
            );
        }

        Ok(bean)
    }

    fn contains_bean(&self, name: &str) -> bool {
        self.definitions.read().resolve(name).is_some()
    }
}

impl ListableBeanFactory for DefaultListableBeanFactory {
    fn get_bean_definition_names(&self) -> Vec<String> {
        self.definitions.read().order.clone()
    }

    fn get_bean_definition_count(&self) -> usize {
        self.definitions.read().order.len()
    }
}

impl ConfigurableBeanFactory for DefaultListableBeanFactory {
    fn register_bean_definitions(&self, definitions: Vec<BeanDefinition>) -> ContainerResult<()> {
        let mut table = self.definitions.write();

        let mut batch = HashSet::new();
        for definition in &definitions {
            let name = definition.factory_bean_name.as_str();
            if table.by_name.contains_key(name) || !batch.insert(name) {
                tracing::warn!(
                    "Bean '{}' already exists, none of the {} definition(s) in this batch were registered",
                    name,
                    definitions.len()
                );
                return Err(ContainerError::BeanAlreadyExists(name.to_string()));
            }
        }

        for definition in definitions {
            tracing::debug!(
                "Registering bean definition '{}' -> '{}'",
                definition.factory_bean_name,
                definition.bean_class_name
            );
            table.order.push(definition.factory_bean_name.clone());
            table
                .by_name
                .insert(definition.factory_bean_name.clone(), definition);
        }

        Ok(())
    }

    fn get_bean_definition(&self, name: &str) -> ContainerResult<BeanDefinition> {
        self.definitions
            .read()
            .by_name
            .get(name)
            .cloned()
            .ok_or_else(|| ContainerError::BeanNotFound(name.to_string()))
    }

    fn add_bean_post_processor(&self, processor: Arc<dyn BeanPostProcessor>) {
        tracing::debug!("Adding bean post processor '{}'", processor.name());
        let mut processors = self.bean_post_processors.write();
        processors.push(processor);
        processors.sort_by_key(|p| p.order());
    }

    fn get_bean_post_processors(&self) -> Vec<Arc<dyn BeanPostProcessor>> {
        self.bean_post_processors.read().clone()
    }
}

impl ConfigurableListableBeanFactory for DefaultListableBeanFactory {
    fn preinstantiate_singletons(&self) -> ContainerResult<()> {
        let names: Vec<String> = self
            .definitions
            .read()
            .iter()
            .filter(|d| !d.lazy_init)
            .map(|d| d.factory_bean_name.clone())
            .collect();

        tracing::debug!("Pre-instantiating {} singleton bean(s)", names.len());
        self.instantiate_all(names)
    }

    fn preinstantiate_singletons_in_dependency_order(&self) -> ContainerResult<()> {
        let (order, lazy): (Vec<String>, HashSet<String>) = {
            let table = self.definitions.read();
            let lazy = table
                .iter()
                .filter(|d| d.lazy_init)
                .map(|d| d.factory_bean_name.clone())
                .collect();
            (table.order.clone(), lazy)
        };
        let graph = self.get_dependency_graph();

        validate_dependency_graph(&order, &graph).map_err(dependency_error)?;
        let sorted = topological_sort(&order, &graph).map_err(dependency_error)?;

        let required: HashSet<&String> = graph.values().flatten().collect();
        let names: Vec<String> = sorted
            .into_iter()
            .filter(|name| !lazy.contains(name) || required.contains(name))
            .collect();

        tracing::debug!(
            "Pre-instantiating {} singleton bean(s) in dependency order",
            names.len()
        );
        self.instantiate_all(names)
    }

    fn destroy_singletons(&self) -> ContainerResult<()> {
        let count = {
            let mut singletons = self.singletons.write();
            let count = singletons.len();
            singletons.clear();
            count
        };
        tracing::info!("Destroyed singleton cache ({} entries)", count);
        Ok(())
    }

    fn get_dependency_graph(&self) -> HashMap<String, Vec<String>> {
        let table = self.definitions.read();
        table
            .iter()
            .map(|definition| {
                let dependencies = self
                    .type_registry
                    .get(&definition.bean_class_name)
                    .map(|class| {
                        class
                            .fields()
                            .iter()
                            .map(|field| {
                                let dependency = field.dependency_name();
                                table
                                    .resolve(dependency)
                                    .map(|d| d.factory_bean_name.clone())
                                    .unwrap_or_else(|| dependency.to_string())
                            })
                            .collect::<Vec<String>>()
                    })
                    .unwrap_or_default();
                (definition.factory_bean_name.clone(), dependencies)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bean::Autowired;
    use crate::class::ClassMetadata;
    use crate::reader::BeanDefinitionReader;
    use crate::{args, ClassBuilder};
    use parking_lot::Mutex;

    struct Repository;

    #[derive(Default)]
    struct Service {
        repository: Autowired,
    }

    #[derive(Default)]
    struct Loop {
        other: Autowired,
    }

    fn repository_class() -> ClassMetadata {
        ClassBuilder::<Repository>::named("shop::Repository")
            .component()
            .constructor(|| Ok(Repository))
            .implements("shop::Store", &["find"])
            .method0("find", |_r: &Repository| Ok("item".to_string()))
            .build()
    }

    fn service_class() -> ClassMetadata {
        ClassBuilder::<Service>::named("shop::Service")
            .component()
            .default_constructor()
            .autowired("repository", "shop::Repository", |s: &Service| &s.repository)
            .method0("lookup", |s: &Service| {
                s.repository.require()?.call::<String>("find", args![])
            })
            .build()
    }

    fn factory(classes: Vec<ClassMetadata>) -> DefaultListableBeanFactory {
        let registry = Arc::new(TypeRegistry::new().with_classes(classes).unwrap());
        let factory = DefaultListableBeanFactory::new(Arc::clone(&registry));
        let definitions = BeanDefinitionReader::new(&registry).load_bean_definitions();
        factory.register_bean_definitions(definitions).unwrap();
        factory
    }

    #[test]
    fn test_singleton_cached_under_both_keys() {
        let factory = factory(vec![repository_class()]);

        let by_name = factory.get_bean("repository").unwrap();
        let by_class = factory.get_bean("shop::Repository").unwrap();
        let by_contract = factory.get_bean("shop::Store").unwrap();

        assert!(Arc::ptr_eq(&by_name, &by_class));
        assert!(Arc::ptr_eq(&by_name, &by_contract));
        assert!(factory.contains_singleton("repository"));
        assert!(factory.contains_singleton("shop::Repository"));
        assert!(factory.contains_singleton("shop::Store"));
        assert_eq!(factory.singleton_count(), 3);
    }

    #[test]
    fn test_class_name_lookup_before_bean_name() {
        let factory = factory(vec![repository_class()]);
        let by_class = factory.get_bean("shop::Repository").unwrap();
        let by_name = factory.get_bean("repository").unwrap();
        assert!(Arc::ptr_eq(&by_name, &by_class));
    }

    #[test]
    fn test_get_bean_by_type() {
        struct Unregistered;
        let registry = TypeRegistry::new()
            .with_classes(vec![ClassBuilder::<Service>::new()
                .component()
                .default_constructor()
                .build()])
            .unwrap();
        let registry = Arc::new(registry);
        let factory = DefaultListableBeanFactory::new(Arc::clone(&registry));
        factory
            .register_bean_definitions(BeanDefinitionReader::new(&registry).load_bean_definitions())
            .unwrap();

        let by_type = factory.get_bean_by_type::<Service>().unwrap();
        let by_name = factory.get_bean("service").unwrap();
        assert!(Arc::ptr_eq(&by_type, &by_name));
        assert!(by_type.target_as::<Service>().is_some());

        assert!(matches!(
            factory.get_bean_by_type::<Unregistered>(),
            Err(ContainerError::BeanNotFound(_))
        ));
    }

    #[test]
    fn test_duplicate_registration_registers_none() {
        let factory = factory(vec![repository_class()]);
        let before = factory.get_bean_definition_names();

        let result = factory.register_bean_definitions(vec![
            BeanDefinition::new("fresh", "shop::Repository"),
            BeanDefinition::new("repository", "shop::Repository"),
        ]);

        assert!(matches!(result, Err(ContainerError::BeanAlreadyExists(name)) if name == "repository"));
        assert_eq!(factory.get_bean_definition_names(), before);
        assert!(!factory.contains_bean("fresh"));
    }

    #[test]
    fn test_duplicate_within_batch() {
        let factory = factory(vec![]);
        let result = factory.register_bean_definitions(vec![
            BeanDefinition::new("twin", "shop::Repository"),
            BeanDefinition::new("twin", "shop::Service"),
        ]);
        assert!(matches!(result, Err(ContainerError::BeanAlreadyExists(_))));
        assert_eq!(factory.get_bean_definition_count(), 0);
    }

    #[test]
    fn test_unknown_bean() {
        let factory = factory(vec![repository_class()]);
        assert!(matches!(
            factory.get_bean("nothing"),
            Err(ContainerError::BeanNotFound(name)) if name == "nothing"
        ));
    }

    #[test]
    fn test_constructor_failure_keeps_source() {
        struct Broken;
        let broken = ClassBuilder::<Broken>::named("shop::Broken")
            .component()
            .constructor(|| Err(anyhow::anyhow!("no database")))
            .build();
        let factory = factory(vec![broken]);

        match factory.get_bean("broken") {
            Err(ContainerError::BeanCreationFailed { name, source }) => {
                assert_eq!(name, "broken");
                assert_eq!(source.to_string(), "no database");
            }
            other => panic!("unexpected result: {:?}", other.map(|b| b.describe())),
        }
        assert!(!factory.contains_singleton("broken"));
    }

    #[test]
    fn test_registration_order_leaves_injection_gap() {
        // service 在 repository 之前注册，创建时 repository 还不在缓存中
        let factory = factory(vec![service_class(), repository_class()]);
        factory.preinstantiate_singletons().unwrap();

        let service = factory.get_bean("service").unwrap();
        let target = service.target_as::<Service>().unwrap();
        assert!(!target.repository.is_wired());
        assert!(service.call::<String>("lookup", args![]).is_err());
    }

    #[test]
    fn test_injection_when_dependency_created_first() {
        let factory = factory(vec![repository_class(), service_class()]);
        factory.preinstantiate_singletons().unwrap();

        let service = factory.get_bean("service").unwrap();
        assert_eq!(service.call::<String>("lookup", args![]).unwrap(), "item");

        let injected = service.target_as::<Service>().unwrap().repository.get().unwrap();
        let repository = factory.get_bean("repository").unwrap();
        assert!(Arc::ptr_eq(injected, &repository));
    }

    #[test]
    fn test_dependency_order_closes_injection_gap() {
        let factory = factory(vec![service_class(), repository_class()]);
        factory.preinstantiate_singletons_in_dependency_order().unwrap();

        let service = factory.get_bean("service").unwrap();
        assert_eq!(service.call::<String>("lookup", args![]).unwrap(), "item");
    }

    #[test]
    fn test_dependency_order_rejects_cycles() {
        let class = ClassBuilder::<Loop>::named("shop::Loop")
            .component()
            .default_constructor()
            .autowired("other", "shop::Loop", |l: &Loop| &l.other)
            .build();
        let factory = factory(vec![class]);

        assert!(matches!(
            factory.preinstantiate_singletons_in_dependency_order(),
            Err(ContainerError::CircularDependency(cycle)) if cycle == "loop -> loop"
        ));
    }

    #[test]
    fn test_dependency_order_rejects_missing() {
        let class = ClassBuilder::<Service>::named("shop::Orphan")
            .component()
            .default_constructor()
            .autowired("repository", "shop::Missing", |s: &Service| &s.repository)
            .build();
        let factory = factory(vec![class]);

        assert!(matches!(
            factory.preinstantiate_singletons_in_dependency_order(),
            Err(ContainerError::DependencyValidationFailed(_))
        ));
    }

    #[test]
    fn test_startup_failures_are_collected() {
        struct Broken;
        let first = ClassBuilder::<Broken>::named("shop::FirstBroken")
            .component()
            .constructor(|| Err(anyhow::anyhow!("first")))
            .build();
        let second = ClassBuilder::<Broken>::named("shop::SecondBroken")
            .component()
            .constructor(|| Err(anyhow::anyhow!("second")))
            .build();
        let factory = factory(vec![first, repository_class(), second]);

        match factory.preinstantiate_singletons() {
            Err(ContainerError::StartupFailed(failures)) => {
                assert_eq!(failures.len(), 2);
                assert!(failures[0].starts_with("firstBroken"));
                assert!(failures[1].starts_with("secondBroken"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(factory.contains_singleton("repository"));
    }

    #[test]
    fn test_lazy_beans_are_skipped() {
        let class = ClassBuilder::<Service>::named("shop::LazyService")
            .component()
            .lazy()
            .default_constructor()
            .build();
        let factory = factory(vec![class]);
        factory.preinstantiate_singletons().unwrap();
        assert!(!factory.contains_singleton("lazyService"));
        assert!(factory.get_bean("lazyService").is_ok());
    }

    #[test]
    fn test_post_processors_run_in_order() {
        struct Recorder {
            label: &'static str,
            order: i32,
            calls: Arc<Mutex<Vec<String>>>,
        }

        impl BeanPostProcessor for Recorder {
            fn post_process_after_instantiation(
                &self,
                bean: BeanRef,
                bean_name: &str,
            ) -> ContainerResult<BeanRef> {
                self.calls.lock().push(format!("{}:{}", self.label, bean_name));
                Ok(bean)
            }

            fn order(&self) -> i32 {
                self.order
            }
        }

        let calls = Arc::new(Mutex::new(Vec::new()));
        let factory = factory(vec![repository_class()]);
        factory.add_bean_post_processor(Arc::new(Recorder {
            label: "late",
            order: 20,
            calls: Arc::clone(&calls),
        }));
        factory.add_bean_post_processor(Arc::new(Recorder {
            label: "early",
            order: 10,
            calls: Arc::clone(&calls),
        }));

        factory.get_bean("repository").unwrap();
        factory.get_bean("shop::Store").unwrap();
        assert_eq!(*calls.lock(), vec!["early:repository", "late:repository"]);
    }

    #[test]
    fn test_post_processor_failure_aborts_creation() {
        struct Rejecting;

        impl BeanPostProcessor for Rejecting {
            fn post_process_after_instantiation(
                &self,
                _bean: BeanRef,
                bean_name: &str,
            ) -> ContainerResult<BeanRef> {
                Err(ContainerError::PostProcessingFailed {
                    processor: "Rejecting".to_string(),
                    name: bean_name.to_string(),
                    source: anyhow::anyhow!("rejected"),
                })
            }
        }

        let factory = factory(vec![repository_class()]);
        factory.add_bean_post_processor(Arc::new(Rejecting));
        assert!(matches!(
            factory.get_bean("repository"),
            Err(ContainerError::PostProcessingFailed { .. })
        ));
        assert_eq!(factory.singleton_count(), 0);
    }

    #[test]
    fn test_concurrent_lookups_share_one_instance() {
        let factory = factory(vec![repository_class()]);

        let beans: Vec<BeanRef> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let factory = &factory;
                    scope.spawn(move || {
                        let name = if i % 2 == 0 { "repository" } else { "shop::Repository" };
                        factory.get_bean(name).unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let first = factory.get_bean("repository").unwrap();
        assert!(beans.iter().all(|b| Arc::ptr_eq(b, &first)));
    }

    #[test]
    fn test_destroy_singletons() {
        let factory = factory(vec![repository_class()]);
        factory.preinstantiate_singletons().unwrap();
        assert!(factory.singleton_count() > 0);
        factory.destroy_singletons().unwrap();
        assert_eq!(factory.singleton_count(), 0);
        assert_eq!(factory.get_bean_definition_count(), 2);
    }
}
