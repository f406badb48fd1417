use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::class::{downcast_value, Arguments, ClassMetadata, Instance, MethodResult};

/// 容器管理的对象（原始 Bean 或代理）
///
/// 所有方法调用都经过 `invoke`，代理正是通过覆盖 `invoke` 把调用送入拦截器链。
pub trait BeanObject: Send + Sync {
    /// 目标对象声明的类元数据
    fn class(&self) -> &Arc<ClassMetadata>;

    /// 原始目标实例（对于代理，是被代理的对象）
    fn target(&self) -> &Instance;

    /// 运行时类型名，代理会返回代理类型名
    fn runtime_type(&self) -> String {
        self.class().name().to_string()
    }

    fn is_proxy(&self) -> bool {
        false
    }

    /// 按方法名调用
    fn invoke(&self, method: &str, args: Arguments) -> MethodResult;

    /// 对象标识，同一目标实例返回相同的值
    fn identity(&self) -> usize {
        Arc::as_ptr(self.target()) as *const () as usize
    }

    /// 对象的字符串表示
    fn describe(&self) -> String {
        format!("{}@{:x}", self.class().name(), self.identity())
    }
}

/// 容器中 Bean 的共享句柄
pub type BeanRef = Arc<dyn BeanObject>;

impl dyn BeanObject {
    /// 调用方法并把返回值还原为具体类型
    pub fn call<R: Any>(&self, method: &str, args: Arguments) -> anyhow::Result<R> {
        downcast_value(self.invoke(method, args)?)
    }

    /// 直接访问目标实例（绕过代理）
    pub fn target_as<T: Any>(&self) -> Option<&T> {
        self.target().downcast_ref::<T>()
    }
}

impl fmt::Debug for dyn BeanObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// 所有对象都具备的标识方法，代理不会拦截它们
pub const OBJECT_METHODS: &[&str] = &["equals", "hash_code", "to_string"];

pub fn is_object_method(method: &str) -> bool {
    OBJECT_METHODS.contains(&method)
}

/// 调用标识方法：类自己声明了就走方法表，否则使用默认实现
pub fn invoke_object_method(bean: &dyn BeanObject, method: &str, args: &Arguments) -> MethodResult {
    if let Some(declared) = bean.class().method(method) {
        return declared.invoke(bean.target().as_ref(), args);
    }
    match method {
        "hash_code" => Ok(Box::new(bean.identity())),
        "equals" => {
            let other = args.get::<BeanRef>(0)?;
            Ok(Box::new(other.identity() == bean.identity()))
        }
        _ => Ok(Box::new(bean.describe())),
    }
}

/// 未被代理的 Bean，直接通过方法表分派
pub struct PlainBean {
    class: Arc<ClassMetadata>,
    instance: Instance,
}

impl PlainBean {
    pub fn new(class: Arc<ClassMetadata>, instance: Instance) -> Self {
        Self { class, instance }
    }
}

impl BeanObject for PlainBean {
    fn class(&self) -> &Arc<ClassMetadata> {
        &self.class
    }

    fn target(&self) -> &Instance {
        &self.instance
    }

    fn invoke(&self, method: &str, args: Arguments) -> MethodResult {
        if is_object_method(method) {
            return invoke_object_method(self, method, &args);
        }
        tracing::trace!("Invoking {}::{}", self.class.name(), method);
        self.class.invoke(self.instance.as_ref(), method, &args)
    }
}

/// Bean 包装器，单例缓存中保存的就是它
#[derive(Clone)]
pub struct BeanWrapper {
    wrapped: BeanRef,
}

impl BeanWrapper {
    pub fn new(wrapped: BeanRef) -> Self {
        Self { wrapped }
    }

    pub fn wrapped_instance(&self) -> &BeanRef {
        &self.wrapped
    }

    /// 被包装对象声明的类
    pub fn wrapped_class(&self) -> &Arc<ClassMetadata> {
        self.wrapped.class()
    }

    /// 运行时类型（代理时为代理类型）
    pub fn runtime_type(&self) -> String {
        self.wrapped.runtime_type()
    }
}

impl fmt::Debug for BeanWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BeanWrapper")
            .field("runtime_type", &self.runtime_type())
            .field("identity", &self.wrapped.identity())
            .finish()
    }
}

/// Bean 定义 - 描述如何创建 Bean
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeanDefinition {
    /// Bean 的全限定类名
    pub bean_class_name: String,

    /// 是否延迟初始化
    pub lazy_init: bool,

    /// Bean 名称（定义的唯一标识）
    pub factory_bean_name: String,
}

impl BeanDefinition {
    /// 创建新的 Bean 定义
    pub fn new(factory_bean_name: impl Into<String>, bean_class_name: impl Into<String>) -> Self {
        Self {
            bean_class_name: bean_class_name.into(),
            lazy_init: false,
            factory_bean_name: factory_bean_name.into(),
        }
    }

    /// 设置延迟初始化
    pub fn with_lazy(mut self, lazy: bool) -> Self {
        self.lazy_init = lazy;
        self
    }
}

/// 自动装配字段
///
/// 只能被赋值一次，通过 `&self` 即可写入，所以容器可以在实例共享之后再注入依赖。
#[derive(Default)]
pub struct Autowired {
    slot: OnceCell<BeanRef>,
}

impl Autowired {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&BeanRef> {
        self.slot.get()
    }

    pub fn is_wired(&self) -> bool {
        self.slot.get().is_some()
    }

    /// 获取已注入的依赖，未注入时返回错误
    pub fn require(&self) -> anyhow::Result<&BeanRef> {
        self.slot
            .get()
            .ok_or_else(|| anyhow::anyhow!("Dependency has not been injected"))
    }

    /// 注入依赖，已注入时返回 false
    pub fn set(&self, bean: BeanRef) -> bool {
        self.slot.set(bean).is_ok()
    }
}

impl fmt::Debug for Autowired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.slot.get() {
            Some(bean) => write!(f, "Autowired({})", bean.describe()),
            None => f.write_str("Autowired(<unset>)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{args, ClassBuilder};

    #[derive(Default)]
    struct Counter {
        base: i64,
    }

    fn counter_bean() -> BeanRef {
        let class = ClassBuilder::<Counter>::named("demo::Counter")
            .default_constructor()
            .method1("offset", |c: &Counter, by: i64| Ok(c.base + by))
            .build();
        let instance = class.instantiate().unwrap();
        Arc::new(PlainBean::new(Arc::new(class), instance))
    }

    #[test]
    fn test_plain_bean_dispatch() {
        let bean = counter_bean();
        assert_eq!(bean.call::<i64>("offset", args![5i64]).unwrap(), 5);
        assert!(!bean.is_proxy());
        assert_eq!(bean.runtime_type(), "demo::Counter");
    }

    #[test]
    fn test_object_methods() {
        let bean = counter_bean();
        let other = counter_bean();

        let description = bean.call::<String>("to_string", args![]).unwrap();
        assert!(description.starts_with("demo::Counter@"));

        assert_eq!(bean.call::<usize>("hash_code", args![]).unwrap(), bean.identity());
        assert!(bean.call::<bool>("equals", args![Arc::clone(&bean)]).unwrap());
        assert!(!bean.call::<bool>("equals", args![other]).unwrap());
    }

    #[test]
    fn test_autowired_set_once() {
        let field = Autowired::new();
        assert!(!field.is_wired());
        assert!(field.require().is_err());

        assert!(field.set(counter_bean()));
        assert!(!field.set(counter_bean()));
        assert!(field.is_wired());
    }

    #[test]
    fn test_wrapper_exposes_runtime_type() {
        let wrapper = BeanWrapper::new(counter_bean());
        assert_eq!(wrapper.wrapped_class().name(), "demo::Counter");
        assert_eq!(wrapper.runtime_type(), "demo::Counter");
    }

    #[test]
    fn test_bean_definition_builder() {
        let definition = BeanDefinition::new("counter", "demo::Counter").with_lazy(true);
        assert_eq!(definition.factory_bean_name, "counter");
        assert_eq!(definition.bean_class_name, "demo::Counter");
        assert!(definition.lazy_init);
    }
}
