//! 类型元数据（Class Metadata）
//!
//! Rust 没有运行时反射，容器需要的类型信息全部在启动时通过 `ClassBuilder` 显式声明：
//! - 构造函数
//! - 实现的契约（接口）以及契约上声明的方法
//! - 方法表（方法名 -> 类型擦除后的调用闭包）
//! - 需要自动装配的字段
//!
//! 方法参数与返回值统一擦除为 `Box<dyn Any + Send + Sync>`，
//! 由方法表中的闭包负责还原成具体类型。

use std::any::{type_name, Any};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use thiserror::Error;

use crate::bean::{Autowired, BeanRef};

/// 原始 Bean 实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 单个参数或返回值
pub type Value = Box<dyn Any + Send + Sync>;

/// 方法调用结果，失败时携带用户代码返回的原始错误
pub type MethodResult = anyhow::Result<Value>;

/// 类型擦除后的方法调用闭包
pub type MethodInvoker =
    Arc<dyn Fn(&(dyn Any + Send + Sync), &Arguments) -> MethodResult + Send + Sync>;

/// 类型擦除后的构造函数
pub type Constructor = Arc<dyn Fn() -> anyhow::Result<Instance> + Send + Sync>;

/// 字段注入闭包，返回 false 表示字段已经被注入过
pub type FieldInjector = Arc<dyn Fn(&(dyn Any + Send + Sync), BeanRef) -> bool + Send + Sync>;

/// 动态调用相关的错误
#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("No method '{method}' on class '{class}'")]
    NoSuchMethod { class: String, method: String },

    #[error("Missing argument #{index} (got {len} argument(s))")]
    MissingArgument { index: usize, len: usize },

    #[error("Argument #{index} is not of type '{expected}'")]
    ArgumentType { index: usize, expected: &'static str },

    #[error("Return value is not of type '{expected}'")]
    ReturnType { expected: &'static str },

    #[error("Target instance is not of type '{expected}'")]
    TargetType { expected: &'static str },

    #[error("Class '{0}' has no constructor")]
    NoConstructor(String),
}

/// 方法参数列表
#[derive(Default)]
pub struct Arguments {
    values: Vec<Value>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_values(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// 追加一个参数（构建器风格）
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.values.push(Box::new(value));
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 按位置获取参数，并还原为具体类型
    pub fn get<T: Any>(&self, index: usize) -> anyhow::Result<&T> {
        let value = self.values.get(index).ok_or(InvocationError::MissingArgument {
            index,
            len: self.values.len(),
        })?;
        value.downcast_ref::<T>().ok_or_else(|| {
            InvocationError::ArgumentType {
                index,
                expected: type_name::<T>(),
            }
            .into()
        })
    }

    /// 获取未还原类型的参数
    pub fn get_raw(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("len", &self.values.len())
            .finish()
    }
}

/// 构造参数列表
///
/// ```
/// use trellis_core::args;
///
/// let args = args![2, 3];
/// assert_eq!(*args.get::<i32>(1).unwrap(), 3);
/// ```
#[macro_export]
macro_rules! args {
    () => {
        $crate::Arguments::new()
    };
    ($($value:expr),+ $(,)?) => {
        $crate::Arguments::new()$(.with($value))+
    };
}

/// 将返回值还原为具体类型
pub fn downcast_value<R: Any>(value: Value) -> anyhow::Result<R> {
    value
        .downcast::<R>()
        .map(|boxed| *boxed)
        .map_err(|_| InvocationError::ReturnType { expected: type_name::<R>() }.into())
}

/// 方法可见性
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Private,
}

/// 方法元数据
#[derive(Clone)]
pub struct MethodMetadata {
    name: &'static str,
    visibility: Visibility,
    is_final: bool,
    return_type: &'static str,
    param_types: Vec<&'static str>,
    invoker: MethodInvoker,
}

impl MethodMetadata {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// 子类代理能否覆盖此方法（公开且非 final）
    pub fn overridable(&self) -> bool {
        self.visibility == Visibility::Public && !self.is_final
    }

    pub fn return_type(&self) -> &'static str {
        self.return_type
    }

    pub fn param_types(&self) -> &[&'static str] {
        &self.param_types
    }

    /// 方法签名字符串，切点表达式匹配的就是它
    ///
    /// 例如：`pub i32 demo::Calculator::add(i32, i32)`
    pub fn signature(&self, class_name: &str) -> String {
        let visibility = match self.visibility {
            Visibility::Public => "pub ",
            Visibility::Private => "",
        };
        format!(
            "{}{} {}::{}({})",
            visibility,
            self.return_type,
            class_name,
            self.name,
            self.param_types.join(", ")
        )
    }

    /// 在目标实例上调用此方法
    pub fn invoke(&self, target: &(dyn Any + Send + Sync), args: &Arguments) -> MethodResult {
        (self.invoker)(target, args)
    }
}

impl fmt::Debug for MethodMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodMetadata")
            .field("name", &self.name)
            .field("visibility", &self.visibility)
            .field("is_final", &self.is_final)
            .field("return_type", &self.return_type)
            .field("param_types", &self.param_types)
            .finish()
    }
}

/// 契约（接口）元数据
#[derive(Debug, Clone)]
pub struct ContractMetadata {
    name: String,
    methods: Vec<&'static str>,
}

impl ContractMetadata {
    pub fn new(name: impl Into<String>, methods: &[&'static str]) -> Self {
        Self {
            name: name.into(),
            methods: methods.to_vec(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declares(&self, method: &str) -> bool {
        self.methods.iter().any(|m| *m == method)
    }
}

/// 自动装配字段元数据
#[derive(Clone)]
pub struct FieldMetadata {
    name: &'static str,
    type_name: String,
    qualifier: Option<String>,
    injector: FieldInjector,
}

impl FieldMetadata {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref()
    }

    /// 要注入的 Bean 名称：显式指定的名称优先，否则使用字段声明的类型名
    pub fn dependency_name(&self) -> &str {
        self.qualifier.as_deref().unwrap_or(&self.type_name)
    }

    /// 绕过可见性直接写入字段
    pub fn inject(&self, target: &(dyn Any + Send + Sync), bean: BeanRef) -> bool {
        (self.injector)(target, bean)
    }
}

impl fmt::Debug for FieldMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMetadata")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("qualifier", &self.qualifier)
            .finish()
    }
}

/// 类元数据
#[derive(Clone)]
pub struct ClassMetadata {
    name: String,
    is_interface: bool,
    is_component: bool,
    lazy_init: bool,
    contracts: Vec<ContractMetadata>,
    constructor: Option<Constructor>,
    methods: Vec<MethodMetadata>,
    fields: Vec<FieldMetadata>,
}

impl ClassMetadata {
    /// 全限定类名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 简单类名，例如 `demo::service::Calculator` -> `Calculator`
    pub fn simple_name(&self) -> &str {
        let base = self.name.split('<').next().unwrap_or(&self.name);
        base.rsplit("::").next().unwrap_or(base)
    }

    pub fn is_interface(&self) -> bool {
        self.is_interface
    }

    pub fn is_component(&self) -> bool {
        self.is_component
    }

    pub fn is_lazy_init(&self) -> bool {
        self.lazy_init
    }

    pub fn contracts(&self) -> &[ContractMetadata] {
        &self.contracts
    }

    pub fn has_contracts(&self) -> bool {
        !self.contracts.is_empty()
    }

    pub fn methods(&self) -> &[MethodMetadata] {
        &self.methods
    }

    pub fn method(&self, name: &str) -> Option<&MethodMetadata> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn fields(&self) -> &[FieldMetadata] {
        &self.fields
    }

    /// 通过构造函数创建原始实例
    pub fn instantiate(&self) -> anyhow::Result<Instance> {
        let constructor = self
            .constructor
            .as_ref()
            .ok_or_else(|| InvocationError::NoConstructor(self.name.clone()))?;
        constructor()
    }

    /// 按方法名在目标实例上调用方法
    pub fn invoke(
        &self,
        target: &(dyn Any + Send + Sync),
        method: &str,
        args: &Arguments,
    ) -> MethodResult {
        let metadata = self.method(method).ok_or_else(|| InvocationError::NoSuchMethod {
            class: self.name.clone(),
            method: method.to_string(),
        })?;
        metadata.invoke(target, args)
    }
}

impl fmt::Debug for ClassMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMetadata")
            .field("name", &self.name)
            .field("is_interface", &self.is_interface)
            .field("is_component", &self.is_component)
            .field("lazy_init", &self.lazy_init)
            .field("contracts", &self.contracts)
            .field("methods", &self.methods)
            .field("fields", &self.fields)
            .finish()
    }
}

/// 类型在容器中的名称，`dyn Trait` 去掉 `dyn ` 前缀后即契约名
pub fn type_key<C: ?Sized + 'static>() -> &'static str {
    let name = type_name::<C>();
    name.strip_prefix("dyn ").unwrap_or(name)
}

fn downcast_target<T: Any>(target: &(dyn Any + Send + Sync)) -> anyhow::Result<&T> {
    target
        .downcast_ref::<T>()
        .ok_or_else(|| InvocationError::TargetType { expected: type_name::<T>() }.into())
}

/// 类元数据构建器
///
/// ```
/// use trellis_core::ClassBuilder;
///
/// #[derive(Default)]
/// struct Calculator;
///
/// impl Calculator {
///     fn add(&self, a: i32, b: i32) -> i32 {
///         a + b
///     }
/// }
///
/// let class = ClassBuilder::<Calculator>::named("demo::Calculator")
///     .component()
///     .default_constructor()
///     .method2("add", |c: &Calculator, a: i32, b: i32| Ok(c.add(a, b)))
///     .build();
///
/// assert_eq!(class.simple_name(), "Calculator");
/// assert_eq!(
///     class.method("add").unwrap().signature(class.name()),
///     "pub i32 demo::Calculator::add(i32, i32)"
/// );
/// ```
pub struct ClassBuilder<T> {
    metadata: ClassMetadata,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
    /// 使用 `std::any::type_name::<T>()` 作为全限定类名
    pub fn new() -> Self {
        Self::named(type_name::<T>())
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            metadata: ClassMetadata {
                name: name.into(),
                is_interface: false,
                is_component: false,
                lazy_init: false,
                contracts: Vec::new(),
                constructor: None,
                methods: Vec::new(),
                fields: Vec::new(),
            },
            _marker: PhantomData,
        }
    }

    /// 标记为组件（相当于 @Component），只有组件会生成 Bean 定义
    pub fn component(mut self) -> Self {
        self.metadata.is_component = true;
        self
    }

    /// 标记为接口，接口不会被实例化
    pub fn interface(mut self) -> Self {
        self.metadata.is_interface = true;
        self
    }

    /// 延迟初始化
    pub fn lazy(mut self) -> Self {
        self.metadata.lazy_init = true;
        self
    }

    /// 声明实现的契约及契约上的方法
    pub fn implements(mut self, contract: impl Into<String>, methods: &[&'static str]) -> Self {
        self.metadata
            .contracts
            .push(ContractMetadata::new(contract, methods));
        self
    }

    /// 以 trait 类型名声明契约，例如 `implements_trait::<dyn CalculatorApi>`
    pub fn implements_trait<C: ?Sized + 'static>(self, methods: &[&'static str]) -> Self {
        self.implements(type_key::<C>(), methods)
    }

    pub fn constructor<F>(mut self, constructor: F) -> Self
    where
        F: Fn() -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.metadata.constructor = Some(Arc::new(move || {
            let instance = constructor()?;
            Ok(Arc::new(instance) as Instance)
        }));
        self
    }

    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(|| Ok(T::default()))
    }

    fn push_method(
        mut self,
        name: &'static str,
        return_type: &'static str,
        param_types: Vec<&'static str>,
        invoker: MethodInvoker,
    ) -> Self {
        self.metadata.methods.retain(|m| m.name != name);
        self.metadata.methods.push(MethodMetadata {
            name,
            visibility: Visibility::Public,
            is_final: false,
            return_type,
            param_types,
            invoker,
        });
        self
    }

    /// 注册一个直接读取参数列表的方法
    pub fn method<R, F>(self, name: &'static str, body: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&T, &Arguments) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.push_method(
            name,
            type_name::<R>(),
            vec![".."],
            Arc::new(move |target, args| {
                let this = downcast_target::<T>(target)?;
                Ok(Box::new(body(this, args)?) as Value)
            }),
        )
    }

    pub fn method0<R, F>(self, name: &'static str, body: F) -> Self
    where
        R: Any + Send + Sync,
        F: Fn(&T) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.push_method(
            name,
            type_name::<R>(),
            Vec::new(),
            Arc::new(move |target, _args| {
                let this = downcast_target::<T>(target)?;
                Ok(Box::new(body(this)?) as Value)
            }),
        )
    }

    pub fn method1<A, R, F>(self, name: &'static str, body: F) -> Self
    where
        A: Any + Clone + Send + Sync,
        R: Any + Send + Sync,
        F: Fn(&T, A) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.push_method(
            name,
            type_name::<R>(),
            vec![type_name::<A>()],
            Arc::new(move |target, args| {
                let this = downcast_target::<T>(target)?;
                let a = args.get::<A>(0)?.clone();
                Ok(Box::new(body(this, a)?) as Value)
            }),
        )
    }

    pub fn method2<A, B, R, F>(self, name: &'static str, body: F) -> Self
    where
        A: Any + Clone + Send + Sync,
        B: Any + Clone + Send + Sync,
        R: Any + Send + Sync,
        F: Fn(&T, A, B) -> anyhow::Result<R> + Send + Sync + 'static,
    {
        self.push_method(
            name,
            type_name::<R>(),
            vec![type_name::<A>(), type_name::<B>()],
            Arc::new(move |target, args| {
                let this = downcast_target::<T>(target)?;
                let a = args.get::<A>(0)?.clone();
                let b = args.get::<B>(1)?.clone();
                Ok(Box::new(body(this, a, b)?) as Value)
            }),
        )
    }

    /// 将已注册的方法标记为 final（子类代理无法覆盖）
    pub fn mark_final(mut self, method: &str) -> Self {
        if let Some(m) = self.metadata.methods.iter_mut().find(|m| m.name == method) {
            m.is_final = true;
        }
        self
    }

    /// 将已注册的方法标记为私有
    pub fn mark_private(mut self, method: &str) -> Self {
        if let Some(m) = self.metadata.methods.iter_mut().find(|m| m.name == method) {
            m.visibility = Visibility::Private;
        }
        self
    }

    /// 声明一个按类型名装配的字段（相当于 @Autowired）
    pub fn autowired<F>(mut self, field: &'static str, type_name: impl Into<String>, slot: F) -> Self
    where
        F: Fn(&T) -> &Autowired + Send + Sync + 'static,
    {
        let injector: FieldInjector = Arc::new(move |target, bean| {
            match target.downcast_ref::<T>() {
                Some(this) => slot(this).set(bean),
                None => false,
            }
        });
        self.metadata.fields.push(FieldMetadata {
            name: field,
            type_name: type_name.into(),
            qualifier: None,
            injector,
        });
        self
    }

    /// 以依赖的 Rust 类型声明装配字段，类型名即 Bean 名
    pub fn autowired_type<D: ?Sized + 'static, F>(self, field: &'static str, slot: F) -> Self
    where
        F: Fn(&T) -> &Autowired + Send + Sync + 'static,
    {
        self.autowired(field, type_key::<D>(), slot)
    }

    /// 为字段指定要注入的 Bean 名称（相当于 @Autowired("name")）
    pub fn qualifier(mut self, field: &str, bean_name: impl Into<String>) -> Self {
        if let Some(f) = self.metadata.fields.iter_mut().find(|f| f.name == field) {
            f.qualifier = Some(bean_name.into());
        }
        self
    }

    pub fn build(self) -> ClassMetadata {
        self.metadata
    }
}

impl<T: Any + Send + Sync> Default for ClassBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Greeter {
        greeting: String,
    }

    fn greeter_class() -> ClassMetadata {
        ClassBuilder::<Greeter>::named("demo::service::Greeter")
            .component()
            .constructor(|| {
                Ok(Greeter {
                    greeting: "hello".to_string(),
                })
            })
            .method1("greet", |g: &Greeter, name: String| {
                Ok(format!("{}, {}", g.greeting, name))
            })
            .method0("secret", |_g: &Greeter| Ok(42u32))
            .mark_private("secret")
            .build()
    }

    #[test]
    fn test_simple_name() {
        let class = greeter_class();
        assert_eq!(class.name(), "demo::service::Greeter");
        assert_eq!(class.simple_name(), "Greeter");
    }

    #[test]
    fn test_default_name_is_rust_type_name() {
        let class = ClassBuilder::<Greeter>::new().build();
        assert_eq!(class.name(), type_name::<Greeter>());
        assert_eq!(class.simple_name(), "Greeter");
    }

    #[test]
    fn test_invoke_through_method_table() {
        let class = greeter_class();
        let instance = class.instantiate().unwrap();
        let result = class
            .invoke(instance.as_ref(), "greet", &args!["rust".to_string()])
            .unwrap();
        assert_eq!(downcast_value::<String>(result).unwrap(), "hello, rust");
    }

    #[test]
    fn test_unknown_method() {
        let class = greeter_class();
        let instance = class.instantiate().unwrap();
        let err = class.invoke(instance.as_ref(), "missing", &args![]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InvocationError>(),
            Some(InvocationError::NoSuchMethod { .. })
        ));
    }

    #[test]
    fn test_argument_type_mismatch() {
        let class = greeter_class();
        let instance = class.instantiate().unwrap();
        let err = class.invoke(instance.as_ref(), "greet", &args![7]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<InvocationError>(),
            Some(InvocationError::ArgumentType { index: 0, .. })
        ));
    }

    #[test]
    fn test_signature_and_modifiers() {
        let class = greeter_class();
        let greet = class.method("greet").unwrap();
        assert!(greet.overridable());
        assert_eq!(
            greet.signature(class.name()),
            "pub alloc::string::String demo::service::Greeter::greet(alloc::string::String)"
        );

        let secret = class.method("secret").unwrap();
        assert!(!secret.overridable());
        assert_eq!(secret.signature(class.name()), "u32 demo::service::Greeter::secret()");
    }

    #[test]
    fn test_no_constructor() {
        let class = ClassBuilder::<Greeter>::named("demo::Greeting").interface().build();
        assert!(class.instantiate().is_err());
    }

    #[test]
    fn test_contracts() {
        trait Greeting {}
        let class = ClassBuilder::<Greeter>::named("demo::Greeter")
            .implements_trait::<dyn Greeting>(&["greet"])
            .build();
        assert!(class.has_contracts());
        assert!(class.contracts()[0].declares("greet"));
        assert!(!class.contracts()[0].declares("secret"));
        assert!(class.contracts()[0].name().ends_with("Greeting"));
        assert!(!class.contracts()[0].name().starts_with("dyn "));
    }
}
