//! 连接点（JoinPoint）与方法调用链
//!
//! 每次经过代理的调用都会创建一个新的 `MethodInvocation`，它既是暴露给通知的
//! 连接点，也是驱动拦截器链的状态机。调用之间不共享任何状态，因此无需加锁。

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use trellis_core::{Arguments, BeanObject, ClassMetadata, Instance, MethodMetadata, MethodResult, Value};

use crate::interceptor::{MethodInterceptor, MethodMatcher};

/// 连接点
///
/// 通知方法通过它访问目标对象、被调用的方法、参数和每次调用私有的用户属性。
pub trait JoinPoint {
    /// 被代理的目标实例
    fn this(&self) -> &Instance;

    /// 代理对象本身
    fn proxy(&self) -> &dyn BeanObject;

    fn target_class(&self) -> &Arc<ClassMetadata>;

    fn method(&self) -> &MethodMetadata;

    fn arguments(&self) -> &Arguments;

    /// 设置用户属性，`None` 表示删除
    fn set_user_attribute(&mut self, key: &str, value: Option<Value>);

    fn user_attribute(&self, key: &str) -> Option<&Value>;

    /// 方法签名，例如 `pub i32 demo::Calculator::add(i32, i32)`
    fn signature(&self) -> String {
        self.method().signature(self.target_class().name())
    }
}

/// 拦截器链中的元素
#[derive(Clone)]
pub enum ChainElement {
    /// 可调用的拦截器
    Interceptor(Arc<dyn MethodInterceptor>),

    /// 仅做标记的匹配器，执行时直接跳过
    Matcher(Arc<dyn MethodMatcher>),
}

impl fmt::Debug for ChainElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainElement::Interceptor(i) => write!(f, "Interceptor({})", i.name()),
            ChainElement::Matcher(_) => f.write_str("Matcher"),
        }
    }
}

/// 一次方法调用
pub struct MethodInvocation<'a> {
    proxy: &'a dyn BeanObject,
    target: &'a Instance,
    target_class: &'a Arc<ClassMetadata>,
    method: &'a MethodMetadata,
    arguments: Arguments,
    chain: Arc<[ChainElement]>,

    /// 当前执行到的拦截器下标，None 表示尚未开始
    current_interceptor_index: Option<usize>,

    user_attributes: Option<HashMap<String, Value>>,
}

impl<'a> MethodInvocation<'a> {
    pub fn new(
        proxy: &'a dyn BeanObject,
        target: &'a Instance,
        target_class: &'a Arc<ClassMetadata>,
        method: &'a MethodMetadata,
        arguments: Arguments,
        chain: Arc<[ChainElement]>,
    ) -> Self {
        Self {
            proxy,
            target,
            target_class,
            method,
            arguments,
            chain,
            current_interceptor_index: None,
            user_attributes: None,
        }
    }

    /// 调度执行拦截器链
    ///
    /// 链上的拦截器都执行过之后，调用真正的目标方法；否则前进一位，
    /// 交给下一个拦截器决定何时再次调用 `proceed`。
    pub fn proceed(&mut self) -> MethodResult {
        let next = self.current_interceptor_index.map_or(0, |index| index + 1);
        if next >= self.chain.len() {
            tracing::trace!(
                "Invoking target method {}::{}",
                self.target_class.name(),
                self.method.name()
            );
            return self.method.invoke(self.target.as_ref(), &self.arguments);
        }

        self.current_interceptor_index = Some(next);
        match self.chain[next].clone() {
            ChainElement::Interceptor(interceptor) => interceptor.invoke(self),
            ChainElement::Matcher(_) => self.proceed(),
        }
    }

    pub fn current_interceptor_index(&self) -> Option<usize> {
        self.current_interceptor_index
    }

    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }
}

impl JoinPoint for MethodInvocation<'_> {
    fn this(&self) -> &Instance {
        self.target
    }

    fn proxy(&self) -> &dyn BeanObject {
        self.proxy
    }

    fn target_class(&self) -> &Arc<ClassMetadata> {
        self.target_class
    }

    fn method(&self) -> &MethodMetadata {
        self.method
    }

    fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    fn set_user_attribute(&mut self, key: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.user_attributes
                    .get_or_insert_with(HashMap::new)
                    .insert(key.to_string(), value);
            }
            None => {
                if let Some(attributes) = self.user_attributes.as_mut() {
                    attributes.remove(key);
                }
            }
        }
    }

    fn user_attribute(&self, key: &str) -> Option<&Value> {
        self.user_attributes.as_ref()?.get(key)
    }
}

impl fmt::Debug for MethodInvocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInvocation")
            .field("signature", &self.signature())
            .field("chain", &self.chain)
            .field("current_interceptor_index", &self.current_interceptor_index)
            .finish()
    }
}
