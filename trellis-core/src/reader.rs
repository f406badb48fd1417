use crate::bean::BeanDefinition;
use crate::registry::TypeRegistry;
use crate::utils::naming::{in_package, to_camel_case};

/// Bean 定义读取器
///
/// 把类型注册表中的组件转换为 Bean 定义：
/// - 接口和非组件类型被跳过
/// - 每个组件生成一个以简单类名首字母小写命名的定义
/// - 组件实现的每个契约再生成一个以契约名命名的定义，指向同一个类
pub struct BeanDefinitionReader<'a> {
    registry: &'a TypeRegistry,
    scan_package: Option<String>,
}

impl<'a> BeanDefinitionReader<'a> {
    pub fn new(registry: &'a TypeRegistry) -> Self {
        Self {
            registry,
            scan_package: None,
        }
    }

    /// 只读取该包下的类型
    pub fn with_scan_package(mut self, package: impl Into<String>) -> Self {
        self.scan_package = Some(package.into());
        self
    }

    pub fn load_bean_definitions(&self) -> Vec<BeanDefinition> {
        let mut definitions = Vec::new();

        for class in self.registry.classes() {
            if let Some(package) = &self.scan_package {
                if !in_package(class.name(), package) {
                    continue;
                }
            }
            if class.is_interface() || !class.is_component() {
                tracing::trace!("Skipping non-component class '{}'", class.name());
                continue;
            }

            let bean_name = to_camel_case(class.simple_name());
            tracing::debug!("Found component '{}' as '{}'", class.name(), bean_name);
            definitions.push(
                BeanDefinition::new(bean_name, class.name()).with_lazy(class.is_lazy_init()),
            );

            for contract in class.contracts() {
                definitions.push(
                    BeanDefinition::new(contract.name(), class.name())
                        .with_lazy(class.is_lazy_init()),
                );
            }
        }

        definitions
    }
}
