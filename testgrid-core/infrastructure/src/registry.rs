//! 供应器注册表

use std::sync::Arc;
use tracing::{debug, info};

use testgrid_common::Script;

use crate::provider::InfrastructureProvider;
use crate::providers::{
    CloudFormationProvider, KubernetesProvider, ShellScriptProvider, TerraformProvider,
};
use crate::{InfrastructureError, Result};

/// 基础设施供应器注册表
///
/// 启动时显式注册，按注册顺序迭代，第一个 `can_handle` 命中的
/// 供应器获胜；无命中是致命的配置错误
pub struct InfrastructureProviderRegistry {
    providers: Vec<Arc<dyn InfrastructureProvider>>,
}

impl InfrastructureProviderRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// 创建并注册默认供应器
    pub fn with_default_providers() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ShellScriptProvider::new()));
        registry.register(Arc::new(CloudFormationProvider::new()));
        registry.register(Arc::new(KubernetesProvider::new()));
        registry.register(Arc::new(TerraformProvider::new()));
        registry
    }

    /// 注册供应器
    pub fn register(&mut self, provider: Arc<dyn InfrastructureProvider>) {
        info!("注册基础设施供应器: {}", provider.name());
        self.providers.push(provider);
    }

    /// 根据脚本解析供应器
    pub fn resolve(&self, script: &Script) -> Result<Arc<dyn InfrastructureProvider>> {
        for provider in &self.providers {
            if provider.can_handle(script.script_type) {
                debug!("脚本 {} 使用供应器 {}", script.name, provider.name());
                return Ok(Arc::clone(provider));
            }
        }
        Err(InfrastructureError::UnsupportedProvider(format!(
            "{:?} (脚本 {})",
            script.script_type, script.name
        )))
    }

    /// 列出已注册供应器名称
    pub fn list(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

impl Default for InfrastructureProviderRegistry {
    fn default() -> Self {
        Self::with_default_providers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use testgrid_common::{ScriptPhase, ScriptType};

    fn script(script_type: ScriptType) -> Script {
        Script {
            name: "s".to_string(),
            script_type,
            phase: Some(ScriptPhase::Create),
            file: "s.sh".to_string(),
            order: 1,
            input_parameters: HashMap::new(),
        }
    }

    #[test]
    fn test_resolve_by_script_type() {
        let registry = InfrastructureProviderRegistry::with_default_providers();
        let provider = registry.resolve(&script(ScriptType::Cloudformation)).unwrap();
        assert_eq!(provider.name(), "CLOUDFORMATION");
        let provider = registry.resolve(&script(ScriptType::Shell)).unwrap();
        assert_eq!(provider.name(), "SHELL");
    }

    #[test]
    fn test_resolve_unregistered_is_fatal() {
        let registry = InfrastructureProviderRegistry::new();
        let result = registry.resolve(&script(ScriptType::Terraform));
        assert!(matches!(
            result,
            Err(InfrastructureError::UnsupportedProvider(_))
        ));
    }
}
