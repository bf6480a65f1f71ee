//! 部署器注册表

use std::sync::Arc;
use tracing::{debug, info};

use testgrid_common::Script;

use crate::deployer::Deployer;
use crate::shell_deployer::ShellDeployer;
use crate::{DeploymentError, Result};

/// 部署器注册表
///
/// 与供应器注册表同构：注册顺序迭代，首个命中获胜
pub struct DeployerRegistry {
    deployers: Vec<Arc<dyn Deployer>>,
}

impl DeployerRegistry {
    /// 创建空注册表
    pub fn new() -> Self {
        Self {
            deployers: Vec::new(),
        }
    }

    /// 创建并注册默认部署器
    pub fn with_default_deployers() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(ShellDeployer::new()));
        registry
    }

    /// 注册部署器
    pub fn register(&mut self, deployer: Arc<dyn Deployer>) {
        info!("注册部署器: {}", deployer.name());
        self.deployers.push(deployer);
    }

    /// 根据脚本解析部署器
    pub fn resolve(&self, script: &Script) -> Result<Arc<dyn Deployer>> {
        for deployer in &self.deployers {
            if deployer.can_handle(script) {
                debug!("脚本 {} 使用部署器 {}", script.name, deployer.name());
                return Ok(Arc::clone(deployer));
            }
        }
        Err(DeploymentError::UnsupportedDeployer(format!(
            "{:?} (脚本 {})",
            script.script_type, script.name
        )))
    }
}

impl Default for DeployerRegistry {
    fn default() -> Self {
        Self::with_default_deployers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use testgrid_common::{ScriptPhase, ScriptType};

    #[test]
    fn test_resolve_shell_deployer() {
        let registry = DeployerRegistry::with_default_deployers();
        let script = Script {
            name: "deploy".to_string(),
            script_type: ScriptType::Shell,
            phase: Some(ScriptPhase::Deploy),
            file: "deploy.sh".to_string(),
            order: 1,
            input_parameters: HashMap::new(),
        };
        let deployer = registry.resolve(&script).unwrap();
        assert_eq!(deployer.name(), "SHELL");
    }

    #[test]
    fn test_empty_registry_is_config_error() {
        let registry = DeployerRegistry::new();
        let script = Script {
            name: "deploy".to_string(),
            script_type: ScriptType::Shell,
            phase: Some(ScriptPhase::Deploy),
            file: "deploy.sh".to_string(),
            order: 1,
            input_parameters: HashMap::new(),
        };
        assert!(matches!(
            registry.resolve(&script),
            Err(DeploymentError::UnsupportedDeployer(_))
        ));
    }
}
