//! 结果解析器

mod functional;
mod integration;
mod performance;

pub use functional::FunctionalTestResultParser;
pub use integration::TestNgResultsParser;
pub use performance::PerformanceTestCsvParser;

use std::path::{Path, PathBuf};
use tracing::debug;

use testgrid_common::TestScenario;

use crate::Result;

/// 结果解析器
///
/// 扁平接口：canParse 由注册表条目的谓词承担，
/// parseResults 构建用例，persistResults 归档产物
pub trait ResultParser: Send {
    /// 解析器名称
    fn name(&self) -> &str;

    /// 解析引擎输出，填充场景的用例列表
    fn parse_results(&mut self) -> Result<()>;

    /// 将结果产物复制到归档目录
    fn persist_results(&self, artifact_dir: &Path) -> Result<()>;

    /// 取回场景
    fn into_scenario(self: Box<Self>) -> TestScenario;
}

/// 解析器选择谓词
type ParserPredicate = fn(&TestScenario, &Path) -> bool;

/// 解析器构造函数
type ParserCtor = fn(TestScenario, PathBuf) -> Box<dyn ResultParser>;

/// 结果解析器注册表
///
/// 注册顺序为 功能(JTL) -> 性能(CSV) -> 集成(TestNG XML)；
/// 谓词之间互斥（性能要求无 .jtl，集成要求二者皆无），
/// 因此注册顺序不影响选择结果
pub struct ResultParserRegistry {
    entries: Vec<(&'static str, ParserPredicate, ParserCtor)>,
}

impl ResultParserRegistry {
    /// 创建并注册默认解析器
    pub fn with_default_parsers() -> Self {
        Self {
            entries: vec![
                (
                    "FUNCTIONAL",
                    FunctionalTestResultParser::can_parse,
                    FunctionalTestResultParser::boxed,
                ),
                (
                    "PERFORMANCE",
                    PerformanceTestCsvParser::can_parse,
                    PerformanceTestCsvParser::boxed,
                ),
                (
                    "INTEGRATION",
                    TestNgResultsParser::can_parse,
                    TestNgResultsParser::boxed,
                ),
            ],
        }
    }

    /// 为场景/位置选择解析器；无匹配返回 None
    pub fn parser_for(
        &self,
        scenario: TestScenario,
        location: &Path,
    ) -> Option<Box<dyn ResultParser>> {
        for (name, predicate, ctor) in &self.entries {
            if predicate(&scenario, location) {
                debug!("场景 {} 使用解析器 {}", scenario.name, name);
                return Some(ctor(scenario, location.to_path_buf()));
            }
        }
        None
    }
}

impl Default for ResultParserRegistry {
    fn default() -> Self {
        Self::with_default_parsers()
    }
}

/// 目录下是否存在 .jtl 文件
pub(crate) fn has_jtl_files(location: &Path) -> bool {
    list_files_with_extension(location, "jtl")
        .map(|files| !files.is_empty())
        .unwrap_or(false)
}

/// 性能结果文件是否存在
pub(crate) fn has_summary_csv(location: &Path) -> bool {
    location.join("results").join("summary.csv").exists()
}

/// testng-results.xml 是否存在
pub(crate) fn has_testng_results(location: &Path) -> bool {
    location.join("testng-results.xml").exists()
        || location
            .join("surefire-reports")
            .join("testng-results.xml")
            .exists()
}

/// 列出目录下指定扩展名的文件（按文件名排序）
pub(crate) fn list_files_with_extension(
    location: &Path,
    extension: &str,
) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(location)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file()
            && path
                .extension()
                .map(|e| e.eq_ignore_ascii_case(extension))
                .unwrap_or(false)
        {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> TestScenario {
        TestScenario::new("s1", "scenarios", "out")
    }

    #[test]
    fn test_no_results_no_parser() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ResultParserRegistry::with_default_parsers();
        assert!(registry.parser_for(scenario(), dir.path()).is_none());
    }

    #[test]
    fn test_mutually_exclusive_selection() {
        let dir = tempfile::tempdir().unwrap();
        // 同时存在 JTL 与 summary.csv 时，确定性地选择功能解析器
        std::fs::write(dir.path().join("results.jtl"), "<testResults/>").unwrap();
        std::fs::create_dir_all(dir.path().join("results")).unwrap();
        std::fs::write(dir.path().join("results/summary.csv"), "a,b").unwrap();

        let registry = ResultParserRegistry::with_default_parsers();
        let parser = registry.parser_for(scenario(), dir.path()).unwrap();
        assert_eq!(parser.name(), "FUNCTIONAL");

        // 谓词互斥：性能解析器不认领含 JTL 的目录
        assert!(!PerformanceTestCsvParser::can_parse(&scenario(), dir.path()));
    }

    #[test]
    fn test_performance_selected_without_jtl() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("results")).unwrap();
        std::fs::write(dir.path().join("results/summary.csv"), "a,b").unwrap();

        let registry = ResultParserRegistry::with_default_parsers();
        let parser = registry.parser_for(scenario(), dir.path()).unwrap();
        assert_eq!(parser.name(), "PERFORMANCE");
    }

    #[test]
    fn test_integration_requires_absence_of_others() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("testng-results.xml"), "<testng-results/>").unwrap();

        let registry = ResultParserRegistry::with_default_parsers();
        let parser = registry.parser_for(scenario(), dir.path()).unwrap();
        assert_eq!(parser.name(), "INTEGRATION");

        // JTL 出现后集成解析器不再认领
        std::fs::write(dir.path().join("r.jtl"), "<testResults/>").unwrap();
        assert!(!TestNgResultsParser::can_parse(&scenario(), dir.path()));
    }
}
