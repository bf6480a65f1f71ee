//! 性能测试 CSV 结果解析器

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use testgrid_common::TestScenario;

use super::{has_jtl_files, has_summary_csv, ResultParser};
use crate::{AutomationError, Result};

const RESULT_FILE: &str = "summary.csv";
const RESULT_LOCATION: &str = "results";
const CSV_EXTENSION: &str = "csv";
const PNG_EXTENSION: &str = "png";

/// 性能测试 CSV 解析器
///
/// 读取 results/summary.csv 数据行；.csv/.png 产物原样归档
pub struct PerformanceTestCsvParser {
    scenario: TestScenario,
    location: PathBuf,
}

impl PerformanceTestCsvParser {
    pub fn new(scenario: TestScenario, location: PathBuf) -> Self {
        Self { scenario, location }
    }

    /// 注册表构造入口
    pub fn boxed(scenario: TestScenario, location: PathBuf) -> Box<dyn ResultParser> {
        Box::new(Self::new(scenario, location))
    }

    /// summary.csv 存在且无 JTL 文件时认领
    ///
    /// 对 JTL 的排除保证与功能解析器互斥
    pub fn can_parse(_scenario: &TestScenario, location: &Path) -> bool {
        has_summary_csv(location) && !has_jtl_files(location)
    }

    fn results_dir(&self) -> PathBuf {
        self.location.join(RESULT_LOCATION)
    }
}

impl ResultParser for PerformanceTestCsvParser {
    fn name(&self) -> &str {
        "PERFORMANCE"
    }

    fn parse_results(&mut self) -> Result<()> {
        let summary = self.results_dir().join(RESULT_FILE);
        let content = std::fs::read_to_string(&summary).map_err(|e| {
            AutomationError::ParseError(format!(
                "场景工作区缺少性能结果文件 {}: {}",
                summary.display(),
                e
            ))
        })?;

        let mut data = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            data.push(line.split(',').map(|cell| cell.trim().to_string()).collect());
        }
        debug!("summary.csv 共 {} 行", data.len());

        // 收集汇总图表
        let mut graphs = Vec::new();
        if let Ok(entries) = std::fs::read_dir(self.results_dir()) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path
                    .extension()
                    .map(|e| e.eq_ignore_ascii_case(PNG_EXTENSION))
                    .unwrap_or(false)
                {
                    graphs.push(path.display().to_string());
                }
            }
        }
        graphs.sort();

        self.scenario.performance_results = data;
        self.scenario.summary_graphs = graphs;

        info!(
            "场景 {} 解析性能结果 {} 行, 图表 {} 张",
            self.scenario.name,
            self.scenario.performance_results.len(),
            self.scenario.summary_graphs.len()
        );
        Ok(())
    }

    fn persist_results(&self, artifact_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(artifact_dir)?;
        for entry in std::fs::read_dir(self.results_dir())? {
            let entry = entry?;
            let path = entry.path();
            let is_artifact = path
                .extension()
                .map(|e| {
                    e.eq_ignore_ascii_case(CSV_EXTENSION) || e.eq_ignore_ascii_case(PNG_EXTENSION)
                })
                .unwrap_or(false);
            if path.is_file() && is_artifact {
                if let Some(file_name) = path.file_name() {
                    std::fs::copy(&path, artifact_dir.join(file_name))?;
                }
            }
        }
        Ok(())
    }

    fn into_scenario(self: Box<Self>) -> TestScenario {
        self.scenario
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_summary_csv() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        std::fs::create_dir_all(&results).unwrap();
        std::fs::write(
            results.join("summary.csv"),
            "label,samples,avg\nlogin,100,42\ncheckout,50,88\n",
        )
        .unwrap();
        std::fs::write(results.join("tps.png"), [0u8; 4]).unwrap();

        let mut parser = PerformanceTestCsvParser::new(
            TestScenario::new("perf", "d", "o"),
            dir.path().to_path_buf(),
        );
        parser.parse_results().unwrap();
        let scenario = Box::new(parser).into_scenario();

        assert_eq!(scenario.performance_results.len(), 3);
        assert_eq!(scenario.performance_results[1][0], "login");
        assert_eq!(scenario.summary_graphs.len(), 1);
        // 性能解析器不产出用例
        assert!(scenario.test_cases.is_empty());
    }

    #[test]
    fn test_missing_summary_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut parser = PerformanceTestCsvParser::new(
            TestScenario::new("perf", "d", "o"),
            dir.path().to_path_buf(),
        );
        assert!(matches!(
            parser.parse_results(),
            Err(AutomationError::ParseError(_))
        ));
    }

    #[test]
    fn test_persist_copies_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let results = dir.path().join("results");
        std::fs::create_dir_all(&results).unwrap();
        std::fs::write(results.join("summary.csv"), "a,b\n").unwrap();
        std::fs::write(results.join("tps.png"), [0u8; 4]).unwrap();
        std::fs::write(results.join("notes.txt"), "skip me").unwrap();

        let parser = PerformanceTestCsvParser::new(
            TestScenario::new("perf", "d", "o"),
            dir.path().to_path_buf(),
        );
        let artifact_dir = dir.path().join("artifacts");
        parser.persist_results(&artifact_dir).unwrap();

        assert!(artifact_dir.join("summary.csv").exists());
        assert!(artifact_dir.join("tps.png").exists());
        assert!(!artifact_dir.join("notes.txt").exists());
    }
}
