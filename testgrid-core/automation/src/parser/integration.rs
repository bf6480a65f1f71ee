//! TestNG 集成测试结果解析器

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use testgrid_common::{TestCase, TestCaseStatus, TestScenario};

use super::{has_jtl_files, has_summary_csv, has_testng_results, ResultParser};
use crate::{AutomationError, Result};

const RESULTS_INPUT_FILE: &str = "testng-results.xml";

/// 单个 test-method 的解析结果
struct MethodOutcome {
    status: String,
    message: Option<String>,
}

/// TestNG 结果解析器
///
/// 流式读取 testng-results.xml（suite/test/class/test-method 嵌套），
/// 每个 class 聚合为一条用例：任一方法非 PASS 即失败
pub struct TestNgResultsParser {
    scenario: TestScenario,
    location: PathBuf,
}

impl TestNgResultsParser {
    pub fn new(scenario: TestScenario, location: PathBuf) -> Self {
        Self { scenario, location }
    }

    /// 注册表构造入口
    pub fn boxed(scenario: TestScenario, location: PathBuf) -> Box<dyn ResultParser> {
        Box::new(Self::new(scenario, location))
    }

    /// testng-results.xml 存在且无 JTL/summary.csv 时认领
    pub fn can_parse(_scenario: &TestScenario, location: &Path) -> bool {
        has_testng_results(location) && !has_jtl_files(location) && !has_summary_csv(location)
    }

    fn results_file(&self) -> PathBuf {
        let direct = self.location.join(RESULTS_INPUT_FILE);
        if direct.exists() {
            direct
        } else {
            self.location.join("surefire-reports").join(RESULTS_INPUT_FILE)
        }
    }

    fn parse_file(&mut self, path: &Path) -> Result<()> {
        debug!("解析 TestNG 结果文件: {}", path.display());

        let mut reader = Reader::from_file(path).map_err(|e| {
            AutomationError::ParseError(format!("无法打开 {}: {}", path.display(), e))
        })?;
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut current_class: Option<String> = None;
        let mut methods: Vec<MethodOutcome> = Vec::new();
        let mut in_message = false;
        let mut used_names: HashMap<String, u32> = HashMap::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(element)) => match element.local_name().as_ref() {
                    b"class" => {
                        current_class = Some(short_class_name(&attribute(&element, b"name")?));
                        methods.clear();
                    }
                    b"test-method" => {
                        if let Some(outcome) = method_outcome(&element)? {
                            methods.push(outcome);
                        }
                    }
                    b"message" => in_message = true,
                    _ => {}
                },
                Ok(Event::Empty(element)) => {
                    if element.local_name().as_ref() == b"test-method" {
                        if let Some(outcome) = method_outcome(&element)? {
                            methods.push(outcome);
                        }
                    }
                }
                Ok(Event::Text(text)) => {
                    if in_message {
                        attach_message(&mut methods, text.as_ref());
                        in_message = false;
                    }
                }
                Ok(Event::CData(text)) => {
                    if in_message {
                        attach_message(&mut methods, text.as_ref());
                        in_message = false;
                    }
                }
                Ok(Event::End(element)) => match element.local_name().as_ref() {
                    b"class" => {
                        if let Some(class_name) = current_class.take() {
                            let test_case =
                                fold_class(&class_name, &methods, &mut used_names);
                            self.scenario.add_test_case(test_case);
                        }
                        methods.clear();
                    }
                    b"message" => in_message = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(AutomationError::ParseError(format!(
                        "TestNG 结果解析失败 ({}): {}",
                        path.display(),
                        e
                    )))
                }
            }
            buf.clear();
        }

        Ok(())
    }
}

/// 失败信息挂到最近一个没有消息的失败方法上
fn attach_message(methods: &mut [MethodOutcome], raw: &[u8]) {
    if let Some(method) = methods
        .iter_mut()
        .rev()
        .find(|m| m.status != "PASS" && m.message.is_none())
    {
        method.message = Some(String::from_utf8_lossy(raw).trim().to_string());
    }
}

/// 读取元素属性值
fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Result<String> {
    for attr in element.attributes() {
        let attr =
            attr.map_err(|e| AutomationError::ParseError(format!("属性解析失败: {}", e)))?;
        if attr.key.local_name().as_ref() == key {
            return Ok(attr
                .unescape_value()
                .map_err(|e| AutomationError::ParseError(format!("属性值解码失败: {}", e)))?
                .into_owned());
        }
    }
    Ok(String::new())
}

/// 提取 test-method 结果；配置方法不计入
fn method_outcome(element: &BytesStart<'_>) -> Result<Option<MethodOutcome>> {
    if attribute(element, b"is-config")? == "true" {
        return Ok(None);
    }
    let status = attribute(element, b"status")?;
    if status.is_empty() {
        return Ok(None);
    }
    Ok(Some(MethodOutcome {
        status,
        message: None,
    }))
}

/// 取全限定类名的短名
fn short_class_name(full_name: &str) -> String {
    full_name
        .rsplit('.')
        .next()
        .unwrap_or(full_name)
        .to_string()
}

/// 把一个 class 的方法结果折叠成一条用例
fn fold_class(
    class_name: &str,
    methods: &[MethodOutcome],
    used_names: &mut HashMap<String, u32>,
) -> TestCase {
    let failed = methods.iter().find(|m| m.status == "FAIL");
    let all_skipped = !methods.is_empty() && methods.iter().all(|m| m.status == "SKIP");

    let (status, message) = if let Some(method) = failed {
        (
            TestCaseStatus::Fail,
            Some(
                method
                    .message
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
        )
    } else if methods.iter().any(|m| m.status != "PASS") {
        // 非 PASS 非 FAIL（如 SKIP）同样使该 class 不通过
        if all_skipped {
            (TestCaseStatus::Skip, Some("Test Skipped".to_string()))
        } else {
            (TestCaseStatus::Fail, Some("Test Skipped".to_string()))
        }
    } else {
        (TestCaseStatus::Success, None)
    };

    // 重名 class 追加数据驱动后缀
    let mut name = class_name.to_string();
    let count = used_names.entry(class_name.to_string()).or_insert(0);
    if *count > 0 {
        name = format!("{}#data_provider_{}", class_name, count);
    }
    *count += 1;

    TestCase::new(&name, status, message)
}

impl ResultParser for TestNgResultsParser {
    fn name(&self) -> &str {
        "INTEGRATION"
    }

    fn parse_results(&mut self) -> Result<()> {
        let file = self.results_file();
        if !file.exists() {
            return Err(AutomationError::ParseError(format!(
                "缺少 {} (场景 {})",
                RESULTS_INPUT_FILE, self.scenario.name
            )));
        }
        self.parse_file(&file)?;

        let failed = self
            .scenario
            .test_cases
            .iter()
            .filter(|tc| tc.status == TestCaseStatus::Fail)
            .count();
        info!(
            "场景 {} 共 {} 条用例, {} 条失败",
            self.scenario.name,
            self.scenario.test_cases.len(),
            failed
        );
        Ok(())
    }

    fn persist_results(&self, artifact_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(artifact_dir)?;
        let file = self.results_file();
        if file.exists() {
            std::fs::copy(&file, artifact_dir.join(RESULTS_INPUT_FILE))?;
        }
        Ok(())
    }

    fn into_scenario(self: Box<Self>) -> TestScenario {
        self.scenario
    }
}
