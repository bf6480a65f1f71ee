//! JMeter JTL 功能测试结果解析器

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use testgrid_common::{TestCase, TestCaseStatus, TestScenario};

use super::{has_jtl_files, list_files_with_extension, ResultParser};
use crate::{AutomationError, Result};

const HTTP_SAMPLE_ELEMENT: &[u8] = b"httpSample";
const SAMPLE_ELEMENT: &[u8] = b"sample";
const FAILURE_MESSAGE_ELEMENT: &[u8] = b"failureMessage";
const ROOT_ELEMENT: &[u8] = b"testResults";
const TEST_NAME_ATTRIBUTE: &[u8] = b"lb";
const TEST_SUCCESS_ATTRIBUTE: &[u8] = b"s";
const ERROR_COUNT_ATTRIBUTE: &[u8] = b"ec";

/// JTL 功能测试结果解析器
///
/// 流式读取 .jtl 文件，每个 httpSample/sample 元素产出一条用例
pub struct FunctionalTestResultParser {
    scenario: TestScenario,
    location: PathBuf,
}

impl FunctionalTestResultParser {
    pub fn new(scenario: TestScenario, location: PathBuf) -> Self {
        Self { scenario, location }
    }

    /// 注册表构造入口
    pub fn boxed(scenario: TestScenario, location: PathBuf) -> Box<dyn ResultParser> {
        Box::new(Self::new(scenario, location))
    }

    /// 位置下存在 .jtl 文件时认领
    pub fn can_parse(_scenario: &TestScenario, location: &Path) -> bool {
        has_jtl_files(location)
    }

    /// 解析单个 JTL 文件
    fn parse_file(&mut self, path: &Path) -> Result<()> {
        debug!("解析 JTL 文件: {}", path.display());

        let mut reader = Reader::from_file(path)
            .map_err(|e| AutomationError::ParseError(format!("无法打开 {}: {}", path.display(), e)))?;
        reader.trim_text(true);

        let mut buf = Vec::new();
        let mut root_seen = false;
        let mut current: Option<TestCase> = None;
        let mut in_failure_message = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(element)) => {
                    let name = element.local_name();
                    if !root_seen {
                        // 根元素必须是 testResults，否则视为硬解析错误
                        if name.as_ref() != ROOT_ELEMENT {
                            return Err(AutomationError::ParseError(format!(
                                "JTL 根元素非法: {} (文件 {})",
                                String::from_utf8_lossy(name.as_ref()),
                                path.display()
                            )));
                        }
                        root_seen = true;
                    } else if name.as_ref() == HTTP_SAMPLE_ELEMENT || name.as_ref() == SAMPLE_ELEMENT {
                        current = Some(build_test_case(&element)?);
                    } else if name.as_ref() == FAILURE_MESSAGE_ELEMENT {
                        in_failure_message = true;
                    }
                }
                Ok(Event::Empty(element)) => {
                    let name = element.local_name();
                    if root_seen
                        && (name.as_ref() == HTTP_SAMPLE_ELEMENT || name.as_ref() == SAMPLE_ELEMENT)
                    {
                        self.scenario.add_test_case(build_test_case(&element)?);
                    }
                }
                Ok(Event::Text(text)) => {
                    if in_failure_message {
                        if let Some(test_case) = current.as_mut() {
                            let message = text.unescape().map_err(|e| {
                                AutomationError::ParseError(format!("失败信息解码错误: {}", e))
                            })?;
                            test_case.failure_message = Some(message.into_owned());
                        }
                        in_failure_message = false;
                    }
                }
                Ok(Event::End(element)) => {
                    let name = element.local_name();
                    if name.as_ref() == HTTP_SAMPLE_ELEMENT || name.as_ref() == SAMPLE_ELEMENT {
                        if let Some(test_case) = current.take() {
                            self.scenario.add_test_case(test_case);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(AutomationError::ParseError(format!(
                        "JTL 解析失败 ({}): {}",
                        path.display(),
                        e
                    )))
                }
            }
            buf.clear();
        }

        if !root_seen {
            return Err(AutomationError::ParseError(format!(
                "JTL 文件无 testResults 根元素: {}",
                path.display()
            )));
        }

        Ok(())
    }
}

/// 从 sample 元素属性构建用例
fn build_test_case(element: &BytesStart<'_>) -> Result<TestCase> {
    let mut name = String::new();
    let mut success = true;

    for attribute in element.attributes() {
        let attribute = attribute
            .map_err(|e| AutomationError::ParseError(format!("属性解析失败: {}", e)))?;
        let key = attribute.key.local_name();
        if key.as_ref() == TEST_NAME_ATTRIBUTE {
            name = attribute
                .unescape_value()
                .map_err(|e| AutomationError::ParseError(format!("属性值解码失败: {}", e)))?
                .into_owned();
        } else if key.as_ref() == TEST_SUCCESS_ATTRIBUTE {
            let value = attribute
                .unescape_value()
                .map_err(|e| AutomationError::ParseError(format!("属性值解码失败: {}", e)))?;
            success = value.as_ref() == "true";
        } else if key.as_ref() == ERROR_COUNT_ATTRIBUTE {
            // ec 为错误计数：ec == "1" 代表采样失败
            let value = attribute
                .unescape_value()
                .map_err(|e| AutomationError::ParseError(format!("属性值解码失败: {}", e)))?;
            if value.as_ref() == "1" {
                success = false;
            }
        }
    }

    let status = if success {
        TestCaseStatus::Success
    } else {
        TestCaseStatus::Fail
    };
    Ok(TestCase::new(&name, status, None))
}

impl ResultParser for FunctionalTestResultParser {
    fn name(&self) -> &str {
        "FUNCTIONAL"
    }

    fn parse_results(&mut self) -> Result<()> {
        let files = list_files_with_extension(&self.location, "jtl")?;
        if files.is_empty() {
            warn!(
                "场景 {} 在 {} 下没有 jtl 结果文件",
                self.scenario.name,
                self.location.display()
            );
            return Ok(());
        }

        for file in files {
            self.parse_file(&file)?;
        }

        info!(
            "场景 {} 解析出 {} 条用例",
            self.scenario.name,
            self.scenario.test_cases.len()
        );
        Ok(())
    }

    fn persist_results(&self, artifact_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(artifact_dir)?;
        for file in list_files_with_extension(&self.location, "jtl")? {
            if let Some(file_name) = file.file_name() {
                std::fs::copy(&file, artifact_dir.join(file_name))?;
            }
        }
        Ok(())
    }

    fn into_scenario(self: Box<Self>) -> TestScenario {
        self.scenario
    }
}
