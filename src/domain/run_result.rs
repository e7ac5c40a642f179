// ==========================================
// 数据管道 - 运行结果与阶段状态
// ==========================================
// 职责: 定义编排器的状态机阶段、校验结论、运行结果记录
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// 加载失败时写入结果的 message
pub const LOAD_FAILED_MESSAGE: &str = "Load failed";

// ==========================================
// 管道阶段 (Pipeline Stage)
// ==========================================
// Extracting → Transforming → Loading → Validating → Done
// 任一阶段可进入 Failed（吸收态）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    Extracting,
    Transforming,
    Loading,
    Validating,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Extracting => write!(f, "EXTRACTING"),
            PipelineStage::Transforming => write!(f, "TRANSFORMING"),
            PipelineStage::Loading => write!(f, "LOADING"),
            PipelineStage::Validating => write!(f, "VALIDATING"),
            PipelineStage::Done => write!(f, "DONE"),
            PipelineStage::Failed => write!(f, "FAILED"),
        }
    }
}

// ==========================================
// 校验结论 (Validation Outcome)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub message: String,
}

impl ValidationOutcome {
    /// count > 0
    pub fn passed(count: i64) -> Self {
        Self {
            is_valid: true,
            message: format!("Validation passed: {} rows", count),
        }
    }

    /// count == 0
    pub fn no_data() -> Self {
        Self {
            is_valid: false,
            message: "Validation failed: No data".to_string(),
        }
    }

    /// 查询本身失败（如表不存在）
    pub fn error(cause: impl fmt::Display) -> Self {
        Self {
            is_valid: false,
            message: format!("Validation error: {}", cause),
        }
    }

    pub fn into_tuple(self) -> (bool, String) {
        (self.is_valid, self.message)
    }
}

// ==========================================
// 运行结论: message / error 二选一
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunOutcome {
    Message(String),
    Error(String),
}

// ==========================================
// 运行结果 (Pipeline Run Result)
// ==========================================
// 每次编排调用生成一次，返回后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRunResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_table: Option<String>,
    pub rows_processed: usize,
    pub duration_seconds: f64,
    #[serde(flatten)]
    pub outcome: RunOutcome,
}

impl PipelineRunResult {
    /// 加载/校验完成后的结果（success 跟随校验结论）
    pub fn completed(
        input_file: impl Into<String>,
        output_table: impl Into<String>,
        rows_processed: usize,
        duration_seconds: f64,
        validation: ValidationOutcome,
    ) -> Self {
        Self {
            success: validation.is_valid,
            input_file: Some(input_file.into()),
            output_table: Some(output_table.into()),
            rows_processed,
            duration_seconds,
            outcome: RunOutcome::Message(validation.message),
        }
    }

    /// 加载失败：跳过校验
    pub fn load_failed(
        input_file: impl Into<String>,
        output_table: impl Into<String>,
        rows_processed: usize,
        duration_seconds: f64,
    ) -> Self {
        Self {
            success: false,
            input_file: Some(input_file.into()),
            output_table: Some(output_table.into()),
            rows_processed,
            duration_seconds,
            outcome: RunOutcome::Message(LOAD_FAILED_MESSAGE.to_string()),
        }
    }

    /// 抽取/转换失败或未捕获异常
    pub fn failed(error: impl fmt::Display, duration_seconds: f64) -> Self {
        Self {
            success: false,
            input_file: None,
            output_table: None,
            rows_processed: 0,
            duration_seconds,
            outcome: RunOutcome::Error(error.to_string()),
        }
    }

    pub fn message(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Message(m) => Some(m),
            RunOutcome::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Message(_) => None,
            RunOutcome::Error(e) => Some(e),
        }
    }

    /// 进程退出码：成功 0，失败 1
    pub fn exit_code(&self) -> i32 {
        if self.success {
            0
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_messages() {
        assert_eq!(
            ValidationOutcome::passed(3).into_tuple(),
            (true, "Validation passed: 3 rows".to_string())
        );
        assert_eq!(
            ValidationOutcome::no_data().into_tuple(),
            (false, "Validation failed: No data".to_string())
        );
        assert_eq!(
            ValidationOutcome::error("no such table: t").message,
            "Validation error: no such table: t"
        );
    }

    #[test]
    fn test_completed_result_json_shape() {
        let result = PipelineRunResult::completed(
            "in.csv",
            "out",
            3,
            0.25,
            ValidationOutcome::passed(3),
        );
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["input_file"], "in.csv");
        assert_eq!(json["output_table"], "out");
        assert_eq!(json["rows_processed"], 3);
        assert_eq!(json["message"], "Validation passed: 3 rows");
        assert!(json.get("error").is_none());
        assert_eq!(result.exit_code(), 0);
    }

    #[test]
    fn test_failed_result_json_shape() {
        let result = PipelineRunResult::failed("文件不存在: x.csv", 0.01);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "文件不存在: x.csv");
        assert!(json.get("message").is_none());
        assert!(json.get("input_file").is_none());
        assert!(json.get("output_table").is_none());
        assert_eq!(result.error(), Some("文件不存在: x.csv"));
        assert_eq!(result.message(), None);
        assert_eq!(result.exit_code(), 1);
    }

    #[test]
    fn test_load_failed_result() {
        let result = PipelineRunResult::load_failed("a.csv", "t", 4, 0.1);
        assert!(!result.success);
        assert_eq!(result.message(), Some("Load failed"));
        assert_eq!(result.rows_processed, 4);
        assert_eq!(result.output_table.as_deref(), Some("t"));
    }

    #[test]
    fn test_result_round_trips_through_json() {
        let result = PipelineRunResult::completed("a.csv", "t", 0, 0.5, ValidationOutcome::no_data());
        let text = serde_json::to_string(&result).unwrap();
        let back: PipelineRunResult = serde_json::from_str(&text).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_stage_terminal() {
        assert!(PipelineStage::Done.is_terminal());
        assert!(PipelineStage::Failed.is_terminal());
        assert!(!PipelineStage::Loading.is_terminal());
    }
}
