//! Output types returned by the combiner operations.

use crate::error::{CombinerError, ErrorKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a successful operation produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionOutput {
    /// Written files in page order. One entry for a PDF or a stitched image.
    pub output_paths: Vec<PathBuf>,
    pub stats: ConversionStats,
}

/// Counters and timings for one operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Number of source files given.
    pub input_files: usize,
    /// Pages appended or rasterised.
    pub pages: usize,
    /// Files written.
    pub output_files: usize,
    /// Bytes written across all output files.
    pub output_bytes: u64,
    pub total_duration_ms: u64,
    /// Time spent inside the PDF engine (open, render, append, save).
    pub engine_duration_ms: u64,
}

/// Final state of one operation, in the shape a host bridge reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConversionResult {
    Success { output_paths: Vec<PathBuf> },
    Failure { kind: ErrorKind, message: String },
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success { .. })
    }
}

impl From<CombinerError> for ConversionResult {
    fn from(e: CombinerError) -> Self {
        ConversionResult::Failure {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<Result<ConversionOutput, CombinerError>> for ConversionResult {
    fn from(result: Result<ConversionOutput, CombinerError>) -> Self {
        match result {
            Ok(output) => ConversionResult::Success {
                output_paths: output.output_paths,
            },
            Err(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_serialises_paths_in_order() {
        let output = ConversionOutput {
            output_paths: vec![PathBuf::from("out/image_1.png"), PathBuf::from("out/image_2.png")],
            stats: ConversionStats::default(),
        };
        let result = ConversionResult::from(Ok(output));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["output_paths"][1], "out/image_2.png");
    }

    #[test]
    fn failure_carries_kind_and_message() {
        let result = ConversionResult::from(Err(CombinerError::EmptyInput {
            what: "no image paths".into(),
        }));
        assert!(!result.is_success());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "failure");
        assert_eq!(json["kind"], "EMPTY_INPUT");
        assert!(json["message"].as_str().unwrap().contains("no image paths"));
    }
}
