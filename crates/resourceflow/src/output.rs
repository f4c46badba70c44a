//! Result output
//!
//! stdout carries only the result JSON; human-readable status goes to
//! stderr so the output can be piped.

use colored::Colorize;
use resourceflow_core::OperationResult;
use serde::Serialize;

/// Prints the result and returns whether it counts as a success for the exit code
pub fn print_result<R: Serialize, O: Serialize>(
    result: &OperationResult<R, O>,
) -> anyhow::Result<bool> {
    println!("{}", serde_json::to_string_pretty(result)?);

    match result {
        OperationResult::Success { .. } => {
            eprintln!("{}", "✓ 完了".green());
            Ok(true)
        }
        OperationResult::InProgress { delay_seconds, .. } => {
            eprintln!(
                "{}",
                format!("… 処理中です。{} 秒後に再実行してください", delay_seconds).yellow()
            );
            Ok(true)
        }
        OperationResult::Failed {
            error_kind,
            message,
        } => {
            eprintln!("{} {}: {}", "✗ 失敗".red().bold(), error_kind, message);
            Ok(false)
        }
    }
}

pub fn waiting(delay_seconds: u64) {
    eprintln!(
        "{}",
        format!("  リソースの状態が安定するまで待機中 ({} 秒)...", delay_seconds).dimmed()
    );
}
