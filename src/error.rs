//! # 错误类型定义

use thiserror::Error;

/// 歌词解析内部可能发生的错误。
///
/// 公共入口统一用 `Option` 表达"不是这种格式"，
/// 这个类型只出现在内部的 `Result` 接缝处，
/// 到达边界时被记录并映射为 `None`。
#[derive(Error, Debug)]
pub enum ConvertError {
    /// 无效的时间戳格式。
    #[error("无效的时间戳: {0}")]
    InvalidTime(String),
    /// 整数解析错误。
    #[error("解析错误: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
    /// SubRip 字幕块结构不符合预期。
    #[error("无效的 SubRip 字幕块 (第 {line} 行): {reason}")]
    InvalidSrtCue {
        /// 出错位置的行号（从 1 开始）。
        line: usize,
        /// 具体原因。
        reason: String,
    },
}
