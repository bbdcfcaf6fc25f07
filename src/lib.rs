//! # lrc_processor
//!
//! 定时歌词解析引擎：把 LRC 系列歌词文本与 SubRip 字幕
//! 解析成统一的歌词模型，供播放界面做逐行高亮、逐字渐变。
//!
//! ## 支持的格式
//!
//! - 标准 LRC 与压缩 LRC（一行多个 `[mm:ss.xx]` 同步点）
//! - 增强 LRC（`<mm:ss.xx>` 逐字时间戳）
//! - Walaoke 性别扩展（`M:`/`F:`/`D:`）
//! - iTunes 双声部与背景人声扩展（`v1:`/`v2:`/`[bg:]`）
//! - SubRip (`.srt`) 字幕
//!
//! ## 设计
//!
//! 解析是输入文本加 [`ParseOptions`] 的纯函数。所有入口都不恐慌：
//! 无法解读的输入返回 `None`，局部损坏的结构被尽量抢救，
//! 没有时间戳的输入降级为未同步歌词。

pub mod error;
pub mod legacy;
pub mod model;
pub mod options;

mod parser;
mod srt;

pub use error::ConvertError;
pub use legacy::LegacyLyric;
pub use model::{LyricLine, ParsedLyrics, SpeakerEntity, Word};
pub use options::ParseOptions;
pub use parser::parse_lrc;
pub use srt::parse_srt;

/// 按格式探测顺序解析歌词文本。
///
/// 先尝试 SubRip，再尝试 LRC 系列。LRC 解析器接受一切非空文本
/// （最坏情况降级为未同步歌词），所以只有空白输入返回 `None`。
#[must_use]
pub fn parse_lyrics(text: &str, options: &ParseOptions) -> Option<ParsedLyrics> {
    parse_srt(text, options).or_else(|| parse_lrc(text, options))
}
