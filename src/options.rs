//! # 解析选项

use serde::{Deserialize, Serialize};

/// 歌词解析选项。
///
/// 解析是输入文本加这两个开关的纯函数，同样的输入必然得到同样的模型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParseOptions {
    /// 是否去除每行歌词首尾的空白字符。
    /// 开启时逐字歌词的字符范围会随之平移、裁剪。
    pub trim_whitespace: bool,
    /// 多行模式：两个同步点之间的所有文本行都并入前一个同步点，
    /// 以 `\n` 连接。用于抢救不符合任何规范但人类可读的歌词。
    pub multi_line: bool,
}
