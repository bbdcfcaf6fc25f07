//! # 传统列表投影
//!
//! 把解析结果投影成旧式的平面列表，服务只认识
//! "(可选时间戳, 文本)" 三元组的下游接口。

use serde::{Deserialize, Serialize};

use crate::model::ParsedLyrics;

/// 旧式歌词条目。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyLyric {
    /// 行起始时间（毫秒）。未同步歌词为 `None`。
    pub timestamp: Option<i64>,
    /// 行文本。
    pub text: String,
    /// 是否为翻译行。
    pub is_translation: bool,
}

impl ParsedLyrics {
    /// 投影为旧式平面列表。
    ///
    /// 带时间轴的歌词逐行映射；未同步歌词整体合并为
    /// 一个没有时间戳的条目，行间以 `\n` 连接。
    #[must_use]
    pub fn to_legacy(&self) -> Vec<LegacyLyric> {
        match self {
            Self::Synced { lines } => lines
                .iter()
                .map(|line| LegacyLyric {
                    timestamp: Some(i64::try_from(line.start_ms).unwrap_or(i64::MAX)),
                    text: line.text.clone(),
                    is_translation: line.is_translated,
                })
                .collect(),
            Self::Unsynced { lines } => vec![LegacyLyric {
                timestamp: None,
                text: lines
                    .iter()
                    .map(|(text, _)| text.as_str())
                    .collect::<Vec<_>>()
                    .join("\n"),
                is_translation: false,
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LyricLine;

    fn line(text: &str, start_ms: u64, is_translated: bool) -> LyricLine {
        LyricLine {
            text: text.to_string(),
            start_ms,
            end_ms: start_ms.saturating_add(999),
            words: None,
            speaker: None,
            is_translated,
        }
    }

    #[test]
    fn test_synced_projection() {
        let lyrics = ParsedLyrics::Synced {
            lines: vec![line("hello", 1000, false), line("你好", 1000, true)],
        };
        let legacy = lyrics.to_legacy();
        assert_eq!(legacy.len(), 2);
        assert_eq!(legacy[0].timestamp, Some(1000));
        assert_eq!(legacy[0].text, "hello");
        assert!(!legacy[0].is_translation);
        assert!(legacy[1].is_translation);
    }

    #[test]
    fn test_unsynced_collapses_to_single_entry() {
        let lyrics = ParsedLyrics::Unsynced {
            lines: vec![("hello".to_string(), None), ("world".to_string(), None)],
        };
        let legacy = lyrics.to_legacy();
        assert_eq!(legacy.len(), 1);
        assert_eq!(legacy[0].timestamp, None);
        assert_eq!(legacy[0].text, "hello\nworld");
    }

    #[test]
    fn test_huge_start_saturates() {
        let lyrics = ParsedLyrics::Synced {
            lines: vec![line("end", u64::MAX, false)],
        };
        assert_eq!(lyrics.to_legacy()[0].timestamp, Some(i64::MAX));
    }
}
