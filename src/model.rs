//! # 歌词数据模型
//!
//! 解析器的输出模型，供播放界面做逐行高亮、逐字渐变与自动滚动。
//! 模型一经产出即不可变，归调用方所有。

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// 说话人标识。
///
/// Walaoke 性别扩展（`M:`/`F:`/`D:`）跨行粘性，直到出现新标签；
/// iTunes 双声部扩展（`v1:`/`v2:`/`[bg:]`）只作用于当前行。
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeakerEntity {
    /// Walaoke：男声
    Male,
    /// Walaoke：女声
    Female,
    /// Walaoke：合唱
    Duet,
    /// iTunes：背景人声
    Background,
    /// iTunes：声部一
    Voice1,
    /// iTunes：声部二
    Voice2,
    /// iTunes：声部二下的背景人声
    Voice2Background,
}

impl SpeakerEntity {
    /// 是否属于 Walaoke 性别扩展（跨行粘性）。
    #[must_use]
    pub const fn is_walaoke(self) -> bool {
        matches!(self, Self::Male | Self::Female | Self::Duet)
    }

    /// 是否属于第二声部。
    #[must_use]
    pub const fn is_voice2(self) -> bool {
        matches!(self, Self::Voice2 | Self::Voice2Background)
    }

    /// 是否为背景人声。
    #[must_use]
    pub const fn is_background(self) -> bool {
        matches!(self, Self::Background | Self::Voice2Background)
    }

    /// 是否按合唱（居中）渲染。只有 `Duet` 计入。
    #[must_use]
    pub const fn is_group(self) -> bool {
        matches!(self, Self::Duet)
    }
}

/// 一行歌词中带独立计时的一个词。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    /// 该词的起止时间（毫秒，闭区间）。
    pub time_range: RangeInclusive<u64>,
    /// 该词在行文本中的字符范围（按 Unicode 标量值计数，闭区间），
    /// 不含词首尾的空白。
    pub char_range: RangeInclusive<usize>,
    /// 是否为从右到左文本。本解析器总是填 `false`，由外部排版阶段回填。
    pub is_rtl: bool,
}

/// 一行带时间轴的歌词。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LyricLine {
    /// 行文本。
    pub text: String,
    /// 行激活时间（毫秒）。
    pub start_ms: u64,
    /// 行结束时间（毫秒，闭区间）。
    pub end_ms: u64,
    /// 逐字计时。没有逐字信息时为 `None`。
    pub words: Option<Vec<Word>>,
    /// 说话人。
    pub speaker: Option<SpeakerEntity>,
    /// 是否为上一行的翻译（与上一行起始时间相同）。
    pub is_translated: bool,
}

impl LyricLine {
    /// 该行是否可以点击跳转。
    #[must_use]
    pub fn is_clickable(&self) -> bool {
        !self.text.trim().is_empty()
    }

    /// 给定播放进度，返回行内当前激活的词的下标，
    /// 即最后一个起始时间不晚于 `position_ms` 的词。
    #[must_use]
    pub fn active_word_index(&self, position_ms: u64) -> Option<usize> {
        self.words
            .as_ref()?
            .iter()
            .rposition(|word| *word.time_range.start() <= position_ms)
    }
}

/// 解析结果：带时间轴的歌词，或纯文本歌词。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParsedLyrics {
    /// 无时间轴歌词，逐行保留文本与说话人。
    Unsynced {
        /// (文本, 说话人) 对。
        lines: Vec<(String, Option<SpeakerEntity>)>,
    },
    /// 带时间轴歌词，按 `start_ms` 升序排列。
    Synced {
        /// 歌词行。
        lines: Vec<LyricLine>,
    },
}

impl ParsedLyrics {
    /// 以 (文本, 说话人) 形式返回所有行，两种变体都可用。
    #[must_use]
    pub fn unsynced_text(&self) -> Vec<(String, Option<SpeakerEntity>)> {
        match self {
            Self::Unsynced { lines } => lines.clone(),
            Self::Synced { lines } => lines
                .iter()
                .map(|line| (line.text.clone(), line.speaker))
                .collect(),
        }
    }

    /// 带时间轴时返回行列表。
    #[must_use]
    pub const fn synced_lines(&self) -> Option<&Vec<LyricLine>> {
        match self {
            Self::Unsynced { .. } => None,
            Self::Synced { lines } => Some(lines),
        }
    }

    /// 给定播放进度，返回当前激活行的下标，
    /// 即最后一个 `start_ms` 不晚于 `position_ms` 的行。
    #[must_use]
    pub fn active_line_index(&self, position_ms: u64) -> Option<usize> {
        self.synced_lines()?
            .iter()
            .rposition(|line| line.start_ms <= position_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, start_ms: u64) -> LyricLine {
        LyricLine {
            text: text.to_string(),
            start_ms,
            end_ms: start_ms + 999,
            words: None,
            speaker: None,
            is_translated: false,
        }
    }

    #[test]
    fn test_only_duet_is_group() {
        assert!(SpeakerEntity::Duet.is_group());
        for speaker in [
            SpeakerEntity::Male,
            SpeakerEntity::Female,
            SpeakerEntity::Background,
            SpeakerEntity::Voice1,
            SpeakerEntity::Voice2,
            SpeakerEntity::Voice2Background,
        ] {
            assert!(!speaker.is_group());
        }
    }

    #[test]
    fn test_speaker_flags() {
        assert!(SpeakerEntity::Male.is_walaoke());
        assert!(!SpeakerEntity::Voice1.is_walaoke());
        assert!(SpeakerEntity::Voice2Background.is_voice2());
        assert!(SpeakerEntity::Voice2Background.is_background());
        assert!(!SpeakerEntity::Voice2.is_background());
    }

    #[test]
    fn test_active_line_index() {
        let lyrics = ParsedLyrics::Synced {
            lines: vec![line("a", 1000), line("b", 2000), line("c", 5000)],
        };
        assert_eq!(lyrics.active_line_index(0), None);
        assert_eq!(lyrics.active_line_index(1000), Some(0));
        assert_eq!(lyrics.active_line_index(2500), Some(1));
        assert_eq!(lyrics.active_line_index(99999), Some(2));
    }

    #[test]
    fn test_active_word_index() {
        let mut l = line("ab cd", 1000);
        l.words = Some(vec![
            Word {
                time_range: 1000..=1499,
                char_range: 0..=1,
                is_rtl: false,
            },
            Word {
                time_range: 1500..=1999,
                char_range: 3..=4,
                is_rtl: false,
            },
        ]);
        assert_eq!(l.active_word_index(999), None);
        assert_eq!(l.active_word_index(1200), Some(0));
        assert_eq!(l.active_word_index(3000), Some(1));
        assert_eq!(line("x", 0).active_word_index(100), None);
    }

    #[test]
    fn test_clickable_requires_text() {
        assert!(line("hello", 0).is_clickable());
        assert!(!line("   ", 0).is_clickable());
    }

    #[test]
    fn test_model_serde_roundtrip() {
        let lyrics = ParsedLyrics::Synced {
            lines: vec![LyricLine {
                text: "你好".to_string(),
                start_ms: 20,
                end_ms: 999,
                words: Some(vec![Word {
                    time_range: 20..=999,
                    char_range: 0..=1,
                    is_rtl: false,
                }]),
                speaker: Some(SpeakerEntity::Duet),
                is_translated: false,
            }],
        };
        let json = serde_json::to_string(&lyrics).unwrap();
        let back: ParsedLyrics = serde_json::from_str(&json).unwrap();
        assert_eq!(lyrics, back);
    }
}
