//! # LRC 系列歌词解析器
//!
//! 两阶段流水线：词法分析器把原始文本切成记号序列，
//! 语义解析器再把记号折叠成歌词模型。两阶段都不会恐慌，
//! 完全无法解读的输入返回 `None`。
//!
//! 支持标准 LRC、压缩 LRC（一行多个同步点）、增强 LRC
//! （`<mm:ss.xx>` 逐字时间戳）、Walaoke 性别扩展与
//! iTunes 双声部/背景人声扩展。

mod resolver;
mod tokenizer;

use crate::model::ParsedLyrics;
use crate::options::ParseOptions;

/// 解析 LRC 系列歌词文本。
///
/// 输入为空白或没有任何可以成为歌词的内容时返回 `None`。
/// 没有任何时间戳的输入降级为未同步歌词。
#[must_use]
pub fn parse_lrc(text: &str, options: &ParseOptions) -> Option<ParsedLyrics> {
    let tokens = tokenizer::tokenize(text, options.multi_line)?;
    Some(resolver::resolve(&tokens, options.trim_whitespace))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SpeakerEntity;

    fn parse(text: &str) -> ParsedLyrics {
        parse_lrc(text, &ParseOptions::default()).expect("解析失败")
    }

    fn synced(text: &str) -> Vec<crate::model::LyricLine> {
        match parse(text) {
            ParsedLyrics::Synced { lines } => lines,
            ParsedLyrics::Unsynced { .. } => panic!("应当解析出带时间轴的歌词"),
        }
    }

    #[test]
    fn test_blank_input_is_none() {
        assert_eq!(parse_lrc("", &ParseOptions::default()), None);
        assert_eq!(parse_lrc("  \n\t\n", &ParseOptions::default()), None);
    }

    #[test]
    fn test_plain_text_becomes_unsynced() {
        let ParsedLyrics::Unsynced { lines } = parse("hello\nworld") else {
            panic!("应当解析出未同步歌词");
        };
        assert_eq!(
            lines,
            vec![("hello".to_string(), None), ("world".to_string(), None)]
        );
    }

    #[test]
    fn test_standard_lrc_end_to_end() {
        let lines = synced("[00:01.00]first\n[00:02.00]second\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "first");
        assert_eq!(lines[0].start_ms, 1000);
        assert_eq!(lines[0].end_ms, 1999);
        assert_eq!(lines[1].start_ms, 2000);
        assert_eq!(lines[1].end_ms, u64::MAX);
    }

    #[test]
    fn test_word_synced_line_end_to_end() {
        let lines = synced("[00:00.100][00:10.100]hello<00:00.200>world<00:01.00>lol");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text, "helloworldlol");
        let words = lines[0].words.as_ref().unwrap();
        assert_eq!(words[0].time_range, 100..=199);
        assert_eq!(words[1].time_range, 200..=999);
        assert_eq!(words[2].time_range, 1000..=1270);
        assert_eq!(lines[1].start_ms, 10_100);
    }

    #[test]
    fn test_speaker_tags_end_to_end() {
        let lines = synced("[00:01.00]F: her line\n[00:02.00]M: his line\n");
        assert_eq!(lines[0].speaker, Some(SpeakerEntity::Female));
        // 前缀标签只吃掉 "F:"，标签后的空格未开启修剪时原样保留
        assert_eq!(lines[0].text, " her line");
        assert_eq!(lines[1].speaker, Some(SpeakerEntity::Male));
    }

    #[test]
    fn test_speaker_tag_trailing_space_trimmed_with_option() {
        let options = ParseOptions {
            trim_whitespace: true,
            ..ParseOptions::default()
        };
        let lyrics = parse_lrc("[00:01.00]F: her line\n", &options).expect("解析失败");
        assert_eq!(lyrics.synced_lines().expect("应当带时间轴")[0].text, "her line");
    }

    #[test]
    fn test_background_line_end_to_end() {
        // [bg:] 行直接跟在 v2: 行之后才会被归入第二声部
        let lines = synced("[00:00.50]intro\n[00:01.00]v2:lead\n[bg:<00:02.00>behind<00:03.00>]\n");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].speaker, Some(SpeakerEntity::Voice2));
        assert_eq!(lines[2].speaker, Some(SpeakerEntity::Voice2Background));
        assert_eq!(lines[2].text, "behind");
        assert_eq!(lines[2].start_ms, 2000);
        let words = lines[2].words.as_ref().unwrap();
        assert_eq!(words[0].time_range, 2000..=2999);
    }

    #[test]
    fn test_multi_line_mode_merges_continuations() {
        let options = ParseOptions {
            multi_line: true,
            ..ParseOptions::default()
        };
        let lyrics = parse_lrc("[00:01.00]hello\nworld\n[00:02.00]bye\n", &options)
            .expect("解析失败");
        let lines = lyrics.synced_lines().expect("应当带时间轴");
        assert_eq!(lines[0].text, "hello\nworld");
        assert_eq!(lines[1].text, "bye");
    }
}
