//! # SubRip (SRT) 字幕适配器
//!
//! 把 SubRip 字幕当作逐行同步歌词接入同一个模型。
//! 字幕块自带起止时间，所以不需要语义解析阶段推导结束时间；
//! 翻译行同样按起始时间相同判定。

use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use crate::error::ConvertError;
use crate::model::{LyricLine, ParsedLyrics};
use crate::options::ParseOptions;

static SRT_TIMING_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:(\d+):)?(\d{1,2}):(\d{1,2})[,.](\d{1,3})\s*-->\s*(?:(\d+):)?(\d{1,2}):(\d{1,2})[,.](\d{1,3})",
    )
    .expect("未能编译 SRT_TIMING_REGEX")
});

/// 一个已解析的字幕块。
#[derive(Debug)]
struct SrtCue {
    start_ms: u64,
    end_ms: u64,
    text: String,
}

/// 解析 SubRip 字幕文本。
///
/// 输入不以 `1` 开头的序号行起始，或任何一个字幕块结构损坏时
/// 返回 `None`，交由下一个解析器尝试。
#[must_use]
pub fn parse_srt(text: &str, options: &ParseOptions) -> Option<ParsedLyrics> {
    if !(text.starts_with("1\n") || text.starts_with("1\r")) {
        return None;
    }
    let cues = match parse_cues(text) {
        Ok(cues) => cues,
        Err(err) => {
            warn!("SubRip 解析失败: {err}");
            return None;
        }
    };
    if cues.is_empty() {
        return None;
    }
    let mut lines: Vec<LyricLine> = Vec::with_capacity(cues.len());
    let mut previous_start: Option<u64> = None;
    for cue in cues {
        let mut text = cue.text;
        if options.trim_whitespace {
            text = text.trim().to_string();
        }
        lines.push(LyricLine {
            text,
            start_ms: cue.start_ms,
            end_ms: cue.end_ms,
            words: None,
            speaker: None,
            is_translated: previous_start == Some(cue.start_ms),
        });
        previous_start = Some(cue.start_ms);
    }
    Some(ParsedLyrics::Synced { lines })
}

fn parse_cues(text: &str) -> Result<Vec<SrtCue>, ConvertError> {
    let mut cues = Vec::new();
    let mut lines = text.lines().enumerate().peekable();
    while let Some((line_number, line)) = lines.next() {
        if line.trim().is_empty() {
            continue;
        }
        // 序号行。序号本身不参与排序，只校验它确实是数字。
        line.trim().parse::<u64>().map_err(|_| ConvertError::InvalidSrtCue {
            line: line_number + 1,
            reason: format!("期望字幕序号, 得到 {line:?}"),
        })?;
        let (_, timing_line) =
            lines.next().ok_or_else(|| ConvertError::InvalidSrtCue {
                line: line_number + 1,
                reason: "序号行之后缺少时间轴行".to_string(),
            })?;
        let caps = SRT_TIMING_REGEX
            .captures(timing_line.trim())
            .ok_or_else(|| ConvertError::InvalidTime(timing_line.to_string()))?;
        let start_ms = timecode_ms(&caps, 1)?;
        let end_ms = timecode_ms(&caps, 5)?;
        let mut text_lines: Vec<&str> = Vec::new();
        while let Some(&(_, text_line)) = lines.peek() {
            if text_line.trim().is_empty() {
                break;
            }
            text_lines.push(text_line);
            lines.next();
        }
        cues.push(SrtCue {
            start_ms,
            end_ms,
            text: text_lines.join("\n"),
        });
    }
    Ok(cues)
}

/// 从时间轴行的捕获组中取出一侧时间码，换算成毫秒。
/// 毫秒字段不足三位时按右侧补零处理（`,5` 等于 500 毫秒）。
fn timecode_ms(caps: &regex::Captures<'_>, base: usize) -> Result<u64, ConvertError> {
    let hours: u64 = caps
        .get(base)
        .map_or(Ok(0), |m| m.as_str().parse())?;
    let minutes: u64 = caps[base + 1].parse()?;
    let seconds: u64 = caps[base + 2].parse()?;
    let millis_str = &caps[base + 3];
    let millis: u64 =
        millis_str.parse::<u64>()? * 10u64.pow(3 - u32::try_from(millis_str.len()).unwrap_or(3));
    Ok(((hours * 60 + minutes) * 60 + seconds) * 1000 + millis)
}
