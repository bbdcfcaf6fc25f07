//! # 语义解析器
//!
//! 消费词法记号序列，产出可供播放使用的歌词模型。
//!
//! 行内状态（待定词缓冲、压缩同步点、粘性说话人等）集中放在
//! 一个显式的累加器结构里，沿记号序列折叠。这样没有隐藏在
//! 解析器对象字段里的耦合，用合成记号序列就能直接测试。

use tracing::warn;

use super::tokenizer::Token;
use crate::model::{LyricLine, ParsedLyrics, SpeakerEntity, Word};

/// 逐词估算结束时间用的累加器：本行已产出词的每字符毫秒数均值。
/// 每次换行冲刷后重置。
#[derive(Debug, Default)]
struct PaceEstimator {
    ratio_sum: f64,
    samples: usize,
}

impl PaceEstimator {
    const DEFAULT_MS_PER_CHAR: f64 = 100.0;

    fn record(&mut self, word: &Word) {
        let duration = word.time_range.end() - word.time_range.start() + 1;
        let chars = word.char_range.end() - word.char_range.start() + 1;
        self.ratio_sum += duration as f64 / chars as f64;
        self.samples += 1;
    }

    fn estimate(&self, char_count: usize) -> u64 {
        let ms_per_char = if self.samples == 0 {
            Self::DEFAULT_MS_PER_CHAR
        } else {
            self.ratio_sum / self.samples as f64
        };
        (ms_per_char * char_count as f64) as u64
    }
}

/// 单行解析状态，每次换行冲刷后复位。
#[derive(Debug)]
struct LineAccumulator {
    /// 行级同步点（已应用 offset）。
    last_sync: Option<u64>,
    /// 最近的逐字同步点（已应用 offset）。
    last_word_sync: Option<u64>,
    /// 当前说话人。只有 Walaoke 说话人跨行保留。
    speaker: Option<SpeakerEntity>,
    /// 上一个逐字同步点之后是否出现过歌词文本。
    had_lyric_since_word_sync: bool,
    /// 本行是否出现过逐字同步点。
    had_word_sync: bool,
    /// 待定词缓冲：(起始毫秒, 文本)。文本为 `None` 的是
    /// 只为保住前一个词结束时间而存在的占位词。
    entries: Vec<(u64, Option<String>)>,
    /// 同一概念行上重复同步点的时间戳（压缩 LRC）。
    compressed: Vec<u64>,
}

impl LineAccumulator {
    fn new() -> Self {
        Self {
            last_sync: None,
            last_word_sync: None,
            speaker: None,
            had_lyric_since_word_sync: true,
            had_word_sync: false,
            entries: Vec::new(),
            compressed: Vec::new(),
        }
    }

    /// 换行后的复位。Walaoke 说话人在显式更换前一直有效。
    fn reset_for_next_line(&mut self) {
        self.entries.clear();
        self.compressed.clear();
        self.last_sync = None;
        self.last_word_sync = None;
        self.had_word_sync = false;
        self.had_lyric_since_word_sync = true;
        if !self.speaker.is_some_and(SpeakerEntity::is_walaoke) {
            self.speaker = None;
        }
    }
}

/// 把记号序列解析为歌词模型。
///
/// 序列中没有任何同步点时产出未同步歌词，否则运行行状态机
/// 产出带时间轴的歌词。
pub(crate) fn resolve(tokens: &[Token], trim_enabled: bool) -> ParsedLyrics {
    if tokens.iter().any(Token::is_timed) {
        resolve_synced(tokens, trim_enabled)
    } else {
        resolve_unsynced(tokens)
    }
}

fn resolve_unsynced(tokens: &[Token]) -> ParsedLyrics {
    let mut speaker: Option<SpeakerEntity> = None;
    let mut lines: Vec<(String, Option<SpeakerEntity>)> = Vec::new();
    for token in tokens {
        match token {
            Token::SpeakerTag(tag) => speaker = Some(*tag),
            Token::InvalidText(text) => {
                lines.push((text.clone(), speaker));
                if !speaker.is_some_and(SpeakerEntity::is_walaoke) {
                    speaker = None;
                }
            }
            other => {
                // 词法分析器的降级展平保证这里只剩文本和说话人标签
                debug_assert!(false, "未同步歌词中出现意外记号: {other:?}");
            }
        }
    }
    trim_blank_edges(&mut lines, |(text, _)| text.trim().is_empty());
    let default_male = default_walaoke_male(lines.iter().map(|(_, speaker)| *speaker));
    if default_male {
        for (_, speaker) in &mut lines {
            if speaker.is_none() {
                *speaker = Some(SpeakerEntity::Male);
            }
        }
    }
    ParsedLyrics::Unsynced { lines }
}

fn resolve_synced(tokens: &[Token], trim_enabled: bool) -> ParsedLyrics {
    let mut lines: Vec<LyricLine> = Vec::new();
    let mut offset_ms: i64 = 0;
    let mut acc = LineAccumulator::new();
    let mut sync_streak = 0usize;

    for token in tokens {
        if matches!(token, Token::SyncPoint(_)) {
            sync_streak += 1;
        } else {
            sync_streak = 0;
        }
        match token {
            Token::Metadata { name, value } if name == "offset" => {
                // 正的 offset 表示歌词要提前播放，内部取反后叠加
                match value.parse::<i64>() {
                    Ok(value) => offset_ms = -value,
                    Err(_) => warn!("无法解析 offset 标签的值: {value:?}"),
                }
            }
            Token::SyncPoint(ts) => {
                let ts = apply_offset(*ts, offset_ms);
                if sync_streak > 1 {
                    acc.compressed.push(ts);
                } else {
                    debug_assert!(
                        acc.compressed.is_empty(),
                        "同步点连击为 1 时压缩缓冲必须为空"
                    );
                    acc.last_sync = Some(ts);
                }
            }
            Token::SpeakerTag(tag) => acc.speaker = Some(*tag),
            Token::WordSyncPoint(ts) => {
                if !acc.had_lyric_since_word_sync
                    && let Some(previous) = acc.last_word_sync
                {
                    // 占位词，只用来保住上一个词的结束时间
                    acc.entries.push((previous, None));
                }
                let ts = apply_offset(*ts, offset_ms);
                acc.last_word_sync = Some(ts);
                if acc.last_sync.is_none() {
                    acc.last_sync = Some(ts);
                }
                acc.had_lyric_since_word_sync = false;
                acc.had_word_sync = true;
            }
            Token::LyricText(text) => {
                acc.had_lyric_since_word_sync = true;
                let start = acc.last_word_sync.or(acc.last_sync);
                debug_assert!(start.is_some(), "歌词文本必然有管辖它的同步点");
                acc.entries
                    .push((start.unwrap_or_default(), Some(text.clone())));
            }
            Token::NewLine | Token::SyntheticNewLine => {
                flush_line(&acc, trim_enabled, &mut lines);
                acc.reset_for_next_line();
            }
            Token::Metadata { .. } | Token::InvalidText(_) => {}
        }
    }

    finalize_lines(&mut lines);
    ParsedLyrics::Synced { lines }
}

fn apply_offset(timestamp_ms: u64, offset_ms: i64) -> u64 {
    (timestamp_ms as i64).saturating_add(offset_ms).max(0) as u64
}

/// 换行冲刷：物化本行的词列表，拼出行文本，按压缩同步点复制行。
fn flush_line(acc: &LineAccumulator, trim_enabled: bool, lines: &mut Vec<LyricLine>) {
    // 只有多个词缓冲条目或本行出现过逐字同步点时才物化词列表
    let mut words = if acc.entries.len() > 1 || acc.had_word_sync {
        Some(build_words(&acc.entries, acc.last_word_sync))
    } else {
        None
    };
    if acc.entries.is_empty() && acc.last_word_sync.is_none() && acc.last_sync.is_none() {
        return;
    }
    let mut text: String = acc
        .entries
        .iter()
        .map(|(_, text)| text.as_deref().unwrap_or(""))
        .collect();
    if trim_enabled {
        trim_line(&mut text, &mut words);
    }
    let start = acc
        .entries
        .first()
        .map(|(start, _)| *start)
        .or(acc.last_word_sync)
        .or(acc.last_sync)
        .unwrap_or_default();
    let line = LyricLine {
        text,
        start_ms: start,
        end_ms: 0, // 之后统一回填
        words,
        speaker: acc.speaker,
        is_translated: false, // 之后统一回填
    };
    // 压缩 LRC 的重复行：整体平移时间，字符范围保持不变
    let duplicates: Vec<LyricLine> = acc
        .compressed
        .iter()
        .map(|&compressed_start| {
            let delta = compressed_start.wrapping_sub(start);
            let mut duplicate = line.clone();
            duplicate.start_ms = compressed_start;
            duplicate.words = line.words.as_ref().map(|words| {
                words
                    .iter()
                    .map(|word| Word {
                        time_range: word.time_range.start().wrapping_add(delta)
                            ..=word.time_range.end().wrapping_add(delta),
                        char_range: word.char_range.clone(),
                        is_rtl: word.is_rtl,
                    })
                    .collect()
            });
            duplicate
        })
        .collect();
    lines.push(line);
    lines.extend(duplicates);
}

/// 由词缓冲物化词列表。
///
/// 词的结束时间依次取：下一个条目的起始时间减 1 毫秒；
/// 行尾专门标记结束的逐字同步点减 1 毫秒；
/// 按本行已有词的每字符毫秒数外推。
fn build_words(entries: &[(u64, Option<String>)], last_word_sync: Option<u64>) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();
    let mut pace = PaceEstimator::default();
    let mut char_cursor = 0usize;
    for (i, (start, text)) in entries.iter().enumerate() {
        let Some(text) = text else {
            continue; // 占位词只携带时间
        };
        let char_len = text.chars().count();
        let entry_start_index = char_cursor;
        char_cursor += char_len;
        // 字符范围不含词首尾的空白。空白没有明确的 bidi 方向，
        // 外部排版阶段依赖范围边界落在 bidi 过渡点上，
        // 渐变渲染也要据此判断下一个字符是否真的会被画出来。
        let leading_ws = char_len - text.trim_start().chars().count();
        let trimmed_len = text.trim().chars().count();
        let start_index = entry_start_index + leading_ws;
        let end_index = start_index + trimmed_len;
        if start_index == end_index {
            continue; // 纯空白条目
        }
        let end_inclusive = if let Some((next_start, _)) = entries.get(i + 1) {
            next_start.saturating_sub(1)
        } else if let Some(word_sync) = last_word_sync
            && word_sync > *start
        {
            word_sync - 1
        } else {
            start + pace.estimate(trimmed_len)
        };
        if end_inclusive > *start {
            let word = Word {
                time_range: *start..=end_inclusive,
                char_range: start_index..=end_index - 1,
                is_rtl: false, // 由外部排版阶段回填
            };
            pace.record(&word);
            words.push(word);
        }
    }
    words
}

/// 修剪行文本首尾空白，按删掉的前导字符数平移、裁剪词的字符范围，
/// 完全落在修剪后文本之外的词直接丢弃。
fn trim_line(text: &mut String, words: &mut Option<Vec<Word>>) {
    let original_chars = text.chars().count();
    let start_trimmed = text.trim_start();
    let start_diff = original_chars - start_trimmed.chars().count();
    let trimmed = start_trimmed.trim_end().to_string();
    let trimmed_chars = trimmed.chars().count();
    *text = trimmed;
    if let Some(words) = words.as_mut() {
        words.retain_mut(|word| {
            let first = *word.char_range.start();
            let last = *word.char_range.end();
            if last < start_diff || first >= start_diff + trimmed_chars {
                return false;
            }
            let new_first = first.saturating_sub(start_diff);
            let new_last = (last - start_diff).min(trimmed_chars - 1);
            word.char_range = new_first..=new_last;
            true
        });
    }
}

fn last_word_end(line: &LyricLine) -> Option<u64> {
    line.words
        .as_ref()
        .and_then(|words| words.last())
        .map(|word| *word.time_range.end())
}

/// 收尾：排序、修剪首尾空行、回填结束时间与翻译标记、
/// 处理 Walaoke 的默认男声。
fn finalize_lines(lines: &mut Vec<LyricLine>) {
    lines.sort_by_key(|line| line.start_ms);
    trim_blank_edges(lines, |line| line.text.trim().is_empty());
    let default_male = default_walaoke_male(lines.iter().map(|line| line.speaker));

    let mut computed: Vec<(u64, bool)> = Vec::with_capacity(lines.len());
    let mut previous_start: Option<u64> = None;
    for line in lines.iter() {
        let is_translated = previous_start == Some(line.start_ms);
        let end = last_word_end(line)
            .or_else(|| {
                // 翻译行借用同一起始时间最早那行的逐字结束时间
                if is_translated {
                    lines
                        .iter()
                        .find(|other| other.start_ms == line.start_ms)
                        .and_then(last_word_end)
                } else {
                    None
                }
            })
            .or_else(|| {
                lines
                    .iter()
                    .find(|other| other.start_ms > line.start_ms)
                    .map(|other| other.start_ms - 1)
            })
            .unwrap_or(u64::MAX);
        computed.push((end, is_translated));
        previous_start = Some(line.start_ms);
    }
    for (line, (end, is_translated)) in lines.iter_mut().zip(computed) {
        line.end_ms = end;
        line.is_translated = is_translated;
        if default_male && line.speaker.is_none() {
            line.speaker = Some(SpeakerEntity::Male);
        }
    }
}

/// 所有带说话人的条目都是 Walaoke 且一个非 Walaoke 都没有时，
/// 未指定说话人的条目默认男声（Walaoke 的约定）。
fn default_walaoke_male<I>(mut speakers: I) -> bool
where
    I: Iterator<Item = Option<SpeakerEntity>> + Clone,
{
    speakers
        .clone()
        .any(|speaker| speaker.is_some_and(SpeakerEntity::is_walaoke))
        && !speakers.any(|speaker| speaker.is_some_and(|speaker| !speaker.is_walaoke()))
}

fn trim_blank_edges<T>(items: &mut Vec<T>, is_blank: impl Fn(&T) -> bool) {
    while items.first().is_some_and(|item| is_blank(item)) {
        items.remove(0);
    }
    while items.last().is_some_and(|item| is_blank(item)) {
        items.pop();
    }
}
