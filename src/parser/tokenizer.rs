//! # LRC 词法分析器
//!
//! 把原始歌词文本从左到右扫描为扁平有序的记号序列。
//! 需要兼容的方言包括：
//!  - 标准 LRC：`[00:11.22] 歌词`
//!  - 压缩 LRC（多个时间标签共享一行文本）：`[00:11.22][00:15.33] 歌词`
//!  - 全零时间标签的无效 LRC
//!  - 完全没有标签的纯文本歌词
//!  - 时间戳的各种写法：`[00:11]` `[00:11:22]` `[00:11.22]` `[00:11.222]` `[00:11:222]`
//!  - 多行模式：两个同步点之间的所有行都算作前一个同步点的文本
//!  - 增强型 LRC（逐字时间戳）：`[00:11.22] <00:11.22>我<00:12.85>是<00:13.23>歌词`
//!  - 没有行级同步点、只有逐字时间戳的增强型 LRC
//!  - Walaoke 性别扩展（M:/F:/D:）
//!  - iTunes 双声部扩展（v1:/v2:/[bg: ]）
//!  - 头部元数据标签（如 `[offset:]`）

use std::sync::LazyLock;

use regex::Regex;

use crate::model::SpeakerEntity;

/// 行级时间标签，如 `[00:11.22]`。
static TIME_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d{2}):(\d{2})([.:]\d+)?\]").expect("未能编译 TIME_TAG_REGEX")
});

/// 前面带空白的行级时间标签，用于丢弃压缩同步点之间的空格。
static TIME_TAG_AFTER_WS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([ \t]+)\[(\d{2}):(\d{2})([.:]\d+)?\]")
        .expect("未能编译 TIME_TAG_AFTER_WS_REGEX")
});

/// 逐字时间标签，如 `<00:11.22>`。
static WORD_TIME_TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<(\d{2}):(\d{2})([.:]\d+)?>").expect("未能编译 WORD_TIME_TAG_REGEX")
});

/// 头部元数据标签，如 `[offset:500]`。
static METADATA_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([a-zA-Z#]+):([^\]]*)\]").expect("未能编译 METADATA_REGEX"));

/// 说话人前缀只在行级同步点之后被识别，允许一个前导空格。
const SPEAKER_PREFIXES: [(&str, SpeakerEntity); 10] = [
    ("v1:", SpeakerEntity::Voice1),
    ("v2:", SpeakerEntity::Voice2),
    ("F:", SpeakerEntity::Female),
    ("M:", SpeakerEntity::Male),
    ("D:", SpeakerEntity::Duet),
    (" v1:", SpeakerEntity::Voice1),
    (" v2:", SpeakerEntity::Voice2),
    (" F:", SpeakerEntity::Female),
    (" M:", SpeakerEntity::Male),
    (" D:", SpeakerEntity::Duet),
];

/// 词法记号。所有时间戳单位为毫秒，尚未应用 offset。
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// 行级同步点。
    SyncPoint(u64),
    /// 逐字同步点。
    WordSyncPoint(u64),
    /// 说话人标签。
    SpeakerTag(SpeakerEntity),
    /// 头部元数据。
    Metadata {
        /// 标签名，如 `offset`。
        name: String,
        /// 标签值。
        value: String,
    },
    /// 上一个换行之后出现过同步点的文本。
    LyricText(String),
    /// 没有任何时间戳管辖的文本，保留用于降级恢复。
    InvalidText(String),
    /// 字面换行。
    NewLine,
    /// 语法上应有换行但原文没有时，由词法分析器补上的换行。
    SyntheticNewLine,
}

impl Token {
    pub(crate) const fn is_newline(&self) -> bool {
        matches!(self, Self::NewLine | Self::SyntheticNewLine)
    }

    pub(crate) const fn is_timed(&self) -> bool {
        matches!(self, Self::SyncPoint(_) | Self::WordSyncPoint(_))
    }
}

/// 词法状态：`[bg:` 打开的背景区域以字面 `]` 结束，
/// 期间 `]` 也被视为不安全字符。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerState {
    Normal,
    InBackgroundRegion,
}

/// 按十进制小数语义解析时间标签的捕获组：
/// `.5` 是 500 毫秒，`.22` 是 220 毫秒，而不是按固定宽度解析。
fn parse_timestamp(caps: &regex::Captures<'_>) -> u64 {
    let minutes: u64 = caps[1].parse().expect("正则已保证分钟为两位数字");
    let seconds_str = caps.get(3).map_or_else(
        || caps[2].to_string(),
        |fraction| format!("{}{}", &caps[2], fraction.as_str().replace(':', ".")),
    );
    let milliseconds = (seconds_str
        .parse::<f64>()
        .expect("正则已保证秒数为有效小数")
        * 1000.0) as u64;
    minutes * 60 * 1000 + milliseconds
}

/// `[bg:` 行是否嵌套在 `v2:` 行之下：
/// 回溯到当前段落的开头（不含刚补上的换行），找最近的说话人标签。
/// 这个启发式在标签与背景行交错的罕见输入下可能判错，保持与参考行为一致。
fn background_speaker(out: &[Token]) -> SpeakerEntity {
    let scope = &out[..out.len().saturating_sub(1)];
    let last_was_v2 = scope
        .iter()
        .rposition(Token::is_newline)
        .is_some_and(|paragraph_start| {
            scope[paragraph_start..]
                .iter()
                .rev()
                .find_map(|token| match token {
                    Token::SpeakerTag(speaker) => Some(speaker.is_voice2()),
                    _ => None,
                })
                .unwrap_or(false)
        });
    if last_was_v2 {
        SpeakerEntity::Voice2Background
    } else {
        SpeakerEntity::Background
    }
}

/// 把原始文本扫描为记号序列。空白输入返回 `None`。
///
/// 扫描从不回溯超过一个记号。如果整个文件没有一个大于零的
/// 同步点，会被重新归类为未同步歌词：只保留文本与说话人信息。
pub(crate) fn tokenize(text: &str, multi_line_enabled: bool) -> Option<Vec<Token>> {
    if text.trim().is_empty() {
        return None;
    }
    let mut out: Vec<Token> = Vec::new();
    let mut state = LexerState::Normal;
    let mut pos = 0;
    while pos < text.len() {
        let mut pending_bg_newline = false;
        if state == LexerState::InBackgroundRegion && text[pos..].starts_with(']') {
            pos += 1;
            state = LexerState::Normal;
            pending_bg_newline = true;
        }
        let rest = &text[pos..];
        if rest.starts_with("\r\n") {
            out.push(Token::NewLine);
            pos += 2;
            continue;
        }
        if rest.starts_with('\n') || rest.starts_with('\r') {
            out.push(Token::NewLine);
            pos += 1;
            continue;
        }
        if pending_bg_newline {
            out.push(Token::SyntheticNewLine);
            continue;
        }
        if let Some(caps) = TIME_TAG_REGEX.captures(rest) {
            // 在语法上应当换行却没有换行的位置补一个合成换行，
            // 否则压缩同步点和行中出现的时间戳无法被识别为新行。
            // 想在歌词里写出长得像时间戳的文本的人只能另想办法了。
            if out
                .last()
                .is_some_and(|last| !last.is_newline() && !matches!(last, Token::SyncPoint(_)))
            {
                out.push(Token::SyntheticNewLine);
            }
            out.push(Token::SyncPoint(parse_timestamp(&caps)));
            pos += caps[0].len();
            continue;
        }
        // 压缩同步点之间的空格没有信息量，直接丢弃
        if matches!(out.last(), Some(Token::SyncPoint(_)))
            && let Some(caps) = TIME_TAG_AFTER_WS_REGEX.captures(rest)
        {
            pos += caps[1].len();
            continue;
        }
        if matches!(out.last(), Some(Token::SyncPoint(_)))
            && let Some(&(prefix, speaker)) = SPEAKER_PREFIXES
                .iter()
                .find(|(prefix, _)| rest.starts_with(prefix))
        {
            out.push(Token::SpeakerTag(speaker));
            pos += prefix.len();
            continue;
        }
        // 长得像元数据的背景人声标记，可以出现在任何行首
        if rest.starts_with("[bg:") {
            if out.last().is_some_and(|last| !last.is_newline()) {
                out.push(Token::SyntheticNewLine);
            }
            let speaker = background_speaker(&out);
            out.push(Token::SpeakerTag(speaker));
            pos += 4;
            state = LexerState::InBackgroundRegion;
            continue;
        }
        // 元数据只能出现在文件开头或换行之后
        if out.last().is_none_or(Token::is_newline)
            && let Some(caps) = METADATA_REGEX.captures(rest)
        {
            out.push(Token::Metadata {
                name: caps[1].to_string(),
                value: caps[2].to_string(),
            });
            pos += caps[0].len();
            continue;
        }
        // 逐字时间戳可以出现在任何文本中，
        // 有的文件甚至只有逐字时间戳而没有行级同步点
        if let Some(caps) = WORD_TIME_TAG_REGEX.captures(rest) {
            out.push(Token::WordSyncPoint(parse_timestamp(&caps)));
            pos += caps[0].len();
            continue;
        }
        let in_bg = state == LexerState::InBackgroundRegion;
        let unsafe_at = rest
            .find(|c: char| matches!(c, '[' | '<' | '\r' | '\n') || (in_bg && c == ']'));
        let end = match unsafe_at {
            None => text.len(),
            // 不安全字符自身没有匹配任何标签时，按普通文本消费一个字符
            Some(0) => pos + 1,
            Some(offset) => pos + offset,
        };
        let run = &text[pos..end];
        // 只有在本行已经出现过某种时间戳时，文本才算歌词文本
        let last_newline = out.iter().rposition(Token::is_newline);
        let last_timed = out.iter().rposition(Token::is_timed);
        let has_timing = match (last_newline, last_timed) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(newline), Some(timed)) => newline < timed,
        };
        if has_timing {
            if let Some(Token::LyricText(existing)) = out.last_mut() {
                existing.push_str(run);
            } else {
                out.push(Token::LyricText(run.to_string()));
            }
        } else if let Some(Token::InvalidText(existing)) = out.last_mut() {
            existing.push_str(run);
        } else {
            out.push(Token::InvalidText(run.to_string()));
        }
        pos = end;
    }
    if matches!(out.last(), Some(Token::SyncPoint(_))) {
        out.push(Token::InvalidText(String::new()));
    }
    if out.last().is_some_and(|last| !last.is_newline()) {
        out.push(Token::SyntheticNewLine);
    }
    // 没有一个大于零的同步点，基本可以断定不是有效的 LRC。
    // 只保留文本信息，尽可能从损坏的文件里抢救内容。
    let has_nonzero_timing = out.iter().any(
        |token| matches!(token, Token::SyncPoint(ts) | Token::WordSyncPoint(ts) if *ts > 0),
    );
    if !has_nonzero_timing {
        out = out
            .into_iter()
            .filter_map(|token| match token {
                Token::InvalidText(_) | Token::SpeakerTag(_) => Some(token),
                Token::LyricText(text) => Some(Token::InvalidText(text)),
                _ => None,
            })
            .collect();
    }
    if multi_line_enabled {
        out = join_multi_line(out);
    }
    Some(out)
}

/// 多行模式：把两个计时记号之间的连续文本行合并为一个
/// 以 `\n` 连接的歌词文本，合并区间末尾的换行恢复为显式换行记号。
fn join_multi_line(tokens: Vec<Token>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut buffer: Option<String> = None;
    for token in tokens {
        match token {
            Token::LyricText(text) => {
                let mut buf = buffer.take().unwrap_or_default();
                buf.push_str(&text);
                buffer = Some(buf);
            }
            // 紧跟在歌词文本之后的无效文本也并入；其余无效文本保持原样
            Token::InvalidText(text) if buffer.is_some() => {
                if let Some(buf) = buffer.as_mut() {
                    buf.push_str(&text);
                }
            }
            Token::NewLine | Token::SyntheticNewLine if buffer.is_some() => {
                if let Some(buf) = buffer.as_mut() {
                    buf.push('\n');
                }
            }
            other => {
                if let Some(buf) = buffer.take() {
                    flush_joined_text(buf, &mut out);
                }
                out.push(other);
            }
        }
    }
    if let Some(buf) = buffer {
        if let Some(stripped) = buf.strip_suffix('\n') {
            out.push(Token::LyricText(stripped.to_string()));
            out.push(Token::NewLine);
        } else {
            out.push(Token::LyricText(buf));
        }
    }
    out
}

fn flush_joined_text(buf: String, out: &mut Vec<Token>) {
    let trimmed = buf.trim_end_matches('\n');
    let newline_count = buf.len() - trimmed.len();
    out.push(Token::LyricText(trimmed.to_string()));
    for _ in 0..newline_count {
        out.push(Token::NewLine);
    }
}
