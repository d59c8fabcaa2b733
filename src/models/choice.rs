use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// 选择题选项
///
/// `Unanswered` 表示未作答（或无法识别的涂写）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
    C,
    D,
    E,
    #[serde(rename = "unanswered")]
    Unanswered,
}

/// 视为"空白/未作答"的常见标记（小写比较）
static BLANK_MARKERS: phf::Set<&'static str> = phf::phf_set! {
    "",
    "-",
    "--",
    "—",
    "_",
    "?",
    "none",
    "null",
    "nil",
    "blank",
    "empty",
    "n/a",
    "na",
    "unanswered",
    "not answered",
    "kosong",
    "tidak dijawab",
    "未作答",
    "未答",
    "空",
    "无",
};

static LETTER_RE: OnceLock<Regex> = OnceLock::new();

/// 单个字母，允许包裹括号或跟随标点，例如 `A`、`(b)`、`C.`、`D) 线粒体`
fn letter_re() -> &'static Regex {
    LETTER_RE.get_or_init(|| {
        Regex::new(r"^[\(\[]?([A-E])(?:[\)\]\.:](?s:.*))?$").expect("选项正则表达式无效")
    })
}

/// 原始选项文本的归一化结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedChoice {
    /// 合法的 A–E
    Letter(Choice),
    /// 明确的空白标记
    Blank,
    /// 无法识别
    Unreadable,
}

impl Choice {
    /// 从字母构造
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'A' => Some(Choice::A),
            'B' => Some(Choice::B),
            'C' => Some(Choice::C),
            'D' => Some(Choice::D),
            'E' => Some(Choice::E),
            _ => None,
        }
    }

    /// 对模型输出的选项文本做归一化（去空白、转大写、截取单个字母）
    pub fn normalize(raw: &str) -> NormalizedChoice {
        let trimmed = raw.trim();
        if BLANK_MARKERS.contains(trimmed.to_lowercase().as_str()) {
            return NormalizedChoice::Blank;
        }

        let upper = trimmed.to_uppercase();
        letter_re()
            .captures(&upper)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().chars().next())
            .and_then(Choice::from_letter)
            .map(NormalizedChoice::Letter)
            .unwrap_or(NormalizedChoice::Unreadable)
    }

    pub fn is_answered(self) -> bool {
        self != Choice::Unanswered
    }

    /// 显示用文本，未作答显示为 `-`
    pub fn label(self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::B => "B",
            Choice::C => "C",
            Choice::D => "D",
            Choice::E => "E",
            Choice::Unanswered => "-",
        }
    }
}

impl std::fmt::Display for Choice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Choice::Unanswered => write!(f, "unanswered"),
            other => write!(f, "{}", other.label()),
        }
    }
}
