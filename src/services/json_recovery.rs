//! 从模型输出中恢复 JSON
//!
//! 上游模型并不保证输出干净的 JSON，这里按固定步骤尝试：
//! 1. 剥离代码块后直接解析
//! 2. 扫描文本中平衡的 `{...}` / `[...]` 子串（最多尝试 `MAX_SCAN_STARTS` 个起点）
//! 3. 放弃
//!
//! 没有任何重试循环，失败就是失败

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

use crate::models::Recovery;

/// 子串扫描时最多尝试的起始括号数
const MAX_SCAN_STARTS: usize = 16;

static CODE_FENCE: OnceLock<Regex> = OnceLock::new();

fn code_fence_re() -> &'static Regex {
    CODE_FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_+\-]*[ \t]*\r?\n?(.*?)```").expect("代码块正则表达式无效")
    })
}

/// 剥离 markdown 代码块
///
/// 有完整代码块时取第一个代码块的内容；只有开头的 ``` 时去掉首行
pub fn strip_code_fences(raw: &str) -> String {
    let trimmed = raw.trim();

    if let Some(inner) = code_fence_re()
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
    {
        return inner.as_str().trim().to_string();
    }

    if let Some(rest) = trimmed.strip_prefix("```") {
        let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
        return body.trim().trim_end_matches("```").trim().to_string();
    }

    trimmed.to_string()
}

/// 恢复 JSON
///
/// `accept` 决定某个候选值是否是调用方想要的结构，不接受的候选会继续扫描下一个
pub fn recover_json<F>(raw: &str, accept: F) -> Option<(Value, Recovery)>
where
    F: Fn(&Value) -> bool,
{
    let cleaned = strip_code_fences(raw);

    if let Ok(value) = serde_json::from_str::<Value>(&cleaned) {
        if accept(&value) {
            return Some((value, Recovery::Direct));
        }
    }

    let mut texts = vec![cleaned.as_str()];
    if cleaned.as_str() != raw.trim() {
        texts.push(raw);
    }

    for text in texts {
        if let Some(value) = scan_balanced(text, &accept) {
            return Some((value, Recovery::Substring));
        }
    }

    None
}

fn scan_balanced<F>(text: &str, accept: &F) -> Option<Value>
where
    F: Fn(&Value) -> bool,
{
    text.char_indices()
        .filter(|(_, ch)| *ch == '{' || *ch == '[')
        .take(MAX_SCAN_STARTS)
        .filter_map(|(start, _)| balanced_at(text, start))
        .filter_map(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .find(|value| accept(value))
}

/// 从 `start` 处的括号开始，找到与之匹配的闭括号（忽略字符串内的括号）
fn balanced_at(text: &str, start: usize) -> Option<&str> {
    let mut expected_closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => expected_closers.push('}'),
            '[' => expected_closers.push(']'),
            '}' | ']' => {
                if expected_closers.pop() != Some(ch) {
                    return None;
                }
                if expected_closers.is_empty() {
                    let end = start + offset + ch.len_utf8();
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

// ========== 字段读取辅助函数 ==========

/// 按别名顺序读取对象字段（模型常常换用不同的键名）
pub(crate) fn field<'a>(object: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    aliases
        .iter()
        .find_map(|name| object.get(*name))
        .filter(|value| !value.is_null())
}

/// 模型常用的列表包装键，按优先级排列
const LIST_KEYS: &[&str] = &[
    "answers", "jawaban", "items", "kunci", "questions", "soal", "results", "data",
];

/// 从包装对象（如 `{"answers": [...]}`）中取出题目数组
///
/// 先找已知的包装键；再找第一个元素带题号字段的数组。
/// serde_json 的对象按键名字母序遍历，不能直接取第一个数组
pub(crate) fn wrapped_list<'a>(
    object: &'a Map<String, Value>,
    number_keys: &[&str],
) -> Option<&'a Vec<Value>> {
    let mut empty_known = None;
    for list in LIST_KEYS
        .iter()
        .filter_map(|name| object.get(*name))
        .filter_map(Value::as_array)
    {
        if !list.is_empty() {
            return Some(list);
        }
        empty_known.get_or_insert(list);
    }

    object
        .values()
        .filter_map(Value::as_array)
        .find(|list| {
            list.iter().any(|element| {
                element
                    .as_object()
                    .is_some_and(|item| field(item, number_keys).is_some())
            })
        })
        .or(empty_known)
}

/// 题号：正整数、整数值的浮点数或数字字符串（如 `"3"`、`"3."`）
pub(crate) fn parse_item_number(value: &Value) -> Option<u32> {
    let number = match value {
        Value::Number(n) => match n.as_u64() {
            Some(v) => v,
            None => {
                let f = n.as_f64()?;
                if f.fract() != 0.0 || f < 1.0 || f > u32::MAX as f64 {
                    return None;
                }
                f as u64
            }
        },
        Value::String(s) => s.trim().trim_end_matches('.').trim().parse::<u64>().ok()?,
        _ => return None,
    };

    u32::try_from(number).ok().filter(|n| *n > 0)
}

/// 分值：非负有限数或数字字符串（允许逗号作小数点）
pub(crate) fn parse_weight(value: &Value) -> Option<f64> {
    let weight = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok()?,
        _ => return None,
    };

    Some(weight).filter(|w| w.is_finite() && *w >= 0.0)
}

/// 把任意 JSON 值转成用于展示/归一化的文本
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any_container(value: &Value) -> bool {
        value.is_array() || value.is_object()
    }

    #[test]
    fn test_strip_json_fence() {
        let raw = "```json\n[{\"number\": 1}]\n```";
        assert_eq!(strip_code_fences(raw), "[{\"number\": 1}]");
    }

    #[test]
    fn test_strip_fence_with_prose_around() {
        let raw = "Berikut kunci jawabannya:\n```\n[1, 2]\n```\nSemoga membantu.";
        assert_eq!(strip_code_fences(raw), "[1, 2]");
    }

    #[test]
    fn test_strip_unterminated_fence() {
        let raw = "```json\n{\"a\": 1}";
        assert_eq!(strip_code_fences(raw), "{\"a\": 1}");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(strip_code_fences("  [1]  "), "[1]");
    }

    #[test]
    fn test_direct_parse() {
        let (value, recovery) = recover_json("[1, 2, 3]", any_container).unwrap();
        assert_eq!(recovery, Recovery::Direct);
        assert_eq!(value, serde_json::json!([1, 2, 3]));
    }

    #[test]
    fn test_fenced_equals_bare() {
        let bare = r#"[{"number":1,"choice":"A"}]"#;
        let fenced = format!("```json\n{}\n```", bare);

        let (a, ra) = recover_json(bare, any_container).unwrap();
        let (b, rb) = recover_json(&fenced, any_container).unwrap();
        assert_eq!(a, b);
        assert_eq!(ra, Recovery::Direct);
        assert_eq!(rb, Recovery::Direct);
    }

    #[test]
    fn test_substring_with_nested_braces() {
        let raw = r#"Hasil: {"answers": [{"number": 1, "choice": "B"}]} selesai."#;
        let (value, recovery) = recover_json(raw, any_container).unwrap();
        assert_eq!(recovery, Recovery::Substring);
        assert_eq!(value["answers"][0]["choice"], "B");
    }

    #[test]
    fn test_brackets_inside_strings_ignored() {
        let raw = r#"note {"topic": "Sel [bagian}", "n": 1} end"#;
        let (value, _) = recover_json(raw, any_container).unwrap();
        assert_eq!(value["topic"], "Sel [bagian}");
    }

    #[test]
    fn test_accept_skips_unwanted_candidates() {
        let raw = r#"meta {"ok": true} data [{"number": 1}]"#;
        let (value, recovery) = recover_json(raw, Value::is_array).unwrap();
        assert_eq!(recovery, Recovery::Substring);
        assert!(value.is_array());
    }

    #[test]
    fn test_wrapped_list_ignores_decoy_arrays() {
        use serde_json::json;
        const NUMBER_KEYS: &[&str] = &["number", "nomor"];

        let value = json!({"catatan": [], "jawaban": [{"nomor": 1, "jawaban": "A"}]});
        let list = wrapped_list(value.as_object().unwrap(), NUMBER_KEYS).unwrap();
        assert_eq!(list.len(), 1);

        let value = json!({"a_meta": ["x", "y"], "hasil": [{"number": 2}]});
        let list = wrapped_list(value.as_object().unwrap(), NUMBER_KEYS).unwrap();
        assert_eq!(list[0]["number"], 2);

        let value = json!({"answers": []});
        assert_eq!(wrapped_list(value.as_object().unwrap(), NUMBER_KEYS).map(Vec::len), Some(0));

        let value = json!({"catatan": [], "status": "ok"});
        assert!(wrapped_list(value.as_object().unwrap(), NUMBER_KEYS).is_none());
    }

    #[test]
    fn test_total_failure() {
        assert!(recover_json("maaf, gambar tidak terbaca", any_container).is_none());
        assert!(recover_json("{ broken [", any_container).is_none());
        assert!(recover_json("", any_container).is_none());
    }

    #[test]
    fn test_parse_item_number() {
        use serde_json::json;

        assert_eq!(parse_item_number(&json!(3)), Some(3));
        assert_eq!(parse_item_number(&json!(4.0)), Some(4));
        assert_eq!(parse_item_number(&json!("5")), Some(5));
        assert_eq!(parse_item_number(&json!(" 6. ")), Some(6));
        assert_eq!(parse_item_number(&json!(0)), None);
        assert_eq!(parse_item_number(&json!(-2)), None);
        assert_eq!(parse_item_number(&json!(2.5)), None);
        assert_eq!(parse_item_number(&json!("No. 3")), None);
        assert_eq!(parse_item_number(&json!(null)), None);
    }

    #[test]
    fn test_parse_weight() {
        use serde_json::json;

        assert_eq!(parse_weight(&json!(2)), Some(2.0));
        assert_eq!(parse_weight(&json!("1,5")), Some(1.5));
        assert_eq!(parse_weight(&json!(0)), Some(0.0));
        assert_eq!(parse_weight(&json!(-1)), None);
        assert_eq!(parse_weight(&json!("dua")), None);
        assert_eq!(parse_weight(&json!(true)), None);
    }

    #[test]
    fn test_scan_is_bounded() {
        let noise = "[x ".repeat(MAX_SCAN_STARTS + 5);
        let raw = format!("{}[1]", noise);
        assert!(recover_json(&raw, any_container).is_none());
    }
}
