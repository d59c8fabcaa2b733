//! 标准答案解析器
//!
//! 把视觉模型返回的文本转换为经过校验的 `MasterKey`。纯函数，不访问网络

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::models::{
    Anomaly, Choice, MasterKey, MasterKeyItem, NormalizedChoice, ParseResult, Recovery,
};
use crate::services::json_recovery::{
    field, parse_item_number, parse_weight, recover_json, value_text, wrapped_list,
};

const NUMBER_KEYS: &[&str] = &["number", "nomor", "no", "questionNumber", "question"];
const CHOICE_KEYS: &[&str] = &[
    "correctChoice",
    "correct_choice",
    "correctAnswer",
    "answer",
    "key",
    "kunci",
    "jawaban",
];
const TOPIC_KEYS: &[&str] = &["topic", "topik", "materi"];
const WEIGHT_KEYS: &[&str] = &["weight", "bobot", "points", "score"];

/// 标准答案解析结果
#[derive(Debug, Clone, PartialEq)]
pub struct MasterKeyParse {
    pub key: MasterKey,
    pub anomalies: Vec<Anomaly>,
    pub recovery: Recovery,
}

/// 标准答案解析器
#[derive(Debug, Clone)]
pub struct MasterKeyParser {
    /// 分值缺失或非法时使用的默认分值
    default_weight: f64,
}

impl MasterKeyParser {
    pub fn new(default_weight: f64) -> Self {
        Self { default_weight }
    }

    /// 解析标准答案
    ///
    /// 找不到 JSON 数组，或数组中没有任何可用题目时返回 `MalformedInput`，
    /// 由老师手工修正原文
    pub fn parse(&self, raw: &str) -> ParseResult<MasterKeyParse> {
        let Some((value, recovery)) =
            recover_json(raw, |v| item_array(v).is_some_and(|items| !items.is_empty()))
        else {
            warn!("标准答案输出无法解析为 JSON 数组");
            return ParseResult::MalformedInput(raw.to_string());
        };

        let Some(elements) = item_array(&value) else {
            return ParseResult::MalformedInput(raw.to_string());
        };

        let mut anomalies = Vec::new();
        let mut seen = BTreeSet::new();
        let mut items = Vec::with_capacity(elements.len());

        for (position, element) in elements.iter().enumerate() {
            let Some(object) = element.as_object() else {
                anomalies.push(Anomaly::NotAnObject { position });
                continue;
            };

            if let Some(item) = self.parse_item(position, object, &mut anomalies) {
                if seen.insert(item.number) {
                    items.push(item);
                } else {
                    anomalies.push(Anomaly::DuplicateNumber {
                        number: item.number,
                    });
                }
            }
        }

        if items.is_empty() {
            warn!("标准答案中没有可用的题目");
            return ParseResult::MalformedInput(raw.to_string());
        }

        debug!(
            "标准答案解析完成: {} 题, {} 个异常, 方式: {:?}",
            items.len(),
            anomalies.len(),
            recovery
        );

        ParseResult::Ok(MasterKeyParse {
            key: MasterKey::from_unique(items),
            anomalies,
            recovery,
        })
    }

    fn parse_item(
        &self,
        position: usize,
        object: &Map<String, Value>,
        anomalies: &mut Vec<Anomaly>,
    ) -> Option<MasterKeyItem> {
        let raw_number = field(object, NUMBER_KEYS);
        let Some(number) = raw_number.and_then(parse_item_number) else {
            anomalies.push(Anomaly::InvalidNumber {
                position,
                raw: raw_number.map(value_text).unwrap_or_default(),
            });
            return None;
        };

        let raw_choice = field(object, CHOICE_KEYS).map(value_text).unwrap_or_default();
        let correct_choice = match Choice::normalize(&raw_choice) {
            NormalizedChoice::Letter(choice) => choice,
            NormalizedChoice::Blank | NormalizedChoice::Unreadable => {
                // 不能替老师编造正确答案，这道题直接丢弃
                anomalies.push(Anomaly::InvalidChoice {
                    number,
                    raw: raw_choice,
                });
                return None;
            }
        };

        let topic = field(object, TOPIC_KEYS)
            .map(value_text)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        let weight = match field(object, WEIGHT_KEYS) {
            None => self.default_weight,
            Some(raw) => parse_weight(raw).unwrap_or_else(|| {
                anomalies.push(Anomaly::InvalidWeight {
                    number,
                    raw: value_text(raw),
                });
                self.default_weight
            }),
        };

        Some(MasterKeyItem {
            number,
            correct_choice,
            topic,
            weight,
        })
    }
}

/// 取出题目数组：顶层数组，或包装对象中的题目数组（如 `{"items": [...]}`）
fn item_array(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(elements) => Some(elements),
        Value::Object(object) => wrapped_list(object, NUMBER_KEYS),
        _ => None,
    }
}
