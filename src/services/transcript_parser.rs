//! 学生答卷解析器
//!
//! 与标准答案解析器的约定相同，区别在于失败时不报错：
//! 完全无法解析的答卷返回空作答，所有题目按未作答计分

use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::models::{Anomaly, Choice, NormalizedChoice, RawAnswer, Transcript};
use crate::services::json_recovery::{
    field, parse_item_number, recover_json, value_text, wrapped_list,
};

const NUMBER_KEYS: &[&str] = &["number", "nomor", "no", "questionNumber", "question"];
const CHOICE_KEYS: &[&str] = &[
    "choice",
    "answer",
    "jawaban",
    "selected",
    "studentChoice",
    "studentAnswer",
];

/// 学生答卷解析器
#[derive(Debug, Clone, Copy, Default)]
pub struct TranscriptParser;

impl TranscriptParser {
    pub fn new() -> Self {
        Self
    }

    /// 解析一份答卷
    pub fn parse(&self, raw: &str) -> Transcript {
        let Some((value, recovery)) = recover_json(raw, |v| answer_shape(v).is_some()) else {
            warn!("答卷输出无法解析，按全部未作答处理");
            return Transcript::unreadable();
        };

        let mut collector = Collector::default();
        match answer_shape(&value) {
            Some(Shape::List(elements)) => {
                for (position, element) in elements.iter().enumerate() {
                    collector.push_element(position, element);
                }
            }
            Some(Shape::Map(object)) => {
                for (position, (key, choice)) in object.iter().enumerate() {
                    match parse_item_number(&Value::String(key.clone())) {
                        Some(number) => collector.push(number, choice),
                        None => collector.anomalies.push(Anomaly::InvalidNumber {
                            position,
                            raw: key.clone(),
                        }),
                    }
                }
            }
            None => return Transcript::unreadable(),
        }

        debug!(
            "答卷解析完成: {} 条作答, {} 个异常, 方式: {:?}",
            collector.answers.len(),
            collector.anomalies.len(),
            recovery
        );

        Transcript {
            answers: collector.answers,
            anomalies: collector.anomalies,
            recovery,
        }
    }
}

enum Shape<'a> {
    /// `[{"number":1,"choice":"A"}, ...]`，或按位置编号的 `["A","B",...]`
    List(&'a Vec<Value>),
    /// `{"1":"A","2":"B"}`
    Map(&'a Map<String, Value>),
}

fn answer_shape(value: &Value) -> Option<Shape<'_>> {
    match value {
        Value::Array(elements) => Some(Shape::List(elements)),
        Value::Object(object) => {
            if let Some(elements) = wrapped_list(object, NUMBER_KEYS) {
                return Some(Shape::List(elements));
            }
            let is_map = !object.is_empty()
                && object
                    .iter()
                    .all(|(key, v)| parse_item_number(&Value::String(key.clone())).is_some() && !v.is_object());
            is_map.then_some(Shape::Map(object))
        }
        _ => None,
    }
}

#[derive(Default)]
struct Collector {
    answers: Vec<RawAnswer>,
    anomalies: Vec<Anomaly>,
    seen: BTreeSet<u32>,
}

impl Collector {
    fn push_element(&mut self, position: usize, element: &Value) {
        match element {
            Value::Object(object) => {
                let raw_number = field(object, NUMBER_KEYS);
                match raw_number.and_then(parse_item_number) {
                    Some(number) => {
                        let choice = field(object, CHOICE_KEYS).unwrap_or(&Value::Null);
                        self.push(number, choice);
                    }
                    None => self.anomalies.push(Anomaly::InvalidNumber {
                        position,
                        raw: raw_number.map(value_text).unwrap_or_default(),
                    }),
                }
            }
            // 纯字符串数组：按位置编号
            Value::String(_) => self.push(position as u32 + 1, element),
            _ => self.anomalies.push(Anomaly::NotAnObject { position }),
        }
    }

    fn push(&mut self, number: u32, raw_choice: &Value) {
        if !self.seen.insert(number) {
            self.anomalies.push(Anomaly::DuplicateNumber { number });
            return;
        }

        let raw = value_text(raw_choice);
        let choice = match Choice::normalize(&raw) {
            NormalizedChoice::Letter(choice) => choice,
            NormalizedChoice::Blank => Choice::Unanswered,
            NormalizedChoice::Unreadable => {
                self.anomalies.push(Anomaly::InvalidChoice { number, raw });
                Choice::Unanswered
            }
        };

        self.answers.push(RawAnswer::new(number, choice));
    }
}
