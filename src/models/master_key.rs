use serde::{Deserialize, Serialize};

use crate::models::choice::Choice;

/// 标准答案中的一道题
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterKeyItem {
    /// 题号（试卷内唯一）
    pub number: u32,
    /// 正确选项
    pub correct_choice: Choice,
    /// 知识点
    #[serde(default)]
    pub topic: String,
    /// 分值
    pub weight: f64,
}

impl MasterKeyItem {
    pub fn new(number: u32, correct_choice: Choice, topic: impl Into<String>, weight: f64) -> Self {
        Self {
            number,
            correct_choice,
            topic: topic.into(),
            weight,
        }
    }
}

/// 一份试卷的标准答案
///
/// 按题号升序保存，题号唯一。生成后只读，被所有学生的评分共享
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<MasterKeyItem>", into = "Vec<MasterKeyItem>")]
pub struct MasterKey {
    items: Vec<MasterKeyItem>,
}

impl MasterKey {
    /// 调用方已保证题号唯一
    pub(crate) fn from_unique(mut items: Vec<MasterKeyItem>) -> Self {
        items.sort_by_key(|item| item.number);
        Self { items }
    }

    pub fn items(&self) -> &[MasterKeyItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, number: u32) -> Option<&MasterKeyItem> {
        self.items
            .binary_search_by_key(&number, |item| item.number)
            .ok()
            .map(|idx| &self.items[idx])
    }

    /// 所有题目分值之和（评分分母）
    pub fn total_weight(&self) -> f64 {
        self.items.iter().map(|item| item.weight).sum()
    }
}

impl TryFrom<Vec<MasterKeyItem>> for MasterKey {
    type Error = String;

    /// 人工编辑过的标准答案在这里校验
    fn try_from(items: Vec<MasterKeyItem>) -> Result<Self, Self::Error> {
        let mut seen = std::collections::BTreeSet::new();
        for item in &items {
            if item.number == 0 {
                return Err("题号必须是正整数".to_string());
            }
            if !seen.insert(item.number) {
                return Err(format!("题号 {} 重复", item.number));
            }
            if !item.weight.is_finite() || item.weight < 0.0 {
                return Err(format!("第 {} 题分值必须是非负数", item.number));
            }
            if !item.correct_choice.is_answered() {
                return Err(format!("第 {} 题缺少正确选项", item.number));
            }
        }
        Ok(Self::from_unique(items))
    }
}

impl From<MasterKey> for Vec<MasterKeyItem> {
    fn from(key: MasterKey) -> Self {
        key.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(number: u32, choice: Choice, weight: f64) -> MasterKeyItem {
        MasterKeyItem::new(number, choice, "Topik", weight)
    }

    #[test]
    fn test_items_sorted_by_number() {
        let key = MasterKey::try_from(vec![
            item(3, Choice::C, 1.0),
            item(1, Choice::A, 2.0),
            item(2, Choice::B, 2.0),
        ])
        .unwrap();

        let numbers: Vec<u32> = key.items().iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(key.total_weight(), 5.0);
        assert_eq!(key.get(2).map(|i| i.correct_choice), Some(Choice::B));
        assert!(key.get(4).is_none());
    }

    #[test]
    fn test_rejects_duplicates_and_bad_values() {
        assert!(MasterKey::try_from(vec![item(1, Choice::A, 1.0), item(1, Choice::B, 1.0)]).is_err());
        assert!(MasterKey::try_from(vec![item(0, Choice::A, 1.0)]).is_err());
        assert!(MasterKey::try_from(vec![item(1, Choice::A, -1.0)]).is_err());
        assert!(MasterKey::try_from(vec![item(1, Choice::Unanswered, 1.0)]).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"[{"number":2,"correctChoice":"B","topic":"Genetika","weight":2},
                       {"number":1,"correctChoice":"A","weight":1}]"#;
        let key: MasterKey = serde_json::from_str(json).unwrap();
        assert_eq!(key.items()[0].number, 1);
        assert_eq!(key.items()[0].topic, "");

        let dup = r#"[{"number":1,"correctChoice":"A","weight":1},{"number":1,"correctChoice":"B","weight":1}]"#;
        assert!(serde_json::from_str::<MasterKey>(dup).is_err());
    }
}
