//! # Value 模块
//!
//! 属性值与属性表。
//!
//! 数值属性参与线性插值；布尔和文本属性是离散值，只在步骤边界切换。

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 属性值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    /// 数值（可插值）
    Number(f64),
    /// 布尔值（离散）
    Bool(bool),
    /// 文本（离散）
    Text(String),
}

impl PropertyValue {
    /// 获取数值
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// 是否为数值
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// 在两个值之间插值
    ///
    /// 两端都是数值时线性插值；否则 `ratio >= 1` 取终值，其余取起始值。
    pub fn lerp(&self, to: &Self, ratio: f64) -> Self {
        match (self, to) {
            (Self::Number(a), Self::Number(b)) => Self::Number(a + (b - a) * ratio),
            _ if ratio >= 1.0 => to.clone(),
            _ => self.clone(),
        }
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{:?}", v),
        }
    }
}

/// 属性表：属性名 -> 目标值
///
/// 按属性名排序，保证编译结果确定。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyMap(BTreeMap<String, PropertyValue>);

impl PropertyMap {
    /// 创建空属性表
    pub fn new() -> Self {
        Self::default()
    }

    /// 链式插入属性
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// 插入属性
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.0.insert(name.into(), value.into());
    }

    /// 查询属性
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    /// 是否包含属性
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// 遍历属性
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 属性名列表
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// 属性数量
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<PropertyValue>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_numbers() {
        let a = PropertyValue::Number(0.0);
        let b = PropertyValue::Number(100.0);
        assert_eq!(a.lerp(&b, 0.25), PropertyValue::Number(25.0));
        assert_eq!(a.lerp(&b, 1.0), b);
    }

    #[test]
    fn test_lerp_discrete_switches_at_end() {
        let a = PropertyValue::Bool(true);
        let b = PropertyValue::Bool(false);
        assert_eq!(a.lerp(&b, 0.99), a);
        assert_eq!(a.lerp(&b, 1.0), b);
    }

    #[test]
    fn test_property_map_deserialize() {
        let map: PropertyMap =
            serde_json::from_str(r#"{"x": 10, "visible": false, "label": "hi"}"#).unwrap();
        assert_eq!(map.get("x"), Some(&PropertyValue::Number(10.0)));
        assert_eq!(map.get("visible"), Some(&PropertyValue::Bool(false)));
        assert_eq!(map.get("label"), Some(&PropertyValue::Text("hi".to_string())));
        assert_eq!(map.names().collect::<Vec<_>>(), vec!["label", "visible", "x"]);
    }
}
