//! 特征路径解析
//!
//! 把 `featureMap.user.profile.age`、`featureMap.items[0].price` 这类路径解析到
//! 嵌套的特征数据上。只有最后一段缺失时解析为 null；中间段缺失或为 null、对非对象
//! 继续取字段、对非数组取下标都是无效路径。下标所在的数组本身缺失时解析为 null。

use crate::error::{Result, RuleError};
use crate::models::FeatureMap;
use crate::parser::FEATURE_MAP_ROOT;
use crate::value::Value;
use regex::Regex;
use std::sync::LazyLock;

/// `name[index]` 形式的路径段
static INDEXED_SEGMENT: LazyLock<std::result::Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"^([^\[\]]+)\[([^\[\]]*)\]$"));

/// 单个路径段
#[derive(Debug, PartialEq)]
struct Segment<'a> {
    raw: &'a str,
    key: &'a str,
    index: Option<&'a str>,
}

impl<'a> Segment<'a> {
    fn parse(path: &str, raw: &'a str) -> Result<Self> {
        if raw.is_empty() {
            return Err(RuleError::invalid_path(path, "路径段为空"));
        }

        if !raw.contains(['[', ']']) {
            return Ok(Self {
                raw,
                key: raw,
                index: None,
            });
        }

        let pattern = INDEXED_SEGMENT
            .as_ref()
            .map_err(|e| RuleError::invalid_path(path, format!("下标语法规则无效: {}", e)))?;

        let invalid = || RuleError::invalid_path(path, format!("无效的下标语法: {}", raw));
        let captures = pattern.captures(raw).ok_or_else(invalid)?;
        let (Some(key), Some(index)) = (captures.get(1), captures.get(2)) else {
            return Err(invalid());
        };

        Ok(Self {
            raw,
            key: key.as_str(),
            index: Some(index.as_str()),
        })
    }
}

/// 路径解析器
pub struct PathResolver;

impl PathResolver {
    /// 解析路径为标量值，缺失时返回 `Value::Null`
    ///
    /// 路径最终指向对象或数组时返回 InvalidPath，运行时值永远不是容器。
    pub fn resolve(path: &str, features: &FeatureMap) -> Result<Value> {
        match Self::resolve_raw(path, features)? {
            None => Ok(Value::Null),
            Some(json) => Value::from_json(json).ok_or_else(|| {
                RuleError::invalid_path(path, "路径指向对象或数组，而不是标量值")
            }),
        }
    }

    /// 解析路径为原始 JSON 节点，最后一段缺失时返回 `None`
    pub fn resolve_raw<'a>(
        path: &str,
        features: &'a FeatureMap,
    ) -> Result<Option<&'a serde_json::Value>> {
        if path.trim().is_empty() {
            return Err(RuleError::invalid_path(path, "路径为空"));
        }

        let relative = path
            .strip_prefix(FEATURE_MAP_ROOT)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(path);

        // 先校验整条路径的语法，再导航
        let segments = relative
            .split('.')
            .map(|raw| Segment::parse(path, raw))
            .collect::<Result<Vec<_>>>()?;

        let mut current = features.data();
        let mut parent = FEATURE_MAP_ROOT;
        let last = segments.len() - 1;

        for (step, segment) in segments.iter().enumerate() {
            let is_last = step == last;

            let serde_json::Value::Object(map) = current else {
                return Err(RuleError::invalid_path(
                    path,
                    format!("'{}' 不是嵌套对象", parent),
                ));
            };

            let Some(index) = segment.index else {
                match map.get(segment.key) {
                    next if is_last => return Ok(next),
                    None | Some(serde_json::Value::Null) => {
                        return Err(RuleError::invalid_path(
                            path,
                            format!("'{}' 不存在或为 null，无法继续解析", segment.key),
                        ));
                    }
                    Some(next) => current = next,
                }
                parent = segment.raw;
                continue;
            };

            let items = match map.get(segment.key) {
                None | Some(serde_json::Value::Null) => return Ok(None),
                Some(serde_json::Value::Array(items)) => items,
                Some(_) => {
                    return Err(RuleError::invalid_path(
                        path,
                        format!("'{}' 不是数组", segment.key),
                    ));
                }
            };

            let position: i64 = index.trim().parse().map_err(|_| {
                RuleError::invalid_path(path, format!("无效的数组下标: {}", index))
            })?;

            let element = usize::try_from(position)
                .ok()
                .and_then(|i| items.get(i))
                .ok_or_else(|| {
                    RuleError::invalid_path(
                        path,
                        format!(
                            "数组 '{}' 下标 {} 越界 (长度 {})",
                            segment.key,
                            position,
                            items.len()
                        ),
                    )
                })?;

            if is_last {
                return Ok(Some(element));
            }
            if element.is_null() {
                return Err(RuleError::invalid_path(
                    path,
                    format!("数组元素 '{}' 为 null，无法继续解析", segment.raw),
                ));
            }
            current = element;
            parent = segment.raw;
        }

        Ok(Some(current))
    }

    /// 路径是否解析到非 null 的值；路径无效时返回 false
    pub fn exists(path: &str, features: &FeatureMap) -> bool {
        matches!(Self::resolve_raw(path, features), Ok(Some(v)) if !v.is_null())
    }

    /// 路径上值的类型名称，缺失时返回 `None`
    pub fn value_kind(path: &str, features: &FeatureMap) -> Result<Option<&'static str>> {
        let kind = Self::resolve_raw(path, features)?.and_then(|json| match json {
            serde_json::Value::Null => None,
            serde_json::Value::Object(_) => Some("object"),
            serde_json::Value::Array(_) => Some("array"),
            scalar => Value::from_json(scalar).map(|v| v.kind()),
        });
        Ok(kind)
    }

    /// 校验必需的特征路径全部存在
    pub fn validate_required_paths<I, S>(paths: I, features: &FeatureMap) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            let path = path.as_ref();
            if !Self::exists(path, features) {
                return Err(RuleError::MissingFeature(path.to_string()));
            }
        }
        Ok(())
    }
}
