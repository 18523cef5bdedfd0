use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Error, Result};

/// 新闻
///
/// 与 [`Tag`] 通过关联表 `news_tag` 多对多关联。`deleted_at` 非空表示已软删除。
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct News {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "CreatedAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "DeletedAt")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub title: String,
    pub thumbnail: String,
    pub summary: String,
    pub content: String,
    /// 关联标签，由存储层单独加载
    #[sqlx(skip)]
    pub tags: Vec<Tag>,
    pub topic: String,
    pub status: String,
}

/// 标签
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Tag {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "CreatedAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "UpdatedAt")]
    pub updated_at: DateTime<Utc>,
    #[serde(rename = "DeletedAt")]
    pub deleted_at: Option<DateTime<Utc>>,
    pub name: String,
}

/// 创建或更新新闻的请求体
#[derive(Debug, Clone, Deserialize)]
pub struct NewsPayload {
    pub title: String,
    pub thumbnail: String,
    pub summary: String,
    pub content: String,
    pub topic: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<TagRef>,
}

/// `null` 与缺省字段同样处理
fn null_as_default<'de, D, T>(de: D) -> core::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Option::unwrap_or_default)
}

impl NewsPayload {
    /// 解析请求体中的标签引用，去重并保持首次出现的顺序
    ///
    /// 带 `ID` 的引用指向已有标签，`name` 被忽略；只有 `name` 的引用按名称复用或新建标签。
    /// 两者都没有时返回 [`Error::InvalidArgument`]。
    pub fn tag_targets(&self) -> Result<Vec<TagTarget>> {
        let mut targets = Vec::with_capacity(self.tags.len());
        for tag in &self.tags {
            let target = match (tag.id, tag.name.as_deref()) {
                (Some(id), _) => TagTarget::Id(id),
                (None, Some(name)) if !name.is_empty() => TagTarget::Name(name.to_string()),
                _ => {
                    return Err(Error::InvalidArgument(
                        "tag reference needs `ID` or `name`".to_string(),
                    ));
                }
            };
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
        Ok(targets)
    }
}

/// 请求体中的标签引用，其余字段忽略
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TagRef {
    #[serde(rename = "ID", alias = "id", default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
}

/// 解析后的标签引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagTarget {
    /// 已有标签
    Id(i64),
    /// 按名称复用未删除的标签，不存在则新建
    Name(String),
}

impl TagTarget {
    pub fn id(&self) -> Option<i64> {
        match self {
            TagTarget::Id(id) => Some(*id),
            TagTarget::Name(_) => None,
        }
    }
}

/// 创建或更新标签的请求体
#[derive(Debug, Clone, Deserialize)]
pub struct TagPayload {
    pub name: String,
}

/// 新闻列表响应
#[derive(Debug, Default, Serialize)]
pub struct NewsList {
    pub data: Vec<News>,
}

/// 标签列表响应
#[derive(Debug, Default, Serialize)]
pub struct TagsList {
    pub data: Vec<Tag>,
}

/// 新闻列表的过滤条件
///
/// 三项均为可选；`tag` 保留原始字符串，由 [`NewsFilter::tag_id`] 解析。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewsFilter {
    pub topic: Option<String>,
    pub status: Option<String>,
    pub tag: Option<String>,
}

impl NewsFilter {
    /// 去掉空字符串条件，空值等同于未提供
    pub fn normalized(self) -> Self {
        fn keep(v: Option<String>) -> Option<String> {
            v.filter(|s| !s.is_empty())
        }

        Self {
            topic: keep(self.topic),
            status: keep(self.status),
            tag: keep(self.tag),
        }
    }

    /// 解析标签过滤条件
    ///
    /// 非整数时返回 [`Error::InvalidArgument`]。
    pub fn tag_id(&self) -> Result<Option<i64>> {
        self.tag
            .as_deref()
            .map(|tag| {
                tag.parse::<i64>()
                    .map_err(|e| Error::InvalidArgument(format!("invalid tag filter `{tag}`: {e}")))
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_accepts_tag_refs_in_both_casings() {
        let payload: NewsPayload = serde_json::from_value(serde_json::json!({
            "title": "t",
            "thumbnail": "http://img",
            "summary": "s",
            "content": "c",
            "topic": "bitcoin",
            "tags": [{"ID": 2, "name": "ignored"}, {"id": 3}, {"ID": 2}, {"name": "crypto"}, {"name": "crypto"}]
        }))
        .unwrap();

        assert_eq!(payload.status, "");
        assert_eq!(
            payload.tag_targets().unwrap(),
            vec![
                TagTarget::Id(2),
                TagTarget::Id(3),
                TagTarget::Name("crypto".into())
            ]
        );
    }

    #[test]
    fn test_tag_ref_without_id_or_name() {
        let payload: NewsPayload = serde_json::from_value(serde_json::json!({
            "title": "t",
            "thumbnail": "http://img",
            "summary": "s",
            "content": "c",
            "topic": "bitcoin",
            "tags": [{"name": ""}]
        }))
        .unwrap();

        assert!(matches!(payload.tag_targets(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_payload_accepts_null_status_and_tags() {
        let payload: NewsPayload = serde_json::from_value(serde_json::json!({
            "title": "t",
            "thumbnail": "http://img",
            "summary": "s",
            "content": "c",
            "topic": "bitcoin",
            "status": null,
            "tags": null
        }))
        .unwrap();

        assert_eq!(payload.status, "");
        assert!(payload.tags.is_empty());
        assert!(payload.tag_targets().unwrap().is_empty());
    }

    #[test]
    fn test_payload_rejects_numeric_title() {
        let result = serde_json::from_value::<NewsPayload>(serde_json::json!({
            "title": 12,
            "thumbnail": "http://img",
            "summary": "s",
            "content": "c",
            "topic": "bitcoin"
        }));

        assert!(result.is_err());
    }

    #[test]
    fn test_payload_requires_content() {
        let result = serde_json::from_value::<NewsPayload>(serde_json::json!({
            "title": "t",
            "thumbnail": "http://img",
            "summary": "s",
            "topic": "bitcoin"
        }));

        assert!(result.is_err());
    }

    #[test]
    fn test_filter_drops_empty_values() {
        let filter = NewsFilter {
            topic: Some("bitcoin".into()),
            status: Some(String::new()),
            tag: Some(String::new()),
        }
        .normalized();

        assert_eq!(filter.topic.as_deref(), Some("bitcoin"));
        assert!(filter.status.is_none());
        assert!(filter.tag.is_none());
    }

    #[test]
    fn test_filter_tag_id() {
        let mut filter = NewsFilter::default();
        assert_eq!(filter.tag_id().unwrap(), None);

        filter.tag = Some("7".into());
        assert_eq!(filter.tag_id().unwrap(), Some(7));

        filter.tag = Some("seven".into());
        assert!(matches!(filter.tag_id(), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_news_wire_names() {
        let now = Utc::now();
        let news = News {
            id: 1,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            title: "t".into(),
            thumbnail: "th".into(),
            summary: "s".into(),
            content: "c".into(),
            tags: vec![],
            topic: "bitcoin".into(),
            status: "draft".into(),
        };

        let value = serde_json::to_value(&news).unwrap();
        assert_eq!(value["ID"], 1);
        assert!(value["DeletedAt"].is_null());
        assert_eq!(value["topic"], "bitcoin");
        assert_eq!(value["tags"], serde_json::json!([]));
    }
}
