//! Markdown document templates for excerpts.
//!
//! Placeholders have the form `{{field}}`; anything after the field name up to
//! the closing braces is ignored, so `{{read_status ? '已读' : '未读'}}` renders
//! the same as `{{read_status}}`.

use crate::types::Article;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)[^}]*\}\}").expect("Invalid placeholder regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub body: &'static str,
}

const SIMPLE: &str = "# {{title}}

**来源**: {{feed_name}}
**发布时间**: {{published_at}}
**关键词**: {{keywords}}

## 摘要
{{summary}}

## 主要内容
{{content}}

## AI分析
- **情感倾向**: {{sentiment}}
- **关键要点**: {{key_points}}
- **行动建议**: {{action_items}}";

const DETAILED: &str = "# {{title}}

## 基本信息
- **来源**: {{feed_name}}
- **URL**: {{url}}
- **发布时间**: {{published_at}}
- **阅读状态**: {{read_status ? '已读' : '未读'}}
- **处理状态**: {{processed_status ? '已处理' : '未处理'}}

## 内容摘要
{{summary}}

## 完整内容
{{content}}

## AI深度分析

### 关键词提取
{{keywords}}

### 情感分析
{{sentiment}}

### 商业洞察
{{business_insights}}

### 技术要点
{{technical_points}}

### 行动建议
{{action_items}}

## 元数据
- **创建时间**: {{created_at}}
- **更新时间**: {{updated_at}}
- **文章ID**: {{id}}
- **订阅源ID**: {{feed_id}}";

const PODCAST: &str = "# 🎙️ {{title}}

## 📋 播客信息
- **节目**: {{feed_name}}
- **发布时间**: {{published_at}}
- **时长**: {{duration}}
- **主持人**: {{hosts}}
- **嘉宾**: {{guests}}

## 🎯 核心观点
{{key_points}}

## 📝 详细笔记

### 主要内容
{{content}}

### 精彩片段
{{highlights}}

### 引用和名言
{{quotes}}

## 🤖 AI分析

### 情感基调
{{sentiment}}

### 话题分布
{{topics}}

### 学习收获
{{learnings}}

### 行动启发
{{inspirations}}

## 🔗 相关资源
- 播客链接: {{url}}
- 相关文章: {{related_articles}}
- 推荐工具: {{recommended_tools}}";

pub const DEFAULT_TEMPLATES: [DocTemplate; 3] = [
    DocTemplate {
        id: "simple",
        name: "简洁摘要",
        description: "基础的文章摘要格式",
        body: SIMPLE,
    },
    DocTemplate {
        id: "detailed",
        name: "详细笔记",
        description: "包含完整分析和结构的笔记",
        body: DETAILED,
    },
    DocTemplate {
        id: "podcast",
        name: "播客笔记",
        description: "专门为播客内容优化的模板",
        body: PODCAST,
    },
];

pub fn find(id: &str) -> Option<&'static DocTemplate> {
    DEFAULT_TEMPLATES.iter().find(|t| t.id == id)
}

/// Value of `field` for `article`. Unknown fields are `None`.
pub fn field_value(article: &Article, field: &str) -> Option<String> {
    let text = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
    match field {
        "id" => Some(article.id.to_string()),
        "feed_id" => article.feed_id.map(|id| id.to_string()),
        "title" => Some(article.title.clone()),
        "content" => text(&article.content),
        "summary" => text(&article.summary),
        "feed_name" => text(&article.feed_name),
        "url" => Some(article.url.clone()),
        "published_at" => article.published_at.as_ref().map(format_time),
        "created_at" => Some(format_time(&article.created_at)),
        "updated_at" => article.updated_at.as_ref().map(format_time),
        "read_status" => Some(if article.read_status { "已读" } else { "未读" }.to_string()),
        "processed_status" => Some(
            if article.processed_status {
                "已处理"
            } else {
                "未处理"
            }
            .to_string(),
        ),
        "keywords" => text(&article.keywords),
        "sentiment" => text(&article.sentiment),
        "key_points" => text(&article.key_points),
        "business_insights" => text(&article.business_insights),
        "technical_points" => text(&article.technical_points),
        "action_items" => text(&article.action_items),
        _ => None,
    }
}

fn format_time(at: &DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Substitute every placeholder in `body`. Missing values render as "".
pub fn render(body: &str, article: &Article) -> String {
    PLACEHOLDER
        .replace_all(body, |caps: &Captures<'_>| {
            field_value(article, &caps[1]).unwrap_or_default()
        })
        .into_owned()
}

/// Field names referenced by `body`, in order of first appearance.
pub fn placeholders(body: &str) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(body) {
        let name = caps[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

/// File name for an exported document: `<article-id>-<template>.md`.
pub fn export_file_name(article: &Article, template_id: &str) -> String {
    let slug: String = template_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    format!("{}-{}.md", article.id, slug)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn article() -> Article {
        Article {
            id: 7,
            feed_id: Some(3),
            title: "Rust 2026".into(),
            content: Some("body".into()),
            summary: Some(String::new()),
            feed_name: Some("Tech Daily".into()),
            url: "https://example.com/a/7".into(),
            published_at: None,
            created_at: Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap(),
            updated_at: None,
            read_status: true,
            processed_status: false,
            keywords: Some("rust, async".into()),
            sentiment: None,
            key_points: None,
            business_insights: None,
            technical_points: None,
            action_items: None,
        }
    }

    #[test]
    fn renders_known_fields() {
        let out = render("# {{title}} / {{ feed_name }} / {{id}}", &article());
        assert_eq!(out, "# Rust 2026 / Tech Daily / 7");
    }

    #[test]
    fn unknown_and_empty_fields_render_empty() {
        let out = render("[{{duration}}][{{summary}}][{{published_at}}]", &article());
        assert_eq!(out, "[][][]");
    }

    #[test]
    fn conditional_placeholders_render_labels() {
        let out = render(
            "{{read_status ? '已读' : '未读'}} {{processed_status ? '已处理' : '未处理'}}",
            &article(),
        );
        assert_eq!(out, "已读 未处理");
    }

    #[test]
    fn timestamps_are_formatted() {
        assert_eq!(render("{{created_at}}", &article()), "2026-01-02 03:04:05");
    }

    #[test]
    fn detailed_template_leaves_no_placeholders() {
        let out = render(find("detailed").expect("template").body, &article());
        assert!(!out.contains("{{"));
        assert!(out.contains("**文章ID**: 7"));
        assert!(out.contains("**订阅源ID**: 3"));
    }

    #[test]
    fn placeholders_are_listed_once() {
        let names = placeholders(find("podcast").expect("template").body);
        assert_eq!(names.first().map(String::as_str), Some("title"));
        assert_eq!(names.iter().filter(|n| n.as_str() == "url").count(), 1);
    }

    #[test]
    fn export_names_are_filesystem_safe() {
        assert_eq!(export_file_name(&article(), "simple"), "7-simple.md");
        assert_eq!(export_file_name(&article(), "my tpl/x"), "7-my_tpl_x.md");
    }
}
