//! Crawl requests and the site records produced from them

use chrono::{DateTime, SecondsFormat, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::language::{Language, PerLanguage, parse_requested};
use crate::naming::normalize_url;

/// A validated request to crawl one site
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlRequest {
    url: String,
    languages: Vec<Language>,
}

impl CrawlRequest {
    /// Create a request, normalizing the URL scheme.
    ///
    /// Unsupported language codes are dropped. An empty language list means
    /// "translate into every supported language".
    pub fn new(url: &str, languages: &[String]) -> Self {
        Self {
            url: normalize_url(url),
            languages: parse_requested(languages),
        }
    }

    /// The normalized URL (always carries a scheme)
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Requested languages, in request order
    pub fn languages(&self) -> &[Language] {
        &self.languages
    }

    /// Whether `lang` should be sent to the model for this request
    pub fn wants(&self, lang: Language) -> bool {
        self.languages.is_empty() || self.languages.contains(&lang)
    }
}

/// The aggregated record persisted for a crawled site.
///
/// Serializes to a flat map: base fields, then `content`/`detail` for English
/// and `content_<code>`/`detail_<code>` for every other language. The
/// rendered HTML is not part of the record.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteRecord {
    pub name: String,
    pub title: String,
    pub url: String,
    pub image_url: String,
    pub thumbnail_url: String,
    pub collection_time: DateTime<Utc>,
    pub star_rating: i64,
    pub category_name: Option<String>,
    pub tags: Vec<String>,
    /// Translated descriptions
    pub content: PerLanguage<String>,
    /// Translated detail; all slots are `None` when detail extraction failed
    pub detail: PerLanguage<Option<String>>,
}

impl SiteRecord {
    /// ISO-8601 collection timestamp
    pub fn collection_time_iso(&self) -> String {
        self.collection_time.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// English description
    pub fn description(&self) -> &str {
        self.content.get(Language::En)
    }

    /// English detail
    pub fn detail_en(&self) -> Option<&str> {
        self.detail.get(Language::En).as_deref()
    }

    /// Flatten into `(column, value)` pairs for persistence
    pub fn columns(&self) -> Vec<(String, Option<String>)> {
        let mut columns = vec![
            ("name".to_string(), Some(self.name.clone())),
            ("title".to_string(), Some(self.title.clone())),
            ("url".to_string(), Some(self.url.clone())),
            ("image_url".to_string(), Some(self.image_url.clone())),
            ("thumbnail_url".to_string(), Some(self.thumbnail_url.clone())),
            ("collection_time".to_string(), Some(self.collection_time_iso())),
            ("star_rating".to_string(), Some(self.star_rating.to_string())),
            ("category_name".to_string(), self.category_name.clone()),
            ("tags".to_string(), Some(self.tags.join(","))),
        ];
        for (lang, content) in self.content.iter() {
            columns.push((lang.field_name("content"), Some(content.clone())));
        }
        for (lang, detail) in self.detail.iter() {
            columns.push((lang.field_name("detail"), detail.clone()));
        }
        columns
    }
}

impl Serialize for SiteRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("title", &self.title)?;
        map.serialize_entry("url", &self.url)?;
        map.serialize_entry("image_url", &self.image_url)?;
        map.serialize_entry("thumbnail_url", &self.thumbnail_url)?;
        map.serialize_entry("collection_time", &self.collection_time_iso())?;
        map.serialize_entry("star_rating", &self.star_rating)?;
        map.serialize_entry("category_name", &self.category_name)?;
        map.serialize_entry("tags", &self.tags)?;
        for (lang, content) in self.content.iter() {
            map.serialize_entry(&lang.field_name("content"), content)?;
        }
        for (lang, detail) in self.detail.iter() {
            map.serialize_entry(&lang.field_name("detail"), detail)?;
        }
        map.end()
    }
}
