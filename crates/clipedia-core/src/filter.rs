//! Display-list filtering over cached items
//!
//! Three stages applied in order: search, tag (OR across selected tags),
//! type classification. Output keeps input order.

use crate::Item;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Plain,
    Pattern,
}

impl SearchMode {
    pub fn from_regex_flag(is_regex: bool) -> Self {
        if is_regex {
            SearchMode::Pattern
        } else {
            SearchMode::Plain
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" => Ok(SearchMode::Plain),
            "pattern" | "regex" => Ok(SearchMode::Pattern),
            other => Err(format!("unknown search mode: {other}")),
        }
    }
}

/// Classification by tag convention: `code` tag, `url` tag, or neither.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFilter {
    #[default]
    All,
    Text,
    Code,
    Links,
}

impl TypeFilter {
    pub fn accepts(self, item: &Item) -> bool {
        match self {
            TypeFilter::All => true,
            TypeFilter::Code => item.has_tag("code"),
            TypeFilter::Links => item.has_tag("url"),
            TypeFilter::Text => !item.has_tag("code") && !item.has_tag("url"),
        }
    }
}

impl std::str::FromStr for TypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(TypeFilter::All),
            "text" => Ok(TypeFilter::Text),
            "code" => Ok(TypeFilter::Code),
            "links" | "link" => Ok(TypeFilter::Links),
            other => Err(format!("unknown type filter: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub query: String,
    pub mode: SearchMode,
    pub tags: Vec<String>,
    pub kind: TypeFilter,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.query.is_empty() && self.tags.is_empty() && self.kind == TypeFilter::All
    }
}

/// Compiled search stage.
///
/// A pattern that fails to compile degrades to the plain substring rule for
/// the same query; compile errors never reach the caller.
#[derive(Debug, Clone)]
pub enum SearchMatcher {
    Any,
    Plain(String),
    Pattern(Regex),
}

impl SearchMatcher {
    pub fn new(query: &str, mode: SearchMode) -> Self {
        if query.is_empty() {
            return SearchMatcher::Any;
        }
        match mode {
            SearchMode::Plain => SearchMatcher::Plain(query.to_lowercase()),
            SearchMode::Pattern => match RegexBuilder::new(query).case_insensitive(true).build() {
                Ok(re) => SearchMatcher::Pattern(re),
                Err(e) => {
                    tracing::debug!(query, error = %e, "pattern did not compile, using substring search");
                    SearchMatcher::Plain(query.to_lowercase())
                }
            },
        }
    }

    pub fn matches(&self, item: &Item) -> bool {
        match self {
            SearchMatcher::Any => true,
            SearchMatcher::Plain(needle) => {
                item.content.to_lowercase().contains(needle.as_str())
                    || item
                        .tags
                        .iter()
                        .any(|t| t.to_lowercase().contains(needle.as_str()))
            }
            SearchMatcher::Pattern(re) => re.is_match(&item.content),
        }
    }
}

/// Runs the pipeline over loaded items in view order.
pub fn apply<'a, I>(items: I, criteria: &FilterCriteria) -> Vec<&'a Item>
where
    I: IntoIterator<Item = &'a Item>,
{
    let search = SearchMatcher::new(&criteria.query, criteria.mode);
    items
        .into_iter()
        .filter(|item| search.matches(item))
        .filter(|item| criteria.tags.is_empty() || criteria.tags.iter().any(|t| item.has_tag(t)))
        .filter(|item| criteria.kind.accepts(item))
        .collect()
}
