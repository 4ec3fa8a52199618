//! # Query Parameter Parser
//!
//! Reads the protocol's query parameter families:
//!
//! - `include=a,b.c`
//! - `sort=-created,title`
//! - `page[offset]=0&page[limit]=10`
//! - `fields[people]=name,age`
//! - `filter=(name,eq,'bob')`
//!
//! Values are kept as received until each family decodes its own items.
//! `filter` is always read from the raw query string so that quoted
//! strings containing encoded delimiters survive.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::errors::ApiResult;
use crate::filter::{parse_filter, FilterNode, OperatorSet};

use super::errors::{RequestError, RequestResult};

/// Parameter families defined by the protocol
pub const RECOGNIZED_PARAMS: [&str; 5] = ["include", "sort", "page", "fields", "filter"];

/// One raw query parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawParam {
    /// `name=value`
    Value(String),
    /// `name[key]=value`, possibly repeated with different keys
    Scoped(BTreeMap<String, String>),
}

/// Raw query parameters by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawParams(BTreeMap<String, RawParam>);

impl RawParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a query string, keeping values undecoded.
    ///
    /// Keys are decoded and support one level of `[key]` scoping. A later
    /// occurrence of the same key replaces an earlier one.
    pub fn from_query_string(query: &str) -> Self {
        let mut params = Self::new();

        for (raw_key, value) in query_pairs(query) {
            let key = decode_lossy(raw_key);
            match split_scoped(&key) {
                Some((name, scope)) => params.insert_scoped(name, scope, value),
                None => params.insert(key, value),
            }
        }
        params
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.insert(name.into(), RawParam::Value(value.into()));
    }

    pub fn insert_scoped(
        &mut self,
        name: impl Into<String>,
        scope: impl Into<String>,
        value: impl Into<String>,
    ) {
        let entry = self
            .0
            .entry(name.into())
            .or_insert_with(|| RawParam::Scoped(BTreeMap::new()));
        match entry {
            RawParam::Scoped(map) => {
                map.insert(scope.into(), value.into());
            }
            RawParam::Value(_) => {
                let mut map = BTreeMap::new();
                map.insert(scope.into(), value.into());
                *entry = RawParam::Scoped(map);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&RawParam> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &RawParam)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn query_pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.split_once('=').unwrap_or((segment, "")))
}

fn split_scoped(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    let scope = key[open + 1..].strip_suffix(']')?;
    if open == 0 || scope.contains('[') || scope.contains(']') {
        return None;
    }
    Some((&key[..open], scope))
}

fn decode_lossy(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Find the undecoded value of the `filter` parameter
pub fn raw_filter_param(query: &str) -> Option<&str> {
    query_pairs(query)
        .filter(|(key, _)| decode_lossy(key) == "filter")
        .map(|(_, value)| value)
        .last()
}

fn member_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9_\- ]*[A-Za-z0-9])?$")
            .expect("valid member name pattern")
    })
}

/// Whether `name` is a legal attribute/relationship name
pub fn is_valid_member_name(name: &str) -> bool {
    member_name_pattern().is_match(name)
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One `sort` item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub field: String,
    pub direction: SortDirection,
}

impl SortField {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Query parameters after parsing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedParams {
    pub include: Option<Vec<String>>,
    pub sort: Option<Vec<SortField>>,
    pub page: Option<BTreeMap<String, u64>>,
    pub fields: Option<BTreeMap<String, Vec<String>>>,
    pub filter: Option<Vec<FilterNode>>,
    /// Implementation-specific parameters, untouched
    pub custom: BTreeMap<String, RawParam>,
}

/// Settings that influence parameter validation
#[derive(Debug, Clone, Copy)]
pub struct ParamOptions<'a> {
    /// Filter operators legal for the addressed type
    pub operators: &'a OperatorSet,
    pub max_page_size: Option<u64>,
}

impl ParsedParams {
    /// Parse every parameter family present in `raw`
    pub fn parse(
        raw: &RawParams,
        raw_query_string: Option<&str>,
        options: ParamOptions<'_>,
    ) -> ApiResult<Self> {
        let mut parsed = ParsedParams::default();

        for (name, param) in raw.iter() {
            match name.as_str() {
                "include" => parsed.include = Some(parse_list(name, param)?),
                "sort" => parsed.sort = Some(parse_sort(name, param)?),
                "page" => parsed.page = Some(parse_page(name, param, options.max_page_size)?),
                "fields" => parsed.fields = Some(parse_fields(name, param)?),
                "filter" => {
                    let value = expect_value(name, param)?;
                    let source = raw_query_string.and_then(raw_filter_param).unwrap_or(value);
                    parsed.filter = Some(parse_filter(source, options.operators)?);
                }
                other if is_reserved_name(other) => {
                    return Err(RequestError::UnsupportedParam(other.to_string()).into())
                }
                _ => {
                    parsed.custom.insert(name.clone(), param.clone());
                }
            }
        }

        Ok(parsed)
    }

    /// Page offset, 0 when absent
    pub fn offset(&self) -> u64 {
        self.page_value("offset").unwrap_or(0)
    }

    pub fn limit(&self) -> Option<u64> {
        self.page_value("limit")
    }

    fn page_value(&self, key: &str) -> Option<u64> {
        self.page.as_ref().and_then(|page| page.get(key).copied())
    }
}

/// Lowercase-only names belong to the protocol
fn is_reserved_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_lowercase())
}

fn expect_value<'a>(name: &str, param: &'a RawParam) -> RequestResult<&'a str> {
    match param {
        RawParam::Value(value) => Ok(value),
        RawParam::Scoped(_) => Err(RequestError::ExpectedUnscoped(name.to_string())),
    }
}

fn split_decoded(value: &str) -> Vec<String> {
    value
        .split(',')
        .filter(|item| !item.is_empty())
        .map(decode_lossy)
        .collect()
}

fn parse_list(name: &str, param: &RawParam) -> RequestResult<Vec<String>> {
    expect_value(name, param).map(split_decoded)
}

fn parse_sort(name: &str, param: &RawParam) -> RequestResult<Vec<SortField>> {
    Ok(parse_list(name, param)?
        .into_iter()
        .map(|item| match item.strip_prefix('-') {
            Some(field) => SortField::desc(field),
            None => SortField::asc(item),
        })
        .collect())
}

fn parse_page(
    name: &str,
    param: &RawParam,
    max_page_size: Option<u64>,
) -> RequestResult<BTreeMap<String, u64>> {
    let scoped = match param {
        RawParam::Scoped(map) => map,
        RawParam::Value(_) => return Err(RequestError::ExpectedScoped(name.to_string())),
    };

    let mut page = BTreeMap::new();
    for (key, raw_value) in scoped {
        let value = decode_lossy(raw_value);
        let number = value
            .parse::<u64>()
            .map_err(|_| RequestError::InvalidParamValue {
                param: format!("{}[{}]", name, key),
                value: value.clone(),
            })?;
        page.insert(key.clone(), number);
    }

    if let (Some(limit), Some(max)) = (page.get("limit"), max_page_size) {
        if *limit > max {
            return Err(RequestError::PageSizeExceeded { limit: *limit, max });
        }
    }

    Ok(page)
}

fn parse_fields(name: &str, param: &RawParam) -> RequestResult<BTreeMap<String, Vec<String>>> {
    let scoped = match param {
        RawParam::Scoped(map) => map,
        RawParam::Value(_) => return Err(RequestError::ExpectedScoped(name.to_string())),
    };

    Ok(scoped
        .iter()
        .map(|(type_name, value)| {
            let fields = split_decoded(value)
                .into_iter()
                .filter(|f| f != "id" && f != "type" && is_valid_member_name(f))
                .collect();
            (type_name.clone(), fields)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ComparisonOperator, FieldConstraint};
    use serde_json::json;

    fn parse(query: &str) -> ApiResult<ParsedParams> {
        let operators = OperatorSet::default();
        ParsedParams::parse(
            &RawParams::from_query_string(query),
            Some(query),
            ParamOptions {
                operators: &operators,
                max_page_size: Some(100),
            },
        )
    }

    #[test]
    fn test_raw_params_scoping() {
        let raw = RawParams::from_query_string("page[offset]=0&page%5Blimit%5D=10&sort=name");
        match raw.get("page") {
            Some(RawParam::Scoped(map)) => {
                assert_eq!(map.get("offset").map(String::as_str), Some("0"));
                assert_eq!(map.get("limit").map(String::as_str), Some("10"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(raw.get("sort"), Some(&RawParam::Value("name".into())));
    }

    #[test]
    fn test_sort() {
        let parsed = parse("sort=-created,title").unwrap();
        assert_eq!(
            parsed.sort.unwrap(),
            vec![SortField::desc("created"), SortField::asc("title")]
        );
    }

    #[test]
    fn test_include_items_decoded() {
        let parsed = parse("include=author,comments%2Eauthor").unwrap();
        assert_eq!(
            parsed.include.unwrap(),
            vec!["author".to_string(), "comments.author".to_string()]
        );
    }

    #[test]
    fn test_page() {
        let parsed = parse("page[offset]=20&page[limit]=10").unwrap();
        assert_eq!(parsed.offset(), 20);
        assert_eq!(parsed.limit(), Some(10));
    }

    #[test]
    fn test_page_value_must_be_integer() {
        let err = parse("page[offset]=abc").unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(
            err.source.unwrap().parameter.as_deref(),
            Some("page[offset]")
        );
    }

    #[test]
    fn test_page_must_be_scoped() {
        assert_eq!(parse("page=3").unwrap_err().status, 400);
    }

    #[test]
    fn test_page_size_limit() {
        assert!(parse("page[limit]=100").is_ok());
        assert_eq!(parse("page[limit]=101").unwrap_err().status, 400);
    }

    #[test]
    fn test_fields_drop_reserved_and_invalid() {
        let parsed = parse("fields[people]=name,id,type,bad!name,age").unwrap();
        let fields = parsed.fields.unwrap();
        assert_eq!(
            fields.get("people").unwrap(),
            &vec!["name".to_string(), "age".to_string()]
        );
    }

    #[test]
    fn test_filter_uses_raw_value() {
        let parsed = parse("filter=(title,'a%2Cb')").unwrap();
        assert_eq!(
            parsed.filter.unwrap(),
            vec![FieldConstraint::new("title", ComparisonOperator::Eq, json!("a,b")).into()]
        );
    }

    #[test]
    fn test_filter_error_is_400() {
        let err = parse("filter=(and,(age,gt,21))").unwrap_err();
        assert_eq!(err.status, 400);
        assert!(err.detail.unwrap().contains("and"));
    }

    #[test]
    fn test_unknown_lowercase_param_rejected() {
        let err = parse("bogus=1").unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[test]
    fn test_custom_params_pass_through() {
        let parsed = parse("myParam=1&x_y=2").unwrap();
        assert!(parsed.custom.contains_key("myParam"));
        assert!(parsed.custom.contains_key("x_y"));
    }

    #[test]
    fn test_raw_filter_scanner() {
        assert_eq!(
            raw_filter_param("sort=a&filter=(a,'%2C')&x=1"),
            Some("(a,'%2C')")
        );
        assert_eq!(raw_filter_param("sort=a"), None);
    }

    #[test]
    fn test_member_names() {
        assert!(is_valid_member_name("a"));
        assert!(is_valid_member_name("first-name"));
        assert!(!is_valid_member_name("-name"));
        assert!(!is_valid_member_name("na!me"));
    }
}
