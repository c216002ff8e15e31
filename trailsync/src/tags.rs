//! Tag engine: rule-based resolution of Gherkin tags.
//!
//! A tag is a `@`-prefixed token attached to a feature or scenario. The
//! engine maps tags to reporting labels (epic, severity, test IDs) and to
//! links into external systems (issue tracker, TMS, TestRail), and decodes
//! tag values into typed scalars. Rules are matched in declaration order,
//! first match wins.

use log::warn;
use regex::Regex;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// A decoded tag value.
///
/// Decoding is an explicit ordered rule list: bare words stay strings, JSON
/// shapes are parsed (falling back to the raw string on failure), decimal
/// numbers become numeric, `true`/`false` become boolean, everything else
/// stays a string.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    Str(String),
    Num(f64),
    Bool(bool),
    Json(serde_json::Value),
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Str(s) => f.write_str(s),
            TagValue::Num(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            TagValue::Bool(b) => write!(f, "{b}"),
            TagValue::Json(v) => {
                let rendered = serde_json::to_string(v).unwrap_or_default();
                f.write_str(&rendered)
            }
        }
    }
}

fn bare_word_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[\w\-]+$").unwrap_or_else(|_| Regex::new(r"").unwrap())
    })
}

fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^-?\d+(\.\d+)?$").unwrap_or_else(|_| Regex::new(r"").unwrap())
    })
}

/// Decode the raw text captured from a tag into a [`TagValue`].
///
/// Never fails: an unparsable JSON shape is kept as the raw string with a
/// warning.
pub fn decode_value(value: &str) -> TagValue {
    // Simple words (including IDs like C12345) stay as-is.
    if bare_word_pattern().is_match(value) {
        return TagValue::Str(value.to_string());
    }

    if (value.starts_with('{') && value.ends_with('}'))
        || (value.starts_with('[') && value.ends_with(']'))
    {
        return match serde_json::from_str(value) {
            Ok(parsed) => TagValue::Json(parsed),
            Err(e) => {
                warn!("Failed to parse tag value as JSON: {value}: {e}");
                TagValue::Str(value.to_string())
            }
        };
    }

    if number_pattern().is_match(value)
        && let Ok(number) = value.parse::<f64>()
    {
        return TagValue::Num(number);
    }

    if value == "true" || value == "false" {
        return TagValue::Bool(value == "true");
    }

    TagValue::Str(value.to_string())
}

/// A reporting label extracted from a tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub name: String,
    pub value: String,
}

/// A link into an external system derived from a tag.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub link_type: String,
    pub url: String,
    pub name: Option<String>,
}

/// Function form of a link URL template.
pub type UrlFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// How a link rule turns an extracted tag value into a URL.
#[derive(Clone)]
pub enum UrlTemplate {
    /// Template string with a single `%s` placeholder; the value is
    /// percent-encoded before substitution.
    Literal(String),
    /// Arbitrary function from extracted value to URL.
    Computed(UrlFn),
}

impl UrlTemplate {
    fn render(&self, value: &str) -> String {
        match self {
            UrlTemplate::Literal(template) => {
                template.replacen("%s", &urlencoding::encode(value), 1)
            }
            UrlTemplate::Computed(f) => f(value),
        }
    }
}

impl fmt::Debug for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrlTemplate::Literal(template) => f.debug_tuple("Literal").field(template).finish(),
            UrlTemplate::Computed(_) => f.debug_tuple("Computed").field(&"<fn>").finish(),
        }
    }
}

/// A label extraction rule: ordered patterns, first capturing match wins.
#[derive(Debug, Clone)]
pub struct LabelRule {
    pub name: String,
    pub patterns: Vec<Regex>,
}

impl LabelRule {
    /// Build a rule from string patterns. Invalid patterns are logged and
    /// skipped, never fatal.
    pub fn new(name: &str, patterns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            patterns: compile_patterns(patterns),
        }
    }
}

/// A link derivation rule: ordered patterns plus URL/name templates.
#[derive(Debug, Clone)]
pub struct LinkRule {
    pub link_type: String,
    pub patterns: Vec<Regex>,
    pub url_template: UrlTemplate,
    pub name_template: Option<String>,
}

impl LinkRule {
    /// Build a rule from string patterns. Invalid patterns are logged and
    /// skipped, never fatal.
    pub fn new(
        link_type: &str,
        patterns: &[&str],
        url_template: UrlTemplate,
        name_template: Option<&str>,
    ) -> Self {
        Self {
            link_type: link_type.to_string(),
            patterns: compile_patterns(patterns),
            url_template,
            name_template: name_template.map(String::from),
        }
    }
}

fn compile_patterns(patterns: &[&str]) -> Vec<Regex> {
    let mut compiled = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        match Regex::new(pattern) {
            Ok(regex) => compiled.push(regex),
            Err(e) => warn!("Invalid tag pattern skipped: {pattern}: {e}"),
        }
    }
    compiled
}

/// The active table of label and link rules.
///
/// Explicitly constructed and handed to [`TagParser`] by ownership; there is
/// no process-wide registry.
#[derive(Debug, Clone, Default)]
pub struct TagConfig {
    pub labels: Vec<LabelRule>,
    pub links: Vec<LinkRule>,
}

impl TagConfig {
    /// The stock rule table.
    ///
    /// TestRail case/suite links are derived from the instance host and are
    /// only present when a host is supplied.
    pub fn standard(testrail_host: Option<&str>) -> Self {
        let labels = vec![
            LabelRule::new("epic", &[r"@epic:(.*)"]),
            LabelRule::new("severity", &[r"@severity:(.*)"]),
            LabelRule::new("testId", &[r"@testrail:(C\d+|\d+)"]),
            LabelRule::new("suiteId", &[r"@testsuite:(\d+)"]),
        ];

        let mut links = vec![
            LinkRule::new(
                "issue",
                &[r"@issue:(.*)"],
                UrlTemplate::Literal("https://issues.example.com/%s".to_string()),
                Some("ISSUE %s"),
            ),
            LinkRule::new(
                "tms",
                &[r"@tms:(.*)"],
                UrlTemplate::Literal("https://tms.example.com/%s".to_string()),
                None,
            ),
            LinkRule::new(
                "jira",
                &[r"@jira:(.*)"],
                UrlTemplate::Computed(Arc::new(|value| {
                    format!("https://example.atlassian.net/browse/{value}")
                })),
                None,
            ),
        ];

        if let Some(host) = testrail_host {
            let host = host.trim_end_matches('/').to_string();
            let case_host = host.clone();
            links.push(LinkRule::new(
                "testrail",
                &[r"@testrail:(C\d+|\d+)"],
                UrlTemplate::Computed(Arc::new(move |value| {
                    let case_id = value.trim_start_matches(['C', 'c']);
                    format!("{case_host}/index.php?/cases/view/{case_id}")
                })),
                Some("TestRail Case %s"),
            ));
            links.push(LinkRule::new(
                "testsuite",
                &[r"@testsuite:(\d+)"],
                UrlTemplate::Computed(Arc::new(move |value| {
                    format!("{host}/index.php?/suites/view/{value}")
                })),
                Some("TestRail Suite %s"),
            ));
        }

        Self { labels, links }
    }
}

/// A parsed tag: the original token plus everything the rules resolved.
///
/// Created fresh per [`TagParser::parse`] call and never mutated; re-parsing
/// is idempotent.
#[derive(Debug, Clone)]
pub struct ParsedTag {
    pub original: String,
    pub label: Option<Label>,
    pub link: Option<Link>,
    pub value: Option<TagValue>,
}

/// Resolves tags against an injected rule configuration.
#[derive(Debug, Clone)]
pub struct TagParser {
    config: TagConfig,
}

impl TagParser {
    /// Create a parser over an explicitly constructed configuration.
    pub fn new(config: TagConfig) -> Self {
        Self { config }
    }

    /// The active rule configuration.
    pub fn config(&self) -> &TagConfig {
        &self.config
    }

    /// Match a tag against the label rules.
    ///
    /// Iterates rules in declaration order, each rule's patterns in order,
    /// and returns on the first match with a capture group.
    pub fn match_label(&self, tag: &str) -> Option<Label> {
        for rule in &self.config.labels {
            for pattern in &rule.patterns {
                if let Some(captures) = pattern.captures(tag)
                    && let Some(value) = captures.get(1)
                {
                    return Some(Label {
                        name: rule.name.clone(),
                        value: decode_value(value.as_str()).to_string(),
                    });
                }
            }
        }
        None
    }

    /// Match a tag against the link rules.
    ///
    /// At most one link is derived per tag: the first rule (declaration
    /// order) with a capturing match wins.
    pub fn match_link(&self, tag: &str) -> Option<Link> {
        for rule in &self.config.links {
            for pattern in &rule.patterns {
                if let Some(captures) = pattern.captures(tag)
                    && let Some(value) = captures.get(1)
                {
                    let value = value.as_str();
                    return Some(Link {
                        link_type: rule.link_type.clone(),
                        url: rule.url_template.render(value),
                        name: rule
                            .name_template
                            .as_ref()
                            .map(|template| template.replacen("%s", value, 1)),
                    });
                }
            }
        }
        None
    }

    /// Parse a tag into its resolved information.
    pub fn parse(&self, tag: &str) -> ParsedTag {
        let value = match tag.split_once(':') {
            // A bare `@name` is a simple flag tag.
            None => tag_name_pattern()
                .is_match(tag)
                .then_some(TagValue::Bool(true)),
            Some((prefix, suffix)) => (tag_name_pattern().is_match(prefix)
                && !suffix.is_empty())
            .then(|| decode_value(suffix)),
        };

        ParsedTag {
            original: tag.to_string(),
            label: self.match_label(tag),
            link: self.match_link(tag),
            value,
        }
    }
}

fn tag_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^@\w+$").unwrap_or_else(|_| Regex::new(r"").unwrap()))
}

fn case_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)@testrail:C?(\d+)").unwrap_or_else(|_| Regex::new(r"").unwrap())
    })
}

fn suite_id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)@testsuite:(\d+)").unwrap_or_else(|_| Regex::new(r"").unwrap())
    })
}

/// Extract a TestRail case ID from a tag like `@testrail:C12345` or
/// `@testrail:12345`.
pub fn extract_case_id(tag: &str) -> Option<u64> {
    case_id_pattern()
        .captures(tag)
        .and_then(|captures| captures.get(1))
        .and_then(|id| id.as_str().parse().ok())
}

/// Extract a TestRail suite ID from a tag like `@testsuite:123`.
pub fn extract_suite_id(tag: &str) -> Option<u64> {
    suite_id_pattern()
        .captures(tag)
        .and_then(|captures| captures.get(1))
        .and_then(|id| id.as_str().parse().ok())
}

/// Extract case IDs from a tag list, deduplicated, first-occurrence order
/// preserved.
pub fn extract_case_ids_from_tags<S: AsRef<str>>(tags: &[S]) -> Vec<u64> {
    let mut case_ids = Vec::new();
    for tag in tags {
        if let Some(case_id) = extract_case_id(tag.as_ref())
            && !case_ids.contains(&case_id)
        {
            case_ids.push(case_id);
        }
    }
    case_ids
}

/// Extract suite IDs from a tag list, deduplicated, first-occurrence order
/// preserved.
pub fn extract_suite_ids_from_tags<S: AsRef<str>>(tags: &[S]) -> Vec<u64> {
    let mut suite_ids = Vec::new();
    for tag in tags {
        if let Some(suite_id) = extract_suite_id(tag.as_ref())
            && !suite_ids.contains(&suite_id)
        {
            suite_ids.push(suite_id);
        }
    }
    suite_ids
}

/// Format a whole-second duration the way TestRail expects (`"2m 30s"` or
/// `"45s"`).
pub fn format_elapsed(total_seconds: u64) -> String {
    let minutes = total_seconds / 60;
    let seconds = total_seconds % 60;

    if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

/// Flag tags recognized without a configured rule, with descriptions.
const SUPPORTED_FLAG_TAGS: &[(&str, &str)] = &[
    ("@smoke", "Smoke test"),
    ("@regression", "Regression test"),
    ("@integration", "Integration test"),
    ("@e2e", "End-to-end test"),
    ("@critical", "Critical test"),
    ("@flaky", "Known flaky test"),
    ("@slow", "Slow running test"),
    ("@manual", "Manual test"),
    ("@automated", "Automated test"),
    ("@wip", "Work in progress"),
    ("@ignore", "Ignored test"),
    ("@skip", "Skipped test"),
    ("@ci", "CI-only test"),
    ("@local", "Local-only test"),
    ("@test", "General test tag"),
];

/// Whether a tag is known: either one of the supported flag tags or matched
/// by a configured label/link rule.
pub fn is_supported_tag(tag: &str, parser: &TagParser) -> bool {
    if SUPPORTED_FLAG_TAGS.iter().any(|(flag, _)| *flag == tag) {
        return true;
    }
    let parsed = parser.parse(tag);
    parsed.label.is_some() || parsed.link.is_some()
}

/// Validate a list of tags, keeping well-formed ones.
///
/// Tags missing the `@` sigil are dropped with a warning; unknown tags are
/// kept but warned about.
pub fn validate_tags(tags: &[String], parser: &TagParser) -> Vec<String> {
    tags.iter()
        .filter(|tag| {
            if !tag.starts_with('@') {
                warn!("Tag '{tag}' does not start with @, it may not work as expected");
                return false;
            }
            if !is_supported_tag(tag, parser) {
                warn!("Tag '{tag}' is not in the list of supported tags");
            }
            !tag.is_empty()
        })
        .cloned()
        .collect()
}

/// Parse a comma-separated tags string (the `TAGS` environment value) and
/// validate the entries.
pub fn parse_tags_string(tags_string: &str, parser: &TagParser) -> Vec<String> {
    let tags: Vec<String> = tags_string
        .split(',')
        .map(|tag| tag.trim().to_string())
        .filter(|tag| !tag.is_empty())
        .collect();
    validate_tags(&tags, parser)
}

/// Join tags into a Cucumber tag expression (`"@a or @b"`).
pub fn format_for_cucumber(tags: &[String]) -> String {
    tags.join(" or ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> TagParser {
        TagParser::new(TagConfig::standard(Some("https://example.testrail.io")))
    }

    #[test]
    fn test_decode_bare_word_stays_string() {
        assert_eq!(decode_value("high"), TagValue::Str("high".to_string()));
        // Bare digits match the word rule first and stay strings.
        assert_eq!(decode_value("123"), TagValue::Str("123".to_string()));
        assert_eq!(decode_value("C123"), TagValue::Str("C123".to_string()));
    }

    #[test]
    fn test_decode_json_object() {
        let decoded = decode_value(r#"{"a":1}"#);
        assert_eq!(decoded, TagValue::Json(serde_json::json!({"a": 1})));
    }

    #[test]
    fn test_decode_json_is_idempotent() {
        let once = decode_value(r#"{"a":1}"#);
        let twice = decode_value(&once.to_string());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_decode_invalid_json_falls_back_to_string() {
        let decoded = decode_value("{not json}");
        assert_eq!(decoded, TagValue::Str("{not json}".to_string()));
    }

    #[test]
    fn test_decode_decimal_number() {
        assert_eq!(decode_value("-1.5"), TagValue::Num(-1.5));
    }

    #[test]
    fn test_match_label_first_rule_wins() {
        let config = TagConfig {
            labels: vec![
                LabelRule::new("first", &[r"@dup:(.*)"]),
                LabelRule::new("second", &[r"@dup:(.*)"]),
            ],
            links: Vec::new(),
        };
        let parser = TagParser::new(config);
        let label = parser.match_label("@dup:value").unwrap();
        assert_eq!(label.name, "first");
        assert_eq!(label.value, "value");
    }

    #[test]
    fn test_match_label_standard_rules() {
        let parser = parser();
        let label = parser.match_label("@severity:high").unwrap();
        assert_eq!(label.name, "severity");
        assert_eq!(label.value, "high");

        let label = parser.match_label("@testrail:C12345").unwrap();
        assert_eq!(label.name, "testId");
        assert_eq!(label.value, "C12345");

        assert!(parser.match_label("@nonsense").is_none());
    }

    #[test]
    fn test_invalid_pattern_is_skipped() {
        let rule = LabelRule::new("broken", &[r"@broken:((", r"@broken:(.*)"]);
        assert_eq!(rule.patterns.len(), 1);

        let parser = TagParser::new(TagConfig {
            labels: vec![rule],
            links: Vec::new(),
        });
        let label = parser.match_label("@broken:x").unwrap();
        assert_eq!(label.value, "x");
    }

    #[test]
    fn test_match_link_literal_template_encodes() {
        let parser = parser();
        let link = parser.match_link("@issue:ABC 1").unwrap();
        assert_eq!(link.link_type, "issue");
        assert_eq!(link.url, "https://issues.example.com/ABC%201");
        assert_eq!(link.name.as_deref(), Some("ISSUE ABC 1"));
    }

    #[test]
    fn test_match_link_computed_testrail_case() {
        let parser = parser();
        let link = parser.match_link("@testrail:C12345").unwrap();
        assert_eq!(link.link_type, "testrail");
        assert_eq!(
            link.url,
            "https://example.testrail.io/index.php?/cases/view/12345"
        );
        assert_eq!(link.name.as_deref(), Some("TestRail Case C12345"));
    }

    #[test]
    fn test_no_testrail_links_without_host() {
        let parser = TagParser::new(TagConfig::standard(None));
        assert!(parser.match_link("@testrail:C12345").is_none());
        // tracker links stay available
        assert!(parser.match_link("@jira:ABC-1").is_some());
    }

    #[test]
    fn test_parse_flag_tag() {
        let parsed = parser().parse("@smoke");
        assert_eq!(parsed.original, "@smoke");
        assert_eq!(parsed.value, Some(TagValue::Bool(true)));
        assert!(parsed.label.is_none());
    }

    #[test]
    fn test_parse_value_tag() {
        let parsed = parser().parse("@epic:checkout");
        assert_eq!(parsed.value, Some(TagValue::Str("checkout".to_string())));
        assert_eq!(parsed.label.unwrap().name, "epic");
    }

    #[test]
    fn test_extract_case_id() {
        assert_eq!(extract_case_id("@testrail:C12345"), Some(12345));
        assert_eq!(extract_case_id("@testrail:12345"), Some(12345));
        assert_eq!(extract_case_id("@TESTRAIL:c7"), Some(7));
        assert_eq!(extract_case_id("@nonsense"), None);
    }

    #[test]
    fn test_extract_suite_id() {
        assert_eq!(extract_suite_id("@testsuite:12"), Some(12));
        assert_eq!(extract_suite_id("@testsuite:"), None);
    }

    #[test]
    fn test_extract_case_ids_dedup_preserves_order() {
        let tags = vec![
            "@testrail:C3".to_string(),
            "@smoke".to_string(),
            "@testrail:C1".to_string(),
            "@testrail:3".to_string(),
        ];
        assert_eq!(extract_case_ids_from_tags(&tags), vec![3, 1]);
        // deterministic on re-run
        assert_eq!(extract_case_ids_from_tags(&tags), vec![3, 1]);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(45), "45s");
        assert_eq!(format_elapsed(150), "2m 30s");
        assert_eq!(format_elapsed(0), "0s");
        assert_eq!(format_elapsed(60), "1m 0s");
    }

    #[test]
    fn test_validate_tags_drops_missing_sigil() {
        let parser = parser();
        let tags = vec!["smoke".to_string(), "@smoke".to_string()];
        assert_eq!(validate_tags(&tags, &parser), vec!["@smoke".to_string()]);
    }

    #[test]
    fn test_parse_tags_string_and_cucumber_expression() {
        let parser = parser();
        let tags = parse_tags_string("@smoke, @regression ,,", &parser);
        assert_eq!(tags, vec!["@smoke".to_string(), "@regression".to_string()]);
        assert_eq!(format_for_cucumber(&tags), "@smoke or @regression");
    }
}
