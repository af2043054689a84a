use crate::config::RuleConfig;
use crate::error::{ConversionError, Result};
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;
use tracing::{debug, trace};

/// Upper bound on passes for a repeating rule before it counts as diverging
pub const MAX_REPEAT_PASSES: usize = 1_000;

/// Character data between two tags, with the closing `>` of the first one
static TEXT_SEGMENT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r">[^<]+").unwrap());

/// One compiled pattern/replacement pair.
///
/// Replacement templates use the `regex` crate syntax: `$1`, `${1}`,
/// `$name`, `${name}`, and `$$` for a literal dollar. Every group the
/// template names must exist in the pattern, so a typo fails at compile
/// time instead of silently expanding to nothing.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    name: String,
    regex: Regex,
    replacement: String,
    repeat: bool,
    text_only: bool,
}

impl RewriteRule {
    pub fn compile(config: &RuleConfig) -> Result<Self> {
        let regex = Regex::new(&config.pattern).map_err(|source| ConversionError::InvalidPattern {
            name: config.name.clone(),
            source,
        })?;
        validate_template(&regex, &config.replacement).map_err(|detail| {
            ConversionError::InvalidReplacement {
                name: config.name.clone(),
                detail,
            }
        })?;

        Ok(Self {
            name: config.name.clone(),
            regex,
            replacement: config.replacement.clone(),
            repeat: config.repeat,
            text_only: config.text_only,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Global leftmost substitution over the whole content, or over each
    /// text segment for a text-only rule. A repeating rule runs again on its
    /// own output until nothing changes.
    pub fn apply(&self, content: String) -> Result<String> {
        if !self.repeat {
            return Ok(self.substitute(content).0);
        }

        let mut current = content;
        for pass in 1..=MAX_REPEAT_PASSES {
            let (next, changed) = self.substitute(current);
            if !changed {
                trace!(rule = %self.name, passes = pass, "rule converged");
                return Ok(next);
            }
            current = next;
        }

        Err(ConversionError::RuleDidNotConverge {
            name: self.name.clone(),
            passes: MAX_REPEAT_PASSES,
        })
    }

    fn substitute(&self, content: String) -> (String, bool) {
        let replaced = if self.text_only {
            TEXT_SEGMENT.replace_all(&content, |caps: &Captures| {
                let text = &caps[0][1..];
                format!(">{}", self.regex.replace_all(text, self.replacement.as_str()))
            })
        } else {
            self.regex.replace_all(&content, self.replacement.as_str())
        };
        let replaced = match replaced {
            Cow::Borrowed(_) => None,
            Cow::Owned(replaced) => Some(replaced),
        };

        match replaced {
            Some(replaced) if replaced != content => (replaced, true),
            _ => (content, false),
        }
    }
}

/// An ordered list of rules, each one feeding the next.
#[derive(Debug, Clone)]
pub struct RuleSet {
    label: String,
    rules: Vec<RewriteRule>,
}

impl RuleSet {
    /// Compile every rule up front; the first malformed one fails the set.
    pub fn compile(label: &str, configs: &[RuleConfig]) -> Result<Self> {
        let rules = configs
            .iter()
            .map(RewriteRule::compile)
            .collect::<Result<Vec<_>>>()?;
        debug!("compiled {} {} rules", rules.len(), label);

        Ok(Self {
            label: label.to_string(),
            rules,
        })
    }

    pub fn apply(&self, content: &str) -> Result<String> {
        let mut current = content.to_string();
        for rule in &self.rules {
            let before = current.len();
            current = rule.apply(current)?;
            if current.len() != before {
                trace!(set = %self.label, rule = rule.name(), before, after = current.len(), "rule applied");
            }
        }
        Ok(current)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(RewriteRule::name)
    }
}

/// Compile and apply a rule list in one go
pub fn apply(content: &str, rules: &[RuleConfig]) -> Result<String> {
    RuleSet::compile("ad hoc", rules)?.apply(content)
}

/// Check that every group referenced by the template exists in the pattern.
fn validate_template(regex: &Regex, template: &str) -> std::result::Result<(), String> {
    let mut rest = template;
    while let Some(pos) = rest.find('$') {
        rest = &rest[pos + 1..];
        if let Some(after) = rest.strip_prefix('$') {
            rest = after;
            continue;
        }

        let (group, remaining) = if let Some(braced) = rest.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], &braced[end + 1..]),
                None => return Err("unclosed '${' group reference".to_string()),
            }
        } else {
            let end = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(rest.len());
            (&rest[..end], &rest[end..])
        };
        rest = remaining;

        if group.is_empty() {
            continue;
        }
        let known = match group.parse::<usize>() {
            Ok(index) => index < regex.captures_len(),
            Err(_) => regex.capture_names().flatten().any(|name| name == group),
        };
        if !known {
            return Err(format!("unknown capture group '{group}'"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, replacement: &str) -> RuleConfig {
        RuleConfig::new("test", pattern, replacement)
    }

    #[test]
    fn empty_rule_list_is_identity() {
        let content = "<p>\nQu'il   vienne...\n</p>\r\n";
        assert_eq!(apply(content, &[]).unwrap(), content);
    }

    #[test]
    fn unmatched_rule_passes_content_through() {
        assert_eq!(apply("abc", &[rule("xyz", "")]).unwrap(), "abc");
    }

    #[test]
    fn substitution_is_global_over_whole_content() {
        let out = apply("a-b\nc-d", &[rule("-", "+")]).unwrap();
        assert_eq!(out, "a+b\nc+d");
    }

    #[test]
    fn numbered_and_named_backreferences() {
        let rules = [
            rule(r"(\w+)@(\w+)", "${2}:$1"),
            rule(r"(?P<word>x+)", "[$word]"),
        ];
        assert_eq!(apply("ab@cd xx", &rules).unwrap(), "cd:ab [xx]");
    }

    #[test]
    fn rules_feed_each_other_in_order() {
        let forward = [rule("a", "b"), rule("b", "c")];
        let backward = [rule("b", "c"), rule("a", "b")];
        assert_eq!(apply("ab", &forward).unwrap(), "cc");
        assert_eq!(apply("ab", &backward).unwrap(), "bc");
    }

    #[test]
    fn repeating_rule_runs_until_stable() {
        let once = rule(r"(>[^<]*?)ae", "${1}æ");
        let repeated = RuleConfig::repeated("lig", r"(>[^<]*?)ae", "${1}æ");
        assert_eq!(apply("<p>aeae</p>", &[once]).unwrap(), "<p>æae</p>");
        assert_eq!(apply("<p>aeae</p>", &[repeated]).unwrap(), "<p>ææ</p>");
    }

    #[test]
    fn text_only_rule_leaves_markup_alone() {
        let lig = RuleConfig::in_text("lig", "ae", "æ");
        assert_eq!(
            apply(r#"<page id="aeae">vitae aeterna<i>praeda</i>ae</page>"#, &[lig]).unwrap(),
            r#"<page id="aeae">vitæ æterna<i>præda</i>æ</page>"#
        );
    }

    #[test]
    fn text_only_rule_is_a_single_pass() {
        let dense = format!("<p>\n{}\n</p>", "vitae ".repeat(3_000));
        let lig = RuleConfig::in_text("lig", "ae", "æ");
        let out = apply(&dense, &[lig]).unwrap();
        assert_eq!(out.matches('æ').count(), 3_000);
        assert!(!out.contains("ae"));
    }

    #[test]
    fn text_before_the_first_tag_is_not_a_segment() {
        let lig = RuleConfig::in_text("lig", "ae", "æ");
        assert_eq!(apply("ae<p>ae</p>", &[lig]).unwrap(), "ae<p>æ</p>");
    }

    #[test]
    fn diverging_rule_is_an_error() {
        let rotate = RuleConfig::repeated("rotate", r"^(.)(.*)$", "${2}${1}");
        let err = apply("ab", &[rotate]).unwrap_err();
        assert!(matches!(err, ConversionError::RuleDidNotConverge { ref name, .. } if name == "rotate"));
    }

    #[test]
    fn malformed_pattern_fails_compilation() {
        let err = RuleSet::compile("pre", &[rule("(unclosed", "")]).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidPattern { .. }));
    }

    #[test]
    fn replacement_with_unknown_group_fails_compilation() {
        let err = RuleSet::compile("pre", &[rule("(a)", "$2")]).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidReplacement { .. }));

        // `$1a` names a group called "1a", not group 1 followed by "a"
        let err = RuleSet::compile("pre", &[rule("(a)", "$1a")]).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidReplacement { .. }));

        let err = RuleSet::compile("pre", &[rule("(a)", "${1")]).unwrap_err();
        assert!(matches!(err, ConversionError::InvalidReplacement { .. }));
    }

    #[test]
    fn literal_dollar_is_accepted() {
        assert_eq!(apply("5", &[rule("(5)", "$$$1")]).unwrap(), "$5");
    }
}
