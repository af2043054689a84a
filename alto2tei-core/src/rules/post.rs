// Rules applied to the TEI document produced by the second transform.

use crate::config::RuleConfig;

pub fn default_rules() -> Vec<RuleConfig> {
    vec![
        // The transform emits <?div?> / <?div /?> where a real tag would unbalance it
        RuleConfig::new("div-open", r"<\?div\?>", "<div>"),
        RuleConfig::new("div-close", r"<\?div /\?>", "</div>"),
        RuleConfig::new(
            "page-break-paragraph-merge",
            r"</p>\s*(<pb[^>]*/>)\s*<p[^>]*>\s*(\p{Ll})",
            "\n${1}${2}",
        ),
        RuleConfig::new(
            "note-label",
            r#"(<note xml:id="[^"]+">)\s*[0-9]+\.\s+"#,
            "${1}\n",
        ),
        RuleConfig::new("note-anchor-space", r" +(<note)", "${1}"),
        RuleConfig::new("line-endings", r"\r\n|\r|\n", ""),
    ]
}
