// Rules applied to the concatenated intermediate markup, before the TEI
// envelope exists. Order is significant: spacing rules must see the text
// after hyphenation and marker cleanup, ligatures come after the elision
// and abbreviation rules, headings are detected last.

use crate::config::RuleConfig;

const NBSP: &str = "\u{a0}";

/// Inline styles whose adjacent duplicates get merged, outermost first
const MERGED_STYLES: [&str; 5] = ["b", "i", "u", "sc", "sub"];

pub fn default_rules() -> Vec<RuleConfig> {
    let mut rules = vec![
        // Running headers: page number first on even pages, last on odd pages
        RuleConfig::new(
            "running-header-even",
            r"(<page.*>)\n<p[^>]*>\n(?:<tt>)?([0-9]+).*\n</p>",
            "${1}\n<fw>${2}</fw>",
        ),
        RuleConfig::new(
            "running-header-odd",
            r"(<page.*>)\n<p[^>]*>\n[^0-9\n]+([0-9]+)(?:</tt>)?\n</p>",
            "${1}\n<fw>${2}</fw>",
        ),
        RuleConfig::new(
            "signature-number",
            r"[iI]+\. *[0-9]+(\s*</p>\s*</page>)",
            "${1}",
        ),
        // A quotation running over several lines repeats « at each line start
        RuleConfig::repeated(
            "guillemet-mark",
            r"(«[^»\n]*\n(?:<[^>]+>)?)«",
            "${1}µµµ«",
        ),
        RuleConfig::new("guillemet-erase", "µµµ«", ""),
        RuleConfig::new("small-leading-space", r"(<small>) +", "${1}"),
        RuleConfig::new("indentation", r"(\n) +", "${1}"),
        RuleConfig::new(
            "hyphenation-small",
            r"-</small>\n<small>([^ ]*)",
            "${1}\n",
        ),
        RuleConfig::new("small-line-join", "</small>\n<small>", "\n"),
    ];

    for tag in MERGED_STYLES {
        rules.push(RuleConfig::new(
            &format!("merge-{tag}"),
            &format!(r"</{tag}>(\s*)<{tag}>"),
            "${1}",
        ));
    }

    rules.extend([
        // After the merges, so a word split over two styled lines is joined
        RuleConfig::new(
            "hyphenation-line",
            r"(\p{L})-\n(\p{Ll}[^\s<]*) ?",
            "${1}${2}\n",
        ),
        RuleConfig::new("ellipsis", r"\.\.\.", "…"),
        RuleConfig::new("elision", r"([cCdDjJlLmMnNsStT]|qu|Qu)'", "${1}’"),
        RuleConfig::new("guillemet-open-space", "(«) ", "${1}"),
        RuleConfig::new(
            "guillemet-open-nbsp",
            &format!("(«)([^{NBSP}])"),
            &format!("${{1}}{NBSP}${{2}}"),
        ),
        RuleConfig::new(
            "double-punctuation-space",
            " ([;:!?»])",
            &format!("{NBSP}${{1}}"),
        ),
        RuleConfig::new("parenthesis-space", r"\)([^. ])", ") ${1}"),
        RuleConfig::new(
            "double-punctuation-nbsp",
            &format!("([^{NBSP}])([;!?»])"),
            &format!("${{1}}{NBSP}${{2}}"),
        ),
        RuleConfig::new(
            "entity-repair",
            &format!("(&#?[a-zA-Z0-9]+){NBSP};"),
            "${1};",
        ),
        RuleConfig::new(
            "double-punctuation-out-of-span",
            &format!(r"({NBSP}[;?!])</(i|sup)>"),
            "</${2}>${1}",
        ),
        RuleConfig::new(
            "punctuation-out-of-span",
            r"([,.])</(i|sup)>",
            "</${2}>${1}",
        ),
        RuleConfig::new("madame", "<sup>Mme</sup>", "M<sup>me</sup>"),
        // Ligatures only touch text, never tag names or attribute values
        RuleConfig::in_text("ligature-ae", "ae", "æ"),
        RuleConfig::in_text("ligature-oe", "oe", "œ"),
        RuleConfig::in_text("ligature-AE", "A[Ee]", "Æ"),
        RuleConfig::in_text("ligature-OE", "O[Ee]", "Œ"),
        RuleConfig::new(
            "note-number",
            r"<small>\s*<i>([0-9]+\.?)</i>",
            "<small>${1}",
        ),
        RuleConfig::new("format", "<sup>in-([0-9]+)°</sup>", "in-${1}°"),
        RuleConfig::new(
            "ordinal",
            "<sup>([0-9IVXLCMxvi]+)(er?|[èe]re)</sup>",
            "<num>${1}<sup>${2}</sup></num>",
        ),
        RuleConfig::new("parenthesis-out-of-italic", r"<i>\(", "(<i>"),
        // Headings, level given by the rule that matched
        RuleConfig::new(
            "heading-big",
            r"<p[^>]*>\s*<big>(.*)</big>\s*</p>",
            "<h1>${1}</h1>",
        ),
        RuleConfig::new(
            "heading-roman",
            r"<p[^>]*>\n([IVXLC]+\.?)\n</p>",
            "<h2>${1}</h2>",
        ),
        RuleConfig::new(
            "heading-caps",
            r"<p[^>]*>\n([0-9A-ZÉÈÀÇŒÆ'’]+)\n</p>",
            "<h1>${1}</h1>",
        ),
    ]);

    for level in 1..=6 {
        rules.push(RuleConfig::new(
            &format!("heading-merge-{level}"),
            &format!(r"</h{level}>\s*<h{level}>"),
            " ",
        ));
    }

    rules.extend([
        RuleConfig::new("heading-open", "<h([1-6])>", r#"<head n="${1}">"#),
        RuleConfig::new("heading-close", "</h([1-6])>", "</head>"),
    ]);

    rules
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::engine::{apply, RuleSet};

    fn pre(content: &str) -> String {
        apply(content, &default_rules()).unwrap()
    }

    fn only(names: &[&str]) -> Vec<RuleConfig> {
        let rules = default_rules();
        names
            .iter()
            .map(|name| {
                rules
                    .iter()
                    .find(|r| r.name == *name)
                    .cloned()
                    .unwrap_or_else(|| panic!("no rule named {name}"))
            })
            .collect()
    }

    #[test]
    fn default_table_compiles() {
        let set = RuleSet::compile("pre", &default_rules()).unwrap();
        assert_eq!(set.len(), default_rules().len());
        let names: Vec<_> = set.names().collect();
        let mark = names.iter().position(|n| *n == "guillemet-mark").unwrap();
        assert_eq!(names[mark + 1], "guillemet-erase");
    }

    #[test]
    fn running_header_on_even_page() {
        let out = pre("<page id=\"a\">\n<p>\n<tt>12</tt> HISTOIRE\n</p>\n<p>\ntexte\n</p>\n</page>\n");
        assert!(out.starts_with("<page id=\"a\">\n<fw>12</fw>\n<p>"), "{out}");
    }

    #[test]
    fn running_header_on_odd_page() {
        let out = pre("<page id=\"a\">\n<p>\nLIVRE PREMIER 13\n</p>\n<p>\ntexte\n</p>\n</page>\n");
        assert!(out.starts_with("<page id=\"a\">\n<fw>13</fw>\n<p>"), "{out}");
    }

    #[test]
    fn odd_header_stays_on_its_line() {
        let content = "<page id=\"a\">\n<p>\nun texte\nsur 2 lignes\n</p>\n</page>\n";
        assert!(!pre(content).contains("<fw>"));
    }

    #[test]
    fn signature_number_is_stripped() {
        let out = pre("<p>\nfin du cahier\nii. 12\n</p>\n</page>\n");
        assert!(!out.contains("12"), "{out}");
        assert!(out.contains("fin du cahier"));
    }

    #[test]
    fn continued_quotation_guillemets_are_removed() {
        let out = pre("<p>\n«Il dit\n«encore\n«et encore»\n</p>");
        assert!(!out.contains('µ'));
        assert_eq!(out.matches('«').count(), 1, "{out}");
        assert!(out.contains("Il dit\nencore\net encore"), "{out}");
    }

    #[test]
    fn hyphenated_small_lines_are_rejoined() {
        let out = pre("<p>\n<small>un mot cou-</small>\n<small>pé net</small>\n</p>");
        assert_eq!(out, "<p>\n<small>un mot coupé\n net</small>\n</p>");
    }

    #[test]
    fn hyphenated_regular_lines_are_rejoined() {
        let out = pre("<p>\nun mot cou-\npé net\n</p>");
        assert_eq!(out, "<p>\nun mot coupé\nnet\n</p>");

        let compound = pre("<p>\nJean-\nPierre\n</p>");
        assert!(compound.contains("Jean-\nPierre"));
    }

    #[test]
    fn hyphenated_styled_lines_are_rejoined() {
        assert_eq!(
            pre("<p>\nun <i>magni-</i>\n<i>fique</i> ici\n</p>"),
            "<p>\nun <i>magnifique\n</i> ici\n</p>"
        );
    }

    #[test]
    fn hyphenation_order_matters() {
        let fixture = "<small>cou-</small>\n<small>pé net</small>";
        let documented = apply(fixture, &only(&["hyphenation-small", "small-line-join"])).unwrap();
        let swapped = apply(fixture, &only(&["small-line-join", "hyphenation-small"])).unwrap();
        assert_eq!(documented, "<small>coupé\n net</small>");
        assert_eq!(swapped, "<small>cou-\npé net</small>");
        assert_ne!(documented, swapped);
    }

    #[test]
    fn duplicated_inline_styles_collapse() {
        let out = pre("<p>\n<b><i>Il</i></b> <b><i>vint</i></b>\n</p>");
        assert_eq!(out, "<p>\n<b><i>Il vint</i></b>\n</p>");
    }

    #[test]
    fn typographic_normalisation() {
        let out = pre("<p>\nl'homme qu'il vit...\n</p>");
        assert_eq!(out, "<p>\nl’homme qu’il vit…\n</p>");
    }

    #[test]
    fn french_spacing_uses_nbsp() {
        assert_eq!(pre("<p>\nQuoi ? Non!\n</p>"), "<p>\nQuoi\u{a0}? Non\u{a0}!\n</p>");
        assert_eq!(pre("<p>\n« Oui »\n</p>"), "<p>\n«\u{a0}Oui\u{a0}»\n</p>");
    }

    #[test]
    fn entities_survive_spacing_rules() {
        assert_eq!(pre("<p>\nA &amp; B\n</p>"), "<p>\nA &amp; B\n</p>");
    }

    #[test]
    fn punctuation_moves_out_of_spans() {
        assert_eq!(pre("<p>\n<i>Enfin,</i> dit-il\n</p>"), "<p>\n<i>Enfin</i>, dit-il\n</p>");
        assert_eq!(
            pre("<p>\n<i>Vraiment ?</i>\n</p>"),
            "<p>\n<i>Vraiment</i>\u{a0}?\n</p>"
        );
    }

    #[test]
    fn ligatures_only_touch_text() {
        let out = pre("<page id=\"caeoe\">\n<p>\nLes oeuvres de Caesar, OEdipe\n</p>\n</page>");
        assert!(out.contains("Les œuvres de Cæsar, Œdipe"), "{out}");
        assert!(out.contains("<page id=\"caeoe\">"));
    }

    #[test]
    fn ligature_dense_block_converts_in_one_run() {
        let out = pre(&format!("<p>\n{}\n</p>", "vitae ".repeat(1_200)));
        assert_eq!(out.matches("vitæ").count(), 1_200);
    }

    #[test]
    fn superscripts_are_promoted() {
        assert_eq!(
            pre("<p>\nle <sup>XIXe</sup> siècle\n</p>"),
            "<p>\nle <num>XIX<sup>e</sup></num> siècle\n</p>"
        );
        assert_eq!(pre("<p>\nun <sup>in-8°</sup>\n</p>"), "<p>\nun in-8°\n</p>");
        assert_eq!(pre("<p>\n<sup>Mme</sup> B\n</p>"), "<p>\nM<sup>me</sup> B\n</p>");
    }

    #[test]
    fn note_number_leaves_italics() {
        let out = pre("<p>\n<small> <i>1.</i> Voir plus haut</small>\n</p>");
        assert_eq!(out, "<p>\n<small>1. Voir plus haut</small>\n</p>");
    }

    #[test]
    fn roman_numeral_paragraph_becomes_level_two_heading() {
        assert_eq!(pre("<p>\nIV.\n</p>"), "<head n=\"2\">IV.</head>");
    }

    #[test]
    fn capitals_paragraph_becomes_level_one_heading() {
        assert_eq!(pre("<p>\nCHAPITRE\n</p>"), "<head n=\"1\">CHAPITRE</head>");
    }

    #[test]
    fn enlarged_paragraph_becomes_level_one_heading() {
        assert_eq!(
            pre("<p>\n<big>Le Rouge et le Noir</big>\n</p>"),
            "<head n=\"1\">Le Rouge et le Noir</head>"
        );
    }

    #[test]
    fn adjacent_headings_of_same_level_merge() {
        assert_eq!(
            pre("<p>\nCHAPITRE\n</p>\n<p>\nPREMIER\n</p>"),
            "<head n=\"1\">CHAPITRE PREMIER</head>"
        );
        assert_eq!(
            pre("<p>\nCHAPITRE\n</p>\n<p>\nIV.\n</p>"),
            "<head n=\"1\">CHAPITRE</head>\n<head n=\"2\">IV.</head>"
        );
    }
}
