use quick_xml::escape::escape;

pub const TEI_NAMESPACE: &str = "http://www.tei-c.org/ns/1.0";

/// Wrap converted content in the TEI skeleton: header, optional facsimile
/// block, then `text/body`. `content` and `facsimile` are inserted verbatim.
pub fn build(title: &str, language: &str, facsimile: Option<&str>, content: &str) -> String {
    let title = escape(title);
    let mut out = String::with_capacity(content.len() + facsimile.map_or(0, str::len) + 512);

    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(&format!(
        "<TEI xmlns=\"{}\" xml:lang=\"{}\">\n",
        TEI_NAMESPACE,
        escape(language)
    ));
    out.push_str(&format!(
        "<teiHeader><fileDesc>\
         <titleStmt><title>Conversion alto2tei de {title}</title></titleStmt>\
         <publicationStmt><publisher/></publicationStmt>\
         <sourceDesc><p>{title}</p></sourceDesc>\
         </fileDesc></teiHeader>\n"
    ));
    if let Some(facsimile) = facsimile {
        out.push_str(facsimile);
        out.push('\n');
    }
    out.push_str("<text><body>\n");
    out.push_str(content);
    out.push_str("</body></text>\n</TEI>\n");
    out
}
