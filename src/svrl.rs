//! SVRL report parsing.
//!
//! SchXslt writes its findings as a Schematron Validation Report Language
//! document: a flat sequence of `active-pattern`, `fired-rule` and
//! `failed-assert`/`successful-report` siblings in document order. This
//! module extracts the assertion outcomes, attributes each one to the
//! pattern and rule that produced it, and maps its location path back to
//! a line/column in the validated source document via
//! [`LocationResolver`].
//!
//! Parsing is forgiving: an SVRL file that cannot be parsed
//! at all is logged and yields an empty assertion list, and fragments
//! that lack the expected shape are skipped. Only an ill-formed *source*
//! document aborts a report, since that points at a real inconsistency
//! between the validator's view of the file and ours.

use std::path::{Path, PathBuf};

use log::error;
use tokio::fs;

use crate::error::Result;
use crate::locator::{rewrite_clark_tei, LocationResolver, SVRL_NS};

/// One `failed-assert` or `successful-report` outcome, attributed to its
/// firing rule and active pattern.
///
/// `role` is kept verbatim and may legitimately be empty; `line` and
/// `column` are `None` when the location matched no node. Defaulting of
/// both happens at aggregation, not here.
#[derive(Debug, Clone, PartialEq)]
pub struct SchematronAssertion {
    /// Whitespace-normalized, display-escaped message text.
    pub text: String,
    /// Location path with the TEI Clark prefix rewritten to `tei:`.
    pub location: String,
    /// Role of the firing rule, empty when the rule carries none.
    pub role: String,
    /// XPath context of the firing rule.
    pub context: String,
    /// Name of the active pattern.
    pub pattern_name: String,
    /// Source document the assertion refers to.
    pub document: PathBuf,
    pub line: Option<u32>,
    pub column: Option<u32>,
    /// Final path segment of `document`.
    pub file_name: String,
}

/// Escape text for safe embedding in rendered HTML/markdown output.
///
/// Two substitutions only: `<` becomes `&lt;` so literal element names in
/// rule messages cannot open tags, and `@` becomes `&#x40;` so attribute
/// references are not mistaken for mentions.
pub fn sanitize_for_display(text: &str) -> String {
    text.replace('<', "&lt;").replace('@', "&#x40;")
}

fn normalize_space(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn is_svrl(node: &roxmltree::Node, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(SVRL_NS)
        && node.tag_name().name() == local_name
}

fn is_assertion(node: &roxmltree::Node) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(SVRL_NS)
        && matches!(
            node.tag_name().name(),
            "failed-assert" | "successful-report"
        )
}

/// String value of the element's first `svrl:text` child, if any.
fn first_text_child(node: &roxmltree::Node) -> Option<String> {
    let text_element = node.children().find(|c| is_svrl(c, "text"))?;
    let value: String = text_element
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    Some(value)
}

/// Parse an SVRL report and return its assertions in document order.
///
/// Every qualifying element (a `failed-assert` or `successful-report`
/// with a `location` attribute and a `svrl:text` child) yields one
/// assertion, including informational ones; filtering by role is the
/// aggregator's concern.
pub async fn parse_report(
    report: &Path,
    resolver: &mut LocationResolver,
) -> Result<Vec<SchematronAssertion>> {
    let xml = match fs::read_to_string(report).await {
        Ok(xml) => xml,
        Err(e) => {
            error!("could not read SVRL report {}: {}", report.display(), e);
            return Ok(Vec::new());
        }
    };

    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = match roxmltree::Document::parse_with_options(&xml, options) {
        Ok(doc) => doc,
        Err(e) => {
            error!("could not parse SVRL report {}: {}", report.display(), e);
            return Ok(Vec::new());
        }
    };

    let mut assertions = Vec::new();
    for node in doc.descendants().filter(is_assertion) {
        let Some(raw_location) = node.attribute("location") else {
            continue;
        };
        let Some(raw_text) = first_text_child(&node) else {
            continue;
        };

        // The rule and pattern that produced this outcome are its nearest
        // preceding siblings of the respective kind.
        let rule = node.prev_siblings().find(|n| is_svrl(n, "fired-rule"));
        let context = rule
            .and_then(|r| r.attribute("context"))
            .unwrap_or_default()
            .to_string();
        let role = rule
            .and_then(|r| r.attribute("role"))
            .unwrap_or_default()
            .to_string();

        let pattern = node.prev_siblings().find(|n| is_svrl(n, "active-pattern"));
        let pattern_name = pattern
            .and_then(|p| p.attribute("name"))
            .unwrap_or_default()
            .to_string();
        let documents = pattern
            .and_then(|p| p.attribute("documents"))
            .unwrap_or_default();
        let document = PathBuf::from(documents.strip_prefix("file:").unwrap_or(documents));

        let location = rewrite_clark_tei(raw_location);
        let position = resolver.resolve(&document, &location).await?;

        let file_name = document
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        assertions.push(SchematronAssertion {
            text: sanitize_for_display(&normalize_space(&raw_text)),
            location,
            role,
            context,
            pattern_name,
            document,
            line: position.map(|p| p.line),
            column: position.map(|p| p.column),
            file_name,
        });
    }

    Ok(assertions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TEI_DOC: &str = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <text>
    <body>
      <sp><p>one</p></sp>
      <sp><p>two</p></sp>
    </body>
  </text>
</TEI>
"#;

    fn svrl_report(document: &str) -> String {
        format!(
            r#"<svrl:schematron-output xmlns:svrl="http://purl.oclc.org/dsdl/svrl" title="DraCor">
  <svrl:active-pattern documents="file:{document}" name="Speech checks"/>
  <svrl:fired-rule context="tei:sp" role="warning"/>
  <svrl:failed-assert test="@who" location="/Q{{http://www.tei-c.org/ns/1.0}}TEI[1]/Q{{http://www.tei-c.org/ns/1.0}}text[1]/Q{{http://www.tei-c.org/ns/1.0}}body[1]/Q{{http://www.tei-c.org/ns/1.0}}sp[2]">
    <svrl:text>Element &lt;sp> should
      carry a @who reference</svrl:text>
  </svrl:failed-assert>
  <svrl:fired-rule context="tei:body"/>
  <svrl:successful-report test="tei:sp" location="/Q{{http://www.tei-c.org/ns/1.0}}TEI[1]/Q{{http://www.tei-c.org/ns/1.0}}text[1]/Q{{http://www.tei-c.org/ns/1.0}}body[1]">
    <svrl:text>Body contains speeches</svrl:text>
  </svrl:successful-report>
  <svrl:fired-rule context="tei:TEI" role="information"/>
  <svrl:failed-assert test="tei:standOff" location="/Q{{http://www.tei-c.org/ns/1.0}}TEI[1]/Q{{http://www.tei-c.org/ns/1.0}}standOff[1]">
    <svrl:text>No standOff present</svrl:text>
  </svrl:failed-assert>
  <svrl:failed-assert test="skipped">
    <svrl:text>No location attribute, skipped</svrl:text>
  </svrl:failed-assert>
</svrl:schematron-output>
"#
        )
    }

    async fn fixture() -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().expect("temp dir");
        let doc_path = dir.path().join("play.xml");
        tokio::fs::write(&doc_path, TEI_DOC).await.expect("fixture");
        let report_path = dir.path().join("svrl.xml");
        let report = svrl_report(&doc_path.to_string_lossy());
        tokio::fs::write(&report_path, report).await.expect("fixture");
        (dir, doc_path, report_path)
    }

    #[tokio::test]
    async fn test_parse_report_extracts_assertions_in_order() {
        let (_dir, doc_path, report_path) = fixture().await;
        let mut resolver = LocationResolver::new();

        let assertions = parse_report(&report_path, &mut resolver)
            .await
            .expect("report parses");

        // The assert without a location attribute is skipped.
        assert_eq!(assertions.len(), 3);

        let first = &assertions[0];
        assert_eq!(
            first.text,
            "Element &lt;sp> should carry a &#x40;who reference"
        );
        assert_eq!(first.role, "warning");
        assert_eq!(first.context, "tei:sp");
        assert_eq!(first.pattern_name, "Speech checks");
        assert_eq!(first.document, doc_path);
        assert_eq!(first.file_name, "play.xml");
        assert_eq!(
            first.location,
            "/tei:TEI[1]/tei:text[1]/tei:body[1]/tei:sp[2]"
        );
        assert_eq!(first.line, Some(5));
        assert_eq!(first.column, Some(7));

        // The successful-report picks up the rule fired after the first one.
        let second = &assertions[1];
        assert_eq!(second.text, "Body contains speeches");
        assert_eq!(second.role, "");
        assert_eq!(second.context, "tei:body");
        assert_eq!(second.line, Some(3));

        // Roles are passed through; filtering happens downstream.
        let third = &assertions[2];
        assert_eq!(third.role, "information");
        // standOff matches no node, so the position defaults away.
        assert_eq!(third.line, None);
        assert_eq!(third.column, None);
    }

    #[tokio::test]
    async fn test_each_assertion_reuses_the_cached_document() {
        let (_dir, _doc_path, report_path) = fixture().await;
        let mut resolver = LocationResolver::new();

        parse_report(&report_path, &mut resolver)
            .await
            .expect("report parses");

        assert_eq!(resolver.cache_stats().misses, 1);
        assert_eq!(resolver.cache_stats().hits, 2);
    }

    #[tokio::test]
    async fn test_report_without_assertions_yields_empty() {
        let dir = TempDir::new().expect("temp dir");
        let report_path = dir.path().join("svrl.xml");
        tokio::fs::write(
            &report_path,
            r#"<svrl:schematron-output xmlns:svrl="http://purl.oclc.org/dsdl/svrl"/>"#,
        )
        .await
        .expect("fixture");

        let mut resolver = LocationResolver::new();
        let assertions = parse_report(&report_path, &mut resolver)
            .await
            .expect("report parses");
        assert!(assertions.is_empty());
    }

    #[tokio::test]
    async fn test_unparsable_report_degrades_to_empty() {
        let dir = TempDir::new().expect("temp dir");
        let report_path = dir.path().join("svrl.xml");
        tokio::fs::write(&report_path, "this is not xml <<<")
            .await
            .expect("fixture");

        let mut resolver = LocationResolver::new();
        let assertions = parse_report(&report_path, &mut resolver)
            .await
            .expect("degrades, does not fail");
        assert!(assertions.is_empty());
    }

    #[tokio::test]
    async fn test_missing_report_degrades_to_empty() {
        let dir = TempDir::new().expect("temp dir");
        let report_path = dir.path().join("never-written.xml");

        let mut resolver = LocationResolver::new();
        let assertions = parse_report(&report_path, &mut resolver)
            .await
            .expect("degrades, does not fail");
        assert!(assertions.is_empty());
    }

    #[test]
    fn test_sanitize_for_display() {
        assert_eq!(
            sanitize_for_display("<sp> needs @who"),
            "&lt;sp> needs &#x40;who"
        );
        assert_eq!(sanitize_for_display("plain text"), "plain text");
    }
}
