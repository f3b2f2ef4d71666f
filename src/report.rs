//! Report formatting — deterministic, human-readable classification lines.
//!
//! The rendered text is the user-visible contract: a single result is one
//! bare line, multiple results become a bulleted list in extraction
//! order.

use crate::types::ClassificationResult;

/// Build a matrix.to permalink for the originating message, with the
/// configured via servers appended as routing hints.
pub fn permalink(room_id: &str, event_id: &str, via_servers: &[String]) -> String {
    let via = if via_servers.is_empty() {
        String::new()
    } else {
        let params: Vec<String> = via_servers.iter().map(|s| format!("via={s}")).collect();
        format!("?{}", params.join("&"))
    };
    format!("https://matrix.to/#/{room_id}/{event_id}{via}")
}

/// Render one or many results into a single report body.
///
/// Callers must not invoke this with an empty slice — an empty batch
/// produces no output at all.
pub fn format_report(results: &[ClassificationResult], permalink: &str) -> String {
    let lines: Vec<String> = results
        .iter()
        .map(|result| {
            format!(
                "{} in {} appears {} with score {:.2}%",
                result.reference.locator,
                permalink,
                result.label,
                result.score * 100.0
            )
        })
        .collect();

    if lines.len() > 1 {
        format!("- {}", lines.join("\n- "))
    } else {
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageReference;

    fn result(locator: &str, position: usize, score: f64) -> ClassificationResult {
        ClassificationResult::new(
            ImageReference {
                locator: locator.into(),
                source_event: "$eventid".into(),
                position,
            },
            score,
        )
    }

    #[test]
    fn permalink_with_via_servers() {
        let url = permalink(
            "!roomid:matrix.org",
            "$eventid",
            &["matrix.org".into(), "example.org".into()],
        );
        assert_eq!(
            url,
            "https://matrix.to/#/!roomid:matrix.org/$eventid?via=matrix.org&via=example.org"
        );
    }

    #[test]
    fn permalink_without_via_servers() {
        let url = permalink("!roomid:matrix.org", "$eventid", &[]);
        assert_eq!(url, "https://matrix.to/#/!roomid:matrix.org/$eventid");
    }

    #[test]
    fn single_result_is_one_bare_line() {
        let link = permalink("!roomid:matrix.org", "$eventid", &["matrix.org".into()]);
        let report = format_report(&[result("mxc://matrix.org/abcd1234", 0, 0.8793)], &link);
        assert_eq!(
            report,
            "mxc://matrix.org/abcd1234 in https://matrix.to/#/!roomid:matrix.org/$eventid?via=matrix.org appears NSFW with score 87.93%"
        );
    }

    #[test]
    fn multiple_results_are_bulleted_in_order() {
        let link = permalink("!r:x", "$e", &[]);
        let report = format_report(
            &[
                result("mxc://x/one", 0, 0.0245),
                result("mxc://x/two", 1, 0.9482),
            ],
            &link,
        );
        assert_eq!(
            report,
            "- mxc://x/one in https://matrix.to/#/!r:x/$e appears SFW with score 2.45%\n\
             - mxc://x/two in https://matrix.to/#/!r:x/$e appears NSFW with score 94.82%"
        );
    }

    #[test]
    fn score_rendered_to_two_decimals() {
        let link = permalink("!r:x", "$e", &[]);
        let report = format_report(&[result("mxc://x/a", 0, 0.5)], &link);
        assert!(report.ends_with("appears NSFW with score 50.00%"));

        let report = format_report(&[result("mxc://x/a", 0, 1.0)], &link);
        assert!(report.ends_with("appears NSFW with score 100.00%"));
    }
}
