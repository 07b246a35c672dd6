use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

/// Desired completion status for one issue, as expressed by a checkbox edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueIntent {
    pub id: String,
    pub completed: bool,
}

/// Checkbox marker followed (non-greedily, on the same line) by the inline
/// id comment. Display text between the two is ignored; a line without the
/// id comment produces no match.
static CHECKBOX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"- \[([ x])\].*?<!-- id:(\S+) -->").expect("valid checkbox regex"));

/// Extract `{id, completed}` pairs from a document, in document order.
///
/// Lines that carry a checkbox but no recoverable id comment are silently
/// skipped: a manual edit that strips the id marker makes the line
/// untrackable, and erroring on it would block the rest of the file.
pub fn parse_document(text: &str) -> Vec<IssueIntent> {
    CHECKBOX_RE
        .captures_iter(text)
        .map(|cap| IssueIntent {
            id: cap[2].to_string(),
            completed: &cap[1] == "x",
        })
        .collect()
}

/// Read a file and extract intents. A missing or unreadable file yields no
/// intents rather than an error: the sync ledger simply isn't there.
pub fn read_intents(path: &Path) -> Vec<IssueIntent> {
    match std::fs::read_to_string(path) {
        Ok(text) => parse_document(&text),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_checked_line() {
        let intents =
            parse_document("- [x] **ENG-1**: Fix bug *[Done]* <!-- id:abc123 -->");
        assert_eq!(
            intents,
            vec![IssueIntent {
                id: "abc123".to_string(),
                completed: true
            }]
        );
    }

    #[test]
    fn parses_unchecked_line() {
        let intents = parse_document("- [ ] **ENG-2**: Add feature *[Todo]* <!-- id:def456 -->");
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].id, "def456");
        assert!(!intents[0].completed);
    }

    #[test]
    fn line_without_id_comment_is_skipped() {
        let intents = parse_document("- [x] **ENG-3**: Manually added task");
        assert!(intents.is_empty());
    }

    #[test]
    fn uppercase_x_is_not_a_checked_box() {
        let intents = parse_document("- [X] **ENG-4**: Odd edit <!-- id:ghi789 -->");
        assert!(intents.is_empty());
    }

    #[test]
    fn multiple_lines_parse_in_document_order() {
        let doc = "\
# My Issues

## Unstarted

- [ ] **ENG-1**: Fix bug *[Todo]* <!-- id:aaa -->
- [ ] **ENG-2**: No id here, hand-written

## Completed

- [x] **ENG-3**: Ship it *[Done]* <!-- id:ccc -->
";
        let intents = parse_document(doc);
        assert_eq!(intents.len(), 2);
        assert_eq!(intents[0].id, "aaa");
        assert!(!intents[0].completed);
        assert_eq!(intents[1].id, "ccc");
        assert!(intents[1].completed);
    }

    #[test]
    fn id_does_not_leak_across_lines() {
        // The checkbox on the first line must not pair with the id comment
        // on the second: the match span stays on one line.
        let doc = "- [x] **ENG-1**: stripped id\n- [ ] **ENG-2**: ok <!-- id:bbb -->";
        let intents = parse_document(doc);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].id, "bbb");
        assert!(!intents[0].completed);
    }

    #[test]
    fn missing_file_yields_no_intents() {
        let intents = read_intents(Path::new("/nonexistent/my-issues.md"));
        assert!(intents.is_empty());
    }

    #[test]
    fn round_trips_rendered_document() {
        use crate::markdown::render::render_document;
        use crate::model::issue::StateType;
        use crate::tracker::tests::{make_issue, workflow_state};

        let issues = vec![
            make_issue(
                "id-1",
                "ENG-1",
                "Fix bug",
                workflow_state("st-todo", "Todo", StateType::Unstarted),
            ),
            make_issue(
                "id-2",
                "ENG-2",
                "Ship it",
                workflow_state("st-done", "Done", StateType::Completed),
            ),
            make_issue(
                "id-3",
                "ENG-3",
                "Dropped",
                workflow_state("st-canceled", "Canceled", StateType::Canceled),
            ),
        ];
        let doc = render_document("My Issues", &issues, "desc");
        let intents = parse_document(&doc);

        assert_eq!(intents.len(), issues.len());
        for issue in &issues {
            let intent = intents.iter().find(|i| i.id == issue.id).unwrap();
            assert_eq!(intent.completed, issue.is_done());
        }
    }
}
