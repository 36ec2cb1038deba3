//! Row assembly: turn the coordinate index back into text lines.

use super::collect::CoordinateIndex;
use serde::Serialize;

/// One visual row of a page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    pub page: u32,
    pub y: f64,
    /// Fragment texts in ascending x, joined by a single space.
    pub text: String,
}

/// Walk `index` in reading order and join each row's fragments.
///
/// Pages ascend, then y, then x. Arrival order of the fragments has no
/// influence on the result.
pub fn assemble(index: &CoordinateIndex) -> Vec<Line> {
    index
        .rows()
        .map(|(page, y, row)| Line {
            page,
            y: y.value(),
            text: row.values().map(String::as_str).collect::<Vec<_>>().join(" "),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::source::Fragment;

    fn fragments() -> Vec<Fragment> {
        vec![
            Fragment::new(2, 10.0, 5.0, "second-page"),
            Fragment::new(1, 30.0, 20.0, "c"),
            Fragment::new(1, 10.0, 20.0, "a"),
            Fragment::new(1, 20.0, 20.0, "b"),
            Fragment::new(1, 5.0, 3.5, "title"),
            Fragment::new(1, -2.0, 20.0, "z"),
        ]
    }

    fn texts(fragments: impl IntoIterator<Item = Fragment>) -> Vec<String> {
        let mut index = CoordinateIndex::new();
        for f in fragments {
            index.ingest(f);
        }
        assemble(&index).into_iter().map(|l| l.text).collect()
    }

    #[test]
    fn orders_by_page_then_y_then_x() {
        let index = {
            let mut index = CoordinateIndex::new();
            for f in fragments() {
                index.ingest(f);
            }
            index
        };
        let lines = assemble(&index);
        assert_eq!(
            lines,
            vec![
                Line {
                    page: 1,
                    y: 3.5,
                    text: "title".into()
                },
                Line {
                    page: 1,
                    y: 20.0,
                    text: "z a b c".into()
                },
                Line {
                    page: 2,
                    y: 5.0,
                    text: "second-page".into()
                },
            ]
        );
    }

    #[test]
    fn arrival_order_does_not_matter() {
        let expected = texts(fragments());
        let mut shuffled = fragments();
        // Every rotation plus the reversal.
        for _ in 0..shuffled.len() {
            shuffled.rotate_left(1);
            assert_eq!(texts(shuffled.clone()), expected);
        }
        shuffled.reverse();
        assert_eq!(texts(shuffled), expected);
    }

    #[test]
    fn numeric_not_lexical_ordering() {
        // "9" sorts after "10" lexically.
        let lines = texts(vec![
            Fragment::new(1, 10.0, 1.0, "ten"),
            Fragment::new(1, 9.0, 1.0, "nine"),
            Fragment::new(10, 0.0, 1.0, "p10"),
            Fragment::new(9, 0.0, 1.0, "p9"),
        ]);
        assert_eq!(lines, vec!["nine ten", "p9", "p10"]);
    }

    #[test]
    fn fragment_whitespace_is_preserved() {
        let lines = texts(vec![
            Fragment::new(1, 0.0, 1.0, "GENERAL  "),
            Fragment::new(1, 1.0, 1.0, "001234"),
        ]);
        assert_eq!(lines, vec!["GENERAL   001234"]);
    }

    #[test]
    fn empty_index_yields_no_lines() {
        assert!(assemble(&CoordinateIndex::new()).is_empty());
    }
}
