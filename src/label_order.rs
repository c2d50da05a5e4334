//! Label ordering for plan presentation
//!
//! Labels are compared chunk by chunk, with runs of ASCII digits compared
//! by numeric value so that "Year 2" sorts before "Year 10".

use std::cmp::Ordering;

/// Stateless comparator for human-readable labels
pub trait LabelComparer: Send + Sync {
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

/// Numeric-aware ordering
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalOrder;

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> impl Iterator<Item = Chunk<'_>> {
    let mut rest = s;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let is_digit = first.is_ascii_digit();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != is_digit)
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let (chunk, tail) = rest.split_at(end);
        rest = tail;
        Some(if is_digit {
            Chunk::Digits(chunk)
        } else {
            Chunk::Text(chunk)
        })
    })
}

fn compare_digits(a: &str, b: &str) -> Ordering {
    let a_trimmed = a.trim_start_matches('0');
    let b_trimmed = b.trim_start_matches('0');
    a_trimmed
        .len()
        .cmp(&b_trimmed.len())
        .then_with(|| a_trimmed.cmp(b_trimmed))
        // "02" after "2"
        .then_with(|| a.len().cmp(&b.len()))
}

impl LabelComparer for NaturalOrder {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        let mut left = chunks(a);
        let mut right = chunks(b);
        loop {
            let ordering = match (left.next(), right.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(Chunk::Digits(x)), Some(Chunk::Digits(y))) => compare_digits(x, y),
                (Some(Chunk::Text(x)), Some(Chunk::Text(y))) => x.cmp(y),
                (Some(Chunk::Digits(_)), Some(Chunk::Text(_))) => Ordering::Less,
                (Some(Chunk::Text(_)), Some(Chunk::Digits(_))) => Ordering::Greater,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
    }
}

/// Sort `items` by the label `key` extracts, using `comparer`
pub fn sort_by_label<T>(items: &mut [T], comparer: &dyn LabelComparer, key: impl Fn(&T) -> &str) {
    items.sort_by(|a, b| comparer.compare(key(a), key(b)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(labels: &[&str]) -> Vec<String> {
        let mut labels: Vec<String> = labels.iter().map(|s| s.to_string()).collect();
        sort_by_label(&mut labels, &NaturalOrder, |s| s.as_str());
        labels
    }

    #[test]
    fn test_numeric_runs_compare_as_numbers() {
        assert_eq!(
            sorted(&["Year 10", "Year 2", "Year 1"]),
            vec!["Year 1", "Year 2", "Year 10"]
        );
    }

    #[test]
    fn test_plain_labels_sort_lexically() {
        assert_eq!(
            sorted(&["Male", "Female", "Total"]),
            vec!["Female", "Male", "Total"]
        );
    }

    #[test]
    fn test_prefix_sorts_first() {
        assert_eq!(NaturalOrder.compare("Age", "Age 5"), Ordering::Less);
        assert_eq!(NaturalOrder.compare("2", "2"), Ordering::Equal);
        assert_eq!(NaturalOrder.compare("2", "02"), Ordering::Less);
    }

    #[test]
    fn test_large_numbers_do_not_overflow() {
        assert_eq!(
            NaturalOrder.compare("id 99999999999999999999999", "id 100000000000000000000000"),
            Ordering::Less
        );
    }
}
