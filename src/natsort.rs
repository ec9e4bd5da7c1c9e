//! Natural ("human") string ordering: numeric runs compare by value, so
//! `part2` sorts before `part10`.

use std::cmp::Ordering;

/// Split into maximal runs of ASCII digits and of non-digits.
fn chunks(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = None;

    for (idx, ch) in s.char_indices() {
        let is_digit = ch.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != is_digit => {
                out.push(&s[start..idx]);
                start = idx;
            }
            _ => {}
        }
        in_digits = Some(is_digit);
    }
    if start < s.len() {
        out.push(&s[start..]);
    }
    out
}

/// Compare two strings in natural order.
///
/// When a chunk compares equal and it is the last chunk of `a`, `a` sorts
/// first; otherwise, when it is the last chunk of `b`, `b` sorts first. An
/// empty `a` sorts after any non-empty `b`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let chunks_a = chunks(a);
    let chunks_b = chunks(b);
    let last_a = chunks_a.len().saturating_sub(1);
    let last_b = chunks_b.len().saturating_sub(1);

    for (i, chunk_a) in chunks_a.iter().enumerate() {
        let Some(chunk_b) = chunks_b.get(i) else {
            return Ordering::Greater;
        };

        let ordering = match (chunk_a.parse::<i64>(), chunk_b.parse::<i64>()) {
            (Ok(num_a), Ok(num_b)) => num_a.cmp(&num_b),
            _ => chunk_a.cmp(chunk_b),
        };

        if ordering != Ordering::Equal {
            return ordering;
        }
        if i == last_a {
            return Ordering::Less;
        }
        if i == last_b {
            return Ordering::Greater;
        }
    }

    Ordering::Greater
}

/// Sort strings in natural order.
///
/// `natural_cmp` is not a total order for inputs like `x01`/`x1` or an empty
/// name, so this uses a plain merge sort instead of `slice::sort_by`, which
/// may panic on an inconsistent comparator.
pub fn natural_sort<S: AsRef<str>>(items: &mut Vec<S>) {
    natural_sort_by_key(items, |item| item.as_ref().to_owned());
}

/// Sort items in natural order of the string `key` returns for each.
pub fn natural_sort_by_key<T, F>(items: &mut Vec<T>, key: F)
where
    F: Fn(&T) -> String,
{
    let keyed: Vec<(String, T)> = std::mem::take(items)
        .into_iter()
        .map(|item| (key(&item), item))
        .collect();

    *items = merge_sort(keyed).into_iter().map(|(_, item)| item).collect();
}

/// Stable top-down merge sort; terminates whatever `natural_cmp` answers.
fn merge_sort<T>(mut items: Vec<(String, T)>) -> Vec<(String, T)> {
    if items.len() <= 1 {
        return items;
    }

    let right = items.split_off(items.len() / 2);
    let mut left = merge_sort(items).into_iter().peekable();
    let mut right = merge_sort(right).into_iter().peekable();
    let mut merged = Vec::with_capacity(left.len() + right.len());

    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some((a, _)), Some((b, _))) => natural_cmp(a, b) == Ordering::Greater,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        merged.extend(if take_right { right.next() } else { left.next() });
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks() {
        assert_eq!(chunks("basename.part20.rar"), vec!["basename.part", "20", ".rar"]);
        assert_eq!(chunks("007abc"), vec!["007", "abc"]);
        assert!(chunks("").is_empty());
    }

    #[test]
    fn test_natural_sort_volumes() {
        let mut files = vec![
            "basename.part20.rar",
            "basename.part30.rar",
            "basename.part1.rar",
            "basename.part2.rar",
            "basename.part3.rar",
        ];
        natural_sort(&mut files);
        assert_eq!(
            files,
            vec![
                "basename.part1.rar",
                "basename.part2.rar",
                "basename.part3.rar",
                "basename.part20.rar",
                "basename.part30.rar",
            ]
        );
    }

    #[test]
    fn test_natural_cmp_basics() {
        assert_eq!(natural_cmp("file2", "file10"), Ordering::Less);
        assert_eq!(natural_cmp("file10", "file2"), Ordering::Greater);
        assert_eq!(natural_cmp("same", "same"), Ordering::Equal);
        assert_eq!(natural_cmp("abc", "abd"), Ordering::Less);
    }

    #[test]
    fn test_prefix_tie_breaks() {
        // `a` runs out first on an equal chunk
        assert_eq!(natural_cmp("file", "file1"), Ordering::Less);
        assert_eq!(natural_cmp("file1", "file"), Ordering::Greater);
        // Equal value, different spelling: the left operand wins the tie
        assert_eq!(natural_cmp("x01", "x1"), Ordering::Less);
        assert_eq!(natural_cmp("x1", "x01"), Ordering::Less);
        // Empty left operand sorts last
        assert_eq!(natural_cmp("", "a"), Ordering::Greater);
        assert_eq!(natural_cmp("a", ""), Ordering::Greater);
    }

    #[test]
    fn test_sort_survives_inconsistent_ties() {
        let mut names = Vec::new();
        for n in 1..=200 {
            names.push(format!("set.part{}.rar", n));
            names.push(format!("set.part{:02}.rar", n));
            names.push(format!("x{:03}", n % 7));
            names.push(format!("x{}", n % 7));
        }
        names.push(String::new());
        names.push("x01".to_string());
        names.push("x1".to_string());

        // Deterministic shuffle (LCG driven Fisher-Yates)
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        for i in (1..names.len()).rev() {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let j = (state >> 33) as usize % (i + 1);
            names.swap(i, j);
        }

        let mut sorted = names.clone();
        natural_sort(&mut sorted);

        let mut expected = names;
        expected.sort();
        let mut got = sorted.clone();
        got.sort();
        assert_eq!(got, expected);
    }

    #[test]
    fn test_sort_by_key_orders_paths() {
        use std::path::PathBuf;

        let mut paths: Vec<PathBuf> = [12, 3, 1, 20, 2]
            .iter()
            .map(|n| PathBuf::from(format!("/tmp/v.part{}.rar", n)))
            .collect();
        natural_sort_by_key(&mut paths, |p| p.to_string_lossy().into_owned());

        let names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            vec!["v.part1.rar", "v.part2.rar", "v.part3.rar", "v.part12.rar", "v.part20.rar"]
        );
    }

    #[test]
    fn test_huge_numbers_fall_back_to_text() {
        let big = "n99999999999999999999";
        let small = "n100000000000000000000";
        // Neither fits in i64, so the digit runs compare as text
        assert_eq!(natural_cmp(big, small), Ordering::Greater);
    }
}
