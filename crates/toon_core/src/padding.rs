/// Digits needed so lexical filename order matches numeric order for `count`
/// items numbered from 0: `ceil(log10(count)) + 1`.
///
/// Empty and single-item sets get width 1.
pub fn zero_padding_width(count: usize) -> usize {
    match count {
        0 | 1 => 1,
        n => (n - 1).ilog10() as usize + 2,
    }
}

/// Formats `value` left-padded with zeros to `width` digits.
pub fn padded(value: u64, width: usize) -> String {
    format!("{:0width$}", value, width = width)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_matches_log_formula() {
        for count in 1..=2_000usize {
            let expected = (count as f64).log10().ceil() as usize + 1;
            assert_eq!(zero_padding_width(count), expected, "count={count}");
        }
        assert_eq!(zero_padding_width(0), 1);
    }

    #[test]
    fn twenty_three_images_sort_lexically() {
        let width = zero_padding_width(23);
        assert_eq!(width, 3);
        let mut names: Vec<String> = (0..23u64).map(|i| padded(i, width)).collect();
        let in_order = names.clone();
        names.sort();
        assert_eq!(names, in_order);
        assert_eq!(names.first().map(String::as_str), Some("000"));
        assert_eq!(names.last().map(String::as_str), Some("022"));
    }
}
