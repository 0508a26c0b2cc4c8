/// Number of content slides to ask the model for.
///
/// With a table of contents, one TOC slide is reserved per ~10 content
/// slides. The result is always in `[1, total_slides]`.
pub fn compute_slide_target(total_slides: u32, include_table_of_contents: bool) -> u32 {
    let total = total_slides.max(1);
    if !include_table_of_contents {
        return total;
    }

    let needed_toc_count = div_ceil(total - 1, 10);
    let reserved = div_ceil(total.saturating_sub(needed_toc_count), 10);
    total.saturating_sub(reserved).clamp(1, total)
}

fn div_ceil(numerator: u32, denominator: u32) -> u32 {
    (numerator + denominator - 1) / denominator
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_without_toc_is_identity() {
        for total in [1, 5, 12, 40] {
            assert_eq!(compute_slide_target(total, false), total);
        }
    }

    #[test]
    fn test_with_toc_reserves_pages() {
        assert_eq!(compute_slide_target(1, true), 1);
        assert_eq!(compute_slide_target(2, true), 1);
        assert_eq!(compute_slide_target(10, true), 9);
        assert_eq!(compute_slide_target(11, true), 10);
        assert_eq!(compute_slide_target(21, true), 19);
        assert_eq!(compute_slide_target(25, true), 22);
    }

    #[test]
    fn test_target_always_in_range() {
        for total in 1..=500 {
            for toc in [true, false] {
                let target = compute_slide_target(total, toc);
                assert!(target >= 1 && target <= total, "total={} toc={}", total, toc);
            }
        }
    }
}
