use crate::Page;

/// Scores a new page's text against every tracked page.
///
/// `existing` is given in the current index order and the returned vector
/// must hold exactly one score per existing page, in the same order. Scores
/// are expected in `[0, 1]`.
pub trait TextSimilarity: Send {
    fn score(&self, page: &Page, existing: &[Page]) -> Vec<f64>;
}

impl<F> TextSimilarity for F
where
    F: Fn(&Page, &[Page]) -> Vec<f64> + Send,
{
    fn score(&self, page: &Page, existing: &[Page]) -> Vec<f64> {
        self(page, existing)
    }
}

/// A scorer for sessions clustered on navigation alone.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTextSimilarity;

impl TextSimilarity for NoTextSimilarity {
    fn score(&self, _page: &Page, existing: &[Page]) -> Vec<f64> {
        vec![0.0; existing.len()]
    }
}

/// Clamps a raw score into `[0, 1]`, mapping non-finite values to 0.
pub(crate) fn sanitize_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closures_are_scorers() {
        let scorer = |_: &Page, existing: &[Page]| vec![0.25; existing.len()];
        let pages = vec![Page::new(1), Page::new(2)];
        assert_eq!(scorer.score(&Page::new(3), &pages), vec![0.25, 0.25]);
        assert_eq!(NoTextSimilarity.score(&Page::new(3), &pages), vec![0.0, 0.0]);
    }

    #[test]
    fn scores_are_clamped() {
        assert_eq!(sanitize_score(1.7), 1.0);
        assert_eq!(sanitize_score(-0.2), 0.0);
        assert_eq!(sanitize_score(f64::NAN), 0.0);
        assert_eq!(sanitize_score(0.3), 0.3);
    }
}
