// tests/estimator_properties.rs

use std::num::NonZeroU64;
use std::time::{Duration, Instant};

use proptest::prelude::*;

use mpiwatch::progress::{classify, Estimator};

fn progress_line() -> impl Strategy<Value = String> {
    prop_oneof![
        (0u32..32).prop_map(|r| format!("[Rank{r}] blur aplicado")),
        (0u32..32).prop_map(|r| format!("[Rank{r}] FILTROS LIGEROS PROCESADOS")),
        (0u32..32).prop_map(|r| format!("[Rank{r}] leyendo imagen")),
        "[a-z ]{0,30}".prop_map(|s| format!("{s} blur aplicado")),
        ".{0,40}",
    ]
}

proptest! {
    #[test]
    fn events_equal_sum_of_weights(
        lines in proptest::collection::vec(progress_line(), 0..60),
        expected in 1u64..500,
    ) {
        let start = Instant::now();
        let mut est = Estimator::new(NonZeroU64::new(expected).unwrap(), start);

        let mut sum = 0u64;
        let mut last_pct = 0u64;
        for (i, line) in lines.iter().enumerate() {
            let w = classify(line);
            sum += u64::from(w);
            last_pct = est.update(w, start + Duration::from_millis(i as u64 * 10)).percentage;
        }

        prop_assert_eq!(est.events(), sum);
        if !lines.is_empty() {
            prop_assert_eq!(last_pct, sum * 100 / expected);
        }
    }

    #[test]
    fn classification_depends_only_on_the_line(line in progress_line(), noise in proptest::collection::vec(".{0,20}", 0..10)) {
        let before = classify(&line);
        for n in &noise {
            let _ = classify(n);
        }
        prop_assert_eq!(classify(&line), before);
    }

    #[test]
    fn lines_without_rank_prefix_never_count(body in ".{0,40}") {
        prop_assume!(!body.starts_with("[Rank"));
        prop_assert_eq!(classify(&body), 0);
        let with_phrase = format!("x{body} blur aplicado");
        prop_assert_eq!(classify(&with_phrase), 0);
    }

    #[test]
    fn remaining_never_negative(
        weights in proptest::collection::vec(0u32..6, 1..40),
        expected in 1u64..100,
        step_ms in 0u64..5_000,
    ) {
        let start = Instant::now();
        let mut est = Estimator::new(NonZeroU64::new(expected).unwrap(), start);

        for (i, w) in weights.iter().enumerate() {
            let update = est.update(*w, start + Duration::from_millis(step_ms * i as u64));
            match update.remaining_secs {
                None => prop_assert_eq!(est.events(), 0),
                Some(r) => prop_assert!(r >= 0.0),
            }
        }
    }
}
