use crate::types::SeverityLevel;

/// The worse of two severities.
pub fn combine(a: SeverityLevel, b: SeverityLevel) -> SeverityLevel {
    a.max(b)
}

/// Fold any number of severities into one. The empty fold is `Ok`.
pub fn fold<I>(levels: I) -> SeverityLevel
where
    I: IntoIterator<Item = SeverityLevel>,
{
    levels.into_iter().fold(SeverityLevel::Ok, combine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn level() -> impl Strategy<Value = SeverityLevel> {
        prop_oneof![
            Just(SeverityLevel::Ok),
            Just(SeverityLevel::Low),
            Just(SeverityLevel::High),
            Just(SeverityLevel::Trip),
        ]
    }

    #[test]
    fn empty_fold_is_ok() {
        assert_eq!(fold(std::iter::empty()), SeverityLevel::Ok);
    }

    #[test]
    fn trip_dominates() {
        assert_eq!(
            fold([SeverityLevel::Low, SeverityLevel::Trip, SeverityLevel::High]),
            SeverityLevel::Trip
        );
        assert_eq!(combine(SeverityLevel::Ok, SeverityLevel::Low), SeverityLevel::Low);
    }

    proptest! {
        #[test]
        fn combine_is_commutative(a in level(), b in level()) {
            prop_assert_eq!(combine(a, b), combine(b, a));
        }

        #[test]
        fn combine_is_associative(a in level(), b in level(), c in level()) {
            prop_assert_eq!(combine(combine(a, b), c), combine(a, combine(b, c)));
        }

        #[test]
        fn ok_is_identity(a in level()) {
            prop_assert_eq!(combine(SeverityLevel::Ok, a), a);
            prop_assert_eq!(combine(a, SeverityLevel::Ok), a);
        }

        #[test]
        fn fold_is_order_independent(mut levels in proptest::collection::vec(level(), 0..16)) {
            let forward = fold(levels.clone());
            levels.reverse();
            prop_assert_eq!(forward, fold(levels.clone()));
            prop_assert_eq!(forward, levels.iter().copied().max().unwrap_or(SeverityLevel::Ok));
        }
    }
}
