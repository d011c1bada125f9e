//! Topic filter matching.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use shared_bus::TopicFilter;

    fn level() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_-]{1,8}"
    }

    fn levels() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(level(), 1..6)
    }

    proptest! {
        #[test]
        fn exact_filter_matches_only_itself(levels in levels(), extra in level()) {
            let topic = levels.join("/");
            let filter = TopicFilter::parse(&topic).unwrap();

            prop_assert!(filter.matches(&topic));
            let longer = format!("{topic}/{extra}");
            prop_assert!(!filter.matches(&longer));
            if levels.len() > 1 {
                prop_assert!(!filter.matches(&levels[..levels.len() - 1].join("/")));
            }
        }

        #[test]
        fn plus_replaces_one_level(levels in levels(), index in any::<prop::sample::Index>()) {
            let topic = levels.join("/");
            let mut pattern = levels.clone();
            pattern[index.index(levels.len())] = "+".to_string();
            let filter = TopicFilter::parse(&pattern.join("/")).unwrap();

            prop_assert!(filter.matches(&topic));
            let longer = format!("{topic}/tail");
            prop_assert!(!filter.matches(&longer));
        }

        #[test]
        fn hash_matches_any_suffix(prefix in levels(), suffix in prop::collection::vec(level(), 0..4)) {
            let filter = TopicFilter::parse(&format!("{}/#", prefix.join("/"))).unwrap();

            let mut topic = prefix.clone();
            topic.extend(suffix);
            prop_assert!(filter.matches(&topic.join("/")));
            let renamed = format!("other-{}", topic.join("/"));
            prop_assert!(!filter.matches(&renamed));
        }

        #[test]
        fn shared_filter_matches_like_its_body(
            group in "[a-z]{1,8}",
            levels in levels(),
            other in levels(),
        ) {
            let body = levels.join("/");
            let plain = TopicFilter::parse(&body).unwrap();
            let shared = TopicFilter::parse(&format!("$share/{group}/{body}")).unwrap();

            prop_assert_eq!(shared.shared_group(), Some(group.as_str()));
            prop_assert!(shared.matches(&body));
            let other = other.join("/");
            prop_assert_eq!(shared.matches(&other), plain.matches(&other));
        }

        #[test]
        fn wildcards_inside_a_level_are_rejected(a in level(), b in level()) {
            let glued_plus = format!("{a}+{b}");
            let inner_hash = format!("{a}/#/{b}");
            prop_assert!(TopicFilter::parse(&glued_plus).is_err());
            prop_assert!(TopicFilter::parse(&inner_hash).is_err());
        }
    }
}
