use super::*;

use proptest::prelude::*;

/// Brute-force reference: a flat list of entries scanned on every query.
#[derive(Clone, Debug, Default)]
struct Model {
    entries: Vec<ModelEntry>,
    next_seq: u64,
}

#[derive(Clone, Debug)]
struct ModelEntry {
    value: u8,
    weight: f64,
    seq: u64,
    tokens: Vec<u8>,
}

impl Model {
    fn insert(&mut self, value: u8, weight: f64, tokens: &[u8]) {
        if let Some(e) = self
            .entries
            .iter_mut()
            .find(|e| e.value == value && e.tokens == tokens)
        {
            e.weight += weight;
            return;
        }
        self.entries.push(ModelEntry {
            value,
            weight,
            seq: self.next_seq,
            tokens: tokens.to_vec(),
        });
        self.next_seq += 1;
    }

    fn remove(&mut self, prefix: &[u8]) {
        self.entries.retain(|e| !e.tokens.starts_with(prefix));
    }

    fn autocomplete(&self, prefix: &[u8], limit: Option<usize>) -> Vec<(u8, f64)> {
        let mut matched: Vec<&ModelEntry> = self
            .entries
            .iter()
            .filter(|e| e.tokens.starts_with(prefix))
            .collect();
        matched.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.seq.cmp(&b.seq)));
        matched
            .into_iter()
            .take(limit.unwrap_or(usize::MAX))
            .map(|e| (e.value, e.weight))
            .collect()
    }

    fn weight_of(&self, prefix: &[u8], policy: AggregationPolicy) -> Option<f64> {
        let weights: Vec<f64> = self
            .entries
            .iter()
            .filter(|e| e.tokens.starts_with(prefix))
            .map(|e| e.weight)
            .collect();
        if weights.is_empty() && !prefix.is_empty() {
            return None;
        }
        Some(policy.aggregate(weights.iter().sum(), weights.len()))
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert(u8, u8, Vec<u8>),
    Remove(Vec<u8>),
    Query(Vec<u8>, Option<usize>),
}

fn tokens_strategy() -> impl Strategy<Value = Vec<u8>> + Clone {
    // A tiny alphabet forces shared prefixes, splits and merges.
    prop::collection::vec(0u8..3, 0..=6)
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    let tokens = tokens_strategy();
    let op = prop_oneof![
        55 => (0u8..4, 1u8..=8, tokens.clone()).prop_map(|(v, w, t)| Op::Insert(v, w, t)),
        15 => prop::collection::vec(0u8..3, 0..=3).prop_map(Op::Remove),
        30 => (tokens.clone(), prop::option::of(1usize..6)).prop_map(|(t, l)| Op::Query(t, l)),
    ];
    prop::collection::vec(op, 0..=200)
}

/// Every prefix of every live sequence plus a few that match nothing.
fn query_prefixes(model: &Model) -> Vec<Vec<u8>> {
    let mut out = vec![Vec::new(), vec![9], vec![0, 9]];
    for e in &model.entries {
        for end in 0..=e.tokens.len() {
            out.push(e.tokens[..end].to_vec());
        }
        let mut longer = e.tokens.clone();
        longer.push(0);
        out.push(longer);
    }
    out.sort();
    out.dedup();
    out
}

fn fractional_weight() -> impl Strategy<Value = f64> {
    // None of these is exactly representable, so sums depend on fold order.
    prop::sample::select(vec![0.1, 0.2, 0.3, 0.7, 1.1, 0.01, 3.3, 0.05])
}

fn check_all(
    simple: &SimplePrefixTree<u8, u8>,
    compressed: &CompressedPrefixTree<u8, u8>,
    model: &Model,
    policy: AggregationPolicy,
) -> std::result::Result<(), TestCaseError> {
    simple.validate();
    compressed.validate();
    prop_assert_eq!(simple.len(), model.entries.len());
    prop_assert_eq!(compressed.len(), model.entries.len());
    prop_assert!(compressed.node_count() <= simple.node_count());

    for prefix in query_prefixes(model) {
        let expected = model.autocomplete(&prefix, None);
        prop_assert_eq!(&simple.autocomplete(&prefix, None).unwrap(), &expected);
        prop_assert_eq!(&compressed.autocomplete(&prefix, None).unwrap(), &expected);

        for k in [1usize, 2, 3] {
            let top = &expected[..k.min(expected.len())];
            let from_simple = simple.autocomplete(&prefix, Some(k)).unwrap();
            let from_compressed = compressed.autocomplete(&prefix, Some(k)).unwrap();
            prop_assert_eq!(from_simple.as_slice(), top);
            prop_assert_eq!(from_compressed.as_slice(), top);
        }

        let weight = model.weight_of(&prefix, policy);
        prop_assert_eq!(simple.weight_of(&prefix), weight);
        prop_assert_eq!(compressed.weight_of(&prefix), weight);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 256,
        max_shrink_iters: 10_000,
        .. ProptestConfig::default()
    })]

    #[test]
    fn prop_trees_match_model(policy in any::<AggregationPolicy>(), ops in ops_strategy()) {
        let mut simple = SimplePrefixTree::new(policy);
        let mut compressed = CompressedPrefixTree::new(policy);
        let mut model = Model::default();

        for op in ops {
            match op {
                Op::Insert(value, weight, tokens) => {
                    let weight = f64::from(weight);
                    simple.insert(value, weight, &tokens).unwrap();
                    compressed.insert(value, weight, &tokens).unwrap();
                    model.insert(value, weight, &tokens);
                }
                Op::Remove(prefix) => {
                    simple.remove(&prefix);
                    compressed.remove(&prefix);
                    model.remove(&prefix);
                    prop_assert!(simple.autocomplete(&prefix, None).unwrap().is_empty());
                    prop_assert!(compressed.autocomplete(&prefix, None).unwrap().is_empty());
                }
                Op::Query(prefix, limit) => {
                    let expected = model.autocomplete(&prefix, limit);
                    let from_simple = simple.autocomplete(&prefix, limit).unwrap();
                    prop_assert_eq!(from_simple, expected.clone());
                    prop_assert_eq!(compressed.autocomplete(&prefix, limit).unwrap(), expected);
                }
            }
            prop_assert_eq!(simple.len(), model.entries.len());
            prop_assert_eq!(compressed.len(), model.entries.len());
        }

        check_all(&simple, &compressed, &model, policy)?;
    }

    #[test]
    fn prop_remove_is_idempotent(
        policy in any::<AggregationPolicy>(),
        seqs in prop::collection::vec(tokens_strategy(), 1..40),
        prefix in prop::collection::vec(0u8..3, 0..=3),
    ) {
        let mut simple = SimplePrefixTree::new(policy);
        let mut compressed = CompressedPrefixTree::new(policy);
        let mut model = Model::default();
        for (i, tokens) in seqs.iter().enumerate() {
            let value = (i % 4) as u8;
            simple.insert(value, 1.0, tokens).unwrap();
            compressed.insert(value, 1.0, tokens).unwrap();
            model.insert(value, 1.0, tokens);
        }

        simple.remove(&prefix);
        compressed.remove(&prefix);
        model.remove(&prefix);
        let (simple_nodes, compressed_nodes) = (simple.node_count(), compressed.node_count());

        simple.remove(&prefix);
        compressed.remove(&prefix);
        prop_assert_eq!(simple.node_count(), simple_nodes);
        prop_assert_eq!(compressed.node_count(), compressed_nodes);
        check_all(&simple, &compressed, &model, policy)?;
    }

    #[test]
    fn prop_fractional_weights_agree_bitwise(
        policy in any::<AggregationPolicy>(),
        ops in prop::collection::vec(
            (0u8..4, fractional_weight(), tokens_strategy(), prop::bool::weighted(0.15)),
            0..=150,
        ),
    ) {
        let mut simple = SimplePrefixTree::new(policy);
        // Same operations, independently seeded child maps.
        let mut rebuilt = SimplePrefixTree::new(policy);
        let mut compressed = CompressedPrefixTree::new(policy);
        let mut model = Model::default();

        for (value, weight, tokens, is_remove) in ops {
            if is_remove {
                let prefix = &tokens[..tokens.len().min(2)];
                simple.remove(prefix);
                rebuilt.remove(prefix);
                compressed.remove(prefix);
                model.remove(prefix);
            } else {
                simple.insert(value, weight, &tokens).unwrap();
                rebuilt.insert(value, weight, &tokens).unwrap();
                compressed.insert(value, weight, &tokens).unwrap();
                model.insert(value, weight, &tokens);
            }
        }
        simple.validate();
        compressed.validate();

        for prefix in query_prefixes(&model) {
            let weight = simple.weight_of(&prefix);
            let bits = weight.map(f64::to_bits);
            prop_assert_eq!(rebuilt.weight_of(&prefix).map(f64::to_bits), bits);
            prop_assert_eq!(compressed.weight_of(&prefix).map(f64::to_bits), bits);
            match (weight, model.weight_of(&prefix, policy)) {
                (Some(got), Some(want)) => {
                    prop_assert!((got - want).abs() <= 1e-9 * want.abs().max(1.0));
                }
                (got, want) => prop_assert_eq!(got, want),
            }

            let expected = model.autocomplete(&prefix, None);
            prop_assert_eq!(&simple.autocomplete(&prefix, None).unwrap(), &expected);
            prop_assert_eq!(&compressed.autocomplete(&prefix, None).unwrap(), &expected);
        }
    }
}

/// Calls `f` once per ordering of `items`, permuting a scratch copy in place.
fn for_each_ordering<T: Clone>(items: &[T], mut f: impl FnMut(&[T])) {
    fn visit<T>(scratch: &mut [T], fixed: usize, f: &mut impl FnMut(&[T])) {
        if fixed == scratch.len() {
            f(scratch);
            return;
        }
        for i in fixed..scratch.len() {
            scratch.swap(fixed, i);
            visit(scratch, fixed + 1, f);
            scratch.swap(fixed, i);
        }
    }

    let mut scratch = items.to_vec();
    visit(&mut scratch, 0, &mut f);
}

fn small_key_set() -> Vec<Vec<u8>> {
    vec![
        b"a".to_vec(),
        b"ab".to_vec(),
        b"abc".to_vec(),
        b"abd".to_vec(),
        b"b".to_vec(),
        b"".to_vec(),
    ]
}

#[test]
fn exhaustive_insert_order_small_set() {
    let keys = small_key_set();

    for policy in [AggregationPolicy::Sum, AggregationPolicy::Average] {
        for_each_ordering(&keys, |order| {
            let mut simple = SimplePrefixTree::new(policy);
            let mut compressed = CompressedPrefixTree::new(policy);
            let mut model = Model::default();
            for k in order {
                // Weight tied to the key so results differ only in tie order.
                let weight = (k.len() % 3 + 1) as f64;
                simple.insert(0, weight, k).unwrap();
                compressed.insert(0, weight, k).unwrap();
                model.insert(0, weight, k);
            }
            check_all(&simple, &compressed, &model, policy).unwrap();
            // root, a, ab, abc, abd, b
            assert_eq!(simple.node_count(), 6);
            // root, a, ab, c, d, b
            assert_eq!(compressed.node_count(), 6);
        });
    }
}

#[test]
fn exhaustive_remove_order_small_set() {
    let keys = small_key_set();

    // Insert in a fixed order, then remove in all permutations.
    let mut base_simple = SimplePrefixTree::new(AggregationPolicy::Sum);
    let mut base_compressed = CompressedPrefixTree::new(AggregationPolicy::Sum);
    let mut base_model = Model::default();
    for (i, k) in keys.iter().enumerate() {
        let weight = (i + 1) as f64;
        base_simple.insert(i as u8, weight, k).unwrap();
        base_compressed.insert(i as u8, weight, k).unwrap();
        base_model.insert(i as u8, weight, k);
    }

    for_each_ordering(&keys, |order| {
        let mut simple = base_simple.clone();
        let mut compressed = base_compressed.clone();
        let mut model = base_model.clone();

        for k in order {
            simple.remove(k);
            compressed.remove(k);
            model.remove(k);
            check_all(&simple, &compressed, &model, AggregationPolicy::Sum).unwrap();
        }
        assert!(simple.is_empty());
        assert!(compressed.is_empty());
        assert_eq!(simple.node_count(), 1);
        assert_eq!(compressed.node_count(), 1);
    });
}

#[test]
fn test_randomized_words() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(7);
    let mut simple: SimplePrefixTree<String, char> =
        SimplePrefixTree::new(AggregationPolicy::Average);
    let mut compressed: CompressedPrefixTree<String, char> =
        CompressedPrefixTree::new(AggregationPolicy::Average);

    let alphabet = ['a', 'b', 'c', 'd', 'e'];
    let mut words = Vec::new();
    for _ in 0..5_000 {
        let len = rng.gen_range(1..10);
        let word: String = (0..len)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
            .collect();
        let tokens: Vec<char> = word.chars().collect();

        if rng.gen_range(0..50) == 0 {
            let cut = tokens.len().min(3);
            simple.remove(&tokens[..cut]);
            compressed.remove(&tokens[..cut]);
        } else {
            let weight = f64::from(rng.gen_range(1u8..=20));
            simple.insert(word.clone(), weight, &tokens).unwrap();
            compressed.insert(word.clone(), weight, &tokens).unwrap();
            words.push(tokens);
        }
    }

    simple.validate();
    compressed.validate();
    assert_eq!(simple.len(), compressed.len());
    assert!(compressed.node_count() < simple.node_count());

    for tokens in words.iter().take(500) {
        for end in 0..=tokens.len() {
            let prefix = &tokens[..end];
            assert_eq!(
                simple.autocomplete(prefix, Some(10)).unwrap(),
                compressed.autocomplete(prefix, Some(10)).unwrap(),
                "prefix {prefix:?}"
            );
            assert_eq!(simple.weight_of(prefix), compressed.weight_of(prefix));
        }
    }
}
