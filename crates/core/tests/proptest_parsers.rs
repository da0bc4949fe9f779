//! Property-based tests for the tokenizer, git output parsers, provenance
//! markers and the unapplied-update filter.

use proptest::prelude::*;

use forksync_core::bump::DependencyBump;
use forksync_core::command::{quote, tokenize};
use forksync_core::git::parser::{parse_current_branch, parse_log};
use forksync_core::history::{unapplied_updates, ExcludePattern};
use forksync_core::models::Commit;
use forksync_core::provenance::{format_marker, marker_hashes, marks_hash};

// =============================================================================
// Strategies
// =============================================================================

/// Abbreviated commit hash, as printed by `%h`.
fn short_hash_strategy() -> impl Strategy<Value = String> {
    "[a-f0-9]{7,12}".prop_map(|s| s.to_string())
}

/// Single-line commit subject, quotes and backslashes included.
fn subject_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 :_'\"\\\\()-]{0,80}".prop_map(|s| s.to_string())
}

/// Upstream commit plus whether the fork already carries a marker for it.
fn upstream_entry_strategy() -> impl Strategy<Value = (Commit, bool)> {
    (
        short_hash_strategy(),
        "(WIP )?[A-Za-z ]{1,20}",
        0i64..5_000,
        any::<bool>(),
    )
        .prop_map(|(hash, subject, ts, marked)| (Commit::new(hash, subject, ts), marked))
}

/// A fork history: unrelated local commits interleaved with markers for
/// the upstream entries flagged as applied.
fn histories_strategy() -> impl Strategy<Value = (Vec<Commit>, Vec<Commit>)> {
    (
        prop::collection::vec(upstream_entry_strategy(), 0..20),
        prop::collection::vec((short_hash_strategy(), subject_strategy(), 0i64..5_000), 0..10),
    )
        .prop_map(|(entries, local)| {
            let mut current: Vec<Commit> = local
                .into_iter()
                .map(|(hash, subject, ts)| Commit::new(hash, subject, ts))
                .collect();
            current.extend(
                entries
                    .iter()
                    .filter(|(_, marked)| *marked)
                    .map(|(c, _)| Commit::new("f0f0f0f", format_marker(c), c.timestamp)),
            );
            let upstream = entries.into_iter().map(|(c, _)| c).collect();
            (current, upstream)
        })
}

// =============================================================================
// Robustness: parsers never panic
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn tokenizer_does_not_panic(input in ".*") {
        let _ = tokenize(&input);
    }

    #[test]
    fn log_parser_does_not_panic(input in ".*") {
        let _ = parse_log(&input);
    }

    #[test]
    fn branch_parser_does_not_panic(input in ".*") {
        let _ = parse_current_branch(&input);
    }

    #[test]
    fn marker_parser_does_not_panic(input in ".*") {
        let _ = marker_hashes(&input);
    }

    #[test]
    fn bump_parser_does_not_panic(input in ".*") {
        let _ = DependencyBump::parse(&input);
    }
}

// =============================================================================
// Round trips
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Any argument survives quoting and tokenizing as a single token.
    #[test]
    fn quoted_argument_is_one_token(arg in "\\PC{0,40}") {
        let tokens = tokenize(&quote(&arg)).unwrap();
        prop_assert_eq!(tokens, vec![arg]);
    }

    /// A command line built from quoted arguments splits back into them.
    #[test]
    fn quoted_arguments_split_back(args in prop::collection::vec("\\PC{0,20}", 1..6)) {
        let line = args.iter().map(|a| quote(a)).collect::<Vec<_>>().join(" ");
        prop_assert_eq!(tokenize(&line).unwrap(), args);
    }

    /// A formatted marker always records the commit it was made from.
    #[test]
    fn marker_records_its_hash(hash in short_hash_strategy(), subject in subject_strategy()) {
        let message = format_marker(&Commit::new(hash.clone(), subject, 0));
        prop_assert_eq!(marker_hashes(&message), vec![hash.as_str()]);
        prop_assert!(marks_hash(&message, &hash));
    }

    /// A marker keeps matching once the abbreviation grows.
    #[test]
    fn marker_matches_longer_abbreviation(hash in short_hash_strategy(), extra in "[a-f0-9]{1,8}") {
        let message = format_marker(&Commit::new(hash.clone(), "Fix bug", 0));
        let longer = format!("{}{}", hash, extra);
        prop_assert!(marks_hash(&message, &longer));
    }
}

// =============================================================================
// Unapplied-update filter
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    /// Nothing older than the fork point is offered.
    #[test]
    fn updates_are_not_older_than_fork_point(
        (current, upstream) in histories_strategy(),
        fork_ts in 0i64..5_000,
    ) {
        let updates = unapplied_updates(&current, &upstream, fork_ts, &ExcludePattern::none());
        for commit in &updates {
            prop_assert!(commit.timestamp >= fork_ts, "{:?} predates {}", commit, fork_ts);
        }
    }

    /// Nothing whose subject matches the exclusion pattern is offered.
    #[test]
    fn excluded_subjects_are_never_offered((current, upstream) in histories_strategy()) {
        let exclude = ExcludePattern::parse("^WIP").unwrap();
        let updates = unapplied_updates(&current, &upstream, 0, &exclude);
        for commit in &updates {
            prop_assert!(!commit.message.starts_with("WIP"), "{:?} was not excluded", commit);
        }
    }

    /// Nothing already recorded by a marker in the fork is offered again.
    #[test]
    fn marked_commits_are_never_offered((current, upstream) in histories_strategy()) {
        let updates = unapplied_updates(&current, &upstream, 0, &ExcludePattern::none());
        for commit in &updates {
            prop_assert!(
                !current.iter().any(|c| marks_hash(&c.message, &commit.hash)),
                "{:?} is already marked",
                commit
            );
        }
    }
}
