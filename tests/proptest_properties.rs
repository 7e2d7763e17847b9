//! Property-based tests for the protocol engine.
//!
//! Uses proptest to check that:
//! 1. Hostmasks split and rejoin without losing components
//! 2. Case folding is idempotent and lookups ignore case
//! 3. Boolean mode toggles and list-mode refreshes are stable
//! 4. Dispatch never panics, whatever the server sends

use proptest::prelude::*;
use slirc_client::hostmask::{join, parse_full};
use slirc_client::{CaseMapping, ClientConfig, ConnectionState, Parser};

// =============================================================================
// STRATEGIES
// =============================================================================

fn nickname_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z\\[\\]\\\\^_`{|}][a-zA-Z0-9\\-\\[\\]\\\\^_`{|}]{0,8}")
        .expect("valid regex")
}

fn ident_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("~?[a-zA-Z][a-zA-Z0-9]{0,9}").expect("valid regex")
}

fn host_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]+(\\.[a-z0-9]+){0,3}").expect("valid regex")
}

fn casemap_strategy() -> impl Strategy<Value = CaseMapping> {
    prop_oneof![
        Just(CaseMapping::Ascii),
        Just(CaseMapping::Rfc1459),
        Just(CaseMapping::StrictRfc1459),
    ]
}

fn mask_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z*?]{1,6}![a-z*?]{1,6}@[a-z*?.]{1,12}").expect("valid regex")
}

fn registered() -> Parser {
    let mut parser = Parser::new(ClientConfig::new("me")).expect("valid config");
    parser.connecting().unwrap();
    parser.connected().unwrap();
    parser.dispatch(":irc.test 001 me :Welcome");
    parser.dispatch(":irc.test 005 me PREFIX=(ov)@+ CHANMODES=b,k,l,imnpst :are supported");
    parser.dispatch(":me!u@h JOIN #c");
    parser
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn hostmask_splits_and_rejoins(
        nick in nickname_strategy(),
        ident in ident_strategy(),
        host in host_strategy(),
    ) {
        let raw = format!("{nick}!{ident}@{host}");
        let (n, i, h) = parse_full(&raw);
        prop_assert_eq!((n, i, h), (nick.as_str(), ident.as_str(), host.as_str()));
        prop_assert_eq!(join(n, i, h), raw);
    }

    #[test]
    fn bare_nick_has_no_ident_or_host(nick in nickname_strategy()) {
        prop_assert_eq!(parse_full(&nick), (nick.as_str(), "", ""));
    }

    #[test]
    fn folding_is_idempotent(casemap in casemap_strategy(), s in "\\PC{0,32}") {
        let once = casemap.fold(&s);
        prop_assert_eq!(casemap.fold(&once), once);
    }

    #[test]
    fn lookups_ignore_case(nick in nickname_strategy()) {
        let mut parser = registered();
        parser.dispatch(&format!(":{nick}!u@h JOIN #c"));
        let state = parser.state();
        prop_assert!(state.client(&nick.to_uppercase()).is_some());
        prop_assert!(state.client(&nick.to_lowercase()).is_some());
        prop_assert!(state.channel("#C").is_some());
    }

    #[test]
    fn boolean_toggle_restores_mask(
        initial in prop::sample::subsequence(vec!['i', 'm', 'n', 'p', 's', 't'], 0..=6),
        letter in prop::sample::select(vec!['i', 'm', 'n', 'p', 's', 't']),
    ) {
        let initial: String = initial.into_iter().filter(|&c| c != letter).collect();
        let mut parser = registered();
        parser.dispatch(&format!(":irc.test 324 me #c +{initial}"));
        let before = parser.state().channel("#c").unwrap().boolean_modes;

        parser.dispatch(&format!(":op!o@h MODE #c +{letter}"));
        parser.dispatch(&format!(":op!o@h MODE #c -{letter}"));
        prop_assert_eq!(parser.state().channel("#c").unwrap().boolean_modes, before);
    }

    #[test]
    fn list_refresh_keeps_batch_size(
        masks in prop::collection::btree_set(mask_strategy(), 0..12),
        rounds in 1usize..4,
    ) {
        let mut parser = registered();
        for _ in 0..rounds {
            for mask in &masks {
                parser.dispatch(&format!(":irc.test 367 me #c {mask} op 1"));
            }
            parser.dispatch(":irc.test 368 me #c :End of Channel Ban List");
        }
        let bans = parser.state().channel("#c").unwrap().list_mode('b');
        prop_assert_eq!(bans.len(), masks.len());
        let stored: Vec<&str> = bans.iter().map(|e| e.item.as_str()).collect();
        let expected: Vec<&str> = masks.iter().map(String::as_str).collect();
        prop_assert_eq!(stored, expected);
    }

    #[test]
    fn dispatch_never_panics(lines in prop::collection::vec("[^\r\n]{0,120}", 0..20)) {
        let mut parser = registered();
        for line in &lines {
            parser.dispatch(line);
        }
        prop_assert!(parser.connection_state().is_active());
    }

    #[test]
    fn dispatch_survives_numeric_noise(
        code in 1u16..1000,
        params in prop::collection::vec("[#a-zA-Z0-9%!@*+=]{0,12}", 0..8),
    ) {
        let mut parser = registered();
        parser.dispatch(&format!(":irc.test {code:03} {}", params.join(" ")));
        prop_assert_eq!(parser.connection_state(), ConnectionState::Connected);
    }
}
