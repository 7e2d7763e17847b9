//! Fuzz target for line dispatch
//!
//! Feeds arbitrary lines to a registered parser. Dispatch must never panic,
//! and the connection must stay up whatever the server sends.

#![no_main]

use libfuzzer_sys::fuzz_target;
use slirc_client::{ClientConfig, ConnectionState, Parser};

fuzz_target!(|data: &[u8]| {
    let input = String::from_utf8_lossy(data);
    if input.len() > 4096 {
        return;
    }

    let Ok(mut parser) = Parser::new(ClientConfig::new("me")) else {
        return;
    };
    let _ = parser.connecting();
    let _ = parser.connected();
    parser.dispatch(":irc.test 001 me :Welcome");
    parser.dispatch(":me!u@h JOIN #c");

    for line in input.split('\n') {
        parser.dispatch(line);
    }
    assert_eq!(parser.connection_state(), ConnectionState::Connected);
});
