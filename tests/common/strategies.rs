//! Proptest strategies for deploy command fields

use proptest::collection::{btree_map, vec};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Non-empty command tokens without whitespace
pub fn argv_token_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_./=-]{1,16}"
}

/// Separator runs mixing spaces, tabs and newlines
pub fn whitespace_strategy() -> impl Strategy<Value = String> {
    "[ \t\n]{1,4}"
}

/// Tokens joined by arbitrary whitespace, returned with the expected argv
pub fn command_line_strategy() -> impl Strategy<Value = (String, Vec<String>)> {
    vec(argv_token_strategy(), 0..8).prop_flat_map(|tokens| {
        let separators = vec(whitespace_strategy(), tokens.len() + 1);
        (Just(tokens), separators).prop_map(|(tokens, separators)| {
            let mut line = separators[0].clone();
            for (token, separator) in tokens.iter().zip(separators.iter().skip(1)) {
                line.push_str(token);
                line.push_str(separator);
            }
            (line, tokens)
        })
    })
}

/// Environment variable names as Kubernetes accepts them
pub fn env_map_strategy() -> impl Strategy<Value = BTreeMap<String, String>> {
    btree_map("[A-Z_][A-Z0-9_]{0,12}", "[ -~]{0,24}", 0..10)
}

/// Deploy names valid as Kubernetes object names
pub fn deploy_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,30}[a-z0-9]"
}
