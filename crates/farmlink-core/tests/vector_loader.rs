//! JSON test vector loader shared by envelope tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use serde::Deserialize;

use farmlink_core::protocol::Envelope;

#[derive(Debug, Deserialize)]
pub struct TestVector {
    pub description: String,
    pub envelope: Envelope,
    pub expect: ExpectBlock,
}

#[derive(Debug, Deserialize)]
pub struct ExpectBlock {
    pub sender: String,
    pub requested_command: String,
    #[serde(default)]
    pub time_stamp: Option<String>,
    #[serde(default)]
    pub command: Option<serde_json::Value>,
}

pub fn load(name: &str) -> TestVector {
    let s = fs::read_to_string(format!("tests/vectors/{name}"))
        .unwrap_or_else(|e| panic!("read vector {name}: {e}"));
    serde_json::from_str(&s).expect("invalid test vector")
}
