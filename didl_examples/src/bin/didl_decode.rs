// Copyright 2026 the Didl Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decodes a hex-encoded DIDL message and prints its arguments as IDL text.
//!
//! The message is taken from the first command-line argument, or from stdin when there is none.
//! Surrounding whitespace and an optional `0x` prefix are ignored.
//!
//! ```text
//! $ didl_decode 4449444c0002717c0568656c6c6f2a
//! ("hello", 42 : int)
//! ```

use std::io::Read as _;
use std::process::ExitCode;

use didl::arena::Arena;
use didl::deserializer::Deserializer;
use didl::pretty::display_args;
use didl::trace::StderrSink;

fn read_input() -> std::io::Result<String> {
    if let Some(arg) = std::env::args().nth(1) {
        return Ok(arg);
    }
    let mut s = String::new();
    std::io::stdin().read_to_string(&mut s)?;
    Ok(s)
}

fn main() -> ExitCode {
    let input = match read_input() {
        Ok(s) => s,
        Err(err) => {
            eprintln!("failed to read input: {err}");
            return ExitCode::FAILURE;
        }
    };
    let trimmed = input.trim();
    let hex_str = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = match hex::decode(hex_str) {
        Ok(b) => b,
        Err(err) => {
            eprintln!("invalid hex input: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut arena = Arena::new();
    let mut de = match Deserializer::new(&bytes, &mut arena) {
        Ok(de) => de,
        Err(err) => {
            eprintln!("failed to parse DIDL header: {err}");
            return ExitCode::FAILURE;
        }
    };
    let mut warnings = StderrSink::for_config(de.config());
    de.set_trace(&mut warnings);

    let mut args = Vec::with_capacity(de.arg_count());
    while !de.is_done() {
        match de.get_value(&mut arena) {
            Ok((_, v)) => args.push(v),
            Err(err) => {
                eprintln!("failed to decode argument {}: {err}", args.len());
                return ExitCode::FAILURE;
            }
        }
    }
    if let Err(err) = de.done(&arena) {
        eprintln!("trailing bytes in input: {err}");
        return ExitCode::FAILURE;
    }
    println!("{}", display_args(&arena, &args));
    ExitCode::SUCCESS
}
