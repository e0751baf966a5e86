use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn decode_output_right_answer() {
    let mut cmd = Command::cargo_bin("decode_samples").unwrap();
    cmd.arg("inputs/samples.txt");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "Found 49 of 80 samples behave like 3 or more operations.",
        ))
        .stdout(predicate::str::contains(" 0 => muli"))
        .stdout(predicate::str::contains("15 => banr"))
        .stdout(predicate::str::contains(
            "After running the program, register 0 is 0 (registers are [0, 2, 1, 1]).",
        ));
}
