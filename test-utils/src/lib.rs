//! Assertion helpers shared by the workspace's tests.

/// Asserts that two chunks of program text are equal modulo leading and
/// trailing whitespace, printing a line-oriented diff on mismatch.
///
/// `what` names the comparison in the panic message (e.g. "translated unit").
pub fn assert_text_eq(actual: &str, expected: &str, what: &str) {
    let actual = actual.trim();
    let expected = expected.trim();
    if actual == expected {
        return;
    }

    eprintln!("=== expected {what} ===\n{expected}\n");
    eprintln!("=== actual {what} ===\n{actual}\n");
    eprintln!("=== first differing lines ===");

    let mut expected_lines = expected.lines();
    let mut actual_lines = actual.lines();
    let mut line = 0;
    loop {
        line += 1;
        match (expected_lines.next(), actual_lines.next()) {
            (None, None) => break,
            (want, got) => {
                if want != got {
                    eprintln!("{line:>4} - {}", want.unwrap_or("<missing>"));
                    eprintln!("{line:>4} + {}", got.unwrap_or("<missing>"));
                    break;
                }
            }
        }
    }

    let (want_count, got_count) = (expected.lines().count(), actual.lines().count());
    if want_count != got_count {
        eprintln!("line counts differ: expected {want_count}, got {got_count}");
    }

    panic!("{what} mismatch");
}
