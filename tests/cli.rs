#[cfg(test)]
mod cli_tests {
    use std::process::Command;

    fn rox() -> Command {
        Command::new(env!("CARGO_BIN_EXE_rox"))
    }

    #[test]
    fn test_more_than_one_script_is_a_usage_error() {
        let output = rox().args(["one.lox", "two.lox"]).output().unwrap();

        assert_eq!(output.status.code(), Some(64));
        assert!(output.stdout.is_empty());
        assert_eq!(String::from_utf8_lossy(&output.stderr), "Usage: rox [script]\n");
    }
}
