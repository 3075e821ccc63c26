mod common;

use assert_cmd::Command;
use predicates::str::contains;

fn cli(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("ops_ledger_cli").unwrap();
    cmd.env("OPS_LEDGER_CLI_SCRIPT", "1")
        .env("OPS_LEDGER_HOME", home)
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn script_mode_runs_basic_flow() {
    let home = common::temp_dir();
    let input = "open-account Ops USD 1000\n\
                 deposit Ops 500 2025-01-02 Invoice 17\n\
                 withdraw Ops 200 2025-01-03\n\
                 accounts\n\
                 exit\n";

    cli(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Account `Ops` opened"))
        .stdout(contains("balance now $1,500.00"))
        .stdout(contains("$1,300.00"));

    let ledger = std::fs::read_to_string(home.join("data").join("ledger.json")).unwrap();
    assert!(ledger.contains("Invoice 17"));
}

#[test]
fn recurring_payment_can_be_added_and_listed() {
    let home = common::temp_dir();
    let input = "open-account Ops\n\
                 add-payment Ops withdraw 49.99 monthly:31 09:00 Software \"Design tools\"\n\
                 payments\n\
                 tick\n\
                 exit\n";

    cli(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Recurring payment"))
        .stdout(contains("Monthly on the 31 at 09:00"))
        .stdout(contains("Tick finished: 0 fired"));

    let payments = std::fs::read_to_string(home.join("data").join("payments.json")).unwrap();
    assert!(payments.contains("Design tools"));
}

#[test]
fn unknown_command_suggests_closest_match() {
    let home = common::temp_dir();
    cli(&home)
        .write_stdin("acounts\nexit\n")
        .assert()
        .success()
        .stdout(contains("Unknown command `acounts`"))
        .stdout(contains("Suggestion: `accounts`?"));
}

#[test]
fn conversion_uses_published_rate() {
    let home = common::temp_dir();
    cli(&home)
        .write_stdin("rates set EUR USD 1.25 2025-01-01\nconvert 100 USD EUR\nexit\n")
        .assert()
        .success()
        .stdout(contains("$100.00 = €80.00"));
}

#[test]
fn help_lists_commands_by_group() {
    let home = common::temp_dir();
    cli(&home)
        .write_stdin("help\nexit\n")
        .assert()
        .success()
        .stdout(contains("Recurring payments"))
        .stdout(contains("reschedule"))
        .stdout(contains("Shell & scheduler"));
}
