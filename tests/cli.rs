use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn cli_help_lists_subcommands() {
    Command::cargo_bin("cloudcost")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("calculate"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("batch"));
}

#[test]
fn cli_calculate_prices_file_input_without_ai_key() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("requirements.json");
    std::fs::write(
        &input,
        r#"{"requirements":[{"Server Name":"web1","CPU":2,"RAM":4,"Storage":"100GB SSD","Database":"None"}]}"#,
    )
    .unwrap();
    std::fs::write(
        dir.path().join("instances.yaml"),
        "t3.medium: { vcpus: 2, memory_mib: 4096 }\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("prices.yaml"), "t3.medium: 0.0416\n").unwrap();

    Command::cargo_bin("cloudcost")
        .unwrap()
        .current_dir(dir.path())
        .env("CLOUDCOST_CATALOG__PATH", "instances.yaml")
        .env("CLOUDCOST_PRICING__PATH", "prices.yaml")
        .env_remove("AI_API_KEY")
        .args(["calculate", "--input"])
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"InstanceType\": \"t3.medium\""))
        .stdout(predicate::str::contains("\"Total Pricing\": \"$37.95\""));
}

#[test]
fn cli_calculate_rejects_invalid_document() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bad.json"), "{\"servers\": 1}").unwrap();
    std::fs::write(dir.path().join("instances.yaml"), "{}\n").unwrap();
    std::fs::write(dir.path().join("prices.yaml"), "{}\n").unwrap();

    Command::cargo_bin("cloudcost")
        .unwrap()
        .current_dir(dir.path())
        .env("CLOUDCOST_CATALOG__PATH", "instances.yaml")
        .env("CLOUDCOST_PRICING__PATH", "prices.yaml")
        .env_remove("AI_API_KEY")
        .args(["calculate", "--input", "bad.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a valid requirements document"));
}

#[test]
fn cli_chat_without_ai_key_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("instances.yaml"), "{}\n").unwrap();
    std::fs::write(dir.path().join("prices.yaml"), "{}\n").unwrap();

    Command::cargo_bin("cloudcost")
        .unwrap()
        .current_dir(dir.path())
        .env("CLOUDCOST_CATALOG__PATH", "instances.yaml")
        .env("CLOUDCOST_PRICING__PATH", "prices.yaml")
        .env("CLOUDCOST_AI__PROVIDER", "openai")
        .env_remove("AI_API_KEY")
        .args(["chat", "two web servers"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no AI provider configured"));
}
