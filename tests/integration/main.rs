//! Integration tests for the lipsync CLI

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn lipsync() -> Command {
        cargo_bin_cmd!("lipsync")
    }

    #[test]
    fn help_displays() {
        lipsync()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Lip-synced video generation"));
    }

    #[test]
    fn version_displays() {
        lipsync()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("lipsync"));
    }

    #[test]
    fn run_help_lists_engine_tuning() {
        lipsync()
            .args(["run", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("SadTalker options"))
            .stdout(predicate::str::contains("Wav2Lip options"))
            .stdout(predicate::str::contains("--no-upscale"));
    }

    #[test]
    fn missing_input_fails_in_validate_stage() {
        let dir = TempDir::new().unwrap();

        lipsync()
            .args([
                "run",
                "missing.png",
                "missing.wav",
                "out.mp4",
                "--cache-dir",
            ])
            .arg(dir.path().join("cache"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("validate"));

        assert!(
            !dir.path().join("cache").exists(),
            "validation failure must not touch the cache"
        );
    }

    #[test]
    fn cross_engine_tuning_rejected_before_acquisition() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("face.png");
        let audio = dir.path().join("speech.wav");
        std::fs::write(&image, b"png").unwrap();
        std::fs::write(&audio, b"wav").unwrap();

        lipsync()
            .args(["run"])
            .arg(&image)
            .arg(&audio)
            .arg(dir.path().join("out.mp4"))
            .args(["--engine", "sadtalker", "--pads", "0", "20", "0", "0"])
            .arg("--cache-dir")
            .arg(dir.path().join("cache"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("not supported by the sadtalker"));

        assert!(!dir.path().join("cache").exists());
    }

    #[test]
    fn invalid_resolution_rejected() {
        let dir = TempDir::new().unwrap();
        let image = dir.path().join("face.png");
        let audio = dir.path().join("speech.wav");
        std::fs::write(&image, b"png").unwrap();
        std::fs::write(&audio, b"wav").unwrap();

        lipsync()
            .args(["run"])
            .arg(&image)
            .arg(&audio)
            .arg(dir.path().join("out.mp4"))
            .args(["--resolution", "1024"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("resolution"));
    }

    #[test]
    fn cache_list_empty_root() {
        let dir = TempDir::new().unwrap();

        lipsync()
            .args(["cache", "list", "--cache-dir"])
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache is empty"));
    }

    #[test]
    fn cache_verify_empty_root() {
        let dir = TempDir::new().unwrap();

        lipsync()
            .args(["cache", "verify", "--cache-dir"])
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached checkpoints"));
    }

    #[test]
    fn cache_clear_empty_root() {
        let dir = TempDir::new().unwrap();

        lipsync()
            .args(["cache", "clear", "--yes", "--cache-dir"])
            .arg(dir.path())
            .assert()
            .success()
            .stdout(predicate::str::contains("already empty"));
    }

    #[test]
    fn config_path_displays() {
        lipsync()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_displays_sections() {
        let dir = TempDir::new().unwrap();

        // Nonexistent config path loads pure defaults
        lipsync()
            .args(["config", "show", "--config"])
            .arg(dir.path().join("none.toml"))
            .assert()
            .success()
            .stdout(predicate::str::contains("[pipeline]"))
            .stdout(predicate::str::contains("[wav2lip]"));
    }

    #[test]
    fn config_show_honors_custom_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[pipeline]\nfps = 12\n").unwrap();

        lipsync()
            .args(["config", "show", "--config"])
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("fps = 12"));
    }

    #[test]
    fn status_runs() {
        // Individual checks may fail on minimal hosts, but the command
        // itself must not
        lipsync()
            .arg("status")
            .assert()
            .success()
            .stdout(predicate::str::contains("External tools"));
    }
}
