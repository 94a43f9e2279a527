use super::*;

pub(crate) struct CommandBuilder {
  args: Vec<String>,
  expected_exit_code: i32,
  stdin: Vec<u8>,
  tempdir: TempDir,
}

impl CommandBuilder {
  pub(crate) fn new(args: &str) -> Self {
    Self {
      args: args.split_whitespace().map(str::to_string).collect(),
      expected_exit_code: 0,
      stdin: Vec::new(),
      tempdir: TempDir::new().unwrap(),
    }
  }

  pub(crate) fn write(self, path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Self {
    fs::write(self.tempdir.path().join(path), contents).unwrap();
    self
  }

  pub(crate) fn stdin(self, stdin: Vec<u8>) -> Self {
    Self { stdin, ..self }
  }

  pub(crate) fn expected_exit_code(self, expected_exit_code: i32) -> Self {
    Self {
      expected_exit_code,
      ..self
    }
  }

  fn command(&self) -> Command {
    let mut command = Command::new(executable_path("ord-brc20"));

    command
      .env_remove("ORD_BRC20_CHAIN")
      .env_remove("ORD_BRC20_BRC20_MISSING_DEC")
      .stdin(Stdio::piped())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .current_dir(self.tempdir.path())
      .arg("--data-dir")
      .arg(self.tempdir.path())
      .args(&self.args);

    command
  }

  /// Runs the command and returns its stdout and stderr.
  #[track_caller]
  pub(crate) fn run(self) -> (String, String) {
    let mut child = self.command().spawn().unwrap();

    child
      .stdin
      .take()
      .unwrap()
      .write_all(&self.stdin)
      .unwrap();

    let output = child.wait_with_output().unwrap();

    let stdout = str::from_utf8(&output.stdout).unwrap().to_string();
    let stderr = str::from_utf8(&output.stderr).unwrap().to_string();

    if output.status.code() != Some(self.expected_exit_code) {
      panic!(
        "Test failed: {}\nstdout:\n{}\nstderr:\n{}",
        output.status, stdout, stderr
      );
    }

    (stdout, stderr)
  }

  #[track_caller]
  pub(crate) fn run_and_extract_stdout(self) -> String {
    self.run().0
  }

  #[track_caller]
  pub(crate) fn run_and_extract_stderr(self) -> String {
    self.run().1
  }

  #[track_caller]
  pub(crate) fn run_and_deserialize_output<T: DeserializeOwned>(self) -> T {
    let stdout = self.run_and_extract_stdout();
    serde_json::from_str(&stdout)
      .unwrap_or_else(|err| panic!("Failed to deserialize JSON: {err}\n{stdout}"))
  }
}
