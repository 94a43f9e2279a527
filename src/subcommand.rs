use super::*;

pub mod decode;
pub mod index;

#[derive(Debug, Parser)]
pub(crate) enum Subcommand {
  #[command(about = "Decode a transaction's inscriptions and BRC-20 payloads")]
  Decode(decode::Decode),
  #[command(subcommand, about = "Index commands")]
  Index(index::IndexSubcommand),
}

impl Subcommand {
  pub(crate) fn run(self, settings: Settings) -> SubcommandResult {
    match self {
      Self::Decode(decode) => decode.run(settings),
      Self::Index(index) => index.run(settings),
    }
  }
}

pub trait Output: Send {
  fn print_json(&self);
}

impl<T> Output for T
where
  T: Serialize + Send,
{
  fn print_json(&self) {
    serde_json::to_writer_pretty(io::stdout(), self).ok();
    println!();
  }
}

pub(crate) type SubcommandResult = Result<Option<Box<dyn Output>>>;
