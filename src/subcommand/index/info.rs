use super::*;

#[derive(Debug, Parser)]
pub(crate) struct Info {
  #[arg(long, help = "Print statistics without updating the index first.")]
  no_update: bool,
}

impl Info {
  pub(crate) fn run(self, settings: Settings) -> SubcommandResult {
    let index = Index::open(&settings)?;

    if !self.no_update {
      index.update()?;
    }

    Ok(Some(Box::new(index.info()?)))
  }
}
