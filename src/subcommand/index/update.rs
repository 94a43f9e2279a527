use super::*;

pub(crate) fn run(settings: Settings) -> SubcommandResult {
  let index = Index::open(&settings)?;

  index.update()?;

  let info = index.info()?;

  log::info!(
    "index updated to height {}, cumulative event hash {}",
    info
      .height
      .map(|height| height.to_string())
      .unwrap_or_else(|| "none".into()),
    info.cumulative_event_hash.as_deref().unwrap_or("none"),
  );

  Ok(None)
}
